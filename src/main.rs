use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use interview_gateway::api::{ApiServerBuilder, EventHub};
use interview_gateway::interview::{Collaborators, InterviewController, Probes};
use interview_gateway::local::{self, AnswerSource};
use interview_gateway::monitor::{ReportedFocus, ReportedPresence};
use interview_gateway::voice::{AudioCapture, AudioPlayback, TextToSpeech, calculate_energy};
use interview_gateway::{Config, bridge};

/// Interview - voice-driven mock sales interviews
#[derive(Parser)]
#[command(name = "interview", version, about)]
struct Cli {
    /// Port to listen on (overrides config)
    #[arg(long, env = "INTERVIEW_PORT")]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
#[allow(clippy::enum_variant_names)]
enum Command {
    /// Serve the browser client over HTTP and WebSocket (default)
    Serve,
    /// Run an interview in this terminal
    Local {
        /// Type answers instead of speaking them
        #[arg(long)]
        typed: bool,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the interviewer's voice.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,interview_gateway=info",
        1 => "info,interview_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(port) = cli.port {
        config.api_server.port = port;
    }
    tracing::debug!(
        model = %config.llm.model,
        stt = ?config.voice.stt_provider,
        tts = ?config.voice.tts_provider,
        "loaded configuration"
    );

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Local { typed } => {
            let source = if typed {
                AnswerSource::Typed
            } else {
                AnswerSource::Microphone
            };
            run_local(config, source).await
        }
        Command::TestMic { duration } => test_mic(duration).await,
        Command::TestTts { text } => test_tts(&config, &text).await,
    }
}

/// Run the web gateway until interrupted
async fn serve(config: Config) -> anyhow::Result<()> {
    let handle = tokio::runtime::Handle::current();
    let hub = EventHub::new();
    let presence = Arc::new(ReportedPresence::new());
    let focus = Arc::new(ReportedFocus::new());

    let (speech, tts) = bridge::speech(&config, &handle);
    let stt = bridge::transcriber(&config).map(Arc::new);

    let controller = Arc::new(InterviewController::new(
        config.interview.clone(),
        config.monitoring.clone(),
        Collaborators {
            speech,
            generator: bridge::generator(&config, &handle),
            transport: Arc::new(hub.clone()),
        },
        Probes {
            presence: Some(presence.clone()),
            focus: Some(focus.clone()),
        },
    ));

    let server = ApiServerBuilder::new(Arc::clone(&controller), hub, config.api_server.port)
        .presence(presence)
        .focus(focus)
        .stt(stt)
        .tts(tts)
        .static_dir(config.api_server.static_dir.clone())
        .build();

    tracing::info!(
        port = config.api_server.port,
        max_turns = config.interview.max_turns,
        monitoring = config.monitoring.enabled,
        "interview gateway ready"
    );

    tokio::select! {
        result = server.spawn() => result??,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutdown requested"),
    }

    tokio::task::spawn_blocking(move || controller.end()).await?;
    tracing::info!("interview gateway stopped");
    Ok(())
}

/// Run a console interview until it finishes or Ctrl-C
async fn run_local(config: Config, source: AnswerSource) -> anyhow::Result<()> {
    let handle = tokio::runtime::Handle::current();
    let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);

    let mut interview =
        tokio::task::spawn_blocking(move || local::run(&config, source, &handle, stop_rx));

    let summary = tokio::select! {
        result = &mut interview => result??,
        _ = tokio::signal::ctrl_c() => {
            let _ = stop_tx.send(());
            interview.await??
        }
    };

    if let Some(summary) = summary {
        println!("\n--- Transcript ---");
        for entry in &summary.conversation_history {
            println!("{:?}: {}", entry.role, entry.content);
        }
    }
    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    let sample_rate = capture.sample_rate();
    println!("Sample rate: {sample_rate} Hz");
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.peek_buffer();
        let energy = calculate_energy(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!("[{:2}s] RMS: {energy:.4} | Peak: {peak:.4} | [{meter}]", i + 1);

        capture.clear_buffer();
    }

    capture.stop();

    println!("\n---");
    println!("If the meter moved while you spoke, the microphone is ready for `interview local`.");
    println!("If RMS stayed near 0, check the default input device and its levels.");

    Ok(())
}

/// Test TTS output through the configured provider
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let tts = TextToSpeech::from_config(&config.voice, &config.api_keys)?;
    println!("Provider: {:?}", tts.provider());

    println!("Synthesizing speech...");
    let mp3_data = tts.synthesize(text).await?;
    println!("Got {} bytes of audio data", mp3_data.len());

    println!("Playing audio...");
    tokio::task::spawn_blocking(move || {
        let playback = AudioPlayback::new()?;
        playback.play_mp3(&mp3_data)
    })
    .await??;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}
