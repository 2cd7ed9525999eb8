//! Console interview: speaker playback, microphone or typed answers
//!
//! Runs the same controller as the web server with a console transport.
//! Monitoring is off here; the watchers need a browser to report signals.

use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use crossbeam_channel::{Receiver, Sender};
use tokio::runtime::Handle;

use crate::bridge::{self, Blocking};
use crate::config::{Config, MonitoringConfig};
use crate::interview::{Collaborators, Delivery, InterviewController, Probes, Session, Worker};
use crate::transport::{InterviewEvent, InterviewSummary, Transport};
use crate::voice::{AudioPlayback, MicrophoneInput, Silent, SpeechInput, SpeechOutput, SpeechToText};
use crate::{Error, Result};

/// Longest single listen before re-checking the session
const LISTEN_WINDOW: Duration = Duration::from_secs(5);

/// How the candidate answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    Microphone,
    Typed,
}

/// Prints interviewer lines and plays their audio
pub struct ConsoleTransport {
    playback: Option<AudioPlayback>,
    done: Sender<InterviewSummary>,
    // Serializes console output from the sequencer and relay threads
    out: Mutex<()>,
}

impl ConsoleTransport {
    #[must_use]
    pub fn new(playback: Option<AudioPlayback>, done: Sender<InterviewSummary>) -> Self {
        Self {
            playback,
            done,
            out: Mutex::new(()),
        }
    }

    fn print(&self, line: &str) {
        let _guard = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{line}");
        let _ = stdout.flush();
    }

    fn play(&self, audio: &str) -> Result<()> {
        let Some(playback) = &self.playback else {
            return Ok(());
        };
        let mp3 = BASE64
            .decode(audio)
            .map_err(|e| Error::Audio(format!("invalid audio payload: {e}")))?;
        playback.play_mp3(&mp3)
    }
}

impl Transport for ConsoleTransport {
    fn send(&self, event: InterviewEvent) -> Result<()> {
        match event {
            InterviewEvent::Phase(phase) => tracing::debug!(?phase, "phase changed"),
            InterviewEvent::Message(message) => {
                self.print(&format!("\nInterviewer: {}", message.text));
                if let Some(audio) = &message.audio {
                    self.play(audio)?;
                }
            }
            InterviewEvent::Waiting { waiting: true, timeout } => {
                let secs = timeout.map_or(0, |t| t.as_secs());
                self.print(&format!("  (your turn, {secs}s)"));
            }
            InterviewEvent::Waiting { waiting: false, .. } => {}
            InterviewEvent::Warning(notice) => {
                self.print(&format!("  [{:?}] {}", notice.severity, notice.message));
            }
            InterviewEvent::Complete(summary) => {
                self.print(&format!(
                    "\n{} ({} questions asked)",
                    summary.message, summary.questions_asked
                ));
                self.done
                    .try_send(summary)
                    .map_err(|e| Error::Transport(format!("completion not delivered: {e}")))?;
            }
        }
        Ok(())
    }
}

/// Run one console interview until it completes or `stop` fires
///
/// # Errors
///
/// Returns error if the interview cannot be started
pub fn run(
    config: &Config,
    source: AnswerSource,
    handle: &Handle,
    stop: Receiver<()>,
) -> Result<Option<InterviewSummary>> {
    let playback = AudioPlayback::new()
        .inspect_err(|e| tracing::warn!(error = %e, "no speaker, printing only"))
        .ok();

    let (speech, tts) = if playback.is_some() {
        bridge::speech(config, handle)
    } else {
        let silent: Arc<dyn SpeechOutput> = Arc::new(Silent);
        (silent, None)
    };

    // Playback blocks for the length of the line
    let mut interview = config.interview.clone();
    if tts.is_some() {
        interview.speak_pause = Duration::ZERO;
        interview.speak_pause_per_word = Duration::ZERO;
    }

    let stt = match source {
        AnswerSource::Microphone => {
            let stt = bridge::transcriber(config);
            if stt.is_none() {
                tracing::warn!("falling back to typed answers");
            }
            stt
        }
        AnswerSource::Typed => None,
    };

    let (done_tx, done_rx) = crossbeam_channel::bounded(1);
    let transport = Arc::new(ConsoleTransport::new(playback, done_tx));

    let controller = Arc::new(InterviewController::new(
        interview.clone(),
        MonitoringConfig {
            enabled: false,
            ..config.monitoring.clone()
        },
        Collaborators {
            speech,
            generator: bridge::generator(config, handle),
            transport,
        },
        Probes::default(),
    ));

    controller.initialize();
    controller.start()?;

    let relay = match stt {
        Some(stt) => Some(spawn_microphone(
            Arc::clone(&controller),
            Blocking::new(stt, handle.clone()),
        )?),
        None => {
            spawn_stdin(Arc::clone(&controller))?;
            None
        }
    };

    let summary = crossbeam_channel::select! {
        recv(done_rx) -> summary => summary.ok(),
        recv(stop) -> _ => {
            tracing::info!("stopping interview");
            controller.end();
            done_rx.recv_timeout(interview.join_timeout).ok()
        }
    };

    controller.end();
    if let Some(relay) = relay {
        relay.join(interview.join_timeout);
    }
    Ok(summary)
}

/// Listen whenever a question is waiting and deliver what was heard
fn spawn_microphone(
    controller: Arc<InterviewController>,
    stt: Blocking<SpeechToText>,
) -> Result<Worker> {
    Worker::spawn("microphone-relay", move || {
        // The input stream is not Send; open it on this thread
        let mut microphone = match MicrophoneInput::new(stt) {
            Ok(microphone) => microphone,
            Err(e) => {
                tracing::error!(error = %e, "microphone unavailable, ending interview");
                controller.session().terminate();
                return;
            }
        };

        let session: &Session = controller.session();
        while session.is_active() {
            if !session.gate().is_awaiting() {
                std::thread::sleep(Duration::from_millis(100));
                continue;
            }

            let Some(text) = microphone.listen(LISTEN_WINDOW).into_text() else {
                continue;
            };
            println!("You: {text}");
            relay_answer(&controller, &text);
        }
    })
}

/// Read answers from stdin; the thread is detached since reads cannot be interrupted
fn spawn_stdin(controller: Arc<InterviewController>) -> Result<()> {
    std::thread::Builder::new()
        .name("stdin-relay".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if !controller.session().is_active() {
                    break;
                }
                relay_answer(&controller, &line);
            }
        })
        .map(drop)
        .map_err(|e| Error::Worker(format!("failed to spawn stdin relay: {e}")))
}

fn relay_answer(controller: &InterviewController, text: &str) {
    match controller.submit_answer(text) {
        Ok(Delivery::Delivered) => {}
        Ok(Delivery::Dropped(reason)) => tracing::debug!(?reason, "answer not accepted"),
        Err(e) => tracing::warn!(error = %e, "answer not delivered"),
    }
}
