//! TOML configuration file loading
//!
//! Supports `~/.config/mock-interview/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    /// Interview pacing and script limits
    #[serde(default)]
    pub interview: InterviewFileConfig,

    /// Presence and focus monitoring
    #[serde(default)]
    pub monitoring: MonitoringFileConfig,

    /// Voice/audio configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Question generation configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerFileConfig,
}

/// Interview flow configuration
#[derive(Debug, Default, Deserialize)]
pub struct InterviewFileConfig {
    /// Number of topic questions per interview
    pub max_turns: Option<usize>,

    /// Seconds to wait for an answer before re-prompting
    pub answer_timeout_secs: Option<u64>,

    /// Minimum words for a topic answer to count
    pub min_answer_words: Option<usize>,

    /// Minimum words for the self-introduction to count
    pub min_intro_words: Option<usize>,

    /// History length that triggers trimming
    pub history_limit: Option<usize>,

    /// Entries kept after trimming
    pub history_keep: Option<usize>,

    /// Pause between questions, in milliseconds
    pub turn_pause_ms: Option<u64>,

    /// Fixed pause after speaking, in milliseconds
    pub speak_pause_ms: Option<u64>,

    /// Extra pause per spoken word, in milliseconds
    pub speak_pause_per_word_ms: Option<u64>,

    /// Seconds to wait for background threads on shutdown
    pub join_timeout_secs: Option<u64>,

    /// Attempts per generation request
    pub generation_attempts: Option<u32>,

    /// Pause between generation attempts, in milliseconds
    pub generation_retry_ms: Option<u64>,
}

/// Monitoring configuration
#[derive(Debug, Default, Deserialize)]
pub struct MonitoringFileConfig {
    /// Run the watchers at all
    pub enabled: Option<bool>,

    /// Violations that end the session
    pub escalation_threshold: Option<u32>,

    /// Presence poll interval, in milliseconds
    pub presence_interval_ms: Option<u64>,

    /// Seconds without a face before warning
    pub no_face_grace_secs: Option<u64>,

    /// Focus poll interval, in milliseconds
    pub focus_interval_ms: Option<u64>,

    /// Seconds before a focus warning may repeat
    pub focus_cooldown_secs: Option<u64>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// STT provider ("whisper" or "deepgram")
    pub stt_provider: Option<String>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// TTS provider ("openai" or "elevenlabs")
    pub tts_provider: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS voice identifier (e.g. "alloy")
    pub tts_voice: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f32>,
}

/// Question generation configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// Gemini model identifier
    pub model: Option<String>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub gemini: Option<String>,
    pub openai: Option<String>,
    pub elevenlabs: Option<String>,
    pub deepgram: Option<String>,
}

/// Server configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// API server port
    pub port: Option<u16>,

    /// Directory holding the browser client
    pub static_dir: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `ConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> ConfigFile {
    let Some(path) = config_file_path() else {
        return ConfigFile::default();
    };

    if !path.exists() {
        return ConfigFile::default();
    }

    load_config_file_from(&path)
}

/// Load a TOML config file from an explicit path
///
/// Read and parse failures are logged and yield defaults.
pub fn load_config_file_from(path: &Path) -> ConfigFile {
    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                ConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            ConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/mock-interview/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("mock-interview").join("config.toml"))
}
