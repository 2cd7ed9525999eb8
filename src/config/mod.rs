//! Configuration management for the interview gateway
//!
//! Values resolve as environment > config file > built-in default.

pub mod file;

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::Result;
use file::ConfigFile;

/// Default Gemini model used for question generation
pub const DEFAULT_LLM_MODEL: &str = "gemini-2.0-flash";

/// Default HTTP port for the browser client
pub const DEFAULT_PORT: u16 = 8000;

/// Interview gateway configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Interview flow
    pub interview: InterviewConfig,

    /// Presence and focus watchers
    pub monitoring: MonitoringConfig,

    /// Voice configuration
    pub voice: VoiceConfig,

    /// Question generation
    pub llm: LlmConfig,

    /// API keys
    pub api_keys: ApiKeys,

    /// HTTP API server configuration
    pub api_server: ApiServerConfig,
}

/// Pacing and limits of the interview script
#[derive(Debug, Clone)]
pub struct InterviewConfig {
    /// Topic questions per interview
    pub max_turns: usize,

    /// How long a question waits for an answer
    pub answer_timeout: Duration,

    /// Words needed for a topic answer to be accepted
    pub min_answer_words: usize,

    /// Words needed for the self-introduction to be acknowledged
    pub min_intro_words: usize,

    /// History length that triggers trimming
    pub history_limit: usize,

    /// Most recent entries kept when trimming
    pub history_keep: usize,

    /// History entries handed to the generator as context
    pub context_entries: usize,

    /// Pause between questions
    pub turn_pause: Duration,

    /// Fixed pause after each spoken line
    pub speak_pause: Duration,

    /// Additional pause per spoken word
    pub speak_pause_per_word: Duration,

    /// Bounded wait for background threads on shutdown
    pub join_timeout: Duration,

    /// Attempts per generation request
    pub generation_attempts: u32,

    /// Pause between generation attempts
    pub generation_retry_delay: Duration,
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            max_turns: 7,
            answer_timeout: Duration::from_secs(60),
            min_answer_words: 3,
            min_intro_words: 4,
            history_limit: 15,
            history_keep: 8,
            context_entries: 4,
            turn_pause: Duration::from_secs(1),
            speak_pause: Duration::from_millis(1500),
            speak_pause_per_word: Duration::from_millis(350),
            join_timeout: Duration::from_secs(3),
            generation_attempts: 3,
            generation_retry_delay: Duration::from_secs(1),
        }
    }
}

impl InterviewConfig {
    /// Pause after speaking `text`, proportional to its length
    #[must_use]
    pub fn speak_pause_for(&self, text: &str) -> Duration {
        let words = u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX);
        self.speak_pause + self.speak_pause_per_word.saturating_mul(words)
    }
}

/// Monitoring watcher configuration
#[derive(Debug, Clone)]
pub struct MonitoringConfig {
    /// Spawn watcher threads at all
    pub enabled: bool,

    /// Violation total that ends the session
    pub escalation_threshold: u32,

    /// Presence poll interval
    pub presence_interval: Duration,

    /// Time without a face before a warning
    pub no_face_grace: Duration,

    /// Focus poll interval
    pub focus_interval: Duration,

    /// Time before a focus warning may repeat while still away
    pub focus_cooldown: Duration,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            escalation_threshold: 3,
            presence_interval: Duration::from_secs(1),
            no_face_grace: Duration::from_secs(20),
            focus_interval: Duration::from_secs(3),
            focus_cooldown: Duration::from_secs(5),
        }
    }
}

/// Speech-to-text backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SttBackend {
    #[default]
    Whisper,
    Deepgram,
}

impl FromStr for SttBackend {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "whisper" | "openai" => Ok(Self::Whisper),
            "deepgram" => Ok(Self::Deepgram),
            other => Err(crate::Error::Config(format!("unknown STT provider: {other}"))),
        }
    }
}

/// Text-to-speech backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TtsBackend {
    #[default]
    OpenAi,
    ElevenLabs,
}

impl FromStr for TtsBackend {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "elevenlabs" => Ok(Self::ElevenLabs),
            other => Err(crate::Error::Config(format!("unknown TTS provider: {other}"))),
        }
    }
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// STT backend
    pub stt_provider: SttBackend,

    /// STT model (e.g. "whisper-1", "nova-2")
    pub stt_model: String,

    /// TTS backend
    pub tts_provider: TtsBackend,

    /// TTS model (e.g. "tts-1", "`eleven_monolingual_v1`")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            stt_provider: SttBackend::Whisper,
            stt_model: "whisper-1".to_string(),
            tts_provider: TtsBackend::OpenAi,
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            tts_speed: 1.0,
        }
    }
}

/// Question generation configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Gemini model identifier
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_LLM_MODEL.to_string(),
        }
    }
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// Google Gemini key (question generation)
    pub gemini: Option<String>,

    /// `OpenAI` key (Whisper and TTS)
    pub openai: Option<String>,

    /// `ElevenLabs` key (optional TTS)
    pub elevenlabs: Option<String>,

    /// `Deepgram` key (optional STT)
    pub deepgram: Option<String>,
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Path to static files directory (web UI)
    pub static_dir: Option<PathBuf>,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            static_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from the environment and the config file
    ///
    /// # Errors
    ///
    /// Returns error if a provider name is not recognized
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Self::resolve(fc, |key| std::env::var(key).ok())
    }

    /// Resolve configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a provider name is not recognized
    pub fn resolve(fc: ConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let api_keys = ApiKeys {
            gemini: non_empty(env("GEMINI_API_KEY")).or(fc.api_keys.gemini),
            openai: non_empty(env("OPENAI_API_KEY")).or(fc.api_keys.openai),
            elevenlabs: non_empty(env("ELEVENLABS_API_KEY")).or(fc.api_keys.elevenlabs),
            deepgram: non_empty(env("DEEPGRAM_API_KEY")).or(fc.api_keys.deepgram),
        };

        let fi = fc.interview;
        let di = defaults.interview;
        let interview = InterviewConfig {
            max_turns: parse_env(&env, "INTERVIEW_MAX_TURNS")
                .or(fi.max_turns)
                .unwrap_or(di.max_turns),
            answer_timeout: parse_env(&env, "INTERVIEW_ANSWER_TIMEOUT")
                .or(fi.answer_timeout_secs)
                .map_or(di.answer_timeout, Duration::from_secs),
            min_answer_words: fi.min_answer_words.unwrap_or(di.min_answer_words),
            min_intro_words: fi.min_intro_words.unwrap_or(di.min_intro_words),
            history_limit: fi.history_limit.unwrap_or(di.history_limit),
            history_keep: fi.history_keep.unwrap_or(di.history_keep),
            context_entries: di.context_entries,
            turn_pause: fi.turn_pause_ms.map_or(di.turn_pause, Duration::from_millis),
            speak_pause: fi.speak_pause_ms.map_or(di.speak_pause, Duration::from_millis),
            speak_pause_per_word: fi
                .speak_pause_per_word_ms
                .map_or(di.speak_pause_per_word, Duration::from_millis),
            join_timeout: fi.join_timeout_secs.map_or(di.join_timeout, Duration::from_secs),
            generation_attempts: fi
                .generation_attempts
                .unwrap_or(di.generation_attempts)
                .max(1),
            generation_retry_delay: fi
                .generation_retry_ms
                .map_or(di.generation_retry_delay, Duration::from_millis),
        };

        let fm = fc.monitoring;
        let dm = defaults.monitoring;
        let monitoring = MonitoringConfig {
            enabled: parse_env(&env, "INTERVIEW_MONITORING")
                .or(fm.enabled)
                .unwrap_or(dm.enabled),
            escalation_threshold: fm.escalation_threshold.unwrap_or(dm.escalation_threshold).max(1),
            presence_interval: fm
                .presence_interval_ms
                .map_or(dm.presence_interval, Duration::from_millis),
            no_face_grace: fm.no_face_grace_secs.map_or(dm.no_face_grace, Duration::from_secs),
            focus_interval: fm
                .focus_interval_ms
                .map_or(dm.focus_interval, Duration::from_millis),
            focus_cooldown: fm
                .focus_cooldown_secs
                .map_or(dm.focus_cooldown, Duration::from_secs),
        };

        let fv = fc.voice;
        let dv = defaults.voice;
        let stt_provider = match env("INTERVIEW_STT_PROVIDER").or(fv.stt_provider) {
            Some(name) => name.parse()?,
            None => dv.stt_provider,
        };
        let tts_provider = match env("INTERVIEW_TTS_PROVIDER").or(fv.tts_provider) {
            Some(name) => name.parse()?,
            None => dv.tts_provider,
        };
        let voice = VoiceConfig {
            stt_provider,
            stt_model: env("INTERVIEW_STT_MODEL")
                .or(fv.stt_model)
                .unwrap_or(dv.stt_model),
            tts_provider,
            tts_model: env("INTERVIEW_TTS_MODEL")
                .or(fv.tts_model)
                .unwrap_or(dv.tts_model),
            tts_voice: env("INTERVIEW_TTS_VOICE")
                .or(fv.tts_voice)
                .unwrap_or(dv.tts_voice),
            tts_speed: fv.tts_speed.unwrap_or(dv.tts_speed).clamp(0.25, 4.0),
        };

        let llm = LlmConfig {
            model: env("INTERVIEW_LLM_MODEL")
                .or(fc.llm.model)
                .unwrap_or(defaults.llm.model),
        };

        let api_server = ApiServerConfig {
            port: parse_env(&env, "INTERVIEW_PORT")
                .or(fc.server.port)
                .unwrap_or(defaults.api_server.port),
            static_dir: env("INTERVIEW_STATIC_DIR")
                .or(fc.server.static_dir)
                .map(PathBuf::from),
        };

        Ok(Self {
            interview,
            monitoring,
            voice,
            llm,
            api_keys,
            api_server,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parse an environment value, ignoring (and logging) malformed input
fn parse_env<T: FromStr>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = env(key)?;
    if let Ok(value) = raw.trim().parse() {
        Some(value)
    } else {
        tracing::warn!(key, value = %raw, "ignoring invalid environment value");
        None
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_sources() {
        let config = Config::resolve(ConfigFile::default(), env_from(&[])).unwrap();

        assert_eq!(config.interview.max_turns, 7);
        assert_eq!(config.interview.answer_timeout, Duration::from_secs(60));
        assert_eq!(config.interview.join_timeout, Duration::from_secs(3));
        assert_eq!(config.monitoring.escalation_threshold, 3);
        assert_eq!(config.api_server.port, DEFAULT_PORT);
        assert_eq!(config.llm.model, DEFAULT_LLM_MODEL);
        assert!(config.api_keys.gemini.is_none());
    }

    #[test]
    fn file_overrides_defaults() {
        let fc: ConfigFile = toml::from_str(
            r#"
            [interview]
            max_turns = 4
            answer_timeout_secs = 30

            [monitoring]
            escalation_threshold = 5

            [voice]
            tts_provider = "elevenlabs"
            tts_voice = "rachel"
            "#,
        )
        .unwrap();

        let config = Config::resolve(fc, env_from(&[])).unwrap();
        assert_eq!(config.interview.max_turns, 4);
        assert_eq!(config.interview.answer_timeout, Duration::from_secs(30));
        assert_eq!(config.monitoring.escalation_threshold, 5);
        assert_eq!(config.voice.tts_provider, TtsBackend::ElevenLabs);
        assert_eq!(config.voice.tts_voice, "rachel");
    }

    #[test]
    fn env_overrides_file() {
        let fc: ConfigFile = toml::from_str(
            r#"
            [server]
            port = 9000

            [api_keys]
            gemini = "from-file"
            "#,
        )
        .unwrap();

        let config = Config::resolve(
            fc,
            env_from(&[("INTERVIEW_PORT", "9100"), ("GEMINI_API_KEY", "from-env")]),
        )
        .unwrap();

        assert_eq!(config.api_server.port, 9100);
        assert_eq!(config.api_keys.gemini.as_deref(), Some("from-env"));
    }

    #[test]
    fn blank_env_key_does_not_mask_file_key() {
        let fc: ConfigFile = toml::from_str("[api_keys]\nopenai = \"sk-file\"\n").unwrap();
        let config = Config::resolve(fc, env_from(&[("OPENAI_API_KEY", "  ")])).unwrap();
        assert_eq!(config.api_keys.openai.as_deref(), Some("sk-file"));
    }

    #[test]
    fn malformed_env_value_is_ignored() {
        let config = Config::resolve(
            ConfigFile::default(),
            env_from(&[("INTERVIEW_MAX_TURNS", "seven")]),
        )
        .unwrap();
        assert_eq!(config.interview.max_turns, 7);
    }

    #[test]
    fn unknown_provider_is_an_error() {
        let result = Config::resolve(
            ConfigFile::default(),
            env_from(&[("INTERVIEW_STT_PROVIDER", "carrier-pigeon")]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn speak_pause_scales_with_words() {
        let config = InterviewConfig::default();
        assert_eq!(config.speak_pause_for(""), Duration::from_millis(1500));
        assert_eq!(
            config.speak_pause_for("one two three"),
            Duration::from_millis(1500 + 3 * 350)
        );
    }
}
