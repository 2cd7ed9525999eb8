//! Error types for the interview gateway

use thiserror::Error;

/// Result type alias for interview gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the interview gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// An interview is already running
    #[error("interview already in progress")]
    AlreadyActive,

    /// `initialize()` has not been called yet
    #[error("interview not initialized")]
    NotInitialized,

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Text generation error
    #[error("generation error: {0}")]
    Generation(String),

    /// Client transport error
    #[error("transport error: {0}")]
    Transport(String),

    /// Background thread could not be spawned or joined
    #[error("worker error: {0}")]
    Worker(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
