//! Voice processing
//!
//! Capability traits for speaking and hearing, plus the concrete pieces:
//! vendor STT/TTS clients, microphone capture with utterance segmentation,
//! and speaker playback.

mod capture;
mod microphone;
mod playback;
mod stt;
mod tts;
mod utterance;

use std::time::Duration;

pub use capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
pub use microphone::MicrophoneInput;
pub use playback::{AudioPlayback, PLAYBACK_SAMPLE_RATE, decode_mp3, resample};
pub use stt::SpeechToText;
pub use tts::TextToSpeech;
pub use utterance::{SegmentState, UtteranceDetector, calculate_energy};

use crate::Result;

/// Turns interviewer lines into audio
pub trait SpeechOutput: Send + Sync {
    /// Synthesize `text` as MP3
    ///
    /// `Ok(None)` means text-only output.
    ///
    /// # Errors
    ///
    /// Returns error if synthesis was attempted and failed
    fn synthesize(&self, text: &str) -> Result<Option<Vec<u8>>>;
}

/// Text-only speech output
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl SpeechOutput for Silent {
    fn synthesize(&self, _text: &str) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }
}

/// Outcome of listening for an answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Heard {
    Text(String),
    /// Nothing was said before the timeout
    TimedOut,
    /// Speech was captured but not understood
    Unrecognized,
    /// Capture or transcription failed
    TransportError(String),
}

impl Heard {
    /// The transcript, if anything usable was heard
    #[must_use]
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text),
            Self::TimedOut | Self::Unrecognized | Self::TransportError(_) => None,
        }
    }
}

/// Listens for a spoken answer
pub trait SpeechInput {
    /// Block up to `timeout` for one utterance
    fn listen(&mut self, timeout: Duration) -> Heard;
}
