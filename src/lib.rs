//! Interview Gateway - voice-driven mock sales interviews
//!
//! This library provides the interview engine and its two front ends:
//! - Turn-by-turn interview driver with a single-slot answer gate
//! - Presence and focus watchers with escalating warnings
//! - Speech synthesis, transcription and question generation over HTTP
//! - Browser client over HTTP/WebSocket, or a local console session
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Front ends                        │
//! │   Browser (HTTP + WebSocket)  │  Console (mic/stdin) │
//! └────────────────────┬────────────────────────────────┘
//!                      │ start / answer / end
//! ┌────────────────────▼────────────────────────────────┐
//! │               Interview Controller                   │
//! │  Sequencer thread │ Response gate │ Watcher threads │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Vendor clients                       │
//! │   Gemini (questions)  │  STT  │  TTS                 │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod bridge;
pub mod config;
pub mod error;
pub mod generation;
pub mod interview;
pub mod local;
pub mod monitor;
pub mod transport;
pub mod voice;

pub use config::Config;
pub use error::{Error, Result};
pub use interview::{InterviewController, ResponseGate, Session, TurnSequencer};
pub use transport::{InterviewEvent, Transport};
