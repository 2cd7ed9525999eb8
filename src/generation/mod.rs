//! Question and feedback generation

mod gemini;

pub use gemini::GeminiClient;

use crate::{Error, Result};

/// Produces free text from a prompt
///
/// Called from the interview thread; implementations may block.
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `prompt`
    ///
    /// # Errors
    ///
    /// Returns error if the backend is unreachable or returns nothing usable
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// Generator used when no backend is configured; every call fails
#[derive(Debug, Default, Clone, Copy)]
pub struct NoGenerator;

impl TextGenerator for NoGenerator {
    fn generate(&self, _prompt: &str) -> Result<String> {
        Err(Error::Generation("no text generator configured".to_string()))
    }
}
