//! Blocking adapters for the async vendor clients
//!
//! The interview driver runs on plain OS threads; these wrappers run the
//! async HTTP clients on the shared tokio runtime and wait for the result.
//! Never call them from inside an async task.

use std::future::Future;
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::Config;
use crate::generation::{GeminiClient, NoGenerator, TextGenerator};
use crate::voice::{Silent, SpeechOutput, SpeechToText, TextToSpeech};
use crate::{Error, Result};

/// An async client driven to completion from a blocking thread
pub struct Blocking<T> {
    inner: Arc<T>,
    handle: Handle,
}

impl<T> Clone for Blocking<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            handle: self.handle.clone(),
        }
    }
}

impl<T> Blocking<T> {
    pub fn new(inner: T, handle: Handle) -> Self {
        Self {
            inner: Arc::new(inner),
            handle,
        }
    }

    /// Wrap `inner` using the runtime of the calling context
    ///
    /// # Errors
    ///
    /// Returns error when called outside a tokio runtime
    pub fn current(inner: T) -> Result<Self> {
        let handle = Handle::try_current()
            .map_err(|e| Error::Config(format!("no async runtime available: {e}")))?;
        Ok(Self::new(inner, handle))
    }

    #[must_use]
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Shared handle to the wrapped client, for async callers
    #[must_use]
    pub fn shared(&self) -> Arc<T> {
        Arc::clone(&self.inner)
    }

    /// Block the current thread on `future`
    pub fn run<F: Future>(&self, future: F) -> F::Output {
        self.handle.block_on(future)
    }
}

impl TextGenerator for Blocking<GeminiClient> {
    fn generate(&self, prompt: &str) -> Result<String> {
        self.run(self.inner.generate(prompt))
    }
}

impl SpeechOutput for Blocking<TextToSpeech> {
    fn synthesize(&self, text: &str) -> Result<Option<Vec<u8>>> {
        self.run(self.inner.synthesize(text)).map(Some)
    }
}

/// Question generator for `config`, or [`NoGenerator`] without a Gemini key
#[must_use]
pub fn generator(config: &Config, handle: &Handle) -> Arc<dyn TextGenerator> {
    let key = config.api_keys.gemini.clone().unwrap_or_default();
    match GeminiClient::new(key, config.llm.model.clone()) {
        Ok(client) => {
            tracing::info!(model = client.model(), "question generation enabled");
            Arc::new(Blocking::new(client, handle.clone()))
        }
        Err(e) => {
            tracing::warn!(error = %e, "question generation unavailable, using scripted questions");
            Arc::new(NoGenerator)
        }
    }
}

/// Speech synthesis for `config`
///
/// Returns the blocking adapter for the interview driver plus the shared
/// async client, or [`Silent`] and `None` when no key is configured.
#[must_use]
pub fn speech(config: &Config, handle: &Handle) -> (Arc<dyn SpeechOutput>, Option<Arc<TextToSpeech>>) {
    match TextToSpeech::from_config(&config.voice, &config.api_keys) {
        Ok(tts) => {
            let blocking = Blocking::new(tts, handle.clone());
            let shared = blocking.shared();
            (Arc::new(blocking), Some(shared))
        }
        Err(e) => {
            tracing::warn!(error = %e, "speech synthesis unavailable, sending text only");
            (Arc::new(Silent), None)
        }
    }
}

/// Transcription client for `config`, if its key is configured
#[must_use]
pub fn transcriber(config: &Config) -> Option<SpeechToText> {
    SpeechToText::from_config(&config.voice, &config.api_keys)
        .inspect_err(|e| tracing::warn!(error = %e, "transcription unavailable"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_future_from_plain_thread() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let blocking = Blocking::new(21_u32, runtime.handle().clone());

        let doubled = std::thread::spawn(move || {
            let value = *blocking.inner();
            blocking.run(async move { value * 2 })
        })
        .join()
        .unwrap();

        assert_eq!(doubled, 42);
    }

    #[test]
    fn current_requires_runtime() {
        assert!(Blocking::current(()).is_err());
    }

    #[test]
    fn missing_keys_degrade() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let config = Config::default();

        let generator = generator(&config, runtime.handle());
        assert!(generator.generate("anything").is_err());

        let (speech, shared) = speech(&config, runtime.handle());
        assert!(shared.is_none());
        assert_eq!(speech.synthesize("hello").unwrap(), None);

        assert!(transcriber(&config).is_none());
    }
}
