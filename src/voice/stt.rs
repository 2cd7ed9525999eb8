//! Speech-to-text (STT) clients

use crate::config::{ApiKeys, SttBackend, VoiceConfig};
use crate::{Error, Result};

/// Response from OpenAI Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Response from Deepgram transcription API
#[derive(serde::Deserialize)]
struct DeepgramResponse {
    results: DeepgramResults,
}

#[derive(serde::Deserialize)]
struct DeepgramResults {
    channels: Vec<DeepgramChannel>,
}

#[derive(serde::Deserialize)]
struct DeepgramChannel {
    alternatives: Vec<DeepgramAlternative>,
}

#[derive(serde::Deserialize)]
struct DeepgramAlternative {
    transcript: String,
}

impl DeepgramResponse {
    fn transcript(self) -> String {
        self.results
            .channels
            .into_iter()
            .next()
            .and_then(|c| c.alternatives.into_iter().next())
            .map(|a| a.transcript)
            .unwrap_or_default()
    }
}

/// Upload file name for a MIME type; Whisper infers the codec from the extension
fn file_name_for(mime: &str) -> &'static str {
    match mime.split(';').next().unwrap_or_default().trim() {
        "audio/webm" | "video/webm" => "answer.webm",
        "audio/ogg" => "answer.ogg",
        "audio/mpeg" | "audio/mp3" => "answer.mp3",
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" => "answer.m4a",
        _ => "answer.wav",
    }
}

/// Transcribes candidate speech
pub struct SpeechToText {
    client: reqwest::Client,
    api_key: String,
    model: String,
    provider: SttBackend,
}

impl SpeechToText {
    /// Build the configured STT backend
    ///
    /// # Errors
    ///
    /// Returns error if the backend's API key is missing
    pub fn from_config(voice: &VoiceConfig, keys: &ApiKeys) -> Result<Self> {
        match voice.stt_provider {
            SttBackend::Whisper => Self::new_whisper(
                keys.openai.clone().unwrap_or_default(),
                voice.stt_model.clone(),
            ),
            SttBackend::Deepgram => Self::new_deepgram(
                keys.deepgram.clone().unwrap_or_default(),
                voice.stt_model.clone(),
            ),
        }
    }

    /// Create a new STT instance using `OpenAI` Whisper
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_whisper(api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for Whisper".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            provider: SttBackend::Whisper,
        })
    }

    /// Create a new STT instance using Deepgram
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_deepgram(api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("Deepgram API key required".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            provider: SttBackend::Deepgram,
        })
    }

    #[must_use]
    pub const fn provider(&self) -> SttBackend {
        self.provider
    }

    /// Transcribe an audio clip
    ///
    /// `mime` is the clip's content type (`audio/wav` from the microphone,
    /// usually `audio/webm` from browsers).
    ///
    /// # Errors
    ///
    /// Returns error if transcription fails
    pub async fn transcribe(&self, audio: &[u8], mime: &str) -> Result<String> {
        match self.provider {
            SttBackend::Whisper => self.transcribe_whisper(audio, mime).await,
            SttBackend::Deepgram => self.transcribe_deepgram(audio, mime).await,
        }
    }

    async fn transcribe_whisper(&self, audio: &[u8], mime: &str) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), mime, "starting Whisper transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name(file_name_for(mime))
                    .mime_str(mime)
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone());

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/transcriptions")
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Whisper request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await?;
        tracing::info!(transcript = %result.text, "transcription complete");
        Ok(result.text.trim().to_string())
    }

    async fn transcribe_deepgram(&self, audio: &[u8], mime: &str) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), mime, "starting Deepgram transcription");

        let url = format!(
            "https://api.deepgram.com/v1/listen?model={}&punctuate=true",
            self.model
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", mime)
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Deepgram request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Deepgram API error");
            return Err(Error::Stt(format!("Deepgram API error {status}: {body}")));
        }

        let result: DeepgramResponse = response.json().await?;
        let transcript = result.transcript();

        tracing::info!(transcript = %transcript, "transcription complete");
        Ok(transcript.trim().to_string())
    }
}
