//! Local microphone answers: capture, segment, transcribe

use std::time::{Duration, Instant};

use super::capture::{AudioCapture, samples_to_wav};
use super::stt::SpeechToText;
use super::utterance::UtteranceDetector;
use super::{Heard, SpeechInput};
use crate::bridge::Blocking;

/// How often the capture buffer is drained
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Hears answers through the default microphone
///
/// Holds a live input stream, so it must stay on the thread that built it.
pub struct MicrophoneInput {
    capture: AudioCapture,
    detector: UtteranceDetector,
    stt: Blocking<SpeechToText>,
}

impl MicrophoneInput {
    /// Open the microphone
    ///
    /// # Errors
    ///
    /// Returns error if no input device is available
    pub fn new(stt: Blocking<SpeechToText>) -> crate::Result<Self> {
        Ok(Self {
            capture: AudioCapture::new()?,
            detector: UtteranceDetector::new(),
            stt,
        })
    }

    fn transcribe(&self, samples: &[f32]) -> Heard {
        let wav = match samples_to_wav(samples, self.capture.sample_rate()) {
            Ok(wav) => wav,
            Err(e) => return Heard::TransportError(e.to_string()),
        };

        match self.stt.run(self.stt.inner().transcribe(&wav, "audio/wav")) {
            Ok(text) if text.trim().is_empty() => Heard::Unrecognized,
            Ok(text) => Heard::Text(text),
            Err(e) => Heard::TransportError(e.to_string()),
        }
    }
}

impl SpeechInput for MicrophoneInput {
    fn listen(&mut self, timeout: Duration) -> Heard {
        if let Err(e) = self.capture.start() {
            return Heard::TransportError(e.to_string());
        }
        self.capture.clear_buffer();
        self.detector.reset();

        let deadline = Instant::now() + timeout;
        let heard = loop {
            // Let an utterance in progress finish past the deadline
            if Instant::now() >= deadline && !self.detector.is_speaking() {
                break Heard::TimedOut;
            }

            std::thread::sleep(POLL_INTERVAL);
            let chunk = self.capture.take_buffer();
            if chunk.is_empty() {
                continue;
            }

            if self.detector.process(&chunk) {
                let utterance = self.detector.take_utterance();
                self.capture.stop();
                break self.transcribe(&utterance);
            }
        };

        self.capture.stop();
        tracing::debug!(?heard, "listen finished");
        heard
    }
}
