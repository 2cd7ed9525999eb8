//! Energy-based utterance segmentation
//!
//! Accumulates microphone samples once speech starts and reports a complete
//! utterance after enough speech followed by a stretch of silence.

/// Minimum RMS energy to consider a chunk speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum utterance length (in samples at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800; // 0.3 seconds

/// Trailing silence that ends an utterance (in samples)
const SILENCE_SAMPLES: usize = 24_000; // 1.5 seconds

/// Segmenter state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    /// Waiting for speech
    Idle,
    /// Speech started, accumulating
    Speaking,
}

/// Splits a sample stream into utterances
pub struct UtteranceDetector {
    state: SegmentState,
    threshold: f32,
    speech_buffer: Vec<f32>,
    silence_counter: usize,
}

impl Default for UtteranceDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl UtteranceDetector {
    #[must_use]
    pub const fn new() -> Self {
        Self::with_threshold(ENERGY_THRESHOLD)
    }

    /// Detector with a custom energy threshold
    #[must_use]
    pub const fn with_threshold(threshold: f32) -> Self {
        Self {
            state: SegmentState::Idle,
            threshold,
            speech_buffer: Vec::new(),
            silence_counter: 0,
        }
    }

    /// Feed samples; returns true once an utterance is complete
    pub fn process(&mut self, samples: &[f32]) -> bool {
        let energy = calculate_energy(samples);
        let is_speech = energy > self.threshold;

        match self.state {
            SegmentState::Idle => {
                if is_speech {
                    self.state = SegmentState::Speaking;
                    self.speech_buffer.clear();
                    self.speech_buffer.extend_from_slice(samples);
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech started");
                }
                false
            }
            SegmentState::Speaking => {
                self.speech_buffer.extend_from_slice(samples);

                if is_speech {
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                if self.is_complete() {
                    tracing::debug!(samples = self.speech_buffer.len(), "utterance complete");
                    return true;
                }

                // Too short to be an answer: a cough or a click
                if self.silence_counter > SILENCE_SAMPLES
                    && self.speech_buffer.len().saturating_sub(self.silence_counter)
                        <= MIN_SPEECH_SAMPLES
                {
                    tracing::trace!("discarding short noise burst");
                    self.reset();
                }
                false
            }
        }
    }

    /// Whether the buffered speech forms a complete utterance
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == SegmentState::Speaking
            && self.silence_counter > SILENCE_SAMPLES
            && self.speech_buffer.len().saturating_sub(self.silence_counter) > MIN_SPEECH_SAMPLES
    }

    /// Take the buffered utterance and return to idle
    pub fn take_utterance(&mut self) -> Vec<f32> {
        let utterance = std::mem::take(&mut self.speech_buffer);
        self.reset();
        utterance
    }

    #[must_use]
    pub const fn state(&self) -> SegmentState {
        self.state
    }

    /// Whether speech has started and not yet completed
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.state == SegmentState::Speaking
    }

    pub fn reset(&mut self) {
        self.state = SegmentState::Idle;
        self.speech_buffer.clear();
        self.silence_counter = 0;
    }
}

/// RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_calculation() {
        let silence = vec![0.0f32; 100];
        assert!(calculate_energy(&silence) < 0.001);

        let loud = vec![0.5f32; 100];
        assert!(calculate_energy(&loud) > 0.4);

        assert!(calculate_energy(&[]).abs() < f32::EPSILON);
    }

    #[test]
    fn silence_stays_idle() {
        let mut detector = UtteranceDetector::new();
        assert!(!detector.process(&vec![0.0; 16_000]));
        assert_eq!(detector.state(), SegmentState::Idle);
    }

    #[test]
    fn speech_then_silence_completes() {
        let mut detector = UtteranceDetector::new();
        assert!(!detector.process(&vec![0.2; 16_000]));
        assert!(detector.is_speaking());

        let mut complete = false;
        for _ in 0..4 {
            complete |= detector.process(&vec![0.0; 8_000]);
        }
        assert!(complete);

        let utterance = detector.take_utterance();
        assert!(utterance.len() > 16_000);
        assert_eq!(detector.state(), SegmentState::Idle);
    }

    #[test]
    fn short_burst_is_discarded() {
        let mut detector = UtteranceDetector::new();
        detector.process(&vec![0.2; 1_600]);
        for _ in 0..4 {
            assert!(!detector.process(&vec![0.0; 8_000]));
        }
        assert_eq!(detector.state(), SegmentState::Idle);
    }
}
