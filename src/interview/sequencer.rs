//! Turn sequencer: drives one interview from greeting to farewell
//!
//! Runs on its own thread. Every step checks the session's `active` flag, and
//! the gate is the only place it blocks for long; closing the gate or clearing
//! the flag unwinds the run to the cleanup path.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use super::gate::Response;
use super::script;
use super::session::{Phase, Role, Session};
use super::tone;
use super::warnings::{Category, Severity, WarningNotice};
use crate::config::InterviewConfig;
use crate::generation::TextGenerator;
use crate::transport::{AssistantMessage, EndReason, InterviewSummary, Transport};
use crate::voice::SpeechOutput;

/// The session stopped; unwind to cleanup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Interrupted;

type Flow<T> = std::result::Result<T, Interrupted>;

/// Collaborators the sequencer talks to
#[derive(Clone)]
pub struct Collaborators {
    pub speech: Arc<dyn SpeechOutput>,
    pub generator: Arc<dyn TextGenerator>,
    pub transport: Arc<dyn Transport>,
}

/// Drives a single interview run
pub struct TurnSequencer {
    session: Arc<Session>,
    config: InterviewConfig,
    collaborators: Collaborators,
}

impl TurnSequencer {
    #[must_use]
    pub const fn new(
        session: Arc<Session>,
        config: InterviewConfig,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            session,
            config,
            collaborators,
        }
    }

    /// Run the interview to completion or cancellation
    ///
    /// Always finishes in [`Phase::Ended`] with a completion notice. A panic in
    /// the script is caught here, logged, and reported as a technical issue.
    pub fn run(self) {
        tracing::info!(max_turns = self.session.max_turns(), "interview started");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.conduct()));
        let reason = match outcome {
            Ok(Ok(())) => EndReason::Completed,
            Ok(Err(Interrupted)) if self.session.warnings().escalated() => EndReason::Terminated,
            Ok(Err(Interrupted)) => EndReason::Cancelled,
            Err(payload) => {
                let detail = payload
                    .downcast_ref::<&str>()
                    .map(ToString::to_string)
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(error = %detail, "interview driver failed");
                self.session.set_active(false);
                self.announce(script::TECHNICAL_ISSUE, false);
                EndReason::Failed
            }
        };

        self.finish(reason);
    }

    fn conduct(&self) -> Flow<()> {
        self.introduction()?;
        self.questions()?;
        self.conclusion()
    }

    fn introduction(&self) -> Flow<()> {
        self.enter(Phase::Introduction)?;
        self.speak(script::GREETING)?;

        if let Some(answer) = self.ask(script::DAY_CHECK)? {
            self.session.push(Role::User, answer);
            self.speak(script::DAY_ACK)?;
        }

        match self.ask(script::INTRO_REQUEST)? {
            Some(intro) if script::word_count(&intro) >= self.config.min_intro_words => {
                self.session.push(Role::User, intro);
                self.speak(script::INTRO_ACK)
            }
            _ => self.speak(script::INTRO_SHORT_ACK),
        }
    }

    fn questions(&self) -> Flow<()> {
        self.enter(Phase::Questions)?;

        loop {
            let turn = self.session.turn_index();
            if turn >= self.session.max_turns() {
                return Ok(());
            }
            self.ensure_active()?;

            self.session
                .trim_history(self.config.history_limit, self.config.history_keep);

            let question = self.next_question(turn);
            self.session.set_last_question(&question);
            tracing::info!(turn = turn + 1, question = %question, "asking question");

            match self.ask(&question)? {
                Some(answer) if self.is_substantive(&answer) => {
                    self.record_exchange(&question, answer.clone());
                    let remark = self
                        .generate(&script::feedback_prompt(&answer))
                        .unwrap_or_else(|| script::FEEDBACK_FALLBACK.to_string());
                    self.speak(&remark)?;
                }
                _ => match self.ask(script::CLARIFY)? {
                    Some(answer) if self.is_substantive(&answer) => {
                        self.record_exchange(&question, answer);
                        self.speak(script::CLARIFY_ACK)?;
                    }
                    _ => {
                        tracing::info!(turn = turn + 1, "no usable answer, moving on");
                        self.speak(script::MOVE_ON)?;
                    }
                },
            }

            if self.session.advance_turn() < self.session.max_turns() {
                self.pause(self.config.turn_pause)?;
            }
        }
    }

    fn conclusion(&self) -> Flow<()> {
        self.enter(Phase::Conclusion)?;
        self.speak(script::CONCLUSION)?;

        if let Some(questions) = self.ask(script::ANY_QUESTIONS)? {
            self.session.push(Role::User, questions);
            self.speak(script::QUESTIONS_ACK)?;
        } else {
            self.speak(script::NO_QUESTIONS_ACK)?;
        }

        self.speak(script::FAREWELL)
    }

    /// Generated question for `turn`, or the scripted fallback
    fn next_question(&self, turn: usize) -> String {
        let context = self.session.recent(self.config.context_entries);
        let last = self.session.last_question();

        match self.generate(&script::question_prompt(&context)) {
            Some(question) if last.as_deref() != Some(question.as_str()) => question,
            Some(_) => {
                tracing::debug!(turn, "generated a repeat, using fallback");
                script::fallback_question(turn).to_string()
            }
            None => script::fallback_question(turn).to_string(),
        }
    }

    /// Ask the generator, retrying a bounded number of times
    fn generate(&self, prompt: &str) -> Option<String> {
        let attempts = self.config.generation_attempts.max(1);

        for attempt in 1..=attempts {
            match self.collaborators.generator.generate(prompt) {
                Ok(text) => {
                    let text = script::clean_generated(&text);
                    if !text.is_empty() {
                        return Some(text);
                    }
                    tracing::warn!(attempt, "generator returned blank text");
                }
                Err(e) => tracing::warn!(attempt, error = %e, "generation failed"),
            }

            if attempt < attempts && !self.session.pause(self.config.generation_retry_delay) {
                return None;
            }
        }

        None
    }

    /// Speak `question` and wait for the answer
    ///
    /// `Ok(None)` means the candidate did not answer in time.
    fn ask(&self, question: &str) -> Flow<Option<String>> {
        self.ensure_active()?;
        self.announce(question, true);

        let timeout = self.config.answer_timeout;
        let turn = self.session.gate().begin(question, timeout);
        self.collaborators
            .transport
            .notify_waiting(true, Some(timeout));
        let response = turn.wait();
        self.collaborators.transport.notify_waiting(false, None);

        match response {
            Response::Answer(answer) => {
                tracing::debug!(chars = answer.len(), "answer received");
                self.screen_tone(&answer)?;
                Ok(Some(answer))
            }
            Response::TimedOut => {
                tracing::info!(
                    timeout_secs = timeout.as_secs(),
                    "no answer before timeout"
                );
                Ok(None)
            }
            Response::Released => Err(Interrupted),
        }
    }

    fn screen_tone(&self, answer: &str) -> Flow<()> {
        let Some(detected) = tone::detect(answer) else {
            return Ok(());
        };

        let recorded = self.session.warnings().record(Category::Tone);
        tracing::info!(tone = ?detected, count = recorded.category_count, "unprofessional tone");

        let remark = detected.response(recorded.category_count);
        self.collaborators.transport.notify_warning(&WarningNotice {
            kind: "tone".to_string(),
            message: remark.to_string(),
            severity: Severity::Info,
            count: recorded.category_count,
            max: tone::FIRM_REMINDER_AFTER,
        });
        self.speak(remark)
    }

    fn speak(&self, text: &str) -> Flow<()> {
        self.ensure_active()?;
        self.announce(text, false);
        self.pause(self.config.speak_pause_for(text))
    }

    /// Synthesize and emit a line; synthesis failures degrade to text
    fn announce(&self, text: &str, interruptible: bool) {
        let audio = match self.collaborators.speech.synthesize(text) {
            Ok(audio) => audio.map(|bytes| BASE64.encode(bytes)),
            Err(e) => {
                tracing::warn!(error = %e, "speech synthesis failed, sending text only");
                None
            }
        };

        self.collaborators.transport.notify_message(AssistantMessage {
            text: text.to_string(),
            audio,
            interruptible,
            timestamp: chrono::Utc::now(),
        });
    }

    fn record_exchange(&self, question: &str, answer: String) {
        self.session.push(Role::Assistant, question);
        self.session.push(Role::User, answer);
    }

    fn is_substantive(&self, answer: &str) -> bool {
        script::word_count(answer) >= self.config.min_answer_words
    }

    fn enter(&self, phase: Phase) -> Flow<()> {
        self.ensure_active()?;
        tracing::debug!(?phase, "entering phase");
        self.session.set_phase(phase);
        self.collaborators.transport.notify_phase(phase);
        Ok(())
    }

    fn pause(&self, duration: Duration) -> Flow<()> {
        if self.session.pause(duration) {
            Ok(())
        } else {
            Err(Interrupted)
        }
    }

    fn ensure_active(&self) -> Flow<()> {
        if self.session.is_active() {
            Ok(())
        } else {
            Err(Interrupted)
        }
    }

    fn finish(&self, reason: EndReason) {
        self.session.set_active(false);
        self.session.set_monitoring(false);
        self.session.set_phase(Phase::Ended);

        let transport = &self.collaborators.transport;
        transport.notify_waiting(false, None);
        transport.notify_phase(Phase::Ended);
        transport.notify_complete(InterviewSummary {
            reason,
            message: reason.message().to_string(),
            questions_asked: self.session.turn_index(),
            conversation_history: self.session.history(),
        });

        tracing::info!(?reason, turns = self.session.turn_index(), "interview finished");
    }
}
