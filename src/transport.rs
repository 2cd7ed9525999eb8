//! Outbound interview events and the transport seam
//!
//! The sequencer and watchers report through a [`Transport`]; the WebSocket
//! hub and the console front end are the two implementations.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::Result;
use crate::interview::{HistoryEntry, Phase, WarningNotice};

/// A line spoken by the interviewer
#[derive(Debug, Clone, Serialize)]
pub struct AssistantMessage {
    pub text: String,
    /// Base64 MP3, absent when synthesis was unavailable
    pub audio: Option<String>,
    /// Whether the candidate is expected to answer this line
    pub interruptible: bool,
    pub timestamp: DateTime<Utc>,
}

/// How an interview ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The script ran to the farewell
    Completed,
    /// Stopped by `end()` or `reset()`
    Cancelled,
    /// Ended by the violation threshold
    Terminated,
    /// The driver thread failed
    Failed,
}

impl EndReason {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Completed => "Interview completed successfully!",
            Self::Cancelled => "Interview ended.",
            Self::Terminated => "Interview terminated after repeated policy violations.",
            Self::Failed => "Interview stopped after a technical issue.",
        }
    }
}

/// Final report of an interview
#[derive(Debug, Clone, Serialize)]
pub struct InterviewSummary {
    pub reason: EndReason,
    pub message: String,
    pub questions_asked: usize,
    pub conversation_history: Vec<HistoryEntry>,
}

/// Event emitted by the interview machinery
#[derive(Debug, Clone)]
pub enum InterviewEvent {
    Phase(Phase),
    Message(AssistantMessage),
    Waiting {
        waiting: bool,
        timeout: Option<Duration>,
    },
    Warning(WarningNotice),
    Complete(InterviewSummary),
}

/// Delivers interview events to the candidate
///
/// Failures never interrupt the interview: the `notify_*` helpers log and move on.
pub trait Transport: Send + Sync {
    /// Deliver one event
    ///
    /// # Errors
    ///
    /// Returns error if the event could not be delivered
    fn send(&self, event: InterviewEvent) -> Result<()>;

    fn notify_phase(&self, phase: Phase) {
        dispatch(self, InterviewEvent::Phase(phase));
    }

    fn notify_message(&self, message: AssistantMessage) {
        dispatch(self, InterviewEvent::Message(message));
    }

    fn notify_waiting(&self, waiting: bool, timeout: Option<Duration>) {
        dispatch(self, InterviewEvent::Waiting { waiting, timeout });
    }

    fn notify_warning(&self, notice: &WarningNotice) {
        dispatch(self, InterviewEvent::Warning(notice.clone()));
    }

    fn notify_complete(&self, summary: InterviewSummary) {
        dispatch(self, InterviewEvent::Complete(summary));
    }
}

fn dispatch<T: Transport + ?Sized>(transport: &T, event: InterviewEvent) {
    if let Err(e) = transport.send(event) {
        tracing::warn!(error = %e, "transport notification failed");
    }
}

/// Transport that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn send(&self, event: InterviewEvent) -> Result<()> {
        tracing::trace!(?event, "discarding interview event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct Failing(Mutex<usize>);

    impl Transport for Failing {
        fn send(&self, _event: InterviewEvent) -> Result<()> {
            *self.0.lock().unwrap() += 1;
            Err(crate::Error::Transport("client gone".to_string()))
        }
    }

    #[test]
    fn failures_are_swallowed() {
        let transport = Failing(Mutex::new(0));
        transport.notify_phase(Phase::Introduction);
        transport.notify_waiting(true, Some(Duration::from_secs(60)));
        assert_eq!(*transport.0.lock().unwrap(), 2);
    }

    #[test]
    fn end_reason_serializes() {
        assert_eq!(
            serde_json::to_string(&EndReason::Terminated).unwrap(),
            "\"terminated\""
        );
    }
}
