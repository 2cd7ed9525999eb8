//! Live interview state shared by the controller, the sequencer and the watchers

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

use super::gate::ResponseGate;
use super::warnings::{WarningCounter, WarningTally};

/// Granularity of interruptible pauses
const PAUSE_SLICE: Duration = Duration::from_millis(50);

/// Interview phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Nothing started yet
    #[default]
    Idle,
    Introduction,
    Questions,
    Conclusion,
    Ended,
}

/// Speaker of a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Assistant,
    User,
}

/// One line of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Default)]
struct SessionState {
    phase: Phase,
    turn_index: usize,
    max_turns: usize,
    history: Vec<HistoryEntry>,
    last_question: Option<String>,
}

/// Point-in-time view of the session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub active: bool,
    pub monitoring_active: bool,
    pub phase: Phase,
    pub turn_index: usize,
    pub max_turns: usize,
    pub waiting_for_response: bool,
    pub history_len: usize,
    pub warnings: WarningTally,
}

/// The single live interview
pub struct Session {
    active: AtomicBool,
    monitoring_active: AtomicBool,
    state: Mutex<SessionState>,
    warnings: WarningCounter,
    gate: ResponseGate,
}

impl Session {
    #[must_use]
    pub fn new(max_turns: usize, escalation_threshold: u32) -> Self {
        Self {
            active: AtomicBool::new(false),
            monitoring_active: AtomicBool::new(false),
            state: Mutex::new(SessionState {
                max_turns,
                ..SessionState::default()
            }),
            warnings: WarningCounter::new(escalation_threshold),
            gate: ResponseGate::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_monitoring(&self) -> bool {
        self.is_active() && self.monitoring_active.load(Ordering::SeqCst)
    }

    pub fn set_monitoring(&self, monitoring: bool) {
        self.monitoring_active.store(monitoring, Ordering::SeqCst);
    }

    /// Stop everything: clear both flags and release any pending turn
    pub fn terminate(&self) {
        self.set_active(false);
        self.set_monitoring(false);
        self.gate.close();
    }

    #[must_use]
    pub const fn gate(&self) -> &ResponseGate {
        &self.gate
    }

    #[must_use]
    pub const fn warnings(&self) -> &WarningCounter {
        &self.warnings
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.state().phase
    }

    pub fn set_phase(&self, phase: Phase) {
        self.state().phase = phase;
    }

    #[must_use]
    pub fn turn_index(&self) -> usize {
        self.state().turn_index
    }

    #[must_use]
    pub fn max_turns(&self) -> usize {
        self.state().max_turns
    }

    /// Move to the next question and return the new index
    pub fn advance_turn(&self) -> usize {
        let mut state = self.state();
        state.turn_index += 1;
        state.turn_index
    }

    pub fn push(&self, role: Role, content: impl Into<String>) {
        self.state().history.push(HistoryEntry {
            role,
            content: content.into(),
        });
    }

    #[must_use]
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.state().history.clone()
    }

    /// The last `n` history entries, oldest first
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<HistoryEntry> {
        let state = self.state();
        let start = state.history.len().saturating_sub(n);
        state.history[start..].to_vec()
    }

    /// Keep only the latest `keep` entries once history exceeds `limit`
    ///
    /// Returns whether anything was dropped.
    pub fn trim_history(&self, limit: usize, keep: usize) -> bool {
        let mut state = self.state();
        if state.history.len() <= limit {
            return false;
        }
        let excess = state.history.len().saturating_sub(keep);
        state.history.drain(..excess);
        tracing::debug!(dropped = excess, kept = state.history.len(), "trimmed history");
        true
    }

    #[must_use]
    pub fn last_question(&self) -> Option<String> {
        self.state().last_question.clone()
    }

    pub fn set_last_question(&self, question: &str) {
        self.state().last_question = Some(question.to_string());
    }

    /// Return to a fresh, idle session
    pub fn reset(&self, max_turns: usize) {
        *self.state() = SessionState {
            max_turns,
            ..SessionState::default()
        };
        self.warnings.reset();
    }

    /// Sleep up to `duration`, waking early if the session stops
    ///
    /// Returns whether the session is still active.
    pub fn pause(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if !self.is_active() {
                return false;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return true;
            }
            std::thread::sleep(remaining.min(PAUSE_SLICE));
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let (phase, turn_index, max_turns, history_len) = {
            let state = self.state();
            (
                state.phase,
                state.turn_index,
                state.max_turns,
                state.history.len(),
            )
        };

        SessionSnapshot {
            active: self.is_active(),
            monitoring_active: self.is_monitoring(),
            phase,
            turn_index,
            max_turns,
            waiting_for_response: self.gate.is_awaiting(),
            history_len,
            warnings: self.warnings.tally(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_to_recent_window() {
        let session = Session::new(7, 3);
        for i in 0..16 {
            session.push(Role::User, format!("line {i}"));
        }

        assert!(session.trim_history(15, 8));
        let history = session.history();
        assert_eq!(history.len(), 8);
        assert_eq!(history[0].content, "line 8");
        assert_eq!(history[7].content, "line 15");

        assert!(!session.trim_history(15, 8));
    }

    #[test]
    fn recent_returns_tail() {
        let session = Session::new(7, 3);
        session.push(Role::Assistant, "q");
        session.push(Role::User, "a");
        assert_eq!(session.recent(4).len(), 2);
        assert_eq!(session.recent(1)[0].content, "a");
    }

    #[test]
    fn reset_clears_state() {
        let session = Session::new(7, 3);
        session.set_phase(Phase::Questions);
        session.advance_turn();
        session.push(Role::User, "hi");
        session.set_last_question("q");

        session.reset(5);

        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.turn_index(), 0);
        assert_eq!(session.max_turns(), 5);
        assert!(session.history().is_empty());
        assert!(session.last_question().is_none());
    }

    #[test]
    fn pause_wakes_on_stop() {
        let session = std::sync::Arc::new(Session::new(7, 3));
        session.set_active(true);

        let stopper = {
            let session = std::sync::Arc::clone(&session);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(50));
                session.set_active(false);
            })
        };

        let started = Instant::now();
        assert!(!session.pause(Duration::from_secs(10)));
        assert!(started.elapsed() < Duration::from_secs(5));
        stopper.join().unwrap();
    }

    #[test]
    fn monitoring_requires_active() {
        let session = Session::new(7, 3);
        session.set_monitoring(true);
        assert!(!session.is_monitoring());
        session.set_active(true);
        assert!(session.is_monitoring());
        session.terminate();
        assert!(!session.is_active());
        assert!(session.gate().is_closed());
    }

    #[test]
    fn phase_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Phase::Questions).unwrap(), "\"questions\"");
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
    }
}
