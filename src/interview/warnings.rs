//! Violation tallies and escalation
//!
//! Presence and focus violations count toward a combined total; reaching the
//! threshold ends the session exactly once. Tone warnings are tallied on their
//! own and never end the session.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use super::session::Session;
use crate::transport::Transport;

/// Spoken when the escalation threshold is reached
pub const TERMINATION_MESSAGE: &str =
    "Multiple policy violations detected. This interview session will now end.";

/// Warning category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Tone,
    Presence,
    FocusChange,
}

impl Category {
    /// Whether this category counts toward session termination
    #[must_use]
    pub const fn escalates(self) -> bool {
        !matches!(self, Self::Tone)
    }
}

/// A monitoring violation raised by a watcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// No face seen for longer than the grace period
    NoFace,
    /// More than one face in frame
    MultipleFaces,
    /// Candidate left the interview window
    FocusChange,
}

impl Violation {
    #[must_use]
    pub const fn category(self) -> Category {
        match self {
            Self::NoFace | Self::MultipleFaces => Category::Presence,
            Self::FocusChange => Category::FocusChange,
        }
    }

    /// Wire name of the violation
    #[must_use]
    pub const fn kind(self) -> &'static str {
        match self {
            Self::NoFace => "no_face",
            Self::MultipleFaces => "multiple_faces",
            Self::FocusChange => "tab_change",
        }
    }

    /// Reminder shown to the candidate
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NoFace => {
                "Please ensure your face is clearly visible to the camera throughout the interview."
            }
            Self::MultipleFaces => "Please ensure you are alone during this interview session.",
            Self::FocusChange => {
                "Please stay focused on the interview and avoid switching to other applications."
            }
        }
    }
}

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Warning delivered to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WarningNotice {
    /// Wire kind (`no_face`, `multiple_faces`, `tab_change`, `tone`, `termination`)
    pub kind: String,
    pub message: String,
    pub severity: Severity,
    /// Violations counted so far
    pub count: u32,
    /// Escalation threshold
    pub max: u32,
}

/// Snapshot of all tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WarningTally {
    pub tone: u32,
    pub presence: u32,
    pub focus_change: u32,
    /// Escalating violations (presence and focus)
    pub total: u32,
    pub threshold: u32,
    pub escalated: bool,
}

/// What recording a warning led to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Counted; below the threshold or not escalating
    Warn,
    /// This record reached the threshold
    Escalate,
    /// The session was already escalated
    AfterEscalation,
}

/// Result of one `record` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recorded {
    /// Count within the category, including this one
    pub category_count: u32,
    /// Escalating total, including this one
    pub total: u32,
    pub outcome: Outcome,
}

#[derive(Debug, Default)]
struct Counts {
    tone: u32,
    presence: u32,
    focus_change: u32,
    total: u32,
    escalated: bool,
}

/// Per-category warning counter guarded by one mutex
#[derive(Debug)]
pub struct WarningCounter {
    threshold: u32,
    counts: Mutex<Counts>,
}

impl WarningCounter {
    #[must_use]
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            counts: Mutex::new(Counts::default()),
        }
    }

    fn counts(&self) -> MutexGuard<'_, Counts> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count one warning in `category`
    pub fn record(&self, category: Category) -> Recorded {
        let mut counts = self.counts();

        let category_count = match category {
            Category::Tone => {
                counts.tone += 1;
                counts.tone
            }
            Category::Presence => {
                counts.presence += 1;
                counts.presence
            }
            Category::FocusChange => {
                counts.focus_change += 1;
                counts.focus_change
            }
        };

        if !category.escalates() {
            return Recorded {
                category_count,
                total: counts.total,
                outcome: Outcome::Warn,
            };
        }

        if counts.escalated {
            return Recorded {
                category_count,
                total: counts.total,
                outcome: Outcome::AfterEscalation,
            };
        }

        counts.total += 1;
        let outcome = if counts.total >= self.threshold {
            counts.escalated = true;
            Outcome::Escalate
        } else {
            Outcome::Warn
        };

        Recorded {
            category_count,
            total: counts.total,
            outcome,
        }
    }

    #[must_use]
    pub const fn threshold(&self) -> u32 {
        self.threshold
    }

    #[must_use]
    pub fn escalated(&self) -> bool {
        self.counts().escalated
    }

    #[must_use]
    pub fn tally(&self) -> WarningTally {
        let counts = self.counts();
        WarningTally {
            tone: counts.tone,
            presence: counts.presence,
            focus_change: counts.focus_change,
            total: counts.total,
            threshold: self.threshold,
            escalated: counts.escalated,
        }
    }

    /// Clear every tally and re-arm escalation
    pub fn reset(&self) {
        *self.counts() = Counts::default();
    }
}

/// Record a monitoring violation and warn or terminate accordingly
///
/// Ignored when no interview is running. Safe to call from any watcher thread.
pub fn report_violation(session: &Session, transport: &dyn Transport, violation: Violation) {
    if !session.is_active() {
        tracing::debug!(kind = violation.kind(), "ignoring violation outside an interview");
        return;
    }

    let warnings = session.warnings();
    let recorded = warnings.record(violation.category());
    let max = warnings.threshold();

    match recorded.outcome {
        Outcome::Warn => {
            tracing::warn!(
                kind = violation.kind(),
                total = recorded.total,
                max,
                "monitoring violation"
            );
            transport.notify_warning(&WarningNotice {
                kind: violation.kind().to_string(),
                message: format!(
                    "Reminder: {} This is warning {} of {max}.",
                    violation.message(),
                    recorded.total
                ),
                severity: Severity::Warning,
                count: recorded.total,
                max,
            });
        }
        Outcome::Escalate => {
            tracing::warn!(
                kind = violation.kind(),
                total = recorded.total,
                "violation threshold reached, ending interview"
            );
            session.terminate();
            transport.notify_warning(&WarningNotice {
                kind: "termination".to_string(),
                message: TERMINATION_MESSAGE.to_string(),
                severity: Severity::Critical,
                count: recorded.total,
                max,
            });
        }
        Outcome::AfterEscalation => {
            tracing::debug!(kind = violation.kind(), "violation after escalation ignored");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn concurrent_records_are_all_counted() {
        let counter = Arc::new(WarningCounter::new(1000));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..25 {
                        counter.record(Category::Presence);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let tally = counter.tally();
        assert_eq!(tally.presence, 200);
        assert_eq!(tally.total, 200);
    }

    #[test]
    fn escalates_exactly_once_across_threads() {
        let counter = Arc::new(WarningCounter::new(3));

        let handles: Vec<_> = (0..12)
            .map(|i| {
                let counter = Arc::clone(&counter);
                let category = if i % 2 == 0 {
                    Category::Presence
                } else {
                    Category::FocusChange
                };
                thread::spawn(move || counter.record(category).outcome)
            })
            .collect();

        let escalations = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|o| *o == Outcome::Escalate)
            .count();

        assert_eq!(escalations, 1);
        assert!(counter.escalated());
        assert_eq!(counter.tally().total, 3);
    }

    #[test]
    fn graduated_warnings_before_threshold() {
        let counter = WarningCounter::new(3);
        assert_eq!(counter.record(Category::Presence).outcome, Outcome::Warn);
        let second = counter.record(Category::FocusChange);
        assert_eq!(second.outcome, Outcome::Warn);
        assert_eq!(second.total, 2);
        assert_eq!(second.category_count, 1);
        assert_eq!(counter.record(Category::Presence).outcome, Outcome::Escalate);
        assert_eq!(
            counter.record(Category::Presence).outcome,
            Outcome::AfterEscalation
        );
    }

    #[test]
    fn tone_never_escalates() {
        let counter = WarningCounter::new(2);
        for _ in 0..5 {
            assert_eq!(counter.record(Category::Tone).outcome, Outcome::Warn);
        }
        let tally = counter.tally();
        assert_eq!(tally.tone, 5);
        assert_eq!(tally.total, 0);
        assert!(!tally.escalated);
    }

    #[test]
    fn reset_rearms_escalation() {
        let counter = WarningCounter::new(1);
        assert_eq!(counter.record(Category::FocusChange).outcome, Outcome::Escalate);
        counter.reset();
        assert_eq!(counter.tally(), WarningTally { threshold: 1, ..WarningTally::default() });
        assert_eq!(counter.record(Category::FocusChange).outcome, Outcome::Escalate);
    }

    #[test]
    fn violation_messages() {
        assert_eq!(Violation::FocusChange.kind(), "tab_change");
        assert_eq!(Violation::NoFace.category(), Category::Presence);
        assert!(Violation::MultipleFaces.message().contains("alone"));
    }
}
