//! Tone screening for candidate answers

use std::sync::LazyLock;

use rand::seq::SliceRandom;
use regex::RegexSet;

/// Tone warnings after which the firm reminder replaces the calming remarks
pub const FIRM_REMINDER_AFTER: u32 = 3;

/// Spoken once tone warnings pile up
pub const FIRM_REMINDER: &str = "I appreciate your participation, but let's maintain a professional tone throughout our conversation.";

static ARROGANT: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"\bobviously\b",
        r"\beveryone knows\b",
        r"\bchild'?s play\b",
        r"\bthat'?s easy\b",
        r"\btrivial\b",
        r"\bwaste of time\b",
        r"\bno brainer\b",
        r"\bpiece of cake\b",
    ])
    .expect("valid regex")
});

static RUDE: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"\byou don'?t understand\b",
        r"\bthat'?s stupid\b",
        r"\bdumb question\b",
        r"\bare you serious\b",
        r"\bthis is ridiculous\b",
        r"\bwho cares\b",
        r"\bwhatever\b",
        r"\bthis sucks\b",
    ])
    .expect("valid regex")
});

/// Unprofessional tone detected in an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Arrogant,
    Rude,
}

impl Tone {
    const fn responses(self) -> &'static [&'static str] {
        match self {
            Self::Arrogant => &[
                "I appreciate your confidence! Let's channel that into demonstrating your sales knowledge.",
                "Great confidence! Now let's see how you apply that expertise to sales scenarios.",
            ],
            Self::Rude => &[
                "I understand interviews can be stressful. Let's take a moment and continue professionally.",
                "No worries, let's refocus on showcasing your sales abilities.",
            ],
        }
    }

    /// Remark to speak for the `count`-th tone warning
    #[must_use]
    pub fn response(self, count: u32) -> &'static str {
        if count >= FIRM_REMINDER_AFTER {
            return FIRM_REMINDER;
        }
        self.responses()
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(FIRM_REMINDER)
    }
}

/// Classify `text`; `None` means professional
#[must_use]
pub fn detect(text: &str) -> Option<Tone> {
    let normalized = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .replace('\u{2019}', "'");

    if normalized.is_empty() {
        return None;
    }
    if ARROGANT.is_match(&normalized) {
        return Some(Tone::Arrogant);
    }
    if RUDE.is_match(&normalized) {
        return Some(Tone::Rude);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn professional_answer_passes() {
        assert_eq!(
            detect("I qualify leads by budget, authority, need and timeline."),
            None
        );
        assert_eq!(detect(""), None);
    }

    #[test]
    fn detects_arrogance() {
        assert_eq!(detect("Honestly that's EASY, closing is child's play"), Some(Tone::Arrogant));
        assert_eq!(detect("It is a no   brainer"), Some(Tone::Arrogant));
    }

    #[test]
    fn detects_rudeness() {
        assert_eq!(detect("Whatever, next question"), Some(Tone::Rude));
        assert_eq!(detect("You don\u{2019}t understand sales"), Some(Tone::Rude));
    }

    #[test]
    fn arrogance_checked_first() {
        assert_eq!(detect("obviously, who cares"), Some(Tone::Arrogant));
    }

    #[test]
    fn words_must_stand_alone() {
        assert_eq!(detect("the trivially small discount"), None);
    }

    #[test]
    fn firm_reminder_after_repeats() {
        assert!(Tone::Rude.responses().contains(&Tone::Rude.response(1)));
        assert_eq!(Tone::Arrogant.response(3), FIRM_REMINDER);
        assert_eq!(Tone::Rude.response(7), FIRM_REMINDER);
    }
}
