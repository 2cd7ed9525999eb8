//! Signal sources for the watchers

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

/// Reports how many faces the camera currently sees
pub trait PresenceProbe: Send + Sync {
    /// `None` when no reading is available
    fn faces(&self) -> Option<usize>;

    /// Forget readings from an earlier interview
    fn reset(&self) {}
}

/// Reports an identity for whatever currently has the candidate's focus
pub trait FocusProbe: Send + Sync {
    /// `None` when no reading is available
    fn foreground(&self) -> Option<String>;

    /// Return to the state a fresh interview starts from
    fn reset(&self) {}
}

/// Identity reported while the interview page has focus
pub const FOCUSED: &str = "interview";

/// Identity reported while the candidate is elsewhere
pub const AWAY: &str = "elsewhere";

/// Face counts pushed by the browser client
#[derive(Debug, Default)]
pub struct ReportedPresence {
    latest: Mutex<Option<(usize, Instant)>>,
}

impl ReportedPresence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the latest face count
    pub fn report(&self, faces: usize) {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some((faces, Instant::now()));
    }

    /// When the last report arrived
    #[must_use]
    pub fn last_report(&self) -> Option<Instant> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .map(|(_, at)| at)
    }

    /// Forget previous readings
    pub fn clear(&self) {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl PresenceProbe for ReportedPresence {
    fn faces(&self) -> Option<usize> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .map(|(faces, _)| faces)
    }

    fn reset(&self) {
        self.clear();
    }
}

/// Page visibility pushed by the browser client
///
/// Starts focused, so the first baseline is the interview page itself.
#[derive(Debug)]
pub struct ReportedFocus {
    focused: Mutex<bool>,
}

impl Default for ReportedFocus {
    fn default() -> Self {
        Self {
            focused: Mutex::new(true),
        }
    }
}

impl ReportedFocus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self, focused: bool) {
        *self.focused.lock().unwrap_or_else(PoisonError::into_inner) = focused;
    }

    #[must_use]
    pub fn is_focused(&self) -> bool {
        *self.focused.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FocusProbe for ReportedFocus {
    fn foreground(&self) -> Option<String> {
        let identity = if self.is_focused() { FOCUSED } else { AWAY };
        Some(identity.to_string())
    }

    fn reset(&self) {
        self.report(true);
    }
}
