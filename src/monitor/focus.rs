//! Focus watcher: the candidate left the interview window

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::Watcher;
use super::probes::FocusProbe;
use crate::interview::Violation;

/// Compares the current focus identity against the first one seen
pub struct FocusWatcher {
    probe: Arc<dyn FocusProbe>,
    interval: Duration,
    cooldown: Duration,
    baseline: Option<String>,
    warned_at: Option<Instant>,
}

impl FocusWatcher {
    #[must_use]
    pub fn new(probe: Arc<dyn FocusProbe>, interval: Duration, cooldown: Duration) -> Self {
        Self {
            probe,
            interval,
            cooldown,
            baseline: None,
            warned_at: None,
        }
    }

    /// Identity treated as "on task"
    #[must_use]
    pub fn baseline(&self) -> Option<&str> {
        self.baseline.as_deref()
    }
}

impl Watcher for FocusWatcher {
    fn name(&self) -> &'static str {
        "focus-watcher"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn poll(&mut self, now: Instant) -> Option<Violation> {
        let current = self.probe.foreground()?;

        let Some(baseline) = &self.baseline else {
            tracing::debug!(baseline = %current, "focus baseline captured");
            self.baseline = Some(current);
            return None;
        };

        if *baseline == current {
            self.warned_at = None;
            return None;
        }

        if let Some(at) = self.warned_at
            && now.saturating_duration_since(at) < self.cooldown
        {
            return None;
        }

        tracing::debug!(focus = %current, "focus left the interview");
        self.warned_at = Some(now);
        Some(Violation::FocusChange)
    }
}
