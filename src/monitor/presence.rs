//! Presence watcher: no face for too long, or more than one face

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::Watcher;
use super::probes::PresenceProbe;
use crate::interview::Violation;

/// Debounced presence checks
///
/// `NoFace` fires once after the grace period and re-arms when a face returns.
/// `MultipleFaces` fires once per crowd and re-arms when exactly one face is seen.
pub struct PresenceWatcher {
    probe: Arc<dyn PresenceProbe>,
    interval: Duration,
    grace: Duration,
    last_seen: Option<Instant>,
    no_face_warned: bool,
    crowd_warned: bool,
}

impl PresenceWatcher {
    #[must_use]
    pub fn new(probe: Arc<dyn PresenceProbe>, interval: Duration, grace: Duration) -> Self {
        Self {
            probe,
            interval,
            grace,
            last_seen: None,
            no_face_warned: false,
            crowd_warned: false,
        }
    }
}

impl Watcher for PresenceWatcher {
    fn name(&self) -> &'static str {
        "presence-watcher"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn poll(&mut self, now: Instant) -> Option<Violation> {
        let faces = self.probe.faces()?;
        let last_seen = *self.last_seen.get_or_insert(now);

        match faces {
            0 => {
                if self.no_face_warned || now.saturating_duration_since(last_seen) < self.grace {
                    return None;
                }
                self.no_face_warned = true;
                Some(Violation::NoFace)
            }
            1 => {
                self.last_seen = Some(now);
                self.no_face_warned = false;
                self.crowd_warned = false;
                None
            }
            _ => {
                self.last_seen = Some(now);
                self.no_face_warned = false;
                if self.crowd_warned {
                    return None;
                }
                self.crowd_warned = true;
                Some(Violation::MultipleFaces)
            }
        }
    }
}
