//! Monitoring watchers
//!
//! Each watcher is a small debounced state machine polled on its own thread
//! while the session is monitoring. Probes supply the raw signal; the watcher
//! decides when a reading becomes a violation.

mod focus;
mod presence;
mod probes;

use std::sync::Arc;
use std::time::{Duration, Instant};

pub use focus::FocusWatcher;
pub use presence::PresenceWatcher;
pub use probes::{AWAY, FOCUSED, FocusProbe, PresenceProbe, ReportedFocus, ReportedPresence};

use crate::interview::{Session, Violation, report_violation};
use crate::transport::Transport;

/// A periodic check that may turn a reading into a violation
pub trait Watcher: Send {
    /// Thread name
    fn name(&self) -> &'static str;

    /// How often to poll
    fn interval(&self) -> Duration;

    /// Take one reading
    fn poll(&mut self, now: Instant) -> Option<Violation>;
}

/// Poll `watcher` until monitoring stops
pub fn run_watcher(
    mut watcher: Box<dyn Watcher>,
    session: Arc<Session>,
    transport: Arc<dyn Transport>,
) {
    let name = watcher.name();
    tracing::debug!(watcher = name, "watcher started");

    while session.is_monitoring() {
        if let Some(violation) = watcher.poll(Instant::now()) {
            report_violation(&session, transport.as_ref(), violation);
        }
        if !session.pause(watcher.interval()) {
            break;
        }
    }

    tracing::debug!(watcher = name, "watcher stopped");
}
