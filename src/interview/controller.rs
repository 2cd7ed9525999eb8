//! Session lifecycle: initialize, start, answer, end, reset
//!
//! The controller owns the background threads of the live interview. Start
//! and end are serialized through the worker list, so two starts can never
//! race each other into a second concurrent interview.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::gate::Delivery;
use super::sequencer::{Collaborators, TurnSequencer};
use super::session::{Session, SessionSnapshot};
use super::worker::Worker;
use crate::config::{InterviewConfig, MonitoringConfig};
use crate::monitor::{
    FocusProbe, FocusWatcher, PresenceProbe, PresenceWatcher, Watcher, run_watcher,
};
use crate::{Error, Result};

/// Signal sources the watchers read from
#[derive(Clone, Default)]
pub struct Probes {
    pub presence: Option<Arc<dyn PresenceProbe>>,
    pub focus: Option<Arc<dyn FocusProbe>>,
}

/// Controller status, as reported to clients
#[derive(Debug, Clone, serde::Serialize)]
pub struct ControllerStatus {
    pub initialized: bool,
    #[serde(flatten)]
    pub session: SessionSnapshot,
}

/// Owns the single interview session and its threads
pub struct InterviewController {
    session: Arc<Session>,
    interview: InterviewConfig,
    monitoring: MonitoringConfig,
    collaborators: Collaborators,
    probes: Probes,
    initialized: AtomicBool,
    workers: Mutex<Vec<Worker>>,
}

impl InterviewController {
    #[must_use]
    pub fn new(
        interview: InterviewConfig,
        monitoring: MonitoringConfig,
        collaborators: Collaborators,
        probes: Probes,
    ) -> Self {
        let session = Arc::new(Session::new(
            interview.max_turns,
            monitoring.escalation_threshold,
        ));

        Self {
            session,
            interview,
            monitoring,
            collaborators,
            probes,
            initialized: AtomicBool::new(false),
            workers: Mutex::new(Vec::new()),
        }
    }

    fn workers(&self) -> MutexGuard<'_, Vec<Worker>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Prepare the controller; a running interview is reset first
    pub fn initialize(&self) {
        if self.session.is_active() {
            tracing::info!("re-initializing, resetting the running interview");
            self.reset();
        }
        self.initialized.store(true, Ordering::SeqCst);
        tracing::info!("interview controller initialized");
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Start a fresh interview on background threads
    ///
    /// # Errors
    ///
    /// Returns error if the controller is not initialized, an interview is
    /// already running, or the previous run has not shut down yet
    pub fn start(&self) -> Result<()> {
        if !self.is_initialized() {
            return Err(Error::NotInitialized);
        }

        let mut workers = self.workers();
        if self.session.is_active() {
            return Err(Error::AlreadyActive);
        }
        self.reap(&mut workers)?;

        self.session.reset(self.interview.max_turns);
        self.reset_probes();
        self.session.gate().open();
        self.session.set_active(true);
        self.session.set_monitoring(self.monitoring.enabled);

        let sequencer = TurnSequencer::new(
            Arc::clone(&self.session),
            self.interview.clone(),
            self.collaborators.clone(),
        );
        match Worker::spawn("interview-sequencer", move || sequencer.run()) {
            Ok(worker) => workers.push(worker),
            Err(e) => {
                self.session.terminate();
                return Err(e);
            }
        }

        if self.monitoring.enabled {
            for watcher in self.watchers() {
                let session = Arc::clone(&self.session);
                let transport = Arc::clone(&self.collaborators.transport);
                let name = watcher.name();
                match Worker::spawn(name, move || run_watcher(watcher, session, transport)) {
                    Ok(worker) => workers.push(worker),
                    Err(e) => tracing::warn!(watcher = name, error = %e, "monitoring degraded"),
                }
            }
        }

        tracing::info!(
            workers = workers.len(),
            monitoring = self.monitoring.enabled,
            "interview launched"
        );
        Ok(())
    }

    /// Hand an answer to the waiting question
    ///
    /// # Errors
    ///
    /// Returns error if the controller is not initialized
    pub fn submit_answer(&self, text: &str) -> Result<Delivery> {
        if !self.is_initialized() {
            return Err(Error::NotInitialized);
        }

        let delivery = self.session.gate().deliver(text);
        if let Delivery::Dropped(reason) = delivery {
            tracing::debug!(?reason, "answer dropped");
        }
        Ok(delivery)
    }

    /// Stop the interview and wait a bounded time for its threads
    pub fn end(&self) {
        let mut workers = self.workers();
        if self.session.is_active() {
            tracing::info!("ending interview");
        }
        self.session.terminate();
        self.join_all(&mut workers, self.interview.join_timeout);
    }

    /// End the interview and return to a fresh idle session
    pub fn reset(&self) {
        self.end();
        self.session.reset(self.interview.max_turns);
        tracing::info!("interview reset");
    }

    #[must_use]
    pub fn status(&self) -> ControllerStatus {
        ControllerStatus {
            initialized: self.is_initialized(),
            session: self.session.snapshot(),
        }
    }

    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Drop readings left over from the previous interview
    fn reset_probes(&self) {
        if let Some(probe) = &self.probes.presence {
            probe.reset();
        }
        if let Some(probe) = &self.probes.focus {
            probe.reset();
        }
    }

    fn watchers(&self) -> Vec<Box<dyn Watcher>> {
        let mut watchers: Vec<Box<dyn Watcher>> = Vec::new();

        if let Some(probe) = &self.probes.presence {
            watchers.push(Box::new(PresenceWatcher::new(
                Arc::clone(probe),
                self.monitoring.presence_interval,
                self.monitoring.no_face_grace,
            )));
        }
        if let Some(probe) = &self.probes.focus {
            watchers.push(Box::new(FocusWatcher::new(
                Arc::clone(probe),
                self.monitoring.focus_interval,
                self.monitoring.focus_cooldown,
            )));
        }

        watchers
    }

    /// Join finished threads from the previous run; refuse if one is still alive
    fn reap(&self, workers: &mut Vec<Worker>) -> Result<()> {
        self.join_all(workers, self.interview.join_timeout);

        if let Some(stale) = workers.first() {
            return Err(Error::Worker(format!(
                "{} from the previous interview is still shutting down",
                stale.name()
            )));
        }
        Ok(())
    }

    /// Join every worker within one shared deadline; stragglers stay in the list
    fn join_all(&self, workers: &mut Vec<Worker>, timeout: Duration) {
        let deadline = Instant::now() + timeout;

        for worker in std::mem::take(workers) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if worker.wait(remaining) {
                worker.join(Duration::ZERO);
            } else {
                tracing::warn!(worker = worker.name(), "worker still running after end");
                workers.push(worker);
            }
        }
    }
}

impl Drop for InterviewController {
    fn drop(&mut self) {
        self.session.terminate();
        let timeout = self.interview.join_timeout;
        let workers = self.workers.get_mut().unwrap_or_else(PoisonError::into_inner);
        for worker in workers.drain(..) {
            worker.join(timeout);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::NoGenerator;
    use crate::transport::NullTransport;
    use crate::voice::Silent;

    fn quick_config() -> InterviewConfig {
        InterviewConfig {
            answer_timeout: Duration::from_secs(30),
            turn_pause: Duration::ZERO,
            speak_pause: Duration::ZERO,
            speak_pause_per_word: Duration::ZERO,
            generation_retry_delay: Duration::ZERO,
            join_timeout: Duration::from_secs(2),
            ..InterviewConfig::default()
        }
    }

    fn controller() -> InterviewController {
        InterviewController::new(
            quick_config(),
            MonitoringConfig {
                enabled: false,
                ..MonitoringConfig::default()
            },
            Collaborators {
                speech: Arc::new(Silent),
                generator: Arc::new(NoGenerator),
                transport: Arc::new(NullTransport),
            },
            Probes::default(),
        )
    }

    #[test]
    fn start_requires_initialize() {
        let controller = controller();
        assert!(matches!(controller.start(), Err(Error::NotInitialized)));
        assert!(matches!(
            controller.submit_answer("hello"),
            Err(Error::NotInitialized)
        ));
    }

    #[test]
    fn second_start_is_rejected() {
        let controller = controller();
        controller.initialize();
        controller.start().unwrap();
        assert!(matches!(controller.start(), Err(Error::AlreadyActive)));
        controller.end();
        assert!(!controller.status().session.active);
    }

    #[test]
    fn end_releases_blocked_sequencer() {
        let controller = controller();
        controller.initialize();
        controller.start().unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while !controller.session().gate().is_awaiting() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }

        let started = Instant::now();
        controller.end();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(controller.workers().is_empty());
    }

    #[test]
    fn reset_allows_a_fresh_start() {
        let controller = controller();
        controller.initialize();
        controller.start().unwrap();
        controller.reset();

        let status = controller.status();
        assert!(status.initialized);
        assert_eq!(status.session.turn_index, 0);

        controller.start().unwrap();
        assert!(controller.status().session.active);
        controller.end();
    }
}
