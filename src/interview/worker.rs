//! Named background threads with bounded joins

use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::{Error, Result};

/// A background thread that can be joined with a deadline
pub struct Worker {
    name: String,
    handle: JoinHandle<()>,
    // Disconnects when the thread exits, even by panic
    done: Receiver<()>,
}

impl Worker {
    /// Spawn `task` on a named OS thread
    ///
    /// # Errors
    ///
    /// Returns error if the thread cannot be created
    pub fn spawn<F>(name: impl Into<String>, task: F) -> Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let name = name.into();
        let (done_tx, done) = crossbeam_channel::bounded::<()>(0);

        let handle = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let _done = done_tx;
                task();
            })
            .map_err(|e| Error::Worker(format!("failed to spawn {name}: {e}")))?;

        tracing::debug!(worker = %name, "worker started");
        Ok(Self { name, handle, done })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the thread has exited
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait up to `timeout` for the thread to exit, keeping the handle
    pub fn wait(&self, timeout: Duration) -> bool {
        !matches!(
            self.done.recv_timeout(timeout),
            Err(RecvTimeoutError::Timeout)
        )
    }

    /// Wait up to `timeout` for the thread to exit
    ///
    /// A thread that misses the deadline is logged and detached; returns
    /// whether it was joined.
    pub fn join(self, timeout: Duration) -> bool {
        if !self.wait(timeout) {
            tracing::warn!(
                worker = %self.name,
                timeout_ms = timeout.as_millis(),
                "worker did not stop in time, detaching"
            );
            return false;
        }

        if self.handle.join().is_err() {
            tracing::error!(worker = %self.name, "worker panicked");
        } else {
            tracing::debug!(worker = %self.name, "worker joined");
        }
        true
    }
}
