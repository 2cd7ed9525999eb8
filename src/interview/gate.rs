//! Response gate: hands one answer from any thread to the blocked interview driver.
//!
//! At most one question is pending at a time. Every pending turn owns a fresh
//! bounded(1) channel; the gate keeps only the sending half, and delivering takes
//! it out of the slot, so the first writer wins and later writers find nothing.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

/// Outcome of waiting on the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// An answer was delivered in time
    Answer(String),
    /// The deadline passed without a delivery
    TimedOut,
    /// The gate was closed while (or before) waiting
    Released,
}

/// Why a delivery was discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Blank or whitespace-only text
    Empty,
    /// No question is waiting for an answer
    NotAwaiting,
}

/// Outcome of delivering an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Dropped(DropReason),
}

struct Pending {
    id: u64,
    question: String,
    tx: Sender<String>,
}

#[derive(Default)]
struct Slot {
    pending: Option<Pending>,
    closed: bool,
    next_id: u64,
}

/// Single-slot answer handoff
#[derive(Default)]
pub struct ResponseGate {
    slot: Mutex<Slot>,
}

impl ResponseGate {
    /// Create an open gate with nothing pending
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install a pending turn for `question`
    ///
    /// The caller can announce that it is waiting before blocking in
    /// [`PendingTurn::wait`]. On a closed gate the turn resolves to
    /// [`Response::Released`] without blocking.
    pub fn begin(&self, question: &str, timeout: Duration) -> PendingTurn<'_> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot();

        if slot.closed {
            return PendingTurn {
                gate: self,
                id: None,
                rx: None,
                deadline,
            };
        }

        let (tx, rx) = crossbeam_channel::bounded(1);
        slot.next_id += 1;
        let id = slot.next_id;

        if let Some(stale) = slot.pending.replace(Pending {
            id,
            question: question.to_string(),
            tx,
        }) {
            tracing::warn!(question = %stale.question, "replacing stale pending turn");
        }

        PendingTurn {
            gate: self,
            id: Some(id),
            rx: Some(rx),
            deadline,
        }
    }

    /// Block until an answer arrives, the timeout passes, or the gate closes
    pub fn await_response(&self, question: &str, timeout: Duration) -> Response {
        self.begin(question, timeout).wait()
    }

    /// Hand `text` to the waiting turn, if any
    ///
    /// Never blocks and never fails; discarded deliveries are logged.
    pub fn deliver(&self, text: &str) -> Delivery {
        let text = text.trim();
        if text.is_empty() {
            tracing::debug!("dropping empty answer");
            return Delivery::Dropped(DropReason::Empty);
        }

        // Send under the guard so a timing-out waiter sees either the answer
        // or an empty slot, never a delivery in flight
        let mut slot = self.slot();
        let Some(pending) = slot.pending.take() else {
            tracing::info!(chars = text.len(), "answer dropped: no question awaiting");
            return Delivery::Dropped(DropReason::NotAwaiting);
        };

        // bounded(1) with a single sender: never blocks
        let sent = pending.tx.send(text.to_string());
        drop(slot);

        if sent.is_err() {
            tracing::info!("answer dropped: waiter already gone");
            return Delivery::Dropped(DropReason::NotAwaiting);
        }

        tracing::debug!(question = %pending.question, "answer delivered");
        Delivery::Delivered
    }

    /// Release any waiter and refuse new turns until [`Self::open`]
    pub fn close(&self) {
        let mut slot = self.slot();
        slot.closed = true;
        if slot.pending.take().is_some() {
            tracing::debug!("released pending turn");
        }
    }

    /// Accept new turns again
    pub fn open(&self) {
        self.slot().closed = false;
    }

    /// Whether the gate refuses new turns
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.slot().closed
    }

    /// Whether a question is currently waiting for an answer
    #[must_use]
    pub fn is_awaiting(&self) -> bool {
        self.slot().pending.is_some()
    }

    /// The question currently waiting, if any
    #[must_use]
    pub fn current_question(&self) -> Option<String> {
        self.slot().pending.as_ref().map(|p| p.question.clone())
    }

    fn clear(&self, id: u64) {
        let mut slot = self.slot();
        if slot.pending.as_ref().is_some_and(|p| p.id == id) {
            slot.pending = None;
        }
    }

    /// Withdraw turn `id` after its deadline, keeping an answer that already landed
    fn withdraw(&self, id: u64, rx: &Receiver<String>) -> Option<String> {
        let mut slot = self.slot();
        if slot.pending.as_ref().is_some_and(|p| p.id == id) {
            slot.pending = None;
        }
        rx.try_recv().ok()
    }
}

/// A question waiting on the gate
///
/// Dropping it withdraws the question, so later deliveries are discarded.
pub struct PendingTurn<'a> {
    gate: &'a ResponseGate,
    id: Option<u64>,
    rx: Option<Receiver<String>>,
    deadline: Instant,
}

impl PendingTurn<'_> {
    /// Block until an answer arrives, the deadline passes, or the gate closes
    pub fn wait(mut self) -> Response {
        let Some(rx) = self.rx.take() else {
            return Response::Released;
        };

        let remaining = self.deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(text) => Response::Answer(text),
            Err(RecvTimeoutError::Disconnected) => Response::Released,
            Err(RecvTimeoutError::Timeout) => {
                let late = match self.id.take() {
                    Some(id) => self.gate.withdraw(id, &rx),
                    None => rx.try_recv().ok(),
                };
                late.map_or(Response::TimedOut, Response::Answer)
            }
        }
    }
}

impl Drop for PendingTurn<'_> {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.gate.clear(id);
        }
    }
}
