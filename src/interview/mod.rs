//! The interview engine
//!
//! - [`ResponseGate`] hands answers from any thread to the blocked sequencer
//! - [`TurnSequencer`] walks the script from greeting to farewell
//! - [`WarningCounter`] tallies conduct violations and decides on escalation
//! - [`InterviewController`] owns the session and its background threads

mod controller;
mod gate;
pub mod script;
mod sequencer;
mod session;
pub mod tone;
mod warnings;
mod worker;

pub use controller::{ControllerStatus, InterviewController, Probes};
pub use gate::{Delivery, DropReason, PendingTurn, Response, ResponseGate};
pub use sequencer::{Collaborators, TurnSequencer};
pub use session::{HistoryEntry, Phase, Role, Session, SessionSnapshot};
pub use warnings::{
    Category, Outcome, Recorded, Severity, TERMINATION_MESSAGE, Violation, WarningCounter,
    WarningNotice, WarningTally, report_violation,
};
pub use worker::Worker;
