#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

//! Push jobs to technicians' external calendars and reconcile provider
//! change notifications back into conflict flags.

mod orchestrator;
mod outcome;

pub use orchestrator::{CalendarSyncOrchestrator, SyncPolicy};
pub use outcome::{ConnectOutcome, DisconnectOutcome, ReconcileOutcome, SkipReason, SyncOutcome};
