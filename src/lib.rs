//! Technician ranking, availability and calendar consistency for shoot dispatch.

pub mod assignment;
pub mod availability;
pub mod calendar_sync;
pub mod config;
pub mod db;
pub mod error;
pub mod geo;
pub mod lifecycle;
pub mod memory;
pub mod ports;
pub mod provider;
pub mod ranking;
pub mod telemetry;
pub mod types;

pub use assignment::{AssignmentOutcome, JobAssignmentService};
pub use availability::{AvailabilityPolicy, AvailabilityResolver};
pub use calendar_sync::{CalendarSyncOrchestrator, ReconcileOutcome, SyncOutcome, SyncPolicy};
pub use config::DispatchConfig;
pub use db::DispatchDb;
pub use error::{DispatchError, Result};
pub use lifecycle::{ProjectLifecycleService, TransitionMatrix};
pub use provider::{CalendarProvider, HttpCalendarProvider, ProviderConfig};
pub use ranking::{RankedCandidate, RankingConfig, RankingEngine};
pub use types::*;
