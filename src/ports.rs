#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

//! Storage and delivery seams consumed by the dispatch services.
//!
//! Every service is generic over these traits; `DispatchDb` implements the
//! store ports against Postgres and tests use in-memory fakes.

use crate::types::{
    CalendarEvent, CalendarIntegration, ExternalEventId, GrantId, IntegrationId, Job, JobId,
    Notification, ProjectStatus, Technician, TechnicianId, UserId,
};
use crate::Result;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;

pub type PortFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

pub trait JobStore {
    fn load_job<'a>(&'a self, job_id: &'a JobId) -> PortFuture<'a, Option<Job>>;

    fn update_status<'a>(&'a self, job_id: &'a JobId, status: ProjectStatus)
        -> PortFuture<'a, ()>;

    fn update_assignment<'a>(
        &'a self,
        job_id: &'a JobId,
        technician_id: Option<TechnicianId>,
        editor_id: Option<UserId>,
    ) -> PortFuture<'a, ()>;

    fn update_schedule<'a>(
        &'a self,
        job_id: &'a JobId,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> PortFuture<'a, ()>;

    /// `Some(note)` raises the conflict flag, `None` clears flag and note.
    fn set_conflict<'a>(&'a self, job_id: &'a JobId, note: Option<String>)
        -> PortFuture<'a, ()>;
}

pub trait TechnicianStore {
    fn load_technician<'a>(
        &'a self,
        technician_id: &'a TechnicianId,
    ) -> PortFuture<'a, Option<Technician>>;
}

pub trait CalendarStore {
    fn integrations_for_technician<'a>(
        &'a self,
        technician_id: &'a TechnicianId,
    ) -> PortFuture<'a, Vec<CalendarIntegration>>;

    fn load_integration<'a>(
        &'a self,
        integration_id: &'a IntegrationId,
    ) -> PortFuture<'a, Option<CalendarIntegration>>;

    fn find_integration_by_grant<'a>(
        &'a self,
        grant_id: &'a GrantId,
    ) -> PortFuture<'a, Option<CalendarIntegration>>;

    fn save_integration<'a>(&'a self, integration: &'a CalendarIntegration)
        -> PortFuture<'a, ()>;

    /// Clears every write-target flag of the technician, then sets one.
    fn set_write_target<'a>(
        &'a self,
        technician_id: &'a TechnicianId,
        integration_id: &'a IntegrationId,
    ) -> PortFuture<'a, ()>;

    /// Marks the integration DISCONNECTED and drops its write-target flag.
    fn mark_disconnected<'a>(&'a self, integration_id: &'a IntegrationId) -> PortFuture<'a, ()>;

    fn load_event_for_job<'a>(&'a self, job_id: &'a JobId)
        -> PortFuture<'a, Option<CalendarEvent>>;

    fn find_event_by_external<'a>(
        &'a self,
        external_event_id: &'a ExternalEventId,
        grant_id: &'a GrantId,
    ) -> PortFuture<'a, Option<CalendarEvent>>;

    /// Insert or replace the record keyed by `event.job_id`.
    fn upsert_event<'a>(&'a self, event: &'a CalendarEvent) -> PortFuture<'a, ()>;

    /// Resets every event under `grant_id` to PENDING with external ids cleared.
    fn reset_events_for_grant<'a>(&'a self, grant_id: &'a GrantId) -> PortFuture<'a, u64>;

    /// Open jobs assigned to the technician whose event is missing, PENDING or FAILED.
    fn jobs_needing_push<'a>(
        &'a self,
        technician_id: &'a TechnicianId,
    ) -> PortFuture<'a, Vec<JobId>>;
}

pub trait NotificationSink {
    fn notify(&self, notification: Notification) -> PortFuture<'_, ()>;
}

pub trait DispatchPorts: JobStore + TechnicianStore + CalendarStore + NotificationSink {}

impl<T> DispatchPorts for T where T: JobStore + TechnicianStore + CalendarStore + NotificationSink {}
