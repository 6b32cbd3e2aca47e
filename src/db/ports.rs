use crate::db::DispatchDb;
use crate::ports::{CalendarStore, JobStore, NotificationSink, PortFuture, TechnicianStore};
use crate::types::{
    CalendarEvent, CalendarIntegration, ExternalEventId, GrantId, IntegrationId, Job, JobId,
    Notification, ProjectStatus, Technician, TechnicianId, UserId,
};
use chrono::{DateTime, Utc};

impl JobStore for DispatchDb {
    fn load_job<'a>(&'a self, job_id: &'a JobId) -> PortFuture<'a, Option<Job>> {
        Box::pin(self.fetch_job(job_id))
    }

    fn update_status<'a>(
        &'a self,
        job_id: &'a JobId,
        status: ProjectStatus,
    ) -> PortFuture<'a, ()> {
        Box::pin(self.write_status(job_id, status))
    }

    fn update_assignment<'a>(
        &'a self,
        job_id: &'a JobId,
        technician_id: Option<TechnicianId>,
        editor_id: Option<UserId>,
    ) -> PortFuture<'a, ()> {
        Box::pin(self.write_assignment(job_id, technician_id, editor_id))
    }

    fn update_schedule<'a>(
        &'a self,
        job_id: &'a JobId,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> PortFuture<'a, ()> {
        Box::pin(self.write_schedule(job_id, start, end))
    }

    fn set_conflict<'a>(
        &'a self,
        job_id: &'a JobId,
        note: Option<String>,
    ) -> PortFuture<'a, ()> {
        Box::pin(self.write_conflict(job_id, note))
    }
}

impl TechnicianStore for DispatchDb {
    fn load_technician<'a>(
        &'a self,
        technician_id: &'a TechnicianId,
    ) -> PortFuture<'a, Option<Technician>> {
        Box::pin(self.fetch_technician(technician_id))
    }
}

impl CalendarStore for DispatchDb {
    fn integrations_for_technician<'a>(
        &'a self,
        technician_id: &'a TechnicianId,
    ) -> PortFuture<'a, Vec<CalendarIntegration>> {
        Box::pin(self.fetch_integrations_for(technician_id))
    }

    fn load_integration<'a>(
        &'a self,
        integration_id: &'a IntegrationId,
    ) -> PortFuture<'a, Option<CalendarIntegration>> {
        Box::pin(self.fetch_integration(integration_id))
    }

    fn find_integration_by_grant<'a>(
        &'a self,
        grant_id: &'a GrantId,
    ) -> PortFuture<'a, Option<CalendarIntegration>> {
        Box::pin(self.fetch_integration_by_grant(grant_id))
    }

    fn save_integration<'a>(
        &'a self,
        integration: &'a CalendarIntegration,
    ) -> PortFuture<'a, ()> {
        Box::pin(self.write_integration(integration))
    }

    fn set_write_target<'a>(
        &'a self,
        technician_id: &'a TechnicianId,
        integration_id: &'a IntegrationId,
    ) -> PortFuture<'a, ()> {
        Box::pin(self.write_target(technician_id, integration_id))
    }

    fn mark_disconnected<'a>(&'a self, integration_id: &'a IntegrationId) -> PortFuture<'a, ()> {
        Box::pin(self.write_disconnected(integration_id))
    }

    fn load_event_for_job<'a>(
        &'a self,
        job_id: &'a JobId,
    ) -> PortFuture<'a, Option<CalendarEvent>> {
        Box::pin(self.fetch_event_for_job(job_id))
    }

    fn find_event_by_external<'a>(
        &'a self,
        external_event_id: &'a ExternalEventId,
        grant_id: &'a GrantId,
    ) -> PortFuture<'a, Option<CalendarEvent>> {
        Box::pin(self.fetch_event_by_external(external_event_id, grant_id))
    }

    fn upsert_event<'a>(&'a self, event: &'a CalendarEvent) -> PortFuture<'a, ()> {
        Box::pin(self.write_event(event))
    }

    fn reset_events_for_grant<'a>(&'a self, grant_id: &'a GrantId) -> PortFuture<'a, u64> {
        Box::pin(self.write_reset_for_grant(grant_id))
    }

    fn jobs_needing_push<'a>(
        &'a self,
        technician_id: &'a TechnicianId,
    ) -> PortFuture<'a, Vec<JobId>> {
        Box::pin(self.fetch_jobs_needing_push(technician_id))
    }
}

impl NotificationSink for DispatchDb {
    fn notify(&self, notification: Notification) -> PortFuture<'_, ()> {
        Box::pin(async move { self.write_notification(&notification).await })
    }
}
