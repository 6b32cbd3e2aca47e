use crate::error::{DispatchError, Result};
use crate::ports::{CalendarStore, JobStore, NotificationSink, PortFuture, TechnicianStore};
use crate::types::{
    CalendarEvent, CalendarIntegration, ExternalEventId, GrantId, IntegrationId,
    IntegrationStatus, Job, JobId, Notification, ProjectStatus, SyncStatus, Technician,
    TechnicianId, UserId,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct StoreState {
    jobs: HashMap<JobId, Job>,
    technicians: HashMap<TechnicianId, Technician>,
    integrations: Vec<CalendarIntegration>,
    events: HashMap<JobId, CalendarEvent>,
    notifications: Vec<Notification>,
}

impl StoreState {
    fn job_mut(&mut self, job_id: &JobId) -> Result<&mut Job> {
        self.jobs
            .get_mut(job_id)
            .ok_or_else(|| DispatchError::NotFound(format!("job {job_id}")))
    }

    fn integration_mut(&mut self, integration_id: &IntegrationId) -> Result<&mut CalendarIntegration> {
        self.integrations
            .iter_mut()
            .find(|integration| integration.id == *integration_id)
            .ok_or_else(|| DispatchError::NotFound(format!("integration {integration_id}")))
    }
}

/// Process-local implementation of every store port.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_job(&self, job: Job) {
        self.state.lock().await.jobs.insert(job.id, job);
    }

    pub async fn insert_technician(&self, technician: Technician) {
        self.state
            .lock()
            .await
            .technicians
            .insert(technician.id, technician);
    }

    pub async fn insert_integration(&self, integration: CalendarIntegration) {
        let mut state = self.state.lock().await;
        state.integrations.retain(|existing| existing.id != integration.id);
        state.integrations.push(integration);
    }

    pub async fn insert_event(&self, event: CalendarEvent) {
        self.state.lock().await.events.insert(event.job_id, event);
    }

    pub async fn job(&self, job_id: &JobId) -> Option<Job> {
        self.state.lock().await.jobs.get(job_id).cloned()
    }

    pub async fn event(&self, job_id: &JobId) -> Option<CalendarEvent> {
        self.state.lock().await.events.get(job_id).cloned()
    }

    pub async fn events(&self) -> Vec<CalendarEvent> {
        self.state.lock().await.events.values().cloned().collect()
    }

    pub async fn integration(&self, integration_id: &IntegrationId) -> Option<CalendarIntegration> {
        self.state
            .lock()
            .await
            .integrations
            .iter()
            .find(|integration| integration.id == *integration_id)
            .cloned()
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.state.lock().await.notifications.clone()
    }
}

impl JobStore for InMemoryStore {
    fn load_job<'a>(&'a self, job_id: &'a JobId) -> PortFuture<'a, Option<Job>> {
        Box::pin(async move { Ok(self.job(job_id).await) })
    }

    fn update_status<'a>(
        &'a self,
        job_id: &'a JobId,
        status: ProjectStatus,
    ) -> PortFuture<'a, ()> {
        Box::pin(async move {
            self.state.lock().await.job_mut(job_id)?.status = status;
            Ok(())
        })
    }

    fn update_assignment<'a>(
        &'a self,
        job_id: &'a JobId,
        technician_id: Option<TechnicianId>,
        editor_id: Option<UserId>,
    ) -> PortFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let job = state.job_mut(job_id)?;
            job.assigned_technician = technician_id;
            job.assigned_editor = editor_id;
            Ok(())
        })
    }

    fn update_schedule<'a>(
        &'a self,
        job_id: &'a JobId,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> PortFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let job = state.job_mut(job_id)?;
            job.scheduled_start = start;
            job.scheduled_end = end;
            Ok(())
        })
    }

    fn set_conflict<'a>(
        &'a self,
        job_id: &'a JobId,
        note: Option<String>,
    ) -> PortFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let job = state.job_mut(job_id)?;
            job.calendar_conflict = note.is_some();
            job.calendar_conflict_note = note;
            Ok(())
        })
    }
}

impl TechnicianStore for InMemoryStore {
    fn load_technician<'a>(
        &'a self,
        technician_id: &'a TechnicianId,
    ) -> PortFuture<'a, Option<Technician>> {
        Box::pin(async move {
            Ok(self
                .state
                .lock()
                .await
                .technicians
                .get(technician_id)
                .cloned())
        })
    }
}

impl CalendarStore for InMemoryStore {
    fn integrations_for_technician<'a>(
        &'a self,
        technician_id: &'a TechnicianId,
    ) -> PortFuture<'a, Vec<CalendarIntegration>> {
        Box::pin(async move {
            Ok(self
                .state
                .lock()
                .await
                .integrations
                .iter()
                .filter(|integration| integration.technician_id == *technician_id)
                .cloned()
                .collect())
        })
    }

    fn load_integration<'a>(
        &'a self,
        integration_id: &'a IntegrationId,
    ) -> PortFuture<'a, Option<CalendarIntegration>> {
        Box::pin(async move { Ok(self.integration(integration_id).await) })
    }

    fn find_integration_by_grant<'a>(
        &'a self,
        grant_id: &'a GrantId,
    ) -> PortFuture<'a, Option<CalendarIntegration>> {
        Box::pin(async move {
            Ok(self
                .state
                .lock()
                .await
                .integrations
                .iter()
                .find(|integration| integration.grant_id == *grant_id)
                .cloned())
        })
    }

    fn save_integration<'a>(
        &'a self,
        integration: &'a CalendarIntegration,
    ) -> PortFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.integrations.retain(|existing| {
                existing.id != integration.id && existing.grant_id != integration.grant_id
            });
            state.integrations.push(integration.clone());
            Ok(())
        })
    }

    fn set_write_target<'a>(
        &'a self,
        technician_id: &'a TechnicianId,
        integration_id: &'a IntegrationId,
    ) -> PortFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state
                .integrations
                .iter_mut()
                .filter(|integration| integration.technician_id == *technician_id)
                .for_each(|integration| integration.is_write_target = false);
            state.integration_mut(integration_id)?.is_write_target = true;
            Ok(())
        })
    }

    fn mark_disconnected<'a>(&'a self, integration_id: &'a IntegrationId) -> PortFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let integration = state.integration_mut(integration_id)?;
            integration.status = IntegrationStatus::Disconnected;
            integration.is_write_target = false;
            Ok(())
        })
    }

    fn load_event_for_job<'a>(
        &'a self,
        job_id: &'a JobId,
    ) -> PortFuture<'a, Option<CalendarEvent>> {
        Box::pin(async move { Ok(self.event(job_id).await) })
    }

    fn find_event_by_external<'a>(
        &'a self,
        external_event_id: &'a ExternalEventId,
        grant_id: &'a GrantId,
    ) -> PortFuture<'a, Option<CalendarEvent>> {
        Box::pin(async move {
            Ok(self
                .state
                .lock()
                .await
                .events
                .values()
                .find(|event| {
                    event.external_event_id.as_ref() == Some(external_event_id)
                        && event.grant_id.as_ref() == Some(grant_id)
                })
                .cloned())
        })
    }

    fn upsert_event<'a>(&'a self, event: &'a CalendarEvent) -> PortFuture<'a, ()> {
        Box::pin(async move {
            self.insert_event(event.clone()).await;
            Ok(())
        })
    }

    fn reset_events_for_grant<'a>(&'a self, grant_id: &'a GrantId) -> PortFuture<'a, u64> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let mut reset = 0_u64;
            for event in state
                .events
                .values_mut()
                .filter(|event| event.grant_id.as_ref() == Some(grant_id))
            {
                event.sync_status = SyncStatus::Pending;
                event.external_event_id = None;
                event.calendar_id = None;
                event.grant_id = None;
                reset += 1;
            }
            Ok(reset)
        })
    }

    fn jobs_needing_push<'a>(
        &'a self,
        technician_id: &'a TechnicianId,
    ) -> PortFuture<'a, Vec<JobId>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            let mut job_ids: Vec<JobId> = state
                .jobs
                .values()
                .filter(|job| job.assigned_technician.as_ref() == Some(technician_id))
                .filter(|job| job.status.occupies_calendar())
                .filter(|job| {
                    state
                        .events
                        .get(&job.id)
                        .map_or(true, |event| event.sync_status.needs_push())
                })
                .map(|job| job.id)
                .collect();
            job_ids.sort();
            Ok(job_ids)
        })
    }
}

impl NotificationSink for InMemoryStore {
    fn notify(&self, notification: Notification) -> PortFuture<'_, ()> {
        Box::pin(async move {
            self.state.lock().await.notifications.push(notification);
            Ok(())
        })
    }
}
