use super::outcome::{
    ConnectOutcome, DisconnectOutcome, ReconcileOutcome, SkipReason, SyncOutcome,
};
use crate::error::{DispatchError, Result};
use crate::ports::DispatchPorts;
use crate::provider::{CalendarProvider, EventDraft, ExternalEvent, ProviderCalendar};
use crate::types::{
    CalendarEvent, CalendarIntegration, CalendarWebhook, ChangeType, IntegrationId,
    IntegrationStatus, Job, JobId, Notification, ProjectStatus, SyncStatus, TechnicianId,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPolicy {
    /// Start-time divergence tolerated before a conflict is raised.
    pub drift_tolerance_secs: i64,
    pub default_job_duration_minutes: i64,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            drift_tolerance_secs: 60,
            default_job_duration_minutes: 60,
        }
    }
}

/// Keeps a job's external calendar event converged with the job record.
pub struct CalendarSyncOrchestrator<P, C> {
    ports: P,
    provider: C,
    policy: SyncPolicy,
}

impl<P, C> CalendarSyncOrchestrator<P, C>
where
    P: DispatchPorts + Sync,
    C: CalendarProvider + Sync,
{
    #[must_use]
    pub const fn new(ports: P, provider: C, policy: SyncPolicy) -> Self {
        Self {
            ports,
            provider,
            policy,
        }
    }

    /// Push the job's current schedule/assignment to the technician's write target.
    ///
    /// Provider failures are recorded on the CalendarEvent and reported as
    /// `SyncOutcome::Failed`, never as an `Err`.
    ///
    /// # Errors
    /// `NotFound` for an unknown job, or a store failure.
    pub async fn sync_job(&self, job_id: &JobId) -> Result<SyncOutcome> {
        let job = self.load_job(job_id).await?;

        if job.status == ProjectStatus::Cancelled {
            return self.remove_job_event(job_id).await;
        }
        let Some(technician_id) = job.assigned_technician else {
            return match self.ports.load_event_for_job(job_id).await? {
                Some(_) => self.remove_job_event(job_id).await,
                None => Ok(SyncOutcome::skipped(SkipReason::NoTechnician)),
            };
        };

        let Some(target) = self.write_target(&technician_id).await? else {
            debug!(job_id = %job_id, technician_id = %technician_id, "no write target; sync skipped");
            return Ok(SyncOutcome::skipped(SkipReason::NoWriteTarget));
        };

        let draft = self.draft_for(&job);
        let previous = self
            .ports
            .load_event_for_job(job_id)
            .await?
            .filter(|event| event.sync_status != SyncStatus::Deleted);

        match previous {
            Some(prev) if prev.references_grant(&target.grant_id) => {
                self.update_or_recreate(&job, &target, &draft, &prev).await
            }
            Some(prev) => {
                self.delete_remote_best_effort(&prev).await;
                self.create(&job, &target, &draft, None, false).await
            }
            None => self.create(&job, &target, &draft, None, false).await,
        }
    }

    /// Delete the job's external event, if any, and mark the record DELETED.
    ///
    /// Remote deletion is best-effort; failures are logged only.
    ///
    /// # Errors
    /// Store failures.
    pub async fn remove_job_event(&self, job_id: &JobId) -> Result<SyncOutcome> {
        let Some(event) = self.ports.load_event_for_job(job_id).await? else {
            return Ok(SyncOutcome::skipped(SkipReason::NoCalendarEvent));
        };
        if event.sync_status == SyncStatus::Deleted {
            return Ok(SyncOutcome::skipped(SkipReason::AlreadyRemoved));
        }

        self.delete_remote_best_effort(&event).await;
        self.ports.upsert_event(&event.deleted()).await?;
        info!(job_id = %job_id, "calendar event removed");
        Ok(SyncOutcome::Removed)
    }

    /// Apply a provider change notification. Divergence is flagged on the job,
    /// never written back to the schedule.
    ///
    /// # Errors
    /// `ExternalCommunication` when the changed event cannot be fetched (the
    /// CalendarEvent is left untouched), `NotFound` when the referenced job is
    /// gone, or a store failure.
    pub async fn reconcile(&self, webhook: &CalendarWebhook) -> Result<ReconcileOutcome> {
        let Some(event) = self
            .ports
            .find_event_by_external(&webhook.external_event_id, &webhook.grant_id)
            .await?
        else {
            debug!(
                external_event_id = %webhook.external_event_id,
                grant_id = %webhook.grant_id,
                "webhook for untracked event ignored"
            );
            return Ok(ReconcileOutcome::Untracked);
        };
        if event.sync_status == SyncStatus::Deleted {
            return Ok(ReconcileOutcome::AlreadyDeleted);
        }

        let job = self.load_job(&event.job_id).await?;

        match webhook.change_type {
            ChangeType::Deleted => self.flag_external_deletion(&job, event).await,
            ChangeType::Updated => {
                let calendar_id = event.calendar_id.clone().ok_or_else(|| {
                    DispatchError::Internal(format!(
                        "calendar event for job {} has no calendar id",
                        job.id
                    ))
                })?;
                let fetched = self
                    .provider
                    .fetch_event(&webhook.grant_id, &calendar_id, &webhook.external_event_id)
                    .await;

                match fetched {
                    Ok(remote) if remote.is_cancelled() => {
                        self.flag_external_deletion(&job, event).await
                    }
                    Ok(remote) => self.compare_schedule(&job, event, &remote).await,
                    Err(DispatchError::ProviderGone(_)) => {
                        self.flag_external_deletion(&job, event).await
                    }
                    Err(error) => {
                        warn!(job_id = %job.id, error = %error, "could not fetch changed event");
                        Err(error)
                    }
                }
            }
        }
    }

    /// Disconnect an integration: local state first, remote revoke best-effort.
    ///
    /// Dependent CalendarEvents are reset to PENDING with external ids
    /// cleared so a later reconnect recreates them. Safe to repeat.
    ///
    /// # Errors
    /// `NotFound` for an unknown integration, or a store failure.
    pub async fn disconnect_integration(
        &self,
        integration_id: &IntegrationId,
    ) -> Result<DisconnectOutcome> {
        let integration = self
            .ports
            .load_integration(integration_id)
            .await?
            .ok_or_else(|| DispatchError::NotFound(format!("integration {integration_id}")))?;

        self.ports.mark_disconnected(integration_id).await?;
        let events_reset = self
            .ports
            .reset_events_for_grant(&integration.grant_id)
            .await?;

        let grant_revoked = match self.provider.revoke_grant(&integration.grant_id).await {
            Ok(()) => true,
            Err(error) => {
                warn!(
                    integration_id = %integration_id,
                    grant_id = %integration.grant_id,
                    error = %error,
                    "grant revocation failed; local disconnect kept"
                );
                false
            }
        };

        info!(
            integration_id = %integration_id,
            technician_id = %integration.technician_id,
            events_reset,
            grant_revoked,
            "calendar integration disconnected"
        );
        Ok(DisconnectOutcome {
            events_reset,
            grant_revoked,
        })
    }

    /// Exchange an authorization code, store the integration and re-push the
    /// technician's pending events.
    ///
    /// # Errors
    /// `NotFound` for an unknown technician, `Validation` when the account
    /// has no writable calendar, `Conflict` when the grant already belongs to
    /// another technician, provider failures of the exchange itself, or a
    /// store failure.
    pub async fn connect_integration(
        &self,
        technician_id: &TechnicianId,
        authorization_code: &str,
    ) -> Result<ConnectOutcome> {
        self.ports
            .load_technician(technician_id)
            .await?
            .ok_or_else(|| DispatchError::NotFound(format!("technician {technician_id}")))?;

        let exchange = self.provider.exchange_code(authorization_code).await?;
        let calendars = self.provider.list_calendars(&exchange.grant_id).await?;
        let calendar = pick_writable_calendar(&calendars).ok_or_else(|| {
            DispatchError::Validation(format!(
                "account {} has no writable calendar",
                exchange.email
            ))
        })?;

        let reused_id = match self.ports.find_integration_by_grant(&exchange.grant_id).await? {
            Some(owned) if owned.technician_id != *technician_id => {
                return Err(DispatchError::Conflict(format!(
                    "grant {} is already connected to technician {}",
                    exchange.grant_id, owned.technician_id
                )));
            }
            owned => owned.map(|integration| integration.id),
        };
        let existing = self
            .ports
            .integrations_for_technician(technician_id)
            .await?;
        let has_write_target = existing.iter().any(|integration| {
            integration.is_active_write_target() && integration.grant_id != exchange.grant_id
        });

        let mut integration = CalendarIntegration {
            id: reused_id.unwrap_or_else(IntegrationId::generate),
            technician_id: *technician_id,
            grant_id: exchange.grant_id,
            calendar_id: calendar.id.clone(),
            account_email: exchange.email,
            status: IntegrationStatus::Active,
            is_write_target: false,
            connected_at: Utc::now(),
        };
        self.ports.save_integration(&integration).await?;

        if !has_write_target {
            self.ports
                .set_write_target(technician_id, &integration.id)
                .await?;
            integration.is_write_target = true;
        }

        info!(
            technician_id = %technician_id,
            integration_id = %integration.id,
            write_target = integration.is_write_target,
            "calendar integration connected"
        );

        let resynced = self.resync_technician(technician_id).await?;
        Ok(ConnectOutcome {
            integration,
            resynced,
        })
    }

    /// Make one integration the technician's only write target.
    ///
    /// # Errors
    /// `NotFound` for an unknown integration, `Validation` when it belongs to
    /// another technician or is disconnected, or a store failure.
    pub async fn set_write_target(
        &self,
        technician_id: &TechnicianId,
        integration_id: &IntegrationId,
    ) -> Result<()> {
        let integration = self
            .ports
            .load_integration(integration_id)
            .await?
            .ok_or_else(|| DispatchError::NotFound(format!("integration {integration_id}")))?;

        if integration.technician_id != *technician_id {
            return Err(DispatchError::Validation(format!(
                "integration {integration_id} does not belong to technician {technician_id}"
            )));
        }
        if !integration.is_active() {
            return Err(DispatchError::Validation(format!(
                "integration {integration_id} is disconnected"
            )));
        }

        self.ports
            .set_write_target(technician_id, integration_id)
            .await
    }

    /// Re-push every PENDING/FAILED event of the technician's jobs.
    ///
    /// # Errors
    /// Store failures.
    pub async fn resync_technician(
        &self,
        technician_id: &TechnicianId,
    ) -> Result<Vec<(JobId, SyncOutcome)>> {
        let job_ids = self.ports.jobs_needing_push(technician_id).await?;
        let mut outcomes = Vec::with_capacity(job_ids.len());
        for job_id in job_ids {
            let outcome = self.sync_job(&job_id).await?;
            outcomes.push((job_id, outcome));
        }
        Ok(outcomes)
    }

    async fn load_job(&self, job_id: &JobId) -> Result<Job> {
        self.ports
            .load_job(job_id)
            .await?
            .ok_or_else(|| DispatchError::NotFound(format!("job {job_id}")))
    }

    async fn write_target(
        &self,
        technician_id: &TechnicianId,
    ) -> Result<Option<CalendarIntegration>> {
        Ok(self
            .ports
            .integrations_for_technician(technician_id)
            .await?
            .into_iter()
            .find(CalendarIntegration::is_active_write_target))
    }

    fn draft_for(&self, job: &Job) -> EventDraft {
        EventDraft {
            title: format!("Shoot: {}", job.title),
            description: Some(format!("Dispatch job {}", job.id)),
            location: job.address.clone(),
            start: job.scheduled_start,
            end: job.effective_end(Duration::minutes(
                self.policy.default_job_duration_minutes.max(1),
            )),
        }
    }

    async fn update_or_recreate(
        &self,
        job: &Job,
        target: &CalendarIntegration,
        draft: &EventDraft,
        previous: &CalendarEvent,
    ) -> Result<SyncOutcome> {
        let (Some(event_id), calendar_id) = (
            previous.external_event_id.as_ref(),
            previous.calendar_id.as_ref().unwrap_or(&target.calendar_id),
        ) else {
            return self.create(job, target, draft, Some(previous), false).await;
        };

        match self
            .provider
            .update_event(&target.grant_id, calendar_id, event_id, draft)
            .await
        {
            Ok(remote) => {
                let record = CalendarEvent::synced(
                    job.id,
                    remote.id.clone(),
                    remote.calendar_id,
                    target.grant_id.clone(),
                    Utc::now(),
                );
                self.ports.upsert_event(&record).await?;
                debug!(job_id = %job.id, external_event_id = %remote.id, "calendar event updated");
                Ok(SyncOutcome::Updated {
                    external_event_id: remote.id,
                })
            }
            Err(error) => {
                warn!(
                    job_id = %job.id,
                    external_event_id = %event_id,
                    error = %error,
                    "calendar update failed; creating a replacement event"
                );
                let outcome = self.create(job, target, draft, Some(previous), true).await?;
                // Only the replacement is tracked now; drop the old remote copy.
                if !outcome.is_failed() && !matches!(error, DispatchError::ProviderGone(_)) {
                    self.delete_remote_best_effort(previous).await;
                }
                Ok(outcome)
            }
        }
    }

    async fn create(
        &self,
        job: &Job,
        target: &CalendarIntegration,
        draft: &EventDraft,
        previous: Option<&CalendarEvent>,
        recreating: bool,
    ) -> Result<SyncOutcome> {
        match self
            .provider
            .create_event(&target.grant_id, &target.calendar_id, draft)
            .await
        {
            Ok(remote) => {
                let record = CalendarEvent::synced(
                    job.id,
                    remote.id.clone(),
                    target.calendar_id.clone(),
                    target.grant_id.clone(),
                    Utc::now(),
                );
                self.ports.upsert_event(&record).await?;
                info!(job_id = %job.id, external_event_id = %remote.id, "calendar event created");
                Ok(if recreating {
                    SyncOutcome::Recreated {
                        external_event_id: remote.id,
                    }
                } else {
                    SyncOutcome::Created {
                        external_event_id: remote.id,
                    }
                })
            }
            Err(error) => {
                let message = error.to_string();
                warn!(job_id = %job.id, error = %message, "calendar event push failed");
                self.ports
                    .upsert_event(&CalendarEvent::failed(job.id, previous, message.clone()))
                    .await?;
                Ok(SyncOutcome::Failed { error: message })
            }
        }
    }

    async fn delete_remote_best_effort(&self, event: &CalendarEvent) {
        let (Some(event_id), Some(calendar_id), Some(grant_id)) = (
            event.external_event_id.as_ref(),
            event.calendar_id.as_ref(),
            event.grant_id.as_ref(),
        ) else {
            return;
        };

        match self
            .provider
            .delete_event(grant_id, calendar_id, event_id)
            .await
        {
            Ok(()) => debug!(job_id = %event.job_id, external_event_id = %event_id, "remote event deleted"),
            Err(DispatchError::ProviderGone(_)) => {
                debug!(job_id = %event.job_id, external_event_id = %event_id, "remote event already gone");
            }
            Err(error) => warn!(
                job_id = %event.job_id,
                external_event_id = %event_id,
                error = %error,
                "remote event deletion failed; continuing"
            ),
        }
    }

    async fn compare_schedule(
        &self,
        job: &Job,
        event: CalendarEvent,
        remote: &ExternalEvent,
    ) -> Result<ReconcileOutcome> {
        let drift = (remote.start - job.scheduled_start).num_seconds().abs();
        if drift <= self.policy.drift_tolerance_secs {
            // Only the start is compared, so a PENDING/FAILED record stays queued
            // for a real push instead of being confirmed by a webhook echo.
            if event.sync_status == SyncStatus::Synced {
                let confirmed = CalendarEvent {
                    last_synced_at: Some(Utc::now()),
                    ..event
                };
                self.ports.upsert_event(&confirmed).await?;
            }
            return Ok(ReconcileOutcome::InSync);
        }

        let note = format!(
            "Calendar event for \"{}\" was moved externally to {} (job scheduled for {})",
            job.title,
            remote.start.to_rfc3339(),
            job.scheduled_start.to_rfc3339()
        );
        info!(job_id = %job.id, drift_secs = drift, "calendar conflict flagged");
        self.raise_conflict(job, &note).await?;
        Ok(ReconcileOutcome::ConflictFlagged { note })
    }

    async fn flag_external_deletion(
        &self,
        job: &Job,
        event: CalendarEvent,
    ) -> Result<ReconcileOutcome> {
        self.ports.upsert_event(&event.deleted()).await?;
        let note = format!(
            "Calendar event for \"{}\" was deleted externally; the job is still scheduled for {}",
            job.title,
            job.scheduled_start.to_rfc3339()
        );
        info!(job_id = %job.id, "external calendar deletion flagged");
        self.raise_conflict(job, &note).await?;
        Ok(ReconcileOutcome::DeletedExternally { note })
    }

    async fn raise_conflict(&self, job: &Job, note: &str) -> Result<()> {
        self.ports
            .set_conflict(&job.id, Some(note.to_string()))
            .await?;

        let Some(technician_id) = job.assigned_technician else {
            return Ok(());
        };
        let Some(technician) = self.ports.load_technician(&technician_id).await? else {
            warn!(job_id = %job.id, technician_id = %technician_id, "assigned technician missing; no notification");
            return Ok(());
        };

        let notification = Notification {
            recipient: technician.user_id,
            job_id: job.id,
            message: format!("Calendar conflict on \"{}\" needs attention", job.title),
            conflict_note: Some(note.to_string()),
        };
        if let Err(error) = self.ports.notify(notification).await {
            warn!(job_id = %job.id, error = %error, "conflict notification failed");
        }
        Ok(())
    }
}

/// Primary writable calendar, else the first writable one.
fn pick_writable_calendar(calendars: &[ProviderCalendar]) -> Option<&ProviderCalendar> {
    calendars
        .iter()
        .find(|calendar| calendar.is_primary && !calendar.read_only)
        .or_else(|| calendars.iter().find(|calendar| !calendar.read_only))
}
