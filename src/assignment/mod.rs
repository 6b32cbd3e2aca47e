#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

//! Job mutations that move a job on a technician's calendar.
//!
//! Every operation persists the job change first and then pushes it through
//! the sync orchestrator. Sync problems are reported in the returned
//! [`AssignmentOutcome`], never as an error of the mutation itself.

use crate::calendar_sync::{CalendarSyncOrchestrator, SyncOutcome, SyncPolicy};
use crate::error::{DispatchError, Result};
use crate::lifecycle::ProjectLifecycleService;
use crate::ports::DispatchPorts;
use crate::provider::CalendarProvider;
use crate::types::{Job, JobId, ProjectStatus, Requester, Role, TechnicianId, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentOutcome {
    pub job: Job,
    /// `None` when the operation has no calendar effect.
    pub sync: Option<SyncOutcome>,
}

impl AssignmentOutcome {
    const fn without_sync(job: Job) -> Self {
        Self { job, sync: None }
    }
}

pub struct JobAssignmentService<P, C> {
    ports: P,
    lifecycle: ProjectLifecycleService<P>,
    sync: CalendarSyncOrchestrator<P, C>,
}

impl<P, C> JobAssignmentService<P, C>
where
    P: DispatchPorts + Clone + Sync,
    C: CalendarProvider + Sync,
{
    #[must_use]
    pub fn new(ports: P, provider: C, policy: SyncPolicy) -> Self {
        Self {
            lifecycle: ProjectLifecycleService::new(ports.clone()),
            sync: CalendarSyncOrchestrator::new(ports.clone(), provider, policy),
            ports,
        }
    }

    #[must_use]
    pub const fn orchestrator(&self) -> &CalendarSyncOrchestrator<P, C> {
        &self.sync
    }

    /// Assign (or reassign) the field technician and push the event.
    ///
    /// A PENDING job becomes BOOKED. When the technician changes, the event
    /// on the previous technician's calendar is removed first.
    ///
    /// # Errors
    /// `Forbidden` for roles that cannot assign, `NotFound` for an unknown
    /// job or technician, `Validation` when the job is no longer schedulable.
    pub async fn assign_technician(
        &self,
        requester: &Requester,
        job_id: &JobId,
        technician_id: &TechnicianId,
    ) -> Result<AssignmentOutcome> {
        ensure_can_assign(requester)?;
        let job = self.schedulable_job(job_id).await?;
        self.ports
            .load_technician(technician_id)
            .await?
            .ok_or_else(|| DispatchError::NotFound(format!("technician {technician_id}")))?;

        if job.assigned_technician.is_some_and(|current| current != *technician_id) {
            best_effort(job_id, self.sync.remove_job_event(job_id).await);
        }

        self.ports
            .update_assignment(job_id, Some(*technician_id), job.assigned_editor)
            .await?;
        if job.status == ProjectStatus::Pending {
            let authority = Requester::new(requester.user_id, Role::Admin);
            self.lifecycle
                .update_status(&authority, job_id, ProjectStatus::Booked)
                .await?;
        }

        info!(job_id = %job_id, technician_id = %technician_id, by = %requester.user_id, "technician assigned");
        self.sync_after_change(job_id).await
    }

    /// # Errors
    /// `Forbidden`, `NotFound` for an unknown job, or a store failure.
    pub async fn unassign_technician(
        &self,
        requester: &Requester,
        job_id: &JobId,
    ) -> Result<AssignmentOutcome> {
        ensure_can_assign(requester)?;
        let job = self.load_job(job_id).await?;
        if job.assigned_technician.is_none() {
            return Ok(AssignmentOutcome::without_sync(job));
        }

        let removal = best_effort(job_id, self.sync.remove_job_event(job_id).await);
        self.ports
            .update_assignment(job_id, None, job.assigned_editor)
            .await?;

        info!(job_id = %job_id, by = %requester.user_id, "technician unassigned");
        Ok(AssignmentOutcome {
            job: self.load_job(job_id).await?,
            sync: Some(removal),
        })
    }

    /// Editors never appear on field calendars, so no sync runs.
    ///
    /// # Errors
    /// `Forbidden`, `NotFound` for an unknown job, or a store failure.
    pub async fn assign_editor(
        &self,
        requester: &Requester,
        job_id: &JobId,
        editor: Option<UserId>,
    ) -> Result<AssignmentOutcome> {
        ensure_can_assign(requester)?;
        let job = self.load_job(job_id).await?;
        self.ports
            .update_assignment(job_id, job.assigned_technician, editor)
            .await?;
        info!(job_id = %job_id, by = %requester.user_id, "editor assignment changed");
        Ok(AssignmentOutcome::without_sync(self.load_job(job_id).await?))
    }

    /// # Errors
    /// `Validation` when `end <= start` or the job is no longer schedulable,
    /// plus the errors of [`Self::assign_technician`].
    pub async fn reschedule(
        &self,
        requester: &Requester,
        job_id: &JobId,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> Result<AssignmentOutcome> {
        ensure_can_assign(requester)?;
        if end.is_some_and(|end| end <= start) {
            return Err(DispatchError::Validation(format!(
                "job {job_id} must end after it starts"
            )));
        }
        self.schedulable_job(job_id).await?;

        self.ports.update_schedule(job_id, start, end).await?;
        info!(job_id = %job_id, start = %start, by = %requester.user_id, "job rescheduled");
        self.sync_after_change(job_id).await
    }

    /// Soft-cancel: status CANCELLED and the external event removed.
    ///
    /// # Errors
    /// `Forbidden` unless the requester is a manager, `NotFound` for an
    /// unknown job, or a store failure.
    pub async fn cancel(&self, requester: &Requester, job_id: &JobId) -> Result<AssignmentOutcome> {
        let job = self
            .lifecycle
            .cancel(requester, job_id)
            .await?;
        let removal = best_effort(job_id, self.sync.remove_job_event(job_id).await);
        Ok(AssignmentOutcome {
            job,
            sync: Some(removal),
        })
    }

    /// Human resolution of a calendar conflict: flag and note are cleared.
    ///
    /// # Errors
    /// `Forbidden`, `NotFound` for an unknown job, or a store failure.
    pub async fn acknowledge_conflict(
        &self,
        requester: &Requester,
        job_id: &JobId,
    ) -> Result<AssignmentOutcome> {
        ensure_can_assign(requester)?;
        self.load_job(job_id).await?;
        self.ports.set_conflict(job_id, None).await?;
        info!(job_id = %job_id, by = %requester.user_id, "calendar conflict acknowledged");
        Ok(AssignmentOutcome::without_sync(self.load_job(job_id).await?))
    }

    async fn load_job(&self, job_id: &JobId) -> Result<Job> {
        self.ports
            .load_job(job_id)
            .await?
            .ok_or_else(|| DispatchError::NotFound(format!("job {job_id}")))
    }

    async fn schedulable_job(&self, job_id: &JobId) -> Result<Job> {
        let job = self.load_job(job_id).await?;
        if job.status.occupies_calendar() {
            Ok(job)
        } else {
            Err(DispatchError::Validation(format!(
                "job {job_id} is {} and can no longer be scheduled",
                job.status
            )))
        }
    }

    async fn sync_after_change(&self, job_id: &JobId) -> Result<AssignmentOutcome> {
        let sync = best_effort(job_id, self.sync.sync_job(job_id).await);
        Ok(AssignmentOutcome {
            job: self.load_job(job_id).await?,
            sync: Some(sync),
        })
    }
}

fn best_effort(job_id: &JobId, result: Result<SyncOutcome>) -> SyncOutcome {
    result.unwrap_or_else(|error| {
        warn!(job_id = %job_id, error = %error, "calendar sync errored; job change kept");
        SyncOutcome::Failed {
            error: error.to_string(),
        }
    })
}

fn ensure_can_assign(requester: &Requester) -> Result<()> {
    if requester.role.can_assign() {
        Ok(())
    } else {
        Err(DispatchError::Forbidden(format!(
            "{} may not change job assignments",
            requester.role
        )))
    }
}
