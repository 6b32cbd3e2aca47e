#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

mod matrix;

pub use matrix::{AssignmentRequirement, TransitionMatrix};

use crate::error::{DispatchError, Result};
use crate::ports::JobStore;
use crate::types::{Job, JobId, ProjectStatus, Requester};
use tracing::info;

/// Validates and persists job status changes. No calendar side effects.
pub struct ProjectLifecycleService<P> {
    ports: P,
    matrix: TransitionMatrix,
}

impl<P> ProjectLifecycleService<P>
where
    P: JobStore + Sync,
{
    #[must_use]
    pub fn new(ports: P) -> Self {
        Self::with_matrix(ports, TransitionMatrix::standard())
    }

    #[must_use]
    pub const fn with_matrix(ports: P, matrix: TransitionMatrix) -> Self {
        Self { ports, matrix }
    }

    #[must_use]
    pub const fn matrix(&self) -> &TransitionMatrix {
        &self.matrix
    }

    /// # Errors
    /// `Validation` when `target` is `Cancelled` (cancellation must go through
    /// `JobAssignmentService::cancel`, which also removes the calendar event),
    /// `NotFound` for an unknown job, `Forbidden` when the matrix rejects the
    /// request, or a store failure.
    pub async fn update_status(
        &self,
        requester: &Requester,
        job_id: &JobId,
        target: ProjectStatus,
    ) -> Result<Job> {
        if target == ProjectStatus::Cancelled {
            return Err(DispatchError::Validation(format!(
                "job {job_id} must be cancelled through the assignment service"
            )));
        }
        self.transition(requester, job_id, target).await
    }

    /// Status half of a cancellation; the caller owns the calendar cleanup.
    pub(crate) async fn cancel(&self, requester: &Requester, job_id: &JobId) -> Result<Job> {
        self.transition(requester, job_id, ProjectStatus::Cancelled)
            .await
    }

    async fn transition(
        &self,
        requester: &Requester,
        job_id: &JobId,
        target: ProjectStatus,
    ) -> Result<Job> {
        let mut job = self
            .ports
            .load_job(job_id)
            .await?
            .ok_or_else(|| DispatchError::NotFound(format!("job {job_id}")))?;

        self.matrix.authorize(requester, &job, target)?;
        self.ports.update_status(job_id, target).await?;

        info!(
            job_id = %job_id,
            from = %job.status,
            to = %target,
            role = %requester.role,
            "job status updated"
        );
        job.status = target;
        Ok(job)
    }
}

#[cfg(test)]
mod tests;
