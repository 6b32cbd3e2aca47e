use crate::db::mappers::JobRow;
use crate::db::DispatchDb;
use crate::error::{DispatchError, Result};
use crate::types::{Job, JobId, ProjectStatus, TechnicianId, UserId};
use chrono::{DateTime, Utc};
use tracing::debug;

const JOB_COLUMNS: &str = "id, organization_id, title, address, location_lat, location_lng, \
     required_media, status, scheduled_start, scheduled_end, assigned_technician, \
     assigned_editor, calendar_conflict, calendar_conflict_note";

impl DispatchDb {
    /// Insert or fully replace a job record.
    ///
    /// # Errors
    /// Returns [`DispatchError::DatabaseError`] on query failure.
    pub async fn save_job(&self, job: &Job) -> Result<()> {
        sqlx::query(
            "INSERT INTO jobs (id, organization_id, title, address, location_lat, location_lng,
                required_media, status, scheduled_start, scheduled_end, assigned_technician,
                assigned_editor, calendar_conflict, calendar_conflict_note)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             ON CONFLICT (id) DO UPDATE SET
                organization_id = EXCLUDED.organization_id,
                title = EXCLUDED.title,
                address = EXCLUDED.address,
                location_lat = EXCLUDED.location_lat,
                location_lng = EXCLUDED.location_lng,
                required_media = EXCLUDED.required_media,
                status = EXCLUDED.status,
                scheduled_start = EXCLUDED.scheduled_start,
                scheduled_end = EXCLUDED.scheduled_end,
                assigned_technician = EXCLUDED.assigned_technician,
                assigned_editor = EXCLUDED.assigned_editor,
                calendar_conflict = EXCLUDED.calendar_conflict,
                calendar_conflict_note = EXCLUDED.calendar_conflict_note,
                updated_at = NOW()",
        )
        .bind(job.id.value())
        .bind(job.organization_id.value())
        .bind(&job.title)
        .bind(job.address.as_deref())
        .bind(job.location.map(|point| point.lat))
        .bind(job.location.map(|point| point.lng))
        .bind(serde_json::to_value(&job.required_media)?)
        .bind(job.status.as_str())
        .bind(job.scheduled_start)
        .bind(job.scheduled_end)
        .bind(job.assigned_technician.map(|id| id.value()))
        .bind(job.assigned_editor.map(|id| id.value()))
        .bind(job.calendar_conflict)
        .bind(job.calendar_conflict_note.as_deref())
        .execute(self.pool())
        .await
        .map(|_| debug!(job_id = %job.id, "job saved"))
        .map_err(|e| DispatchError::DatabaseError(format!("Failed to save job: {e}")))
    }

    /// # Errors
    /// Returns [`DispatchError::DatabaseError`] on query or mapping failure.
    pub async fn fetch_job(&self, job_id: &JobId) -> Result<Option<Job>> {
        sqlx::query_as::<_, JobRow>(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"))
            .bind(job_id.value())
            .fetch_optional(self.pool())
            .await
            .map_err(|e| DispatchError::DatabaseError(format!("Failed to load job: {e}")))?
            .map(JobRow::into_job)
            .transpose()
    }

    pub(super) async fn write_status(&self, job_id: &JobId, status: ProjectStatus) -> Result<()> {
        let result = sqlx::query("UPDATE jobs SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(job_id.value())
            .bind(status.as_str())
            .execute(self.pool())
            .await
            .map_err(|e| DispatchError::DatabaseError(format!("Failed to update status: {e}")))?;
        require_row(result.rows_affected(), job_id)
    }

    pub(super) async fn write_assignment(
        &self,
        job_id: &JobId,
        technician_id: Option<TechnicianId>,
        editor_id: Option<UserId>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE jobs SET assigned_technician = $2, assigned_editor = $3, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(job_id.value())
        .bind(technician_id.map(|id| id.value()))
        .bind(editor_id.map(|id| id.value()))
        .execute(self.pool())
        .await
        .map_err(|e| DispatchError::DatabaseError(format!("Failed to update assignment: {e}")))?;
        require_row(result.rows_affected(), job_id)
    }

    pub(super) async fn write_schedule(
        &self,
        job_id: &JobId,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE jobs SET scheduled_start = $2, scheduled_end = $3, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(job_id.value())
        .bind(start)
        .bind(end)
        .execute(self.pool())
        .await
        .map_err(|e| DispatchError::DatabaseError(format!("Failed to update schedule: {e}")))?;
        require_row(result.rows_affected(), job_id)
    }

    pub(super) async fn write_conflict(&self, job_id: &JobId, note: Option<String>) -> Result<()> {
        let result = sqlx::query(
            "UPDATE jobs SET calendar_conflict = $2, calendar_conflict_note = $3, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(job_id.value())
        .bind(note.is_some())
        .bind(note)
        .execute(self.pool())
        .await
        .map_err(|e| DispatchError::DatabaseError(format!("Failed to update conflict flag: {e}")))?;
        require_row(result.rows_affected(), job_id)
    }
}

fn require_row(rows_affected: u64, job_id: &JobId) -> Result<()> {
    if rows_affected == 0 {
        Err(DispatchError::NotFound(format!("job {job_id}")))
    } else {
        Ok(())
    }
}
