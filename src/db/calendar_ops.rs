use crate::db::mappers::{EventRow, IntegrationRow};
use crate::db::DispatchDb;
use crate::error::{DispatchError, Result};
use crate::types::{
    CalendarEvent, CalendarIntegration, ExternalCalendarId, ExternalEventId, GrantId, IntegrationId, JobId,
    Notification, TechnicianId,
};
use sqlx::{Acquire, FromRow};
use tracing::{debug, info};
use uuid::Uuid;

const INTEGRATION_COLUMNS: &str =
    "id, technician_id, grant_id, calendar_id, account_email, status, is_write_target, connected_at";

const EVENT_COLUMNS: &str =
    "job_id, external_event_id, calendar_id, grant_id, sync_status, last_synced_at, last_error";

#[derive(FromRow)]
struct JobIdRow {
    id: Uuid,
}

impl DispatchDb {
    pub(super) async fn fetch_integrations_for(
        &self,
        technician_id: &TechnicianId,
    ) -> Result<Vec<CalendarIntegration>> {
        sqlx::query_as::<_, IntegrationRow>(&format!(
            "SELECT {INTEGRATION_COLUMNS} FROM calendar_integrations
             WHERE technician_id = $1 ORDER BY connected_at"
        ))
        .bind(technician_id.value())
        .fetch_all(self.pool())
        .await
        .map_err(|e| DispatchError::DatabaseError(format!("Failed to load integrations: {e}")))?
        .into_iter()
        .map(IntegrationRow::into_integration)
        .collect()
    }

    pub(super) async fn fetch_integration(
        &self,
        integration_id: &IntegrationId,
    ) -> Result<Option<CalendarIntegration>> {
        sqlx::query_as::<_, IntegrationRow>(&format!(
            "SELECT {INTEGRATION_COLUMNS} FROM calendar_integrations WHERE id = $1"
        ))
        .bind(integration_id.value())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| DispatchError::DatabaseError(format!("Failed to load integration: {e}")))?
        .map(IntegrationRow::into_integration)
        .transpose()
    }

    pub(super) async fn fetch_integration_by_grant(
        &self,
        grant_id: &GrantId,
    ) -> Result<Option<CalendarIntegration>> {
        sqlx::query_as::<_, IntegrationRow>(&format!(
            "SELECT {INTEGRATION_COLUMNS} FROM calendar_integrations WHERE grant_id = $1"
        ))
        .bind(grant_id.value())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| DispatchError::DatabaseError(format!("Failed to find integration by grant: {e}")))?
        .map(IntegrationRow::into_integration)
        .transpose()
    }

    /// Upsert keyed by grant; a reconnect of the same account keeps its row id.
    pub(super) async fn write_integration(&self, integration: &CalendarIntegration) -> Result<()> {
        sqlx::query(
            "INSERT INTO calendar_integrations
                (id, technician_id, grant_id, calendar_id, account_email, status, is_write_target, connected_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (grant_id) DO UPDATE SET
                technician_id = EXCLUDED.technician_id,
                calendar_id = EXCLUDED.calendar_id,
                account_email = EXCLUDED.account_email,
                status = EXCLUDED.status,
                is_write_target = EXCLUDED.is_write_target,
                connected_at = EXCLUDED.connected_at",
        )
        .bind(integration.id.value())
        .bind(integration.technician_id.value())
        .bind(integration.grant_id.value())
        .bind(integration.calendar_id.value())
        .bind(&integration.account_email)
        .bind(integration.status.as_str())
        .bind(integration.is_write_target)
        .bind(integration.connected_at)
        .execute(self.pool())
        .await
        .map(|_| ())
        .map_err(|e| DispatchError::DatabaseError(format!("Failed to save integration: {e}")))
    }

    /// Clear-then-set inside one transaction; last writer wins.
    pub(super) async fn write_target(
        &self,
        technician_id: &TechnicianId,
        integration_id: &IntegrationId,
    ) -> Result<()> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| DispatchError::DatabaseError(format!("Failed to begin tx: {e}")))?;

        let conn = tx
            .acquire()
            .await
            .map_err(|e| DispatchError::DatabaseError(format!("Failed to acquire tx conn: {e}")))?;

        sqlx::query(
            "UPDATE calendar_integrations SET is_write_target = FALSE
             WHERE technician_id = $1 AND is_write_target",
        )
        .bind(technician_id.value())
        .execute(&mut *conn)
        .await
        .map_err(|e| DispatchError::DatabaseError(format!("Failed to clear write target: {e}")))?;

        let updated = sqlx::query(
            "UPDATE calendar_integrations SET is_write_target = TRUE
             WHERE id = $1 AND technician_id = $2",
        )
        .bind(integration_id.value())
        .bind(technician_id.value())
        .execute(&mut *conn)
        .await
        .map_err(|e| DispatchError::DatabaseError(format!("Failed to set write target: {e}")))?
        .rows_affected();

        if updated == 0 {
            return Err(DispatchError::NotFound(format!(
                "integration {integration_id} for technician {technician_id}"
            )));
        }

        tx.commit()
            .await
            .map(|()| info!(technician_id = %technician_id, integration_id = %integration_id, "write target changed"))
            .map_err(|e| DispatchError::DatabaseError(format!("Failed to commit tx: {e}")))
    }

    pub(super) async fn write_disconnected(&self, integration_id: &IntegrationId) -> Result<()> {
        let updated = sqlx::query(
            "UPDATE calendar_integrations SET status = 'DISCONNECTED', is_write_target = FALSE
             WHERE id = $1",
        )
        .bind(integration_id.value())
        .execute(self.pool())
        .await
        .map_err(|e| DispatchError::DatabaseError(format!("Failed to disconnect integration: {e}")))?
        .rows_affected();

        if updated == 0 {
            Err(DispatchError::NotFound(format!("integration {integration_id}")))
        } else {
            Ok(())
        }
    }

    pub(super) async fn fetch_event_for_job(&self, job_id: &JobId) -> Result<Option<CalendarEvent>> {
        sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM calendar_events WHERE job_id = $1"
        ))
        .bind(job_id.value())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| DispatchError::DatabaseError(format!("Failed to load calendar event: {e}")))?
        .map(EventRow::into_event)
        .transpose()
    }

    pub(super) async fn fetch_event_by_external(
        &self,
        external_event_id: &ExternalEventId,
        grant_id: &GrantId,
    ) -> Result<Option<CalendarEvent>> {
        sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM calendar_events
             WHERE external_event_id = $1 AND grant_id = $2"
        ))
        .bind(external_event_id.value())
        .bind(grant_id.value())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| DispatchError::DatabaseError(format!("Failed to find calendar event: {e}")))?
        .map(EventRow::into_event)
        .transpose()
    }

    /// Atomic upsert by job id.
    pub(super) async fn write_event(&self, event: &CalendarEvent) -> Result<()> {
        sqlx::query(
            "INSERT INTO calendar_events
                (job_id, external_event_id, calendar_id, grant_id, sync_status, last_synced_at, last_error)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (job_id) DO UPDATE SET
                external_event_id = EXCLUDED.external_event_id,
                calendar_id = EXCLUDED.calendar_id,
                grant_id = EXCLUDED.grant_id,
                sync_status = EXCLUDED.sync_status,
                last_synced_at = EXCLUDED.last_synced_at,
                last_error = EXCLUDED.last_error",
        )
        .bind(event.job_id.value())
        .bind(event.external_event_id.as_ref().map(ExternalEventId::value))
        .bind(event.calendar_id.as_ref().map(ExternalCalendarId::value))
        .bind(event.grant_id.as_ref().map(GrantId::value))
        .bind(event.sync_status.as_str())
        .bind(event.last_synced_at)
        .bind(event.last_error.as_deref())
        .execute(self.pool())
        .await
        .map(|_| debug!(job_id = %event.job_id, status = %event.sync_status, "calendar event upserted"))
        .map_err(|e| DispatchError::DatabaseError(format!("Failed to upsert calendar event: {e}")))
    }

    pub(super) async fn write_reset_for_grant(&self, grant_id: &GrantId) -> Result<u64> {
        sqlx::query(
            "UPDATE calendar_events
             SET sync_status = 'PENDING', external_event_id = NULL, calendar_id = NULL, grant_id = NULL
             WHERE grant_id = $1",
        )
        .bind(grant_id.value())
        .execute(self.pool())
        .await
        .map(|result| result.rows_affected())
        .map_err(|e| DispatchError::DatabaseError(format!("Failed to reset calendar events: {e}")))
    }

    pub(super) async fn fetch_jobs_needing_push(
        &self,
        technician_id: &TechnicianId,
    ) -> Result<Vec<JobId>> {
        sqlx::query_as::<_, JobIdRow>(
            "SELECT j.id FROM jobs j
             LEFT JOIN calendar_events e ON e.job_id = j.id
             WHERE j.assigned_technician = $1
               AND j.status IN ('PENDING', 'BOOKED', 'SHOOTING')
               AND (e.job_id IS NULL OR e.sync_status IN ('PENDING', 'FAILED'))
             ORDER BY j.id",
        )
        .bind(technician_id.value())
        .fetch_all(self.pool())
        .await
        .map(|rows| rows.into_iter().map(|row| JobId::new(row.id)).collect())
        .map_err(|e| DispatchError::DatabaseError(format!("Failed to list jobs to push: {e}")))
    }

    pub(super) async fn write_notification(&self, notification: &Notification) -> Result<()> {
        sqlx::query(
            "INSERT INTO notifications (recipient, job_id, message, conflict_note)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(notification.recipient.value())
        .bind(notification.job_id.value())
        .bind(&notification.message)
        .bind(notification.conflict_note.as_deref())
        .execute(self.pool())
        .await
        .map(|_| ())
        .map_err(|e| DispatchError::DatabaseError(format!("Failed to store notification: {e}")))
    }
}
