use crate::db::mappers::{to_i32_u32, TechnicianRow};
use crate::db::DispatchDb;
use crate::error::{DispatchError, Result};
use crate::types::{Technician, TechnicianId};

impl DispatchDb {
    /// Insert or fully replace a technician profile.
    ///
    /// # Errors
    /// Returns [`DispatchError::DatabaseError`] on query failure.
    pub async fn save_technician(&self, technician: &Technician) -> Result<()> {
        sqlx::query(
            "INSERT INTO technicians (id, user_id, display_name, home_lat, home_lng, skills,
                on_time_rate, completed_jobs, avg_delivery_hours, preferred_by, available,
                utc_offset_minutes, work_hours)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             ON CONFLICT (id) DO UPDATE SET
                user_id = EXCLUDED.user_id,
                display_name = EXCLUDED.display_name,
                home_lat = EXCLUDED.home_lat,
                home_lng = EXCLUDED.home_lng,
                skills = EXCLUDED.skills,
                on_time_rate = EXCLUDED.on_time_rate,
                completed_jobs = EXCLUDED.completed_jobs,
                avg_delivery_hours = EXCLUDED.avg_delivery_hours,
                preferred_by = EXCLUDED.preferred_by,
                available = EXCLUDED.available,
                utc_offset_minutes = EXCLUDED.utc_offset_minutes,
                work_hours = EXCLUDED.work_hours",
        )
        .bind(technician.id.value())
        .bind(technician.user_id.value())
        .bind(&technician.display_name)
        .bind(technician.home.map(|point| point.lat))
        .bind(technician.home.map(|point| point.lng))
        .bind(serde_json::to_value(&technician.skills)?)
        .bind(technician.reliability.on_time_rate)
        .bind(to_i32_u32(technician.reliability.completed_jobs))
        .bind(technician.reliability.avg_delivery_hours)
        .bind(serde_json::to_value(&technician.preferred_by)?)
        .bind(technician.available)
        .bind(technician.utc_offset_minutes)
        .bind(serde_json::to_value(technician.work_hours)?)
        .execute(self.pool())
        .await
        .map(|_| ())
        .map_err(|e| DispatchError::DatabaseError(format!("Failed to save technician: {e}")))
    }

    /// # Errors
    /// Returns [`DispatchError::DatabaseError`] on query or mapping failure.
    pub async fn fetch_technician(&self, technician_id: &TechnicianId) -> Result<Option<Technician>> {
        sqlx::query_as::<_, TechnicianRow>(
            "SELECT id, user_id, display_name, home_lat, home_lng, skills, on_time_rate,
                completed_jobs, avg_delivery_hours, preferred_by, available,
                utc_offset_minutes, work_hours
             FROM technicians WHERE id = $1",
        )
        .bind(technician_id.value())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| DispatchError::DatabaseError(format!("Failed to load technician: {e}")))?
        .map(TechnicianRow::into_technician)
        .transpose()
    }
}
