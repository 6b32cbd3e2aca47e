use crate::error::{DispatchError, Result};
use crate::types::{
    CalendarEvent, CalendarIntegration, ExternalCalendarId, ExternalEventId, GeoPoint, GrantId,
    IntegrationId, IntegrationStatus, Job, JobId, MediaType, OrganizationId, ProjectStatus,
    ReliabilityStats, SyncStatus, Technician, TechnicianId, UserId,
};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub title: String,
    pub address: Option<String>,
    pub location_lat: Option<f64>,
    pub location_lng: Option<f64>,
    pub required_media: serde_json::Value,
    pub status: String,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: Option<DateTime<Utc>>,
    pub assigned_technician: Option<Uuid>,
    pub assigned_editor: Option<Uuid>,
    pub calendar_conflict: bool,
    pub calendar_conflict_note: Option<String>,
}

impl JobRow {
    pub fn into_job(self) -> Result<Job> {
        let status =
            ProjectStatus::try_from(self.status.as_str()).map_err(DispatchError::DatabaseError)?;
        let required_media: Vec<MediaType> = serde_json::from_value(self.required_media)?;

        Ok(Job {
            id: JobId::new(self.id),
            organization_id: OrganizationId::new(self.organization_id),
            title: self.title,
            address: self.address,
            location: geo_point(self.location_lat, self.location_lng),
            required_media,
            status,
            scheduled_start: self.scheduled_start,
            scheduled_end: self.scheduled_end,
            assigned_technician: self.assigned_technician.map(TechnicianId::new),
            assigned_editor: self.assigned_editor.map(UserId::new),
            calendar_conflict: self.calendar_conflict,
            calendar_conflict_note: self.calendar_conflict_note,
        })
    }
}

#[derive(FromRow)]
pub struct TechnicianRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub display_name: String,
    pub home_lat: Option<f64>,
    pub home_lng: Option<f64>,
    pub skills: serde_json::Value,
    pub on_time_rate: f64,
    pub completed_jobs: i32,
    pub avg_delivery_hours: Option<f64>,
    pub preferred_by: serde_json::Value,
    pub available: bool,
    pub utc_offset_minutes: i32,
    pub work_hours: serde_json::Value,
}

impl TechnicianRow {
    pub fn into_technician(self) -> Result<Technician> {
        Ok(Technician {
            id: TechnicianId::new(self.id),
            user_id: UserId::new(self.user_id),
            display_name: self.display_name,
            home: geo_point(self.home_lat, self.home_lng),
            skills: serde_json::from_value(self.skills)?,
            reliability: ReliabilityStats {
                on_time_rate: self.on_time_rate,
                completed_jobs: to_u32_i32(self.completed_jobs),
                avg_delivery_hours: self.avg_delivery_hours,
            },
            preferred_by: serde_json::from_value(self.preferred_by)?,
            available: self.available,
            utc_offset_minutes: self.utc_offset_minutes,
            work_hours: serde_json::from_value(self.work_hours)?,
        })
    }
}

#[derive(FromRow)]
pub struct IntegrationRow {
    pub id: Uuid,
    pub technician_id: Uuid,
    pub grant_id: String,
    pub calendar_id: String,
    pub account_email: String,
    pub status: String,
    pub is_write_target: bool,
    pub connected_at: DateTime<Utc>,
}

impl IntegrationRow {
    pub fn into_integration(self) -> Result<CalendarIntegration> {
        let status = IntegrationStatus::try_from(self.status.as_str())
            .map_err(DispatchError::DatabaseError)?;
        Ok(CalendarIntegration {
            id: IntegrationId::new(self.id),
            technician_id: TechnicianId::new(self.technician_id),
            grant_id: GrantId::new(self.grant_id),
            calendar_id: ExternalCalendarId::new(self.calendar_id),
            account_email: self.account_email,
            status,
            is_write_target: self.is_write_target,
            connected_at: self.connected_at,
        })
    }
}

#[derive(FromRow)]
pub struct EventRow {
    pub job_id: Uuid,
    pub external_event_id: Option<String>,
    pub calendar_id: Option<String>,
    pub grant_id: Option<String>,
    pub sync_status: String,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl EventRow {
    pub fn into_event(self) -> Result<CalendarEvent> {
        let sync_status =
            SyncStatus::try_from(self.sync_status.as_str()).map_err(DispatchError::DatabaseError)?;
        Ok(CalendarEvent {
            job_id: JobId::new(self.job_id),
            external_event_id: self.external_event_id.map(ExternalEventId::new),
            calendar_id: self.calendar_id.map(ExternalCalendarId::new),
            grant_id: self.grant_id.map(GrantId::new),
            sync_status,
            last_synced_at: self.last_synced_at,
            last_error: self.last_error,
        })
    }
}

fn geo_point(lat: Option<f64>, lng: Option<f64>) -> Option<GeoPoint> {
    lat.zip(lng).map(|(lat, lng)| GeoPoint::new(lat, lng))
}

pub const fn to_u32_i32(value: i32) -> u32 {
    if value < 0 {
        0
    } else {
        value.cast_unsigned()
    }
}

pub fn to_i32_u32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::{to_i32_u32, to_u32_i32, EventRow, JobRow};
    use crate::error::DispatchError;
    use crate::types::{ProjectStatus, SyncStatus};
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn signed_unsigned_helpers_clamp() {
        assert_eq!(to_u32_i32(3), 3);
        assert_eq!(to_u32_i32(-2), 0);
        assert_eq!(to_i32_u32(u32::MAX), i32::MAX);
    }

    fn job_row(status: &str) -> JobRow {
        JobRow {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            title: "Dock loft".to_string(),
            address: None,
            location_lat: Some(51.5),
            location_lng: None,
            required_media: serde_json::json!(["Photo", "drone"]),
            status: status.to_string(),
            scheduled_start: Utc::now(),
            scheduled_end: None,
            assigned_technician: None,
            assigned_editor: None,
            calendar_conflict: false,
            calendar_conflict_note: None,
        }
    }

    #[test]
    fn job_row_maps_status_media_and_partial_location() {
        let job = job_row("BOOKED").into_job();
        assert!(job.is_ok());
        let job = job.unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(job.status, ProjectStatus::Booked);
        assert_eq!(job.required_media.len(), 2);
        assert!(job.location.is_none());
    }

    #[test]
    fn unknown_status_is_a_database_error() {
        assert!(matches!(
            job_row("ARCHIVED").into_job(),
            Err(DispatchError::DatabaseError(_))
        ));
    }

    #[test]
    fn malformed_media_json_is_a_serialization_error() {
        let mut row = job_row("BOOKED");
        row.required_media = serde_json::json!({"photo": true});
        assert!(matches!(
            row.into_job(),
            Err(DispatchError::SerializationError(_))
        ));
    }

    #[test]
    fn event_row_maps_sync_status() {
        let event = EventRow {
            job_id: Uuid::new_v4(),
            external_event_id: None,
            calendar_id: None,
            grant_id: None,
            sync_status: "PENDING".to_string(),
            last_synced_at: None,
            last_error: None,
        }
        .into_event();
        assert_eq!(event.ok().map(|event| event.sync_status), Some(SyncStatus::Pending));
    }
}
