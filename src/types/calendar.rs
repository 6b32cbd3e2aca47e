use super::identifiers::{
    ExternalCalendarId, ExternalEventId, GrantId, IntegrationId, JobId, TechnicianId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntegrationStatus {
    Active,
    Disconnected,
}

impl IntegrationStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Disconnected => "DISCONNECTED",
        }
    }
}

impl fmt::Display for IntegrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for IntegrationStatus {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, String> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "DISCONNECTED" => Ok(Self::Disconnected),
            _ => Err(format!("Unknown integration status: {s}")),
        }
    }
}

/// One connected external calendar account of a technician.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarIntegration {
    pub id: IntegrationId,
    pub technician_id: TechnicianId,
    pub grant_id: GrantId,
    pub calendar_id: ExternalCalendarId,
    /// Account identifier used for free/busy queries.
    pub account_email: String,
    pub status: IntegrationStatus,
    pub is_write_target: bool,
    pub connected_at: DateTime<Utc>,
}

impl CalendarIntegration {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == IntegrationStatus::Active
    }

    #[must_use]
    pub fn is_active_write_target(&self) -> bool {
        self.is_active() && self.is_write_target
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    Pending,
    Synced,
    Failed,
    Deleted,
}

impl SyncStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Synced => "SYNCED",
            Self::Failed => "FAILED",
            Self::Deleted => "DELETED",
        }
    }

    /// Statuses a reconnect or retry should try to push again.
    #[must_use]
    pub const fn needs_push(&self) -> bool {
        matches!(self, Self::Pending | Self::Failed)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for SyncStatus {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, String> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "SYNCED" => Ok(Self::Synced),
            "FAILED" => Ok(Self::Failed),
            "DELETED" => Ok(Self::Deleted),
            _ => Err(format!("Unknown sync status: {s}")),
        }
    }
}

/// External calendar representation of one job; at most one per job.
///
/// A `Synced` record always carries an external event id. The constructors
/// below are the only way the orchestrator builds records, which keeps that
/// invariant local to this file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub job_id: JobId,
    pub external_event_id: Option<ExternalEventId>,
    pub calendar_id: Option<ExternalCalendarId>,
    pub grant_id: Option<GrantId>,
    pub sync_status: SyncStatus,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl CalendarEvent {
    #[must_use]
    pub const fn synced(
        job_id: JobId,
        external_event_id: ExternalEventId,
        calendar_id: ExternalCalendarId,
        grant_id: GrantId,
        synced_at: DateTime<Utc>,
    ) -> Self {
        Self {
            job_id,
            external_event_id: Some(external_event_id),
            calendar_id: Some(calendar_id),
            grant_id: Some(grant_id),
            sync_status: SyncStatus::Synced,
            last_synced_at: Some(synced_at),
            last_error: None,
        }
    }

    /// Failure keeps whatever identifiers the previous record had.
    #[must_use]
    pub fn failed(job_id: JobId, previous: Option<&Self>, error: impl Into<String>) -> Self {
        Self {
            job_id,
            external_event_id: previous.and_then(|event| event.external_event_id.clone()),
            calendar_id: previous.and_then(|event| event.calendar_id.clone()),
            grant_id: previous.and_then(|event| event.grant_id.clone()),
            sync_status: SyncStatus::Failed,
            last_synced_at: previous.and_then(|event| event.last_synced_at),
            last_error: Some(error.into()),
        }
    }

    #[must_use]
    pub fn deleted(mut self) -> Self {
        self.sync_status = SyncStatus::Deleted;
        self.last_error = None;
        self
    }

    /// True when the record points at an event living under `grant_id`.
    #[must_use]
    pub fn references_grant(&self, grant_id: &GrantId) -> bool {
        self.external_event_id.is_some() && self.grant_id.as_ref() == Some(grant_id)
    }

    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        !matches!(self.sync_status, SyncStatus::Synced) || self.external_event_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::{CalendarEvent, SyncStatus};
    use crate::types::{ExternalCalendarId, ExternalEventId, GrantId, JobId};
    use chrono::Utc;

    #[test]
    fn failed_record_retains_previous_identifiers() {
        let job_id = JobId::generate();
        let synced = CalendarEvent::synced(
            job_id,
            ExternalEventId::new("evt-1"),
            ExternalCalendarId::new("primary"),
            GrantId::new("grant-1"),
            Utc::now(),
        );

        let failed = CalendarEvent::failed(job_id, Some(&synced), "503 from provider");

        assert_eq!(failed.sync_status, SyncStatus::Failed);
        assert_eq!(failed.external_event_id, synced.external_event_id);
        assert_eq!(failed.last_error.as_deref(), Some("503 from provider"));
        assert!(failed.is_consistent());
    }

    #[test]
    fn grant_reference_requires_an_event_id() {
        let mut event = CalendarEvent::failed(JobId::generate(), None, "boom");
        event.grant_id = Some(GrantId::new("grant-1"));
        assert!(!event.references_grant(&GrantId::new("grant-1")));
    }
}
