use super::identifiers::{JobId, OrganizationId, TechnicianId, UserId};
use super::technician::{GeoPoint, MediaType};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Pending,
    Booked,
    Shooting,
    Editing,
    Delivered,
    Cancelled,
}

impl ProjectStatus {
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Booked,
        Self::Shooting,
        Self::Editing,
        Self::Delivered,
        Self::Cancelled,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Booked => "BOOKED",
            Self::Shooting => "SHOOTING",
            Self::Editing => "EDITING",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Statuses in which the shoot still occupies the technician's calendar.
    #[must_use]
    pub const fn occupies_calendar(&self) -> bool {
        matches!(self, Self::Pending | Self::Booked | Self::Shooting)
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for ProjectStatus {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, String> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "BOOKED" => Ok(Self::Booked),
            "SHOOTING" => Ok(Self::Shooting),
            "EDITING" => Ok(Self::Editing),
            "DELIVERED" => Ok(Self::Delivered),
            "CANCELLED" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown project status: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    ProjectManager,
    Dispatcher,
    Technician,
    Editor,
    Agent,
}

impl Role {
    pub const ALL: [Self; 6] = [
        Self::Admin,
        Self::ProjectManager,
        Self::Dispatcher,
        Self::Technician,
        Self::Editor,
        Self::Agent,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::ProjectManager => "PROJECT_MANAGER",
            Self::Dispatcher => "DISPATCHER",
            Self::Technician => "TECHNICIAN",
            Self::Editor => "EDITOR",
            Self::Agent => "AGENT",
        }
    }

    /// Roles with full control over a job's status and assignments.
    #[must_use]
    pub const fn is_manager(&self) -> bool {
        matches!(self, Self::Admin | Self::ProjectManager)
    }

    #[must_use]
    pub const fn can_assign(&self) -> bool {
        matches!(self, Self::Admin | Self::ProjectManager | Self::Dispatcher)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, String> {
        match s {
            "ADMIN" => Ok(Self::Admin),
            "PROJECT_MANAGER" => Ok(Self::ProjectManager),
            "DISPATCHER" => Ok(Self::Dispatcher),
            "TECHNICIAN" => Ok(Self::Technician),
            "EDITOR" => Ok(Self::Editor),
            "AGENT" => Ok(Self::Agent),
            _ => Err(format!("Unknown role: {s}")),
        }
    }
}

/// The authenticated caller of a job operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub user_id: UserId,
    pub role: Role,
    /// Set when the user is registered as a field technician.
    pub technician_id: Option<TechnicianId>,
}

impl Requester {
    #[must_use]
    pub const fn new(user_id: UserId, role: Role) -> Self {
        Self {
            user_id,
            role,
            technician_id: None,
        }
    }

    #[must_use]
    pub const fn technician(user_id: UserId, technician_id: TechnicianId) -> Self {
        Self {
            user_id,
            role: Role::Technician,
            technician_id: Some(technician_id),
        }
    }
}

/// A shoot request (aka project).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub organization_id: OrganizationId,
    pub title: String,
    pub address: Option<String>,
    pub location: Option<GeoPoint>,
    pub required_media: Vec<MediaType>,
    pub status: ProjectStatus,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: Option<DateTime<Utc>>,
    pub assigned_technician: Option<TechnicianId>,
    pub assigned_editor: Option<UserId>,
    pub calendar_conflict: bool,
    pub calendar_conflict_note: Option<String>,
}

impl Job {
    #[must_use]
    pub fn new(
        organization_id: OrganizationId,
        title: impl Into<String>,
        scheduled_start: DateTime<Utc>,
    ) -> Self {
        Self {
            id: JobId::generate(),
            organization_id,
            title: title.into(),
            address: None,
            location: None,
            required_media: Vec::new(),
            status: ProjectStatus::Pending,
            scheduled_start,
            scheduled_end: None,
            assigned_technician: None,
            assigned_editor: None,
            calendar_conflict: false,
            calendar_conflict_note: None,
        }
    }

    /// End of the shoot, falling back to `default_duration` after the start.
    #[must_use]
    pub fn effective_end(&self, default_duration: Duration) -> DateTime<Utc> {
        self.scheduled_end
            .unwrap_or(self.scheduled_start + default_duration)
    }
}
