use crate::types::{CalendarIntegration, ExternalEventId, JobId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoTechnician,
    NoWriteTarget,
    NoCalendarEvent,
    AlreadyRemoved,
}

/// What a push/remove did to the job's external event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum SyncOutcome {
    Skipped { reason: SkipReason },
    Created { external_event_id: ExternalEventId },
    Updated { external_event_id: ExternalEventId },
    /// The update failed and a replacement event was created.
    Recreated { external_event_id: ExternalEventId },
    Removed,
    Failed { error: String },
}

impl SyncOutcome {
    #[must_use]
    pub const fn skipped(reason: SkipReason) -> Self {
        Self::Skipped { reason }
    }

    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    #[must_use]
    pub const fn external_event_id(&self) -> Option<&ExternalEventId> {
        match self {
            Self::Created { external_event_id }
            | Self::Updated { external_event_id }
            | Self::Recreated { external_event_id } => Some(external_event_id),
            Self::Skipped { .. } | Self::Removed | Self::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ReconcileOutcome {
    /// No CalendarEvent matches the notification.
    Untracked,
    /// The event was already removed on our side.
    AlreadyDeleted,
    InSync,
    ConflictFlagged { note: String },
    DeletedExternally { note: String },
}

impl ReconcileOutcome {
    #[must_use]
    pub fn conflict_note(&self) -> Option<&str> {
        match self {
            Self::ConflictFlagged { note } | Self::DeletedExternally { note } => Some(note),
            Self::Untracked | Self::AlreadyDeleted | Self::InSync => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectOutcome {
    pub events_reset: u64,
    pub grant_revoked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectOutcome {
    pub integration: CalendarIntegration,
    pub resynced: Vec<(JobId, SyncOutcome)>,
}
