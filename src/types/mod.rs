#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

pub mod calendar;
pub mod identifiers;
pub mod job;
pub mod notification;
pub mod technician;

pub use calendar::{CalendarEvent, CalendarIntegration, IntegrationStatus, SyncStatus};
pub use identifiers::{
    ExternalCalendarId, ExternalEventId, GrantId, IntegrationId, JobId, OrganizationId,
    TechnicianId, UserId,
};
pub use job::{Job, ProjectStatus, Requester, Role};
pub use notification::{CalendarWebhook, ChangeType, Notification};
pub use technician::{
    GeoPoint, MediaType, ReliabilityStats, Technician, WeeklySchedule, WorkHours,
    MAX_SKILL_RATING, MIN_SKILL_RATING,
};
