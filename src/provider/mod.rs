#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

//! External calendar provider boundary.

mod http;

pub use http::{HttpCalendarProvider, ProviderConfig};

use crate::ports::PortFuture;
use crate::types::{ExternalCalendarId, ExternalEventId, GrantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fields the core pushes to the provider for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalEventStatus {
    Confirmed,
    Tentative,
    Cancelled,
}

/// Provider-side view of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalEvent {
    pub id: ExternalEventId,
    pub calendar_id: ExternalCalendarId,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: ExternalEventStatus,
}

impl ExternalEvent {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.status == ExternalEventStatus::Cancelled
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCalendar {
    pub id: ExternalCalendarId,
    pub name: String,
    pub is_primary: bool,
    pub read_only: bool,
}

/// Half-open busy interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BusyInterval {
    #[must_use]
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// `start < busy.end && end > busy.start`; touching endpoints do not overlap.
    #[must_use]
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end && end > self.start
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantExchange {
    pub grant_id: GrantId,
    pub email: String,
}

/// Calls against the third-party calendar API.
///
/// Implementations report 404/410 responses as `DispatchError::ProviderGone`
/// and every other failure as `DispatchError::ExternalCommunication`.
pub trait CalendarProvider {
    fn create_event<'a>(
        &'a self,
        grant_id: &'a GrantId,
        calendar_id: &'a ExternalCalendarId,
        draft: &'a EventDraft,
    ) -> PortFuture<'a, ExternalEvent>;

    fn update_event<'a>(
        &'a self,
        grant_id: &'a GrantId,
        calendar_id: &'a ExternalCalendarId,
        event_id: &'a ExternalEventId,
        draft: &'a EventDraft,
    ) -> PortFuture<'a, ExternalEvent>;

    fn delete_event<'a>(
        &'a self,
        grant_id: &'a GrantId,
        calendar_id: &'a ExternalCalendarId,
        event_id: &'a ExternalEventId,
    ) -> PortFuture<'a, ()>;

    fn fetch_event<'a>(
        &'a self,
        grant_id: &'a GrantId,
        calendar_id: &'a ExternalCalendarId,
        event_id: &'a ExternalEventId,
    ) -> PortFuture<'a, ExternalEvent>;

    fn list_calendars<'a>(&'a self, grant_id: &'a GrantId)
        -> PortFuture<'a, Vec<ProviderCalendar>>;

    fn free_busy<'a>(
        &'a self,
        grant_id: &'a GrantId,
        account_email: &'a str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PortFuture<'a, Vec<BusyInterval>>;

    fn exchange_code<'a>(&'a self, code: &'a str) -> PortFuture<'a, GrantExchange>;

    fn revoke_grant<'a>(&'a self, grant_id: &'a GrantId) -> PortFuture<'a, ()>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::BusyInterval;
    use chrono::{TimeZone, Utc};

    #[test]
    fn overlap_is_exclusive_at_boundaries_and_symmetric() {
        let at = |h: u32| Utc.with_ymd_and_hms(2025, 6, 2, h, 0, 0).unwrap();
        let busy = BusyInterval::new(at(10), at(11));

        assert!(!busy.overlaps(at(9), at(10)));
        assert!(!busy.overlaps(at(11), at(12)));
        assert!(busy.overlaps(at(9), at(12)));

        let slot = BusyInterval::new(at(9), at(10));
        assert_eq!(
            busy.overlaps(slot.start, slot.end),
            slot.overlaps(busy.start, busy.end)
        );
    }
}
