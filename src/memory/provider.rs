use crate::error::{DispatchError, Result};
use crate::ports::PortFuture;
use crate::provider::{
    BusyInterval, CalendarProvider, EventDraft, ExternalEvent, ExternalEventStatus,
    GrantExchange, ProviderCalendar,
};
use crate::types::{ExternalCalendarId, ExternalEventId, GrantId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderOperation {
    Create,
    Update,
    Delete,
    Fetch,
    ListCalendars,
    FreeBusy,
    ExchangeCode,
    Revoke,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    /// Behaves like a 404/410 response.
    Gone,
    /// Behaves like a timeout or 5xx response.
    Unavailable,
}

impl InjectedFailure {
    fn into_error(self, operation: ProviderOperation) -> DispatchError {
        match self {
            Self::Gone => DispatchError::ProviderGone(format!("{operation:?} returned 404")),
            Self::Unavailable => {
                DispatchError::ExternalCommunication(format!("{operation:?} returned 503"))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCall {
    pub operation: ProviderOperation,
    pub grant_id: Option<GrantId>,
    pub event_id: Option<ExternalEventId>,
}

#[derive(Debug, Default)]
struct ProviderState {
    events: HashMap<(GrantId, ExternalEventId), ExternalEvent>,
    calendars: HashMap<GrantId, Vec<ProviderCalendar>>,
    busy: HashMap<String, Vec<BusyInterval>>,
    codes: HashMap<String, GrantExchange>,
    revoked: Vec<GrantId>,
    failures: HashMap<ProviderOperation, InjectedFailure>,
    calls: Vec<ProviderCall>,
    next_id: u64,
}

impl ProviderState {
    fn record(
        &mut self,
        operation: ProviderOperation,
        grant_id: Option<&GrantId>,
        event_id: Option<&ExternalEventId>,
    ) -> Result<()> {
        self.calls.push(ProviderCall {
            operation,
            grant_id: grant_id.cloned(),
            event_id: event_id.cloned(),
        });
        self.failures
            .get(&operation)
            .map_or(Ok(()), |failure| Err(failure.into_error(operation)))
    }

    fn gone(event_id: &ExternalEventId) -> DispatchError {
        DispatchError::ProviderGone(format!("event {event_id} not found"))
    }
}

/// Calendar provider held in memory with scriptable failures.
///
/// Useful for offline runs and for exercising recovery paths: updates,
/// deletes and fetches of unknown events answer like a real provider's 404.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCalendarProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl InMemoryCalendarProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later call of `operation` fails until `clear_failures`.
    pub async fn fail(&self, operation: ProviderOperation, failure: InjectedFailure) {
        self.state.lock().await.failures.insert(operation, failure);
    }

    pub async fn clear_failures(&self) {
        self.state.lock().await.failures.clear();
    }

    pub async fn add_calendar(&self, grant_id: GrantId, calendar: ProviderCalendar) {
        self.state
            .lock()
            .await
            .calendars
            .entry(grant_id)
            .or_default()
            .push(calendar);
    }

    pub async fn set_busy(&self, account_email: impl Into<String>, busy: Vec<BusyInterval>) {
        self.state.lock().await.busy.insert(account_email.into(), busy);
    }

    pub async fn register_code(&self, code: impl Into<String>, exchange: GrantExchange) {
        self.state.lock().await.codes.insert(code.into(), exchange);
    }

    /// Simulates an edit made directly in the external calendar.
    pub async fn move_event(
        &self,
        grant_id: &GrantId,
        event_id: &ExternalEventId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> bool {
        let mut state = self.state.lock().await;
        state
            .events
            .get_mut(&(grant_id.clone(), event_id.clone()))
            .map(|event| {
                event.start = start;
                event.end = end;
            })
            .is_some()
    }

    pub async fn cancel_event(&self, grant_id: &GrantId, event_id: &ExternalEventId) -> bool {
        let mut state = self.state.lock().await;
        state
            .events
            .get_mut(&(grant_id.clone(), event_id.clone()))
            .map(|event| event.status = ExternalEventStatus::Cancelled)
            .is_some()
    }

    /// Simulates a deletion made directly in the external calendar.
    pub async fn remove_event(&self, grant_id: &GrantId, event_id: &ExternalEventId) -> bool {
        self.state
            .lock()
            .await
            .events
            .remove(&(grant_id.clone(), event_id.clone()))
            .is_some()
    }

    pub async fn event(&self, grant_id: &GrantId, event_id: &ExternalEventId) -> Option<ExternalEvent> {
        self.state
            .lock()
            .await
            .events
            .get(&(grant_id.clone(), event_id.clone()))
            .cloned()
    }

    pub async fn event_count(&self) -> usize {
        self.state.lock().await.events.len()
    }

    pub async fn calls(&self) -> Vec<ProviderCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn call_count(&self, operation: ProviderOperation) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|call| call.operation == operation)
            .count()
    }

    pub async fn revoked(&self) -> Vec<GrantId> {
        self.state.lock().await.revoked.clone()
    }
}

fn materialize(
    id: ExternalEventId,
    calendar_id: &ExternalCalendarId,
    draft: &EventDraft,
) -> ExternalEvent {
    ExternalEvent {
        id,
        calendar_id: calendar_id.clone(),
        title: draft.title.clone(),
        start: draft.start,
        end: draft.end,
        status: ExternalEventStatus::Confirmed,
    }
}

impl CalendarProvider for InMemoryCalendarProvider {
    fn create_event<'a>(
        &'a self,
        grant_id: &'a GrantId,
        calendar_id: &'a ExternalCalendarId,
        draft: &'a EventDraft,
    ) -> PortFuture<'a, ExternalEvent> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.record(ProviderOperation::Create, Some(grant_id), None)?;
            state.next_id += 1;
            let id = ExternalEventId::new(format!("evt-{}", state.next_id));
            let event = materialize(id.clone(), calendar_id, draft);
            state.events.insert((grant_id.clone(), id), event.clone());
            Ok(event)
        })
    }

    fn update_event<'a>(
        &'a self,
        grant_id: &'a GrantId,
        calendar_id: &'a ExternalCalendarId,
        event_id: &'a ExternalEventId,
        draft: &'a EventDraft,
    ) -> PortFuture<'a, ExternalEvent> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.record(ProviderOperation::Update, Some(grant_id), Some(event_id))?;
            let key = (grant_id.clone(), event_id.clone());
            if !state.events.contains_key(&key) {
                return Err(ProviderState::gone(event_id));
            }
            let event = materialize(event_id.clone(), calendar_id, draft);
            state.events.insert(key, event.clone());
            Ok(event)
        })
    }

    fn delete_event<'a>(
        &'a self,
        grant_id: &'a GrantId,
        _calendar_id: &'a ExternalCalendarId,
        event_id: &'a ExternalEventId,
    ) -> PortFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.record(ProviderOperation::Delete, Some(grant_id), Some(event_id))?;
            state
                .events
                .remove(&(grant_id.clone(), event_id.clone()))
                .map(|_| ())
                .ok_or_else(|| ProviderState::gone(event_id))
        })
    }

    fn fetch_event<'a>(
        &'a self,
        grant_id: &'a GrantId,
        _calendar_id: &'a ExternalCalendarId,
        event_id: &'a ExternalEventId,
    ) -> PortFuture<'a, ExternalEvent> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.record(ProviderOperation::Fetch, Some(grant_id), Some(event_id))?;
            state
                .events
                .get(&(grant_id.clone(), event_id.clone()))
                .cloned()
                .ok_or_else(|| ProviderState::gone(event_id))
        })
    }

    fn list_calendars<'a>(
        &'a self,
        grant_id: &'a GrantId,
    ) -> PortFuture<'a, Vec<ProviderCalendar>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.record(ProviderOperation::ListCalendars, Some(grant_id), None)?;
            Ok(state.calendars.get(grant_id).cloned().unwrap_or_default())
        })
    }

    fn free_busy<'a>(
        &'a self,
        grant_id: &'a GrantId,
        account_email: &'a str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PortFuture<'a, Vec<BusyInterval>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.record(ProviderOperation::FreeBusy, Some(grant_id), None)?;
            Ok(state
                .busy
                .get(account_email)
                .map(|intervals| {
                    intervals
                        .iter()
                        .filter(|interval| interval.overlaps(start, end))
                        .copied()
                        .collect()
                })
                .unwrap_or_default())
        })
    }

    fn exchange_code<'a>(&'a self, code: &'a str) -> PortFuture<'a, GrantExchange> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.record(ProviderOperation::ExchangeCode, None, None)?;
            state
                .codes
                .remove(code)
                .ok_or_else(|| DispatchError::ExternalCommunication("invalid authorization code".to_string()))
        })
    }

    fn revoke_grant<'a>(&'a self, grant_id: &'a GrantId) -> PortFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.record(ProviderOperation::Revoke, Some(grant_id), None)?;
            state.revoked.push(grant_id.clone());
            Ok(())
        })
    }
}
