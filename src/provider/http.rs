use super::{
    BusyInterval, CalendarProvider, EventDraft, ExternalEvent, ExternalEventStatus,
    GrantExchange, ProviderCalendar,
};
use crate::error::{DispatchError, Result};
use crate::ports::PortFuture;
use crate::types::{ExternalCalendarId, ExternalEventId, GrantId};
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub base_url: Url,
    pub api_key: String,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub timeout: Duration,
}

impl ProviderConfig {
    /// # Errors
    /// Returns `ConfigError` when the base URL does not parse or cannot carry a path.
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| DispatchError::ConfigError(format!("Invalid provider URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(DispatchError::ConfigError(format!(
                "Provider URL cannot carry a path: {base_url}"
            )));
        }
        Ok(Self {
            base_url,
            api_key: api_key.into(),
            client_id: None,
            redirect_uri: None,
            timeout: Duration::from_millis(DEFAULT_HTTP_TIMEOUT_MS),
        })
    }
}

/// REST client for the calendar provider, authenticated by a server-held key.
#[derive(Debug, Clone)]
pub struct HttpCalendarProvider {
    client: Client,
    config: ProviderConfig,
}

impl HttpCalendarProvider {
    /// # Errors
    /// Returns `ConfigError` if the HTTP client cannot be built.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DispatchError::ConfigError(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                DispatchError::ConfigError(format!(
                    "Provider URL cannot carry a path: {}",
                    self.config.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn event_url(
        &self,
        grant_id: &GrantId,
        calendar_id: &ExternalCalendarId,
        event_id: Option<&ExternalEventId>,
    ) -> Result<Url> {
        let mut segments = vec!["v3", "grants", grant_id.value(), "events"];
        if let Some(event_id) = event_id {
            segments.push(event_id.value());
        }
        let mut url = self.endpoint(&segments)?;
        url.query_pairs_mut()
            .append_pair("calendar_id", calendar_id.value());
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.config.api_key)
            .header("Accept", "application/json")
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<reqwest::Response> {
        let response = builder.send().await.map_err(|e| {
            warn!(operation = what, error = %e, "calendar provider unreachable");
            DispatchError::ExternalCommunication(format!("{what}: {e}"))
        })?;

        let status = response.status();
        if status.is_success() {
            debug!(operation = what, %status, "calendar provider call succeeded");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = format!("{what} returned {status}: {}", truncate(&body, 200));
        if matches!(status, StatusCode::NOT_FOUND | StatusCode::GONE) {
            Err(DispatchError::ProviderGone(detail))
        } else {
            warn!(operation = what, %status, "calendar provider rejected request");
            Err(DispatchError::ExternalCommunication(detail))
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        what: &str,
    ) -> Result<T> {
        let response = self.send(builder, what).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| DispatchError::ExternalCommunication(format!("{what}: bad body: {e}")))
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireWhen {
    start_time: i64,
    end_time: i64,
}

#[derive(Debug, Serialize)]
struct WireEventBody<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    when: WireWhen,
}

impl<'a> From<&'a EventDraft> for WireEventBody<'a> {
    fn from(draft: &'a EventDraft) -> Self {
        Self {
            title: &draft.title,
            description: draft.description.as_deref(),
            location: draft.location.as_deref(),
            when: WireWhen {
                start_time: draft.start.timestamp(),
                end_time: draft.end.timestamp(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireEvent {
    id: String,
    calendar_id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    status: Option<String>,
    when: WireWhen,
}

impl TryFrom<WireEvent> for ExternalEvent {
    type Error = DispatchError;

    fn try_from(wire: WireEvent) -> Result<Self> {
        let start = from_unix(wire.when.start_time)?;
        let end = from_unix(wire.when.end_time)?;
        let status = match wire.status.as_deref() {
            Some("cancelled") => ExternalEventStatus::Cancelled,
            Some("tentative" | "maybe") => ExternalEventStatus::Tentative,
            _ => ExternalEventStatus::Confirmed,
        };
        Ok(Self {
            id: ExternalEventId::new(wire.id),
            calendar_id: ExternalCalendarId::new(wire.calendar_id),
            title: wire.title,
            start,
            end,
            status,
        })
    }
}

fn from_unix(seconds: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
        DispatchError::ExternalCommunication(format!("timestamp out of range: {seconds}"))
    })
}

#[derive(Debug, Deserialize)]
struct WireCalendar {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    is_primary: bool,
    #[serde(default)]
    read_only: bool,
}

#[derive(Debug, Serialize)]
struct WireFreeBusyRequest<'a> {
    start_time: i64,
    end_time: i64,
    emails: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct WireFreeBusy {
    #[serde(default)]
    time_slots: Vec<WireTimeSlot>,
}

#[derive(Debug, Deserialize)]
struct WireTimeSlot {
    start_time: i64,
    end_time: i64,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireTokenRequest<'a> {
    grant_type: &'static str,
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_uri: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct WireTokenResponse {
    grant_id: String,
    email: String,
}

impl CalendarProvider for HttpCalendarProvider {
    fn create_event<'a>(
        &'a self,
        grant_id: &'a GrantId,
        calendar_id: &'a ExternalCalendarId,
        draft: &'a EventDraft,
    ) -> PortFuture<'a, ExternalEvent> {
        Box::pin(async move {
            let url = self.event_url(grant_id, calendar_id, None)?;
            let builder = self
                .request(Method::POST, url)
                .json(&WireEventBody::from(draft));
            let envelope: Envelope<WireEvent> = self.send_json(builder, "create event").await?;
            ExternalEvent::try_from(envelope.data)
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
            let url = self.event_url(grant_id, calendar_id, Some(event_id))?;
            let builder = self
                .request(Method::PUT, url)
                .json(&WireEventBody::from(draft));
            let envelope: Envelope<WireEvent> = self.send_json(builder, "update event").await?;
            ExternalEvent::try_from(envelope.data)
        })
    }

    fn delete_event<'a>(
        &'a self,
        grant_id: &'a GrantId,
        calendar_id: &'a ExternalCalendarId,
        event_id: &'a ExternalEventId,
    ) -> PortFuture<'a, ()> {
        Box::pin(async move {
            let url = self.event_url(grant_id, calendar_id, Some(event_id))?;
            self.send(self.request(Method::DELETE, url), "delete event")
                .await
                .map(|_| ())
        })
    }

    fn fetch_event<'a>(
        &'a self,
        grant_id: &'a GrantId,
        calendar_id: &'a ExternalCalendarId,
        event_id: &'a ExternalEventId,
    ) -> PortFuture<'a, ExternalEvent> {
        Box::pin(async move {
            let url = self.event_url(grant_id, calendar_id, Some(event_id))?;
            let envelope: Envelope<WireEvent> = self
                .send_json(self.request(Method::GET, url), "fetch event")
                .await?;
            ExternalEvent::try_from(envelope.data)
        })
    }

    fn list_calendars<'a>(
        &'a self,
        grant_id: &'a GrantId,
    ) -> PortFuture<'a, Vec<ProviderCalendar>> {
        Box::pin(async move {
            let url = self.endpoint(&["v3", "grants", grant_id.value(), "calendars"])?;
            let envelope: Envelope<Vec<WireCalendar>> = self
                .send_json(self.request(Method::GET, url), "list calendars")
                .await?;
            Ok(envelope
                .data
                .into_iter()
                .map(|calendar| ProviderCalendar {
                    id: ExternalCalendarId::new(calendar.id),
                    name: calendar.name,
                    is_primary: calendar.is_primary,
                    read_only: calendar.read_only,
                })
                .collect())
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
            let url = self.endpoint(&["v3", "grants", grant_id.value(), "calendars", "free-busy"])?;
            let body = WireFreeBusyRequest {
                start_time: start.timestamp(),
                end_time: end.timestamp(),
                emails: [account_email],
            };
            let envelope: Envelope<Vec<WireFreeBusy>> = self
                .send_json(self.request(Method::POST, url).json(&body), "free busy")
                .await?;

            envelope
                .data
                .into_iter()
                .flat_map(|entry| entry.time_slots)
                .filter(|slot| slot.status.as_deref().map_or(true, |status| status == "busy"))
                .map(|slot| {
                    Ok(BusyInterval::new(
                        from_unix(slot.start_time)?,
                        from_unix(slot.end_time)?,
                    ))
                })
                .collect()
        })
    }

    fn exchange_code<'a>(&'a self, code: &'a str) -> PortFuture<'a, GrantExchange> {
        Box::pin(async move {
            let url = self.endpoint(&["v3", "connect", "token"])?;
            let body = WireTokenRequest {
                grant_type: "authorization_code",
                code,
                client_id: self.config.client_id.as_deref(),
                redirect_uri: self.config.redirect_uri.as_deref(),
            };
            let token: WireTokenResponse = self
                .send_json(self.request(Method::POST, url).json(&body), "exchange code")
                .await?;
            Ok(GrantExchange {
                grant_id: GrantId::new(token.grant_id),
                email: token.email,
            })
        })
    }

    fn revoke_grant<'a>(&'a self, grant_id: &'a GrantId) -> PortFuture<'a, ()> {
        Box::pin(async move {
            let url = self.endpoint(&["v3", "grants", grant_id.value()])?;
            self.send(self.request(Method::DELETE, url), "revoke grant")
                .await
                .map(|_| ())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::{HttpCalendarProvider, ProviderConfig, WireEvent};
    use crate::provider::{ExternalEvent, ExternalEventStatus};
    use crate::types::{ExternalCalendarId, ExternalEventId, GrantId};

    fn provider() -> HttpCalendarProvider {
        let config = ProviderConfig::new("https://calendar.example.test/api/", "key").unwrap();
        HttpCalendarProvider::new(config).unwrap()
    }

    #[test]
    fn event_urls_escape_segments_and_carry_calendar() {
        let url = provider()
            .event_url(
                &GrantId::new("grant/1"),
                &ExternalCalendarId::new("work cal"),
                Some(&ExternalEventId::new("evt-1")),
            )
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://calendar.example.test/api/v3/grants/grant%2F1/events/evt-1?calendar_id=work+cal"
        );
    }

    #[test]
    fn mailto_urls_are_rejected_as_base() {
        assert!(ProviderConfig::new("mailto:ops@example.test", "key").is_err());
    }

    #[test]
    fn cancelled_wire_status_maps_to_cancelled_event() {
        let wire: WireEvent = serde_json::from_str(
            r#"{"id":"e1","calendar_id":"c1","status":"cancelled","when":{"start_time":1748786400,"end_time":1748790000}}"#,
        )
        .unwrap();
        let event = ExternalEvent::try_from(wire).unwrap();
        assert_eq!(event.status, ExternalEventStatus::Cancelled);
        assert_eq!(event.start.to_rfc3339(), "2025-06-01T14:00:00+00:00");
    }
}
