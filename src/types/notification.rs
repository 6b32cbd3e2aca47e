use super::identifiers::{ExternalEventId, GrantId, JobId, UserId};
use serde::{Deserialize, Serialize};

/// Message for the notification sink; delivery is handled elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: UserId,
    pub job_id: JobId,
    pub message: String,
    pub conflict_note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Updated,
    Deleted,
}

/// Inbound change notification from the calendar provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarWebhook {
    pub external_event_id: ExternalEventId,
    pub grant_id: GrantId,
    pub change_type: ChangeType,
}

#[cfg(test)]
mod tests {
    use super::{CalendarWebhook, ChangeType};

    #[test]
    fn webhook_payload_uses_camel_case_fields() {
        let payload = r#"{"externalEventId":"evt-9","grantId":"grant-3","changeType":"deleted"}"#;
        let parsed: Result<CalendarWebhook, _> = serde_json::from_str(payload);
        assert!(matches!(
            parsed,
            Ok(CalendarWebhook {
                change_type: ChangeType::Deleted,
                ..
            })
        ));
    }
}
