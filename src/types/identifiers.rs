use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Internal record identifiers are UUIDs minted by the job store.
macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[must_use]
            pub const fn new(id: Uuid) -> Self {
                Self(id)
            }

            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            #[must_use]
            pub const fn value(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

/// Provider-side identifiers are opaque strings owned by the calendar provider.
macro_rules! external_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            #[must_use]
            pub fn value(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(JobId);
record_id!(TechnicianId);
record_id!(OrganizationId);
record_id!(
    /// Platform user; technicians and editors are users too.
    UserId
);
record_id!(IntegrationId);

external_id!(
    /// Opaque credential reference for one connected calendar account.
    GrantId
);
external_id!(ExternalEventId);
external_id!(ExternalCalendarId);

#[cfg(test)]
mod tests {
    use super::{GrantId, JobId};
    use uuid::Uuid;

    #[test]
    fn record_ids_serialize_as_bare_uuid() {
        let raw = Uuid::nil();
        let json = serde_json::to_string(&JobId::new(raw)).unwrap_or_default();
        assert_eq!(json, format!("\"{raw}\""));
    }

    #[test]
    fn external_ids_display_their_value() {
        assert_eq!(GrantId::new("grant-7").to_string(), "grant-7");
    }
}
