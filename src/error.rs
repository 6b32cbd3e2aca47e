#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use thiserror::Error;

/// Error code constants for type-safe error handling
pub mod code {
    pub const NOTFOUND: &str = "NOTFOUND";
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const INVALID: &str = "INVALID";
    pub const CONFLICT: &str = "CONFLICT";
    pub const GONE: &str = "GONE";
    pub const DEPENDENCY: &str = "DEPENDENCY";
    pub const INTERNAL: &str = "INTERNAL";
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Calendar provider communication failure: {0}")]
    ExternalCommunication(String),

    #[error("Calendar provider resource gone: {0}")]
    ProviderGone(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DispatchError {
    /// Returns the protocol error code for this error
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => code::NOTFOUND,
            Self::Forbidden(_) => code::FORBIDDEN,
            Self::Validation(_) | Self::ConfigError(_) | Self::SerializationError(_) => {
                code::INVALID
            }
            Self::Conflict(_) => code::CONFLICT,
            Self::ProviderGone(_) => code::GONE,
            Self::ExternalCommunication(_) => code::DEPENDENCY,
            Self::DatabaseError(_) | Self::SqlxError(_) | Self::Internal(_) => code::INTERNAL,
        }
    }

    /// Whether a caller may reasonably retry the same request later.
    ///
    /// Provider outages and database hiccups are transient; everything else
    /// needs a different request or human action.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ExternalCommunication(_) | Self::DatabaseError(_) | Self::SqlxError(_)
        )
    }

    /// True for provider failures that are not "gone" responses.
    #[must_use]
    pub const fn is_external(&self) -> bool {
        matches!(self, Self::ExternalCommunication(_) | Self::ProviderGone(_))
    }
}

/// Error codes with a short description and a suggested fix
pub const ERROR_CODES: &[(&str, &str, &str)] = &[
    (
        code::NOTFOUND,
        "Job, technician or calendar record was not found",
        "Verify the identifier and retry",
    ),
    (
        code::FORBIDDEN,
        "Requester may not perform this status transition",
        "Check the requester role and the job's assigned technician/editor",
    ),
    (
        code::INVALID,
        "Invalid request or configuration",
        "Fix the time window, weights or payload and retry",
    ),
    (
        code::CONFLICT,
        "Internal and external calendar state diverged",
        "Resolve the conflict on the job and acknowledge it",
    ),
    (
        code::GONE,
        "Calendar provider no longer has the resource",
        "A new external event will be created on the next sync",
    ),
    (
        code::DEPENDENCY,
        "Calendar provider unreachable or returned an error",
        "Retry later; the calendar event is marked FAILED",
    ),
    (
        code::INTERNAL,
        "Unexpected internal failure",
        "Inspect logs and retry",
    ),
];

/// Get error code details (description and fix) for a given error code
#[must_use]
pub fn get_error_info(error_code: &str) -> Option<(&'static str, &'static str)> {
    ERROR_CODES
        .iter()
        .find(|(code, _, _)| *code == error_code)
        .map(|(_, desc, fix)| (*desc, *fix))
}

pub type Result<T> = std::result::Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::{get_error_info, DispatchError};

    #[test]
    fn every_error_code_has_documentation() {
        let errors = [
            DispatchError::NotFound("job".to_string()),
            DispatchError::Forbidden("role".to_string()),
            DispatchError::Validation("window".to_string()),
            DispatchError::Conflict("drift".to_string()),
            DispatchError::ExternalCommunication("timeout".to_string()),
            DispatchError::ProviderGone("404".to_string()),
            DispatchError::DatabaseError("down".to_string()),
            DispatchError::ConfigError("weights".to_string()),
            DispatchError::Internal("bug".to_string()),
        ];

        for error in errors {
            assert!(
                get_error_info(error.code()).is_some(),
                "missing docs for {}",
                error.code()
            );
        }
    }

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(DispatchError::ExternalCommunication("503".to_string()).is_retryable());
        assert!(!DispatchError::ProviderGone("404".to_string()).is_retryable());
        assert!(!DispatchError::Forbidden("editor".to_string()).is_retryable());
    }
}
