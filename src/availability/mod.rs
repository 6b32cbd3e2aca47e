#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

mod slots;

pub use slots::{build_slots, is_free, validate_window, within_work_hours, TimeSlot, MAX_WINDOW_DAYS};

use crate::error::{DispatchError, Result};
use crate::ports::{CalendarStore, TechnicianStore};
use crate::provider::{BusyInterval, CalendarProvider};
use crate::types::{Technician, TechnicianId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityPolicy {
    /// Slot starts advance by this many minutes regardless of slot length.
    pub slot_step_minutes: i64,
}

impl Default for AvailabilityPolicy {
    fn default() -> Self {
        Self {
            slot_step_minutes: 30,
        }
    }
}

/// Intersects declared work hours, the global toggle and provider busy time.
pub struct AvailabilityResolver<P, C> {
    ports: P,
    provider: C,
    policy: AvailabilityPolicy,
}

impl<P, C> AvailabilityResolver<P, C>
where
    P: TechnicianStore + CalendarStore + Sync,
    C: CalendarProvider + Sync,
{
    #[must_use]
    pub const fn new(ports: P, provider: C, policy: AvailabilityPolicy) -> Self {
        Self {
            ports,
            provider,
            policy,
        }
    }

    /// # Errors
    /// `Validation` for a malformed window, `NotFound` for an unknown
    /// technician, or a store failure.
    pub async fn resolve(
        &self,
        technician_id: &TechnicianId,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        slot_minutes: i64,
    ) -> Result<Vec<TimeSlot>> {
        validate_window(window_start, window_end, slot_minutes)?;
        let technician = self.load(technician_id).await?;
        self.resolve_for(&technician, window_start, window_end, slot_minutes)
            .await
    }

    /// # Errors
    /// `Validation` for a malformed window, or a store failure.
    pub async fn resolve_for(
        &self,
        technician: &Technician,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        slot_minutes: i64,
    ) -> Result<Vec<TimeSlot>> {
        validate_window(window_start, window_end, slot_minutes)?;
        if !technician.available {
            debug!(technician_id = %technician.id, "availability toggle off");
            return Ok(Vec::new());
        }

        let busy = self
            .busy_intervals(technician, window_start, window_end)
            .await?;
        Ok(build_slots(
            technician,
            window_start,
            window_end,
            Duration::minutes(slot_minutes),
            Duration::minutes(self.policy.slot_step_minutes.max(1)),
            &busy,
        ))
    }

    /// Whether exactly `[start, end)` is free.
    ///
    /// # Errors
    /// `Validation` for an inverted interval, `NotFound` for an unknown
    /// technician, or a store failure.
    pub async fn check(
        &self,
        technician_id: &TechnicianId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool> {
        let technician = self.load(technician_id).await?;
        self.check_for(&technician, start, end).await
    }

    /// # Errors
    /// `Validation` for an inverted interval, or a store failure.
    pub async fn check_for(
        &self,
        technician: &Technician,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool> {
        let minutes = (end - start).num_minutes().max(1);
        validate_window(start, end, minutes)?;
        if !technician.available || !within_work_hours(technician, start, end) {
            return Ok(false);
        }
        let busy = self.busy_intervals(technician, start, end).await?;
        Ok(is_free(&busy, start, end))
    }

    async fn load(&self, technician_id: &TechnicianId) -> Result<Technician> {
        self.ports
            .load_technician(technician_id)
            .await?
            .ok_or_else(|| DispatchError::NotFound(format!("technician {technician_id}")))
    }

    /// Fetched once per call. Provider failures degrade to declared hours only.
    async fn busy_intervals(
        &self,
        technician: &Technician,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>> {
        let integrations = self
            .ports
            .integrations_for_technician(&technician.id)
            .await?;
        let source = integrations
            .iter()
            .find(|integration| integration.is_active_write_target())
            .or_else(|| integrations.iter().find(|integration| integration.is_active()));

        let Some(integration) = source else {
            return Ok(Vec::new());
        };

        match self
            .provider
            .free_busy(&integration.grant_id, &integration.account_email, start, end)
            .await
        {
            Ok(busy) => Ok(busy),
            Err(error) => {
                warn!(
                    technician_id = %technician.id,
                    grant_id = %integration.grant_id,
                    error = %error,
                    "free/busy lookup failed; using declared work hours only"
                );
                Ok(Vec::new())
            }
        }
    }
}
