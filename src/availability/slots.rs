use crate::error::{DispatchError, Result};
use crate::provider::BusyInterval;
use crate::types::Technician;
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Longest window a single resolve call may span.
pub const MAX_WINDOW_DAYS: i64 = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub available: bool,
}

/// # Errors
/// Returns `Validation` for empty/inverted windows, windows longer than
/// `MAX_WINDOW_DAYS`, or non-positive slot lengths.
pub fn validate_window(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    slot_minutes: i64,
) -> Result<()> {
    if end <= start {
        return Err(DispatchError::Validation(format!(
            "window end {end} must be after start {start}"
        )));
    }
    if end - start > Duration::days(MAX_WINDOW_DAYS) {
        return Err(DispatchError::Validation(format!(
            "window longer than {MAX_WINDOW_DAYS} days"
        )));
    }
    if slot_minutes <= 0 {
        return Err(DispatchError::Validation(format!(
            "slot duration must be positive, got {slot_minutes} minutes"
        )));
    }
    Ok(())
}

#[must_use]
pub fn is_free(busy: &[BusyInterval], start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    !busy.iter().any(|interval| interval.overlaps(start, end))
}

/// Work-hours bounds of one local calendar day, converted to UTC.
fn day_bounds(technician: &Technician, date: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let hours = technician.work_hours.for_day(date.weekday());
    if !hours.enabled || hours.end <= hours.start {
        return None;
    }
    let offset = technician.local_offset();
    let open = offset
        .from_local_datetime(&date.and_time(hours.start))
        .single()?;
    let close = offset
        .from_local_datetime(&date.and_time(hours.end))
        .single()?;
    Some((open.with_timezone(&Utc), close.with_timezone(&Utc)))
}

/// True when `[start, end)` sits inside one enabled work-hours block.
#[must_use]
pub fn within_work_hours(technician: &Technician, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    let local_date = start.with_timezone(&technician.local_offset()).date_naive();
    day_bounds(technician, local_date).is_some_and(|(open, close)| start >= open && end <= close)
}

/// Slots of `slot` length starting every `step` inside the window and the
/// technician's enabled work hours. Overlapping slots appear when `slot > step`.
///
/// The global availability toggle short-circuits to an empty sequence.
#[must_use]
pub fn build_slots(
    technician: &Technician,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    slot: Duration,
    step: Duration,
    busy: &[BusyInterval],
) -> Vec<TimeSlot> {
    if !technician.available || slot <= Duration::zero() || step <= Duration::zero() {
        return Vec::new();
    }

    let offset = technician.local_offset();
    let first_day = window_start.with_timezone(&offset).date_naive();
    let last_day = window_end.with_timezone(&offset).date_naive();

    let mut slots = Vec::new();
    let mut day = Some(first_day);
    while let Some(date) = day.filter(|date| *date <= last_day) {
        if let Some((open, close)) = day_bounds(technician, date) {
            let lower = open.max(window_start);
            let upper = close.min(window_end);
            let mut cursor = lower;
            while cursor + slot <= upper {
                let end = cursor + slot;
                slots.push(TimeSlot {
                    start: cursor,
                    end,
                    available: is_free(busy, cursor, end),
                });
                cursor += step;
            }
        }
        day = date.succ_opt();
    }
    slots
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{UserId, WorkHours};
    use chrono::{NaiveTime, Weekday};

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        // June 2025: the 2nd is a Monday.
        Utc.with_ymd_and_hms(2025, 6, day, hour, minute, 0).unwrap()
    }

    fn technician() -> Technician {
        Technician::new(UserId::generate(), "Cam")
    }

    #[test]
    fn slots_step_thirty_minutes_and_overlap_for_long_durations() {
        let tech = technician();
        let slots = build_slots(
            &tech,
            at(2, 9, 0),
            at(2, 11, 0),
            Duration::minutes(60),
            Duration::minutes(30),
            &[],
        );
        let starts: Vec<_> = slots.iter().map(|slot| slot.start).collect();
        assert_eq!(starts, vec![at(2, 9, 0), at(2, 9, 30), at(2, 10, 0)]);
        assert!(slots.iter().all(|slot| slot.available));
    }

    #[test]
    fn disabled_days_are_skipped_entirely() {
        let tech = technician();
        // Saturday and Sunday are off by default.
        let slots = build_slots(
            &tech,
            at(7, 0, 0),
            at(8, 23, 0),
            Duration::minutes(30),
            Duration::minutes(30),
            &[],
        );
        assert!(slots.is_empty());
    }

    #[test]
    fn busy_interval_marks_overlapping_slots_unavailable_but_not_adjacent_ones() {
        let tech = technician();
        let busy = [BusyInterval::new(at(2, 10, 0), at(2, 11, 0))];
        let slots = build_slots(
            &tech,
            at(2, 9, 0),
            at(2, 12, 0),
            Duration::minutes(60),
            Duration::minutes(30),
            &busy,
        );

        let availability: Vec<_> = slots.iter().map(|slot| (slot.start, slot.available)).collect();
        assert_eq!(
            availability,
            vec![
                (at(2, 9, 0), true),
                (at(2, 9, 30), false),
                (at(2, 10, 0), false),
                (at(2, 10, 30), false),
                (at(2, 11, 0), true),
            ]
        );
    }

    #[test]
    fn toggle_off_returns_nothing_regardless_of_hours() {
        let mut tech = technician();
        tech.available = false;
        let slots = build_slots(
            &tech,
            at(2, 9, 0),
            at(2, 17, 0),
            Duration::minutes(30),
            Duration::minutes(30),
            &[],
        );
        assert!(slots.is_empty());
    }

    #[test]
    fn work_hours_follow_the_technician_offset() {
        let mut tech = technician();
        tech.utc_offset_minutes = -240;
        tech.work_hours.set_day(
            Weekday::Mon,
            WorkHours::new(
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                true,
            ),
        );

        // 09:00-10:00 at UTC-4 is 13:00-14:00 UTC.
        assert!(within_work_hours(&tech, at(2, 13, 0), at(2, 14, 0)));
        assert!(!within_work_hours(&tech, at(2, 9, 0), at(2, 10, 0)));
    }

    #[test]
    fn invalid_windows_are_rejected() {
        assert!(validate_window(at(2, 10, 0), at(2, 10, 0), 30).is_err());
        assert!(validate_window(at(2, 10, 0), at(2, 11, 0), 0).is_err());
        assert!(validate_window(at(2, 10, 0), at(2, 11, 0) + Duration::days(40), 30).is_err());
        assert!(validate_window(at(2, 10, 0), at(2, 11, 0), 30).is_ok());
    }
}
