use super::identifiers::{OrganizationId, TechnicianId, UserId};
use chrono::{FixedOffset, NaiveTime, Offset, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Deliverable category a shoot can require (photo, video, drone, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaType(String);

impl MediaType {
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_ascii_lowercase())
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub const MIN_SKILL_RATING: u8 = 1;
pub const MAX_SKILL_RATING: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityStats {
    /// Fraction of shoots started on time, 0.0..=1.0.
    pub on_time_rate: f64,
    pub completed_jobs: u32,
    pub avg_delivery_hours: Option<f64>,
}

impl Default for ReliabilityStats {
    fn default() -> Self {
        Self {
            on_time_rate: 0.0,
            completed_jobs: 0,
            avg_delivery_hours: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub enabled: bool,
}

impl WorkHours {
    #[must_use]
    pub const fn new(start: NaiveTime, end: NaiveTime, enabled: bool) -> Self {
        Self {
            start,
            end,
            enabled,
        }
    }

    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            start: NaiveTime::MIN,
            end: NaiveTime::MIN,
            enabled: false,
        }
    }
}

/// Declared work hours per weekday, Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySchedule {
    days: [WorkHours; 7],
}

impl WeeklySchedule {
    #[must_use]
    pub const fn new(days: [WorkHours; 7]) -> Self {
        Self { days }
    }

    /// Same hours on Monday through Friday, weekends off.
    #[must_use]
    pub fn weekdays(start: NaiveTime, end: NaiveTime) -> Self {
        let open = WorkHours::new(start, end, true);
        let closed = WorkHours::disabled();
        Self::new([open, open, open, open, open, closed, closed])
    }

    #[must_use]
    pub fn for_day(&self, weekday: Weekday) -> &WorkHours {
        &self.days[weekday.num_days_from_monday() as usize]
    }

    pub fn set_day(&mut self, weekday: Weekday, hours: WorkHours) {
        self.days[weekday.num_days_from_monday() as usize] = hours;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Weekday, &WorkHours)> {
        self.days.iter().enumerate().filter_map(|(index, hours)| {
            u8::try_from(index)
                .ok()
                .and_then(|index| Weekday::try_from(index).ok())
                .map(|weekday| (weekday, hours))
        })
    }
}

impl Default for WeeklySchedule {
    fn default() -> Self {
        Self::weekdays(
            NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technician {
    pub id: TechnicianId,
    pub user_id: UserId,
    pub display_name: String,
    pub home: Option<GeoPoint>,
    pub skills: BTreeMap<MediaType, u8>,
    pub reliability: ReliabilityStats,
    /// Organizations that flagged this technician as a preferred vendor.
    pub preferred_by: BTreeSet<OrganizationId>,
    /// Global "available" toggle; off overrides every other availability input.
    pub available: bool,
    /// Offset used to interpret `work_hours`.
    pub utc_offset_minutes: i32,
    pub work_hours: WeeklySchedule,
}

impl Technician {
    #[must_use]
    pub fn new(user_id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            id: TechnicianId::generate(),
            user_id,
            display_name: display_name.into(),
            home: None,
            skills: BTreeMap::new(),
            reliability: ReliabilityStats::default(),
            preferred_by: BTreeSet::new(),
            available: true,
            utc_offset_minutes: 0,
            work_hours: WeeklySchedule::default(),
        }
    }

    /// Rating for one media type, clamped into the 1..=5 scale.
    #[must_use]
    pub fn skill_rating(&self, media: &MediaType) -> Option<u8> {
        self.skills
            .get(media)
            .map(|rating| (*rating).clamp(MIN_SKILL_RATING, MAX_SKILL_RATING))
    }

    #[must_use]
    pub fn is_preferred_by(&self, organization_id: &OrganizationId) -> bool {
        self.preferred_by.contains(organization_id)
    }

    /// Offsets outside the valid +/-24h range fall back to UTC.
    #[must_use]
    pub fn local_offset(&self) -> FixedOffset {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }
}

#[cfg(test)]
mod tests {
    use super::{MediaType, Technician, WeeklySchedule};
    use crate::types::UserId;
    use chrono::Weekday;

    #[test]
    fn media_types_are_case_insensitive() {
        assert_eq!(MediaType::new(" Video "), MediaType::new("video"));
    }

    #[test]
    fn skill_ratings_clamp_to_scale() {
        let mut tech = Technician::new(UserId::generate(), "Ana");
        tech.skills.insert(MediaType::new("photo"), 9);
        tech.skills.insert(MediaType::new("drone"), 0);
        assert_eq!(tech.skill_rating(&MediaType::new("photo")), Some(5));
        assert_eq!(tech.skill_rating(&MediaType::new("drone")), Some(1));
        assert_eq!(tech.skill_rating(&MediaType::new("video")), None);
    }

    #[test]
    fn default_schedule_closes_weekends() {
        let schedule = WeeklySchedule::default();
        assert!(schedule.for_day(Weekday::Mon).enabled);
        assert!(!schedule.for_day(Weekday::Sun).enabled);
        assert_eq!(schedule.iter().count(), 7);
    }
}
