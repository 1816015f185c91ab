//! Due-for-care evaluation.
//!
//! Pure functions over records that were already fetched. Elapsed time is
//! counted in whole 24-hour days, rounded down: a plant watered at 23:00 is
//! "0 days" ago at 22:59 the next evening and "1 day" ago a minute later.
//! Care dated in the future counts as 0 days.

use chrono::{DateTime, Duration, Utc};

use crate::models::{CareEvent, Plant};

/// Most recent care date, if the plant was ever cared for.
pub fn last_care_date(events: &[CareEvent]) -> Option<DateTime<Utc>> {
    events.iter().map(|e| e.care_date).max()
}

/// Whole days between `since` and `now`, never negative.
pub fn days_between(since: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - since).num_days().max(0)
}

pub fn days_since_last_care(events: &[CareEvent], now: DateTime<Utc>) -> Option<i64> {
    last_care_date(events).map(|last| days_between(last, now))
}

pub fn is_due_at(plant: &Plant, events: &[CareEvent], now: DateTime<Utc>) -> bool {
    match days_since_last_care(events, now) {
        None => true,
        Some(days) => days >= i64::from(plant.care_frequency_days),
    }
}

pub fn is_due(plant: &Plant, events: &[CareEvent]) -> bool {
    is_due_at(plant, events, Utc::now())
}

/// When care is next due. `None` if the plant was never cared for, or if the
/// date falls outside the representable range.
pub fn next_care_due(plant: &Plant, events: &[CareEvent]) -> Option<DateTime<Utc>> {
    let cadence = Duration::try_days(i64::from(plant.care_frequency_days))?;
    last_care_date(events)?.checked_add_signed(cadence)
}

/// What a plant card shows about care.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CareStatus {
    pub last_care: Option<DateTime<Utc>>,
    pub days_since: Option<i64>,
    pub next_due: Option<DateTime<Utc>>,
    pub is_due: bool,
}

pub fn care_status(plant: &Plant, events: &[CareEvent], now: DateTime<Utc>) -> CareStatus {
    CareStatus {
        last_care: last_care_date(events),
        days_since: days_since_last_care(events, now),
        next_due: next_care_due(plant, events),
        is_due: is_due_at(plant, events, now),
    }
}
