//! Adherence analytics.
//!
//! Both computations read a point-in-time snapshot of the store; staleness
//! against concurrent writes is acceptable. `now` is a parameter so the
//! window arithmetic stays deterministic under test.

use crate::model::{Activity, ActivityStatus};
use crate::store::EntityStore;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Dose statistics over a time window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdherenceSummary {
    pub total: u64,
    pub taken: u64,
    /// Percentage of doses taken, rounded to two decimal places. `0.0`
    /// when the window holds no activity.
    pub rate: f64,
}

/// Maps a `range` query value to a window length in days.
///
/// `"7d"` means seven days; any other value falls back to the 30-day
/// window. The lenient fallback is deliberate, not an error.
pub fn window_days(range: &str) -> i64 {
    if range == "7d" {
        7
    } else {
        30
    }
}

/// Dose statistics for `patient_id` over `[now - days, now)`.
pub fn summary(
    store: &EntityStore,
    patient_id: Uuid,
    days: i64,
    now: DateTime<Utc>,
) -> AdherenceSummary {
    let start = now - Duration::days(days);

    let mut total = 0u64;
    let mut taken = 0u64;
    for activity in store.activities_for_patient(patient_id) {
        if activity.date_time >= start && activity.date_time < now {
            total += 1;
            if activity.status == ActivityStatus::Taken {
                taken += 1;
            }
        }
    }

    let rate = if total == 0 {
        0.0
    } else {
        (taken as f64 / total as f64 * 100.0 * 100.0).round() / 100.0
    };

    AdherenceSummary { total, taken, rate }
}

/// Dose history for `patient_id`, newest first.
///
/// Bounds are inclusive and date-only: each activity's timestamp is
/// reduced to its date component before comparison, so time-of-day never
/// excludes a boundary day.
pub fn history(
    store: &EntityStore,
    patient_id: Uuid,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<Activity> {
    let mut activities: Vec<_> = store
        .activities_for_patient(patient_id)
        .into_iter()
        .filter(|activity| {
            let date = activity.date_time.date_naive();
            start.map_or(true, |s| date >= s) && end.map_or(true, |e| date <= e)
        })
        .collect();
    activities.sort_by(|a, b| b.date_time.cmp(&a.date_time));
    activities
}
