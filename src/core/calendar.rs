use chrono::{DateTime, NaiveDate};
use indexmap::IndexSet;
use tracing::trace;

use crate::core::ChartHandle;

/// Indices of the x series where a not-yet-seen UTC calendar day begins.
///
/// x values are millisecond Unix timestamps. Non-representable values are
/// skipped.
#[must_use]
pub fn new_calendar_day_indices(chart: &dyn ChartHandle) -> Vec<usize> {
    let len = chart.data_len();
    let mut seen: IndexSet<NaiveDate> = IndexSet::new();
    let mut indices = Vec::new();

    for idx in 0..len {
        let Some(day) = chart.value(0, idx).and_then(utc_day) else {
            trace!(idx, "skip x value without a calendar day");
            continue;
        };
        if seen.insert(day) {
            indices.push(idx);
        }
    }

    indices
}

fn utc_day(timestamp_ms: f64) -> Option<NaiveDate> {
    if !timestamp_ms.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(timestamp_ms as i64).map(|time| time.date_naive())
}
