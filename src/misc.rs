use chrono::{NaiveDate, Utc};
use std::sync::OnceLock;

use crate::calendar::GraphRange;
use crate::error::Result;

/// Days projected when no end date is given.
pub const DEFAULT_DAYS: u32 = 365;

static TODAY: OnceLock<NaiveDate> = OnceLock::new();
pub fn today() -> NaiveDate {
    *TODAY.get_or_init(|| Utc::now().date_naive())
}

/// Builds the projection range from optional bounds.
///
/// A missing `begin` defaults to today and a missing `end` to `days`
/// days after `begin`. Fails if that end date is not representable.
///
/// ```
/// use finproj::misc::projection_range;
/// use chrono::NaiveDate;
///
/// let begin = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
/// let r = projection_range(Some(begin), None, 30).unwrap();
/// assert_eq!(r.end, NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
///
/// assert!(projection_range(Some(begin), None, u32::MAX).is_err());
/// ```
pub fn projection_range(
    begin: Option<NaiveDate>,
    end: Option<NaiveDate>,
    days: u32,
) -> Result<GraphRange> {
    let start = begin.unwrap_or_else(today);
    match end {
        Some(end) => Ok(GraphRange::new(start, end)),
        None => GraphRange::days_from(start, days),
    }
}
