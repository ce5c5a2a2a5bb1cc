use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{ProjectionError, Result};

/// An inclusive date range to project over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl GraphRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> GraphRange {
        GraphRange { start, end }
    }

    /// A range of `days` days after `start`, both ends included. Fails
    /// when the end falls past the last representable date.
    pub fn days_from(start: NaiveDate, days: u32) -> Result<GraphRange> {
        let end = start
            .checked_add_days(Days::new(days.into()))
            .ok_or(ProjectionError::RangeOverflow { start, days })?;
        Ok(GraphRange { start, end })
    }

    /// Returns true if `d` is within the range.
    pub fn contains(&self, d: NaiveDate) -> bool {
        d >= self.start && d <= self.end
    }
}

/// The ordered, gap-free list of days of a `GraphRange`.
///
/// Every series produced by the engine is indexed by the position of a
/// day in this list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calendar {
    days: Vec<NaiveDate>,
}

impl Calendar {
    /// Builds the calendar of `range`, both ends included.
    pub fn new(range: &GraphRange) -> Result<Calendar> {
        if range.end < range.start {
            return Err(ProjectionError::InvalidRange {
                start: range.start,
                end: range.end,
            });
        }

        let days = range
            .start
            .iter_days()
            .take_while(|d| *d <= range.end)
            .collect();

        Ok(Calendar { days })
    }

    pub fn days(&self) -> &[NaiveDate] {
        &self.days
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Maps `date` to the index of the closest day of the calendar.
    ///
    /// Dates before the first day or after the last one clamp to the
    /// boundary instead of being dropped. Ties go to the earlier day.
    /// Returns `None` only for an empty calendar.
    pub fn nearest_day_index(&self, date: NaiveDate) -> Option<usize> {
        if self.days.is_empty() {
            return None;
        }

        let i = self.days.partition_point(|d| *d < date);
        if i == 0 {
            return Some(0);
        }
        if i == self.days.len() {
            return Some(self.days.len() - 1);
        }

        let before = date - self.days[i - 1];
        let after = self.days[i] - date;
        if before <= after { Some(i - 1) } else { Some(i) }
    }
}
