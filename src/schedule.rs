//! When a transaction happens.
//!
//! A schedule is a start date, a recurrence rule and an ending rule.
//! Occurrences are computed from the start date by index, never by
//! stepping from the previous occurrence, so month-end and leap-day
//! clamping does not drift (a schedule on the 31st lands on Feb 28 and
//! then back on Mar 31).

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::calendar::GraphRange;
use crate::error::InputError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Recurrence {
    /// A single occurrence on the start date.
    Once,
    /// Every `n` days from the start date.
    EveryDays(u32),
    /// Every given weekday on or after the start date.
    DayOfWeek(Weekday),
    /// The given day of every month on or after the start date. Days
    /// past the end of a month clamp to its last day.
    DayOfMonth(u32),
    /// The start date's month and day, every year.
    Annually,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Ending {
    Never,
    /// Last possible occurrence, inclusive.
    AtDate(NaiveDate),
    /// Total number of occurrences, counted from the start date.
    AfterOccurrences(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Schedule {
    pub start: NaiveDate,
    pub recurrence: Recurrence,
    pub ending: Ending,
}

impl Schedule {
    /// A one-off schedule on `date`.
    pub fn once(date: NaiveDate) -> Schedule {
        Schedule {
            start: date,
            recurrence: Recurrence::Once,
            ending: Ending::Never,
        }
    }

    pub fn recurring(start: NaiveDate, recurrence: Recurrence, ending: Ending) -> Schedule {
        Schedule {
            start,
            recurrence,
            ending,
        }
    }

    /// Returns all occurrences in chronological order. The iterator is
    /// endless for recurring schedules with `Ending::Never`.
    pub fn occurrences(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        let limit = match self.ending {
            Ending::AfterOccurrences(n) => n as usize,
            _ => usize::MAX,
        };
        let until = match self.ending {
            Ending::AtDate(d) => Some(d),
            _ => None,
        };

        (0u32..)
            .map_while(move |k| self.nth(k))
            .take_while(move |d| until.is_none_or(|u| *d <= u))
            .take(limit)
    }

    /// Occurrences falling inside `range`.
    pub fn occurrences_within(&self, range: GraphRange) -> impl Iterator<Item = NaiveDate> + '_ {
        self.occurrences()
            .take_while(move |d| *d <= range.end)
            .filter(move |d| *d >= range.start)
    }

    /// The `k`-th occurrence, ignoring the ending rule.
    fn nth(&self, k: u32) -> Option<NaiveDate> {
        match self.recurrence {
            Recurrence::Once => (k == 0).then_some(self.start),
            Recurrence::EveryDays(n) => self
                .start
                .checked_add_days(Days::new(k as u64 * n as u64)),
            Recurrence::DayOfWeek(w) => {
                let from = self.start.weekday().num_days_from_sunday();
                let ahead = (7 + w.num_days_from_sunday() - from) % 7;
                self.start
                    .checked_add_days(Days::new(ahead as u64 + 7 * k as u64))
            }
            Recurrence::DayOfMonth(day) => {
                let this_month = clamp_day(self.start.year(), self.start.month(), day)?;
                let skip = if this_month < self.start { 1 } else { 0 };
                let first = self.start.with_day(1)?;
                let month = first.checked_add_months(Months::new(k.checked_add(skip)?))?;
                clamp_day(month.year(), month.month(), day)
            }
            Recurrence::Annually => self
                .start
                .checked_add_months(Months::new(k.checked_mul(12)?)),
        }
    }

    pub(crate) fn from_raw(id: &str, raw: RawSchedule) -> Result<Schedule, InputError> {
        let rtype = raw.rtype.unwrap_or_else(|| String::from("none"));
        let incomplete = |what: &'static str| InputError::IncompleteSchedule {
            id: id.to_string(),
            rtype: rtype.clone(),
            what,
        };

        let start = raw.start.ok_or_else(|| incomplete("a start date"))?;

        let cycle = || -> Result<i64, InputError> {
            raw.cycle
                .and_then(|c| c.value().trunc().to_i64())
                .ok_or_else(|| incomplete("a cycle"))
        };
        let invalid = |cycle: i64| InputError::InvalidCycle {
            id: id.to_string(),
            rtype: rtype.clone(),
            cycle,
        };

        let recurrence = match rtype.as_str() {
            "none" | "" => Recurrence::Once,
            "day" => {
                let c = cycle()?;
                match u32::try_from(c) {
                    Ok(n) if n >= 1 => Recurrence::EveryDays(n),
                    _ => return Err(invalid(c)),
                }
            }
            "day of week" => {
                let c = cycle()?;
                Recurrence::DayOfWeek(weekday_from_sunday(c).ok_or_else(|| invalid(c))?)
            }
            "day of month" => {
                let c = cycle()?;
                match u32::try_from(c) {
                    Ok(d) if (1..=31).contains(&d) => Recurrence::DayOfMonth(d),
                    _ => return Err(invalid(c)),
                }
            }
            "annually" => Recurrence::Annually,
            _ => {
                return Err(InputError::UnknownRecurrence {
                    id: id.to_string(),
                    rtype: rtype.clone(),
                });
            }
        };

        let ending = match raw.ending.as_deref().unwrap_or("never") {
            "never" | "" => Ending::Never,
            "at Date" => Ending::AtDate(raw.end.ok_or_else(|| incomplete("an end date"))?),
            "after Number of Occurrences" => {
                let n = raw
                    .occurrences
                    .and_then(|o| o.value().trunc().to_u32())
                    .ok_or_else(|| incomplete("a number of occurrences"))?;
                Ending::AfterOccurrences(n)
            }
            other => {
                return Err(InputError::UnknownEnding {
                    id: id.to_string(),
                    ending: other.to_string(),
                });
            }
        };

        Ok(Schedule {
            start,
            recurrence,
            ending,
        })
    }
}

/// Schedule fields as written by the transaction editor. Numbers may
/// come in as strings, hence `Amount`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct RawSchedule {
    #[serde(skip_serializing_if = "Option::is_none")]
    start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rtype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cycle: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ending: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    occurrences: Option<Amount>,
}

impl From<Schedule> for RawSchedule {
    fn from(s: Schedule) -> Self {
        let (rtype, cycle) = match s.recurrence {
            Recurrence::Once => ("none", None),
            Recurrence::EveryDays(n) => ("day", Some(n)),
            Recurrence::DayOfWeek(w) => ("day of week", Some(w.num_days_from_sunday())),
            Recurrence::DayOfMonth(d) => ("day of month", Some(d)),
            Recurrence::Annually => ("annually", None),
        };
        let (ending, end, occurrences) = match s.ending {
            Ending::Never => ("never", None, None),
            Ending::AtDate(d) => ("at Date", Some(d), None),
            Ending::AfterOccurrences(n) => ("after Number of Occurrences", None, Some(n)),
        };

        RawSchedule {
            start: Some(s.start),
            rtype: Some(rtype.to_string()),
            cycle: cycle.map(|c| Amount::from(i64::from(c))),
            ending: Some(ending.to_string()),
            end,
            occurrences: occurrences.map(|o| Amount::from(i64::from(o))),
        }
    }
}

/// Returns `day` in the given month, or the last day of the month if
/// it is shorter.
fn clamp_day(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last = first.checked_add_months(Months::new(1))?.pred_opt()?;
    first.with_day(day.min(last.day()))
}

/// 0 is Sunday, 6 is Saturday.
fn weekday_from_sunday(n: i64) -> Option<Weekday> {
    match n {
        0 => Some(Weekday::Sun),
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        _ => None,
    }
}
