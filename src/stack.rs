//! Daily stack: one row per calendar day holding the amount of every
//! transaction on that day, and the cumulative bands drawn from it.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::{debug, warn};
use serde::Serialize;

use crate::amount::Amount;
use crate::calendar::{Calendar, GraphRange};
use crate::modification::{Modification, compute_transaction_modifications};
use crate::transaction::{ResolvedTransaction, TransactionId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyStackRow {
    pub date: NaiveDate,
    pub values: BTreeMap<TransactionId, Amount>,
}

impl DailyStackRow {
    pub fn get(&self, key: &str) -> Amount {
        Amount::or_zero_ref(self.values.get(key))
    }
}

/// One day of a band: the band covers `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StackPoint {
    pub date: NaiveDate,
    #[serde(with = "crate::amount::float")]
    pub low: Amount,
    #[serde(with = "crate::amount::float")]
    pub high: Amount,
}

impl StackPoint {
    pub fn height(&self) -> Amount {
        self.high - self.low
    }
}

/// Bands in key order, plus the highest point reached by any of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stacked {
    pub bands: Vec<Vec<StackPoint>>,
    pub max_height: Amount,
}

/// A row per calendar day with a zero for every key.
pub fn zeroed_stack<'a>(
    keys: impl IntoIterator<Item = &'a TransactionId> + Clone,
    calendar: &Calendar,
) -> Vec<DailyStackRow> {
    calendar
        .days()
        .iter()
        .map(|date| DailyStackRow {
            date: *date,
            values: keys
                .clone()
                .into_iter()
                .map(|k| (k.clone(), Amount::ZERO))
                .collect(),
        })
        .collect()
}

/// Adds the magnitude of every modification to the row of the closest
/// calendar day. Modifications for keys the stack does not know about
/// are skipped.
pub fn apply_modifications(
    mut rows: Vec<DailyStackRow>,
    calendar: &Calendar,
    mods: &[Modification],
) -> Vec<DailyStackRow> {
    for m in mods {
        let Some(i) = calendar.nearest_day_index(m.date) else {
            continue;
        };
        let Some(row) = rows.get_mut(i) else {
            continue;
        };
        match row.values.get_mut(&m.mutate_key) {
            Some(v) => *v += m.y.abs(),
            None => warn!("modification on {} for unknown key {:?}", m.date, m.mutate_key),
        }
    }
    rows
}

/// Zeroed stack for `data` with all of its modifications applied.
pub fn build_stack(data: &[ResolvedTransaction], calendar: &Calendar) -> Vec<DailyStackRow> {
    let rows = zeroed_stack(data.iter().map(|tx| tx.id()), calendar);

    let range = match (calendar.days().first(), calendar.days().last()) {
        (Some(first), Some(last)) => GraphRange::new(*first, *last),
        _ => return rows,
    };

    let mods = compute_transaction_modifications(data, range);
    apply_modifications(rows, calendar, &mods)
}

/// Stacks the values of `keys` on top of each other, in order, for
/// every row.
pub fn stack_rows(rows: &[DailyStackRow], keys: &[TransactionId]) -> Stacked {
    let mut floor = vec![Amount::ZERO; rows.len()];
    let mut max_height = Amount::ZERO;

    let bands = keys
        .iter()
        .map(|key| {
            rows.iter()
                .zip(floor.iter_mut())
                .map(|(row, low)| {
                    let high = *low + row.get(key);
                    let point = StackPoint {
                        date: row.date,
                        low: *low,
                        high,
                    };
                    *low = high;
                    max_height = max_height.max(high);
                    point
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    debug!("stacked {} bands, max height {}", bands.len(), max_height);

    Stacked { bands, max_height }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    use crate::schedule::{Ending, Recurrence, Schedule};
    use crate::transaction::{Transaction, TransactionKind};
    use crate::{amount, date};

    fn week() -> Calendar {
        Calendar::new(&GraphRange::new(date!(2025, 1, 1), date!(2025, 1, 7))).unwrap()
    }

    fn keys(ks: &[&str]) -> Vec<TransactionId> {
        ks.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_zeroed_stack_without_modifications() {
        let cal = week();
        let ks = keys(&["a", "b"]);
        let rows = apply_modifications(zeroed_stack(&ks, &cal), &cal, &[]);

        assert_eq!(rows.len(), 7);
        assert!(rows.iter().all(|r| r.values.values().all(|v| v.is_zero())));

        let stacked = stack_rows(&rows, &ks);
        assert_eq!(stacked.max_height, Amount::ZERO);
        assert_eq!(stacked.bands.len(), 2);
    }

    #[test]
    fn test_out_of_range_modifications_clamp() {
        let cal = week();
        let ks = keys(&["a"]);
        let mods = vec![
            Modification::new(date!(2024, 12, 31), "a", amount!(5)),
            Modification::new(date!(2025, 1, 8), "a", amount!(-7)),
        ];
        let rows = apply_modifications(zeroed_stack(&ks, &cal), &cal, &mods);

        assert_eq!(rows[0].get("a"), amount!(5));
        assert_eq!(rows[6].get("a"), amount!(7));
        assert!(rows[1..6].iter().all(|r| r.get("a").is_zero()));
    }

    #[test]
    fn test_unknown_key_is_ignored() {
        let cal = week();
        let ks = keys(&["a"]);
        let mods = vec![Modification::new(date!(2025, 1, 2), "ghost", amount!(5))];
        let rows = apply_modifications(zeroed_stack(&ks, &cal), &cal, &mods);

        assert_eq!(rows, zeroed_stack(&ks, &cal));
    }

    #[test]
    fn test_modifications_accumulate_magnitudes() {
        let cal = week();
        let ks = keys(&["a"]);
        let mods = vec![
            Modification::new(date!(2025, 1, 3), "a", amount!(10.10)),
            Modification::new(date!(2025, 1, 3), "a", amount!(-0.20)),
        ];
        let rows = apply_modifications(zeroed_stack(&ks, &cal), &cal, &mods);
        assert_eq!(rows[2].get("a"), amount!(10.30));
    }

    #[test]
    fn test_build_and_stack() {
        let cal = week();
        let data = vec![
            Transaction::new(
                "daily",
                TransactionKind::Expense,
                amount!(2),
                Schedule::recurring(date!(2025, 1, 1), Recurrence::EveryDays(1), Ending::Never),
            )
            .resolve(),
            Transaction::new(
                "rent",
                TransactionKind::Expense,
                amount!(-900),
                Schedule::once(date!(2025, 1, 5)),
            )
            .resolve(),
        ];
        let rows = build_stack(&data, &cal);
        let stacked = stack_rows(&rows, &keys(&["daily", "rent"]));

        assert_eq!(stacked.max_height, amount!(902));

        let daily = &stacked.bands[0];
        assert!(daily.iter().all(|p| p.low.is_zero() && p.high == amount!(2)));

        let rent = &stacked.bands[1];
        assert_eq!(
            rent[4],
            StackPoint {
                date: date!(2025, 1, 5),
                low: amount!(2),
                high: amount!(902),
            }
        );
        assert_eq!(rent[3].height(), Amount::ZERO);
    }

    #[test]
    fn test_stack_without_keys() {
        let cal = week();
        let rows = zeroed_stack(&Vec::new(), &cal);
        assert_eq!(stack_rows(&rows, &[]), Stacked::default());
    }
}
