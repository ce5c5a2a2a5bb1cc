use chrono::NaiveDate;
use log::debug;
use serde::Serialize;

use crate::amount::Amount;
use crate::calendar::GraphRange;
use crate::transaction::{ResolvedTransaction, TransactionId};

/// A dated delta against one slot of the daily stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Modification {
    pub date: NaiveDate,
    pub mutate_key: TransactionId,
    pub y: Amount,
}

impl Modification {
    pub fn new(date: NaiveDate, mutate_key: &str, y: Amount) -> Modification {
        Modification {
            date,
            mutate_key: mutate_key.to_string(),
            y,
        }
    }
}

/// Expands every transaction into one modification per occurrence that
/// falls inside `range`. Output follows the transaction order, then the
/// date order within a transaction.
pub fn compute_transaction_modifications(
    data: &[ResolvedTransaction],
    range: GraphRange,
) -> Vec<Modification> {
    let mods = data
        .iter()
        .flat_map(|tx| {
            tx.transaction
                .schedule
                .occurrences_within(range)
                .map(move |date| Modification {
                    date,
                    mutate_key: tx.id().clone(),
                    y: tx.amount,
                })
        })
        .collect::<Vec<_>>();

    debug!(
        "{} modifications for {} transactions between {} and {}",
        mods.len(),
        data.len(),
        range.start,
        range.end
    );

    mods
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    use crate::schedule::{Ending, Recurrence, Schedule};
    use crate::transaction::{Transaction, TransactionKind};
    use crate::{amount, date};

    #[test]
    fn test_modifications_per_occurrence() {
        let range = GraphRange::new(date!(2025, 1, 1), date!(2025, 1, 10));
        let data = vec![
            Transaction::new(
                "coffee",
                TransactionKind::Expense,
                amount!(-4.5),
                Schedule::recurring(date!(2024, 12, 29), Recurrence::EveryDays(4), Ending::Never),
            )
            .resolve(),
            Transaction::new(
                "bonus",
                TransactionKind::Income,
                amount!(500),
                Schedule::once(date!(2025, 1, 5)),
            )
            .resolve(),
            Transaction::new(
                "late",
                TransactionKind::Income,
                amount!(1),
                Schedule::once(date!(2025, 2, 1)),
            )
            .resolve(),
        ];

        assert_eq!(
            compute_transaction_modifications(&data, range),
            vec![
                Modification::new(date!(2025, 1, 2), "coffee", amount!(-4.5)),
                Modification::new(date!(2025, 1, 6), "coffee", amount!(-4.5)),
                Modification::new(date!(2025, 1, 10), "coffee", amount!(-4.5)),
                Modification::new(date!(2025, 1, 5), "bonus", amount!(500)),
            ]
        );
    }

    #[test]
    fn test_no_transactions() {
        let range = GraphRange::new(date!(2025, 1, 1), date!(2025, 1, 10));
        assert_eq!(compute_transaction_modifications(&[], range), vec![]);
    }
}
