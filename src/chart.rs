use serde::Serialize;

use crate::amount::Amount;
use crate::calendar::Calendar;
use crate::stack::{StackPoint, build_stack, stack_rows};
use crate::transaction::{ResolvedTransaction, TransactionId};

/// A transaction with its band in the stacked bar chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarSeries {
    #[serde(flatten)]
    pub transaction: ResolvedTransaction,
    pub stack: Vec<StackPoint>,
    /// Shared by every series of the same chart.
    #[serde(with = "crate::amount::float")]
    pub max_height: Amount,
}

impl BarSeries {
    /// Sum of the band heights over the whole range.
    pub fn total(&self) -> Amount {
        self.stack.iter().map(StackPoint::height).sum()
    }
}

/// Builds one stacked series per transaction, in input order.
pub fn resolve_bar_chart(data: &[ResolvedTransaction], calendar: &Calendar) -> Vec<BarSeries> {
    if data.is_empty() {
        return Vec::new();
    }

    let keys = data.iter().map(|tx| tx.id().clone()).collect::<Vec<TransactionId>>();
    let rows = build_stack(data, calendar);
    let stacked = stack_rows(&rows, &keys);

    data.iter()
        .cloned()
        .zip(stacked.bands)
        .map(|(transaction, stack)| BarSeries {
            transaction,
            stack,
            max_height: stacked.max_height,
        })
        .collect()
}
