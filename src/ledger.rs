use std::io::Read;

use log::debug;
use serde::{Deserialize, Deserializer, Serialize};

use crate::account::{Account, coerce_paybacks};
use crate::balance::{AccountSeries, resolve_account_chart};
use crate::calendar::{Calendar, GraphRange};
use crate::chart::{BarSeries, resolve_bar_chart};
use crate::error::Result;
use crate::transaction::{Transaction, resolve_values, sort_transactions, transaction_splitter};

/// Everything the projection is computed from: the declared
/// transactions and the accounts they are booked against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub transactions: Vec<Transaction>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub accounts: Vec<Account>,
}

/// The projected charts of a ledger over a range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    pub income: Vec<BarSeries>,
    pub expense: Vec<BarSeries>,
    pub accounts: Vec<AccountSeries>,
}

/// Parses a JSON ledger.
///
/// Formula trees nest one object per level, so the nesting depth is not
/// bounded: the recursion limit is lifted and the stack grows on demand.
pub fn read_ledger(input: impl Read) -> Result<Ledger> {
    let mut de = serde_json::Deserializer::from_reader(input);
    de.disable_recursion_limit();
    let ledger = Ledger::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    de.end()?;
    debug!(
        "ledger read: {} transactions, {} accounts",
        ledger.transactions.len(),
        ledger.accounts.len()
    );
    Ok(ledger)
}

impl Ledger {
    pub fn new(transactions: Vec<Transaction>, accounts: Vec<Account>) -> Ledger {
        Ledger {
            transactions,
            accounts,
        }
    }

    /// Runs the whole pipeline over `range`: payback coercion, value
    /// resolution, split in income and expense, ordering, bar charts
    /// and finally account balances.
    pub fn project(&self, range: &GraphRange) -> Result<Projection> {
        let calendar = Calendar::new(range)?;
        debug!("projecting {} days from {}", calendar.len(), range.start);

        let paybacks = coerce_paybacks(&self.accounts)?;
        let all = self
            .transactions
            .iter()
            .cloned()
            .chain(paybacks)
            .collect::<Vec<_>>();

        let mut split = transaction_splitter(resolve_values(&all));
        sort_transactions(&mut split.income);
        sort_transactions(&mut split.expense);
        debug!(
            "{} income and {} expense transactions",
            split.income.len(),
            split.expense.len()
        );

        let income = resolve_bar_chart(&split.income, &calendar);
        let expense = resolve_bar_chart(&split.expense, &calendar);
        let accounts = resolve_account_chart(&self.accounts, &income, &expense);
        debug!("{} account series", accounts.len());

        Ok(Projection {
            income,
            expense,
            accounts,
        })
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
