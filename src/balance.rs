//! Projected balance of every account.
//!
//! Each calendar day produces two points: the balance after the day's
//! outflows and the balance after the day's inflows. Outflows lower a
//! regular account and raise a debt, inflows always add.

use chrono::NaiveDate;
use log::debug;
use serde::Serialize;

use crate::account::{Account, Vehicle};
use crate::amount::Amount;
use crate::chart::BarSeries;
use crate::stack::StackPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BalancePoint {
    pub date: NaiveDate,
    #[serde(with = "crate::amount::float")]
    pub value: Amount,
}

/// Balance line of one account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountSeries {
    pub account: Account,
    pub values: Vec<BalancePoint>,
    pub interest: Option<Amount>,
    pub vehicle: Vehicle,
}

impl AccountSeries {
    /// The balance at the end of every day, i.e. every second point.
    pub fn end_of_day(&self) -> impl Iterator<Item = &BalancePoint> {
        self.values.iter().skip(1).step_by(2)
    }

    pub fn last(&self) -> Option<&BalancePoint> {
        self.values.last()
    }
}

/// Daily amount moved by the series booked against `account`, or `None`
/// if no series is.
fn zip_together(account: &Account, series: &[BarSeries]) -> Option<Vec<Amount>> {
    series
        .iter()
        .filter(|s| s.transaction.raccount() == Some(account.name.as_str()))
        .map(|s| s.stack.iter().map(StackPoint::height).collect::<Vec<_>>())
        .reduce(|acc, heights| {
            acc.iter()
                .enumerate()
                .map(|(i, a)| *a + Amount::or_zero_ref(heights.get(i)))
                .collect()
        })
}

/// Walks the days from the starting balance. Days past the end of one of
/// the sequences count as zero.
fn two_stepped_balance(
    starting: Amount,
    income: &[Amount],
    expense: &[Amount],
    dates: &[NaiveDate],
    vehicle: Vehicle,
) -> Vec<BalancePoint> {
    let len = income.len().max(expense.len());
    let mut prev = starting.abs();

    dates
        .iter()
        .take(len)
        .enumerate()
        .flat_map(|(i, date)| {
            let out = Amount::or_zero_ref(expense.get(i)).abs();
            let first = match vehicle {
                Vehicle::Debt => prev + out,
                Vehicle::Other => prev - out,
            };
            let second = first + Amount::or_zero_ref(income.get(i)).abs();
            prev = second;

            [
                BalancePoint {
                    date: *date,
                    value: first,
                },
                BalancePoint {
                    date: *date,
                    value: second,
                },
            ]
        })
        .collect()
}

/// Projects the balance of every account touched by at least one income
/// or expense series. Accounts nothing is booked against are left out.
pub fn resolve_account_chart(
    accounts: &[Account],
    income: &[BarSeries],
    expense: &[BarSeries],
) -> Vec<AccountSeries> {
    let dates = income
        .first()
        .or(expense.first())
        .map(|s| s.stack.iter().map(|p| p.date).collect::<Vec<_>>())
        .unwrap_or_default();

    accounts
        .iter()
        .filter_map(|account| {
            let inflow = zip_together(account, income).unwrap_or_default();
            let outflow = zip_together(account, expense).unwrap_or_default();

            let values = two_stepped_balance(
                account.starting,
                &inflow,
                &outflow,
                &dates,
                account.vehicle,
            );

            if values.is_empty() {
                debug!("account {:?} has no transactions, skipped", account.name);
                return None;
            }

            Some(AccountSeries {
                account: account.clone(),
                values,
                interest: account.interest,
                vehicle: account.vehicle,
            })
        })
        .collect()
}
