use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::error::{InputError, ProjectionError, Result};
use crate::schedule::{RawSchedule, Schedule};
use crate::transaction::{Transaction, TransactionKind, TransactionValue};

/// The kind of an account. Only debts get special treatment: their
/// balance grows with expenses instead of shrinking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vehicle {
    Debt,
    #[default]
    #[serde(other)]
    Other,
}

/// An account whose balance is projected over time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub name: String,
    #[serde(default)]
    pub vehicle: Vehicle,
    #[serde(default)]
    pub starting: Amount,
    #[serde(default)]
    pub interest: Option<Amount>,
    #[serde(default)]
    pub payback: Option<Payback>,
}

impl Account {
    pub fn new(name: &str, vehicle: Vehicle, starting: Amount) -> Account {
        Account {
            name: name.to_string(),
            vehicle,
            starting,
            interest: None,
            payback: None,
        }
    }

    pub fn is_debt(&self) -> bool {
        self.vehicle == Vehicle::Debt
    }
}

/// The repayment plan of a debt account.
///
/// Besides the entries, a payback block may hold arbitrary sibling
/// fields (e.g. `"minimum": 35`) that entries refer to by name instead
/// of carrying a literal amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payback {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub transactions: Vec<PaybackEntry>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

/// The amount of a payback entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PaybackValue {
    /// Name of a sibling field of the payback block.
    Indirect(String),
    /// Written back as a JSON number, a string would read as `Indirect`.
    Literal(#[serde(serialize_with = "crate::amount::float::serialize")] Amount),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPaybackEntry", into = "RawPaybackEntry")]
pub struct PaybackEntry {
    pub id: String,
    pub value: PaybackValue,
    /// The account the payment comes out of.
    pub raccount: Option<String>,
    pub schedule: Schedule,
}

impl Payback {
    /// Resolves the amount of an entry, following indirections into the
    /// sibling fields. A missing or non-numeric field is an error, a
    /// payback never silently defaults to zero.
    pub fn amount_of(&self, account: &str, value: &PaybackValue) -> Result<Amount> {
        let key = match value {
            PaybackValue::Literal(a) => return Ok(*a),
            PaybackValue::Indirect(key) => key,
        };

        let field = self
            .fields
            .get(key)
            .ok_or_else(|| ProjectionError::UnresolvedPayback {
                account: account.to_string(),
                key: key.clone(),
            })?;

        serde_json::from_value::<Amount>(field.clone()).map_err(|_| {
            ProjectionError::InvalidPaybackValue {
                account: account.to_string(),
                key: key.clone(),
                value: field.to_string(),
            }
        })
    }

    /// Synthesizes the pair of transactions of the `index`-th entry:
    /// the expense booked on the debt account and the negative transfer
    /// out of the paying account.
    fn synthesize(
        &self,
        account: &Account,
        index: usize,
        entry: &PaybackEntry,
    ) -> Result<[Transaction; 2]> {
        let amount = self.amount_of(&account.name, &entry.value)?;

        let expense = Transaction {
            id: format!("{}-{index}EXP", entry.id),
            kind: TransactionKind::Expense,
            category: self.category.clone(),
            description: self.description.clone(),
            raccount: Some(account.name.clone()),
            schedule: entry.schedule,
            value: TransactionValue::Static { value: amount },
            from_account: true,
        };

        let transfer = Transaction {
            id: format!("{}-{index}TRSF", entry.id),
            kind: TransactionKind::Transfer,
            raccount: entry.raccount.clone(),
            value: TransactionValue::Static { value: -amount },
            ..expense.clone()
        };

        Ok([expense, transfer])
    }
}

/// Turns the payback plans of all debt accounts into transactions, two
/// per entry.
pub fn coerce_paybacks(accounts: &[Account]) -> Result<Vec<Transaction>> {
    let pairs = accounts
        .iter()
        .filter(|a| a.is_debt())
        .filter_map(|a| a.payback.as_ref().map(|p| (a, p)))
        .flat_map(|(a, p)| {
            p.transactions
                .iter()
                .enumerate()
                .map(move |(i, e)| p.synthesize(a, i, e))
        })
        .collect::<Result<Vec<_>>>()?;

    debug!("{} payback transactions synthesized", pairs.len() * 2);

    Ok(pairs.into_iter().flatten().collect())
}

#[derive(Serialize, Deserialize)]
struct RawPaybackEntry {
    id: String,
    value: PaybackValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    raccount: Option<String>,
    #[serde(flatten)]
    schedule: RawSchedule,
}

impl TryFrom<RawPaybackEntry> for PaybackEntry {
    type Error = InputError;

    fn try_from(raw: RawPaybackEntry) -> std::result::Result<Self, Self::Error> {
        let schedule = Schedule::from_raw(&raw.id, raw.schedule)?;
        Ok(PaybackEntry {
            id: raw.id,
            value: raw.value,
            raccount: raw.raccount,
            schedule,
        })
    }
}

impl From<PaybackEntry> for RawPaybackEntry {
    fn from(entry: PaybackEntry) -> Self {
        RawPaybackEntry {
            id: entry.id,
            value: entry.value,
            raccount: entry.raccount,
            schedule: entry.schedule.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    use crate::schedule::{Ending, Recurrence};
    use crate::{amount, date};

    fn card(value: serde_json::Value) -> Account {
        serde_json::from_value(serde_json::json!({
            "name": "card",
            "vehicle": "debt",
            "starting": 1500,
            "interest": 19.99,
            "payback": {
                "description": "card payment",
                "category": "debt",
                "minimum": 35,
                "broken": "n/a",
                "transactions": [{
                    "id": "pay",
                    "raccount": "checking",
                    "start": "2025-01-15",
                    "rtype": "day of month",
                    "cycle": 15,
                    "value": value
                }]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_payback_pair() {
        let txs = coerce_paybacks(&[card(serde_json::json!(200))]).unwrap();
        assert_eq!(txs.len(), 2);

        let (exp, trsf) = (&txs[0], &txs[1]);
        assert_eq!(exp.id, "pay-0EXP");
        assert_eq!(trsf.id, "pay-0TRSF");
        assert_eq!(exp.kind, TransactionKind::Expense);
        assert_eq!(trsf.kind, TransactionKind::Transfer);
        assert_eq!(exp.value.resolve(), amount!(200));
        assert_eq!(trsf.value.resolve(), amount!(-200));
        assert_eq!(exp.raccount.as_deref(), Some("card"));
        assert_eq!(trsf.raccount.as_deref(), Some("checking"));
        assert_eq!(exp.description, "card payment");
        assert_eq!(trsf.category, "debt");
        assert!(exp.from_account && trsf.from_account);
        assert_eq!(
            exp.schedule,
            Schedule::recurring(
                date!(2025, 1, 15),
                Recurrence::DayOfMonth(15),
                Ending::Never
            )
        );
    }

    #[test]
    fn test_payback_indirect_value() {
        let txs = coerce_paybacks(&[card(serde_json::json!("minimum"))]).unwrap();
        assert_eq!(txs[0].value.resolve(), amount!(35));
        assert_eq!(txs[1].value.resolve(), amount!(-35));
    }

    #[test]
    fn test_payback_unresolved_is_an_error() {
        let res = coerce_paybacks(&[card(serde_json::json!("statement"))]);
        assert!(matches!(
            res,
            Err(ProjectionError::UnresolvedPayback { ref key, .. }) if key == "statement"
        ));

        let res = coerce_paybacks(&[card(serde_json::json!("broken"))]);
        assert!(matches!(
            res,
            Err(ProjectionError::InvalidPaybackValue { .. })
        ));
    }

    #[test]
    fn test_only_debt_accounts_pay_back() {
        let mut acc = card(serde_json::json!(200));
        acc.vehicle = Vehicle::Other;
        assert_eq!(coerce_paybacks(&[acc]).unwrap(), vec![]);

        let plain = Account::new("checking", Vehicle::Debt, amount!(10));
        assert_eq!(coerce_paybacks(&[plain]).unwrap(), vec![]);
    }

    #[test]
    fn test_entry_index_in_ids() {
        let mut acc = card(serde_json::json!(200));
        let payback = acc.payback.as_mut().unwrap();
        let mut second = payback.transactions[0].clone();
        second.value = PaybackValue::Literal(amount!(50));
        payback.transactions.push(second);

        let ids = coerce_paybacks(&[acc])
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["pay-0EXP", "pay-0TRSF", "pay-1EXP", "pay-1TRSF"]);
    }

    #[test]
    fn test_account_reads_back() {
        for value in [serde_json::json!(200), serde_json::json!("minimum")] {
            let acc = card(value);
            let json = serde_json::to_value(&acc).unwrap();

            let entry = &json["payback"]["transactions"][0];
            assert_eq!(entry["rtype"], "day of month");
            assert_eq!(entry.get("schedule"), None);

            let back: Account = serde_json::from_value(json).unwrap();
            assert_eq!(back, acc);
        }
    }

    #[test]
    fn test_unknown_vehicle_is_other() {
        let acc: Account = serde_json::from_value(serde_json::json!({
            "name": "savings",
            "vehicle": "investment",
            "starting": "2500.10"
        }))
        .unwrap();
        assert_eq!(acc.vehicle, Vehicle::Other);
        assert_eq!(acc.starting, amount!(2500.10));
        assert_eq!(acc.payback, None);
    }
}
