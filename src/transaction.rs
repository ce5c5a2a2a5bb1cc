use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::error::InputError;
use crate::formula::{self, OperationNode, Reference};
use crate::schedule::{RawSchedule, Schedule};

pub type TransactionId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
    Transfer,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
            TransactionKind::Transfer => "transfer",
        }
    }
}

/// How the value of a transaction is known. Exactly one representation
/// is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "valueType", rename_all = "lowercase")]
pub enum TransactionValue {
    Static {
        value: Amount,
    },
    Dynamic {
        #[serde(rename = "computedAmount")]
        computed_amount: OperationNode,
        #[serde(rename = "referencesArray")]
        references: Vec<Reference>,
    },
}

impl TransactionValue {
    /// The concrete signed value. Dynamic values are computed from their
    /// references, see [`formula::resolve`].
    pub fn resolve(&self) -> Amount {
        match self {
            TransactionValue::Static { value } => *value,
            TransactionValue::Dynamic {
                computed_amount,
                references,
            } => formula::resolve(computed_amount, references.as_slice()),
        }
    }
}

/// A declared transaction, one-off or recurring.
///
/// Read and written in the editor's flat shape: schedule and value
/// fields sit next to the id, see `RawTransaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTransaction", into = "RawTransaction")]
pub struct Transaction {
    pub id: TransactionId,
    pub kind: TransactionKind,
    pub category: String,
    pub description: String,
    /// Name of the account this transaction is booked against.
    pub raccount: Option<String>,
    pub schedule: Schedule,
    pub value: TransactionValue,
    /// Set on transactions synthesized from an account's payback.
    pub from_account: bool,
}

impl Transaction {
    /// A static one-off transaction, mostly useful to build fixtures.
    pub fn new(id: &str, kind: TransactionKind, value: Amount, schedule: Schedule) -> Transaction {
        Transaction {
            id: id.to_string(),
            kind,
            category: String::new(),
            description: String::new(),
            raccount: None,
            schedule,
            value: TransactionValue::Static { value },
            from_account: false,
        }
    }

    pub fn with_account(mut self, raccount: &str) -> Transaction {
        self.raccount = Some(raccount.to_string());
        self
    }

    pub fn with_category(mut self, category: &str) -> Transaction {
        self.category = category.to_string();
        self
    }

    /// Computes the value once and pairs it with the transaction.
    pub fn resolve(self) -> ResolvedTransaction {
        let amount = self.value.resolve();
        ResolvedTransaction {
            transaction: self,
            amount,
        }
    }
}

/// A transaction together with its concrete value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub amount: Amount,
}

impl ResolvedTransaction {
    pub fn id(&self) -> &TransactionId {
        &self.transaction.id
    }

    pub fn kind(&self) -> TransactionKind {
        self.transaction.kind
    }

    pub fn raccount(&self) -> Option<&str> {
        self.transaction.raccount.as_deref()
    }

    /// Which side of the chart this transaction is drawn on. Transfers
    /// go by the sign of their value: non-positive ones take money out.
    pub fn bucket(&self) -> Bucket {
        match self.kind() {
            TransactionKind::Income => Bucket::Income,
            TransactionKind::Expense => Bucket::Expense,
            TransactionKind::Transfer if self.amount.is_positive() => Bucket::Income,
            TransactionKind::Transfer => Bucket::Expense,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Income,
    Expense,
}

/// Transactions split by bucket, each side in input order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Split {
    pub income: Vec<ResolvedTransaction>,
    pub expense: Vec<ResolvedTransaction>,
}

/// Resolves the value of every transaction.
pub fn resolve_values(txs: &[Transaction]) -> Vec<ResolvedTransaction> {
    txs.iter().cloned().map(Transaction::resolve).collect()
}

pub fn transaction_splitter(txs: impl IntoIterator<Item = ResolvedTransaction>) -> Split {
    txs.into_iter().fold(Split::default(), |mut split, tx| {
        match tx.bucket() {
            Bucket::Income => split.income.push(tx),
            Bucket::Expense => split.expense.push(tx),
        }
        split
    })
}

/// Draw order of the stacked bands: by kind (case-insensitive), then by
/// ascending absolute value.
pub fn sort_transaction_order(a: &ResolvedTransaction, b: &ResolvedTransaction) -> Ordering {
    let ka = a.kind().as_str().to_uppercase();
    let kb = b.kind().as_str().to_uppercase();

    ka.cmp(&kb)
        .then_with(|| a.amount.abs().cmp(&b.amount.abs()))
}

/// Sorts in draw order. The sort is stable, equal transactions keep
/// their input order.
pub fn sort_transactions(txs: &mut [ResolvedTransaction]) {
    txs.sort_by(sort_transaction_order);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ValueType {
    #[default]
    Static,
    Dynamic,
}

/// Transaction as written by the editor.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransaction {
    id: String,
    #[serde(rename = "type")]
    kind: TransactionKind,
    #[serde(default)]
    category: String,
    #[serde(default)]
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    raccount: Option<String>,
    #[serde(default)]
    value_type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    computed_amount: Option<OperationNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    references_array: Option<Vec<Reference>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    from_account: bool,
    #[serde(flatten)]
    schedule: RawSchedule,
}

impl TryFrom<RawTransaction> for Transaction {
    type Error = InputError;

    fn try_from(raw: RawTransaction) -> Result<Self, Self::Error> {
        let value = match raw.value_type {
            ValueType::Static => TransactionValue::Static {
                value: Amount::or_zero(raw.value),
            },
            ValueType::Dynamic => TransactionValue::Dynamic {
                computed_amount: raw
                    .computed_amount
                    .ok_or_else(|| InputError::MissingFormula(raw.id.clone()))?,
                references: raw.references_array.unwrap_or_default(),
            },
        };

        let schedule = Schedule::from_raw(&raw.id, raw.schedule)?;

        Ok(Transaction {
            id: raw.id,
            kind: raw.kind,
            category: raw.category,
            description: raw.description,
            raccount: raw.raccount,
            schedule,
            value,
            from_account: raw.from_account,
        })
    }
}

impl From<Transaction> for RawTransaction {
    fn from(t: Transaction) -> Self {
        let (value_type, value, computed_amount, references_array) = match t.value {
            TransactionValue::Static { value } => (ValueType::Static, Some(value), None, None),
            TransactionValue::Dynamic {
                computed_amount,
                references,
            } => (
                ValueType::Dynamic,
                None,
                Some(computed_amount),
                Some(references),
            ),
        };

        RawTransaction {
            id: t.id,
            kind: t.kind,
            category: t.category,
            description: t.description,
            raccount: t.raccount,
            value_type,
            value,
            computed_amount,
            references_array,
            from_account: t.from_account,
            schedule: t.schedule.into(),
        }
    }
}
