use chrono::NaiveDate;
use thiserror::Error;

/// Errors reported by the projection pipeline.
///
/// Soft failures (unknown formula references, days without data) are
/// absorbed where they happen and never show up here.
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("invalid date range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("date range of {days} days from {start} ends past the last supported date")]
    RangeOverflow { start: NaiveDate, days: u32 },

    #[error("account {account:?}: payback value refers to missing field {key:?}")]
    UnresolvedPayback { account: String, key: String },

    #[error("account {account:?}: payback field {key:?} is not a number ({value})")]
    InvalidPaybackValue {
        account: String,
        key: String,
        value: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed ledger: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while turning editor-shaped input into the typed
/// model. They surface through `serde` as custom deserialization
/// errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("operation {0:?} requires a nested `on` node")]
    MissingOperand(String),

    #[error("unknown operation {0:?}")]
    UnknownOperation(String),

    #[error("dynamic transaction {0:?} has no computedAmount")]
    MissingFormula(String),

    #[error("transaction {id:?}: unknown recurrence {rtype:?}")]
    UnknownRecurrence { id: String, rtype: String },

    #[error("transaction {id:?}: unknown ending {ending:?}")]
    UnknownEnding { id: String, ending: String },

    #[error("transaction {id:?}: recurrence {rtype:?} needs {what}")]
    IncompleteSchedule {
        id: String,
        rtype: String,
        what: &'static str,
    },

    #[error("transaction {id:?}: cycle {cycle} is out of range for {rtype:?}")]
    InvalidCycle { id: String, rtype: String, cycle: i64 },
}

pub type Result<T> = std::result::Result<T, ProjectionError>;
