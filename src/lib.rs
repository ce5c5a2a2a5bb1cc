pub mod account;
pub mod amount;
pub mod balance;
pub mod calendar;
pub mod chart;
pub mod error;
pub mod formula;
pub mod ledger;
pub mod macros;
pub mod misc;
pub mod modification;
pub mod printing;
pub mod schedule;
pub mod stack;
pub mod transaction;
