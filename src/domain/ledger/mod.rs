//! Bonus ledger: immutable transactions and the pure bonus calculator.

mod calculator;
mod transaction;

pub use calculator::{calculate, BonusOutcome, BonusResult, TradeInSaleEvent};
pub use transaction::{
    BonusTransaction, CalculationSnapshot, Creator, IdempotencyKey, TransactionType,
};
