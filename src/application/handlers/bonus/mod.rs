//! Bonus crediting and ledger read handlers.

mod credit_batch;
mod credit_trade_in_sale;
mod get_bonus_history;

pub use credit_batch::{CreditBatchCommand, CreditBatchHandler, CreditBatchResult};
pub use credit_trade_in_sale::{
    CreditTradeInSaleCommand, CreditTradeInSaleHandler, CreditTradeInSaleResult,
};
pub use get_bonus_history::{BonusHistoryPage, GetBonusHistoryHandler, GetBonusHistoryQuery};
