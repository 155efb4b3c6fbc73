//! Trade-in batches and their crediting lifecycle.

mod batch;

pub use batch::{BatchStatus, TradeInBatch};
