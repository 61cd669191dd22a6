//! Position sizing and exposure limits.

pub mod limiter;
pub mod sizing;

pub use limiter::{profit_loss, RiskManager};
pub use sizing::PositionSizer;

use crate::types::AccountSnapshot;

/// Live account balances for margin-aware sizing.
pub trait AccountSource: Send + Sync {
    /// Latest balances, or `None` when the account cannot be read.
    fn account(&self) -> Option<AccountSnapshot>;
}
