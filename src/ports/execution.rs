use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{TradeRequest, TradeResult};

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("API request failed: {0}")]
    ApiError(String),
    #[error("Transaction signing failed: {0}")]
    SigningError(String),
    #[error("Transaction execution failed: {0}")]
    ExecutionError(String),
    #[error("Slippage tolerance exceeded")]
    SlippageExceeded,
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
}

/// Submits directional swaps against a pool.
///
/// Ordinary trade failures (slippage, liquidity, RPC, simulation) are reported
/// through `TradeResult::success == false`, never as a panic or error. The
/// executor does not retry internally; callers decide whether to resubmit.
#[async_trait]
pub trait TradeExecutor: Send + Sync {
    async fn execute_trade(&self, request: TradeRequest) -> TradeResult;
}
