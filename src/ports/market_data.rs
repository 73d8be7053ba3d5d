use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::PoolTarget;

/// Market data error type
#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("Quote API error: {0}")]
    QuoteError(String),

    #[error("Pool account not found: {0}")]
    PoolNotFound(String),

    #[error("Data parsing error: {0}")]
    ParseError(String),
}

/// Point-in-time view of a pool, in native-asset units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Native asset per whole token
    pub price: f64,
    pub market_cap: f64,
}

/// Read-only pool oracle.
///
/// Samples may be stale by up to one polling interval and are not guaranteed
/// to be continuous with each other.
#[async_trait]
pub trait MarketOracle: Send + Sync {
    /// Current price and market cap of the pool's token side
    async fn snapshot(&self, target: &PoolTarget) -> Result<MarketSnapshot, MarketDataError>;

    /// Native-asset value (SOL) that `token_amount` raw token units would sell for now
    async fn position_value(
        &self,
        target: &PoolTarget,
        token_amount: u64,
    ) -> Result<f64, MarketDataError>;
}
