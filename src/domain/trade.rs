use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::settings::PoolTarget;

/// Side of a swap against the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Spend the native asset, acquire the token
    Buy,
    /// Liquidate the token back into the native asset
    Sell,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => write!(f, "BUY"),
            Direction::Sell => write!(f, "SELL"),
        }
    }
}

/// One swap submission handed to a trade executor
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRequest {
    pub target: PoolTarget,
    pub direction: Direction,
    /// Base units of the input side: lamports for buys, raw token units for sells
    pub amount: u64,
    /// Slippage tolerance in percent
    pub slippage_pct: f64,
}

impl TradeRequest {
    pub fn buy(target: PoolTarget, lamports: u64, slippage_pct: f64) -> Self {
        Self {
            target,
            direction: Direction::Buy,
            amount: lamports,
            slippage_pct,
        }
    }

    pub fn sell(target: PoolTarget, token_amount: u64, slippage_pct: f64) -> Self {
        Self {
            target,
            direction: Direction::Sell,
            amount: token_amount,
            slippage_pct,
        }
    }

    /// Slippage converted to basis points, clamped to the range swap APIs accept
    pub fn slippage_bps(&self) -> u16 {
        (self.slippage_pct * 100.0).round().clamp(0.0, 10_000.0) as u16
    }
}

/// Outcome of a single executor call. Produced once per attempt and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeResult {
    pub success: bool,
    pub signature: Option<String>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub amount: u64,
    pub direction: Direction,
}

impl TradeResult {
    pub fn success(direction: Direction, amount: u64, signature: String) -> Self {
        Self {
            success: true,
            signature: Some(signature),
            error: None,
            timestamp: Utc::now(),
            amount,
            direction,
        }
    }

    pub fn failure(direction: Direction, amount: u64, error: impl Into<String>) -> Self {
        Self {
            success: false,
            signature: None,
            error: Some(error.into()),
            timestamp: Utc::now(),
            amount,
            direction,
        }
    }
}

impl fmt::Display for TradeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.signature, &self.error) {
            (Some(sig), _) if self.success => {
                write!(f, "{} {} ok ({})", self.direction, self.amount, sig)
            }
            (_, Some(err)) => write!(f, "{} {} failed: {}", self.direction, self.amount, err),
            _ => write!(f, "{} {} failed", self.direction, self.amount),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::pubkey::Pubkey;

    fn target() -> PoolTarget {
        PoolTarget {
            mint: Pubkey::new_unique(),
            pool: Pubkey::new_unique(),
            is_pump: true,
        }
    }

    #[test]
    fn test_slippage_bps_conversion() {
        let req = TradeRequest::buy(target(), 1_000_000_000, 1.5);
        assert_eq!(req.slippage_bps(), 150);

        let req = TradeRequest::sell(target(), 42, 100.0);
        assert_eq!(req.slippage_bps(), 10_000);
    }

    #[test]
    fn test_result_constructors() {
        let ok = TradeResult::success(Direction::Buy, 10, "sig".to_string());
        assert!(ok.success);
        assert_eq!(ok.signature.as_deref(), Some("sig"));
        assert!(ok.error.is_none());

        let failed = TradeResult::failure(Direction::Sell, 10, "slippage exceeded");
        assert!(!failed.success);
        assert!(failed.signature.is_none());
        assert_eq!(failed.direction, Direction::Sell);
        assert!(failed.to_string().contains("slippage exceeded"));
    }
}
