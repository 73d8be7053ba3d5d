use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::market_cap_band::MarketCapBand;
use super::trade::{Direction, TradeResult};

/// Run state of one trading session.
///
/// Mutated only from the session's own loop; everyone else reads clones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradingState {
    pub is_running: bool,
    /// A trade submission is in flight
    pub is_processing: bool,
    pub total_trades: u32,
    pub successful_trades: u32,
    pub failed_trades: u32,
    pub last_buy_time: Option<DateTime<Utc>>,
    pub last_sell_time: Option<DateTime<Utc>>,
    pub last_market_cap: Option<f64>,
    pub band: Option<MarketCapBand>,
}

impl TradingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the single trade slot. Returns false when a trade is already in flight.
    pub fn begin_trade(&mut self) -> bool {
        if self.is_processing {
            return false;
        }
        self.is_processing = true;
        true
    }

    /// Count a finished trade attempt and release the trade slot
    pub fn finish_trade(&mut self, result: &TradeResult) {
        self.is_processing = false;
        self.total_trades += 1;
        if result.success {
            self.successful_trades += 1;
            match result.direction {
                Direction::Buy => self.last_buy_time = Some(result.timestamp),
                Direction::Sell => self.last_sell_time = Some(result.timestamp),
            }
        } else {
            self.failed_trades += 1;
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_trades == 0 {
            return 0.0;
        }
        self.successful_trades as f64 / self.total_trades as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_idle() {
        let state = TradingState::new();
        assert!(!state.is_running);
        assert!(!state.is_processing);
        assert_eq!(state.total_trades, 0);
        assert!(state.last_buy_time.is_none());
        assert_eq!(state.success_rate(), 0.0);
    }

    #[test]
    fn test_trade_slot_is_exclusive() {
        let mut state = TradingState::new();
        assert!(state.begin_trade());
        assert!(!state.begin_trade());

        state.finish_trade(&TradeResult::failure(Direction::Buy, 1, "boom"));
        assert!(!state.is_processing);
        assert!(state.begin_trade());
    }

    #[test]
    fn test_counters_and_timestamps() {
        let mut state = TradingState::new();

        let buy = TradeResult::success(Direction::Buy, 1, "a".into());
        state.begin_trade();
        state.finish_trade(&buy);

        let failed_sell = TradeResult::failure(Direction::Sell, 1, "slippage");
        state.begin_trade();
        state.finish_trade(&failed_sell);

        let sell = TradeResult::success(Direction::Sell, 1, "b".into());
        state.begin_trade();
        state.finish_trade(&sell);

        assert_eq!(state.total_trades, 3);
        assert_eq!(state.successful_trades, 2);
        assert_eq!(state.failed_trades, 1);
        assert_eq!(state.last_buy_time, Some(buy.timestamp));
        assert_eq!(state.last_sell_time, Some(sell.timestamp));
    }
}
