//! Domain Layer - Core trading rules for the PumpSwap trader
//!
//! Pure types and decision logic with no I/O. All external interactions
//! happen through the ports layer.
//!
//! - `market_cap_band`: market-cap tolerance band (buy signal, downward ratchet)
//! - `profit_band`: take-profit ladder and stop-loss evaluation
//! - `settings`: session inputs and their validation
//! - `trade`: trade requests and results
//! - `trading_state`: per-session counters and flags

pub mod market_cap_band;
pub mod profit_band;
pub mod settings;
pub mod trade;
pub mod trading_state;

pub use market_cap_band::{BandPosition, MarketCapBand};
pub use profit_band::{PnlCheck, PnlDecision, PositionTracker, ProfitBand, ProfitLadder};
pub use settings::{InvalidSettings, PoolTarget, Thresholds, TradingConfig, TradingSettings};
pub use trade::{Direction, TradeRequest, TradeResult};
pub use trading_state::TradingState;
