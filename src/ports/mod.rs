//! Ports Layer - Trait definitions for external dependencies
//!
//! This module defines the interfaces (ports) that adapters must implement.
//! Following hexagonal architecture, these traits abstract:
//! - Pool market data (price, market cap, position value)
//! - Trade execution (swap submission)
//! - Wallet balances and wrapped-native preparation
//! - Settings persistence

pub mod execution;
pub mod market_data;
pub mod mocks;
pub mod settings;
pub mod wallet;

pub use execution::{ExecutionError, TradeExecutor};
pub use market_data::{MarketDataError, MarketOracle, MarketSnapshot};
pub use settings::{SettingsError, SettingsProvider};
pub use wallet::{WalletError, WalletPort};
