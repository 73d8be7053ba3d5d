//! PumpSwap Trader - market-cap band trading agent library
//!
//! Watches a single PumpSwap pool, buys when the market cap breaks out above
//! its tolerance band and exits through a trailing take-profit ladder, a
//! stop-loss floor or the holding timer.
//!
//! # Modules
//!
//! - `domain`: Core rules (MarketCapBand, PositionTracker, TradingState, settings)
//! - `ports`: Trait abstractions (MarketOracle, TradeExecutor, WalletPort, SettingsProvider)
//! - `adapters`: External implementations (PumpSwap, Jupiter, Solana, JSON settings, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Trading loop, hold monitor and controller

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod config;
pub mod application;
