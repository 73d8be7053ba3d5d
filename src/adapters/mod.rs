//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - Jupiter: swap execution and valuation quotes
//! - PumpSwap: pool reserves, price and market cap
//! - Solana: RPC client, keypair wallet, wrapped SOL
//! - Settings: JSON settings document
//! - CLI: Command-line interface definitions

pub mod cli;
pub mod jupiter;
pub mod pump_swap;
pub mod settings;
pub mod solana;

pub use cli::CliApp;
pub use jupiter::{JupiterClient, JupiterExecutor};
pub use pump_swap::PumpSwapOracle;
pub use settings::JsonSettingsStore;
pub use solana::{SolanaClient, SolanaWallet, WalletManager};
