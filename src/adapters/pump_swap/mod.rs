//! PumpSwap Adapter
//!
//! Market data for a single PumpSwap pool.

mod oracle;

pub use oracle::{price_from_reserves, PoolVaults, PumpSwapOracle, PUMP_TOKEN_DECIMALS, PUMP_TOKEN_SUPPLY};
