//! Jupiter Adapter
//!
//! Trade execution through the Jupiter aggregator, restricted to PumpSwap
//! routes. Also serves token-to-SOL quotes used for position valuation.

mod client;
mod executor;
mod quote;
mod swap;

pub use client::{JupiterClient, JupiterConfig};
pub use executor::JupiterExecutor;
pub use quote::{QuoteRequest, QuoteResponse, PUMPSWAP_DEX_LABEL};
pub use swap::{SwapRequest, SwapResponse};
