//! Session inputs: the persisted settings document and the validated
//! per-run trading configuration derived from it.

use serde::{Deserialize, Serialize};
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum InvalidSettings {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{field} is not a valid address: {value}")]
    InvalidAddress { field: &'static str, value: String },
    #[error("{field} is not a number: {value}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("amount must be at least one lamport, got {0}")]
    NonPositiveAmount(f64),
    #[error("slippage must be in (0, 100], got {0}")]
    SlippageOutOfRange(f64),
}

/// Settings document as persisted by the settings provider.
///
/// Every field may be null. `amount` and `slippage` are kept as strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingSettings {
    pub mint: Option<String>,
    pub pool_id: Option<String>,
    pub is_pump: Option<bool>,
    pub amount: Option<String>,
    pub slippage: Option<String>,
}

/// Pool/mint pair a session trades against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolTarget {
    pub mint: Pubkey,
    pub pool: Pubkey,
    /// Token launched through pump.fun (fixed supply and decimals)
    pub is_pump: bool,
}

/// Immutable configuration of one trading session
#[derive(Debug, Clone, PartialEq)]
pub struct TradingConfig {
    pub target: PoolTarget,
    /// Buy size in SOL
    pub buy_amount: f64,
    /// Slippage tolerance in percent
    pub slippage_pct: f64,
}

impl TradingConfig {
    pub fn buy_lamports(&self) -> u64 {
        (self.buy_amount * LAMPORTS_PER_SOL as f64).round() as u64
    }
}

fn parse_address(field: &'static str, value: Option<&str>) -> Result<Pubkey, InvalidSettings> {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(InvalidSettings::Missing(field))?;
    Pubkey::from_str(value).map_err(|_| InvalidSettings::InvalidAddress {
        field,
        value: value.to_string(),
    })
}

fn parse_number(field: &'static str, value: Option<&str>) -> Result<f64, InvalidSettings> {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(InvalidSettings::Missing(field))?;
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| InvalidSettings::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

impl TradingSettings {
    /// Validate the document into a session configuration
    pub fn to_config(&self) -> Result<TradingConfig, InvalidSettings> {
        let mint = parse_address("mint", self.mint.as_deref())?;
        let pool = parse_address("poolId", self.pool_id.as_deref())?;

        let buy_amount = parse_number("amount", self.amount.as_deref())?;
        if buy_amount <= 0.0 {
            return Err(InvalidSettings::NonPositiveAmount(buy_amount));
        }

        let slippage_pct = parse_number("slippage", self.slippage.as_deref())?;
        if slippage_pct <= 0.0 || slippage_pct > 100.0 {
            return Err(InvalidSettings::SlippageOutOfRange(slippage_pct));
        }

        let config = TradingConfig {
            target: PoolTarget {
                mint,
                pool,
                is_pump: self.is_pump.unwrap_or(false),
            },
            buy_amount,
            slippage_pct,
        };
        // Amounts that round to zero lamports cannot be traded
        if config.buy_lamports() == 0 {
            return Err(InvalidSettings::NonPositiveAmount(buy_amount));
        }
        Ok(config)
    }
}

/// Trading thresholds, loaded once per session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub lower_mc_interval: f64,
    pub higher_mc_interval: f64,
    pub lower_tp_interval: f64,
    pub higher_tp_interval: f64,
    /// Tolerated loss in percent of the buy amount
    pub stop_loss: f64,
    /// Maximum holding time
    pub sell_timer: Duration,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            lower_mc_interval: 10.0,
            higher_mc_interval: 20.0,
            lower_tp_interval: 5.0,
            higher_tp_interval: 15.0,
            stop_loss: 15.0,
            sell_timer: Duration::from_secs(300),
        }
    }
}
