//! Configuration Loader
//!
//! Loads the process configuration from TOML, applies environment overrides
//! and validates it. Every section is optional and falls back to defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::adapters::jupiter::JupiterConfig;
use crate::adapters::solana::WrapConfig;
use crate::application::{LoopTiming, RetryPolicy};
use crate::domain::Thresholds;

/// Main configuration structure matching config/example.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub solana: SolanaSection,
    pub jupiter: JupiterSection,
    pub thresholds: ThresholdsSection,
    pub timing: TimingSection,
    pub wrap: WrapSection,
    pub logging: LoggingSection,
    pub settings: SettingsSection,
}

/// Solana RPC configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SolanaSection {
    pub rpc_url: String,
    /// Commitment level: "processed", "confirmed", "finalized"
    pub commitment: String,
    /// Wallet keypair path, used when PRIVATE_KEY is not set
    pub keypair_path: String,
}

impl Default for SolanaSection {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            commitment: "confirmed".to_string(),
            keypair_path: "~/.config/solana/id.json".to_string(),
        }
    }
}

impl SolanaSection {
    /// Keypair path with `~` and env vars expanded
    pub fn expanded_keypair_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.keypair_path).into_owned())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JupiterSection {
    pub api_url: String,
    /// Optional API key for higher rate limits
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
    /// Fixed priority fee for swaps; Jupiter picks one when unset
    pub priority_fee_lamports: Option<u64>,
}

impl Default for JupiterSection {
    fn default() -> Self {
        let defaults = JupiterConfig::default();
        Self {
            api_url: defaults.api_base_url,
            api_key: None,
            timeout_secs: defaults.timeout.as_secs(),
            max_retries: defaults.max_retries,
            priority_fee_lamports: None,
        }
    }
}

impl From<&JupiterSection> for JupiterConfig {
    fn from(section: &JupiterSection) -> Self {
        JupiterConfig {
            api_base_url: section.api_url.clone(),
            api_key: section.api_key.clone().filter(|k| !k.is_empty()),
            timeout: Duration::from_secs(section.timeout_secs),
            max_retries: section.max_retries,
        }
    }
}

/// Percentages, plus the holding timer in seconds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThresholdsSection {
    pub lower_mc_interval: f64,
    pub higher_mc_interval: f64,
    pub lower_tp_interval: f64,
    pub higher_tp_interval: f64,
    pub stop_loss: f64,
    pub sell_timer_secs: u64,
}

impl Default for ThresholdsSection {
    fn default() -> Self {
        let defaults = Thresholds::default();
        Self {
            lower_mc_interval: defaults.lower_mc_interval,
            higher_mc_interval: defaults.higher_mc_interval,
            lower_tp_interval: defaults.lower_tp_interval,
            higher_tp_interval: defaults.higher_tp_interval,
            stop_loss: defaults.stop_loss,
            sell_timer_secs: defaults.sell_timer.as_secs(),
        }
    }
}

impl From<&ThresholdsSection> for Thresholds {
    fn from(section: &ThresholdsSection) -> Self {
        Thresholds {
            lower_mc_interval: section.lower_mc_interval,
            higher_mc_interval: section.higher_mc_interval,
            lower_tp_interval: section.lower_tp_interval,
            higher_tp_interval: section.higher_tp_interval,
            stop_loss: section.stop_loss,
            sell_timer: Duration::from_secs(section.sell_timer_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingSection {
    pub mc_check_interval_ms: u64,
    pub pnl_check_interval_ms: u64,
    pub error_cooldown_ms: u64,
    pub post_hold_delay_ms: u64,
    pub settlement_max_attempts: u32,
    pub settlement_delay_ms: u64,
    pub timeout_sell_attempts: u32,
    pub timeout_sell_delay_ms: u64,
    pub max_mc_checks: u32,
    pub min_market_cap_sol: f64,
    pub tp_baseline_pct: f64,
    pub wrap_multiplier: f64,
}

impl Default for TimingSection {
    fn default() -> Self {
        let defaults = LoopTiming::default();
        Self {
            mc_check_interval_ms: defaults.mc_check_interval.as_millis() as u64,
            pnl_check_interval_ms: defaults.pnl_check_interval.as_millis() as u64,
            error_cooldown_ms: defaults.error_cooldown.as_millis() as u64,
            post_hold_delay_ms: defaults.post_hold_delay.as_millis() as u64,
            settlement_max_attempts: defaults.settlement.max_attempts,
            settlement_delay_ms: defaults.settlement.delay.as_millis() as u64,
            timeout_sell_attempts: defaults.timeout_sell.max_attempts,
            timeout_sell_delay_ms: defaults.timeout_sell.delay.as_millis() as u64,
            max_mc_checks: defaults.max_mc_checks,
            min_market_cap_sol: defaults.min_market_cap,
            tp_baseline_pct: defaults.tp_baseline,
            wrap_multiplier: defaults.wrap_multiplier,
        }
    }
}

impl From<&TimingSection> for LoopTiming {
    fn from(section: &TimingSection) -> Self {
        LoopTiming {
            mc_check_interval: Duration::from_millis(section.mc_check_interval_ms),
            pnl_check_interval: Duration::from_millis(section.pnl_check_interval_ms),
            error_cooldown: Duration::from_millis(section.error_cooldown_ms),
            post_hold_delay: Duration::from_millis(section.post_hold_delay_ms),
            settlement: RetryPolicy::new(
                section.settlement_max_attempts,
                Duration::from_millis(section.settlement_delay_ms),
            ),
            timeout_sell: RetryPolicy::new(
                section.timeout_sell_attempts,
                Duration::from_millis(section.timeout_sell_delay_ms),
            ),
            max_mc_checks: section.max_mc_checks,
            min_market_cap: section.min_market_cap_sol,
            tp_baseline: section.tp_baseline_pct,
            wrap_multiplier: section.wrap_multiplier,
        }
    }
}

/// Wrapped SOL transactions
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WrapSection {
    pub compute_unit_price: u64,
    pub compute_unit_limit: u32,
    pub max_attempts: usize,
    pub retry_delay_ms: u64,
}

impl Default for WrapSection {
    fn default() -> Self {
        let defaults = WrapConfig::default();
        Self {
            compute_unit_price: defaults.compute_unit_price,
            compute_unit_limit: defaults.compute_unit_limit,
            max_attempts: defaults.max_attempts,
            retry_delay_ms: defaults.retry_delay.as_millis() as u64,
        }
    }
}

impl From<&WrapSection> for WrapConfig {
    fn from(section: &WrapSection) -> Self {
        WrapConfig {
            compute_unit_price: section.compute_unit_price,
            compute_unit_limit: section.compute_unit_limit,
            max_attempts: section.max_attempts,
            retry_delay: Duration::from_millis(section.retry_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Seconds between status lines while a session runs, 0 disables them
    pub status_interval_secs: u64,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            status_interval_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SettingsSection {
    /// JSON settings document path
    pub path: String,
}

impl Default for SettingsSection {
    fn default() -> Self {
        Self {
            path: "settings.json".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid value for {name}: {value}")]
    InvalidOverride { name: &'static str, value: String },
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file, apply process env overrides and validate
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content)?;
    config.apply_overrides(|name| std::env::var(name).ok())?;
    config.validate()?;
    Ok(config)
}

fn parse_override<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidOverride { name, value })
}

impl Config {
    /// Apply overrides looked up by variable name. Blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("SOLANA_RPC_URL").or_else(|| get("RPC_ENDPOINT")) {
            self.solana.rpc_url = url;
        }
        if let Some(path) = get("SOLANA_KEYPAIR_PATH") {
            self.solana.keypair_path = path;
        }
        if self.jupiter.api_key.as_deref().map_or(true, str::is_empty) {
            self.jupiter.api_key = get("JUPITER_API_KEY");
        }

        let thresholds = &mut self.thresholds;
        for (name, field) in [
            ("LOWER_MC_INTERVAL", &mut thresholds.lower_mc_interval),
            ("HIGHER_MC_INTERVAL", &mut thresholds.higher_mc_interval),
            ("LOWER_TP_INTERVAL", &mut thresholds.lower_tp_interval),
            ("HIGHER_TP_INTERVAL", &mut thresholds.higher_tp_interval),
            ("STOP_LOSS", &mut thresholds.stop_loss),
        ] {
            if let Some(value) = get(name) {
                *field = parse_override(name, value)?;
            }
        }
        if let Some(value) = get("SELL_TIMER") {
            thresholds.sell_timer_secs = parse_override("SELL_TIMER", value)?;
        }

        Ok(())
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.solana.rpc_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "rpc_url cannot be empty".to_string(),
            ));
        }

        if self.jupiter.api_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "api_url cannot be empty".to_string(),
            ));
        }

        let t = &self.thresholds;
        if t.sell_timer_secs == 0 {
            return Err(ConfigError::ValidationError(
                "sell_timer_secs must be > 0".to_string(),
            ));
        }

        if t.stop_loss <= 0.0 || t.stop_loss > 100.0 {
            return Err(ConfigError::ValidationError(format!(
                "stop_loss must be 0-100, got {}",
                t.stop_loss
            )));
        }

        for (name, value) in [
            ("lower_mc_interval", t.lower_mc_interval),
            ("higher_mc_interval", t.higher_mc_interval),
            ("lower_tp_interval", t.lower_tp_interval),
            ("higher_tp_interval", t.higher_tp_interval),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be >= 0, got {}",
                    name, value
                )));
            }
        }

        let timing = &self.timing;
        if timing.mc_check_interval_ms == 0 || timing.pnl_check_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "check intervals must be > 0".to_string(),
            ));
        }

        if timing.settlement_max_attempts == 0 || timing.timeout_sell_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry attempts must be >= 1".to_string(),
            ));
        }

        if timing.wrap_multiplier < 1.0 {
            return Err(ConfigError::ValidationError(format!(
                "wrap_multiplier must be >= 1, got {}",
                timing.wrap_multiplier
            )));
        }

        Ok(())
    }
}
