//! CLI Commands
//!
//! Argument definitions for the trader binary. Handlers live in `main.rs`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::TradingSettings;

const DEFAULT_CONFIG: &str = "config/example.toml";

/// PumpSwap market-cap band trader
#[derive(Parser, Debug)]
#[command(
    name = "pumpswap-trader",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Market-cap band trading agent for PumpSwap pools",
    long_about = "Watches a PumpSwap pool's market cap, buys on an upward breakout of the \
                  tolerance band and exits through a trailing take-profit ladder, a stop-loss \
                  floor or the holding timer."
)]
pub struct CliApp {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the trading loop with the saved settings
    Run(ConfigArg),

    /// Show wallet balances and session counters
    Status(ConfigArg),

    /// Show or edit the trading settings
    Settings {
        #[command(subcommand)]
        action: SettingsCmd,
    },

    /// Sell the whole balance of the configured token
    SellAll(SellAllCmd),

    /// Wrap SOL into the wrapped SOL account
    Wrap(WrapCmd),

    /// Close the wrapped SOL account back into SOL
    Unwrap(ConfigArg),
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArg {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum SettingsCmd {
    /// Print the settings document
    Show(ConfigArg),
    /// Update fields of the settings document
    Set(SettingsSetCmd),
}

#[derive(Args, Debug, Clone, Default)]
pub struct SettingsSetCmd {
    #[command(flatten)]
    pub config: ConfigArgOpt,

    /// Token mint address
    #[arg(long)]
    pub mint: Option<String>,

    /// PumpSwap pool address
    #[arg(long)]
    pub pool: Option<String>,

    /// Token was launched on pump.fun
    #[arg(long)]
    pub pump: Option<bool>,

    /// Buy size in SOL
    #[arg(long)]
    pub amount: Option<String>,

    /// Slippage tolerance in percent
    #[arg(long)]
    pub slippage: Option<String>,
}

/// Config path for commands that also take field flags
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgOpt {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl ConfigArgOpt {
    pub fn path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG))
    }
}

impl SettingsSetCmd {
    /// Overwrite the given fields, leaving the others untouched
    pub fn apply(&self, settings: &mut TradingSettings) {
        if let Some(mint) = &self.mint {
            settings.mint = Some(mint.clone());
        }
        if let Some(pool) = &self.pool {
            settings.pool_id = Some(pool.clone());
        }
        if let Some(pump) = self.pump {
            settings.is_pump = Some(pump);
        }
        if let Some(amount) = &self.amount {
            settings.amount = Some(amount.clone());
        }
        if let Some(slippage) = &self.slippage {
            settings.slippage = Some(slippage.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mint.is_none()
            && self.pool.is_none()
            && self.pump.is_none()
            && self.amount.is_none()
            && self.slippage.is_none()
    }
}

#[derive(Args, Debug, Clone)]
pub struct SellAllCmd {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Sell without prompting
    #[arg(short = 'y', long)]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct WrapCmd {
    /// Amount of SOL the wrapped account should hold
    #[arg(value_name = "SOL")]
    pub amount: f64,

    #[command(flatten)]
    pub config: ConfigArg,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_default_config() {
        let app = CliApp::try_parse_from(["pumpswap-trader", "run"]).unwrap();
        match app.command {
            Command::Run(arg) => assert_eq!(arg.config, PathBuf::from(DEFAULT_CONFIG)),
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(!app.verbose);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let app =
            CliApp::try_parse_from(["pumpswap-trader", "status", "-c", "my.toml", "--debug"])
                .unwrap();
        assert!(app.debug);
        match app.command {
            Command::Status(arg) => assert_eq!(arg.config, PathBuf::from("my.toml")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_settings_set_parses_fields() {
        let app = CliApp::try_parse_from([
            "pumpswap-trader",
            "settings",
            "set",
            "--mint",
            "Mint111",
            "--pump",
            "true",
            "--amount",
            "0.25",
        ])
        .unwrap();

        let Command::Settings {
            action: SettingsCmd::Set(cmd),
        } = app.command
        else {
            panic!("expected settings set");
        };
        assert_eq!(cmd.mint.as_deref(), Some("Mint111"));
        assert_eq!(cmd.pump, Some(true));
        assert!(cmd.pool.is_none());
        assert_eq!(cmd.config.path(), PathBuf::from(DEFAULT_CONFIG));
    }

    #[test]
    fn test_apply_keeps_unset_fields() {
        let mut settings = TradingSettings {
            mint: Some("old-mint".to_string()),
            pool_id: Some("pool".to_string()),
            is_pump: Some(false),
            amount: Some("1".to_string()),
            slippage: Some("5".to_string()),
        };
        let cmd = SettingsSetCmd {
            mint: Some("new-mint".to_string()),
            slippage: Some("10".to_string()),
            ..SettingsSetCmd::default()
        };

        assert!(!cmd.is_empty());
        cmd.apply(&mut settings);
        assert_eq!(settings.mint.as_deref(), Some("new-mint"));
        assert_eq!(settings.pool_id.as_deref(), Some("pool"));
        assert_eq!(settings.amount.as_deref(), Some("1"));
        assert_eq!(settings.slippage.as_deref(), Some("10"));
    }

    #[test]
    fn test_sell_all_and_wrap() {
        let app = CliApp::try_parse_from(["pumpswap-trader", "sell-all", "-y"]).unwrap();
        assert!(matches!(app.command, Command::SellAll(SellAllCmd { yes: true, .. })));

        let app = CliApp::try_parse_from(["pumpswap-trader", "wrap", "0.5"]).unwrap();
        match app.command {
            Command::Wrap(cmd) => assert_eq!(cmd.amount, 0.5),
            other => panic!("unexpected command: {other:?}"),
        }

        assert!(CliApp::try_parse_from(["pumpswap-trader", "wrap"]).is_err());
    }
}
