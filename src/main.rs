//! PumpSwap Trader - market-cap band trading agent for PumpSwap pools

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

use pumpswap_trader::adapters::cli::{
    CliApp, Command, ConfigArg, SellAllCmd, SettingsCmd, SettingsSetCmd, WrapCmd,
};
use pumpswap_trader::adapters::jupiter::{JupiterClient, JupiterConfig, JupiterExecutor};
use pumpswap_trader::adapters::pump_swap::PumpSwapOracle;
use pumpswap_trader::adapters::settings::JsonSettingsStore;
use pumpswap_trader::adapters::solana::{SolanaClient, SolanaWallet, WalletManager};
use pumpswap_trader::application::{LoopTiming, SessionOutcome, TradingController};
use pumpswap_trader::config::{load_config, Config};
use pumpswap_trader::domain::Thresholds;
use pumpswap_trader::ports::{SettingsProvider, WalletPort};

#[tokio::main]
async fn main() -> Result<()> {
    // Secrets (PRIVATE_KEY, JUPITER_API_KEY) live in .env, not in the TOML file
    dotenvy::dotenv().ok();

    let app = CliApp::parse();
    let config_path = match &app.command {
        Command::Run(arg) | Command::Status(arg) | Command::Unwrap(arg) => arg.config.clone(),
        Command::Settings {
            action: SettingsCmd::Show(arg),
        } => arg.config.clone(),
        Command::Settings {
            action: SettingsCmd::Set(cmd),
        } => cmd.config.path(),
        Command::SellAll(cmd) => cmd.config.config.clone(),
        Command::Wrap(cmd) => cmd.config.config.clone(),
    };

    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;
    init_logging(app.verbose, app.debug, &config.logging.level)?;

    match app.command {
        Command::Run(_) => run_command(&config).await,
        Command::Status(_) => status_command(&config).await,
        Command::Settings {
            action: SettingsCmd::Show(_),
        } => settings_show_command(&config),
        Command::Settings {
            action: SettingsCmd::Set(cmd),
        } => settings_set_command(&config, &cmd),
        Command::SellAll(cmd) => sell_all_command(&config, &cmd).await,
        Command::Wrap(cmd) => wrap_command(&config, &cmd).await,
        Command::Unwrap(ConfigArg { .. }) => unwrap_command(&config).await,
    }
}

/// `--debug` and `--verbose` win over RUST_LOG, which wins over the config level
fn init_logging(verbose: bool, debug: bool, level: &str) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialise logging: {}", e))
}

/// Everything that touches the chain, built once per command
struct Services {
    wallet: Arc<SolanaWallet>,
    controller: TradingController,
}

fn build_services(config: &Config) -> Result<Services> {
    let commitment = SolanaClient::parse_commitment(&config.solana.commitment)
        .context("Invalid [solana] commitment")?;
    let rpc = SolanaClient::with_commitment(config.solana.rpc_url.clone(), commitment);

    let signer = load_signer(config)?;
    tracing::info!("Wallet: {}", signer.public_key());

    let jupiter = JupiterClient::with_config(JupiterConfig::from(&config.jupiter))
        .context("Failed to create Jupiter client")?;

    let wallet = Arc::new(SolanaWallet::new(
        rpc.clone(),
        signer.clone(),
        (&config.wrap).into(),
    ));
    let executor = Arc::new(
        JupiterExecutor::new(jupiter.clone(), rpc.clone(), signer)
            .with_priority_fee(config.jupiter.priority_fee_lamports),
    );
    let oracle = Arc::new(PumpSwapOracle::new(rpc, jupiter));
    let settings = Arc::new(JsonSettingsStore::new(&config.settings.path));

    let controller = TradingController::new(
        oracle,
        executor,
        wallet.clone(),
        settings,
        Thresholds::from(&config.thresholds),
        LoopTiming::from(&config.timing),
    );

    Ok(Services { wallet, controller })
}

/// PRIVATE_KEY (base58) takes precedence over the keypair file
fn load_signer(config: &Config) -> Result<WalletManager> {
    if let Some(secret) = std::env::var("PRIVATE_KEY").ok().filter(|s| !s.trim().is_empty()) {
        return WalletManager::from_base58(&secret)
            .context("PRIVATE_KEY is set but is not a valid base58 secret key");
    }

    let path = config.solana.expanded_keypair_path();
    load_wallet_with_context(&path)
}

/// Load wallet with helpful error messages
fn load_wallet_with_context(path: &Path) -> Result<WalletManager> {
    if !path.exists() {
        bail!(
            "Wallet file not found: {}\n\n\
             Set PRIVATE_KEY in .env, or create a wallet with:\n  \
             solana-keygen new --outfile {}\n\n\
             and point 'keypair_path' in your config at it",
            path.display(),
            path.display()
        );
    }

    WalletManager::from_file(path).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load wallet from '{}': {}\n\n\
             Expected format: JSON array of bytes (e.g., [1,2,3,...])",
            path.display(),
            e
        )
    })
}

async fn run_command(config: &Config) -> Result<()> {
    tracing::info!("Starting PumpSwap trader...");
    let services = build_services(config)?;
    let controller = services.controller;

    // Setup Ctrl+C handler
    let ctrl = controller.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutdown signal received");
        ctrl.stop().await;
    });

    let reporter = (config.logging.status_interval_secs > 0).then(|| {
        let ctrl = controller.clone();
        let every = Duration::from_secs(config.logging.status_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let status = ctrl.status().await;
                if status.is_running {
                    tracing::info!(
                        "Status: trades {} ({} ok, {} failed, {:.1}% success), last MC {}",
                        status.total_trades,
                        status.successful_trades,
                        status.failed_trades,
                        status.success_rate(),
                        status
                            .last_market_cap
                            .map_or_else(|| "-".to_string(), |mc| format!("{:.2} SOL", mc))
                    );
                }
            }
        })
    });

    let outcome = controller.start().await;
    if let Some(reporter) = reporter {
        reporter.abort();
    }

    let status = controller.status().await;
    tracing::info!(
        "Session totals: {} trades, {} successful, {} failed",
        status.total_trades,
        status.successful_trades,
        status.failed_trades
    );

    match outcome.context("Trading session failed")? {
        SessionOutcome::Stopped => tracing::info!("PumpSwap trader stopped"),
        SessionOutcome::Abandoned(reason) => {
            tracing::warn!("Token abandoned: {:?}", reason)
        }
    }
    Ok(())
}

async fn status_command(config: &Config) -> Result<()> {
    let services = build_services(config)?;
    let wallet = services.wallet;

    let balance = wallet
        .native_balance()
        .await
        .context("Failed to get balance")?;
    let wrapped = wallet
        .token_balance(&spl_token::native_mint::id())
        .await
        .context("Failed to get wrapped SOL balance")?;

    println!("Wallet: {}", wallet.pubkey());
    println!("Balance: {} lamports ({:.4} SOL)", balance, balance as f64 / 1e9);
    println!("Wrapped: {} lamports ({:.4} SOL)", wrapped, wrapped as f64 / 1e9);

    let settings = JsonSettingsStore::new(&config.settings.path).load()?;
    match settings.to_config() {
        Ok(trading) => {
            let tokens = wallet
                .token_balance(&trading.target.mint)
                .await
                .context("Failed to get token balance")?;
            println!("Token: {} (pool {})", trading.target.mint, trading.target.pool);
            println!("Token balance: {}", tokens);
            println!(
                "Buy: {} SOL, slippage {}%",
                trading.buy_amount, trading.slippage_pct
            );
        }
        Err(e) => println!("Settings incomplete: {}", e),
    }

    let state = services.controller.status().await;
    println!(
        "Session: running={}, processing={}, trades={}",
        state.is_running, state.is_processing, state.total_trades
    );
    Ok(())
}

fn settings_show_command(config: &Config) -> Result<()> {
    let store = JsonSettingsStore::new(&config.settings.path);
    let settings = store.load()?;

    println!("Settings file: {}", store.path().display());
    println!("{}", serde_json::to_string_pretty(&settings)?);
    if let Err(e) = settings.to_config() {
        println!("\nNot ready to trade: {}", e);
    }
    Ok(())
}

fn settings_set_command(config: &Config, cmd: &SettingsSetCmd) -> Result<()> {
    if cmd.is_empty() {
        bail!("Nothing to set: pass at least one of --mint, --pool, --pump, --amount, --slippage");
    }

    let store = JsonSettingsStore::new(&config.settings.path);
    let mut settings = store.load()?;
    cmd.apply(&mut settings);
    store.save(&settings)?;

    match settings.to_config() {
        Ok(_) => println!("Settings saved and ready to trade"),
        Err(e) => println!("Settings saved, not ready to trade yet: {}", e),
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

async fn sell_all_command(config: &Config, cmd: &SellAllCmd) -> Result<()> {
    let services = build_services(config)?;

    if !cmd.yes && !confirm("Sell the whole balance of the configured token?")? {
        println!("Aborted");
        return Ok(());
    }

    match services.controller.sell_all().await? {
        None => println!("Nothing to sell"),
        Some(result) if result.success => println!("{}", result),
        Some(result) => bail!("{}", result),
    }
    Ok(())
}

async fn wrap_command(config: &Config, cmd: &WrapCmd) -> Result<()> {
    if !cmd.amount.is_finite() || cmd.amount <= 0.0 {
        bail!("Wrap amount must be a positive number of SOL");
    }

    let services = build_services(config)?;
    let lamports = (cmd.amount * 1e9).round() as u64;
    services
        .wallet
        .ensure_wrapped(lamports)
        .await
        .context("Failed to wrap SOL")?;
    println!("Wrapped SOL account holds at least {} SOL", cmd.amount);
    Ok(())
}

async fn unwrap_command(config: &Config) -> Result<()> {
    let services = build_services(config)?;
    services
        .wallet
        .unwrap_all()
        .await
        .context("Failed to unwrap SOL")?;
    println!("Wrapped SOL returned to the wallet");
    Ok(())
}
