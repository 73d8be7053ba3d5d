//! Trading Loop
//!
//! Outer market-cap monitor of a trading session. Polls the oracle, keeps the
//! market-cap band, buys on an upward breakout, and hands the position to the
//! hold monitor. Runs as one sequential task; the only shared state is the
//! published `TradingState`.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::RwLock;

use crate::domain::{
    BandPosition, InvalidSettings, MarketCapBand, ProfitLadder, Thresholds, TradeRequest,
    TradeResult, TradingConfig, TradingState,
};
use crate::ports::{MarketOracle, SettingsError, TradeExecutor, WalletError, WalletPort};
use super::hold_monitor::{HoldError, HoldMonitor, HoldOutcome};
use super::retry::{pause, RetryPolicy};

#[derive(Debug, Error)]
pub enum TradingError {
    #[error("Invalid trading settings: {0}")]
    InvalidSettings(#[from] InvalidSettings),
    #[error("Settings unavailable: {0}")]
    Settings(#[from] SettingsError),
    #[error("Insufficient balance: have {have} lamports, need {need}")]
    InsufficientBalance { have: u64, need: u64 },
    #[error("Wallet preparation failed: {0}")]
    WalletPreparation(String),
    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),
    #[error("A trading session is already running")]
    AlreadyRunning,
    #[error("A trade is already in flight")]
    TradeInFlight,
}

/// Cadence and safety limits of a session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopTiming {
    pub mc_check_interval: Duration,
    pub pnl_check_interval: Duration,
    /// Back-off after a failed oracle read
    pub error_cooldown: Duration,
    /// Pause between closing a position and resuming market-cap polling
    pub post_hold_delay: Duration,
    /// Waiting for the bought tokens to show up in the wallet
    pub settlement: RetryPolicy,
    /// Forced liquidation when the holding timer runs out
    pub timeout_sell: RetryPolicy,
    /// Polls without a buy before the token is abandoned
    pub max_mc_checks: u32,
    /// Market cap (SOL) under which the pool is treated as dead
    pub min_market_cap: f64,
    /// Profit level (percent) the take-profit ladder starts from
    pub tp_baseline: f64,
    /// Wrapped-native balance prepared before the first buy, as a multiple of the buy amount
    pub wrap_multiplier: f64,
}

impl Default for LoopTiming {
    fn default() -> Self {
        Self {
            mc_check_interval: Duration::from_millis(200),
            pnl_check_interval: Duration::from_millis(200),
            error_cooldown: Duration::from_secs(1),
            post_hold_delay: Duration::from_secs(1),
            settlement: RetryPolicy::new(50, Duration::from_secs(1)),
            timeout_sell: RetryPolicy::new(3, Duration::from_secs(1)),
            max_mc_checks: 10_000,
            min_market_cap: 65.0,
            tp_baseline: 1.3,
            wrap_multiplier: 2.0,
        }
    }
}

impl LoopTiming {
    /// Number of PnL checks that fit into the holding timer, rounded up
    pub fn pnl_check_budget(&self, sell_timer: Duration) -> u32 {
        let interval = self.pnl_check_interval.as_micros().max(1);
        let timer = sell_timer.as_micros();
        let budget = (timer + interval - 1) / interval;
        budget.clamp(1, u32::MAX as u128) as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AbandonReason {
    /// Poll ceiling reached without a buy signal
    CheckCeiling { checks: u32 },
    /// Market cap fell under the liquidity floor
    DeadPool { market_cap: f64 },
}

/// How a session ended. Either way the token is no longer being processed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionOutcome {
    Abandoned(AbandonReason),
    Stopped,
}

/// Everything a session needs, shared by the outer loop and the hold monitor
pub(crate) struct SessionContext {
    pub(crate) oracle: Arc<dyn MarketOracle>,
    pub(crate) executor: Arc<dyn TradeExecutor>,
    pub(crate) wallet: Arc<dyn WalletPort>,
    pub(crate) config: TradingConfig,
    pub(crate) thresholds: Thresholds,
    pub(crate) timing: LoopTiming,
    pub(crate) state: Arc<RwLock<TradingState>>,
}

impl SessionContext {
    pub(crate) async fn is_running(&self) -> bool {
        self.state.read().await.is_running
    }

    pub(crate) fn ladder(&self) -> ProfitLadder {
        ProfitLadder {
            baseline: self.timing.tp_baseline,
            lower_interval: self.thresholds.lower_tp_interval,
            higher_interval: self.thresholds.higher_tp_interval,
        }
    }

    /// Submit one trade through the exclusive trade slot and count it
    pub(crate) async fn submit(&self, request: TradeRequest) -> TradeResult {
        let (direction, amount) = (request.direction, request.amount);
        if !self.state.write().await.begin_trade() {
            tracing::warn!("{} skipped: another trade is in flight", direction);
            return TradeResult::failure(direction, amount, "trade already in flight");
        }

        let result = self.executor.execute_trade(request).await;
        self.state.write().await.finish_trade(&result);

        if result.success {
            tracing::info!("{}", result);
        } else {
            tracing::error!("{}", result);
        }
        result
    }
}

enum Phase {
    Polling,
    BuyPending { market_cap: f64 },
    /// `held` is the mint balance observed before the buy
    Holding { market_cap: f64, held: u64 },
    Finished(SessionOutcome),
}

#[derive(Default)]
struct PollCursor {
    band: Option<MarketCapBand>,
    checks: u32,
}

/// Market-cap polling buy loop for one pool
pub struct TradingLoop {
    ctx: SessionContext,
}

impl TradingLoop {
    pub fn new(
        oracle: Arc<dyn MarketOracle>,
        executor: Arc<dyn TradeExecutor>,
        wallet: Arc<dyn WalletPort>,
        config: TradingConfig,
        thresholds: Thresholds,
        timing: LoopTiming,
        state: Arc<RwLock<TradingState>>,
    ) -> Self {
        Self {
            ctx: SessionContext {
                oracle,
                executor,
                wallet,
                config,
                thresholds,
                timing,
                state,
            },
        }
    }

    /// Run the session until it is abandoned or stopped.
    ///
    /// Balance and wallet-preparation failures are returned before the loop
    /// starts; nothing inside the loop is fatal.
    pub async fn run(&self) -> Result<SessionOutcome, TradingError> {
        // Raised before preparation so a stop during the wrap is not overwritten
        self.ctx.state.write().await.is_running = true;
        if let Err(e) = self.prepare().await {
            self.ctx.state.write().await.is_running = false;
            return Err(e);
        }
        if !self.ctx.is_running().await {
            tracing::info!("Stop requested during wallet preparation, session not started");
            return Ok(SessionOutcome::Stopped);
        }

        tracing::info!(
            "Trading session started - mint: {}, pool: {}, buy: {} SOL, slippage: {}%",
            self.ctx.config.target.mint,
            self.ctx.config.target.pool,
            self.ctx.config.buy_amount,
            self.ctx.config.slippage_pct
        );

        let mut cursor = PollCursor::default();
        let mut phase = Phase::Polling;

        let outcome = loop {
            if let Phase::Finished(outcome) = phase {
                break outcome;
            }
            if !self.ctx.is_running().await {
                break SessionOutcome::Stopped;
            }
            phase = match phase {
                Phase::Polling => self.poll(&mut cursor).await,
                Phase::BuyPending { market_cap } => self.buy(&mut cursor, market_cap).await,
                Phase::Holding { market_cap, held } => {
                    self.hold(&mut cursor, market_cap, held).await
                }
                Phase::Finished(outcome) => Phase::Finished(outcome),
            };
        };

        {
            let mut state = self.ctx.state.write().await;
            state.is_running = false;
            state.is_processing = false;
        }

        match outcome {
            SessionOutcome::Abandoned(reason) => {
                tracing::warn!("Trading session abandoned: {:?}", reason)
            }
            SessionOutcome::Stopped => tracing::info!("Trading session stopped"),
        }
        Ok(outcome)
    }

    /// Verify the balance covers a buy and prepare wrapped-native liquidity
    async fn prepare(&self) -> Result<(), TradingError> {
        let need = self.ctx.config.buy_lamports();
        let have = self.ctx.wallet.native_balance().await?;
        if have < need {
            return Err(TradingError::InsufficientBalance { have, need });
        }

        let wrap_target = (need as f64 * self.ctx.timing.wrap_multiplier).round() as u64;
        self.ctx
            .wallet
            .ensure_wrapped(wrap_target)
            .await
            .map_err(|e| TradingError::WalletPreparation(e.to_string()))?;

        tracing::info!("Wallet prepared with {} wrapped lamports", wrap_target);
        Ok(())
    }

    async fn publish(&self, band: Option<MarketCapBand>, market_cap: f64) {
        let mut state = self.ctx.state.write().await;
        state.band = band;
        state.last_market_cap = Some(market_cap);
    }

    fn band_around(&self, market_cap: f64) -> MarketCapBand {
        MarketCapBand::around(
            market_cap,
            self.ctx.thresholds.lower_mc_interval,
            self.ctx.thresholds.higher_mc_interval,
        )
    }

    async fn poll(&self, cursor: &mut PollCursor) -> Phase {
        let timing = self.ctx.timing;
        if cursor.checks > timing.max_mc_checks {
            return Phase::Finished(SessionOutcome::Abandoned(AbandonReason::CheckCeiling {
                checks: cursor.checks,
            }));
        }
        cursor.checks += 1;

        let snapshot = match self.ctx.oracle.snapshot(&self.ctx.config.target).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Market cap read failed: {} - retrying in {:?}", e, timing.error_cooldown);
                pause(timing.error_cooldown).await;
                return Phase::Polling;
            }
        };

        let market_cap = snapshot.market_cap;
        if market_cap < timing.min_market_cap {
            self.publish(cursor.band, market_cap).await;
            return Phase::Finished(SessionOutcome::Abandoned(AbandonReason::DeadPool { market_cap }));
        }

        let next = match cursor.band {
            None => {
                let band = self.band_around(market_cap);
                tracing::info!(
                    "Monitoring market cap from {:.4} SOL (band {:.4} - {:.4})",
                    market_cap, band.lower, band.higher
                );
                cursor.band = Some(band);
                Phase::Polling
            }
            Some(band) => {
                tracing::debug!(
                    "MC: {:.4} SOL, LMC: {:.4} SOL, HMC: {:.4} SOL",
                    market_cap, band.lower, band.higher
                );
                match band.classify(market_cap) {
                    BandPosition::Below => {
                        let lowered = self.band_around(market_cap);
                        tracing::info!(
                            "Market cap fell under {:.4} SOL, band lowered to {:.4} - {:.4}",
                            band.lower, lowered.lower, lowered.higher
                        );
                        cursor.band = Some(lowered);
                        Phase::Polling
                    }
                    BandPosition::Inside => Phase::Polling,
                    BandPosition::Above => {
                        tracing::info!(
                            "Market cap broke above {:.4} SOL at {:.4} SOL - buying",
                            band.higher, market_cap
                        );
                        Phase::BuyPending { market_cap }
                    }
                }
            }
        };

        self.publish(cursor.band, market_cap).await;
        if matches!(next, Phase::Polling) {
            pause(timing.mc_check_interval).await;
        }
        next
    }

    async fn buy(&self, cursor: &mut PollCursor, market_cap: f64) -> Phase {
        let config = &self.ctx.config;
        // Tokens already in the wallet are not part of this position
        let held = match self.ctx.wallet.token_balance(&config.target.mint).await {
            Ok(held) => held,
            Err(e) => {
                tracing::warn!(
                    "Token balance read failed before buy: {} - retrying in {:?}",
                    e,
                    self.ctx.timing.error_cooldown
                );
                pause(self.ctx.timing.error_cooldown).await;
                return Phase::Polling;
            }
        };

        let request = TradeRequest::buy(config.target, config.buy_lamports(), config.slippage_pct);
        let result = self.ctx.submit(request).await;

        if !result.success {
            // Band stays where it was so the breakout is re-evaluated on the next poll
            pause(self.ctx.timing.mc_check_interval).await;
            return Phase::Polling;
        }

        let raised = self.band_around(market_cap);
        cursor.band = Some(raised);
        cursor.checks = 0;
        self.publish(cursor.band, market_cap).await;
        Phase::Holding { market_cap, held }
    }

    async fn hold(&self, cursor: &mut PollCursor, market_cap: f64, held: u64) -> Phase {
        let monitor = HoldMonitor::new(&self.ctx, held);

        match monitor.run().await {
            Ok(HoldOutcome::Closed { reason, pnl_pct }) => {
                tracing::info!(
                    "Position closed ({:?}) at {:.2}% PnL, resuming market cap monitoring",
                    reason, pnl_pct
                );
            }
            Ok(HoldOutcome::ExitFailed { reason }) => {
                tracing::error!(
                    "Position could not be closed after {:?}, resuming market cap monitoring",
                    reason
                );
            }
            Ok(HoldOutcome::Interrupted) => return Phase::Polling,
            Err(HoldError::SettlementTimeout { attempts }) => {
                tracing::error!(
                    "Bought tokens not visible after {} attempts (bought at {:.4} SOL market cap)",
                    attempts, market_cap
                );
                return Phase::Polling;
            }
        }

        pause(self.ctx.timing.post_hold_delay).await;
        // Next poll rebuilds the band from the latest market cap
        cursor.band = None;
        cursor.checks = 0;
        Phase::Polling
    }
}
