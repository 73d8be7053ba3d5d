//! Hold Monitor
//!
//! Inner state machine of a session, entered after a confirmed buy:
//! wait for settlement, run time-boxed PnL checks, and liquidate on
//! stop-loss, take-profit, or timeout.

use std::convert::Infallible;

use thiserror::Error;

use crate::domain::{PnlDecision, PositionTracker, TradeRequest, TradeResult};
use super::retry::{pause, retry_until, RetryError};
use super::trading_loop::SessionContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HoldOutcome {
    /// Position liquidated
    Closed { reason: ExitReason, pnl_pct: f64 },
    /// Forced liquidation failed on every attempt; tokens remain in the wallet
    ExitFailed { reason: ExitReason },
    /// Stop requested while holding; position left open
    Interrupted,
}

#[derive(Debug, Error, PartialEq)]
pub enum HoldError {
    #[error("bought tokens not visible after {attempts} attempts")]
    SettlementTimeout { attempts: u32 },
}

/// Result of one settlement read
enum Settlement {
    Balance(u64),
    Stopped,
}

enum HoldPhase {
    Settling,
    Monitoring { tokens: u64 },
    SellPending { tokens: u64, reason: ExitReason },
    Done(HoldOutcome),
}

pub(crate) struct HoldMonitor<'a> {
    ctx: &'a SessionContext,
    /// Mint balance before the buy; only tokens above it belong to the position
    held: u64,
    tracker: PositionTracker,
    budget: u32,
    checks: u32,
    last_pnl: f64,
}

impl<'a> HoldMonitor<'a> {
    pub(crate) fn new(ctx: &'a SessionContext, held: u64) -> Self {
        Self {
            ctx,
            held,
            tracker: PositionTracker::new(
                ctx.config.buy_amount,
                ctx.thresholds.stop_loss,
                ctx.ladder(),
            ),
            budget: ctx.timing.pnl_check_budget(ctx.thresholds.sell_timer),
            checks: 0,
            last_pnl: 0.0,
        }
    }

    pub(crate) async fn run(mut self) -> Result<HoldOutcome, HoldError> {
        let mut phase = HoldPhase::Settling;
        loop {
            phase = match phase {
                HoldPhase::Done(outcome) => return Ok(outcome),
                HoldPhase::Settling => match self.settle().await? {
                    Some(tokens) => HoldPhase::Monitoring { tokens },
                    None => {
                        tracing::warn!("Stop requested while waiting for bought tokens to settle");
                        HoldPhase::Done(HoldOutcome::Interrupted)
                    }
                },
                HoldPhase::Monitoring { tokens } => self.check(tokens).await,
                HoldPhase::SellPending { tokens, reason } => self.sell(tokens, reason).await,
            };
        }
    }

    /// Wait until the wallet holds more than it did before the buy.
    ///
    /// Returns the bought amount, or `None` when a stop is requested first.
    async fn settle(&self) -> Result<Option<u64>, HoldError> {
        let ctx = self.ctx;
        let mint = ctx.config.target.mint;
        let held = self.held;

        let settled = retry_until(
            ctx.timing.settlement,
            || async move {
                if !ctx.is_running().await {
                    return Ok(Settlement::Stopped);
                }
                ctx.wallet.token_balance(&mint).await.map(Settlement::Balance)
            },
            |read| match read {
                Settlement::Balance(amount) => *amount > held,
                Settlement::Stopped => true,
            },
        )
        .await;

        match settled {
            Ok(Settlement::Balance(amount)) => {
                let tokens = amount - held;
                tracing::info!(
                    "Position settled with {} tokens ({} held before), monitoring PnL",
                    tokens,
                    held
                );
                Ok(Some(tokens))
            }
            Ok(Settlement::Stopped) => Ok(None),
            Err(e) => {
                if let RetryError::Failed { last_error, .. } = &e {
                    tracing::error!("Last token balance read failed: {}", last_error);
                }
                Err(HoldError::SettlementTimeout {
                    attempts: e.attempts(),
                })
            }
        }
    }

    async fn check(&mut self, tokens: u64) -> HoldPhase {
        if !self.ctx.is_running().await {
            tracing::warn!(
                "Stop requested while holding {} tokens of {} - position left open",
                tokens,
                self.ctx.config.target.mint
            );
            return HoldPhase::Done(HoldOutcome::Interrupted);
        }

        if self.checks >= self.budget {
            tracing::warn!("Holding timer expired after {} checks, selling", self.checks);
            return HoldPhase::SellPending {
                tokens,
                reason: ExitReason::Timeout,
            };
        }
        self.checks += 1;

        let next = match self
            .ctx
            .oracle
            .position_value(&self.ctx.config.target, tokens)
            .await
        {
            Ok(value) => {
                let check = self.tracker.evaluate(value);
                self.last_pnl = check.pnl_pct;
                let band = self.tracker.band();
                tracing::debug!(
                    "PnL {:.2}% (value {:.6} SOL, TP {:.2}% [{:.2}% - {:.2}%])",
                    check.pnl_pct, value, band.tp_level, band.lower_tp, band.higher_tp
                );
                if check.ratcheted {
                    tracing::info!(
                        "Price keeps rising, take profit raised to {:.2}%",
                        band.tp_level
                    );
                }
                match check.decision {
                    PnlDecision::StopLoss => {
                        tracing::warn!(
                            "Position value {:.6} SOL under stop loss {:.6} SOL, selling",
                            value,
                            self.tracker.stop_loss_floor()
                        );
                        HoldPhase::SellPending {
                            tokens,
                            reason: ExitReason::StopLoss,
                        }
                    }
                    PnlDecision::TakeProfit => {
                        tracing::info!(
                            "PnL pulled back under {:.2}% after reaching profit, selling",
                            band.lower_tp
                        );
                        HoldPhase::SellPending {
                            tokens,
                            reason: ExitReason::TakeProfit,
                        }
                    }
                    PnlDecision::Hold => HoldPhase::Monitoring { tokens },
                }
            }
            Err(e) => {
                tracing::debug!("Position value read failed: {}", e);
                HoldPhase::Monitoring { tokens }
            }
        };

        if matches!(next, HoldPhase::Monitoring { .. }) {
            pause(self.ctx.timing.pnl_check_interval).await;
        }
        next
    }

    async fn sell(&self, tokens: u64, reason: ExitReason) -> HoldPhase {
        let config = &self.ctx.config;
        let request = TradeRequest::sell(config.target, tokens, config.slippage_pct);

        if reason == ExitReason::Timeout {
            let forced = retry_until(
                self.ctx.timing.timeout_sell,
                || async { Ok::<TradeResult, Infallible>(self.ctx.submit(request.clone()).await) },
                |result| result.success,
            )
            .await;
            return match forced {
                Ok(_) => HoldPhase::Done(HoldOutcome::Closed {
                    reason,
                    pnl_pct: self.last_pnl,
                }),
                Err(e) => {
                    tracing::error!("Forced sell failed after {} attempts", e.attempts());
                    HoldPhase::Done(HoldOutcome::ExitFailed { reason })
                }
            };
        }

        let result = self.ctx.submit(request).await;
        if result.success {
            return HoldPhase::Done(HoldOutcome::Closed {
                reason,
                pnl_pct: self.last_pnl,
            });
        }

        tracing::error!("Failed to sell tokens on {:?}, continuing to hold", reason);
        pause(self.ctx.timing.pnl_check_interval).await;
        HoldPhase::Monitoring { tokens }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use solana_sdk::pubkey::Pubkey;
    use tokio::sync::RwLock;

    use super::*;
    use crate::application::retry::RetryPolicy;
    use crate::application::trading_loop::LoopTiming;
    use crate::domain::{Direction, PoolTarget, Thresholds, TradingConfig, TradingState};
    use crate::ports::mocks::{FakeWallet, RecordingExecutor, ScriptedOracle};

    fn context(
        oracle: Arc<ScriptedOracle>,
        executor: Arc<RecordingExecutor>,
        wallet: Arc<FakeWallet>,
        settlement: RetryPolicy,
    ) -> SessionContext {
        let mut state = TradingState::new();
        state.is_running = true;
        SessionContext {
            oracle,
            executor,
            wallet,
            config: TradingConfig {
                target: PoolTarget {
                    mint: Pubkey::new_unique(),
                    pool: Pubkey::new_unique(),
                    is_pump: true,
                },
                buy_amount: 1.0,
                slippage_pct: 5.0,
            },
            thresholds: Thresholds {
                sell_timer: Duration::from_secs(60),
                ..Thresholds::default()
            },
            timing: LoopTiming {
                pnl_check_interval: Duration::from_millis(1),
                settlement,
                timeout_sell: RetryPolicy::new(2, Duration::ZERO),
                ..LoopTiming::default()
            },
            state: Arc::new(RwLock::new(state)),
        }
    }

    fn quick_settlement() -> RetryPolicy {
        RetryPolicy::new(3, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_position_excludes_tokens_held_before_buy() {
        // 1000 left over from an earlier position, the buy adds 1000
        let oracle = Arc::new(ScriptedOracle::new().with_values([0.5]));
        let executor = Arc::new(RecordingExecutor::new());
        let wallet = Arc::new(FakeWallet::new(0).with_token_balances([1_000, 2_000]));
        let ctx = context(oracle.clone(), executor.clone(), wallet, quick_settlement());

        let outcome = HoldMonitor::new(&ctx, 1_000).run().await.unwrap();

        assert!(matches!(
            outcome,
            HoldOutcome::Closed { reason: ExitReason::StopLoss, .. }
        ));
        assert_eq!(oracle.valued_amounts(), vec![1_000]);
        let requests = executor.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].direction, Direction::Sell);
        assert_eq!(requests[0].amount, 1_000);
    }

    #[tokio::test]
    async fn test_settlement_timeout_reports_attempts() {
        let oracle = Arc::new(ScriptedOracle::new().with_values([1.0]));
        let executor = Arc::new(RecordingExecutor::new());
        let wallet = Arc::new(FakeWallet::new(0).with_token_balances([500]));
        let ctx = context(oracle.clone(), executor.clone(), wallet.clone(), quick_settlement());

        // Balance never rises above what was held before the buy
        let err = HoldMonitor::new(&ctx, 500).run().await.unwrap_err();

        assert_eq!(err, HoldError::SettlementTimeout { attempts: 3 });
        assert_eq!(wallet.token_reads(), 3);
        assert_eq!(oracle.value_calls(), 0);
        assert!(executor.requests().is_empty());
    }

    #[tokio::test]
    async fn test_settlement_timeout_after_read_errors() {
        let oracle = Arc::new(ScriptedOracle::new());
        let executor = Arc::new(RecordingExecutor::new());
        let wallet = Arc::new(FakeWallet::new(0).failing_token_reads());
        let ctx = context(oracle, executor, wallet.clone(), quick_settlement());

        let err = HoldMonitor::new(&ctx, 0).run().await.unwrap_err();
        assert_eq!(err, HoldError::SettlementTimeout { attempts: 3 });
        assert_eq!(wallet.token_reads(), 3);
    }

    #[tokio::test]
    async fn test_stop_ends_settlement_wait() {
        let oracle = Arc::new(ScriptedOracle::new());
        let executor = Arc::new(RecordingExecutor::new());
        let wallet = Arc::new(FakeWallet::new(0));
        // Full-length policy: 50 reads one second apart
        let ctx = context(
            oracle,
            executor.clone(),
            wallet.clone(),
            RetryPolicy::new(50, Duration::from_secs(1)),
        );
        ctx.state.write().await.is_running = false;

        let outcome = tokio::time::timeout(
            Duration::from_millis(500),
            HoldMonitor::new(&ctx, 0).run(),
        )
        .await
        .expect("settlement wait ignored the stop request")
        .unwrap();

        assert_eq!(outcome, HoldOutcome::Interrupted);
        assert_eq!(wallet.token_reads(), 0);
        assert!(executor.requests().is_empty());
    }

    #[tokio::test]
    async fn test_stop_while_monitoring_leaves_position_open() {
        let oracle = Arc::new(ScriptedOracle::new().with_values([1.0]));
        let executor = Arc::new(RecordingExecutor::new());
        let wallet = Arc::new(FakeWallet::new(0).with_token_balances([1_000]));
        let ctx = context(oracle.clone(), executor.clone(), wallet, quick_settlement());

        let stopper = async {
            while oracle.value_calls() < 2 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            ctx.state.write().await.is_running = false;
        };
        let (outcome, ()) = tokio::join!(HoldMonitor::new(&ctx, 0).run(), stopper);

        assert_eq!(outcome.unwrap(), HoldOutcome::Interrupted);
        assert!(executor.requests().is_empty());
        assert!(!ctx.state.read().await.is_processing);
    }

    #[tokio::test]
    async fn test_failed_stop_loss_sell_retried_on_next_check() {
        let oracle = Arc::new(ScriptedOracle::new().with_values([0.5]));
        let executor = Arc::new(RecordingExecutor::new().with_outcomes([false, true]));
        let wallet = Arc::new(FakeWallet::new(0).with_token_balances([1_000]));
        let ctx = context(oracle.clone(), executor.clone(), wallet, quick_settlement());

        let outcome = HoldMonitor::new(&ctx, 0).run().await.unwrap();

        assert!(matches!(
            outcome,
            HoldOutcome::Closed { reason: ExitReason::StopLoss, .. }
        ));
        assert_eq!(oracle.value_calls(), 2);
        assert_eq!(executor.requests().len(), 2);
        let state = ctx.state.read().await;
        assert_eq!(state.failed_trades, 1);
        assert_eq!(state.successful_trades, 1);
    }
}
