//! Trading Controller
//!
//! Lifecycle wrapper around a trading session: start, stop, status, and
//! liquidating the configured token on demand. Holds no decision logic.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::domain::{Thresholds, TradeRequest, TradeResult, TradingConfig, TradingState};
use crate::ports::{MarketOracle, SettingsProvider, TradeExecutor, WalletPort};
use super::trading_loop::{LoopTiming, SessionOutcome, TradingError, TradingLoop};

/// Cloning shares the session state, so a clone can stop or inspect a running session
#[derive(Clone)]
pub struct TradingController {
    oracle: Arc<dyn MarketOracle>,
    executor: Arc<dyn TradeExecutor>,
    wallet: Arc<dyn WalletPort>,
    settings: Arc<dyn SettingsProvider>,
    thresholds: Thresholds,
    timing: LoopTiming,
    state: Arc<RwLock<TradingState>>,
    session: Arc<Mutex<()>>,
}

impl TradingController {
    pub fn new(
        oracle: Arc<dyn MarketOracle>,
        executor: Arc<dyn TradeExecutor>,
        wallet: Arc<dyn WalletPort>,
        settings: Arc<dyn SettingsProvider>,
        thresholds: Thresholds,
        timing: LoopTiming,
    ) -> Self {
        Self {
            oracle,
            executor,
            wallet,
            settings,
            thresholds,
            timing,
            state: Arc::new(RwLock::new(TradingState::new())),
            session: Arc::new(Mutex::new(())),
        }
    }

    fn trading_config(&self) -> Result<TradingConfig, TradingError> {
        Ok(self.settings.load()?.to_config()?)
    }

    /// Run a trading session with the current settings until it ends.
    ///
    /// Settings are loaded and validated once; invalid settings never start
    /// the loop. Only one session runs per controller.
    pub async fn start(&self) -> Result<SessionOutcome, TradingError> {
        let _session = self
            .session
            .try_lock()
            .map_err(|_| TradingError::AlreadyRunning)?;

        let config = self.trading_config()?;
        *self.state.write().await = TradingState::new();

        let session = TradingLoop::new(
            Arc::clone(&self.oracle),
            Arc::clone(&self.executor),
            Arc::clone(&self.wallet),
            config,
            self.thresholds,
            self.timing,
            Arc::clone(&self.state),
        );

        session.run().await
    }

    /// Request the running session to stop at its next iteration.
    /// In-flight trades are not interrupted.
    pub async fn stop(&self) {
        self.state.write().await.is_running = false;
        tracing::info!("Stop signal sent to trading session");
    }

    /// Snapshot of the session state
    pub async fn status(&self) -> TradingState {
        self.state.read().await.clone()
    }

    pub async fn is_running(&self) -> bool {
        self.state.read().await.is_running
    }

    /// Liquidate the wallet's full balance of the configured token.
    /// Returns `None` when there is nothing to sell.
    pub async fn sell_all(&self) -> Result<Option<TradeResult>, TradingError> {
        let config = self.trading_config()?;
        let tokens = self.wallet.token_balance(&config.target.mint).await?;
        if tokens == 0 {
            tracing::info!("No {} tokens to sell", config.target.mint);
            return Ok(None);
        }

        if !self.state.write().await.begin_trade() {
            return Err(TradingError::TradeInFlight);
        }

        tracing::info!("Selling all {} tokens of {}", tokens, config.target.mint);
        let request = TradeRequest::sell(config.target, tokens, config.slippage_pct);
        let result = self.executor.execute_trade(request).await;
        self.state.write().await.finish_trade(&result);

        if result.success {
            tracing::info!("{}", result);
        } else {
            tracing::error!("{}", result);
        }
        Ok(Some(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::retry::RetryPolicy;
    use crate::domain::{Direction, InvalidSettings, TradingSettings};
    use crate::ports::mocks::{FakeWallet, RecordingExecutor, ScriptedOracle};
    use crate::ports::settings::MockSettingsProvider;
    use solana_sdk::pubkey::Pubkey;
    use std::time::Duration;

    fn valid_settings() -> TradingSettings {
        TradingSettings {
            mint: Some(Pubkey::new_unique().to_string()),
            pool_id: Some(Pubkey::new_unique().to_string()),
            is_pump: Some(true),
            amount: Some("1".to_string()),
            slippage: Some("5".to_string()),
        }
    }

    fn settings_returning(settings: TradingSettings) -> Arc<MockSettingsProvider> {
        let mut mock = MockSettingsProvider::new();
        mock.expect_load().returning(move || Ok(settings.clone()));
        Arc::new(mock)
    }

    fn timing() -> LoopTiming {
        LoopTiming {
            mc_check_interval: Duration::from_millis(1),
            pnl_check_interval: Duration::from_millis(1),
            error_cooldown: Duration::ZERO,
            post_hold_delay: Duration::ZERO,
            settlement: RetryPolicy::new(2, Duration::ZERO),
            timeout_sell: RetryPolicy::new(1, Duration::ZERO),
            ..LoopTiming::default()
        }
    }

    fn controller(
        oracle: Arc<ScriptedOracle>,
        executor: Arc<RecordingExecutor>,
        wallet: Arc<FakeWallet>,
        settings: Arc<MockSettingsProvider>,
    ) -> TradingController {
        TradingController::new(
            oracle,
            executor,
            wallet,
            settings,
            Thresholds::default(),
            timing(),
        )
    }

    #[tokio::test]
    async fn test_invalid_settings_never_start() {
        let mut settings = valid_settings();
        settings.amount = Some("0".to_string());

        let oracle = Arc::new(ScriptedOracle::new().with_market_caps([100.0]));
        let ctrl = controller(
            oracle.clone(),
            Arc::new(RecordingExecutor::new()),
            Arc::new(FakeWallet::new(10_000_000_000)),
            settings_returning(settings),
        );

        let err = ctrl.start().await.unwrap_err();
        assert!(matches!(
            err,
            TradingError::InvalidSettings(InvalidSettings::NonPositiveAmount(_))
        ));
        assert_eq!(oracle.snapshot_calls(), 0);
        assert!(!ctrl.status().await.is_running);
    }

    #[tokio::test]
    async fn test_start_runs_until_abandoned() {
        let oracle = Arc::new(ScriptedOracle::new().with_market_caps([100.0, 20.0]));
        let ctrl = controller(
            oracle,
            Arc::new(RecordingExecutor::new()),
            Arc::new(FakeWallet::new(10_000_000_000)),
            settings_returning(valid_settings()),
        );

        let outcome = ctrl.start().await.unwrap();
        assert!(matches!(outcome, SessionOutcome::Abandoned(_)));
        assert!(!ctrl.is_running().await);
    }

    #[tokio::test]
    async fn test_status_is_idempotent() {
        let ctrl = controller(
            Arc::new(ScriptedOracle::new()),
            Arc::new(RecordingExecutor::new()),
            Arc::new(FakeWallet::new(0)),
            settings_returning(valid_settings()),
        );

        let first = ctrl.status().await;
        for _ in 0..10 {
            assert_eq!(ctrl.status().await, first);
        }
        assert_eq!(first.total_trades, 0);
    }

    #[tokio::test]
    async fn test_second_start_is_rejected_and_stop_ends_session() {
        let ctrl = controller(
            Arc::new(ScriptedOracle::new().with_market_caps([100.0])),
            Arc::new(RecordingExecutor::new()),
            Arc::new(FakeWallet::new(10_000_000_000)),
            settings_returning(valid_settings()),
        );

        let running = {
            let ctrl = ctrl.clone();
            tokio::spawn(async move { ctrl.start().await })
        };
        while !ctrl.is_running().await {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        assert!(matches!(ctrl.start().await, Err(TradingError::AlreadyRunning)));

        ctrl.stop().await;
        let outcome = running.await.unwrap().unwrap();
        assert_eq!(outcome, SessionOutcome::Stopped);
    }

    #[tokio::test]
    async fn test_sell_all_with_empty_wallet() {
        let executor = Arc::new(RecordingExecutor::new());
        let ctrl = controller(
            Arc::new(ScriptedOracle::new()),
            executor.clone(),
            Arc::new(FakeWallet::new(0)),
            settings_returning(valid_settings()),
        );

        assert!(ctrl.sell_all().await.unwrap().is_none());
        assert!(executor.requests().is_empty());
    }

    #[tokio::test]
    async fn test_sell_all_liquidates_full_balance() {
        let executor = Arc::new(RecordingExecutor::new());
        let ctrl = controller(
            Arc::new(ScriptedOracle::new()),
            executor.clone(),
            Arc::new(FakeWallet::new(0).with_token_balances([123_456])),
            settings_returning(valid_settings()),
        );

        let result = ctrl.sell_all().await.unwrap().unwrap();
        assert!(result.success);

        let requests = executor.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].direction, Direction::Sell);
        assert_eq!(requests[0].amount, 123_456);

        let status = ctrl.status().await;
        assert_eq!(status.successful_trades, 1);
        assert!(status.last_sell_time.is_some());
    }
}
