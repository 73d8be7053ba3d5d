//! Scriptable in-memory port implementations.
//!
//! Each fake records its calls and replays a scripted sequence of responses,
//! repeating the last entry once the script runs out.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;

use crate::domain::{PoolTarget, TradeRequest, TradeResult, TradingSettings};
use super::execution::TradeExecutor;
use super::market_data::{MarketDataError, MarketOracle, MarketSnapshot};
use super::settings::{SettingsError, SettingsProvider};
use super::wallet::{WalletError, WalletPort};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Pops the next scripted entry, keeping the final one sticky
#[derive(Debug)]
struct Script<T: Clone> {
    queue: VecDeque<T>,
    last: Option<T>,
}

impl<T: Clone> Default for Script<T> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            last: None,
        }
    }
}

impl<T: Clone> Script<T> {
    fn push(&mut self, item: T) {
        self.queue.push_back(item);
    }

    fn next(&mut self) -> Option<T> {
        if let Some(item) = self.queue.pop_front() {
            self.last = Some(item.clone());
            return Some(item);
        }
        self.last.clone()
    }
}

/// Oracle that replays market caps and position values
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    market_caps: Mutex<Script<Result<f64, String>>>,
    values: Mutex<Script<Result<f64, String>>>,
    snapshot_calls: Mutex<u32>,
    value_calls: Mutex<u32>,
    valued_amounts: Mutex<Vec<u64>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_market_caps(self, caps: impl IntoIterator<Item = f64>) -> Self {
        {
            let mut script = lock(&self.market_caps);
            for cap in caps {
                script.push(Ok(cap));
            }
        }
        self
    }

    pub fn with_market_cap_error(self, message: &str) -> Self {
        lock(&self.market_caps).push(Err(message.to_string()));
        self
    }

    /// Position values in SOL, one per PnL check
    pub fn with_values(self, values: impl IntoIterator<Item = f64>) -> Self {
        {
            let mut script = lock(&self.values);
            for value in values {
                script.push(Ok(value));
            }
        }
        self
    }

    pub fn with_value_error(self, message: &str) -> Self {
        lock(&self.values).push(Err(message.to_string()));
        self
    }

    pub fn snapshot_calls(&self) -> u32 {
        *lock(&self.snapshot_calls)
    }

    pub fn value_calls(&self) -> u32 {
        *lock(&self.value_calls)
    }

    /// Token amounts passed to `position_value`, in call order
    pub fn valued_amounts(&self) -> Vec<u64> {
        lock(&self.valued_amounts).clone()
    }
}

#[async_trait]
impl MarketOracle for ScriptedOracle {
    async fn snapshot(&self, _target: &PoolTarget) -> Result<MarketSnapshot, MarketDataError> {
        *lock(&self.snapshot_calls) += 1;
        let next = lock(&self.market_caps).next();
        match next {
            Some(Ok(market_cap)) => Ok(MarketSnapshot {
                price: market_cap / 1_000_000_000.0,
                market_cap,
            }),
            Some(Err(message)) => Err(MarketDataError::RpcError(message)),
            None => Err(MarketDataError::PoolNotFound("no market cap scripted".to_string())),
        }
    }

    async fn position_value(
        &self,
        _target: &PoolTarget,
        token_amount: u64,
    ) -> Result<f64, MarketDataError> {
        *lock(&self.value_calls) += 1;
        lock(&self.valued_amounts).push(token_amount);
        let next = lock(&self.values).next();
        match next {
            Some(Ok(value)) => Ok(value),
            Some(Err(message)) => Err(MarketDataError::QuoteError(message)),
            None => Err(MarketDataError::QuoteError("no value scripted".to_string())),
        }
    }
}

/// Executor that records requests and answers from a scripted outcome list.
/// Unscripted calls succeed.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    requests: Mutex<Vec<TradeRequest>>,
    outcomes: Mutex<VecDeque<bool>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outcomes(self, outcomes: impl IntoIterator<Item = bool>) -> Self {
        lock(&self.outcomes).extend(outcomes);
        self
    }

    pub fn requests(&self) -> Vec<TradeRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl TradeExecutor for RecordingExecutor {
    async fn execute_trade(&self, request: TradeRequest) -> TradeResult {
        let (direction, amount) = (request.direction, request.amount);
        let call = {
            let mut requests = lock(&self.requests);
            requests.push(request);
            requests.len()
        };
        let succeed = lock(&self.outcomes).pop_front().unwrap_or(true);
        if succeed {
            TradeResult::success(direction, amount, format!("sig-{call}"))
        } else {
            TradeResult::failure(direction, amount, "scripted failure")
        }
    }
}

/// Wallet with a fixed native balance and a scripted token balance
#[derive(Debug)]
pub struct FakeWallet {
    pubkey: Pubkey,
    native_lamports: u64,
    token_balances: Mutex<Script<u64>>,
    token_reads: Mutex<u32>,
    wrap_calls: Mutex<Vec<u64>>,
    unwrap_calls: Mutex<u32>,
    wrap_delay: Duration,
    fail_wrap: bool,
    fail_token_reads: bool,
}

impl FakeWallet {
    pub fn new(native_lamports: u64) -> Self {
        Self {
            pubkey: Pubkey::new_unique(),
            native_lamports,
            token_balances: Mutex::new(Script::default()),
            token_reads: Mutex::new(0),
            wrap_calls: Mutex::new(Vec::new()),
            unwrap_calls: Mutex::new(0),
            wrap_delay: Duration::ZERO,
            fail_wrap: false,
            fail_token_reads: false,
        }
    }

    /// Successive token balance reads. Unscripted reads return zero.
    pub fn with_token_balances(self, balances: impl IntoIterator<Item = u64>) -> Self {
        {
            let mut script = lock(&self.token_balances);
            for balance in balances {
                script.push(balance);
            }
        }
        self
    }

    pub fn failing_wrap(mut self) -> Self {
        self.fail_wrap = true;
        self
    }

    /// Every token balance read fails with an RPC error
    pub fn failing_token_reads(mut self) -> Self {
        self.fail_token_reads = true;
        self
    }

    /// `ensure_wrapped` sleeps this long before answering
    pub fn with_wrap_delay(mut self, delay: Duration) -> Self {
        self.wrap_delay = delay;
        self
    }

    pub fn token_reads(&self) -> u32 {
        *lock(&self.token_reads)
    }

    pub fn wrap_calls(&self) -> Vec<u64> {
        lock(&self.wrap_calls).clone()
    }

    pub fn unwrap_calls(&self) -> u32 {
        *lock(&self.unwrap_calls)
    }
}

#[async_trait]
impl WalletPort for FakeWallet {
    fn pubkey(&self) -> Pubkey {
        self.pubkey
    }

    async fn native_balance(&self) -> Result<u64, WalletError> {
        Ok(self.native_lamports)
    }

    async fn token_balance(&self, _mint: &Pubkey) -> Result<u64, WalletError> {
        *lock(&self.token_reads) += 1;
        if self.fail_token_reads {
            return Err(WalletError::RpcError("token account unavailable".to_string()));
        }
        Ok(lock(&self.token_balances).next().unwrap_or(0))
    }

    async fn ensure_wrapped(&self, lamports: u64) -> Result<(), WalletError> {
        lock(&self.wrap_calls).push(lamports);
        if !self.wrap_delay.is_zero() {
            tokio::time::sleep(self.wrap_delay).await;
        }
        if self.fail_wrap {
            return Err(WalletError::TransactionError("wrap rejected".to_string()));
        }
        Ok(())
    }

    async fn unwrap_all(&self) -> Result<(), WalletError> {
        *lock(&self.unwrap_calls) += 1;
        Ok(())
    }
}

/// Settings held in memory
#[derive(Debug, Default, Clone)]
pub struct InMemorySettings {
    inner: Arc<Mutex<TradingSettings>>,
}

impl InMemorySettings {
    pub fn new(settings: TradingSettings) -> Self {
        Self {
            inner: Arc::new(Mutex::new(settings)),
        }
    }
}

impl SettingsProvider for InMemorySettings {
    fn load(&self) -> Result<TradingSettings, SettingsError> {
        Ok(lock(&self.inner).clone())
    }

    fn save(&self, settings: &TradingSettings) -> Result<(), SettingsError> {
        *lock(&self.inner) = settings.clone();
        Ok(())
    }
}
