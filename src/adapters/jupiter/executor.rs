//! Trade execution through Jupiter
//!
//! Quotes the swap restricted to PumpSwap, fetches the unsigned transaction,
//! signs it with the session wallet and confirms it over RPC. Every failure is
//! folded into an unsuccessful `TradeResult`.

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;

use crate::adapters::solana::{SolanaClient, WalletManager};
use crate::domain::{Direction, TradeRequest, TradeResult};
use crate::ports::{ExecutionError, TradeExecutor};
use super::client::JupiterClient;
use super::quote::QuoteRequest;
use super::swap::SwapRequest;

pub struct JupiterExecutor {
    jupiter: JupiterClient,
    rpc: SolanaClient,
    signer: WalletManager,
    priority_fee_lamports: Option<u64>,
}

impl JupiterExecutor {
    pub fn new(jupiter: JupiterClient, rpc: SolanaClient, signer: WalletManager) -> Self {
        Self {
            jupiter,
            rpc,
            signer,
            priority_fee_lamports: None,
        }
    }

    pub fn with_priority_fee(mut self, lamports: Option<u64>) -> Self {
        self.priority_fee_lamports = lamports;
        self
    }

    async fn swap(&self, request: &TradeRequest) -> Result<String, ExecutionError> {
        if request.amount == 0 {
            return Err(ExecutionError::InvalidParameters(
                "trade amount must be positive".to_string(),
            ));
        }

        let quote_request = quote_for(request);
        let quote = self.jupiter.get_quote(&quote_request).await?;

        let pool = request.target.pool.to_string();
        if !quote.amm_keys().any(|key| key == pool) {
            tracing::warn!(
                "{} quote routed through {:?} instead of pool {}",
                request.direction,
                quote.amm_keys().collect::<Vec<_>>(),
                pool
            );
        }
        tracing::debug!(
            "{} quote: {} in, {} out, impact {:.3}%",
            request.direction,
            quote.in_amount,
            quote.out_amount,
            quote.price_impact()
        );

        let quote_value = serde_json::to_value(&quote)
            .map_err(|e| ExecutionError::InvalidParameters(e.to_string()))?;
        let swap_request = SwapRequest::new(self.signer.public_key(), quote_value)
            .with_priority_fee(self.priority_fee_lamports);
        let swap = self.jupiter.get_swap_transaction(&swap_request).await?;

        let signed = self
            .signer
            .sign_versioned(swap.transaction()?)
            .map_err(|e| ExecutionError::SigningError(e.to_string()))?;

        self.rpc
            .send_and_confirm_versioned(signed)
            .await
            .map_err(|e| ExecutionError::ExecutionError(e.to_string()))
    }
}

/// Buys spend wrapped SOL for the token; sells go the other way
fn quote_for(request: &TradeRequest) -> QuoteRequest {
    let native: Pubkey = spl_token::native_mint::id();
    let (input, output) = match request.direction {
        Direction::Buy => (native, request.target.mint),
        Direction::Sell => (request.target.mint, native),
    };
    QuoteRequest::new(&input, &output, request.amount, request.slippage_bps()).pumpswap_only()
}

#[async_trait]
impl TradeExecutor for JupiterExecutor {
    async fn execute_trade(&self, request: TradeRequest) -> TradeResult {
        match self.swap(&request).await {
            Ok(signature) => TradeResult::success(request.direction, request.amount, signature),
            Err(e) => TradeResult::failure(request.direction, request.amount, e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PoolTarget;

    fn target() -> PoolTarget {
        PoolTarget {
            mint: Pubkey::new_unique(),
            pool: Pubkey::new_unique(),
            is_pump: true,
        }
    }

    #[test]
    fn test_buy_quote_spends_native() {
        let target = target();
        let quote = quote_for(&TradeRequest::buy(target, 100_000_000, 5.0));

        assert_eq!(quote.input_mint, spl_token::native_mint::id().to_string());
        assert_eq!(quote.output_mint, target.mint.to_string());
        assert_eq!(quote.amount, 100_000_000);
        assert_eq!(quote.slippage_bps, 500);
        assert!(quote.dexes.is_some());
    }

    #[test]
    fn test_sell_quote_returns_native() {
        let target = target();
        let quote = quote_for(&TradeRequest::sell(target, 42_000_000, 2.5));

        assert_eq!(quote.input_mint, target.mint.to_string());
        assert_eq!(quote.output_mint, spl_token::native_mint::id().to_string());
        assert_eq!(quote.slippage_bps, 250);
    }

    #[tokio::test]
    async fn test_zero_amount_fails_without_network() {
        let executor = JupiterExecutor::new(
            JupiterClient::new().unwrap(),
            SolanaClient::new("http://127.0.0.1:8899".to_string()),
            WalletManager::new_random(),
        );

        let result = executor
            .execute_trade(TradeRequest::sell(target(), 0, 1.0))
            .await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("positive"));
        assert_eq!(result.direction, Direction::Sell);
    }
}
