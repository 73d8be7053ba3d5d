//! PumpSwap pool oracle
//!
//! Prices a pool from its two vault balances: the token vault and the wrapped
//! SOL vault, both associated accounts owned by the pool. Position value comes
//! from a Jupiter sell quote so it reflects price impact.

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address;

use crate::adapters::jupiter::{JupiterClient, QuoteRequest};
use crate::adapters::solana::{SolanaClient, TokenAmount};
use crate::domain::PoolTarget;
use crate::ports::{MarketDataError, MarketOracle, MarketSnapshot};

/// Every pump.fun token is minted with this supply and decimals
pub const PUMP_TOKEN_SUPPLY: u64 = 1_000_000_000_000_000;
pub const PUMP_TOKEN_DECIMALS: u8 = 6;

const NATIVE_DECIMALS: u8 = 9;
const VALUATION_SLIPPAGE_BPS: u16 = 100;

/// Vault addresses of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolVaults {
    pub base: Pubkey,
    pub quote: Pubkey,
}

impl PoolVaults {
    pub fn of(target: &PoolTarget) -> Self {
        Self {
            base: get_associated_token_address(&target.pool, &target.mint),
            quote: get_associated_token_address(&target.pool, &spl_token::native_mint::id()),
        }
    }
}

/// Price and market cap from vault reserves and the token's total supply
pub fn price_from_reserves(
    base: TokenAmount,
    quote_lamports: u64,
    supply: TokenAmount,
) -> Result<MarketSnapshot, MarketDataError> {
    let base_ui = base.ui_amount();
    if base_ui <= 0.0 {
        return Err(MarketDataError::ParseError(
            "pool token vault is empty".to_string(),
        ));
    }

    let quote = TokenAmount {
        amount: quote_lamports,
        decimals: NATIVE_DECIMALS,
    };
    let price = quote.ui_amount() / base_ui;
    Ok(MarketSnapshot {
        price,
        market_cap: price * supply.ui_amount(),
    })
}

pub struct PumpSwapOracle {
    rpc: SolanaClient,
    jupiter: JupiterClient,
}

impl PumpSwapOracle {
    pub fn new(rpc: SolanaClient, jupiter: JupiterClient) -> Self {
        Self { rpc, jupiter }
    }

    async fn vault_amount(&self, vault: &Pubkey) -> Result<u64, MarketDataError> {
        self.rpc
            .get_token_account_amount(vault)
            .await
            .map_err(|e| MarketDataError::RpcError(e.to_string()))?
            .ok_or_else(|| MarketDataError::PoolNotFound(vault.to_string()))
    }

    async fn supply(&self, target: &PoolTarget) -> Result<TokenAmount, MarketDataError> {
        if target.is_pump {
            return Ok(TokenAmount {
                amount: PUMP_TOKEN_SUPPLY,
                decimals: PUMP_TOKEN_DECIMALS,
            });
        }
        self.rpc
            .get_token_supply(&target.mint)
            .await
            .map_err(|e| MarketDataError::RpcError(e.to_string()))
    }
}

#[async_trait]
impl MarketOracle for PumpSwapOracle {
    async fn snapshot(&self, target: &PoolTarget) -> Result<MarketSnapshot, MarketDataError> {
        let vaults = PoolVaults::of(target);
        let (base, quote, supply) = tokio::try_join!(
            self.vault_amount(&vaults.base),
            self.vault_amount(&vaults.quote),
            self.supply(target),
        )?;

        price_from_reserves(
            TokenAmount {
                amount: base,
                decimals: supply.decimals,
            },
            quote,
            supply,
        )
    }

    async fn position_value(
        &self,
        target: &PoolTarget,
        token_amount: u64,
    ) -> Result<f64, MarketDataError> {
        if token_amount == 0 {
            return Ok(0.0);
        }

        let request = QuoteRequest::new(
            &target.mint,
            &spl_token::native_mint::id(),
            token_amount,
            VALUATION_SLIPPAGE_BPS,
        )
        .pumpswap_only();

        let quote = self
            .jupiter
            .get_quote(&request)
            .await
            .map_err(|e| MarketDataError::QuoteError(e.to_string()))?;
        Ok(quote.output_sol())
    }
}
