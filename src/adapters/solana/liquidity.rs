//! Wallet balances and wrapped SOL management
//!
//! Trades settle against the wallet's wrapped-SOL associated account, so a
//! session tops it up before the first buy. Closing the account returns the
//! remaining wrapped balance as native SOL.

use async_trait::async_trait;
use solana_sdk::{
    compute_budget::ComputeBudgetInstruction,
    instruction::Instruction,
    message::Message,
    pubkey::Pubkey,
    system_instruction,
    transaction::Transaction,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};
use std::time::Duration;
use tokio_retry::{strategy::FixedInterval, Retry};

use super::rpc::SolanaClient;
use super::wallet::WalletManager;
use crate::ports::{WalletError, WalletPort};

/// Fee and retry parameters for wrap/unwrap transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrapConfig {
    pub compute_unit_price: u64,
    pub compute_unit_limit: u32,
    pub max_attempts: usize,
    pub retry_delay: Duration,
}

impl Default for WrapConfig {
    fn default() -> Self {
        Self {
            compute_unit_price: 1_000_000,
            compute_unit_limit: 60_000,
            max_attempts: 20,
            retry_delay: Duration::from_secs(5),
        }
    }
}

/// On-chain wallet backed by an RPC client
pub struct SolanaWallet {
    client: SolanaClient,
    signer: WalletManager,
    wrap: WrapConfig,
}

impl SolanaWallet {
    pub fn new(client: SolanaClient, signer: WalletManager, wrap: WrapConfig) -> Self {
        Self {
            client,
            signer,
            wrap,
        }
    }

    pub fn wrapped_account(&self) -> Pubkey {
        get_associated_token_address(&self.signer.pubkey(), &spl_token::native_mint::id())
    }

    fn priority_instructions(&self) -> [Instruction; 2] {
        [
            ComputeBudgetInstruction::set_compute_unit_price(self.wrap.compute_unit_price),
            ComputeBudgetInstruction::set_compute_unit_limit(self.wrap.compute_unit_limit),
        ]
    }

    /// Instructions moving `lamports` native SOL into the wrapped account
    fn wrap_instructions(&self, lamports: u64) -> Result<Vec<Instruction>, WalletError> {
        let owner = self.signer.pubkey();
        let wrapped = self.wrapped_account();

        let sync = spl_token::instruction::sync_native(&spl_token::id(), &wrapped)
            .map_err(|e| WalletError::TransactionError(e.to_string()))?;

        let mut instructions = self.priority_instructions().to_vec();
        instructions.push(create_associated_token_account_idempotent(
            &owner,
            &owner,
            &spl_token::native_mint::id(),
            &spl_token::id(),
        ));
        instructions.push(system_instruction::transfer(&owner, &wrapped, lamports));
        instructions.push(sync);
        Ok(instructions)
    }

    fn unwrap_instructions(&self) -> Result<Vec<Instruction>, WalletError> {
        let owner = self.signer.pubkey();
        let close = spl_token::instruction::close_account(
            &spl_token::id(),
            &self.wrapped_account(),
            &owner,
            &owner,
            &[],
        )
        .map_err(|e| WalletError::TransactionError(e.to_string()))?;

        let mut instructions = self.priority_instructions().to_vec();
        instructions.push(close);
        Ok(instructions)
    }

    /// Sign with a fresh blockhash and send, retrying the whole round on failure
    async fn submit(&self, instructions: &[Instruction]) -> Result<String, WalletError> {
        let strategy = FixedInterval::new(self.wrap.retry_delay)
            .take(self.wrap.max_attempts.saturating_sub(1));

        Retry::spawn(strategy, || async {
            let blockhash = self
                .client
                .get_latest_blockhash()
                .await
                .map_err(|e| WalletError::RpcError(e.to_string()))?;

            let message =
                Message::new_with_blockhash(instructions, Some(&self.signer.pubkey()), &blockhash);
            let mut transaction = Transaction::new_unsigned(message);
            self.signer.sign_transaction(&mut transaction)?;

            self.client
                .send_and_confirm_transaction(&transaction)
                .await
                .map_err(|e| {
                    tracing::warn!("Wrapped SOL transaction failed, retrying: {}", e);
                    WalletError::TransactionError(e.to_string())
                })
        })
        .await
    }
}

#[async_trait]
impl WalletPort for SolanaWallet {
    fn pubkey(&self) -> Pubkey {
        self.signer.pubkey()
    }

    async fn native_balance(&self) -> Result<u64, WalletError> {
        self.client
            .get_balance(&self.signer.pubkey())
            .await
            .map_err(|e| WalletError::RpcError(e.to_string()))
    }

    async fn token_balance(&self, mint: &Pubkey) -> Result<u64, WalletError> {
        let account = get_associated_token_address(&self.signer.pubkey(), mint);
        let amount = self
            .client
            .get_token_account_amount(&account)
            .await
            .map_err(|e| WalletError::RpcError(e.to_string()))?;
        Ok(amount.unwrap_or(0))
    }

    async fn ensure_wrapped(&self, lamports: u64) -> Result<(), WalletError> {
        let wrapped = self.token_balance(&spl_token::native_mint::id()).await?;
        if wrapped >= lamports {
            tracing::info!(
                "Wrapped SOL balance {} already covers {} lamports",
                wrapped,
                lamports
            );
            return Ok(());
        }

        let top_up = lamports - wrapped;
        tracing::info!("Wrapping {} lamports into {}", top_up, self.wrapped_account());

        let instructions = self.wrap_instructions(top_up)?;
        let signature = self.submit(&instructions).await?;
        tracing::info!("Wrapped SOL transaction confirmed: {}", signature);
        Ok(())
    }

    async fn unwrap_all(&self) -> Result<(), WalletError> {
        let account = self.wrapped_account();
        let existing = self
            .client
            .get_token_account_amount(&account)
            .await
            .map_err(|e| WalletError::RpcError(e.to_string()))?;

        let Some(amount) = existing else {
            tracing::info!("No wrapped SOL account to close");
            return Ok(());
        };

        tracing::info!("Closing wrapped SOL account holding {} lamports", amount);
        let instructions = self.unwrap_instructions()?;
        let signature = self.submit(&instructions).await?;
        tracing::info!("Unwrapped SOL transaction confirmed: {}", signature);
        Ok(())
    }
}
