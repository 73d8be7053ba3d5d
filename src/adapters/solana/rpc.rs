use solana_client::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    pubkey::Pubkey,
    transaction::{Transaction, VersionedTransaction},
};
use spl_token::solana_program::program_pack::Pack;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolanaClientError {
    #[error("RPC request failed: {0}")]
    RpcError(String),
    #[error("Transaction failed: {0}")]
    TransactionError(String),
    #[error("Invalid account data: {0}")]
    InvalidAccountData(String),
    #[error("Invalid commitment level: {0}")]
    InvalidCommitment(String),
}

/// Raw token amount together with the mint's decimals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAmount {
    pub amount: u64,
    pub decimals: u8,
}

impl TokenAmount {
    pub fn ui_amount(&self) -> f64 {
        self.amount as f64 / 10f64.powi(self.decimals as i32)
    }
}

/// Wrapper around Solana RPC client with async-compatible methods
#[derive(Clone)]
pub struct SolanaClient {
    client: Arc<RpcClient>,
    commitment: CommitmentConfig,
}

impl SolanaClient {
    /// Create a new Solana RPC client at "confirmed" commitment
    pub fn new(rpc_url: String) -> Self {
        Self::with_commitment(rpc_url, CommitmentConfig::confirmed())
    }

    pub fn with_commitment(rpc_url: String, commitment: CommitmentConfig) -> Self {
        let client = Arc::new(RpcClient::new_with_commitment(rpc_url, commitment));
        Self { client, commitment }
    }

    /// Parse a commitment level name ("processed", "confirmed", "finalized")
    pub fn parse_commitment(level: &str) -> Result<CommitmentConfig, SolanaClientError> {
        CommitmentConfig::from_str(level)
            .map_err(|_| SolanaClientError::InvalidCommitment(level.to_string()))
    }

    /// Get SOL balance in lamports
    pub async fn get_balance(&self, pubkey: &Pubkey) -> Result<u64, SolanaClientError> {
        let pubkey = *pubkey;

        // Spawn blocking to make sync RPC call async-compatible
        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || {
            client
                .get_balance(&pubkey)
                .map_err(|e| SolanaClientError::RpcError(e.to_string()))
        })
        .await
        .map_err(|e| SolanaClientError::RpcError(format!("Task join error: {}", e)))?
    }

    /// Raw amount held by an SPL token account, `None` if the account does not exist
    pub async fn get_token_account_amount(
        &self,
        token_account: &Pubkey,
    ) -> Result<Option<u64>, SolanaClientError> {
        let pubkey = *token_account;
        let commitment = self.commitment;

        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || {
            let account = client
                .get_account_with_commitment(&pubkey, commitment)
                .map_err(|e| SolanaClientError::RpcError(e.to_string()))?
                .value;

            match account {
                None => Ok(None),
                Some(account) => spl_token::state::Account::unpack(&account.data)
                    .map(|token| Some(token.amount))
                    .map_err(|e| SolanaClientError::InvalidAccountData(e.to_string())),
            }
        })
        .await
        .map_err(|e| SolanaClientError::RpcError(format!("Task join error: {}", e)))?
    }

    /// Total supply of a mint
    pub async fn get_token_supply(&self, mint: &Pubkey) -> Result<TokenAmount, SolanaClientError> {
        let pubkey = *mint;

        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || {
            client
                .get_token_supply(&pubkey)
                .map_err(|e| SolanaClientError::RpcError(e.to_string()))
                .and_then(|supply| {
                    let amount = supply
                        .amount
                        .parse::<u64>()
                        .map_err(|e| SolanaClientError::RpcError(format!("Parse error: {}", e)))?;
                    Ok(TokenAmount {
                        amount,
                        decimals: supply.decimals,
                    })
                })
        })
        .await
        .map_err(|e| SolanaClientError::RpcError(format!("Task join error: {}", e)))?
    }

    /// Send and confirm a legacy transaction
    pub async fn send_and_confirm_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<String, SolanaClientError> {
        let tx = transaction.clone();
        let client = Arc::clone(&self.client);

        tokio::task::spawn_blocking(move || {
            client
                .send_and_confirm_transaction(&tx)
                .map(|sig| sig.to_string())
                .map_err(|e| SolanaClientError::TransactionError(e.to_string()))
        })
        .await
        .map_err(|e| SolanaClientError::RpcError(format!("Task join error: {}", e)))?
    }

    /// Send and confirm a versioned transaction (aggregator swaps)
    pub async fn send_and_confirm_versioned(
        &self,
        transaction: VersionedTransaction,
    ) -> Result<String, SolanaClientError> {
        let client = Arc::clone(&self.client);

        tokio::task::spawn_blocking(move || {
            client
                .send_and_confirm_transaction(&transaction)
                .map(|sig| sig.to_string())
                .map_err(|e| SolanaClientError::TransactionError(e.to_string()))
        })
        .await
        .map_err(|e| SolanaClientError::RpcError(format!("Task join error: {}", e)))?
    }

    /// Get recent blockhash (needed for transaction building)
    pub async fn get_latest_blockhash(&self) -> Result<Hash, SolanaClientError> {
        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || {
            client
                .get_latest_blockhash()
                .map_err(|e| SolanaClientError::RpcError(e.to_string()))
        })
        .await
        .map_err(|e| SolanaClientError::RpcError(format!("Task join error: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_creation() {
        let client = SolanaClient::new("https://api.devnet.solana.com".to_string());
        // Just verify it compiles and constructs
        assert!(std::mem::size_of_val(&client) > 0);
    }

    #[test]
    fn test_parse_commitment() {
        assert_eq!(
            SolanaClient::parse_commitment("finalized").unwrap(),
            CommitmentConfig::finalized()
        );
        assert!(SolanaClient::parse_commitment("eventually").is_err());
    }

    #[test]
    fn test_token_amount_ui() {
        let amount = TokenAmount {
            amount: 1_500_000,
            decimals: 6,
        };
        assert_eq!(amount.ui_amount(), 1.5);
    }

    #[test]
    fn test_error_display() {
        let err = SolanaClientError::RpcError("test".to_string());
        assert!(err.to_string().contains("RPC request failed"));

        let err = SolanaClientError::InvalidCommitment("x".to_string());
        assert!(err.to_string().contains("commitment"));
    }
}
