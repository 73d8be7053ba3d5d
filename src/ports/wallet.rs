use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Failed to load keypair: {0}")]
    LoadError(String),
    #[error("Invalid keypair bytes: {0}")]
    InvalidKeypair(String),
    #[error("Failed to sign transaction: {0}")]
    SigningError(String),
    #[error("RPC request failed: {0}")]
    RpcError(String),
    #[error("Transaction failed: {0}")]
    TransactionError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Wallet capability used by a trading session: balances, settlement
/// visibility, and wrapped-native preparation.
#[async_trait]
pub trait WalletPort: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    /// Native balance in lamports
    async fn native_balance(&self) -> Result<u64, WalletError>;

    /// Raw token balance of the wallet's associated account for `mint`.
    /// An account that does not exist yet reads as zero.
    async fn token_balance(&self, mint: &Pubkey) -> Result<u64, WalletError>;

    /// Top the wrapped-native account up to at least `lamports`
    async fn ensure_wrapped(&self, lamports: u64) -> Result<(), WalletError>;

    /// Close the wrapped-native account back into native balance
    async fn unwrap_all(&self) -> Result<(), WalletError>;
}
