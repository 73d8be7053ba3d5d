pub mod liquidity;
pub mod rpc;
pub mod wallet;

pub use liquidity::{SolanaWallet, WrapConfig};
pub use rpc::{SolanaClient, SolanaClientError, TokenAmount};
pub use wallet::WalletManager;
