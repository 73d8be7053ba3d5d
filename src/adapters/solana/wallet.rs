use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::{Transaction, VersionedTransaction},
};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::ports::WalletError;

/// Keypair holder for one wallet.
///
/// Clones share the keypair and the signing lock, so every signature made
/// with this wallet is serialized regardless of which session asks for it.
#[derive(Clone)]
pub struct WalletManager {
    keypair: Arc<Keypair>,
    signing: Arc<Mutex<()>>,
}

impl WalletManager {
    fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
            signing: Arc::new(Mutex::new(())),
        }
    }

    /// Load keypair from a file path (JSON array format)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, WalletError> {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| WalletError::LoadError(format!("Failed to read file: {}", e)))?;

        // Parse JSON array of bytes
        let bytes: Vec<u8> = serde_json::from_str(&contents)
            .map_err(|e| WalletError::LoadError(format!("Invalid JSON format: {}", e)))?;

        Self::from_bytes(&bytes)
    }

    /// Load keypair from a base58 encoded secret key
    pub fn from_base58(secret: &str) -> Result<Self, WalletError> {
        let bytes = bs58::decode(secret.trim())
            .into_vec()
            .map_err(|e| WalletError::InvalidKeypair(format!("Invalid base58: {}", e)))?;

        Self::from_bytes(&bytes)
    }

    /// Load keypair from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WalletError> {
        let keypair = Keypair::try_from(bytes)
            .map_err(|e| WalletError::InvalidKeypair(e.to_string()))?;

        Ok(Self::from_keypair(keypair))
    }

    /// Create a new random keypair (for testing)
    pub fn new_random() -> Self {
        Self::from_keypair(Keypair::new())
    }

    /// Get the public key as a string
    pub fn public_key(&self) -> String {
        self.keypair.pubkey().to_string()
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Sign a legacy transaction
    pub fn sign_transaction(&self, transaction: &mut Transaction) -> Result<(), WalletError> {
        let _guard = self
            .signing
            .lock()
            .map_err(|_| WalletError::SigningError("signing lock poisoned".to_string()))?;

        transaction
            .try_sign(&[self.keypair.as_ref()], transaction.message.recent_blockhash)
            .map_err(|e| WalletError::SigningError(e.to_string()))
    }

    /// Re-sign a versioned transaction built elsewhere with this wallet as fee payer
    pub fn sign_versioned(
        &self,
        transaction: VersionedTransaction,
    ) -> Result<VersionedTransaction, WalletError> {
        let _guard = self
            .signing
            .lock()
            .map_err(|_| WalletError::SigningError("signing lock poisoned".to_string()))?;

        VersionedTransaction::try_new(transaction.message, &[self.keypair.as_ref()])
            .map_err(|e| WalletError::SigningError(e.to_string()))
    }

    /// Export keypair as bytes (use with caution)
    pub fn to_bytes(&self) -> Vec<u8> {
        self.keypair.to_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{hash::Hash, message::Message, system_instruction};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_new_random_wallet() {
        let wallet = WalletManager::new_random();
        let pubkey = wallet.public_key();
        assert!(!pubkey.is_empty());
        assert_eq!(pubkey, wallet.pubkey().to_string());
    }

    #[test]
    fn test_from_bytes() {
        let wallet1 = WalletManager::new_random();
        let bytes = wallet1.to_bytes();

        let wallet2 = WalletManager::from_bytes(&bytes).unwrap();
        assert_eq!(wallet1.public_key(), wallet2.public_key());
    }

    #[test]
    fn test_from_base58() {
        let wallet1 = WalletManager::new_random();
        let encoded = bs58::encode(wallet1.to_bytes()).into_string();

        let wallet2 = WalletManager::from_base58(&encoded).unwrap();
        assert_eq!(wallet1.pubkey(), wallet2.pubkey());

        assert!(WalletManager::from_base58("0OIl").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let wallet1 = WalletManager::new_random();

        let json = serde_json::to_string(&wallet1.to_bytes()).unwrap();
        temp_file.write_all(json.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let wallet2 = WalletManager::from_file(temp_file.path()).unwrap();
        assert_eq!(wallet1.public_key(), wallet2.public_key());
    }

    #[test]
    fn test_invalid_json_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"not valid json").unwrap();
        temp_file.flush().unwrap();

        let result = WalletManager::from_file(temp_file.path());
        assert!(matches!(result, Err(WalletError::LoadError(_))));
    }

    #[test]
    fn test_invalid_bytes() {
        let result = WalletManager::from_bytes(&[0u8; 10]);
        assert!(matches!(result, Err(WalletError::InvalidKeypair(_))));
    }

    #[test]
    fn test_clone_shares_keypair() {
        let wallet1 = WalletManager::new_random();
        let wallet2 = wallet1.clone();
        assert_eq!(wallet1.public_key(), wallet2.public_key());
        assert!(Arc::ptr_eq(&wallet1.signing, &wallet2.signing));
    }

    #[test]
    fn test_sign_transaction() {
        let wallet = WalletManager::new_random();
        let ix = system_instruction::transfer(&wallet.pubkey(), &Pubkey::new_unique(), 1);
        let message = Message::new_with_blockhash(&[ix], Some(&wallet.pubkey()), &Hash::default());
        let mut tx = Transaction::new_unsigned(message);

        wallet.sign_transaction(&mut tx).unwrap();
        assert!(tx.is_signed());
    }

    #[test]
    fn test_sign_versioned() {
        let wallet = WalletManager::new_random();
        let ix = system_instruction::transfer(&wallet.pubkey(), &Pubkey::new_unique(), 1);
        let message = Message::new_with_blockhash(&[ix], Some(&wallet.pubkey()), &Hash::default());
        let unsigned = VersionedTransaction::from(Transaction::new_unsigned(message));

        let signed = wallet.sign_versioned(unsigned).unwrap();
        assert_eq!(signed.signatures.len(), 1);
        assert!(signed.verify_with_results().iter().all(|ok| *ok));
    }
}
