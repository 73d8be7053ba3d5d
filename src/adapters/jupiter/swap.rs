//! Jupiter Swap Types

use base64::Engine;
use serde::{Deserialize, Serialize};
use solana_sdk::transaction::VersionedTransaction;

use crate::ports::ExecutionError;

/// Request parameters for building a swap transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    pub user_public_key: String,
    /// The full quote response from the quote endpoint
    pub quote_response: serde_json::Value,
    /// Wrapped SOL is prepared up front, so the swap must not wrap or close it
    pub wrap_and_unwrap_sol: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prioritization_fee_lamports: Option<u64>,
    pub dynamic_compute_unit_limit: bool,
}

impl SwapRequest {
    pub fn new(user_public_key: String, quote_response: serde_json::Value) -> Self {
        Self {
            user_public_key,
            quote_response,
            wrap_and_unwrap_sol: false,
            prioritization_fee_lamports: None,
            dynamic_compute_unit_limit: true,
        }
    }

    pub fn with_priority_fee(mut self, lamports: Option<u64>) -> Self {
        self.prioritization_fee_lamports = lamports;
        self
    }
}

/// Response from Jupiter swap API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapResponse {
    /// Base64 encoded unsigned versioned transaction
    pub swap_transaction: String,
    pub last_valid_block_height: u64,
    #[serde(default)]
    pub prioritization_fee_lamports: u64,
}

impl SwapResponse {
    pub fn transaction_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(&self.swap_transaction)
    }

    /// Decode the returned transaction for signing
    pub fn transaction(&self) -> Result<VersionedTransaction, ExecutionError> {
        let bytes = self
            .transaction_bytes()
            .map_err(|e| ExecutionError::InvalidParameters(format!("Invalid base64: {}", e)))?;
        bincode::deserialize(&bytes)
            .map_err(|e| ExecutionError::InvalidParameters(format!("Invalid transaction: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{
        hash::Hash, message::Message, pubkey::Pubkey, system_instruction, transaction::Transaction,
    };

    #[test]
    fn test_swap_request_serialization() {
        let quote = serde_json::json!({"inAmount": "1000"});
        let req = SwapRequest::new("wallet123".to_string(), quote).with_priority_fee(Some(5000));

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["userPublicKey"], "wallet123");
        assert_eq!(json["wrapAndUnwrapSol"], false);
        assert_eq!(json["prioritizationFeeLamports"], 5000);
        assert_eq!(json["dynamicComputeUnitLimit"], true);
        assert_eq!(json["quoteResponse"]["inAmount"], "1000");
    }

    #[test]
    fn test_priority_fee_omitted_when_unset() {
        let req = SwapRequest::new("wallet123".to_string(), serde_json::json!({}));
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("prioritizationFeeLamports").is_none());
    }

    #[test]
    fn test_decode_transaction() {
        let payer = Pubkey::new_unique();
        let ix = system_instruction::transfer(&payer, &Pubkey::new_unique(), 42);
        let message = Message::new_with_blockhash(&[ix], Some(&payer), &Hash::default());
        let tx = VersionedTransaction::from(Transaction::new_unsigned(message));
        let encoded =
            base64::engine::general_purpose::STANDARD.encode(bincode::serialize(&tx).unwrap());

        let response: SwapResponse = serde_json::from_value(serde_json::json!({
            "swapTransaction": encoded,
            "lastValidBlockHeight": 123456789
        }))
        .unwrap();

        let decoded = response.transaction().unwrap();
        assert_eq!(decoded.message.static_account_keys()[0], payer);
        assert_eq!(response.prioritization_fee_lamports, 0);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let response = SwapResponse {
            swap_transaction: "not base64!".to_string(),
            last_valid_block_height: 0,
            prioritization_fee_lamports: 0,
        };
        assert!(matches!(
            response.transaction(),
            Err(ExecutionError::InvalidParameters(_))
        ));
    }
}
