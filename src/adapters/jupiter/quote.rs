//! Jupiter Quote Types

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// Label Jupiter uses for PumpSwap pools
pub const PUMPSWAP_DEX_LABEL: &str = "Pump.fun Amm";

/// Request parameters for getting a swap quote
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub input_mint: String,
    pub output_mint: String,
    /// Amount in base units of the input mint
    pub amount: u64,
    /// Slippage tolerance in basis points (1 = 0.01%)
    pub slippage_bps: u16,
    /// Restrict routing to these DEX labels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dexes: Option<String>,
    #[serde(default)]
    pub only_direct_routes: bool,
}

impl QuoteRequest {
    pub fn new(input_mint: &Pubkey, output_mint: &Pubkey, amount: u64, slippage_bps: u16) -> Self {
        Self {
            input_mint: input_mint.to_string(),
            output_mint: output_mint.to_string(),
            amount,
            slippage_bps,
            dexes: None,
            only_direct_routes: false,
        }
    }

    /// Route only through a single PumpSwap pool hop
    pub fn pumpswap_only(mut self) -> Self {
        self.dexes = Some(PUMPSWAP_DEX_LABEL.to_string());
        self.only_direct_routes = true;
        self
    }

    /// Query string pairs for the quote endpoint
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("inputMint", self.input_mint.clone()),
            ("outputMint", self.output_mint.clone()),
            ("amount", self.amount.to_string()),
            ("slippageBps", self.slippage_bps.to_string()),
        ];
        if let Some(dexes) = &self.dexes {
            pairs.push(("dexes", dexes.clone()));
        }
        if self.only_direct_routes {
            pairs.push(("onlyDirectRoutes", "true".to_string()));
        }
        pairs
    }
}

/// Response from Jupiter quote API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub input_mint: String,
    pub output_mint: String,
    pub in_amount: String,
    pub out_amount: String,
    /// Minimum output amount after slippage
    pub other_amount_threshold: String,
    pub swap_mode: String,
    pub slippage_bps: u16,
    #[serde(default)]
    pub price_impact_pct: String,
    #[serde(default)]
    pub route_plan: Vec<RoutePlanStep>,
    #[serde(default)]
    pub context_slot: Option<u64>,
    /// Kept so the quote can be passed back verbatim to the swap endpoint
    #[serde(flatten)]
    pub extra: std::collections::HashMap<String, serde_json::Value>,
}

impl QuoteResponse {
    pub fn output_amount(&self) -> u64 {
        self.out_amount.parse().unwrap_or(0)
    }

    /// Output amount of a token-to-SOL quote, in SOL
    pub fn output_sol(&self) -> f64 {
        self.output_amount() as f64 / 1e9
    }

    pub fn price_impact(&self) -> f64 {
        self.price_impact_pct.parse().unwrap_or(0.0)
    }

    /// Pools the route passes through
    pub fn amm_keys(&self) -> impl Iterator<Item = &str> {
        self.route_plan.iter().map(|step| step.swap_info.amm_key.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlanStep {
    pub swap_info: SwapInfo,
    pub percent: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapInfo {
    pub amm_key: String,
    #[serde(default)]
    pub label: String,
    pub input_mint: String,
    pub output_mint: String,
    pub in_amount: String,
    pub out_amount: String,
}
