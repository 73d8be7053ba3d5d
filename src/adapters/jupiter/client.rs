//! Jupiter API Client
//!
//! HTTP client for the Jupiter swap API: quotes and unsigned swap transactions.

use std::time::Duration;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;

use crate::ports::ExecutionError;
use super::quote::{QuoteRequest, QuoteResponse};
use super::swap::{SwapRequest, SwapResponse};

/// Jupiter API client configuration
#[derive(Debug, Clone)]
pub struct JupiterConfig {
    /// Base URL for Jupiter API
    pub api_base_url: String,
    /// Optional API key for higher rate limits
    pub api_key: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Number of retry attempts
    pub max_retries: u32,
}

impl Default for JupiterConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.jup.ag/swap/v1".to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

/// Jupiter DEX aggregator client
#[derive(Debug, Clone)]
pub struct JupiterClient {
    config: JupiterConfig,
    http: Client,
}

impl JupiterClient {
    /// Create a new Jupiter client with default configuration
    pub fn new() -> Result<Self, ExecutionError> {
        Self::with_config(JupiterConfig::default())
    }

    /// Create a new Jupiter client with custom configuration
    pub fn with_config(config: JupiterConfig) -> Result<Self, ExecutionError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ExecutionError::ApiError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    /// Quote a swap. The response is passed back verbatim to `get_swap_transaction`.
    pub async fn get_quote(&self, request: &QuoteRequest) -> Result<QuoteResponse, ExecutionError> {
        let url = format!("{}/quote", self.config.api_base_url);
        let req = self.http.get(&url).query(&request.query_pairs());
        self.send(req).await
    }

    /// Build an unsigned swap transaction for a quote
    pub async fn get_swap_transaction(
        &self,
        request: &SwapRequest,
    ) -> Result<SwapResponse, ExecutionError> {
        let url = format!("{}/swap", self.config.api_base_url);
        let req = self.http.post(&url).json(request);
        self.send(req).await
    }

    async fn send<T: for<'de> Deserialize<'de>>(
        &self,
        mut req: RequestBuilder,
    ) -> Result<T, ExecutionError> {
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("x-api-key", api_key);
        }

        let response = self
            .execute_with_retry(|| async {
                req.try_clone()
                    .ok_or_else(|| ExecutionError::ApiError("Failed to clone request".into()))?
                    .send()
                    .await
                    .map_err(|e| ExecutionError::ApiError(e.to_string()))
            })
            .await?;

        self.handle_response(response).await
    }

    /// Execute request with retry logic and rate limit handling
    async fn execute_with_retry<F, Fut>(&self, request_fn: F) -> Result<reqwest::Response, ExecutionError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, ExecutionError>>,
    {
        let mut last_error = None;

        for attempt in 0..self.config.max_retries {
            match request_fn().await {
                Ok(response) => {
                    if response.status().is_success() || response.status() == StatusCode::BAD_REQUEST {
                        return Ok(response);
                    }

                    // Handle rate limiting (429) with exponential backoff
                    if response.status() == StatusCode::TOO_MANY_REQUESTS {
                        let backoff = Duration::from_secs(2u64.pow(attempt + 1)); // 2s, 4s, 8s
                        tracing::warn!(
                            "Rate limited (429), backing off for {:?} (attempt {}/{})",
                            backoff, attempt + 1, self.config.max_retries
                        );
                        last_error = Some(ExecutionError::ApiError(
                            "Rate limit exceeded - backing off".into()
                        ));
                        tokio::time::sleep(backoff).await;
                        continue;
                    }

                    if response.status().is_server_error() {
                        last_error = Some(ExecutionError::ApiError(
                            format!("Server error: {}", response.status())
                        ));
                        tokio::time::sleep(Duration::from_millis(500 * (attempt as u64 + 1))).await;
                        continue;
                    }

                    return Ok(response);
                }
                Err(e) => {
                    last_error = Some(e);
                    tokio::time::sleep(Duration::from_millis(500 * (attempt as u64 + 1))).await;
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ExecutionError::ApiError("Max retries exceeded".into())))
    }

    /// Handle API response and deserialize
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ExecutionError> {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ExecutionError::ApiError("Rate limit exceeded".into()));
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            if error_text.contains("SlippageToleranceExceeded") || error_text.contains("6001") {
                return Err(ExecutionError::SlippageExceeded);
            }

            return Err(ExecutionError::ApiError(format!(
                "API error {}: {}",
                status,
                error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ExecutionError::ApiError(format!("Failed to parse response: {}", e)))
    }

    /// Get the configured API base URL
    pub fn api_base_url(&self) -> &str {
        &self.config.api_base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jupiter_config_default() {
        let config = JupiterConfig::default();
        assert_eq!(config.api_base_url, "https://api.jup.ag/swap/v1");
        assert!(config.api_key.is_none());
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_jupiter_client_creation() {
        let client = JupiterClient::new().unwrap();
        assert_eq!(client.api_base_url(), "https://api.jup.ag/swap/v1");
    }

    #[test]
    fn test_jupiter_client_custom_base_url() {
        let client = JupiterClient::with_config(JupiterConfig {
            api_base_url: "http://localhost:8080".to_string(),
            api_key: Some("test-key".to_string()),
            ..JupiterConfig::default()
        })
        .unwrap();
        assert_eq!(client.api_base_url(), "http://localhost:8080");
    }
}
