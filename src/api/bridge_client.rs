//! HTTP client for the bridge API (`createTx2` and `status`).

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;
use tracing::{debug, warn};

use super::{BridgeApi, CreateTxResponse, StatusResponse};
use crate::core::config::ApiConfig;
use crate::core::domain::{BridgeRequest, Network, PreparedTransaction, TransactionId};
use crate::core::errors::{BridgeError, BridgeResult};

pub struct HttpBridgeApi {
    client: Client,
    base_url: String,
}

impl HttpBridgeApi {
    pub fn new(config: &ApiConfig) -> BridgeResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| BridgeError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, base_url: config.base_url.trim_end_matches('/').to_string() })
    }

    async fn read_json(url: &str, response: Response) -> BridgeResult<Value> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BridgeError::TransactionError(format!("reading response from {} failed: {}", url, e)))?;

        if !status.is_success() {
            let message = error_message(&body).unwrap_or_else(|| format!("HTTP {}", status));
            warn!(%status, url = %url, "Bridge API returned an error");
            return Err(BridgeError::ApiError(message));
        }

        serde_json::from_str(&body)
            .map_err(|e| BridgeError::TransactionError(format!("invalid JSON from {}: {}", url, e)))
    }
}

/// The server's own message: `error` when it is a string, else the raw body.
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => match map.get("error") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => Some(trimmed.to_string()),
        },
        _ => Some(trimmed.to_string()),
    }
}

#[async_trait]
impl BridgeApi for HttpBridgeApi {
    fn create_tx_endpoint(&self, request: &BridgeRequest) -> String {
        match request.network() {
            Network::Mainnet => format!("{}/createTx2", self.base_url),
            Network::Testnet => {
                format!("{}/testnet/createTx2?fromChain={}", self.base_url, request.from_chain)
            }
        }
    }

    fn status_endpoint(&self, network: Network) -> String {
        match network {
            Network::Mainnet => format!("{}/status", self.base_url),
            Network::Testnet => format!("{}/testnet/status", self.base_url),
        }
    }

    async fn create_transaction(&self, request: &BridgeRequest) -> BridgeResult<CreateTxResponse> {
        let url = self.create_tx_endpoint(request);
        debug!(url = %url, "POST createTx2");
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| BridgeError::TransactionError(format!("request to {} failed: {}", url, e)))?;

        let raw = Self::read_json(&url, response).await?;
        let data = match raw.get("data") {
            Some(data) if !data.is_null() => data.clone(),
            _ => {
                let message = raw
                    .get("error")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| "response carries no transaction data".to_string());
                return Err(BridgeError::ApiError(message));
            }
        };
        let prepared: PreparedTransaction = serde_json::from_value(data)
            .map_err(|e| BridgeError::invalid_payload(format!("unexpected createTx2 data: {}", e)))?;
        Ok(CreateTxResponse { prepared, raw })
    }

    async fn transaction_status(&self, tx: &TransactionId, network: Network) -> BridgeResult<StatusResponse> {
        let url = format!("{}/{}", self.status_endpoint(network), tx);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| BridgeError::TransactionError(format!("request to {} failed: {}", url, e)))?;
        let raw = Self::read_json(&url, response).await?;
        StatusResponse::from_value(raw)
    }
}
