//! Bridge API: prepares cross-chain transactions and reports settlement.

pub mod bridge_client;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::core::domain::{BridgeRequest, Network, PreparedTransaction, TransactionId};
use crate::core::errors::{BridgeError, BridgeResult};

pub use bridge_client::HttpBridgeApi;

/// Status value reported once the destination leg has settled.
pub const SETTLED_STATUS: &str = "Success";

/// A successful `createTx2` reply.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTxResponse {
    pub prepared: PreparedTransaction,
    /// Full response body, kept for the operation log.
    pub raw: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StatusData {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<StatusData>,
    #[serde(skip)]
    pub raw: Value,
}

impl StatusResponse {
    pub fn from_value(raw: Value) -> BridgeResult<Self> {
        let mut parsed: StatusResponse = serde_json::from_value(raw.clone())
            .map_err(|e| BridgeError::TransactionError(format!("unexpected status response: {}", e)))?;
        parsed.raw = raw;
        Ok(parsed)
    }

    /// `success && data.status == "Success"`.
    pub fn is_settled(&self) -> bool {
        self.success && self.data.as_ref().is_some_and(|d| d.status == SETTLED_STATUS)
    }

    pub fn status(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.status.as_str())
    }
}

/// Remote service that prepares transfers and tracks their settlement.
#[async_trait]
pub trait BridgeApi: Send + Sync {
    fn create_tx_endpoint(&self, request: &BridgeRequest) -> String;

    /// Status endpoint without the transaction id.
    fn status_endpoint(&self, network: Network) -> String;

    async fn create_transaction(&self, request: &BridgeRequest) -> BridgeResult<CreateTxResponse>;

    async fn transaction_status(&self, tx: &TransactionId, network: Network) -> BridgeResult<StatusResponse>;
}
