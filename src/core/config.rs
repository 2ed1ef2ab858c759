use crate::core::domain::{Chain, Network};
use crate::core::errors::{BridgeError, BridgeResult};
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Bridge API endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL; testnet endpoints live under `{base_url}/testnet`
    #[serde(default = "ApiConfig::default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds)
    #[serde(default = "ApiConfig::default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl ApiConfig {
    fn default_base_url() -> String {
        "https://bridge-api.wanchain.org/api".to_string()
    }
    fn default_request_timeout() -> u64 { 15 }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            request_timeout_secs: Self::default_request_timeout(),
        }
    }
}

/// Settlement polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Delay between two status reads (milliseconds)
    #[serde(default = "PollingConfig::default_interval_ms")]
    pub interval_ms: u64,

    /// Give up after this many status reads. `None` polls until the duration bound.
    #[serde(default)]
    pub max_attempts: Option<u32>,

    /// Give up after this long (seconds). `None` polls until cancelled.
    #[serde(default = "PollingConfig::default_max_duration")]
    pub max_duration_secs: Option<u64>,

    /// Consecutive failed status reads tolerated before the submission fails
    #[serde(default = "PollingConfig::default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,
}

impl PollingConfig {
    fn default_interval_ms() -> u64 { 10_000 }
    fn default_max_duration() -> Option<u64> { Some(2 * 60 * 60) }
    fn default_max_consecutive_errors() -> u32 { 5 }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration_secs.map(Duration::from_secs)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: Self::default_interval_ms(),
            max_attempts: None,
            max_duration_secs: Self::default_max_duration(),
            max_consecutive_errors: Self::default_max_consecutive_errors(),
        }
    }
}

/// Amount requested when an allowance has to be raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalPolicy {
    /// Maximum `uint256`, so later transfers of the same token/spender need no approval.
    #[default]
    Unbounded,
    /// Exactly the amount the bridge asked for.
    Exact,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApprovalConfig {
    #[serde(default)]
    pub policy: ApprovalPolicy,
}

/// RPC endpoint and wallet-internal chain name of one Cosmos chain on one network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosmosChainEndpoint {
    /// Chain name the wallet knows the chain by (e.g. "noble-1")
    pub chain_name: String,
    pub rpc: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CosmosNetworks {
    pub mainnet: CosmosChainEndpoint,
    pub testnet: CosmosChainEndpoint,
}

/// Cosmos-SDK signing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CosmosConfig {
    /// Safety factor applied to simulated gas
    #[serde(default = "CosmosConfig::default_gas_multiplier")]
    pub gas_multiplier: Decimal,

    /// Fixed gas price such as "0.1uusdc"; when absent the wallet's average step is used
    #[serde(default)]
    pub gas_price: Option<String>,

    /// Blocks added to the current height to form the timeout height
    #[serde(default = "CosmosConfig::default_timeout_height_offset")]
    pub timeout_height_offset: Option<u64>,

    /// Keyed by chain identifier ("NOBLE", "KAVA")
    #[serde(default = "CosmosConfig::default_chains")]
    pub chains: BTreeMap<String, CosmosNetworks>,
}

impl CosmosConfig {
    fn default_gas_multiplier() -> Decimal {
        Decimal::new(15, 1)
    }
    fn default_timeout_height_offset() -> Option<u64> { Some(100) }

    fn default_chains() -> BTreeMap<String, CosmosNetworks> {
        let mut chains = BTreeMap::new();
        chains.insert(
            Chain::Noble.as_str().to_string(),
            CosmosNetworks {
                mainnet: CosmosChainEndpoint {
                    chain_name: "noble-1".to_string(),
                    rpc: "https://noble-rpc.polkachu.com".to_string(),
                },
                testnet: CosmosChainEndpoint {
                    chain_name: "grand-1".to_string(),
                    rpc: "https://noble-testnet-rpc.polkachu.com".to_string(),
                },
            },
        );
        chains.insert(
            Chain::Kava.as_str().to_string(),
            CosmosNetworks {
                mainnet: CosmosChainEndpoint {
                    chain_name: "kava_2222-10".to_string(),
                    rpc: "https://kava-rpc.polkachu.com".to_string(),
                },
                testnet: CosmosChainEndpoint {
                    chain_name: "kava_2221-16000".to_string(),
                    rpc: "https://kava-testnet-rpc.polkachu.com".to_string(),
                },
            },
        );
        chains
    }

    /// Resolves the endpoint for `chain` on `network`.
    pub fn endpoint(&self, chain: Chain, network: Network) -> BridgeResult<&CosmosChainEndpoint> {
        let networks = self.chains.get(chain.as_str()).ok_or_else(|| {
            BridgeError::ConfigError(format!("no Cosmos endpoint configured for {}", chain))
        })?;
        Ok(match network {
            Network::Mainnet => &networks.mainnet,
            Network::Testnet => &networks.testnet,
        })
    }
}

impl Default for CosmosConfig {
    fn default() -> Self {
        Self {
            gas_multiplier: Self::default_gas_multiplier(),
            gas_price: None,
            timeout_height_offset: Self::default_timeout_height_offset(),
            chains: Self::default_chains(),
        }
    }
}

/// Tron contract-call configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TronConfig {
    /// Fee ceiling in sun
    #[serde(default = "TronConfig::default_fee_limit")]
    pub fee_limit_sun: u64,

    /// Ask the wallet to poll for the result before returning
    #[serde(default = "TronConfig::default_poll_response")]
    pub poll_response: bool,
}

impl TronConfig {
    fn default_fee_limit() -> u64 { 300_000_000 }
    fn default_poll_response() -> bool { true }
}

impl Default for TronConfig {
    fn default() -> Self {
        Self { fee_limit_sun: Self::default_fee_limit(), poll_response: Self::default_poll_response() }
    }
}

/// Local-key EVM wallet configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvmConfig {
    /// JSON-RPC endpoints keyed by `0x` hex chain id
    #[serde(default = "EvmConfig::default_rpc_urls")]
    pub rpc_urls: BTreeMap<String, String>,

    /// Confirmations awaited before a transaction counts as included
    #[serde(default = "EvmConfig::default_confirmations")]
    pub confirmations: usize,

    /// Upper bound on one receipt wait (seconds)
    #[serde(default = "EvmConfig::default_receipt_timeout")]
    pub receipt_timeout_secs: u64,
}

impl EvmConfig {
    fn default_rpc_urls() -> BTreeMap<String, String> {
        let mut urls = BTreeMap::new();
        urls.insert("0x1".to_string(), "https://eth.llamarpc.com".to_string());
        urls.insert("0x38".to_string(), "https://bsc-dataseed.binance.org".to_string());
        urls.insert("0x89".to_string(), "https://polygon-rpc.com".to_string());
        urls.insert("0xa86a".to_string(), "https://api.avax.network/ext/bc/C/rpc".to_string());
        urls.insert("0xaa36a7".to_string(), "https://rpc.sepolia.org".to_string());
        urls
    }
    fn default_confirmations() -> usize { 1 }
    fn default_receipt_timeout() -> u64 { 300 }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }
}

impl Default for EvmConfig {
    fn default() -> Self {
        Self {
            rpc_urls: Self::default_rpc_urls(),
            confirmations: Self::default_confirmations(),
            receipt_timeout_secs: Self::default_receipt_timeout(),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeClientConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub approval: ApprovalConfig,
    #[serde(default)]
    pub cosmos: CosmosConfig,
    #[serde(default)]
    pub tron: TronConfig,
    #[serde(default)]
    pub evm: EvmConfig,
}

impl BridgeClientConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("invalid bridge client configuration")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded bridge client config from {}", path.display());
        Ok(config)
    }

    /// Loads `CONFIG_PATH` (default `bridge_client.toml`), falling back to
    /// defaults when the file is missing, then applies environment overrides.
    pub fn load_from_env() -> Result<Self> {
        let path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "bridge_client.toml".to_string());
        let mut config = if Path::new(&path).exists() {
            Self::load(&path)?
        } else {
            warn!("Config file {} not found. Using default configuration", path);
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(base) = std::env::var("BRIDGE_API_BASE") {
            let base = base.trim().trim_end_matches('/');
            if !base.is_empty() {
                self.api.base_url = base.to_string();
            }
        }
        if let Ok(raw) = std::env::var("BRIDGE_POLL_INTERVAL_SECS") {
            match poll_interval_ms(&raw) {
                Some(ms) => self.polling.interval_ms = ms,
                None => warn!("Ignoring invalid BRIDGE_POLL_INTERVAL_SECS={}", raw),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            anyhow::bail!("api.base_url must not be empty");
        }
        reqwest::Url::parse(&self.api.base_url)
            .with_context(|| format!("api.base_url '{}' is not a valid URL", self.api.base_url))?;
        if self.polling.interval_ms == 0 {
            anyhow::bail!("polling.interval_ms must be greater than zero");
        }
        if self.cosmos.gas_multiplier <= Decimal::ZERO {
            anyhow::bail!("cosmos.gas_multiplier must be positive");
        }
        Ok(())
    }
}

/// Seconds from the environment as milliseconds; `None` when unparsable or out of range.
fn poll_interval_ms(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok()?.checked_mul(1_000)
}
