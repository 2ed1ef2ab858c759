// src/blockchain/registry.rs
//! Explicit set of detected wallet providers, passed to the wallet adapters
//! instead of looking them up in ambient global state.

use std::sync::Arc;

use super::providers::{
    CardanoProvider, CosmosProvider, EvmProvider, SolanaProvider, TronProvider, UtxoProvider,
    VeChainProvider,
};
use crate::core::domain::ChainFamily;

/// One optional provider per chain family. A missing provider surfaces as
/// `WalletNotFound` when a submission needs it.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    pub evm: Option<Arc<dyn EvmProvider>>,
    pub utxo: Option<Arc<dyn UtxoProvider>>,
    pub solana: Option<Arc<dyn SolanaProvider>>,
    pub cardano: Option<Arc<dyn CardanoProvider>>,
    pub cosmos: Option<Arc<dyn CosmosProvider>>,
    pub tron: Option<Arc<dyn TronProvider>>,
    pub vechain: Option<Arc<dyn VeChainProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_evm(mut self, provider: Arc<dyn EvmProvider>) -> Self {
        self.evm = Some(provider);
        self
    }

    pub fn with_utxo(mut self, provider: Arc<dyn UtxoProvider>) -> Self {
        self.utxo = Some(provider);
        self
    }

    pub fn with_solana(mut self, provider: Arc<dyn SolanaProvider>) -> Self {
        self.solana = Some(provider);
        self
    }

    pub fn with_cardano(mut self, provider: Arc<dyn CardanoProvider>) -> Self {
        self.cardano = Some(provider);
        self
    }

    pub fn with_cosmos(mut self, provider: Arc<dyn CosmosProvider>) -> Self {
        self.cosmos = Some(provider);
        self
    }

    pub fn with_tron(mut self, provider: Arc<dyn TronProvider>) -> Self {
        self.tron = Some(provider);
        self
    }

    pub fn with_vechain(mut self, provider: Arc<dyn VeChainProvider>) -> Self {
        self.vechain = Some(provider);
        self
    }

    /// Whether a provider for `family` was detected.
    fn has(&self, family: ChainFamily) -> bool {
        match family {
            ChainFamily::Evm => self.evm.is_some(),
            ChainFamily::Utxo => self.utxo.is_some(),
            ChainFamily::Solana => self.solana.is_some(),
            ChainFamily::Cardano => self.cardano.is_some(),
            ChainFamily::Cosmos => self.cosmos.is_some(),
            ChainFamily::Tron => self.tron.is_some(),
            ChainFamily::VeChain => self.vechain.is_some(),
        }
    }

    pub fn detected(&self) -> Vec<ChainFamily> {
        ChainFamily::ALL.iter().copied().filter(|f| self.has(*f)).collect()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry").field("detected", &self.detected()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::providers::{ProviderResult, UtxoNetworkMode};
    use async_trait::async_trait;

    struct NoopUtxo;

    #[async_trait]
    impl UtxoProvider for NoopUtxo {
        async fn request_accounts(&self) -> ProviderResult<Vec<String>> {
            Ok(vec![])
        }
        async fn switch_network(&self, _mode: UtxoNetworkMode) -> ProviderResult<()> {
            Ok(())
        }
        async fn send_bitcoin(&self, _to: &str, _sats: u64, _memo: Option<&str>) -> ProviderResult<String> {
            Ok(String::new())
        }
    }

    #[test]
    fn detected_lists_registered_families_only() {
        assert!(ProviderRegistry::new().detected().is_empty());
        let registry = ProviderRegistry::new().with_utxo(Arc::new(NoopUtxo));
        assert_eq!(registry.detected(), vec![ChainFamily::Utxo]);
        assert!(format!("{:?}", registry).contains("Utxo"));
    }
}
