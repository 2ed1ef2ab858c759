//! Wallet adapters: one `WalletAdapter` per chain family, built over the
//! providers found in a `ProviderRegistry`.

pub mod cardano;
pub mod cosmos;
pub mod evm;
pub mod solana;
pub mod tron;
pub mod utxo;
pub mod vechain;

use std::collections::HashMap;
use std::sync::Arc;

use super::registry::ProviderRegistry;
use super::traits::WalletAdapter;
use crate::core::config::BridgeClientConfig;
use crate::core::domain::{Chain, ChainFamily};
use crate::core::errors::{BridgeError, BridgeResult};

pub use cardano::CardanoWallet;
pub use cosmos::CosmosWallet;
pub use evm::EvmWallet;
pub use solana::SolanaWallet;
pub use tron::TronWallet;
pub use utxo::UtxoWallet;
pub use vechain::VeChainWallet;

/// Resolves a detected provider or reports the family's wallet as missing.
pub(crate) fn require<T: ?Sized>(provider: &Option<Arc<T>>, family: ChainFamily) -> BridgeResult<&Arc<T>> {
    provider.as_ref().ok_or_else(|| BridgeError::wallet_not_found(family.wallet_name()))
}

/// Adapter lookup by chain family. Every family always has an adapter; a
/// family without a detected provider fails at `connect`.
#[derive(Clone)]
pub struct WalletAdapters {
    adapters: HashMap<ChainFamily, Arc<dyn WalletAdapter>>,
}

impl WalletAdapters {
    pub fn new(registry: &ProviderRegistry, config: &BridgeClientConfig) -> Self {
        let adapters: [Arc<dyn WalletAdapter>; 7] = [
            Arc::new(EvmWallet::new(registry.evm.clone())),
            Arc::new(UtxoWallet::new(registry.utxo.clone())),
            Arc::new(SolanaWallet::new(registry.solana.clone())),
            Arc::new(CardanoWallet::new(registry.cardano.clone())),
            Arc::new(CosmosWallet::new(registry.cosmos.clone(), config.cosmos.clone())),
            Arc::new(TronWallet::new(registry.tron.clone(), config.tron.clone())),
            Arc::new(VeChainWallet::new(registry.vechain.clone())),
        ];
        Self { adapters: adapters.into_iter().map(|a| (a.family(), a)).collect() }
    }

    /// Replaces the adapter for its family.
    pub fn with_adapter(mut self, adapter: Arc<dyn WalletAdapter>) -> Self {
        self.adapters.insert(adapter.family(), adapter);
        self
    }

    pub fn for_family(&self, family: ChainFamily) -> BridgeResult<Arc<dyn WalletAdapter>> {
        self.adapters
            .get(&family)
            .cloned()
            .ok_or_else(|| BridgeError::wallet_not_found(family.wallet_name()))
    }

    pub fn for_chain(&self, chain: Chain) -> BridgeResult<Arc<dyn WalletAdapter>> {
        self.for_family(chain.family())
    }
}

impl std::fmt::Debug for WalletAdapters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletAdapters").field("families", &self.adapters.keys().collect::<Vec<_>>()).finish()
    }
}
