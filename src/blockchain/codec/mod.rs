//! Chain-specific payload codecs used by the wallet adapters.

pub mod cardano;
pub mod cosmos;
pub mod solana;
pub mod tron;
