pub mod allowance;
pub mod codec;
pub mod ethereum;
pub mod providers;
pub mod registry;
pub mod traits;
pub mod wallets;

pub use allowance::{AllowanceNegotiator, AllowanceOutcome};
pub use ethereum::LocalKeyEvmProvider;
pub use registry::ProviderRegistry;
pub use traits::{ProviderError, SubmissionContext, TokenAllowance, WalletAdapter};
pub use wallets::WalletAdapters;
