pub mod abi;
pub mod config;
pub mod domain;
pub mod errors;
pub mod notify;
pub mod orchestrator;

pub use errors::{BridgeError, BridgeResult};
pub use orchestrator::{Orchestrator, SubmissionOutcome};
