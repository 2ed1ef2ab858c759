pub mod logging;

pub use logging::{LogEntry, LogEvent, OperationLog, Severity};
