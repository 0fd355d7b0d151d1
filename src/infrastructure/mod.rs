//! Infrastructure concerns shared by the agent process.

pub mod logging;

pub use logging::{LogFormat, LoggingConfig, LoggingError};
