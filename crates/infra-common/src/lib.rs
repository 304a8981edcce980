//! Common infrastructure shared by the RVOIP negotiation crates.
//!
//! - [`logging`]: `tracing-subscriber` setup used by binaries and test suites
//! - [`config`]: the sectioned key/value store NAT policies and accounts persist into
//! - [`errors`]: the infrastructure error type

pub mod config;
pub mod errors;
pub mod logging;

pub use config::ConfigStore;
pub use errors::{Error, Result};
pub use logging::{setup_logging, LoggingConfig};
