//! Logging setup built on `tracing-subscriber`

mod setup;

pub use setup::{init_test_logging, log_welcome, parse_log_level, setup_logging, LoggingConfig};
