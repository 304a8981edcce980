use thiserror::Error;

/// Errors raised by the logging and configuration layers
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration value or logging setup failure
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure while reading or writing a configuration file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is not valid TOML or has an unexpected shape
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration could not be rendered back to TOML
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Result type for infrastructure operations
pub type Result<T> = std::result::Result<T, Error>;
