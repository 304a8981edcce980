//! Error types for NAT policy operations

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NatPolicyError {
    #[error("Invalid server address: {0}")]
    InvalidAddress(String),

    #[error("Resolution failed for {host}: {reason}")]
    ResolutionFailed { host: String, reason: String },

    #[error("No TURN configuration endpoint configured")]
    NoTurnEndpoint,

    #[error("Invalid TURN configuration endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("TURN configuration request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TURN configuration endpoint answered {0}")]
    UnexpectedStatus(u16),

    #[error("Malformed TURN configuration: {0}")]
    InvalidResponse(String),

    #[error("No async runtime available to run {0}")]
    NoRuntime(&'static str),
}

pub type Result<T> = std::result::Result<T, NatPolicyError>;
