//! Error types for descriptor construction

use thiserror::Error;

/// Invariant violations detected when building a descriptor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptionError {
    /// Two codecs of one stream share a payload number
    #[error("Stream {stream} offers payload number {payload} more than once")]
    DuplicatePayloadNumber { stream: usize, payload: u8 },

    /// A bundle group names a mid no stream carries
    #[error("Bundle group references unknown mid '{0}'")]
    UnknownBundleMid(String),

    /// A bundle group names a mid carried by several streams
    #[error("Mid '{0}' is carried by more than one stream")]
    AmbiguousBundleMid(String),

    /// A bundle group has no mids at all
    #[error("Bundle group is empty")]
    EmptyBundleGroup,

    /// Stream index out of range for the descriptor being edited
    #[error("No stream at index {0}")]
    NoSuchStream(usize),
}

/// Result type for descriptor operations
pub type Result<T> = std::result::Result<T, DescriptionError>;
