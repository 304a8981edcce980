//! Error types for call sessions

use rvoip_media_description::DescriptionError;
use rvoip_nat_policy::NatPolicyError;
use std::fmt;

use crate::state_table::{CallEvent, CallState};

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Why an offer or answer could not be negotiated.
///
/// Every reason maps onto a SIP rejection the signaling layer sends back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// No codec in common on any stream
    NoCommonCodec,
    /// Transport profiles could not be reconciled (e.g. SAVP against AVP)
    IncompatibleTransport,
    /// SRTP was required but no crypto suite matched
    IncompatibleCrypto,
    /// The remote description broke a descriptor invariant
    InvalidDescription,
}

impl RejectReason {
    /// SIP status code carried by the rejection
    pub fn status_code(&self) -> u16 {
        match self {
            RejectReason::NoCommonCodec
            | RejectReason::IncompatibleTransport
            | RejectReason::IncompatibleCrypto
            | RejectReason::InvalidDescription => 488,
        }
    }

    pub fn reason_phrase(&self) -> &'static str {
        "Not Acceptable Here"
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            RejectReason::NoCommonCodec => "no common codec",
            RejectReason::IncompatibleTransport => "incompatible transport",
            RejectReason::IncompatibleCrypto => "no matching crypto suite",
            RejectReason::InvalidDescription => "invalid media description",
        };
        write!(f, "{} {} ({})", self.status_code(), self.reason_phrase(), what)
    }
}

/// Session errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Event {event:?} is not allowed in state {state:?}")]
    InvalidTransition { state: CallState, event: CallEvent },

    #[error("Media negotiation failed: {reason}")]
    NegotiationFailed { reason: RejectReason },

    #[error("No {0} description to work with")]
    MissingDescription(&'static str),

    #[error("Invalid media description: {0}")]
    Description(#[from] DescriptionError),

    #[error("NAT policy error: {0}")]
    NatPolicy(#[from] NatPolicyError),

    #[error("Media stream error: {message}")]
    Media { message: String },
}

impl SessionError {
    /// Error raised by a [`MediaStreamController`](crate::media::MediaStreamController)
    pub fn media(message: impl Into<String>) -> Self {
        Self::Media { message: message.into() }
    }

    /// Protocol level rejection, if this error carries one. A description
    /// that breaks an invariant while negotiating is rejected as invalid.
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            SessionError::NegotiationFailed { reason } => Some(*reason),
            SessionError::Description(_) => Some(RejectReason::InvalidDescription),
            _ => None,
        }
    }
}
