//! Closed enumerations shared by stream and session descriptors
//!
//! Every predicate derived from these enums is written as an exhaustive
//! `match` without a wildcard arm, so adding a variant fails to compile until
//! each predicate has been revisited.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of media carried by a stream (the SDP `m=` media field)
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum StreamType {
    Audio,
    Video,
    Text,
    Other,
}

impl StreamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamType::Audio => "audio",
            StreamType::Video => "video",
            StreamType::Text => "text",
            StreamType::Other => "other",
        }
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamType {
    type Err = std::convert::Infallible;

    /// Unknown media names map to [`StreamType::Other`]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "audio" => StreamType::Audio,
            "video" => StreamType::Video,
            "text" => StreamType::Text,
            _ => StreamType::Other,
        })
    }
}

/// Transport protocol of a stream (the SDP `m=` proto field)
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum MediaProto {
    /// RTP/AVP
    RtpAvp,
    /// RTP/SAVP (SDES keyed SRTP)
    RtpSavp,
    /// RTP/AVPF
    RtpAvpf,
    /// RTP/SAVPF
    RtpSavpf,
    /// UDP/TLS/RTP/SAVP (DTLS-SRTP)
    DtlsSrtpSavp,
    /// UDP/TLS/RTP/SAVPF
    DtlsSrtpSavpf,
    /// Anything else; the literal token is kept on the stream
    Other,
}

impl MediaProto {
    /// SDP token for the protocol. `Other` renders as an empty string; the
    /// stream keeps the original token in `proto_other`.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaProto::RtpAvp => "RTP/AVP",
            MediaProto::RtpSavp => "RTP/SAVP",
            MediaProto::RtpAvpf => "RTP/AVPF",
            MediaProto::RtpSavpf => "RTP/SAVPF",
            MediaProto::DtlsSrtpSavp => "UDP/TLS/RTP/SAVP",
            MediaProto::DtlsSrtpSavpf => "UDP/TLS/RTP/SAVPF",
            MediaProto::Other => "",
        }
    }

    /// RTCP feedback profile (AVPF family)
    pub fn has_avpf(&self) -> bool {
        match self {
            MediaProto::RtpAvpf | MediaProto::RtpSavpf | MediaProto::DtlsSrtpSavpf => true,
            MediaProto::RtpAvp | MediaProto::RtpSavp | MediaProto::DtlsSrtpSavp | MediaProto::Other => false,
        }
    }

    /// SDES keyed SRTP. DTLS-SRTP is not counted here, see [`MediaProto::has_dtls`].
    pub fn has_srtp(&self) -> bool {
        match self {
            MediaProto::RtpSavp | MediaProto::RtpSavpf => true,
            MediaProto::RtpAvp
            | MediaProto::RtpAvpf
            | MediaProto::DtlsSrtpSavp
            | MediaProto::DtlsSrtpSavpf
            | MediaProto::Other => false,
        }
    }

    pub fn has_dtls(&self) -> bool {
        match self {
            MediaProto::DtlsSrtpSavp | MediaProto::DtlsSrtpSavpf => true,
            MediaProto::RtpAvp
            | MediaProto::RtpAvpf
            | MediaProto::RtpSavp
            | MediaProto::RtpSavpf
            | MediaProto::Other => false,
        }
    }

    /// Whether an offer in `self` can be answered in `other`: AVPF may be
    /// downgraded to AVP (and the reverse) within one security family.
    pub fn is_compatible_with(&self, other: MediaProto) -> bool {
        match self {
            MediaProto::RtpAvp | MediaProto::RtpAvpf => {
                matches!(other, MediaProto::RtpAvp | MediaProto::RtpAvpf)
            }
            MediaProto::RtpSavp | MediaProto::RtpSavpf => {
                matches!(other, MediaProto::RtpSavp | MediaProto::RtpSavpf)
            }
            MediaProto::DtlsSrtpSavp | MediaProto::DtlsSrtpSavpf => {
                matches!(other, MediaProto::DtlsSrtpSavp | MediaProto::DtlsSrtpSavpf)
            }
            MediaProto::Other => other == MediaProto::Other,
        }
    }
}

impl fmt::Display for MediaProto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaProto {
    type Err = std::convert::Infallible;

    /// Unknown tokens map to [`MediaProto::Other`]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "RTP/AVP" => MediaProto::RtpAvp,
            "RTP/SAVP" => MediaProto::RtpSavp,
            "RTP/AVPF" => MediaProto::RtpAvpf,
            "RTP/SAVPF" => MediaProto::RtpSavpf,
            "UDP/TLS/RTP/SAVP" => MediaProto::DtlsSrtpSavp,
            "UDP/TLS/RTP/SAVPF" => MediaProto::DtlsSrtpSavpf,
            _ => MediaProto::Other,
        })
    }
}

/// Media direction attribute of a stream
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum StreamDirection {
    SendRecv,
    SendOnly,
    RecvOnly,
    Inactive,
}

impl StreamDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamDirection::SendRecv => "sendrecv",
            StreamDirection::SendOnly => "sendonly",
            StreamDirection::RecvOnly => "recvonly",
            StreamDirection::Inactive => "inactive",
        }
    }

    /// The direction as seen from the other end of the stream
    pub fn reversed(&self) -> StreamDirection {
        match self {
            StreamDirection::SendOnly => StreamDirection::RecvOnly,
            StreamDirection::RecvOnly => StreamDirection::SendOnly,
            StreamDirection::SendRecv => StreamDirection::SendRecv,
            StreamDirection::Inactive => StreamDirection::Inactive,
        }
    }
}

impl Default for StreamDirection {
    fn default() -> Self {
        StreamDirection::SendRecv
    }
}

impl fmt::Display for StreamDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// DTLS `a=setup` role
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum DtlsRole {
    /// Not negotiated yet (`actpass` on an offer)
    Unset,
    Client,
    Server,
}

impl Default for DtlsRole {
    fn default() -> Self {
        DtlsRole::Unset
    }
}

/// Role of a stream in a multicast session
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum MulticastRole {
    Inactive,
    Sender,
    Receiver,
}

impl Default for MulticastRole {
    fn default() -> Self {
        MulticastRole::Inactive
    }
}
