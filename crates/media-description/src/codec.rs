//! Codec entries of a stream's payload list

use serde::{Deserialize, Serialize};
use std::fmt;

/// Payload class, as used by RTP profiles (RFC 3551 "A" / "V" types)
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum PayloadKind {
    /// Sample based audio (PCMU, L16, ...)
    AudioContinuous,
    /// Frame based audio (Opus, G729, ...)
    AudioPacketized,
    Video,
    Text,
    Other,
}

/// One entry of an offered or answered payload list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecOffer {
    pub payload_number: u8,
    pub mime_type: String,
    pub clock_rate: u32,
    pub channels: u8,
    /// fmtp we want to receive with
    pub recv_fmtp: Option<String>,
    /// fmtp the peer asked us to send with
    pub send_fmtp: Option<String>,
    pub kind: PayloadKind,
    pub can_send: bool,
    pub can_recv: bool,
}

impl CodecOffer {
    pub fn new(payload_number: u8, mime_type: impl Into<String>, clock_rate: u32, kind: PayloadKind) -> Self {
        Self {
            payload_number,
            mime_type: mime_type.into(),
            clock_rate,
            channels: 1,
            recv_fmtp: None,
            send_fmtp: None,
            kind,
            can_send: true,
            can_recv: true,
        }
    }

    /// Mono audio codec usable in both directions
    pub fn audio(payload_number: u8, mime_type: impl Into<String>, clock_rate: u32) -> Self {
        Self::new(payload_number, mime_type, clock_rate, PayloadKind::AudioPacketized)
    }

    pub fn video(payload_number: u8, mime_type: impl Into<String>) -> Self {
        Self::new(payload_number, mime_type, 90000, PayloadKind::Video)
    }

    pub fn with_channels(mut self, channels: u8) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_recv_fmtp(mut self, fmtp: impl Into<String>) -> Self {
        self.recv_fmtp = Some(fmtp.into());
        self
    }

    pub fn with_send_fmtp(mut self, fmtp: impl Into<String>) -> Self {
        self.send_fmtp = Some(fmtp.into());
        self
    }

    /// Marks the payload as receive only. Such payloads are appended to
    /// answers for peers that switch codecs without a new offer.
    pub fn recv_only(mut self) -> Self {
        self.can_send = false;
        self.can_recv = true;
        self
    }

    pub fn is_recv_only(&self) -> bool {
        self.can_recv && !self.can_send
    }

    /// telephone-event and comfort noise carry no media of their own
    pub fn is_auxiliary(&self) -> bool {
        self.mime_type.eq_ignore_ascii_case("telephone-event") || self.mime_type.eq_ignore_ascii_case("CN")
    }

    /// Same codec regardless of payload number or fmtp: mime type (case
    /// insensitive), clock rate and channel count.
    pub fn matches(&self, other: &CodecOffer) -> bool {
        self.mime_type.eq_ignore_ascii_case(&other.mime_type)
            && self.clock_rate == other.clock_rate
            && self.channels == other.channels
    }
}

impl fmt::Display for CodecOffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.payload_number, self.mime_type, self.clock_rate)?;
        if self.channels > 1 {
            write!(f, "/{}", self.channels)?;
        }
        Ok(())
    }
}
