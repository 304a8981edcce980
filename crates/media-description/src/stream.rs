//! Stream descriptor: one `m=` section of an offer or answer

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::codec::CodecOffer;
use crate::crypto::CryptoAttribute;
use crate::types::{DtlsRole, MediaProto, MulticastRole, StreamDirection, StreamType};

/// Transport, codec and security attributes of one media stream.
///
/// Fields are public so parsers and offer/answer code can fill them, but a
/// descriptor attached to a built [`MediaSessionDescriptor`] can only be
/// changed by building a new session descriptor.
///
/// [`MediaSessionDescriptor`]: crate::MediaSessionDescriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub name: String,
    pub stream_type: StreamType,
    /// Media token when `stream_type` is `Other`
    pub type_other: String,
    pub proto: MediaProto,
    /// Proto token when `proto` is `Other`
    pub proto_other: String,
    pub direction: StreamDirection,
    pub rtp_addr: String,
    pub rtp_port: u16,
    pub rtcp_addr: String,
    pub rtcp_port: u16,
    pub rtcp_mux: bool,
    /// Payloads in preference order
    pub codecs: Vec<CodecOffer>,
    /// b=AS in kbit/s, 0 when absent
    pub bandwidth: u32,
    pub ptime_ms: u32,
    pub max_ptime_ms: u32,
    pub ice_ufrag: String,
    pub ice_pwd: String,
    pub dtls_role: DtlsRole,
    pub dtls_fingerprint: String,
    pub crypto: Vec<CryptoAttribute>,
    pub zrtp_hash_present: bool,
    pub lime_ik_present: bool,
    pub implicit_rtcp_fb: bool,
    pub multicast_role: MulticastRole,
    pub ttl: u8,
    /// BUNDLE mid, empty when not bundled
    pub mid: String,
    pub bundle_only: bool,
}

impl StreamDescriptor {
    pub fn new(stream_type: StreamType, proto: MediaProto) -> Self {
        Self {
            name: String::new(),
            stream_type,
            type_other: String::new(),
            proto,
            proto_other: String::new(),
            direction: StreamDirection::SendRecv,
            rtp_addr: String::new(),
            rtp_port: 0,
            rtcp_addr: String::new(),
            rtcp_port: 0,
            rtcp_mux: false,
            codecs: Vec::new(),
            bandwidth: 0,
            ptime_ms: 0,
            max_ptime_ms: 0,
            ice_ufrag: String::new(),
            ice_pwd: String::new(),
            dtls_role: DtlsRole::Unset,
            dtls_fingerprint: String::new(),
            crypto: Vec::new(),
            zrtp_hash_present: false,
            lime_ik_present: false,
            implicit_rtcp_fb: false,
            multicast_role: MulticastRole::Inactive,
            ttl: 0,
            mid: String::new(),
            bundle_only: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_rtp(mut self, addr: impl Into<String>, port: u16) -> Self {
        self.rtp_addr = addr.into();
        self.rtp_port = port;
        self
    }

    pub fn with_rtcp(mut self, addr: impl Into<String>, port: u16) -> Self {
        self.rtcp_addr = addr.into();
        self.rtcp_port = port;
        self
    }

    pub fn with_rtcp_mux(mut self, rtcp_mux: bool) -> Self {
        self.rtcp_mux = rtcp_mux;
        self
    }

    pub fn with_direction(mut self, direction: StreamDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_codec(mut self, codec: CodecOffer) -> Self {
        self.codecs.push(codec);
        self
    }

    pub fn with_codecs(mut self, codecs: impl IntoIterator<Item = CodecOffer>) -> Self {
        self.codecs = codecs.into_iter().collect();
        self
    }

    pub fn with_bandwidth(mut self, kbps: u32) -> Self {
        self.bandwidth = kbps;
        self
    }

    pub fn with_ptime(mut self, ptime_ms: u32) -> Self {
        self.ptime_ms = ptime_ms;
        self
    }

    pub fn with_ice_credentials(mut self, ufrag: impl Into<String>, pwd: impl Into<String>) -> Self {
        self.ice_ufrag = ufrag.into();
        self.ice_pwd = pwd.into();
        self
    }

    pub fn with_dtls(mut self, role: DtlsRole, fingerprint: impl Into<String>) -> Self {
        self.dtls_role = role;
        self.dtls_fingerprint = fingerprint.into();
        self
    }

    pub fn with_crypto(mut self, crypto: CryptoAttribute) -> Self {
        self.crypto.push(crypto);
        self
    }

    pub fn with_zrtp_hash(mut self, present: bool) -> Self {
        self.zrtp_hash_present = present;
        self
    }

    pub fn with_lime_ik(mut self, present: bool) -> Self {
        self.lime_ik_present = present;
        self
    }

    pub fn with_implicit_rtcp_fb(mut self, implicit: bool) -> Self {
        self.implicit_rtcp_fb = implicit;
        self
    }

    pub fn with_multicast(mut self, role: MulticastRole, ttl: u8) -> Self {
        self.multicast_role = role;
        self.ttl = ttl;
        self
    }

    pub fn with_mid(mut self, mid: impl Into<String>) -> Self {
        self.mid = mid.into();
        self
    }

    pub fn with_bundle_only(mut self, bundle_only: bool) -> Self {
        self.bundle_only = bundle_only;
        self
    }

    /// A stream is enabled when it has a port, or rides on a BUNDLE
    /// transport with `a=bundle-only`.
    pub fn is_enabled(&self) -> bool {
        self.rtp_port > 0 || self.bundle_only
    }

    /// Port 0 and out of any bundle
    pub fn disable(&mut self) {
        self.rtp_port = 0;
        self.mid.clear();
        self.bundle_only = false;
    }

    pub fn supports_avpf(&self) -> bool {
        self.proto.has_avpf()
    }

    pub fn has_implicit_avpf(&self) -> bool {
        self.implicit_rtcp_fb
    }

    pub fn supports_srtp(&self) -> bool {
        self.proto.has_srtp()
    }

    pub fn supports_dtls(&self) -> bool {
        self.proto.has_dtls()
    }

    pub fn supports_zrtp(&self) -> bool {
        self.zrtp_hash_present
    }

    pub fn supports_lime(&self) -> bool {
        self.lime_ik_present
    }

    /// True when the RTP address is an IPv6 literal
    pub fn has_ipv6(&self) -> bool {
        self.rtp_addr.contains(':')
    }

    /// True when the RTP address is a multicast group
    pub fn has_multicast_address(&self) -> bool {
        self.rtp_addr
            .parse::<IpAddr>()
            .map(|ip| ip.is_multicast())
            .unwrap_or(false)
    }

    pub fn type_as_string(&self) -> &str {
        match self.stream_type {
            StreamType::Other => &self.type_other,
            StreamType::Audio | StreamType::Video | StreamType::Text => self.stream_type.as_str(),
        }
    }

    pub fn proto_as_string(&self) -> &str {
        match self.proto {
            MediaProto::Other => &self.proto_other,
            MediaProto::RtpAvp
            | MediaProto::RtpSavp
            | MediaProto::RtpAvpf
            | MediaProto::RtpSavpf
            | MediaProto::DtlsSrtpSavp
            | MediaProto::DtlsSrtpSavpf => self.proto.as_str(),
        }
    }

    pub fn is_bundled(&self) -> bool {
        !self.mid.is_empty()
    }

    pub fn find_codec(&self, payload_number: u8) -> Option<&CodecOffer> {
        self.codecs.iter().find(|c| c.payload_number == payload_number)
    }
}
