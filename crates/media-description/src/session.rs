//! Session level media description and its builder

use serde::Serialize;
use std::collections::HashSet;
use tracing::{error, warn};

use crate::bundle::BundleGroup;
use crate::diff;
use crate::error::{DescriptionError, Result};
use crate::stream::StreamDescriptor;
use crate::types::{MediaProto, StreamDirection, StreamType};
use crate::NULL_ADDRESSES;

/// A complete offer or answer: session attributes plus ordered streams.
///
/// Stream order is significant. The stream at index `n` of an answer
/// answers the stream at index `n` of the offer, and the diff engine pairs
/// streams by index.
///
/// Instances are immutable. Use [`MediaSessionDescriptor::to_builder`] to
/// derive a modified copy.
#[derive(Debug, Clone, Serialize)]
pub struct MediaSessionDescriptor {
    address: String,
    bandwidth: u32,
    ice_ufrag: String,
    ice_pwd: String,
    ice_lite: bool,
    session_id: u64,
    session_version: u64,
    username: String,
    streams: Vec<StreamDescriptor>,
    bundles: Vec<BundleGroup>,
}

impl MediaSessionDescriptor {
    pub fn builder() -> MediaSessionDescriptorBuilder {
        MediaSessionDescriptorBuilder::default()
    }

    /// Starts a builder holding a copy of this descriptor
    pub fn to_builder(&self) -> MediaSessionDescriptorBuilder {
        MediaSessionDescriptorBuilder {
            address: self.address.clone(),
            bandwidth: self.bandwidth,
            ice_ufrag: self.ice_ufrag.clone(),
            ice_pwd: self.ice_pwd.clone(),
            ice_lite: self.ice_lite,
            session_id: self.session_id,
            session_version: self.session_version,
            username: self.username.clone(),
            streams: self.streams.clone(),
            bundles: self.bundles.clone(),
            pending_error: None,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn bandwidth(&self) -> u32 {
        self.bandwidth
    }

    pub fn ice_ufrag(&self) -> &str {
        &self.ice_ufrag
    }

    pub fn ice_pwd(&self) -> &str {
        &self.ice_pwd
    }

    pub fn ice_lite(&self) -> bool {
        self.ice_lite
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn session_version(&self) -> u64 {
        self.session_version
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn streams(&self) -> &[StreamDescriptor] {
        &self.streams
    }

    pub fn stream(&self, index: usize) -> Option<&StreamDescriptor> {
        self.streams.get(index)
    }

    pub fn nb_streams(&self) -> usize {
        self.streams.len()
    }

    pub fn bundles(&self) -> &[BundleGroup] {
        &self.bundles
    }

    fn enabled_streams(&self) -> impl Iterator<Item = &StreamDescriptor> {
        self.streams.iter().filter(|s| s.is_enabled())
    }

    pub fn is_null_address(addr: &str) -> bool {
        NULL_ADDRESSES.contains(&addr)
    }

    /// Direction a stream effectively runs in.
    ///
    /// A `sendrecv` stream whose session or stream address is a null address
    /// is read as `sendonly`: old phones put calls on hold that way without
    /// touching the direction attribute.
    pub fn effective_direction(&self, stream: &StreamDescriptor) -> StreamDirection {
        if stream.direction == StreamDirection::SendRecv
            && (Self::is_null_address(&self.address) || Self::is_null_address(&stream.rtp_addr))
        {
            StreamDirection::SendOnly
        } else {
            stream.direction
        }
    }

    /// Whether at least one enabled stream effectively runs in `direction`
    pub fn contains_stream_with_direction(&self, direction: StreamDirection) -> bool {
        self.enabled_streams()
            .any(|stream| self.effective_direction(stream) == direction)
    }

    /// Whether the session as a whole runs in `direction`
    pub fn has_direction(&self, direction: StreamDirection) -> bool {
        let has = |d| self.contains_stream_with_direction(d);
        match direction {
            StreamDirection::RecvOnly => {
                has(StreamDirection::RecvOnly) && !(has(StreamDirection::SendOnly) || has(StreamDirection::SendRecv))
            }
            StreamDirection::SendOnly => {
                has(StreamDirection::SendOnly) && !(has(StreamDirection::RecvOnly) || has(StreamDirection::SendRecv))
            }
            StreamDirection::SendRecv => has(StreamDirection::SendRecv),
            StreamDirection::Inactive => {
                !(has(StreamDirection::SendOnly) || has(StreamDirection::SendRecv) || has(StreamDirection::RecvOnly))
            }
        }
    }

    pub fn nb_active_streams(&self) -> usize {
        self.enabled_streams().count()
    }

    pub fn is_empty(&self) -> bool {
        self.nb_active_streams() == 0
    }

    pub fn nb_active_streams_of_type(&self, stream_type: StreamType) -> usize {
        self.enabled_streams().filter(|s| s.stream_type == stream_type).count()
    }

    /// The `index`-th enabled stream of `stream_type`
    pub fn active_stream_of_type(&self, stream_type: StreamType, index: usize) -> Option<&StreamDescriptor> {
        self.enabled_streams().filter(|s| s.stream_type == stream_type).nth(index)
    }

    /// First enabled stream with this exact protocol and type
    pub fn find_stream(&self, proto: MediaProto, stream_type: StreamType) -> Option<&StreamDescriptor> {
        self.enabled_streams()
            .find(|s| s.proto == proto && s.stream_type == stream_type)
    }

    /// SDES stream of `stream_type`, SAVPF preferred over SAVP
    pub fn find_secure_stream_of_type(&self, stream_type: StreamType) -> Option<&StreamDescriptor> {
        self.find_stream(MediaProto::RtpSavpf, stream_type)
            .or_else(|| self.find_stream(MediaProto::RtpSavp, stream_type))
    }

    /// Best enabled stream of `stream_type`, in this order of preference:
    /// DTLS-SRTP with feedback, DTLS-SRTP, SRTP with feedback, SRTP, AVPF,
    /// AVP.
    pub fn find_best_stream_of_type(&self, stream_type: StreamType) -> Option<&StreamDescriptor> {
        const PREFERENCE: [MediaProto; 6] = [
            MediaProto::DtlsSrtpSavpf,
            MediaProto::DtlsSrtpSavp,
            MediaProto::RtpSavpf,
            MediaProto::RtpSavp,
            MediaProto::RtpAvpf,
            MediaProto::RtpAvp,
        ];
        PREFERENCE
            .iter()
            .find_map(|proto| self.find_stream(*proto, stream_type))
    }

    /// Index of the stream carrying `mid`
    pub fn lookup_mid(&self, mid: &str) -> Option<usize> {
        self.streams.iter().position(|s| s.mid == mid)
    }

    pub fn bundle_from_mid(&self, mid: &str) -> Option<&BundleGroup> {
        self.bundles.iter().find(|b| b.contains(mid))
    }

    /// Index of the stream whose transport carries `stream`.
    ///
    /// `None` when the stream is not bundled, when its mid is in no bundle
    /// group (orphan stream) or when the group's transport owner is missing.
    /// The last two are logged but never fail the negotiation.
    pub fn index_of_bundle_transport_owner(&self, stream: &StreamDescriptor) -> Option<usize> {
        if stream.mid.is_empty() {
            return None;
        }
        let Some(bundle) = self.bundle_from_mid(&stream.mid) else {
            warn!(mid = %stream.mid, "Orphan stream with mid '{}'", stream.mid);
            return None;
        };
        let owner = bundle.transport_owner();
        let index = self.lookup_mid(owner);
        if index.is_none() {
            error!(
                mid = %stream.mid,
                owner = %owner,
                "Stream with mid '{}' has no transport owner (mid '{}')",
                stream.mid,
                owner
            );
        }
        index
    }

    /// True when every enabled stream uses an AVPF profile
    pub fn has_avpf(&self) -> bool {
        self.all_enabled(StreamDescriptor::supports_avpf)
    }

    pub fn has_implicit_avpf(&self) -> bool {
        self.all_enabled(StreamDescriptor::has_implicit_avpf)
    }

    /// True when any enabled stream uses SDES-SRTP
    pub fn has_srtp(&self) -> bool {
        self.enabled_streams().any(StreamDescriptor::supports_srtp)
    }

    pub fn has_dtls(&self) -> bool {
        self.all_enabled(StreamDescriptor::supports_dtls)
    }

    pub fn has_zrtp(&self) -> bool {
        self.all_enabled(StreamDescriptor::supports_zrtp)
    }

    /// True when every enabled stream runs over IPv6, looking at the session
    /// address for streams without an address of their own
    pub fn has_ipv6(&self) -> bool {
        if self.streams.is_empty() {
            return false;
        }
        self.enabled_streams().all(|s| {
            if s.rtp_addr.is_empty() {
                self.address.contains(':')
            } else {
                s.has_ipv6()
            }
        })
    }

    fn all_enabled(&self, predicate: impl Fn(&StreamDescriptor) -> bool) -> bool {
        !self.streams.is_empty() && self.enabled_streams().all(predicate)
    }
}

impl PartialEq for MediaSessionDescriptor {
    fn eq(&self, other: &Self) -> bool {
        diff::compare(self, other).is_empty()
    }
}

/// Builder for [`MediaSessionDescriptor`].
///
/// Invariants are only checked by [`MediaSessionDescriptorBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct MediaSessionDescriptorBuilder {
    address: String,
    bandwidth: u32,
    ice_ufrag: String,
    ice_pwd: String,
    ice_lite: bool,
    session_id: u64,
    session_version: u64,
    username: String,
    streams: Vec<StreamDescriptor>,
    bundles: Vec<BundleGroup>,
    pending_error: Option<DescriptionError>,
}

impl MediaSessionDescriptorBuilder {
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn bandwidth(mut self, kbps: u32) -> Self {
        self.bandwidth = kbps;
        self
    }

    pub fn ice_credentials(mut self, ufrag: impl Into<String>, pwd: impl Into<String>) -> Self {
        self.ice_ufrag = ufrag.into();
        self.ice_pwd = pwd.into();
        self
    }

    pub fn ice_lite(mut self, ice_lite: bool) -> Self {
        self.ice_lite = ice_lite;
        self
    }

    pub fn origin(mut self, username: impl Into<String>, session_id: u64, session_version: u64) -> Self {
        self.username = username.into();
        self.session_id = session_id;
        self.session_version = session_version;
        self
    }

    /// Bumps the o= version, as required for every new offer of a session
    pub fn next_version(mut self) -> Self {
        self.session_version += 1;
        self
    }

    pub fn stream(mut self, stream: StreamDescriptor) -> Self {
        self.streams.push(stream);
        self
    }

    pub fn streams(mut self, streams: impl IntoIterator<Item = StreamDescriptor>) -> Self {
        self.streams = streams.into_iter().collect();
        self
    }

    pub fn replace_stream(mut self, index: usize, stream: StreamDescriptor) -> Self {
        match self.streams.get_mut(index) {
            Some(slot) => *slot = stream,
            None => self.pending_error = Some(DescriptionError::NoSuchStream(index)),
        }
        self
    }

    /// Mutable access for in-place edits of the copy being built
    pub fn streams_mut(&mut self) -> &mut Vec<StreamDescriptor> {
        &mut self.streams
    }

    pub fn bundle(mut self, group: BundleGroup) -> Self {
        self.bundles.push(group);
        self
    }

    pub fn clear_bundles(mut self) -> Self {
        self.bundles.clear();
        self
    }

    /// Sets the direction of every enabled stream (hold / resume)
    pub fn with_direction(mut self, direction: StreamDirection) -> Self {
        for stream in self.streams.iter_mut().filter(|s| s.is_enabled()) {
            stream.direction = direction;
        }
        self
    }

    pub fn build(self) -> Result<MediaSessionDescriptor> {
        if let Some(err) = self.pending_error {
            return Err(err);
        }

        for (index, stream) in self.streams.iter().enumerate() {
            let mut seen = HashSet::new();
            for codec in &stream.codecs {
                if !seen.insert(codec.payload_number) {
                    return Err(DescriptionError::DuplicatePayloadNumber {
                        stream: index,
                        payload: codec.payload_number,
                    });
                }
            }
        }

        for group in &self.bundles {
            if group.is_empty() {
                return Err(DescriptionError::EmptyBundleGroup);
            }
            for mid in group.mids() {
                match self.streams.iter().filter(|s| &s.mid == mid).count() {
                    0 => return Err(DescriptionError::UnknownBundleMid(mid.clone())),
                    1 => {}
                    _ => return Err(DescriptionError::AmbiguousBundleMid(mid.clone())),
                }
            }
        }

        Ok(MediaSessionDescriptor {
            address: self.address,
            bandwidth: self.bandwidth,
            ice_ufrag: self.ice_ufrag,
            ice_pwd: self.ice_pwd,
            ice_lite: self.ice_lite,
            session_id: self.session_id,
            session_version: self.session_version,
            username: self.username,
            streams: self.streams,
            bundles: self.bundles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecOffer;

    fn stream(proto: MediaProto, port: u16) -> StreamDescriptor {
        StreamDescriptor::new(StreamType::Audio, proto)
            .with_rtp("192.0.2.1", port)
            .with_codec(CodecOffer::audio(0, "PCMU", 8000))
    }

    #[test]
    fn build_rejects_duplicate_payload_numbers() {
        let bad = stream(MediaProto::RtpAvp, 7078).with_codec(CodecOffer::audio(0, "PCMA", 8000));
        let err = MediaSessionDescriptor::builder().stream(bad).build().unwrap_err();
        assert_eq!(err, DescriptionError::DuplicatePayloadNumber { stream: 0, payload: 0 });
    }

    #[test]
    fn build_rejects_dangling_and_ambiguous_mids() {
        let err = MediaSessionDescriptor::builder()
            .stream(stream(MediaProto::RtpAvp, 7078).with_mid("as"))
            .bundle(BundleGroup::new(["as", "vs"]))
            .build()
            .unwrap_err();
        assert_eq!(err, DescriptionError::UnknownBundleMid("vs".into()));

        let err = MediaSessionDescriptor::builder()
            .stream(stream(MediaProto::RtpAvp, 7078).with_mid("as"))
            .stream(stream(MediaProto::RtpAvp, 7080).with_mid("as"))
            .bundle(BundleGroup::new(["as"]))
            .build()
            .unwrap_err();
        assert_eq!(err, DescriptionError::AmbiguousBundleMid("as".into()));
    }

    #[test]
    fn replace_out_of_range_fails_at_build() {
        let err = MediaSessionDescriptor::builder()
            .replace_stream(2, stream(MediaProto::RtpAvp, 7078))
            .build()
            .unwrap_err();
        assert_eq!(err, DescriptionError::NoSuchStream(2));
    }

    #[test]
    fn direction_ignores_disabled_streams() {
        let md = MediaSessionDescriptor::builder()
            .address("192.0.2.1")
            .stream(stream(MediaProto::RtpAvp, 7078).with_direction(StreamDirection::RecvOnly))
            .stream(stream(MediaProto::RtpAvp, 0))
            .build()
            .unwrap();
        assert!(md.has_direction(StreamDirection::RecvOnly));
        assert!(!md.has_direction(StreamDirection::SendRecv));
        assert!(!md.has_direction(StreamDirection::Inactive));
    }

    #[test]
    fn null_stream_address_counts_as_sendonly() {
        let md = MediaSessionDescriptor::builder()
            .address("192.0.2.1")
            .stream(stream(MediaProto::RtpAvp, 7078).with_rtp("::0", 7078))
            .build()
            .unwrap();
        assert!(md.contains_stream_with_direction(StreamDirection::SendOnly));
        assert!(!md.has_direction(StreamDirection::SendRecv));
        assert!(md.has_direction(StreamDirection::SendOnly));
    }

    #[test]
    fn active_streams_by_type() {
        let md = MediaSessionDescriptor::builder()
            .stream(stream(MediaProto::RtpAvp, 7078))
            .stream(stream(MediaProto::RtpAvp, 0))
            .stream(stream(MediaProto::RtpSavp, 7082))
            .stream(StreamDescriptor::new(StreamType::Video, MediaProto::RtpAvp).with_rtp("192.0.2.1", 9078))
            .build()
            .unwrap();
        assert_eq!(md.nb_active_streams(), 3);
        assert_eq!(md.nb_active_streams_of_type(StreamType::Audio), 2);
        assert_eq!(md.active_stream_of_type(StreamType::Audio, 1).map(|s| s.rtp_port), Some(7082));
        assert!(md.active_stream_of_type(StreamType::Audio, 2).is_none());
        assert_eq!(md.find_secure_stream_of_type(StreamType::Audio).map(|s| s.rtp_port), Some(7082));
        assert!(md.find_secure_stream_of_type(StreamType::Video).is_none());
    }

    #[test]
    fn session_wide_security_predicates() {
        let md = MediaSessionDescriptor::builder()
            .stream(stream(MediaProto::RtpSavpf, 7078))
            .stream(stream(MediaProto::RtpAvp, 7080))
            .build()
            .unwrap();
        assert!(md.has_srtp());
        assert!(!md.has_avpf());
        assert!(!md.has_dtls());

        let empty = MediaSessionDescriptor::builder().build().unwrap();
        assert!(!empty.has_avpf());
        assert!(!empty.has_ipv6());
        assert!(empty.is_empty());
    }

    #[test]
    fn ipv6_falls_back_to_session_address() {
        let mut bare = stream(MediaProto::RtpAvp, 7078);
        bare.rtp_addr.clear();
        let md = MediaSessionDescriptor::builder()
            .address("2001:db8::2")
            .stream(bare)
            .build()
            .unwrap();
        assert!(md.has_ipv6());
    }

    #[test]
    fn hold_rewrites_enabled_streams_only() {
        let md = MediaSessionDescriptor::builder()
            .stream(stream(MediaProto::RtpAvp, 7078))
            .stream(stream(MediaProto::RtpAvp, 0))
            .with_direction(StreamDirection::SendOnly)
            .build()
            .unwrap();
        assert_eq!(md.streams()[0].direction, StreamDirection::SendOnly);
        assert_eq!(md.streams()[1].direction, StreamDirection::SendRecv);
    }

    #[test]
    fn missing_transport_owner_is_not_fatal() {
        let md = MediaSessionDescriptor::builder()
            .stream(stream(MediaProto::RtpAvp, 7078).with_mid("as"))
            .bundle(BundleGroup::new(["as"]).with_transport_owner("gone"))
            .build()
            .unwrap();
        assert_eq!(md.index_of_bundle_transport_owner(&md.streams()[0]), None);
    }
}
