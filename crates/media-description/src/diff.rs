//! Change classification between two negotiation rounds
//!
//! [`compare`] tells a call session what kind of work a new description
//! implies. Network only changes move endpoints of running streams, codec and
//! crypto changes rebuild them, and ICE credential changes restart ICE.

use bitflags::bitflags;
use std::net::IpAddr;
use tracing::debug;

use crate::codec::CodecOffer;
use crate::session::MediaSessionDescriptor;
use crate::stream::StreamDescriptor;

bitflags! {
    /// What changed between a previous and a current description
    pub struct ChangeFlags: u32 {
        const NETWORK_CHANGED = 1;
        const CODEC_CHANGED = 1 << 1;
        const CRYPTO_KEYS_CHANGED = 1 << 2;
        const CRYPTO_POLICY_CHANGED = 1 << 3;
        const STREAMS_CHANGED = 1 << 4;
        /// Unicast to multicast or the reverse
        const NETWORK_XXXCAST_CHANGED = 1 << 5;
        /// Never produced by the comparison itself; added by a session that
        /// wants its streams rebuilt regardless
        const FORCE_STREAM_RECONSTRUCTION = 1 << 6;
        const ICE_RESTART_DETECTED = 1 << 7;
    }
}

impl ChangeFlags {
    /// Space separated flag names, `NONE` when empty
    pub fn describe(&self) -> String {
        print_differences(self.bits())
    }
}

impl Default for ChangeFlags {
    fn default() -> Self {
        ChangeFlags::empty()
    }
}

/// Display order of the flag names
const NAMES: [(ChangeFlags, &str); 8] = [
    (ChangeFlags::CODEC_CHANGED, "CODEC_CHANGED"),
    (ChangeFlags::NETWORK_CHANGED, "NETWORK_CHANGED"),
    (ChangeFlags::ICE_RESTART_DETECTED, "ICE_RESTART_DETECTED"),
    (ChangeFlags::CRYPTO_KEYS_CHANGED, "CRYPTO_KEYS_CHANGED"),
    (ChangeFlags::NETWORK_XXXCAST_CHANGED, "NETWORK_XXXCAST_CHANGED"),
    (ChangeFlags::STREAMS_CHANGED, "STREAMS_CHANGED"),
    (ChangeFlags::CRYPTO_POLICY_CHANGED, "CRYPTO_POLICY_CHANGED"),
    (ChangeFlags::FORCE_STREAM_RECONSTRUCTION, "FORCE_STREAM_RECONSTRUCTION"),
];

/// Renders a raw change bitmask for logs.
///
/// # Panics
///
/// Panics when `bits` holds a bit that has no name. That means a flag was
/// added without updating this function.
pub fn print_differences(bits: u32) -> String {
    let mut remaining = bits;
    let mut names = Vec::new();
    for (flag, name) in NAMES {
        if remaining & flag.bits() != 0 {
            names.push(name);
            remaining &= !flag.bits();
        }
    }
    if remaining != 0 {
        panic!(
            "unhandled change bits {:#x} in print_differences(), every flag must be named",
            remaining
        );
    }
    if names.is_empty() {
        "NONE".to_string()
    } else {
        names.join(" ")
    }
}

/// Full comparison: session attributes, then streams paired by index.
///
/// Pairs where both streams are disabled are skipped. Flags from all pairs
/// are merged.
pub fn compare(previous: &MediaSessionDescriptor, current: &MediaSessionDescriptor) -> ChangeFlags {
    let mut flags = compare_global(previous, current);
    for (old, new) in previous.streams().iter().zip(current.streams()) {
        if !old.is_enabled() && !new.is_enabled() {
            continue;
        }
        flags |= compare_streams(old, new);
    }
    flags
}

/// Session level attributes only
pub fn compare_global(previous: &MediaSessionDescriptor, current: &MediaSessionDescriptor) -> ChangeFlags {
    let mut flags = ChangeFlags::empty();

    if previous.address() != current.address() {
        flags |= ChangeFlags::NETWORK_CHANGED;
    }
    if cast_mode_differs(previous.address(), current.address()) {
        flags |= ChangeFlags::NETWORK_XXXCAST_CHANGED;
    }
    if previous.nb_streams() != current.nb_streams() {
        flags |= ChangeFlags::STREAMS_CHANGED;
    }
    if previous.bandwidth() != current.bandwidth() {
        flags |= ChangeFlags::CODEC_CHANGED;
    }
    if ice_restarted(previous.ice_ufrag(), current.ice_ufrag())
        || ice_restarted(previous.ice_pwd(), current.ice_pwd())
    {
        flags |= ChangeFlags::ICE_RESTART_DETECTED;
    }

    flags
}

/// One stream slot of two consecutive rounds
pub fn compare_streams(previous: &StreamDescriptor, current: &StreamDescriptor) -> ChangeFlags {
    let mut flags = ChangeFlags::empty();

    // Switching security profile still needs a stream restart, so a proto
    // change is a codec change rather than a network one.
    if previous.proto != current.proto {
        flags |= ChangeFlags::CODEC_CHANGED;
    }

    for (old, new) in previous.crypto.iter().zip(&current.crypto) {
        if !old.same_policy(new) {
            flags |= ChangeFlags::CRYPTO_POLICY_CHANGED;
        }
        if !old.same_key(new) {
            flags |= ChangeFlags::CRYPTO_KEYS_CHANGED;
        }
    }
    if previous.crypto.len() != current.crypto.len() {
        flags |= ChangeFlags::CRYPTO_POLICY_CHANGED | ChangeFlags::CRYPTO_KEYS_CHANGED;
    }

    if previous.stream_type != current.stream_type {
        flags |= ChangeFlags::CODEC_CHANGED;
    }

    if previous.rtp_addr != current.rtp_addr {
        flags |= ChangeFlags::NETWORK_CHANGED;
    }
    if cast_mode_differs(&previous.rtp_addr, &current.rtp_addr) {
        flags |= ChangeFlags::NETWORK_XXXCAST_CHANGED;
    }
    if previous.multicast_role != current.multicast_role {
        flags |= ChangeFlags::NETWORK_XXXCAST_CHANGED;
    }

    if previous.rtp_port != current.rtp_port {
        if previous.rtp_port == 0 || current.rtp_port == 0 {
            flags |= ChangeFlags::CODEC_CHANGED;
        } else {
            flags |= ChangeFlags::NETWORK_CHANGED;
        }
    }
    if previous.rtcp_addr != current.rtcp_addr || previous.rtcp_port != current.rtcp_port {
        flags |= ChangeFlags::NETWORK_CHANGED;
    }

    if !payload_lists_equal(&previous.codecs, &current.codecs) {
        flags |= ChangeFlags::CODEC_CHANGED;
    }
    if previous.bandwidth != current.bandwidth
        || previous.ptime_ms != current.ptime_ms
        || previous.direction != current.direction
    {
        flags |= ChangeFlags::CODEC_CHANGED;
    }

    if ice_restarted(&previous.ice_ufrag, &current.ice_ufrag) || ice_restarted(&previous.ice_pwd, &current.ice_pwd) {
        flags |= ChangeFlags::ICE_RESTART_DETECTED;
    }

    if previous.dtls_role != current.dtls_role || previous.dtls_fingerprint != current.dtls_fingerprint {
        flags |= ChangeFlags::CRYPTO_KEYS_CHANGED;
    }

    flags
}

/// Ordered payload list equality.
///
/// Entries are compared pairwise on kind, mime type, clock rate, channels and
/// payload number. fmtp is ignored since it gets rewritten once media runs.
/// The longer list may only extend the other with receive only payloads.
pub fn payload_lists_equal(previous: &[CodecOffer], current: &[CodecOffer]) -> bool {
    let common = previous.len().min(current.len());
    let same_prefix = previous
        .iter()
        .zip(current)
        .all(|(a, b)| same_payload(a, b));
    if !same_prefix {
        return false;
    }

    let tail = if previous.len() > common {
        &previous[common..]
    } else {
        &current[common..]
    };
    tail.iter().all(|codec| {
        if codec.is_recv_only() {
            debug!(payload = codec.payload_number, "Skipping recv-only payload type {}", codec);
            true
        } else {
            false
        }
    })
}

fn same_payload(a: &CodecOffer, b: &CodecOffer) -> bool {
    a.kind == b.kind
        && a.mime_type.eq_ignore_ascii_case(&b.mime_type)
        && a.clock_rate == b.clock_rate
        && a.channels == b.channels
        && a.payload_number == b.payload_number
}

/// An empty new credential means ICE was turned off, not restarted
fn ice_restarted(previous: &str, current: &str) -> bool {
    previous != current && !current.is_empty()
}

fn cast_mode_differs(previous: &str, current: &str) -> bool {
    !previous.is_empty() && !current.is_empty() && is_multicast(previous) != is_multicast(current)
}

fn is_multicast(addr: &str) -> bool {
    addr.parse::<IpAddr>().map(|ip| ip.is_multicast()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{CryptoAttribute, CryptoSuite};
    use crate::types::{MediaProto, MulticastRole, StreamType};

    fn audio() -> StreamDescriptor {
        StreamDescriptor::new(StreamType::Audio, MediaProto::RtpAvp)
            .with_rtp("192.0.2.1", 7078)
            .with_codec(CodecOffer::audio(0, "PCMU", 8000))
    }

    #[test]
    fn print_uses_fixed_order() {
        let flags = ChangeFlags::NETWORK_CHANGED | ChangeFlags::CODEC_CHANGED | ChangeFlags::ICE_RESTART_DETECTED;
        assert_eq!(flags.describe(), "CODEC_CHANGED NETWORK_CHANGED ICE_RESTART_DETECTED");
        assert_eq!(ChangeFlags::empty().describe(), "NONE");
        assert_eq!(print_differences(ChangeFlags::all().bits()).split(' ').count(), 8);
    }

    #[test]
    #[should_panic(expected = "unhandled change bits")]
    fn print_panics_on_unknown_bit() {
        print_differences(1 << 12);
    }

    #[test]
    fn proto_change_is_codec_change() {
        let mut new = audio();
        new.proto = MediaProto::RtpSavp;
        assert_eq!(compare_streams(&audio(), &new), ChangeFlags::CODEC_CHANGED);
    }

    #[test]
    fn crypto_slots_and_length() {
        let key = CryptoAttribute::new(1, CryptoSuite::AesCm128HmacSha1_80, "key-a");
        let old = audio().with_crypto(key.clone());

        let rekeyed = audio().with_crypto(CryptoAttribute::new(1, CryptoSuite::AesCm128HmacSha1_80, "key-b"));
        assert_eq!(compare_streams(&old, &rekeyed), ChangeFlags::CRYPTO_KEYS_CHANGED);

        let resuited = audio().with_crypto(CryptoAttribute::new(1, CryptoSuite::AesCm128HmacSha1_32, "key-a"));
        assert_eq!(compare_streams(&old, &resuited), ChangeFlags::CRYPTO_POLICY_CHANGED);

        let extra = old.clone().with_crypto(CryptoAttribute::new(2, CryptoSuite::AesCm128HmacSha1_32, "key-c"));
        assert_eq!(
            compare_streams(&old, &extra),
            ChangeFlags::CRYPTO_POLICY_CHANGED | ChangeFlags::CRYPTO_KEYS_CHANGED
        );
    }

    #[test]
    fn multicast_transitions() {
        let multicast = audio().with_rtp("224.0.1.10", 7078);
        assert_eq!(
            compare_streams(&audio(), &multicast),
            ChangeFlags::NETWORK_CHANGED | ChangeFlags::NETWORK_XXXCAST_CHANGED
        );

        let sender = audio().with_multicast(MulticastRole::Sender, 1);
        assert_eq!(compare_streams(&audio(), &sender), ChangeFlags::NETWORK_XXXCAST_CHANGED);
    }

    #[test]
    fn rtcp_endpoint_is_network() {
        let new = audio().with_rtcp("192.0.2.1", 7079);
        assert_eq!(compare_streams(&audio(), &new), ChangeFlags::NETWORK_CHANGED);
    }

    #[test]
    fn media_parameters_are_codec_changes() {
        for new in [
            audio().with_bandwidth(64),
            audio().with_ptime(40),
            audio().with_direction(crate::StreamDirection::SendOnly),
        ] {
            assert_eq!(compare_streams(&audio(), &new), ChangeFlags::CODEC_CHANGED);
        }
    }

    #[test]
    fn dtls_changes_are_key_changes() {
        let old = audio().with_dtls(crate::DtlsRole::Server, "sha-256 AA");
        let new = audio().with_dtls(crate::DtlsRole::Client, "sha-256 AA");
        assert_eq!(compare_streams(&old, &new), ChangeFlags::CRYPTO_KEYS_CHANGED);
        let refp = audio().with_dtls(crate::DtlsRole::Server, "sha-256 BB");
        assert_eq!(compare_streams(&old, &refp), ChangeFlags::CRYPTO_KEYS_CHANGED);
    }

    #[test]
    fn fmtp_is_ignored() {
        let old = [CodecOffer::audio(96, "opus", 48000).with_recv_fmtp("useinbandfec=1")];
        let new = [CodecOffer::audio(96, "opus", 48000).with_recv_fmtp("useinbandfec=0")];
        assert!(payload_lists_equal(&old, &new));
    }

    #[test]
    fn reordered_payloads_differ() {
        let a = CodecOffer::audio(0, "PCMU", 8000);
        let b = CodecOffer::audio(8, "PCMA", 8000);
        assert!(!payload_lists_equal(&[a.clone(), b.clone()], &[b, a]));
    }

    #[test]
    fn trailing_recv_only_on_previous_side() {
        let a = CodecOffer::audio(0, "PCMU", 8000);
        let c = CodecOffer::audio(8, "PCMA", 8000).recv_only();
        assert!(payload_lists_equal(&[a.clone(), c], &[a]));
    }
}
