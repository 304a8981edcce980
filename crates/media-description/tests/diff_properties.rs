// Change classification properties of the description diff engine
//
// Covers comparison of a descriptor with itself, port toggling, ICE
// credential changes, payload list tolerance and disabled stream pairs.

use pretty_assertions::assert_eq;
use rvoip_media_description::prelude::*;
use rvoip_media_description::{compare_global, compare_streams, payload_lists_equal};

fn pcmu() -> CodecOffer {
    CodecOffer::audio(0, "PCMU", 8000)
}

fn pcma() -> CodecOffer {
    CodecOffer::audio(8, "PCMA", 8000)
}

fn g722() -> CodecOffer {
    CodecOffer::audio(9, "G722", 8000)
}

fn audio_stream() -> StreamDescriptor {
    StreamDescriptor::new(StreamType::Audio, MediaProto::RtpSavpf)
        .with_rtp("192.0.2.10", 7078)
        .with_rtcp("192.0.2.10", 7079)
        .with_codecs([pcmu(), pcma()])
        .with_ptime(20)
        .with_ice_credentials("s-ufrag", "s-pwd")
        .with_crypto(CryptoAttribute::new(1, CryptoSuite::AesCm128HmacSha1_80, "inline-key-1"))
        .with_mid("as")
}

fn video_stream() -> StreamDescriptor {
    StreamDescriptor::new(StreamType::Video, MediaProto::DtlsSrtpSavpf)
        .with_rtp("192.0.2.10", 9078)
        .with_codec(CodecOffer::video(96, "VP8"))
        .with_dtls(DtlsRole::Server, "sha-256 4A:AD:B9")
        .with_mid("vs")
}

fn full_session() -> MediaSessionDescriptor {
    MediaSessionDescriptor::builder()
        .address("192.0.2.10")
        .bandwidth(380)
        .ice_credentials("abc", "secret")
        .origin("alice", 1234, 1)
        .stream(audio_stream())
        .stream(video_stream())
        .bundle(BundleGroup::new(["as", "vs"]))
        .build()
        .unwrap()
}

#[test]
fn comparing_a_descriptor_with_its_copy_is_empty() {
    let original = full_session();
    let copy = original.clone();
    assert_eq!(compare(&original, &copy), ChangeFlags::empty());
    assert_eq!(original, copy);

    let empty = MediaSessionDescriptor::builder().build().unwrap();
    assert_eq!(compare(&empty, &empty.clone()), ChangeFlags::empty());
}

#[test]
fn enabling_or_disabling_a_port_is_a_codec_change() {
    let enabled = audio_stream();
    let disabled = audio_stream().with_rtp("192.0.2.10", 0);

    for (old, new) in [(&enabled, &disabled), (&disabled, &enabled)] {
        let flags = compare_streams(old, new);
        assert!(flags.contains(ChangeFlags::CODEC_CHANGED));
        assert!(!flags.contains(ChangeFlags::NETWORK_CHANGED));
    }

    let moved = audio_stream().with_rtp("192.0.2.10", 7090);
    assert_eq!(compare_streams(&enabled, &moved), ChangeFlags::NETWORK_CHANGED);
}

#[test]
fn cleared_ice_credentials_are_not_a_restart() {
    let previous = MediaSessionDescriptor::builder()
        .ice_credentials("abc", "secret")
        .build()
        .unwrap();
    let ice_off = MediaSessionDescriptor::builder().ice_credentials("", "").build().unwrap();
    let restarted = MediaSessionDescriptor::builder()
        .ice_credentials("xyz", "secret")
        .build()
        .unwrap();

    assert!(!compare_global(&previous, &ice_off).contains(ChangeFlags::ICE_RESTART_DETECTED));
    assert!(compare_global(&previous, &restarted).contains(ChangeFlags::ICE_RESTART_DETECTED));

    let stream_off = audio_stream().with_ice_credentials("", "");
    assert_eq!(compare_streams(&audio_stream(), &stream_off), ChangeFlags::empty());
    let stream_new = audio_stream().with_ice_credentials("s-ufrag", "other-pwd");
    assert_eq!(compare_streams(&audio_stream(), &stream_new), ChangeFlags::ICE_RESTART_DETECTED);
}

#[test]
fn trailing_recv_only_payloads_are_tolerated() {
    let base = [pcmu(), pcma()];
    assert!(payload_lists_equal(&base, &[pcmu(), pcma(), g722().recv_only()]));
    assert!(!payload_lists_equal(&base, &[pcmu(), pcma(), g722()]));
    assert!(!payload_lists_equal(&base, &[pcmu()]));
}

#[test]
fn changes_in_one_stream_mark_the_session() {
    let previous = full_session();
    let rekeyed_video = video_stream().with_dtls(DtlsRole::Server, "sha-256 00:11:22");
    let current = previous.to_builder().replace_stream(1, rekeyed_video).build().unwrap();

    assert_eq!(compare(&previous, &current), ChangeFlags::CRYPTO_KEYS_CHANGED);
    assert_ne!(previous, current);
}

#[test]
fn disabled_pairs_are_skipped() {
    let previous = MediaSessionDescriptor::builder()
        .stream(audio_stream().with_mid("").with_rtp("192.0.2.10", 0))
        .build()
        .unwrap();
    let mut disabled = StreamDescriptor::new(StreamType::Audio, MediaProto::RtpAvp).with_codec(g722());
    disabled.disable();
    let current = MediaSessionDescriptor::builder().stream(disabled).build().unwrap();

    assert_eq!(compare(&previous, &current), ChangeFlags::empty());
}

#[test]
fn session_level_changes() {
    let previous = full_session();

    let multicast = previous.to_builder().address("239.1.2.3").build().unwrap();
    assert_eq!(
        compare_global(&previous, &multicast),
        ChangeFlags::NETWORK_CHANGED | ChangeFlags::NETWORK_XXXCAST_CHANGED
    );

    let fewer = MediaSessionDescriptor::builder()
        .address("192.0.2.10")
        .bandwidth(380)
        .ice_credentials("abc", "secret")
        .stream(audio_stream().with_mid(""))
        .build()
        .unwrap();
    assert!(compare(&previous, &fewer).contains(ChangeFlags::STREAMS_CHANGED));

    let narrower = previous.to_builder().bandwidth(64).build().unwrap();
    assert_eq!(compare(&previous, &narrower), ChangeFlags::CODEC_CHANGED);
}

#[test]
fn flags_render_for_logs() {
    let previous = full_session();
    let current = previous
        .to_builder()
        .address("198.51.100.7")
        .ice_credentials("new", "creds")
        .build()
        .unwrap();
    let flags = compare(&previous, &current);
    assert_eq!(flags.describe(), "NETWORK_CHANGED ICE_RESTART_DETECTED");
}
