// Failed negotiation rounds: rejection reason, error state, nothing applied

mod common;

use common::*;
use pretty_assertions::assert_eq;
use rvoip_media_description::{CodecOffer, MediaProto, StreamDescriptor, StreamType};
use rvoip_session_core::{CallState, RejectReason, SessionError, SessionEvent};

fn rejection(events: &[SessionEvent]) -> Option<RejectReason> {
    events.iter().find_map(|e| match e {
        SessionEvent::NegotiationFailed { reason, .. } => Some(*reason),
        _ => None,
    })
}

#[tokio::test]
async fn incoming_offer_without_common_codec() {
    let mut h = Harness::new();
    h.session
        .propose_remote_description(remote_audio_session(5004, vec![CodecOffer::audio(9, "G722", 8000)]))
        .await
        .unwrap();

    let err = h.session.accept().await.unwrap_err();
    assert_eq!(err.reject_reason(), Some(RejectReason::NoCommonCodec));
    assert_eq!(err.reject_reason().unwrap().status_code(), 488);
    assert_eq!(h.session.state(), CallState::Error);
    assert!(h.session.current().is_none());
    assert!(h.session.local_answer().is_none());
    assert!(h.media.calls().is_empty());
    assert_eq!(rejection(&h.drain()), Some(RejectReason::NoCommonCodec));

    h.session.terminate().await.unwrap();
    h.session.release().await.unwrap();
    assert_eq!(h.session.state(), CallState::Released);
}

#[tokio::test]
async fn broken_local_capabilities_reject_the_offer_as_invalid() {
    // two codecs sharing payload number 0
    let broken = local_audio().with_codec(CodecOffer::audio(0, "PCMA", 8000));
    let mut h = Harness::with(config(), None, FixedCapabilities::new(vec![broken]));
    h.session
        .propose_remote_description(remote_audio_session(5004, vec![pcmu()]))
        .await
        .unwrap();

    let err = h.session.accept().await.unwrap_err();
    assert!(matches!(err, SessionError::Description(_)), "{:?}", err);
    assert_eq!(err.reject_reason(), Some(RejectReason::InvalidDescription));
    assert_eq!(h.session.state(), CallState::Error);
    assert!(h.session.local_answer().is_none());
    assert!(h.media.calls().is_empty());
    assert_eq!(rejection(&h.drain()), Some(RejectReason::InvalidDescription));
}

#[tokio::test]
async fn telephone_event_alone_is_not_enough() {
    let mut h = Harness::new();
    h.session
        .propose_remote_description(remote_audio_session(5004, vec![telephone_event()]))
        .await
        .unwrap();
    let err = h.session.accept().await.unwrap_err();
    assert_eq!(err.reject_reason(), Some(RejectReason::NoCommonCodec));
}

#[tokio::test]
async fn secure_offer_against_plain_capabilities() {
    let mut h = Harness::new();
    let srtp = StreamDescriptor::new(StreamType::Audio, MediaProto::RtpSavp)
        .with_rtp(REMOTE_ADDR, 5004)
        .with_codec(pcmu());
    h.session.propose_remote_description(remote(vec![srtp])).await.unwrap();

    let err = h.session.accept().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::NegotiationFailed {
            reason: RejectReason::IncompatibleTransport
        }
    ));
    assert_eq!(h.session.state(), CallState::Error);
}

#[tokio::test]
async fn failed_reoffer_keeps_the_running_media() {
    let mut h = Harness::established_outgoing().await;
    let before = h.session.current().unwrap().clone();

    let err = h
        .session
        .propose_remote_description(remote_audio_session(4002, vec![CodecOffer::audio(18, "G729", 8000)]))
        .await
        .unwrap_err();
    assert_eq!(err.reject_reason(), Some(RejectReason::NoCommonCodec));
    assert_eq!(h.session.state(), CallState::Error);

    // nothing applied: same description, no stream touched
    assert_eq!(h.session.current().unwrap(), &before);
    assert_eq!(h.session.current().unwrap().stream(0).unwrap().rtp_port, 4000);
    assert!(h.media.calls().is_empty());

    let events = h.drain();
    assert_eq!(rejection(&events), Some(RejectReason::NoCommonCodec));
    assert!(!events.iter().any(|e| matches!(e, SessionEvent::Renegotiated { .. })));
}

#[tokio::test]
async fn rejected_answer_fails_the_outgoing_call() {
    let mut h = Harness::new();
    h.session.start_outgoing().await.unwrap();

    let err = h
        .session
        .propose_remote_description(remote_audio_session(0, vec![pcmu()]))
        .await
        .unwrap_err();
    assert!(err.reject_reason().is_some());
    assert_eq!(h.session.state(), CallState::Error);
    assert!(h.session.current().is_none());
}
