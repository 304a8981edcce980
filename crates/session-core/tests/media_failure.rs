// Media engine failures while a negotiated description is applied

mod common;

use common::*;
use pretty_assertions::assert_eq;
use rvoip_media_description::{CodecOffer, MediaProto, StreamDescriptor, StreamType};
use rvoip_session_core::{CallSessionConfig, CallState, SessionError, SessionEvent};

fn vp8() -> CodecOffer {
    CodecOffer::video(97, "VP8")
}

fn local_video() -> StreamDescriptor {
    StreamDescriptor::new(StreamType::Video, MediaProto::RtpAvp)
        .with_rtp(LOCAL_ADDR, 9078)
        .with_codec(vp8())
}

fn remote_video(port: u16) -> StreamDescriptor {
    StreamDescriptor::new(StreamType::Video, MediaProto::RtpAvp)
        .with_rtp(REMOTE_ADDR, port)
        .with_codec(vp8())
}

fn audio_video_config() -> CallSessionConfig {
    config().with_media_types([StreamType::Audio, StreamType::Video])
}

fn audio_video_harness(media: RecordingMedia) -> Harness {
    Harness::with_media(
        audio_video_config(),
        None,
        FixedCapabilities::new(vec![local_audio(), local_video()]),
        media,
    )
}

fn media_failures(events: &[SessionEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, SessionEvent::MediaFailed { .. }))
        .count()
}

#[tokio::test]
async fn second_stream_failing_to_start_stops_the_first() {
    let mut h = audio_video_harness(RecordingMedia::failing_on(MediaCall::Start(1)));
    h.session
        .propose_remote_description(remote(vec![remote_audio(5004, vec![pcmu()]), remote_video(5006)]))
        .await
        .unwrap();

    let err = h.session.accept().await.unwrap_err();
    assert!(matches!(err, SessionError::Media { .. }), "{:?}", err);
    assert_eq!(h.session.state(), CallState::Error);
    assert!(h.session.current().is_none());
    assert_eq!(
        h.media.take(),
        vec![
            MediaCall::Start(0),
            MediaCall::Start(1),
            MediaCall::Stop(0),
            MediaCall::Stop(1)
        ]
    );

    let events = h.drain();
    assert_eq!(media_failures(&events), 1);
    assert!(!events.iter().any(|e| matches!(e, SessionEvent::Renegotiated { .. })));

    // nothing left to stop on hangup
    h.session.terminate().await.unwrap();
    assert!(h.media.calls().is_empty());
    h.session.release().await.unwrap();
    assert_eq!(h.session.state(), CallState::Released);
}

#[tokio::test]
async fn failed_endpoint_update_does_not_leave_a_stale_baseline() {
    let mut h = audio_video_harness(RecordingMedia::failing_on(MediaCall::UpdateEndpoints(1)));
    h.session.start_outgoing().await.unwrap();
    h.session
        .propose_remote_description(remote(vec![remote_audio(4000, vec![pcmu()]), remote_video(4002)]))
        .await
        .unwrap();
    assert_eq!(h.session.state(), CallState::StreamsRunning);
    assert_eq!(h.media.take(), vec![MediaCall::Start(0), MediaCall::Start(1)]);
    h.drain();

    let err = h
        .session
        .propose_remote_description(remote(vec![remote_audio(4010, vec![pcmu()]), remote_video(4012)]))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Media { .. }), "{:?}", err);
    assert_eq!(h.session.state(), CallState::Error);
    assert!(h.session.current().is_none());
    assert_eq!(
        h.media.take(),
        vec![
            MediaCall::UpdateEndpoints(0),
            MediaCall::UpdateEndpoints(1),
            MediaCall::Stop(0),
            MediaCall::Stop(1)
        ]
    );
    assert_eq!(media_failures(&h.drain()), 1);

    // the failed call accepts no further offers
    assert!(h
        .session
        .propose_remote_description(remote_audio_session(4000, vec![pcmu()]))
        .await
        .is_err());
}
