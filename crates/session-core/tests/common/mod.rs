// Shared fakes for call session tests

#![allow(dead_code)]

use async_trait::async_trait;
use rvoip_infra_common::logging::init_test_logging;
use rvoip_media_description::{
    CodecOffer, MediaProto, MediaSessionDescriptor, StreamDescriptor, StreamDirection, StreamType,
};
use rvoip_nat_policy::{AddressFamily, CoreContext, NatPolicy, NatPolicyError, StunResolver};
use rvoip_session_core::{
    CallSession, CallSessionConfig, CapabilityProvider, MediaStreamController, SessionError, SessionEvent,
};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub const LOCAL_ADDR: &str = "192.0.2.10";
pub const REMOTE_ADDR: &str = "198.51.100.20";

/// One call into the media engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaCall {
    Start(usize),
    UpdateEndpoints(usize),
    Rebuild(usize),
    Stop(usize),
    RestartIce,
}

/// Media engine that records what it was asked to do
#[derive(Default)]
pub struct RecordingMedia {
    calls: Mutex<Vec<MediaCall>>,
    failing: Mutex<Option<MediaCall>>,
}

impl RecordingMedia {
    /// Engine that records every call and rejects `call`
    pub fn failing_on(call: MediaCall) -> Self {
        Self {
            calls: Mutex::default(),
            failing: Mutex::new(Some(call)),
        }
    }

    pub fn calls(&self) -> Vec<MediaCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Returns the calls recorded so far and forgets them
    pub fn take(&self) -> Vec<MediaCall> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    fn record(&self, call: MediaCall) -> Result<(), SessionError> {
        let fails = self.failing.lock().unwrap().as_ref() == Some(&call);
        self.calls.lock().unwrap().push(call.clone());
        if fails {
            return Err(SessionError::media(format!("{:?} refused", call)));
        }
        Ok(())
    }
}

#[async_trait]
impl MediaStreamController for RecordingMedia {
    async fn start_stream(&self, index: usize, _stream: &StreamDescriptor) -> Result<(), SessionError> {
        self.record(MediaCall::Start(index))
    }

    async fn update_endpoints(&self, index: usize, _stream: &StreamDescriptor) -> Result<(), SessionError> {
        self.record(MediaCall::UpdateEndpoints(index))
    }

    async fn stop_stream(&self, index: usize) -> Result<(), SessionError> {
        self.record(MediaCall::Stop(index))
    }

    async fn restart_ice(&self, _description: &MediaSessionDescriptor) -> Result<(), SessionError> {
        self.record(MediaCall::RestartIce)
    }

    async fn rebuild_stream(&self, index: usize, _stream: &StreamDescriptor) -> Result<(), SessionError> {
        self.record(MediaCall::Rebuild(index))
    }
}

/// Capability provider serving a fixed stream per media type
pub struct FixedCapabilities {
    streams: Vec<StreamDescriptor>,
}

impl FixedCapabilities {
    pub fn new(streams: Vec<StreamDescriptor>) -> Self {
        Self { streams }
    }

    /// PCMU, opus and telephone-event on LOCAL_ADDR:7078
    pub fn audio() -> Self {
        Self::new(vec![local_audio()])
    }
}

impl CapabilityProvider for FixedCapabilities {
    fn enumerate_streams(&self, requested: &[StreamType]) -> Vec<StreamDescriptor> {
        requested
            .iter()
            .filter_map(|t| self.streams.iter().find(|s| s.stream_type == *t).cloned())
            .collect()
    }
}

/// Resolver for sessions that never resolve anything
pub struct NoResolver;

#[async_trait]
impl StunResolver for NoResolver {
    async fn resolve_service(
        &self,
        _service: &str,
        _transport: &str,
        host: &str,
        _default_port: u16,
        _family: AddressFamily,
    ) -> rvoip_nat_policy::Result<Vec<SocketAddr>> {
        Err(NatPolicyError::ResolutionFailed {
            host: host.to_string(),
            reason: "no resolver in tests".to_string(),
        })
    }

    async fn resolve_host(
        &self,
        host: &str,
        _port: u16,
        _family: AddressFamily,
    ) -> rvoip_nat_policy::Result<Vec<SocketAddr>> {
        Err(NatPolicyError::ResolutionFailed {
            host: host.to_string(),
            reason: "no resolver in tests".to_string(),
        })
    }
}

pub fn nat_policy() -> NatPolicy {
    NatPolicy::new(Arc::new(CoreContext::new(Arc::new(NoResolver))))
}

pub fn pcmu() -> CodecOffer {
    CodecOffer::audio(0, "PCMU", 8000)
}

pub fn pcma() -> CodecOffer {
    CodecOffer::audio(8, "PCMA", 8000)
}

pub fn opus() -> CodecOffer {
    CodecOffer::audio(96, "opus", 48000).with_channels(2)
}

pub fn telephone_event() -> CodecOffer {
    CodecOffer::audio(101, "telephone-event", 8000)
}

pub fn local_audio() -> StreamDescriptor {
    StreamDescriptor::new(StreamType::Audio, MediaProto::RtpAvp)
        .with_rtp(LOCAL_ADDR, 7078)
        .with_codecs([pcmu(), opus(), telephone_event()])
}

pub fn remote_audio(port: u16, codecs: Vec<CodecOffer>) -> StreamDescriptor {
    StreamDescriptor::new(StreamType::Audio, MediaProto::RtpAvp)
        .with_rtp(REMOTE_ADDR, port)
        .with_codecs(codecs)
}

pub fn remote(streams: Vec<StreamDescriptor>) -> MediaSessionDescriptor {
    MediaSessionDescriptor::builder()
        .address(REMOTE_ADDR)
        .origin("peer", 4242, 1)
        .streams(streams)
        .build()
        .unwrap()
}

/// Remote audio description on `port`, offering or answering `codecs`
pub fn remote_audio_session(port: u16, codecs: Vec<CodecOffer>) -> MediaSessionDescriptor {
    remote(vec![remote_audio(port, codecs)])
}

pub fn remote_with_direction(port: u16, direction: StreamDirection) -> MediaSessionDescriptor {
    remote(vec![remote_audio(port, vec![pcmu()]).with_direction(direction)])
}

pub fn config() -> CallSessionConfig {
    CallSessionConfig::default()
        .with_local_address(LOCAL_ADDR)
        .with_username("alice")
}

pub struct Harness {
    pub session: CallSession,
    pub events: mpsc::Receiver<SessionEvent>,
    pub media: Arc<RecordingMedia>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(config(), None, FixedCapabilities::audio())
    }

    pub fn with(config: CallSessionConfig, nat_policy: Option<NatPolicy>, capabilities: FixedCapabilities) -> Self {
        Self::with_media(config, nat_policy, capabilities, RecordingMedia::default())
    }

    pub fn with_media(
        config: CallSessionConfig,
        nat_policy: Option<NatPolicy>,
        capabilities: FixedCapabilities,
        media: RecordingMedia,
    ) -> Self {
        init_test_logging();
        let media = Arc::new(media);
        let (session, events) = CallSession::new(config, nat_policy, Arc::new(capabilities), media.clone());
        Self { session, events, media }
    }

    /// Outgoing call answered with PCMU on REMOTE_ADDR:4000
    pub async fn established_outgoing() -> Self {
        let mut harness = Self::new();
        harness.session.start_outgoing().await.unwrap();
        harness
            .session
            .propose_remote_description(remote_audio_session(4000, vec![pcmu()]))
            .await
            .unwrap();
        harness.media.take();
        harness.drain();
        harness
    }

    /// Events published so far
    pub fn drain(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}
