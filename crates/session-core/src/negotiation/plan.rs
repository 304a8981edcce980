//! What to do with running streams after a negotiation round

use rvoip_media_description::{
    compare, compare_global, compare_streams, ChangeFlags, MediaSessionDescriptor, StreamDescriptor,
};

/// Changes that need the stream pipeline torn down and rebuilt
pub const REBUILD_FLAGS: ChangeFlags = ChangeFlags::from_bits_truncate(
    ChangeFlags::CODEC_CHANGED.bits()
        | ChangeFlags::STREAMS_CHANGED.bits()
        | ChangeFlags::CRYPTO_KEYS_CHANGED.bits()
        | ChangeFlags::CRYPTO_POLICY_CHANGED.bits()
        | ChangeFlags::FORCE_STREAM_RECONSTRUCTION.bits(),
);

/// Changes handled by moving transport endpoints
pub const ENDPOINT_FLAGS: ChangeFlags = ChangeFlags::from_bits_truncate(
    ChangeFlags::NETWORK_CHANGED.bits() | ChangeFlags::NETWORK_XXXCAST_CHANGED.bits(),
);

/// Per stream decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamAction {
    /// Nothing changed, or the stream is disabled on both sides
    Keep,
    /// Newly enabled stream
    Start,
    UpdateEndpoints,
    Rebuild,
    /// Stream disabled or removed
    Stop,
}

/// Outcome of comparing the current negotiated description with the next one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenegotiationPlan {
    /// Session wide classification, as reported by the diff engine
    pub flags: ChangeFlags,

    /// One action per stream slot, covering both descriptions
    pub streams: Vec<StreamAction>,

    pub ice_restart: bool,
}

impl RenegotiationPlan {
    /// First negotiation of a call: start every enabled stream
    pub fn initial(negotiated: &MediaSessionDescriptor) -> Self {
        let streams = negotiated
            .streams()
            .iter()
            .map(|s| if s.is_enabled() { StreamAction::Start } else { StreamAction::Keep })
            .collect();
        Self {
            flags: ChangeFlags::empty(),
            streams,
            ice_restart: false,
        }
    }

    /// Plan for moving from `previous` to `next`. `forced` is OR-ed into the
    /// classification (used for [`ChangeFlags::FORCE_STREAM_RECONSTRUCTION`]).
    pub fn between(previous: &MediaSessionDescriptor, next: &MediaSessionDescriptor, forced: ChangeFlags) -> Self {
        let flags = compare(previous, next) | forced;

        // Session level changes hit every stream. A stream count change only
        // concerns the slots that appear or disappear.
        let session_wide = (compare_global(previous, next) | forced) & (REBUILD_FLAGS | ENDPOINT_FLAGS);
        let session_wide = session_wide - ChangeFlags::STREAMS_CHANGED;

        let slots = previous.nb_streams().max(next.nb_streams());
        let streams = (0..slots)
            .map(|index| stream_action(previous.stream(index), next.stream(index), session_wide))
            .collect();

        Self {
            flags,
            streams,
            ice_restart: flags.contains(ChangeFlags::ICE_RESTART_DETECTED),
        }
    }

    /// Nothing to do at all
    pub fn is_noop(&self) -> bool {
        !self.ice_restart && self.streams.iter().all(|a| *a == StreamAction::Keep)
    }

    pub fn requires_rebuild(&self) -> bool {
        self.streams.contains(&StreamAction::Rebuild)
    }

    pub fn action(&self, index: usize) -> StreamAction {
        self.streams.get(index).copied().unwrap_or(StreamAction::Keep)
    }
}

fn stream_action(
    previous: Option<&StreamDescriptor>,
    next: Option<&StreamDescriptor>,
    session_wide: ChangeFlags,
) -> StreamAction {
    let was_enabled = previous.map_or(false, StreamDescriptor::is_enabled);
    let is_enabled = next.map_or(false, StreamDescriptor::is_enabled);

    match (previous, next) {
        (Some(previous), Some(next)) if was_enabled && is_enabled => {
            let flags = compare_streams(previous, next) | session_wide;
            if flags.intersects(REBUILD_FLAGS) {
                StreamAction::Rebuild
            } else if flags.intersects(ENDPOINT_FLAGS) {
                StreamAction::UpdateEndpoints
            } else {
                StreamAction::Keep
            }
        }
        _ if !was_enabled && is_enabled => StreamAction::Start,
        _ if was_enabled && !is_enabled => StreamAction::Stop,
        _ => StreamAction::Keep,
    }
}
