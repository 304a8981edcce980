//! Events published by a call session

use rvoip_media_description::ChangeFlags;

use crate::errors::RejectReason;
use crate::negotiation::RenegotiationPlan;
use crate::state_table::{CallState, SessionId};

#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChanged {
        session_id: SessionId,
        old_state: CallState,
        new_state: CallState,
    },

    /// A negotiation round completed and its plan was applied
    Renegotiated {
        session_id: SessionId,
        flags: ChangeFlags,
        plan: RenegotiationPlan,
    },

    IceRestart {
        session_id: SessionId,
    },

    NegotiationFailed {
        session_id: SessionId,
        reason: RejectReason,
    },

    /// The media engine failed mid-plan; every stream was stopped
    MediaFailed {
        session_id: SessionId,
        message: String,
    },
}

impl SessionEvent {
    pub fn session_id(&self) -> &SessionId {
        match self {
            SessionEvent::StateChanged { session_id, .. }
            | SessionEvent::Renegotiated { session_id, .. }
            | SessionEvent::IceRestart { session_id }
            | SessionEvent::NegotiationFailed { session_id, .. }
            | SessionEvent::MediaFailed { session_id, .. } => session_id,
        }
    }
}
