//! # Call sessions with offer/answer renegotiation
//!
//! `rvoip-session-core` runs the media side of SIP calls. Signaling (SIP
//! transactions, SDP parsing) lives elsewhere and talks to a [`CallSession`]
//! through plain method calls: it hands over remote descriptions, reports
//! provisional responses and failures, and picks up the local offer or answer
//! to send.
//!
//! Each completed negotiation round produces a new negotiated
//! [`MediaSessionDescriptor`](rvoip_media_description::MediaSessionDescriptor).
//! The session compares it with the one the streams currently run with and
//! asks its [`MediaStreamController`] for the minimum work: nothing, new
//! transport endpoints, an ICE restart or a stream rebuild.
//!
//! ```no_run
//! use std::sync::Arc;
//! use rvoip_session_core::prelude::*;
//!
//! # async fn example(
//! #     capabilities: Arc<dyn CapabilityProvider>,
//! #     media: Arc<dyn MediaStreamController>,
//! #     remote_answer: rvoip_media_description::MediaSessionDescriptor,
//! # ) -> Result<()> {
//! let (mut session, mut events) = CallSession::new(CallSessionConfig::default(), None, capabilities, media);
//! session.start_outgoing().await?;
//! let offer = session.local_offer().cloned();
//! // ... send the INVITE, then on 200 OK:
//! session.propose_remote_description(remote_answer).await?;
//! assert_eq!(session.state(), CallState::StreamsRunning);
//! while let Ok(event) = events.try_recv() {
//!     println!("{:?}", event);
//! }
//! # let _ = offer;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod errors;
pub mod events;
pub mod media;
pub mod negotiation;
pub mod session;
pub mod state_table;

pub use config::CallSessionConfig;
pub use errors::{RejectReason, Result, SessionError};
pub use events::SessionEvent;
pub use media::{CapabilityProvider, MediaStreamController};
pub use negotiation::{RenegotiationPlan, StreamAction};
pub use session::CallSession;
pub use state_table::{CallEvent, CallState, Role, SessionId};

pub mod prelude {
    pub use crate::{
        CallEvent, CallSession, CallSessionConfig, CallState, CapabilityProvider, MediaStreamController,
        RejectReason, Result, SessionError, SessionEvent,
    };
}
