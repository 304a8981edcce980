//! Call session
//!
//! A [`CallSession`] owns the media side of one SIP call: the descriptions
//! exchanged with the peer, the negotiated description the streams run with
//! and the NAT policy of the account placing or receiving the call. Every
//! operation goes through the master state table; the actions attached to
//! the transition do the work and the state is committed only once they all
//! succeeded.

mod actions;

use rand::distributions::Alphanumeric;
use rand::Rng;
use rvoip_media_description::MediaSessionDescriptor;
use rvoip_nat_policy::NatPolicy;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::CallSessionConfig;
use crate::errors::{RejectReason, Result, SessionError};
use crate::events::SessionEvent;
use crate::media::{CapabilityProvider, MediaStreamController};
use crate::negotiation::puts_on_hold;
use crate::state_table::{CallEvent, CallState, Role, SessionId, StateKey, MASTER_TABLE};

const ICE_UFRAG_LEN: usize = 8;
const ICE_PWD_LEN: usize = 24;

/// Capacity of the session event channel
const EVENT_CHANNEL_SIZE: usize = 100;

pub struct CallSession {
    id: SessionId,
    role: Role,
    state: CallState,
    config: CallSessionConfig,
    nat_policy: Option<NatPolicy>,
    capabilities: Arc<dyn CapabilityProvider>,
    media: Arc<dyn MediaStreamController>,
    events: mpsc::Sender<SessionEvent>,

    /// Last offer we sent, until the round completes
    local_offer: Option<MediaSessionDescriptor>,
    /// Last answer we sent
    local_answer: Option<MediaSessionDescriptor>,
    remote_offer: Option<MediaSessionDescriptor>,
    remote_answer: Option<MediaSessionDescriptor>,
    /// Negotiated by an answer we produced, applied by the next Renegotiate
    pending: Option<MediaSessionDescriptor>,
    /// What the streams run with. Owned here only; replaced, never edited.
    current: Option<MediaSessionDescriptor>,

    force_reconstruction: bool,

    ice_ufrag: String,
    ice_pwd: String,
    sdp_session_id: u64,
    sdp_version: u64,
}

impl CallSession {
    /// Creates an idle session and the receiver of its events
    pub fn new(
        config: CallSessionConfig,
        nat_policy: Option<NatPolicy>,
        capabilities: Arc<dyn CapabilityProvider>,
        media: Arc<dyn MediaStreamController>,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (events, event_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let session = Self {
            id: SessionId::new(),
            role: Role::UAC,
            state: CallState::Idle,
            config,
            nat_policy,
            capabilities,
            media,
            events,
            local_offer: None,
            local_answer: None,
            remote_offer: None,
            remote_answer: None,
            pending: None,
            current: None,
            force_reconstruction: false,
            ice_ufrag: random_token(ICE_UFRAG_LEN),
            ice_pwd: random_token(ICE_PWD_LEN),
            sdp_session_id: u64::from(rand::random::<u32>()),
            sdp_version: 0,
        };
        (session, event_rx)
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    /// Negotiated description the streams currently run with
    pub fn current(&self) -> Option<&MediaSessionDescriptor> {
        self.current.as_ref()
    }

    /// Offer to put in the outgoing INVITE or re-INVITE
    pub fn local_offer(&self) -> Option<&MediaSessionDescriptor> {
        self.local_offer.as_ref()
    }

    /// Answer to put in the response to the remote offer
    pub fn local_answer(&self) -> Option<&MediaSessionDescriptor> {
        self.local_answer.as_ref()
    }

    pub fn nat_policy(&self) -> Option<&NatPolicy> {
        self.nat_policy.as_ref()
    }

    // ---- Local operations ----

    /// Builds the initial offer; it is then available from [`Self::local_offer`]
    pub async fn start_outgoing(&mut self) -> Result<()> {
        self.process_event(CallEvent::MakeCall).await
    }

    /// Answers the pending incoming offer and starts the streams
    pub async fn accept(&mut self) -> Result<()> {
        self.process_event(CallEvent::AcceptCall).await?;
        self.settle().await
    }

    /// Re-offers the current media (re-INVITE)
    pub async fn update(&mut self) -> Result<()> {
        self.process_event(CallEvent::UpdateCall).await
    }

    /// Offers sendonly streams
    pub async fn pause(&mut self) -> Result<()> {
        self.process_event(CallEvent::HoldCall).await
    }

    pub async fn resume(&mut self) -> Result<()> {
        self.process_event(CallEvent::ResumeCall).await
    }

    /// New local ICE credentials, sent in an update
    pub async fn restart_ice(&mut self) -> Result<()> {
        let previous = (
            std::mem::replace(&mut self.ice_ufrag, random_token(ICE_UFRAG_LEN)),
            std::mem::replace(&mut self.ice_pwd, random_token(ICE_PWD_LEN)),
        );
        let result = self.update().await;
        if result.is_err() {
            (self.ice_ufrag, self.ice_pwd) = previous;
        }
        result
    }

    /// The next negotiation round rebuilds every running stream
    pub fn request_stream_reconstruction(&mut self) {
        self.force_reconstruction = true;
    }

    pub async fn terminate(&mut self) -> Result<()> {
        self.process_event(CallEvent::HangupCall).await
    }

    /// Frees the descriptions and the NAT policy of an ended call
    pub async fn release(&mut self) -> Result<()> {
        self.process_event(CallEvent::ReleaseCall).await
    }

    // ---- Signaling input ----

    /// Hands over a description received from the peer.
    ///
    /// Depending on the state it is a new incoming offer, the answer to our
    /// pending offer or a re-offer of an established call.
    pub async fn propose_remote_description(&mut self, description: MediaSessionDescriptor) -> Result<()> {
        match self.state {
            CallState::Idle => {
                self.start_remote_round(description);
                self.process_event(CallEvent::IncomingOffer).await
            }
            state if state.awaits_answer() => {
                self.remote_answer = Some(description);
                self.process_event(CallEvent::AnswerReceived).await?;
                self.settle().await
            }
            CallState::StreamsRunning | CallState::PausedByRemote | CallState::Paused => {
                self.start_remote_round(description);
                self.process_event(CallEvent::ReinviteReceived).await?;
                self.settle().await
            }
            state => Err(SessionError::InvalidTransition {
                state,
                event: CallEvent::ReinviteReceived,
            }),
        }
    }

    pub async fn on_progress(&mut self) -> Result<()> {
        self.process_event(CallEvent::Progress).await
    }

    pub async fn on_ringing(&mut self) -> Result<()> {
        self.process_event(CallEvent::Ringing).await
    }

    pub async fn on_early_media(&mut self) -> Result<()> {
        self.process_event(CallEvent::EarlyMedia).await
    }

    pub async fn on_remote_terminated(&mut self) -> Result<()> {
        self.process_event(CallEvent::RemoteHangup).await
    }

    /// Transaction timeout, transport error or failure response
    pub async fn on_failure(&mut self) -> Result<()> {
        self.process_event(CallEvent::SignalingFailure).await
    }

    // ---- Dispatch ----

    async fn process_event(&mut self, event: CallEvent) -> Result<()> {
        if self.state == CallState::Idle {
            self.role = match event {
                CallEvent::IncomingOffer => Role::UAS,
                _ => Role::UAC,
            };
        }

        let key = StateKey {
            role: self.role,
            state: self.state,
            event,
        };
        let Some(transition) = MASTER_TABLE.get(&key).cloned() else {
            debug!(session_id = %self.id, "No transition for {:?} in {:?}", event, self.state);
            return Err(SessionError::InvalidTransition {
                state: self.state,
                event,
            });
        };

        for action in &transition.actions {
            if let Err(e) = self.execute_action(*action, event).await {
                if let Some(reason) = e.reject_reason() {
                    self.negotiation_failed(reason);
                } else if let SessionError::Media { message } = &e {
                    self.media_failed(message.clone());
                }
                return Err(e);
            }
        }

        if let Some(next) = transition.next_state {
            self.set_state(next);
        }
        Ok(())
    }

    /// Moves a freshly negotiated call on to its running state
    async fn settle(&mut self) -> Result<()> {
        if !matches!(self.state, CallState::Connected | CallState::UpdatedByRemote) {
            return Ok(());
        }
        let held = self.remote_offer.as_ref().map_or(false, puts_on_hold);
        let event = if held { CallEvent::RemotePaused } else { CallEvent::StreamsStarted };
        self.process_event(event).await
    }

    /// Drops the failed round and moves to the error state. The current
    /// negotiated description and the running streams are left alone.
    fn negotiation_failed(&mut self, reason: RejectReason) {
        warn!(session_id = %self.id, "Media negotiation failed: {}", reason);
        self.pending = None;
        self.local_answer = None;
        self.remote_answer = None;
        self.force_reconstruction = false;
        self.emit(SessionEvent::NegotiationFailed {
            session_id: self.id.clone(),
            reason,
        });

        let key = StateKey {
            role: self.role,
            state: self.state,
            event: CallEvent::NegotiationFailed,
        };
        if let Some(next) = MASTER_TABLE.get(&key).and_then(|t| t.next_state) {
            self.set_state(next);
        }
    }

    /// The streams were stopped while applying the plan; nothing runs any more
    fn media_failed(&mut self, message: String) {
        error!(session_id = %self.id, "Media engine failure: {}", message);
        self.pending = None;
        self.force_reconstruction = false;
        self.emit(SessionEvent::MediaFailed {
            session_id: self.id.clone(),
            message,
        });

        let key = StateKey {
            role: self.role,
            state: self.state,
            event: CallEvent::MediaFailure,
        };
        if let Some(next) = MASTER_TABLE.get(&key).and_then(|t| t.next_state) {
            self.set_state(next);
        }
    }

    fn start_remote_round(&mut self, offer: MediaSessionDescriptor) {
        self.remote_offer = Some(offer);
        self.remote_answer = None;
        self.local_offer = None;
        self.local_answer = None;
    }

    fn set_state(&mut self, next: CallState) {
        if next == self.state {
            return;
        }
        let old_state = std::mem::replace(&mut self.state, next);
        info!(session_id = %self.id, "State change {:?} -> {:?}", old_state, next);
        self.emit(SessionEvent::StateChanged {
            session_id: self.id.clone(),
            old_state,
            new_state: next,
        });
    }

    fn emit(&self, event: SessionEvent) {
        if let Err(e) = self.events.try_send(event) {
            warn!(session_id = %self.id, "Dropping session event: {}", e);
        }
    }
}

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
