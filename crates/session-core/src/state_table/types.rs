use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Session ID type
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(format!("session-{}", uuid::Uuid::new_v4()))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role in the call (caller or receiver)
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Role {
    UAC, // User Agent Client (caller)
    UAS, // User Agent Server (receiver)
}

/// Call states
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum CallState {
    Idle,
    OutgoingInit,
    OutgoingProgress,
    OutgoingRinging,
    OutgoingEarlyMedia,
    IncomingReceived,
    IncomingEarlyMedia,
    /// Offer/answer completed, streams not started yet
    Connected,
    StreamsRunning,
    /// Local hold offer sent
    Pausing,
    Paused,
    /// Local resume offer sent
    Resuming,
    PausedByRemote,
    /// Local re-offer sent
    Updating,
    /// Remote re-offer being answered
    UpdatedByRemote,
    Error,
    End,
    Released,
}

impl CallState {
    /// States in which a call exists on the network
    pub fn is_active(&self) -> bool {
        !matches!(self, CallState::Idle | CallState::Error | CallState::End | CallState::Released)
    }

    /// States in which a local offer waits for its answer
    pub fn awaits_answer(&self) -> bool {
        matches!(
            self,
            CallState::OutgoingInit
                | CallState::OutgoingProgress
                | CallState::OutgoingRinging
                | CallState::OutgoingEarlyMedia
                | CallState::Pausing
                | CallState::Resuming
                | CallState::Updating
        )
    }
}

/// Every state, in declaration order
pub const ALL_STATES: [CallState; 18] = [
    CallState::Idle,
    CallState::OutgoingInit,
    CallState::OutgoingProgress,
    CallState::OutgoingRinging,
    CallState::OutgoingEarlyMedia,
    CallState::IncomingReceived,
    CallState::IncomingEarlyMedia,
    CallState::Connected,
    CallState::StreamsRunning,
    CallState::Pausing,
    CallState::Paused,
    CallState::Resuming,
    CallState::PausedByRemote,
    CallState::Updating,
    CallState::UpdatedByRemote,
    CallState::Error,
    CallState::End,
    CallState::Released,
];

/// Events that trigger transitions
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum CallEvent {
    // Local operations
    MakeCall,
    AcceptCall,
    HoldCall,
    ResumeCall,
    UpdateCall,
    HangupCall,
    ReleaseCall,

    // Signaling
    IncomingOffer,
    Progress,
    Ringing,
    EarlyMedia,
    AnswerReceived,
    ReinviteReceived,
    RemoteHangup,
    SignalingFailure,

    // Negotiation outcome
    StreamsStarted,
    RemotePaused,
    NegotiationFailed,
    /// The media engine could not apply a negotiated description
    MediaFailure,
}

/// Key for looking up transitions in the state table
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct StateKey {
    pub role: Role,
    pub state: CallState,
    pub event: CallEvent,
}

/// Actions executed by the session when a transition fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    RefreshTurnConfiguration,
    GenerateLocalOffer,
    GenerateLocalAnswer,
    /// Run the diff engine against the current description and apply the plan
    Renegotiate,
    StopAllStreams,
    ReleaseDescriptions,
    ReleaseNatPolicy,
}

/// Transition definition - what happens when an event occurs in a state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    /// Actions to execute
    pub actions: Vec<Action>,

    /// Next state (if changing)
    pub next_state: Option<CallState>,
}

impl Transition {
    pub fn to(next_state: CallState) -> Self {
        Self {
            actions: Vec::new(),
            next_state: Some(next_state),
        }
    }

    /// Transition that keeps the current state
    pub fn stay() -> Self {
        Self {
            actions: Vec::new(),
            next_state: None,
        }
    }

    pub fn with_actions(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.actions.extend(actions);
        self
    }
}

/// States that must always have exit transitions if used
const TERMINAL_STATES: &[CallState] = &[CallState::Released];

/// Master state table containing all transitions
#[derive(Debug, Default)]
pub struct MasterStateTable {
    transitions: HashMap<StateKey, Transition>,
}

/// Type alias for external use
pub type StateTable = MasterStateTable;

impl MasterStateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: StateKey, transition: Transition) {
        self.transitions.insert(key, transition);
    }

    pub fn get(&self, key: &StateKey) -> Option<&Transition> {
        self.transitions.get(key)
    }

    pub fn has_transition(&self, key: &StateKey) -> bool {
        self.transitions.contains_key(key)
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    /// Collect all states referenced in this state table
    pub fn collect_used_states(&self) -> HashSet<CallState> {
        let mut states = HashSet::new();
        for (key, transition) in &self.transitions {
            states.insert(key.state);
            if let Some(next_state) = transition.next_state {
                states.insert(next_state);
            }
        }
        states
    }

    /// Every used non terminal state needs a way out, and every active
    /// state must be able to fail into `Error`.
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for state in self.collect_used_states() {
            if TERMINAL_STATES.contains(&state) {
                continue;
            }
            let has_exit = self.transitions.iter().any(|(k, t)| {
                k.state == state && t.next_state.map_or(false, |next| next != state)
            });
            if !has_exit {
                errors.push(format!("State {:?} has no exit transitions", state));
            }
        }

        for state in ALL_STATES.iter().filter(|s| s.is_active()) {
            for role in [Role::UAC, Role::UAS] {
                let key = StateKey {
                    role,
                    state: *state,
                    event: CallEvent::SignalingFailure,
                };
                if self.get(&key).and_then(|t| t.next_state) != Some(CallState::Error) {
                    errors.push(format!("{:?} {:?} cannot reach Error", role, state));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
