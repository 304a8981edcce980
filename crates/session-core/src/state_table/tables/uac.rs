use crate::state_table::{Action, CallEvent, CallState, Role, StateTableBuilder, Transition};

const OUTGOING: [CallState; 4] = [
    CallState::OutgoingInit,
    CallState::OutgoingProgress,
    CallState::OutgoingRinging,
    CallState::OutgoingEarlyMedia,
];

/// Add UAC (caller) specific transitions
pub fn add_uac_transitions(builder: &mut StateTableBuilder) {
    // Idle -> OutgoingInit: MakeCall
    builder.add_transition(
        Role::UAC,
        CallState::Idle,
        CallEvent::MakeCall,
        Transition::to(CallState::OutgoingInit)
            .with_actions([Action::RefreshTurnConfiguration, Action::GenerateLocalOffer]),
    );

    // Provisional responses
    builder.add_transition(
        Role::UAC,
        CallState::OutgoingInit,
        CallEvent::Progress,
        Transition::to(CallState::OutgoingProgress),
    );
    for state in [CallState::OutgoingInit, CallState::OutgoingProgress] {
        builder.add_transition(Role::UAC, state, CallEvent::Ringing, Transition::to(CallState::OutgoingRinging));
    }
    for state in [CallState::OutgoingInit, CallState::OutgoingProgress, CallState::OutgoingRinging] {
        builder.add_transition(
            Role::UAC,
            state,
            CallEvent::EarlyMedia,
            Transition::to(CallState::OutgoingEarlyMedia),
        );
    }

    // Final answer to the initial offer
    for state in OUTGOING {
        builder.add_transition(
            Role::UAC,
            state,
            CallEvent::AnswerReceived,
            Transition::to(CallState::Connected).with_actions([Action::Renegotiate]),
        );
    }
}
