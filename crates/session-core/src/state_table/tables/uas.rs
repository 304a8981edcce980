use crate::state_table::{Action, CallEvent, CallState, Role, StateTableBuilder, Transition};

/// Add UAS (receiver) specific transitions
pub fn add_uas_transitions(builder: &mut StateTableBuilder) {
    // Idle -> IncomingReceived: INVITE carrying an offer
    builder.add_transition(
        Role::UAS,
        CallState::Idle,
        CallEvent::IncomingOffer,
        Transition::to(CallState::IncomingReceived),
    );

    builder.add_transition(
        Role::UAS,
        CallState::IncomingReceived,
        CallEvent::EarlyMedia,
        Transition::to(CallState::IncomingEarlyMedia),
    );

    for state in [CallState::IncomingReceived, CallState::IncomingEarlyMedia] {
        builder.add_transition(
            Role::UAS,
            state,
            CallEvent::AcceptCall,
            Transition::to(CallState::Connected).with_actions([
                Action::RefreshTurnConfiguration,
                Action::GenerateLocalAnswer,
                Action::Renegotiate,
            ]),
        );
    }
}
