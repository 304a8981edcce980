use crate::state_table::{Action, CallEvent, CallState, StateTableBuilder, Transition, ALL_STATES};

/// Add common transitions that apply to both UAC and UAS
pub fn add_common_transitions(builder: &mut StateTableBuilder) {
    // Any active state -> End / Error
    for state in ALL_STATES.iter().copied().filter(CallState::is_active) {
        for event in [CallEvent::HangupCall, CallEvent::RemoteHangup] {
            builder.add_common(
                state,
                event,
                Transition::to(CallState::End).with_actions([Action::StopAllStreams]),
            );
        }

        builder.add_common(
            state,
            CallEvent::SignalingFailure,
            Transition::to(CallState::Error).with_actions([Action::StopAllStreams]),
        );

        // The negotiated description stays as it was
        builder.add_common(state, CallEvent::NegotiationFailed, Transition::to(CallState::Error));

        // Streams are already stopped by the session
        builder.add_common(state, CallEvent::MediaFailure, Transition::to(CallState::Error));
    }

    // Tearing down after a failure
    builder.add_common(
        CallState::Error,
        CallEvent::HangupCall,
        Transition::to(CallState::End).with_actions([Action::StopAllStreams]),
    );

    for state in [CallState::End, CallState::Error] {
        builder.add_common(
            state,
            CallEvent::ReleaseCall,
            Transition::to(CallState::Released).with_actions([
                Action::StopAllStreams,
                Action::ReleaseDescriptions,
                Action::ReleaseNatPolicy,
            ]),
        );
    }

    // StreamsRunning -> Pausing -> Paused
    for state in [CallState::StreamsRunning, CallState::PausedByRemote] {
        builder.add_common(
            state,
            CallEvent::HoldCall,
            Transition::to(CallState::Pausing).with_actions([Action::GenerateLocalOffer]),
        );
    }
    builder.add_common(
        CallState::Pausing,
        CallEvent::AnswerReceived,
        Transition::to(CallState::Paused).with_actions([Action::Renegotiate]),
    );

    // Paused -> Resuming -> StreamsRunning
    builder.add_common(
        CallState::Paused,
        CallEvent::ResumeCall,
        Transition::to(CallState::Resuming).with_actions([Action::GenerateLocalOffer]),
    );
    builder.add_common(
        CallState::Resuming,
        CallEvent::AnswerReceived,
        Transition::to(CallState::StreamsRunning).with_actions([Action::Renegotiate]),
    );

    // Local re-offer
    builder.add_common(
        CallState::StreamsRunning,
        CallEvent::UpdateCall,
        Transition::to(CallState::Updating).with_actions([Action::GenerateLocalOffer]),
    );
    builder.add_common(
        CallState::Updating,
        CallEvent::AnswerReceived,
        Transition::to(CallState::StreamsRunning).with_actions([Action::Renegotiate]),
    );

    // Remote re-offer
    for state in [CallState::StreamsRunning, CallState::PausedByRemote] {
        builder.add_common(
            state,
            CallEvent::ReinviteReceived,
            Transition::to(CallState::UpdatedByRemote)
                .with_actions([Action::GenerateLocalAnswer, Action::Renegotiate]),
        );
    }
    // A locally held call stays held whatever the remote offers
    builder.add_common(
        CallState::Paused,
        CallEvent::ReinviteReceived,
        Transition::stay().with_actions([Action::GenerateLocalAnswer, Action::Renegotiate]),
    );

    // Streams (re)started after an answer
    for state in [CallState::Connected, CallState::UpdatedByRemote] {
        builder.add_common(state, CallEvent::StreamsStarted, Transition::to(CallState::StreamsRunning));
        builder.add_common(state, CallEvent::RemotePaused, Transition::to(CallState::PausedByRemote));
    }
}
