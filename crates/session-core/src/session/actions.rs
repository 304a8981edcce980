use rvoip_media_description::{
    BundleGroup, ChangeFlags, MediaSessionDescriptor, StreamDescriptor, StreamDirection,
};
use tracing::{debug, info, warn};

use super::CallSession;
use crate::errors::{Result, SessionError};
use crate::events::SessionEvent;
use crate::negotiation::{answer_incoming, process_answer, AnswerOptions, RenegotiationPlan, StreamAction};
use crate::state_table::{Action, CallEvent, CallState};

impl CallSession {
    /// Execute an action from the state table
    pub(super) async fn execute_action(&mut self, action: Action, event: CallEvent) -> Result<()> {
        debug!(session_id = %self.id, "Executing action: {:?}", action);

        match action {
            Action::RefreshTurnConfiguration => {
                if let Some(policy) = self.nat_policy.as_mut() {
                    if policy.need_to_update_turn_configuration() {
                        info!(session_id = %self.id, "Refreshing TURN configuration before the call");
                        if let Err(e) = policy.refresh_turn_configuration().await {
                            warn!(session_id = %self.id, "Proceeding with existing TURN credentials: {}", e);
                        }
                    }
                }
            }
            Action::GenerateLocalOffer => {
                let direction = match event {
                    CallEvent::HoldCall => StreamDirection::SendOnly,
                    _ => StreamDirection::SendRecv,
                };
                let offer = self.build_local_offer(direction)?;
                info!(
                    session_id = %self.id,
                    "Generated local offer with {} streams (version {})",
                    offer.nb_streams(),
                    offer.session_version()
                );
                self.local_offer = Some(offer);
                self.local_answer = None;
                self.remote_offer = None;
                self.remote_answer = None;
            }
            Action::GenerateLocalAnswer => {
                // a call we hold stays held whatever the peer re-offers
                let direction = match self.state {
                    CallState::Paused => StreamDirection::SendOnly,
                    _ => StreamDirection::SendRecv,
                };
                let capabilities = self.build_local_description(direction)?;
                let remote_offer = self
                    .remote_offer
                    .as_ref()
                    .ok_or(SessionError::MissingDescription("remote offer"))?;
                let options = AnswerOptions {
                    one_matching_codec: self.config.one_matching_codec,
                    accept_bundles: self.config.accept_bundles,
                };
                let outcome = answer_incoming(&capabilities, remote_offer, options)?;
                self.local_answer = Some(outcome.answer);
                self.pending = Some(outcome.negotiated);
            }
            Action::Renegotiate => {
                let next = match self.pending.take() {
                    Some(negotiated) => negotiated,
                    None => {
                        let offer = self
                            .local_offer
                            .as_ref()
                            .ok_or(SessionError::MissingDescription("local offer"))?;
                        let answer = self
                            .remote_answer
                            .as_ref()
                            .ok_or(SessionError::MissingDescription("remote answer"))?;
                        process_answer(offer, answer)?
                    }
                };
                self.apply_negotiated(next).await?;
            }
            Action::StopAllStreams => {
                if let Some(current) = &self.current {
                    for (index, stream) in current.streams().iter().enumerate() {
                        if !stream.is_enabled() {
                            continue;
                        }
                        if let Err(e) = self.media.stop_stream(index).await {
                            warn!(session_id = %self.id, "Failed to stop stream {}: {}", index, e);
                        }
                    }
                }
            }
            Action::ReleaseDescriptions => {
                self.local_offer = None;
                self.local_answer = None;
                self.remote_offer = None;
                self.remote_answer = None;
                self.pending = None;
                self.current = None;
            }
            Action::ReleaseNatPolicy => {
                if let Some(policy) = self.nat_policy.as_mut() {
                    policy.release();
                }
            }
        }

        Ok(())
    }

    /// Runs the diff against the current description, drives the media
    /// engine accordingly and makes `next` the current description
    async fn apply_negotiated(&mut self, next: MediaSessionDescriptor) -> Result<()> {
        let plan = match &self.current {
            None => RenegotiationPlan::initial(&next),
            Some(current) => {
                let forced = if self.force_reconstruction {
                    ChangeFlags::FORCE_STREAM_RECONSTRUCTION
                } else {
                    ChangeFlags::empty()
                };
                RenegotiationPlan::between(current, &next, forced)
            }
        };
        info!(
            session_id = %self.id,
            flags = %plan.flags.describe(),
            "Media description differences: {}",
            plan.flags.describe()
        );

        if let Err(e) = self.run_plan(&plan, &next).await {
            // streams now run a mix of both descriptions
            self.stop_streams_after_failure(&next).await;
            self.current = None;
            return Err(match e {
                SessionError::Media { .. } => e,
                other => SessionError::media(other.to_string()),
            });
        }

        // the previous description is dropped here
        self.current = Some(next);
        self.force_reconstruction = false;

        if plan.ice_restart {
            self.emit(SessionEvent::IceRestart {
                session_id: self.id.clone(),
            });
        }
        self.emit(SessionEvent::Renegotiated {
            session_id: self.id.clone(),
            flags: plan.flags,
            plan,
        });
        Ok(())
    }

    async fn run_plan(&self, plan: &RenegotiationPlan, next: &MediaSessionDescriptor) -> Result<()> {
        if plan.ice_restart {
            info!(session_id = %self.id, "ICE restart detected");
            self.media.restart_ice(next).await?;
        }

        for (index, action) in plan.streams.iter().enumerate() {
            match action {
                StreamAction::Keep => {}
                StreamAction::Start => self.media.start_stream(index, negotiated_stream(next, index)?).await?,
                StreamAction::UpdateEndpoints => {
                    self.media
                        .update_endpoints(index, negotiated_stream(next, index)?)
                        .await?
                }
                StreamAction::Rebuild => {
                    self.media
                        .rebuild_stream(index, negotiated_stream(next, index)?)
                        .await?
                }
                StreamAction::Stop => self.media.stop_stream(index).await?,
            }
        }
        Ok(())
    }

    /// Stops every slot enabled in the current or the failed description
    async fn stop_streams_after_failure(&self, failed: &MediaSessionDescriptor) {
        let enabled_in = |description: Option<&MediaSessionDescriptor>, index: usize| {
            description
                .and_then(|d| d.stream(index))
                .map_or(false, StreamDescriptor::is_enabled)
        };
        let slots = failed
            .nb_streams()
            .max(self.current.as_ref().map_or(0, MediaSessionDescriptor::nb_streams));
        for index in 0..slots {
            if !enabled_in(Some(failed), index) && !enabled_in(self.current.as_ref(), index) {
                continue;
            }
            if let Err(e) = self.media.stop_stream(index).await {
                warn!(session_id = %self.id, "Failed to stop stream {}: {}", index, e);
            }
        }
    }

    /// Offer from the local capabilities, keeping the media lines of the
    /// current description in place
    fn build_local_offer(&mut self, direction: StreamDirection) -> Result<MediaSessionDescriptor> {
        let offer = self.build_local_description(direction)?;
        let Some(current) = &self.current else {
            return Ok(offer);
        };
        if current.nb_streams() <= offer.nb_streams() {
            return Ok(offer);
        }

        // a media line never disappears from a session, it is disabled
        let mut builder = offer.to_builder();
        for stream in &current.streams()[offer.nb_streams()..] {
            let mut disabled = StreamDescriptor::new(stream.stream_type, stream.proto)
                .with_direction(StreamDirection::Inactive)
                .with_codecs(stream.codecs.iter().take(1).cloned());
            disabled.type_other = stream.type_other.clone();
            disabled.proto_other = stream.proto_other.clone();
            builder = builder.stream(disabled);
        }
        Ok(builder.build()?)
    }

    /// Local description from the capability provider and the NAT policy
    fn build_local_description(&mut self, direction: StreamDirection) -> Result<MediaSessionDescriptor> {
        let mut streams = self.capabilities.enumerate_streams(&self.config.media_types);
        let mut bundle = Vec::new();
        if self.config.bundle_outgoing {
            for (index, stream) in streams.iter_mut().enumerate().filter(|(_, s)| s.is_enabled()) {
                stream.mid = index.to_string();
                stream.rtcp_mux = true;
                bundle.push(stream.mid.clone());
            }
        }

        self.sdp_version += 1;
        let mut builder = MediaSessionDescriptor::builder()
            .address(self.local_address())
            .bandwidth(self.config.bandwidth)
            .origin(self.config.username.as_str(), self.sdp_session_id, self.sdp_version)
            .streams(streams)
            .with_direction(direction);
        if self.nat_policy.as_ref().map_or(false, |p| p.ice_enabled()) {
            builder = builder.ice_credentials(self.ice_ufrag.as_str(), self.ice_pwd.as_str());
        }
        if !bundle.is_empty() {
            builder = builder.bundle(BundleGroup::new(bundle));
        }
        Ok(builder.build()?)
    }

    /// Manual NAT addresses take precedence over the configured address
    fn local_address(&self) -> String {
        if let Some(policy) = &self.nat_policy {
            if !policy.nat_v4_address().is_empty() {
                return policy.nat_v4_address().to_string();
            }
            if !policy.nat_v6_address().is_empty() {
                return policy.nat_v6_address().to_string();
            }
        }
        self.config.local_address.clone()
    }
}

fn negotiated_stream(description: &MediaSessionDescriptor, index: usize) -> Result<&StreamDescriptor> {
    description
        .stream(index)
        .ok_or(SessionError::MissingDescription("negotiated stream"))
}
