//! Offer/answer engine.
//!
//! [`answer_incoming`] answers a remote offer from local capabilities and
//! [`process_answer`] combines a local offer with the remote answer. Both
//! produce the *negotiated* description the streams run with: codecs in the
//! remote numbering, directions and security from the local point of view,
//! transport endpoints of the remote peer, ICE credentials of the local side.
//! The shape is the same whichever side offered.

use rvoip_media_description::{
    BundleGroup, CodecOffer, CryptoAttribute, CryptoSuite, DtlsRole, MediaSessionDescriptor, MulticastRole,
    StreamDescriptor, StreamDirection,
};
use tracing::{debug, error, info, warn};

use crate::errors::{RejectReason, Result, SessionError};

/// Knobs of the answering side
#[derive(Debug, Clone, Copy, Default)]
pub struct AnswerOptions {
    /// Keep only the first real codec that matches
    pub one_matching_codec: bool,
    /// Copy the offer's BUNDLE groups into the answer
    pub accept_bundles: bool,
}

/// Result of answering a remote offer
#[derive(Debug, Clone)]
pub struct IncomingNegotiation {
    /// What goes back to the offerer (local transport endpoints)
    pub answer: MediaSessionDescriptor,
    /// What the streams run with (remote transport endpoints)
    pub negotiated: MediaSessionDescriptor,
}

/// Why one stream was declined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decline {
    /// The remote side disabled it already
    Disabled,
    NoLocalStream,
    Transport,
    Codec,
    Crypto,
}

impl Decline {
    fn reject_reason(self) -> Option<RejectReason> {
        match self {
            Decline::Disabled => None,
            Decline::NoLocalStream | Decline::Codec => Some(RejectReason::NoCommonCodec),
            Decline::Transport => Some(RejectReason::IncompatibleTransport),
            Decline::Crypto => Some(RejectReason::IncompatibleCrypto),
        }
    }
}

/// Answers `remote_offer` with what `local_capabilities` supports.
///
/// Streams are matched by position. A stream without a compatible local
/// counterpart is declined (port 0, inactive) without failing the whole
/// answer; the negotiation fails only when an offer with enabled streams
/// ends up with none.
pub fn answer_incoming(
    local_capabilities: &MediaSessionDescriptor,
    remote_offer: &MediaSessionDescriptor,
    options: AnswerOptions,
) -> Result<IncomingNegotiation> {
    let mut streams = Vec::with_capacity(remote_offer.nb_streams());
    let mut failure = None;

    for (index, remote) in remote_offer.streams().iter().enumerate() {
        let owner_mid = if options.accept_bundles {
            remote_offer
                .index_of_bundle_transport_owner(remote)
                .and_then(|owner| remote_offer.stream(owner))
                .map(|owner| owner.mid.as_str())
                .unwrap_or("")
        } else {
            ""
        };

        let answered = match local_capabilities.stream(index) {
            Some(local) => answer_stream(local, remote, options, owner_mid),
            None => Err(Decline::NoLocalStream),
        };

        match answered {
            Ok(stream) => streams.push(stream),
            Err(decline) => {
                info!("Declining stream {} ({:?})", index, decline);
                if failure.is_none() && remote.is_enabled() {
                    failure = decline.reject_reason();
                }
                streams.push(declined(remote));
            }
        }
    }

    if remote_offer.nb_active_streams() > 0 && !streams.iter().any(StreamDescriptor::is_enabled) {
        return Err(SessionError::NegotiationFailed {
            reason: failure.unwrap_or(RejectReason::NoCommonCodec),
        });
    }

    let bundles = if options.accept_bundles {
        surviving_bundles(remote_offer.bundles(), &streams)
    } else {
        Vec::new()
    };

    let mut builder = local_capabilities.to_builder().clear_bundles();
    *builder.streams_mut() = streams;
    for group in bundles {
        builder = builder.bundle(group);
    }
    let answer = builder.build()?;

    let mut builder = answer
        .to_builder()
        .address(remote_offer.address())
        .bandwidth(remote_offer.bandwidth());
    for (stream, remote) in builder.streams_mut().iter_mut().zip(remote_offer.streams()) {
        if stream.is_enabled() && !remote.has_multicast_address() {
            stream.rtp_addr = remote.rtp_addr.clone();
            stream.rtp_port = remote.rtp_port;
            stream.rtcp_addr = remote.rtcp_addr.clone();
            stream.rtcp_port = remote.rtcp_port;
            stream.bandwidth = remote.bandwidth;
        }
    }
    let negotiated = builder.build()?;

    Ok(IncomingNegotiation { answer, negotiated })
}

/// Combines our `local_offer` with the peer's `remote_answer`
pub fn process_answer(
    local_offer: &MediaSessionDescriptor,
    remote_answer: &MediaSessionDescriptor,
) -> Result<MediaSessionDescriptor> {
    let mut streams = Vec::with_capacity(local_offer.nb_streams());
    let mut failure = None;

    for (index, local) in local_offer.streams().iter().enumerate() {
        let outcome = match remote_answer.stream(index) {
            Some(remote)
                if remote.stream_type == local.stream_type && local.proto.is_compatible_with(remote.proto) =>
            {
                if local.proto != remote.proto && local.proto.has_avpf() {
                    warn!("Received a downgraded AVP answer for our AVPF offer");
                }
                accept_answered_stream(local, remote)
            }
            Some(_) => Err(Decline::Transport),
            None => Err(Decline::NoLocalStream),
        };

        match outcome {
            Ok(stream) => streams.push(stream),
            Err(decline) => {
                warn!("No matching stream for {} ({:?})", index, decline);
                if failure.is_none() && local.is_enabled() {
                    failure = decline.reject_reason();
                }
                streams.push(declined(local));
            }
        }
    }

    if local_offer.nb_active_streams() > 0 && !streams.iter().any(StreamDescriptor::is_enabled) {
        return Err(SessionError::NegotiationFailed {
            reason: failure.unwrap_or(RejectReason::NoCommonCodec),
        });
    }

    let bundles = if !local_offer.bundles().is_empty() {
        surviving_bundles(remote_answer.bundles(), &streams)
    } else {
        if !remote_answer.bundles().is_empty() {
            error!("Remote answerer is proposing bundles, which we did not offer.");
        }
        Vec::new()
    };

    let mut builder = MediaSessionDescriptor::builder()
        .address(remote_answer.address())
        .bandwidth(remote_answer.bandwidth())
        .ice_credentials(local_offer.ice_ufrag(), local_offer.ice_pwd())
        .ice_lite(local_offer.ice_lite())
        .origin(local_offer.username(), local_offer.session_id(), local_offer.session_version())
        .streams(streams);
    for group in bundles {
        builder = builder.bundle(group);
    }
    Ok(builder.build()?)
}

fn answer_stream(
    local: &StreamDescriptor,
    remote: &StreamDescriptor,
    options: AnswerOptions,
    bundle_owner_mid: &str,
) -> std::result::Result<StreamDescriptor, Decline> {
    if !remote.is_enabled() {
        return Err(Decline::Disabled);
    }
    if local.stream_type != remote.stream_type {
        return Err(Decline::NoLocalStream);
    }
    if !local.proto.is_compatible_with(remote.proto) {
        return Err(Decline::Transport);
    }

    let proto = if local.proto != remote.proto && remote.proto.has_avpf() {
        warn!("Sending a downgraded AVP answer for the received AVPF offer");
        local.proto
    } else {
        remote.proto
    };

    let codecs = match_payloads(&local.codecs, &remote.codecs, false, options.one_matching_codec);
    if codecs.is_empty() || only_telephone_event(&codecs) {
        return Err(Decline::Codec);
    }

    let mut result = StreamDescriptor::new(local.stream_type, proto);
    result.name = local.name.clone();
    result.type_other = local.type_other.clone();
    result.proto_other = remote.proto_other.clone();
    result.ice_ufrag = local.ice_ufrag.clone();
    result.ice_pwd = local.ice_pwd.clone();
    result.codecs = codecs;
    result.direction = compute_dir_incoming(local.direction, remote.direction);

    let remote_multicast = remote.has_multicast_address();
    if remote_multicast {
        if proto.has_srtp() {
            info!("SAVP not supported for multicast address {}", remote.rtp_addr);
            return Err(Decline::Transport);
        }
        result.direction = remote.direction;
        result.ptime_ms = remote.ptime_ms;
        result.max_ptime_ms = remote.max_ptime_ms;
        result.ttl = remote.ttl;
    } else {
        result.ptime_ms = local.ptime_ms;
        result.max_ptime_ms = local.max_ptime_ms;
    }

    result.rtcp_mux = remote.rtcp_mux && local.rtcp_mux;
    if !remote.mid.is_empty() && !bundle_owner_mid.is_empty() {
        result.mid = remote.mid.clone();
        if remote.mid != bundle_owner_mid {
            result.bundle_only = true;
        }
        result.rtcp_mux = true;
    }

    if proto.has_srtp() {
        match match_crypto(&local.crypto, &remote.crypto, true) {
            Some(crypto) => result.crypto = vec![crypto],
            None => {
                info!("No matching crypto algo for remote stream offer");
                return Err(Decline::Crypto);
            }
        }
    }

    result.zrtp_hash_present = local.zrtp_hash_present && remote.zrtp_hash_present;
    result.lime_ik_present = local.lime_ik_present && remote.lime_ik_present;

    if !local.dtls_fingerprint.is_empty() && !remote.dtls_fingerprint.is_empty() {
        result.dtls_fingerprint = local.dtls_fingerprint.clone();
        result.dtls_role = match remote.dtls_role {
            DtlsRole::Unset | DtlsRole::Server => DtlsRole::Client,
            DtlsRole::Client => DtlsRole::Server,
        };
    }
    result.implicit_rtcp_fb = local.implicit_rtcp_fb && remote.implicit_rtcp_fb;

    if remote_multicast {
        result.rtp_addr = remote.rtp_addr.clone();
        result.rtcp_addr = remote.rtcp_addr.clone();
        result.rtp_port = remote.rtp_port;
        // no RTCP on multicast yet
        result.rtcp_port = 0;
        result.bandwidth = remote.bandwidth;
        result.multicast_role = MulticastRole::Receiver;
    } else {
        result.rtp_addr = local.rtp_addr.clone();
        result.rtcp_addr = local.rtcp_addr.clone();
        result.rtp_port = local.rtp_port;
        result.rtcp_port = local.rtcp_port;
        result.bandwidth = local.bandwidth;
    }

    // secondary stream of a bundle: bundle-only with port 0
    if result.bundle_only {
        result.rtp_port = 0;
    }

    Ok(result)
}

fn accept_answered_stream(
    local: &StreamDescriptor,
    remote: &StreamDescriptor,
) -> std::result::Result<StreamDescriptor, Decline> {
    let mut result = StreamDescriptor::new(local.stream_type, remote.proto);
    result.name = local.name.clone();
    result.type_other = local.type_other.clone();
    result.proto_other = remote.proto_other.clone();
    result.ice_ufrag = local.ice_ufrag.clone();
    result.ice_pwd = local.ice_pwd.clone();

    let local_multicast = local.has_multicast_address();
    if local_multicast {
        // answer must mirror a multicast offer
        if local.rtp_addr != remote.rtp_addr
            || local.rtp_port != remote.rtp_port
            || local.direction != remote.direction
            || local.bandwidth != remote.bandwidth
        {
            info!(
                "Remote multicast answer {}:{} does not match offered {}:{}",
                remote.rtp_addr, remote.rtp_port, local.rtp_addr, local.rtp_port
            );
            return Err(Decline::Transport);
        }
        result.multicast_role = MulticastRole::Sender;
    }

    if !remote.is_enabled() {
        return Err(Decline::Disabled);
    }

    let codecs = match_payloads(&local.codecs, &remote.codecs, true, false);

    if local_multicast {
        if local.ptime_ms > 0 && local.ptime_ms != remote.ptime_ms {
            info!("Remote answered ptime [{}] does not match offered [{}]", remote.ptime_ms, local.ptime_ms);
            return Err(Decline::Transport);
        }
        if local.ttl > 0 && local.ttl != remote.ttl {
            info!("Remote answered ttl [{}] does not match offered [{}]", remote.ttl, local.ttl);
            return Err(Decline::Transport);
        }
        result.ttl = local.ttl;
        result.direction = local.direction;
    } else {
        result.direction = compute_dir_outgoing(local.direction, remote.direction);
    }

    result.rtcp_mux = remote.rtcp_mux && local.rtcp_mux;
    if !remote.mid.is_empty() {
        if !local.mid.is_empty() {
            result.mid = remote.mid.clone();
            result.bundle_only = remote.bundle_only;
            result.rtcp_mux = true;
        } else {
            error!("Remote answer sets mid [{}] on a stream we did not bundle", remote.mid);
        }
    }

    if codecs.is_empty() || only_telephone_event(&codecs) {
        return Err(Decline::Codec);
    }
    result.codecs = codecs;
    result.ptime_ms = remote.ptime_ms;
    result.max_ptime_ms = remote.max_ptime_ms;

    if remote.proto.has_srtp() {
        match match_crypto(&local.crypto, &remote.crypto, false) {
            Some(crypto) => result.crypto = vec![crypto],
            None => return Err(Decline::Crypto),
        }
    }

    result.zrtp_hash_present = local.zrtp_hash_present && remote.zrtp_hash_present;
    result.lime_ik_present = local.lime_ik_present && remote.lime_ik_present;

    if !local.dtls_fingerprint.is_empty() && !remote.dtls_fingerprint.is_empty() {
        result.dtls_fingerprint = remote.dtls_fingerprint.clone();
        result.dtls_role = match remote.dtls_role {
            DtlsRole::Client => DtlsRole::Server,
            DtlsRole::Unset | DtlsRole::Server => DtlsRole::Client,
        };
    }
    result.implicit_rtcp_fb = local.implicit_rtcp_fb && remote.implicit_rtcp_fb;

    result.rtp_addr = remote.rtp_addr.clone();
    result.rtp_port = remote.rtp_port;
    result.rtcp_addr = remote.rtcp_addr.clone();
    result.rtcp_port = remote.rtcp_port;
    result.bandwidth = remote.bandwidth;

    Ok(result)
}

/// Codecs both sides can use, in the remote order and numbering.
///
/// When `reading_response` is set (processing an answer to our offer), local
/// payloads the answer dropped or renumbered are appended as receive-only so
/// that a non-compliant peer sending them can still be decoded.
pub fn match_payloads(
    local: &[CodecOffer],
    remote: &[CodecOffer],
    reading_response: bool,
    one_matching_codec: bool,
) -> Vec<CodecOffer> {
    let mut result: Vec<CodecOffer> = Vec::new();
    let mut found_codec = false;

    for offered in remote {
        let Some(local_match) = local.iter().find(|candidate| candidate.matches(offered)) else {
            debug!("No match for {}/{}/{}", offered.mime_type, offered.clock_rate, offered.channels);
            continue;
        };

        if one_matching_codec && !local_match.mime_type.eq_ignore_ascii_case("telephone-event") {
            if found_codec {
                continue;
            }
            found_codec = true;
        }

        let mut matched = local_match.clone();
        // fmtp the remote side wants to receive with
        if let Some(fmtp) = &offered.recv_fmtp {
            matched.send_fmtp = Some(fmtp.clone());
        }
        matched.can_send = true;
        matched.can_recv = true;
        matched.payload_number = offered.payload_number;
        result.push(matched);

        if reading_response && local_match.payload_number != offered.payload_number {
            warn!(
                "For payload type {}, proposed number was {} but the remote phone answered {}",
                local_match.mime_type, local_match.payload_number, offered.payload_number
            );
            push_receive_only(&mut result, local_match);
        }
    }

    if reading_response {
        for proposed in local {
            if !remote.iter().any(|r| r.payload_number == proposed.payload_number) {
                debug!("Adding {}/{} for compatibility, just in case.", proposed.mime_type, proposed.clock_rate);
                push_receive_only(&mut result, proposed);
            }
        }
    }

    result
}

/// Appends a receive-only copy unless the payload number is taken
fn push_receive_only(result: &mut Vec<CodecOffer>, codec: &CodecOffer) {
    if result.iter().any(|c| c.payload_number == codec.payload_number) {
        return;
    }
    result.push(codec.clone().recv_only());
}

fn only_telephone_event(codecs: &[CodecOffer]) -> bool {
    codecs.iter().all(|c| c.mime_type.eq_ignore_ascii_case("telephone-event"))
}

/// First remote suite we also offer. When answering (`use_local_key`) our
/// key goes with the remote tag; when reading an answer the remote key goes
/// with our tag.
pub fn match_crypto(
    local: &[CryptoAttribute],
    remote: &[CryptoAttribute],
    use_local_key: bool,
) -> Option<CryptoAttribute> {
    for offered in remote {
        if offered.suite == CryptoSuite::Undefined {
            break;
        }
        if let Some(ours) = local.iter().find(|l| l.suite == offered.suite) {
            return Some(if use_local_key {
                CryptoAttribute::new(offered.tag, offered.suite, ours.master_key.clone())
            } else {
                CryptoAttribute::new(ours.tag, offered.suite, offered.master_key.clone())
            });
        }
    }
    None
}

/// Our direction after the peer answered `answered` to our `local` direction
pub fn compute_dir_outgoing(local: StreamDirection, answered: StreamDirection) -> StreamDirection {
    match (local, answered) {
        (_, StreamDirection::Inactive) => StreamDirection::Inactive,
        (StreamDirection::SendRecv, StreamDirection::RecvOnly) => StreamDirection::SendOnly,
        (StreamDirection::SendRecv, StreamDirection::SendOnly) => StreamDirection::RecvOnly,
        (local, _) => local,
    }
}

/// Direction to answer with when the peer offers `offered` and we support `local`
pub fn compute_dir_incoming(local: StreamDirection, offered: StreamDirection) -> StreamDirection {
    use StreamDirection::*;
    match local {
        SendRecv => offered.reversed(),
        SendOnly => match offered {
            RecvOnly | SendRecv => SendOnly,
            SendOnly | Inactive => Inactive,
        },
        RecvOnly => match offered {
            SendOnly | SendRecv => RecvOnly,
            RecvOnly | Inactive => Inactive,
        },
        Inactive => Inactive,
    }
}

/// True when the offer puts every enabled stream on hold (sendonly or
/// inactive, the null connection address counting as sendonly)
pub fn puts_on_hold(offer: &MediaSessionDescriptor) -> bool {
    let mut enabled = offer.streams().iter().filter(|s| s.is_enabled()).peekable();
    if enabled.peek().is_none() {
        return false;
    }
    enabled.all(|s| {
        matches!(
            offer.effective_direction(s),
            StreamDirection::SendOnly | StreamDirection::Inactive
        )
    })
}

/// Declined stream of an answer: same media line, port 0, inactive
fn declined(remote: &StreamDescriptor) -> StreamDescriptor {
    let mut stream = StreamDescriptor::new(remote.stream_type, remote.proto).with_direction(StreamDirection::Inactive);
    stream.type_other = remote.type_other.clone();
    stream.proto_other = remote.proto_other.clone();
    stream
}

/// BUNDLE groups restricted to the mids still carried by `streams`
fn surviving_bundles(groups: &[BundleGroup], streams: &[StreamDescriptor]) -> Vec<BundleGroup> {
    groups
        .iter()
        .filter_map(|group| {
            let mids: Vec<String> = group
                .mids()
                .iter()
                .filter(|mid| streams.iter().any(|s| &s.mid == *mid))
                .cloned()
                .collect();
            if mids.is_empty() {
                return None;
            }
            let owner = if mids.iter().any(|m| m == group.transport_owner()) {
                group.transport_owner().to_string()
            } else {
                mids[0].clone()
            };
            Some(BundleGroup::new(mids).with_transport_owner(owner))
        })
        .collect()
}
