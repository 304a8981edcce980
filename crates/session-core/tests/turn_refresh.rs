// TURN credentials refreshed before a call attempt

mod common;

use common::*;
use rvoip_session_core::CallState;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn endpoint(template: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/turn"))
        .respond_with(template)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn credentials_are_fetched_before_the_offer() {
    let server = endpoint(ResponseTemplate::new(200).set_body_json(json!({
        "username": "turnuser",
        "password": "turnpass",
        "ttl": 600,
        "uris": ["turn:relay.example.org:3479?transport=udp"]
    })))
    .await;

    let mut policy = nat_policy();
    policy.enable_turn(true);
    policy.set_turn_configuration_endpoint(format!("{}/turn", server.uri()));
    let mut h = Harness::with(config(), Some(policy), FixedCapabilities::audio());

    h.session.start_outgoing().await.unwrap();
    assert_eq!(h.session.state(), CallState::OutgoingInit);

    let policy = h.session.nat_policy().unwrap();
    assert_eq!(policy.stun_server(), "relay.example.org:3479");
    assert!(policy.core().auth_infos().find("turnuser").is_some());
    assert!(!policy.need_to_update_turn_configuration());
}

#[tokio::test]
async fn unreachable_configuration_does_not_block_the_call() {
    let server = endpoint(ResponseTemplate::new(503)).await;

    let mut policy = nat_policy();
    policy.enable_turn(true);
    policy.set_stun_server("turn.example.org");
    policy.set_turn_configuration_endpoint(format!("{}/turn", server.uri()));
    let mut h = Harness::with(config(), Some(policy), FixedCapabilities::audio());

    h.session.start_outgoing().await.unwrap();
    assert_eq!(h.session.state(), CallState::OutgoingInit);
    assert!(h.session.local_offer().is_some());

    let policy = h.session.nat_policy().unwrap();
    assert_eq!(policy.stun_server(), "turn.example.org");
    assert!(policy.need_to_update_turn_configuration());
}

#[tokio::test]
async fn incoming_call_refreshes_on_accept() {
    let server = endpoint(ResponseTemplate::new(200).set_body_json(json!({
        "username": "u",
        "password": "p"
    })))
    .await;

    let mut policy = nat_policy();
    policy.enable_turn(true);
    policy.set_turn_configuration_endpoint(format!("{}/turn", server.uri()));
    let mut h = Harness::with(config(), Some(policy), FixedCapabilities::audio());

    h.session
        .propose_remote_description(remote_audio_session(5004, vec![pcmu()]))
        .await
        .unwrap();
    assert!(h.session.nat_policy().unwrap().need_to_update_turn_configuration());

    h.session.accept().await.unwrap();
    assert!(!h.session.nat_policy().unwrap().need_to_update_turn_configuration());
}
