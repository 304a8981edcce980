// Call session configuration loaded from TOML

use pretty_assertions::assert_eq;
use rvoip_media_description::StreamType;
use rvoip_session_core::CallSessionConfig;

#[test]
fn defaults_apply_to_missing_keys() {
    let config: CallSessionConfig = toml::from_str(
        r#"
        media_types = ["Audio", "Video"]
        local_address = "192.0.2.10"
        bundle_outgoing = true
        "#,
    )
    .unwrap();

    assert_eq!(config.media_types, vec![StreamType::Audio, StreamType::Video]);
    assert_eq!(config.local_address, "192.0.2.10");
    assert!(config.bundle_outgoing);
    assert!(config.accept_bundles);
    assert!(!config.one_matching_codec);
    assert_eq!(config.username, "rvoip");
    assert_eq!(config.bandwidth, 0);
}

#[test]
fn empty_document_is_the_default() {
    let config: CallSessionConfig = toml::from_str("").unwrap();
    assert_eq!(config.media_types, vec![StreamType::Audio]);
    assert_eq!(config.local_address, "0.0.0.0");
}

#[test]
fn builders_override_fields() {
    let config = CallSessionConfig::default()
        .with_username("bob")
        .with_bandwidth(256)
        .with_accept_bundles(false)
        .with_one_matching_codec(true);
    assert_eq!(config.username, "bob");
    assert_eq!(config.bandwidth, 256);
    assert!(!config.accept_bundles);
    assert!(config.one_matching_codec);
}
