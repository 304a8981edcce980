//! Call session configuration

use rvoip_media_description::StreamType;
use serde::Deserialize;

/// Settings a [`CallSession`](crate::CallSession) builds its local
/// descriptions from
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CallSessionConfig {
    /// Stream types requested from the capability provider for local offers
    pub media_types: Vec<StreamType>,

    /// Connection address of local offers and answers
    pub local_address: String,

    /// Username placed in the origin line
    pub username: String,

    /// Session bandwidth in kbit/s, 0 for none
    pub bandwidth: u32,

    /// Group outgoing streams in one BUNDLE group
    pub bundle_outgoing: bool,

    /// Keep the BUNDLE groups of incoming offers
    pub accept_bundles: bool,

    /// Answer with a single real codec (plus telephone-event)
    pub one_matching_codec: bool,
}

impl Default for CallSessionConfig {
    fn default() -> Self {
        Self {
            media_types: vec![StreamType::Audio],
            local_address: "0.0.0.0".to_string(),
            username: "rvoip".to_string(),
            bandwidth: 0,
            bundle_outgoing: false,
            accept_bundles: true,
            one_matching_codec: false,
        }
    }
}

impl CallSessionConfig {
    pub fn with_media_types(mut self, media_types: impl IntoIterator<Item = StreamType>) -> Self {
        self.media_types = media_types.into_iter().collect();
        self
    }

    pub fn with_local_address(mut self, address: impl Into<String>) -> Self {
        self.local_address = address.into();
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn with_bandwidth(mut self, kbps: u32) -> Self {
        self.bandwidth = kbps;
        self
    }

    pub fn with_bundle_outgoing(mut self, enabled: bool) -> Self {
        self.bundle_outgoing = enabled;
        self
    }

    pub fn with_accept_bundles(mut self, enabled: bool) -> Self {
        self.accept_bundles = enabled;
        self
    }

    pub fn with_one_matching_codec(mut self, enabled: bool) -> Self {
        self.one_matching_codec = enabled;
        self
    }
}
