//! BUNDLE groups (RFC 9143)

use serde::{Deserialize, Serialize};

/// One `a=group:BUNDLE` line.
///
/// The transport owner is the mid whose ICE and DTLS parameters carry the
/// whole group; with BUNDLE tag semantics that is the first mid listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleGroup {
    mids: Vec<String>,
    transport_owner: String,
}

impl BundleGroup {
    pub fn new<I, S>(mids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mids: Vec<String> = mids.into_iter().map(Into::into).collect();
        let transport_owner = mids.first().cloned().unwrap_or_default();
        Self { mids, transport_owner }
    }

    /// Overrides the transport owner, e.g. after the tagged stream was rejected
    pub fn with_transport_owner(mut self, mid: impl Into<String>) -> Self {
        self.transport_owner = mid.into();
        self
    }

    pub fn mids(&self) -> &[String] {
        &self.mids
    }

    pub fn transport_owner(&self) -> &str {
        &self.transport_owner
    }

    pub fn contains(&self, mid: &str) -> bool {
        self.mids.iter().any(|m| m == mid)
    }

    pub fn is_empty(&self) -> bool {
        self.mids.is_empty()
    }
}
