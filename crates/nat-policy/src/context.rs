//! Services a NAT policy borrows from the core that owns it

use std::sync::Arc;

use crate::auth::AuthInfoStore;
use crate::error::Result;
use crate::resolver::{AddressFamily, DnsStunResolver, StunResolver};

/// Shared core services: DNS, HTTP and the credential store.
///
/// Policies hold it behind an `Arc`; one context normally serves every
/// account of a user agent.
pub struct CoreContext {
    /// STUN/TURN server resolution
    resolver: Arc<dyn StunResolver>,

    /// Client for TURN configuration requests
    http: reqwest::Client,

    /// Credentials installed by TURN configuration refreshes
    auth_infos: Arc<AuthInfoStore>,

    /// Resolve servers for IPv6 when set
    ipv6_enabled: bool,
}

impl CoreContext {
    pub fn new(resolver: Arc<dyn StunResolver>) -> Self {
        Self {
            resolver,
            http: reqwest::Client::new(),
            auth_infos: Arc::new(AuthInfoStore::new()),
            ipv6_enabled: false,
        }
    }

    /// Context resolving through the system DNS configuration
    pub fn with_system_dns() -> Result<Self> {
        Ok(Self::new(Arc::new(DnsStunResolver::from_system_conf()?)))
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    pub fn with_auth_infos(mut self, store: Arc<AuthInfoStore>) -> Self {
        self.auth_infos = store;
        self
    }

    pub fn with_ipv6(mut self, enabled: bool) -> Self {
        self.ipv6_enabled = enabled;
        self
    }

    pub fn resolver(&self) -> Arc<dyn StunResolver> {
        Arc::clone(&self.resolver)
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn auth_infos(&self) -> &Arc<AuthInfoStore> {
        &self.auth_infos
    }

    pub fn ipv6_enabled(&self) -> bool {
        self.ipv6_enabled
    }

    pub fn address_family(&self) -> AddressFamily {
        if self.ipv6_enabled {
            AddressFamily::V6
        } else {
            AddressFamily::V4
        }
    }
}

impl std::fmt::Debug for CoreContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreContext")
            .field("auth_infos", &self.auth_infos.len())
            .field("ipv6_enabled", &self.ipv6_enabled)
            .finish()
    }
}
