//! NAT traversal policy of an account or call
//!
//! A [`NatPolicy`] is owned by a single task. Asynchronous work (server
//! resolution, TURN configuration requests) runs on spawned tokio tasks and
//! reports back through a channel; results are only applied, and callbacks
//! only invoked, from [`NatPolicy::iterate`] on the owning task.

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::address::{parse_host_port, DEFAULT_STUN_PORT};
use crate::auth::AuthInfo;
use crate::context::CoreContext;
use crate::error::{NatPolicyError, Result};
use crate::turn::{fetch_turn_configuration, TurnCredentials};

/// Longest time [`NatPolicy::stun_server_addrinfo`] waits for a resolution
pub const RESOLUTION_WAIT_LIMIT: Duration = Duration::from_millis(1000);

/// Polling step of that wait
pub const RESOLUTION_POLL_INTERVAL: Duration = Duration::from_millis(10);

const REF_LENGTH: usize = 16;

/// Callback receiving the resolved server addresses, `None` on failure
pub type ResolutionCallback = Box<dyn FnOnce(Option<&[SocketAddr]>) + Send>;

/// Completion of a TURN configuration update, `true` on success
pub type TurnCompletion = Box<dyn FnOnce(bool) + Send>;

/// Identifies a registered resolution callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AsyncHandle(u64);

impl AsyncHandle {
    /// Returned when the callback already ran
    pub const NULL: AsyncHandle = AsyncHandle(0);

    fn next() -> Self {
        static GENERATOR: AtomicU64 = AtomicU64::new(0);
        AsyncHandle(GENERATOR.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

enum Completed {
    Resolution { id: u64, result: Result<Vec<SocketAddr>> },
    TurnConfiguration { id: u64, result: Result<TurnCredentials> },
}

struct PendingResolution {
    id: u64,
    task: JoinHandle<()>,
}

pub struct NatPolicy {
    pub(crate) core: Arc<CoreContext>,

    /// Stable identifier persisted with the policy
    pub(crate) reference: String,

    pub(crate) stun_server: String,
    pub(crate) stun_server_username: String,

    pub(crate) stun_enabled: bool,
    pub(crate) turn_enabled: bool,
    pub(crate) ice_enabled: bool,
    /// Legacy setting, kept for persistence only
    pub(crate) upnp_enabled: bool,
    pub(crate) turn_udp_enabled: bool,
    pub(crate) turn_tcp_enabled: bool,
    pub(crate) turn_tls_enabled: bool,

    /// Empty when TURN credentials are static
    pub(crate) turn_configuration_endpoint: String,

    /// Manually configured public addresses
    pub(crate) nat_v4_address: String,
    pub(crate) nat_v6_address: String,

    /// Last successful resolution of `stun_server`
    resolved: Option<Vec<SocketAddr>>,

    /// In-flight resolution, at most one
    pending: Option<PendingResolution>,

    /// Callbacks waiting for the in-flight resolution
    callbacks: BTreeMap<AsyncHandle, ResolutionCallback>,

    /// Completion of the in-flight TURN configuration update
    turn_completion: Option<(u64, TurnCompletion)>,

    next_task_id: u64,
    completed_tx: mpsc::UnboundedSender<Completed>,
    completed_rx: mpsc::UnboundedReceiver<Completed>,
}

impl NatPolicy {
    pub fn new(core: Arc<CoreContext>) -> Self {
        let (completed_tx, completed_rx) = mpsc::unbounded_channel();
        Self {
            core,
            reference: random_ref(),
            stun_server: String::new(),
            stun_server_username: String::new(),
            stun_enabled: false,
            turn_enabled: false,
            ice_enabled: false,
            upnp_enabled: false,
            turn_udp_enabled: false,
            turn_tcp_enabled: false,
            turn_tls_enabled: false,
            turn_configuration_endpoint: String::new(),
            nat_v4_address: String::new(),
            nat_v6_address: String::new(),
            resolved: None,
            pending: None,
            callbacks: BTreeMap::new(),
            turn_completion: None,
            next_task_id: 0,
            completed_tx,
            completed_rx,
        }
    }

    /// Copy of the settings under the same ref. TCP and TLS TURN transports
    /// are not carried over; resolution state and callbacks never are.
    pub fn clone_policy(&self) -> Self {
        let mut copy = Self::new(Arc::clone(&self.core));
        copy.reference = if self.reference.is_empty() {
            random_ref()
        } else {
            self.reference.clone()
        };
        copy.stun_server = self.stun_server.clone();
        copy.stun_server_username = self.stun_server_username.clone();
        copy.stun_enabled = self.stun_enabled;
        copy.turn_enabled = self.turn_enabled;
        copy.ice_enabled = self.ice_enabled;
        copy.upnp_enabled = self.upnp_enabled;
        copy.turn_udp_enabled = self.turn_udp_enabled;
        copy.turn_configuration_endpoint = self.turn_configuration_endpoint.clone();
        copy.nat_v4_address = self.nat_v4_address.clone();
        copy.nat_v6_address = self.nat_v6_address.clone();
        copy
    }

    pub fn core(&self) -> &Arc<CoreContext> {
        &self.core
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn stun_server(&self) -> &str {
        &self.stun_server
    }

    /// Changing the server drops the cached resolution and any resolution in
    /// flight.
    pub fn set_stun_server(&mut self, stun_server: impl Into<String>) {
        self.stun_server = stun_server.into();
        self.clear_resolver_contexts();
    }

    pub fn stun_server_username(&self) -> &str {
        &self.stun_server_username
    }

    pub fn set_stun_server_username(&mut self, username: impl Into<String>) {
        self.stun_server_username = username.into();
    }

    pub fn stun_enabled(&self) -> bool {
        self.stun_enabled
    }

    pub fn enable_stun(&mut self, enable: bool) {
        self.stun_enabled = enable;
    }

    pub fn turn_enabled(&self) -> bool {
        self.turn_enabled
    }

    pub fn enable_turn(&mut self, enable: bool) {
        self.turn_enabled = enable;
    }

    pub fn ice_enabled(&self) -> bool {
        self.ice_enabled
    }

    pub fn enable_ice(&mut self, enable: bool) {
        self.ice_enabled = enable;
    }

    pub fn upnp_enabled(&self) -> bool {
        self.upnp_enabled
    }

    pub fn enable_upnp(&mut self, enable: bool) {
        if enable {
            warn!("UPnP is not supported, the setting is only kept for compatibility");
        }
        self.upnp_enabled = enable;
    }

    pub fn turn_udp_enabled(&self) -> bool {
        self.turn_udp_enabled
    }

    pub fn enable_turn_udp(&mut self, enable: bool) {
        self.turn_udp_enabled = enable;
    }

    pub fn turn_tcp_enabled(&self) -> bool {
        self.turn_tcp_enabled
    }

    pub fn enable_turn_tcp(&mut self, enable: bool) {
        self.turn_tcp_enabled = enable;
    }

    pub fn turn_tls_enabled(&self) -> bool {
        self.turn_tls_enabled
    }

    pub fn enable_turn_tls(&mut self, enable: bool) {
        self.turn_tls_enabled = enable;
    }

    pub fn turn_configuration_endpoint(&self) -> &str {
        &self.turn_configuration_endpoint
    }

    pub fn set_turn_configuration_endpoint(&mut self, endpoint: impl Into<String>) {
        self.turn_configuration_endpoint = endpoint.into();
    }

    pub fn nat_v4_address(&self) -> &str {
        &self.nat_v4_address
    }

    pub fn set_nat_v4_address(&mut self, address: impl Into<String>) {
        self.nat_v4_address = address.into();
    }

    pub fn nat_v6_address(&self) -> &str {
        &self.nat_v6_address
    }

    pub fn set_nat_v6_address(&mut self, address: impl Into<String>) {
        self.nat_v6_address = address.into();
    }

    /// A server is set and STUN or TURN is on
    pub fn stun_server_activated(&self) -> bool {
        !self.stun_server.is_empty() && (self.stun_enabled || self.turn_enabled)
    }

    /// Resets every setting except the ref
    pub fn clear(&mut self) {
        self.clear_resolver_contexts();
        self.stun_server.clear();
        self.stun_server_username.clear();
        self.stun_enabled = false;
        self.turn_enabled = false;
        self.ice_enabled = false;
        self.upnp_enabled = false;
        self.turn_udp_enabled = false;
        self.turn_tcp_enabled = false;
        self.turn_tls_enabled = false;
        self.turn_configuration_endpoint.clear();
        self.nat_v4_address.clear();
        self.nat_v6_address.clear();
    }

    /// Cancels the pending resolution and drops registered callbacks without
    /// calling them. Used when the owning core shuts down.
    pub fn release(&mut self) {
        self.clear_resolver_contexts();
        self.callbacks.clear();
        self.turn_completion = None;
    }

    fn clear_resolver_contexts(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.task.abort();
        }
        self.resolved = None;
    }

    /// Cached addresses of the last successful resolution
    pub fn resolved_addresses(&self) -> Option<&[SocketAddr]> {
        self.resolved.as_deref()
    }

    pub fn resolution_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn next_task_id(&mut self) -> u64 {
        self.next_task_id += 1;
        self.next_task_id
    }

    /// Starts resolving the STUN/TURN server.
    ///
    /// Returns `true` when a resolution was started. Nothing starts when no
    /// server is activated, when one is already in flight, when the server
    /// setting cannot be parsed or when called outside a tokio runtime.
    pub fn resolve_stun_server(&mut self) -> bool {
        if !self.stun_server_activated() || self.pending.is_some() {
            return false;
        }

        let (host, port) = match parse_host_port(&self.stun_server) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Cannot resolve stun server [{}]: {}", self.stun_server, e);
                return false;
            }
        };
        let service = if self.turn_enabled { "turn" } else { "stun" };
        let family = self.core.address_family();

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!("{}", NatPolicyError::NoRuntime("stun server resolution"));
                return false;
            }
        };

        info!(stun_server = %self.stun_server, "Starting stun server resolution [{}]", host);
        let id = self.next_task_id();
        let resolver = self.core.resolver();
        let tx = self.completed_tx.clone();
        let task = runtime.spawn(async move {
            let result = match port {
                Some(port) => resolver.resolve_host(&host, port, family).await,
                None => {
                    resolver
                        .resolve_service(service, "udp", &host, DEFAULT_STUN_PORT, family)
                        .await
                }
            };
            let _ = tx.send(Completed::Resolution { id, result });
        });
        self.pending = Some(PendingResolution { id, task });
        true
    }

    /// Applies results of finished asynchronous work and runs the callbacks
    /// waiting for them.
    pub fn iterate(&mut self) {
        while let Ok(done) = self.completed_rx.try_recv() {
            match done {
                Completed::Resolution { id, result } => self.stun_server_resolved(id, result),
                Completed::TurnConfiguration { id, result } => self.turn_configuration_received(id, result),
            }
        }
    }

    fn stun_server_resolved(&mut self, id: u64, result: Result<Vec<SocketAddr>>) {
        if self.pending.as_ref().map(|p| p.id) != Some(id) {
            debug!("Ignoring result of a cancelled stun server resolution");
            return;
        }
        self.pending = None;

        self.resolved = match result {
            Ok(addrs) if !addrs.is_empty() => {
                info!(stun_server = %self.stun_server, "Stun server resolution successful: {:?}", addrs);
                Some(addrs)
            }
            Ok(_) => {
                warn!(stun_server = %self.stun_server, "Stun server resolution failed: no address");
                None
            }
            Err(e) => {
                warn!(stun_server = %self.stun_server, "Stun server resolution failed: {}", e);
                None
            }
        };

        let callbacks = std::mem::take(&mut self.callbacks);
        for (_, callback) in callbacks {
            callback(self.resolved.as_deref());
        }
    }

    /// Server addresses, waiting briefly when none are cached.
    ///
    /// When nothing is cached a resolution is started and completed work is
    /// polled every [`RESOLUTION_POLL_INTERVAL`] for at most
    /// [`RESOLUTION_WAIT_LIMIT`]. Call setup must not stall on an unreachable
    /// DNS server, so the result may be `None` even though a resolution is
    /// still running; a later call picks it up.
    pub async fn stun_server_addrinfo(&mut self) -> Option<&[SocketAddr]> {
        if self.stun_server_activated() && self.resolved.is_none() {
            self.resolve_stun_server();
            let mut waited = Duration::ZERO;
            loop {
                self.iterate();
                if self.resolved.is_some() || self.pending.is_none() || waited >= RESOLUTION_WAIT_LIMIT {
                    break;
                }
                tokio::time::sleep(RESOLUTION_POLL_INTERVAL).await;
                waited += RESOLUTION_POLL_INTERVAL;
            }
        }
        self.resolved.as_deref()
    }

    /// Delivers the server addresses to `on_results`.
    ///
    /// With nothing to resolve, or a cached result, the callback runs before
    /// this returns and the handle is [`AsyncHandle::NULL`]. Otherwise the
    /// callback is registered, a resolution is started unless one is already
    /// in flight, and the returned handle can be passed to
    /// [`NatPolicy::cancel_async`].
    pub fn stun_server_addrinfo_async<F>(&mut self, on_results: F) -> AsyncHandle
    where
        F: FnOnce(Option<&[SocketAddr]>) + Send + 'static,
    {
        if !self.stun_server_activated() || self.resolved.is_some() {
            on_results(self.resolved.as_deref());
            return AsyncHandle::NULL;
        }

        if self.pending.is_none() && !self.resolve_stun_server() {
            on_results(None);
            return AsyncHandle::NULL;
        }

        let handle = AsyncHandle::next();
        self.callbacks.insert(handle, Box::new(on_results));
        handle
    }

    /// Unregisters a callback. Unknown handles are logged and ignored.
    pub fn cancel_async(&mut self, handle: AsyncHandle) {
        if self.callbacks.remove(&handle).is_none() {
            error!("NatPolicy: no AsyncHandle with id {}", handle.id());
        }
    }

    /// True when an endpoint is configured and there is no live credential
    /// for the stun server username
    pub fn need_to_update_turn_configuration(&self) -> bool {
        !self.turn_configuration_endpoint.is_empty()
            && self.core.auth_infos().find(&self.stun_server_username).is_none()
    }

    /// Requests fresh TURN credentials from the configuration endpoint.
    ///
    /// `completion` runs from [`NatPolicy::iterate`] with the outcome, or
    /// right away when the request cannot be issued. A newer update, or
    /// [`NatPolicy::cancel_turn_configuration_update`], discards it.
    pub fn update_turn_configuration<F>(&mut self, completion: F)
    where
        F: FnOnce(bool) + Send + 'static,
    {
        if self.turn_configuration_endpoint.is_empty() {
            error!("{}", NatPolicyError::NoTurnEndpoint);
            completion(false);
            return;
        }
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                error!("{}", NatPolicyError::NoRuntime("TURN configuration update"));
                completion(false);
                return;
            }
        };

        let id = self.next_task_id();
        let client = self.core.http().clone();
        let endpoint = self.turn_configuration_endpoint.clone();
        let tx = self.completed_tx.clone();
        runtime.spawn(async move {
            let result = fetch_turn_configuration(&client, &endpoint).await;
            let _ = tx.send(Completed::TurnConfiguration { id, result });
        });
        self.turn_completion = Some((id, Box::new(completion)));
    }

    /// Forgets the completion of the update in flight. The request itself
    /// runs to its end and its result is ignored.
    pub fn cancel_turn_configuration_update(&mut self) {
        self.turn_completion = None;
    }

    pub fn turn_configuration_update_pending(&self) -> bool {
        self.turn_completion.is_some()
    }

    /// Fetches and applies TURN credentials on the current task
    pub async fn refresh_turn_configuration(&mut self) -> Result<()> {
        if self.turn_configuration_endpoint.is_empty() {
            return Err(NatPolicyError::NoTurnEndpoint);
        }
        match fetch_turn_configuration(self.core.http(), &self.turn_configuration_endpoint).await {
            Ok(credentials) => {
                self.apply_turn_credentials(credentials);
                Ok(())
            }
            Err(e) => {
                error!(endpoint = %self.turn_configuration_endpoint, "TURN configuration update failed: {}", e);
                Err(e)
            }
        }
    }

    fn turn_configuration_received(&mut self, id: u64, result: Result<TurnCredentials>) {
        let completion = match self.turn_completion.take() {
            Some((pending_id, completion)) if pending_id == id => completion,
            other => {
                self.turn_completion = other;
                debug!("Ignoring result of a discarded TURN configuration update");
                return;
            }
        };

        let success = match result {
            Ok(credentials) => {
                self.apply_turn_credentials(credentials);
                true
            }
            Err(e) => {
                error!(endpoint = %self.turn_configuration_endpoint, "TURN configuration update failed: {}", e);
                false
            }
        };
        completion(success);
    }

    fn apply_turn_credentials(&mut self, credentials: TurnCredentials) {
        if let Some(server) = credentials.server {
            self.set_stun_server(server);
        }
        self.stun_server_username = credentials.username.clone();

        let mut info = AuthInfo::new(credentials.username, credentials.password);
        info.expires = credentials.expires;
        info!(
            stun_server = %self.stun_server,
            username = %info.username,
            "TURN configuration updated, credentials valid until {:?}",
            info.expires
        );
        self.core.auth_infos().add(info);
    }
}

impl Drop for NatPolicy {
    fn drop(&mut self) {
        self.clear_resolver_contexts();
    }
}

impl std::fmt::Debug for NatPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatPolicy")
            .field("ref", &self.reference)
            .field("stun_server", &self.stun_server)
            .field("stun_enabled", &self.stun_enabled)
            .field("turn_enabled", &self.turn_enabled)
            .field("ice_enabled", &self.ice_enabled)
            .field("resolved", &self.resolved)
            .finish()
    }
}

fn random_ref() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REF_LENGTH)
        .map(char::from)
        .collect()
}
