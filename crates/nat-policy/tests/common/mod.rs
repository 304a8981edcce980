// Shared helpers for NAT policy tests

#![allow(dead_code)]

use async_trait::async_trait;
use rvoip_nat_policy::{AddressFamily, CoreContext, NatPolicy, NatPolicyError, Result, StunResolver};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One resolver call as seen by [`ScriptedResolver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverCall {
    Service { service: String, host: String, port: u16 },
    Host { host: String, port: u16 },
}

/// Resolver answering every request with the same scripted outcome
pub struct ScriptedResolver {
    answer: Option<Vec<SocketAddr>>,
    delay: Duration,
    calls: Mutex<Vec<ResolverCall>>,
}

impl ScriptedResolver {
    pub fn answering(addrs: &[&str]) -> Self {
        Self {
            answer: Some(addrs.iter().map(|a| a.parse().unwrap()).collect()),
            delay: Duration::from_millis(20),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            delay: Duration::from_millis(20),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<ResolverCall> {
        self.calls.lock().unwrap().clone()
    }

    async fn answer(&self, host: &str) -> Result<Vec<SocketAddr>> {
        tokio::time::sleep(self.delay).await;
        self.answer.clone().ok_or_else(|| NatPolicyError::ResolutionFailed {
            host: host.to_string(),
            reason: "scripted failure".to_string(),
        })
    }
}

#[async_trait]
impl StunResolver for ScriptedResolver {
    async fn resolve_service(
        &self,
        service: &str,
        _transport: &str,
        host: &str,
        default_port: u16,
        _family: AddressFamily,
    ) -> Result<Vec<SocketAddr>> {
        self.calls.lock().unwrap().push(ResolverCall::Service {
            service: service.to_string(),
            host: host.to_string(),
            port: default_port,
        });
        self.answer(host).await
    }

    async fn resolve_host(&self, host: &str, port: u16, _family: AddressFamily) -> Result<Vec<SocketAddr>> {
        self.calls.lock().unwrap().push(ResolverCall::Host {
            host: host.to_string(),
            port,
        });
        self.answer(host).await
    }
}

/// STUN enabled policy on `server`, backed by `resolver`
pub fn stun_policy(resolver: Arc<ScriptedResolver>, server: &str) -> NatPolicy {
    let mut policy = NatPolicy::new(Arc::new(CoreContext::new(resolver)));
    policy.enable_stun(true);
    policy.set_stun_server(server);
    policy
}

/// Runs `iterate` until `done` holds or `limit` elapses
pub async fn iterate_until(policy: &mut NatPolicy, limit: Duration, mut done: impl FnMut(&NatPolicy) -> bool) -> bool {
    let step = Duration::from_millis(10);
    let mut waited = Duration::ZERO;
    loop {
        policy.iterate();
        if done(policy) {
            return true;
        }
        if waited >= limit {
            return false;
        }
        tokio::time::sleep(step).await;
        waited += step;
    }
}
