//! STUN/TURN server address resolution
//!
//! [`StunResolver`] is the seam between the policy and DNS. The policy only
//! ever asks for "the addresses of this service on this host"; the DNS
//! implementation does SRV first and falls back to plain address records.

use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use std::net::{IpAddr, SocketAddr};
use tracing::debug;

use crate::error::{NatPolicyError, Result};

/// Address family wanted for the resolved server addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    /// IPv4 only
    V4,
    /// IPv6 preferred, IPv4 kept as fallback
    V6,
}

#[async_trait]
pub trait StunResolver: Send + Sync {
    /// Resolves `_<service>._<transport>.<host>` through SRV records, falling
    /// back to `host:default_port` when there are none.
    async fn resolve_service(
        &self,
        service: &str,
        transport: &str,
        host: &str,
        default_port: u16,
        family: AddressFamily,
    ) -> Result<Vec<SocketAddr>>;

    /// Resolves `host` through A/AAAA records only
    async fn resolve_host(&self, host: &str, port: u16, family: AddressFamily) -> Result<Vec<SocketAddr>>;
}

/// [`StunResolver`] backed by hickory's tokio resolver
pub struct DnsStunResolver {
    resolver: TokioAsyncResolver,
}

impl DnsStunResolver {
    /// Resolver using the host's `/etc/resolv.conf` (or platform equivalent)
    pub fn from_system_conf() -> Result<Self> {
        let resolver = TokioAsyncResolver::tokio_from_system_conf().map_err(|e| NatPolicyError::ResolutionFailed {
            host: "system configuration".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { resolver })
    }

    pub fn with_config(config: ResolverConfig, opts: ResolverOpts) -> Self {
        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
        }
    }
}

#[async_trait]
impl StunResolver for DnsStunResolver {
    async fn resolve_service(
        &self,
        service: &str,
        transport: &str,
        host: &str,
        default_port: u16,
        family: AddressFamily,
    ) -> Result<Vec<SocketAddr>> {
        if host.parse::<IpAddr>().is_ok() {
            return self.resolve_host(host, default_port, family).await;
        }

        let name = format!("_{}._{}.{}", service, transport, host);
        match self.resolver.srv_lookup(name.as_str()).await {
            Ok(lookup) => {
                let mut records: Vec<_> = lookup.iter().collect();
                records.sort_by_key(|srv| (srv.priority(), std::cmp::Reverse(srv.weight())));

                let mut addrs = Vec::new();
                for srv in records {
                    let target = srv.target().to_utf8();
                    let target = target.trim_end_matches('.');
                    match self.resolve_host(target, srv.port(), family).await {
                        Ok(found) => addrs.extend(found),
                        Err(e) => debug!("SRV target {} of {} did not resolve: {}", target, name, e),
                    }
                }
                if !addrs.is_empty() {
                    return Ok(addrs);
                }
            }
            Err(e) => debug!("No SRV record for {}: {}", name, e),
        }

        self.resolve_host(host, default_port, family).await
    }

    async fn resolve_host(&self, host: &str, port: u16, family: AddressFamily) -> Result<Vec<SocketAddr>> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![SocketAddr::new(ip, port)]);
        }

        let lookup = self
            .resolver
            .lookup_ip(host)
            .await
            .map_err(|e| NatPolicyError::ResolutionFailed {
                host: host.to_string(),
                reason: e.to_string(),
            })?;

        let addrs = order_by_family(lookup.iter().collect(), family)
            .into_iter()
            .map(|ip| SocketAddr::new(ip, port))
            .collect::<Vec<_>>();
        if addrs.is_empty() {
            return Err(NatPolicyError::ResolutionFailed {
                host: host.to_string(),
                reason: "no address of the requested family".to_string(),
            });
        }
        Ok(addrs)
    }
}

/// Drops or reorders addresses according to the wanted family
pub(crate) fn order_by_family(ips: Vec<IpAddr>, family: AddressFamily) -> Vec<IpAddr> {
    match family {
        AddressFamily::V4 => ips.into_iter().filter(IpAddr::is_ipv4).collect(),
        AddressFamily::V6 => {
            let (mut v6, v4): (Vec<_>, Vec<_>) = ips.into_iter().partition(IpAddr::is_ipv6);
            v6.extend(v4);
            v6
        }
    }
}
