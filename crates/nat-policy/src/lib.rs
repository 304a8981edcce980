//! # NAT traversal policy
//!
//! [`NatPolicy`] holds the STUN/TURN/ICE settings of an account and does the
//! network work those settings imply:
//!
//! - resolving the STUN or TURN server (SRV, then A/AAAA) in the background,
//!   with a cached result and a short bounded wait for callers that cannot
//!   proceed without one
//! - refreshing TURN credentials from an HTTP configuration endpoint into the
//!   core's credential store
//! - persisting itself into `nat_policy_<n>` configuration sections
//!
//! All resolution and HTTP failures are recoverable: they are logged and
//! surface as "no result", never as a failed call.

pub mod address;
pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod policy;
pub mod resolver;
pub mod turn;

pub use address::{parse_host_port, DEFAULT_STUN_PORT};
pub use auth::{AuthInfo, AuthInfoStore};
pub use context::CoreContext;
pub use error::{NatPolicyError, Result};
pub use policy::{AsyncHandle, NatPolicy, ResolutionCallback, TurnCompletion};
pub use resolver::{AddressFamily, DnsStunResolver, StunResolver};
pub use turn::{fetch_turn_configuration, TurnCredentials};
