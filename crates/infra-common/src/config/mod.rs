//! Sectioned key/value configuration
//!
//! Named sections holding string values. Booleans, integers and string lists
//! are encoded as strings, so the TOML on disk stays flat:
//!
//! ```toml
//! [nat_policy_0]
//! ref = "sWxkAtyfL1xaD3Zp"
//! stun_server = "stun.example.org"
//! protocols = "stun,ice"
//! turn_enable_udp = "1"
//! ```

mod store;

pub use store::ConfigStore;
