//! TURN configuration endpoint client
//!
//! The endpoint answers a GET with short lived TURN credentials:
//!
//! ```json
//! {"username": "u", "password": "p", "ttl": 86400, "uris": ["turn:turn.example.org:3478?transport=udp"]}
//! ```
//!
//! `username` and `password` are required, `ttl` (seconds) and `uris` are
//! optional.

use chrono::{DateTime, Duration, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{NatPolicyError, Result};

lazy_static! {
    static ref TURN_URI: Regex = Regex::new(r"^turn:([^?]+)").unwrap();
}

#[derive(Debug, Clone, Deserialize)]
struct TurnConfigurationBody {
    username: String,
    password: String,
    #[serde(default)]
    ttl: Option<i64>,
    #[serde(default)]
    uris: Option<Vec<String>>,
}

/// Credentials and server obtained from the endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnCredentials {
    pub username: String,
    pub password: String,
    /// 80% of the announced ttl, leaving room to renew before the server
    /// forgets the credentials
    pub expires: Option<DateTime<Utc>>,
    /// `host:port` taken from the first TURN uri
    pub server: Option<String>,
}

/// Extracts `host:port` from a `turn:` uri, dropping any `?transport=` part
pub fn server_from_turn_uri(uri: &str) -> Option<String> {
    TURN_URI
        .captures(uri)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Expiry at 80% of `ttl` seconds after `now`
fn expiry_from_ttl(ttl: i64, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    if ttl < 0 {
        return Err(NatPolicyError::InvalidResponse(format!("negative ttl {}", ttl)));
    }
    ttl.checked_mul(800)
        .and_then(Duration::try_milliseconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| NatPolicyError::InvalidResponse(format!("ttl {} out of range", ttl)))
}

/// Parses an endpoint answer body received at `now`
pub fn parse_turn_configuration(body: &str, now: DateTime<Utc>) -> Result<TurnCredentials> {
    let parsed: TurnConfigurationBody =
        serde_json::from_str(body).map_err(|e| NatPolicyError::InvalidResponse(e.to_string()))?;

    let expires = parsed.ttl.map(|ttl| expiry_from_ttl(ttl, now)).transpose()?;
    let server = parsed
        .uris
        .as_ref()
        .and_then(|uris| uris.first())
        .and_then(|uri| server_from_turn_uri(uri));

    Ok(TurnCredentials {
        username: parsed.username,
        password: parsed.password,
        expires,
        server,
    })
}

/// GETs the endpoint and parses the answer. Anything but 200 is an error.
pub async fn fetch_turn_configuration(client: &reqwest::Client, endpoint: &str) -> Result<TurnCredentials> {
    let url = Url::parse(endpoint)?;
    debug!("Requesting TURN configuration from {}", url);

    let response = client.get(url).send().await?;
    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(NatPolicyError::UnexpectedStatus(status.as_u16()));
    }

    let body = response.text().await?;
    parse_turn_configuration(&body, Utc::now())
}
