//! `host[:port]` parsing for STUN/TURN server settings

use crate::error::{NatPolicyError, Result};

/// Port used when the server setting carries none
pub const DEFAULT_STUN_PORT: u16 = 3478;

/// Splits a server setting into host and optional port.
///
/// Accepted forms: `host`, `host:port`, `[v6]`, `[v6]:port`. A bare IPv6
/// literal without brackets is taken as a host without port.
pub fn parse_host_port(input: &str) -> Result<(String, Option<u16>)> {
    let input = input.trim();
    if input.is_empty() {
        return Err(NatPolicyError::InvalidAddress(input.to_string()));
    }

    if let Some(rest) = input.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| NatPolicyError::InvalidAddress(input.to_string()))?;
        if host.is_empty() {
            return Err(NatPolicyError::InvalidAddress(input.to_string()));
        }
        let port = match tail {
            "" => None,
            t => Some(parse_port(input, t.strip_prefix(':').unwrap_or(t))?),
        };
        return Ok((host.to_string(), port));
    }

    match input.matches(':').count() {
        0 => Ok((input.to_string(), None)),
        1 => {
            let (host, port) = input
                .split_once(':')
                .ok_or_else(|| NatPolicyError::InvalidAddress(input.to_string()))?;
            if host.is_empty() {
                return Err(NatPolicyError::InvalidAddress(input.to_string()));
            }
            Ok((host.to_string(), Some(parse_port(input, port)?)))
        }
        _ => Ok((input.to_string(), None)),
    }
}

fn parse_port(input: &str, port: &str) -> Result<u16> {
    match port.parse::<u16>() {
        Ok(p) if p > 0 => Ok(p),
        _ => Err(NatPolicyError::InvalidAddress(input.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_forms() {
        assert_eq!(parse_host_port("stun.example.org").unwrap(), ("stun.example.org".into(), None));
        assert_eq!(parse_host_port("turn.example.org:3479").unwrap(), ("turn.example.org".into(), Some(3479)));
        assert_eq!(parse_host_port("[2001:db8::1]").unwrap(), ("2001:db8::1".into(), None));
        assert_eq!(parse_host_port("[2001:db8::1]:5349").unwrap(), ("2001:db8::1".into(), Some(5349)));
        assert_eq!(parse_host_port("2001:db8::1").unwrap(), ("2001:db8::1".into(), None));
    }

    #[test]
    fn bad_inputs() {
        assert!(parse_host_port("").is_err());
        assert!(parse_host_port("host:notaport").is_err());
        assert!(parse_host_port("host:0").is_err());
        assert!(parse_host_port("[2001:db8::1").is_err());
        assert!(parse_host_port(":3478").is_err());
    }
}
