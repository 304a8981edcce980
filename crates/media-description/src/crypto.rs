//! SDES (`a=crypto`) attributes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length of the inline key material compared when looking for key changes
pub const SRTP_KEY_SIZE: usize = 128;

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum CryptoSuite {
    AesCm128HmacSha1_80,
    AesCm128HmacSha1_32,
    Aes192CmHmacSha1_80,
    Aes192CmHmacSha1_32,
    Aes256CmHmacSha1_80,
    Aes256CmHmacSha1_32,
    AeadAes128Gcm,
    AeadAes256Gcm,
    Undefined,
}

impl CryptoSuite {
    pub fn as_str(&self) -> &'static str {
        match self {
            CryptoSuite::AesCm128HmacSha1_80 => "AES_CM_128_HMAC_SHA1_80",
            CryptoSuite::AesCm128HmacSha1_32 => "AES_CM_128_HMAC_SHA1_32",
            CryptoSuite::Aes192CmHmacSha1_80 => "AES_192_CM_HMAC_SHA1_80",
            CryptoSuite::Aes192CmHmacSha1_32 => "AES_192_CM_HMAC_SHA1_32",
            CryptoSuite::Aes256CmHmacSha1_80 => "AES_256_CM_HMAC_SHA1_80",
            CryptoSuite::Aes256CmHmacSha1_32 => "AES_256_CM_HMAC_SHA1_32",
            CryptoSuite::AeadAes128Gcm => "AEAD_AES_128_GCM",
            CryptoSuite::AeadAes256Gcm => "AEAD_AES_256_GCM",
            CryptoSuite::Undefined => "",
        }
    }
}

impl fmt::Display for CryptoSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CryptoSuite {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "AES_CM_128_HMAC_SHA1_80" => CryptoSuite::AesCm128HmacSha1_80,
            "AES_CM_128_HMAC_SHA1_32" => CryptoSuite::AesCm128HmacSha1_32,
            "AES_192_CM_HMAC_SHA1_80" => CryptoSuite::Aes192CmHmacSha1_80,
            "AES_192_CM_HMAC_SHA1_32" => CryptoSuite::Aes192CmHmacSha1_32,
            "AES_256_CM_HMAC_SHA1_80" => CryptoSuite::Aes256CmHmacSha1_80,
            "AES_256_CM_HMAC_SHA1_32" => CryptoSuite::Aes256CmHmacSha1_32,
            "AEAD_AES_128_GCM" => CryptoSuite::AeadAes128Gcm,
            "AEAD_AES_256_GCM" => CryptoSuite::AeadAes256Gcm,
            _ => CryptoSuite::Undefined,
        })
    }
}

/// One `a=crypto:<tag> <suite> inline:<key>` line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoAttribute {
    pub tag: u32,
    pub suite: CryptoSuite,
    pub master_key: String,
}

impl CryptoAttribute {
    pub fn new(tag: u32, suite: CryptoSuite, master_key: impl Into<String>) -> Self {
        Self {
            tag,
            suite,
            master_key: master_key.into(),
        }
    }

    /// Same tag and suite
    pub fn same_policy(&self, other: &CryptoAttribute) -> bool {
        self.tag == other.tag && self.suite == other.suite
    }

    /// Compares the first `SRTP_KEY_SIZE - 1` bytes of the inline key.
    /// Anything past that is lifetime/MKI decoration and is ignored.
    pub fn same_key(&self, other: &CryptoAttribute) -> bool {
        let a = self.master_key.as_bytes();
        let b = other.master_key.as_bytes();
        let n = SRTP_KEY_SIZE - 1;
        a[..a.len().min(n)] == b[..b.len().min(n)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suite_names_round_trip() {
        let suite: CryptoSuite = "AES_CM_128_HMAC_SHA1_80".parse().unwrap();
        assert_eq!(suite, CryptoSuite::AesCm128HmacSha1_80);
        assert_eq!("F8_128_HMAC_SHA1_80".parse::<CryptoSuite>().unwrap(), CryptoSuite::Undefined);
    }

    #[test]
    fn key_compare_uses_fixed_prefix() {
        let base = "k".repeat(SRTP_KEY_SIZE - 1);
        let a = CryptoAttribute::new(1, CryptoSuite::AesCm128HmacSha1_80, format!("{}AAAA", base));
        let b = CryptoAttribute::new(1, CryptoSuite::AesCm128HmacSha1_80, format!("{}BBBB", base));
        assert!(a.same_key(&b));

        let c = CryptoAttribute::new(1, CryptoSuite::AesCm128HmacSha1_80, "short-key");
        assert!(!a.same_key(&c));
        assert!(c.same_key(&c.clone()));
    }

    #[test]
    fn policy_is_tag_and_suite() {
        let a = CryptoAttribute::new(1, CryptoSuite::AesCm128HmacSha1_80, "x");
        let b = CryptoAttribute::new(1, CryptoSuite::AesCm128HmacSha1_32, "x");
        assert!(!a.same_policy(&b));
        assert!(a.same_policy(&CryptoAttribute::new(1, CryptoSuite::AesCm128HmacSha1_80, "y")));
    }
}
