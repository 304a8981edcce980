//! Credential store shared by the policies of one core

use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// Username/password pair, optionally bounded in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthInfo {
    pub username: String,
    pub password: String,
    pub realm: Option<String>,
    /// After this instant the entry is treated as absent
    pub expires: Option<DateTime<Utc>>,
}

impl AuthInfo {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            realm: None,
            expires: None,
        }
    }

    pub fn with_expiry(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires.map(|e| e <= now).unwrap_or(false)
    }
}

/// Auth infos keyed by username
#[derive(Debug, Default)]
pub struct AuthInfoStore {
    entries: DashMap<String, AuthInfo>,
}

impl AuthInfoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the entry for `info.username`
    pub fn add(&self, info: AuthInfo) {
        self.entries.insert(info.username.clone(), info);
    }

    /// Live entry for `username`. Expired entries are dropped on lookup.
    pub fn find(&self, username: &str) -> Option<AuthInfo> {
        let now = Utc::now();
        let found = self.entries.get(username).map(|e| e.value().clone())?;
        if found.is_expired_at(now) {
            self.entries.remove(username);
            return None;
        }
        Some(found)
    }

    pub fn remove(&self, username: &str) -> Option<AuthInfo> {
        self.entries.remove(username).map(|(_, info)| info)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
