//! Session bookkeeping: which uploaded/generated files belong to which browser.
//!
//! Tokens are random UUIDs carried in the `upscale_session` cookie. They only
//! scope housekeeping; they are not an authentication mechanism.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use hyper::header::COOKIE;
use hyper::HeaderMap;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "upscale_session";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Accept only well-formed UUIDs so clients cannot pick arbitrary keys.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim())
            .ok()
            .map(|uuid| Self(uuid.simple().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `Set-Cookie` value for a token.
pub fn session_cookie(token: &SessionToken) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax")
}

/// Read the session token from the `Cookie` header(s).
pub fn token_from_headers(headers: &HeaderMap) -> Option<SessionToken> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| SessionToken::parse(value))
}

/// Existing token from the request, or a new one. The flag is `true` when the
/// token was just issued and must be sent back with `Set-Cookie`.
pub fn resolve_session(headers: &HeaderMap) -> (SessionToken, bool) {
    match token_from_headers(headers) {
        Some(token) => (token, false),
        None => (SessionToken::generate(), true),
    }
}

#[derive(Debug)]
struct SessionEntry {
    files: Vec<PathBuf>,
    last_seen: Instant,
}

/// Synchronized token -> files map with idle expiry.
#[derive(Debug, Default)]
pub struct SessionStore {
    entries: Mutex<HashMap<SessionToken, SessionEntry>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Bookkeeping stays usable even if a holder panicked mid-update.
    fn entries(&self) -> MutexGuard<'_, HashMap<SessionToken, SessionEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, token: &SessionToken, path: PathBuf) {
        let mut entries = self.entries();
        let entry = entries.entry(token.clone()).or_insert_with(|| SessionEntry {
            files: Vec::new(),
            last_seen: Instant::now(),
        });
        if !entry.files.contains(&path) {
            entry.files.push(path);
        }
        entry.last_seen = Instant::now();
    }

    pub fn files(&self, token: &SessionToken) -> Vec<PathBuf> {
        self.entries()
            .get(token)
            .map(|entry| entry.files.clone())
            .unwrap_or_default()
    }

    /// Forget a session and hand back its files for deletion.
    pub fn take(&self, token: &SessionToken) -> Vec<PathBuf> {
        self.entries()
            .remove(token)
            .map(|entry| entry.files)
            .unwrap_or_default()
    }

    /// Forget every session, returning all recorded files.
    pub fn clear(&self) -> Vec<PathBuf> {
        self.entries()
            .drain()
            .flat_map(|(_, entry)| entry.files)
            .collect()
    }

    /// Drop sessions idle for longer than `ttl`, returning their files.
    pub fn expire(&self, ttl: Duration) -> Vec<PathBuf> {
        let now = Instant::now();
        let mut expired = Vec::new();
        self.entries().retain(|_, entry| {
            let alive = now.duration_since(entry.last_seen) <= ttl;
            if !alive {
                expired.append(&mut entry.files);
            }
            alive
        });
        expired
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}
