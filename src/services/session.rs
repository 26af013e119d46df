//! Process-wide session storage.
//!
//! # Responsibilities
//! - Keep per-client key/value state keyed by a client token
//! - Hand out per-request `Session` handles scoped to one token
//!
//! # Design Decisions
//! - Built lazily as a container singleton (first resolution)
//! - DashMap shards the lock, so concurrent requests for different clients
//!   never contend on one mutex
//! - Bounded: `set` refuses to open a new session once `max_sessions` live
//!   sessions exist; expired ones are purged first
//! - Idle expiry: a session untouched for `ttl_secs` reads as absent
//! - In memory only; state does not survive a restart

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::config::SessionConfig;
use crate::container::{Injectable, ResolveError, Resolver};

/// Client-identifying token extracted from the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    /// Mint a fresh random token.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Accept a token presented by a client, if it looks like one we issued.
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = raw.len() == 32 && raw.chars().all(|c| c.is_ascii_hexdigit());
        valid.then(|| Self(raw.to_ascii_lowercase()))
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

/// One client's values and the last time they were touched.
#[derive(Debug)]
struct Record {
    values: HashMap<String, String>,
    touched: Instant,
}

impl Record {
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.touched) >= ttl
    }
}

/// Keyed storage shared by every request of the process.
pub struct SessionStore {
    sessions: DashMap<String, Record>,
    /// Reserved slots; always equal to `sessions.len()` outside of `try_write`.
    occupied: AtomicUsize,
    max_sessions: usize,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(max_sessions: usize, ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            occupied: AtomicUsize::new(0),
            max_sessions,
            ttl,
        }
    }

    /// Handle scoped to one client.
    pub fn session(self: &Arc<Self>, token: &SessionToken) -> Session {
        Session {
            store: Arc::clone(self),
            token: token.clone(),
        }
    }

    /// Number of stored sessions, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop every session idle for longer than the ttl. Returns how many
    /// were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.sessions.retain(|_, record| {
            let expired = record.is_expired(now, self.ttl);
            if expired {
                removed += 1;
            }
            !expired
        });
        self.occupied.fetch_sub(removed, Ordering::AcqRel);
        if removed > 0 {
            tracing::debug!(removed, "Expired sessions purged");
        }
        removed
    }

    fn read<T>(&self, token: &SessionToken, f: impl FnOnce(&mut HashMap<String, String>) -> T) -> Option<T> {
        let now = Instant::now();
        let mut record = self.sessions.get_mut(token.as_str())?;
        if record.is_expired(now, self.ttl) {
            return None;
        }
        record.touched = now;
        Some(f(&mut record.values))
    }

    fn write(&self, token: &SessionToken, key: String, value: String) -> bool {
        let (key, value) = match self.try_write(token, key, value) {
            Ok(()) => return true,
            Err(rejected) => rejected,
        };
        if self.purge_expired() > 0 && self.try_write(token, key, value).is_ok() {
            return true;
        }
        tracing::warn!(
            max_sessions = self.max_sessions,
            "Session store full, refusing new session"
        );
        false
    }

    /// Insert under the entry lock. A new session first reserves a slot, so
    /// concurrent writers can never push the store past `max_sessions`.
    fn try_write(&self, token: &SessionToken, key: String, value: String) -> Result<(), (String, String)> {
        let now = Instant::now();
        match self.sessions.entry(token.as_str().to_string()) {
            Entry::Occupied(mut slot) => {
                let record = slot.get_mut();
                if record.is_expired(now, self.ttl) {
                    record.values.clear();
                }
                record.touched = now;
                record.values.insert(key, value);
                Ok(())
            }
            Entry::Vacant(slot) => {
                let reserved = self
                    .occupied
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                        (n < self.max_sessions).then_some(n + 1)
                    })
                    .is_ok();
                if !reserved {
                    return Err((key, value));
                }
                slot.insert(Record {
                    values: HashMap::from([(key, value)]),
                    touched: now,
                });
                Ok(())
            }
        }
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.sessions.len())
            .field("max_sessions", &self.max_sessions)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl Injectable for SessionStore {
    fn inject(resolver: &mut Resolver<'_>) -> Result<Self, ResolveError> {
        let config = resolver.resolve::<SessionConfig>()?;
        tracing::info!(
            max_sessions = config.max_sessions,
            ttl_secs = config.ttl_secs,
            "Session store initialized"
        );
        Ok(Self::new(config.max_sessions, Duration::from_secs(config.ttl_secs)))
    }
}

/// Session accessor for one client.
#[derive(Debug, Clone)]
pub struct Session {
    store: Arc<SessionStore>,
    token: SessionToken,
}

impl Session {
    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.store
            .read(&self.token, |values| values.get(key).cloned())
            .flatten()
    }

    pub fn has(&self, key: &str) -> bool {
        self.store
            .read(&self.token, |values| values.contains_key(key))
            .unwrap_or(false)
    }

    /// Store a value. Returns `false` when the store is full of live sessions
    /// and this client has none yet.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) -> bool {
        self.store.write(&self.token, key.into(), value.into())
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.store
            .read(&self.token, |values| values.remove(key))
            .flatten()
    }
}
