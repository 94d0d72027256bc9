//! In-memory session grants.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::config::schema::AuthenticationConfig;
use crate::routing::gate::Authenticator;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session id must not be empty")]
    EmptySession,

    #[error("authentication tag must not be empty")]
    EmptyTag,

    #[error("tag `{tag}` is not granted in this session")]
    NotGranted { tag: String },
}

/// One authenticated tag within a session.
#[derive(Debug, Clone)]
struct Grant {
    token: String,
    ip: Option<IpAddr>,
    /// Seconds since epoch.
    expires_at: u64,
}

impl Grant {
    fn is_live(&self, now: u64) -> bool {
        self.expires_at > now
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Thread-safe store of session id → tag → grant.
///
/// Clones share grants and settings.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<DashMap<String, HashMap<String, Grant>>>,
    ttl_secs: Arc<AtomicU64>,
    ip_check: Arc<AtomicBool>,
}

impl SessionStore {
    pub fn new(config: &AuthenticationConfig) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl_secs: Arc::new(AtomicU64::new(config.cookie_expire_secs)),
            ip_check: Arc::new(AtomicBool::new(config.ip_check)),
        }
    }

    /// Take lifetime and IP check from a reloaded `[authentication]` section.
    ///
    /// Existing grants keep their expiry; the IP check applies from the next request.
    pub fn apply(&self, config: &AuthenticationConfig) {
        self.ttl_secs.store(config.cookie_expire_secs, Ordering::Relaxed);
        self.ip_check.store(config.ip_check, Ordering::Relaxed);
    }

    /// Lifetime given to new grants.
    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs.load(Ordering::Relaxed)
    }

    pub fn ip_check(&self) -> bool {
        self.ip_check.load(Ordering::Relaxed)
    }

    /// Grant `tag` to `session` and return the token its cookie must carry.
    pub fn start(&self, session: &str, tag: &str, ip: Option<IpAddr>) -> Result<String, SessionError> {
        if session.is_empty() {
            return Err(SessionError::EmptySession);
        }
        if tag.is_empty() {
            return Err(SessionError::EmptyTag);
        }

        let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        let grant = Grant {
            token: token.clone(),
            ip,
            expires_at: now_secs().saturating_add(self.ttl_secs()),
        };
        self.inner
            .entry(session.to_string())
            .or_default()
            .insert(tag.to_string(), grant);

        tracing::debug!(tag = %tag, "Authentication granted");
        Ok(token)
    }

    /// Withdraw one tag from a session.
    pub fn revoke(&self, session: &str, tag: &str) -> Result<(), SessionError> {
        let removed = self
            .inner
            .get_mut(session)
            .and_then(|mut grants| grants.remove(tag));
        match removed {
            Some(_) => Ok(()),
            None => Err(SessionError::NotGranted { tag: tag.to_string() }),
        }
    }

    /// Drop a session with all its grants.
    pub fn end(&self, session: &str) {
        self.inner.remove(session);
    }

    /// Remove expired grants and empty sessions. Returns grants removed.
    pub fn purge_expired(&self) -> usize {
        let now = now_secs();
        let mut removed = 0;
        self.inner.retain(|_, grants| {
            let before = grants.len();
            grants.retain(|_, grant| grant.is_live(now));
            removed += before - grants.len();
            !grants.is_empty()
        });
        removed
    }

    /// Number of sessions holding at least one grant.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Request-scoped view used as the gate's collaborator.
    pub fn credentials<'a>(
        &'a self,
        session: Option<&'a str>,
        cookies: &'a HashMap<String, String>,
        ip: Option<IpAddr>,
    ) -> SessionCredentials<'a> {
        SessionCredentials {
            store: self,
            session,
            cookies,
            ip,
        }
    }
}

/// What one request presents: its session, its cookies and its address.
#[derive(Debug, Clone, Copy)]
pub struct SessionCredentials<'a> {
    store: &'a SessionStore,
    session: Option<&'a str>,
    cookies: &'a HashMap<String, String>,
    ip: Option<IpAddr>,
}

impl Authenticator for SessionCredentials<'_> {
    fn validate(&self, tag: &str) -> bool {
        let Some(session) = self.session else {
            return false;
        };
        let Some(grants) = self.store.inner.get(session) else {
            return false;
        };
        let Some(grant) = grants.get(tag) else {
            return false;
        };

        if !grant.is_live(now_secs()) {
            return false;
        }
        if self.cookies.get(tag) != Some(&grant.token) {
            return false;
        }
        !self.store.ip_check() || grant.ip == self.ip
    }
}
