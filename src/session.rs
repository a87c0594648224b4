//! In-process session table.
//!
//! Sessions live only as long as the process; a restart logs everyone out.
//! Anonymous sessions exist so a failed login can carry its flash message
//! back to the login form.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::models::Principal;

pub const SESSION_COOKIE: &str = "siswa_sid";

#[derive(Debug, Clone, Copy, Eq, Ord, PartialOrd, PartialEq)]
pub enum AuthResult {
    Success,
    SessionExpired,
    InvalidSession,
}

#[derive(Debug, Clone)]
pub struct SessionData {
    pub user: Option<Principal>,
    pub flash: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

pub struct SessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<String, SessionData>>,
}

fn new_ssid() -> String {
    let ssid_bytes: [u8; 32] = thread_rng().gen();

    let mut hasher: Sha256 = Digest::new();
    hasher.update(&ssid_bytes);
    hex::encode(hasher.finalize())
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Opens a new session and returns its id. Expired sessions are swept
    /// first, so the table never outgrows the sessions still alive.
    pub async fn open(&self, user: Option<Principal>) -> String {
        let ssid = new_ssid();
        let now = Utc::now();
        let data = SessionData {
            user,
            flash: Vec::new(),
            // an unrepresentable expiry yields a session that is already dead
            expires_at: now.checked_add_signed(self.ttl).unwrap_or(now),
        };
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, session| now <= session.expires_at);
        sessions.insert(ssid.clone(), data);
        ssid
    }

    /// Resolves a session id to its principal, dropping the session when it
    /// has expired.
    pub async fn authenticate(&self, ssid: &str) -> (AuthResult, Option<Principal>) {
        if ssid.is_empty() {
            return (AuthResult::InvalidSession, None);
        }
        let mut sessions = self.sessions.write().await;
        let expired = match sessions.get(ssid) {
            None => return (AuthResult::InvalidSession, None),
            Some(session) => Utc::now().gt(&session.expires_at),
        };
        if expired {
            sessions.remove(ssid);
            return (AuthResult::SessionExpired, None);
        }
        match sessions.get(ssid).and_then(|session| session.user.clone()) {
            Some(user) => (AuthResult::Success, Some(user)),
            None => (AuthResult::InvalidSession, None),
        }
    }

    /// Returns `true` when the session is known and not expired.
    pub async fn is_live(&self, ssid: &str) -> bool {
        let sessions = self.sessions.read().await;
        sessions
            .get(ssid)
            .map_or(false, |session| Utc::now() <= session.expires_at)
    }

    pub async fn destroy(&self, ssid: &str) -> bool {
        self.sessions.write().await.remove(ssid).is_some()
    }

    /// Queues a flash message. Returns `false` when the session is gone.
    pub async fn push_flash<S: Into<String>>(&self, ssid: &str, msg: S) -> bool {
        match self.sessions.write().await.get_mut(ssid) {
            Some(session) => {
                session.flash.push(msg.into());
                true
            }
            None => false,
        }
    }

    /// Drains the queued flash messages.
    pub async fn take_flash(&self, ssid: &str) -> Vec<String> {
        match self.sessions.write().await.get_mut(ssid) {
            Some(session) => std::mem::take(&mut session.flash),
            None => Vec::new(),
        }
    }

    /// Sets the `Set-Cookie` value binding a client to `ssid`.
    pub fn cookie(&self, ssid: &str) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Strict; Max-Age={}",
            SESSION_COOKIE,
            ssid,
            self.ttl.num_seconds()
        )
    }

    pub fn clear_cookie() -> String {
        format!("{}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0", SESSION_COOKIE)
    }
}
