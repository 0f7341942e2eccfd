use base64::{Engine as _, engine::general_purpose};
use chrono::{Duration, Utc};
use dashmap::DashMap;
use rand::RngCore;
use rand::rngs::OsRng;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::session::StaffSession;

/// The size of a session token in random bytes.
const TOKEN_SIZE: usize = 32;

/// In-memory store of short-lived staff sessions, keyed by opaque token.
///
/// The map is sharded, so `validate` on the request path never contends on a
/// store-wide lock with the background sweep or with other requests. An
/// expired entry is evicted the first time it is read; the hourly sweep picks
/// up whatever nobody reads.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, StaffSession>>,
    ttl: Duration,
}

impl SessionStore {
    /// Creates a new `SessionStore`.
    ///
    /// # Arguments
    ///
    /// * `ttl_secs` - Lifetime of each session in seconds.
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    /// Creates a session and returns its token.
    ///
    /// # Arguments
    ///
    /// * `staff_id` - The staff member the session belongs to.
    /// * `department_id` - The department selected at creation time.
    ///
    /// # Returns
    ///
    /// The opaque session token handed to the client.
    pub fn create(&self, staff_id: Uuid, department_id: Uuid) -> String {
        let token = generate_token();
        let now = Utc::now();

        self.sessions.insert(
            token.clone(),
            StaffSession {
                staff_id,
                department_id,
                created_at: now,
                expires_at: now + self.ttl,
            },
        );

        tracing::info!("✅ Session created for staff: {}", staff_id);

        token
    }

    /// Resolves a token to its session.
    ///
    /// Fails with `SessionNotFound` for an unknown token and `SessionExpired`
    /// for a stale one; a stale entry is evicted on the spot, so a second
    /// validate of the same token reports `SessionNotFound`.
    pub fn validate(&self, token: &str) -> Result<StaffSession> {
        if let Some(entry) = self.sessions.get(token) {
            if !entry.is_expired(Utc::now()) {
                return Ok(entry.clone());
            }
        } else {
            return Err(AppError::SessionNotFound);
        }

        // Read guard is released above; only evict if still expired in case
        // of a concurrent remove-and-recreate of the same key.
        self.sessions
            .remove_if(token, |_, session| session.is_expired(Utc::now()));

        Err(AppError::SessionExpired)
    }

    /// Removes a session unconditionally.
    ///
    /// Invalidating an unknown or already-removed token is not an error: a
    /// client logging out always observes success.
    pub fn invalidate(&self, token: &str) {
        self.sessions.remove(token);
        tracing::info!("Session invalidated");
    }

    /// Removes every expired session and returns how many were evicted.
    ///
    /// `retain` operates shard by shard, so request-path reads and writes
    /// proceed concurrently while the sweep runs.
    pub fn sweep(&self) -> usize {
        let before = self.sessions.len();
        let now = Utc::now();
        self.sessions.retain(|_, session| !session.is_expired(now));

        before.saturating_sub(self.sessions.len())
    }

    /// Returns the number of live entries, expired or not.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` when the store holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_SIZE];
    OsRng.fill_bytes(&mut bytes);

    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (Uuid, Uuid) {
        (Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn create_then_validate_roundtrip() {
        let store = SessionStore::new(3600);
        let (staff_id, department_id) = ids();

        let token = store.create(staff_id, department_id);
        let session = store.validate(&token).unwrap();

        assert_eq!(session.staff_id, staff_id);
        assert_eq!(session.department_id, department_id);
        assert_eq!(session.expires_at, session.created_at + Duration::seconds(3600));
    }

    #[test]
    fn unknown_token_is_not_found() {
        let store = SessionStore::new(3600);
        assert!(matches!(
            store.validate("no-such-token"),
            Err(AppError::SessionNotFound)
        ));
    }

    #[test]
    fn expired_session_is_evicted_on_read() {
        // Zero TTL: the session is already past its expiry when validated,
        // which stands in for an hour of clock advance.
        let store = SessionStore::new(0);
        let (staff_id, department_id) = ids();
        let token = store.create(staff_id, department_id);

        assert!(matches!(store.validate(&token), Err(AppError::SessionExpired)));
        // The expired entry was removed, so the token is now simply unknown.
        assert!(matches!(store.validate(&token), Err(AppError::SessionNotFound)));
    }

    #[test]
    fn invalidate_is_idempotent() {
        let store = SessionStore::new(3600);
        let (staff_id, department_id) = ids();
        let token = store.create(staff_id, department_id);

        store.invalidate(&token);
        store.invalidate(&token);
        store.invalidate("never-existed");

        assert!(matches!(store.validate(&token), Err(AppError::SessionNotFound)));
    }

    #[test]
    fn sweep_removes_only_expired_entries() {
        let expired = SessionStore::new(0);
        let live = SessionStore::new(3600);

        // Two stores share nothing; emulate a mixed store by sweeping each.
        let (staff_id, department_id) = ids();
        expired.create(staff_id, department_id);
        expired.create(staff_id, department_id);
        let token = live.create(staff_id, department_id);

        assert_eq!(expired.sweep(), 2);
        assert_eq!(expired.len(), 0);
        assert!(expired.is_empty());
        assert!(!live.is_empty());
        assert_eq!(live.sweep(), 0);
        assert!(live.validate(&token).is_ok());
    }

    #[test]
    fn tokens_are_unique_and_opaque() {
        let store = SessionStore::new(3600);
        let (staff_id, department_id) = ids();

        let a = store.create(staff_id, department_id);
        let b = store.create(staff_id, department_id);

        assert_ne!(a, b);
        assert!(a.len() >= 40);
    }

    #[tokio::test]
    async fn validate_is_safe_under_concurrent_sweep() {
        let store = SessionStore::new(3600);
        let (staff_id, department_id) = ids();

        let tokens: Vec<String> = (0..64)
            .map(|_| store.create(staff_id, department_id))
            .collect();

        let sweeper = {
            let store = store.clone();
            tokio::spawn(async move {
                for _ in 0..100 {
                    store.sweep();
                    tokio::task::yield_now().await;
                }
            })
        };

        let readers: Vec<_> = tokens
            .iter()
            .map(|token| {
                let store = store.clone();
                let token = token.clone();
                tokio::spawn(async move {
                    for _ in 0..100 {
                        store.validate(&token).unwrap();
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        sweeper.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
    }
}
