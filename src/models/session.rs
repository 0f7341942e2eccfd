use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A short-lived staff session resolved from an opaque token.
///
/// Sessions live only in memory. They bind a staff identity and the
/// department selected at creation time for the duration of an upload flow,
/// and are never updated in place.
#[derive(Debug, Clone)]
pub struct StaffSession {
    /// The staff member this session belongs to.
    pub staff_id: Uuid,
    /// The department selected when the session was created.
    pub department_id: Uuid,
    /// The timestamp when the session was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the session expires.
    pub expires_at: DateTime<Utc>,
}

impl StaffSession {
    /// Returns `true` once the session has passed its expiry instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
