use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// A durably recorded document submission.
///
/// Written exactly once per (staff, requirement) pair and never updated.
#[derive(FromRow, Clone, Debug)]
pub struct DocumentSubmission {
    /// The unique identifier for the submission.
    pub id: Uuid,
    /// The staff member the submission belongs to.
    pub staff_id: Uuid,
    /// The requirement the submission satisfies.
    pub requirement_id: Uuid,
    /// Public URL of the stored file.
    pub file_url: String,
    /// Identifier assigned by the object store.
    pub storage_id: String,
    /// Original filename as uploaded.
    pub file_name: String,
    /// The size of the file in bytes.
    pub file_size: i64,
    /// The declared MIME type of the file.
    pub mime_type: String,
    /// The timestamp when the submission was recorded.
    pub submitted_at: DateTime<Utc>,
}

/// The fields needed to record a new submission.
#[derive(Clone, Debug)]
pub struct NewSubmission {
    pub staff_id: Uuid,
    pub requirement_id: Uuid,
    pub file_url: String,
    pub storage_id: String,
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: String,
}
