use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// A document type a department mandates or recommends from its staff.
#[derive(FromRow, Clone, Debug)]
pub struct DocumentRequirement {
    /// The unique identifier for the requirement.
    pub id: Uuid,
    /// The department that owns the requirement.
    pub department_id: Uuid,
    /// The name of the requested document.
    pub document_name: String,
    /// Whether the document is mandatory.
    pub is_required: bool,
    /// Whether the requirement is currently active.
    pub is_active: bool,
    /// The timestamp when the requirement was created.
    pub created_at: DateTime<Utc>,
}
