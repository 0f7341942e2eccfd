use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Represents a department staff members submit documents to.
#[derive(FromRow, Clone, Debug)]
pub struct Department {
    /// The unique identifier for the department.
    pub id: Uuid,
    /// The department's display name.
    pub name: String,
    /// A short description of the department.
    pub description: Option<String>,
    /// The timestamp when the department was created.
    pub created_at: DateTime<Utc>,
}
