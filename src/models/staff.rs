use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Represents a staff member.
#[derive(FromRow, Clone, Debug)]
pub struct Staff {
    /// The unique identifier for the staff member.
    pub id: Uuid,
    /// The staff number issued by the organization.
    pub staff_id_number: String,
    /// The staff member's full name.
    pub full_name: String,
    /// The staff member's email address.
    pub email: String,
    /// The department the staff member belongs to, if one has been selected.
    pub department_id: Option<Uuid>,
    /// The timestamp when the staff record was created.
    pub created_at: DateTime<Utc>,
}
