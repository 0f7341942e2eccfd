use sqlx::PgPool;
use uuid::Uuid;
use crate::error::{AppError, Result};
use crate::models::staff::Staff;

const STAFF_COLUMNS: &str =
    "id, staff_id_number, full_name, email, department_id, created_at";

/// Finds a staff member by staff number and email, case-insensitively.
///
/// # Arguments
///
/// * `pool` - The database connection pool.
/// * `staff_id_number` - The staff number to match.
/// * `email` - The email address to match.
///
/// # Returns
///
/// A `Result` containing an `Option<Staff>`.
pub async fn find_by_staff_number_and_email(
    pool: &PgPool,
    staff_id_number: &str,
    email: &str,
) -> Result<Option<Staff>> {
    let staff = sqlx::query_as::<_, Staff>(&format!(
        r#"
        SELECT {STAFF_COLUMNS}
        FROM staff
        WHERE LOWER(staff_id_number) = LOWER($1) AND LOWER(email) = LOWER($2)
        "#
    ))
    .bind(staff_id_number.trim())
    .bind(email.trim())
    .fetch_optional(pool)
    .await?;

    Ok(staff)
}

/// Finds a staff member by staff number, case-insensitively.
///
/// # Arguments
///
/// * `pool` - The database connection pool.
/// * `staff_id_number` - The staff number to match.
///
/// # Returns
///
/// A `Result` containing the `Staff`, or `NotFound`.
pub async fn find_by_staff_number(pool: &PgPool, staff_id_number: &str) -> Result<Staff> {
    sqlx::query_as::<_, Staff>(&format!(
        r#"
        SELECT {STAFF_COLUMNS}
        FROM staff
        WHERE LOWER(staff_id_number) = LOWER($1)
        "#
    ))
    .bind(staff_id_number.trim())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Staff".to_string()))
}

/// Finds a staff member by ID.
///
/// # Arguments
///
/// * `pool` - The database connection pool.
/// * `staff_id` - The ID of the staff member.
///
/// # Returns
///
/// A `Result` containing the `Staff`, or `NotFound`.
pub async fn find_by_id(pool: &PgPool, staff_id: Uuid) -> Result<Staff> {
    sqlx::query_as::<_, Staff>(&format!(
        r#"
        SELECT {STAFF_COLUMNS}
        FROM staff
        WHERE id = $1
        "#
    ))
    .bind(staff_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Staff".to_string()))
}

/// Assigns a department to a staff member.
///
/// # Arguments
///
/// * `pool` - The database connection pool.
/// * `staff_id` - The ID of the staff member.
/// * `department_id` - The department to assign.
///
/// # Returns
///
/// A `Result<()>`.
pub async fn assign_department(
    pool: &PgPool,
    staff_id: Uuid,
    department_id: Uuid,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE staff
        SET department_id = $1
        WHERE id = $2
        "#,
    )
    .bind(department_id)
    .bind(staff_id)
    .execute(pool)
    .await?;

    Ok(())
}
