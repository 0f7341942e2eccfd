use sqlx::PgPool;
use uuid::Uuid;
use crate::error::{AppError, Result};
use crate::models::requirement::DocumentRequirement;

/// Finds an active document requirement by ID.
///
/// # Arguments
///
/// * `pool` - The database connection pool.
/// * `requirement_id` - The ID of the requirement.
///
/// # Returns
///
/// A `Result` containing the `DocumentRequirement`, or `NotFound`.
pub async fn find_by_id(pool: &PgPool, requirement_id: Uuid) -> Result<DocumentRequirement> {
    sqlx::query_as::<_, DocumentRequirement>(
        r#"
        SELECT id, department_id, document_name, is_required, is_active, created_at
        FROM document_requirements
        WHERE id = $1 AND is_active = true
        "#,
    )
    .bind(requirement_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Document requirement".to_string()))
}

/// Lists the active requirements for a department.
///
/// # Arguments
///
/// * `pool` - The database connection pool.
/// * `department_id` - The ID of the department.
///
/// # Returns
///
/// A `Result` containing a `Vec<DocumentRequirement>`.
pub async fn list_active_for_department(
    pool: &PgPool,
    department_id: Uuid,
) -> Result<Vec<DocumentRequirement>> {
    let requirements = sqlx::query_as::<_, DocumentRequirement>(
        r#"
        SELECT id, department_id, document_name, is_required, is_active, created_at
        FROM document_requirements
        WHERE department_id = $1 AND is_active = true
        ORDER BY document_name
        "#,
    )
    .bind(department_id)
    .fetch_all(pool)
    .await?;

    Ok(requirements)
}
