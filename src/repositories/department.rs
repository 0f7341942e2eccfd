use sqlx::PgPool;
use uuid::Uuid;
use crate::error::{AppError, Result};
use crate::models::department::Department;

/// Lists every department, ordered by name.
///
/// # Arguments
///
/// * `pool` - The database connection pool.
///
/// # Returns
///
/// A `Result` containing a `Vec<Department>`.
pub async fn list_all(pool: &PgPool) -> Result<Vec<Department>> {
    let departments = sqlx::query_as::<_, Department>(
        r#"
        SELECT id, name, description, created_at
        FROM departments
        ORDER BY name
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(departments)
}

/// Finds a department by ID.
///
/// # Arguments
///
/// * `pool` - The database connection pool.
/// * `department_id` - The ID of the department.
///
/// # Returns
///
/// A `Result` containing the `Department`, or `NotFound`.
pub async fn find_by_id(pool: &PgPool, department_id: Uuid) -> Result<Department> {
    sqlx::query_as::<_, Department>(
        r#"
        SELECT id, name, description, created_at
        FROM departments
        WHERE id = $1
        "#,
    )
    .bind(department_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Department".to_string()))
}
