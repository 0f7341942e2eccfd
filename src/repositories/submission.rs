use sqlx::PgPool;
use uuid::Uuid;
use crate::error::Result;
use crate::models::submission::{DocumentSubmission, NewSubmission};

/// Checks whether a submission already exists for a (staff, requirement) pair.
///
/// # Arguments
///
/// * `pool` - The database connection pool.
/// * `staff_id` - The ID of the staff member.
/// * `requirement_id` - The ID of the requirement.
///
/// # Returns
///
/// A `Result` containing `true` if a submission exists.
pub async fn exists_for(pool: &PgPool, staff_id: Uuid, requirement_id: Uuid) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM document_submissions
            WHERE staff_id = $1 AND requirement_id = $2
        )
        "#,
    )
    .bind(staff_id)
    .bind(requirement_id)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Inserts a submission record.
///
/// The insert runs on its own pooled connection as a single-statement unit
/// of work, so one file's durable write is never entangled with a sibling's.
///
/// # Arguments
///
/// * `pool` - The database connection pool.
/// * `submission` - The fields of the new submission.
///
/// # Returns
///
/// A `Result` containing the created `DocumentSubmission`.
pub async fn insert(pool: &PgPool, submission: &NewSubmission) -> Result<DocumentSubmission> {
    let record = sqlx::query_as::<_, DocumentSubmission>(
        r#"
        INSERT INTO document_submissions (
            id, staff_id, requirement_id, file_url, storage_id,
            file_name, file_size, mime_type, submitted_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
        RETURNING
            id, staff_id, requirement_id, file_url, storage_id,
            file_name, file_size, mime_type, submitted_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(submission.staff_id)
    .bind(submission.requirement_id)
    .bind(&submission.file_url)
    .bind(&submission.storage_id)
    .bind(&submission.file_name)
    .bind(submission.file_size)
    .bind(&submission.mime_type)
    .fetch_one(pool)
    .await?;

    Ok(record)
}
