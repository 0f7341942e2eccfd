use sqlx::PgPool;
use tokio::sync::mpsc;
use uuid::Uuid;

/// An event worth keeping in the audit trail.
#[derive(Debug, Clone)]
pub enum AuditEvent {
    /// A staff member attempted credential validation.
    StaffValidation {
        staff_id_number: String,
        department_name: String,
        details: String,
    },
    /// A document landed in the object store and was recorded.
    UploadSuccess {
        staff_id_number: String,
        department_name: String,
        document_name: String,
        file_url: String,
    },
    /// A document failed somewhere between the store and the database.
    UploadFailure {
        staff_id_number: String,
        department_name: String,
        document_name: String,
        error: String,
    },
}

/// Fire-and-forget audit recorder.
///
/// `record` hands the event to a background writer over an unbounded channel
/// and returns immediately; the upload path never waits on audit durability,
/// and a write failure is logged and swallowed. Events queued at process
/// exit are lost, which is accepted.
#[derive(Clone)]
pub struct AuditSink {
    tx: mpsc::UnboundedSender<AuditEvent>,
}

impl AuditSink {
    /// Spawns the background writer and returns the sink handle.
    ///
    /// # Arguments
    ///
    /// * `pool` - The database connection pool the writer persists to.
    pub fn spawn(pool: PgPool) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<AuditEvent>();

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = write_event(&pool, &event).await {
                    tracing::warn!("Audit write failed (event dropped): {}", e);
                }
            }
        });

        Self { tx }
    }

    /// Returns a sink whose events go nowhere. For tests.
    #[cfg(test)]
    pub fn detached() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        Self { tx }
    }

    /// Records an event. Never blocks, never fails from the caller's view.
    pub fn record(&self, event: AuditEvent) {
        let _ = self.tx.send(event);
    }
}

async fn write_event(pool: &PgPool, event: &AuditEvent) -> crate::error::Result<()> {
    match event {
        AuditEvent::StaffValidation {
            staff_id_number,
            department_name,
            details,
        } => {
            insert_submission_log(pool, staff_id_number, department_name, "VALIDATION", details)
                .await?;
        }

        AuditEvent::UploadSuccess {
            staff_id_number,
            department_name,
            document_name,
            file_url,
        } => {
            insert_submission_log(
                pool,
                staff_id_number,
                department_name,
                "UPLOAD_SUCCESS",
                &format!("Document uploaded: {}", document_name),
            )
            .await?;
            insert_upload_log(
                pool,
                staff_id_number,
                department_name,
                document_name,
                "SUCCESS",
                Some(file_url),
                None,
            )
            .await?;
        }

        AuditEvent::UploadFailure {
            staff_id_number,
            department_name,
            document_name,
            error,
        } => {
            insert_submission_log(
                pool,
                staff_id_number,
                department_name,
                "UPLOAD_FAILED",
                &format!("Failed to upload {}: {}", document_name, error),
            )
            .await?;
            insert_upload_log(
                pool,
                staff_id_number,
                department_name,
                document_name,
                "FAILED",
                None,
                Some(error),
            )
            .await?;
        }
    }

    Ok(())
}

async fn insert_submission_log(
    pool: &PgPool,
    staff_id_number: &str,
    department_name: &str,
    action: &str,
    details: &str,
) -> crate::error::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO staff_submission_logs (id, staff_id_number, department_name, action, details, created_at)
        VALUES ($1, $2, $3, $4, $5, NOW())
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(staff_id_number)
    .bind(department_name)
    .bind(action)
    .bind(details)
    .execute(pool)
    .await?;

    Ok(())
}

async fn insert_upload_log(
    pool: &PgPool,
    staff_id_number: &str,
    department_name: &str,
    document_name: &str,
    status: &str,
    file_url: Option<&str>,
    error_message: Option<&str>,
) -> crate::error::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO upload_logs (id, staff_id_number, document_name, department_name, status, file_url, error_message, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(staff_id_number)
    .bind(document_name)
    .bind(department_name)
    .bind(status)
    .bind(file_url)
    .bind(error_message)
    .execute(pool)
    .await?;

    Ok(())
}
