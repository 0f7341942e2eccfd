use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::Result;
use crate::services::audit::AuditSink;
use crate::services::sessions::SessionStore;
use crate::services::uploads::{PgRequirementDirectory, PgSubmissionStore, UploadPipeline};
use crate::storage::RemoteObjectStore;

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The database connection pool.
    pub db: PgPool,
    /// The application's configuration.
    pub config: Config,
    /// The in-memory session store.
    pub sessions: SessionStore,
    /// The fire-and-forget audit sink.
    pub audit: AuditSink,
    /// The upload orchestrator.
    pub uploads: UploadPipeline,
}

impl AppState {
    /// Creates a new `AppState`.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = crate::db::create_pool(&config.database_url).await?;
        tracing::info!("✅ PostgreSQL pool initialized");

        let sessions = SessionStore::new(config.session_ttl_secs);
        tracing::info!(
            "✅ Session store initialized (TTL {}s)",
            config.session_ttl_secs
        );

        let audit = AuditSink::spawn(db.clone());
        tracing::info!("✅ Audit sink started");

        let store = Arc::new(RemoteObjectStore::new(config)?);
        let uploads = UploadPipeline::new(
            store,
            Arc::new(PgSubmissionStore::new(db.clone())),
            Arc::new(PgRequirementDirectory::new(db.clone())),
            audit.clone(),
            config.upload_concurrency,
            Duration::from_secs(config.upload_deadline_secs),
        );
        tracing::info!(
            "✅ Upload pipeline initialized ({} workers, {}s deadline)",
            config.upload_concurrency,
            config.upload_deadline_secs
        );

        Ok(AppState {
            db,
            config: config.clone(),
            sessions,
            audit,
            uploads,
        })
    }
}
