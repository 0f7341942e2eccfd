use anyhow::{Context, Result};
use std::env;

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The URL of the PostgreSQL database.
    pub database_url: String,
    /// Base URL of the remote object store.
    pub storage_url: String,
    /// API key presented to the object store on every upload.
    pub storage_api_key: String,
    /// Lifetime of a staff session in seconds.
    pub session_ttl_secs: i64,
    /// Maximum number of upload units running at once across all batches.
    pub upload_concurrency: usize,
    /// Deadline for a whole upload batch in seconds.
    pub upload_deadline_secs: u64,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            storage_url: env::var("STORAGE_URL")
                .context("STORAGE_URL must be set")?,
            storage_api_key: env::var("STORAGE_API_KEY")
                .context("STORAGE_API_KEY must be set")?,
            session_ttl_secs: env::var("SESSION_TTL_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .context("Invalid SESSION_TTL_SECS")?,
            upload_concurrency: env::var("UPLOAD_CONCURRENCY")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .context("Invalid UPLOAD_CONCURRENCY")?,
            upload_deadline_secs: env::var("UPLOAD_DEADLINE_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("Invalid UPLOAD_DEADLINE_SECS")?,
        })
    }
}
