use async_trait::async_trait;
use axum::body::Bytes;
use chrono::{Datelike, Utc};
use serde::Deserialize;
use std::time::Duration;

use crate::config::Config;
use crate::error::{AppError, Result};

const BASE_FOLDER: &str = "staff_documents";

/// Per-upload timeout against the remote store, independent of the batch
/// deadline the orchestrator enforces.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// The result of storing an object remotely.
#[derive(Debug, Clone)]
pub struct UploadedObject {
    /// Public URL of the stored object.
    pub url: String,
    /// Identifier assigned by the store, usable for later deletion.
    pub storage_id: String,
}

/// The remote object store the upload pipeline writes files to.
///
/// Errors are opaque to the pipeline: they surface as a per-file failure
/// outcome and are never retried here.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Uploads `data` under `folder/name` and returns where it ended up.
    async fn upload(&self, data: Bytes, folder: &str, name: &str) -> Result<UploadedObject>;
}

#[derive(Deserialize)]
struct StoreUploadResponse {
    secure_url: String,
    public_id: String,
}

/// HTTP client for the remote object store.
pub struct RemoteObjectStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RemoteObjectStore {
    /// Creates a new `RemoteObjectStore` from the application configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `RemoteObjectStore`.
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build storage client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.storage_url.trim_end_matches('/').to_string(),
            api_key: config.storage_api_key.clone(),
        })
    }
}

#[async_trait]
impl ObjectStore for RemoteObjectStore {
    async fn upload(&self, data: Bytes, folder: &str, name: &str) -> Result<UploadedObject> {
        tracing::info!(
            "📤 Uploading object to remote store: {}/{} ({} KB)",
            folder,
            name,
            data.len() / 1024
        );

        let part = reqwest::multipart::Part::bytes(data.to_vec()).file_name(name.to_string());
        let form = reqwest::multipart::Form::new()
            .text("folder", folder.to_string())
            .text("public_id", name.to_string())
            .part("file", part);

        let response = self
            .client
            .post(format!("{}/upload", self.base_url))
            .header("x-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Storage(format!(
                "Store responded {}: {}",
                status, body
            )));
        }

        let uploaded: StoreUploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::Storage(format!("Invalid store response: {}", e)))?;

        tracing::debug!("✅ Object stored: {}", uploaded.public_id);

        Ok(UploadedObject {
            url: uploaded.secure_url,
            storage_id: uploaded.public_id,
        })
    }
}

/// Builds the store folder for a department, partitioned by year.
pub fn department_folder(department_name: &str) -> String {
    let sanitized = clean_component(department_name);
    let folder = if sanitized.is_empty() {
        "default".to_string()
    } else {
        sanitized
    };

    format!("{}/{}/{}", BASE_FOLDER, folder, Utc::now().year())
}

/// Builds a deterministic, collision-resistant object name from the staff
/// member's name, the document name, and a time-based disambiguator.
pub fn object_name(staff_name: &str, document_name: &str) -> String {
    let millis = Utc::now().timestamp_millis().to_string();
    let suffix_start = millis.len().saturating_sub(5);

    format!(
        "{}_{}_{}",
        clean_component(staff_name),
        clean_component(document_name),
        &millis[suffix_start..]
    )
}

/// Lowercases a name and collapses anything that is not alphanumeric into
/// single underscores, trimming leading and trailing ones.
fn clean_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_underscore = false;

    for c in input.trim().chars() {
        if c.is_ascii_alphanumeric() {
            out.extend(c.to_lowercase());
            last_was_underscore = false;
        } else if !last_was_underscore && !out.is_empty() {
            out.push('_');
            last_was_underscore = true;
        }
    }

    if out.ends_with('_') {
        out.pop();
    }

    out
}
