use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// A single rejected (requirement, file) pair from batch admission.
#[derive(Debug, Clone, Serialize)]
pub struct PairRejection {
    /// Position of the pair in the submitted batch.
    pub index: usize,
    /// Document name of the requirement, or the filename when the
    /// requirement could not be resolved.
    pub document: String,
    /// Why the pair was rejected.
    pub reason: String,
}

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The presented session token is unknown.
    #[error("Session expired or invalid")]
    SessionNotFound,

    /// The presented session token exists but has expired.
    #[error("Session expired")]
    SessionExpired,

    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The whole upload batch was rejected at admission.
    #[error("Upload request rejected")]
    UploadRejected(Vec<PairRejection>),

    /// The batch deadline elapsed before every upload unit finished.
    #[error("Upload timeout. Please try again.")]
    BatchTimeout,

    /// An object-store error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A resource not found error.
    #[error("{0} not found")]
    NotFound(String),

    /// A multipart error.
    #[error("Multipart error: {0}")]
    Multipart(String),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Serialize)]
struct RejectionBody<'a> {
    error: &'a str,
    rejections: &'a [PairRejection],
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::UploadRejected(ref rejections) => {
                tracing::debug!("Batch rejected with {} invalid pair(s)", rejections.len());
                let body = sonic_rs::to_string(&RejectionBody {
                    error: "One or more documents failed validation",
                    rejections,
                })
                .unwrap_or_else(|_| {
                    r#"{"error":"One or more documents failed validation"}"#.to_string()
                });
                return (StatusCode::BAD_REQUEST, body).into_response();
            }

            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }

            AppError::SessionNotFound => {
                tracing::warn!("Unknown session token presented");
                (StatusCode::UNAUTHORIZED, "Session expired or invalid".to_string())
            }

            AppError::SessionExpired => {
                tracing::warn!("Expired session token presented");
                (StatusCode::UNAUTHORIZED, "Session expired".to_string())
            }

            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }

            AppError::BatchTimeout => {
                tracing::error!("Upload batch deadline elapsed");
                (StatusCode::GATEWAY_TIMEOUT, "Upload timeout. Please try again.".to_string())
            }

            AppError::Storage(ref msg) => {
                tracing::error!("Storage error: {}", msg);
                (StatusCode::BAD_GATEWAY, format!("Failed to upload document: {}", msg))
            }

            AppError::NotFound(ref what) => {
                tracing::debug!("{} not found", what);
                (StatusCode::NOT_FOUND, format!("{} not found", what))
            }

            AppError::Multipart(ref msg) => {
                tracing::error!("Multipart error: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = sonic_rs::to_string(&sonic_rs::json!({
            "error": message
        }))
        .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn rejected_batch_maps_to_400_with_every_pair() {
        let response = AppError::UploadRejected(vec![
            PairRejection {
                index: 0,
                document: "Birth Certificate".to_string(),
                reason: "File cannot be empty".to_string(),
            },
            PairRejection {
                index: 2,
                document: "National ID".to_string(),
                reason: "Document requirement not found".to_string(),
            },
        ])
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_text(response).await;
        assert!(body.contains("rejections"));
        assert!(body.contains("Birth Certificate"));
        assert!(body.contains("National ID"));
    }

    #[tokio::test]
    async fn session_errors_map_to_401() {
        assert_eq!(
            AppError::SessionNotFound.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::SessionExpired.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn batch_timeout_maps_to_504() {
        let response = AppError::BatchTimeout.into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert!(body_text(response).await.contains("timeout"));
    }
}
