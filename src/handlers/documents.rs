use axum::{
    Extension,
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::session::StaffSession,
    repositories::{department as department_repo, staff as staff_repo},
    services::uploads::{StagedFile, UploadItem, UploadOutcome},
    state::AppState,
};

#[derive(Serialize)]
pub struct BatchUploadResponse {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub outcomes: Vec<UploadOutcome>,
}

/// Uploads a batch of documents in one request.
///
/// The multipart body carries repeated `requirement_ids` text fields and
/// repeated `files` file fields; the n-th id is paired with the n-th file
/// in arrival order, and the two lists must be the same length.
#[axum::debug_handler]
pub async fn upload_multiple(
    State(state): State<AppState>,
    Extension(session): Extension<StaffSession>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let items = require_batch(collect_batch(multipart).await?)?;

    let staff = staff_repo::find_by_id(&state.db, session.staff_id).await?;
    let department = department_repo::find_by_id(&state.db, session.department_id).await?;

    let outcomes = state.uploads.submit(&staff, &department, items).await?;

    let succeeded = outcomes.iter().filter(|o| o.is_uploaded()).count();
    let failed = outcomes.len() - succeeded;

    tracing::info!(
        "📦 Batch finished for staff {}: {} succeeded, {} failed",
        staff.staff_id_number,
        succeeded,
        failed
    );

    let response = sonic_rs::to_string(&BatchUploadResponse {
        total: outcomes.len(),
        succeeded,
        failed,
        outcomes,
    })
    .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((StatusCode::CREATED, response).into_response())
}

/// Uploads a single document.
///
/// Runs through the same pipeline as a batch of one, so validation,
/// concurrency limiting, and auditing behave identically; the lone
/// failure outcome is surfaced as an error instead of a partial result.
#[axum::debug_handler]
pub async fn upload(
    State(state): State<AppState>,
    Extension(session): Extension<StaffSession>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let item = require_single(collect_batch(multipart).await?)?;

    let staff = staff_repo::find_by_id(&state.db, session.staff_id).await?;
    let department = department_repo::find_by_id(&state.db, session.department_id).await?;

    let mut outcomes = state.uploads.submit(&staff, &department, vec![item]).await?;

    match outcomes.pop() {
        Some(outcome @ UploadOutcome::Uploaded { .. }) => {
            let response = sonic_rs::to_string(&outcome)
                .map_err(|e| AppError::Internal(e.to_string()))?;
            Ok((StatusCode::CREATED, response).into_response())
        }
        Some(UploadOutcome::Failed { reason, .. }) => Err(AppError::Storage(reason)),
        None => Err(AppError::Internal("Upload produced no outcome".to_string())),
    }
}

/// Drains a multipart body into id and file lists, then pairs them.
///
/// Field names follow the upload form contract: `requirement_ids` (or
/// `requirement_id`) for ids, `files` (or `file`) for payloads.
async fn collect_batch(mut multipart: Multipart) -> Result<Vec<UploadItem>> {
    let mut requirement_ids: Vec<Uuid> = Vec::new();
    let mut files: Vec<StagedFile> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Multipart(e.to_string()))?
    {
        let name = field.name().map(|n| n.to_string());

        match name.as_deref() {
            Some("requirement_ids") | Some("requirement_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Multipart(e.to_string()))?;
                let id = Uuid::parse_str(text.trim()).map_err(|_| {
                    AppError::Validation(format!("Invalid requirement id: {}", text.trim()))
                })?;
                requirement_ids.push(id);
            }

            Some("files") | Some("file") => {
                let file_name = field
                    .file_name()
                    .unwrap_or("unnamed")
                    .to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Multipart(e.to_string()))?;

                files.push(StagedFile {
                    file_name,
                    content_type,
                    data,
                });
            }

            other => {
                tracing::debug!("Ignoring unexpected multipart field: {:?}", other);
                let _ = field.bytes().await;
            }
        }
    }

    pair_items(requirement_ids, files)
}

/// Pairs the n-th requirement id with the n-th file, in arrival order.
/// The two lists must be the same length.
fn pair_items(requirement_ids: Vec<Uuid>, files: Vec<StagedFile>) -> Result<Vec<UploadItem>> {
    if requirement_ids.len() != files.len() {
        return Err(AppError::Validation(
            "Number of requirements must match number of files".to_string(),
        ));
    }

    Ok(requirement_ids
        .into_iter()
        .zip(files)
        .map(|(requirement_id, file)| UploadItem {
            requirement_id,
            file,
        })
        .collect())
}

/// Rejects an empty batch.
fn require_batch(items: Vec<UploadItem>) -> Result<Vec<UploadItem>> {
    if items.is_empty() {
        return Err(AppError::Validation("No documents provided".to_string()));
    }

    Ok(items)
}

/// Rejects anything other than exactly one pair.
fn require_single(mut items: Vec<UploadItem>) -> Result<UploadItem> {
    if items.len() != 1 {
        return Err(AppError::Validation(
            "Exactly one document is expected".to_string(),
        ));
    }

    items
        .pop()
        .ok_or_else(|| AppError::Internal("Upload produced no item".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    fn staged(name: &str) -> StagedFile {
        StagedFile {
            file_name: name.to_string(),
            content_type: "application/pdf".to_string(),
            data: Bytes::from_static(b"%PDF-1.4 test"),
        }
    }

    #[test]
    fn pairs_ids_and_files_positionally() {
        let ids = vec![Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let files = vec![staged("a.pdf"), staged("b.pdf"), staged("c.pdf")];

        let items = pair_items(ids.clone(), files).unwrap();

        assert_eq!(items.len(), 3);
        for (i, item) in items.iter().enumerate() {
            assert_eq!(item.requirement_id, ids[i]);
        }
        assert_eq!(items[1].file.file_name, "b.pdf");
    }

    #[test]
    fn mismatched_counts_are_rejected() {
        let ids = vec![Uuid::new_v4(), Uuid::new_v4()];
        let files = vec![staged("a.pdf")];

        let err = pair_items(ids, files).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("must match"));

        // Same invariant with the imbalance the other way around.
        let err = pair_items(vec![Uuid::new_v4()], vec![staged("a.pdf"), staged("b.pdf")])
            .unwrap_err();
        assert!(err.to_string().contains("must match"));
    }

    #[test]
    fn empty_lists_pair_to_an_empty_batch() {
        assert!(pair_items(Vec::new(), Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn batch_upload_rejects_zero_items() {
        let err = require_batch(Vec::new()).unwrap_err();
        assert!(err.to_string().contains("No documents provided"));

        let kept = require_batch(vec![UploadItem {
            requirement_id: Uuid::new_v4(),
            file: staged("a.pdf"),
        }])
        .unwrap();
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn single_upload_requires_exactly_one_pair() {
        assert!(require_single(Vec::new()).is_err());

        let two = vec![
            UploadItem {
                requirement_id: Uuid::new_v4(),
                file: staged("a.pdf"),
            },
            UploadItem {
                requirement_id: Uuid::new_v4(),
                file: staged("b.pdf"),
            },
        ];
        let err = require_single(two).unwrap_err();
        assert!(err.to_string().contains("Exactly one document"));

        let id = Uuid::new_v4();
        let item = require_single(vec![UploadItem {
            requirement_id: id,
            file: staged("a.pdf"),
        }])
        .unwrap();
        assert_eq!(item.requirement_id, id);
    }
}
