use async_trait::async_trait;
use axum::body::Bytes;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use uuid::Uuid;

use crate::error::{AppError, PairRejection, Result};
use crate::models::department::Department;
use crate::models::requirement::DocumentRequirement;
use crate::models::staff::Staff;
use crate::models::submission::{DocumentSubmission, NewSubmission};
use crate::repositories::{requirement, submission};
use crate::services::audit::{AuditEvent, AuditSink};
use crate::storage::{self, ObjectStore};
use crate::validation::upload::validate_file;

/// A file held in memory between multipart extraction and upload.
#[derive(Clone, Debug)]
pub struct StagedFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// One (requirement, file) pair of an upload batch.
#[derive(Debug)]
pub struct UploadItem {
    pub requirement_id: Uuid,
    pub file: StagedFile,
}

/// The terminal state of one upload unit, reported in batch order.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadOutcome {
    Uploaded {
        submission_id: Uuid,
        requirement_id: Uuid,
        document_name: String,
        file_url: String,
        file_size: i64,
        submitted_at: DateTime<Utc>,
    },
    Failed {
        requirement_id: Uuid,
        document_name: String,
        reason: String,
    },
}

impl UploadOutcome {
    pub fn is_uploaded(&self) -> bool {
        matches!(self, UploadOutcome::Uploaded { .. })
    }
}

/// Durable record-keeping for submissions.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn exists_for(&self, staff_id: Uuid, requirement_id: Uuid) -> Result<bool>;
    async fn save(&self, submission: NewSubmission) -> Result<DocumentSubmission>;
}

/// Lookup of active document requirements.
#[async_trait]
pub trait RequirementDirectory: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<DocumentRequirement>;
}

/// `SubmissionStore` backed by Postgres.
///
/// Each `save` runs on its own pooled connection, so one file's durable
/// write never shares a unit of work with a sibling's.
pub struct PgSubmissionStore {
    pool: PgPool,
}

impl PgSubmissionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubmissionStore for PgSubmissionStore {
    async fn exists_for(&self, staff_id: Uuid, requirement_id: Uuid) -> Result<bool> {
        submission::exists_for(&self.pool, staff_id, requirement_id).await
    }

    async fn save(&self, new: NewSubmission) -> Result<DocumentSubmission> {
        submission::insert(&self.pool, &new).await
    }
}

/// `RequirementDirectory` backed by Postgres.
pub struct PgRequirementDirectory {
    pool: PgPool,
}

impl PgRequirementDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RequirementDirectory for PgRequirementDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<DocumentRequirement> {
        requirement::find_by_id(&self.pool, id).await
    }
}

/// Orchestrates a multi-document upload batch.
///
/// Admission validates every pair before any byte leaves the process; one
/// invalid pair rejects the whole batch with nothing uploaded. Admitted
/// pairs then fan out to independent tasks behind a shared concurrency
/// limit. After dispatch each unit is isolated: a failed upload or a failed
/// database write turns into a `Failed` outcome for that pair only. The
/// batch as a whole must finish within `deadline`, otherwise the caller
/// gets `BatchTimeout` and still-running units are left to finish on their
/// own without being reported.
#[derive(Clone)]
pub struct UploadPipeline {
    store: Arc<dyn ObjectStore>,
    submissions: Arc<dyn SubmissionStore>,
    requirements: Arc<dyn RequirementDirectory>,
    audit: AuditSink,
    limiter: Arc<Semaphore>,
    deadline: Duration,
}

impl UploadPipeline {
    /// Creates a new `UploadPipeline`.
    ///
    /// # Arguments
    ///
    /// * `store` - Remote object store files are uploaded to.
    /// * `submissions` - Durable store of submission records.
    /// * `requirements` - Directory of active document requirements.
    /// * `audit` - Fire-and-forget audit sink.
    /// * `concurrency` - Maximum uploads in flight at once, across batches.
    /// * `deadline` - Wall-clock budget for a whole batch.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        submissions: Arc<dyn SubmissionStore>,
        requirements: Arc<dyn RequirementDirectory>,
        audit: AuditSink,
        concurrency: usize,
        deadline: Duration,
    ) -> Self {
        Self {
            store,
            submissions,
            requirements,
            audit,
            limiter: Arc::new(Semaphore::new(concurrency)),
            deadline,
        }
    }

    /// Runs an upload batch to completion and returns one outcome per pair,
    /// in the order the pairs were submitted.
    pub async fn submit(
        &self,
        staff: &Staff,
        department: &Department,
        items: Vec<UploadItem>,
    ) -> Result<Vec<UploadOutcome>> {
        if staff.department_id != Some(department.id) {
            return Err(AppError::Validation(
                "Please select a department before uploading documents".to_string(),
            ));
        }

        let admitted = self.admit(staff, department, items).await?;

        tracing::info!(
            "📤 Dispatching {} upload(s) for staff {}",
            admitted.len(),
            staff.staff_id_number
        );

        // Each pair's identity is kept beside its handle so a crashed task
        // still reports the right pair in the right position.
        let mut pair_identities = Vec::with_capacity(admitted.len());
        let handles: Vec<_> = admitted
            .into_iter()
            .map(|unit| {
                pair_identities.push((
                    unit.requirement.id,
                    unit.requirement.document_name.clone(),
                ));
                let worker = UploadWorker {
                    store: self.store.clone(),
                    submissions: self.submissions.clone(),
                    audit: self.audit.clone(),
                    limiter: self.limiter.clone(),
                    staff_id: staff.id,
                    staff_name: staff.full_name.clone(),
                    staff_id_number: staff.staff_id_number.clone(),
                    department_name: department.name.clone(),
                };
                tokio::spawn(async move { worker.run(unit).await })
            })
            .collect();

        let joined = timeout(self.deadline, join_all(handles))
            .await
            .map_err(|_| AppError::BatchTimeout)?;

        let outcomes = pair_identities
            .into_iter()
            .zip(joined)
            .map(|((requirement_id, document_name), join_result)| match join_result {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(
                        "Upload task for '{}' panicked or was cancelled: {}",
                        document_name,
                        e
                    );
                    UploadOutcome::Failed {
                        requirement_id,
                        document_name,
                        reason: "Upload task failed unexpectedly".to_string(),
                    }
                }
            })
            .collect();

        Ok(outcomes)
    }

    /// Validates every pair of a batch, collecting all rejections so the
    /// client sees the full picture in one round trip. Any rejection fails
    /// the whole batch before a single upload starts.
    async fn admit(
        &self,
        staff: &Staff,
        department: &Department,
        items: Vec<UploadItem>,
    ) -> Result<Vec<AdmittedUnit>> {
        let mut admitted = Vec::with_capacity(items.len());
        let mut rejections = Vec::new();

        for (index, item) in items.into_iter().enumerate() {
            let requirement = match self.requirements.find_by_id(item.requirement_id).await {
                Ok(requirement) => requirement,
                Err(AppError::NotFound(_)) => {
                    rejections.push(PairRejection {
                        index,
                        document: item.file.file_name.clone(),
                        reason: "Document requirement not found".to_string(),
                    });
                    continue;
                }
                Err(e) => return Err(e),
            };

            if requirement.department_id != department.id {
                rejections.push(PairRejection {
                    index,
                    document: requirement.document_name.clone(),
                    reason: format!(
                        "Document '{}' does not belong to your department",
                        requirement.document_name
                    ),
                });
                continue;
            }

            if let Err(e) = validate_file(
                &item.file.file_name,
                &item.file.content_type,
                item.file.data.len(),
            ) {
                rejections.push(PairRejection {
                    index,
                    document: requirement.document_name.clone(),
                    reason: e.to_string(),
                });
                continue;
            }

            if self
                .submissions
                .exists_for(staff.id, requirement.id)
                .await?
            {
                rejections.push(PairRejection {
                    index,
                    document: requirement.document_name.clone(),
                    reason: format!(
                        "Document '{}' has already been submitted",
                        requirement.document_name
                    ),
                });
                continue;
            }

            admitted.push(AdmittedUnit {
                requirement,
                file: item.file,
            });
        }

        if !rejections.is_empty() {
            tracing::warn!(
                "❌ Batch rejected for staff {}: {} invalid pair(s)",
                staff.staff_id_number,
                rejections.len()
            );
            return Err(AppError::UploadRejected(rejections));
        }

        Ok(admitted)
    }
}

struct AdmittedUnit {
    requirement: DocumentRequirement,
    file: StagedFile,
}

/// One spawned unit of upload work. Owns everything it touches so it can
/// outlive the request when the batch deadline abandons it.
struct UploadWorker {
    store: Arc<dyn ObjectStore>,
    submissions: Arc<dyn SubmissionStore>,
    audit: AuditSink,
    limiter: Arc<Semaphore>,
    staff_id: Uuid,
    staff_name: String,
    staff_id_number: String,
    department_name: String,
}

impl UploadWorker {
    async fn run(self, unit: AdmittedUnit) -> UploadOutcome {
        let requirement_id = unit.requirement.id;
        let document_name = unit.requirement.document_name.clone();

        match self.upload_one(unit).await {
            Ok(submission) => {
                self.audit.record(AuditEvent::UploadSuccess {
                    staff_id_number: self.staff_id_number.clone(),
                    department_name: self.department_name.clone(),
                    document_name: document_name.clone(),
                    file_url: submission.file_url.clone(),
                });

                UploadOutcome::Uploaded {
                    submission_id: submission.id,
                    requirement_id,
                    document_name,
                    file_url: submission.file_url,
                    file_size: submission.file_size,
                    submitted_at: submission.submitted_at,
                }
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::error!("❌ Upload failed for '{}': {}", document_name, reason);

                self.audit.record(AuditEvent::UploadFailure {
                    staff_id_number: self.staff_id_number.clone(),
                    department_name: self.department_name.clone(),
                    document_name: document_name.clone(),
                    error: reason.clone(),
                });

                UploadOutcome::Failed {
                    requirement_id,
                    document_name,
                    reason,
                }
            }
        }
    }

    async fn upload_one(&self, unit: AdmittedUnit) -> Result<DocumentSubmission> {
        let _permit = self
            .limiter
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| AppError::Internal("Upload limiter closed".to_string()))?;

        let folder = storage::department_folder(&self.department_name);
        let name = storage::object_name(&self.staff_name, &unit.requirement.document_name);

        let uploaded = self
            .store
            .upload(unit.file.data.clone(), &folder, &name)
            .await?;

        let saved = self
            .submissions
            .save(NewSubmission {
                staff_id: self.staff_id,
                requirement_id: unit.requirement.id,
                file_url: uploaded.url.clone(),
                storage_id: uploaded.storage_id.clone(),
                file_name: unit.file.file_name.clone(),
                file_size: unit.file.data.len() as i64,
                mime_type: unit.file.content_type.clone(),
            })
            .await;

        match saved {
            Ok(submission) => Ok(submission),
            Err(e) => {
                // The object is already in the store; it stays there as an
                // orphan until a reconciliation job cleans it up.
                tracing::warn!(
                    "Submission record failed after upload, orphaned object: {}",
                    uploaded.storage_id
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::UploadedObject;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockStore {
        uploads: Mutex<Vec<String>>,
        fail_names_containing: Option<String>,
        panic_names_containing: Option<String>,
        delay: Option<Duration>,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
    }

    impl MockStore {
        fn new() -> Self {
            Self {
                uploads: Mutex::new(Vec::new()),
                fail_names_containing: None,
                panic_names_containing: None,
                delay: None,
                in_flight: AtomicUsize::new(0),
                peak_in_flight: AtomicUsize::new(0),
            }
        }

        fn failing_on(fragment: &str) -> Self {
            Self {
                fail_names_containing: Some(fragment.to_string()),
                ..Self::new()
            }
        }

        fn panicking_on(fragment: &str) -> Self {
            Self {
                panic_names_containing: Some(fragment.to_string()),
                ..Self::new()
            }
        }

        fn with_delay(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::new()
            }
        }

        fn upload_count(&self) -> usize {
            self.uploads.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ObjectStore for MockStore {
        async fn upload(&self, _data: Bytes, folder: &str, name: &str) -> Result<UploadedObject> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if let Some(ref fragment) = self.panic_names_containing {
                if name.contains(fragment.as_str()) {
                    panic!("mock store crashed");
                }
            }

            if let Some(ref fragment) = self.fail_names_containing {
                if name.contains(fragment.as_str()) {
                    return Err(AppError::Storage("store unavailable".to_string()));
                }
            }

            self.uploads.lock().unwrap().push(name.to_string());

            Ok(UploadedObject {
                url: format!("https://files.example/{}/{}", folder, name),
                storage_id: format!("{}/{}", folder, name),
            })
        }
    }

    #[derive(Default)]
    struct MemorySubmissions {
        rows: Mutex<Vec<(Uuid, Uuid)>>,
        fail_for_requirement: Option<Uuid>,
    }

    impl MemorySubmissions {
        fn count(&self) -> usize {
            self.rows.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SubmissionStore for MemorySubmissions {
        async fn exists_for(&self, staff_id: Uuid, requirement_id: Uuid) -> Result<bool> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .contains(&(staff_id, requirement_id)))
        }

        async fn save(&self, new: NewSubmission) -> Result<DocumentSubmission> {
            if self.fail_for_requirement == Some(new.requirement_id) {
                return Err(AppError::Internal("database write refused".to_string()));
            }

            self.rows
                .lock()
                .unwrap()
                .push((new.staff_id, new.requirement_id));

            Ok(DocumentSubmission {
                id: Uuid::new_v4(),
                staff_id: new.staff_id,
                requirement_id: new.requirement_id,
                file_url: new.file_url,
                storage_id: new.storage_id,
                file_name: new.file_name,
                file_size: new.file_size,
                mime_type: new.mime_type,
                submitted_at: Utc::now(),
            })
        }
    }

    struct MapRequirements {
        by_id: HashMap<Uuid, DocumentRequirement>,
    }

    #[async_trait]
    impl RequirementDirectory for MapRequirements {
        async fn find_by_id(&self, id: Uuid) -> Result<DocumentRequirement> {
            self.by_id
                .get(&id)
                .cloned()
                .ok_or_else(|| AppError::NotFound("Document requirement".to_string()))
        }
    }

    struct Fixture {
        staff: Staff,
        department: Department,
        requirements: Vec<DocumentRequirement>,
    }

    fn fixture(requirement_count: usize) -> Fixture {
        let department = Department {
            id: Uuid::new_v4(),
            name: "Human Resources".to_string(),
            description: None,
            created_at: Utc::now(),
        };

        let staff = Staff {
            id: Uuid::new_v4(),
            staff_id_number: "STF-001".to_string(),
            full_name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            department_id: Some(department.id),
            created_at: Utc::now(),
        };

        let requirements = (0..requirement_count)
            .map(|i| DocumentRequirement {
                id: Uuid::new_v4(),
                department_id: department.id,
                document_name: format!("Document {}", i),
                is_required: true,
                is_active: true,
                created_at: Utc::now(),
            })
            .collect();

        Fixture {
            staff,
            department,
            requirements,
        }
    }

    fn pdf_item(requirement_id: Uuid) -> UploadItem {
        UploadItem {
            requirement_id,
            file: StagedFile {
                file_name: "scan.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                data: Bytes::from_static(b"%PDF-1.4 test"),
            },
        }
    }

    fn pipeline(
        store: Arc<MockStore>,
        submissions: Arc<MemorySubmissions>,
        fix: &Fixture,
        concurrency: usize,
        deadline: Duration,
    ) -> UploadPipeline {
        let by_id = fix
            .requirements
            .iter()
            .map(|r| (r.id, r.clone()))
            .collect();

        UploadPipeline::new(
            store,
            submissions,
            Arc::new(MapRequirements { by_id }),
            AuditSink::detached(),
            concurrency,
            deadline,
        )
    }

    #[tokio::test]
    async fn batch_of_valid_files_all_succeed_in_order() {
        let fix = fixture(3);
        let store = Arc::new(MockStore::new());
        let submissions = Arc::new(MemorySubmissions::default());
        let pipeline = pipeline(
            store.clone(),
            submissions.clone(),
            &fix,
            8,
            Duration::from_secs(300),
        );

        let items = fix.requirements.iter().map(|r| pdf_item(r.id)).collect();
        let outcomes = pipeline
            .submit(&fix.staff, &fix.department, items)
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 3);
        for (i, outcome) in outcomes.iter().enumerate() {
            match outcome {
                UploadOutcome::Uploaded {
                    requirement_id,
                    document_name,
                    ..
                } => {
                    assert_eq!(*requirement_id, fix.requirements[i].id);
                    assert_eq!(*document_name, fix.requirements[i].document_name);
                }
                UploadOutcome::Failed { reason, .. } => panic!("unexpected failure: {}", reason),
            }
        }

        assert_eq!(store.upload_count(), 3);
        assert_eq!(submissions.count(), 3);
    }

    #[tokio::test]
    async fn one_invalid_pair_rejects_the_whole_batch() {
        let fix = fixture(3);
        let store = Arc::new(MockStore::new());
        let submissions = Arc::new(MemorySubmissions::default());
        let pipeline = pipeline(
            store.clone(),
            submissions.clone(),
            &fix,
            8,
            Duration::from_secs(300),
        );

        let mut items: Vec<UploadItem> =
            fix.requirements.iter().map(|r| pdf_item(r.id)).collect();
        items[1].file.file_name = "malware.exe".to_string();
        items[1].file.content_type = "application/x-msdownload".to_string();

        let err = pipeline
            .submit(&fix.staff, &fix.department, items)
            .await
            .unwrap_err();

        match err {
            AppError::UploadRejected(rejections) => {
                assert_eq!(rejections.len(), 1);
                assert_eq!(rejections[0].index, 1);
                assert!(rejections[0].reason.contains("Invalid file type"));
            }
            other => panic!("expected UploadRejected, got {}", other),
        }

        // Nothing left the process and nothing was recorded.
        assert_eq!(store.upload_count(), 0);
        assert_eq!(submissions.count(), 0);
    }

    #[tokio::test]
    async fn admission_reports_every_invalid_pair_at_once() {
        let fix = fixture(4);
        let store = Arc::new(MockStore::new());
        let submissions = Arc::new(MemorySubmissions::default());
        let pipeline = pipeline(
            store.clone(),
            submissions.clone(),
            &fix,
            8,
            Duration::from_secs(300),
        );

        let mut items: Vec<UploadItem> =
            fix.requirements.iter().map(|r| pdf_item(r.id)).collect();
        items[0].file.data = Bytes::new();
        items[2].requirement_id = Uuid::new_v4();

        let err = pipeline
            .submit(&fix.staff, &fix.department, items)
            .await
            .unwrap_err();

        match err {
            AppError::UploadRejected(rejections) => {
                assert_eq!(rejections.len(), 2);
                assert_eq!(rejections[0].index, 0);
                assert!(rejections[0].reason.contains("empty"));
                assert_eq!(rejections[1].index, 2);
                assert!(rejections[1].reason.contains("not found"));
            }
            other => panic!("expected UploadRejected, got {}", other),
        }
    }

    #[tokio::test]
    async fn already_submitted_pair_is_rejected() {
        let fix = fixture(2);
        let store = Arc::new(MockStore::new());
        let submissions = Arc::new(MemorySubmissions::default());
        submissions
            .rows
            .lock()
            .unwrap()
            .push((fix.staff.id, fix.requirements[0].id));

        let pipeline = pipeline(
            store.clone(),
            submissions.clone(),
            &fix,
            8,
            Duration::from_secs(300),
        );

        let items = fix.requirements.iter().map(|r| pdf_item(r.id)).collect();
        let err = pipeline
            .submit(&fix.staff, &fix.department, items)
            .await
            .unwrap_err();

        match err {
            AppError::UploadRejected(rejections) => {
                assert_eq!(rejections.len(), 1);
                assert!(rejections[0].reason.contains("already been submitted"));
            }
            other => panic!("expected UploadRejected, got {}", other),
        }
    }

    #[tokio::test]
    async fn requirement_of_another_department_is_rejected() {
        let mut fix = fixture(2);
        fix.requirements[1].department_id = Uuid::new_v4();

        let store = Arc::new(MockStore::new());
        let submissions = Arc::new(MemorySubmissions::default());
        let pipeline = pipeline(
            store.clone(),
            submissions.clone(),
            &fix,
            8,
            Duration::from_secs(300),
        );

        let items = fix.requirements.iter().map(|r| pdf_item(r.id)).collect();
        let err = pipeline
            .submit(&fix.staff, &fix.department, items)
            .await
            .unwrap_err();

        match err {
            AppError::UploadRejected(rejections) => {
                assert_eq!(rejections.len(), 1);
                assert_eq!(rejections[0].index, 1);
                assert!(rejections[0].reason.contains("does not belong"));
            }
            other => panic!("expected UploadRejected, got {}", other),
        }
    }

    #[tokio::test]
    async fn staff_without_department_cannot_upload() {
        let mut fix = fixture(1);
        fix.staff.department_id = None;

        let store = Arc::new(MockStore::new());
        let submissions = Arc::new(MemorySubmissions::default());
        let pipeline = pipeline(
            store.clone(),
            submissions.clone(),
            &fix,
            8,
            Duration::from_secs(300),
        );

        let items = vec![pdf_item(fix.requirements[0].id)];
        let err = pipeline
            .submit(&fix.staff, &fix.department, items)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("select a department"));
    }

    #[tokio::test]
    async fn store_failure_is_isolated_to_its_pair() {
        let fix = fixture(3);
        // Object names embed the document name, so "document_1" pins the
        // failure to the middle pair.
        let store = Arc::new(MockStore::failing_on("document_1"));
        let submissions = Arc::new(MemorySubmissions::default());
        let pipeline = pipeline(
            store.clone(),
            submissions.clone(),
            &fix,
            8,
            Duration::from_secs(300),
        );

        let items = fix.requirements.iter().map(|r| pdf_item(r.id)).collect();
        let outcomes = pipeline
            .submit(&fix.staff, &fix.department, items)
            .await
            .unwrap();

        assert!(outcomes[0].is_uploaded());
        assert!(outcomes[2].is_uploaded());
        match &outcomes[1] {
            UploadOutcome::Failed { reason, document_name, .. } => {
                assert!(reason.contains("store unavailable"));
                assert_eq!(document_name, "Document 1");
            }
            UploadOutcome::Uploaded { .. } => panic!("middle pair should have failed"),
        }

        assert_eq!(submissions.count(), 2);
    }

    #[tokio::test]
    async fn crashed_task_still_reports_its_own_pair() {
        let fix = fixture(3);
        let store = Arc::new(MockStore::panicking_on("document_1"));
        let submissions = Arc::new(MemorySubmissions::default());
        let pipeline = pipeline(
            store.clone(),
            submissions.clone(),
            &fix,
            8,
            Duration::from_secs(300),
        );

        let items = fix.requirements.iter().map(|r| pdf_item(r.id)).collect();
        let outcomes = pipeline
            .submit(&fix.staff, &fix.department, items)
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_uploaded());
        assert!(outcomes[2].is_uploaded());
        match &outcomes[1] {
            UploadOutcome::Failed {
                requirement_id,
                document_name,
                reason,
            } => {
                assert_eq!(*requirement_id, fix.requirements[1].id);
                assert_eq!(document_name, "Document 1");
                assert!(reason.contains("unexpectedly"));
            }
            UploadOutcome::Uploaded { .. } => panic!("middle pair should have failed"),
        }
    }

    #[tokio::test]
    async fn persistence_failure_is_isolated_to_its_pair() {
        let fix = fixture(2);
        let store = Arc::new(MockStore::new());
        let submissions = Arc::new(MemorySubmissions {
            fail_for_requirement: Some(fix.requirements[0].id),
            ..Default::default()
        });
        let pipeline = pipeline(
            store.clone(),
            submissions.clone(),
            &fix,
            8,
            Duration::from_secs(300),
        );

        let items = fix.requirements.iter().map(|r| pdf_item(r.id)).collect();
        let outcomes = pipeline
            .submit(&fix.staff, &fix.department, items)
            .await
            .unwrap();

        assert!(!outcomes[0].is_uploaded());
        assert!(outcomes[1].is_uploaded());
        // Both objects reached the store; only one record landed.
        assert_eq!(store.upload_count(), 2);
        assert_eq!(submissions.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn large_batch_never_exceeds_the_concurrency_limit() {
        let fix = fixture(50);
        let store = Arc::new(MockStore::with_delay(Duration::from_millis(20)));
        let submissions = Arc::new(MemorySubmissions::default());
        let pipeline = pipeline(
            store.clone(),
            submissions.clone(),
            &fix,
            4,
            Duration::from_secs(300),
        );

        let items = fix.requirements.iter().map(|r| pdf_item(r.id)).collect();
        let outcomes = pipeline
            .submit(&fix.staff, &fix.department, items)
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 50);
        assert!(outcomes.iter().all(|o| o.is_uploaded()));
        assert!(store.peak_in_flight.load(Ordering::SeqCst) <= 4);
        assert_eq!(submissions.count(), 50);
    }

    #[tokio::test(start_paused = true)]
    async fn outcomes_keep_submission_order_despite_completion_order() {
        let fix = fixture(4);
        // Every upload waits the same simulated time, but with a limiter of
        // one, later pairs finish much later; ordering must still hold.
        let store = Arc::new(MockStore::with_delay(Duration::from_millis(50)));
        let submissions = Arc::new(MemorySubmissions::default());
        let pipeline = pipeline(
            store.clone(),
            submissions.clone(),
            &fix,
            1,
            Duration::from_secs(300),
        );

        let items = fix.requirements.iter().map(|r| pdf_item(r.id)).collect();
        let outcomes = pipeline
            .submit(&fix.staff, &fix.department, items)
            .await
            .unwrap();

        for (i, outcome) in outcomes.iter().enumerate() {
            match outcome {
                UploadOutcome::Uploaded { requirement_id, .. } => {
                    assert_eq!(*requirement_id, fix.requirements[i].id);
                }
                UploadOutcome::Failed { reason, .. } => panic!("unexpected failure: {}", reason),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_batch_hits_the_deadline() {
        let fix = fixture(2);
        let store = Arc::new(MockStore::with_delay(Duration::from_secs(600)));
        let submissions = Arc::new(MemorySubmissions::default());
        let pipeline = pipeline(
            store.clone(),
            submissions.clone(),
            &fix,
            8,
            Duration::from_secs(300),
        );

        let items = fix.requirements.iter().map(|r| pdf_item(r.id)).collect();
        let err = pipeline
            .submit(&fix.staff, &fix.department, items)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BatchTimeout));
    }
}
