use std::sync::Arc;

use uuid::Uuid;

use super::common::*;
use crate::workflows::applications::domain::ApplicationStatus;
use crate::workflows::applications::repository::{ApplicationRepository, RepositoryError};
use crate::workflows::applications::{storage_path, SubmissionError, SubmissionService};

#[tokio::test]
async fn submit_without_uploads_persists_exactly_one_record() {
    let (service, repository, storage) = build_service();

    let receipt = service
        .submit(submission(Vec::new()))
        .await
        .expect("submission persists");

    assert_eq!(repository.count(), 1);
    assert!(receipt.uploads.is_empty());
    assert_eq!(receipt.application.status, ApplicationStatus::Pending);
    assert_eq!(
        receipt.application.data_text("fullName"),
        Some("Chinedu Okafor")
    );
    assert!(!receipt.application.data.contains_key("documentPaths"));
    assert!(storage.content_types().is_empty());
}

#[tokio::test]
async fn uploads_run_before_insert_and_are_recorded() {
    let (service, repository, storage) = build_service();

    let receipt = service
        .submit(submission(vec![
            upload("cv", "Europass CV.pdf"),
            upload("passport", "passport.png"),
        ]))
        .await
        .expect("submission persists");

    assert_eq!(receipt.failed_uploads(), 0);
    let stored = repository
        .fetch_application(&receipt.application.id)
        .await
        .expect("fetch succeeds")
        .expect("record present");
    let paths = document_paths(&stored);
    assert_eq!(paths.len(), 2);
    assert!(paths.iter().all(|path| path.starts_with("applications/")));
    assert!(paths.iter().any(|path| path.ends_with("-Europass_CV.pdf")));
    assert_eq!(
        storage.content_types(),
        vec!["application/pdf".to_string(), "image/png".to_string()]
    );
}

#[tokio::test]
async fn failed_upload_does_not_block_the_record_write() {
    let repository = Arc::new(MemoryApplications::default());
    let storage = Arc::new(MemoryStorage::rejecting("passport.pdf"));
    let service = SubmissionService::new(repository.clone(), storage);

    let receipt = service
        .submit(submission(vec![
            upload("cv", "cv.pdf"),
            upload("passport", "passport.pdf"),
        ]))
        .await
        .expect("record still written");

    assert_eq!(repository.count(), 1);
    assert_eq!(receipt.failed_uploads(), 1);
    let failed = receipt
        .uploads
        .iter()
        .find(|outcome| outcome.result.is_err())
        .expect("one failure");
    assert_eq!(failed.field, "passport");
    assert_eq!(document_paths(&receipt.application).len(), 1);
}

#[tokio::test]
async fn insert_failure_surfaces_repository_error() {
    let service = SubmissionService::new(
        Arc::new(UnavailableApplications),
        Arc::new(MemoryStorage::default()),
    );

    match service.submit(submission(Vec::new())).await {
        Err(SubmissionError::Repository(RepositoryError::Unavailable(reason))) => {
            assert_eq!(reason, "database offline");
        }
        other => panic!("expected unavailable repository, got {other:?}"),
    }
}

#[tokio::test]
async fn uploads_sharing_a_file_name_are_stored_separately() {
    let (service, _repository, storage) = build_service();

    let receipt = service
        .submit(submission(vec![
            upload("cv", "scan.pdf"),
            upload("passport", "scan.pdf"),
        ]))
        .await
        .expect("submission persists");

    assert_eq!(receipt.failed_uploads(), 0);
    assert_eq!(storage.object_count(), 2);
    let paths = document_paths(&receipt.application);
    assert_eq!(paths.len(), 2);
    assert_ne!(paths[0], paths[1]);
    assert!(paths[0].contains("-cv-"));
    assert!(paths[1].contains("-passport-"));
    assert!(paths.iter().all(|path| path.ends_with("-scan.pdf")));
}

#[test]
fn storage_path_sanitizes_field_and_file_names() {
    let upload_id = Uuid::nil();
    assert_eq!(
        storage_path(1_700_000_000_000, upload_id, "cv", "my passport (1).pdf"),
        "applications/1700000000000-cv-00000000000000000000000000000000-my_passport__1_.pdf"
    );
    assert_eq!(
        storage_path(42, upload_id, " ", "   "),
        "applications/42-file-00000000000000000000000000000000-upload"
    );
}

#[test]
fn storage_path_differs_per_upload_id() {
    let first = storage_path(7, Uuid::new_v4(), "cv", "scan.pdf");
    let second = storage_path(7, Uuid::new_v4(), "cv", "scan.pdf");
    assert_ne!(first, second);
}
