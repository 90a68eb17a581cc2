//! End-to-end tests for the receipt API, driven in-process through the router.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use time::OffsetDateTime;
use tower::ServiceExt;

use common::prelude::{Receipt, ReceiptId, ReceiptJob, ReceiptStatus, MAX_RECEIPT_SIZE_BYTES};
use kvitta_daemon::database::ReceiptStoreError;
use kvitta_daemon::http_server::router;
use kvitta_daemon::queue::PublishError;
use kvitta_daemon::{
    Database, JobPublisher, MemoryPublisher, MemoryReceiptStore, ObjectBlobStore, ReceiptStore,
    ServiceState,
};

const BOUNDARY: &str = "kvitta-test-boundary";

struct Harness {
    router: Router,
    blobs: ObjectBlobStore,
    receipts: MemoryReceiptStore,
    jobs: flume::Receiver<ReceiptJob>,
}

impl Harness {
    fn new() -> Self {
        let blobs = ObjectBlobStore::memory();
        let receipts = MemoryReceiptStore::new();
        let (publisher, jobs) = MemoryPublisher::new();
        let state = ServiceState::new(
            Arc::new(blobs.clone()),
            Arc::new(receipts.clone()),
            Arc::new(publisher),
        );
        Self {
            router: router(state),
            blobs,
            receipts,
            jobs,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        send(&self.router, request).await
    }

    async fn assert_nothing_created(&self) {
        assert!(self.blobs.is_empty().await.unwrap());
        assert!(self.receipts.is_empty());
        assert!(self.jobs.is_empty());
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn multipart_body(field: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + 256);
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"receipt\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(content_type: &str, data: &[u8]) -> Request<Body> {
    upload_request_with_body(multipart_body("file", content_type, data))
}

fn upload_request_with_body(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/receipts/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get_request(receipt_id: &str) -> Request<Body> {
    Request::builder()
        .uri(format!("/receipts/{}", receipt_id))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_upload_then_get_returns_pending() {
    let harness = Harness::new();

    let (status, body) = harness
        .send(upload_request("image/png", b"0123456789"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    let receipt_id: ReceiptId = body["receipt_id"].as_str().unwrap().parse().unwrap();

    let (status, body) = harness.send(get_request(&receipt_id.to_string())).await;
    assert_eq!(status, StatusCode::OK);
    let receipt: Receipt = serde_json::from_value(body.clone()).unwrap();
    assert_eq!(receipt.id, receipt_id);
    assert_eq!(receipt.status, ReceiptStatus::Pending);
    assert_eq!(receipt.blob_name, format!("{}.png", receipt_id));
    assert!(receipt.created_at <= OffsetDateTime::now_utc());
    assert_eq!(body["id"], receipt_id.to_string());

    // the image landed under the record's blob name with its declared type
    let stored = harness.blobs.get(&receipt.blob_name).await.unwrap().unwrap();
    assert_eq!(&stored[..], b"0123456789");
    assert_eq!(
        harness
            .blobs
            .content_type(&receipt.blob_name)
            .await
            .unwrap()
            .as_deref(),
        Some("image/png")
    );

    // and exactly one job went out for it
    let job = harness.jobs.try_recv().unwrap();
    assert_eq!(job.receipt_id, receipt_id);
    assert_eq!(job.blob_name, receipt.blob_name);
    assert!(harness.jobs.try_recv().is_err());
}

#[tokio::test]
async fn test_jpeg_variants_accepted() {
    let harness = Harness::new();

    for content_type in ["image/jpeg", "image/jpg", "IMAGE/JPEG"] {
        let (status, body) = harness
            .send(upload_request(content_type, b"\xff\xd8\xff\xe0rest"))
            .await;
        assert_eq!(status, StatusCode::OK, "{}", content_type);
        let receipt_id = body["receipt_id"].as_str().unwrap();
        assert!(harness
            .blobs
            .get(&format!("{}.png", receipt_id))
            .await
            .unwrap()
            .is_some());
    }

    assert_eq!(harness.receipts.len(), 3);
    assert_eq!(harness.jobs.len(), 3);
}

#[tokio::test]
async fn test_oversized_upload_rejected() {
    let harness = Harness::new();

    let data = vec![0u8; 6 * 1024 * 1024];
    let (status, body) = harness.send(upload_request("image/png", &data)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["msg"].as_str().unwrap().starts_with("File too large"));

    harness.assert_nothing_created().await;
}

#[tokio::test]
async fn test_upload_at_limit_accepted() {
    let harness = Harness::new();

    let data = vec![0u8; MAX_RECEIPT_SIZE_BYTES];
    let (status, _) = harness.send(upload_request("image/png", &data)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(harness.receipts.len(), 1);
}

#[tokio::test]
async fn test_disallowed_content_type_rejected() {
    let harness = Harness::new();

    for content_type in ["application/pdf", "image/gif", "text/plain"] {
        let (status, body) = harness
            .send(upload_request(content_type, b"%PDF-1.7"))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", content_type);
        assert!(body["msg"].as_str().unwrap().starts_with("Invalid file type"));
    }

    harness.assert_nothing_created().await;
}

#[tokio::test]
async fn test_missing_file_field_rejected() {
    let harness = Harness::new();

    let body = multipart_body("note", "text/plain", b"hello");
    let (status, _) = harness.send(upload_request_with_body(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    harness.assert_nothing_created().await;
}

#[tokio::test]
async fn test_get_unknown_receipt_is_not_found() {
    let harness = Harness::new();

    let (status, body) = harness.send(get_request("does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["msg"], "Not found");

    let (status, _) = harness
        .send(get_request(&ReceiptId::generate().to_string()))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[derive(Debug)]
struct BrokenPublisher;

#[async_trait]
impl JobPublisher for BrokenPublisher {
    async fn publish(&self, _job: &ReceiptJob) -> Result<String, PublishError> {
        Err(PublishError::Closed)
    }
}

#[derive(Debug)]
struct BrokenStore;

#[async_trait]
impl ReceiptStore for BrokenStore {
    async fn insert(&self, _receipt: &Receipt) -> Result<(), ReceiptStoreError> {
        Err(ReceiptStoreError::Unavailable("connection refused".into()))
    }

    async fn get(&self, _id: &ReceiptId) -> Result<Option<Receipt>, ReceiptStoreError> {
        Err(ReceiptStoreError::Unavailable("connection refused".into()))
    }

    async fn ping(&self) -> Result<(), ReceiptStoreError> {
        Err(ReceiptStoreError::Unavailable("connection refused".into()))
    }
}

#[tokio::test]
async fn test_publish_failure_leaves_pending_record() {
    let blobs = ObjectBlobStore::memory();
    let receipts = MemoryReceiptStore::new();
    let state = ServiceState::new(
        Arc::new(blobs.clone()),
        Arc::new(receipts.clone()),
        Arc::new(BrokenPublisher),
    );
    let router = router(state);

    let (status, body) = send(&router, upload_request("image/png", b"0123456789")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["msg"], "unexpected error");

    // blob and record stay behind for reconciliation
    assert_eq!(blobs.len().await.unwrap(), 1);
    assert_eq!(receipts.len(), 1);
}

#[tokio::test]
async fn test_insert_failure_removes_blob() {
    let blobs = ObjectBlobStore::memory();
    let (publisher, jobs) = MemoryPublisher::new();
    let state = ServiceState::new(
        Arc::new(blobs.clone()),
        Arc::new(BrokenStore),
        Arc::new(publisher),
    );
    let router = router(state);

    let (status, body) = send(&router, upload_request("image/png", b"0123456789")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["msg"], "unexpected error");

    assert!(blobs.is_empty().await.unwrap());
    assert!(jobs.is_empty());

    let (status, _) = send(&router, get_request(&ReceiptId::generate().to_string())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_readiness_reflects_document_store() {
    let harness = Harness::new();
    let request = Request::builder()
        .uri("/_status/readyz")
        .body(Body::empty())
        .unwrap();
    let (status, body) = harness.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (publisher, _jobs) = MemoryPublisher::new();
    let state = ServiceState::new(
        Arc::new(ObjectBlobStore::memory()),
        Arc::new(BrokenStore),
        Arc::new(publisher),
    );
    let request = Request::builder()
        .uri("/_status/readyz")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&router(state), request).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let harness = Harness::new();
    let request = Request::builder()
        .uri("/nope")
        .header(header::ACCEPT, "application/json")
        .body(Body::empty())
        .unwrap();
    let (status, body) = harness.send(request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["msg"], "not found");
}

#[tokio::test]
async fn test_sqlite_round_trip() {
    let database = Database::connect(&url::Url::parse("sqlite::memory:").unwrap())
        .await
        .unwrap();
    let (publisher, jobs) = MemoryPublisher::new();
    let state = ServiceState::new(
        Arc::new(ObjectBlobStore::memory()),
        Arc::new(database),
        Arc::new(publisher),
    );
    let router = router(state);

    let (status, body) = send(&router, upload_request("image/jpeg", b"\xff\xd8\xffjpeg")).await;
    assert_eq!(status, StatusCode::OK);
    let receipt_id = body["receipt_id"].as_str().unwrap().to_string();

    let (status, body) = send(&router, get_request(&receipt_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["blob_name"], format!("{}.png", receipt_id));
    assert_eq!(jobs.len(), 1);
}
