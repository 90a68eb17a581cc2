use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::{Bytes, BytesMut};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use common::prelude::{
    ImageKind, Receipt, ReceiptId, ReceiptJob, ReceiptStatus, MAX_RECEIPT_SIZE_BYTES,
};

use crate::blobs::BlobStoreError;
use crate::database::ReceiptStoreError;
use crate::http_server::api::client::{ApiError, ApiRequest};
use crate::http_server::handlers::message_response;
use crate::queue::PublishError;
use crate::ServiceState;

/// Name of the multipart field carrying the image
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub receipt_id: ReceiptId,
    pub status: ReceiptStatus,
}

/// A validated image pulled out of the multipart body.
#[derive(Debug)]
struct ReceiptUpload {
    content_type: String,
    kind: ImageKind,
    data: Bytes,
}

pub async fn handler(
    State(state): State<ServiceState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, UploadError> {
    // Nothing below this line runs for a rejected upload
    let upload = read_upload(&mut multipart).await?;

    if !upload.kind.matches_signature(&upload.data) {
        tracing::warn!(
            content_type = %upload.content_type,
            "upload does not start with the signature of its declared image type"
        );
    }

    let receipt_id = ReceiptId::generate();
    let blob_name = receipt_id.blob_name();
    let size = upload.data.len();

    // 1. Store the image
    state
        .blobs()
        .put(&blob_name, upload.data, &upload.content_type)
        .await
        .map_err(|e| {
            tracing::error!(receipt_id = %receipt_id, "failed to store receipt image: {}", e);
            e
        })?;
    tracing::info!(
        receipt_id = %receipt_id,
        blob_name = %blob_name,
        size,
        content_type = %upload.content_type,
        "stored receipt image"
    );

    // 2. Record it
    let receipt = Receipt::pending(receipt_id, OffsetDateTime::now_utc());
    if let Err(e) = state.receipts().insert(&receipt).await {
        tracing::error!(receipt_id = %receipt_id, "failed to insert tracking record: {}", e);
        if let Err(cleanup) = state.blobs().delete(&blob_name).await {
            tracing::error!(
                blob_name = %blob_name,
                "failed to remove orphaned receipt image: {}",
                cleanup
            );
        }
        return Err(e.into());
    }

    // 3. Hand it to the worker
    let job = ReceiptJob::from(&receipt);
    let message_id = state.jobs().publish(&job).await.map_err(|e| {
        tracing::error!(
            receipt_id = %receipt_id,
            "failed to enqueue processing job, receipt stays pending: {}",
            e
        );
        e
    })?;
    tracing::info!(receipt_id = %receipt_id, message_id = %message_id, "enqueued processing job");

    Ok((
        StatusCode::OK,
        Json(UploadResponse {
            receipt_id,
            status: receipt.status,
        }),
    ))
}

/// Pull the single `file` part out of the form.
///
/// The part's declared content type is checked before any of its body is
///  read, and the body is read chunk by chunk so an oversized upload is
///  abandoned as soon as it crosses the ceiling.
async fn read_upload(multipart: &mut Multipart) -> Result<ReceiptUpload, UploadError> {
    let mut upload: Option<ReceiptUpload> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Multipart parsing error: {}", e);
        UploadError::MultipartError(e.to_string())
    })? {
        let field_name = field.name().unwrap_or("").to_string();
        if field_name != FILE_FIELD {
            tracing::warn!("Ignoring unknown field: {}", field_name);
            continue;
        }

        if upload.is_some() {
            return Err(UploadError::InvalidRequest(
                "Exactly one file may be uploaded".into(),
            ));
        }

        let content_type = field.content_type().unwrap_or("").to_string();
        let kind = ImageKind::from_content_type(&content_type)
            .ok_or_else(|| UploadError::InvalidContentType(content_type.clone()))?;

        let mut data = BytesMut::new();
        while let Some(chunk) = field.chunk().await.map_err(|e| {
            tracing::error!("Error reading file data: {}", e);
            UploadError::MultipartError(e.to_string())
        })? {
            if data.len() + chunk.len() > MAX_RECEIPT_SIZE_BYTES {
                return Err(UploadError::TooLarge);
            }
            data.extend_from_slice(&chunk);
        }

        upload = Some(ReceiptUpload {
            content_type,
            kind,
            data: data.freeze(),
        });
    }

    upload.ok_or_else(|| UploadError::InvalidRequest("A file is required".into()))
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Invalid file type: {0:?}")]
    InvalidContentType(String),
    #[error("File too large")]
    TooLarge,
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Multipart error: {0}")]
    MultipartError(String),
    #[error("Blob store error: {0}")]
    BlobStore(#[from] BlobStoreError),
    #[error("Receipt store error: {0}")]
    ReceiptStore(#[from] ReceiptStoreError),
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        match self {
            UploadError::InvalidContentType(_) => message_response(
                StatusCode::BAD_REQUEST,
                "Invalid file type, expected image/png or image/jpeg",
            ),
            UploadError::TooLarge => message_response(
                StatusCode::BAD_REQUEST,
                format!("File too large, limit is {} bytes", MAX_RECEIPT_SIZE_BYTES),
            ),
            UploadError::InvalidRequest(msg) | UploadError::MultipartError(msg) => {
                message_response(StatusCode::BAD_REQUEST, format!("Bad request: {}", msg))
            }
            UploadError::BlobStore(_) | UploadError::ReceiptStore(_) | UploadError::Publish(_) => {
                message_response(StatusCode::INTERNAL_SERVER_ERROR, "unexpected error")
            }
        }
    }
}

/// Client side of the upload endpoint.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl ApiRequest for UploadRequest {
    type Response = UploadResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("/receipts/upload")?;
        let part = reqwest::multipart::Part::bytes(self.data)
            .file_name(self.file_name)
            .mime_str(&self.content_type)?;
        let form = reqwest::multipart::Form::new().part(FILE_FIELD, part);
        Ok(client.post(full_url).multipart(form))
    }
}
