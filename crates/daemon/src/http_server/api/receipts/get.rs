use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::prelude::{Receipt, ReceiptId};

use crate::database::ReceiptStoreError;
use crate::http_server::api::client::{ApiError, ApiRequest};
use crate::http_server::handlers::message_response;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct GetReceiptRequest {
    /// Identifier returned by the upload
    #[arg(long)]
    pub receipt_id: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path(receipt_id): Path<String>,
) -> Result<impl IntoResponse, GetReceiptError> {
    // anything that is not a receipt id cannot name a stored record
    let Ok(id) = receipt_id.parse::<ReceiptId>() else {
        return Err(GetReceiptError::NotFound(receipt_id));
    };

    let receipt = state
        .receipts()
        .get(&id)
        .await?
        .ok_or(GetReceiptError::NotFound(receipt_id))?;

    Ok((StatusCode::OK, Json(receipt)))
}

#[derive(Debug, thiserror::Error)]
pub enum GetReceiptError {
    #[error("Receipt not found: {0}")]
    NotFound(String),
    #[error("Receipt store error: {0}")]
    ReceiptStore(#[from] ReceiptStoreError),
}

impl IntoResponse for GetReceiptError {
    fn into_response(self) -> Response {
        match self {
            GetReceiptError::NotFound(_) => message_response(StatusCode::NOT_FOUND, "Not found"),
            GetReceiptError::ReceiptStore(e) => {
                tracing::error!("failed to load receipt: {}", e);
                message_response(StatusCode::INTERNAL_SERVER_ERROR, "unexpected error")
            }
        }
    }
}

impl ApiRequest for GetReceiptRequest {
    type Response = Receipt;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join(&format!("/receipts/{}", self.receipt_id))?;
        Ok(client.get(full_url))
    }
}
