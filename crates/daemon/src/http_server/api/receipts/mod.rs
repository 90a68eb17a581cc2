use axum::routing::{get, post};
use axum::Router;

use crate::ServiceState;

pub mod get;
pub mod upload;

// Re-export for convenience
pub use get::GetReceiptRequest;
pub use upload::{UploadRequest, UploadResponse};

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/upload", post(upload::handler))
        .route("/:receipt_id", get(get::handler))
        .with_state(state)
}
