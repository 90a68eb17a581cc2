mod not_found;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

pub use not_found::not_found_handler;

/// `{"msg": ...}` body used for every error the API reports.
pub(crate) fn message_response(status: StatusCode, msg: impl Into<String>) -> Response {
    let body = serde_json::json!({ "msg": msg.into() });
    (status, Json(body)).into_response()
}
