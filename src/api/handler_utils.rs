use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::operations::errors::{ErrorKind, FieldErrors};
use crate::processing::ProcessImageResponse;

pub type ApiObject<T> = (StatusCode, Json<T>);

pub fn process_image_reply(response: ProcessImageResponse) -> ApiObject<Value> {
    let status = if response.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, into_json(response))
}

pub fn malformed_request(message: impl Into<String>) -> ApiObject<Value> {
    let mut errors = FieldErrors::default();
    errors.add_global(ErrorKind::Validation, message);
    process_image_reply(ProcessImageResponse::rejected(errors))
}

pub fn task_failure(detail: impl Into<String>) -> ApiObject<Value> {
    let detail = detail.into();
    error!(detail = %detail, "processing task failed");
    let mut errors = FieldErrors::default();
    errors.add_global(
        ErrorKind::Processing,
        format!("General image processing failed: {detail}."),
    );
    process_image_reply(ProcessImageResponse::rejected(errors))
}

pub fn into_json(payload: impl Serialize) -> Json<Value> {
    Json(serde_json::to_value(payload).expect("api payload should serialize"))
}
