//! Envelope response helpers

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;

use crate::core::SuccessEnvelope;
use crate::stages::{BufferSink, ResponseSink, ResponseValidationStage};

pub fn ok(data: Value) -> Response {
    (StatusCode::OK, Json(SuccessEnvelope::new(data))).into_response()
}

pub fn created(data: Value) -> Response {
    (StatusCode::CREATED, Json(SuccessEnvelope::new(data))).into_response()
}

pub fn ok_with_message(data: Value, message: impl Into<String>) -> Response {
    (
        StatusCode::OK,
        Json(SuccessEnvelope::with_message(data, message)),
    )
        .into_response()
}

/// Envelope the data and run it through response screening before it goes
/// out. A violating payload comes back replaced; the status code is kept
/// either way.
pub fn screened(
    stage: &ResponseValidationStage,
    endpoint: &str,
    status: StatusCode,
    data: Value,
) -> Response {
    let mut guard = stage.guard(BufferSink::new(), endpoint);
    guard.emit(SuccessEnvelope::new(data).to_value());
    let payload = guard
        .into_inner()
        .into_payload()
        .unwrap_or(Value::Null);
    (status, Json(payload)).into_response()
}
