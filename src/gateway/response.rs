//! JSON response envelope shared by every gateway endpoint.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Top-level outcome marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Success,
    Failure,
}

/// One problem with a named request input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub name: String,
    pub message: String,
}

impl FieldError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// `{"status": "Success", "data": ...}` or `{"status": "Failure", "errors": [...]}`.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseModel<T> {
    pub status: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl<T: Serialize> ResponseModel<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: Outcome::Success,
            data: Some(data),
            errors: Vec::new(),
        }
    }
}

impl ResponseModel<()> {
    pub fn failure(errors: Vec<FieldError>) -> Self {
        Self {
            status: Outcome::Failure,
            data: None,
            errors,
        }
    }
}

/// Build a failure response with the given status.
pub fn failure(status: StatusCode, errors: Vec<FieldError>) -> Response {
    (status, Json(ResponseModel::failure(errors))).into_response()
}
