//! Response builders.

use http::{StatusCode, header};
use serde::Serialize;

use crate::body::ApiBody;
use crate::error::ApiError;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const TEXT_CONTENT_TYPE: &str = "text/plain";
const NOT_FOUND_BODY: &str = "404 page not found";

/// `{"message": ...}` payload of every route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct Message {
    /// The message.
    pub message: String,
}

/// JSON response with the given status.
pub fn json<T: Serialize>(
    status: StatusCode,
    value: &T,
) -> Result<http::Response<ApiBody>, ApiError> {
    let body = serde_json::to_vec(value)?;
    Ok(http::Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, JSON_CONTENT_TYPE)
        .header(header::CONTENT_LENGTH, body.len())
        .body(ApiBody::from_bytes(body))
        .unwrap_or_else(|_| internal_error()))
}

/// Plain-text 404.
#[must_use]
pub fn not_found() -> http::Response<ApiBody> {
    text(StatusCode::NOT_FOUND, NOT_FOUND_BODY)
}

/// Redirect to `location`.
#[must_use]
pub fn redirect(status: StatusCode, location: &str) -> http::Response<ApiBody> {
    http::Response::builder()
        .status(status)
        .header(header::LOCATION, location)
        .body(ApiBody::empty())
        .unwrap_or_else(|_| internal_error())
}

/// Bare 500.
#[must_use]
pub fn internal_error() -> http::Response<ApiBody> {
    let mut response = http::Response::new(ApiBody::empty());
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

fn text(status: StatusCode, body: &'static str) -> http::Response<ApiBody> {
    http::Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)
        .header(header::CONTENT_LENGTH, body.len())
        .body(ApiBody::from_bytes(body))
        .unwrap_or_else(|_| internal_error())
}
