//! HTTP response builders
//!
//! Success helpers pick the status code; failure helpers build the
//! translated error envelope described in [`crate::error`].
//!
//! ```rust,ignore
//! use api_commons::prelude::*;
//!
//! async fn create_user(Json(dto): Json<NewUser>) -> Created<User> {
//!     let user = store.insert(dto);
//!     Created::new(user).with_location("/users/1")
//! }
//!
//! async fn delete_user() -> NoContent {
//!     NoContent
//! }
//! ```

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::constants::{BAD_REQUEST_400, JSON_MIME, UNAUTHORIZED_401};
use crate::error::ErrorResponse;
use crate::i18n::{keys, Localizer};
use crate::outcome::Failure;

/// HTTP 201 Created response
///
/// Optionally includes a `Location` header pointing to the new resource.
#[derive(Debug)]
pub struct Created<T> {
    data: T,
    location: Option<String>,
}

impl<T> Created<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            location: None,
        }
    }

    /// Add a Location header pointing to the created resource
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        let mut response = (StatusCode::CREATED, Json(&self.data)).into_response();

        if let Some(location) = self.location {
            if let Ok(header_value) = HeaderValue::from_str(&location) {
                response.headers_mut().insert(header::LOCATION, header_value);
            }
        }

        response
    }
}

/// HTTP 204 No Content response
#[derive(Debug, Clone, Copy)]
pub struct NoContent;

impl IntoResponse for NoContent {
    fn into_response(self) -> Response {
        StatusCode::NO_CONTENT.into_response()
    }
}

/// 200 with a JSON body
pub fn ok<T: Serialize>(body: T) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}

/// JSON body when present, otherwise an empty body that still claims JSON
pub fn json_or_empty<T: Serialize>(status: StatusCode, body: Option<T>) -> Response {
    match body {
        Some(body) => (status, Json(body)).into_response(),
        None => (
            status,
            [(header::CONTENT_TYPE, HeaderValue::from_static(JSON_MIME))],
        )
            .into_response(),
    }
}

/// 400 envelope under `BAD_REQUEST_400`
///
/// `key` is translated; unknown keys are sent as given.
pub fn bad_request(localizer: &Localizer, key: Option<&str>) -> Response {
    let message = localizer.translate(key.unwrap_or(keys::BAD_REQUEST));
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::single(BAD_REQUEST_400, message)),
    )
        .into_response()
}

/// 401 envelope under `UNAUTHORIZED_401`
pub fn bad_credentials(localizer: &Localizer, key: Option<&str>) -> Response {
    let message = localizer.translate(key.unwrap_or(keys::BAD_CREDENTIALS));
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::single(UNAUTHORIZED_401, message)),
    )
        .into_response()
}

/// Envelope for a failed outcome
///
/// An authentication failure answers 401; anything else, including a
/// missing failure, answers 400.
pub fn failure_with(failure: Option<&Failure>, localizer: &Localizer) -> Response {
    match failure {
        Some(failure) if failure.is_unauthorized() => bad_credentials(localizer, None),
        _ => bad_request(localizer, None),
    }
}
