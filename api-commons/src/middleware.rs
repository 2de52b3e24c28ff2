//! Request tracking, response header and error localization middleware
//!
//! Request ids are UUIDv7, so they sort by creation time.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use http::{HeaderName, HeaderValue, Request};
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    sensitive_headers::SetSensitiveRequestHeadersLayer,
    set_header::SetResponseHeaderLayer,
};

use crate::constants::API_VERSION_HEADER;
use crate::error::ErrorReport;
use crate::i18n::{Locale, Translations};

/// Sensitive headers that should be masked in logs
pub const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "set-cookie",
    "x-api-key",
    "x-server-key",
];

/// Generates `x-request-id` values
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeUuidRequestId;

impl MakeRequestId for MakeUuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::now_v7().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Create a request ID layer
pub fn request_id_layer() -> SetRequestIdLayer<MakeUuidRequestId> {
    SetRequestIdLayer::x_request_id(MakeUuidRequestId)
}

/// Create a request ID propagation layer
pub fn request_id_propagation_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

/// Create a sensitive headers layer
pub fn sensitive_headers_layer() -> SetSensitiveRequestHeadersLayer {
    let headers = SENSITIVE_HEADERS
        .iter()
        .map(|h| HeaderName::from_static(*h))
        .collect::<Vec<_>>();

    SetSensitiveRequestHeadersLayer::new(headers)
}

/// `Server: <banner>` unless the handler set one
///
/// An invalid banner falls back to the crate name.
pub fn server_header_layer(banner: &str) -> SetResponseHeaderLayer<HeaderValue> {
    let value = HeaderValue::from_str(banner)
        .unwrap_or_else(|_| HeaderValue::from_static(crate::constants::SERVER_BANNER));
    SetResponseHeaderLayer::if_not_present(http::header::SERVER, value)
}

/// `Api-Version: <version>` on every response
pub fn api_version_layer(version: &str) -> SetResponseHeaderLayer<HeaderValue> {
    let value = HeaderValue::from_str(version).unwrap_or_else(|_| HeaderValue::from_static("unknown"));
    SetResponseHeaderLayer::overriding(HeaderName::from_static(API_VERSION_HEADER), value)
}

/// Render error envelopes with the application's tables and the request locale
///
/// Only responses carrying an [`ErrorReport`] are touched. Use with
/// `axum::middleware::from_fn_with_state`.
pub async fn localize_errors(
    State(translations): State<Arc<Translations>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let locale = Locale::from_headers(request.headers());
    let mut response = next.run(request).await;

    let Some(report) = response.extensions_mut().remove::<ErrorReport>() else {
        return response;
    };

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(http::header::CONTENT_LENGTH);
    (parts, Json(report.to_error_response(&translations, locale))).into_response()
}
