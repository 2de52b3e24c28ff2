//! Axum extractor for [`Pageable`]

use std::collections::HashMap;

use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
    response::Response,
};

use super::{Pageable, DEFAULT_PAGE_SIZE};
use crate::config::PaginationConfig;
use crate::error::Error;
use crate::i18n::Localizer;
use crate::responses::bad_request;

/// Reads the pagination fields from the query string
///
/// The default page size comes from a [`PaginationConfig`] request
/// extension when the server installed one, otherwise
/// [`DEFAULT_PAGE_SIZE`]. A malformed query is answered with the
/// `BAD_REQUEST_400` envelope in the request's locale.
impl<S, T> FromRequestParts<S> for Pageable<T>
where
    S: Send + Sync,
    T: Send,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let default_page_size = parts
            .extensions
            .get::<PaginationConfig>()
            .map_or(DEFAULT_PAGE_SIZE, |config| config.default_page_size);

        Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map_err(|e| Error::BadRequest(e.body_text()))
            .and_then(|Query(params)| Pageable::from_query_map_with(&params, default_page_size))
            .map_err(|e| {
                tracing::debug!(error = %e, "rejected pagination query");
                bad_request(&Localizer::from_parts(parts), None)
            })
    }
}
