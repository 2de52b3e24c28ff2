//! Pagination descriptor
//!
//! A [`Pageable`] travels from the query string to the data layer and back
//! to the client: it carries the requested page, page size, ordering and
//! filters, and on the way out the total count and the rows of the page.
//!
//! Values are normalised on every write:
//!
//! - a page number `<= 0` becomes `0`
//! - a page size `<= 0` becomes the default page size
//! - blank `orderBy`, `filter` and `objectFilter` values become absent
//!
//! Page `0` and page `1` both start at offset `0`; from page 1 on the offset
//! is `(page - 1) * size`.
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use api_commons::pageable::Pageable;
//!
//! let params = HashMap::from([
//!     ("pageNumber".to_string(), "3".to_string()),
//!     ("pageSize".to_string(), "15".to_string()),
//!     ("orderBy".to_string(), "  ".to_string()),
//! ]);
//!
//! let pageable: Pageable = Pageable::from_query_map(&params).unwrap();
//! assert_eq!(pageable.offset(), 30);
//! assert_eq!(pageable.order_by(), None);
//! ```

mod extract;
mod query;

pub use query::{
    calculate_offset, get_page, like_pattern, paginate, PageSource, PageWindow, VecSource,
};

use std::collections::BTreeMap;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Page size used when none (or a non-positive one) is given
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Query-string and JSON field names
pub mod fields {
    pub const PAGE_NUMBER: &str = "pageNumber";
    pub const PAGE_SIZE: &str = "pageSize";
    pub const ORDER_BY: &str = "orderBy";
    pub const FILTER: &str = "filter";
    pub const OBJECT_FILTER: &str = "objectFilter";
    pub const TOTAL_SIZE: &str = "totalSize";
    pub const RESULT: &str = "result";
}

/// Pagination request and page of results
///
/// `T` is the row type of [`result`](Self::result); it defaults to raw JSON
/// so a descriptor can be built before the row type is known.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pageable<T = Value> {
    page_number: u32,
    page_size: u32,
    total_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    object_filter: Option<String>,
    result: Vec<T>,
    #[serde(skip)]
    default_page_size: u32,
}

/// Compares what a descriptor serialises; the fallback page size is ignored
impl<T: PartialEq> PartialEq for Pageable<T> {
    fn eq(&self, other: &Self) -> bool {
        self.page_number == other.page_number
            && self.page_size == other.page_size
            && self.total_size == other.total_size
            && self.order_by == other.order_by
            && self.filter == other.filter
            && self.object_filter == other.object_filter
            && self.result == other.result
    }
}

impl<T> Default for Pageable<T> {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE as i64)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn clamp_page_number(page_number: i64) -> u32 {
    if page_number <= 0 {
        0
    } else {
        u32::try_from(page_number).unwrap_or(u32::MAX)
    }
}

fn clamp_page_size(page_size: i64, default: u32) -> u32 {
    if page_size <= 0 {
        default
    } else {
        u32::try_from(page_size).unwrap_or(u32::MAX)
    }
}

impl<T> Pageable<T> {
    /// Descriptor for one page, normalising both values
    pub fn new(page_number: i64, page_size: i64) -> Self {
        Self::with_default_page_size(page_number, page_size, DEFAULT_PAGE_SIZE)
    }

    /// Like [`new`](Self::new) with a custom fallback for non-positive sizes
    pub fn with_default_page_size(page_number: i64, page_size: i64, default_page_size: u32) -> Self {
        let default_page_size = default_page_size.max(1);
        Self {
            page_number: clamp_page_number(page_number),
            page_size: clamp_page_size(page_size, default_page_size),
            total_size: 0,
            order_by: None,
            filter: None,
            object_filter: None,
            result: Vec::new(),
            default_page_size,
        }
    }

    /// Build from query parameters using [`DEFAULT_PAGE_SIZE`]
    ///
    /// A missing `pageNumber` means page 1 and a missing `pageSize` means
    /// the default size. A value that is not an integer is rejected with
    /// [`Error::BadRequest`].
    pub fn from_query_map<'a, I>(params: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        Self::from_query_map_with(params, DEFAULT_PAGE_SIZE)
    }

    /// Build from query parameters with a custom default page size
    pub fn from_query_map_with<'a, I>(params: I, default_page_size: u32) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut page_number = 1;
        let mut page_size = None;
        let mut order_by = None;
        let mut filter = None;
        let mut object_filter = None;

        for (key, value) in params {
            match key.as_str() {
                fields::PAGE_NUMBER if !value.trim().is_empty() => {
                    page_number = parse_integer(key, value)?;
                }
                fields::PAGE_SIZE if !value.trim().is_empty() => {
                    page_size = Some(parse_integer(key, value)?);
                }
                fields::ORDER_BY => order_by = Some(value.clone()),
                fields::FILTER => filter = Some(value.clone()),
                fields::OBJECT_FILTER => object_filter = Some(value.clone()),
                _ => {}
            }
        }

        let page_size = page_size.unwrap_or(i64::from(default_page_size));
        Ok(Self::with_default_page_size(page_number, page_size, default_page_size)
            .with_order_by(order_by)
            .with_filter(filter)
            .with_object_filter(object_filter))
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn order_by(&self) -> Option<&str> {
        self.order_by.as_deref()
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn object_filter(&self) -> Option<&str> {
        self.object_filter.as_deref()
    }

    pub fn result(&self) -> &[T] {
        &self.result
    }

    pub fn into_result(self) -> Vec<T> {
        self.result
    }

    /// Number of rows to skip before this page
    pub fn offset(&self) -> u64 {
        if self.page_number == 0 {
            0
        } else {
            u64::from(self.page_number - 1) * u64::from(self.page_size)
        }
    }

    pub fn set_page_number(&mut self, page_number: i64) {
        self.page_number = clamp_page_number(page_number);
    }

    pub fn set_page_size(&mut self, page_size: i64) {
        self.page_size = clamp_page_size(page_size, self.default_page_size);
    }

    pub fn set_order_by(&mut self, order_by: Option<String>) {
        self.order_by = non_blank(order_by);
    }

    pub fn set_filter(&mut self, filter: Option<String>) {
        self.filter = non_blank(filter);
    }

    pub fn set_object_filter(&mut self, object_filter: Option<String>) {
        self.object_filter = non_blank(object_filter);
    }

    pub fn set_total_size(&mut self, total_size: u64) {
        self.total_size = total_size;
    }

    #[must_use]
    pub fn with_page_number(mut self, page_number: i64) -> Self {
        self.set_page_number(page_number);
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: i64) -> Self {
        self.set_page_size(page_size);
        self
    }

    #[must_use]
    pub fn with_order_by(mut self, order_by: Option<String>) -> Self {
        self.set_order_by(order_by);
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.set_filter(filter);
        self
    }

    #[must_use]
    pub fn with_object_filter(mut self, object_filter: Option<String>) -> Self {
        self.set_object_filter(object_filter);
        self
    }

    #[must_use]
    pub fn with_total_size(mut self, total_size: u64) -> Self {
        self.total_size = total_size;
        self
    }

    /// Same request, carrying `rows` as its result
    pub fn with_result<U>(self, rows: Vec<U>) -> Pageable<U> {
        Pageable {
            page_number: self.page_number,
            page_size: self.page_size,
            total_size: self.total_size,
            order_by: self.order_by,
            filter: self.filter,
            object_filter: self.object_filter,
            result: rows,
            default_page_size: self.default_page_size,
        }
    }

    /// Convert every row of the result
    pub fn map_result<U, F>(mut self, f: F) -> Pageable<U>
    where
        F: FnMut(T) -> U,
    {
        let rows = std::mem::take(&mut self.result)
            .into_iter()
            .map(f)
            .collect();
        self.with_result(rows)
    }

    /// Decode `objectFilter` as JSON into `F`
    ///
    /// Returns `None` when there is no object filter or it does not decode.
    pub fn get_object_filter<F>(&self) -> Option<F>
    where
        F: DeserializeOwned,
    {
        let raw = self.object_filter.as_deref()?;
        match serde_json::from_str(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(error = %e, object_filter = raw, "ignoring malformed objectFilter");
                None
            }
        }
    }

    /// Scalar fields (strings, numbers, booleans) of the decoded object filter
    pub fn get_object_filter_map(&self) -> Option<Map<String, Value>> {
        let mut object = self.get_object_filter::<Map<String, Value>>()?;
        object.retain(|_, value| matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_)));
        Some(object)
    }

    /// Query parameters that reproduce this request
    ///
    /// `pageNumber` and `pageSize` are always present; the optional fields
    /// only when set. The total size and the result are not included.
    pub fn to_query_map(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert(fields::PAGE_NUMBER.to_string(), self.page_number.to_string());
        params.insert(fields::PAGE_SIZE.to_string(), self.page_size.to_string());

        let optional = [
            (fields::ORDER_BY, &self.order_by),
            (fields::FILTER, &self.filter),
            (fields::OBJECT_FILTER, &self.object_filter),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                params.insert(key.to_string(), value.clone());
            }
        }
        params
    }
}

fn parse_integer(key: &str, value: &str) -> Result<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| Error::BadRequest(format!("{} must be an integer, got '{}'", key, value)))
}
