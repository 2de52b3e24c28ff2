//! Running a [`Pageable`] against a data source

use std::future::Future;

use super::Pageable;
use crate::error::{Error, Result};

/// Rows requested from a [`PageSource`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageWindow {
    /// Maximum number of rows, `None` for no limit
    pub limit: Option<u32>,
    /// Rows to skip
    pub offset: u64,
    pub order_by: Option<String>,
    pub filter: Option<String>,
}

/// A queryable collection that can count and slice its rows
///
/// Implemented by repositories; [`paginate`] drives it from a request.
pub trait PageSource<T>: Send + Sync {
    /// Total number of rows matching the source's query
    fn count(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Rows inside `window`
    fn fetch(&self, window: PageWindow) -> impl Future<Output = Result<Vec<T>>> + Send;
}

/// Fill `pageable` with the total count and the requested page
///
/// A failing count is logged and reported as a total of `0`. A failing
/// fetch is returned to the caller.
pub async fn paginate<T, P, S>(source: &S, pageable: Pageable<P>) -> Result<Pageable<T>>
where
    S: PageSource<T>,
{
    let total_size = match source.count().await {
        Ok(total) => total,
        Err(e) => {
            tracing::warn!(error = %e, "count failed, reporting total size 0");
            0
        }
    };

    let page_size = pageable.page_size();
    let window = PageWindow {
        limit: (page_size > 0).then_some(page_size),
        offset: if page_size > 0 { pageable.offset() } else { 0 },
        order_by: pageable.order_by().map(str::to_string),
        filter: pageable.filter().map(str::to_string),
    };

    tracing::debug!(
        limit = ?window.limit,
        offset = window.offset,
        order_by = ?window.order_by,
        "fetching page"
    );

    let rows = source.fetch(window).await?;
    Ok(pageable.with_total_size(total_size).with_result(rows))
}

/// In-memory [`PageSource`] over a vector
///
/// Ordering and filters are ignored; rows come back in insertion order.
#[derive(Debug, Clone, Default)]
pub struct VecSource<T> {
    rows: Vec<T>,
}

impl<T> VecSource<T> {
    pub fn new(rows: Vec<T>) -> Self {
        Self { rows }
    }
}

impl<T> From<Vec<T>> for VecSource<T> {
    fn from(rows: Vec<T>) -> Self {
        Self::new(rows)
    }
}

impl<T> PageSource<T> for VecSource<T>
where
    T: Clone + Send + Sync,
{
    async fn count(&self) -> Result<u64> {
        Ok(self.rows.len() as u64)
    }

    async fn fetch(&self, window: PageWindow) -> Result<Vec<T>> {
        let offset = usize::try_from(window.offset).unwrap_or(usize::MAX);
        let limit = window.limit.map_or(usize::MAX, |l| l as usize);
        Ok(self.rows.iter().skip(offset).take(limit).cloned().collect())
    }
}

/// Offset of a 1-based page; pages `<= 0` start at `0`
pub fn calculate_offset(page_number: i64, page_size: i64) -> u64 {
    if page_number <= 0 || page_size <= 0 {
        return 0;
    }
    (page_number as u64 - 1).saturating_mul(page_size as u64)
}

/// SQL `LIKE` pattern matching `value` anywhere; blank matches everything
pub fn like_pattern(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => format!("%{}%", v),
        _ => "%%".to_string(),
    }
}

/// Slice one page out of an in-memory list
///
/// `page_number` is 0-based here. A page past the end is empty.
pub fn get_page<T>(list: &[T], page_number: i64, page_size: i64) -> Result<&[T]> {
    if page_number < 0 || page_size <= 0 {
        return Err(Error::BadRequest(format!(
            "invalid page size: {} || invalid page number: {}, parameter must be pageSize > 0 || pageNumber >= 0",
            page_size, page_number
        )));
    }

    let from = usize::try_from(page_number.saturating_mul(page_size)).unwrap_or(usize::MAX);
    if from >= list.len() {
        return Ok(&[]);
    }
    let to = from.saturating_add(page_size as usize).min(list.len());
    Ok(&list[from..to])
}
