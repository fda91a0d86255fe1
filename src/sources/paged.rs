//! Drains an unbounded result set from a page-capped query endpoint.

use std::future::Future;

use anyhow::Result;
use tracing::debug;

use super::Page;

/// Rows requested per page. Matches the upstream response-size cap.
pub const PAGE_SIZE: usize = 1000;

/// Repeatedly requests pages at increasing offsets until a page comes back
/// with fewer rows than [`PAGE_SIZE`] (including zero), concatenating the
/// batches in order.
///
/// A full page is the only continuation signal; the `total` hint on a page
/// is ignored. The first page error aborts the drain and surfaces the
/// underlying error, never a partial result.
pub async fn drain_pages<T, F, Fut>(mut next_page: F) -> Result<Vec<T>>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut all = Vec::new();
    let mut offset = 0;
    let mut pages = 0u32;

    loop {
        let page = next_page(offset, PAGE_SIZE).await?;
        let count = page.rows.len();
        all.extend(page.rows);
        pages += 1;

        if count < PAGE_SIZE {
            break;
        }
        offset += count;
    }

    debug!(pages, rows = all.len(), "drained paginated source");
    Ok(all)
}
