//! Bounded pagination over `transactions/list`

use serde_json::Value;
use std::time::Duration;

use crate::client::ApiClient;
use crate::services::cache::{keys, CacheGateway};
use crate::types::{PaginationResult, Result, Transaction, VxfError};

/// Page size used by the report fallback
pub const DEFAULT_PAGE_SIZE: u32 = 250;
/// Page ceiling used by the report fallback (at most 5000 transactions)
pub const DEFAULT_MAX_PAGES: u32 = 20;

/// Drives repeated list-endpoint calls through the cache
pub struct Paginator<'a> {
    client: &'a ApiClient,
    cache: &'a CacheGateway,
    ttl: Duration,
}

impl<'a> Paginator<'a> {
    pub fn new(client: &'a ApiClient, cache: &'a CacheGateway, ttl: Duration) -> Self {
        Self { client, cache, ttl }
    }

    /// Fetch one page of transactions (cached per page and limit)
    pub fn fetch_page(&self, page: u32, limit: u32, force: bool) -> Result<Vec<Transaction>> {
        let raw: Value = self
            .cache
            .get_or_compute(&keys::page(page, limit), self.ttl, force, || {
                let (page, limit) = (page.to_string(), limit.to_string());
                let raw = self.client.get_with_query(
                    "transactions/list",
                    &[("page", page.as_str()), ("limit", limit.as_str())],
                )?;
                if !raw.is_object() {
                    return Err(VxfError::Parse(format!(
                        "transaction list is not a JSON object: {}",
                        truncate(&raw.to_string(), 200)
                    )));
                }
                Ok(raw)
            })?;
        parse_page(&raw)
    }

    /// Fetch pages until the data runs out or `max_pages` is reached.
    ///
    /// A failing page ends the run: pages before it are returned as a
    /// partial result and the failing page contributes nothing. A failure
    /// on the first page has no earlier pages to fall back on, so it is
    /// returned as an error instead of an empty result.
    pub fn fetch_all(&self, page_size: u32, max_pages: u32, force: bool) -> Result<PaginationResult> {
        self.cache.get_or_compute(
            &keys::all_transactions(page_size, max_pages),
            self.ttl,
            force,
            || self.paginate(page_size, max_pages, force),
        )
    }

    fn paginate(&self, page_size: u32, max_pages: u32, force: bool) -> Result<PaginationResult> {
        tracing::info!(page_size, max_pages, "starting pagination fetch");

        let mut result = PaginationResult::default();
        let mut page = 1;

        while page <= max_pages {
            let transactions = match self.fetch_page(page, page_size, force) {
                Ok(t) => t,
                Err(e) if page == 1 => return Err(e),
                Err(e) => {
                    tracing::error!(page, error = %e, "error fetching page, keeping partial results");
                    break;
                }
            };

            let count = transactions.len();
            if count == 0 {
                break;
            }

            result.transactions.extend(transactions);
            result.total_fetched += count;
            result.pages_fetched = page;
            tracing::info!(page, count, total = result.total_fetched, "fetched page");

            if count < page_size as usize {
                break;
            }
            if page == max_pages {
                result.may_have_more = true;
                break;
            }
            page += 1;
        }

        tracing::info!(
            total = result.total_fetched,
            pages = result.pages_fetched,
            may_have_more = result.may_have_more,
            "pagination complete"
        );
        Ok(result)
    }
}

/// Extract `data.transactions` from a list response.
/// A response without that field is an empty page.
fn parse_page(raw: &Value) -> Result<Vec<Transaction>> {
    match raw.pointer("/data/transactions") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(list) => serde_json::from_value(list.clone())
            .map_err(|e| VxfError::Parse(format!("invalid transaction list: {}", e))),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
