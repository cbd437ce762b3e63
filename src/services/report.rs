//! Report orchestration: aggregate endpoint first, paginated fallback second

use chrono::{Duration as ChronoDuration, Local, NaiveDate};
use serde_json::Value;
use std::time::Duration;

use crate::client::ApiClient;
use crate::services::cache::{keys, CacheGateway};
use crate::services::paginator::Paginator;
use crate::services::Aggregator;
use crate::types::{AggregateOutcome, AggregateTotals, Report, ReportSource, Result, VxfError};

/// Row label for aggregate totals in recent mode
pub const RECENT_LABEL: &str = "Recent Days";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Which dates a report covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportQuery {
    /// Explicit inclusive range
    Range { start: NaiveDate, end: NaiveDate },
    /// Yesterday and today; the aggregate endpoint rejects `start == end`
    Recent,
}

impl ReportQuery {
    /// Concrete `(start, end)` for a given "today"
    pub fn bounds(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match *self {
            ReportQuery::Range { start, end } => (start, end),
            ReportQuery::Recent => (today - ChronoDuration::days(1), today),
        }
    }

    /// Label of the single row built from aggregate totals
    fn aggregate_label(&self, start: &str) -> String {
        match self {
            ReportQuery::Range { .. } => start.to_string(),
            ReportQuery::Recent => RECENT_LABEL.to_string(),
        }
    }
}

/// Page size and ceiling for the transaction fallback
#[derive(Debug, Clone, Copy)]
pub struct FallbackLimits {
    pub page_size: u32,
    pub max_pages: u32,
}

impl Default for FallbackLimits {
    fn default() -> Self {
        Self {
            page_size: super::paginator::DEFAULT_PAGE_SIZE,
            max_pages: super::paginator::DEFAULT_MAX_PAGES,
        }
    }
}

/// Builds date-bucketed reports from the remote API
pub struct ReportService {
    client: ApiClient,
    cache: CacheGateway,
    ttl: Duration,
    limits: FallbackLimits,
}

impl ReportService {
    pub fn new(client: ApiClient, cache: CacheGateway, ttl: Duration, limits: FallbackLimits) -> Self {
        Self {
            client,
            cache,
            ttl,
            limits,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn paginator(&self) -> Paginator<'_> {
        Paginator::new(&self.client, &self.cache, self.ttl)
    }

    /// Build a report using the local date as "today"
    pub fn get_report(&self, query: ReportQuery, force: bool) -> Result<Report> {
        self.get_report_on(query, Local::now().date_naive(), force)
    }

    /// Build a report for `query` relative to `today`
    pub fn get_report_on(&self, query: ReportQuery, today: NaiveDate, force: bool) -> Result<Report> {
        let (start, end) = query.bounds(today);
        let start = start.format(DATE_FORMAT).to_string();
        let end = end.format(DATE_FORMAT).to_string();

        match self.fetch_daily_aggregate(&start, &end, force) {
            AggregateOutcome::Success(totals) => Ok(Report {
                rows: vec![totals.into_bucket(query.aggregate_label(&start))],
                source: ReportSource::Aggregate,
            }),
            AggregateOutcome::Empty => Ok(Report {
                rows: Vec::new(),
                source: ReportSource::Aggregate,
            }),
            AggregateOutcome::Failure(aggregate_err) => {
                tracing::warn!(
                    error = %aggregate_err,
                    "daily report endpoint failed, falling back to transaction list"
                );
                self.report_from_transactions(&start, &end, force)
                    .map_err(|fallback_err| VxfError::ReportFailed {
                        aggregate: Box::new(aggregate_err),
                        fallback: Box::new(fallback_err),
                    })
            }
        }
    }

    /// Query the aggregate endpoint for `[start, end]` through the cache
    pub fn fetch_daily_aggregate(&self, start: &str, end: &str, force: bool) -> AggregateOutcome {
        let raw: Result<Value> =
            self.cache
                .get_or_compute(&keys::daily(start, end), self.ttl, force, || {
                    let raw = self.client.get_with_query(
                        "accounting/vendor/report/daily",
                        &[("startDate", start), ("endDate", end)],
                    )?;
                    if !raw.is_object() {
                        return Err(VxfError::Parse(
                            "daily report response is not a JSON object".into(),
                        ));
                    }
                    Ok(raw)
                });

        let raw = match raw {
            Ok(v) => v,
            Err(e) => return AggregateOutcome::Failure(e),
        };

        match raw.get("data") {
            None | Some(Value::Null) => AggregateOutcome::Empty,
            Some(Value::Object(map)) if map.is_empty() => AggregateOutcome::Empty,
            Some(Value::Array(list)) if list.is_empty() => AggregateOutcome::Empty,
            Some(Value::Bool(false)) => AggregateOutcome::Empty,
            Some(Value::String(s)) if s.is_empty() || s == "0" => AggregateOutcome::Empty,
            Some(data) => match serde_json::from_value::<AggregateTotals>(data.clone()) {
                Ok(totals) => AggregateOutcome::Success(totals),
                Err(e) => AggregateOutcome::Failure(VxfError::Parse(format!(
                    "unexpected daily report payload: {}",
                    e
                ))),
            },
        }
    }

    /// Clear cached responses whose key starts with `prefix` ("" for all)
    pub fn purge(&self, prefix: &str) -> Result<usize> {
        self.cache.purge(prefix)
    }

    fn report_from_transactions(&self, start: &str, end: &str, force: bool) -> Result<Report> {
        let pages = self
            .paginator()
            .fetch_all(self.limits.page_size, self.limits.max_pages, force)?;

        let in_range = Aggregator::within(&pages.transactions, start, end);
        tracing::info!(
            fetched = pages.total_fetched,
            in_range = in_range.len(),
            start,
            end,
            "building daily summary from transactions"
        );

        Ok(Report {
            rows: Aggregator::daily(in_range),
            source: ReportSource::Transactions {
                total_fetched: pages.total_fetched,
                pages_fetched: pages.pages_fetched,
                may_have_more: pages.may_have_more,
            },
        })
    }
}
