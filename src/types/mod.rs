//! Core data types for transactions, daily buckets and reports

mod error;

pub use error::{Result, VxfError};

use serde::{Deserialize, Deserializer, Serialize};

/// A single transaction as returned by `transactions/list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default, deserialize_with = "de_opt_string")]
    pub id: Option<String>,
    /// ISO-8601-like timestamp, e.g. "2024-01-01T10:00:00Z"
    #[serde(rename = "createdAt", default, deserialize_with = "de_opt_string")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "de_amount")]
    pub amount: f64,
    #[serde(rename = "platformFee", default, deserialize_with = "de_amount")]
    pub platform_fee: f64,
    #[serde(rename = "netProfit", default, deserialize_with = "de_amount")]
    pub net_profit: f64,
}

impl Transaction {
    /// Calendar date key: the first 10 characters of `createdAt`.
    /// Returns `None` when the timestamp is missing or empty.
    pub fn date_key(&self) -> Option<&str> {
        let created = self.created_at.as_deref()?;
        if created.is_empty() {
            return None;
        }
        Some(match created.char_indices().nth(10) {
            Some((idx, _)) => &created[..idx],
            None => created,
        })
    }
}

/// Per-date accumulator of transaction counts and monetary sums
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBucket {
    /// Date key ("YYYY-MM-DD") or a display label for aggregate rows
    pub date: String,
    pub count: u64,
    pub gross: f64,
    #[serde(rename = "platformFee")]
    pub platform_fee: f64,
    #[serde(rename = "netProfit")]
    pub net_profit: f64,
}

impl DailyBucket {
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            count: 0,
            gross: 0.0,
            platform_fee: 0.0,
            net_profit: 0.0,
        }
    }

    /// Fold one transaction into this bucket
    pub fn add(&mut self, tx: &Transaction) {
        self.count += 1;
        self.gross += tx.amount;
        self.platform_fee += tx.platform_fee;
        self.net_profit += tx.net_profit;
    }
}

/// Outcome of a bounded pagination run over the list endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaginationResult {
    /// Transactions in page arrival order
    pub transactions: Vec<Transaction>,
    pub total_fetched: usize,
    pub pages_fetched: u32,
    /// True only when the page bound was hit while pages were still full
    pub may_have_more: bool,
}

/// Pre-summarized totals from `accounting/vendor/report/daily`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateTotals {
    #[serde(default, deserialize_with = "de_count")]
    pub total_transaction_count: u64,
    #[serde(default, deserialize_with = "de_amount")]
    pub total_daily_revenue: f64,
    #[serde(default, deserialize_with = "de_amount")]
    pub total_platform_fees: f64,
    #[serde(default, deserialize_with = "de_amount")]
    pub net_profit: f64,
}

impl AggregateTotals {
    /// Present the totals as a single report row under `label`
    pub fn into_bucket(self, label: impl Into<String>) -> DailyBucket {
        DailyBucket {
            date: label.into(),
            count: self.total_transaction_count,
            gross: self.total_daily_revenue,
            platform_fee: self.total_platform_fees,
            net_profit: self.net_profit,
        }
    }
}

/// Result of asking the aggregate endpoint for a date range
#[derive(Debug)]
pub enum AggregateOutcome {
    /// Endpoint answered with totals
    Success(AggregateTotals),
    /// Endpoint answered successfully but carried no aggregate data
    Empty,
    /// Endpoint call failed; the report falls back to pagination
    Failure(VxfError),
}

/// Where the rows of a report came from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportSource {
    /// Served by the dedicated aggregate endpoint
    Aggregate,
    /// Built client-side from paginated transactions
    Transactions {
        total_fetched: usize,
        pages_fetched: u32,
        may_have_more: bool,
    },
}

/// Date-bucketed financial summary, most recent date first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub rows: Vec<DailyBucket>,
    pub source: ReportSource,
}

impl Report {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when the rows may be missing transactions past the page bound
    pub fn may_have_more(&self) -> bool {
        matches!(
            self.source,
            ReportSource::Transactions {
                may_have_more: true,
                ..
            }
        )
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Int(u64),
    Float(f64),
    Str(String),
    Null,
}

fn de_amount<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Int(n) => n as f64,
        NumberOrString::Float(f) => f,
        NumberOrString::Str(s) => s.trim().parse().unwrap_or(0.0),
        NumberOrString::Null => 0.0,
    })
}

fn de_count<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Int(n) => n,
        NumberOrString::Float(f) if f > 0.0 => f as u64,
        NumberOrString::Float(_) => 0,
        NumberOrString::Str(s) => s.trim().parse().unwrap_or(0),
        NumberOrString::Null => 0,
    })
}

fn de_opt_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Int(n) => Some(n.to_string()),
        NumberOrString::Float(f) => Some(f.to_string()),
        NumberOrString::Str(s) => Some(s),
        NumberOrString::Null => None,
    })
}
