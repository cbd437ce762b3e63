//! Groups transactions into per-day financial buckets

use std::collections::BTreeMap;

use crate::types::{DailyBucket, Transaction};

pub struct Aggregator;

impl Aggregator {
    /// Fold transactions into one bucket per date, most recent date first.
    /// Transactions without `createdAt` are skipped.
    pub fn daily<'a, I>(transactions: I) -> Vec<DailyBucket>
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        let mut days: BTreeMap<&'a str, DailyBucket> = BTreeMap::new();

        for tx in transactions {
            let Some(date) = tx.date_key() else {
                continue;
            };
            days.entry(date)
                .or_insert_with(|| DailyBucket::new(date))
                .add(tx);
        }

        days.into_values().rev().collect()
    }

    /// Keep transactions whose date key falls within `[start, end]`
    /// (inclusive, compared as "YYYY-MM-DD" strings)
    pub fn within<'a>(
        transactions: &'a [Transaction],
        start: &str,
        end: &str,
    ) -> Vec<&'a Transaction> {
        transactions
            .iter()
            .filter(|tx| {
                tx.date_key()
                    .is_some_and(|date| date >= start && date <= end)
            })
            .collect()
    }

    /// Sum of all buckets
    pub fn total(buckets: &[DailyBucket]) -> DailyBucket {
        buckets.iter().fold(DailyBucket::new("Total"), |mut acc, b| {
            acc.count += b.count;
            acc.gross += b.gross;
            acc.platform_fee += b.platform_fee;
            acc.net_profit += b.net_profit;
            acc
        })
    }
}
