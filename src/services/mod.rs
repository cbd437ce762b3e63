//! Services for retrieval, caching and aggregation

pub mod aggregator;
pub mod cache;
pub mod paginator;
pub mod report;

pub use aggregator::Aggregator;
pub use cache::{CacheGateway, CacheStore, FileStore, MemoryStore};
pub use paginator::Paginator;
pub use report::{FallbackLimits, ReportQuery, ReportService};
