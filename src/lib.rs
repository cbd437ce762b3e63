//! Transaction retrieval, caching and daily financial summaries for the
//! VisioFex payment API.

pub mod cli;
pub mod client;
pub mod config;
pub mod services;
pub mod types;
