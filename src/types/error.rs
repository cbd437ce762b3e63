use thiserror::Error;

/// Errors raised along the retrieval, caching and reporting pipeline
#[derive(Error, Debug)]
pub enum VxfError {
    #[error("No API key configured. Set VXF_API_KEY or pass --api-key.")]
    MissingCredential,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body} (URL: {url})")]
    Http {
        status: u16,
        body: String,
        url: String,
    },

    #[error("Unexpected response: {0}")]
    Parse(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Daily report failed ({aggregate}); transaction fallback failed: {fallback}")]
    ReportFailed {
        aggregate: Box<VxfError>,
        fallback: Box<VxfError>,
    },
}

pub type Result<T> = std::result::Result<T, VxfError>;
