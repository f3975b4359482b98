//! Error types shared by the fetch, cache and comment layers.
//!
//! Almost nothing in the pipeline is fatal: callers log these errors and
//! degrade to "no data". The CLI boundary still uses `Box<dyn Error>`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NewsError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("malformed feed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("not a feed: {0}")]
    NotAFeed(&'static str),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("comment rejected locally: {0}")]
    InvalidComment(String),

    #[error("comment service did not accept the submission")]
    Rejected,
}

pub type Result<T> = std::result::Result<T, NewsError>;
