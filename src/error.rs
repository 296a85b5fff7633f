use thiserror::Error;

/// Errors raised by the blog service and its stores.
///
/// The content pipeline itself never fails on bad content; these are caller
/// errors (unknown slugs, invalid submissions) and infrastructure failures.
#[derive(Error, Debug)]
pub enum BlogError {
    /// Resource not found (post, comment)
    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    /// Submission rejected (missing fields, bad email, unknown parent)
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource already exists
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, BlogError>;
