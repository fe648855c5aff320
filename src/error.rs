use reqwest::StatusCode;
use thiserror::Error;

pub type ExportResult<T> = std::result::Result<T, ExportError>;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("destination file name `{0}` must end in `.vhd`")]
    InvalidDestination(String),

    #[error("SAS expiry must be a positive number of seconds")]
    InvalidExpiry,

    #[error("no authenticated Azure session (try `az login`): {0}")]
    Unauthenticated(#[source] azure_core::Error),

    #[error("{operation} returned {status}: {body}")]
    Management {
        operation: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("unexpected response from {operation}: {detail}")]
    MalformedResponse {
        operation: &'static str,
        detail: String,
    },

    #[error("blob copy did not complete: {0}")]
    CopyFailed(String),

    #[error(transparent)]
    Storage(#[from] azure_core::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
