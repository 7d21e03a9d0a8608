use thiserror::Error;

pub use anyhow::Context;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("login failed with error code {code}")]
    Authentication { code: i32 },
    #[error("row {row}: field `{field}` has unparseable value `{value}`")]
    Extraction {
        row: usize,
        field: &'static str,
        value: String,
    },
    #[error("login did not complete before the timeout")]
    LoginTimeout,
    #[error("no completion received for request `{tag}` before the timeout")]
    Timeout { tag: String },
    #[error("request `{tag}` is still outstanding")]
    Busy { tag: String },
    #[error("invalid session state: {0}")]
    InvalidState(String),
    #[error("broker error: {0}")]
    Broker(String),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn message<T: Into<String>>(msg: T) -> Self {
        AppError::Message(msg.into())
    }

    /// Only a failed login stops the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Authentication { .. } | AppError::LoginTimeout
        )
    }
}
