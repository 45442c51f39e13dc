use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("Store error {status}: {body}")]
    Store { status: u16, body: String },

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Request URLs carry the database auth token, so they never reach error text.
impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Http(e.without_url())
    }
}

impl AppError {
    /// Text shown next to the control whose write failed.
    pub fn user_message(&self, action: &str) -> String {
        match self {
            AppError::Conflict(msg) | AppError::BadRequest(msg) => msg.clone(),
            AppError::NotFound => format!("The record was removed before {} finished.", action),
            _ => format!("Something went wrong while {}.", action),
        }
    }
}
