use thiserror::Error;
use serde::Serialize;

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum AppError {
    #[error("I/O Error: {0}")]
    Io(String),

    #[error("Network Error: {0}")]
    Network(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Parse Error: {0}")]
    Parse(String),

    #[error("Validation Error: {0}")]
    Validation(String),

    #[error("Config Error: {0}")]
    Config(String),

    #[error("Unknown Error: {0}")]
    Unknown(String),
}

// Implement conversion from standard errors
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout(err.to_string())
        } else {
            AppError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Parse(format!("Serialization error: {}", err))
    }
}

impl From<regex::Error> for AppError {
    fn from(err: regex::Error) -> Self {
        AppError::Config(format!("Invalid pattern: {}", err))
    }
}

impl From<tokio::time::error::Elapsed> for AppError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        AppError::Timeout(err.to_string())
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        AppError::Unknown(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
