use thiserror::Error;

#[derive(Debug, Error)]
pub enum JarvisError {
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Failed to send HTTP request: {0}")]
    HttpError(String),

    #[error("Provider API error: {0}")]
    ProviderError(String),

    #[error("Failed to parse provider response: {0}")]
    ParseError(String),

    #[error("Memory storage error: {0}")]
    MemoryError(String),
}

impl From<reqwest::Error> for JarvisError {
    fn from(error: reqwest::Error) -> Self {
        JarvisError::HttpError(error.to_string())
    }
}

impl From<sqlx::Error> for JarvisError {
    fn from(error: sqlx::Error) -> Self {
        JarvisError::MemoryError(error.to_string())
    }
}

impl From<serde_json::Error> for JarvisError {
    fn from(error: serde_json::Error) -> Self {
        JarvisError::ParseError(error.to_string())
    }
}

impl From<anyhow::Error> for JarvisError {
    fn from(error: anyhow::Error) -> Self {
        JarvisError::ProviderError(error.to_string())
    }
}
