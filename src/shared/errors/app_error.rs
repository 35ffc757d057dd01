use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    ConflictError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Credential error: {0}")]
    CredentialError(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::TransportError("Request timeout".to_string())
        } else if err.is_connect() {
            AppError::TransportError("Failed to connect to external service".to_string())
        } else if let Some(status) = err.status() {
            match status.as_u16() {
                404 => AppError::NotFound("External resource not found".to_string()),
                401 | 403 => {
                    AppError::CredentialError("Not authorized against external service".to_string())
                }
                _ => AppError::TransportError(format!("HTTP {}: {}", status, err)),
            }
        } else {
            AppError::TransportError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::ValidationError(format!("Invalid UUID: {}", err))
    }
}

// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_carries_retry_after() {
        let err = AppError::RateLimited {
            retry_after: Duration::from_millis(750),
        };
        match err {
            AppError::RateLimited { retry_after } => {
                assert_eq!(retry_after, Duration::from_millis(750))
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn serde_errors_map_to_serialization() {
        let bad: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: AppError = bad.unwrap_err().into();
        assert!(matches!(err, AppError::SerializationError(_)));
    }
}
