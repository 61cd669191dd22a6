use thiserror::Error;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    /// Whether this error should stop the process instead of just the current symbol.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::Config("missing weight 'rsi'".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing weight 'rsi'");

        let err = AppError::InvalidInput("price is NaN".to_string());
        assert_eq!(err.to_string(), "Invalid input: price is NaN");
    }

    #[test]
    fn test_only_config_errors_are_fatal() {
        assert!(AppError::Config("x".into()).is_fatal());
        assert!(!AppError::InvalidInput("x".into()).is_fatal());
        assert!(!AppError::Sink("x".into()).is_fatal());
        assert!(!AppError::Internal("x".into()).is_fatal());
    }

    #[test]
    fn test_from_serde_json() {
        let err: AppError = serde_json::from_str::<serde_json::Value>("{bad")
            .unwrap_err()
            .into();
        assert!(matches!(err, AppError::SerdeJson(_)));
    }
}
