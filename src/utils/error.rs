use thiserror::Error;

#[derive(Error, Debug)]
pub enum LucidlyError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Upstream service '{service}' returned {status}: {message}")]
    UpstreamError {
        service: String,
        status: u16,
        message: String,
    },

    #[error("Operation timed out: {message}")]
    TimeoutError { message: String },

    #[error("{message}")]
    Internal { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Data,
    Authentication,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl LucidlyError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn upstream(service: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::UpstreamError {
            service: service.into(),
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::HttpError(_) | Self::UpstreamError { .. } | Self::TimeoutError { .. } => {
                ErrorCategory::Network
            }
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::CsvError(_)
            | Self::SerializationError(_)
            | Self::ValidationError { .. }
            | Self::NotFound { .. } => ErrorCategory::Data,
            Self::Unauthorized { .. } => ErrorCategory::Authentication,
            Self::IoError(_) | Self::Internal { .. } => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotFound { .. } | Self::ValidationError { .. } => ErrorSeverity::Low,
            Self::HttpError(_) | Self::UpstreamError { .. } | Self::TimeoutError { .. } => {
                ErrorSeverity::Medium
            }
            Self::Unauthorized { .. }
            | Self::CsvError(_)
            | Self::SerializationError(_)
            | Self::Internal { .. } => ErrorSeverity::High,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check network connectivity and upstream service status, then retry",
            ErrorCategory::Configuration => "Review the configuration file, CLI flags and environment variables",
            ErrorCategory::Data => "Check the request payload and the identifiers being used",
            ErrorCategory::Authentication => "Sign in again to obtain a fresh access token",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::NotFound { message } => message.clone(),
            Self::ValidationError { message } => message.clone(),
            Self::Unauthorized { message } => message.clone(),
            Self::TimeoutError { message } => message.clone(),
            Self::Internal { message } => message.clone(),
            Self::MissingConfigError { field } => {
                format!("Missing required setting: {}", field)
            }
            Self::HttpError(_) => "Could not reach the remote service".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LucidlyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_and_severity() {
        let err = LucidlyError::not_found("Dream not found");
        assert_eq!(err.category(), ErrorCategory::Data);
        assert_eq!(err.severity(), ErrorSeverity::Low);

        let err = LucidlyError::upstream("huggingface", 503, "model loading");
        assert_eq!(err.category(), ErrorCategory::Network);

        let err = LucidlyError::MissingConfigError {
            field: "inference.api_key".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(
            err.user_friendly_message(),
            "Missing required setting: inference.api_key"
        );
    }

    #[test]
    fn test_user_friendly_message_passes_through_plain_messages() {
        let err = LucidlyError::validation("Summary is required");
        assert_eq!(err.user_friendly_message(), "Summary is required");
        assert_eq!(err.to_string(), "Validation error: Summary is required");
    }
}
