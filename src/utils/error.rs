use thiserror::Error;

#[derive(Error, Debug)]
pub enum HeatmapError {
    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Upstream returned status {status}")]
    UpstreamStatusError { status: u16 },

    #[error("Malformed upstream response: {message}")]
    MalformedResponseError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field}: {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Listing not found: {id}")]
    NotFound { id: String },

    #[error("Request cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Upstream,
    Configuration,
    NotFound,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl HeatmapError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            HeatmapError::ApiError(_)
            | HeatmapError::UpstreamStatusError { .. }
            | HeatmapError::MalformedResponseError { .. }
            | HeatmapError::Cancelled => ErrorCategory::Upstream,
            HeatmapError::ConfigError { .. }
            | HeatmapError::InvalidConfigValueError { .. }
            | HeatmapError::MissingConfigError { .. } => ErrorCategory::Configuration,
            HeatmapError::NotFound { .. } => ErrorCategory::NotFound,
            HeatmapError::IoError(_) | HeatmapError::SerializationError(_) => {
                ErrorCategory::System
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::NotFound => ErrorSeverity::Low,
            ErrorCategory::Upstream => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            HeatmapError::ApiError(e) if e.is_timeout() => {
                "The service is slow to respond; it will be retried on the next poll"
            }
            HeatmapError::ApiError(_) => "Check that the server is running and reachable",
            HeatmapError::UpstreamStatusError { .. } => "Inspect the upstream service logs",
            HeatmapError::MalformedResponseError { .. } => {
                "Make sure the upstream service returns a {\"cells\": [...]} body"
            }
            HeatmapError::ConfigError { .. }
            | HeatmapError::InvalidConfigValueError { .. }
            | HeatmapError::MissingConfigError { .. } => {
                "Fix the configuration file or command-line flags"
            }
            HeatmapError::NotFound { .. } => "Refresh the listings; it may have been removed",
            HeatmapError::Cancelled => "No action needed",
            HeatmapError::IoError(_) => "Check file paths and permissions",
            HeatmapError::SerializationError(_) => "Check the JSON input for syntax errors",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            HeatmapError::ApiError(e) if e.is_timeout() => "Request timed out".to_string(),
            HeatmapError::ApiError(e) if e.is_connect() => {
                "Could not connect to the server".to_string()
            }
            HeatmapError::NotFound { .. } => "Not found".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HeatmapError>;
