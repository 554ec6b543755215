use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Source '{source_name}' failed: {message}")]
    Source {
        source_name: String,
        message: String,
    },

    #[error("Record rejected: {message}")]
    Normalization { message: String },

    #[error("Write failed: {message}")]
    Write { message: String },

    #[error("Document store error: {message}")]
    Store { message: String },

    #[error("API request failed: {0}")]
    Api(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Pipeline stage aborted: {0}")]
    Stage(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Source,
    Data,
    Storage,
    Configuration,
    Pipeline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Affects one record or one write; the run carries on.
    Low,
    /// Affects one source; the run carries on without it.
    Medium,
    /// The run cannot start.
    High,
    /// The store is unusable.
    Critical,
}

impl EtlError {
    pub fn source_failed(source_name: impl Into<String>, message: impl ToString) -> Self {
        EtlError::Source {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    pub fn normalization(message: impl Into<String>) -> Self {
        EtlError::Normalization {
            message: message.into(),
        }
    }

    pub fn write(message: impl Into<String>) -> Self {
        EtlError::Write {
            message: message.into(),
        }
    }

    pub fn store(message: impl ToString) -> Self {
        EtlError::Store {
            message: message.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::Source { .. } | EtlError::Api(_) | EtlError::Csv(_) => ErrorCategory::Source,
            EtlError::Normalization { .. } | EtlError::Serialization(_) => ErrorCategory::Data,
            EtlError::Write { .. } | EtlError::Store { .. } | EtlError::Io(_) => {
                ErrorCategory::Storage
            }
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::Stage(_) => ErrorCategory::Pipeline,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EtlError::Normalization { .. } | EtlError::Write { .. } => ErrorSeverity::Low,
            EtlError::Source { .. } | EtlError::Api(_) | EtlError::Csv(_) => ErrorSeverity::Medium,
            EtlError::Store { .. } | EtlError::Io(_) | EtlError::Serialization(_) => {
                ErrorSeverity::Critical
            }
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::Stage(_) => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Source => {
                "Check the source endpoint or file; other sources are still loaded"
            }
            ErrorCategory::Data => "Fix the offending record at its source; it was skipped",
            ErrorCategory::Storage => "Check that the store path is writable and not corrupted",
            ErrorCategory::Configuration => "Review the configuration file and command-line flags",
            ErrorCategory::Pipeline => "Re-run with --verbose to see which stage aborted",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Source => format!("A data source could not be read: {}", self),
            ErrorCategory::Data => format!("A record was skipped: {}", self),
            ErrorCategory::Storage => format!("The document store reported a problem: {}", self),
            ErrorCategory::Configuration => format!("The configuration is invalid: {}", self),
            ErrorCategory::Pipeline => format!("The run stopped before loading: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
