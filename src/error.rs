//! Error types and handling for the `meteoprofiles` application

use thiserror::Error;

/// Stable error codes, one per error kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Config,
    Retrieval,
    RetrievalTimeout,
    Parse,
    Validation,
    NoData,
    UnknownStation,
    UnknownVariable,
    Model,
    Plot,
    Io,
}

impl ErrorCode {
    /// Short machine-readable identifier
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Config => "E_CONFIG",
            ErrorCode::Retrieval => "E_RETRIEVAL",
            ErrorCode::RetrievalTimeout => "E_RETRIEVAL_TIMEOUT",
            ErrorCode::Parse => "E_PARSE",
            ErrorCode::Validation => "E_VALIDATION",
            ErrorCode::NoData => "E_NO_DATA",
            ErrorCode::UnknownStation => "E_UNKNOWN_STATION",
            ErrorCode::UnknownVariable => "E_UNKNOWN_VARIABLE",
            ErrorCode::Model => "E_MODEL",
            ErrorCode::Plot => "E_PLOT",
            ErrorCode::Io => "E_IO",
        }
    }
}

/// Main error type for the `meteoprofiles` application
#[derive(Error, Debug)]
pub enum MeteoError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The retrieval command failed or exited with an error status
    #[error("Retrieval error: {message}")]
    Retrieval { message: String },

    /// The retrieval command did not finish in time and was killed
    #[error("Retrieval timed out after {seconds}s")]
    RetrievalTimeout { seconds: u64 },

    /// Malformed retrieval output
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// The source returned nothing usable
    #[error("No data: {message}")]
    NoData { message: String },

    #[error("Unknown station '{0}'")]
    UnknownStation(String),

    #[error("Unknown variable '{0}'")]
    UnknownVariable(String),

    /// Model file errors
    #[error("Model file error: {message}")]
    Model { message: String },

    /// Chart rendering errors
    #[error("Plot error: {message}")]
    Plot { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl MeteoError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new retrieval error
    pub fn retrieval<S: Into<String>>(message: S) -> Self {
        Self::Retrieval {
            message: message.into(),
        }
    }

    /// Create a new parse error for the given 1-based line
    pub fn parse<S: Into<String>>(line: usize, message: S) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn no_data<S: Into<String>>(message: S) -> Self {
        Self::NoData {
            message: message.into(),
        }
    }

    pub fn model<S: Into<String>>(message: S) -> Self {
        Self::Model {
            message: message.into(),
        }
    }

    pub fn plot<S: Into<String>>(message: S) -> Self {
        Self::Plot {
            message: message.into(),
        }
    }

    /// Error code for this error
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            MeteoError::Config { .. } => ErrorCode::Config,
            MeteoError::Retrieval { .. } => ErrorCode::Retrieval,
            MeteoError::RetrievalTimeout { .. } => ErrorCode::RetrievalTimeout,
            MeteoError::Parse { .. } => ErrorCode::Parse,
            MeteoError::Validation { .. } => ErrorCode::Validation,
            MeteoError::NoData { .. } => ErrorCode::NoData,
            MeteoError::UnknownStation(_) => ErrorCode::UnknownStation,
            MeteoError::UnknownVariable(_) => ErrorCode::UnknownVariable,
            MeteoError::Model { .. } => ErrorCode::Model,
            MeteoError::Plot { .. } => ErrorCode::Plot,
            MeteoError::Io { .. } => ErrorCode::Io,
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            MeteoError::Config { message } => {
                format!("Configuration error: {message}. Please check your config file.")
            }
            MeteoError::Retrieval { .. } => {
                "The data retrieval command failed. Please check that it is installed and reachable."
                    .to_string()
            }
            MeteoError::RetrievalTimeout { seconds } => {
                format!("The data retrieval command did not answer within {seconds} seconds.")
            }
            MeteoError::Parse { line, .. } => {
                format!("Unexpected retrieval output (line {line}).")
            }
            MeteoError::Validation { message } => format!("Invalid input: {message}"),
            MeteoError::NoData { message } => format!("No data available: {message}"),
            MeteoError::UnknownStation(name) => {
                format!("Unknown station '{name}'. Run `meteoprofiles stations` for the list.")
            }
            MeteoError::UnknownVariable(name) => format!("Unknown variable '{name}'."),
            MeteoError::Model { message } => format!("Could not read model file: {message}"),
            MeteoError::Plot { .. } => "Chart rendering failed.".to_string(),
            MeteoError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}
