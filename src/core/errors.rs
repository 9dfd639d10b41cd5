//! Error types for the twinscan-rs library.
//!
//! Local, per-unit failures (one file failing to parse, one comparison
//! failing) are absorbed and counted by the component that owns them; only
//! configuration-level violations abort the operation that requested them.

use std::str::Utf8Error;

use thiserror::Error;

/// Main result type for twinscan operations.
pub type Result<T> = std::result::Result<T, TwinscanError>;

/// Error type for all twinscan operations.
#[derive(Error, Debug)]
pub enum TwinscanError {
    /// Validation errors for input data and parameters
    #[error("Validation error: {message}")]
    Validation {
        /// Error description
        message: String,
        /// Field or input that failed validation
        field: Option<String>,
        /// Expected value or format
        expected: Option<String>,
        /// Actual value received
        actual: Option<String>,
    },

    /// Parsing and language processing errors
    #[error("Parse error in {language}: {message}")]
    Parse {
        /// Programming language being parsed
        language: String,
        /// Error description
        message: String,
        /// File path where error occurred
        file_path: Option<String>,
        /// Line number (if available)
        line: Option<usize>,
    },

    /// A single pairwise comparison failed
    #[error("Comparison error: {message}")]
    Comparison {
        /// Error description
        message: String,
        /// Identities of the two functions being compared
        pair: Option<String>,
    },

    /// Aggregate failure of a scheduler run
    #[error("Scheduler error: {failed} of {total} comparisons failed: {message}")]
    Scheduler {
        /// Error description (first observed failure)
        message: String,
        /// Number of failed comparisons
        failed: usize,
        /// Number of comparisons in the run
        total: usize,
        /// Matches collected despite the failures
        partial_matches: usize,
    },

    /// Weight calibration errors
    #[error("Calibration error: {message}")]
    Calibration {
        /// Error description
        message: String,
    },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal {
        /// Error description
        message: String,
        /// Additional context
        context: Option<String>,
    },

    /// Unsupported operation or feature
    #[error("Unsupported: {message}")]
    Unsupported {
        /// Error description
        message: String,
    },
}

impl TwinscanError {
    /// Create a new validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
            expected: None,
            actual: None,
        }
    }

    /// Create a new validation error describing the offending field
    pub fn validation_field(
        message: impl Into<String>,
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
            expected: Some(expected.into()),
            actual: Some(actual.into()),
        }
    }

    /// Create a new parse error
    pub fn parse(language: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            language: language.into(),
            message: message.into(),
            file_path: None,
            line: None,
        }
    }

    /// Create a new parse error with file context
    pub fn parse_with_location(
        language: impl Into<String>,
        message: impl Into<String>,
        file_path: impl Into<String>,
        line: Option<usize>,
    ) -> Self {
        Self::Parse {
            language: language.into(),
            message: message.into(),
            file_path: Some(file_path.into()),
            line,
        }
    }

    /// Create a new comparison error
    pub fn comparison(message: impl Into<String>) -> Self {
        Self::Comparison {
            message: message.into(),
            pair: None,
        }
    }

    /// Create a new calibration error
    pub fn calibration(message: impl Into<String>) -> Self {
        Self::Calibration {
            message: message.into(),
        }
    }

    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            context: None,
        }
    }

    /// Create a new unsupported error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    /// Add context to an existing error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        match &mut self {
            Self::Internal { context: ctx, .. } => {
                *ctx = Some(context.into());
            }
            Self::Comparison { pair, .. } => {
                *pair = Some(context.into());
            }
            _ => {}
        }
        self
    }

    /// Whether this error rejects a configuration before any work starts
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

impl From<Utf8Error> for TwinscanError {
    fn from(err: Utf8Error) -> Self {
        Self::parse("unknown", format!("UTF-8 encoding error: {err}"))
    }
}

impl From<serde_json::Error> for TwinscanError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("JSON serialization failed: {err}"))
    }
}
