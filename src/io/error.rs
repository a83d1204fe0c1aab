//! Error types and context management for synthesis operations

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for all synthesis operations
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// A configuration value failed validation before optimization started
    #[error("Invalid configuration '{parameter}' = '{value}': {reason}")]
    InvalidConfiguration {
        /// Name of the invalid parameter
        parameter: &'static str,
        /// Provided value that failed validation
        value: String,
        /// Explanation of why the value is invalid
        reason: String,
    },

    /// Velocity profile could not be generated from the requested parameters
    #[error("Invalid velocity profile '{profile}': {reason}")]
    InvalidProfile {
        /// Requested profile type
        profile: String,
        /// Description of what's wrong with the request
        reason: String,
    },

    /// Constraints that cannot be active at the same time were requested
    ///
    /// Raised while the constraint set is built, before any level runs.
    #[error("Conflicting constraints: {reason}")]
    ConflictingConstraints {
        /// Which constraints collide
        reason: String,
    },

    /// Motion does not have the channel layout the run was configured for
    #[error("Channel layout mismatch: expected {expected}, found {found}")]
    LayoutMismatch {
        /// Layout the run expects
        expected: String,
        /// Layout that was supplied
        found: String,
    },

    /// Motion file content could not be interpreted
    #[error("Invalid motion file '{}': {reason}", .path.display())]
    MotionFormat {
        /// Path to the motion file
        path: PathBuf,
        /// Description of the format problem
        reason: String,
    },

    /// General file system operation failure
    #[error("File system error during {operation} on '{}': {source}", .path.display())]
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Numerical computation produced invalid result
    #[error("Computation error in {operation}: {reason}")]
    Computation {
        /// Name of the computation that failed
        operation: &'static str,
        /// Description of the failure
        reason: String,
    },
}

/// Convenience type alias for synthesis results
pub type Result<T> = std::result::Result<T, SynthesisError>;

/// Additional context to enrich error messages
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// File the failing operation touched
    pub path: Option<PathBuf>,
    /// Operation being performed
    pub operation: Option<&'static str>,
}

/// Enriches error messages with file and operation information
pub trait WithContext<T> {
    /// Add error context to a Result
    ///
    /// # Errors
    ///
    /// Propagates the original error with additional context applied
    fn with_context(self, context: ErrorContext) -> Result<T>;

    /// Add the path of the file being processed
    ///
    /// # Errors
    ///
    /// Propagates the original error with the path applied
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T, E> WithContext<T> for std::result::Result<T, E>
where
    E: Into<SynthesisError>,
{
    fn with_context(self, context: ErrorContext) -> Result<T> {
        self.map_err(|e| {
            let mut error = e.into();
            // Only file-bound errors carry a path worth replacing
            match &mut error {
                SynthesisError::FileSystem {
                    path, operation, ..
                } => {
                    if let Some(p) = &context.path {
                        path.clone_from(p);
                    }
                    if let Some(op) = context.operation {
                        *operation = op;
                    }
                }
                SynthesisError::MotionFormat { path, .. } => {
                    if let Some(p) = &context.path {
                        path.clone_from(p);
                    }
                }
                _ => {}
            }
            error
        })
    }

    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.with_context(ErrorContext {
            path: Some(path.into()),
            ..Default::default()
        })
    }
}

impl From<std::io::Error> for SynthesisError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("<unknown>"),
            operation: "unknown",
            source: err,
        }
    }
}

impl From<serde_json::Error> for SynthesisError {
    fn from(err: serde_json::Error) -> Self {
        Self::MotionFormat {
            path: PathBuf::from("<unknown>"),
            reason: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for SynthesisError {
    fn from(err: toml::de::Error) -> Self {
        Self::InvalidConfiguration {
            parameter: "config",
            value: String::from("<toml>"),
            reason: err.to_string(),
        }
    }
}

/// Create an invalid configuration error
pub fn invalid_parameter(
    parameter: &'static str,
    value: &impl ToString,
    reason: &impl ToString,
) -> SynthesisError {
    SynthesisError::InvalidConfiguration {
        parameter,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Create a computation error
pub fn computation_error(operation: &'static str, reason: &impl ToString) -> SynthesisError {
    SynthesisError::Computation {
        operation,
        reason: reason.to_string(),
    }
}
