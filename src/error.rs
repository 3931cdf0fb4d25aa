//! Unified error handling for the activity-detector library.
//!
//! This module provides a consistent error type for all analysis operations,
//! so that configuration problems, malformed inputs and missing data are
//! reported the same way everywhere.

use std::fmt;

use chrono::NaiveDate;

/// Unified error type for activity analysis operations.
#[derive(Debug, Clone)]
pub enum AnalysisError {
    /// The configuration document has no entry for an activity type
    MissingActivityConfig { activity_type: String },
    /// The configuration document is malformed or fails validation
    InvalidConfig { message: String },
    /// The known-location registry is malformed
    RegistryError { message: String },
    /// A named place required by an analyzer is absent from the registry
    MissingLocation {
        name: String,
        activity_type: String,
    },
    /// Input points are not in ascending timestamp order
    UnorderedPoints { index: usize },
    /// A day was analyzed with no location data at all.
    /// Distinguishes "upstream retrieval produced nothing" from
    /// "data present but no activities detected" (an empty result).
    NoLocationData { date: NaiveDate },
    /// Generic internal error
    Internal { message: String },
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::MissingActivityConfig { activity_type } => {
                write!(
                    f,
                    "No configuration entry for activity type '{}'",
                    activity_type
                )
            }
            AnalysisError::InvalidConfig { message } => {
                write!(f, "Configuration error: {}", message)
            }
            AnalysisError::RegistryError { message } => {
                write!(f, "Known-location registry error: {}", message)
            }
            AnalysisError::MissingLocation {
                name,
                activity_type,
            } => {
                write!(
                    f,
                    "Known location '{}' required by '{}' analyzer is not registered",
                    name, activity_type
                )
            }
            AnalysisError::UnorderedPoints { index } => {
                write!(
                    f,
                    "Location points are not time-ordered (regression at index {})",
                    index
                )
            }
            AnalysisError::NoLocationData { date } => {
                write!(f, "No location data available for {}", date)
            }
            AnalysisError::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for AnalysisError {}

/// Result type alias for activity analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

impl AnalysisError {
    /// Shorthand for an [`AnalysisError::InvalidConfig`].
    pub fn invalid_config(message: impl Into<String>) -> Self {
        AnalysisError::InvalidConfig {
            message: message.into(),
        }
    }

    /// Shorthand for an [`AnalysisError::RegistryError`].
    pub fn registry(message: impl Into<String>) -> Self {
        AnalysisError::RegistryError {
            message: message.into(),
        }
    }
}
