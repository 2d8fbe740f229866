//! Error types for Learn2Earn courses.
//!
//! This module defines the error hierarchy for configuration loading, course
//! files, navigation, reward claims and AI course generation.

use std::path::PathBuf;

use learn2earn_chain::ChainError;

/// A specialized `Result` type for course operations.
pub type Result<T> = std::result::Result<T, CourseError>;

/// Errors that can occur while loading or playing a course.
///
/// Variants include actionable suggestions where the learner or operator can
/// fix the problem.
#[derive(Debug, thiserror::Error)]
pub enum CourseError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your learn2earn.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // Course Loading Errors
    // ========================================================================
    /// Course file was not found.
    #[error("Course not found: '{path}'\n\nSuggestion: Check the 'coursesDir' field in learn2earn.json or the path you passed")]
    CourseNotFound {
        /// Path where the course was expected.
        path: PathBuf,
    },

    /// Course file exceeds the size limit.
    #[error("Course exceeds size limit (256KB): '{path}' is {size_kb}KB\n\nSuggestion: Split the course or move large examples out of the theory text")]
    CourseTooLarge {
        /// Path to the oversized course.
        path: PathBuf,
        /// Actual size in kilobytes.
        size_kb: u64,
    },

    /// Course file contains non-UTF-8 content.
    #[error("Course has invalid encoding: '{path}'\n\nSuggestion: Convert the file to UTF-8 encoding")]
    CourseEncodingError {
        /// Path to the course with encoding issues.
        path: PathBuf,
    },

    /// Course file is not valid course JSON.
    #[error("Invalid JSON in course '{path}': {message}\n\nSuggestion: Check the file against the course format (id, title, modules[])")]
    CourseParseError {
        /// Path to the course file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Course content breaks a course invariant.
    #[error("Invalid course '{course_id}': {message}")]
    InvalidCourse {
        /// Course identifier.
        course_id: String,
        /// What is wrong.
        message: String,
    },

    // ========================================================================
    // Catalog and Navigation Errors
    // ========================================================================
    /// No course with the given id exists.
    #[error("Unknown course: '{course_id}'\n\nSuggestion: Run 'learn2earn courses' to list available courses")]
    UnknownCourse {
        /// Requested course identifier.
        course_id: String,
    },

    /// Module index is outside the course.
    #[error("Module index {index} is out of range (course has {len} modules)")]
    ModuleIndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of modules in the course.
        len: usize,
    },

    /// Navigation past an incomplete module.
    #[error("Module {} is locked: complete module {} first", target + 1, first_incomplete + 1)]
    NavigationLocked {
        /// Requested index.
        target: usize,
        /// First module that still needs completing.
        first_incomplete: usize,
    },

    // ========================================================================
    // Reward Errors
    // ========================================================================
    /// Signing or sending the completion transaction failed.
    #[error("Reward claim failed for '{course_id}': {source}\n\nSuggestion: Check your wallet and try claiming again")]
    ClaimFailed {
        /// Course being claimed.
        course_id: String,
        /// Underlying ledger error.
        source: ChainError,
    },

    // ========================================================================
    // Generation Errors
    // ========================================================================
    /// Course generation service returned an error.
    #[error("Course generation error ({kind}): {message}\n\nSuggestion: {suggestion}")]
    GenerationError {
        /// The kind of failure.
        kind: GenerationErrorKind,
        /// Detailed error message.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    /// Generated course does not have the required shape.
    #[error("Generated course is invalid: {message}\n\nSuggestion: Try again or rephrase the topic")]
    InvalidGeneratedCourse {
        /// What is wrong.
        message: String,
    },

    // ========================================================================
    // General I/O Errors
    // ========================================================================
    /// General I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // State Machine Errors
    // ========================================================================
    /// Invalid state transition attempted.
    #[error("Invalid state transition: cannot go from {from} to {to}")]
    InvalidStateTransition {
        /// The current state.
        from: String,
        /// The attempted target state.
        to: String,
    },
}

/// Categories of course generation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationErrorKind {
    /// Missing or rejected API key.
    Authentication,
    /// Rate limit exceeded.
    RateLimit,
    /// Server error (5xx responses).
    Server,
    /// Network connectivity issues.
    Network,
    /// Response could not be read as a course.
    InvalidResponse,
    /// Other unclassified errors.
    Other,
}

impl std::fmt::Display for GenerationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::RateLimit => write!(f, "rate_limit"),
            Self::Server => write!(f, "server"),
            Self::Network => write!(f, "network"),
            Self::InvalidResponse => write!(f, "invalid_response"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl GenerationErrorKind {
    /// Returns a suggestion message for this error kind.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::Authentication => "Check that the generator API key environment variable is set and valid",
            Self::RateLimit => "Wait and retry, or reduce request frequency",
            Self::Server => "Retry later; the generation service may be experiencing issues",
            Self::Network => "Check your network connection",
            Self::InvalidResponse => "Retry; the model returned content that is not a course",
            Self::Other => "Check the generation service status page",
        }
    }

    /// Classifies an HTTP status code returned by the generation service.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Authentication,
            429 => Self::RateLimit,
            500..=599 => Self::Server,
            _ => Self::Other,
        }
    }
}

impl CourseError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `CourseNotFound` error.
    #[must_use]
    pub fn course_not_found(path: impl Into<PathBuf>) -> Self {
        Self::CourseNotFound { path: path.into() }
    }

    /// Creates a new `CourseTooLarge` error.
    #[must_use]
    pub fn course_too_large(path: impl Into<PathBuf>, size_kb: u64) -> Self {
        Self::CourseTooLarge {
            path: path.into(),
            size_kb,
        }
    }

    /// Creates a new `CourseEncodingError`.
    #[must_use]
    pub fn course_encoding(path: impl Into<PathBuf>) -> Self {
        Self::CourseEncodingError { path: path.into() }
    }

    /// Creates a new `CourseParseError`.
    #[must_use]
    pub fn course_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::CourseParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `InvalidCourse` error.
    #[must_use]
    pub fn invalid_course(course_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidCourse {
            course_id: course_id.into(),
            message: message.into(),
        }
    }

    /// Creates a new `UnknownCourse` error.
    #[must_use]
    pub fn unknown_course(course_id: impl Into<String>) -> Self {
        Self::UnknownCourse {
            course_id: course_id.into(),
        }
    }

    /// Creates a new `GenerationError` with automatic suggestion based on error kind.
    #[must_use]
    pub fn generation(kind: GenerationErrorKind, message: impl Into<String>) -> Self {
        let suggestion = kind.suggestion().to_string();
        Self::GenerationError {
            kind,
            message: message.into(),
            suggestion,
        }
    }

    /// Creates a new `InvalidGeneratedCourse` error.
    #[must_use]
    pub fn invalid_generated(message: impl Into<String>) -> Self {
        Self::InvalidGeneratedCourse {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidStateTransition` error.
    #[must_use]
    pub fn invalid_transition(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        Self::InvalidStateTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Returns `true` if this error is transient and may be retried.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::GenerationError {
                kind: GenerationErrorKind::RateLimit
                    | GenerationErrorKind::Server
                    | GenerationErrorKind::Network,
                ..
            } | Self::ClaimFailed { .. }
                | Self::InvalidGeneratedCourse { .. }
        )
    }

    /// Returns `true` if this error prevents the program from starting.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigParseError { .. }
                | Self::ConfigValidationError { .. }
                | Self::CourseNotFound { .. }
                | Self::CourseTooLarge { .. }
                | Self::CourseEncodingError { .. }
                | Self::CourseParseError { .. }
                | Self::InvalidCourse { .. }
                | Self::GenerationError {
                    kind: GenerationErrorKind::Authentication,
                    ..
                }
        )
    }
}
