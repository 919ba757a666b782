//! Error types for the Sea client.

use std::fmt;

use thiserror::Error;

/// The constraint a record field failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// The field was absent or null.
    Required,
    /// The field held a value of the wrong JSON type.
    Type { expected: &'static str },
    /// A string field's character count fell outside `min..=max`.
    Length { min: usize, max: usize },
    /// A string field did not match the pattern.
    Pattern { pattern: &'static str },
    /// A numeric field fell outside `min..=max`.
    Range { min: i64, max: i64 },
    /// A string field did not parse as a point in time.
    Date,
    /// A string field did not parse as an absolute URL.
    Url,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "is required"),
            Self::Type { expected } => write!(f, "must be {expected}"),
            Self::Length { min, max } => {
                write!(f, "must be between {min} and {max} characters")
            }
            Self::Pattern { pattern } => write!(f, "must match {pattern}"),
            Self::Range { min, max } => write!(f, "must be between {min} and {max}"),
            Self::Date => write!(f, "must be a valid date"),
            Self::Url => write!(f, "must be a valid URL"),
        }
    }
}

/// A domain record failed validation.
///
/// `field` is a dotted path from the record being constructed down to the
/// innermost offending field, e.g. `user.avatarFile.variants[0].url`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid field `{field}`: {constraint}")]
pub struct ValidationError {
    pub field: String,
    pub constraint: Constraint,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, constraint: Constraint) -> Self {
        Self {
            field: field.into(),
            constraint,
        }
    }

    /// Prefix the field path with the name of the enclosing field.
    pub(crate) fn nested(self, parent: &str) -> Self {
        let field = if self.field.is_empty() {
            parent.to_string()
        } else if self.field.starts_with('[') {
            format!("{parent}{}", self.field)
        } else {
            format!("{parent}.{}", self.field)
        };
        Self { field, ..self }
    }
}

/// Errors that can occur when talking to a Sea server.
#[derive(Debug, Error)]
pub enum SeaError {
    /// A response or outbound body failed domain validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A credential required by the operation is missing.
    #[error("configuration error: {0}")]
    Config(String),

    /// A caller-supplied parameter is out of bounds.
    #[error("{parameter} must be between {min} and {max}, got {value}")]
    Range {
        parameter: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// A stream frame was malformed or carried an error.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// HTTP request failed, including non-2xx statuses.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket transport failed.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A configured base URL could not be parsed or joined.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl SeaError {
    /// True for errors raised by this crate before any I/O took place.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Config(_) | Self::Range { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new("screenName", Constraint::Length { min: 1, max: 20 });
        assert_eq!(
            err.to_string(),
            "invalid field `screenName`: must be between 1 and 20 characters"
        );
    }

    #[test]
    fn test_nested_paths() {
        let err = ValidationError::new("url", Constraint::Url)
            .nested("[2]")
            .nested("variants")
            .nested("avatarFile")
            .nested("user");
        assert_eq!(err.field, "user.avatarFile.variants[2].url");
    }

    #[test]
    fn test_nested_empty_field() {
        let err = ValidationError::new("", Constraint::Type { expected: "an object" })
            .nested("application");
        assert_eq!(err.field, "application");
    }

    #[test]
    fn test_range_display() {
        let err = SeaError::Range {
            parameter: "count",
            value: 101,
            min: 1,
            max: 100,
        };
        assert_eq!(err.to_string(), "count must be between 1 and 100, got 101");
        assert!(err.is_precondition());
    }

    #[test]
    fn test_protocol_is_not_precondition() {
        assert!(!SeaError::Protocol("bad frame".to_string()).is_precondition());
    }
}
