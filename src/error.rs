//! Error taxonomy for representation conversion
//!
//! Conversion failures fall in two groups:
//! - pre-flight errors, returned synchronously from `can_handle`, `resolve` and
//!   `handle` before any stream is touched
//! - stream errors, delivered as the terminal item of an output stream once the
//!   consumer reads far enough to hit the offending data
//!
//! The transport layer maps both groups to client-facing statuses through
//! [`ConversionError::category`] and [`ConversionError::is_client_error`].

use std::io;
use thiserror::Error;

/// Result type for conversion operations
pub type ConversionResult<T> = Result<T, ConversionError>;

/// Errors raised while negotiating or converting a representation
#[derive(Debug, Error)]
pub enum ConversionError {
    /// A converter was asked to handle a type it does not declare
    #[error("content type '{content_type}' is not supported: {reason}")]
    NotSupported { content_type: String, reason: String },

    /// No converter or two-hop chain bridges the source type to the preferences
    #[error("no conversion path from '{from}' to any of [{preferences}]")]
    NoConversionPath { from: String, preferences: String },

    /// The body does not conform to the grammar of its declared content type
    #[error("failed to parse '{content_type}' data: {message}")]
    Parse {
        content_type: String,
        message: String,
    },

    /// Quads could not be written in the negotiated syntax
    #[error("failed to serialize quads as '{content_type}': {message}")]
    Serialization {
        content_type: String,
        message: String,
    },

    /// A media type or Accept header value is malformed
    #[error("invalid media type '{value}': {reason}")]
    InvalidMediaType { value: String, reason: String },

    /// The representation carries the other kind of data than the converter consumes
    #[error("expected {expected} representation data")]
    UnexpectedData { expected: &'static str },

    /// The resource store holds nothing under the identifier
    #[error("resource '{path}' not found")]
    NotFound { path: String },

    /// Worker failure or I/O fault not attributable to the body
    #[error("internal conversion failure: {message}")]
    Internal { message: String },
}

impl ConversionError {
    pub fn not_supported(content_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotSupported {
            content_type: content_type.into(),
            reason: reason.into(),
        }
    }

    pub fn parse(content_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            content_type: content_type.into(),
            message: message.into(),
        }
    }

    pub fn serialization(content_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Serialization {
            content_type: content_type.into(),
            message: message.into(),
        }
    }

    pub fn invalid_media_type(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidMediaType {
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Recover an error that crossed a `std::io` boundary.
    ///
    /// Errors that were wrapped by `From<ConversionError> for io::Error` come
    /// back unmodified; any other I/O failure becomes [`ConversionError::Internal`].
    pub fn from_io(error: io::Error) -> Self {
        if error
            .get_ref()
            .is_some_and(|inner| inner.is::<ConversionError>())
        {
            if let Some(inner) = error.into_inner() {
                if let Ok(original) = inner.downcast::<ConversionError>() {
                    return *original;
                }
            }
            return Self::internal("wrapped conversion error lost in transit");
        }
        Self::internal(error.to_string())
    }

    /// Stable classification used for metrics labels and status mapping
    pub fn category(&self) -> &'static str {
        match self {
            ConversionError::NotSupported { .. } => "not_supported",
            ConversionError::NoConversionPath { .. } => "no_conversion_path",
            ConversionError::Parse { .. } => "parse_error",
            ConversionError::Serialization { .. } => "serialization_error",
            ConversionError::InvalidMediaType { .. } => "invalid_media_type",
            ConversionError::UnexpectedData { .. } => "unexpected_data",
            ConversionError::NotFound { .. } => "not_found",
            ConversionError::Internal { .. } => "internal_error",
        }
    }

    /// Whether the failure is attributable to what the client sent or asked for.
    ///
    /// A parse failure on a stored body is still reported as client-caused here;
    /// callers converting content they produced themselves should treat it as internal.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ConversionError::NotSupported { .. }
                | ConversionError::NoConversionPath { .. }
                | ConversionError::Parse { .. }
                | ConversionError::InvalidMediaType { .. }
                | ConversionError::NotFound { .. }
        )
    }

    /// Conversions are deterministic; malformed input stays malformed.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Whether this error can only appear as the terminal item of a stream
    pub fn is_stream_error(&self) -> bool {
        matches!(
            self,
            ConversionError::Parse { .. } | ConversionError::Serialization { .. }
        )
    }
}

impl From<ConversionError> for io::Error {
    fn from(error: ConversionError) -> Self {
        io::Error::other(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_io_round_trip_keeps_original_error() {
        let original = ConversionError::parse("text/turtle", "unexpected end of file");
        let io_error: io::Error = original.into();
        let recovered = ConversionError::from_io(io_error);
        assert_matches!(
            recovered,
            ConversionError::Parse { content_type, .. } if content_type == "text/turtle"
        );
    }

    #[test]
    fn test_foreign_io_error_becomes_internal() {
        let io_error = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed");
        assert_matches!(
            ConversionError::from_io(io_error),
            ConversionError::Internal { .. }
        );
    }

    #[test]
    fn test_classification() {
        let parse = ConversionError::parse("text/turtle", "bad");
        assert!(parse.is_client_error());
        assert!(parse.is_stream_error());
        assert!(!parse.is_retryable());
        assert_eq!(parse.category(), "parse_error");

        let serialization = ConversionError::serialization("text/turtle", "bad");
        assert!(!serialization.is_client_error());
        assert_eq!(serialization.category(), "serialization_error");

        let internal = ConversionError::internal("worker panicked");
        assert!(!internal.is_client_error());
        assert!(!internal.is_stream_error());
    }
}
