//! Error types for frame persistence.

use std::io;

use thiserror::Error;
use vlasov_core::FieldError;

/// Errors that can occur while writing or reading frame files.
#[derive(Debug, Error)]
pub enum IoError {
    /// An I/O error occurred during read or write.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The file does not start with the expected `b"VLSV"` magic bytes.
    #[error("invalid magic bytes (expected b\"VLSV\")")]
    InvalidMagic,
    /// The format version is not supported by this build.
    #[error("unsupported format version {found}")]
    UnsupportedVersion {
        /// The version found in the file.
        found: u8,
    },
    /// The file holds a different kind of record than requested.
    #[error("expected a {expected} file, found kind tag {found}")]
    WrongKind {
        /// What the caller asked for.
        expected: &'static str,
        /// The kind tag found in the file.
        found: u8,
    },
    /// A record could not be decoded (truncated or corrupt data).
    #[error("malformed record: {detail}")]
    Malformed {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// A decoded shape or buffer is inconsistent.
    #[error(transparent)]
    Shape(#[from] FieldError),
    /// A series sample has a different width than the series header.
    #[error("series '{quantity}' has width {expected}, sample has {found} values")]
    WidthMismatch {
        /// Series name.
        quantity: String,
        /// Width recorded in the header.
        expected: u32,
        /// Values in the offending sample.
        found: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            IoError::UnsupportedVersion { found: 9 }.to_string(),
            "unsupported format version 9"
        );
        let err = IoError::WidthMismatch {
            quantity: "field_energy".into(),
            expected: 2,
            found: 3,
        };
        assert!(err.to_string().contains("field_energy"));
        let io: IoError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(io.to_string().contains("gone"));
    }
}
