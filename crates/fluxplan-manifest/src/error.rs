//! Error types for manifest handling

use thiserror::Error;

/// Result type for manifest operations
pub type Result<T> = std::result::Result<T, ManifestError>;

/// Errors raised while reading a manifest stream
///
/// Problems inside individual documents are never errors; those documents
/// are skipped during classification.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ManifestError {
    /// The byte stream is not valid UTF-8
    #[error("manifest is not valid UTF-8 (first invalid byte at offset {offset})")]
    InvalidEncoding { offset: usize },
}

impl From<std::str::Utf8Error> for ManifestError {
    fn from(e: std::str::Utf8Error) -> Self {
        ManifestError::InvalidEncoding {
            offset: e.valid_up_to(),
        }
    }
}
