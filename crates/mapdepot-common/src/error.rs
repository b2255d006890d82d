//! Error types for mapdepot
//!
//! Every failure an import run can hit maps onto one of these variants. There
//! is no retry anywhere in the pipeline: each error propagates to the top of
//! the run, which reports it and terminates.

use thiserror::Error;

/// Result type alias for mapdepot operations
pub type Result<T> = std::result::Result<T, ImportError>;

/// Error taxonomy for an import run
#[derive(Error, Debug)]
pub enum ImportError {
    /// Source file missing or unreadable; raised before storage is contacted
    #[error("Input file not found: '{0}'. Verify the path exists and you have read permissions.")]
    InputNotFound(String),

    /// Source file is not well-formed at the point the decoder failed
    #[error("Source file is not well-formed: {0}")]
    SourceFormat(String),

    /// A single record's required attribute could not be parsed
    #[error("Malformed {kind} record: {reason}")]
    MalformedRecord { kind: &'static str, reason: String },

    /// The storage sink cannot be reached during preparation or a flush
    #[error("Storage unavailable: {0}. Check the connection string and that the server is reachable.")]
    StorageUnavailable(String),

    /// A batch contained a document whose identity collides with a stored one
    #[error("Duplicate identity in collection '{collection}': {message}. The whole batch was rejected.")]
    DuplicateIdentity { collection: String, message: String },

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// An entity could not be converted to its destination document shape
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// File system operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ImportError {
    /// Create a malformed-record error
    pub fn malformed(kind: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            kind,
            reason: reason.into(),
        }
    }

    /// Create a source-format error
    pub fn source_format(msg: impl Into<String>) -> Self {
        Self::SourceFormat(msg.into())
    }

    /// Create a storage-unavailable error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageUnavailable(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a duplicate-identity error
    pub fn duplicate_identity(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DuplicateIdentity {
            collection: collection.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let err = ImportError::InputNotFound("region.xml".to_string());
        assert!(err.to_string().contains("region.xml"));

        let err = ImportError::malformed("node", "missing id attribute");
        assert!(err.to_string().contains("node"));
        assert!(err.to_string().contains("missing id attribute"));

        let err = ImportError::duplicate_identity("points", "E11000");
        assert!(err.to_string().contains("points"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ImportError = io.into();
        assert!(matches!(err, ImportError::Io(_)));
    }
}
