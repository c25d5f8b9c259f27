//! Error types for EntiDoc core.

use std::error::Error as StdError;

use thiserror::Error;

use crate::service::ValidateErrors;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Boxed underlying cause carried by some errors.
pub type BoxedCause = Box<dyn StdError + Send + Sync + 'static>;

/// Errors that can occur in EntiDoc core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Document store error.
    #[error("store error: {0}")]
    Store(#[from] entidoc_store::StoreError),

    /// Document codec error.
    #[error("codec error: {0}")]
    Codec(#[from] entidoc_codec::CodecError),

    /// A collection name could not be derived for an entity class.
    ///
    /// This is a configuration defect; it is raised on first use of the
    /// class and never retried.
    #[error("collection initialization failed: {message}")]
    CollectionInitialization {
        /// Description of the failure.
        message: String,
    },

    /// The requested operation is not supported on this value or type.
    #[error("unsupported operation: {message}")]
    UnsupportedOperation {
        /// Description of the operation.
        message: String,
        /// Underlying cause, if any.
        #[source]
        source: Option<BoxedCause>,
    },

    /// No codec is registered for a value type.
    #[error("Can't find a codec for {type_name}")]
    CodecConfiguration {
        /// The unresolved type.
        type_name: String,
    },

    /// An argument was rejected.
    #[error("illegal argument: {message}")]
    IllegalArgument {
        /// Description of the problem.
        message: String,
    },

    /// A save or delete was rejected by validation.
    #[error("validation failed: {0}")]
    Validation(ValidateErrors),

    /// Encryption failed.
    #[error("encryption failed: {message}")]
    EncryptionFailed {
        /// Description of the failure.
        message: String,
    },

    /// Decryption failed.
    #[error("decryption failed: {message}")]
    DecryptionFailed {
        /// Description of the failure.
        message: String,
    },

    /// Invalid key size.
    #[error("invalid key size: expected {expected} bytes, got {actual}")]
    InvalidKeySize {
        /// Expected size in bytes.
        expected: usize,
        /// Actual size in bytes.
        actual: usize,
    },

    /// Key derivation failed.
    #[error("key derivation failed: {message}")]
    KeyDerivationFailed {
        /// Description of the failure.
        message: String,
    },
}

impl CoreError {
    /// Creates a collection initialization error.
    pub fn collection_initialization(message: impl Into<String>) -> Self {
        Self::CollectionInitialization {
            message: message.into(),
        }
    }

    /// Creates an unsupported operation error without a cause.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an unsupported operation error chaining its cause.
    pub fn unsupported_with_cause(message: impl Into<String>, cause: impl Into<BoxedCause>) -> Self {
        Self::UnsupportedOperation {
            message: message.into(),
            source: Some(cause.into()),
        }
    }

    /// Creates a codec configuration error.
    pub fn codec_configuration(type_name: impl Into<String>) -> Self {
        Self::CodecConfiguration {
            type_name: type_name.into(),
        }
    }

    /// Creates an illegal argument error.
    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Self::IllegalArgument {
            message: message.into(),
        }
    }

    /// Creates an encryption failed error.
    pub fn encryption_failed(message: impl Into<String>) -> Self {
        Self::EncryptionFailed {
            message: message.into(),
        }
    }

    /// Creates a decryption failed error.
    pub fn decryption_failed(message: impl Into<String>) -> Self {
        Self::DecryptionFailed {
            message: message.into(),
        }
    }

    /// Creates an invalid key size error.
    pub fn invalid_key_size(actual: usize, expected: usize) -> Self {
        Self::InvalidKeySize { expected, actual }
    }

    /// Creates a key derivation failed error.
    pub fn key_derivation_failed(message: impl Into<String>) -> Self {
        Self::KeyDerivationFailed {
            message: message.into(),
        }
    }

    /// Returns the validation errors if this is a validation rejection.
    pub fn validation_errors(&self) -> Option<&ValidateErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_configuration_message_names_type() {
        let err = CoreError::codec_configuration("Opaque(Widget)");
        assert_eq!(err.to_string(), "Can't find a codec for Opaque(Widget)");
        assert!(err.source().is_none());
    }

    #[test]
    fn unsupported_chains_cause() {
        let cause = CoreError::illegal_argument("inner");
        let err = CoreError::unsupported_with_cause("Instantiation fails: x", cause);
        let source = err.source().expect("cause");
        assert!(source.to_string().contains("inner"));
    }

    #[test]
    fn store_errors_convert() {
        let err: CoreError = entidoc_store::StoreError::Unavailable("down".into()).into();
        assert!(matches!(err, CoreError::Store(_)));
    }
}
