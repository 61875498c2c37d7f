//! Error types for the asset cache.

/// Asset cache errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// A critical asset could not be fetched or stored; the install was abandoned.
    #[error("install of {namespace} failed at {asset}: {message}")]
    Install {
        namespace: String,
        asset: String,
        message: String,
    },

    /// Network error (transport failure, or a cold miss with no cached fallback).
    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },

    /// Cache storage error.
    #[error("storage error: {message}")]
    Storage { message: String },

    /// Stored body does not match its recorded digest.
    #[error("digest mismatch for {key}: expected {expected}, got {actual}")]
    DigestMismatch {
        key: String,
        expected: String,
        actual: String,
    },

    /// Request could not be turned into a cacheable identifier.
    #[error("invalid request {url}: {reason}")]
    InvalidRequest { url: String, reason: String },

    /// Namespace has never been installed in this store.
    #[error("namespace not installed: {namespace}")]
    NotInstalled { namespace: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl CacheError {
    /// Exit code for CLI. 1 is left to the caller for "command ran, answer was negative".
    pub fn exit_code(&self) -> i32 {
        match self {
            // Config/usage
            Self::Config { .. } => 2,
            Self::InvalidRequest { .. } => 2,
            Self::NotInstalled { .. } => 7,

            Self::Install { .. } => 3,
            Self::DigestMismatch { .. } => 4,

            // Network/transient
            Self::Network { .. } => 5,

            Self::Storage { .. } => 6,
        }
    }

    /// Whether a later attempt may succeed without operator action.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Install { .. })
    }

    pub(crate) fn storage(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Storage {
            message: format!("{}: {}", context, err),
        }
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
