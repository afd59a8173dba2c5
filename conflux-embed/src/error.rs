//! Error types for the embedding client

/// Result type for embedding operations.
///
/// This is a convenience type alias that uses [`EmbedError`] as the error type.
/// Used throughout the crate for operations that can fail.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Error type for all embedding operations.
///
/// The variants matter to callers: [`EmbedError::Unavailable`] means the
/// provider could not be reached at all (network failure, rate limiting past
/// the retry budget, or missing credentials) and the caller may recover by
/// falling back to keyword search. The other variants indicate the request or
/// response itself was bad, which falling back would only mask.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// The embedding provider is unreachable, rate limited, or misconfigured.
    ///
    /// Recoverable: the retrieval layer treats this as a signal to degrade to
    /// keyword search rather than failing the query.
    #[error("embedding provider unavailable: {message}")]
    Unavailable { message: String },

    /// The provider rejected the request payload.
    #[error("embedding request rejected: {message}")]
    InvalidInput { message: String },

    /// The provider answered but the response body could not be interpreted.
    #[error("malformed embedding response: {message}")]
    MalformedResponse { message: String },
}

impl EmbedError {
    /// Create an [`EmbedError::Unavailable`] with a custom message.
    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Create an [`EmbedError::InvalidInput`] with a custom message.
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an [`EmbedError::MalformedResponse`] with a custom message.
    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Whether this error is recoverable by falling back to keyword search.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

// Transport-level failures (connect refused, DNS, timeout) are transient by
// nature, so they map to the recoverable variant.
impl From<reqwest::Error> for EmbedError {
    fn from(source: reqwest::Error) -> Self {
        Self::Unavailable {
            message: source.to_string(),
        }
    }
}
