use shared::protocol::EnvelopeError;
use thiserror::Error;

/// One failure inside a fetch cycle. Whether a failure is retried is decided
/// by [`FetchError::is_transient`]; everything else terminates the cycle
/// immediately.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request deadline elapsed before the backend answered.
    #[error("Request timeout")]
    Timeout,

    /// The response envelope carried a non-200 status; the message is the
    /// server's own.
    #[error("{message}")]
    Api { message: String },

    /// A required identifier was absent before any request was issued.
    #[error("{0}")]
    MissingContext(String),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout => true,
            Self::Api { message } => is_transient_message(message),
            _ => false,
        }
    }
}

impl From<EnvelopeError> for FetchError {
    fn from(err: EnvelopeError) -> Self {
        match err {
            EnvelopeError::Rejected { message } => Self::Api { message },
            EnvelopeError::MissingData => {
                Self::InvalidResponse("response envelope has status 200 but no data".to_string())
            }
        }
    }
}

/// Server messages that indicate a condition worth retrying.
pub fn is_transient_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("server is temporarily overloaded") || lower.contains("request timeout")
}

/// Terminal failure of a retried fetch cycle. `attempts` counts requests
/// actually issued: 0 when the cycle failed before reaching the network,
/// up to `max_retries + 1` when the retry budget ran out.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct FetchFailure {
    pub error: FetchError,
    pub attempts: u32,
}

impl FetchFailure {
    pub(crate) fn before_request(error: FetchError) -> Self {
        Self { error, attempts: 0 }
    }
}
