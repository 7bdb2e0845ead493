use thiserror::Error;

/// Errors returned by [`crate::Client`] and the JSON-stat parser.
///
/// The variants separate *where* a call went wrong:
/// - [`Error::Transport`] / [`Error::Http`]: the service or network failed; the query
///   content was never evaluated.
/// - [`Error::Api`]: the service answered and rejected the query.
/// - [`Error::MalformedResponse`]: the service answered with something that is not a
///   valid envelope or JSON-stat dataset.
#[derive(Debug, Error)]
pub enum Error {
    /// The endpoint answered with a status other than `200`.
    #[error("request failed with HTTP status {code}")]
    Transport {
        /// The observed HTTP status code.
        code: u16,
    },

    /// The envelope carried an `error` member.
    #[error("api error {code}: {message}")]
    Api { code: i64, message: String },

    /// The body was not JSON, lacked both `data` and `error`, or `data` was not JSON-stat.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// No response was received at all (DNS, connect, timeout, TLS).
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    /// The query document was empty.
    #[error("query must not be empty")]
    EmptyQuery,
}

impl Error {
    /// True when the failure happened below the JSON-RPC layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. } | Error::Http(_))
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedResponse(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
