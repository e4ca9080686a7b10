//! Error types

use async_openai::error::OpenAIError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No API token was configured.
    #[error("missing API token: set it with ClientOption::Token, e.g. from OPENAI_API_KEY")]
    MissingCredential,

    /// The HTTP or SOCKS5 proxy could not be set up.
    #[error("proxy connection failed: verify proxy address {proxy} and network connectivity")]
    ProxyUnreachable {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered without a single choice.
    #[error("empty response from API: no choices returned")]
    EmptyResponse,

    #[error("{operation} is not supported by model {model}")]
    UnsupportedOperation {
        operation: &'static str,
        model: String,
    },

    /// Any failure surfaced by the SDK call.
    #[error("{operation} failed: {source}")]
    Backend {
        operation: &'static str,
        #[source]
        source: OpenAIError,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(#[source] OpenAIError),

    #[error("failed to build HTTP client: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to load settings from {path}: {message}")]
    Settings { path: String, message: String },
}

impl Error {
    pub(crate) fn backend(operation: &'static str) -> impl FnOnce(OpenAIError) -> Self {
        move |source| Error::Backend { operation, source }
    }
}
