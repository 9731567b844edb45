use thiserror::Error;

/// Errors raised while resolving a quote or running the bot.
#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{pair} cannot be quoted: {message}")]
    NotQuotable { pair: String, message: String },

    #[error("invalid input: {0}")]
    Input(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for failures of the upstream service itself (network, status, empty page).
    pub fn is_upstream_unavailable(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Api(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
