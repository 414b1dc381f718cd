//! Typed failures from the Delta Exchange adapter.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Network error, timeout or a body that could not be read.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Exchange answered with a non-2xx status.
    #[error("exchange returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Payload did not match the endpoint's response shape.
    #[error("failed to parse {context} response: {source}")]
    Parse {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("price unavailable: {0}")]
    PriceUnavailable(String),

    #[error("signing error: {0}")]
    Signing(String),
}

impl ExchangeError {
    pub fn parse(context: &'static str, source: serde_json::Error) -> Self {
        ExchangeError::Parse { context, source }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ExchangeError::Transport(_) | ExchangeError::Status { .. })
    }
}

pub type Result<T> = std::result::Result<T, ExchangeError>;
