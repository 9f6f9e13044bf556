use smm_engine::traits::{TransportError, UpstreamFetchError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST request: {0}")]
    RestRequestError(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Invalid currency amount: {0}")]
    InvalidCurrencyAmount(String),
}

impl From<UpstreamError> for UpstreamFetchError {
    fn from(e: UpstreamError) -> Self {
        match e {
            UpstreamError::RestResponseError(s) | UpstreamError::Initialization(s) => Self::Unreachable(s),
            UpstreamError::QueryError { status, message } if status >= 500 => {
                Self::Unreachable(format!("{status}. {message}"))
            },
            UpstreamError::QueryError { status, message } => Self::Rejected(format!("{status}. {message}")),
            e => Self::InvalidResponse(e.to_string()),
        }
    }
}

impl From<UpstreamError> for TransportError {
    fn from(e: UpstreamError) -> Self {
        match e {
            UpstreamError::QueryError { status: 401 | 404, message } => Self::InvalidToken(message),
            e => Self::Unavailable(e.to_string()),
        }
    }
}
