use std::time::Duration;

use thiserror::Error;

use super::booking::BookingError;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Non-2xx response; `message` is the server's `message` field when present.
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("{message}")]
    Unauthorized { message: String },
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("invalid base url: {0}")]
    InvalidUrl(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("not authenticated")]
    NotAuthenticated,
    #[error(transparent)]
    Booking(#[from] BookingError),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Unauthorized { .. } => Some(401),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. } | Self::NotAuthenticated)
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
