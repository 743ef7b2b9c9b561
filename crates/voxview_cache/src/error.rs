use thiserror::Error;

/// Errors raised by a [`SliceSource`](crate::SliceSource) while fetching a payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("HTTP error! status: {status}")]
    Status { status: u16 },

    #[error("Network error: {0}")]
    Network(String),
}

/// The payload could not be turned into a renderable image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to decode image: {message}")]
pub struct DecodeError {
    pub message: String,
}

/// Errors delivered to callers of [`SliceCache::acquire`](crate::SliceCache::acquire).
///
/// Cloneable so that one failed fetch can be handed to every caller that was
/// waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("Failed to load {key}: {source}")]
    Fetch {
        key: String,
        #[source]
        source: FetchError,
    },

    #[error("Failed to load {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: DecodeError,
    },
}

impl CacheError {
    /// The request key the error belongs to.
    pub fn key(&self) -> &str {
        match self {
            CacheError::Fetch { key, .. } | CacheError::Decode { key, .. } => key,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => FetchError::Status {
                status: status.as_u16(),
            },
            None => FetchError::Network(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
