//! Error types for Trello operations

use thiserror::Error;

/// Result type for Trello operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during Trello operations
#[derive(Error, Debug)]
pub enum Error {
    /// Transport error
    #[error("Trello request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response
    #[error("Trello API returned {status} for {path}: {body}")]
    Status {
        status: u16,
        path: String,
        body: String,
    },

    /// Text too long for a description or comment
    #[error("Payload of {length} characters exceeds the limit of {limit}")]
    PayloadTooLarge { length: usize, limit: usize },

    /// Missing or rejected credentials
    #[error("Trello authentication error: {0}")]
    Auth(String),

    /// No open board with the configured name
    #[error("No open board named \"{0}\"")]
    BoardNotFound(String),

    /// No card with the configured label card name
    #[error("No label card named \"{0}\" on the board")]
    LabelCardNotFound(String),

    /// Neither a label map nor a label card is configured
    #[error("Configure either trello.labels or trello.label_card")]
    NoLabelSource,

    /// The configured API URL is unusable
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    /// Unexpected response body
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<Error> for cardsync_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::PayloadTooLarge { length, limit } => {
                cardsync_core::Error::PayloadTooLarge { length, limit }
            }
            Error::Auth(_)
            | Error::BoardNotFound(_)
            | Error::LabelCardNotFound(_)
            | Error::NoLabelSource
            | Error::InvalidUrl(_) => cardsync_core::Error::Config(err.to_string()),
            other => cardsync_core::Error::CardStore(Box::new(other)),
        }
    }
}
