//! Error types for cardsync

use thiserror::Error;

use crate::Relationship;

/// Boxed error coming from an external collaborator
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type alias for cardsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for cardsync operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error, fatal before any sync starts
    #[error("Configuration error: {0}")]
    Config(String),

    /// A create/update payload exceeded the card store's size limit
    #[error("Payload of {length} characters exceeds the limit of {limit}")]
    PayloadTooLarge { length: usize, limit: usize },

    /// Failure talking to the issue tracker
    #[error("Issue source error: {0}")]
    IssueSource(#[source] BoxError),

    /// Failure talking to the kanban board
    #[error("Card store error: {0}")]
    CardStore(#[source] BoxError),

    /// Failure reading or writing the local state cache
    #[error("State cache error: {0}")]
    Ledger(#[source] BoxError),

    /// Error while syncing a specific issue
    #[error("Error syncing issue \"{title}\": {source}")]
    Issue {
        title: String,
        #[source]
        source: Box<Error>,
    },

    /// Error while operating on a specific card
    #[error("Error on card {card_id}: {source}")]
    Card {
        card_id: String,
        #[source]
        source: Box<Error>,
    },

    /// Error that aborted one relationship category
    #[error("Error syncing open {relationship} issues: {source}")]
    Category {
        relationship: Relationship,
        #[source]
        source: Box<Error>,
    },

    /// Several categories failed in the same run
    #[error("{} sync categories failed: {}", .0.len(), join_errors(.0))]
    Aggregate(Vec<Error>),
}

impl Error {
    /// Wrap this error with the title of the issue being synced
    pub fn for_issue(self, title: impl Into<String>) -> Self {
        Error::Issue {
            title: title.into(),
            source: Box::new(self),
        }
    }

    /// Wrap this error with the ID of the card being written
    pub fn for_card(self, card_id: impl Into<String>) -> Self {
        Error::Card {
            card_id: card_id.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error (or the one it wraps) is a payload-size rejection
    pub fn is_payload_too_large(&self) -> bool {
        match self {
            Error::PayloadTooLarge { .. } => true,
            Error::Issue { source, .. }
            | Error::Card { source, .. }
            | Error::Category { source, .. } => source.is_payload_too_large(),
            _ => false,
        }
    }
}

fn join_errors(errors: &[Error]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_too_large_seen_through_wrappers() {
        let err = Error::PayloadTooLarge {
            length: 20_000,
            limit: 16_384,
        }
        .for_card("abc")
        .for_issue("Bug X");
        assert!(err.is_payload_too_large());
        assert!(!Error::Config("boom".to_string()).is_payload_too_large());
    }

    #[test]
    fn test_context_in_message() {
        let err = Error::CardStore("HTTP 500".into())
            .for_card("card-1")
            .for_issue("Bug X");
        let msg = err.to_string();
        assert!(msg.contains("Bug X"));
        assert!(msg.contains("card-1"));
        assert!(msg.contains("HTTP 500"));
    }

    #[test]
    fn test_aggregate_message() {
        let err = Error::Aggregate(vec![
            Error::Config("one".to_string()),
            Error::Config("two".to_string()),
        ]);
        assert_eq!(
            err.to_string(),
            "2 sync categories failed: Configuration error: one; Configuration error: two"
        );
    }
}
