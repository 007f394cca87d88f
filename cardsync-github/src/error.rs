//! Error types for GitHub operations

use thiserror::Error;

/// Result type for GitHub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during GitHub operations
#[derive(Error, Debug)]
pub enum Error {
    /// GitHub REST API error
    #[error("GitHub API error: {0}")]
    Api(#[from] octocrab::Error),

    /// Authentication error
    #[error("GitHub authentication error: {0}")]
    Auth(String),

    /// Transport error talking to the GraphQL endpoint
    #[error("GraphQL request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The GraphQL endpoint answered with errors
    #[error("GraphQL errors: {0}")]
    GraphQl(String),

    /// Rate limit exceeded
    #[error("GitHub rate limit exceeded: {0}")]
    RateLimited(String),

    /// The configured API URL is unusable
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl From<Error> for cardsync_core::Error {
    fn from(err: Error) -> Self {
        if matches!(err, Error::InvalidUrl(_) | Error::Auth(_)) {
            cardsync_core::Error::Config(err.to_string())
        } else {
            cardsync_core::Error::IssueSource(Box::new(err))
        }
    }
}
