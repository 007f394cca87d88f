//! Cardsync GitHub - Issue source over the GitHub GraphQL search API
//!
//! Finds the open issues assigned to or mentioning a user and hands them to
//! the sync engine through [`cardsync_core::IssueSource`].

mod client;
mod error;
mod graphql;
mod issues;

pub use client::GitHubClient;
pub use error::{Error, Result};
pub use issues::{closed_query, search_query};
