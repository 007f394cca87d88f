//! Cardsync Core - Reconciliation engine for mirroring GitHub issues on Trello
//!
//! This crate holds the data model, the per-issue reconciliation engine and
//! the sync orchestrator. The issue tracker, the board and the local state
//! cache are reached through the traits in [`store`], implemented by the
//! sibling crates.

pub mod actions;
pub mod board;
pub mod config;
pub mod dry_run;
pub mod error;
pub mod model;
pub mod reconcile;
pub mod secrets;
pub mod store;
pub mod sync;

#[cfg(test)]
mod testing;

pub use actions::{ActionConfig, ActionPolicy, RelationshipActions};
pub use board::BoardLayout;
pub use config::Config;
pub use dry_run::DryRunStore;
pub use error::{BoxError, Error, Result};
pub use model::{
    card_description, card_name, comment_text, is_synced_card_name, CardComment, CardHandle,
    CardUpdate, Comment, Issue, NewCard, Relationship, CARD_NAME_PREFIX, PLACEHOLDER_COMMENT,
};
pub use reconcile::{CardOutcome, CardState, CommentSync, Convergence, Reconciler};
pub use secrets::Secrets;
pub use store::{group_by_name, CardStore, IssueSource, LedgerEntry, SyncLedger};
pub use sync::{CloseReason, SyncOptions, SyncReport, Syncer};
