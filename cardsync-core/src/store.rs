//! Seams to the external collaborators
//!
//! The engine only talks to the issue tracker, the board and the local state
//! cache through these traits. Implementations live in their own crates.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::{CardComment, CardHandle, CardUpdate, Issue, NewCard, Relationship, Result};

/// Source of open issues relevant to the user
#[async_trait]
pub trait IssueSource: Send + Sync {
    /// Open issues with the given relationship to the user, comments oldest first
    async fn fetch(&self, relationship: Relationship) -> Result<Vec<Issue>>;

    /// Whether the issue with this title and ID has been closed
    async fn is_closed(&self, title: &str, issue_id: &str) -> Result<bool>;
}

/// Cards and card comments on the kanban board
///
/// Comment lists are exchanged oldest first; implementations whose API
/// returns another order must normalize at the boundary.
#[async_trait]
pub trait CardStore: Send + Sync {
    /// Cards whose name matches; may include false positives
    async fn search_cards_by_name(&self, name: &str) -> Result<Vec<CardHandle>>;

    /// Create a card
    async fn create_card(&self, card: &NewCard) -> Result<CardHandle>;

    /// Update fields on a card
    async fn update_card(&self, card_id: &str, update: &CardUpdate) -> Result<()>;

    /// Delete a card
    async fn delete_card(&self, card_id: &str) -> Result<()>;

    /// Comments on a card, oldest first
    async fn card_comments(&self, card_id: &str) -> Result<Vec<CardComment>>;

    /// Append a comment to a card
    async fn add_comment(&self, card_id: &str, text: &str) -> Result<()>;

    /// Replace the text of a comment
    async fn update_comment(&self, card_id: &str, comment_id: &str, text: &str) -> Result<()>;

    /// Delete a comment
    async fn delete_comment(&self, card_id: &str, comment_id: &str) -> Result<()>;

    /// All open cards on the board grouped by name
    async fn cards_by_name(&self) -> Result<BTreeMap<String, Vec<CardHandle>>>;

    /// Largest text the store accepts in a single field, when known
    fn payload_limit(&self) -> Option<usize> {
        None
    }
}

/// What the local state cache remembers about a synced issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub issue_id: String,
    pub title: String,
    pub card_name: String,
    pub relationship: Relationship,
    pub card_ids: Vec<String>,
}

/// Local cache of previously synced issues and cards
#[async_trait]
pub trait SyncLedger: Send + Sync {
    /// Look up an issue by tracker ID
    async fn find_issue(&self, issue_id: &str) -> Result<Option<LedgerEntry>>;

    /// Look up an issue by its canonical card name
    async fn find_by_card_name(&self, card_name: &str) -> Result<Option<LedgerEntry>>;

    /// Insert or refresh an issue record
    async fn record_issue(&self, issue: &Issue, relationship: Relationship) -> Result<()>;

    /// Insert or refresh a card record belonging to an issue
    async fn record_card(&self, issue_id: &str, card: &CardHandle) -> Result<()>;

    /// Drop every record for a card name once its issue is archived
    async fn forget(&self, card_name: &str) -> Result<()>;
}

/// Group cards by exact name
pub fn group_by_name(cards: Vec<CardHandle>) -> BTreeMap<String, Vec<CardHandle>> {
    let mut groups: BTreeMap<String, Vec<CardHandle>> = BTreeMap::new();
    for card in cards {
        groups.entry(card.name.clone()).or_default().push(card);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(id: &str, name: &str) -> CardHandle {
        CardHandle {
            id: id.to_string(),
            name: name.to_string(),
            desc: String::new(),
            list_id: "l".to_string(),
            label_ids: vec![],
        }
    }

    #[test]
    fn test_group_by_name() {
        let groups = group_by_name(vec![card("1", "a"), card("2", "b"), card("3", "a")]);
        assert_eq!(groups.len(), 2);
        let ids: Vec<&str> = groups["a"].iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }
}
