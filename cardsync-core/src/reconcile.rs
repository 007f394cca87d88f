//! Reconciliation engine
//!
//! Converges the board towards one fetched issue:
//! 1. Finds existing cards by canonical name (exact match on the store's candidates)
//! 2. Creates a card on every target list that has none, or updates the
//!    description in place when it drifted
//! 3. Converges each card's comments index by index, oldest first
//!
//! Writes that the store rejects as too large are retried once with a
//! degraded payload instead of failing the sync.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::{
    ActionConfig, BoardLayout, CardHandle, CardStore, CardUpdate, Issue, NewCard, Relationship,
    Result, SyncLedger, PLACEHOLDER_COMMENT,
};

/// What happened to one card during convergence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardState {
    /// No card existed on the list, one was created
    Created,
    /// The card's description drifted and was rewritten
    Updated,
    /// The card already matched; nothing was written
    Unchanged,
}

/// Counts from one comment convergence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentSync {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Comments written (or kept) as a placeholder
    pub degraded: usize,
    /// Whether labels were re-applied to flag new activity
    pub touched: bool,
}

impl CommentSync {
    /// Whether any comment was created, updated or deleted
    pub fn new_activity(&self) -> bool {
        self.created + self.updated + self.deleted > 0
    }
}

enum DescriptionWrite {
    Written,
    Cleared,
    AlreadyCleared,
}

/// Outcome for one card of an issue
#[derive(Debug, Clone)]
pub struct CardOutcome {
    /// The card as it stands after convergence
    pub card: CardHandle,
    pub state: CardState,
    /// The description was replaced by a degraded payload
    pub degraded: bool,
    pub comments: CommentSync,
}

/// Outcome of reconciling one issue
#[derive(Debug, Clone, Default)]
pub struct Convergence {
    /// The issue was a hollow search result and was not synced
    pub skipped: bool,
    /// Whether the create policy (rather than update) applied
    pub first_sync: bool,
    pub cards: Vec<CardOutcome>,
}

impl Convergence {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Default::default()
        }
    }

    /// Number of cards in the given state
    pub fn count(&self, state: CardState) -> usize {
        self.cards.iter().filter(|c| c.state == state).count()
    }
}

/// Converges board state for individual issues
pub struct Reconciler<'a> {
    store: &'a dyn CardStore,
    layout: &'a BoardLayout,
    ledger: Option<&'a dyn SyncLedger>,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler over a card store and the board's ID maps
    pub fn new(store: &'a dyn CardStore, layout: &'a BoardLayout) -> Self {
        Self {
            store,
            layout,
            ledger: None,
        }
    }

    /// Use a local state cache to decide first vs later syncs
    pub fn with_ledger(mut self, ledger: Option<&'a dyn SyncLedger>) -> Self {
        self.ledger = ledger;
        self
    }

    /// Converge cards and comments for one issue
    pub async fn reconcile(
        &self,
        issue: &Issue,
        relationship: Relationship,
        actions: &ActionConfig,
    ) -> Result<Convergence> {
        if issue.is_hollow() {
            warn!(issue_id = %issue.id, "Skipping issue with empty title");
            return Ok(Convergence::skipped());
        }

        let name = issue.card_name();
        info!(card = %name, %relationship, "Syncing issue");

        let existing = self.find_cards(&name).await?;
        let first_sync = match self.ledger {
            Some(ledger) => ledger.find_issue(&issue.id).await?.is_none(),
            None => existing.is_empty(),
        };
        let policy = actions.policy(first_sync);
        let label_ids = self.layout.label_ids(policy)?;
        let (desc, desc_degraded) = self.fit_description(issue.card_description());
        let comments = issue.comment_texts();

        // One card per list; extra copies on the same list are left alone
        let mut by_list: HashMap<String, CardHandle> = HashMap::new();
        for card in existing {
            if let Some(kept) = by_list.get(&card.list_id) {
                warn!(card = %name, kept = %kept.id, duplicate = %card.id, "Duplicate card on list");
                continue;
            }
            by_list.insert(card.list_id.clone(), card);
        }

        let mut convergence = Convergence {
            skipped: false,
            first_sync,
            cards: Vec::new(),
        };

        for list_name in &policy.lists {
            let list_id = self.layout.list_id(list_name)?;
            if convergence.cards.iter().any(|c| c.card.list_id == list_id) {
                continue;
            }

            let (card, state, degraded) = match by_list.get(list_id) {
                None => {
                    let new = NewCard {
                        name: name.clone(),
                        desc: desc.clone(),
                        list_id: list_id.to_string(),
                        label_ids: label_ids.clone(),
                    };
                    let (card, degraded) = self.create_card(new).await?;
                    info!(card_id = %card.id, list = %list_name, "Created card");
                    (card, CardState::Created, degraded)
                }
                Some(card) if card.desc != desc => {
                    let card = card.clone();
                    let write = self
                        .update_description(&card, &desc, &label_ids)
                        .await
                        .map_err(|e| e.for_card(&card.id))?;
                    match write {
                        DescriptionWrite::Written => {
                            info!(card_id = %card.id, list = %list_name, "Updated card description");
                            let card = CardHandle {
                                desc: desc.clone(),
                                label_ids: label_ids.clone(),
                                ..card
                            };
                            (card, CardState::Updated, false)
                        }
                        DescriptionWrite::Cleared => {
                            let card = CardHandle {
                                desc: String::new(),
                                label_ids: label_ids.clone(),
                                ..card
                            };
                            (card, CardState::Updated, true)
                        }
                        DescriptionWrite::AlreadyCleared => {
                            debug!(card_id = %card.id, list = %list_name, "Description still too large, card unchanged");
                            (card, CardState::Unchanged, true)
                        }
                    }
                }
                Some(card) => {
                    debug!(card_id = %card.id, list = %list_name, "Card unchanged");
                    (card.clone(), CardState::Unchanged, false)
                }
            };

            let comment_sync = self
                .sync_comments(&card, &comments, &label_ids)
                .await
                .map_err(|e| e.for_card(&card.id))?;

            convergence.cards.push(CardOutcome {
                card,
                state,
                degraded: degraded || desc_degraded,
                comments: comment_sync,
            });
        }

        if let Some(ledger) = self.ledger {
            ledger.record_issue(issue, relationship).await?;
            for outcome in &convergence.cards {
                ledger.record_card(&issue.id, &outcome.card).await?;
            }
        }

        Ok(convergence)
    }

    /// Converge a card's comments onto `comments` (oldest first)
    ///
    /// The Nth existing comment is compared to the Nth desired text: extra
    /// existing comments are deleted, differing ones rewritten and missing
    /// ones appended. Any write re-applies `label_ids` to the card.
    pub async fn sync_comments(
        &self,
        card: &CardHandle,
        comments: &[String],
        label_ids: &[String],
    ) -> Result<CommentSync> {
        let existing = self.store.card_comments(&card.id).await?;
        debug!(
            card_id = %card.id,
            existing = existing.len(),
            desired = comments.len(),
            "Syncing comments"
        );

        let mut result = CommentSync::default();

        for (idx, old) in existing.iter().enumerate() {
            let Some(text) = comments.get(idx) else {
                debug!(card_id = %card.id, comment_id = %old.id, "Deleting stale comment");
                self.store.delete_comment(&card.id, &old.id).await?;
                result.deleted += 1;
                continue;
            };

            let (text, degraded) = self.fit_comment(text);
            if degraded {
                result.degraded += 1;
            }
            if old.text == text {
                continue;
            }

            debug!(card_id = %card.id, comment_id = %old.id, "Updating stale comment");
            match self.store.update_comment(&card.id, &old.id, &text).await {
                Ok(()) => result.updated += 1,
                Err(e) if e.is_payload_too_large() => {
                    warn!(
                        card_id = %card.id,
                        comment_id = %old.id,
                        error = %e,
                        "Comment too large, writing placeholder"
                    );
                    result.degraded += 1;
                    if old.text != PLACEHOLDER_COMMENT {
                        self.store
                            .update_comment(&card.id, &old.id, PLACEHOLDER_COMMENT)
                            .await?;
                        result.updated += 1;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        for text in comments.iter().skip(existing.len()) {
            let (text, degraded) = self.fit_comment(text);
            if degraded {
                result.degraded += 1;
            }

            debug!(card_id = %card.id, "Adding new comment");
            match self.store.add_comment(&card.id, &text).await {
                Ok(()) => {}
                Err(e) if e.is_payload_too_large() => {
                    warn!(card_id = %card.id, error = %e, "Comment too large, writing placeholder");
                    result.degraded += 1;
                    self.store
                        .add_comment(&card.id, PLACEHOLDER_COMMENT)
                        .await?;
                }
                Err(e) => return Err(e),
            }
            result.created += 1;
        }

        if result.new_activity() {
            self.store
                .update_card(&card.id, &CardUpdate::labels(label_ids))
                .await?;
            result.touched = true;
        }

        Ok(result)
    }

    /// Create a card, retrying with an empty description if it is too large
    ///
    /// Returns the card and whether the degraded payload was used.
    pub async fn create_card(&self, card: NewCard) -> Result<(CardHandle, bool)> {
        match self.store.create_card(&card).await {
            Ok(created) => Ok((created, false)),
            Err(e) if e.is_payload_too_large() => {
                warn!(
                    card = %card.name,
                    list_id = %card.list_id,
                    error = %e,
                    "Card too large, creating with empty description"
                );
                let degraded = NewCard {
                    desc: String::new(),
                    ..card
                };
                let created = self.store.create_card(&degraded).await?;
                Ok((created, true))
            }
            Err(e) => Err(e),
        }
    }

    async fn find_cards(&self, name: &str) -> Result<Vec<CardHandle>> {
        let candidates = self.store.search_cards_by_name(name).await?;
        Ok(candidates.into_iter().filter(|c| c.name == name).collect())
    }

    /// Rewrite a drifted description, clearing it if the store rejects its size
    ///
    /// A card that is already cleared and carries the right labels is not
    /// written again.
    async fn update_description(
        &self,
        card: &CardHandle,
        desc: &str,
        label_ids: &[String],
    ) -> Result<DescriptionWrite> {
        let update = CardUpdate {
            desc: Some(desc.to_string()),
            label_ids: Some(label_ids.to_vec()),
        };
        match self.store.update_card(&card.id, &update).await {
            Ok(()) => Ok(DescriptionWrite::Written),
            Err(e) if e.is_payload_too_large() => {
                if card.desc.is_empty() && card.label_ids == label_ids {
                    return Ok(DescriptionWrite::AlreadyCleared);
                }
                warn!(card_id = %card.id, error = %e, "Description too large, clearing it");
                let update = CardUpdate {
                    desc: Some(String::new()),
                    ..update
                };
                self.store.update_card(&card.id, &update).await?;
                Ok(DescriptionWrite::Cleared)
            }
            Err(e) => Err(e),
        }
    }

    fn fit_description(&self, desc: String) -> (String, bool) {
        match self.store.payload_limit() {
            Some(limit) if desc.chars().count() > limit => {
                warn!(length = desc.chars().count(), limit, "Description exceeds limit, leaving it empty");
                (String::new(), true)
            }
            _ => (desc, false),
        }
    }

    fn fit_comment(&self, text: &str) -> (String, bool) {
        match self.store.payload_limit() {
            Some(limit) if text.chars().count() > limit => {
                warn!(length = text.chars().count(), limit, "Comment exceeds limit, using placeholder");
                (PLACEHOLDER_COMMENT.to_string(), true)
            }
            _ => (text.to_string(), false),
        }
    }
}
