//! Card store wrapper that reads through and only logs writes

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::info;

use crate::{CardComment, CardHandle, CardStore, CardUpdate, NewCard, Result};

const DRY_RUN_PREFIX: &str = "dry-run-";

/// Wraps a [`CardStore`] so a sync run reports what it would write
///
/// Created cards get synthetic `dry-run-N` IDs; comment reads for them return
/// an empty list without reaching the inner store.
pub struct DryRunStore<S> {
    inner: S,
    next_id: AtomicUsize,
}

impl<S: CardStore> DryRunStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            next_id: AtomicUsize::new(1),
        }
    }

    /// The wrapped store
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn is_synthetic(card_id: &str) -> bool {
        card_id.starts_with(DRY_RUN_PREFIX)
    }
}

#[async_trait]
impl<S: CardStore> CardStore for DryRunStore<S> {
    async fn search_cards_by_name(&self, name: &str) -> Result<Vec<CardHandle>> {
        self.inner.search_cards_by_name(name).await
    }

    async fn create_card(&self, card: &NewCard) -> Result<CardHandle> {
        let id = format!(
            "{}{}",
            DRY_RUN_PREFIX,
            self.next_id.fetch_add(1, Ordering::Relaxed)
        );
        info!(card = %card.name, list_id = %card.list_id, "[dry run] Would create card");
        Ok(CardHandle {
            id,
            name: card.name.clone(),
            desc: card.desc.clone(),
            list_id: card.list_id.clone(),
            label_ids: card.label_ids.clone(),
        })
    }

    async fn update_card(&self, card_id: &str, update: &CardUpdate) -> Result<()> {
        info!(
            card_id,
            desc = update.desc.is_some(),
            labels = update.label_ids.is_some(),
            "[dry run] Would update card"
        );
        Ok(())
    }

    async fn delete_card(&self, card_id: &str) -> Result<()> {
        info!(card_id, "[dry run] Would delete card");
        Ok(())
    }

    async fn card_comments(&self, card_id: &str) -> Result<Vec<CardComment>> {
        if Self::is_synthetic(card_id) {
            return Ok(Vec::new());
        }
        self.inner.card_comments(card_id).await
    }

    async fn add_comment(&self, card_id: &str, text: &str) -> Result<()> {
        info!(card_id, length = text.chars().count(), "[dry run] Would add comment");
        Ok(())
    }

    async fn update_comment(&self, card_id: &str, comment_id: &str, text: &str) -> Result<()> {
        info!(
            card_id,
            comment_id,
            length = text.chars().count(),
            "[dry run] Would update comment"
        );
        Ok(())
    }

    async fn delete_comment(&self, card_id: &str, comment_id: &str) -> Result<()> {
        info!(card_id, comment_id, "[dry run] Would delete comment");
        Ok(())
    }

    async fn cards_by_name(&self) -> Result<BTreeMap<String, Vec<CardHandle>>> {
        self.inner.cards_by_name().await
    }

    fn payload_limit(&self) -> Option<usize> {
        self.inner.payload_limit()
    }
}
