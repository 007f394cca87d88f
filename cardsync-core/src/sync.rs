//! Sync orchestrator
//!
//! Runs one pass over every configured relationship category, feeding each
//! fetched issue to the [`Reconciler`], then optionally archives cards whose
//! issues left the open set.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::{
    is_synced_card_name, ActionConfig, BoardLayout, CardHandle, CardState, CardStore,
    Convergence, Error, IssueSource, NewCard, Reconciler, Relationship, RelationshipActions,
    Result, SyncLedger,
};

/// Options for a sync run
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Archive cards whose issues are no longer open
    pub close: bool,
    /// Name of the label card, which is never archived
    pub label_card_name: Option<String>,
}

/// Why a card group was archived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// The issue was closed on the tracker
    Closed,
    /// The issue is open but no longer assigned to or mentioning the user
    NoLongerRelevant,
    /// No local state to tell which
    Unknown,
}

/// Counters for one sync run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub issues_seen: usize,
    pub issues_skipped: usize,
    pub cards_created: usize,
    pub cards_updated: usize,
    pub cards_unchanged: usize,
    pub comments_created: usize,
    pub comments_updated: usize,
    pub comments_deleted: usize,
    pub label_touches: usize,
    pub degraded: usize,
    pub groups_closed: usize,
    pub archival_cards: usize,
    pub cards_deleted: usize,
}

impl SyncReport {
    /// Fold one issue's convergence into the totals
    pub fn record(&mut self, convergence: &Convergence) {
        self.issues_seen += 1;
        if convergence.skipped {
            self.issues_skipped += 1;
            return;
        }
        for outcome in &convergence.cards {
            match outcome.state {
                CardState::Created => self.cards_created += 1,
                CardState::Updated => self.cards_updated += 1,
                CardState::Unchanged => self.cards_unchanged += 1,
            }
            if outcome.degraded {
                self.degraded += 1;
            }
            self.comments_created += outcome.comments.created;
            self.comments_updated += outcome.comments.updated;
            self.comments_deleted += outcome.comments.deleted;
            self.degraded += outcome.comments.degraded;
            if outcome.comments.touched {
                self.label_touches += 1;
            }
        }
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Issues:   {} seen, {} skipped",
            self.issues_seen, self.issues_skipped
        )?;
        writeln!(
            f,
            "Cards:    {} created, {} updated, {} unchanged",
            self.cards_created, self.cards_updated, self.cards_unchanged
        )?;
        writeln!(
            f,
            "Comments: {} created, {} updated, {} deleted ({} label touches)",
            self.comments_created, self.comments_updated, self.comments_deleted, self.label_touches
        )?;
        writeln!(
            f,
            "Closed:   {} issues archived ({} archival cards, {} cards deleted)",
            self.groups_closed, self.archival_cards, self.cards_deleted
        )?;
        write!(f, "Degraded payloads: {}", self.degraded)
    }
}

/// Drives a full sync run across relationship categories
pub struct Syncer<'a> {
    source: &'a dyn IssueSource,
    store: &'a dyn CardStore,
    layout: &'a BoardLayout,
    actions: &'a RelationshipActions,
    ledger: Option<&'a dyn SyncLedger>,
    options: SyncOptions,
}

impl<'a> Syncer<'a> {
    /// Create a syncer, checking every configured list and label against the board
    pub fn new(
        source: &'a dyn IssueSource,
        store: &'a dyn CardStore,
        layout: &'a BoardLayout,
        actions: &'a RelationshipActions,
    ) -> Result<Self> {
        if actions.is_empty() {
            return Err(Error::Config(
                "No relationships configured; add [relationships.assignee] or [relationships.mention]"
                    .to_string(),
            ));
        }
        layout.validate(actions)?;

        Ok(Self {
            source,
            store,
            layout,
            actions,
            ledger: None,
            options: SyncOptions::default(),
        })
    }

    /// Use a local state cache
    pub fn with_ledger(mut self, ledger: Option<&'a dyn SyncLedger>) -> Self {
        self.ledger = ledger;
        self
    }

    /// Set run options
    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    fn reconciler(&self) -> Reconciler<'a> {
        Reconciler::new(self.store, self.layout).with_ledger(self.ledger)
    }

    /// Run every configured category, then the closing pass
    ///
    /// A failing category does not stop the others, but it does cancel the
    /// closing pass since the set of open issues is incomplete.
    pub async fn sync(&self) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        let mut failures = Vec::new();
        let mut open_names = HashSet::new();

        for (relationship, config) in self.actions.iter() {
            match self.sync_category(relationship, config, &mut report).await {
                Ok(names) => open_names.extend(names),
                Err(e) => {
                    error!(%relationship, error = %e, "Category failed");
                    failures.push(Error::Category {
                        relationship,
                        source: Box::new(e),
                    });
                }
            }
        }

        if !failures.is_empty() {
            if self.options.close {
                warn!("Skipping closing pass because a category failed");
            }
            return Err(if failures.len() == 1 {
                failures.remove(0)
            } else {
                Error::Aggregate(failures)
            });
        }

        if self.options.close {
            self.close_pass(&open_names, &mut report).await?;
        }

        info!(
            issues = report.issues_seen,
            created = report.cards_created,
            updated = report.cards_updated,
            closed = report.groups_closed,
            "Sync complete"
        );
        Ok(report)
    }

    /// Sync every open issue of one relationship
    ///
    /// Returns the card names of the issues that were synced. The first
    /// failing issue aborts the category.
    pub async fn sync_category(
        &self,
        relationship: Relationship,
        config: &ActionConfig,
        report: &mut SyncReport,
    ) -> Result<Vec<String>> {
        let issues = self.source.fetch(relationship).await?;
        info!(%relationship, count = issues.len(), "Syncing open issues");

        let reconciler = self.reconciler();
        let mut names = Vec::with_capacity(issues.len());

        for issue in &issues {
            let convergence = reconciler
                .reconcile(issue, relationship, config)
                .await
                .map_err(|e| e.for_issue(&issue.title))?;
            report.record(&convergence);
            if !convergence.skipped {
                names.push(issue.card_name());
            }
        }

        Ok(names)
    }

    /// Archive every synced card group whose name is not in `open_names`
    ///
    /// Stops at the first group that fails.
    pub async fn close_pass(
        &self,
        open_names: &HashSet<String>,
        report: &mut SyncReport,
    ) -> Result<()> {
        info!("Syncing closed issues");
        let groups = self.store.cards_by_name().await?;

        for (name, cards) in &groups {
            if self.options.label_card_name.as_deref() == Some(name.as_str()) {
                continue;
            }
            if !is_synced_card_name(name) || open_names.contains(name) {
                continue;
            }
            self.close_group(name, cards, report)
                .await
                .map_err(|e| e.for_issue(name))?;
        }

        Ok(())
    }

    async fn close_group(
        &self,
        name: &str,
        cards: &[CardHandle],
        report: &mut SyncReport,
    ) -> Result<()> {
        let entry = match self.ledger {
            Some(ledger) => ledger.find_by_card_name(name).await?,
            None => None,
        };
        let relationship = entry
            .as_ref()
            .map(|e| e.relationship)
            .unwrap_or(Relationship::Assignee);
        let Some(config) = self
            .actions
            .get(relationship)
            .or_else(|| self.actions.iter().next().map(|(_, c)| c))
        else {
            return Ok(());
        };
        let close = &config.close;
        if close.lists.is_empty() {
            warn!(card = %name, %relationship, "No close lists configured, leaving cards in place");
            return Ok(());
        }
        let close_list_ids = self.layout.list_ids(close)?;

        let (archived, live): (Vec<&CardHandle>, Vec<&CardHandle>) = cards
            .iter()
            .partition(|c| close_list_ids.contains(&c.list_id));
        let Some(template) = live.last() else {
            debug!(card = %name, "Already archived");
            return Ok(());
        };

        let reason = match &entry {
            Some(entry) => match self.source.is_closed(&entry.title, &entry.issue_id).await {
                Ok(true) => CloseReason::Closed,
                Ok(false) => CloseReason::NoLongerRelevant,
                Err(e) => {
                    warn!(card = %name, error = %e, "Could not check whether issue is closed");
                    CloseReason::Unknown
                }
            },
            None => CloseReason::Unknown,
        };
        info!(card = %name, ?reason, "Archiving issue");

        let label_ids = if close.labels.is_empty() {
            template.label_ids.clone()
        } else {
            self.layout.label_ids(close)?
        };

        let reconciler = self.reconciler();
        for list_id in &close_list_ids {
            if archived.iter().any(|c| &c.list_id == list_id) {
                continue;
            }
            let archival = NewCard {
                name: name.to_string(),
                desc: template.desc.clone(),
                list_id: list_id.clone(),
                label_ids: label_ids.clone(),
            };
            let (card, degraded) = reconciler.create_card(archival).await?;
            info!(card_id = %card.id, list_id = %list_id, "Created archival card");
            report.archival_cards += 1;
            if degraded {
                report.degraded += 1;
            }
        }

        for card in &live {
            self.store
                .delete_card(&card.id)
                .await
                .map_err(|e| e.for_card(&card.id))?;
            debug!(card_id = %card.id, "Deleted card");
            report.cards_deleted += 1;
        }

        if let Some(ledger) = self.ledger {
            ledger.forget(name).await?;
        }
        report.groups_closed += 1;
        Ok(())
    }
}
