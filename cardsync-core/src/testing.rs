//! In-memory collaborators for unit tests

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    group_by_name, ActionConfig, ActionPolicy, BoardLayout, CardComment, CardHandle, CardStore,
    CardUpdate, Comment, Error, Issue, IssueSource, LedgerEntry, NewCard, Relationship, Result,
    SyncLedger,
};

/// Write counters for [`MemoryBoard`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Writes {
    pub cards_created: usize,
    pub cards_updated: usize,
    pub cards_deleted: usize,
    pub comments_added: usize,
    pub comments_updated: usize,
    pub comments_deleted: usize,
}

impl Writes {
    pub fn total(&self) -> usize {
        self.cards_created
            + self.cards_updated
            + self.cards_deleted
            + self.comments_added
            + self.comments_updated
            + self.comments_deleted
    }
}

#[derive(Default)]
struct BoardState {
    cards: Vec<CardHandle>,
    comments: HashMap<String, Vec<CardComment>>,
    writes: Writes,
    next_id: usize,
}

impl BoardState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }
}

/// Board that keeps cards in memory and counts successful writes
#[derive(Default)]
pub struct MemoryBoard {
    state: Mutex<BoardState>,
    reject_over: Option<usize>,
    advertise_limit: bool,
    fail_comments: bool,
}

impl MemoryBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject any text longer than `limit` with a payload error
    pub fn with_rejected_payloads_over(mut self, limit: usize) -> Self {
        self.reject_over = Some(limit);
        self
    }

    /// Report the rejection limit through `payload_limit`
    pub fn with_advertised_limit(mut self) -> Self {
        self.advertise_limit = true;
        self
    }

    /// Fail every comment read
    pub fn with_failing_comments(mut self) -> Self {
        self.fail_comments = true;
        self
    }

    /// Place a card with comments (oldest first) on the board without counting writes
    pub fn seed_card(&self, name: &str, list_id: &str, comments: &[&str]) -> CardHandle {
        let mut state = self.state.lock().unwrap();
        let card = CardHandle {
            id: state.next_id("card"),
            name: name.to_string(),
            desc: String::new(),
            list_id: list_id.to_string(),
            label_ids: vec![],
        };
        let comments = comments
            .iter()
            .map(|text| CardComment {
                id: state.next_id("comment"),
                text: text.to_string(),
            })
            .collect();
        state.comments.insert(card.id.clone(), comments);
        state.cards.push(card.clone());
        card
    }

    pub fn cards(&self) -> Vec<CardHandle> {
        self.state.lock().unwrap().cards.clone()
    }

    pub fn comments(&self, card_id: &str) -> Vec<CardComment> {
        self.state
            .lock()
            .unwrap()
            .comments
            .get(card_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn writes(&self) -> Writes {
        self.state.lock().unwrap().writes
    }

    fn check_size(&self, text: &str) -> Result<()> {
        match self.reject_over {
            Some(limit) if text.chars().count() > limit => Err(Error::PayloadTooLarge {
                length: text.chars().count(),
                limit,
            }),
            _ => Ok(()),
        }
    }
}

fn missing(what: &str, id: &str) -> Error {
    Error::CardStore(format!("{} {} not found", what, id).into())
}

#[async_trait]
impl CardStore for MemoryBoard {
    async fn search_cards_by_name(&self, name: &str) -> Result<Vec<CardHandle>> {
        // Substring match, like a search API that returns near misses
        Ok(self
            .state
            .lock()
            .unwrap()
            .cards
            .iter()
            .filter(|c| c.name.contains(name))
            .cloned()
            .collect())
    }

    async fn create_card(&self, card: &NewCard) -> Result<CardHandle> {
        self.check_size(&card.desc)?;
        let mut state = self.state.lock().unwrap();
        let created = CardHandle {
            id: state.next_id("card"),
            name: card.name.clone(),
            desc: card.desc.clone(),
            list_id: card.list_id.clone(),
            label_ids: card.label_ids.clone(),
        };
        state.cards.push(created.clone());
        state.comments.insert(created.id.clone(), Vec::new());
        state.writes.cards_created += 1;
        Ok(created)
    }

    async fn update_card(&self, card_id: &str, update: &CardUpdate) -> Result<()> {
        if let Some(desc) = &update.desc {
            self.check_size(desc)?;
        }
        let mut state = self.state.lock().unwrap();
        let card = state
            .cards
            .iter_mut()
            .find(|c| c.id == card_id)
            .ok_or_else(|| missing("card", card_id))?;
        if let Some(desc) = &update.desc {
            card.desc = desc.clone();
        }
        if let Some(label_ids) = &update.label_ids {
            card.label_ids = label_ids.clone();
        }
        state.writes.cards_updated += 1;
        Ok(())
    }

    async fn delete_card(&self, card_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let before = state.cards.len();
        state.cards.retain(|c| c.id != card_id);
        if state.cards.len() == before {
            return Err(missing("card", card_id));
        }
        state.comments.remove(card_id);
        state.writes.cards_deleted += 1;
        Ok(())
    }

    async fn card_comments(&self, card_id: &str) -> Result<Vec<CardComment>> {
        if self.fail_comments {
            return Err(Error::CardStore("HTTP 503".into()));
        }
        Ok(self.comments(card_id))
    }

    async fn add_comment(&self, card_id: &str, text: &str) -> Result<()> {
        self.check_size(text)?;
        let mut state = self.state.lock().unwrap();
        let id = state.next_id("comment");
        state
            .comments
            .get_mut(card_id)
            .ok_or_else(|| missing("card", card_id))?
            .push(CardComment {
                id,
                text: text.to_string(),
            });
        state.writes.comments_added += 1;
        Ok(())
    }

    async fn update_comment(&self, card_id: &str, comment_id: &str, text: &str) -> Result<()> {
        self.check_size(text)?;
        let mut state = self.state.lock().unwrap();
        let comment = state
            .comments
            .get_mut(card_id)
            .and_then(|comments| comments.iter_mut().find(|c| c.id == comment_id))
            .ok_or_else(|| missing("comment", comment_id))?;
        comment.text = text.to_string();
        state.writes.comments_updated += 1;
        Ok(())
    }

    async fn delete_comment(&self, card_id: &str, comment_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let comments = state
            .comments
            .get_mut(card_id)
            .ok_or_else(|| missing("card", card_id))?;
        comments.retain(|c| c.id != comment_id);
        state.writes.comments_deleted += 1;
        Ok(())
    }

    async fn cards_by_name(&self) -> Result<BTreeMap<String, Vec<CardHandle>>> {
        Ok(group_by_name(self.cards()))
    }

    fn payload_limit(&self) -> Option<usize> {
        if self.advertise_limit {
            self.reject_over
        } else {
            None
        }
    }
}

/// Issue source backed by fixed issue lists
#[derive(Default)]
pub struct MemorySource {
    issues: Mutex<HashMap<Relationship, Vec<Issue>>>,
    closed: HashSet<String>,
    failing: HashSet<Relationship>,
    fail_close_check: bool,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_issues(self, relationship: Relationship, issues: Vec<Issue>) -> Self {
        self.set_issues(relationship, issues);
        self
    }

    pub fn with_closed(mut self, issue_id: &str) -> Self {
        self.closed.insert(issue_id.to_string());
        self
    }

    pub fn with_failure(mut self, relationship: Relationship) -> Self {
        self.failing.insert(relationship);
        self
    }

    /// Fail every closed-state lookup
    pub fn with_failing_close_check(mut self) -> Self {
        self.fail_close_check = true;
        self
    }

    pub fn set_issues(&self, relationship: Relationship, issues: Vec<Issue>) {
        self.issues.lock().unwrap().insert(relationship, issues);
    }
}

#[async_trait]
impl IssueSource for MemorySource {
    async fn fetch(&self, relationship: Relationship) -> Result<Vec<Issue>> {
        if self.failing.contains(&relationship) {
            return Err(Error::IssueSource("GraphQL request failed".into()));
        }
        Ok(self
            .issues
            .lock()
            .unwrap()
            .get(&relationship)
            .cloned()
            .unwrap_or_default())
    }

    async fn is_closed(&self, _title: &str, issue_id: &str) -> Result<bool> {
        if self.fail_close_check {
            return Err(Error::IssueSource("search timed out".into()));
        }
        Ok(self.closed.contains(issue_id))
    }
}

/// Ledger that keeps entries in memory
#[derive(Default)]
pub struct MemoryLedger {
    entries: Mutex<HashMap<String, LedgerEntry>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self, issue_id: &str) -> Option<LedgerEntry> {
        self.entries.lock().unwrap().get(issue_id).cloned()
    }
}

#[async_trait]
impl SyncLedger for MemoryLedger {
    async fn find_issue(&self, issue_id: &str) -> Result<Option<LedgerEntry>> {
        Ok(self.entry(issue_id))
    }

    async fn find_by_card_name(&self, card_name: &str) -> Result<Option<LedgerEntry>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .values()
            .find(|e| e.card_name == card_name)
            .cloned())
    }

    async fn record_issue(&self, issue: &Issue, relationship: Relationship) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .entry(issue.id.clone())
            .or_insert_with(|| LedgerEntry {
                issue_id: issue.id.clone(),
                title: issue.title.clone(),
                card_name: issue.card_name(),
                relationship,
                card_ids: vec![],
            });
        entry.title = issue.title.clone();
        entry.card_name = issue.card_name();
        entry.relationship = relationship;
        Ok(())
    }

    async fn record_card(&self, issue_id: &str, card: &CardHandle) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .get_mut(issue_id)
            .ok_or_else(|| Error::Ledger(format!("issue {} not recorded", issue_id).into()))?;
        if !entry.card_ids.contains(&card.id) {
            entry.card_ids.push(card.id.clone());
        }
        Ok(())
    }

    async fn forget(&self, card_name: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .retain(|_, e| e.card_name != card_name);
        Ok(())
    }
}

/// Board layout with lists Todo, Review, Mentions, Done and a few labels
pub fn layout() -> BoardLayout {
    let lists = ["Todo", "Review", "Mentions", "Done"]
        .iter()
        .map(|name| (name.to_string(), format!("list-{}", name.to_lowercase())))
        .collect();
    let labels = ["assigned", "mentioned", "closed"]
        .iter()
        .map(|name| (name.to_string(), format!("label-{}", name)))
        .collect();
    BoardLayout::new(lists, labels)
}

/// Action config with create lists/labels and close lists
pub fn action_config(lists: &[&str], labels: &[&str], close_lists: &[&str]) -> ActionConfig {
    let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    ActionConfig {
        create: ActionPolicy {
            lists: strings(lists),
            labels: strings(labels),
        },
        update: None,
        close: ActionPolicy {
            lists: strings(close_lists),
            labels: vec![],
        },
    }
}

/// Issue with one comment per body, authored by `octocat`
pub fn issue(title: &str, repository: &str, comments: &[&str]) -> Issue {
    let id = format!("I_{}_{}", repository, title.replace(' ', "_"));
    Issue {
        id: id.clone(),
        title: title.to_string(),
        body: format!("Body of {}", title),
        repository: repository.to_string(),
        url: format!("https://github.com/acme/{}/issues/1", repository),
        created_at: None,
        comments: comments
            .iter()
            .enumerate()
            .map(|(idx, body)| Comment {
                author: "octocat".to_string(),
                body: body.to_string(),
                url: format!("https://github.com/acme/{}/issues/1#c{}", repository, idx),
            })
            .collect(),
    }
}
