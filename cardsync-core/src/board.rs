//! Board layout: immutable list and label ID maps
//!
//! Built once at startup by the card store and passed by reference into the
//! engine and orchestrator. Every name referenced by the action configuration
//! is checked up front so that a missing mapping fails before the first write.

use std::collections::{BTreeSet, HashMap};

use crate::{ActionPolicy, Error, RelationshipActions, Result};

/// Name to ID maps for a board's lists and labels
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardLayout {
    lists: HashMap<String, String>,
    labels: HashMap<String, String>,
}

impl BoardLayout {
    /// Create a layout from list and label maps (name -> ID)
    pub fn new(lists: HashMap<String, String>, labels: HashMap<String, String>) -> Self {
        Self { lists, labels }
    }

    /// ID of the list with the given name
    pub fn list_id(&self, name: &str) -> Result<&str> {
        self.lists
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| Error::Config(format!("No list named \"{}\" on the board", name)))
    }

    /// ID of the label with the given name
    pub fn label_id(&self, name: &str) -> Result<&str> {
        self.labels
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| Error::Config(format!("No label named \"{}\" is known", name)))
    }

    /// IDs for a policy's lists, in configured order
    pub fn list_ids(&self, policy: &ActionPolicy) -> Result<Vec<String>> {
        policy
            .lists
            .iter()
            .map(|name| self.list_id(name).map(str::to_string))
            .collect()
    }

    /// IDs for a policy's labels, in configured order
    pub fn label_ids(&self, policy: &ActionPolicy) -> Result<Vec<String>> {
        policy
            .labels
            .iter()
            .map(|name| self.label_id(name).map(str::to_string))
            .collect()
    }

    /// List names, sorted
    pub fn list_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.lists.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Label names, sorted
    pub fn label_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.labels.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Check that every list and label named by the actions exists
    ///
    /// All missing names are reported together in one configuration error.
    pub fn validate(&self, actions: &RelationshipActions) -> Result<()> {
        let mut missing_lists = BTreeSet::new();
        let mut missing_labels = BTreeSet::new();

        for (_, config) in actions.iter() {
            for policy in config.policies() {
                for list in &policy.lists {
                    if !self.lists.contains_key(list) {
                        missing_lists.insert(list.as_str());
                    }
                }
                for label in &policy.labels {
                    if !self.labels.contains_key(label) {
                        missing_labels.insert(label.as_str());
                    }
                }
            }
        }

        if missing_lists.is_empty() && missing_labels.is_empty() {
            return Ok(());
        }

        let mut problems = Vec::new();
        if !missing_lists.is_empty() {
            problems.push(format!(
                "unknown lists: {}",
                missing_lists.into_iter().collect::<Vec<_>>().join(", ")
            ));
        }
        if !missing_labels.is_empty() {
            problems.push(format!(
                "unknown labels: {}",
                missing_labels.into_iter().collect::<Vec<_>>().join(", ")
            ));
        }
        Err(Error::Config(problems.join("; ")))
    }
}
