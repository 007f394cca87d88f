//! Action configuration: which lists and labels apply at each lifecycle phase
//!
//! Each [`Relationship`] carries its own [`ActionConfig`], selected through
//! [`RelationshipActions`] rather than by branching on the relationship.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Relationship;

/// Lists and labels for one lifecycle phase
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ActionPolicy {
    /// Names of the lists a card should exist on
    pub lists: Vec<String>,
    /// Names of the labels applied to those cards
    pub labels: Vec<String>,
}

/// Create, update and close policies for one relationship
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ActionConfig {
    /// Applied on the first sync of an issue
    pub create: ActionPolicy,
    /// Applied on later syncs; inherits `create` when absent
    pub update: Option<ActionPolicy>,
    /// Applied when the issue leaves the open set
    pub close: ActionPolicy,
}

impl ActionConfig {
    /// Policy for the given phase of an issue's sync
    pub fn policy(&self, first_sync: bool) -> &ActionPolicy {
        if first_sync {
            &self.create
        } else {
            self.update_policy()
        }
    }

    /// Effective update policy
    pub fn update_policy(&self) -> &ActionPolicy {
        self.update.as_ref().unwrap_or(&self.create)
    }

    /// Every policy in this config, for validation
    pub fn policies(&self) -> [&ActionPolicy; 3] {
        [&self.create, self.update_policy(), &self.close]
    }
}

/// Action configuration keyed by relationship
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "RelationshipTables", into = "RelationshipTables")]
pub struct RelationshipActions(BTreeMap<Relationship, ActionConfig>);

/// On-disk shape: one optional table per relationship
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
struct RelationshipTables {
    #[serde(skip_serializing_if = "Option::is_none")]
    assignee: Option<ActionConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mention: Option<ActionConfig>,
}

impl From<RelationshipTables> for RelationshipActions {
    fn from(tables: RelationshipTables) -> Self {
        let mut actions = RelationshipActions::new();
        if let Some(config) = tables.assignee {
            actions = actions.with(Relationship::Assignee, config);
        }
        if let Some(config) = tables.mention {
            actions = actions.with(Relationship::Mention, config);
        }
        actions
    }
}

impl From<RelationshipActions> for RelationshipTables {
    fn from(mut actions: RelationshipActions) -> Self {
        RelationshipTables {
            assignee: actions.0.remove(&Relationship::Assignee),
            mention: actions.0.remove(&Relationship::Mention),
        }
    }
}

impl RelationshipActions {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the actions for a relationship
    pub fn with(mut self, relationship: Relationship, config: ActionConfig) -> Self {
        self.0.insert(relationship, config);
        self
    }

    /// Actions for a relationship, if that category is configured
    pub fn get(&self, relationship: Relationship) -> Option<&ActionConfig> {
        self.0.get(&relationship)
    }

    /// Iterate configured relationships in sync order
    pub fn iter(&self) -> impl Iterator<Item = (Relationship, &ActionConfig)> {
        self.0.iter().map(|(r, c)| (*r, c))
    }

    /// Whether no relationship is configured
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
