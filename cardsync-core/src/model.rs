//! Data model shared by the issue source, the card store and the engine
//!
//! Issues and comments are what the tracker returns; cards and card comments
//! are what the board holds. Comment sequences are always oldest first inside
//! this crate; collaborators normalize at their boundary.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix shared by every card name this tool generates
pub const CARD_NAME_PREFIX: &str = "**[github/";

/// Comment text substituted when the real text cannot be written
pub const PLACEHOLDER_COMMENT: &str = "(comment too large to sync)";

/// Why an issue is relevant to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    /// The user is an assignee of the issue
    Assignee,
    /// The user is mentioned in the issue but did not author it
    Mention,
}

impl Relationship {
    /// Every relationship, in the order categories are synced
    pub const ALL: [Relationship; 2] = [Relationship::Assignee, Relationship::Mention];

    /// Get the short name for this relationship
    pub fn name(&self) -> &'static str {
        match self {
            Relationship::Assignee => "assignee",
            Relationship::Mention => "mention",
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relationship::Assignee => write!(f, "assigned"),
            Relationship::Mention => write!(f, "mentioned"),
        }
    }
}

impl std::str::FromStr for Relationship {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "assignee" | "assigned" => Ok(Relationship::Assignee),
            "mention" | "mentioned" => Ok(Relationship::Mention),
            other => Err(format!("Unknown relationship: {}", other)),
        }
    }
}

/// A comment on a tracker issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Login of the comment author
    pub author: String,
    /// Markdown body
    pub body: String,
    /// Canonical URL of the comment
    pub url: String,
}

/// An issue fetched from the tracker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Opaque tracker-assigned ID, stable across syncs
    pub id: String,
    /// Issue title; empty for hollow search results
    pub title: String,
    /// Markdown body
    pub body: String,
    /// Name of the repository the issue lives in
    pub repository: String,
    /// Canonical URL of the issue
    pub url: String,
    /// When the issue was created
    pub created_at: Option<DateTime<Utc>>,
    /// Comments, oldest first
    pub comments: Vec<Comment>,
}

impl Issue {
    /// Whether this is a hollow node the search API sometimes returns
    pub fn is_hollow(&self) -> bool {
        self.title.trim().is_empty()
    }

    /// Canonical card name for this issue
    pub fn card_name(&self) -> String {
        card_name(&self.title, &self.repository)
    }

    /// Card description for this issue
    pub fn card_description(&self) -> String {
        card_description(&self.body, &self.url)
    }

    /// Card comment texts for this issue, oldest first
    pub fn comment_texts(&self) -> Vec<String> {
        self.comments.iter().map(comment_text).collect()
    }
}

/// A card on the board as last read from the card store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardHandle {
    /// Opaque card ID
    pub id: String,
    /// Display name
    pub name: String,
    /// Description text
    pub desc: String,
    /// ID of the list the card sits on
    pub list_id: String,
    /// IDs of the labels applied to the card
    pub label_ids: Vec<String>,
}

/// Fields for a card that does not exist yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCard {
    pub name: String,
    pub desc: String,
    pub list_id: String,
    pub label_ids: Vec<String>,
}

/// Fields to change on an existing card; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardUpdate {
    pub desc: Option<String>,
    pub label_ids: Option<Vec<String>>,
}

impl CardUpdate {
    /// Update that only re-applies labels
    pub fn labels(label_ids: &[String]) -> Self {
        Self {
            desc: None,
            label_ids: Some(label_ids.to_vec()),
        }
    }
}

/// A comment on a card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardComment {
    /// Opaque ID of the comment action
    pub id: String,
    /// Comment text
    pub text: String,
}

/// Card name for an issue; this is the join key between issues and cards
pub fn card_name(title: &str, repository: &str) -> String {
    format!("{}{}]** {}", CARD_NAME_PREFIX, repository, title)
}

/// Whether a card name looks like one generated by [`card_name`]
pub fn is_synced_card_name(name: &str) -> bool {
    name.starts_with(CARD_NAME_PREFIX) && name.contains("]** ")
}

/// Card description for an issue body and URL
pub fn card_description(body: &str, url: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        format!("---\nSynced from {}", url)
    } else {
        format!("{}\n\n---\nSynced from {}", body, url)
    }
}

/// Card comment text for a tracker comment
pub fn comment_text(comment: &Comment) -> String {
    let author = if comment.author.is_empty() {
        "ghost"
    } else {
        comment.author.as_str()
    };
    format!("**@{}** ([link]({})):\n\n{}", author, comment.url, comment.body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_name_format() {
        assert_eq!(card_name("Bug X", "app"), "**[github/app]** Bug X");
    }

    #[test]
    fn test_card_name_is_stable_and_distinct() {
        let pairs = [
            ("Bug X", "app"),
            ("Bug X", "api"),
            ("Bug Y", "app"),
            ("app", "Bug X"),
            ("", "app"),
        ];
        let names: Vec<String> = pairs.iter().map(|(t, r)| card_name(t, r)).collect();
        for (i, (title, repo)) in pairs.iter().enumerate() {
            assert_eq!(card_name(title, repo), names[i]);
            for (j, other) in names.iter().enumerate() {
                if i != j {
                    assert_ne!(&names[i], other);
                }
            }
        }
    }

    #[test]
    fn test_synced_card_name_detection() {
        assert!(is_synced_card_name(&card_name("Bug X", "app")));
        assert!(!is_synced_card_name("Labels"));
        assert!(!is_synced_card_name("**[github/app] not ours"));
    }

    #[test]
    fn test_card_description() {
        let desc = card_description("Steps to reproduce", "https://github.com/o/app/issues/1");
        assert_eq!(
            desc,
            "Steps to reproduce\n\n---\nSynced from https://github.com/o/app/issues/1"
        );
        assert_eq!(
            card_description("  ", "https://x"),
            "---\nSynced from https://x"
        );
    }

    #[test]
    fn test_comment_text() {
        let comment = Comment {
            author: "octocat".to_string(),
            body: "hello".to_string(),
            url: "https://x/c/1".to_string(),
        };
        assert_eq!(
            comment_text(&comment),
            "**@octocat** ([link](https://x/c/1)):\n\nhello"
        );

        let ghost = Comment {
            author: String::new(),
            ..comment
        };
        assert!(comment_text(&ghost).starts_with("**@ghost**"));
    }

    #[test]
    fn test_relationship_parse_and_display() {
        assert_eq!("assignee".parse::<Relationship>(), Ok(Relationship::Assignee));
        assert_eq!("Mentioned".parse::<Relationship>(), Ok(Relationship::Mention));
        assert!("author".parse::<Relationship>().is_err());
        assert_eq!(Relationship::Assignee.to_string(), "assigned");
        assert_eq!(Relationship::Mention.name(), "mention");
    }

    #[test]
    fn test_hollow_issue() {
        let issue = Issue {
            id: "I_1".to_string(),
            title: " ".to_string(),
            body: String::new(),
            repository: String::new(),
            url: String::new(),
            created_at: None,
            comments: vec![],
        };
        assert!(issue.is_hollow());
    }
}
