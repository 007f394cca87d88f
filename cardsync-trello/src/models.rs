//! Trello REST wire types

use cardsync_core::{CardComment, CardHandle};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Board {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct List {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Label {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Card {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub desc: String,
    pub id_list: String,
    #[serde(default)]
    pub id_labels: Vec<String>,
}

impl From<Card> for CardHandle {
    fn from(card: Card) -> Self {
        CardHandle {
            id: card.id,
            name: card.name,
            desc: card.desc,
            list_id: card.id_list,
            label_ids: card.id_labels,
        }
    }
}

/// A `commentCard` action
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Action {
    pub id: String,
    pub data: ActionData,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ActionData {
    pub text: String,
}

impl From<Action> for CardComment {
    fn from(action: Action) -> Self {
        CardComment {
            id: action.id,
            text: action.data.text,
        }
    }
}

/// Body for creating a card
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateCard<'a> {
    pub name: &'a str,
    pub desc: &'a str,
    pub id_list: &'a str,
    pub id_labels: String,
    pub pos: &'static str,
}

/// Body for updating a card; absent fields are left alone
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateCard<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_labels: Option<String>,
}

/// Body for adding or editing a comment
#[derive(Debug, Serialize)]
pub(crate) struct CommentText<'a> {
    pub text: &'a str,
}
