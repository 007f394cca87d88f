//! Board resolution and the [`CardStore`] implementation

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use cardsync_core::config::TrelloConfig;
use cardsync_core::{
    group_by_name, BoardLayout, CardComment, CardHandle, CardStore, CardUpdate, NewCard,
};
use tracing::{debug, info};

use crate::models::{Action, Board, Card, CommentText, CreateCard, Label, List, UpdateCard};
use crate::{Error, Result, TrelloClient};

const CARD_FIELDS: &str = "name,desc,idList,idLabels";

/// One Trello board used as a card store
pub struct TrelloBoard {
    client: TrelloClient,
    board_id: String,
    name: String,
}

impl TrelloBoard {
    /// Find the configured board and build its list and label maps
    pub async fn connect(client: TrelloClient, config: &TrelloConfig) -> Result<(Self, BoardLayout)> {
        let boards: Vec<Board> = client
            .get("members/me/boards", &[("filter", "open"), ("fields", "name")])
            .await?;
        let board = boards
            .into_iter()
            .find(|b| b.name == config.board)
            .ok_or_else(|| Error::BoardNotFound(config.board.clone()))?;

        let store = Self {
            client,
            board_id: board.id,
            name: board.name,
        };

        let lists: Vec<List> = store
            .client
            .get(
                &format!("boards/{}/lists", store.board_id),
                &[("filter", "open"), ("fields", "name")],
            )
            .await?;
        let lists = lists.into_iter().map(|l| (l.name, l.id)).collect();

        let labels = if !config.labels.is_empty() {
            config.labels.clone()
        } else if let Some(label_card) = &config.label_card {
            store.labels_from_card(label_card).await?
        } else {
            return Err(Error::NoLabelSource);
        };

        info!(board = %store.name, board_id = %store.board_id, "Connected to Trello board");
        Ok((store, BoardLayout::new(lists, labels)))
    }

    /// Board ID
    pub fn id(&self) -> &str {
        &self.board_id
    }

    /// Board name
    pub fn name(&self) -> &str {
        &self.name
    }

    async fn labels_from_card(&self, card_name: &str) -> Result<HashMap<String, String>> {
        let card = self
            .open_cards()
            .await?
            .into_iter()
            .find(|c| c.name == card_name)
            .ok_or_else(|| Error::LabelCardNotFound(card_name.to_string()))?;

        let labels: Vec<Label> = self
            .client
            .get(
                &format!("boards/{}/labels", self.board_id),
                &[("fields", "name"), ("limit", "1000")],
            )
            .await?;

        Ok(label_map(&card, labels))
    }

    async fn open_cards(&self) -> Result<Vec<Card>> {
        self.client
            .get(
                &format!("boards/{}/cards/open", self.board_id),
                &[("fields", CARD_FIELDS)],
            )
            .await
    }
}

/// Name to ID map for the named labels attached to `card`
fn label_map(card: &Card, labels: Vec<Label>) -> HashMap<String, String> {
    labels
        .into_iter()
        .filter(|l| !l.name.is_empty() && card.id_labels.contains(&l.id))
        .map(|l| (l.name, l.id))
        .collect()
}

/// Comment actions arrive newest first
fn comments_oldest_first(actions: Vec<Action>) -> Vec<CardComment> {
    actions.into_iter().rev().map(CardComment::from).collect()
}

#[async_trait]
impl CardStore for TrelloBoard {
    async fn search_cards_by_name(&self, name: &str) -> cardsync_core::Result<Vec<CardHandle>> {
        Ok(self
            .open_cards()
            .await?
            .into_iter()
            .filter(|c| c.name == name)
            .map(CardHandle::from)
            .collect())
    }

    async fn create_card(&self, card: &NewCard) -> cardsync_core::Result<CardHandle> {
        self.client.check_text(&card.desc)?;
        let body = CreateCard {
            name: &card.name,
            desc: &card.desc,
            id_list: &card.list_id,
            id_labels: card.label_ids.join(","),
            pos: "top",
        };
        let created: Card = self
            .client
            .post("cards", &body, card.desc.chars().count())
            .await?;
        debug!(card_id = %created.id, list_id = %created.id_list, "Created Trello card");
        Ok(created.into())
    }

    async fn update_card(&self, card_id: &str, update: &CardUpdate) -> cardsync_core::Result<()> {
        let length = match &update.desc {
            Some(desc) => {
                self.client.check_text(desc)?;
                desc.chars().count()
            }
            None => 0,
        };
        let body = UpdateCard {
            desc: update.desc.as_deref(),
            id_labels: update.label_ids.as_ref().map(|ids| ids.join(",")),
        };
        self.client
            .put(&format!("cards/{}", card_id), &body, length)
            .await?;
        Ok(())
    }

    async fn delete_card(&self, card_id: &str) -> cardsync_core::Result<()> {
        self.client.delete(&format!("cards/{}", card_id)).await?;
        Ok(())
    }

    async fn card_comments(&self, card_id: &str) -> cardsync_core::Result<Vec<CardComment>> {
        let actions: Vec<Action> = self
            .client
            .get(
                &format!("cards/{}/actions", card_id),
                &[("filter", "commentCard"), ("limit", "1000")],
            )
            .await?;
        Ok(comments_oldest_first(actions))
    }

    async fn add_comment(&self, card_id: &str, text: &str) -> cardsync_core::Result<()> {
        self.client.check_text(text)?;
        let _: serde_json::Value = self
            .client
            .post(
                &format!("cards/{}/actions/comments", card_id),
                &CommentText { text },
                text.chars().count(),
            )
            .await?;
        Ok(())
    }

    async fn update_comment(
        &self,
        card_id: &str,
        comment_id: &str,
        text: &str,
    ) -> cardsync_core::Result<()> {
        self.client.check_text(text)?;
        self.client
            .put(
                &format!("cards/{}/actions/{}/comments", card_id, comment_id),
                &CommentText { text },
                text.chars().count(),
            )
            .await?;
        Ok(())
    }

    async fn delete_comment(&self, card_id: &str, comment_id: &str) -> cardsync_core::Result<()> {
        self.client
            .delete(&format!("cards/{}/actions/{}/comments", card_id, comment_id))
            .await?;
        Ok(())
    }

    async fn cards_by_name(&self) -> cardsync_core::Result<BTreeMap<String, Vec<CardHandle>>> {
        let cards = self.open_cards().await?;
        Ok(group_by_name(cards.into_iter().map(CardHandle::from).collect()))
    }

    fn payload_limit(&self) -> Option<usize> {
        Some(self.client.max_text_length())
    }
}
