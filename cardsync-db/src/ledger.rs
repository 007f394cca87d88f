//! SQLite-backed [`SyncLedger`]

use async_trait::async_trait;
use cardsync_core::{CardHandle, Issue, LedgerEntry, Relationship, SyncLedger};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::{Error, Result};

#[derive(Debug, sqlx::FromRow)]
struct IssueRow {
    issue_id: String,
    title: String,
    card_name: String,
    relationship: String,
}

/// Ledger of synced issues and their cards
#[derive(Debug, Clone)]
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn entry(&self, row: Option<IssueRow>) -> Result<Option<LedgerEntry>> {
        let Some(row) = row else {
            return Ok(None);
        };

        let relationship: Relationship = row
            .relationship
            .parse()
            .map_err(Error::InvalidData)?;

        let card_ids: Vec<String> =
            sqlx::query_scalar("SELECT card_id FROM cards WHERE issue_id = ? ORDER BY rowid")
                .bind(&row.issue_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(Some(LedgerEntry {
            issue_id: row.issue_id,
            title: row.title,
            card_name: row.card_name,
            relationship,
            card_ids,
        }))
    }

    /// Look up an issue by tracker ID
    pub async fn get_issue(&self, issue_id: &str) -> Result<Option<LedgerEntry>> {
        let row = sqlx::query_as::<_, IssueRow>(
            "SELECT issue_id, title, card_name, relationship FROM issues WHERE issue_id = ?",
        )
        .bind(issue_id)
        .fetch_optional(&self.pool)
        .await?;
        self.entry(row).await
    }

    /// Look up the most recently synced issue with a card name
    pub async fn get_by_card_name(&self, card_name: &str) -> Result<Option<LedgerEntry>> {
        let row = sqlx::query_as::<_, IssueRow>(
            "SELECT issue_id, title, card_name, relationship FROM issues
             WHERE card_name = ? ORDER BY last_synced_at DESC LIMIT 1",
        )
        .bind(card_name)
        .fetch_optional(&self.pool)
        .await?;
        self.entry(row).await
    }

    /// Insert or refresh an issue
    pub async fn upsert_issue(&self, issue: &Issue, relationship: Relationship) -> Result<()> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO issues (
                issue_id, title, card_name, repository, url, relationship,
                first_synced_at, last_synced_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(issue_id) DO UPDATE SET
                title = excluded.title,
                card_name = excluded.card_name,
                repository = excluded.repository,
                url = excluded.url,
                relationship = excluded.relationship,
                last_synced_at = excluded.last_synced_at
            "#,
        )
        .bind(&issue.id)
        .bind(&issue.title)
        .bind(issue.card_name())
        .bind(&issue.repository)
        .bind(&issue.url)
        .bind(relationship.name())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert or refresh a card belonging to an issue
    pub async fn upsert_card(&self, issue_id: &str, card: &CardHandle) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cards (card_id, issue_id, list_id, synced_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(card_id) DO UPDATE SET
                issue_id = excluded.issue_id,
                list_id = excluded.list_id,
                synced_at = excluded.synced_at
            "#,
        )
        .bind(&card.id)
        .bind(issue_id)
        .bind(&card.list_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete every issue (and its cards) with a card name
    pub async fn delete_by_card_name(&self, card_name: &str) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "DELETE FROM cards WHERE issue_id IN (SELECT issue_id FROM issues WHERE card_name = ?)",
        )
        .bind(card_name)
        .execute(&mut *tx)
        .await?;
        let deleted = sqlx::query("DELETE FROM issues WHERE card_name = ?")
            .bind(card_name)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        debug!(card_name, deleted, "Forgot archived issue");
        Ok(deleted)
    }
}

#[async_trait]
impl SyncLedger for SqliteLedger {
    async fn find_issue(&self, issue_id: &str) -> cardsync_core::Result<Option<LedgerEntry>> {
        Ok(self.get_issue(issue_id).await?)
    }

    async fn find_by_card_name(&self, card_name: &str) -> cardsync_core::Result<Option<LedgerEntry>> {
        Ok(self.get_by_card_name(card_name).await?)
    }

    async fn record_issue(&self, issue: &Issue, relationship: Relationship) -> cardsync_core::Result<()> {
        Ok(self.upsert_issue(issue, relationship).await?)
    }

    async fn record_card(&self, issue_id: &str, card: &CardHandle) -> cardsync_core::Result<()> {
        Ok(self.upsert_card(issue_id, card).await?)
    }

    async fn forget(&self, card_name: &str) -> cardsync_core::Result<()> {
        self.delete_by_card_name(card_name).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use cardsync_core::Comment;
    use tempfile::TempDir;

    async fn setup_test_db() -> (SqliteLedger, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(temp_dir.path().join("state.db")).await.unwrap();
        (db.ledger(), temp_dir)
    }

    fn issue(id: &str, title: &str) -> Issue {
        Issue {
            id: id.to_string(),
            title: title.to_string(),
            body: "body".to_string(),
            repository: "app".to_string(),
            url: "https://github.com/acme/app/issues/1".to_string(),
            created_at: None,
            comments: vec![Comment {
                author: "octocat".to_string(),
                body: "hi".to_string(),
                url: "u".to_string(),
            }],
        }
    }

    fn card(id: &str, name: &str, list_id: &str) -> CardHandle {
        CardHandle {
            id: id.to_string(),
            name: name.to_string(),
            desc: String::new(),
            list_id: list_id.to_string(),
            label_ids: vec![],
        }
    }

    #[tokio::test]
    async fn test_unknown_issue() {
        let (ledger, _temp) = setup_test_db().await;
        assert!(ledger.find_issue("I_1").await.unwrap().is_none());
        assert!(ledger.find_by_card_name("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_and_find_issue() {
        let (ledger, _temp) = setup_test_db().await;
        let bug = issue("I_1", "Bug X");

        ledger.record_issue(&bug, Relationship::Mention).await.unwrap();
        ledger
            .record_card("I_1", &card("c1", &bug.card_name(), "l1"))
            .await
            .unwrap();
        ledger
            .record_card("I_1", &card("c2", &bug.card_name(), "l2"))
            .await
            .unwrap();

        let entry = ledger.find_issue("I_1").await.unwrap().unwrap();
        assert_eq!(entry.title, "Bug X");
        assert_eq!(entry.card_name, "**[github/app]** Bug X");
        assert_eq!(entry.relationship, Relationship::Mention);
        assert_eq!(entry.card_ids, vec!["c1".to_string(), "c2".to_string()]);

        let by_name = ledger
            .find_by_card_name("**[github/app]** Bug X")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_name.issue_id, "I_1");
    }

    #[tokio::test]
    async fn test_record_is_upsert() {
        let (ledger, _temp) = setup_test_db().await;
        let bug = issue("I_1", "Bug X");

        ledger.record_issue(&bug, Relationship::Mention).await.unwrap();
        ledger.record_issue(&bug, Relationship::Assignee).await.unwrap();
        ledger
            .record_card("I_1", &card("c1", &bug.card_name(), "l1"))
            .await
            .unwrap();
        ledger
            .record_card("I_1", &card("c1", &bug.card_name(), "l1"))
            .await
            .unwrap();

        let entry = ledger.find_issue("I_1").await.unwrap().unwrap();
        assert_eq!(entry.relationship, Relationship::Assignee);
        assert_eq!(entry.card_ids.len(), 1);
    }

    #[tokio::test]
    async fn test_forget_drops_issue_and_cards() {
        let (ledger, _temp) = setup_test_db().await;
        let bug = issue("I_1", "Bug X");
        let other = issue("I_2", "Other");

        ledger.record_issue(&bug, Relationship::Assignee).await.unwrap();
        ledger.record_issue(&other, Relationship::Assignee).await.unwrap();
        ledger
            .record_card("I_1", &card("c1", &bug.card_name(), "l1"))
            .await
            .unwrap();

        ledger.forget(&bug.card_name()).await.unwrap();

        assert!(ledger.find_issue("I_1").await.unwrap().is_none());
        assert!(ledger.find_issue("I_2").await.unwrap().is_some());
        let cards: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cards")
            .fetch_one(&ledger.pool)
            .await
            .unwrap();
        assert_eq!(cards.0, 0);
    }

    #[tokio::test]
    async fn test_card_for_unknown_issue_rejected() {
        let (ledger, _temp) = setup_test_db().await;
        let err = ledger
            .record_card("I_missing", &card("c1", "x", "l1"))
            .await
            .unwrap_err();
        assert!(matches!(err, cardsync_core::Error::Ledger(_)));
    }
}
