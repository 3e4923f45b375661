//! SQLite implementation of [`TopicStore`].
//!
//! Uses prepared statements, and a transaction for every multi-row write.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use super::TopicStore;
use crate::errors::AppError;
use crate::models::{
    BookTopic, NewTopic, PendingTopic, RevisionInfo, Topic, TopicKind, TopicUpdate,
};

const TOPIC_COLUMNS: &str =
    "id, name, parent_id, level, deleted, created_at, updated_at, version";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }

    /// Get revision info.
    pub async fn get_revision_info(&self) -> Result<RevisionInfo, AppError> {
        let row = sqlx::query("SELECT revision_id, generated_at FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(RevisionInfo {
            revision_id: row.get("revision_id"),
            generated_at: row.get("generated_at"),
        })
    }

    /// Increment the revision ID and return the new value.
    pub async fn increment_revision(&self) -> Result<i64, AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
            .bind(&now)
            .execute(&self.pool)
            .await?;
        self.get_revision_id().await
    }

    async fn get_assignment(
        &self,
        book_id: i64,
        topic_id: i64,
    ) -> Result<Option<BookTopic>, AppError> {
        let row = sqlx::query(
            "SELECT book_id, topic_id, deleted, created_at FROM book_topics WHERE book_id = ? AND topic_id = ?",
        )
        .bind(book_id)
        .bind(topic_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(assignment_from_row))
    }
}

#[async_trait]
impl TopicStore for Repository {
    // ==================== TOPIC OPERATIONS ====================

    async fn get_by_id(&self, id: i64) -> Result<Option<Topic>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM topics WHERE id = ? AND deleted = 0",
            TOPIC_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(topic_from_row))
    }

    async fn list_by_ids(&self, ids: &[i64]) -> Result<Vec<Topic>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM topics WHERE deleted = 0 AND id IN (",
            TOPIC_COLUMNS
        ));
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY id");

        let rows = query.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(topic_from_row).collect())
    }

    async fn list_topics(&self) -> Result<Vec<Topic>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM topics WHERE deleted = 0 ORDER BY id",
            TOPIC_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(topic_from_row).collect())
    }

    async fn save_new(&self, topic: &NewTopic) -> Result<Topic, AppError> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO topics (name, parent_id, level, deleted, created_at, updated_at, version) VALUES (?, ?, ?, 0, ?, ?, 1)",
        )
        .bind(&topic.name)
        .bind(topic.kind.parent_id())
        .bind(topic.kind.level())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        Ok(Topic {
            id: result.last_insert_rowid(),
            name: topic.name.clone(),
            kind: topic.kind,
            deleted: false,
            created_at: now.clone(),
            updated_at: now,
            version: 1,
        })
    }

    async fn save_subtree(&self, nodes: &[PendingTopic]) -> Result<Vec<i64>, AppError> {
        // Dropping `tx` on any early return rolls the whole subtree back.
        let mut tx = self.pool.begin().await.map_err(transaction_error)?;
        let now = Utc::now().to_rfc3339();
        let mut ids: Vec<i64> = Vec::with_capacity(nodes.len());

        for node in nodes {
            let parent_id = match node.parent_slot {
                Some(slot) => Some(*ids.get(slot).ok_or_else(|| {
                    AppError::Transaction(format!(
                        "Import node {:?} references unknown parent slot {}",
                        node.name, slot
                    ))
                })?),
                None => None,
            };

            let result = sqlx::query(
                "INSERT INTO topics (name, parent_id, level, deleted, created_at, updated_at, version) VALUES (?, ?, ?, 0, ?, ?, 1)",
            )
            .bind(&node.name)
            .bind(parent_id)
            .bind(node.level)
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(transaction_error)?;

            ids.push(result.last_insert_rowid());
        }

        // Increment revision once for the entire subtree
        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(transaction_error)?;

        tx.commit().await.map_err(transaction_error)?;

        Ok(ids)
    }

    async fn update_existing(&self, update: &TopicUpdate) -> Result<bool, AppError> {
        let now = Utc::now().to_rfc3339();

        // Conditional UPDATE with version check to prevent lost updates
        let result = sqlx::query(
            "UPDATE topics SET name = ?, level = COALESCE(?, level), updated_at = ?, version = version + 1 WHERE id = ? AND version = ? AND deleted = 0",
        )
        .bind(&update.name)
        .bind(update.level)
        .bind(&now)
        .bind(update.id)
        .bind(update.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        self.increment_revision().await?;
        Ok(true)
    }

    async fn soft_delete(&self, id: i64) -> Result<bool, AppError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE topics SET deleted = 1, updated_at = ?, version = version + 1 WHERE id = ? AND deleted = 0",
        )
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        self.increment_revision().await?;
        Ok(true)
    }

    // ==================== ASSIGNMENT OPERATIONS ====================

    async fn list_assignments(&self, book_id: i64) -> Result<Vec<BookTopic>, AppError> {
        let rows = sqlx::query(
            "SELECT book_id, topic_id, deleted, created_at FROM book_topics WHERE book_id = ? ORDER BY id",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(assignment_from_row).collect())
    }

    async fn assign(&self, book_id: i64, topic_id: i64) -> Result<BookTopic, AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"INSERT INTO book_topics (book_id, topic_id, deleted, created_at)
               VALUES (?, ?, 0, ?)
               ON CONFLICT (book_id, topic_id) DO UPDATE SET deleted = 0"#,
        )
        .bind(book_id)
        .bind(topic_id)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        self.get_assignment(book_id, topic_id).await?.ok_or_else(|| {
            AppError::Internal(format!(
                "Assignment of topic {} to book {} vanished after insert",
                topic_id, book_id
            ))
        })
    }

    async fn unassign(&self, book_id: i64, topic_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE book_topics SET deleted = 1 WHERE book_id = ? AND topic_id = ? AND deleted = 0",
        )
        .bind(book_id)
        .bind(topic_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        self.increment_revision().await?;
        Ok(true)
    }
}

fn transaction_error(err: sqlx::Error) -> AppError {
    tracing::error!("Subtree import rolled back: {:?}", err);
    AppError::Transaction(format!("Subtree import rolled back: {}", err))
}

// Helper functions for row conversion

fn topic_from_row(row: &sqlx::sqlite::SqliteRow) -> Topic {
    let deleted: i32 = row.get("deleted");
    Topic {
        id: row.get("id"),
        name: row.get("name"),
        kind: TopicKind::classify(row.get("parent_id"), row.get("level")),
        deleted: deleted != 0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    }
}

fn assignment_from_row(row: &sqlx::sqlite::SqliteRow) -> BookTopic {
    let deleted: i32 = row.get("deleted");
    BookTopic {
        book_id: row.get("book_id"),
        topic_id: row.get("topic_id"),
        deleted: deleted != 0,
        created_at: row.get("created_at"),
    }
}
