//! Persistence contract the taxonomy engine is written against.

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::{BookTopic, NewTopic, PendingTopic, Topic, TopicUpdate};

/// Key-indexed topic and assignment storage.
///
/// Soft-deleted topics are invisible to every read except `list_assignments`,
/// which returns assignment rows with their own `deleted` flag.
#[async_trait]
pub trait TopicStore: Send + Sync {
    async fn get_by_id(&self, id: i64) -> Result<Option<Topic>, AppError>;

    /// Missing or deleted ids are skipped. Results are ordered by id.
    async fn list_by_ids(&self, ids: &[i64]) -> Result<Vec<Topic>, AppError>;

    async fn list_topics(&self) -> Result<Vec<Topic>, AppError>;

    async fn save_new(&self, topic: &NewTopic) -> Result<Topic, AppError>;

    /// Insert a depth-first node list as one transaction and return the new
    /// ids in input order. On any failure nothing is persisted and the error
    /// is [`AppError::Transaction`].
    async fn save_subtree(&self, nodes: &[PendingTopic]) -> Result<Vec<i64>, AppError>;

    /// Apply `update` if the stored version still equals `update.version`.
    /// Only `name` and, when given, `level` are written; `parent_id` never is.
    async fn update_existing(&self, update: &TopicUpdate) -> Result<bool, AppError>;

    async fn soft_delete(&self, id: i64) -> Result<bool, AppError>;

    async fn list_assignments(&self, book_id: i64) -> Result<Vec<BookTopic>, AppError>;

    /// Create the assignment, or revive it if it was soft-deleted.
    async fn assign(&self, book_id: i64, topic_id: i64) -> Result<BookTopic, AppError>;

    async fn unassign(&self, book_id: i64, topic_id: i64) -> Result<bool, AppError>;
}
