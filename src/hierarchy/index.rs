//! Book-to-topic join table adapter.

use crate::db::TopicStore;
use crate::errors::AppError;
use crate::models::BookTopic;

/// Maps book ids to the topics assigned to them.
pub struct BookTopicIndex<'a, S: TopicStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: TopicStore + ?Sized> BookTopicIndex<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Live (not soft-deleted) assigned topic ids, in assignment order.
    pub async fn topic_ids(&self, book_id: i64) -> Result<Vec<i64>, AppError> {
        let assignments = self.store.list_assignments(book_id).await?;
        Ok(assignments
            .into_iter()
            .filter(|a| !a.deleted)
            .map(|a| a.topic_id)
            .collect())
    }

    pub async fn assign(&self, book_id: i64, topic_id: i64) -> Result<BookTopic, AppError> {
        if self.store.get_by_id(topic_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Topic {} not found", topic_id)));
        }

        let assignment = self.store.assign(book_id, topic_id).await?;
        tracing::debug!(book_id, topic_id, "Topic assigned");
        Ok(assignment)
    }

    pub async fn unassign(&self, book_id: i64, topic_id: i64) -> Result<(), AppError> {
        if !self.store.unassign(book_id, topic_id).await? {
            return Err(AppError::NotFound(format!(
                "Topic {} is not assigned to book {}",
                topic_id, book_id
            )));
        }
        Ok(())
    }
}
