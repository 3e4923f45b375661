//! Book-to-topic assignment model.

use serde::{Deserialize, Serialize};

/// Join record linking one book to one topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookTopic {
    pub book_id: i64,
    pub topic_id: i64,
    /// Soft-delete flag of the assignment itself, independent of the topic's
    #[serde(default)]
    pub deleted: bool,
    pub created_at: String,
}

/// Request body for assigning a topic to a book.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignTopicRequest {
    pub topic_id: i64,
}
