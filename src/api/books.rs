//! Book topic API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{error, respond, success, ApiResult};
use crate::hierarchy::TopicHierarchy;
use crate::models::{AssignTopicRequest, BookTopic, Topic, TopicPath, TopicTreeNode};
use crate::AppState;

/// GET /api/books/:book_id/topics - Hierarchical topics of a book, ancestors included.
pub async fn list_book_topics(
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
) -> ApiResult<Vec<Topic>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match TopicHierarchy::new(state.repo.as_ref())
        .topics_for_item(book_id)
        .await
    {
        Ok(topics) => success(topics, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/books/:book_id/topics/tree - Display forest for a book.
pub async fn get_book_topic_tree(
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
) -> ApiResult<Vec<TopicTreeNode>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match TopicHierarchy::new(state.repo.as_ref())
        .tree_for_item(book_id)
        .await
    {
        Ok(forest) => success(forest, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/books/:book_id/topics/paths - Breadcrumbs for a book's assigned topics.
pub async fn get_book_topic_paths(
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
) -> ApiResult<Vec<TopicPath>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match TopicHierarchy::new(state.repo.as_ref())
        .paths_for_item(book_id)
        .await
    {
        Ok(paths) => success(paths, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/books/:book_id/tags - Flat tags assigned to a book.
pub async fn list_book_tags(
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
) -> ApiResult<Vec<Topic>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match TopicHierarchy::new(state.repo.as_ref())
        .flat_tags_for_item(book_id)
        .await
    {
        Ok(tags) => success(tags, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/books/:book_id/topics - Assign a topic to a book.
pub async fn assign_book_topic(
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
    Json(request): Json<AssignTopicRequest>,
) -> ApiResult<BookTopic> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let result = TopicHierarchy::new(state.repo.as_ref())
        .index()
        .assign(book_id, request.topic_id)
        .await;
    respond(&state, revision_id, result).await
}

/// DELETE /api/books/:book_id/topics/:topic_id - Remove a topic from a book.
pub async fn unassign_book_topic(
    State(state): State<AppState>,
    Path((book_id, topic_id)): Path<(i64, i64)>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let result = TopicHierarchy::new(state.repo.as_ref())
        .index()
        .unassign(book_id, topic_id)
        .await;
    respond(&state, revision_id, result).await
}
