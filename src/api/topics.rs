//! Topic API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use super::{error, respond, success, ApiResult};
use crate::db::TopicStore;
use crate::errors::AppError;
use crate::hierarchy::TopicHierarchy;
use crate::models::{CreateTopicRequest, Topic, TopicImportNode, UpdateTopicRequest};
use crate::AppState;

/// Result of a subtree import.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub root_id: i64,
}

/// GET /api/topics - List all live topics.
pub async fn list_topics(State(state): State<AppState>) -> ApiResult<Vec<Topic>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_topics().await {
        Ok(topics) => success(topics, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/topics/:id - Get a single topic.
pub async fn get_topic(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Topic> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_by_id(id).await {
        Ok(Some(topic)) => success(topic, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Topic {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/topics - Create a flat tag.
pub async fn create_topic(
    State(state): State<AppState>,
    Json(request): Json<CreateTopicRequest>,
) -> ApiResult<Topic> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let result = TopicHierarchy::new(state.repo.as_ref())
        .create_flat_tag(&request)
        .await;
    respond(&state, revision_id, result).await
}

/// POST /api/topics/import - Import a nested topic tree.
pub async fn import_topics(
    State(state): State<AppState>,
    Json(request): Json<TopicImportNode>,
) -> ApiResult<ImportResponse> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let result = TopicHierarchy::new(state.repo.as_ref())
        .import_subtree(&request)
        .await
        .map(|root_id| ImportResponse { root_id });
    respond(&state, revision_id, result).await
}

/// PUT /api/topics/:id - Rename a topic or move a flat tag's level.
pub async fn update_topic(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateTopicRequest>,
) -> ApiResult<Topic> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let result = TopicHierarchy::new(state.repo.as_ref())
        .update_topic(id, &request)
        .await;
    respond(&state, revision_id, result).await
}

/// DELETE /api/topics/:id - Soft-delete a topic.
pub async fn delete_topic(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    let result = TopicHierarchy::new(state.repo.as_ref())
        .delete_topic(id)
        .await;
    respond(&state, revision_id, result).await
}

/// GET /api/topics/:id/ancestors - Root-first ancestor chain of a topic.
pub async fn get_ancestors(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<Topic>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match TopicHierarchy::new(state.repo.as_ref())
        .ancestor_closure(id)
        .await
    {
        Ok(chain) => success(chain, revision_id),
        Err(e) => error(e, revision_id),
    }
}
