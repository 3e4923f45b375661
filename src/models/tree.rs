//! Display shapes derived from the taxonomy: nested trees and breadcrumb paths.

use serde::Serialize;

/// A hierarchical topic with its children attached.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TopicTreeNode {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    pub level: i32,
    pub children: Vec<TopicTreeNode>,
}

/// Breadcrumb for one assigned topic.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TopicPath {
    pub topic_id: i64,
    pub path: String,
    pub depth: usize,
}
