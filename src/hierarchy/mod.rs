//! Topic hierarchy engine.
//!
//! The taxonomy is a parent-pointer forest kept in a [`TopicStore`]. Every
//! query here is a snapshot read that walks the forest one hop at a time;
//! imports are the only multi-row write and go through a single transaction.

mod index;
pub mod path;
mod sanitize;

pub use index::BookTopicIndex;
pub use sanitize::sanitize;

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::db::TopicStore;
use crate::errors::AppError;
use crate::models::{
    CreateTopicRequest, NewTopic, PendingTopic, Topic, TopicImportNode, TopicKind, TopicPath,
    TopicTreeNode, TopicUpdate, UpdateTopicRequest, FLAT_TAG_LEVEL,
};

/// Import, closure and reconstruction operations over a [`TopicStore`].
pub struct TopicHierarchy<'a, S: TopicStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: TopicStore + ?Sized> TopicHierarchy<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn index(&self) -> BookTopicIndex<'a, S> {
        BookTopicIndex::new(self.store)
    }

    // ==================== MUTATIONS ====================

    /// Persist a nested name tree as a new root and its descendants.
    ///
    /// Nodes are written depth-first with siblings in input order, so ids
    /// grow in that order too. Same-named roots are never merged.
    pub async fn import_subtree(&self, tree: &TopicImportNode) -> Result<i64, AppError> {
        let nodes = flatten_import(tree)?;
        let ids = self.store.save_subtree(&nodes).await?;
        let root_id = ids.first().copied().ok_or_else(|| {
            AppError::Transaction("Subtree import persisted no nodes".to_string())
        })?;

        tracing::info!(
            root_id,
            root = %nodes[0].name,
            nodes = ids.len(),
            "Imported topic subtree"
        );
        Ok(root_id)
    }

    /// Create a standalone label outside every tree.
    pub async fn create_flat_tag(&self, request: &CreateTopicRequest) -> Result<Topic, AppError> {
        let name = required_name(&request.name)?;
        let level = request.level.unwrap_or(FLAT_TAG_LEVEL);
        if level < FLAT_TAG_LEVEL {
            return Err(AppError::Validation(format!(
                "Flat tag level must be at least {}",
                FLAT_TAG_LEVEL
            )));
        }

        let topic = self
            .store
            .save_new(&NewTopic {
                name,
                kind: TopicKind::FlatTag { level: Some(level) },
            })
            .await?;

        tracing::info!(topic_id = topic.id, name = %topic.name, "Created flat tag");
        Ok(topic)
    }

    /// Rename any topic, or move a flat tag to another sentinel level.
    ///
    /// Structural changes (re-parenting, re-levelling tree nodes) are rejected.
    pub async fn update_topic(
        &self,
        id: i64,
        request: &UpdateTopicRequest,
    ) -> Result<Topic, AppError> {
        let topic = self.require_topic(id).await?;

        if let Some(expected) = request.expected_version {
            if topic.version != expected {
                return Err(AppError::Conflict {
                    message: format!(
                        "Version mismatch: expected {}, current {}",
                        expected, topic.version
                    ),
                    current_version: topic.version,
                });
            }
        }

        let mut update = TopicUpdate {
            id,
            version: topic.version,
            name: topic.name.clone(),
            level: None,
        };

        if let Some(name) = &request.name {
            update.name = required_name(name)?;
        }

        if let Some(level) = request.level {
            match topic.kind {
                TopicKind::FlatTag { .. } if level >= FLAT_TAG_LEVEL => {
                    update.level = Some(level);
                }
                TopicKind::FlatTag { .. } => {
                    return Err(AppError::Validation(format!(
                        "Flat tag level must be at least {}",
                        FLAT_TAG_LEVEL
                    )));
                }
                _ if topic.level() == Some(level) => {}
                _ => {
                    return Err(AppError::Validation(format!(
                        "Topic {} is part of a hierarchy; its level cannot change",
                        id
                    )));
                }
            }
        }

        if !self.store.update_existing(&update).await? {
            let current = self.store.get_by_id(id).await?;
            return Err(AppError::Conflict {
                message: "Concurrent modification detected".to_string(),
                current_version: current.map(|t| t.version).unwrap_or(0),
            });
        }

        self.require_topic(id).await
    }

    /// Soft-delete a topic. Children and assignments are left in place.
    pub async fn delete_topic(&self, id: i64) -> Result<(), AppError> {
        if !self.store.soft_delete(id).await? {
            return Err(AppError::NotFound(format!("Topic {} not found", id)));
        }
        tracing::info!(topic_id = id, "Topic deleted");
        Ok(())
    }

    // ==================== QUERIES ====================

    /// The chain from the topmost reachable ancestor down to `topic_id`.
    ///
    /// A parent that no longer exists ends the chain early. Revisiting an id
    /// fails with [`AppError::CycleDetected`].
    pub async fn ancestor_closure(&self, topic_id: i64) -> Result<Vec<Topic>, AppError> {
        let start = self.require_topic(topic_id).await?;

        let mut visited = HashSet::from([start.id]);
        let mut next = start.parent_id();
        let mut chain = vec![start];

        while let Some(parent_id) = next {
            if !visited.insert(parent_id) {
                tracing::warn!(topic_id, parent_id, "Cycle in topic ancestor chain");
                return Err(AppError::CycleDetected {
                    topic_id: parent_id,
                });
            }

            match self.store.get_by_id(parent_id).await? {
                Some(parent) => {
                    next = parent.parent_id();
                    chain.push(parent);
                }
                None => {
                    tracing::warn!(
                        topic_id,
                        missing_parent = parent_id,
                        "Ancestor chain truncated at missing topic"
                    );
                    break;
                }
            }
        }

        chain.reverse();
        tracing::debug!(topic_id, hops = chain.len() - 1, "Walked ancestor chain");
        Ok(chain)
    }

    /// Union of the ancestor chains of every topic assigned to `book_id`,
    /// without flat tags. Ordered by id.
    pub async fn topics_for_item(&self, book_id: i64) -> Result<Vec<Topic>, AppError> {
        let mut union: BTreeMap<i64, Topic> = BTreeMap::new();

        for topic_id in self.index().topic_ids(book_id).await? {
            let Some(chain) = self.assigned_closure(book_id, topic_id).await? else {
                continue;
            };
            for topic in chain.into_iter().filter(Topic::is_hierarchical) {
                union.entry(topic.id).or_insert(topic);
            }
        }

        Ok(union.into_values().collect())
    }

    /// Display forest of the hierarchical topics relevant to `book_id`.
    pub async fn tree_for_item(&self, book_id: i64) -> Result<Vec<TopicTreeNode>, AppError> {
        let topics = self.topics_for_item(book_id).await?;
        Ok(build_forest(topics))
    }

    /// One breadcrumb per directly assigned hierarchical topic.
    pub async fn paths_for_item(&self, book_id: i64) -> Result<Vec<TopicPath>, AppError> {
        let mut paths = Vec::new();

        for topic_id in self.index().topic_ids(book_id).await? {
            let Some(chain) = self.assigned_closure(book_id, topic_id).await? else {
                continue;
            };
            let chain: Vec<Topic> = chain.into_iter().filter(Topic::is_hierarchical).collect();
            if chain.is_empty() {
                continue;
            }

            paths.push(TopicPath {
                topic_id,
                path: path::format(&chain),
                depth: path::depth_of(&chain),
            });
        }

        Ok(paths)
    }

    /// Directly assigned flat tags. No closure expansion.
    pub async fn flat_tags_for_item(&self, book_id: i64) -> Result<Vec<Topic>, AppError> {
        let topic_ids = self.index().topic_ids(book_id).await?;
        let topics = self.store.list_by_ids(&topic_ids).await?;
        Ok(topics.into_iter().filter(Topic::is_flat_tag).collect())
    }

    async fn require_topic(&self, id: i64) -> Result<Topic, AppError> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Topic {} not found", id)))
    }

    /// Closure of an assigned topic; `None` when the assignment dangles.
    async fn assigned_closure(
        &self,
        book_id: i64,
        topic_id: i64,
    ) -> Result<Option<Vec<Topic>>, AppError> {
        match self.ancestor_closure(topic_id).await {
            Ok(chain) => Ok(Some(chain)),
            Err(AppError::NotFound(_)) => {
                tracing::warn!(book_id, topic_id, "Skipping assignment to missing topic");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

fn required_name(raw: &str) -> Result<String, AppError> {
    let name = sanitize(raw);
    if name.is_empty() {
        return Err(AppError::Validation("Topic name is required".to_string()));
    }
    Ok(name)
}

/// Flatten an import tree depth-first, assigning levels from 0 at the root.
///
/// Only the root name is validated here; a blank descendant is rejected by
/// the store and rolls the whole import back.
fn flatten_import(tree: &TopicImportNode) -> Result<Vec<PendingTopic>, AppError> {
    let mut nodes = vec![PendingTopic {
        name: required_name(&tree.name)?,
        parent_slot: None,
        level: 0,
    }];
    push_children(&tree.children, 0, 1, &mut nodes)?;
    Ok(nodes)
}

fn push_children(
    children: &[TopicImportNode],
    parent_slot: usize,
    level: i32,
    out: &mut Vec<PendingTopic>,
) -> Result<(), AppError> {
    if children.is_empty() {
        return Ok(());
    }
    if level >= FLAT_TAG_LEVEL {
        return Err(AppError::Validation(format!(
            "Import nesting exceeds {} levels",
            FLAT_TAG_LEVEL
        )));
    }

    for child in children {
        let slot = out.len();
        out.push(PendingTopic {
            name: sanitize(&child.name),
            parent_slot: Some(parent_slot),
            level,
        });
        push_children(&child.children, slot, level + 1, out)?;
    }
    Ok(())
}

/// Assemble hierarchical topics into a forest.
///
/// A node whose parent is not in `topics` becomes a root of its own. Nodes
/// left unplaced after that (members of a parent cycle) are promoted too, so
/// every hierarchical input appears exactly once.
pub fn build_forest(topics: Vec<Topic>) -> Vec<TopicTreeNode> {
    let by_id: BTreeMap<i64, Topic> = topics
        .into_iter()
        .filter(Topic::is_hierarchical)
        .map(|t| (t.id, t))
        .collect();

    let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
    let mut roots = Vec::new();
    for topic in by_id.values() {
        match topic.parent_id() {
            Some(parent_id) if parent_id != topic.id && by_id.contains_key(&parent_id) => {
                children.entry(parent_id).or_default().push(topic.id);
            }
            _ => roots.push(topic.id),
        }
    }

    let mut placed = HashSet::new();
    let mut forest: Vec<TopicTreeNode> = roots
        .into_iter()
        .filter_map(|id| assemble(id, &by_id, &children, &mut placed))
        .collect();

    for id in by_id.keys() {
        if let Some(node) = assemble(*id, &by_id, &children, &mut placed) {
            tracing::warn!(topic_id = id, "Promoted topic caught in a parent cycle");
            forest.push(node);
        }
    }

    forest
}

fn assemble(
    id: i64,
    by_id: &BTreeMap<i64, Topic>,
    children: &HashMap<i64, Vec<i64>>,
    placed: &mut HashSet<i64>,
) -> Option<TopicTreeNode> {
    if !placed.insert(id) {
        return None;
    }
    let topic = by_id.get(&id)?;

    let nested = children
        .get(&id)
        .map(|ids| {
            ids.iter()
                .filter_map(|child| assemble(*child, by_id, children, placed))
                .collect()
        })
        .unwrap_or_default();

    Some(TopicTreeNode {
        id,
        name: topic.name.clone(),
        parent_id: topic.parent_id(),
        level: topic.level().unwrap_or(0),
        children: nested,
    })
}
