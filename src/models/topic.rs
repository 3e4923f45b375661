//! Topic model: a node in the book taxonomy forest.

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// Depth stored for flat tags created without an explicit level.
pub const FLAT_TAG_LEVEL: i32 = 100;

/// Structural role of a topic, fixed when the row is loaded or created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicKind {
    /// Top of an imported subtree, level 0.
    Root,
    /// Hierarchical node hanging off `parent_id`.
    Child { parent_id: i64, level: i32 },
    /// Standalone label with no ancestor chain.
    FlatTag { level: Option<i32> },
}

impl TopicKind {
    /// Classify a stored `(parent_id, level)` pair.
    ///
    /// Only a parentless row at level 0 is a root. A level of
    /// [`FLAT_TAG_LEVEL`] or above never participates in a tree. Every other
    /// shape that fits neither a root nor a child is read as a flat tag and
    /// keeps its stored level.
    pub fn classify(parent_id: Option<i64>, level: Option<i32>) -> Self {
        match (parent_id, level) {
            (None, Some(0)) => TopicKind::Root,
            (Some(parent_id), Some(level)) if (0..FLAT_TAG_LEVEL).contains(&level) => {
                TopicKind::Child { parent_id, level }
            }
            _ => TopicKind::FlatTag { level },
        }
    }

    fn tag(&self) -> &'static str {
        match self {
            TopicKind::Root => "root",
            TopicKind::Child { .. } => "child",
            TopicKind::FlatTag { .. } => "flatTag",
        }
    }

    pub fn parent_id(&self) -> Option<i64> {
        match self {
            TopicKind::Child { parent_id, .. } => Some(*parent_id),
            _ => None,
        }
    }

    pub fn level(&self) -> Option<i32> {
        match self {
            TopicKind::Root => Some(0),
            TopicKind::Child { level, .. } => Some(*level),
            TopicKind::FlatTag { level } => *level,
        }
    }

    pub fn is_hierarchical(&self) -> bool {
        !matches!(self, TopicKind::FlatTag { .. })
    }
}

/// Emits `kind`, `parentId` for children, and `level` for every kind.
impl Serialize for TopicKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("kind", self.tag())?;
        if let Some(parent_id) = self.parent_id() {
            map.serialize_entry("parentId", &parent_id)?;
        }
        map.serialize_entry("level", &self.level())?;
        map.end()
    }
}

/// A taxonomy node as stored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: i64,
    pub name: String,
    #[serde(flatten)]
    pub kind: TopicKind,
    pub deleted: bool,
    pub created_at: String,
    pub updated_at: String,
    /// Internal version for optimistic concurrency control
    pub version: i64,
}

impl Topic {
    pub fn parent_id(&self) -> Option<i64> {
        self.kind.parent_id()
    }

    pub fn level(&self) -> Option<i32> {
        self.kind.level()
    }

    pub fn is_hierarchical(&self) -> bool {
        self.kind.is_hierarchical()
    }

    pub fn is_flat_tag(&self) -> bool {
        !self.is_hierarchical()
    }
}

/// One node of a nested import request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicImportNode {
    #[serde(alias = "title")]
    pub name: String,
    #[serde(default)]
    pub children: Vec<TopicImportNode>,
}

impl TopicImportNode {
    pub fn new(name: impl Into<String>, children: Vec<TopicImportNode>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }

    pub fn leaf(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }
}

/// A topic about to be inserted on its own.
#[derive(Debug, Clone)]
pub struct NewTopic {
    pub name: String,
    pub kind: TopicKind,
}

/// Columns written by a version-checked topic update.
///
/// `level` is `None` when the stored level must stay as it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicUpdate {
    pub id: i64,
    pub version: i64,
    pub name: String,
    pub level: Option<i32>,
}

/// A node of an import flattened in depth-first order.
///
/// `parent_slot` indexes an earlier entry of the same batch; the store resolves
/// it to the id that entry received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTopic {
    pub name: String,
    pub parent_slot: Option<usize>,
    pub level: i32,
}

/// Request body for creating a flat tag.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTopicRequest {
    pub name: String,
    #[serde(default)]
    pub level: Option<i32>,
}

/// Request body for updating an existing topic.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTopicRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub level: Option<i32>,
    /// Expected version for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<i64>,
}
