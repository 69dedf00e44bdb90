use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core_api::{CoreError, CoreErrorCode};
use crate::value::{PATH_SEPARATOR, Value, ValueMap, path_segments};

/// Key of the sentinel root node. Never part of a rendered path.
pub const ROOT_KEY: &str = "__root__";

/// Index of a node inside its tree's arena.
pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiffStatus {
    Unchanged,
    Modified,
    Added,
    Removed,
}

impl DiffStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unchanged => "UNCHANGED",
            Self::Modified => "MODIFIED",
            Self::Added => "ADDED",
            Self::Removed => "REMOVED",
        }
    }
}

impl fmt::Display for DiffStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffNode<'a> {
    pub key: &'a str,
    /// Value in the old document.
    pub value_a: Option<&'a Value>,
    /// Value in the new document.
    pub value_b: Option<&'a Value>,
    pub status: DiffStatus,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl<'a> DiffNode<'a> {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub unchanged: usize,
    pub modified: usize,
    pub added: usize,
    pub removed: usize,
}

impl DiffSummary {
    pub fn changed(&self) -> usize {
        self.modified + self.added + self.removed
    }
}

/// Comparison result of two documents. Nodes live in one arena and refer to
/// each other by [`NodeId`]; the root is always node `0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffTree<'a> {
    nodes: Vec<DiffNode<'a>>,
}

impl<'a> DiffTree<'a> {
    pub const ROOT: NodeId = 0;

    pub fn root(&self) -> &DiffNode<'a> {
        &self.nodes[Self::ROOT]
    }

    pub fn node(&self, id: NodeId) -> Option<&DiffNode<'a>> {
        self.nodes.get(id)
    }

    /// Number of diff nodes, not counting the root.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &DiffNode<'a>)> {
        self.nodes
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
            .iter()
            .map(|&child| (child, &self.nodes[child]))
    }

    /// Keys from the top level down to `id`, joined with `" -> "`.
    pub fn path(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let Some(node) = self.nodes.get(node_id) else {
                break;
            };
            if node_id == Self::ROOT {
                break;
            }
            parts.push(node.key);
            current = node.parent;
        }
        parts.reverse();
        parts.join(PATH_SEPARATOR)
    }

    /// Looks a node up by its key path; an empty path is the root.
    pub fn find(&self, path: &str) -> Option<NodeId> {
        path_segments(path).into_iter().try_fold(Self::ROOT, |id, segment| {
            self.nodes[id]
                .children
                .iter()
                .copied()
                .find(|&child| self.nodes[child].key == segment)
        })
    }

    /// Pre-order walk over every node except the root.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &DiffNode<'a>)> {
        let mut stack: Vec<NodeId> = self.root().children.iter().rev().copied().collect();
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            let node = &self.nodes[id];
            stack.extend(node.children.iter().rev().copied());
            Some((id, node))
        })
    }

    pub fn summary(&self) -> DiffSummary {
        let mut summary = DiffSummary::default();
        for (_, node) in self.iter() {
            match node.status {
                DiffStatus::Unchanged => summary.unchanged += 1,
                DiffStatus::Modified => summary.modified += 1,
                DiffStatus::Added => summary.added += 1,
                DiffStatus::Removed => summary.removed += 1,
            }
        }
        summary
    }

    fn push(&mut self, node: DiffNode<'a>) -> NodeId {
        let id = self.nodes.len();
        if let Some(parent) = node.parent {
            self.nodes[parent].children.push(id);
        }
        self.nodes.push(node);
        id
    }
}

/// Compares an old document `a` with a new document `b`. Both must be maps.
pub fn diff<'a>(a: &'a Value, b: &'a Value) -> Result<DiffTree<'a>, CoreError> {
    let map_a = root_map(a, "old")?;
    let map_b = root_map(b, "new")?;

    let mut tree = DiffTree {
        nodes: vec![DiffNode {
            key: ROOT_KEY,
            value_a: None,
            value_b: None,
            status: DiffStatus::Unchanged,
            parent: None,
            children: Vec::new(),
        }],
    };
    diff_maps(&mut tree, DiffTree::ROOT, map_a, map_b);

    let summary = tree.summary();
    tracing::debug!(
        nodes = tree.len(),
        added = summary.added,
        removed = summary.removed,
        modified = summary.modified,
        "computed document diff"
    );
    Ok(tree)
}

fn root_map<'a>(value: &'a Value, side: &str) -> Result<&'a ValueMap, CoreError> {
    value.as_map().ok_or_else(|| {
        CoreError::new(
            CoreErrorCode::Diff,
            format!(
                "cannot diff: {side} document root is a {}, expected a map",
                value.kind()
            ),
        )
    })
}

fn diff_maps<'a>(tree: &mut DiffTree<'a>, parent: NodeId, a: &'a ValueMap, b: &'a ValueMap) {
    let keys: BTreeSet<&'a str> = a.keys().chain(b.keys()).map(String::as_str).collect();

    for key in keys {
        let value_a = a.get(key);
        let value_b = b.get(key);
        let status = match (value_a, value_b) {
            (None, _) => DiffStatus::Added,
            (_, None) => DiffStatus::Removed,
            (Some(x), Some(y)) if x == y => DiffStatus::Unchanged,
            _ => DiffStatus::Modified,
        };

        let id = tree.push(DiffNode {
            key,
            value_a,
            value_b,
            status,
            parent: Some(parent),
            children: Vec::new(),
        });

        if status == DiffStatus::Modified
            && let (Some(Value::Map(child_a)), Some(Value::Map(child_b))) = (value_a, value_b)
        {
            diff_maps(tree, id, child_a, child_b);
        }
    }
}
