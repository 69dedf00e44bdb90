//! Displayable views over documents and diffs.
//!
//! Both views expose the same row/column navigation through [`DisplayTree`],
//! so front ends and the search filter handle either one through [`AnyTree`].

use std::borrow::Cow;

use regex::{Regex, RegexBuilder};

use crate::diff::{DiffNode, DiffTree, NodeId, ROOT_KEY};
use crate::value::{PATH_SEPARATOR, Value, list_index, path_segments};

/// Row/column navigation over an arena tree. Ids are only meaningful for the
/// tree that produced them; foreign ids may panic.
pub trait DisplayTree {
    fn root(&self) -> NodeId;
    fn key(&self, id: NodeId) -> &str;
    fn column_count(&self) -> usize;
    fn column_title(&self, column: usize) -> &'static str;
    /// Text of one column. Column 0 is always the key.
    fn display(&self, id: NodeId, column: usize) -> String;
    fn child_count(&self, id: NodeId) -> usize;
    fn child(&self, id: NodeId, row: usize) -> Option<NodeId>;
    fn parent(&self, id: NodeId) -> Option<NodeId>;

    /// Position of `id` among its siblings; the root is row 0.
    fn row(&self, id: NodeId) -> usize {
        let Some(parent) = self.parent(id) else {
            return 0;
        };
        (0..self.child_count(parent))
            .position(|row| self.child(parent, row) == Some(id))
            .unwrap_or(0)
    }

    fn path(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            parts.push(self.key(current));
            current = parent;
        }
        parts.reverse();
        parts.join(PATH_SEPARATOR)
    }
}

/// Display text of a value in a single cell.
pub fn cell_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Scalar(s) => Cow::Borrowed(s),
        Value::Map(m) => Cow::Owned(format!("[{} items]", m.len())),
        Value::List(l) => Cow::Owned(format!("[{} items]", l.len())),
    }
}

#[derive(Debug, Clone)]
struct DocNode<'a> {
    key: Cow<'a, str>,
    value: &'a Value,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// One displayable node per Map entry and List item of a document.
#[derive(Debug, Clone)]
pub struct DocumentTree<'a> {
    nodes: Vec<DocNode<'a>>,
}

impl<'a> DocumentTree<'a> {
    pub fn new(document: &'a Value) -> Self {
        let mut tree = Self {
            nodes: vec![DocNode {
                key: Cow::Borrowed(ROOT_KEY),
                value: document,
                parent: None,
                children: Vec::new(),
            }],
        };
        tree.populate(0, document);
        tree
    }

    fn populate(&mut self, parent: NodeId, value: &'a Value) {
        match value {
            Value::Scalar(_) => {}
            Value::Map(m) => {
                for (key, child) in m {
                    let id = self.push(parent, Cow::Borrowed(key.as_str()), child);
                    self.populate(id, child);
                }
            }
            Value::List(l) => {
                for (i, child) in l.iter().enumerate() {
                    let id = self.push(parent, Cow::Owned(format!("[{i}]")), child);
                    self.populate(id, child);
                }
            }
        }
    }

    fn push(&mut self, parent: NodeId, key: Cow<'a, str>, value: &'a Value) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(DocNode {
            key,
            value,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    /// Looks a node up by path, using the same syntax as [`Value::get_path`].
    /// An empty path is the root.
    pub fn find(&self, path: &str) -> Option<NodeId> {
        path_segments(path).into_iter().try_fold(0, |id, segment| {
            let node = &self.nodes[id];
            match node.value {
                Value::Map(_) => node
                    .children
                    .iter()
                    .copied()
                    .find(|&child| self.nodes[child].key == segment),
                Value::List(_) => node.children.get(list_index(segment)?).copied(),
                Value::Scalar(_) => None,
            }
        })
    }

    pub fn value(&self, id: NodeId) -> &'a Value {
        self.nodes[id].value
    }

    /// Number of rows, not counting the root.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DisplayTree for DocumentTree<'_> {
    fn root(&self) -> NodeId {
        0
    }

    fn key(&self, id: NodeId) -> &str {
        &self.nodes[id].key
    }

    fn column_count(&self) -> usize {
        2
    }

    fn column_title(&self, column: usize) -> &'static str {
        match column {
            0 => "Key",
            1 => "Value",
            _ => "",
        }
    }

    fn display(&self, id: NodeId, column: usize) -> String {
        match column {
            0 => self.key(id).to_string(),
            1 => cell_text(self.nodes[id].value).into_owned(),
            _ => String::new(),
        }
    }

    fn child_count(&self, id: NodeId) -> usize {
        self.nodes[id].children.len()
    }

    fn child(&self, id: NodeId, row: usize) -> Option<NodeId> {
        self.nodes.get(id)?.children.get(row).copied()
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    fn row(&self, id: NodeId) -> usize {
        match self.nodes[id].parent {
            Some(parent) => self.nodes[parent]
                .children
                .iter()
                .position(|&c| c == id)
                .unwrap_or(0),
            None => 0,
        }
    }
}

fn diff_node<'t, 'a>(tree: &'t DiffTree<'a>, id: NodeId) -> &'t DiffNode<'a> {
    match tree.node(id) {
        Some(node) => node,
        None => panic!("node {id} does not belong to this diff tree"),
    }
}

impl DisplayTree for DiffTree<'_> {
    fn root(&self) -> NodeId {
        DiffTree::ROOT
    }

    fn key(&self, id: NodeId) -> &str {
        diff_node(self, id).key
    }

    fn column_count(&self) -> usize {
        3
    }

    fn column_title(&self, column: usize) -> &'static str {
        match column {
            0 => "Key",
            1 => "New Value (File 2)",
            2 => "Old Value (File 1)",
            _ => "",
        }
    }

    fn display(&self, id: NodeId, column: usize) -> String {
        let node = diff_node(self, id);
        let side = match column {
            0 => return node.key.to_string(),
            1 => node.value_b,
            2 => node.value_a,
            _ => None,
        };
        side.map(|v| cell_text(v).into_owned()).unwrap_or_default()
    }

    fn child_count(&self, id: NodeId) -> usize {
        diff_node(self, id).children().len()
    }

    fn child(&self, id: NodeId, row: usize) -> Option<NodeId> {
        self.node(id)?.children().get(row).copied()
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        diff_node(self, id).parent()
    }

    fn path(&self, id: NodeId) -> String {
        DiffTree::path(self, id)
    }
}

/// Either kind of displayable tree.
#[derive(Debug, Clone)]
pub enum AnyTree<'a> {
    Document(DocumentTree<'a>),
    Diff(DiffTree<'a>),
}

impl<'a> From<DocumentTree<'a>> for AnyTree<'a> {
    fn from(tree: DocumentTree<'a>) -> Self {
        Self::Document(tree)
    }
}

impl<'a> From<DiffTree<'a>> for AnyTree<'a> {
    fn from(tree: DiffTree<'a>) -> Self {
        Self::Diff(tree)
    }
}

macro_rules! dispatch {
    ($self:ident, $tree:ident => $body:expr) => {
        match $self {
            AnyTree::Document($tree) => $body,
            AnyTree::Diff($tree) => $body,
        }
    };
}

impl DisplayTree for AnyTree<'_> {
    fn root(&self) -> NodeId {
        dispatch!(self, t => DisplayTree::root(t))
    }

    fn key(&self, id: NodeId) -> &str {
        dispatch!(self, t => DisplayTree::key(t, id))
    }

    fn column_count(&self) -> usize {
        dispatch!(self, t => DisplayTree::column_count(t))
    }

    fn column_title(&self, column: usize) -> &'static str {
        dispatch!(self, t => DisplayTree::column_title(t, column))
    }

    fn display(&self, id: NodeId, column: usize) -> String {
        dispatch!(self, t => DisplayTree::display(t, id, column))
    }

    fn child_count(&self, id: NodeId) -> usize {
        dispatch!(self, t => DisplayTree::child_count(t, id))
    }

    fn child(&self, id: NodeId, row: usize) -> Option<NodeId> {
        dispatch!(self, t => DisplayTree::child(t, id, row))
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        dispatch!(self, t => DisplayTree::parent(t, id))
    }

    fn row(&self, id: NodeId) -> usize {
        dispatch!(self, t => DisplayTree::row(t, id))
    }

    fn path(&self, id: NodeId) -> String {
        dispatch!(self, t => DisplayTree::path(t, id))
    }
}

/// Case-insensitive search pattern as typed into a filter box.
pub fn search_pattern(text: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(text).case_insensitive(true).build()
}

/// Nodes kept by a search, in pre-order, root excluded.
///
/// A node is kept when its key or first value column matches, or when any
/// of its descendants is kept.
pub fn filter<T: DisplayTree + ?Sized>(tree: &T, pattern: &Regex) -> Vec<NodeId> {
    let mut kept = Vec::new();
    let root = tree.root();
    for row in 0..tree.child_count(root) {
        if let Some(child) = tree.child(root, row) {
            collect_matches(tree, pattern, child, &mut kept);
        }
    }
    kept
}

fn collect_matches<T: DisplayTree + ?Sized>(
    tree: &T,
    pattern: &Regex,
    id: NodeId,
    kept: &mut Vec<NodeId>,
) -> bool {
    let slot = kept.len();
    kept.push(id);

    let own = pattern.is_match(tree.key(id)) || pattern.is_match(&tree.display(id, 1));
    let mut any_child = false;
    for row in 0..tree.child_count(id) {
        if let Some(child) = tree.child(id, row) {
            any_child |= collect_matches(tree, pattern, child, kept);
        }
    }

    if own || any_child {
        true
    } else {
        kept.truncate(slot);
        false
    }
}
