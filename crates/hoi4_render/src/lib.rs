use std::fmt::Write as _;

use hoi4_core::core_api::SaveSummary;
use hoi4_core::{
    AnyTree, DiffStatus, DiffSummary, DiffTree, DisplayTree, DocumentTree, NodeId, Value,
};
use serde::Serialize as _;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::{Map as JsonMap, Value as JsonValue};

const DETAILS_RULE: &str = "--------------------";
const DETAILS_INDENT: &[u8] = b"    ";
const DIFF_INDENT: &str = "  ";
const ABSENT: &str = "(none)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiffRenderOptions {
    /// Also list nodes whose values are equal on both sides.
    pub show_unchanged: bool,
}

/// Converts a document into JSON, keeping map entry order.
pub fn document_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Scalar(s) => JsonValue::String(s.clone()),
        Value::List(items) => JsonValue::Array(items.iter().map(document_to_json).collect()),
        Value::Map(entries) => {
            let mut out = JsonMap::new();
            for (key, child) in entries {
                out.insert(key.clone(), document_to_json(child));
            }
            JsonValue::Object(out)
        }
    }
}

/// JSON text indented by four spaces, as shown in the details pane and
/// written by the JSON export.
pub fn to_indented_json(value: &JsonValue) -> String {
    let mut buf = Vec::new();
    let mut serializer =
        Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(DETAILS_INDENT));
    value
        .serialize(&mut serializer)
        .expect("serializing JSON into memory cannot fail");
    String::from_utf8_lossy(&buf).into_owned()
}

pub fn render_summary_json(summary: &SaveSummary) -> JsonValue {
    let mut out = JsonMap::new();
    out.insert(
        "encoding".to_string(),
        JsonValue::String(summary.encoding.as_str().to_string()),
    );
    out.insert("player".to_string(), optional_string(summary.player.as_deref()));
    out.insert("date".to_string(), optional_string(summary.date.as_deref()));
    out.insert(
        "top_level_entries".to_string(),
        JsonValue::from(summary.top_level_entries),
    );
    out.insert(
        "filestring_bytes".to_string(),
        JsonValue::from(summary.filestring_bytes),
    );
    out.insert(
        "unknown_tokens".to_string(),
        JsonValue::from(summary.unknown_tokens),
    );
    out.insert(
        "invalid_dates".to_string(),
        JsonValue::from(summary.invalid_dates),
    );
    JsonValue::Object(out)
}

pub fn render_summary_text(summary: &SaveSummary) -> String {
    let mut out = String::new();
    let lines = [
        ("Encoding", summary.encoding.as_str().to_string()),
        ("Player", summary.player.as_deref().unwrap_or(ABSENT).to_string()),
        ("Date", summary.date.as_deref().unwrap_or(ABSENT).to_string()),
        ("Top-level entries", summary.top_level_entries.to_string()),
        ("Canonical text bytes", summary.filestring_bytes.to_string()),
        ("Unknown tokens", summary.unknown_tokens.to_string()),
        ("Invalid dates", summary.invalid_dates.to_string()),
    ];
    for (label, value) in lines {
        writeln!(out, "{:<22}{}", format!("{label}:"), value)
            .expect("writing to String cannot fail");
    }
    out
}

/// Details pane text for one node of a document view.
pub fn render_document_details(tree: &DocumentTree<'_>, id: NodeId) -> String {
    format!(
        "Path: {}\nKey: {}\n{DETAILS_RULE}\nValue:\n{}",
        tree.path(id),
        tree.key(id),
        value_details(Some(tree.value(id)))
    )
}

/// Details pane text for one node of a diff view.
pub fn render_diff_details(tree: &DiffTree<'_>, id: NodeId) -> String {
    let Some(node) = tree.node(id) else {
        return String::new();
    };
    format!(
        "Path: {}\nKey: {}\nStatus: {}\n{DETAILS_RULE}\nOld Value (File 1):\n{}\n{DETAILS_RULE}\nNew Value (File 2):\n{}",
        tree.path(id),
        node.key,
        node.status,
        value_details(node.value_a),
        value_details(node.value_b)
    )
}

pub fn render_details(tree: &AnyTree<'_>, id: NodeId) -> String {
    match tree {
        AnyTree::Document(t) => render_document_details(t, id),
        AnyTree::Diff(t) => render_diff_details(t, id),
    }
}

fn value_details(value: Option<&Value>) -> String {
    match value {
        None => ABSENT.to_string(),
        Some(Value::Scalar(s)) => s.clone(),
        Some(container) => to_indented_json(&document_to_json(container)),
    }
}

/// One line per matched node: its path followed by its value columns.
pub fn render_search_text<T: DisplayTree + ?Sized>(tree: &T, ids: &[NodeId]) -> String {
    let mut out = String::new();
    for &id in ids {
        let mut line = tree.path(id);
        for column in 1..tree.column_count() {
            let cell = tree.display(id, column);
            if !cell.is_empty() {
                write!(line, " | {cell}").expect("writing to String cannot fail");
            }
        }
        writeln!(out, "{line}").expect("writing to String cannot fail");
    }
    out
}

fn status_marker(status: DiffStatus) -> char {
    match status {
        DiffStatus::Unchanged => ' ',
        DiffStatus::Modified => '~',
        DiffStatus::Added => '+',
        DiffStatus::Removed => '-',
    }
}

/// Indented listing of a diff, followed by a per-status count line.
pub fn render_diff_text(tree: &DiffTree<'_>, options: DiffRenderOptions) -> String {
    let mut out = String::new();
    write_diff_children(&mut out, tree, DiffTree::ROOT, 0, options);
    out.push_str(&render_diff_counts(&tree.summary()));
    out.push('\n');
    out
}

pub fn render_diff_counts(summary: &DiffSummary) -> String {
    format!(
        "{} modified, {} added, {} removed, {} unchanged",
        summary.modified, summary.added, summary.removed, summary.unchanged
    )
}

fn write_diff_children(
    out: &mut String,
    tree: &DiffTree<'_>,
    parent: NodeId,
    depth: usize,
    options: DiffRenderOptions,
) {
    for (id, node) in tree.children(parent) {
        if node.status == DiffStatus::Unchanged && !options.show_unchanged {
            continue;
        }
        let indent = DIFF_INDENT.repeat(depth);
        let marker = status_marker(node.status);
        let old = node.value_a.map(diff_cell);
        let new = node.value_b.map(diff_cell);

        let line = match (node.status, old, new) {
            (DiffStatus::Modified, _, _) if !node.children().is_empty() => {
                format!("{indent}{marker} {}", node.key)
            }
            (DiffStatus::Modified, Some(old), Some(new)) => {
                format!("{indent}{marker} {}: {old} -> {new}", node.key)
            }
            (_, _, Some(value)) | (_, Some(value), None) => {
                format!("{indent}{marker} {} = {value}", node.key)
            }
            _ => format!("{indent}{marker} {}", node.key),
        };
        writeln!(out, "{line}").expect("writing to String cannot fail");
        write_diff_children(out, tree, id, depth + 1, options);
    }
}

/// Scalars verbatim, containers as compact JSON.
fn diff_cell(value: &Value) -> String {
    match value {
        Value::Scalar(s) => s.clone(),
        container => document_to_json(container).to_string(),
    }
}

pub fn render_diff_json(tree: &DiffTree<'_>, options: DiffRenderOptions) -> JsonValue {
    let summary = tree.summary();
    let mut counts = JsonMap::new();
    counts.insert("modified".to_string(), JsonValue::from(summary.modified));
    counts.insert("added".to_string(), JsonValue::from(summary.added));
    counts.insert("removed".to_string(), JsonValue::from(summary.removed));
    counts.insert("unchanged".to_string(), JsonValue::from(summary.unchanged));

    let mut out = JsonMap::new();
    out.insert("summary".to_string(), JsonValue::Object(counts));
    out.insert(
        "changes".to_string(),
        diff_children_to_json(tree, DiffTree::ROOT, options),
    );
    JsonValue::Object(out)
}

fn diff_children_to_json(
    tree: &DiffTree<'_>,
    parent: NodeId,
    options: DiffRenderOptions,
) -> JsonValue {
    JsonValue::Array(
        tree.children(parent)
            .filter(|(_, node)| options.show_unchanged || node.status != DiffStatus::Unchanged)
            .map(|(id, node)| {
                let mut m = JsonMap::new();
                m.insert("key".to_string(), JsonValue::String(node.key.to_string()));
                m.insert("path".to_string(), JsonValue::String(tree.path(id)));
                m.insert(
                    "status".to_string(),
                    JsonValue::String(node.status.as_str().to_string()),
                );
                m.insert(
                    "old".to_string(),
                    node.value_a.map_or(JsonValue::Null, document_to_json),
                );
                m.insert(
                    "new".to_string(),
                    node.value_b.map_or(JsonValue::Null, document_to_json),
                );
                if !node.children().is_empty() {
                    m.insert(
                        "children".to_string(),
                        diff_children_to_json(tree, id, options),
                    );
                }
                JsonValue::Object(m)
            })
            .collect(),
    )
}

fn optional_string(value: Option<&str>) -> JsonValue {
    match value {
        Some(v) => JsonValue::String(v.to_string()),
        None => JsonValue::Null,
    }
}
