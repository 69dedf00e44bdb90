use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered map with unique keys. Re-inserting a key replaces its value but
/// keeps the position where the key was first seen.
pub type ValueMap = IndexMap<String, Value>;

/// A node of a parsed save document.
///
/// Map equality ignores entry order; list equality is positional; scalars
/// compare by exact text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Scalar(String),
    Map(ValueMap),
    List(Vec<Value>),
}

/// Separator used when rendering node paths.
pub const PATH_SEPARATOR: &str = " -> ";

impl Value {
    pub fn scalar(text: impl Into<String>) -> Self {
        Self::Scalar(text.into())
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn is_container(&self) -> bool {
        !matches!(self, Self::Scalar(_))
    }

    /// Entry count for containers, `None` for scalars.
    pub fn item_count(&self) -> Option<usize> {
        match self {
            Self::Scalar(_) => None,
            Self::Map(m) => Some(m.len()),
            Self::List(l) => Some(l.len()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Map(_) => "map",
            Self::List(_) => "list",
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?.get(key)
    }

    /// Resolves a path of map keys and list indices. See [`path_segments`].
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        path_segments(path)
            .into_iter()
            .try_fold(self, |node, segment| match node {
                Self::Map(m) => m.get(segment),
                Self::List(l) => list_index(segment).and_then(|i| l.get(i)),
                Self::Scalar(_) => None,
            })
    }
}

/// Splits a node path into segments.
///
/// Segments are separated by `" -> "` when present, `.` otherwise. List
/// items are addressed as `[3]` or plain `3`. An empty path has no segments.
pub fn path_segments(path: &str) -> Vec<&str> {
    let path = path.trim();
    if path.is_empty() {
        Vec::new()
    } else if path.contains(PATH_SEPARATOR) {
        path.split(PATH_SEPARATOR).collect()
    } else {
        path.split('.').collect()
    }
}

pub(crate) fn list_index(segment: &str) -> Option<usize> {
    segment
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(segment)
        .parse()
        .ok()
}

/// Removes one leading and one trailing double quote when both are present.
/// Escapes inside the string are left as they are.
pub fn strip_quotes(token: &str) -> &str {
    if token.len() >= 2 && token.starts_with('"') && token.ends_with('"') {
        &token[1..token.len() - 1]
    } else {
        token
    }
}

#[cfg(test)]
mod tests {
    use super::{Value, ValueMap, strip_quotes};

    fn sample() -> Value {
        let mut inner = ValueMap::new();
        inner.insert("tag".to_string(), Value::scalar("ENG"));
        inner.insert(
            "ids".to_string(),
            Value::List(vec![Value::scalar("1"), Value::scalar("2")]),
        );
        let mut root = ValueMap::new();
        root.insert("player".to_string(), Value::Map(inner));
        Value::Map(root)
    }

    #[test]
    fn map_equality_ignores_order() {
        let mut a = ValueMap::new();
        a.insert("x".to_string(), Value::scalar("1"));
        a.insert("y".to_string(), Value::scalar("2"));
        let mut b = ValueMap::new();
        b.insert("y".to_string(), Value::scalar("2"));
        b.insert("x".to_string(), Value::scalar("1"));
        assert_eq!(Value::Map(a), Value::Map(b));
    }

    #[test]
    fn list_equality_is_positional() {
        let a = Value::List(vec![Value::scalar("1"), Value::scalar("2")]);
        let b = Value::List(vec![Value::scalar("2"), Value::scalar("1")]);
        assert_ne!(a, b);
    }

    #[test]
    fn scalars_compare_as_text() {
        assert_ne!(Value::scalar("1.000"), Value::scalar("1"));
    }

    #[test]
    fn reinserting_keeps_first_position() {
        let mut m = ValueMap::new();
        m.insert("a".to_string(), Value::scalar("1"));
        m.insert("b".to_string(), Value::scalar("x"));
        m.insert("a".to_string(), Value::scalar("2"));
        let keys: Vec<&str> = m.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(m.get("a"), Some(&Value::scalar("2")));
    }

    #[test]
    fn get_path_supports_both_separators_and_indices() {
        let doc = sample();
        assert_eq!(
            doc.get_path("player -> tag").and_then(Value::as_scalar),
            Some("ENG")
        );
        assert_eq!(
            doc.get_path("player.ids.[1]").and_then(Value::as_scalar),
            Some("2")
        );
        assert_eq!(
            doc.get_path("player.ids.0").and_then(Value::as_scalar),
            Some("1")
        );
        assert!(doc.get_path("player.tag.deeper").is_none());
        assert!(doc.get_path("player.ids.[9]").is_none());
        assert_eq!(doc.get_path(""), Some(&doc));
    }

    #[test]
    fn strip_quotes_only_removes_matching_pair() {
        assert_eq!(strip_quotes("\"Allied Victory\""), "Allied Victory");
        assert_eq!(strip_quotes("\"open"), "\"open");
        assert_eq!(strip_quotes("\""), "\"");
        assert_eq!(strip_quotes("\"\""), "");
        assert_eq!(strip_quotes("plain"), "plain");
    }

    #[test]
    fn serializes_to_plain_json_shapes() {
        let json = serde_json::to_value(sample()).expect("value should serialize");
        assert_eq!(json["player"]["tag"], "ENG");
        assert_eq!(json["player"]["ids"][1], "2");

        let back: Value = serde_json::from_value(json).expect("value should deserialize");
        assert_eq!(back, sample());
    }
}
