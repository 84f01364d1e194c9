use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

/// One step from a container to a child.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Address of a node inside the current document.
///
/// Paths are sequences of typed segments, so an object key such as `"a.b"`
/// and the nested path `a` → `b` stay distinct even though both print as
/// `a.b` in flattened form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath(Vec<Segment>);

impl NodePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn last(&self) -> Option<&Segment> {
        self.0.last()
    }

    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment::Key(key.into()));
        Self(segments)
    }

    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment::Index(index));
        Self(segments)
    }

    /// Walk `root` along this path.
    pub fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.0.iter().try_fold(root, |current, segment| match (segment, current) {
            (Segment::Key(k), Value::Object(map)) => map.get(k),
            (Segment::Index(i), Value::Array(arr)) => arr.get(*i),
            _ => None,
        })
    }

    /// Parse the flattened notation (`a.b[2].c`, `[1][0]`).
    ///
    /// Keys containing `.`, `[` or `]` cannot be expressed; the flattened form is
    /// ambiguous for them and they are read as nested structure.
    pub fn parse_flat(text: &str) -> Result<Self, PathParseError> {
        let mut segments = Vec::new();
        let mut key = String::new();
        let mut chars = text.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '.' => {
                    if key.is_empty() {
                        return Err(PathParseError { position: pos, text: text.to_string() });
                    }
                    segments.push(Segment::Key(std::mem::take(&mut key)));
                }
                '[' => {
                    if !key.is_empty() {
                        segments.push(Segment::Key(std::mem::take(&mut key)));
                    }
                    let mut digits = String::new();
                    let mut closed = false;
                    for (_, d) in chars.by_ref() {
                        if d == ']' {
                            closed = true;
                            break;
                        }
                        digits.push(d);
                    }
                    let index = digits
                        .parse::<usize>()
                        .ok()
                        .filter(|_| closed)
                        .ok_or_else(|| PathParseError { position: pos, text: text.to_string() })?;
                    segments.push(Segment::Index(index));
                    // `a[0].b` - swallow the separator that follows an index
                    if let Some((_, '.')) = chars.peek() {
                        chars.next();
                        if chars.peek().is_none() {
                            return Err(PathParseError { position: text.len(), text: text.to_string() });
                        }
                    }
                }
                ']' => return Err(PathParseError { position: pos, text: text.to_string() }),
                other => key.push(other),
            }
        }

        if !key.is_empty() {
            segments.push(Segment::Key(key));
        } else if text.ends_with('.') {
            return Err(PathParseError { position: text.len(), text: text.to_string() });
        }

        Ok(Self(segments))
    }
}

impl fmt::Display for NodePath {
    /// Flattened form: `.key` for members, `[i]` for elements, no leading
    /// separator at the root.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Key(k) if i == 0 => write!(f, "{k}")?,
                Segment::Key(k) => write!(f, ".{k}")?,
                Segment::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

impl Serialize for NodePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<Vec<Segment>> for NodePath {
    fn from(segments: Vec<Segment>) -> Self {
        Self(segments)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid path `{text}` at offset {position}")]
pub struct PathParseError {
    pub position: usize,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattened_form_matches_original_scheme() {
        let p = NodePath::root().key("a").key("b");
        assert_eq!(p.to_string(), "a.b");

        let p = NodePath::root().index(1).index(0);
        assert_eq!(p.to_string(), "[1][0]");

        let p = NodePath::root().key("items").index(3).key("id");
        assert_eq!(p.to_string(), "items[3].id");

        assert_eq!(NodePath::root().to_string(), "");
    }

    #[test]
    fn dotted_key_is_distinct_from_nested_path() {
        let dotted = NodePath::root().key("a.b");
        let nested = NodePath::root().key("a").key("b");
        assert_eq!(dotted.to_string(), nested.to_string());
        assert_ne!(dotted, nested);
    }

    #[test]
    fn parse_flat_reads_keys_and_indices() {
        let p = NodePath::parse_flat("items[3].id").unwrap();
        assert_eq!(p, NodePath::root().key("items").index(3).key("id"));

        let p = NodePath::parse_flat("[1][0]").unwrap();
        assert_eq!(p, NodePath::root().index(1).index(0));

        assert_eq!(NodePath::parse_flat("").unwrap(), NodePath::root());
    }

    #[test]
    fn parse_flat_rejects_malformed() {
        assert!(NodePath::parse_flat("a..b").is_err());
        assert!(NodePath::parse_flat("a[x]").is_err());
        assert!(NodePath::parse_flat("a[1").is_err());
        assert!(NodePath::parse_flat("a]").is_err());
        assert!(NodePath::parse_flat("a.").is_err());
    }

    #[test]
    fn resolve_walks_objects_and_arrays() {
        let doc = json!({"a": {"b": 1}, "list": ["x", ["y"]]});
        assert_eq!(NodePath::parse_flat("a.b").unwrap().resolve(&doc), Some(&json!(1)));
        assert_eq!(NodePath::parse_flat("list[1][0]").unwrap().resolve(&doc), Some(&json!("y")));
        assert_eq!(NodePath::parse_flat("a[0]").unwrap().resolve(&doc), None);
        assert_eq!(NodePath::root().resolve(&doc), Some(&doc));
    }
}
