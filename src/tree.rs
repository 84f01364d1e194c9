use std::collections::HashSet;

use serde_json::Value;

use crate::path::{NodePath, Segment};
use crate::types::{ChildPage, NodeKind, RenderNode};

/// Shorten `s` to at most `max` characters, appending `…` when cut.
/// Returns the display text and whether anything was elided.
pub fn truncate(s: &str, max: usize) -> (String, bool) {
    match s.char_indices().nth(max) {
        None => (s.to_string(), false),
        Some((cut, _)) => (format!("{}…", &s[..cut]), true),
    }
}

pub fn kind_of(v: &Value) -> NodeKind {
    match v {
        Value::Object(_) => NodeKind::Object,
        Value::Array(_) => NodeKind::Array,
        Value::String(_) => NodeKind::String,
        Value::Number(_) => NodeKind::Number,
        Value::Bool(_) => NodeKind::Boolean,
        Value::Null => NodeKind::Null,
    }
}

/// Display text for a value: quoted (possibly truncated) strings, canonical
/// numbers and booleans, the bare `null` literal, and a `{n}` / `[n]` summary
/// for containers.
pub fn display_text(v: &Value, max_display_len: usize) -> (String, bool) {
    match v {
        Value::Object(m) => (format!("{{{}}}", m.len()), false),
        Value::Array(a) => (format!("[{}]", a.len()), false),
        Value::String(s) => {
            let (shown, cut) = truncate(s, max_display_len);
            (format!("\"{shown}\""), cut)
        }
        Value::Number(n) => (n.to_string(), false),
        Value::Bool(b) => (b.to_string(), false),
        Value::Null => ("null".into(), false),
    }
}

pub fn child_count(v: &Value) -> usize {
    match v {
        Value::Object(m) => m.len(),
        Value::Array(a) => a.len(),
        _ => 0,
    }
}

pub fn label_for(path: &NodePath, v: &Value) -> String {
    match path.last() {
        Some(Segment::Key(k)) => k.clone(),
        Some(Segment::Index(i)) => format!("[{i}]"),
        None => match v {
            Value::Object(m) => format!("OBJECT {{{}}}", m.len()),
            Value::Array(a) => format!("ARRAY [{}]", a.len()),
            _ => String::new(),
        },
    }
}

/// Direct children of a container, in document order, with their paths.
pub fn child_entries<'p, 'v: 'p>(
    parent: &'p NodePath,
    v: &'v Value,
) -> Box<dyn Iterator<Item = (NodePath, &'v Value)> + 'p> {
    match v {
        Value::Object(map) => Box::new(map.iter().map(move |(k, child)| (parent.key(k.as_str()), child))),
        Value::Array(arr) => Box::new(arr.iter().enumerate().map(move |(i, child)| (parent.index(i), child))),
        _ => Box::new(std::iter::empty()),
    }
}

/// Build the view of `v`. Only containers present in `expanded` materialise
/// their children; everything below a collapsed container is never visited.
pub fn render_node(
    v: &Value,
    path: NodePath,
    expanded: &HashSet<NodePath>,
    max_display_len: usize,
) -> RenderNode {
    let kind = kind_of(v);
    let count = child_count(v);
    let is_expanded = kind.is_container() && expanded.contains(&path);
    let (display, truncated) = display_text(v, max_display_len);

    let children = if is_expanded {
        Some(
            child_entries(&path, v)
                .map(|(child_path, child)| render_node(child, child_path, expanded, max_display_len))
                .collect(),
        )
    } else {
        None
    };

    RenderNode {
        label: label_for(&path, v),
        path,
        kind,
        display,
        truncated,
        has_children: count > 0,
        child_count: count,
        expanded: is_expanded,
        children,
    }
}

/// Paged children of the container at `path`. Unknown paths and scalars yield
/// an empty page.
pub fn list_children(
    root: &Value,
    path: &NodePath,
    offset: usize,
    limit: usize,
    expanded: &HashSet<NodePath>,
    max_display_len: usize,
) -> ChildPage {
    let Some(target) = path.resolve(root) else {
        return ChildPage { nodes: vec![], total_count: 0, has_more: false };
    };
    let total_count = child_count(target);
    let nodes = child_entries(path, target)
        .skip(offset)
        .take(limit)
        .map(|(child_path, child)| render_node(child, child_path, expanded, max_display_len))
        .collect();
    ChildPage {
        nodes,
        total_count,
        has_more: offset.saturating_add(limit) < total_count,
    }
}

/// Depth-first pre-expansion: every container strictly shallower than
/// `max_depth` is added, empty ones included.
pub fn pre_expand(v: &Value, path: NodePath, depth: usize, max_depth: usize, into: &mut HashSet<NodePath>) {
    if depth >= max_depth || !kind_of(v).is_container() {
        return;
    }
    for (child_path, child) in child_entries(&path, v) {
        pre_expand(child, child_path, depth + 1, max_depth, into);
    }
    into.insert(path);
}

/// Every container path in the document.
pub fn all_containers(v: &Value, path: NodePath, into: &mut HashSet<NodePath>) {
    if !kind_of(v).is_container() {
        return;
    }
    for (child_path, child) in child_entries(&path, v) {
        all_containers(child, child_path, into);
    }
    into.insert(path);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("hello", 10), ("hello".to_string(), false));
        assert_eq!(truncate("hello", 5), ("hello".to_string(), false));
        assert_eq!(truncate("hello", 3), ("hel…".to_string(), true));
        assert_eq!(truncate("ééé", 2), ("éé…".to_string(), true));
    }

    #[test]
    fn null_literal_is_distinct_from_string_null() {
        let (lit, _) = display_text(&Value::Null, 150);
        let (s, _) = display_text(&json!("null"), 150);
        assert_eq!(lit, "null");
        assert_eq!(s, "\"null\"");
    }

    #[test]
    fn collapsed_container_does_not_materialise_children() {
        let doc = json!({"a": {"b": [1, 2, 3]}});
        let node = render_node(&doc, NodePath::root(), &HashSet::new(), 150);
        assert_eq!(node.kind, NodeKind::Object);
        assert_eq!(node.child_count, 1);
        assert!(node.has_children);
        assert!(!node.expanded);
        assert!(node.children.is_none());
        assert_eq!(node.label, "OBJECT {1}");
    }

    #[test]
    fn pre_expand_stops_at_threshold() {
        let doc = json!({"a": {"b": {"c": {}}}, "e": [], "s": "x"});
        let mut set = HashSet::new();
        pre_expand(&doc, NodePath::root(), 0, 2, &mut set);

        assert!(set.contains(&NodePath::root()));
        assert!(set.contains(&NodePath::root().key("a")));
        assert!(set.contains(&NodePath::root().key("e")));
        assert!(!set.contains(&NodePath::root().key("a").key("b")));
        assert!(!set.contains(&NodePath::root().key("s")));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn list_children_pages_in_document_order() {
        let doc = json!({"list": [10, 20, 30, 40, 50]});
        let path = NodePath::root().key("list");
        let page = list_children(&doc, &path, 1, 2, &HashSet::new(), 150);
        assert_eq!(page.total_count, 5);
        assert!(page.has_more);
        let labels: Vec<_> = page.nodes.iter().map(|n| n.display.as_str()).collect();
        assert_eq!(labels, vec!["20", "30"]);
        assert_eq!(page.nodes[0].path.to_string(), "list[1]");

        let last = list_children(&doc, &path, 4, 10, &HashSet::new(), 150);
        assert_eq!(last.nodes.len(), 1);
        assert!(!last.has_more);

        let missing = list_children(&doc, &NodePath::root().key("nope"), 0, 10, &HashSet::new(), 150);
        assert_eq!(missing.total_count, 0);
        assert!(missing.nodes.is_empty());
    }
}
