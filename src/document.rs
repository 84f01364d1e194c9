//! The document model: one parsed JSON value plus the set of expanded
//! container paths.

use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use crate::path::NodePath;
use crate::tree::{all_containers, kind_of, list_children, pre_expand, render_node};
use crate::types::{ChildPage, RenderNode};

pub const DEFAULT_MAX_DISPLAY_LEN: usize = 150;
pub const DEFAULT_EXPAND_DEPTH: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewOptions {
    /// Strings longer than this many characters are elided in display.
    pub max_display_len: usize,
    /// Containers shallower than this are expanded on parse.
    pub expand_depth: usize,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            max_display_len: DEFAULT_MAX_DISPLAY_LEN,
            expand_depth: DEFAULT_EXPAND_DEPTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    value: Value,
    expanded: HashSet<NodePath>,
    options: ViewOptions,
}

impl Document {
    /// Parse `text` and pre-expand the shallow containers.
    ///
    /// Blank input fails with `input required`; anything the JSON grammar
    /// rejects fails with the parser's own diagnostic.
    pub fn parse(text: &str, options: ViewOptions) -> Result<Self, ParseError> {
        if text.trim().is_empty() {
            return Err(ParseError { message: "input required".into() });
        }
        let value: Value = serde_json::from_str(text).map_err(|e| ParseError { message: e.to_string() })?;

        let mut expanded = HashSet::new();
        pre_expand(&value, NodePath::root(), 0, options.expand_depth, &mut expanded);
        debug!(expanded = expanded.len(), kind = ?kind_of(&value), "document parsed");

        Ok(Self { value, expanded, options })
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn options(&self) -> ViewOptions {
        self.options
    }

    pub fn value_at(&self, path: &NodePath) -> Option<&Value> {
        path.resolve(&self.value)
    }

    pub fn is_expanded(&self, path: &NodePath) -> bool {
        self.expanded.contains(path)
    }

    pub fn expanded_paths(&self) -> &HashSet<NodePath> {
        &self.expanded
    }

    /// Flip membership of `path`. Paths that do not exist are recorded but
    /// have no visible effect.
    pub fn toggle(&mut self, path: &NodePath) {
        if !self.expanded.remove(path) {
            self.expanded.insert(path.clone());
        }
    }

    pub fn expand(&mut self, path: &NodePath) {
        self.expanded.insert(path.clone());
    }

    pub fn collapse(&mut self, path: &NodePath) {
        self.expanded.remove(path);
    }

    pub fn expand_all(&mut self) {
        all_containers(&self.value, NodePath::root(), &mut self.expanded);
    }

    /// Collapse everything below the root.
    pub fn collapse_all(&mut self) {
        self.expanded.clear();
        if kind_of(&self.value).is_container() {
            self.expanded.insert(NodePath::root());
        }
    }

    /// Lazy view rooted at `path`, or `None` if `path` does not exist.
    pub fn render(&self, path: &NodePath) -> Option<RenderNode> {
        let target = path.resolve(&self.value)?;
        Some(render_node(target, path.clone(), &self.expanded, self.options.max_display_len))
    }

    pub fn children(&self, path: &NodePath, offset: usize, limit: usize) -> ChildPage {
        list_children(&self.value, path, offset, limit, &self.expanded, self.options.max_display_len)
    }

    /// Text placed on the clipboard for `path`: the complete string for string
    /// scalars, pretty JSON for everything else. Never the truncated display.
    pub fn copy_text(&self, path: &NodePath) -> Option<String> {
        match path.resolve(&self.value)? {
            Value::String(s) => Some(s.clone()),
            other => serde_json::to_string_pretty(other).ok(),
        }
    }
}
