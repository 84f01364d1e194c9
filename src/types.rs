use serde::Serialize;

use crate::path::NodePath;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Object,
    Array,
    String,
    Number,
    Boolean,
    Null,
}

impl NodeKind {
    pub fn is_container(self) -> bool {
        matches!(self, NodeKind::Object | NodeKind::Array)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderNode {
    pub path: NodePath,           // typed path, serialised in flattened form
    pub label: String,            // key, `[index]`, or the root banner
    pub kind: NodeKind,
    pub display: String,          // scalar text, or `{n}` / `[n]` summary for containers
    pub truncated: bool,          // display text was shortened
    pub has_children: bool,
    pub child_count: usize,
    pub expanded: bool,
    /// Only materialised for expanded containers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<RenderNode>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChildPage {
    pub nodes: Vec<RenderNode>,
    pub total_count: usize,
    pub has_more: bool,
}
