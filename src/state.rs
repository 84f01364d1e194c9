use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::debug;

use crate::document::{Document, ParseError, ViewOptions};
use crate::path::NodePath;
use crate::tree::render_node;
use crate::types::RenderNode;

/// Token handed out when a retrieval starts; only the newest one may commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestToken(u64);

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No document loaded")]
    NoDocument,
    #[error("a newer request superseded this one")]
    StaleResponse,
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// The single live session owned by the host.
pub struct AppState {
    pub doc: RwLock<Option<Document>>,
    pub options: ViewOptions,
    generation: AtomicU64,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ViewOptions::default())
    }
}

impl AppState {
    pub fn new(options: ViewOptions) -> Self {
        Self {
            doc: RwLock::new(None),
            options,
            generation: AtomicU64::new(0),
        }
    }

    /// Parse `text` and replace the current document. On failure the previous
    /// document is kept.
    pub fn load_text(&self, text: &str) -> Result<RenderNode, SessionError> {
        let doc = Document::parse(text, self.options)?;
        // a direct load also invalidates any retrieval still in flight
        self.generation.fetch_add(1, Ordering::SeqCst);
        Ok(self.install(doc))
    }

    pub fn begin_request(&self) -> RequestToken {
        RequestToken(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.generation.load(Ordering::SeqCst) == token.0
    }

    /// Apply a retrieved body, unless a newer request or load happened since
    /// `token` was issued.
    pub fn commit_text(&self, token: RequestToken, text: &str) -> Result<RenderNode, SessionError> {
        if !self.is_current(token) {
            debug!(token = token.0, "discarding stale response");
            return Err(SessionError::StaleResponse);
        }
        let doc = Document::parse(text, self.options)?;
        let mut guard = self.doc.write();
        // re-check under the lock so a concurrent load cannot be clobbered
        if !self.is_current(token) {
            return Err(SessionError::StaleResponse);
        }
        let root = render_root(&doc);
        *guard = Some(doc);
        Ok(root)
    }

    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.doc.write() = None;
    }

    pub fn toggle(&self, path: &NodePath) -> Result<RenderNode, SessionError> {
        let mut guard = self.doc.write();
        let Some(doc) = guard.as_mut() else { return Err(SessionError::NoDocument); };
        doc.toggle(path);
        Ok(render_root(doc))
    }

    pub fn render(&self, path: &NodePath) -> Result<RenderNode, SessionError> {
        let guard = self.doc.read();
        let Some(doc) = guard.as_ref() else { return Err(SessionError::NoDocument); };
        doc.render(path).ok_or_else(|| SessionError::InvalidPath(path.to_string()))
    }

    fn install(&self, doc: Document) -> RenderNode {
        let root = render_root(&doc);
        *self.doc.write() = Some(doc);
        root
    }
}

fn render_root(doc: &Document) -> RenderNode {
    render_node(doc.value(), NodePath::root(), doc.expanded_paths(), doc.options().max_display_len)
}
