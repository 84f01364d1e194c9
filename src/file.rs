use std::{fs::File, io::{BufReader, Read}, path::PathBuf};

use tracing::{debug, info};

use crate::document::ParseError;
use crate::fetch::{RetrieveError, Retrieved, Retriever};
use crate::state::{AppState, SessionError};
use crate::types::RenderNode;

/// Where the raw text of a document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Text(String),
    File(PathBuf),
    Stdin,
    Clipboard,
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Failed to read {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("Clipboard unavailable: {0}")]
    Clipboard(String),
    #[error(transparent)]
    Retrieve(#[from] RetrieveError),
    /// The retrieval succeeded but the body is not a document. The retrieval
    /// record is kept so callers can still report where the body came from.
    #[error("{source}")]
    Unparsable { retrieved: Box<Retrieved>, source: ParseError },
    #[error(transparent)]
    Session(#[from] SessionError),
}

pub fn read_source(source: &Source) -> Result<String, SourceError> {
    match source {
        Source::Text(text) => Ok(text.clone()),
        Source::File(path) => {
            let f = File::open(path).map_err(|source| SourceError::Io { path: path.display().to_string(), source })?;
            let mut text = String::new();
            BufReader::new(f)
                .read_to_string(&mut text)
                .map_err(|source| SourceError::Io { path: path.display().to_string(), source })?;
            Ok(text)
        }
        Source::Stdin => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(|source| SourceError::Io { path: "<stdin>".into(), source })?;
            Ok(text)
        }
        Source::Clipboard => read_clipboard(),
    }
}

// Clipboard text is whatever the user last copied; parsing happens later
pub fn read_clipboard() -> Result<String, SourceError> {
    use arboard::Clipboard;
    let mut cb = Clipboard::new().map_err(|e| SourceError::Clipboard(format!("init failed: {e}")))?;
    cb.get_text().map_err(|e| SourceError::Clipboard(format!("failed reading text: {e}")))
}

/// Read `source` and make it the current document.
pub fn open_source(state: &AppState, source: &Source) -> Result<RenderNode, SourceError> {
    let text = read_source(source)?;
    debug!(?source, bytes = text.len(), "opening");
    Ok(state.load_text(&text)?)
}

/// Retrieve `url` and hand the body to the document model. A response that
/// arrives after a newer request or load started is discarded.
pub async fn open_url(
    state: &AppState,
    retriever: &Retriever,
    url: &str,
) -> Result<(Retrieved, RenderNode), SourceError> {
    let token = state.begin_request();
    let retrieved = retriever.retrieve(url).await?;
    info!(strategy = %retrieved.strategy, valid_json = retrieved.valid_json, "opening retrieved body");
    match state.commit_text(token, &retrieved.body) {
        Ok(root) => Ok((retrieved, root)),
        Err(SessionError::Parse(source)) => Err(SourceError::Unparsable { retrieved: Box::new(retrieved), source }),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn opens_file_source() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "[1, 2, 3]").unwrap();
        let state = AppState::default();
        let root = open_source(&state, &Source::File(f.path().to_path_buf())).unwrap();
        assert_eq!(root.child_count, 3);
        assert_eq!(root.label, "ARRAY [3]");
    }

    #[test]
    fn missing_file_reports_path() {
        let err = read_source(&Source::File("/definitely/not/here.json".into())).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }

    #[test]
    fn text_source_surfaces_parse_errors() {
        let state = AppState::default();
        let err = open_source(&state, &Source::Text("   ".into())).unwrap_err();
        assert_eq!(err.to_string(), "input required");
    }
}
