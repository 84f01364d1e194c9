use crate::path::NodePath;
use crate::state::{AppState, SessionError};

/// Compact JSON of the node at `path`.
pub fn get_node_value(state: &AppState, path: &NodePath) -> Result<String, SessionError> {
    let guard = state.doc.read();
    let Some(doc) = guard.as_ref() else { return Err(SessionError::NoDocument); };
    let value = doc.value_at(path).ok_or_else(|| SessionError::InvalidPath(path.to_string()))?;
    Ok(value.to_string())
}

/// Full, untruncated text of the node at `path`, as it would be copied.
pub fn node_copy_text(state: &AppState, path: &NodePath) -> Result<String, SessionError> {
    let guard = state.doc.read();
    let Some(doc) = guard.as_ref() else { return Err(SessionError::NoDocument); };
    doc.copy_text(path).ok_or_else(|| SessionError::InvalidPath(path.to_string()))
}

// Copy the node's full value (never the display text) to the system clipboard.
pub fn copy_node_value(state: &AppState, path: &NodePath) -> Result<(), String> {
    use arboard::Clipboard;
    let text = node_copy_text(state, path).map_err(|e| e.to_string())?;
    let mut cb = Clipboard::new().map_err(|e| e.to_string())?;
    cb.set_text(text).map_err(|e| e.to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_and_copy_text_differ_only_for_strings() {
        let state = AppState::default();
        state.load_text(r#"{"s":"hi","n":[1,2]}"#).unwrap();

        let s = NodePath::root().key("s");
        assert_eq!(get_node_value(&state, &s).unwrap(), "\"hi\"");
        assert_eq!(node_copy_text(&state, &s).unwrap(), "hi");

        let n = NodePath::root().key("n");
        assert_eq!(get_node_value(&state, &n).unwrap(), "[1,2]");
        assert_eq!(node_copy_text(&state, &n).unwrap(), "[\n  1,\n  2\n]");
    }

    #[test]
    fn unknown_path_is_an_error() {
        let state = AppState::default();
        state.load_text("{}").unwrap();
        let err = get_node_value(&state, &NodePath::root().key("x")).unwrap_err();
        assert_eq!(err.to_string(), "Invalid path: x");
    }
}
