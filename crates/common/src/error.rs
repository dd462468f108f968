//! Error types shared across Clipweave crates.

use std::path::PathBuf;

/// Top-level error type for Clipweave operations.
#[derive(Debug, thiserror::Error)]
pub enum ClipweaveError {
    #[error("Schema violation: {message}")]
    SchemaViolation { message: String },

    #[error("Stylesheet error: {message}")]
    Stylesheet { message: String },

    #[error("Source probe failed for {}: {message}", path.display())]
    SourceProbe { path: PathBuf, message: String },

    #[error("Unresolved {property} on <{node}>: a concrete value is required")]
    UnresolvedDimension { node: String, property: String },

    #[error("Document produces neither a video nor an audio stream")]
    EmptyOutput,

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ClipweaveError.
pub type ClipweaveResult<T> = Result<T, ClipweaveError>;

impl ClipweaveError {
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::SchemaViolation {
            message: msg.into(),
        }
    }

    pub fn stylesheet(msg: impl Into<String>) -> Self {
        Self::Stylesheet {
            message: msg.into(),
        }
    }

    pub fn source_probe(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::SourceProbe {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn unresolved(node: impl Into<String>, property: impl Into<String>) -> Self {
        Self::UnresolvedDimension {
            node: node.into(),
            property: property.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_message_names_node_and_property() {
        let err = ClipweaveError::unresolved("prl", "width");
        assert_eq!(
            err.to_string(),
            "Unresolved width on <prl>: a concrete value is required"
        );
    }

    #[test]
    fn test_source_probe_message_includes_path() {
        let err = ClipweaveError::source_probe("media/intro.mp4", "no video stream");
        let text = err.to_string();
        assert!(text.contains("media/intro.mp4"));
        assert!(text.contains("no video stream"));
    }
}
