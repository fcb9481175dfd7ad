//! Error types for format previews.
//!
//! A preview absorbs malformed input locally; only a missing rendering
//! surface reaches the caller. Stylesheet errors surface when a renderer is
//! built, never during a preview.

use std::fmt;

/// Top-level error type for the preview engine.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PreviewError {
    /// No rendering surface could be acquired, so no CSS text can be produced.
    RenderingUnavailable(String),
    /// Stylesheet text could not be parsed.
    Stylesheet(String),
}

impl fmt::Display for PreviewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreviewError::RenderingUnavailable(msg) => write!(f, "Rendering unavailable: {}", msg),
            PreviewError::Stylesheet(msg) => write!(f, "Stylesheet error: {}", msg),
        }
    }
}

impl std::error::Error for PreviewError {}

/// Error returned by a computed value provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueError(pub String);

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value provider failed: {}", self.0)
    }
}

impl std::error::Error for ValueError {}

impl From<&str> for ValueError {
    fn from(msg: &str) -> Self {
        ValueError(msg.to_string())
    }
}

impl From<String> for ValueError {
    fn from(msg: String) -> Self {
        ValueError(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = PreviewError::RenderingUnavailable("surface busy".into());
        assert_eq!(err.to_string(), "Rendering unavailable: surface busy");
        assert_eq!(
            ValueError::from("no editor").to_string(),
            "Value provider failed: no editor"
        );
    }
}
