//! Error types shared across the workspace.
//!
//! One closed taxonomy, surfaced directly to the caller of the wait
//! orchestrator:
//!
//! | Variant | Retried? | Raised |
//! |---------|----------|--------|
//! | `InvalidElement`, `InvalidRect`, `MonitorNotFound`, `EmptyElementSet`, `DuplicateElement` | never | before any recognition attempt |
//! | `NotFound`, `MultipleMatches` | `NotFound` only, inside the poll loop | after the wait budget |
//! | `Decode`, `Capture`, `Ocr`, `TaskJoin` | never | propagated as-is |
//!
//! A capture or OCR fault is never converted into a not-found result.

use std::time::Duration;

use crate::geometry::Rect;

/// A boxed error source for faults raised by external primitives
/// (capture backends, OCR engines).
pub type FaultSource = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An element specification failed validation.
    #[error("invalid element: {0}")]
    InvalidElement(String),

    /// A rectangle failed validation.
    #[error("invalid rectangle: {0}")]
    InvalidRect(String),

    /// A monitor index is not in the enumerated display list.
    #[error("monitor {index} not found")]
    MonitorNotFound { index: usize },

    /// An empty element list was passed where at least one is required.
    #[error("at least one element is required")]
    EmptyElementSet,

    /// Two elements in one set share a name (names are compared
    /// case-insensitively).
    #[error("duplicate element name '{name}'")]
    DuplicateElement { name: String },

    /// A lookup by name found no element or result.
    #[error("no element named '{name}'")]
    UnknownElement { name: String },

    /// The element was not found within the wait budget.
    #[error("element '{element}' not found after waiting {waited:?}")]
    NotFound { element: String, waited: Duration },

    /// More than one match when exactly one was required.
    #[error("element '{element}' matched {} times: {}", matches.len(), format_rects(matches))]
    MultipleMatches { element: String, matches: Vec<Rect> },

    /// A template or screenshot buffer could not be decoded.
    #[error("image decode failed")]
    Decode(#[from] image::ImageError),

    /// The capture backend failed.
    #[error("screen capture failed: {0}")]
    Capture(#[source] FaultSource),

    /// The OCR engine failed.
    #[error("ocr engine failed: {0}")]
    Ocr(#[source] FaultSource),

    /// A spawned recognition task panicked or was aborted.
    #[error("recognition task failed: {0}")]
    TaskJoin(String),
}

impl Error {
    /// Wrap a capture backend fault.
    pub fn capture(source: impl Into<FaultSource>) -> Self {
        Self::Capture(source.into())
    }

    /// Wrap an OCR engine fault.
    pub fn ocr(source: impl Into<FaultSource>) -> Self {
        Self::Ocr(source.into())
    }
}

fn format_rects(rects: &[Rect]) -> String {
    rects
        .iter()
        .map(Rect::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiple_matches_lists_every_rect() {
        let err = Error::MultipleMatches {
            element: "ok-button".into(),
            matches: vec![
                Rect::new(0, 0, 10, 10).unwrap(),
                Rect::new(50, 0, 60, 10).unwrap(),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("2 times"));
        assert!(msg.contains("(0, 0)-(10, 10)"));
        assert!(msg.contains("(50, 0)-(60, 10)"));
    }

    #[test]
    fn not_found_carries_budget() {
        let err = Error::NotFound {
            element: "spinner".into(),
            waited: Duration::from_secs(5),
        };
        assert!(err.to_string().contains("spinner"));
        assert!(err.to_string().contains("5s"));
    }
}
