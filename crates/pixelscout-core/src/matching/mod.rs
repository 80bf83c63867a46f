//! Recognition algorithms.
//!
//! Both matchers turn a screenshot plus an element specification into
//! zero or more bounding boxes, in discovery order, along with the
//! post-processed buffer they worked on (kept for failure
//! diagnostics):
//!
//! - [`image`]: template matching over a normalized correlation
//!   surface, with iterative peak extraction so multiple occurrences
//!   of one template are reported separately.
//! - [`text`]: a symbol-run matcher layered over an OCR engine's
//!   word/symbol stream, preceded by a small preprocessing pipeline.
//! - [`ocr`]: the engine contract the text matcher consumes.

pub mod image;
pub mod ocr;
pub mod text;
