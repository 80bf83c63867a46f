//! Core types and recognition algorithms for pixelscout.
//!
//! pixelscout locates visual or textual elements on a live screen —
//! by reference image or by text — using nothing but pixels, and
//! reports where they are for downstream interaction. This crate is
//! the synchronous half: value types, the element model, and the two
//! recognizers. The async services (screen cache, engine pool, wait
//! orchestrator) live in `pixelscout-driver`.
//!
//! # Modules
//!
//! - [`geometry`]: validated `Point`/`Rect`/`Monitor` value types
//! - [`element`]: search target descriptions and the element library
//! - [`results`]: per-element and per-set recognition results
//! - [`matching`]: template matching and OCR text matching
//! - [`error`]: the shared error taxonomy
//!
//! # Recognition model
//!
//! | Element variant | Primitive | Policy layered on top |
//! |-----------------|-----------|-----------------------|
//! | `Element::Image` | normalized cross correlation (`imageproc`) | threshold clamp, iterative peak extraction, flood-fill suppression |
//! | `Element::Text` | symbol-level OCR engine (trait) | preprocessing pipeline, symbol-run state machine |
//!
//! All match coordinates start local to the buffer the recognizer
//! saw; the driver shifts them into absolute screen coordinates.

pub mod element;
pub mod error;
pub mod geometry;
pub mod matching;
pub mod results;
