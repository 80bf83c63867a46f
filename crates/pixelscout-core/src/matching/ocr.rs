//! OCR engine contract.
//!
//! The text matcher does not do character recognition itself; it
//! consumes an engine that yields words, and within each word,
//! symbols with bounding boxes. Implementations wrap whatever native
//! engine is available; the matcher only relies on this shape.
//!
//! Engines are assumed expensive to construct and not safe for
//! concurrent use: `recognize` takes `&mut self`, and the driver's
//! engine pool hands each engine to one call at a time.

use image::DynamicImage;

use crate::error::Result;
use crate::geometry::Rect;

/// One recognized symbol. A symbol usually holds a single character,
/// but engines may emit multi-character symbols (ligatures).
#[derive(Debug, Clone, PartialEq)]
pub struct OcrSymbol {
    pub text: String,
    /// Bounding box in the coordinates of the image handed to the
    /// engine.
    pub bounds: Rect,
}

/// One recognized word: a run of symbols with no intervening
/// whitespace.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OcrWord {
    pub symbols: Vec<OcrSymbol>,
}

/// A symbol-level OCR engine.
pub trait OcrEngine: Send {
    /// Recognize all text in `image`, returning words in reading
    /// order.
    fn recognize(&mut self, image: &DynamicImage) -> Result<Vec<OcrWord>>;
}

/// Creates engines for the driver's pool.
pub trait OcrEngineFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn OcrEngine>>;
}
