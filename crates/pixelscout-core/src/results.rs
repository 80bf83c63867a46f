//! Recognition results.
//!
//! A [`SearchResult`] pairs an element with the rectangles it matched,
//! in discovery order, plus (optionally) the post-processed screenshot
//! the recognizer worked on, kept for failure diagnostics. The result
//! owns that buffer exclusively; coordinate shifts consume the result
//! and return a new one, so the buffer moves with it and is never
//! shared.

use std::collections::HashMap;

use image::DynamicImage;

use crate::element::Element;
use crate::error::{Error, Result};
use crate::geometry::Rect;

/// The outcome of recognizing one element in one screenshot.
#[derive(Debug)]
pub struct SearchResult {
    element: Element,
    rects: Vec<Rect>,
    screenshot: Option<DynamicImage>,
}

impl SearchResult {
    /// A result with matches, in discovery order.
    pub fn new(element: Element, rects: Vec<Rect>, screenshot: Option<DynamicImage>) -> Self {
        Self {
            element,
            rects,
            screenshot,
        }
    }

    /// A not-found result, optionally retaining the last screenshot
    /// for diagnostics.
    pub fn not_found(element: Element, screenshot: Option<DynamicImage>) -> Self {
        Self::new(element, Vec::new(), screenshot)
    }

    pub fn element(&self) -> &Element {
        &self.element
    }

    /// Matched rectangles in discovery order. No secondary sort is
    /// ever applied.
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn success(&self) -> bool {
        !self.rects.is_empty()
    }

    /// The single match, if there is exactly one.
    pub fn single(&self) -> Option<&Rect> {
        match self.rects.as_slice() {
            [rect] => Some(rect),
            _ => None,
        }
    }

    /// Borrow the diagnostics screenshot, if one was retained.
    pub fn screenshot(&self) -> Option<&DynamicImage> {
        self.screenshot.as_ref()
    }

    /// Release the diagnostics screenshot to the caller.
    pub fn take_screenshot(&mut self) -> Option<DynamicImage> {
        self.screenshot.take()
    }

    /// Shift every rectangle by `(dx, dy)`, consuming the result.
    ///
    /// Used to translate from coordinates local to a captured or
    /// cropped image into absolute screen coordinates: first by the
    /// monitor offset, then by the search-rectangle offset.
    pub fn offset_by(self, dx: i32, dy: i32) -> Result<Self> {
        let rects = self
            .rects
            .iter()
            .map(|r| r.offset_by(dx, dy))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            element: self.element,
            rects,
            screenshot: self.screenshot,
        })
    }
}

/// An immutable, name-keyed set of results from a multi-element wait.
///
/// Keys are element names, compared case-insensitively. Non-empty by
/// construction.
#[derive(Debug)]
pub struct SearchResultCollection {
    by_name: HashMap<String, SearchResult>,
}

impl SearchResultCollection {
    pub fn new(results: Vec<SearchResult>) -> Result<Self> {
        if results.is_empty() {
            return Err(Error::EmptyElementSet);
        }
        let mut by_name = HashMap::with_capacity(results.len());
        for result in results {
            let key = result.element().name().to_lowercase();
            if by_name.contains_key(&key) {
                return Err(Error::DuplicateElement {
                    name: result.element().name().to_string(),
                });
            }
            by_name.insert(key, result);
        }
        Ok(Self { by_name })
    }

    /// Look up a result by element name, case-insensitively.
    pub fn get(&self, name: &str) -> Result<&SearchResult> {
        self.by_name
            .get(&name.to_lowercase())
            .ok_or_else(|| Error::UnknownElement {
                name: name.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SearchResult> {
        self.by_name.values()
    }
}
