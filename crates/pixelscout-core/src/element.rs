//! Search target descriptions.
//!
//! An [`Element`] is a named thing to look for on screen, either a
//! reference image to template-match or a text string to find via OCR.
//! The enum is closed on purpose: the recognizer dispatches with an
//! exhaustive `match`, so adding a new variant is a compile-time
//! checked exercise rather than a runtime type probe.
//!
//! All constructors validate eagerly and never clamp: a threshold of
//! 1.2 is an error, not 1.0.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A reference image to locate by normalized correlation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSpec {
    /// Stable lookup key, compared case-insensitively.
    pub name: String,
    /// Encoded image bytes (any format the `image` crate can decode).
    pub bytes: Vec<u8>,
    /// Minimum correlation score for a match, in `[0, 1]`.
    pub threshold: f32,
    /// Return the grayscale-converted screenshot as the diagnostics
    /// buffer instead of the original.
    pub grayscale: bool,
}

/// Optional preprocessing stages applied before OCR.
///
/// The 2x upscale that precedes these stages is unconditional; these
/// flags only select the optional stages. Order of application is
/// fixed: grayscale, then binarize, then negate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Preprocess {
    /// Convert to single-channel luminance.
    pub grayscale: bool,
    /// Binarize with a global auto threshold (Otsu). Implies a
    /// grayscale conversion.
    pub binarize: bool,
    /// Invert, for dark or inverted UI themes.
    pub negate: bool,
}

impl Preprocess {
    /// Skip every optional stage.
    pub const NONE: Self = Self {
        grayscale: false,
        binarize: false,
        negate: false,
    };
}

/// A text string to locate via OCR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpec {
    /// Stable lookup key, compared case-insensitively.
    pub name: String,
    /// The text to find. Internal whitespace runs are collapsed to
    /// single spaces before matching.
    pub text: String,
    /// Preprocessing stages to run before OCR.
    #[serde(default)]
    pub preprocess: Preprocess,
    /// Compare characters case-insensitively.
    #[serde(default)]
    pub ignore_case: bool,
}

/// A named search target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    Image(ImageSpec),
    Text(TextSpec),
}

impl Element {
    /// Create an image element, validating every field.
    pub fn image(
        name: impl Into<String>,
        bytes: Vec<u8>,
        threshold: f32,
        grayscale: bool,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::InvalidElement("empty element name".into()));
        }
        if bytes.is_empty() {
            return Err(Error::InvalidElement(format!(
                "image element '{name}' has no content bytes"
            )));
        }
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::InvalidElement(format!(
                "image element '{name}' threshold {threshold} outside [0, 1]"
            )));
        }
        Ok(Self::Image(ImageSpec {
            name,
            bytes,
            threshold,
            grayscale,
        }))
    }

    /// Create a text element, validating every field.
    pub fn text(
        name: impl Into<String>,
        text: impl Into<String>,
        preprocess: Preprocess,
        ignore_case: bool,
    ) -> Result<Self> {
        let name = name.into();
        let text = text.into();
        if name.trim().is_empty() {
            return Err(Error::InvalidElement("empty element name".into()));
        }
        if text.trim().is_empty() {
            return Err(Error::InvalidElement(format!(
                "text element '{name}' has empty search text"
            )));
        }
        Ok(Self::Text(TextSpec {
            name,
            text,
            preprocess,
            ignore_case,
        }))
    }

    /// The element's lookup key.
    pub fn name(&self) -> &str {
        match self {
            Self::Image(spec) => &spec.name,
            Self::Text(spec) => &spec.name,
        }
    }
}

impl std::fmt::Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Image(spec) => write!(f, "image element '{}'", spec.name),
            Self::Text(spec) => write!(f, "text element '{}' (\"{}\")", spec.name, spec.text),
        }
    }
}

/// A name-keyed table of elements.
///
/// This is the lookup surface an external build-time generator
/// populates from a directory of reference images; at runtime it is
/// just a case-insensitive map. Duplicate names are rejected at
/// construction, lookups of unknown names are errors.
#[derive(Debug, Clone, Default)]
pub struct ElementLibrary {
    by_name: HashMap<String, Element>,
}

impl ElementLibrary {
    pub fn new(elements: Vec<Element>) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(elements.len());
        for element in elements {
            let key = element.name().to_lowercase();
            if by_name.contains_key(&key) {
                return Err(Error::DuplicateElement {
                    name: element.name().to_string(),
                });
            }
            by_name.insert(key, element);
        }
        Ok(Self { by_name })
    }

    /// Look up an element by name, case-insensitively.
    pub fn get(&self, name: &str) -> Result<&Element> {
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

    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.by_name.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_element(name: &str) -> Element {
        Element::image(name, vec![1, 2, 3], 0.9, false).unwrap()
    }

    #[test]
    fn image_element_validates_fields() {
        assert!(Element::image("", vec![1], 0.9, false).is_err());
        assert!(Element::image("  ", vec![1], 0.9, false).is_err());
        assert!(Element::image("a", vec![], 0.9, false).is_err());
        assert!(Element::image("a", vec![1], -0.1, false).is_err());
        assert!(Element::image("a", vec![1], 1.1, false).is_err());
        assert!(Element::image("a", vec![1], 1.0, true).is_ok());
        assert!(Element::image("a", vec![1], 0.0, true).is_ok());
    }

    #[test]
    fn text_element_validates_fields() {
        assert!(Element::text("", "hi", Preprocess::NONE, false).is_err());
        assert!(Element::text("a", "", Preprocess::NONE, false).is_err());
        assert!(Element::text("a", "   ", Preprocess::NONE, false).is_err());
        assert!(Element::text("a", "hi", Preprocess::NONE, true).is_ok());
    }

    #[test]
    fn library_lookup_is_case_insensitive() {
        let lib = ElementLibrary::new(vec![image_element("Save-Button")]).unwrap();
        assert_eq!(lib.get("save-button").unwrap().name(), "Save-Button");
        assert_eq!(lib.get("SAVE-BUTTON").unwrap().name(), "Save-Button");
        assert!(matches!(
            lib.get("other"),
            Err(Error::UnknownElement { .. })
        ));
    }

    #[test]
    fn library_rejects_duplicate_names() {
        let result = ElementLibrary::new(vec![image_element("ok"), image_element("OK")]);
        assert!(matches!(result, Err(Error::DuplicateElement { .. })));
    }

    #[test]
    fn element_serde_round_trip() {
        let e = Element::text(
            "greeting",
            "Hello World",
            Preprocess {
                grayscale: true,
                binarize: true,
                negate: false,
            },
            true,
        )
        .unwrap();
        let json = serde_json::to_string(&e).unwrap();
        let back: Element = serde_json::from_str(&json).unwrap();
        assert_eq!(e, back);
    }
}
