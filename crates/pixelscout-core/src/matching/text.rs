//! Text matching over an OCR symbol stream.
//!
//! The screenshot is upscaled 2x (nearest neighbor, which helps OCR
//! engines on small UI text) and optionally grayscaled, binarized and
//! negated, then handed to the engine. A state machine walks the
//! engine's word/symbol stream looking for runs that spell the search
//! text:
//!
//! - a cursor tracks how much of the (whitespace-normalized) needle
//!   has been matched, an accumulator rectangle grows with every
//!   matched symbol;
//! - word boundaries mid-run must correspond to a space in the
//!   needle, otherwise the run is abandoned;
//! - any symbol mismatch abandons the run (the offending symbol may
//!   still start a fresh one);
//! - a completed run commits the accumulator and scanning continues,
//!   so every disjoint occurrence is collected.
//!
//! Emitted rectangles are scaled back down by the upscale factor, so
//! callers always see coordinates of the original screenshot.

use image::imageops::FilterType;
use image::DynamicImage;
use imageproc::contrast::{otsu_level, threshold, ThresholdType};

use crate::element::{Preprocess, TextSpec};
use crate::error::Result;
use crate::geometry::Rect;
use crate::matching::ocr::{OcrEngine, OcrSymbol, OcrWord};

/// Fixed upscale factor applied before OCR.
pub const OCR_UPSCALE: u32 = 2;

/// Find every run of on-screen text matching the spec.
///
/// Returns match rectangles in discovery order (original screenshot
/// coordinates) and the preprocessed buffer the engine saw, for
/// diagnostics.
pub fn find_text(
    screenshot: &DynamicImage,
    spec: &TextSpec,
    engine: &mut dyn OcrEngine,
) -> Result<(Vec<Rect>, DynamicImage)> {
    let needle: Vec<char> = normalize_search_text(&spec.text).chars().collect();
    let prepared = preprocess(screenshot, spec.preprocess);
    let words = engine.recognize(&prepared)?;

    let downscale = 1.0 / f64::from(OCR_UPSCALE);
    let rects = match_symbol_runs(&words, &needle, spec.ignore_case)
        .into_iter()
        .map(|r| r.scaled_by(downscale))
        .collect::<Result<Vec<_>>>()?;
    Ok((rects, prepared))
}

/// Collapse internal whitespace runs to single spaces and trim.
pub fn normalize_search_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Run the preprocessing pipeline. Stage order is fixed: upscale,
/// grayscale, binarize, negate; the upscale is unconditional.
pub fn preprocess(screenshot: &DynamicImage, stages: Preprocess) -> DynamicImage {
    let mut out = screenshot.resize_exact(
        screenshot.width() * OCR_UPSCALE,
        screenshot.height() * OCR_UPSCALE,
        FilterType::Nearest,
    );
    if stages.binarize {
        let gray = out.to_luma8();
        let level = otsu_level(&gray);
        out = DynamicImage::ImageLuma8(threshold(&gray, level, ThresholdType::Binary));
    } else if stages.grayscale {
        out = DynamicImage::ImageLuma8(out.to_luma8());
    }
    if stages.negate {
        out.invert();
    }
    out
}

fn chars_match(a: char, b: char, ignore_case: bool) -> bool {
    a == b || (ignore_case && a.to_lowercase().eq(b.to_lowercase()))
}

/// Whether the symbol's characters all match the needle starting at
/// `cursor`.
fn symbol_matches_at(
    symbol: &OcrSymbol,
    needle: &[char],
    cursor: usize,
    ignore_case: bool,
) -> bool {
    let mut at = cursor;
    for ch in symbol.text.chars() {
        match needle.get(at) {
            Some(&expected) if chars_match(ch, expected, ignore_case) => at += 1,
            _ => return false,
        }
    }
    true
}

/// The symbol-run matcher. Needle coordinates are those of the image
/// the engine processed.
fn match_symbol_runs(words: &[OcrWord], needle: &[char], ignore_case: bool) -> Vec<Rect> {
    if needle.is_empty() {
        return Vec::new();
    }

    let mut matches = Vec::new();
    let mut cursor = 0usize;
    let mut run: Option<Rect> = None;

    for word in words {
        if cursor > 0 {
            // Word boundary mid-run: the needle must break here too.
            if needle.get(cursor).copied() == Some(' ') {
                cursor += 1;
            } else {
                cursor = 0;
                run = None;
            }
        }
        for symbol in &word.symbols {
            if symbol.text.is_empty() {
                continue;
            }
            loop {
                if symbol_matches_at(symbol, needle, cursor, ignore_case) {
                    cursor += symbol.text.chars().count();
                    run = Some(match run {
                        Some(acc) => acc.union(&symbol.bounds),
                        None => symbol.bounds,
                    });
                    if cursor == needle.len() {
                        if let Some(acc) = run.take() {
                            matches.push(acc);
                        }
                        cursor = 0;
                    }
                    break;
                }
                if cursor == 0 {
                    run = None;
                    break;
                }
                // Mid-run mismatch: abandon the run, then give the
                // same symbol one chance to start a fresh one.
                cursor = 0;
                run = None;
            }
        }
    }
    matches
}
