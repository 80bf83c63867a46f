//! Template matching with multi-match extraction.
//!
//! The correlation itself is `imageproc`'s normalized cross
//! correlation; everything above the score surface is ours. Multiple
//! occurrences of one template are distinguished from a single broad
//! peak by iterative extraction: take the global maximum, emit a
//! template-sized box there, flood-fill that peak's neighborhood to
//! zero, repeat. The flood fill uses a tolerance band below the peak
//! value wide enough to remove one occurrence's contribution without
//! swallowing a nearby second occurrence.

use image::{DynamicImage, Luma};
use imageproc::definitions::Image;
use imageproc::template_matching::{
    find_extremes, match_template_parallel, MatchTemplateMethod,
};

use crate::element::ImageSpec;
use crate::error::{Error, Result};
use crate::geometry::Rect;

/// How far below a peak's score the flood fill still suppresses.
/// Tuned constant, not derived per image.
const SUPPRESSION_BAND: f32 = 0.15;

/// Find every occurrence of the template at or above the spec's
/// threshold.
///
/// Returns the matched rectangles in strictly decreasing score order
/// (discovery order, no secondary sort) and the screenshot rendition
/// used, for diagnostics: the grayscale conversion when the spec asks
/// for it, the original otherwise.
pub fn find_template(
    screenshot: &DynamicImage,
    spec: &ImageSpec,
) -> Result<(Vec<Rect>, DynamicImage)> {
    let template = image::load_from_memory(&spec.bytes)?.to_luma8();
    let screen = screenshot.to_luma8();

    if template.width() > screen.width() || template.height() > screen.height() {
        return Err(Error::InvalidElement(format!(
            "template '{}' ({}x{}) larger than search image ({}x{})",
            spec.name,
            template.width(),
            template.height(),
            screen.width(),
            screen.height()
        )));
    }

    let mut surface = match_template_parallel(
        &screen,
        &template,
        MatchTemplateMethod::CrossCorrelationNormalized,
    );

    // Cells that can never match are clamped to zero up front; the
    // peak loop then only ever sees candidate scores.
    for pixel in surface.pixels_mut() {
        if !(pixel.0[0] >= spec.threshold) {
            pixel.0[0] = 0.0;
        }
    }

    let rects = extract_peaks(
        &mut surface,
        spec.threshold,
        template.width() as i32,
        template.height() as i32,
    )?;

    let diagnostics = if spec.grayscale {
        DynamicImage::ImageLuma8(screen)
    } else {
        screenshot.clone()
    };
    Ok((rects, diagnostics))
}

/// Iteratively extract peaks from a thresholded score surface.
fn extract_peaks(
    surface: &mut Image<Luma<f32>>,
    threshold: f32,
    template_width: i32,
    template_height: i32,
) -> Result<Vec<Rect>> {
    let mut rects = Vec::new();
    loop {
        let extremes = find_extremes(surface);
        let peak = extremes.max_value;
        // NaN-safe: anything not provably at or above threshold stops
        // the loop.
        if !(peak >= threshold) || peak <= 0.0 {
            break;
        }
        let (x, y) = extremes.max_value_location;
        rects.push(Rect::from_size(
            x as i32,
            y as i32,
            template_width,
            template_height,
        )?);
        suppress_peak(surface, x, y, peak);
    }
    Ok(rects)
}

/// Zero the 4-connected region around `(x, y)` whose scores lie
/// within [`SUPPRESSION_BAND`] of the peak, so the same occurrence is
/// not emitted twice.
fn suppress_peak(surface: &mut Image<Luma<f32>>, x: u32, y: u32, peak: f32) {
    let floor = peak - SUPPRESSION_BAND;
    let (width, height) = surface.dimensions();
    let mut stack = vec![(x, y)];
    while let Some((cx, cy)) = stack.pop() {
        let value = surface.get_pixel(cx, cy).0[0];
        if value < floor || value <= 0.0 {
            continue;
        }
        surface.put_pixel(cx, cy, Luma([0.0]));
        if cx > 0 {
            stack.push((cx - 1, cy));
        }
        if cy > 0 {
            stack.push((cx, cy - 1));
        }
        if cx + 1 < width {
            stack.push((cx + 1, cy));
        }
        if cy + 1 < height {
            stack.push((cx, cy + 1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::geometry::Point;
    use image::{GrayImage, ImageFormat, RgbaImage};
    use std::io::Cursor;

    /// Bright cells of the 12x12 test pattern, deliberately
    /// aperiodic so shifted windows correlate poorly.
    const PATTERN: [(u32, u32); 18] = [
        (0, 0),
        (3, 1),
        (7, 0),
        (11, 2),
        (1, 4),
        (5, 3),
        (9, 4),
        (2, 6),
        (6, 7),
        (10, 6),
        (0, 9),
        (4, 8),
        (8, 9),
        (11, 11),
        (3, 11),
        (7, 10),
        (5, 5),
        (9, 11),
    ];
    const PATTERN_SIZE: u32 = 12;

    fn template_png() -> Vec<u8> {
        let mut tpl = GrayImage::from_pixel(PATTERN_SIZE, PATTERN_SIZE, Luma([0]));
        for &(x, y) in &PATTERN {
            tpl.put_pixel(x, y, Luma([255]));
        }
        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(tpl)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    /// A dark screenshot with the pattern stamped at the given
    /// positions.
    fn screenshot_with_pattern(positions: &[(u32, u32)]) -> DynamicImage {
        let mut screen = RgbaImage::from_pixel(120, 90, image::Rgba([8, 8, 8, 255]));
        for &(px, py) in positions {
            for &(x, y) in &PATTERN {
                screen.put_pixel(px + x, py + y, image::Rgba([255, 255, 255, 255]));
            }
        }
        DynamicImage::ImageRgba8(screen)
    }

    fn spec(threshold: f32, grayscale: bool) -> ImageSpec {
        match Element::image("pattern", template_png(), threshold, grayscale).unwrap() {
            Element::Image(spec) => spec,
            Element::Text(_) => unreachable!(),
        }
    }

    #[test]
    fn finds_single_placement_at_known_center() {
        for threshold in [0.8_f32, 0.95] {
            for grayscale in [false, true] {
                let screen = screenshot_with_pattern(&[(20, 30)]);
                let (rects, _) = find_template(&screen, &spec(threshold, grayscale)).unwrap();
                assert_eq!(rects.len(), 1, "threshold {threshold} grayscale {grayscale}");
                assert_eq!(rects[0].center(), Point::new(26, 36));
                assert_eq!(rects[0].width(), PATTERN_SIZE as i32);
            }
        }
    }

    #[test]
    fn finds_both_non_overlapping_occurrences() {
        let screen = screenshot_with_pattern(&[(20, 30), (70, 10)]);
        let (rects, _) = find_template(&screen, &spec(0.9, false)).unwrap();
        assert_eq!(rects.len(), 2);
        let centers: Vec<Point> = rects.iter().map(Rect::center).collect();
        assert!(centers.contains(&Point::new(26, 36)));
        assert!(centers.contains(&Point::new(76, 16)));
    }

    #[test]
    fn absent_template_yields_no_matches() {
        let screen = screenshot_with_pattern(&[]);
        let (rects, _) = find_template(&screen, &spec(0.8, false)).unwrap();
        assert!(rects.is_empty());
    }

    #[test]
    fn diagnostics_buffer_follows_grayscale_flag() {
        let screen = screenshot_with_pattern(&[(20, 30)]);
        let (_, color) = find_template(&screen, &spec(0.9, false)).unwrap();
        assert!(matches!(color, DynamicImage::ImageRgba8(_)));
        let (_, gray) = find_template(&screen, &spec(0.9, true)).unwrap();
        assert!(matches!(gray, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn oversized_template_is_an_error() {
        let screen = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            8,
            8,
            image::Rgba([8, 8, 8, 255]),
        ));
        assert!(matches!(
            find_template(&screen, &spec(0.8, false)),
            Err(Error::InvalidElement(_))
        ));
    }

    #[test]
    fn garbage_template_bytes_fail_decode() {
        let bad = ImageSpec {
            name: "bad".into(),
            bytes: vec![0, 1, 2, 3],
            threshold: 0.8,
            grayscale: false,
        };
        let screen = screenshot_with_pattern(&[]);
        assert!(matches!(
            find_template(&screen, &bad),
            Err(Error::Decode(_))
        ));
    }
}
