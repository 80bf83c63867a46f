//! Screen geometry value types.
//!
//! `Rect` doubles as a monitor's screen bounds and as a search/match
//! bounding box, so the same invariants apply to both: coordinates are
//! non-negative and edges are ordered. Every transform returns a new
//! value; construction and transforms validate, they never clamp.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A point in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// An axis-aligned rectangle with inclusive left/top and exclusive
/// right/bottom edges.
///
/// Invariants, enforced at construction:
/// - all coordinates are >= 0
/// - `left <= right` and `top <= bottom`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
}

impl Rect {
    /// Create a rectangle from its four edges.
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Result<Self> {
        if left < 0 || top < 0 || right < 0 || bottom < 0 {
            return Err(Error::InvalidRect(format!(
                "negative coordinate in ({left}, {top}, {right}, {bottom})"
            )));
        }
        if left > right || top > bottom {
            return Err(Error::InvalidRect(format!(
                "misordered edges in ({left}, {top}, {right}, {bottom})"
            )));
        }
        Ok(Self {
            left,
            top,
            right,
            bottom,
        })
    }

    /// Create a rectangle from its top-left corner and size.
    pub fn from_size(left: i32, top: i32, width: i32, height: i32) -> Result<Self> {
        if width < 0 || height < 0 {
            return Err(Error::InvalidRect(format!(
                "negative size {width}x{height}"
            )));
        }
        Self::new(left, top, left + width, top + height)
    }

    pub fn left(&self) -> i32 {
        self.left
    }

    pub fn top(&self) -> i32 {
        self.top
    }

    pub fn right(&self) -> i32 {
        self.right
    }

    pub fn bottom(&self) -> i32 {
        self.bottom
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Center point, rounding the half-extent down.
    pub fn center(&self) -> Point {
        Point::new(self.left + self.width() / 2, self.top + self.height() / 2)
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.left, self.top)
    }

    pub fn top_right(&self) -> Point {
        Point::new(self.right, self.top)
    }

    pub fn bottom_left(&self) -> Point {
        Point::new(self.left, self.bottom)
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.right, self.bottom)
    }

    /// Whether `other` lies entirely inside this rectangle.
    pub fn contains(&self, other: &Rect) -> bool {
        other.left >= self.left
            && other.top >= self.top
            && other.right <= self.right
            && other.bottom <= self.bottom
    }

    /// The smallest rectangle enclosing both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Translate by `(dx, dy)`. Fails if the result would leave the
    /// non-negative coordinate space.
    pub fn offset_by(&self, dx: i32, dy: i32) -> Result<Self> {
        Self::new(
            self.left + dx,
            self.top + dy,
            self.right + dx,
            self.bottom + dy,
        )
    }

    /// A sub-rectangle keeping the left edge, `width` wide.
    pub fn from_left(&self, width: i32) -> Result<Self> {
        if width > self.width() {
            return Err(Error::InvalidRect(format!(
                "from_left width {width} exceeds parent width {}",
                self.width()
            )));
        }
        Self::from_size(self.left, self.top, width, self.height())
    }

    /// A `width` x `height` sub-rectangle sharing this rectangle's center.
    pub fn from_center(&self, width: i32, height: i32) -> Result<Self> {
        if width > self.width() || height > self.height() {
            return Err(Error::InvalidRect(format!(
                "from_center {width}x{height} exceeds parent {}x{}",
                self.width(),
                self.height()
            )));
        }
        let center = self.center();
        Self::from_size(center.x - width / 2, center.y - height / 2, width, height)
    }

    /// Scale all edges by `factor`, rounding to the nearest integer.
    pub fn scaled_by(&self, factor: f64) -> Result<Self> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(Error::InvalidRect(format!("invalid scale factor {factor}")));
        }
        let scale = |v: i32| (v as f64 * factor).round() as i32;
        Self::new(
            scale(self.left),
            scale(self.top),
            scale(self.right),
            scale(self.bottom),
        )
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {})-({}, {})",
            self.left, self.top, self.right, self.bottom
        )
    }
}

/// A display attached to the system.
///
/// The list of monitors is enumerated once per cache-service lifetime
/// and assumed static for that lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monitor {
    pub index: usize,
    pub bounds: Rect,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_coordinates() {
        assert!(Rect::new(-1, 0, 10, 10).is_err());
        assert!(Rect::new(0, -1, 10, 10).is_err());
        assert!(Rect::new(0, 0, -10, 10).is_err());
        assert!(Rect::new(0, 0, 10, -10).is_err());
    }

    #[test]
    fn rejects_misordered_edges() {
        assert!(Rect::new(10, 0, 5, 10).is_err());
        assert!(Rect::new(0, 10, 10, 5).is_err());
    }

    #[test]
    fn accepts_degenerate_rect() {
        // left == right and top == bottom is a valid zero-size rect
        let r = Rect::new(5, 5, 5, 5).unwrap();
        assert_eq!(r.width(), 0);
        assert_eq!(r.height(), 0);
    }

    #[test]
    fn derived_dimensions() {
        let r = Rect::new(10, 20, 30, 60).unwrap();
        assert_eq!(r.width(), 20);
        assert_eq!(r.height(), 40);
        assert_eq!(r.center(), Point::new(20, 40));
        assert_eq!(r.top_left(), Point::new(10, 20));
        assert_eq!(r.bottom_right(), Point::new(30, 60));
    }

    #[test]
    fn center_rounds_half_extent_down() {
        let r = Rect::new(0, 0, 5, 7).unwrap();
        assert_eq!(r.center(), Point::new(2, 3));
    }

    #[test]
    fn offset_by_translates_and_validates() {
        let r = Rect::new(10, 10, 20, 20).unwrap();
        let moved = r.offset_by(5, -3).unwrap();
        assert_eq!(moved, Rect::new(15, 7, 25, 17).unwrap());
        // Moving past the origin is rejected, not clamped
        assert!(r.offset_by(-11, 0).is_err());
    }

    #[test]
    fn from_left_keeps_left_edge() {
        let r = Rect::new(10, 10, 50, 30).unwrap();
        let sub = r.from_left(15).unwrap();
        assert_eq!(sub, Rect::new(10, 10, 25, 30).unwrap());
        assert!(r.from_left(41).is_err());
    }

    #[test]
    fn from_center_must_fit_parent() {
        let r = Rect::new(0, 0, 100, 100).unwrap();
        let sub = r.from_center(10, 20).unwrap();
        assert_eq!(sub, Rect::new(45, 40, 55, 60).unwrap());
        assert!(r.from_center(101, 10).is_err());
        assert!(r.contains(&sub));
    }

    #[test]
    fn scaled_by_rounds() {
        let r = Rect::new(2, 4, 10, 20).unwrap();
        assert_eq!(r.scaled_by(0.5).unwrap(), Rect::new(1, 2, 5, 10).unwrap());
        assert_eq!(r.scaled_by(2.0).unwrap(), Rect::new(4, 8, 20, 40).unwrap());
        assert!(r.scaled_by(0.0).is_err());
        assert!(r.scaled_by(f64::NAN).is_err());
    }

    #[test]
    fn union_encloses_both() {
        let a = Rect::new(10, 10, 20, 20).unwrap();
        let b = Rect::new(5, 15, 12, 40).unwrap();
        assert_eq!(a.union(&b), Rect::new(5, 10, 20, 40).unwrap());
        assert_eq!(a.union(&a), a);
    }

    #[test]
    fn contains_checks_all_edges() {
        let outer = Rect::new(0, 0, 100, 100).unwrap();
        let inner = Rect::new(10, 10, 90, 90).unwrap();
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        let straddling = Rect::new(50, 50, 150, 90).unwrap();
        assert!(!outer.contains(&straddling));
    }

    #[test]
    fn serde_round_trip() {
        let m = Monitor {
            index: 1,
            bounds: Rect::new(1920, 0, 3840, 1080).unwrap(),
        };
        let json = serde_json::to_string(&m).unwrap();
        let back: Monitor = serde_json::from_str(&json).unwrap();
        assert_eq!(m, back);
    }
}
