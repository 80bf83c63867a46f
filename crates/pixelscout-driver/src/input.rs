//! Input injection contract.
//!
//! Locating elements and acting on them are separate concerns; this
//! crate only locates. Callers that want to click what a [`Scout`]
//! found implement this trait over whatever injection mechanism the
//! platform offers and feed it a match's [`Rect::center`].
//!
//! [`Scout`]: crate::wait::Scout
//! [`Rect::center`]: pixelscout_core::geometry::Rect::center

use pixelscout_core::error::Result;
use pixelscout_core::geometry::Point;

/// Drives the pointer at absolute screen coordinates.
pub trait InputDriver: Send + Sync {
    /// Move the cursor to `target` without pressing anything.
    fn move_cursor(&self, target: Point) -> Result<()>;

    /// Click the primary button at `target`.
    fn click_at(&self, target: Point) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingDriver {
        clicks: Mutex<Vec<Point>>,
    }

    impl InputDriver for RecordingDriver {
        fn move_cursor(&self, _target: Point) -> Result<()> {
            Ok(())
        }

        fn click_at(&self, target: Point) -> Result<()> {
            self.clicks.lock().unwrap().push(target);
            Ok(())
        }
    }

    #[test]
    fn drives_clicks_at_match_centers() {
        use pixelscout_core::geometry::Rect;

        let driver = RecordingDriver::default();
        let found = Rect::new(110, 70, 130, 90).unwrap();
        driver.click_at(found.center()).unwrap();

        assert_eq!(*driver.clicks.lock().unwrap(), vec![Point::new(120, 80)]);
    }
}
