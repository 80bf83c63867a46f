//! OS capture backend over the `screenshots` crate.
//!
//! All `screenshots` calls are blocking, so every operation runs on
//! the blocking thread pool. Captured buffers are rebuilt from raw
//! pixels into our own `image` types immediately, so the image
//! version re-exported by `screenshots` never leaks into the rest of
//! the workspace.

use async_trait::async_trait;
use image::RgbaImage;
use screenshots::Screen;
use tracing::debug;

use pixelscout_core::error::{Error, Result};
use pixelscout_core::geometry::{Monitor, Rect};

use crate::screen::CaptureBackend;

/// Captures real displays.
#[derive(Debug, Default)]
pub struct ScreenshotsBackend;

impl ScreenshotsBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CaptureBackend for ScreenshotsBackend {
    async fn list_displays(&self) -> Result<Vec<Monitor>> {
        tokio::task::spawn_blocking(|| {
            let screens = Screen::all().map_err(Error::capture)?;
            screens
                .iter()
                .enumerate()
                .map(|(index, screen)| {
                    let info = screen.display_info;
                    Ok(Monitor {
                        index,
                        bounds: Rect::from_size(
                            info.x,
                            info.y,
                            info.width as i32,
                            info.height as i32,
                        )?,
                    })
                })
                .collect()
        })
        .await
        .map_err(|e| Error::TaskJoin(e.to_string()))?
    }

    async fn capture(&self, monitor: &Monitor) -> Result<RgbaImage> {
        let bounds = monitor.bounds;
        let index = monitor.index;
        tokio::task::spawn_blocking(move || {
            let screen =
                Screen::from_point(bounds.left(), bounds.top()).map_err(Error::capture)?;
            let shot = screen.capture().map_err(Error::capture)?;
            debug!(
                monitor = index,
                width = shot.width(),
                height = shot.height(),
                "captured display"
            );
            let (width, height) = shot.dimensions();
            RgbaImage::from_raw(width, height, shot.into_raw()).ok_or_else(|| {
                Error::capture(format!(
                    "capture buffer for monitor {index} has wrong length for {width}x{height}"
                ))
            })
        })
        .await
        .map_err(|e| Error::TaskJoin(e.to_string()))?
    }
}
