//! Screen and monitor cache service.
//!
//! Captures are expensive and waits poll in a tight loop, so the
//! service memoizes the monitor list for its whole lifetime and keeps
//! the last capture in a short-lived time cache. Two independent
//! locks guard the two pieces of state, so display enumeration and
//! screenshot capture never contend with each other.
//!
//! Every read hands out an independent copy of the cached buffer —
//! callers own and drop their copy freely, and no two callers ever
//! share a mutable buffer.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use image::RgbaImage;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

use pixelscout_core::error::{Error, Result};
use pixelscout_core::geometry::Monitor;

/// The OS display/capture primitive.
///
/// Implementations are expected to do their blocking work on
/// `spawn_blocking`; the service awaits them directly.
#[async_trait]
pub trait CaptureBackend: Send + Sync + 'static {
    /// Enumerate attached displays.
    async fn list_displays(&self) -> Result<Vec<Monitor>>;

    /// Capture the full area of one monitor.
    async fn capture(&self, monitor: &Monitor) -> Result<RgbaImage>;
}

struct CachedShot {
    image: RgbaImage,
    taken: Instant,
    monitor_index: usize,
}

/// Monitor list + time-cached screenshots over a [`CaptureBackend`].
pub struct ScreenService {
    backend: Arc<dyn CaptureBackend>,
    cache_ttl: Duration,
    monitors: OnceCell<Vec<Monitor>>,
    shot: Mutex<Option<CachedShot>>,
}

impl ScreenService {
    /// A `cache_ttl` of zero disables the screenshot cache.
    pub fn new(backend: Arc<dyn CaptureBackend>, cache_ttl: Duration) -> Self {
        Self {
            backend,
            cache_ttl,
            monitors: OnceCell::new(),
            shot: Mutex::new(None),
        }
    }

    /// The memoized monitor list. The first caller pays the
    /// enumeration cost; concurrent callers await that enumeration
    /// rather than starting their own.
    pub async fn monitors(&self) -> Result<&[Monitor]> {
        let list = self
            .monitors
            .get_or_try_init(|| async {
                let list = self.backend.list_displays().await?;
                debug!(count = list.len(), "enumerated displays");
                Ok::<_, Error>(list)
            })
            .await?;
        Ok(list)
    }

    /// Look up a monitor by index.
    pub async fn monitor(&self, index: usize) -> Result<Monitor> {
        self.monitors()
            .await?
            .iter()
            .find(|m| m.index == index)
            .copied()
            .ok_or(Error::MonitorNotFound { index })
    }

    /// A screenshot of `monitor`, served from cache when the last
    /// capture was for the same monitor and is still fresh.
    ///
    /// The lock is held across the capture itself, so concurrent
    /// callers coalesce onto a single capture and then each receive
    /// their own copy. Switching monitors invalidates the cache
    /// implicitly via the stored index check.
    pub async fn screenshot(&self, monitor: &Monitor) -> Result<RgbaImage> {
        let mut slot = self.shot.lock().await;

        if self.cache_ttl > Duration::ZERO {
            if let Some(cached) = slot.as_ref() {
                if cached.monitor_index == monitor.index && cached.taken.elapsed() <= self.cache_ttl
                {
                    debug!(monitor = monitor.index, "serving cached screenshot");
                    return Ok(cached.image.clone());
                }
            }
        }

        let image = self.backend.capture(monitor).await?;
        debug!(
            monitor = monitor.index,
            width = image.width(),
            height = image.height(),
            "captured screenshot"
        );
        if self.cache_ttl > Duration::ZERO {
            let copy = image.clone();
            *slot = Some(CachedShot {
                image,
                taken: Instant::now(),
                monitor_index: monitor.index,
            });
            Ok(copy)
        } else {
            Ok(image)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use pixelscout_core::geometry::Rect;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeBackend {
        monitors: Vec<Monitor>,
        enumerations: AtomicUsize,
        captures: AtomicUsize,
    }

    impl FakeBackend {
        fn with_monitors(count: usize) -> Arc<Self> {
            let monitors = (0..count)
                .map(|index| Monitor {
                    index,
                    bounds: Rect::from_size(index as i32 * 200, 0, 200, 100).unwrap(),
                })
                .collect();
            Arc::new(Self {
                monitors,
                enumerations: AtomicUsize::new(0),
                captures: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CaptureBackend for FakeBackend {
        async fn list_displays(&self) -> Result<Vec<Monitor>> {
            self.enumerations.fetch_add(1, Ordering::SeqCst);
            Ok(self.monitors.clone())
        }

        async fn capture(&self, _monitor: &Monitor) -> Result<RgbaImage> {
            let n = self.captures.fetch_add(1, Ordering::SeqCst);
            // Encode the capture ordinal into the pixels so distinct
            // captures are distinguishable.
            Ok(RgbaImage::from_pixel(60, 40, Rgba([n as u8, 0, 0, 255])))
        }
    }

    #[tokio::test]
    async fn monitor_list_is_enumerated_once() {
        let backend = FakeBackend::with_monitors(2);
        let service = ScreenService::new(backend.clone(), Duration::ZERO);

        assert_eq!(service.monitors().await.unwrap().len(), 2);
        assert_eq!(service.monitors().await.unwrap().len(), 2);
        assert_eq!(backend.enumerations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_monitor_index_is_an_error() {
        let backend = FakeBackend::with_monitors(1);
        let service = ScreenService::new(backend, Duration::ZERO);

        assert!(service.monitor(0).await.is_ok());
        assert!(matches!(
            service.monitor(3).await,
            Err(Error::MonitorNotFound { index: 3 })
        ));
    }

    #[tokio::test]
    async fn fresh_cache_serves_identical_independent_copies() {
        let backend = FakeBackend::with_monitors(1);
        let service = ScreenService::new(backend.clone(), Duration::from_secs(5));
        let monitor = service.monitor(0).await.unwrap();

        let a = service.screenshot(&monitor).await.unwrap();
        let b = service.screenshot(&monitor).await.unwrap();

        assert_eq!(backend.captures.load(Ordering::SeqCst), 1);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn zero_ttl_disables_the_cache() {
        let backend = FakeBackend::with_monitors(1);
        let service = ScreenService::new(backend.clone(), Duration::ZERO);
        let monitor = service.monitor(0).await.unwrap();

        let a = service.screenshot(&monitor).await.unwrap();
        let b = service.screenshot(&monitor).await.unwrap();

        assert_eq!(backend.captures.load(Ordering::SeqCst), 2);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn expired_cache_triggers_exactly_one_new_capture() {
        let backend = FakeBackend::with_monitors(1);
        let service = ScreenService::new(backend.clone(), Duration::from_millis(40));
        let monitor = service.monitor(0).await.unwrap();

        let _ = service.screenshot(&monitor).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        let _ = service.screenshot(&monitor).await.unwrap();

        assert_eq!(backend.captures.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn switching_monitors_invalidates_the_cache() {
        let backend = FakeBackend::with_monitors(2);
        let service = ScreenService::new(backend.clone(), Duration::from_secs(5));
        let first = service.monitor(0).await.unwrap();
        let second = service.monitor(1).await.unwrap();

        let _ = service.screenshot(&first).await.unwrap();
        let _ = service.screenshot(&second).await.unwrap();
        // Back to the first monitor: the stored index no longer matches
        let _ = service.screenshot(&first).await.unwrap();

        assert_eq!(backend.captures.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn concurrent_callers_coalesce_onto_one_capture() {
        let backend = FakeBackend::with_monitors(1);
        let service = Arc::new(ScreenService::new(backend.clone(), Duration::from_secs(5)));
        let monitor = service.monitor(0).await.unwrap();

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.screenshot(&monitor).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(backend.captures.load(Ordering::SeqCst), 1);
    }
}
