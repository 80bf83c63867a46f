//! Recognition dispatch and the OCR engine pool.
//!
//! Template matching is stateless, but OCR engines are expensive to
//! build and not safe for concurrent use. The pool keeps one primary
//! engine in a slot; the first concurrent caller takes it, later
//! callers get a throwaway engine from the factory that is dropped on
//! release. Uncontended waits therefore reuse one engine across every
//! poll attempt, while concurrent waits never serialize on it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::DynamicImage;
use tracing::{debug, trace};
use uuid::Uuid;

use pixelscout_core::element::Element;
use pixelscout_core::error::{Error, Result};
use pixelscout_core::matching::image::find_template;
use pixelscout_core::matching::ocr::{OcrEngine, OcrEngineFactory};
use pixelscout_core::matching::text::find_text;
use pixelscout_core::results::SearchResult;

struct PooledEngine {
    id: Uuid,
    engine: Box<dyn OcrEngine>,
}

struct PoolInner {
    factory: Box<dyn OcrEngineFactory>,
    primary: Mutex<Option<PooledEngine>>,
    in_flight: AtomicUsize,
}

/// A pool of OCR engines built lazily from a factory.
#[derive(Clone)]
pub struct EnginePool {
    inner: Arc<PoolInner>,
}

impl EnginePool {
    pub fn new(factory: Box<dyn OcrEngineFactory>) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                factory,
                primary: Mutex::new(None),
                in_flight: AtomicUsize::new(0),
            }),
        }
    }

    /// Check out an engine. The lease returns it on drop.
    pub fn acquire(&self) -> Result<EngineLease> {
        let prior = self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        let acquired = if prior == 0 {
            let slot = self.take_primary();
            match slot {
                Some(engine) => {
                    trace!(engine = %engine.id, "reusing pooled engine");
                    Ok(engine)
                }
                None => self.build_engine("primary"),
            }
        } else {
            // Contended: a throwaway engine, never pooled.
            self.build_engine("throwaway")
        };
        match acquired {
            Ok(engine) => Ok(EngineLease {
                pool: self.inner.clone(),
                primary: prior == 0,
                engine: Some(engine),
            }),
            Err(e) => {
                self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    fn take_primary(&self) -> Option<PooledEngine> {
        // A panic while an engine was checked out cannot corrupt the
        // slot; recover the value instead of propagating the poison.
        match self.inner.primary.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }

    fn build_engine(&self, role: &str) -> Result<PooledEngine> {
        let engine = self.inner.factory.create()?;
        let id = Uuid::new_v4();
        debug!(engine = %id, role, "built ocr engine");
        Ok(PooledEngine { id, engine })
    }
}

/// A checked-out engine. Dropping the lease returns a primary engine
/// to the pool and discards a throwaway one.
pub struct EngineLease {
    pool: Arc<PoolInner>,
    primary: bool,
    engine: Option<PooledEngine>,
}

impl EngineLease {
    fn engine_mut(&mut self) -> &mut dyn OcrEngine {
        match self.engine.as_mut() {
            Some(pooled) => pooled.engine.as_mut(),
            // The option is only emptied in drop
            None => unreachable!("lease used after release"),
        }
    }
}

impl Drop for EngineLease {
    fn drop(&mut self) {
        if self.primary {
            if let Some(engine) = self.engine.take() {
                match self.pool.primary.lock() {
                    Ok(mut slot) => *slot = Some(engine),
                    Err(poisoned) => *poisoned.into_inner() = Some(engine),
                }
            }
        }
        self.pool.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runs one recognition attempt for one element on one screenshot.
#[derive(Clone)]
pub struct Recognizer {
    pool: EnginePool,
}

impl Recognizer {
    pub fn new(pool: EnginePool) -> Self {
        Self { pool }
    }

    /// Recognize `element` in `screenshot`.
    ///
    /// The work is CPU-bound (correlation or OCR), so it runs on the
    /// blocking thread pool. Coordinates in the returned result are
    /// local to `screenshot`.
    pub async fn recognize(
        &self,
        element: Element,
        screenshot: DynamicImage,
    ) -> Result<SearchResult> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let (rects, diagnostics) = match &element {
                Element::Image(spec) => find_template(&screenshot, spec)?,
                Element::Text(spec) => {
                    let mut lease = pool.acquire()?;
                    find_text(&screenshot, spec, lease.engine_mut())?
                }
            };
            trace!(element = element.name(), matches = rects.len(), "recognition attempt");
            Ok(SearchResult::new(element, rects, Some(diagnostics)))
        })
        .await
        .map_err(|e| Error::TaskJoin(e.to_string()))?
    }
}
