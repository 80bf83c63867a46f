//! The wait orchestrator.
//!
//! A [`Scout`] polls the screen until an element appears or a wait
//! budget runs out. Multi-element waits run one task per element over
//! shared services; a single [`CancellationToken`] lets the first
//! completion stop the rest. Cancellation is cooperative: it is
//! checked only between capture and recognition steps, in-flight
//! native calls run to completion and their results are discarded.
//!
//! Every wait makes at least one recognition attempt, even with a
//! zero budget, so a wait doubles as a plain "is it there right now"
//! check.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use pixelscout_core::element::Element;
use pixelscout_core::error::{Error, Result};
use pixelscout_core::geometry::{Monitor, Point, Rect};
use pixelscout_core::matching::ocr::OcrEngineFactory;
use pixelscout_core::results::{SearchResult, SearchResultCollection};

use crate::recognizer::{EnginePool, Recognizer};
use crate::screen::{CaptureBackend, ScreenService};

/// What a successful wait is required to look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Exactly one match; zero raises `NotFound`, several raise
    /// `MultipleMatches`, both after persisting a failure screenshot.
    RequireSingle,
    /// Return the raw result, however many matches it holds. Never
    /// raises on outcome, never persists screenshots.
    Ignore,
}

/// Wait tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoutConfig {
    /// Sleep between recognition attempts.
    pub poll_interval: Duration,
    /// Screenshot cache lifetime; zero disables the cache.
    pub cache_ttl: Duration,
    /// Where failure screenshots go. `None` disables persistence.
    pub failure_dir: Option<PathBuf>,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            cache_ttl: Duration::from_millis(500),
            failure_dir: None,
        }
    }
}

/// The element-waiting front door. Cheap to clone; all clones share
/// the screenshot cache and the OCR engine pool.
#[derive(Clone)]
pub struct Scout {
    inner: Arc<ScoutInner>,
}

struct ScoutInner {
    screen: ScreenService,
    recognizer: Recognizer,
    config: ScoutConfig,
}

/// What one element's poll loop ended with.
enum PollOutcome {
    Found(SearchResult),
    Exhausted { last: SearchResult, waited: Duration },
    Cancelled { element: Element, waited: Duration },
}

impl Scout {
    pub fn new(
        backend: Arc<dyn CaptureBackend>,
        factory: Box<dyn OcrEngineFactory>,
        config: ScoutConfig,
    ) -> Self {
        let screen = ScreenService::new(backend, config.cache_ttl);
        let recognizer = Recognizer::new(EnginePool::new(factory));
        Self {
            inner: Arc::new(ScoutInner {
                screen,
                recognizer,
                config,
            }),
        }
    }

    /// The attached displays.
    pub async fn monitors(&self) -> Result<Vec<Monitor>> {
        Ok(self.inner.screen.monitors().await?.to_vec())
    }

    /// Wait for one element on one monitor.
    ///
    /// `search_rect` is in absolute screen coordinates and must lie
    /// inside the monitor; matches come back in absolute screen
    /// coordinates regardless of cropping.
    pub async fn wait_for(
        &self,
        element: &Element,
        timeout: Duration,
        search_rect: Option<Rect>,
        monitor_index: usize,
        policy: MatchPolicy,
    ) -> Result<SearchResult> {
        let monitor = self.inner.screen.monitor(monitor_index).await?;
        let (local, origin) = localize(&monitor, search_rect)?;
        info!(element = %element, timeout = ?timeout, "waiting for element");

        let outcome = self
            .inner
            .poll_one(
                element.clone(),
                monitor,
                local,
                origin,
                timeout,
                CancellationToken::new(),
            )
            .await?;
        self.inner.finalize(outcome, policy)
    }

    /// Wait until any one of `elements` appears; the first branch to
    /// complete wins and the rest are cancelled and drained.
    pub async fn wait_for_any(
        &self,
        elements: &[Element],
        timeout: Duration,
        search_rect: Option<Rect>,
        monitor_index: usize,
        policy: MatchPolicy,
    ) -> Result<SearchResult> {
        validate_set(elements)?;
        let monitor = self.inner.screen.monitor(monitor_index).await?;
        let (local, origin) = localize(&monitor, search_rect)?;
        info!(count = elements.len(), timeout = ?timeout, "waiting for any element");

        let token = CancellationToken::new();
        let mut set = JoinSet::new();
        for element in elements {
            let inner = self.inner.clone();
            let element = element.clone();
            let token = token.clone();
            set.spawn(async move {
                inner
                    .poll_one(element, monitor, local, origin, timeout, token)
                    .await
            });
        }

        let first = match set.join_next().await {
            Some(Ok(result)) => result,
            Some(Err(e)) => Err(Error::TaskJoin(e.to_string())),
            // Non-empty by validation
            None => Err(Error::EmptyElementSet),
        };
        token.cancel();
        while set.join_next().await.is_some() {}

        self.inner.finalize(first?, policy)
    }

    /// Wait until every element in `elements` has been resolved, then
    /// finalize each branch independently.
    ///
    /// A capture or recognition fault cancels the remaining branches
    /// and propagates. Otherwise every branch runs its full budget;
    /// failures are finalized in caller order, each persisting its own
    /// screenshot, and the first error wins.
    pub async fn wait_for_all(
        &self,
        elements: &[Element],
        timeout: Duration,
        search_rect: Option<Rect>,
        monitor_index: usize,
        policy: MatchPolicy,
    ) -> Result<SearchResultCollection> {
        validate_set(elements)?;
        let monitor = self.inner.screen.monitor(monitor_index).await?;
        let (local, origin) = localize(&monitor, search_rect)?;
        info!(count = elements.len(), timeout = ?timeout, "waiting for all elements");

        let token = CancellationToken::new();
        let mut set = JoinSet::new();
        for (index, element) in elements.iter().enumerate() {
            let inner = self.inner.clone();
            let element = element.clone();
            let token = token.clone();
            set.spawn(async move {
                let outcome = inner
                    .poll_one(element, monitor, local, origin, timeout, token)
                    .await;
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<PollOutcome>> = Vec::new();
        slots.resize_with(elements.len(), || None);
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, Ok(outcome))) => slots[index] = Some(outcome),
                Ok((_, Err(fault))) => {
                    token.cancel();
                    while set.join_next().await.is_some() {}
                    return Err(fault);
                }
                Err(e) => {
                    token.cancel();
                    while set.join_next().await.is_some() {}
                    return Err(Error::TaskJoin(e.to_string()));
                }
            }
        }

        let mut results = Vec::with_capacity(elements.len());
        let mut first_error = None;
        for slot in &mut slots {
            let Some(outcome) = slot.take() else {
                return Err(Error::TaskJoin("a wait branch vanished".into()));
            };
            match self.inner.finalize(outcome, policy) {
                Ok(result) => results.push(result),
                Err(e) => first_error = first_error.or(Some(e)),
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => SearchResultCollection::new(results),
        }
    }
}

impl ScoutInner {
    /// One element's poll loop. Coordinates in the outcome are already
    /// absolute.
    async fn poll_one(
        &self,
        element: Element,
        monitor: Monitor,
        local: Option<Rect>,
        origin: Point,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<PollOutcome> {
        let start = Instant::now();
        let mut last = SearchResult::not_found(element.clone(), None);
        loop {
            if cancel.is_cancelled() {
                return Ok(PollOutcome::Cancelled {
                    element,
                    waited: start.elapsed(),
                });
            }
            let shot = self.screen.screenshot(&monitor).await?;
            let mut image = DynamicImage::ImageRgba8(shot);
            if let Some(rect) = local {
                image = image.crop_imm(
                    rect.left() as u32,
                    rect.top() as u32,
                    rect.width() as u32,
                    rect.height() as u32,
                );
            }
            if cancel.is_cancelled() {
                return Ok(PollOutcome::Cancelled {
                    element,
                    waited: start.elapsed(),
                });
            }
            let result = self.recognizer.recognize(element.clone(), image).await?;
            if cancel.is_cancelled() {
                return Ok(PollOutcome::Cancelled {
                    element,
                    waited: start.elapsed(),
                });
            }
            if result.success() {
                info!(
                    element = element.name(),
                    matches = result.rects().len(),
                    waited = ?start.elapsed(),
                    "element found"
                );
                return Ok(PollOutcome::Found(result.offset_by(origin.x, origin.y)?));
            }
            last = result;
            if start.elapsed() >= timeout {
                break;
            }
            debug!(element = element.name(), "not yet visible, retrying");
            tokio::select! {
                _ = cancel.cancelled() => {
                    return Ok(PollOutcome::Cancelled {
                        element,
                        waited: start.elapsed(),
                    });
                }
                _ = sleep(self.config.poll_interval) => {}
            }
        }
        Ok(PollOutcome::Exhausted {
            last,
            waited: start.elapsed(),
        })
    }

    fn finalize(&self, outcome: PollOutcome, policy: MatchPolicy) -> Result<SearchResult> {
        match outcome {
            PollOutcome::Found(result) => match policy {
                MatchPolicy::Ignore => Ok(result),
                MatchPolicy::RequireSingle if result.single().is_some() => Ok(result),
                MatchPolicy::RequireSingle => {
                    let mut result = result;
                    self.persist_failure(&mut result);
                    Err(Error::MultipleMatches {
                        element: result.element().name().to_string(),
                        matches: result.rects().to_vec(),
                    })
                }
            },
            PollOutcome::Exhausted { last, waited } => match policy {
                MatchPolicy::Ignore => Ok(last),
                MatchPolicy::RequireSingle => {
                    let mut last = last;
                    self.persist_failure(&mut last);
                    Err(Error::NotFound {
                        element: last.element().name().to_string(),
                        waited,
                    })
                }
            },
            PollOutcome::Cancelled { element, waited } => match policy {
                MatchPolicy::Ignore => Ok(SearchResult::not_found(element, None)),
                MatchPolicy::RequireSingle => Err(Error::NotFound {
                    element: element.name().to_string(),
                    waited,
                }),
            },
        }
    }

    /// Best-effort failure screenshot. Never masks the error being
    /// raised; problems are logged and swallowed.
    fn persist_failure(&self, result: &mut SearchResult) {
        let Some(dir) = self.config.failure_dir.as_deref() else {
            return;
        };
        let Some(image) = result.take_screenshot() else {
            return;
        };
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%3f");
        let name = sanitize_name(result.element().name());
        let path = dir.join(format!("{stamp}_{name}.png"));
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!(dir = %dir.display(), error = %e, "could not create failure screenshot dir");
            return;
        }
        match image.save(&path) {
            Ok(()) => debug!(path = %path.display(), "saved failure screenshot"),
            Err(e) => warn!(path = %path.display(), error = %e, "could not save failure screenshot"),
        }
    }
}

fn validate_set(elements: &[Element]) -> Result<()> {
    if elements.is_empty() {
        return Err(Error::EmptyElementSet);
    }
    let mut seen = HashSet::with_capacity(elements.len());
    for element in elements {
        if !seen.insert(element.name().to_lowercase()) {
            return Err(Error::DuplicateElement {
                name: element.name().to_string(),
            });
        }
    }
    Ok(())
}

/// Translate an absolute search rect into monitor-local coordinates
/// and pick the origin successful matches are shifted by.
fn localize(monitor: &Monitor, search_rect: Option<Rect>) -> Result<(Option<Rect>, Point)> {
    match search_rect {
        None => Ok((None, monitor.bounds.top_left())),
        Some(rect) => {
            if !monitor.bounds.contains(&rect) {
                return Err(Error::InvalidRect(format!(
                    "search rect {rect} not inside monitor {} bounds {}",
                    monitor.index, monitor.bounds
                )));
            }
            let local = rect.offset_by(-monitor.bounds.left(), -monitor.bounds.top())?;
            Ok((Some(local), rect.top_left()))
        }
    }
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
