//! Async services for pixelscout.
//!
//! Everything stateful or platform-facing lives here, on top of the
//! pure recognition code in `pixelscout-core`:
//!
//! - [`screen`]: monitor enumeration and the time-cached screenshot
//!   service over a pluggable capture backend
//! - [`backend`]: the real capture backend (`screenshots` crate)
//! - [`recognizer`]: recognition dispatch and the OCR engine pool
//! - [`wait`]: the poll/retry wait orchestrator ([`wait::Scout`])
//! - [`input`]: the input injection contract
//!
//! Typical wiring:
//!
//! ```ignore
//! let scout = Scout::new(
//!     Arc::new(ScreenshotsBackend::new()),
//!     Box::new(MyOcrEngineFactory),
//!     ScoutConfig::default(),
//! );
//! let result = scout
//!     .wait_for(&element, Duration::from_secs(10), None, 0, MatchPolicy::RequireSingle)
//!     .await?;
//! ```

pub mod backend;
pub mod input;
pub mod recognizer;
pub mod screen;
pub mod wait;
