//! Progress-callback trait for extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::HandoverConfigBuilder::progress_callback`] to follow a run:
//! which model is being tried, which one failed and why, and where the
//! document ended up. The CLI uses it to drive its spinner; a service could
//! forward the events to a websocket.
//!
//! Every event carries the source name, since several inputs may be processed
//! concurrently with the same callback.
//!
//! # Example
//!
//! ```rust
//! use handover_docx::{ExtractionProgressCallback, HandoverConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct FailureCounter(AtomicUsize);
//!
//! impl ExtractionProgressCallback for FailureCounter {
//!     fn on_model_failed(&self, source: &str, model: &str, error: &str) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{source}: {model} failed: {error}");
//!     }
//! }
//!
//! let config = HandoverConfig::builder()
//!     .progress_callback(Arc::new(FailureCounter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the pipeline as it extracts and renders a record.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync`.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once the input is decoded, before the first model call.
    fn on_extraction_start(&self, source: &str, page_count: usize) {
        let _ = (source, page_count);
    }

    /// Called before each model in the priority list is tried.
    ///
    /// # Arguments
    /// * `attempt`: 1-indexed position in the model list
    /// * `total`: number of models that may be tried
    fn on_model_attempt(&self, source: &str, model: &str, attempt: usize, total: usize) {
        let _ = (source, model, attempt, total);
    }

    /// Called when a model fails after its retries; the next model follows.
    fn on_model_failed(&self, source: &str, model: &str, error: &str) {
        let _ = (source, model, error);
    }

    /// Called when a model returned a usable record.
    fn on_extraction_complete(&self, source: &str, model: &str, device_count: usize) {
        let _ = (source, model, device_count);
    }

    /// Called after the document has been written.
    fn on_document_written(&self, source: &str, path: &Path) {
        let _ = (source, path);
    }
}

/// A no-op implementation, used when no callback is configured.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::HandoverConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
