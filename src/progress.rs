//! Progress-callback trait for compile events.
//!
//! Inject an [`Arc<dyn CompileProgressCallback>`] via
//! [`crate::config::CompilerConfigBuilder::progress_callback`] to hear about
//! each stage of a compile: validation, asset loading, the compiler run.
//! The CLI uses it to drive a spinner; a server could forward the events to a
//! log or a WebSocket.
//!
//! # Example
//!
//! ```rust
//! use labelsheet::{CompileProgressCallback, CompilerConfig};
//! use std::sync::Arc;
//!
//! struct Announce;
//!
//! impl CompileProgressCallback for Announce {
//!     fn on_render_start(&self, renderer: &str) {
//!         eprintln!("running {renderer}…");
//!     }
//! }
//!
//! let config = CompilerConfig::builder()
//!     .progress_callback(Arc::new(Announce) as Arc<dyn CompileProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by [`crate::compile::compile`] as it moves through its stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait CompileProgressCallback: Send + Sync {
    /// Called once the placement list has been validated.
    ///
    /// # Arguments
    /// * `label_count`: number of placements in the request
    /// * `hidden`:      placements dropped by gap truncation
    fn on_compile_start(&self, label_count: usize, hidden: usize) {
        let _ = (label_count, hidden);
    }

    /// Called after each image is loaded from the store.
    fn on_asset_loaded(&self, filename: &str, size: usize) {
        let _ = (filename, size);
    }

    /// Called just before the renderer is invoked.
    fn on_render_start(&self, renderer: &str) {
        let _ = renderer;
    }

    /// Called when a PDF has been produced.
    fn on_compile_complete(&self, pdf_len: usize, duration_ms: u64) {
        let _ = (pdf_len, duration_ms);
    }

    /// Called when the compile fails at any stage, validation included.
    ///
    /// Either this or [`Self::on_compile_complete`] ends every compile.
    fn on_compile_error(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl CompileProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::CompilerConfig`].
pub type ProgressCallback = Arc<dyn CompileProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        labels: AtomicUsize,
        assets: AtomicUsize,
        errors: AtomicUsize,
        pdf_len: AtomicUsize,
    }

    impl CompileProgressCallback for TrackingCallback {
        fn on_compile_start(&self, label_count: usize, _hidden: usize) {
            self.labels.store(label_count, Ordering::SeqCst);
        }

        fn on_asset_loaded(&self, _filename: &str, _size: usize) {
            self.assets.fetch_add(1, Ordering::SeqCst);
        }

        fn on_compile_complete(&self, pdf_len: usize, _duration_ms: u64) {
            self.pdf_len.store(pdf_len, Ordering::SeqCst);
        }

        fn on_compile_error(&self, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_compile_start(2, 0);
        cb.on_asset_loaded("a.png", 10);
        cb.on_render_start("pdflatex");
        cb.on_compile_complete(1024, 5);
        cb.on_compile_error("boom");
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_compile_start(3, 1);
        tracker.on_asset_loaded("a.png", 10);
        tracker.on_asset_loaded("b.png", 20);
        tracker.on_render_start("pdflatex");
        tracker.on_compile_complete(4096, 120);

        assert_eq!(tracker.labels.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.assets.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.pdf_len.load(Ordering::SeqCst), 4096);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_compile_start(1, 0);
        cb.on_render_start("fake");
    }
}
