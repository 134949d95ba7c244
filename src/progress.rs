//! Progress-callback trait for pipeline stage events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! an event as each stage of the pipeline starts and finishes.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a channel, a WebSocket, or a terminal spinner without
//! the library knowing anything about how the host application communicates.

use std::fmt;
use std::sync::Arc;

/// The five stages of the conversion pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Normalise the input path or URL to a local file.
    Resolve,
    /// Submit the image to the OCR service and extract the page text.
    Analyze,
    /// Threshold, find contours, crop visual elements.
    Detect,
    /// Assemble the HTML document and write element PNGs.
    Render,
    /// Persist the HTML document to disk.
    Write,
}

impl Stage {
    /// Short human-readable label, used by the CLI spinner.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Resolve => "Resolving input",
            Stage::Analyze => "Analyzing image",
            Stage::Detect => "Detecting regions",
            Stage::Render => "Rendering HTML",
            Stage::Write => "Writing output",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Called by the conversion pipeline at stage boundaries.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Stages run sequentially, so implementations are
/// never called concurrently; the `Send + Sync` bound exists because the
/// callback is stored in a config that can cross thread boundaries.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called just before a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes successfully.
    ///
    /// `items` is the stage's countable output where one exists: paragraphs
    /// for [`Stage::Render`], cropped regions for [`Stage::Detect`],
    /// detected characters for [`Stage::Analyze`], 0 otherwise.
    fn on_stage_complete(&self, stage: Stage, items: usize) {
        let _ = (stage, items);
    }

    /// Called once after the final stage, with the element and paragraph
    /// counts of the finished document.
    fn on_pipeline_complete(&self, elements: usize, paragraphs: usize) {
        let _ = (elements, paragraphs);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;
