//! Output types returned by the conversion entry points.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The result of a successful conversion.
///
/// Serialisable so the CLI can print it with `--json` and embedders can
/// persist run records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// The complete HTML document.
    pub html: String,
    /// The full-page text as returned by the OCR service.
    pub text: String,
    /// One record per cropped visual element, in document order.
    pub elements: Vec<ElementRecord>,
    /// Run statistics.
    pub stats: ConversionStats,
}

/// A cropped visual element written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementRecord {
    /// Zero-based index; also the `<N>` in the element file name.
    pub index: usize,
    /// Left edge of the bounding rectangle in source-image pixels.
    pub x: u32,
    /// Top edge of the bounding rectangle in source-image pixels.
    pub y: u32,
    /// Bounding rectangle width in pixels.
    pub width: u32,
    /// Bounding rectangle height in pixels.
    pub height: u32,
    /// Path the element PNG was written to.
    pub path: PathBuf,
}

/// Statistics about a conversion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Paragraphs rendered into the document.
    pub paragraphs: usize,
    /// Visual elements cropped and written.
    pub elements: usize,
    /// Wall-clock time of the OCR call, including retries.
    pub ocr_duration_ms: u64,
    /// Wall-clock time of threshold + contour + crop.
    pub detect_duration_ms: u64,
    /// Wall-clock time of element encoding and HTML assembly.
    pub render_duration_ms: u64,
    /// Total pipeline wall-clock time.
    pub total_duration_ms: u64,
}
