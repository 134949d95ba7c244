//! # img2html
//!
//! Convert a raster image into a static HTML page using cloud OCR and
//! contour-based region cropping.
//!
//! ## Why this crate?
//!
//! Scans and photographed documents mix text with figures, stamps, and
//! diagrams. Plain OCR gives you the text but throws the visuals away.
//! This crate keeps both: the OCR service reads the page text, a
//! fixed-threshold contour pass locates the visual regions, and the two are
//! assembled into one self-contained HTML page with the cropped regions
//! saved alongside it.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image
//!  │
//!  ├─ 1. Input    resolve local file or download from URL
//!  ├─ 2. Analyze  submit bytes to the OCR service (Google Cloud Vision)
//!  ├─ 3. Extract  first text annotation → full-page text
//!  ├─ 4. Detect   grayscale → inverse threshold → outer contours → crops
//!  ├─ 5. Render   paragraphs + element_<N>.png images → HTML string
//!  └─ 6. Output   atomic write to output.html
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use img2html::{convert_to_file, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key read from GOOGLE_VISION_API_KEY
//!     let config = ConversionConfig::default();
//!     let output = convert_to_file("scan.jpg", "output.html", &config).await?;
//!     eprintln!(
//!         "{} paragraphs, {} elements",
//!         output.stats.paragraphs, output.stats.elements
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `img2html` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! img2html = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod ocr;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, API_KEY_ENV, DEFAULT_OCR_ENDPOINT};
pub use convert::{convert, convert_sync, convert_to_file};
pub use error::Img2HtmlError;
pub use ocr::{AnnotateImageResponse, GoogleVisionOcr, OcrProvider, Status, TextAnnotation};
pub use output::{ConversionOutput, ConversionStats, ElementRecord};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback, Stage};
