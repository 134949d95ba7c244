//! Pipeline stages for image-to-HTML conversion.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. switch OCR backend) without touching other
//! stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ ocr ──▶ extract ──▶ detect ──▶ render
//! (URL/path) (service) (page text) (contours)  (HTML + PNGs)
//! ```
//!
//! 1. [`input`]   — canonicalise the user-supplied path or URL to a local file
//! 2. `ocr`       — submit the image bytes to the OCR service; lives in
//!    [`crate::ocr`] behind the provider trait, the only stage with network I/O
//! 3. [`extract`] — read the full-page text out of the service response
//! 4. [`detect`]  — threshold, trace contours, crop elements; runs in
//!    `spawn_blocking` because the work is CPU-bound
//! 5. [`render`]  — write element PNGs and assemble the HTML document

pub mod detect;
pub mod extract;
pub mod input;
pub mod render;
