//! Error types for the img2html library.
//!
//! A single [`Img2HtmlError`] enum covers every way a conversion can stop:
//! bad input, a misconfigured or failing OCR service, image processing
//! failures, and output I/O. Two variants deserve a note:
//!
//! * [`Img2HtmlError::NoTextDetected`] and
//!   [`Img2HtmlError::NoRegionsDetected`] are *empty-pipeline outcomes*, not
//!   faults — the input was processed correctly but produced nothing to
//!   assemble. They are still errors at the API level because the pipeline
//!   aborts without writing output, but callers (the CLI included) typically
//!   report them as ordinary messages rather than failures.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the img2html library.
#[derive(Debug, Error)]
pub enum Img2HtmlError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a supported raster image.
    #[error("File is not a supported image: '{path}'\nFirst bytes: {magic:?}")]
    NotAnImage { path: PathBuf, magic: [u8; 4] },

    // ── OCR service errors ────────────────────────────────────────────────
    /// No API key was configured and none was found in the environment.
    #[error("OCR service is not configured.\n{hint}")]
    ApiKeyMissing { hint: String },

    /// The HTTP request to the OCR service failed after all retries.
    #[error("OCR request failed: {reason}")]
    OcrRequestFailed { reason: String },

    /// The OCR call exceeded the configured timeout on every attempt.
    #[error("OCR call timed out after {secs}s\nIncrease --api-timeout.")]
    OcrTimeout { secs: u64 },

    /// The service answered but reported an error in the response body.
    #[error("OCR service error (code {code}): {message}")]
    OcrApiError { code: i32, message: String },

    // ── Pipeline outcomes ─────────────────────────────────────────────────
    /// The service returned no text annotations for the image.
    #[error("No text detected in the image")]
    NoTextDetected,

    /// Thresholding found no contours, so there is nothing to crop.
    #[error("No visual elements detected in the image")]
    NoRegionsDetected,

    // ── Processing errors ─────────────────────────────────────────────────
    /// The image crate could not decode the file.
    #[error("Failed to decode image '{path}': {detail}")]
    ImageDecodeFailed { path: PathBuf, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not encode or write a cropped element PNG.
    #[error("Failed to write element file '{path}': {detail}")]
    ElementWriteFailed { path: PathBuf, detail: String },

    /// Could not create or write the output HTML file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Img2HtmlError {
    /// True for the two empty-pipeline outcomes that abort the run without
    /// indicating a fault (no text, no regions).
    pub fn is_empty_outcome(&self) -> bool {
        matches!(
            self,
            Img2HtmlError::NoTextDetected | Img2HtmlError::NoRegionsDetected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_not_found_display() {
        let e = Img2HtmlError::FileNotFound {
            path: PathBuf::from("img2.jpg"),
        };
        assert!(e.to_string().contains("img2.jpg"));
    }

    #[test]
    fn ocr_api_error_display() {
        let e = Img2HtmlError::OcrApiError {
            code: 7,
            message: "permission denied".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("code 7"), "got: {msg}");
        assert!(msg.contains("permission denied"));
    }

    #[test]
    fn empty_outcomes_are_flagged() {
        assert!(Img2HtmlError::NoTextDetected.is_empty_outcome());
        assert!(Img2HtmlError::NoRegionsDetected.is_empty_outcome());
        assert!(!Img2HtmlError::Internal("x".into()).is_empty_outcome());
    }

    #[test]
    fn not_an_image_shows_magic() {
        let e = Img2HtmlError::NotAnImage {
            path: PathBuf::from("notes.txt"),
            magic: [0x25, 0x50, 0x44, 0x46],
        };
        assert!(e.to_string().contains("notes.txt"));
    }
}
