//! Text extraction: pull the full-page text out of an OCR response.
//!
//! The service returns annotations coarsest-first: index 0 spans the whole
//! page, later entries repeat individual words. Only the first is consumed.

use crate::ocr::AnnotateImageResponse;

/// Return the full-page text, or `None` when the image contained none.
///
/// Whitespace-only descriptions count as no text — they would render to an
/// empty document.
pub fn primary_text(response: &AnnotateImageResponse) -> Option<String> {
    response
        .text_annotations
        .first()
        .map(|a| a.description.clone())
        .filter(|text| !text.trim().is_empty())
}
