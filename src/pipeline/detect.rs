//! Region detection: threshold the image and crop one sub-image per contour.
//!
//! ## Why spawn_blocking?
//!
//! Decoding, building the binary mask, and tracing contours are CPU-bound on
//! large scans. `tokio::task::spawn_blocking` moves the work onto a thread
//! designed for blocking operations, preventing the runtime's worker threads
//! from stalling.
//!
//! ## The mask
//!
//! The transform is binary-inverse: luma at or below the threshold becomes
//! foreground (255), brighter pixels become background (0). Documents are
//! dark ink on light paper, so inverting makes the ink the foreground that
//! the contour finder traces. Only outer borders are kept — the hole inside
//! a ring-shaped region is not its own element.

use crate::config::ConversionConfig;
use crate::error::Img2HtmlError;
use image::{DynamicImage, GrayImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use std::path::Path;
use tracing::debug;

/// Axis-aligned bounding rectangle of a contour, in source-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One cropped region of the input image.
#[derive(Debug)]
pub struct VisualElement {
    pub bounds: Bounds,
    /// Owned crop of the original colour image.
    pub image: DynamicImage,
}

/// Detect visual regions in the image at `path`.
///
/// Re-reads the image from disk — the OCR stage's bytes are not reused, so a
/// detector failure cannot be caused by anything the analyzer did.
///
/// # Returns
/// Cropped elements in contour-finder order (implementation-defined, not
/// sorted by position or size). An empty vector means the mask had no
/// foreground; the orchestrator turns that into
/// [`Img2HtmlError::NoRegionsDetected`].
pub async fn detect_regions(
    image_path: &Path,
    config: &ConversionConfig,
) -> Result<Vec<VisualElement>, Img2HtmlError> {
    let path = image_path.to_path_buf();
    let threshold = config.threshold;
    let min_region_px = config.min_region_px;

    tokio::task::spawn_blocking(move || detect_regions_blocking(&path, threshold, min_region_px))
        .await
        .map_err(|e| Img2HtmlError::Internal(format!("Detection task panicked: {}", e)))?
}

/// Blocking implementation of region detection.
fn detect_regions_blocking(
    path: &Path,
    threshold: u8,
    min_region_px: u32,
) -> Result<Vec<VisualElement>, Img2HtmlError> {
    let img = image::open(path).map_err(|e| Img2HtmlError::ImageDecodeFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    let mask = binary_inverse_mask(&img, threshold);
    let contours = find_contours::<u32>(&mask);
    debug!("Found {} contours ({} raw)", outer_count(&contours), contours.len());

    let mut elements = Vec::new();
    for contour in &contours {
        if contour.border_type != BorderType::Outer || contour.points.is_empty() {
            continue;
        }

        let bounds = bounding_rect(contour);
        if bounds.width.min(bounds.height) < min_region_px {
            continue;
        }

        let crop = img.crop_imm(bounds.x, bounds.y, bounds.width, bounds.height);
        elements.push(VisualElement {
            bounds,
            image: crop,
        });
    }

    debug!("Cropped {} visual elements", elements.len());
    Ok(elements)
}

/// Grayscale + binary-inverse threshold: luma > `threshold` → 0, else 255.
fn binary_inverse_mask(img: &DynamicImage, threshold: u8) -> GrayImage {
    let gray = img.to_luma8();
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y).0[0] > threshold {
            image::Luma([0u8])
        } else {
            image::Luma([255u8])
        }
    })
}

/// Smallest axis-aligned rectangle enclosing the contour's points.
fn bounding_rect(contour: &Contour<u32>) -> Bounds {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    for p in &contour.points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Bounds {
        x: min_x,
        y: min_y,
        width: max_x - min_x + 1,
        height: max_y - min_y + 1,
    }
}

fn outer_count(contours: &[Contour<u32>]) -> usize {
    contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer)
        .count()
}
