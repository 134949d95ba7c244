//! Conversion entry points.
//!
//! [`convert`] runs the pipeline and returns the assembled document in
//! memory; [`convert_to_file`] additionally persists it. The stages run in
//! strict order and the first error aborts the remainder — when the abort
//! happens before the write stage, no output file is created or modified.

use crate::config::ConversionConfig;
use crate::error::Img2HtmlError;
use crate::ocr::{GoogleVisionOcr, OcrProvider};
use crate::output::{ConversionOutput, ConversionStats};
use crate::pipeline::{detect, extract, input, render};
use crate::progress::Stage;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Convert an image file or URL to an HTML document.
///
/// This is the primary entry point for the library. Element PNGs are written
/// as a side effect of the render stage; the HTML itself is only returned,
/// not written — use [`convert_to_file`] for that.
///
/// # Arguments
/// * `input_str` — Local file path or HTTP/HTTPS URL to an image
/// * `config` — Conversion configuration
///
/// # Errors
/// * Input errors — file not found, unreadable, not an image
/// * OCR errors — missing API key, request failure, service error status
/// * [`Img2HtmlError::NoTextDetected`] / [`Img2HtmlError::NoRegionsDetected`]
///   — the pipeline aborted because a stage produced nothing to assemble
pub async fn convert(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Img2HtmlError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting conversion: {}", input_str);

    let cb = config.progress_callback.clone();
    let stage_start = |stage: Stage| {
        if let Some(ref cb) = cb {
            cb.on_stage_start(stage);
        }
    };
    let stage_complete = |stage: Stage, items: usize| {
        if let Some(ref cb) = cb {
            cb.on_stage_complete(stage, items);
        }
    };

    // ── Step 1: Resolve input ────────────────────────────────────────────
    stage_start(Stage::Resolve);
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let image_path = resolved.path().to_path_buf();
    stage_complete(Stage::Resolve, 0);

    // ── Step 2: Analyze via OCR ──────────────────────────────────────────
    stage_start(Stage::Analyze);
    let provider = resolve_provider(config)?;
    let image_bytes =
        tokio::fs::read(&image_path)
            .await
            .map_err(|e| Img2HtmlError::OcrRequestFailed {
                reason: format!("failed to read '{}': {}", image_path.display(), e),
            })?;

    let ocr_start = Instant::now();
    let response = provider.annotate(&image_bytes).await?;
    let ocr_duration_ms = ocr_start.elapsed().as_millis() as u64;

    // A provider may hand back an error status instead of mapping it itself;
    // the orchestrator enforces the same verdict for every implementation.
    if let Some(status) = &response.error {
        if !status.message.is_empty() {
            return Err(Img2HtmlError::OcrApiError {
                code: status.code,
                message: status.message.clone(),
            });
        }
    }

    // ── Step 3: Extract text ─────────────────────────────────────────────
    let text = extract::primary_text(&response).ok_or(Img2HtmlError::NoTextDetected)?;
    info!("OCR returned {} characters in {}ms", text.len(), ocr_duration_ms);
    stage_complete(Stage::Analyze, text.len());

    // ── Step 4: Detect visual regions ────────────────────────────────────
    stage_start(Stage::Detect);
    let detect_start = Instant::now();
    let elements = detect::detect_regions(&image_path, config).await?;
    let detect_duration_ms = detect_start.elapsed().as_millis() as u64;
    if elements.is_empty() {
        return Err(Img2HtmlError::NoRegionsDetected);
    }
    debug!(
        "Detected {} regions in {}ms",
        elements.len(),
        detect_duration_ms
    );
    stage_complete(Stage::Detect, elements.len());

    // ── Step 5: Render document ──────────────────────────────────────────
    stage_start(Stage::Render);
    let render_start = Instant::now();
    let rendered = render::render_document(&text, elements, config).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    stage_complete(Stage::Render, rendered.paragraphs);

    let stats = ConversionStats {
        paragraphs: rendered.paragraphs,
        elements: rendered.elements.len(),
        ocr_duration_ms,
        detect_duration_ms,
        render_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Conversion complete: {} paragraphs, {} elements, {}ms total",
        stats.paragraphs, stats.elements, stats.total_duration_ms
    );

    if let Some(ref cb) = cb {
        cb.on_pipeline_complete(stats.elements, stats.paragraphs);
    }

    Ok(ConversionOutput {
        html: rendered.html,
        text,
        elements: rendered.elements,
        stats,
    })
}

/// Convert an image and write the HTML directly to a file.
///
/// Uses atomic write (temp file + rename) so a crash mid-write cannot leave
/// a truncated document; an existing file at `output_path` is replaced.
pub async fn convert_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Img2HtmlError> {
    let output = convert(input_str, config).await?;
    let path = output_path.as_ref();

    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(Stage::Write);
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Img2HtmlError::OutputWriteFailed {
                    path: path.to_path_buf(),
                    source: e,
                }
            })?;
        }
    }

    let tmp_path = path.with_extension("html.tmp");
    tokio::fs::write(&tmp_path, &output.html)
        .await
        .map_err(|e| Img2HtmlError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Img2HtmlError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    info!("HTML written to {}", path.display());
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_complete(Stage::Write, 0);
    }

    Ok(output)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Img2HtmlError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Img2HtmlError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_str, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Resolve the OCR provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — the caller constructed and
///    configured the provider entirely; we use it as-is. Useful in tests or
///    when the caller needs custom middleware.
///
/// 2. **Google Cloud Vision from config** — built from `config.api_key` /
///    `config.endpoint`, falling back to the `GOOGLE_VISION_API_KEY`
///    environment variable for the key.
fn resolve_provider(config: &ConversionConfig) -> Result<Arc<dyn OcrProvider>, Img2HtmlError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    Ok(Arc::new(GoogleVisionOcr::from_config(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::AnnotateImageResponse;
    use async_trait::async_trait;

    struct FixedOcr {
        response: AnnotateImageResponse,
    }

    #[async_trait]
    impl OcrProvider for FixedOcr {
        async fn annotate(
            &self,
            _image_bytes: &[u8],
        ) -> Result<AnnotateImageResponse, Img2HtmlError> {
            Ok(self.response.clone())
        }
    }

    #[test]
    fn resolve_provider_prefers_prebuilt() {
        let provider: Arc<dyn OcrProvider> = Arc::new(FixedOcr {
            response: AnnotateImageResponse::default(),
        });
        let config = ConversionConfig::builder()
            .provider(Arc::clone(&provider))
            .build()
            .expect("valid config");
        assert!(resolve_provider(&config).is_ok());
    }

    #[tokio::test]
    async fn missing_input_runs_no_stage() {
        // The stub would panic the test if annotate were reached with a
        // missing file; resolve_input must fail first.
        struct PanickingOcr;

        #[async_trait]
        impl OcrProvider for PanickingOcr {
            async fn annotate(
                &self,
                _image_bytes: &[u8],
            ) -> Result<AnnotateImageResponse, Img2HtmlError> {
                panic!("analyzer must not run for a missing input");
            }
        }

        let config = ConversionConfig::builder()
            .provider(Arc::new(PanickingOcr))
            .build()
            .expect("valid config");

        let err = convert("/no/such/input.png", &config).await.unwrap_err();
        assert!(matches!(err, Img2HtmlError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn body_error_status_maps_to_api_error() {
        use crate::ocr::Status;

        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("input.png");
        image::RgbImage::from_pixel(8, 8, image::Rgb([255, 255, 255]))
            .save(&input)
            .expect("save");

        let config = ConversionConfig::builder()
            .provider(Arc::new(FixedOcr {
                response: AnnotateImageResponse {
                    text_annotations: vec![],
                    error: Some(Status {
                        code: 7,
                        message: "API key invalid".into(),
                    }),
                },
            }))
            .element_dir(dir.path())
            .build()
            .expect("valid config");

        let err = convert(input.to_str().unwrap(), &config).await.unwrap_err();
        assert!(matches!(err, Img2HtmlError::OcrApiError { code: 7, .. }));
    }
}
