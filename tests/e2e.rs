//! End-to-end tests for img2html.
//!
//! Most tests here drive the full pipeline offline: a synthetic image on
//! disk, a stub `OcrProvider` in place of the network, and a `tempfile`
//! sandbox for every output file. They always run.
//!
//! Tests that make live OCR calls are gated behind the `E2E_ENABLED`
//! environment variable (plus `GOOGLE_VISION_API_KEY`) so they do not run in
//! CI unless explicitly requested:
//!
//!   E2E_ENABLED=1 GOOGLE_VISION_API_KEY=... cargo test --test e2e -- --nocapture

use img2html::{
    convert, convert_to_file, AnnotateImageResponse, ConversionConfig, Img2HtmlError, OcrProvider,
    TextAnnotation,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Stub provider returning a fixed response, no network involved.
struct FixedOcr {
    response: AnnotateImageResponse,
}

impl FixedOcr {
    fn with_text(text: &str) -> Arc<Self> {
        Arc::new(Self {
            response: AnnotateImageResponse {
                text_annotations: vec![
                    TextAnnotation::new(text),
                    // The service repeats individual words after the
                    // full-page annotation; the pipeline must ignore them.
                    TextAnnotation::new("word"),
                ],
                error: None,
            },
        })
    }

    fn empty() -> Arc<Self> {
        Arc::new(Self {
            response: AnnotateImageResponse::default(),
        })
    }
}

#[async_trait::async_trait]
impl OcrProvider for FixedOcr {
    async fn annotate(&self, _image_bytes: &[u8]) -> Result<AnnotateImageResponse, Img2HtmlError> {
        Ok(self.response.clone())
    }
}

/// Write a white PNG with black rectangles at the given bounds.
fn write_test_image(path: &Path, rects: &[(u32, u32, u32, u32)]) {
    let mut img = image::RgbImage::from_pixel(80, 80, image::Rgb([255, 255, 255]));
    for &(x, y, w, h) in rects {
        for dy in 0..h {
            for dx in 0..w {
                img.put_pixel(x + dx, y + dy, image::Rgb([0, 0, 0]));
            }
        }
    }
    img.save(path).expect("save test image");
}

/// A sandboxed config: stub OCR, elements written next to the input.
fn sandbox_config(provider: Arc<dyn OcrProvider>, dir: &Path) -> ConversionConfig {
    ConversionConfig::builder()
        .provider(provider)
        .element_dir(dir)
        .build()
        .expect("valid config")
}

// ── Offline pipeline tests (always run) ──────────────────────────────────────

#[tokio::test]
async fn full_pipeline_produces_html_and_elements() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("input.png");
    let output = dir.path().join("output.html");
    write_test_image(&input, &[(10, 10, 20, 12), (40, 50, 16, 16)]);

    let config = sandbox_config(FixedOcr::with_text("Hello\nWorld"), dir.path());
    let result = convert_to_file(input.to_str().unwrap(), &output, &config)
        .await
        .expect("conversion should succeed");

    // Exactly two paragraphs, in order.
    assert_eq!(result.stats.paragraphs, 2);
    assert_eq!(result.html.matches("<p>").count(), 2);
    let hello = result.html.find("<p>Hello</p>").expect("first paragraph");
    let world = result.html.find("<p>World</p>").expect("second paragraph");
    assert!(hello < world);

    // Exactly two elements, referenced in order, written to disk.
    assert_eq!(result.stats.elements, 2);
    let img0 = result.html.find(r#"<img src="element_0.png""#).expect("img 0");
    let img1 = result.html.find(r#"<img src="element_1.png""#).expect("img 1");
    assert!(img0 < img1);
    assert!(dir.path().join("element_0.png").exists());
    assert!(dir.path().join("element_1.png").exists());

    // The HTML file matches the returned document.
    let written = std::fs::read_to_string(&output).expect("read output");
    assert_eq!(written, result.html);
}

#[tokio::test]
async fn no_text_stops_before_any_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("input.png");
    let output = dir.path().join("output.html");
    write_test_image(&input, &[(10, 10, 20, 12)]);

    let config = sandbox_config(FixedOcr::empty(), dir.path());
    let err = convert_to_file(input.to_str().unwrap(), &output, &config)
        .await
        .unwrap_err();

    assert!(matches!(err, Img2HtmlError::NoTextDetected));
    assert!(!output.exists(), "no output.html on an empty OCR result");
    assert!(
        !dir.path().join("element_0.png").exists(),
        "no element files either"
    );
}

#[tokio::test]
async fn no_regions_stops_before_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("input.png");
    let output = dir.path().join("output.html");
    // Uniform white image: OCR "finds" text but the detector finds nothing.
    write_test_image(&input, &[]);

    let config = sandbox_config(FixedOcr::with_text("Hello"), dir.path());
    let err = convert_to_file(input.to_str().unwrap(), &output, &config)
        .await
        .unwrap_err();

    assert!(matches!(err, Img2HtmlError::NoRegionsDetected));
    assert!(!output.exists(), "no output.html without regions");
}

#[tokio::test]
async fn writer_overwrites_existing_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("input.png");
    let output = dir.path().join("output.html");
    write_test_image(&input, &[(10, 10, 20, 12)]);
    std::fs::write(&output, "stale content from a previous run").expect("seed output");

    let config = sandbox_config(FixedOcr::with_text("Fresh"), dir.path());
    let result = convert_to_file(input.to_str().unwrap(), &output, &config)
        .await
        .expect("conversion should succeed");

    let written = std::fs::read_to_string(&output).expect("read output");
    assert_eq!(written, result.html, "file holds exactly the new document");
    assert!(!written.contains("stale content"));
}

#[tokio::test]
async fn missing_input_touches_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("does_not_exist.png");
    let output = dir.path().join("output.html");

    let config = sandbox_config(FixedOcr::with_text("Hello"), dir.path());
    let err = convert_to_file(missing.to_str().unwrap(), &output, &config)
        .await
        .unwrap_err();

    assert!(matches!(err, Img2HtmlError::FileNotFound { .. }));
    assert!(!output.exists());
    assert_eq!(
        std::fs::read_dir(dir.path()).unwrap().count(),
        0,
        "sandbox must stay empty"
    );
}

#[tokio::test]
async fn stale_higher_index_elements_are_left_in_place() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("input.png");
    write_test_image(&input, &[(10, 10, 20, 12)]);
    // Pretend a previous run found three regions.
    std::fs::write(dir.path().join("element_2.png"), b"stale").expect("seed");

    let config = sandbox_config(FixedOcr::with_text("Hello"), dir.path());
    let result = convert(input.to_str().unwrap(), &config)
        .await
        .expect("conversion should succeed");

    assert_eq!(result.stats.elements, 1);
    assert!(dir.path().join("element_0.png").exists());
    assert!(
        dir.path().join("element_2.png").exists(),
        "stale files are not cleaned up"
    );
}

#[tokio::test]
async fn element_records_carry_bounds_and_paths() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("input.png");
    write_test_image(&input, &[(12, 8, 24, 10)]);

    let config = sandbox_config(FixedOcr::with_text("Hello"), dir.path());
    let result = convert(input.to_str().unwrap(), &config)
        .await
        .expect("conversion should succeed");

    assert_eq!(result.elements.len(), 1);
    let record = &result.elements[0];
    assert_eq!((record.x, record.y), (12, 8));
    assert_eq!((record.width, record.height), (24, 10));
    assert!(record.path.exists());

    // The run record serialises for --json consumers.
    let json = serde_json::to_string(&result).expect("serialise");
    assert!(json.contains("element_0.png"));
}

#[tokio::test]
async fn progress_callback_sees_all_stages() {
    use img2html::{PipelineProgressCallback, Stage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Recorder {
        stages: Mutex<Vec<Stage>>,
        finished: AtomicUsize,
    }

    impl PipelineProgressCallback for Recorder {
        fn on_stage_complete(&self, stage: Stage, _items: usize) {
            self.stages.lock().unwrap().push(stage);
        }
        fn on_pipeline_complete(&self, elements: usize, _paragraphs: usize) {
            self.finished.store(elements, Ordering::SeqCst);
        }
    }

    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("input.png");
    let output = dir.path().join("output.html");
    write_test_image(&input, &[(10, 10, 20, 12)]);

    let recorder = Arc::new(Recorder {
        stages: Mutex::new(Vec::new()),
        finished: AtomicUsize::new(0),
    });

    let config = ConversionConfig::builder()
        .provider(FixedOcr::with_text("Hello"))
        .element_dir(dir.path())
        .progress_callback(Arc::clone(&recorder) as img2html::ProgressCallback)
        .build()
        .expect("valid config");

    convert_to_file(input.to_str().unwrap(), &output, &config)
        .await
        .expect("conversion should succeed");

    let stages = recorder.stages.lock().unwrap().clone();
    assert_eq!(
        stages,
        vec![
            Stage::Resolve,
            Stage::Analyze,
            Stage::Detect,
            Stage::Render,
            Stage::Write
        ]
    );
    assert_eq!(recorder.finished.load(Ordering::SeqCst), 1);
}

#[test]
fn convert_sync_runs_the_pipeline() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("input.png");
    write_test_image(&input, &[(10, 10, 20, 12)]);

    let config = sandbox_config(FixedOcr::with_text("Hello"), dir.path());
    let result = img2html::convert_sync(input.to_str().unwrap(), &config)
        .expect("sync conversion should succeed");
    assert_eq!(result.stats.paragraphs, 1);
}

// ── Live OCR tests (gated) ───────────────────────────────────────────────────

/// Skip unless E2E_ENABLED and an API key are present.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        if std::env::var("GOOGLE_VISION_API_KEY").is_err() {
            println!("SKIP — GOOGLE_VISION_API_KEY not set");
            return;
        }
    }};
}

fn output_dir() -> PathBuf {
    let d = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases/output");
    std::fs::create_dir_all(&d).ok();
    d
}

/// Render a small "HELLO WORLD" image the service can read: black-on-white
/// blocks won't OCR, so draw text-like content from a bundled glyph-free
/// approach is not viable — instead this test uses any image the developer
/// drops at `test_cases/sample.jpg`.
#[tokio::test]
async fn live_conversion_smoke() {
    e2e_skip_unless_ready!();

    let sample = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_cases")
        .join("sample.jpg");
    if !sample.exists() {
        println!("SKIP — drop an image at test_cases/sample.jpg to run");
        return;
    }

    let out_dir = output_dir();
    let config = ConversionConfig::builder()
        .element_dir(&out_dir)
        .max_retries(2)
        .build()
        .expect("valid config");

    match convert_to_file(
        sample.to_str().unwrap(),
        out_dir.join("sample.html"),
        &config,
    )
    .await
    {
        Ok(result) => {
            assert!(!result.text.is_empty());
            assert!(result.stats.paragraphs >= 1);
            assert!(result.stats.elements >= 1);
            println!(
                "[live] {} paragraphs, {} elements, {}ms",
                result.stats.paragraphs, result.stats.elements, result.stats.total_duration_ms
            );
        }
        // A blank sample is a valid outcome, not a test failure.
        Err(e) if e.is_empty_outcome() => println!("[live] pipeline stopped early: {e}"),
        Err(e) => panic!("live conversion failed: {e}"),
    }
}

#[tokio::test]
async fn live_rejects_bad_api_key() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
        return;
    }

    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("input.png");
    write_test_image(&input, &[(10, 10, 20, 12)]);

    let config = ConversionConfig::builder()
        .api_key("definitely-not-a-key")
        .element_dir(dir.path())
        .max_retries(0)
        .build()
        .expect("valid config");

    let err = convert(input.to_str().unwrap(), &config).await.unwrap_err();
    match err {
        Img2HtmlError::OcrApiError { .. } | Img2HtmlError::OcrRequestFailed { .. } => {}
        other => panic!("expected a service error, got: {other}"),
    }
}
