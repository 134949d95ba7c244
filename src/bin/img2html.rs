//! CLI binary for img2html.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use img2html::{
    convert_to_file, ConversionConfig, Img2HtmlError, PipelineProgressCallback, ProgressCallback,
    Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner that advances through the named
/// pipeline stages and logs a tick line as each one completes.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_message(format!("{}…", stage.label()));
    }

    fn on_stage_complete(&self, stage: Stage, items: usize) {
        let detail = match stage {
            Stage::Analyze => format!("{items} chars"),
            Stage::Detect => format!("{items} regions"),
            Stage::Render => format!("{items} paragraphs"),
            _ => String::new(),
        };
        self.bar.println(format!(
            "  {} {:<18} {}",
            green("✓"),
            stage.label(),
            dim(&detail)
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic conversion (writes output.html + element_<N>.png)
  img2html scan.jpg

  # Choose the output file and element directory
  img2html scan.jpg -o page.html --element-dir ./site

  # Tune the region detector
  img2html --threshold 180 --min-region 3 whiteboard.png

  # Convert from URL, JSON run record on stdout
  img2html https://example.com/receipt.jpg --json > run.json

  # Hint the OCR language
  img2html --language-hints ja,en menu.jpg

ENVIRONMENT VARIABLES:
  GOOGLE_VISION_API_KEY   OCR service API key (or pass --api-key)
  RUST_LOG                Tracing filter, e.g. img2html=debug

SETUP:
  1. Create an API key in the Google Cloud console (Vision API enabled).
  2. export GOOGLE_VISION_API_KEY=...
  3. img2html scan.jpg
"#;

/// Convert images to static HTML pages using cloud OCR.
#[derive(Parser, Debug)]
#[command(
    name = "img2html",
    version,
    about = "Convert images to static HTML pages using cloud OCR",
    long_about = "Convert a raster image (local file or URL) into a static HTML page. \
Text is read by the Google Cloud Vision OCR service; visual regions are located by \
contour detection, cropped, and embedded as numbered PNG files.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local image file path or HTTP/HTTPS URL.
    input: String,

    /// Write the HTML document to this file.
    #[arg(short, long, env = "IMG2HTML_OUTPUT", default_value = "output.html")]
    output: PathBuf,

    /// Grayscale cut-off for region detection (0-255).
    #[arg(long, env = "IMG2HTML_THRESHOLD", default_value_t = 150)]
    threshold: u8,

    /// Drop regions whose shorter side is below this many pixels.
    #[arg(long = "min-region", env = "IMG2HTML_MIN_REGION", default_value_t = 0)]
    min_region: u32,

    /// Directory element PNGs are written into.
    #[arg(long, env = "IMG2HTML_ELEMENT_DIR", default_value = ".")]
    element_dir: PathBuf,

    /// File stem for element PNGs (<stem>_<N>.png).
    #[arg(long, env = "IMG2HTML_ELEMENT_STEM", default_value = "element")]
    element_stem: String,

    /// Comma-separated language hints for the OCR service (e.g. "en,fr").
    #[arg(long, env = "IMG2HTML_LANGUAGE_HINTS", value_delimiter = ',')]
    language_hints: Vec<String>,

    /// OCR API key. Falls back to GOOGLE_VISION_API_KEY.
    #[arg(long, env = "GOOGLE_VISION_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OCR endpoint URL override (regional endpoints, test doubles).
    #[arg(long, env = "IMG2HTML_ENDPOINT")]
    endpoint: Option<String>,

    /// Retries on transient OCR failures.
    #[arg(long, env = "IMG2HTML_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Per-OCR-call timeout in seconds.
    #[arg(long, env = "IMG2HTML_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// HTTP download timeout in seconds (URL inputs).
    #[arg(long, env = "IMG2HTML_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print the run record as JSON on stdout.
    #[arg(long, env = "IMG2HTML_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "IMG2HTML_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "IMG2HTML_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "IMG2HTML_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active; the
    // spinner provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress = if show_progress {
        Some(CliProgressCallback::new())
    } else {
        None
    };

    let config = build_config(&cli, progress.clone().map(|cb| cb as ProgressCallback))?;

    // ── Run conversion ───────────────────────────────────────────────────
    let result = convert_to_file(&cli.input, &cli.output, &config).await;

    if let Some(ref cb) = progress {
        cb.finish();
    }

    let output = match result {
        Ok(output) => output,
        // "Nothing to assemble" aborts the pipeline but is not a process
        // failure: report it plainly and exit 0, matching the library's
        // guarantee that no output file was touched.
        Err(e @ Img2HtmlError::NoTextDetected) | Err(e @ Img2HtmlError::NoRegionsDetected) => {
            if !cli.quiet {
                eprintln!("{} {}", cyan("◆"), e);
            }
            return Ok(());
        }
        Err(e) => return Err(e).context("Conversion failed"),
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        eprintln!(
            "{}  {} paragraphs, {} elements  {}ms  →  {}",
            green("✔"),
            bold(&output.stats.paragraphs.to_string()),
            bold(&output.stats.elements.to_string()),
            output.stats.total_duration_ms,
            bold(&cli.output.display().to_string()),
        );
        for element in &output.elements {
            eprintln!(
                "   {} {}×{} at ({}, {})",
                dim(&element.path.display().to_string()),
                element.width,
                element.height,
                element.x,
                element.y,
            );
        }
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .threshold(cli.threshold)
        .min_region_px(cli.min_region)
        .element_dir(cli.element_dir.clone())
        .element_stem(cli.element_stem.clone())
        .language_hints(cli.language_hints.clone())
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(ref endpoint) = cli.endpoint {
        builder = builder.endpoint(endpoint.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
