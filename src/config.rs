//! Configuration types for image-to-HTML conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across calls, serialise them for logging, and
//! diff two runs to understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A dozen-field constructor is unreadable and breaks on every new field.
//! The builder pattern lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::error::Img2HtmlError;
use crate::ocr::OcrProvider;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default OCR endpoint: Google Cloud Vision `images:annotate`.
pub const DEFAULT_OCR_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Environment variable consulted when no API key is set on the config.
pub const API_KEY_ENV: &str = "GOOGLE_VISION_API_KEY";

/// Configuration for an image-to-HTML conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use img2html::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .threshold(150)
///     .language_hints(["en"])
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Grayscale cut-off for the binary-inverse transform. Default: 150.
    ///
    /// Pixels with luma at or below the threshold become foreground (255) in
    /// the mask; brighter pixels become background (0). 150 separates ink
    /// from paper on typical scans; raise it for faint pencil strokes, lower
    /// it for noisy photographs where shadows would merge into one blob.
    pub threshold: u8,

    /// Minimum shorter side, in pixels, for a region to be kept. Default: 0.
    ///
    /// 0 keeps every contour, matching the raw detector output. Setting this
    /// to 3–5 discards single-pixel speckles that would otherwise each
    /// produce their own element file.
    pub min_region_px: u32,

    /// Directory element PNGs are written into. Default: `"."`.
    ///
    /// The HTML references elements by bare file name, so this should be the
    /// directory the output HTML is served from.
    pub element_dir: PathBuf,

    /// File stem for element PNGs (`<stem>_<N>.png`). Default: `"element"`.
    pub element_stem: String,

    /// Language hints forwarded to the OCR service. Default: empty.
    ///
    /// The service auto-detects language well; hints only help for short
    /// snippets or visually ambiguous scripts.
    pub language_hints: Vec<String>,

    /// OCR API key. If `None`, read from the `GOOGLE_VISION_API_KEY`
    /// environment variable when the provider is resolved.
    pub api_key: Option<String>,

    /// OCR endpoint URL. Default: [`DEFAULT_OCR_ENDPOINT`].
    ///
    /// Overridable for regional endpoints or a local test double.
    pub endpoint: String,

    /// Pre-constructed OCR provider. Takes precedence over `api_key` /
    /// `endpoint`. Useful in tests or when the caller needs custom
    /// middleware (caching, rate-limiting).
    pub provider: Option<Arc<dyn OcrProvider>>,

    /// Maximum retry attempts on a transient OCR HTTP failure. Default: 3.
    ///
    /// Most 5xx and timeout errors are transient (overloaded backend,
    /// network blip). Permanent errors (bad API key, 400, an error status in
    /// the response body) are not retried.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles after each attempt: 500 ms → 1 s → 2 s.
    pub retry_backoff_ms: u64,

    /// Per-OCR-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional progress callback fired at stage boundaries.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            threshold: 150,
            min_region_px: 0,
            element_dir: PathBuf::from("."),
            element_stem: "element".to_string(),
            language_hints: Vec::new(),
            api_key: None,
            endpoint: DEFAULT_OCR_ENDPOINT.to_string(),
            provider: None,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("threshold", &self.threshold)
            .field("min_region_px", &self.min_region_px)
            .field("element_dir", &self.element_dir)
            .field("element_stem", &self.element_stem)
            .field("language_hints", &self.language_hints)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn OcrProvider>"))
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn threshold(mut self, threshold: u8) -> Self {
        self.config.threshold = threshold;
        self
    }

    pub fn min_region_px(mut self, px: u32) -> Self {
        self.config.min_region_px = px;
        self
    }

    pub fn element_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.element_dir = dir.into();
        self
    }

    pub fn element_stem(mut self, stem: impl Into<String>) -> Self {
        self.config.element_stem = stem.into();
        self
    }

    pub fn language_hints<I, S>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.language_hints = hints.into_iter().map(Into::into).collect();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn provider(mut self, provider: Arc<dyn OcrProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Img2HtmlError> {
        let c = &self.config;
        if c.element_stem.is_empty() {
            return Err(Img2HtmlError::InvalidConfig(
                "Element file stem must not be empty".into(),
            ));
        }
        if c.element_stem.contains(['/', '\\']) {
            return Err(Img2HtmlError::InvalidConfig(format!(
                "Element file stem must not contain path separators, got '{}'",
                c.element_stem
            )));
        }
        if c.endpoint.is_empty() {
            return Err(Img2HtmlError::InvalidConfig(
                "OCR endpoint must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_values() {
        let c = ConversionConfig::default();
        assert_eq!(c.threshold, 150);
        assert_eq!(c.min_region_px, 0);
        assert_eq!(c.element_stem, "element");
        assert_eq!(c.endpoint, DEFAULT_OCR_ENDPOINT);
        assert_eq!(c.max_retries, 3);
    }

    #[test]
    fn builder_sets_fields() {
        let c = ConversionConfig::builder()
            .threshold(200)
            .min_region_px(3)
            .element_stem("region")
            .language_hints(["en", "fr"])
            .build()
            .expect("valid config");
        assert_eq!(c.threshold, 200);
        assert_eq!(c.min_region_px, 3);
        assert_eq!(c.element_stem, "region");
        assert_eq!(c.language_hints, vec!["en", "fr"]);
    }

    #[test]
    fn empty_element_stem_rejected() {
        let err = ConversionConfig::builder()
            .element_stem("")
            .build()
            .unwrap_err();
        assert!(matches!(err, Img2HtmlError::InvalidConfig(_)));
    }

    #[test]
    fn element_stem_with_separator_rejected() {
        let err = ConversionConfig::builder()
            .element_stem("../element")
            .build()
            .unwrap_err();
        assert!(matches!(err, Img2HtmlError::InvalidConfig(_)));
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = ConversionConfig::builder()
            .api_key("secret-key")
            .build()
            .expect("valid config");
        let dbg = format!("{:?}", c);
        assert!(!dbg.contains("secret-key"));
        assert!(dbg.contains("<redacted>"));
    }
}
