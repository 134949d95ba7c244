//! OCR provider trait and the Google Cloud Vision implementation.
//!
//! The pipeline talks to the OCR service through the object-safe
//! [`OcrProvider`] trait so tests and embedders can substitute the HTTP
//! client with a canned implementation. The shipped implementation,
//! [`GoogleVisionOcr`], posts a single `images:annotate` request with one
//! `TEXT_DETECTION` feature and deserialises the batch response.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 5xx and transport errors are transient and worth retrying with
//! exponential backoff (`retry_backoff_ms * 2^attempt`): with a 500 ms base
//! and 3 retries the wait sequence is 500 ms → 1 s → 2 s. An error *status in
//! the response body* is a service verdict about the image or the key, not a
//! transport glitch — it is returned immediately without retry.

use crate::config::{ConversionConfig, API_KEY_ENV};
use crate::error::Img2HtmlError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

// ── Wire types ───────────────────────────────────────────────────────────

/// Request envelope: the service accepts a batch, we always send one entry.
#[derive(Debug, Serialize)]
struct AnnotateRequest {
    requests: Vec<AnnotateImageRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageRequest {
    image: ImageContent,
    features: Vec<Feature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_context: Option<ImageContext>,
}

#[derive(Debug, Serialize)]
struct ImageContent {
    /// Base64-encoded raw image bytes.
    content: String,
}

#[derive(Debug, Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageContext {
    language_hints: Vec<String>,
}

/// Response envelope: one entry per request in the batch.
#[derive(Debug, Clone, Default, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

/// The OCR result for a single image.
///
/// Only the fields the pipeline consumes are modelled; the service returns
/// considerably more (block/word geometry, confidence) which deserialisation
/// ignores.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotateImageResponse {
    /// Detected text, coarsest first: index 0 covers the whole page.
    #[serde(default)]
    pub text_annotations: Vec<TextAnnotation>,
    /// Set when the service could not process the image.
    #[serde(default)]
    pub error: Option<Status>,
}

/// One detected text span.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAnnotation {
    /// The recognised text. For the first annotation this is the full page.
    #[serde(default)]
    pub description: String,
    /// BCP-47 language code, when the service reports one.
    #[serde(default)]
    pub locale: Option<String>,
}

impl TextAnnotation {
    /// Convenience constructor, mostly for stub providers in tests.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            locale: None,
        }
    }
}

/// A `google.rpc.Status` error payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

// ── Provider trait ───────────────────────────────────────────────────────

/// Submits raw image bytes to an OCR backend.
#[async_trait]
pub trait OcrProvider: Send + Sync {
    /// Run text detection on the image and return the parsed response.
    ///
    /// Implementations map transport and service failures to
    /// [`Img2HtmlError`]; a successful return may still carry zero
    /// annotations (blank image).
    async fn annotate(&self, image_bytes: &[u8]) -> Result<AnnotateImageResponse, Img2HtmlError>;
}

// ── Google Cloud Vision ──────────────────────────────────────────────────

/// [`OcrProvider`] backed by the Google Cloud Vision REST API.
pub struct GoogleVisionOcr {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    language_hints: Vec<String>,
    max_retries: u32,
    retry_backoff_ms: u64,
    api_timeout_secs: u64,
}

impl GoogleVisionOcr {
    /// Build a provider from the conversion config.
    ///
    /// The API key is taken from `config.api_key` or, failing that, the
    /// `GOOGLE_VISION_API_KEY` environment variable. A missing key is a
    /// configuration error reported before any network I/O.
    pub fn from_config(config: &ConversionConfig) -> Result<Self, Img2HtmlError> {
        let api_key = match &config.api_key {
            Some(key) if !key.is_empty() => key.clone(),
            _ => std::env::var(API_KEY_ENV)
                .ok()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| Img2HtmlError::ApiKeyMissing {
                    hint: format!(
                        "Set {API_KEY_ENV} or pass --api-key.\n\
                         Keys are created in the Google Cloud console under APIs & Services."
                    ),
                })?,
        };

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| Img2HtmlError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            language_hints: config.language_hints.clone(),
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            api_timeout_secs: config.api_timeout_secs,
        })
    }

    fn build_request(&self, image_bytes: &[u8]) -> AnnotateRequest {
        let content = STANDARD.encode(image_bytes);
        debug!("Encoded image → {} bytes base64", content.len());

        let image_context = if self.language_hints.is_empty() {
            None
        } else {
            Some(ImageContext {
                language_hints: self.language_hints.clone(),
            })
        };

        AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: ImageContent { content },
                features: vec![Feature {
                    kind: "TEXT_DETECTION",
                }],
                image_context,
            }],
        }
    }

    /// One HTTP attempt. `Ok(Err(reason))` marks a retryable failure.
    async fn attempt(
        &self,
        body: &AnnotateRequest,
    ) -> Result<Result<AnnotateImageResponse, String>, Img2HtmlError> {
        let url = format!("{}?key={}", self.endpoint, self.api_key);

        let response = match self.client.post(&url).json(body).send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => return Ok(Err(format!("timed out: {e}"))),
            Err(e) if e.is_connect() => return Ok(Err(format!("connection failed: {e}"))),
            Err(e) => {
                return Err(Img2HtmlError::OcrRequestFailed {
                    reason: e.to_string(),
                })
            }
        };

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            return Ok(Err(format!("HTTP {status}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Img2HtmlError::OcrRequestFailed {
                reason: format!("HTTP {status}: {body}"),
            });
        }

        let parsed: AnnotateResponse =
            response
                .json()
                .await
                .map_err(|e| Img2HtmlError::OcrRequestFailed {
                    reason: format!("invalid response body: {e}"),
                })?;

        let inner = parsed.responses.into_iter().next().unwrap_or_default();

        // An error status in the body is the service's final answer for this
        // image; retrying the identical request cannot change it.
        if let Some(status) = &inner.error {
            if !status.message.is_empty() {
                return Err(Img2HtmlError::OcrApiError {
                    code: status.code,
                    message: status.message.clone(),
                });
            }
        }

        Ok(Ok(inner))
    }
}

#[async_trait]
impl OcrProvider for GoogleVisionOcr {
    async fn annotate(&self, image_bytes: &[u8]) -> Result<AnnotateImageResponse, Img2HtmlError> {
        let body = self.build_request(image_bytes);

        let mut last_err: Option<String> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "OCR retry {}/{} after {}ms",
                    attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match self.attempt(&body).await? {
                Ok(response) => {
                    debug!(
                        "OCR response: {} annotations",
                        response.text_annotations.len()
                    );
                    return Ok(response);
                }
                Err(reason) => {
                    warn!("OCR attempt {} failed — {}", attempt + 1, reason);
                    last_err = Some(reason);
                }
            }
        }

        let reason = last_err.unwrap_or_else(|| "unknown error".to_string());
        if reason.starts_with("timed out") {
            Err(Img2HtmlError::OcrTimeout {
                secs: self.api_timeout_secs,
            })
        } else {
            Err(Img2HtmlError::OcrRequestFailed { reason })
        }
    }
}
