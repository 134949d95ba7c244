//! Rendering: assemble the HTML document and write element PNGs.
//!
//! Paragraphs come first, one `<p>` per non-blank line of the OCR text, then
//! one `<img>` per cropped element in detector order. Elements are written
//! as `<stem>_<N>.png` into the configured directory and referenced by bare
//! file name, so the HTML works when served from that same directory.
//!
//! PNG is used for the crops because it is lossless — a re-compressed JPEG
//! crop of a JPEG source accumulates artefacts, and the crops are small.

use crate::config::ConversionConfig;
use crate::error::Img2HtmlError;
use crate::output::ElementRecord;
use crate::pipeline::detect::VisualElement;
use tracing::debug;

/// Minimal embedded style: responsive images and a sans-serif body font.
const EMBEDDED_STYLE: &str =
    "img {max-width: 100%; height: auto;} body {font-family: Verdana, sans-serif;}";

/// The assembled document plus bookkeeping about what went into it.
pub struct RenderedDocument {
    pub html: String,
    pub paragraphs: usize,
    pub elements: Vec<ElementRecord>,
}

/// Render the document: write element files, then assemble the HTML string.
///
/// Element encoding and file I/O are blocking, so the whole stage runs in
/// `spawn_blocking`; the elements are moved in rather than borrowed.
pub async fn render_document(
    text: &str,
    elements: Vec<VisualElement>,
    config: &ConversionConfig,
) -> Result<RenderedDocument, Img2HtmlError> {
    let text = text.to_string();
    let element_dir = config.element_dir.clone();
    let element_stem = config.element_stem.clone();

    tokio::task::spawn_blocking(move || {
        render_document_blocking(&text, &elements, &element_dir, &element_stem)
    })
    .await
    .map_err(|e| Img2HtmlError::Internal(format!("Render task panicked: {}", e)))?
}

/// Blocking implementation of document rendering.
fn render_document_blocking(
    text: &str,
    elements: &[VisualElement],
    element_dir: &std::path::Path,
    element_stem: &str,
) -> Result<RenderedDocument, Img2HtmlError> {
    let mut html = String::with_capacity(text.len() + elements.len() * 64 + 256);
    html.push_str("<html><head><style>");
    html.push_str(EMBEDDED_STYLE);
    html.push_str("</style></head><body>");

    // One paragraph per non-blank line, original order. CRLF input is
    // normalised so a Windows-origin scan does not render `\r` into the page.
    let mut paragraphs = 0;
    for line in text.replace("\r\n", "\n").split('\n') {
        if line.trim().is_empty() {
            continue;
        }
        html.push_str("<p>");
        html.push_str(&escape_html(line));
        html.push_str("</p>");
        paragraphs += 1;
    }

    std::fs::create_dir_all(element_dir).map_err(|e| Img2HtmlError::ElementWriteFailed {
        path: element_dir.to_path_buf(),
        detail: e.to_string(),
    })?;

    let mut records = Vec::with_capacity(elements.len());
    for (idx, element) in elements.iter().enumerate() {
        let filename = format!("{element_stem}_{idx}.png");
        let path = element_dir.join(&filename);

        element
            .image
            .save_with_format(&path, image::ImageFormat::Png)
            .map_err(|e| Img2HtmlError::ElementWriteFailed {
                path: path.clone(),
                detail: e.to_string(),
            })?;
        debug!("Wrote element {} → {}", idx, path.display());

        html.push_str(&format!(
            r#"<img src="{filename}" alt="Element {idx}"><br>"#
        ));

        records.push(ElementRecord {
            index: idx,
            x: element.bounds.x,
            y: element.bounds.y,
            width: element.bounds.width,
            height: element.bounds.height,
            path,
        });
    }

    html.push_str("</body></html>");

    Ok(RenderedDocument {
        html,
        paragraphs,
        elements: records,
    })
}

/// Escape the characters with meaning in HTML text content.
fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}
