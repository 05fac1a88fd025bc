//! Single-page PDF encoder for price quotations.
//!
//! Lines of text and an optional logo go in, a self-contained PDF-1.4 byte
//! buffer comes out. Writing does not go through a PDF library: objects,
//! stream lengths and the cross-reference table are emitted directly.
//!
//! ```no_run
//! let pdf = quotepdf::encode_quote(&["RFQ-20250101-AB12", "Subtotal: 100.00 ILS"], None);
//! assert!(pdf.starts_with(b"%PDF-1.4"));
//! ```

mod config;
mod content;
mod document;
mod error;
mod logo;
mod metrics;
mod pdf;
mod pdfinspect;
mod perf;
mod sanitize;
mod types;

pub use config::{ImageOptions, QuoteLayout};
pub use content::{
    Command, FONT_RESOURCE, IMAGE_RESOURCE, build_commands, build_content_stream, image_placement,
    render_commands,
};
pub use document::QuoteDocument;
pub use error::QuotePdfError;
pub use logo::{
    EmbeddedImage, ImageSource, Logo, LogoCache, embed_image, fitted_dimensions, resolve_logo,
};
pub use metrics::{BatchMetrics, EncodeMetrics};
pub use pdf::{
    IndirectObject, PDF_CATALOG_ID, PDF_CONTENT_ID, PDF_FONT_ID, PDF_IMAGE_ID, PDF_PAGE_ID,
    PDF_PAGES_ID, XrefTable, assemble_objects, build_pdf, write_pdf,
};
pub use pdfinspect::{
    PdfInspectError, PdfInspectErrorCode, PdfInspectReport, XrefReport, inspect_pdf_bytes,
    inspect_pdf_path, verify_xref,
};
pub use sanitize::{
    MAX_LINE_BYTES, sanitize_filename, sanitize_pdf_text, sanitize_pdf_text_with_limit,
};
pub use types::{Margins, Pt, Rect, Size};

use perf::PerfLogger;
use std::sync::Arc;
use std::time::Instant;

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// One entry of a batch encode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteRequest {
    pub lines: Vec<String>,
    pub image: Option<Vec<u8>>,
}

impl QuoteRequest {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines, image: None }
    }

    pub fn with_image(mut self, image: Vec<u8>) -> Self {
        self.image = Some(image);
        self
    }
}

pub struct QuoteEncoder {
    layout: QuoteLayout,
    image_options: ImageOptions,
    logo_cache: Option<Arc<LogoCache>>,
    perf: Option<PerfLogger>,
}

pub struct QuoteEncoderBuilder {
    layout: QuoteLayout,
    image_options: ImageOptions,
    logo_cache: Option<Arc<LogoCache>>,
    perf_path: Option<std::path::PathBuf>,
}

impl Default for QuoteEncoder {
    fn default() -> Self {
        Self {
            layout: QuoteLayout::default(),
            image_options: ImageOptions::default(),
            logo_cache: None,
            perf: None,
        }
    }
}

impl QuoteEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> QuoteEncoderBuilder {
        QuoteEncoderBuilder::new()
    }

    pub fn layout(&self) -> &QuoteLayout {
        &self.layout
    }

    pub fn image_options(&self) -> &ImageOptions {
        &self.image_options
    }

    /// Tries `sources` in order, consulting the logo cache when enabled.
    pub fn resolve_logo(&self, sources: &[ImageSource]) -> Logo {
        resolve_logo(sources, &self.image_options, self.logo_cache.as_deref())
    }

    /// Sanitizes and truncates `lines` and recompresses `image`. An image that
    /// cannot be decoded or re-encoded is dropped.
    pub fn prepare<S: AsRef<str>>(&self, lines: &[S], image: Option<&[u8]>) -> QuoteDocument {
        let logo = match image {
            Some(data) => self.logo_from_bytes(data, None),
            None => Logo::None,
        };
        QuoteDocument::new(lines, logo, &self.layout)
    }

    pub fn encode<S: AsRef<str>>(&self, lines: &[S], image: Option<&[u8]>) -> Vec<u8> {
        self.render(lines, image, None).0
    }

    pub fn encode_document(&self, document: &QuoteDocument) -> Vec<u8> {
        self.render_document(document, None, Instant::now()).0
    }

    pub fn encode_with_metrics<S: AsRef<str>>(
        &self,
        lines: &[S],
        image: Option<&[u8]>,
    ) -> (Vec<u8>, EncodeMetrics) {
        let out = self.render(lines, image, None);
        self.flush_perf();
        out
    }

    /// Streams the PDF into `writer`. Only the sink's I/O errors surface.
    pub fn encode_to_writer<S: AsRef<str>, W: std::io::Write>(
        &self,
        lines: &[S],
        image: Option<&[u8]>,
        writer: &mut W,
    ) -> Result<XrefTable, QuotePdfError> {
        let document = self.prepare(lines, image);
        let content = build_content_stream(&document, &self.layout);
        let objects = assemble_objects(&content, document.image(), &self.layout);
        let xref = write_pdf(writer, &objects)?;
        writer.flush()?;
        Ok(xref)
    }

    pub fn encode_to_file<S: AsRef<str>>(
        &self,
        lines: &[S],
        image: Option<&[u8]>,
        path: impl AsRef<std::path::Path>,
    ) -> Result<XrefTable, QuotePdfError> {
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        self.encode_to_writer(lines, image, &mut writer)
    }

    /// Encodes independent quotes in parallel. Output order follows input.
    pub fn encode_batch(&self, requests: &[QuoteRequest]) -> Vec<Vec<u8>> {
        self.encode_batch_with_metrics(requests).0
    }

    pub fn encode_batch_with_metrics(
        &self,
        requests: &[QuoteRequest],
    ) -> (Vec<Vec<u8>>, BatchMetrics) {
        use rayon::prelude::*;

        let results: Vec<(Vec<u8>, EncodeMetrics)> = requests
            .par_iter()
            .enumerate()
            .map(|(idx, request)| self.render(&request.lines, request.image.as_deref(), Some(idx)))
            .collect();
        self.flush_perf();

        let (outputs, metrics): (Vec<Vec<u8>>, Vec<EncodeMetrics>) = results.into_iter().unzip();
        (outputs, BatchMetrics::from_quotes(metrics))
    }

    fn logo_from_bytes(&self, data: &[u8], quote_id: Option<usize>) -> Logo {
        let span = self.perf.as_ref().map(|perf| perf.start("quote.logo", quote_id));
        let logo = match self.logo_cache.as_deref() {
            Some(cache) => cache
                .embed(data, &self.image_options)
                .map(Logo::Image)
                .unwrap_or_default(),
            None => Logo::from_bytes(data, &self.image_options),
        };
        if let Some(span) = span {
            span.finish();
        }
        logo
    }

    fn render<S: AsRef<str>>(
        &self,
        lines: &[S],
        image: Option<&[u8]>,
        quote_id: Option<usize>,
    ) -> (Vec<u8>, EncodeMetrics) {
        let started = Instant::now();
        let logo = match image {
            Some(data) => self.logo_from_bytes(data, quote_id),
            None => Logo::None,
        };
        let document = QuoteDocument::new(lines, logo, &self.layout);
        self.render_document(&document, quote_id, started)
    }

    fn render_document(
        &self,
        document: &QuoteDocument,
        quote_id: Option<usize>,
        started: Instant,
    ) -> (Vec<u8>, EncodeMetrics) {
        let perf = self.perf.as_ref();

        let span = perf.map(|perf| perf.start("quote.content", quote_id));
        let content = build_content_stream(document, &self.layout);
        if let Some(span) = span {
            span.finish();
        }

        let span = perf.map(|perf| perf.start("quote.write", quote_id));
        let objects = assemble_objects(&content, document.image(), &self.layout);
        let (bytes, xref) = build_pdf(&objects);
        if let Some(span) = span {
            span.finish();
        }

        let metrics = EncodeMetrics {
            rendered_lines: document.lines().len(),
            dropped_lines: document.dropped_lines(),
            image_embedded: document.image().is_some(),
            content_bytes: content.len(),
            image_bytes: document.image().map(|image| image.jpeg.len()).unwrap_or(0),
            object_count: xref.object_count(),
            total_bytes: bytes.len(),
            encode_ms: started.elapsed().as_secs_f64() * 1000.0,
        };
        if let Some(perf) = perf {
            perf.log_counts(
                "quote.output",
                quote_id,
                &[
                    ("lines", metrics.rendered_lines as u64),
                    ("dropped_lines", metrics.dropped_lines as u64),
                    ("objects", metrics.object_count as u64),
                    ("bytes", metrics.total_bytes as u64),
                ],
            );
        }
        if metrics.dropped_lines > 0 {
            log::debug!(
                "quote truncated to {} lines, {} dropped",
                metrics.rendered_lines,
                metrics.dropped_lines
            );
        }
        log::debug!(
            "quote encoded: {} objects, {} bytes, image={}",
            metrics.object_count,
            metrics.total_bytes,
            metrics.image_embedded
        );
        (bytes, metrics)
    }

    fn flush_perf(&self) {
        if let Some(perf) = self.perf.as_ref() {
            perf.flush();
        }
    }
}

impl Default for QuoteEncoderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QuoteEncoderBuilder {
    pub fn new() -> Self {
        Self {
            layout: QuoteLayout::default(),
            image_options: ImageOptions::default(),
            logo_cache: None,
            perf_path: None,
        }
    }

    pub fn layout(mut self, layout: QuoteLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn page_size(mut self, size: Size) -> Self {
        self.layout.page_size = size;
        self
    }

    pub fn margins(mut self, margins: Margins) -> Self {
        self.layout.margins = margins;
        self
    }

    pub fn text_origin(mut self, x: f32, y: f32) -> Self {
        self.layout.text_origin = (Pt::from_f32(x), Pt::from_f32(y));
        self
    }

    pub fn font_size(mut self, size: f32) -> Self {
        self.layout.font_size = Pt::from_f32(size);
        self
    }

    pub fn leading(mut self, leading: f32) -> Self {
        self.layout.leading = Pt::from_f32(leading);
        self
    }

    pub fn max_lines(mut self, max_lines: usize) -> Self {
        self.layout.max_lines = max_lines;
        self
    }

    pub fn max_line_bytes(mut self, max_bytes: usize) -> Self {
        self.layout.max_line_bytes = max_bytes;
        self
    }

    pub fn logo_box(mut self, width: f32, height: f32) -> Self {
        self.layout.logo_box = Size::from_points(width, height);
        self
    }

    pub fn image_bounds(mut self, max_width: u32, max_height: u32) -> Self {
        self.image_options.max_width = max_width;
        self.image_options.max_height = max_height;
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.image_options.jpeg_quality = quality;
        self
    }

    // Share one cache between encoders that render the same logo.
    pub fn logo_cache(mut self, cache: Arc<LogoCache>) -> Self {
        self.logo_cache = Some(cache);
        self
    }

    pub fn cache_logos(mut self, enabled: bool) -> Self {
        self.logo_cache = if enabled {
            Some(Arc::new(LogoCache::default()))
        } else {
            None
        };
        self
    }

    // Enable performance logging to a JSONL file for timing/counter inspection.
    pub fn perf_log(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.perf_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<QuoteEncoder, QuotePdfError> {
        self.layout.validate()?;
        self.image_options.validate()?;
        let perf = match self.perf_path {
            Some(path) => Some(PerfLogger::new(path)?),
            None => None,
        };
        Ok(QuoteEncoder {
            layout: self.layout,
            image_options: self.image_options,
            logo_cache: self.logo_cache,
            perf,
        })
    }
}

/// Encodes a quote with the default layout.
pub fn encode_quote<S: AsRef<str>>(lines: &[S], image: Option<&[u8]>) -> Vec<u8> {
    QuoteEncoder::default().encode(lines, image)
}

/// `<sanitized name>.pdf`, suitable for a `Content-Disposition` header.
pub fn attachment_filename(name: &str) -> String {
    format!("{}.pdf", sanitize_filename(name))
}

/// `Content-Type` and `Content-Disposition` headers for serving a quote.
pub fn attachment_headers(name: &str) -> [(&'static str, String); 2] {
    [
        ("Content-Type", PDF_MIME_TYPE.to_string()),
        (
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", attachment_filename(name)),
        ),
    ]
}
