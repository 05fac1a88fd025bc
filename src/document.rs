use crate::config::QuoteLayout;
use crate::logo::{EmbeddedImage, Logo};
use crate::sanitize::sanitize_pdf_text_with_limit;

/// One quote page: sanitized lines in render order plus the optional logo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteDocument {
    lines: Vec<String>,
    dropped_lines: usize,
    logo: Logo,
}

impl QuoteDocument {
    /// Sanitizes the first `layout.max_lines` lines; the rest are dropped.
    pub fn new<S: AsRef<str>>(lines: &[S], logo: Logo, layout: &QuoteLayout) -> Self {
        let kept = lines.len().min(layout.max_lines);
        Self {
            lines: lines[..kept]
                .iter()
                .map(|line| sanitize_pdf_text_with_limit(line.as_ref(), layout.max_line_bytes))
                .collect(),
            dropped_lines: lines.len() - kept,
            logo,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn dropped_lines(&self) -> usize {
        self.dropped_lines
    }

    pub fn logo(&self) -> &Logo {
        &self.logo
    }

    pub fn image(&self) -> Option<&EmbeddedImage> {
        self.logo.image()
    }
}
