use crate::error::QuotePdfError;
use crate::sanitize::MAX_LINE_BYTES;
use crate::types::{Margins, Pt, Size};

/// Page geometry and text metrics for a quote page.
///
/// The defaults produce the standard layout: A4 media box, 50 pt margins,
/// Helvetica 12 pt with 16 pt leading starting at (50, 800), at most 45
/// lines, and a logo fitted into a 130 x 64 pt box in the top-right corner.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteLayout {
    pub page_size: Size,
    pub margins: Margins,
    pub text_origin: (Pt, Pt),
    pub font_size: Pt,
    pub leading: Pt,
    pub max_lines: usize,
    pub max_line_bytes: usize,
    pub logo_box: Size,
}

impl Default for QuoteLayout {
    fn default() -> Self {
        Self {
            page_size: Size::a4(),
            margins: Margins::all(50.0),
            text_origin: (Pt::from_i32(50), Pt::from_i32(800)),
            font_size: Pt::from_i32(12),
            leading: Pt::from_i32(16),
            max_lines: 45,
            max_line_bytes: MAX_LINE_BYTES,
            logo_box: Size::from_points(130.0, 64.0),
        }
    }
}

impl QuoteLayout {
    pub fn validate(&self) -> Result<(), QuotePdfError> {
        let positive = |value: Pt| value > Pt::ZERO;
        if !positive(self.page_size.width) || !positive(self.page_size.height) {
            return Err(QuotePdfError::InvalidConfiguration(
                "page_size must be positive".to_string(),
            ));
        }
        if !positive(self.font_size) || !positive(self.leading) {
            return Err(QuotePdfError::InvalidConfiguration(
                "font_size and leading must be positive".to_string(),
            ));
        }
        if !positive(self.logo_box.width) || !positive(self.logo_box.height) {
            return Err(QuotePdfError::InvalidConfiguration(
                "logo_box must be positive".to_string(),
            ));
        }
        if self.max_lines == 0 {
            return Err(QuotePdfError::InvalidConfiguration(
                "max_lines must be >= 1".to_string(),
            ));
        }
        if self.max_line_bytes == 0 {
            return Err(QuotePdfError::InvalidConfiguration(
                "max_line_bytes must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Recompression settings for the embedded logo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageOptions {
    pub max_width: u32,
    pub max_height: u32,
    pub jpeg_quality: u8,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            max_width: 700,
            max_height: 300,
            jpeg_quality: 82,
        }
    }
}

impl ImageOptions {
    pub fn validate(&self) -> Result<(), QuotePdfError> {
        if self.max_width == 0 || self.max_height == 0 {
            return Err(QuotePdfError::InvalidConfiguration(
                "image bounds must be positive".to_string(),
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(QuotePdfError::InvalidConfiguration(
                "jpeg_quality must be 1..=100".to_string(),
            ));
        }
        Ok(())
    }
}
