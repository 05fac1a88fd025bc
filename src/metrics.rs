/// Figures gathered while encoding one quote.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodeMetrics {
    pub rendered_lines: usize,
    pub dropped_lines: usize,
    pub image_embedded: bool,
    pub content_bytes: usize,
    pub image_bytes: usize,
    pub object_count: usize,
    pub total_bytes: usize,
    pub encode_ms: f64,
}

/// Aggregate over a batch encode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchMetrics {
    pub quotes: Vec<EncodeMetrics>,
    pub total_bytes: usize,
    pub total_encode_ms: f64,
}

impl BatchMetrics {
    pub fn from_quotes(quotes: Vec<EncodeMetrics>) -> Self {
        let total_bytes = quotes.iter().map(|m| m.total_bytes).sum();
        let total_encode_ms = quotes.iter().map(|m| m.encode_ms).sum();
        Self {
            quotes,
            total_bytes,
            total_encode_ms,
        }
    }
}
