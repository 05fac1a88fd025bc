use thiserror::Error;

use crate::pdfinspect::PdfInspectError;

/// Errors surfaced by the encoder facade. Encoding into memory never fails;
/// these come from configuration, caller-supplied sinks and inspection.
#[derive(Debug, Error)]
pub enum QuotePdfError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("inspection failed: {0}")]
    Inspect(#[from] PdfInspectError),
}
