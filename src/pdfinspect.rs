use lopdf::Document as LoDocument;
use std::path::Path;

const XREF_ENTRY_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfInspectErrorCode {
    PdfParseFailed,
    PdfIoError,
    XrefMissing,
    XrefMalformed,
    XrefOffsetMismatch,
    TrailerSizeMismatch,
}

impl PdfInspectErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PdfInspectErrorCode::PdfParseFailed => "PDF_PARSE_FAILED",
            PdfInspectErrorCode::PdfIoError => "PDF_IO_ERROR",
            PdfInspectErrorCode::XrefMissing => "XREF_MISSING",
            PdfInspectErrorCode::XrefMalformed => "XREF_MALFORMED",
            PdfInspectErrorCode::XrefOffsetMismatch => "XREF_OFFSET_MISMATCH",
            PdfInspectErrorCode::TrailerSizeMismatch => "TRAILER_SIZE_MISMATCH",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfInspectError {
    pub code: PdfInspectErrorCode,
    pub message: String,
}

impl PdfInspectError {
    fn new(code: PdfInspectErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for PdfInspectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for PdfInspectError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfInspectReport {
    pub pdf_version: String,
    pub page_count: usize,
    pub object_count: usize,
    pub encrypted: bool,
    pub file_size_bytes: usize,
}

/// Result of a strict walk over a classic (non-stream) cross-reference table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XrefReport {
    pub startxref: usize,
    pub trailer_size: usize,
    pub offsets: Vec<usize>,
}

impl XrefReport {
    pub fn object_count(&self) -> usize {
        self.offsets.len()
    }
}

pub fn inspect_pdf_bytes(bytes: &[u8]) -> Result<PdfInspectReport, PdfInspectError> {
    let pdf = LoDocument::load_mem(bytes)
        .map_err(|err| PdfInspectError::new(PdfInspectErrorCode::PdfParseFailed, err.to_string()))?;

    Ok(PdfInspectReport {
        pdf_version: pdf.version.clone(),
        page_count: pdf.get_pages().len(),
        object_count: pdf.objects.len(),
        encrypted: pdf.is_encrypted(),
        file_size_bytes: bytes.len(),
    })
}

pub fn inspect_pdf_path(path: &Path) -> Result<PdfInspectReport, PdfInspectError> {
    let data = std::fs::read(path)
        .map_err(|err| PdfInspectError::new(PdfInspectErrorCode::PdfIoError, err.to_string()))?;
    inspect_pdf_bytes(&data)
}

/// Checks that `startxref` lands on the `xref` keyword, that every in-use
/// entry points at the first byte of its `N 0 obj` header and that the
/// trailer `/Size` matches the subsection length. Only single-subsection
/// tables starting at object 0 are accepted.
pub fn verify_xref(bytes: &[u8]) -> Result<XrefReport, PdfInspectError> {
    let startxref = read_startxref(bytes)?;
    let table = bytes.get(startxref..).unwrap_or_default();
    if !table.starts_with(b"xref") {
        return Err(PdfInspectError::new(
            PdfInspectErrorCode::XrefOffsetMismatch,
            format!("startxref {} does not point at an xref keyword", startxref),
        ));
    }

    let mut cursor = startxref + b"xref".len();
    cursor = skip_eol(bytes, cursor);
    let (header, next) = read_line(bytes, cursor);
    let mut parts = header.split_ascii_whitespace();
    let first: usize = parse_field(parts.next(), "subsection start")?;
    let count: usize = parse_field(parts.next(), "subsection count")?;
    if first != 0 || count == 0 {
        return Err(PdfInspectError::new(
            PdfInspectErrorCode::XrefMalformed,
            format!("unsupported subsection {} {}", first, count),
        ));
    }

    cursor = next;
    let remaining = bytes.len().saturating_sub(cursor);
    if count
        .checked_mul(XREF_ENTRY_LEN)
        .is_none_or(|table_len| table_len > remaining)
    {
        return Err(PdfInspectError::new(
            PdfInspectErrorCode::XrefMalformed,
            format!("subsection count {} exceeds the remaining {} bytes", count, remaining),
        ));
    }
    let mut offsets = Vec::with_capacity(count - 1);
    for obj_id in 0..count {
        let entry = bytes
            .get(cursor..cursor + XREF_ENTRY_LEN)
            .ok_or_else(|| {
                PdfInspectError::new(
                    PdfInspectErrorCode::XrefMalformed,
                    format!("xref entry {} truncated", obj_id),
                )
            })?;
        let entry = std::str::from_utf8(entry).map_err(|_| {
            PdfInspectError::new(
                PdfInspectErrorCode::XrefMalformed,
                format!("xref entry {} is not ascii", obj_id),
            )
        })?;
        let offset: usize = parse_field(entry.get(0..10), "entry offset")?;
        let kind = entry.as_bytes()[17];
        match (obj_id, kind) {
            (0, b'f') => {}
            (0, _) => {
                return Err(PdfInspectError::new(
                    PdfInspectErrorCode::XrefMalformed,
                    "object 0 must be the free-list head",
                ));
            }
            (_, b'n') => {
                let expected = format!("{} 0 obj", obj_id);
                if !bytes
                    .get(offset..)
                    .is_some_and(|rest| rest.starts_with(expected.as_bytes()))
                {
                    return Err(PdfInspectError::new(
                        PdfInspectErrorCode::XrefOffsetMismatch,
                        format!("object {} not found at offset {}", obj_id, offset),
                    ));
                }
                offsets.push(offset);
            }
            _ => {
                return Err(PdfInspectError::new(
                    PdfInspectErrorCode::XrefMalformed,
                    format!("object {} is not in use", obj_id),
                ));
            }
        }
        cursor += XREF_ENTRY_LEN;
    }

    let trailer_size = read_trailer_size(bytes.get(cursor..).unwrap_or_default())?;
    if trailer_size != count {
        return Err(PdfInspectError::new(
            PdfInspectErrorCode::TrailerSizeMismatch,
            format!("trailer /Size {} but xref lists {} entries", trailer_size, count),
        ));
    }

    Ok(XrefReport {
        startxref,
        trailer_size,
        offsets,
    })
}

fn read_startxref(bytes: &[u8]) -> Result<usize, PdfInspectError> {
    let keyword = b"startxref";
    let pos = bytes
        .windows(keyword.len())
        .rposition(|w| w == keyword)
        .ok_or_else(|| PdfInspectError::new(PdfInspectErrorCode::XrefMissing, "no startxref"))?;
    let cursor = skip_eol(bytes, pos + keyword.len());
    let (line, _) = read_line(bytes, cursor);
    line.trim().parse().map_err(|_| {
        PdfInspectError::new(
            PdfInspectErrorCode::XrefMissing,
            format!("startxref value {:?} is not a number", line.trim()),
        )
    })
}

fn read_trailer_size(rest: &[u8]) -> Result<usize, PdfInspectError> {
    let text = String::from_utf8_lossy(rest);
    let Some(trailer) = text.find("trailer") else {
        return Err(PdfInspectError::new(
            PdfInspectErrorCode::XrefMalformed,
            "no trailer after xref table",
        ));
    };
    let after = &text[trailer..];
    let Some(size_at) = after.find("/Size") else {
        return Err(PdfInspectError::new(
            PdfInspectErrorCode::XrefMalformed,
            "trailer has no /Size",
        ));
    };
    let digits: String = after[size_at + "/Size".len()..]
        .trim_start()
        .chars()
        .take_while(|ch| ch.is_ascii_digit())
        .collect();
    parse_field(Some(digits.as_str()), "trailer /Size")
}

fn parse_field(raw: Option<&str>, what: &str) -> Result<usize, PdfInspectError> {
    raw.and_then(|value| value.trim().parse().ok()).ok_or_else(|| {
        PdfInspectError::new(
            PdfInspectErrorCode::XrefMalformed,
            format!("invalid {}", what),
        )
    })
}

fn skip_eol(bytes: &[u8], mut cursor: usize) -> usize {
    while cursor < bytes.len() && matches!(bytes[cursor], b'\r' | b'\n' | b' ') {
        cursor += 1;
    }
    cursor
}

fn read_line(bytes: &[u8], start: usize) -> (String, usize) {
    let rest = bytes.get(start..).unwrap_or_default();
    let len = rest
        .iter()
        .position(|b| matches!(b, b'\r' | b'\n'))
        .unwrap_or(rest.len());
    let line = String::from_utf8_lossy(&rest[..len]).into_owned();
    (line, skip_eol(bytes, start + len))
}
