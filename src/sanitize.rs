/// Byte limit applied to every rendered line.
pub const MAX_LINE_BYTES: usize = 160;

const EMPTY_FALLBACK: &str = "-";
const FILENAME_FALLBACK: &str = "quote";

/// Normalizes arbitrary text into the body of a PDF literal string.
///
/// Only printable ASCII (32..=126) survives; newlines, carriage returns and
/// tabs become spaces. `(`, `)` and `\` are backslash-escaped, surrounding
/// whitespace is trimmed and the result is capped at [`MAX_LINE_BYTES`].
/// An empty result becomes `"-"`.
pub fn sanitize_pdf_text(input: &str) -> String {
    sanitize_pdf_text_with_limit(input, MAX_LINE_BYTES)
}

pub fn sanitize_pdf_text_with_limit(input: &str, max_bytes: usize) -> String {
    let printable = printable_ascii(input);
    let escaped = escape_literal(printable.trim());
    let truncated = truncate_escaped(&escaped, max_bytes);
    if truncated.is_empty() {
        EMPTY_FALLBACK.to_string()
    } else {
        truncated.to_string()
    }
}

/// Applies the line contract to a download filename (without extension) and
/// additionally strips characters that would break a quoted header value.
pub fn sanitize_filename(input: &str) -> String {
    let printable = printable_ascii(input);
    let cleaned: String = printable
        .chars()
        .filter(|ch| !matches!(ch, '"' | '\\' | '/'))
        .collect();
    let trimmed = cleaned.trim();
    let mut end = trimmed.len().min(MAX_LINE_BYTES);
    // printable ASCII only, so every byte index is a char boundary
    while end > 0 && trimmed.as_bytes()[end - 1] == b' ' {
        end -= 1;
    }
    if end == 0 {
        FILENAME_FALLBACK.to_string()
    } else {
        trimmed[..end].to_string()
    }
}

fn printable_ascii(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\n' | '\r' | '\t' => out.push(' '),
            ' '..='~' => out.push(ch),
            _ => {}
        }
    }
    out
}

fn escape_literal(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 8);
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            _ => out.push(ch),
        }
    }
    out
}

// Cuts at `max_bytes` without leaving half of an escape pair behind.
fn truncate_escaped(escaped: &str, max_bytes: usize) -> &str {
    if escaped.len() <= max_bytes {
        return escaped;
    }
    let bytes = escaped.as_bytes();
    let mut end = 0usize;
    let mut idx = 0usize;
    while idx < bytes.len() {
        let width = if bytes[idx] == b'\\' { 2 } else { 1 };
        if idx + width > max_bytes {
            break;
        }
        idx += width;
        end = idx;
    }
    &escaped[..end]
}
