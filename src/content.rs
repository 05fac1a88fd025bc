use crate::config::QuoteLayout;
use crate::document::QuoteDocument;
use crate::types::{Pt, Rect, fmt_pt};

/// Resource name of the Helvetica font in the page resources.
pub const FONT_RESOURCE: &str = "F1";
/// Resource name of the logo XObject in the page resources.
pub const IMAGE_RESOURCE: &str = "Im1";

/// A content stream operator. Text passed to `ShowText` must already be
/// sanitized literal-string content.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SaveState,
    RestoreState,
    ConcatMatrix {
        a: Pt,
        b: Pt,
        c: Pt,
        d: Pt,
        e: Pt,
        f: Pt,
    },
    DrawXObject(String),
    BeginText,
    SetFont {
        resource: String,
        size: Pt,
    },
    MoveText {
        dx: Pt,
        dy: Pt,
    },
    ShowText(String),
    EndText,
}

impl Command {
    fn write_to(&self, out: &mut String) {
        match self {
            Command::SaveState => out.push('q'),
            Command::RestoreState => out.push('Q'),
            Command::ConcatMatrix { a, b, c, d, e, f } => {
                out.push_str(&format!(
                    "{} {} {} {} {} {} cm",
                    fmt_pt(*a),
                    fmt_pt(*b),
                    fmt_pt(*c),
                    fmt_pt(*d),
                    fmt_pt(*e),
                    fmt_pt(*f)
                ));
            }
            Command::DrawXObject(name) => out.push_str(&format!("/{} Do", name)),
            Command::BeginText => out.push_str("BT"),
            Command::SetFont { resource, size } => {
                out.push_str(&format!("/{} {} Tf", resource, fmt_pt(*size)));
            }
            Command::MoveText { dx, dy } => {
                out.push_str(&format!("{} {} Td", fmt_pt(*dx), fmt_pt(*dy)));
            }
            Command::ShowText(text) => out.push_str(&format!("({}) Tj", text)),
            Command::EndText => out.push_str("ET"),
        }
    }
}

/// Fits an image of the given pixel size into the layout's logo box and
/// anchors it to the top-right margin corner.
pub fn image_placement(width_px: u32, height_px: u32, layout: &QuoteLayout) -> Rect {
    let max_w = layout.logo_box.width.to_f32() as f64;
    let max_h = layout.logo_box.height.to_f32() as f64;
    let ratio = if width_px == 0 {
        1.0
    } else {
        height_px as f64 / width_px as f64
    };
    let mut draw_w = max_w;
    let mut draw_h = draw_w * ratio;
    if draw_h > max_h {
        draw_h = max_h;
        draw_w = draw_h / ratio;
    }
    let width = Pt::from_f32(draw_w as f32);
    let height = Pt::from_f32(draw_h as f32);
    Rect {
        x: layout.page_size.width - layout.margins.right - width,
        y: layout.page_size.height - layout.margins.top - height,
        width,
        height,
    }
}

pub fn build_commands(document: &QuoteDocument, layout: &QuoteLayout) -> Vec<Command> {
    let mut commands = Vec::with_capacity(document.lines().len() * 2 + 8);

    if let Some(image) = document.image() {
        let rect = image_placement(image.width, image.height, layout);
        commands.push(Command::SaveState);
        commands.push(Command::ConcatMatrix {
            a: rect.width,
            b: Pt::ZERO,
            c: Pt::ZERO,
            d: rect.height,
            e: rect.x,
            f: rect.y,
        });
        commands.push(Command::DrawXObject(IMAGE_RESOURCE.to_string()));
        commands.push(Command::RestoreState);
    }

    commands.push(Command::BeginText);
    commands.push(Command::SetFont {
        resource: FONT_RESOURCE.to_string(),
        size: layout.font_size,
    });
    let (origin_x, origin_y) = layout.text_origin;
    commands.push(Command::MoveText {
        dx: origin_x,
        dy: origin_y,
    });
    for (idx, line) in document.lines().iter().enumerate() {
        if idx > 0 {
            commands.push(Command::MoveText {
                dx: Pt::ZERO,
                dy: -layout.leading,
            });
        }
        commands.push(Command::ShowText(line.clone()));
    }
    commands.push(Command::EndText);
    commands
}

pub fn render_commands(commands: &[Command]) -> String {
    let mut out = String::new();
    for (idx, command) in commands.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        command.write_to(&mut out);
    }
    out
}

/// The page content stream for `document`, as ASCII operators.
pub fn build_content_stream(document: &QuoteDocument, layout: &QuoteLayout) -> String {
    render_commands(&build_commands(document, layout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logo::{EmbeddedImage, Logo};
    use std::sync::Arc;

    fn doc_with_image(lines: &[&str], width: u32, height: u32) -> QuoteDocument {
        let image = EmbeddedImage {
            jpeg: vec![0xFF, 0xD8, 0xFF, 0xD9],
            width,
            height,
        };
        QuoteDocument::new(lines, Logo::Image(Arc::new(image)), &QuoteLayout::default())
    }

    fn count_token(haystack: &str, token: &str) -> usize {
        haystack.matches(token).count()
    }

    #[test]
    fn text_only_stream_layout() {
        let layout = QuoteLayout::default();
        let doc = QuoteDocument::new(&["RFQ-20250101-AB12", "Subtotal: 100.00 ILS"], Logo::None, &layout);
        let stream = build_content_stream(&doc, &layout);
        assert_eq!(
            stream,
            "BT\n/F1 12 Tf\n50 800 Td\n(RFQ-20250101-AB12) Tj\n0 -16 Td\n(Subtotal: 100.00 ILS) Tj\nET"
        );
        assert_eq!(count_token(&stream, " Tj"), 2);
        assert!(!stream.contains(" Do"));
    }

    #[test]
    fn escaped_parentheses_reach_the_stream() {
        let layout = QuoteLayout::default();
        let doc = QuoteDocument::new(&["Quote (50% off)"], Logo::None, &layout);
        let stream = build_content_stream(&doc, &layout);
        assert!(stream.contains("(Quote \\(50% off\\)) Tj"));
    }

    #[test]
    fn empty_line_list_still_emits_text_object() {
        let layout = QuoteLayout::default();
        let doc = QuoteDocument::new::<&str>(&[], Logo::None, &layout);
        let stream = build_content_stream(&doc, &layout);
        assert_eq!(stream, "BT\n/F1 12 Tf\n50 800 Td\nET");
    }

    #[test]
    fn wide_image_is_width_limited() {
        let rect = image_placement(700, 100, &QuoteLayout::default());
        assert_eq!(fmt_pt(rect.width), "130");
        assert_eq!(fmt_pt(rect.height), "18.571");
        assert_eq!(fmt_pt(rect.x), "415");
        assert_eq!(fmt_pt(rect.y), "773.429");
    }

    #[test]
    fn tall_image_is_height_limited() {
        let rect = image_placement(300, 300, &QuoteLayout::default());
        assert_eq!(fmt_pt(rect.width), "64");
        assert_eq!(fmt_pt(rect.height), "64");
        assert_eq!(fmt_pt(rect.x), "481");
        assert_eq!(fmt_pt(rect.y), "728");
    }

    #[test]
    fn image_block_precedes_text() {
        let layout = QuoteLayout::default();
        let doc = doc_with_image(&["Total"], 700, 140);
        let stream = build_content_stream(&doc, &layout);
        assert!(stream.starts_with("q\n130 0 0 26 415 766 cm\n/Im1 Do\nQ\nBT\n"));
        assert_eq!(count_token(&stream, "/Im1 Do"), 1);
    }

    #[test]
    fn only_max_lines_are_shown() {
        let layout = QuoteLayout::default();
        let lines: Vec<String> = (1..=50).map(|i| format!("L{i:02}")).collect();
        let doc = QuoteDocument::new(&lines, Logo::None, &layout);
        let stream = build_content_stream(&doc, &layout);
        assert_eq!(count_token(&stream, " Tj"), 45);
        assert_eq!(count_token(&stream, "0 -16 Td"), 44);
        assert!(stream.contains("(L45) Tj"));
        assert!(!stream.contains("(L46) Tj"));
    }
}
