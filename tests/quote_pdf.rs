use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use lopdf::Document as LoDocument;
use lopdf::content::Content;
use quotepdf::{
    ImageSource, LogoCache, QuoteEncoder, QuoteRequest, encode_quote, inspect_pdf_bytes,
    verify_xref,
};

fn png_bytes(width: u32, height: u32, pixel: Rgba<u8>) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, pixel);
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut out, ImageFormat::Png)
        .expect("png encode");
    out.into_inner()
}

fn count_token(bytes: &[u8], token: &[u8]) -> usize {
    if token.is_empty() || bytes.len() < token.len() {
        return 0;
    }
    bytes.windows(token.len()).filter(|w| *w == token).count()
}

fn shown_strings(pdf: &[u8]) -> Vec<String> {
    let doc = LoDocument::load_mem(pdf).expect("lopdf parse");
    let pages = doc.get_pages();
    assert_eq!(pages.len(), 1);
    let page_id = *pages.values().next().expect("page");
    let raw = doc.get_page_content(page_id).expect("content");
    let content = Content::decode(&raw).expect("decode content");
    content
        .operations
        .iter()
        .filter(|op| op.operator == "Tj")
        .map(|op| {
            let bytes = op.operands[0].as_str().expect("string operand");
            String::from_utf8_lossy(bytes).into_owned()
        })
        .collect()
}

#[test]
fn text_only_quote_has_five_objects_and_two_show_operators() {
    let pdf = encode_quote(&["RFQ-20250101-AB12", "Subtotal: 100.00 ILS"], None);
    assert!(pdf.starts_with(b"%PDF-1.4"));
    assert_eq!(count_token(&pdf, b" 0 obj\n"), 5);
    assert_eq!(count_token(&pdf, b") Tj"), 2);
    assert_eq!(count_token(&pdf, b"/Root 1 0 R"), 1);
    assert_eq!(count_token(&pdf, b"/XObject"), 0);

    let xref = verify_xref(&pdf).expect("xref");
    assert_eq!(xref.object_count(), 5);
    assert_eq!(xref.trailer_size, 6);

    let report = inspect_pdf_bytes(&pdf).expect("inspect");
    assert_eq!(report.page_count, 1);
    assert_eq!(report.pdf_version, "1.4");

    assert_eq!(
        shown_strings(&pdf),
        vec!["RFQ-20250101-AB12", "Subtotal: 100.00 ILS"]
    );
}

#[test]
fn large_logo_is_embedded_as_bounded_dct_image() {
    let logo = png_bytes(1000, 1000, Rgba([20, 90, 160, 255]));
    let encoder = QuoteEncoder::new();
    let pdf = encoder.encode(&["RFQ-1"], Some(logo.as_slice()));
    let text = String::from_utf8_lossy(&pdf);
    assert!(text.contains("/Filter /DCTDecode"));
    assert!(text.contains("/ColorSpace /DeviceRGB"));
    assert!(text.contains("/Width 300 /Height 300"));
    assert!(text.contains("/XObject << /Im1 6 0 R >>"));
    assert!(text.contains("q\n64 0 0 64 481 728 cm\n/Im1 Do\nQ"));

    let document = encoder.prepare(&["RFQ-1"], Some(logo.as_slice()));
    let image = document.image().expect("image embeds");
    assert!(image.width <= 700 && image.height <= 300);
    let declared = format!("/Length {} >>\nstream\n", image.jpeg.len());
    let at = pdf
        .windows(declared.len())
        .position(|w| w == declared.as_bytes())
        .expect("image length entry");
    let body_start = at + declared.len();
    assert_eq!(&pdf[body_start..body_start + image.jpeg.len()], image.jpeg.as_slice());
    assert!(pdf[body_start + image.jpeg.len()..].starts_with(b"\nendstream\nendobj\n"));

    let xref = verify_xref(&pdf).expect("xref");
    assert_eq!(xref.object_count(), 6);
    assert_eq!(xref.trailer_size, 7);
    assert_eq!(inspect_pdf_bytes(&pdf).expect("inspect").object_count, 6);
}

#[test]
fn wide_logo_keeps_aspect_ratio() {
    let logo = png_bytes(1400, 200, Rgba([0, 0, 0, 255]));
    let pdf = encode_quote(&["x"], Some(logo.as_slice()));
    let text = String::from_utf8_lossy(&pdf);
    assert!(text.contains("/Width 700 /Height 100"));
}

#[test]
fn parentheses_are_escaped_in_the_stream() {
    let pdf = encode_quote(&["Quote (50% off)"], None);
    assert_eq!(count_token(&pdf, b"(Quote \\(50% off\\)) Tj"), 1);
    assert_eq!(shown_strings(&pdf), vec!["Quote (50% off)"]);
}

#[test]
fn fifty_lines_are_cut_to_forty_five() {
    let lines: Vec<String> = (1..=50).map(|i| format!("Item {i:02}")).collect();
    let pdf = encode_quote(&lines, None);
    let shown = shown_strings(&pdf);
    assert_eq!(shown.len(), 45);
    assert_eq!(shown, lines[..45].to_vec());
    for missing in &lines[45..] {
        assert_eq!(count_token(&pdf, format!("({missing})").as_bytes()), 0);
    }
}

#[test]
fn lines_keep_order_after_sanitizing() {
    let lines = [
        "Customer: \u{05d3}\u{05e0}\u{05d4} Cohen",
        "  Qty:\t3  ",
        "",
        "Path C:\\quotes",
    ];
    let pdf = encode_quote(&lines, None);
    assert_eq!(
        shown_strings(&pdf),
        vec!["Customer:  Cohen", "Qty: 3", "-", "Path C:\\quotes"]
    );
}

#[test]
fn broken_logo_degrades_to_text_only() {
    let pdf = encode_quote(&["RFQ-2"], Some(b"\x89PNG\r\n\x1a\ntruncated".as_slice()));
    assert_eq!(count_token(&pdf, b" 0 obj\n"), 5);
    assert_eq!(count_token(&pdf, b"/Im1"), 0);
    verify_xref(&pdf).expect("xref");
}

#[test]
fn identical_input_gives_identical_bytes() {
    let logo = png_bytes(800, 500, Rgba([200, 10, 10, 128]));
    let lines = ["RFQ-3", "Total: 12.50"];
    let a = encode_quote(&lines, Some(logo.as_slice()));
    let b = encode_quote(&lines, Some(logo.as_slice()));
    assert_eq!(a, b);
}

#[test]
fn xref_stays_exact_across_varying_lengths() {
    for count in [0usize, 1, 7, 45, 60] {
        let lines: Vec<String> = (0..count)
            .map(|i| format!("{} ({})", "w".repeat(i * 3 % 170), i))
            .collect();
        let pdf = encode_quote(&lines, None);
        verify_xref(&pdf).expect("xref");
        inspect_pdf_bytes(&pdf).expect("lopdf");
    }
}

#[test]
fn batch_encoding_preserves_order_and_matches_single_encodes() {
    let logo = png_bytes(120, 60, Rgba([5, 5, 5, 255]));
    let requests: Vec<QuoteRequest> = (0..8)
        .map(|i| {
            let request = QuoteRequest::new(vec![format!("RFQ-{i}"), format!("Total: {i}.00")]);
            if i % 2 == 0 {
                request.with_image(logo.clone())
            } else {
                request
            }
        })
        .collect();

    let encoder = QuoteEncoder::builder()
        .cache_logos(true)
        .build()
        .expect("build");
    let (outputs, metrics) = encoder.encode_batch_with_metrics(&requests);
    assert_eq!(outputs.len(), 8);
    assert_eq!(metrics.quotes.len(), 8);
    for (i, (pdf, request)) in outputs.iter().zip(&requests).enumerate() {
        assert_eq!(*pdf, encode_quote(&request.lines, request.image.as_deref()));
        assert_eq!(metrics.quotes[i].image_embedded, i % 2 == 0);
    }
    assert_eq!(
        metrics.total_bytes,
        outputs.iter().map(|pdf| pdf.len()).sum::<usize>()
    );
}

#[test]
fn shared_logo_cache_and_sources() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("logo.png");
    std::fs::write(&path, png_bytes(64, 32, Rgba([0, 128, 0, 255]))).expect("write logo");

    let cache = Arc::new(LogoCache::new(4));
    let encoder = QuoteEncoder::builder()
        .logo_cache(cache.clone())
        .build()
        .expect("build");
    let logo = encoder.resolve_logo(&[
        ImageSource::Path(dir.path().join("missing.png")),
        ImageSource::Path(path),
    ]);
    let image = logo.image().expect("second source");
    assert_eq!((image.width, image.height), (64, 32));
    assert_eq!(cache.len(), 1);

    let document = quotepdf::QuoteDocument::new(&["RFQ-4"], logo, encoder.layout());
    let pdf = encoder.encode_document(&document);
    assert_eq!(count_token(&pdf, b"/Width 64 /Height 32"), 1);
    verify_xref(&pdf).expect("xref");
}

#[test]
fn perf_log_records_each_phase() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log_path = dir.path().join("perf.log");
    let encoder = QuoteEncoder::builder()
        .perf_log(&log_path)
        .build()
        .expect("build");
    let logo = png_bytes(10, 10, Rgba([1, 1, 1, 255]));
    encoder.encode_with_metrics(&["RFQ-5"], Some(logo.as_slice()));

    let log = std::fs::read_to_string(&log_path).expect("read log");
    assert!(log.contains("\"name\":\"quote.logo\""));
    assert!(log.contains("\"name\":\"quote.content\""));
    assert!(log.contains("\"name\":\"quote.write\""));
    assert!(log.contains("\"objects\":6"));
}

#[test]
fn encode_to_file_writes_a_valid_pdf() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("quote.pdf");
    let xref = QuoteEncoder::new()
        .encode_to_file(&["RFQ-6"], None, &path)
        .expect("write file");
    let bytes = std::fs::read(&path).expect("read");
    assert_eq!(verify_xref(&bytes).expect("xref").startxref, xref.startxref);
}
