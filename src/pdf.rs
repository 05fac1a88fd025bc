use std::io::{self, Write};

use crate::config::QuoteLayout;
use crate::content::{FONT_RESOURCE, IMAGE_RESOURCE};
use crate::logo::EmbeddedImage;
use crate::types::fmt_pt;

pub const PDF_CATALOG_ID: usize = 1;
pub const PDF_PAGES_ID: usize = 2;
pub const PDF_PAGE_ID: usize = 3;
pub const PDF_FONT_ID: usize = 4;
pub const PDF_CONTENT_ID: usize = 5;
pub const PDF_IMAGE_ID: usize = 6;

const PDF_HEADER: &[u8] = b"%PDF-1.4\n";
// High-bit comment so transfer tools treat the file as binary.
const PDF_BINARY_MARKER: &[u8] = b"%\xE2\xE3\xCF\xD3\n";

/// A numbered object body, without the `obj`/`endobj` framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndirectObject {
    pub id: usize,
    pub body: Vec<u8>,
}

impl IndirectObject {
    fn text(id: usize, body: String) -> Self {
        Self {
            id,
            body: body.into_bytes(),
        }
    }
}

/// Byte offsets recorded while writing. Index 0 is the free-list head and
/// always holds 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XrefTable {
    pub offsets: Vec<usize>,
    pub startxref: usize,
}

impl XrefTable {
    pub fn offset(&self, obj_id: usize) -> Option<usize> {
        if obj_id == 0 {
            return None;
        }
        self.offsets.get(obj_id).copied()
    }

    /// Value of the trailer `/Size` entry: object count plus the free entry.
    pub fn size(&self) -> usize {
        self.offsets.len()
    }

    pub fn object_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }
}

/// Builds the fixed object graph for a single quote page. The content and
/// image payloads must be final: their lengths go into the dictionaries.
pub fn assemble_objects(
    content: &str,
    image: Option<&EmbeddedImage>,
    layout: &QuoteLayout,
) -> Vec<IndirectObject> {
    let mut objects = Vec::with_capacity(6);
    objects.push(IndirectObject::text(
        PDF_CATALOG_ID,
        format!("<< /Type /Catalog /Pages {} 0 R >>", PDF_PAGES_ID),
    ));
    objects.push(IndirectObject::text(
        PDF_PAGES_ID,
        format!(
            "<< /Type /Pages /Kids [{} 0 R] /Count 1 >>",
            PDF_PAGE_ID
        ),
    ));
    objects.push(IndirectObject::text(
        PDF_PAGE_ID,
        page_object(image.is_some(), layout),
    ));
    objects.push(IndirectObject::text(PDF_FONT_ID, font_object()));
    objects.push(IndirectObject {
        id: PDF_CONTENT_ID,
        body: stream_object("", content.as_bytes()),
    });
    if let Some(image) = image {
        objects.push(IndirectObject {
            id: PDF_IMAGE_ID,
            body: image_object(image),
        });
    }
    objects
}

fn page_object(has_image: bool, layout: &QuoteLayout) -> String {
    let xobjects = if has_image {
        format!(" /XObject << /{} {} 0 R >>", IMAGE_RESOURCE, PDF_IMAGE_ID)
    } else {
        String::new()
    };
    format!(
        "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] /Resources << /Font << /{} {} 0 R >>{} >> /Contents {} 0 R >>",
        PDF_PAGES_ID,
        fmt_pt(layout.page_size.width),
        fmt_pt(layout.page_size.height),
        FONT_RESOURCE,
        PDF_FONT_ID,
        xobjects,
        PDF_CONTENT_ID
    )
}

fn font_object() -> String {
    "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string()
}

fn image_object(image: &EmbeddedImage) -> Vec<u8> {
    let entries = format!(
        " /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /DCTDecode",
        image.width, image.height
    );
    stream_object(&entries, &image.jpeg)
}

// `entries` are extra dictionary entries, each with a leading space.
fn stream_object(entries: &str, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + entries.len() + 48);
    out.extend_from_slice(format!("<<{} /Length {} >>\nstream\n", entries, data.len()).as_bytes());
    out.extend_from_slice(data);
    out.extend_from_slice(b"\nendstream");
    out
}

/// Writes header, objects, xref table and trailer, tracking the byte cursor
/// so every xref entry points at the start of its `N 0 obj` line.
pub fn write_pdf<W: Write>(writer: &mut W, objects: &[IndirectObject]) -> io::Result<XrefTable> {
    let mut offset = 0usize;
    let mut offsets = vec![0usize; objects.len() + 1];

    write_bytes(writer, PDF_HEADER, &mut offset)?;
    write_bytes(writer, PDF_BINARY_MARKER, &mut offset)?;

    for (index, obj) in objects.iter().enumerate() {
        if obj.id != index + 1 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("object {} emitted out of order at position {}", obj.id, index + 1),
            ));
        }
        write_pdf_object(writer, &mut offset, &mut offsets, obj)?;
    }

    let xref_start = offset;
    write_str(writer, &format!("xref\n0 {}\n", objects.len() + 1), &mut offset)?;
    write_bytes(writer, b"0000000000 65535 f \n", &mut offset)?;
    for obj_offset in offsets.iter().skip(1) {
        write_str(writer, &format!("{:010} 00000 n \n", obj_offset), &mut offset)?;
    }
    write_str(
        writer,
        &format!(
            "trailer\n<< /Size {} /Root {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            PDF_CATALOG_ID,
            xref_start
        ),
        &mut offset,
    )?;

    Ok(XrefTable {
        offsets,
        startxref: xref_start,
    })
}

/// Serializes into a fresh buffer. Writing to a `Vec` cannot fail for a
/// graph produced by [`assemble_objects`].
pub fn build_pdf(objects: &[IndirectObject]) -> (Vec<u8>, XrefTable) {
    let payload: usize = objects.iter().map(|obj| obj.body.len() + 32).sum();
    let mut out = Vec::with_capacity(payload + 256);
    let xref = match write_pdf(&mut out, objects) {
        Ok(xref) => xref,
        Err(err) => {
            log::error!("pdf serialization failed: {}", err);
            out.clear();
            XrefTable {
                offsets: vec![0],
                startxref: 0,
            }
        }
    };
    (out, xref)
}

fn write_pdf_object<W: Write>(
    writer: &mut W,
    offset: &mut usize,
    offsets: &mut [usize],
    obj: &IndirectObject,
) -> io::Result<()> {
    if let Some(slot) = offsets.get_mut(obj.id) {
        *slot = *offset;
    }
    write_str(writer, &format!("{} 0 obj\n", obj.id), offset)?;
    write_bytes(writer, &obj.body, offset)?;
    write_bytes(writer, b"\nendobj\n", offset)?;
    Ok(())
}

fn write_bytes<W: Write>(writer: &mut W, data: &[u8], offset: &mut usize) -> io::Result<()> {
    writer.write_all(data)?;
    *offset += data.len();
    Ok(())
}

fn write_str<W: Write>(writer: &mut W, data: &str, offset: &mut usize) -> io::Result<()> {
    write_bytes(writer, data.as_bytes(), offset)
}
