use std::borrow::Cow;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use base64::Engine;
use image::imageops::FilterType;
use image::{GenericImageView, RgbImage, RgbaImage};
use sha2::{Digest, Sha256};

use crate::config::ImageOptions;

/// A recompressed logo ready to be embedded as a `/DCTDecode` image XObject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Outcome of logo resolution. A quote either carries exactly one image or
/// renders text only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Logo {
    #[default]
    None,
    Image(Arc<EmbeddedImage>),
}

impl Logo {
    pub fn from_bytes(data: &[u8], options: &ImageOptions) -> Self {
        match embed_image(data, options) {
            Some(image) => Logo::Image(Arc::new(image)),
            None => Logo::None,
        }
    }

    pub fn image(&self) -> Option<&EmbeddedImage> {
        match self {
            Logo::None => None,
            Logo::Image(image) => Some(image.as_ref()),
        }
    }

    pub fn is_some(&self) -> bool {
        matches!(self, Logo::Image(_))
    }
}

/// Where a logo's source bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Bytes(Vec<u8>),
    Path(PathBuf),
    DataUri(String),
}

impl ImageSource {
    pub fn load(&self) -> Option<Cow<'_, [u8]>> {
        match self {
            ImageSource::Bytes(data) => Some(Cow::Borrowed(data.as_slice())),
            ImageSource::Path(path) => match std::fs::read(path) {
                Ok(data) => Some(Cow::Owned(data)),
                Err(err) => {
                    log::warn!("logo source {} unreadable: {}", path.display(), err);
                    None
                }
            },
            ImageSource::DataUri(uri) => {
                let decoded = parse_data_uri(uri);
                if decoded.is_none() {
                    log::warn!("logo data uri could not be decoded");
                }
                decoded.map(|(_mime, data)| Cow::Owned(data))
            }
        }
    }
}

/// Tries each source in order and keeps the first one that embeds.
pub fn resolve_logo(
    sources: &[ImageSource],
    options: &ImageOptions,
    cache: Option<&LogoCache>,
) -> Logo {
    for source in sources {
        let Some(data) = source.load() else {
            continue;
        };
        let embedded = match cache {
            Some(cache) => cache.embed(&data, options),
            None => embed_image(&data, options).map(Arc::new),
        };
        if let Some(image) = embedded {
            return Logo::Image(image);
        }
    }
    Logo::None
}

/// Decodes any supported raster format and recompresses it as an RGB JPEG
/// no larger than the configured bounds. Transparent areas are flattened
/// onto white. Returns `None` if decoding or encoding fails.
pub fn embed_image(data: &[u8], options: &ImageOptions) -> Option<EmbeddedImage> {
    let decoded = match image::load_from_memory(data) {
        Ok(decoded) => decoded,
        Err(err) => {
            log::warn!("logo decode failed, rendering text only: {}", err);
            return None;
        }
    };
    let (src_width, src_height) = decoded.dimensions();
    if src_width == 0 || src_height == 0 {
        log::warn!("logo has zero dimensions, rendering text only");
        return None;
    }

    let rgba = fit_within(decoded.to_rgba8(), options.max_width, options.max_height);
    let rgb = flatten_onto_white(&rgba);
    let (width, height) = rgb.dimensions();

    let jpeg = match encode_jpeg(&rgb, options.jpeg_quality, true) {
        Ok(jpeg) => jpeg,
        Err(err) => {
            log::warn!("logo jpeg encode failed, rendering text only: {}", err);
            return None;
        }
    };
    if jpeg.is_empty() {
        log::warn!("logo jpeg encode produced no bytes, rendering text only");
        return None;
    }

    log::debug!(
        "logo recompressed {}x{} -> {}x{} ({} bytes)",
        src_width,
        src_height,
        width,
        height,
        jpeg.len()
    );
    Some(EmbeddedImage {
        jpeg,
        width,
        height,
    })
}

fn encode_jpeg(rgb: &RgbImage, quality: u8, optimize: bool) -> Result<Vec<u8>, String> {
    let (width, height) = rgb.dimensions();
    let (Ok(width), Ok(height)) = (u16::try_from(width), u16::try_from(height)) else {
        return Err(format!("{}x{} exceeds the jpeg size limit", width, height));
    };
    let mut jpeg = Vec::new();
    let mut encoder = jpeg_encoder::Encoder::new(&mut jpeg, quality);
    encoder.set_optimized_huffman_tables(optimize);
    encoder
        .encode(rgb.as_raw(), width, height, jpeg_encoder::ColorType::Rgb)
        .map_err(|err| err.to_string())?;
    Ok(jpeg)
}

/// Target dimensions that fit `(width, height)` inside the bounds while
/// keeping the aspect ratio. Images already inside the bounds are kept.
pub fn fitted_dimensions(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }
    let (w, h) = (width as u64, height as u64);
    let (mw, mh) = (max_width as u64, max_height as u64);
    if w * mh >= h * mw {
        let scaled = (h * mw + w / 2) / w;
        (max_width, scaled.max(1) as u32)
    } else {
        let scaled = (w * mh + h / 2) / h;
        (scaled.max(1) as u32, max_height)
    }
}

fn fit_within(rgba: RgbaImage, max_width: u32, max_height: u32) -> RgbaImage {
    let (width, height) = rgba.dimensions();
    let (target_w, target_h) = fitted_dimensions(width, height, max_width, max_height);
    if (target_w, target_h) == (width, height) {
        return rgba;
    }
    image::imageops::resize(&rgba, target_w, target_h, FilterType::Lanczos3)
}

fn flatten_onto_white(rgba: &RgbaImage) -> RgbImage {
    let (width, height) = rgba.dimensions();
    let mut rgb = RgbImage::new(width, height);
    for (src, dst) in rgba.pixels().zip(rgb.pixels_mut()) {
        let [r, g, b, a] = src.0;
        let a = a as u32;
        let blend = |c: u8| ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        dst.0 = [blend(r), blend(g), blend(b)];
    }
    rgb
}

fn parse_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    if !uri.starts_with("data:") {
        return None;
    }
    let (header, data_part) = uri.split_once(',')?;
    let mime = header
        .trim_start_matches("data:")
        .split(';')
        .next()
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = if header.contains("base64") {
        base64::engine::general_purpose::STANDARD
            .decode(data_part.trim())
            .ok()?
    } else {
        data_part.as_bytes().to_vec()
    };
    Some((mime, data))
}

const DEFAULT_CACHE_ENTRIES: usize = 16;

/// Memoizes recompressed logos across encodes. Keys are the SHA-256 of the
/// source bytes together with the recompression options, so a logo shared by
/// many quotes is decoded and re-encoded once. Failed decodes are cached too.
pub struct LogoCache {
    entries: Mutex<HashMap<[u8; 32], Option<Arc<EmbeddedImage>>>>,
    max_entries: usize,
}

impl Default for LogoCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_ENTRIES)
    }
}

impl LogoCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    pub fn embed(&self, data: &[u8], options: &ImageOptions) -> Option<Arc<EmbeddedImage>> {
        let key = cache_key(data, options);
        if let Ok(entries) = self.entries.lock() {
            if let Some(hit) = entries.get(&key) {
                return hit.clone();
            }
        }

        let embedded = embed_image(data, options).map(Arc::new);
        if let Ok(mut entries) = self.entries.lock() {
            // Wholesale eviction keeps the cache bounded without tracking recency.
            if entries.len() >= self.max_entries && !entries.contains_key(&key) {
                entries.clear();
            }
            entries.insert(key, embedded.clone());
        }
        embedded
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

fn cache_key(data: &[u8], options: &ImageOptions) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(options.max_width.to_be_bytes());
    hasher.update(options.max_height.to_be_bytes());
    hasher.update([options.jpeg_quality]);
    hasher.update(data);
    hasher.finalize().into()
}
