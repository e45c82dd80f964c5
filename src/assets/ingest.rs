use std::io::Cursor;
use std::path::Path;

use anyhow::Context as _;
use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::foundation::error::{SketchError, SketchResult};

pub const PNG_MIME: &str = "image/png";

/// An image ready to be shown in a preview pane and handed to the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageAsset {
    /// Self-contained `data:` URL for displaying the image.
    pub display_url: String,
    /// Encoded image bytes (always PNG for assets produced by this crate).
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
}

impl ImageAsset {
    /// Wrap PNG bytes produced elsewhere (e.g. by the engine) as a displayable asset.
    pub fn from_png(bytes: Vec<u8>) -> SketchResult<Self> {
        let reader = image::ImageReader::with_format(Cursor::new(&bytes), ImageFormat::Png);
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| SketchError::decode(format!("read png header: {e}")))?;
        Ok(Self {
            display_url: data_url(PNG_MIME, &bytes),
            bytes,
            mime_type: PNG_MIME,
            width,
            height,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Decode an uploaded image at its natural resolution and re-encode it as PNG.
///
/// Any format the `image` crate can decode is accepted; no size or type checks are made.
pub fn ingest_bytes(bytes: &[u8]) -> SketchResult<ImageAsset> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| SketchError::decode(format!("decode uploaded image: {e}")))?;
    let canvas = draw_to_canvas(&decoded);
    let (width, height) = canvas.dimensions();
    let png = encode_png(canvas)?;
    tracing::debug!(width, height, png_bytes = png.len(), "ingested upload");

    Ok(ImageAsset {
        display_url: data_url(PNG_MIME, &png),
        bytes: png,
        mime_type: PNG_MIME,
        width,
        height,
    })
}

pub fn ingest_path(path: impl AsRef<Path>) -> SketchResult<ImageAsset> {
    let path = path.as_ref();
    let bytes =
        std::fs::read(path).with_context(|| format!("read input image '{}'", path.display()))?;
    ingest_bytes(&bytes)
}

pub fn data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", base64::encode(bytes))
}

// Straight-alpha RGBA8 at the source size, transparent where the source has no coverage.
fn draw_to_canvas(img: &DynamicImage) -> RgbaImage {
    img.to_rgba8()
}

fn encode_png(canvas: RgbaImage) -> SketchResult<Vec<u8>> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(canvas)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .context("encode canvas as png")?;
    Ok(buf)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/ingest.rs"]
mod tests;
