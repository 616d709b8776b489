// src/images/codec.rs
// Narrow raster-codec capability. The transformer's bounding-box logic only
// sees this trait, so it can be exercised with a fake codec in tests.

use anyhow::{anyhow, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageBuffer, Rgb};

/// Decoded raster data, RGB8, row-major.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

pub trait ImageCodec: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage>;
    fn resize(&self, image: &DecodedImage, width: u32, height: u32) -> Result<DecodedImage>;
    fn encode_jpeg(&self, image: &DecodedImage, quality: u8) -> Result<Vec<u8>>;
}

/// Live codec backed by the `image` crate.
pub struct RasterCodec;

fn to_buffer(image: &DecodedImage) -> Result<ImageBuffer<Rgb<u8>, Vec<u8>>> {
    ImageBuffer::from_raw(image.width, image.height, image.pixels.clone())
        .ok_or_else(|| anyhow!("pixel buffer does not match declared dimensions"))
}

impl ImageCodec for RasterCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage> {
        let decoded = image::load_from_memory(bytes).context("decoding source image")?;
        let rgb = decoded.to_rgb8();
        Ok(DecodedImage {
            width: rgb.width(),
            height: rgb.height(),
            pixels: rgb.into_raw(),
        })
    }

    fn resize(&self, source: &DecodedImage, width: u32, height: u32) -> Result<DecodedImage> {
        let buf = to_buffer(source)?;
        let resized = image::imageops::resize(&buf, width, height, FilterType::Triangle);
        Ok(DecodedImage {
            width,
            height,
            pixels: resized.into_raw(),
        })
    }

    fn encode_jpeg(&self, source: &DecodedImage, quality: u8) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
        encoder
            .encode(
                &source.pixels,
                source.width,
                source.height,
                ExtendedColorType::Rgb8,
            )
            .context("encoding jpeg")?;
        Ok(out)
    }
}
