use std::io::Cursor;

use anyhow::Context;

use crate::{MockupError, MockupResult};

/// Owned straight-alpha RGBA8 pixel buffer, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

/// Encoded output container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    /// Lossy JPEG; alpha is dropped.
    Jpeg {
        /// 1..=100
        quality: u8,
    },
}

impl OutputFormat {
    pub fn jpeg() -> Self {
        Self::Jpeg { quality: 95 }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg { .. } => "jpg",
        }
    }
}

impl Raster {
    /// Wrap an RGBA8 buffer, validating its length.
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> MockupResult<Self> {
        if width == 0 || height == 0 {
            return Err(MockupError::validation("raster width/height must be > 0"));
        }
        let expected = buffer_len(width, height)?;
        if data.len() != expected {
            return Err(MockupError::validation(format!(
                "raster buffer is {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A raster filled with one straight-alpha color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> MockupResult<Self> {
        let px = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| MockupError::validation("raster size overflow"))?;
        Self::from_rgba8(width, height, rgba.repeat(px))
    }

    /// Fully transparent raster.
    pub fn transparent(width: u32, height: u32) -> MockupResult<Self> {
        Self::filled(width, height, [0, 0, 0, 0])
    }

    /// Decode any format the `image` crate understands into RGBA8.
    pub fn decode(bytes: &[u8]) -> MockupResult<Self> {
        let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
        Ok(Self::from(dyn_img.to_rgba8()))
    }

    pub fn encode(&self, format: OutputFormat) -> MockupResult<Vec<u8>> {
        let mut buf = Vec::new();
        let mut cursor = Cursor::new(&mut buf);
        match format {
            OutputFormat::Png => {
                self.to_image()
                    .write_to(&mut cursor, image::ImageFormat::Png)
                    .map_err(|e| MockupError::codec(format!("encode png: {e}")))?;
            }
            OutputFormat::Jpeg { quality } => {
                let rgb = image::DynamicImage::ImageRgba8(self.to_image()).to_rgb8();
                let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                    &mut cursor,
                    quality.clamp(1, 100),
                );
                rgb.write_with_encoder(encoder)
                    .map_err(|e| MockupError::codec(format!("encode jpeg: {e}")))?;
            }
        }
        Ok(buf)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * 4
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.index(x, y);
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, px: [u8; 4]) {
        let i = self.index(x, y);
        self.data[i..i + 4].copy_from_slice(&px);
    }

    pub fn to_image(&self) -> image::RgbaImage {
        // Length was validated on construction.
        image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .unwrap_or_else(|| image::RgbaImage::new(self.width, self.height))
    }
}

impl From<image::RgbaImage> for Raster {
    fn from(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
        }
    }
}

fn buffer_len(width: u32, height: u32) -> MockupResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| MockupError::validation("raster size overflow"))
}
