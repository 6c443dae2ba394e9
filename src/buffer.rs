use anyhow::Context;

use crate::color::Rgba;
use crate::error::{OvertintError, OvertintResult};

/// Straight-alpha RGBA8 raster, row-major, 4 bytes per pixel.
///
/// This is both the session's base buffer and the result type of every
/// compositing pass. Highlight and glow blends write the RGB bytes and leave
/// the alpha byte untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Zero-filled (transparent black) buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Buffer filled with a single color; alpha is quantized to a byte.
    pub fn filled(width: u32, height: u32, color: Rgba) -> Self {
        let a = (color.a * 255.0).round() as u8;
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..width as usize * height as usize {
            data.extend_from_slice(&[color.r, color.g, color.b, a]);
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> OvertintResult<Self> {
        let expect = width as usize * height as usize * 4;
        if data.len() != expect {
            return Err(OvertintError::precondition(format!(
                "rgba8 data length {} does not match {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Decode encoded image bytes (PNG, JPEG, ...) into a straight-alpha buffer.
    pub fn decode(bytes: &[u8]) -> OvertintResult<Self> {
        let dyn_img = image::load_from_memory(bytes).context("decode base image from memory")?;
        let rgba = dyn_img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            width,
            height,
            data: rgba.into_raw(),
        })
    }

    /// Encode as PNG.
    pub fn to_png(&self) -> OvertintResult<Vec<u8>> {
        let img = image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .context("pixel buffer dimensions disagree with its data length")?;
        let mut out = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
            .context("encode png")?;
        Ok(out)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Byte offset of pixel `(x, y)`; callers must stay in bounds.
    #[inline]
    pub fn offset(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.width && y < self.height);
        (y as usize * self.width as usize + x as usize) * 4
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Linear blend of `color` into the RGB bytes at `(x, y)` with the given
    /// weight; alpha stays as it was. Out-of-bounds coordinates are ignored,
    /// which is what thickness strokes clipped at the edge rely on.
    #[inline]
    pub fn blend_pixel(&mut self, x: u32, y: u32, color: Rgba, weight: f32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let w = weight.clamp(0.0, 1.0);
        if w <= 0.0 {
            return;
        }
        let i = self.offset(x, y);
        self.data[i] = blend_channel(self.data[i], color.r, w);
        self.data[i + 1] = blend_channel(self.data[i + 1], color.g, w);
        self.data[i + 2] = blend_channel(self.data[i + 2], color.b, w);
    }
}

#[inline]
fn blend_channel(dst: u8, src: u8, weight: f32) -> u8 {
    (f32::from(dst) * (1.0 - weight) + f32::from(src) * weight).round() as u8
}
