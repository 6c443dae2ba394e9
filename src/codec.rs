//! Wire codec for segment masks.
//!
//! The segmentation service ships each mask as base64 over a DEFLATE stream of
//! packed bits: 1 bit per pixel, row-major as one continuous stream, MSB first
//! within each byte. Only the final byte carries padding; rows are not aligned.

use std::io::{Read, Write};

use anyhow::Context;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::ZlibEncoder;

use crate::error::{OvertintError, OvertintResult};
use crate::mask::Mask;

/// Decode a wire payload into a mask. `shape` is `(height, width)`, the order
/// the service reports it in.
pub fn decode_mask(payload: &str, shape: (u32, u32)) -> OvertintResult<Mask> {
    let (height, width) = shape;
    let compressed = STANDARD
        .decode(payload.trim())
        .map_err(|e| OvertintError::decode(format!("mask payload is not valid base64: {e}")))?;
    let packed = inflate(&compressed)?;

    let pixels = width as usize * height as usize;
    let needed = pixels.div_ceil(8);
    if packed.len() < needed {
        return Err(OvertintError::decode(format!(
            "inflated mask holds {} bytes, {width}x{height} needs {needed}",
            packed.len()
        )));
    }

    let mut bits = Vec::with_capacity(pixels);
    for i in 0..pixels {
        let byte = packed[i >> 3];
        bits.push((byte >> (7 - (i & 7))) & 1);
    }
    Mask::from_raw(width, height, bits)
}

/// Inverse of [`decode_mask`]: pack MSB-first, zlib-compress, base64-encode.
pub fn encode_mask(mask: &Mask) -> OvertintResult<String> {
    let pixels = mask.data();
    let mut packed = vec![0u8; pixels.len().div_ceil(8)];
    for (i, &px) in pixels.iter().enumerate() {
        if px != 0 {
            packed[i >> 3] |= 1 << (7 - (i & 7));
        }
    }

    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(&packed).context("deflate mask bits")?;
    let compressed = enc.finish().context("deflate mask bits")?;
    Ok(STANDARD.encode(compressed))
}

/// The service compresses with zlib; gzip framing also shows up in the wild.
/// Autodetect by magic bytes, the way pako does.
fn inflate(compressed: &[u8]) -> OvertintResult<Vec<u8>> {
    let mut out = Vec::new();
    let res = if compressed.starts_with(&[0x1f, 0x8b]) {
        GzDecoder::new(compressed).read_to_end(&mut out)
    } else {
        ZlibDecoder::new(compressed).read_to_end(&mut out)
    };
    res.map_err(|e| OvertintError::decode(format!("inflate mask payload: {e}")))?;
    Ok(out)
}
