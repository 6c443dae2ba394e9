//! Commit rendering: permanently bake a chosen color into the base buffer.
//!
//! Unlike the preview compositor this path is primitive-based: the fill runs
//! at the style's full alpha, the outline is a coarse square-stamp stroke
//! around every mask pixel, and the glow is the blurred mask silhouette. The
//! two looks are intentionally different renderers, not one algorithm with
//! two settings.

use crate::blur::blur_plane;
use crate::buffer::PixelBuffer;
use crate::error::{OvertintError, OvertintResult};
use crate::mask::Mask;
use crate::style::Style;

/// Render `mask` onto a copy of `base` with commit semantics and return it.
/// Swapping the result in as the new base buffer is the session's job.
pub fn commit(base: &PixelBuffer, mask: &Mask, style: &Style) -> OvertintResult<PixelBuffer> {
    style.validate()?;
    let (width, height) = base.dimensions();
    if mask.width() != width || mask.height() != height {
        return Err(OvertintError::precondition(format!(
            "mask is {}x{} but the base buffer is {width}x{height}",
            mask.width(),
            mask.height()
        )));
    }

    let mut out = base.clone();

    // Full-strength fill: the chosen paint color at its own alpha.
    if style.highlight.a > 0.0 {
        for y in 0..height {
            for x in 0..width {
                if mask.get(x, y) {
                    out.blend_pixel(x, y, style.highlight, style.highlight.a);
                }
            }
        }
    }

    // Outline primitive: every mask pixel stamps a square of Chebyshev radius
    // `thickness`; the union of stamps blends exactly once per pixel, so a
    // translucent outline color does not darken where stamps overlap.
    if let Some(border) = style.border.as_ref().filter(|b| b.thickness > 0) {
        let t = i64::from(border.thickness);
        let mut covered = vec![0u8; width as usize * height as usize];
        for y in 0..height {
            for x in 0..width {
                if !mask.get(x, y) {
                    continue;
                }
                for dy in -t..=t {
                    for dx in -t..=t {
                        let xx = i64::from(x) + dx;
                        let yy = i64::from(y) + dy;
                        if xx < 0 || yy < 0 || xx >= i64::from(width) || yy >= i64::from(height) {
                            continue;
                        }
                        covered[yy as usize * width as usize + xx as usize] = 1;
                    }
                }
            }
        }
        for (i, &c) in covered.iter().enumerate() {
            if c == 0 {
                continue;
            }
            let x = (i % width as usize) as u32;
            let y = (i / width as usize) as u32;
            out.blend_pixel(x, y, border.color, border.color.a);
        }
    }

    // Shadow primitive: blur the silhouette and tint by the blurred coverage.
    if let Some(glow) = style.glow.as_ref().filter(|g| g.radius > 0.0) {
        let gain = glow.intensity.clamp(0.0, 1.0) * glow.color.a;
        if gain > 0.0 {
            let mut silhouette = vec![0.0f32; width as usize * height as usize];
            for y in 0..height {
                for x in 0..width {
                    if mask.get(x, y) {
                        silhouette[y as usize * width as usize + x as usize] = 1.0;
                    }
                }
            }
            let blurred = blur_plane(
                &silhouette,
                width,
                height,
                glow.radius.ceil() as u32,
                glow.radius / 2.0,
            )?;
            for (i, &coverage) in blurred.iter().enumerate() {
                let strength = (coverage * gain).clamp(0.0, 1.0);
                if strength <= 0.0 {
                    continue;
                }
                let x = (i % width as usize) as u32;
                let y = (i / width as usize) as u32;
                out.blend_pixel(x, y, glow.color, strength);
            }
        }
    }

    Ok(out)
}
