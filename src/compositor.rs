//! Precise per-pixel compositing: highlight fill, border detection and
//! stroking, glow diffusion. This is the preview path; the commit path in
//! `commit.rs` deliberately uses coarser primitives instead.

use std::sync::Arc;

use crate::buffer::PixelBuffer;
use crate::error::{OvertintError, OvertintResult};
use crate::mask::Mask;
use crate::style::{Border, Glow, Line, Style};

/// Preview fills stay translucent: the style's highlight alpha is damped by
/// this factor before blending.
pub const HIGHLIGHT_DAMPING: f32 = 0.6;

/// Composite one segment over `base` and return the result as a new buffer.
/// `base` itself is never written.
pub fn compose(base: &PixelBuffer, mask: &Mask, style: &Style) -> OvertintResult<PixelBuffer> {
    compose_layers(base, &[mask], style)
}

/// Composite every mask over `base` in the given order (callers pass ascending
/// segment index order). Fills blend once per mask over the same evolving
/// buffer, so overlapping segments tint cumulatively.
pub fn compose_all(
    base: &PixelBuffer,
    masks: &[Arc<Mask>],
    style: &Style,
) -> OvertintResult<PixelBuffer> {
    let refs: Vec<&Mask> = masks.iter().map(|m| m.as_ref()).collect();
    compose_layers(base, &refs, style)
}

fn compose_layers(
    base: &PixelBuffer,
    masks: &[&Mask],
    style: &Style,
) -> OvertintResult<PixelBuffer> {
    style.validate()?;
    let (width, height) = base.dimensions();
    for mask in masks {
        if mask.width() != width || mask.height() != height {
            return Err(OvertintError::precondition(format!(
                "mask is {}x{} but the base buffer is {width}x{height}",
                mask.width(),
                mask.height()
            )));
        }
    }

    let mut out = base.clone();

    let weight = HIGHLIGHT_DAMPING * style.highlight.a;
    if weight > 0.0 {
        for mask in masks {
            for y in 0..height {
                for x in 0..width {
                    if mask.get(x, y) {
                        out.blend_pixel(x, y, style.highlight, weight);
                    }
                }
            }
        }
    }

    // Glow diffuses around detected border pixels, so without a border there
    // is nothing to diffuse from.
    if let Some(border) = style.border.as_ref().filter(|b| b.thickness > 0) {
        let plane = detect_borders(masks, width, height);
        paint_border(&mut out, &plane, border);
        if let Some(glow) = &style.glow {
            diffuse_glow(&mut out, &plane, glow);
        }
    }

    Ok(out)
}

/// One byte per pixel, 1 where any mask has a border pixel. A mask pixel is a
/// border pixel iff any 4-neighbor is uncovered; off-buffer counts as
/// uncovered, so segments touching the edge are outlined there too.
fn detect_borders(masks: &[&Mask], width: u32, height: u32) -> Vec<u8> {
    let mut plane = vec![0u8; width as usize * height as usize];
    for mask in masks {
        for y in 0..height {
            for x in 0..width {
                if !mask.get(x, y) {
                    continue;
                }
                let interior = mask.get(x, y.wrapping_sub(1))
                    && mask.get(x, y + 1)
                    && mask.get(x.wrapping_sub(1), y)
                    && mask.get(x + 1, y);
                if !interior {
                    plane[y as usize * width as usize + x as usize] = 1;
                }
            }
        }
    }
    plane
}

/// Stroke the border plane. Dashing counts border pixels in row-major scan
/// order, not arc length: one shared counter across the whole plane, tested
/// before it is bumped. Thickness extends each painted pixel diagonally.
fn paint_border(out: &mut PixelBuffer, plane: &[u8], border: &Border) {
    let (width, height) = out.dimensions();
    let mut counter: u64 = 0;
    for y in 0..height {
        for x in 0..width {
            if plane[y as usize * width as usize + x as usize] == 0 {
                continue;
            }
            let on = match border.line {
                Line::Solid => true,
                // A degenerate dash length means no gaps.
                Line::Dashed { dash_len: 0 } => true,
                Line::Dashed { dash_len } => (counter / u64::from(dash_len)) % 2 == 0,
            };
            counter += 1;
            if !on {
                continue;
            }
            for i in 0..border.thickness {
                out.blend_pixel(x + i, y + i, border.color, border.color.a);
            }
        }
    }
}

/// Spread glow strength around every border pixel with linear distance
/// falloff inside the radius; overlapping contributions keep the max, not the
/// sum, so dense borders do not blow out.
fn diffuse_glow(out: &mut PixelBuffer, plane: &[u8], glow: &Glow) {
    let (width, height) = out.dimensions();
    let radius = glow.radius;
    let gain = glow.intensity.clamp(0.0, 1.0) * glow.color.a;
    if radius <= 0.0 || gain <= 0.0 {
        return;
    }
    let reach = radius.ceil() as i64;

    let mut strength = vec![0.0f32; width as usize * height as usize];
    for y in 0..height as i64 {
        for x in 0..width as i64 {
            if plane[y as usize * width as usize + x as usize] == 0 {
                continue;
            }
            for dy in -reach..=reach {
                for dx in -reach..=reach {
                    let xx = x + dx;
                    let yy = y + dy;
                    if xx < 0 || yy < 0 || xx >= width as i64 || yy >= height as i64 {
                        continue;
                    }
                    let dist = ((dx * dx + dy * dy) as f32).sqrt();
                    if dist > radius {
                        continue;
                    }
                    let falloff = (1.0 - dist / radius) * gain;
                    let idx = yy as usize * width as usize + xx as usize;
                    if falloff > strength[idx] {
                        strength[idx] = falloff;
                    }
                }
            }
        }
    }

    for (i, &s) in strength.iter().enumerate() {
        if s <= 0.0 {
            continue;
        }
        let x = (i % width as usize) as u32;
        let y = (i / width as usize) as u32;
        out.blend_pixel(x, y, glow.color, s);
    }
}
