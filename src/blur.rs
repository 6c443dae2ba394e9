//! Separable Gaussian blur over a single-channel coverage plane. The commit
//! renderer diffuses its shadow primitive with this.

use crate::error::{OvertintError, OvertintResult};

/// Blur `src` (length `width * height`, row-major) with a normalized Gaussian
/// kernel of the given radius, clamping samples at the plane edge.
pub fn blur_plane(
    src: &[f32],
    width: u32,
    height: u32,
    radius: u32,
    sigma: f32,
) -> OvertintResult<Vec<f32>> {
    let expected_len = width as usize * height as usize;
    if src.len() != expected_len {
        return Err(OvertintError::precondition(
            "blur_plane expects src matching width*height",
        ));
    }
    if radius == 0 {
        return Ok(src.to_vec());
    }

    let kernel = gaussian_kernel(radius, sigma)?;
    let mut tmp = vec![0.0f32; expected_len];
    let mut out = vec![0.0f32; expected_len];

    horizontal_pass(src, &mut tmp, width, height, &kernel);
    vertical_pass(&tmp, &mut out, width, height, &kernel);
    Ok(out)
}

fn gaussian_kernel(radius: u32, sigma: f32) -> OvertintResult<Vec<f32>> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(OvertintError::precondition("blur sigma must be > 0"));
    }

    let r = radius as i32;
    let sigma = f64::from(sigma);
    let denom = 2.0 * sigma * sigma;
    let mut weights = Vec::with_capacity((2 * r + 1) as usize);
    let mut sum = 0.0f64;
    for i in -r..=r {
        let x = f64::from(i);
        let w = (-x * x / denom).exp();
        weights.push(w);
        sum += w;
    }

    Ok(weights.into_iter().map(|w| (w / sum) as f32).collect())
}

fn horizontal_pass(src: &[f32], dst: &mut [f32], width: u32, height: u32, k: &[f32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    for y in 0..height as i32 {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (ki, &kw) in k.iter().enumerate() {
                let sx = (x + ki as i32 - radius).clamp(0, w - 1);
                acc += kw * src[(y * w + sx) as usize];
            }
            dst[(y * w + x) as usize] = acc;
        }
    }
}

fn vertical_pass(src: &[f32], dst: &mut [f32], width: u32, height: u32, k: &[f32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let h = height as i32;
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (ki, &kw) in k.iter().enumerate() {
                let sy = (y + ki as i32 - radius).clamp(0, h - 1);
                acc += kw * src[(sy * w + x) as usize];
            }
            dst[(y * w + x) as usize] = acc;
        }
    }
}
