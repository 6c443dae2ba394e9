use crate::color::Rgba;
use crate::error::{OvertintError, OvertintResult};

/// Hard cap on border thickness and glow radius, in pixels.
pub const MAX_STYLE_EXTENT_PX: u32 = 256;

/// How a compositing pass paints one segment: translucent fill, optional
/// outline, optional glow around that outline.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Style {
    pub highlight: Rgba,
    pub border: Option<Border>,
    pub glow: Option<Glow>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Border {
    pub color: Rgba,
    pub thickness: u32, // px
    pub line: Line,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Line {
    Solid,
    Dashed { dash_len: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Glow {
    pub color: Rgba,
    pub radius: f32,    // px
    pub intensity: f32, // 0..1
}

impl Style {
    /// Fill-only style, no outline, no glow.
    pub fn fill(highlight: Rgba) -> Self {
        Self {
            highlight,
            border: None,
            glow: None,
        }
    }

    /// The stock hover/warm-up look: faint gray fill, dashed cyan outline,
    /// soft cyan glow.
    pub fn preview() -> Self {
        let accent = Rgba::new(0, 173, 239, 0.38);
        Self {
            highlight: Rgba::new(117, 115, 114, 0.1),
            border: Some(Border {
                color: accent,
                thickness: 2,
                line: Line::Dashed { dash_len: 6 },
            }),
            glow: Some(Glow {
                color: accent,
                radius: 6.0,
                intensity: 0.4,
            }),
        }
    }

    /// Reject oversized or non-finite numeric knobs. `compose` and `commit`
    /// run this before rendering; deserialized styles are otherwise unchecked.
    pub fn validate(&self) -> OvertintResult<()> {
        if let Some(border) = &self.border {
            if border.thickness > MAX_STYLE_EXTENT_PX {
                return Err(OvertintError::precondition(format!(
                    "border thickness must be <= {MAX_STYLE_EXTENT_PX}"
                )));
            }
        }
        if let Some(glow) = &self.glow {
            if !glow.radius.is_finite() || glow.radius < 0.0 {
                return Err(OvertintError::precondition(
                    "glow radius must be finite and >= 0",
                ));
            }
            if glow.radius > MAX_STYLE_EXTENT_PX as f32 {
                return Err(OvertintError::precondition(format!(
                    "glow radius must be <= {MAX_STYLE_EXTENT_PX}"
                )));
            }
            if !glow.intensity.is_finite() || glow.intensity < 0.0 {
                return Err(OvertintError::precondition(
                    "glow intensity must be finite and >= 0",
                ));
            }
        }
        Ok(())
    }
}
