use crate::error::{OvertintError, OvertintResult};

/// Straight (non-premultiplied) display-RGB color with a fractional alpha.
///
/// Blend math throughout the crate treats `a` as the blend weight in 0..=1;
/// the channel bytes are never premultiplied.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    /// Construct a color, clamping alpha into 0..=1.
    pub fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self {
            r,
            g,
            b,
            a: if a.is_finite() { a.clamp(0.0, 1.0) } else { 0.0 },
        }
    }

    pub fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Parse the color notations the collaborator and UI hand over:
    /// `rgb(r, g, b)`, `rgba(r, g, b, a)` (alpha optional in either form, as in
    /// the CSS the service emits), and `#rrggbb` / `#rrggbbaa` hex.
    pub fn parse(text: &str) -> OvertintResult<Self> {
        let s = text.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return Self::parse_hex(hex)
                .ok_or_else(|| OvertintError::precondition(format!("invalid hex color '{s}'")));
        }

        let lower = s.to_ascii_lowercase();
        let body = lower
            .strip_prefix("rgba")
            .or_else(|| lower.strip_prefix("rgb"))
            .and_then(|rest| rest.trim_start().strip_prefix('('))
            .and_then(|rest| rest.trim_end().strip_suffix(')'))
            .ok_or_else(|| OvertintError::precondition(format!("invalid color '{s}'")))?;

        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        if parts.len() != 3 && parts.len() != 4 {
            return Err(OvertintError::precondition(format!(
                "color '{s}' must have 3 or 4 components"
            )));
        }

        let channel = |p: &str| -> OvertintResult<u8> {
            p.parse::<u8>().map_err(|_| {
                OvertintError::precondition(format!("color channel '{p}' must be 0..=255"))
            })
        };
        let r = channel(parts[0])?;
        let g = channel(parts[1])?;
        let b = channel(parts[2])?;

        let a = if parts.len() == 4 {
            let a = parts[3].parse::<f32>().map_err(|_| {
                OvertintError::precondition(format!("color alpha '{}' must be a number", parts[3]))
            })?;
            if !a.is_finite() || !(0.0..=1.0).contains(&a) {
                return Err(OvertintError::precondition(format!(
                    "color alpha '{}' must be within 0..=1",
                    parts[3]
                )));
            }
            a
        } else {
            1.0
        };

        Ok(Self { r, g, b, a })
    }

    fn parse_hex(hex: &str) -> Option<Self> {
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Self {
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
                a: 1.0,
            }),
            8 => Some(Self {
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
                a: f32::from(byte(6)?) / 255.0,
            }),
            _ => None,
        }
    }
}

impl std::fmt::Display for Rgba {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

/// Golden-angle hue for hsl(hue, 70%, 60%).
const SEGMENT_HUE_STEP_DEG: f64 = 137.508;

/// Deterministic per-segment tint: a golden-angle walk around the hue wheel so
/// nearby indices land on visually distant hues.
pub fn segment_color(index: u32) -> Rgba {
    let hue = (f64::from(index) * SEGMENT_HUE_STEP_DEG) % 360.0;
    let (r, g, b) = hsl_to_rgb(hue as f32, 0.70, 0.60);
    Rgba::opaque(r, g, b)
}

fn hsl_to_rgb(h_deg: f32, s: f32, l: f32) -> (u8, u8, u8) {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = h_deg.rem_euclid(360.0) / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r1, g1, b1) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    let to_u8 = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    (to_u8(r1), to_u8(g1), to_u8(b1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rgb_and_rgba_forms() {
        assert_eq!(Rgba::parse("rgb(10, 20, 30)").unwrap(), Rgba::opaque(10, 20, 30));
        assert_eq!(
            Rgba::parse("rgba(0, 173, 239, 0.38)").unwrap(),
            Rgba::new(0, 173, 239, 0.38)
        );
        // Alpha is optional regardless of the prefix, as in the source regex.
        assert_eq!(Rgba::parse("rgba(1,2,3)").unwrap(), Rgba::opaque(1, 2, 3));
        assert_eq!(
            Rgba::parse("rgb(1, 2, 3, 0.5)").unwrap(),
            Rgba::new(1, 2, 3, 0.5)
        );
    }

    #[test]
    fn parse_hex_forms() {
        assert_eq!(Rgba::parse("#00adef").unwrap(), Rgba::opaque(0, 173, 239));
        let with_alpha = Rgba::parse("#ff000080").unwrap();
        assert_eq!((with_alpha.r, with_alpha.g, with_alpha.b), (255, 0, 0));
        assert!((with_alpha.a - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn parse_rejects_malformed_input() {
        for bad in [
            "",
            "red",
            "rgb(1,2)",
            "rgb(1,2,3,4,5)",
            "rgb(300, 0, 0)",
            "rgba(0,0,0,1.5)",
            "#12345",
            "#gggggg",
        ] {
            assert!(
                matches!(Rgba::parse(bad), Err(OvertintError::Precondition(_))),
                "expected precondition error for '{bad}'"
            );
        }
    }

    #[test]
    fn display_round_trips_through_parse() {
        let c = Rgba::new(12, 200, 9, 0.25);
        assert_eq!(Rgba::parse(&c.to_string()).unwrap(), c);
    }

    #[test]
    fn segment_palette_is_deterministic_and_spread() {
        assert_eq!(segment_color(4), segment_color(4));
        // Neighboring indices must not collapse onto the same tint.
        let a = segment_color(0);
        let b = segment_color(1);
        assert_ne!((a.r, a.g, a.b), (b.r, b.g, b.b));
    }

    #[test]
    fn hsl_conversion_hits_primary_anchors() {
        assert_eq!(hsl_to_rgb(0.0, 1.0, 0.5), (255, 0, 0));
        assert_eq!(hsl_to_rgb(120.0, 1.0, 0.5), (0, 255, 0));
        assert_eq!(hsl_to_rgb(240.0, 1.0, 0.5), (0, 0, 255));
        assert_eq!(hsl_to_rgb(0.0, 0.0, 1.0), (255, 255, 255));
    }
}
