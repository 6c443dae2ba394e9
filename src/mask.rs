use crate::error::{OvertintError, OvertintResult};

/// Identifier of one segment within a session.
///
/// Indices are assigned by the segmentation service. They are unique within a
/// session but not necessarily contiguous once segments have been deleted.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct SegmentIndex(pub u32);

impl std::fmt::Display for SegmentIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dense boolean segment grid, row-major, `true` = pixel belongs to the segment.
///
/// Masks are immutable once decoded; the store hands them out as `Arc<Mask>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    bits: Vec<u8>,
}

impl Mask {
    /// Build a mask from one byte per pixel, row-major. Any nonzero byte counts
    /// as covered.
    pub fn from_raw(width: u32, height: u32, raw: Vec<u8>) -> OvertintResult<Self> {
        let expect = width as usize * height as usize;
        if raw.len() != expect {
            return Err(OvertintError::precondition(format!(
                "mask data length {} does not match {width}x{height}",
                raw.len()
            )));
        }
        let bits = raw.into_iter().map(|b| u8::from(b != 0)).collect();
        Ok(Self {
            width,
            height,
            bits,
        })
    }

    /// Build from a closure over `(x, y)`; test and tooling convenience.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut bits = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                bits.push(u8::from(f(x, y)));
            }
        }
        Self {
            width,
            height,
            bits,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(height, width)`, the order the segmentation service uses on the wire.
    pub fn shape(&self) -> (u32, u32) {
        (self.height, self.width)
    }

    /// Coverage test. Out-of-bounds coordinates are simply not covered, which
    /// is what border detection at the buffer edge relies on.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.bits[y as usize * self.width as usize + x as usize] != 0
    }

    /// Row-major 0/1 bytes, one per pixel.
    pub fn data(&self) -> &[u8] {
        &self.bits
    }

    /// Number of covered pixels.
    pub fn coverage(&self) -> usize {
        self.bits.iter().filter(|&&b| b != 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&b| b == 0)
    }
}
