//! Contracts toward the segmentation service.
//!
//! The engine never talks to the network itself; callers hand it a
//! [`MaskFetcher`] (and optionally a [`SegmentDetector`]) and the engine pulls
//! masks through them on demand. Structural changes on the service side
//! (upload, delete, polygon edits) are the caller's cue to invalidate the
//! session's mask store before the next composite.

use std::collections::BTreeMap;

use crate::codec;
use crate::error::{OvertintError, OvertintResult};
use crate::mask::{Mask, SegmentIndex};

/// Wire shape of one fetched mask: base64 payload plus `[height, width]`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MaskPayload {
    pub mask: String,
    pub shape: [u32; 2],
}

impl MaskPayload {
    pub fn shape(&self) -> (u32, u32) {
        (self.shape[0], self.shape[1])
    }

    pub fn decode(&self) -> OvertintResult<Mask> {
        codec::decode_mask(&self.mask, self.shape())
    }

    pub fn from_mask(mask: &Mask) -> OvertintResult<Self> {
        let (height, width) = mask.shape();
        Ok(Self {
            mask: codec::encode_mask(mask)?,
            shape: [height, width],
        })
    }
}

/// Pulls one segment's mask payload from the segmentation service.
pub trait MaskFetcher: Send + Sync {
    fn fetch_mask(&self, index: SegmentIndex) -> OvertintResult<MaskPayload>;
}

/// Resolves a click point to the segment under it, if any.
pub trait SegmentDetector: Send + Sync {
    fn detect_at(&self, x: u32, y: u32) -> OvertintResult<Option<SegmentIndex>>;
}

/// In-memory service double for tests, tooling, and offline use.
///
/// Holds decoded masks keyed by index; `fetch_mask` re-encodes to the wire
/// shape, and `detect_at` answers with the lowest index covering the point.
#[derive(Debug, Default)]
pub struct InMemoryService {
    masks: BTreeMap<SegmentIndex, Mask>,
}

impl InMemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: SegmentIndex, mask: Mask) {
        self.masks.insert(index, mask);
    }

    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }
}

impl MaskFetcher for InMemoryService {
    fn fetch_mask(&self, index: SegmentIndex) -> OvertintResult<MaskPayload> {
        let mask = self
            .masks
            .get(&index)
            .ok_or_else(|| OvertintError::fetch(format!("no mask for segment {index}")))?;
        MaskPayload::from_mask(mask)
    }
}

impl SegmentDetector for InMemoryService {
    fn detect_at(&self, x: u32, y: u32) -> OvertintResult<Option<SegmentIndex>> {
        Ok(self
            .masks
            .iter()
            .find(|(_, mask)| mask.get(x, y))
            .map(|(&index, _)| index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_round_trips_through_serde_and_codec() {
        let mask = Mask::from_fn(5, 3, |x, y| (x + y) % 2 == 0);
        let payload = MaskPayload::from_mask(&mask).unwrap();
        assert_eq!(payload.shape, [3, 5]);

        let json = serde_json::to_string(&payload).unwrap();
        let back: MaskPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back.decode().unwrap(), mask);
    }

    #[test]
    fn in_memory_service_fetches_and_detects() {
        let mut svc = InMemoryService::new();
        svc.insert(SegmentIndex(2), Mask::from_fn(4, 4, |x, _| x < 2));
        svc.insert(SegmentIndex(7), Mask::from_fn(4, 4, |x, _| x >= 2));

        let fetched = svc.fetch_mask(SegmentIndex(7)).unwrap().decode().unwrap();
        assert!(fetched.get(3, 0));
        assert!(!fetched.get(0, 0));

        assert_eq!(svc.detect_at(0, 0).unwrap(), Some(SegmentIndex(2)));
        assert_eq!(svc.detect_at(3, 3).unwrap(), Some(SegmentIndex(7)));

        let missing = svc.fetch_mask(SegmentIndex(0)).unwrap_err();
        assert!(matches!(missing, OvertintError::Fetch(_)));
    }

    #[test]
    fn detect_prefers_the_lowest_covering_index() {
        let mut svc = InMemoryService::new();
        svc.insert(SegmentIndex(5), Mask::from_fn(2, 2, |_, _| true));
        svc.insert(SegmentIndex(1), Mask::from_fn(2, 2, |_, _| true));
        assert_eq!(svc.detect_at(1, 1).unwrap(), Some(SegmentIndex(1)));
        assert_eq!(svc.detect_at(9, 9).unwrap(), None);
    }
}
