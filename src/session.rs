use std::sync::Arc;

use crate::buffer::PixelBuffer;
use crate::commit;
use crate::compositor;
use crate::error::{OvertintError, OvertintResult};
use crate::mask::{Mask, SegmentIndex};
use crate::service::{MaskFetcher, SegmentDetector};
use crate::store::MaskStore;
use crate::style::Style;

/// One editing session: the cached base buffer, the session-scoped mask
/// store, and the collaborators that resolve and fetch masks.
///
/// Everything the engine needs lives here; there is no global state. Preview
/// operations derive a fresh buffer from the base; only [`Session::commit_segment`]
/// replaces the base itself.
pub struct Session {
    store: MaskStore,
    base: Option<PixelBuffer>,
    fetcher: Arc<dyn MaskFetcher>,
    detector: Option<Arc<dyn SegmentDetector>>,
}

impl Session {
    pub fn new(
        fetcher: Arc<dyn MaskFetcher>,
        detector: Option<Arc<dyn SegmentDetector>>,
    ) -> Self {
        Self {
            store: MaskStore::new(),
            base: None,
            fetcher,
            detector,
        }
    }

    /// Decode encoded image bytes and install them as the base buffer.
    pub fn load_image(&mut self, bytes: &[u8]) -> OvertintResult<()> {
        let base = PixelBuffer::decode(bytes)?;
        self.set_base(base);
        Ok(())
    }

    /// Replace the base buffer wholesale. A new photo means a new
    /// segmentation, so every cached mask goes stale with it.
    pub fn set_base(&mut self, base: PixelBuffer) {
        self.base = Some(base);
        self.store.invalidate_all();
    }

    pub fn base(&self) -> Option<&PixelBuffer> {
        self.base.as_ref()
    }

    pub fn store(&self) -> &MaskStore {
        &self.store
    }

    /// Drop every cached mask. Call after any structural segmentation change.
    pub fn invalidate(&self) {
        self.store.invalidate_all();
    }

    /// Compose a preview of one segment over the base buffer.
    pub fn preview(&self, index: SegmentIndex, style: &Style) -> OvertintResult<PixelBuffer> {
        let base = self.base_or_err()?;
        let mask = self.store.get_or_fetch(index, self.fetcher.as_ref())?;
        compositor::compose(base, &mask, style)
    }

    /// Resolve the segment under a click point and preview it. `Ok(None)`
    /// means no segment there, which is not an error.
    pub fn preview_at(
        &self,
        x: u32,
        y: u32,
        style: &Style,
    ) -> OvertintResult<Option<PixelBuffer>> {
        let Some(detector) = &self.detector else {
            return Err(OvertintError::precondition(
                "session has no segment detector",
            ));
        };
        match detector.detect_at(x, y)? {
            Some(index) => Ok(Some(self.preview(index, style)?)),
            None => Ok(None),
        }
    }

    /// Compose every cached mask over the base in ascending index order.
    /// Only masks already in the store participate; nothing is fetched.
    pub fn show_all(&self, style: &Style) -> OvertintResult<PixelBuffer> {
        let base = self.base_or_err()?;
        let masks: Vec<Arc<Mask>> = self
            .store
            .ready_masks()
            .into_iter()
            .map(|(_, mask)| mask)
            .collect();
        compositor::compose_all(base, &masks, style)
    }

    /// Bake a color into the base buffer permanently and return the new base.
    #[tracing::instrument(skip(self, style))]
    pub fn commit_segment(
        &mut self,
        index: SegmentIndex,
        style: &Style,
    ) -> OvertintResult<&PixelBuffer> {
        let mask = self.store.get_or_fetch(index, self.fetcher.as_ref())?;
        let committed = {
            let base = self.base_or_err()?;
            commit::commit(base, &mask, style)?
        };
        Ok(self.base.insert(committed))
    }

    fn base_or_err(&self) -> OvertintResult<&PixelBuffer> {
        self.base
            .as_ref()
            .ok_or_else(|| OvertintError::precondition("session has no base image"))
    }
}
