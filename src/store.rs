//! Session-scoped mask cache with single-flight fetching.
//!
//! One fetch per segment index is in flight at a time; concurrent callers for
//! the same index block until the winner resolves. `invalidate_all` bumps a
//! generation counter, so a fetch that started before an invalidation can
//! neither be inserted nor served after it.

use std::collections::{BTreeMap, HashMap};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{OvertintError, OvertintResult};
use crate::mask::{Mask, SegmentIndex};
use crate::service::MaskFetcher;

/// What a blocked caller eventually receives. Failures travel as text; the
/// waiter wraps them as `Fetch`.
type WaitOutcome = Result<Arc<Mask>, String>;

struct PendingFetch {
    generation: u64,
    waiters: Vec<mpsc::Sender<WaitOutcome>>,
}

#[derive(Default)]
struct StoreState {
    generation: u64,
    ready: BTreeMap<SegmentIndex, Arc<Mask>>,
    pending: HashMap<SegmentIndex, PendingFetch>,
}

enum Claim {
    Hit(Arc<Mask>),
    Wait(mpsc::Receiver<WaitOutcome>),
    Fetch { generation: u64 },
}

/// Resolves the pending slot with an error if the winning fetch unwinds.
/// Without it a panicking fetcher would leave its waiters parked on senders
/// still alive inside the store.
struct FetchGuard<'a> {
    store: &'a MaskStore,
    index: SegmentIndex,
    generation: u64,
    armed: bool,
}

impl FetchGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let _ = self.store.resolve(
                self.index,
                self.generation,
                Err(OvertintError::fetch(format!(
                    "fetch for segment {} panicked",
                    self.index
                ))),
            );
        }
    }
}

#[derive(Default)]
pub struct MaskStore {
    state: Mutex<StoreState>,
}

impl MaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached mask for `index`, or fetch + decode it through `fetcher`.
    ///
    /// Exactly one caller performs the fetch; the rest block on the result.
    /// A failed fetch clears the pending slot (a fetcher panic counts as a
    /// failure), so a later call re-attempts. There is no automatic retry and
    /// no negative caching.
    #[tracing::instrument(skip(self, fetcher))]
    pub fn get_or_fetch(
        &self,
        index: SegmentIndex,
        fetcher: &dyn MaskFetcher,
    ) -> OvertintResult<Arc<Mask>> {
        let generation = match self.claim(index) {
            Claim::Hit(mask) => return Ok(mask),
            Claim::Wait(rx) => {
                return match rx.recv() {
                    Ok(Ok(mask)) => Ok(mask),
                    Ok(Err(msg)) => Err(OvertintError::fetch(msg)),
                    Err(_) => Err(OvertintError::fetch(format!(
                        "fetch for segment {index} was abandoned"
                    ))),
                };
            }
            Claim::Fetch { generation } => generation,
        };

        let guard = FetchGuard {
            store: self,
            index,
            generation,
            armed: true,
        };
        let outcome = fetcher
            .fetch_mask(index)
            .and_then(|payload| payload.decode());
        guard.disarm();
        self.resolve(index, generation, outcome)
    }

    /// Clear every cached mask and outdate all in-flight fetches. Call after
    /// any structural segmentation change (upload, delete, polygon edits).
    pub fn invalidate_all(&self) {
        let mut state = self.state();
        state.generation += 1;
        state.ready.clear();
        for (index, pending) in state.pending.drain() {
            let msg = format!("segment {index} was invalidated while its mask was in flight");
            for waiter in pending.waiters {
                let _ = waiter.send(Err(msg.clone()));
            }
        }
    }

    /// Cached mask, if present; never triggers a fetch.
    pub fn cached(&self, index: SegmentIndex) -> Option<Arc<Mask>> {
        self.state().ready.get(&index).cloned()
    }

    /// All cached masks in ascending index order.
    pub fn ready_masks(&self) -> Vec<(SegmentIndex, Arc<Mask>)> {
        self.state()
            .ready
            .iter()
            .map(|(&index, mask)| (index, mask.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state().ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().ready.is_empty()
    }

    fn claim(&self, index: SegmentIndex) -> Claim {
        let mut state = self.state();
        if let Some(mask) = state.ready.get(&index) {
            return Claim::Hit(mask.clone());
        }
        if let Some(pending) = state.pending.get_mut(&index) {
            let (tx, rx) = mpsc::channel();
            pending.waiters.push(tx);
            return Claim::Wait(rx);
        }
        let generation = state.generation;
        state.pending.insert(
            index,
            PendingFetch {
                generation,
                waiters: Vec::new(),
            },
        );
        Claim::Fetch { generation }
    }

    fn resolve(
        &self,
        index: SegmentIndex,
        generation: u64,
        outcome: OvertintResult<Mask>,
    ) -> OvertintResult<Arc<Mask>> {
        let mut state = self.state();

        // Only reap the pending slot this fetch created. After an invalidation
        // a newer fetch for the same index may already own a fresh slot.
        let waiters = match state.pending.get(&index) {
            Some(pending) if pending.generation == generation => state
                .pending
                .remove(&index)
                .map(|p| p.waiters)
                .unwrap_or_default(),
            _ => Vec::new(),
        };

        if state.generation != generation {
            let msg = format!("segment {index} was invalidated while its mask was in flight");
            for waiter in waiters {
                let _ = waiter.send(Err(msg.clone()));
            }
            return Err(OvertintError::fetch(msg));
        }

        match outcome {
            Ok(mask) => {
                let mask = Arc::new(mask);
                state.ready.insert(index, mask.clone());
                for waiter in waiters {
                    let _ = waiter.send(Ok(mask.clone()));
                }
                Ok(mask)
            }
            Err(err) => {
                let msg = err.to_string();
                for waiter in waiters {
                    let _ = waiter.send(Err(msg.clone()));
                }
                Err(err)
            }
        }
    }

    // Critical sections are short and panic-free; a poisoned lock only echoes
    // an earlier crash, so keep serving the inner state.
    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::service::MaskPayload;

    struct CountingFetcher {
        calls: AtomicUsize,
        fail_first: bool,
    }

    impl CountingFetcher {
        fn new(fail_first: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl MaskFetcher for CountingFetcher {
        fn fetch_mask(&self, index: SegmentIndex) -> OvertintResult<MaskPayload> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && n == 0 {
                return Err(OvertintError::fetch("segmentation service unavailable"));
            }
            MaskPayload::from_mask(&Mask::from_fn(2, 2, |x, _| x == index.0 % 2))
        }
    }

    #[test]
    fn second_lookup_hits_the_cache() {
        let store = MaskStore::new();
        let fetcher = CountingFetcher::new(false);

        let a = store.get_or_fetch(SegmentIndex(3), &fetcher).unwrap();
        let b = store.get_or_fetch(SegmentIndex(3), &fetcher).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn failure_is_not_cached_and_a_later_call_retries() {
        let store = MaskStore::new();
        let fetcher = CountingFetcher::new(true);

        let err = store.get_or_fetch(SegmentIndex(0), &fetcher).unwrap_err();
        assert!(matches!(err, OvertintError::Fetch(_)));
        assert!(store.is_empty());

        store.get_or_fetch(SegmentIndex(0), &fetcher).unwrap();
        assert_eq!(fetcher.calls(), 2);
    }

    #[test]
    fn invalidate_forces_a_refetch() {
        let store = MaskStore::new();
        let fetcher = CountingFetcher::new(false);

        store.get_or_fetch(SegmentIndex(1), &fetcher).unwrap();
        store.invalidate_all();
        assert!(store.cached(SegmentIndex(1)).is_none());

        store.get_or_fetch(SegmentIndex(1), &fetcher).unwrap();
        assert_eq!(fetcher.calls(), 2);
    }

    #[test]
    fn ready_masks_come_back_in_ascending_index_order() {
        let store = MaskStore::new();
        let fetcher = CountingFetcher::new(false);

        for i in [7u32, 2, 5] {
            store.get_or_fetch(SegmentIndex(i), &fetcher).unwrap();
        }
        let order: Vec<u32> = store.ready_masks().iter().map(|(i, _)| i.0).collect();
        assert_eq!(order, vec![2, 5, 7]);
    }
}
