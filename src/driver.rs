//! Sequencing driver: one worker thread owns the session and a render target,
//! and consumes queued jobs strictly FIFO.
//!
//! Every write to the target goes through this single consumer, so an
//! interactive preview enqueued mid-warm-up interleaves cleanly and a stale
//! warm-up step can never clobber a newer frame. Warm-up sequences carry a
//! cancel token; cancelled steps are skipped when dequeued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread::JoinHandle;

use crate::buffer::PixelBuffer;
use crate::error::{OvertintError, OvertintResult};
use crate::mask::SegmentIndex;
use crate::session::Session;
use crate::style::Style;

/// Where presented frames go. The driver calls this from its worker thread,
/// one whole buffer per presentation, in job order.
pub trait RenderTarget: Send {
    fn present(&mut self, frame: &PixelBuffer) -> OvertintResult<()>;
}

/// In-memory target for tests and tooling. Clones share the same frame list,
/// so keep one handle around to inspect what the driver presented.
#[derive(Clone, Debug, Default)]
pub struct InMemoryTarget {
    frames: Arc<Mutex<Vec<PixelBuffer>>>,
}

impl InMemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<PixelBuffer> {
        self.frames.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.frames.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RenderTarget for InMemoryTarget {
    fn present(&mut self, frame: &PixelBuffer) -> OvertintResult<()> {
        self.frames
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(frame.clone());
        Ok(())
    }
}

/// Per-job outcome surfacing. Runs on the worker thread; keep it cheap.
pub trait DriverObserver: Send {
    /// A queued job failed. The session keeps going; nothing is retried.
    fn job_failed(&mut self, _err: &OvertintError) {}
    /// A warm-up step finished presenting: `done` of `total` segments.
    fn warm_progress(&mut self, _done: u32, _total: u32) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default)]
pub struct NullObserver;

impl DriverObserver for NullObserver {}

/// Cancellation handle for one warm-up sequence. Cloned into every step of
/// the sequence; cancelling makes not-yet-dequeued steps no-ops.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

enum Job {
    Preview {
        index: SegmentIndex,
        style: Style,
    },
    PreviewAt {
        x: u32,
        y: u32,
        style: Style,
    },
    WarmStep {
        index: SegmentIndex,
        done: u32,
        total: u32,
        token: CancelToken,
        style: Style,
    },
    ShowAll {
        style: Style,
    },
    Commit {
        index: SegmentIndex,
        style: Style,
    },
    Invalidate,
    LoadImage {
        bytes: Vec<u8>,
    },
}

/// Handle to the worker. Enqueue operations from any caller; drop or
/// [`Driver::shutdown`] to stop the worker.
pub struct Driver {
    tx: mpsc::Sender<Job>,
    worker: JoinHandle<Session>,
    warm_token: CancelToken,
}

impl Driver {
    /// Spawn the worker thread. It takes ownership of the session, target,
    /// and observer for its whole life; [`Driver::shutdown`] gives the
    /// session back.
    pub fn new(
        session: Session,
        target: Box<dyn RenderTarget>,
        observer: Box<dyn DriverObserver>,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        let worker = std::thread::spawn(move || run_worker(session, target, observer, rx));
        Self {
            tx,
            worker,
            warm_token: CancelToken::new(),
        }
    }

    /// Queue a single-segment preview.
    pub fn preview(&self, index: SegmentIndex, style: Style) -> OvertintResult<()> {
        self.send(Job::Preview { index, style })
    }

    /// Queue a point preview; presents nothing if no segment is under it.
    pub fn preview_at(&self, x: u32, y: u32, style: Style) -> OvertintResult<()> {
        self.send(Job::PreviewAt { x, y, style })
    }

    /// Queue an all-cached-segments composite.
    pub fn show_all(&self, style: Style) -> OvertintResult<()> {
        self.send(Job::ShowAll { style })
    }

    /// Queue a permanent commit of one segment.
    pub fn commit(&self, index: SegmentIndex, style: Style) -> OvertintResult<()> {
        self.send(Job::Commit { index, style })
    }

    /// Queue one warm-up step per segment index in `0..count`, strictly
    /// ascending. Any previous warm-up sequence is cancelled first. Returns
    /// this sequence's token for external teardown.
    pub fn warm_up(&mut self, count: u32, style: Style) -> OvertintResult<CancelToken> {
        self.warm_token.cancel();
        let token = CancelToken::new();
        self.warm_token = token.clone();
        for i in 0..count {
            self.send(Job::WarmStep {
                index: SegmentIndex(i),
                done: i + 1,
                total: count,
                token: token.clone(),
                style: style.clone(),
            })?;
        }
        Ok(token)
    }

    /// Cancel the current warm-up sequence without queueing anything.
    pub fn cancel_warm_up(&self) {
        self.warm_token.cancel();
    }

    /// Queue a full mask-store invalidation; also cancels any warm-up, since
    /// its remaining steps would describe a stale segmentation.
    pub fn invalidate(&mut self) -> OvertintResult<()> {
        self.warm_token.cancel();
        self.send(Job::Invalidate)
    }

    /// Queue loading a new base image; cancels any warm-up for the old one.
    pub fn load_image(&mut self, bytes: Vec<u8>) -> OvertintResult<()> {
        self.warm_token.cancel();
        self.send(Job::LoadImage { bytes })
    }

    /// Finish every queued job, stop the worker, and return the session.
    pub fn shutdown(self) -> OvertintResult<Session> {
        let Self { tx, worker, .. } = self;
        drop(tx);
        worker
            .join()
            .map_err(|_| OvertintError::Other(anyhow::anyhow!("driver worker panicked")))
    }

    fn send(&self, job: Job) -> OvertintResult<()> {
        self.tx
            .send(job)
            .map_err(|_| OvertintError::Other(anyhow::anyhow!("driver worker is gone")))
    }
}

fn run_worker(
    mut session: Session,
    mut target: Box<dyn RenderTarget>,
    mut observer: Box<dyn DriverObserver>,
    rx: mpsc::Receiver<Job>,
) -> Session {
    for job in rx {
        if let Err(err) = run_job(&mut session, target.as_mut(), observer.as_mut(), job) {
            // Continue-on-failure: a segment that cannot be highlighted must
            // not take the session down.
            observer.job_failed(&err);
        }
    }
    session
}

fn run_job(
    session: &mut Session,
    target: &mut dyn RenderTarget,
    observer: &mut dyn DriverObserver,
    job: Job,
) -> OvertintResult<()> {
    match job {
        Job::Preview { index, style } => {
            let frame = session.preview(index, &style)?;
            target.present(&frame)
        }
        Job::PreviewAt { x, y, style } => match session.preview_at(x, y, &style)? {
            Some(frame) => target.present(&frame),
            None => Ok(()),
        },
        Job::WarmStep {
            index,
            done,
            total,
            token,
            style,
        } => {
            if token.is_cancelled() {
                return Ok(());
            }
            let frame = session.preview(index, &style)?;
            target.present(&frame)?;
            observer.warm_progress(done, total);
            Ok(())
        }
        Job::ShowAll { style } => {
            let frame = session.show_all(&style)?;
            target.present(&frame)
        }
        Job::Commit { index, style } => {
            let frame = session.commit_segment(index, &style)?;
            target.present(frame)
        }
        Job::Invalidate => {
            session.invalidate();
            Ok(())
        }
        Job::LoadImage { bytes } => {
            session.load_image(&bytes)?;
            match session.base() {
                Some(base) => target.present(base),
                None => Ok(()),
            }
        }
    }
}
