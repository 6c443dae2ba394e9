//! Overtint composites segmentation masks over room photographs so a user can
//! try paint colors on walls before committing to one.
//!
//! The API is session-oriented:
//!
//! - Load a base image into a [`Session`] and wire up a [`MaskFetcher`]
//! - Preview segments with a [`Style`] (translucent fill, outline, glow)
//! - Queue interactive work through a [`Driver`] so presentations stay ordered
//! - [`Session::commit_segment`] bakes a chosen color into the base buffer
#![forbid(unsafe_code)]

pub mod blur;
pub mod buffer;
pub mod codec;
pub mod color;
pub mod commit;
pub mod compositor;
pub mod driver;
pub mod error;
pub mod mask;
pub mod service;
pub mod session;
pub mod store;
pub mod style;

pub use crate::buffer::PixelBuffer;
pub use crate::codec::{decode_mask, encode_mask};
pub use crate::color::{Rgba, segment_color};
pub use crate::commit::commit;
pub use crate::compositor::{HIGHLIGHT_DAMPING, compose, compose_all};
pub use crate::driver::{
    CancelToken, Driver, DriverObserver, InMemoryTarget, NullObserver, RenderTarget,
};
pub use crate::error::{OvertintError, OvertintResult};
pub use crate::mask::{Mask, SegmentIndex};
pub use crate::service::{InMemoryService, MaskFetcher, MaskPayload, SegmentDetector};
pub use crate::session::Session;
pub use crate::store::MaskStore;
pub use crate::style::{Border, Glow, Line, Style};
