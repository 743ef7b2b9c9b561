//! voxview_cache - deduplicating slice image cache
//!
//! This crate fetches slice images from a remote endpoint, decodes them into
//! RGBA buffers and hands out explicitly released handles. Concurrent requests
//! for the same key share one fetch, and retained entries are bounded by a
//! strict insertion-order budget.
//!
//! The cache is built for a single-threaded cooperative scheduler: it uses
//! `Rc`/`RefCell` internally and its futures are `!Send`.

mod cache;
mod decode;
mod error;
mod handle;
mod image;
mod source;

pub use cache::{CacheStats, DEFAULT_MAX_SIZE, SliceCache};
pub use decode::decode_slice;
pub use error::{CacheError, DecodeError, FetchError};
pub use handle::SliceHandle;
pub use image::ImageHandle;
pub use source::{HttpSource, SliceSource};
