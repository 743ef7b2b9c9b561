//! voxview - volumetric slice viewer core
//!
//! Client-side viewing layer for slice-based medical volumes: a zoom/pan
//! viewport, per-plane slice navigation with window/level, bounce-style
//! playback, a sliding-window preloader on top of the deduplicating
//! [`voxview_cache::SliceCache`], and keyboard shortcuts.
//!
//! Everything runs on a single-threaded cooperative executor. Components
//! that spawn background work (playback, preloading) expect to be driven
//! from inside a `tokio::task::LocalSet`.

pub mod config;
pub mod constants;
pub mod input;
pub mod keybindings;
pub mod message;
pub mod navigation;
pub mod playback;
pub mod preload;
pub mod request;
pub mod session;
pub mod viewport;
pub mod zoom_math;

#[cfg(test)]
mod test_support;

pub use config::{ConfigError, LogLevel, ViewerConfig};
pub use input::{FocusTarget, Key, KeyEvent, Modifiers, Point, Size};
pub use keybindings::{HelpEntry, Shortcut, ShortcutDispatcher, default_viewer_shortcuts};
pub use message::ViewerAction;
pub use navigation::{Navigator, Plane, VolumeInfo, VolumeShape, WindowSettings};
pub use playback::{PlaybackController, PlaybackSpeed};
pub use preload::{SliceLoad, SlicePreloader};
pub use request::SliceRequest;
pub use session::{KeyOutcome, SessionError, ViewerSession};
pub use viewport::{CursorIcon, Viewport, ViewportOptions};
pub use voxview_cache;
