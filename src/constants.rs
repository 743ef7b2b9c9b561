//! Global constants for the voxview viewer

/// Default number of retained slice images
pub const DEFAULT_CACHE_SIZE: usize = voxview_cache::DEFAULT_MAX_SIZE;

/// Default number of slices to preload ahead of and behind the current one
pub const DEFAULT_PRELOAD_COUNT: usize = 3;

/// Zoom change per zoom in/out step
pub const DEFAULT_ZOOM_SPEED: f32 = 0.25;

/// Minimum zoom level
pub const DEFAULT_MIN_ZOOM: f32 = 0.5;

/// Maximum zoom level
pub const DEFAULT_MAX_ZOOM: f32 = 8.0;

/// Zoom level on open and reset
pub const DEFAULT_INITIAL_ZOOM: f32 = 1.0;

/// Fraction of the container's smaller side that stays visible when panning
pub const PAN_MARGIN_FRACTION: f32 = 0.1;

/// Soft-tissue window center (HU)
pub const DEFAULT_WINDOW_CENTER: f64 = 40.0;

/// Soft-tissue window width (HU)
pub const DEFAULT_WINDOW_WIDTH: f64 = 400.0;

/// Window center range accepted by the window/level controls
pub const WINDOW_CENTER_RANGE: (f64, f64) = (-1000.0, 3000.0);

/// Window width range accepted by the window/level controls
pub const WINDOW_WIDTH_RANGE: (f64, f64) = (1.0, 4000.0);

/// Slices skipped by PageUp/PageDown
pub const PAGE_STEP: i64 = 10;

/// Default slice endpoint base URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Plain slice endpoint
pub const SLICE_ENDPOINT: &str = "/api/viewer/get_slice";

/// Slice endpoint with ROI overlay
pub const COMBINED_VIEW_ENDPOINT: &str = "/api/viewer/get_combined_view";

/// Volume descriptor endpoint
pub const METADATA_ENDPOINT: &str = "/api/viewer/get_metadata";
