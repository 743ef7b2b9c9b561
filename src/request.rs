//! Slice request keys.
//!
//! A request key is the path and query of one slice image on the viewer API.
//! It doubles as the cache key, so two requests for the same view of the same
//! slice always map to the same entry.

use crate::constants::{COMBINED_VIEW_ENDPOINT, SLICE_ENDPOINT};
use crate::navigation::{Plane, WindowSettings};

/// Everything that identifies a slice image except the slice index.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceRequest {
    plane: Plane,
    window: WindowSettings,
    /// Visible ROI ids; `Some` selects the combined view endpoint
    overlay: Option<Vec<u32>>,
}

impl SliceRequest {
    pub fn new(plane: Plane, window: WindowSettings) -> Self {
        Self {
            plane,
            window,
            overlay: None,
        }
    }

    /// Request the slice with the given ROIs drawn on top.
    pub fn with_overlay(mut self, visible_rois: Vec<u32>) -> Self {
        self.overlay = Some(visible_rois);
        self
    }

    pub fn plane(&self) -> Plane {
        self.plane
    }

    pub fn window(&self) -> WindowSettings {
        self.window
    }

    pub fn endpoint(&self) -> &'static str {
        if self.overlay.is_some() {
            COMBINED_VIEW_ENDPOINT
        } else {
            SLICE_ENDPOINT
        }
    }

    /// `{endpoint}?view=..&window_center=..&window_width=..[&visible_rois=..]`
    pub fn base_key(&self) -> String {
        let mut key = format!(
            "{}?view={}&window_center={}&window_width={}",
            self.endpoint(),
            self.plane,
            self.window.center,
            self.window.width
        );

        if let Some(rois) = self.overlay.as_deref().filter(|rois| !rois.is_empty()) {
            let ids: Vec<String> = rois.iter().map(u32::to_string).collect();
            key.push_str("&visible_rois=");
            key.push_str(&ids.join(","));
        }
        key
    }

    /// Request key for one slice.
    pub fn key_for(&self, index: usize) -> String {
        format!("{}&slice_index={}", self.base_key(), index)
    }
}
