//! Viewer actions.
//!
//! Keyboard shortcuts and UI controls are translated into actions, which the
//! session applies to navigation, viewport and playback state.

use crate::navigation::{Plane, WindowSettings};
use crate::playback::PlaybackSpeed;

/// Something the user asked the viewer to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewerAction {
    /// Move the active plane by a number of slices
    StepSlice(i64),
    /// Jump to slice 0
    FirstSlice,
    /// Jump to the last slice
    LastSlice,
    /// Jump to a specific slice of the active plane
    GoToSlice(i64),
    /// Switch the active plane
    SelectPlane(Plane),
    /// Set window/level
    SetWindow(WindowSettings),
    /// Restore the default window/level preset
    ResetWindow,
    /// Show or hide the shortcut help
    ToggleHelp,
    /// Start or stop automatic playback
    TogglePlayback,
    /// Change the playback frame delay
    SetPlaybackSpeed(PlaybackSpeed),
    ZoomIn,
    ZoomOut,
    /// Back to the initial zoom without pan
    ResetZoom,
}

impl ViewerAction {
    /// Whether applying the action can change which slice is shown.
    pub fn changes_slice(&self) -> bool {
        matches!(
            self,
            ViewerAction::StepSlice(_)
                | ViewerAction::FirstSlice
                | ViewerAction::LastSlice
                | ViewerAction::GoToSlice(_)
                | ViewerAction::SelectPlane(_)
                | ViewerAction::SetWindow(_)
                | ViewerAction::ResetWindow
        )
    }
}
