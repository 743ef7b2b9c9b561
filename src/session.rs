//! A viewer session ties together the slice cache, navigation, viewport,
//! playback and keyboard shortcuts for one viewer instance.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use voxview_cache::{CacheError, SliceCache, SliceSource};

use crate::config::ViewerConfig;
use crate::input::{FocusTarget, KeyEvent};
use crate::keybindings::{HelpEntry, ShortcutDispatcher, default_viewer_shortcuts};
use crate::message::ViewerAction;
use crate::navigation::{Navigator, Plane, VolumeInfo, WindowSettings};
use crate::playback::{PlaybackController, PlaybackSpeed};
use crate::preload::{SliceLoad, SlicePreloader};
use crate::request::SliceRequest;
use crate::viewport::Viewport;

/// Errors from loading the displayed slice.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("No volume loaded")]
    NoVolume,

    #[error(transparent)]
    Load(#[from] CacheError),
}

/// What a handled key press did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyOutcome {
    pub action: ViewerAction,
    pub prevent_default: bool,
}

/// One viewer instance.
///
/// The session owns its cache for its whole life and clears it on
/// [`ViewerSession::close`] and on drop. Navigation and viewport state are
/// recreated for every opened volume.
///
/// Playback and preloading spawn local tasks, so sessions must be driven from
/// inside a `tokio::task::LocalSet`.
pub struct ViewerSession<S: SliceSource> {
    cache: SliceCache<S>,
    preload_count: usize,
    navigator: Rc<RefCell<Navigator>>,
    viewport: Viewport,
    playback: PlaybackController,
    shortcuts: ShortcutDispatcher<ViewerAction>,
    preloader: Option<SlicePreloader<S>>,
    /// Visible ROI ids for the combined view, if it is shown
    overlay: Option<Vec<u32>>,
    overlay_preloader: Option<SlicePreloader<S>>,
    help_visible: bool,
    shown_revision: Option<u64>,
}

impl<S: SliceSource> ViewerSession<S> {
    pub fn new(source: S, config: &ViewerConfig) -> Self {
        Self::with_cache(SliceCache::new(source, config.cache.max_size), config)
    }

    /// Build a session around an existing cache.
    pub fn with_cache(cache: SliceCache<S>, config: &ViewerConfig) -> Self {
        let mut playback = PlaybackController::new(config.playback_speed);
        playback.set_enabled(false);

        Self {
            cache,
            preload_count: config.cache.preload_count,
            navigator: Rc::new(RefCell::new(Navigator::new())),
            viewport: Viewport::new(config.viewport),
            playback,
            shortcuts: default_viewer_shortcuts(),
            preloader: None,
            overlay: None,
            overlay_preloader: None,
            help_visible: false,
            shown_revision: None,
        }
    }

    pub fn cache(&self) -> &SliceCache<S> {
        &self.cache
    }

    pub fn navigation(&self) -> Ref<'_, Navigator> {
        self.navigator.borrow()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    pub fn shortcuts_mut(&mut self) -> &mut ShortcutDispatcher<ViewerAction> {
        &mut self.shortcuts
    }

    pub fn is_help_visible(&self) -> bool {
        self.help_visible
    }

    pub fn help_entries(&self) -> Vec<HelpEntry> {
        self.shortcuts.help_entries()
    }

    /// Start viewing a new volume.
    pub fn open_volume(&mut self, info: VolumeInfo) {
        self.playback.stop();
        self.drop_preloaders();

        let mut navigator = Navigator::new();
        navigator.load_volume(info);
        self.navigator = Rc::new(RefCell::new(navigator));

        let container = self.viewport.container();
        self.viewport = Viewport::new(*self.viewport.options());
        if let Some(size) = container {
            self.viewport.set_container_size(size);
        }

        self.playback.set_enabled(true);
        self.shown_revision = None;
        log::info!("Opened volume with shape {:?}", info.shape.0);
    }

    /// Stop playback, forget the volume and empty the cache.
    pub fn close(&mut self) {
        self.playback.set_enabled(false);
        self.drop_preloaders();
        self.cache.clear();
        self.navigator = Rc::new(RefCell::new(Navigator::new()));
        self.shown_revision = None;
    }

    fn drop_preloaders(&mut self) {
        self.preloader = None;
        self.overlay_preloader = None;
    }

    /// Switch planes. Stops playback and resets zoom and pan.
    pub fn set_active_plane(&mut self, plane: Plane) {
        if plane != self.navigator.borrow().active_plane() {
            self.playback.stop();
            self.viewport.reset();
        }
        self.navigator.borrow_mut().set_active_plane(plane);
    }

    /// Set window/level from the controls, limited to their ranges.
    pub fn set_window(&mut self, window: WindowSettings) {
        self.navigator
            .borrow_mut()
            .set_window_settings(window.clamped());
    }

    /// Show the combined view with the given ROIs, or hide it with `None`.
    pub fn set_visible_rois(&mut self, rois: Option<Vec<u32>>) {
        if rois.is_none() {
            self.overlay_preloader = None;
        }
        self.overlay = rois;
    }

    /// Translate and apply a key press.
    pub fn handle_key(&mut self, event: &KeyEvent, focus: FocusTarget) -> Option<KeyOutcome> {
        let outcome = self
            .shortcuts
            .dispatch(event, focus)
            .map(|dispatched| KeyOutcome {
                action: *dispatched.action,
                prevent_default: dispatched.prevent_default,
            })?;
        self.apply(outcome.action);
        Some(outcome)
    }

    /// Apply `action`. Returns whether the shown slice may now be stale.
    pub fn apply(&mut self, action: ViewerAction) -> bool {
        log::debug!("Applying {:?}", action);
        let stale = action.changes_slice();
        match action {
            ViewerAction::StepSlice(delta) => {
                self.navigator.borrow_mut().step_slice(delta);
            }
            ViewerAction::FirstSlice => {
                self.navigator.borrow_mut().first_slice();
            }
            ViewerAction::LastSlice => {
                self.navigator.borrow_mut().last_slice();
            }
            ViewerAction::GoToSlice(index) => {
                let mut navigator = self.navigator.borrow_mut();
                let plane = navigator.active_plane();
                navigator.set_slice_index(plane, index);
            }
            ViewerAction::SelectPlane(plane) => self.set_active_plane(plane),
            ViewerAction::SetWindow(window) => self.set_window(window),
            ViewerAction::ResetWindow => self.navigator.borrow_mut().reset_window_settings(),
            ViewerAction::ToggleHelp => self.help_visible = !self.help_visible,
            ViewerAction::TogglePlayback => {
                self.playback.toggle(&self.navigator);
            }
            ViewerAction::SetPlaybackSpeed(speed) => self.set_playback_speed(speed),
            ViewerAction::ZoomIn => self.viewport.zoom_in(),
            ViewerAction::ZoomOut => self.viewport.zoom_out(),
            ViewerAction::ResetZoom => self.viewport.reset_zoom(),
        }
        stale
    }

    pub fn set_playback_speed(&mut self, speed: PlaybackSpeed) {
        self.playback.set_speed(speed);
    }

    /// Request template for the plain slice view.
    pub fn current_request(&self) -> SliceRequest {
        let navigator = self.navigator.borrow();
        SliceRequest::new(navigator.active_plane(), navigator.window())
    }

    /// Request template for the combined view, if shown.
    pub fn overlay_request(&self) -> Option<SliceRequest> {
        let rois = self.overlay.clone()?;
        Some(self.current_request().with_overlay(rois))
    }

    /// Load the current slice of the active plane.
    pub async fn show_current(&mut self) -> Result<SliceLoad, SessionError> {
        let (index, max_index, revision) = self.position()?;
        let request = self.current_request();

        let preloader = rebind(&mut self.preloader, &self.cache, request, self.preload_count);
        let load = preloader.load(index, max_index).await?;
        self.shown_revision = Some(revision);
        Ok(load)
    }

    /// Load the current slice of the combined view. `Ok(None)` when hidden.
    pub async fn show_overlay(&mut self) -> Result<Option<SliceLoad>, SessionError> {
        let (index, max_index, _) = self.position()?;
        let Some(request) = self.overlay_request() else {
            return Ok(None);
        };

        let preloader = rebind(
            &mut self.overlay_preloader,
            &self.cache,
            request,
            self.preload_count,
        );
        Ok(Some(preloader.load(index, max_index).await?))
    }

    /// Load the current slice only if navigation changed since the last
    /// [`ViewerSession::show_current`].
    pub async fn sync_display(&mut self) -> Option<Result<SliceLoad, SessionError>> {
        let revision = self.navigator.borrow().revision();
        if self.shown_revision == Some(revision) {
            return None;
        }
        Some(self.show_current().await)
    }

    /// Whether the latest load of the plain view is still waiting.
    pub fn is_loading(&self) -> bool {
        self.preloader
            .as_ref()
            .is_some_and(|preloader| preloader.is_loading())
    }

    /// Error of the latest load of the plain view.
    pub fn last_error(&self) -> Option<CacheError> {
        self.preloader
            .as_ref()
            .and_then(|preloader| preloader.last_error())
    }

    fn position(&self) -> Result<(usize, usize, u64), SessionError> {
        let navigator = self.navigator.borrow();
        if !navigator.has_volume() {
            return Err(SessionError::NoVolume);
        }
        let plane = navigator.active_plane();
        Ok((
            navigator.slice_index(plane),
            navigator.max_slice_index(plane),
            navigator.revision(),
        ))
    }
}

/// Reuse the preloader if it serves `request`, otherwise replace it.
fn rebind<'a, S: SliceSource>(
    slot: &'a mut Option<SlicePreloader<S>>,
    cache: &SliceCache<S>,
    request: SliceRequest,
    preload_count: usize,
) -> &'a SlicePreloader<S> {
    if slot
        .as_ref()
        .is_some_and(|preloader| *preloader.request() != request)
    {
        *slot = None;
    }
    slot.get_or_insert_with(|| SlicePreloader::new(cache.clone(), request, preload_count))
}

impl<S: SliceSource> Drop for ViewerSession<S> {
    fn drop(&mut self) {
        self.close();
    }
}
