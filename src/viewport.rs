//! Zoom and pan controller for the slice viewport.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_INITIAL_ZOOM, DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM, DEFAULT_ZOOM_SPEED,
    PAN_MARGIN_FRACTION,
};
use crate::input::{Point, Size};
use crate::zoom_math::Transform;

/// Zoom limits and step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportOptions {
    /// Zoom change per step
    #[serde(default = "default_zoom_speed")]
    pub zoom_speed: f32,
    #[serde(default = "default_min_zoom")]
    pub min_zoom: f32,
    #[serde(default = "default_max_zoom")]
    pub max_zoom: f32,
    /// Zoom level on open and after a reset
    #[serde(default = "default_initial_zoom")]
    pub initial_zoom: f32,
}

fn default_zoom_speed() -> f32 {
    DEFAULT_ZOOM_SPEED
}

fn default_min_zoom() -> f32 {
    DEFAULT_MIN_ZOOM
}

fn default_max_zoom() -> f32 {
    DEFAULT_MAX_ZOOM
}

fn default_initial_zoom() -> f32 {
    DEFAULT_INITIAL_ZOOM
}

impl Default for ViewportOptions {
    fn default() -> Self {
        Self {
            zoom_speed: default_zoom_speed(),
            min_zoom: default_min_zoom(),
            max_zoom: default_max_zoom(),
            initial_zoom: default_initial_zoom(),
        }
    }
}

impl ViewportOptions {
    /// Ensure `0 < min_zoom <= max_zoom`.
    fn normalized(mut self) -> Self {
        if self.min_zoom.is_nan() || self.min_zoom <= 0.0 {
            self.min_zoom = DEFAULT_MIN_ZOOM;
        }
        if self.max_zoom.is_nan() || self.max_zoom < self.min_zoom {
            self.max_zoom = self.min_zoom;
        }
        self
    }

    fn clamp_zoom(&self, zoom: f32) -> f32 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }
}

/// Pan drag state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum PanDragState {
    /// Not dragging
    #[default]
    Idle,
    /// Dragging with the last pointer position
    Dragging { last_pos: Point },
}

impl PanDragState {
    pub fn is_dragging(&self) -> bool {
        matches!(self, PanDragState::Dragging { .. })
    }
}

/// Pointer cursor the viewport wants shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorIcon {
    Default,
    Grab,
    Grabbing,
}

/// Viewport state: zoom, pan, drag and the last known container size.
///
/// Invariants:
/// - zoom always lies in `[min_zoom, max_zoom]`
/// - with a known container, pan is re-clamped after every zoom change and
///   drag step so that at least `0.1 * min(width, height)` of the scaled
///   slice stays in view
#[derive(Debug, Clone)]
pub struct Viewport {
    options: ViewportOptions,
    transform: Transform,
    drag: PanDragState,
    container: Option<Size>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(ViewportOptions::default())
    }
}

impl Viewport {
    pub fn new(options: ViewportOptions) -> Self {
        let options = options.normalized();
        let zoom = options.clamp_zoom(options.initial_zoom);
        Self {
            options,
            transform: Transform::new(zoom, 0.0, 0.0),
            drag: PanDragState::Idle,
            container: None,
        }
    }

    pub fn options(&self) -> &ViewportOptions {
        &self.options
    }

    pub fn zoom(&self) -> f32 {
        self.transform.zoom
    }

    pub fn pan(&self) -> Point {
        Point::new(self.transform.pan_x, self.transform.pan_y)
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn container(&self) -> Option<Size> {
        self.container
    }

    pub fn drag_state(&self) -> PanDragState {
        self.drag
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    /// Record the container size (e.g. after layout or a resize).
    pub fn set_container_size(&mut self, size: Size) {
        self.container = Some(size);
        self.clamp_pan();
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.transform.zoom + self.options.zoom_speed);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.transform.zoom - self.options.zoom_speed);
    }

    fn set_zoom(&mut self, zoom: f32) {
        self.transform.zoom = self.options.clamp_zoom(zoom);
        self.clamp_pan();
    }

    /// Zoom one step toward the cursor.
    ///
    /// `cursor` is relative to the container's top-left corner. Negative
    /// `delta` zooms in, positive zooms out, zero does nothing.
    pub fn wheel_zoom(&mut self, cursor: Point, delta: f32) {
        let step = if delta < 0.0 {
            self.options.zoom_speed
        } else if delta > 0.0 {
            -self.options.zoom_speed
        } else {
            return;
        };

        let new_zoom = self.options.clamp_zoom(self.transform.zoom + step);
        if new_zoom == self.transform.zoom {
            return;
        }

        let Some(container) = self.container else {
            self.transform.zoom = new_zoom;
            return;
        };

        let center = container.center();
        let anchor = Point::new(cursor.x - center.x, cursor.y - center.y);
        self.transform = self.transform.zoom_at(new_zoom, anchor);
        self.clamp_pan();
    }

    /// Start panning. Only possible while zoomed in.
    pub fn begin_drag(&mut self, pos: Point) -> bool {
        if self.transform.zoom <= 1.0 {
            return false;
        }
        self.drag = PanDragState::Dragging { last_pos: pos };
        true
    }

    /// Move the pan by the pointer delta since the last drag event.
    pub fn update_drag(&mut self, pos: Point) -> bool {
        let PanDragState::Dragging { last_pos } = self.drag else {
            return false;
        };
        self.transform = self.transform.pan_by(pos.x - last_pos.x, pos.y - last_pos.y);
        self.drag = PanDragState::Dragging { last_pos: pos };
        self.clamp_pan();
        true
    }

    pub fn end_drag(&mut self) {
        self.drag = PanDragState::Idle;
    }

    pub fn pointer_leave(&mut self) {
        self.end_drag();
    }

    /// Back to the initial zoom with no pan.
    pub fn reset_zoom(&mut self) {
        self.transform = Transform::new(
            self.options.clamp_zoom(self.options.initial_zoom),
            0.0,
            0.0,
        );
    }

    /// Full reset for a new plane or image.
    pub fn reset(&mut self) {
        self.reset_zoom();
        self.end_drag();
    }

    /// Screen position (center-relative) of a content point.
    pub fn project(&self, content: Point) -> Point {
        self.transform.project(content)
    }

    /// Content point under a screen position (center-relative).
    pub fn unproject(&self, screen: Point) -> Point {
        self.transform.unproject(screen)
    }

    pub fn zoom_percent_label(&self) -> String {
        format!("{}%", (self.transform.zoom * 100.0).round() as i64)
    }

    pub fn cursor_icon(&self) -> CursorIcon {
        if self.drag.is_dragging() {
            CursorIcon::Grabbing
        } else if self.transform.zoom > 1.0 {
            CursorIcon::Grab
        } else {
            CursorIcon::Default
        }
    }

    fn clamp_pan(&mut self) {
        if let Some(container) = self.container {
            let margin = PAN_MARGIN_FRACTION * container.min_side();
            self.transform = self.transform.clamp_pan(container, margin);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zoom_math::max_pan;
    use proptest::prelude::*;

    const EPSILON: f32 = 0.001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn sized(width: f32, height: f32) -> Viewport {
        let mut viewport = Viewport::default();
        viewport.set_container_size(Size::new(width, height));
        viewport
    }

    #[test]
    fn test_three_zoom_steps() {
        let mut viewport = Viewport::default();
        viewport.zoom_in();
        viewport.zoom_in();
        viewport.zoom_in();
        assert!(approx_eq(viewport.zoom(), 1.75));
        assert_eq!(viewport.zoom_percent_label(), "175%");
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut viewport = Viewport::default();
        for _ in 0..100 {
            viewport.zoom_in();
        }
        assert_eq!(viewport.zoom(), DEFAULT_MAX_ZOOM);
        for _ in 0..100 {
            viewport.zoom_out();
        }
        assert_eq!(viewport.zoom(), DEFAULT_MIN_ZOOM);
    }

    #[test]
    fn test_wheel_zoom_keeps_point_under_cursor() {
        let mut viewport = sized(800.0, 600.0);
        viewport.zoom_in();
        viewport.zoom_in();

        let cursor = Point::new(500.0, 250.0);
        let rel = Point::new(100.0, -50.0);
        let before = viewport.unproject(rel);

        viewport.wheel_zoom(cursor, -1.0);

        assert!(approx_eq(viewport.zoom(), 1.75));
        let after = viewport.unproject(rel);
        assert!(approx_eq(before.x, after.x));
        assert!(approx_eq(before.y, after.y));
    }

    #[test]
    fn test_wheel_zoom_direction_and_zero_delta() {
        let mut viewport = sized(400.0, 400.0);
        viewport.wheel_zoom(Point::new(200.0, 200.0), 0.0);
        assert_eq!(viewport.zoom(), 1.0);
        viewport.wheel_zoom(Point::new(200.0, 200.0), 120.0);
        assert!(approx_eq(viewport.zoom(), 0.75));
        viewport.wheel_zoom(Point::new(200.0, 200.0), -3.0);
        assert!(approx_eq(viewport.zoom(), 1.0));
    }

    #[test]
    fn test_wheel_zoom_without_container_leaves_pan() {
        let mut viewport = Viewport::default();
        viewport.wheel_zoom(Point::new(10.0, 10.0), -1.0);
        assert!(approx_eq(viewport.zoom(), 1.25));
        assert_eq!(viewport.pan(), Point::ORIGIN);
    }

    #[test]
    fn test_drag_requires_zoom() {
        let mut viewport = sized(800.0, 600.0);
        assert!(!viewport.begin_drag(Point::new(10.0, 10.0)));
        assert!(!viewport.is_dragging());

        viewport.zoom_in();
        assert!(viewport.begin_drag(Point::new(10.0, 10.0)));
        assert_eq!(viewport.cursor_icon(), CursorIcon::Grabbing);
        assert!(viewport.update_drag(Point::new(30.0, 5.0)));
        assert_eq!(viewport.pan(), Point::new(20.0, -5.0));

        viewport.pointer_leave();
        assert!(!viewport.is_dragging());
        assert_eq!(viewport.cursor_icon(), CursorIcon::Grab);
        assert!(!viewport.update_drag(Point::new(100.0, 100.0)));
    }

    #[test]
    fn test_drag_pan_is_clamped() {
        let mut viewport = sized(800.0, 600.0);
        for _ in 0..4 {
            viewport.zoom_in();
        }
        viewport.begin_drag(Point::ORIGIN);
        viewport.update_drag(Point::new(10_000.0, -10_000.0));

        let margin = 60.0;
        assert!(approx_eq(viewport.pan().x, max_pan(800.0, 2.0, margin)));
        assert!(approx_eq(viewport.pan().y, -max_pan(600.0, 2.0, margin)));
    }

    #[test]
    fn test_zoom_out_reclamps_pan() {
        let mut viewport = sized(800.0, 600.0);
        for _ in 0..4 {
            viewport.zoom_in();
        }
        viewport.begin_drag(Point::ORIGIN);
        viewport.update_drag(Point::new(400.0, 0.0));
        viewport.end_drag();

        for _ in 0..4 {
            viewport.zoom_out();
        }
        // At zoom 1 only the margin is left.
        assert!(approx_eq(viewport.pan().x, 60.0));
    }

    #[test]
    fn test_reset() {
        let mut viewport = sized(800.0, 600.0);
        viewport.wheel_zoom(Point::new(700.0, 100.0), -1.0);
        viewport.begin_drag(Point::ORIGIN);
        viewport.reset();

        assert_eq!(viewport.zoom(), 1.0);
        assert_eq!(viewport.pan(), Point::ORIGIN);
        assert!(!viewport.is_dragging());
        assert_eq!(viewport.cursor_icon(), CursorIcon::Default);
    }

    #[test]
    fn test_initial_zoom_is_clamped() {
        let viewport = Viewport::new(ViewportOptions {
            initial_zoom: 20.0,
            ..ViewportOptions::default()
        });
        assert_eq!(viewport.zoom(), DEFAULT_MAX_ZOOM);
    }

    #[derive(Debug, Clone)]
    enum Op {
        ZoomIn,
        ZoomOut,
        Wheel(f32, f32, f32),
        Drag(f32, f32),
        Resize(f32, f32),
        Reset,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::ZoomIn),
            Just(Op::ZoomOut),
            (0.0f32..1000.0, 0.0f32..1000.0, -10.0f32..10.0).prop_map(|(x, y, d)| Op::Wheel(x, y, d)),
            (-2000.0f32..2000.0, -2000.0f32..2000.0).prop_map(|(x, y)| Op::Drag(x, y)),
            (1.0f32..2000.0, 1.0f32..2000.0).prop_map(|(w, h)| Op::Resize(w, h)),
            Just(Op::Reset),
        ]
    }

    proptest! {
        #[test]
        fn prop_zoom_and_pan_stay_bounded(ops in prop::collection::vec(op(), 0..60)) {
            let mut viewport = sized(800.0, 600.0);
            for op in ops {
                match op {
                    Op::ZoomIn => viewport.zoom_in(),
                    Op::ZoomOut => viewport.zoom_out(),
                    Op::Wheel(x, y, d) => viewport.wheel_zoom(Point::new(x, y), d),
                    Op::Drag(x, y) => {
                        viewport.begin_drag(Point::ORIGIN);
                        viewport.update_drag(Point::new(x, y));
                        viewport.end_drag();
                    }
                    Op::Resize(w, h) => viewport.set_container_size(Size::new(w, h)),
                    Op::Reset => viewport.reset(),
                }

                let zoom = viewport.zoom();
                prop_assert!((DEFAULT_MIN_ZOOM..=DEFAULT_MAX_ZOOM).contains(&zoom));

                let container = viewport.container().unwrap();
                let margin = PAN_MARGIN_FRACTION * container.min_side();
                let pan = viewport.pan();
                prop_assert!(pan.x.abs() <= max_pan(container.width, zoom, margin) + 0.01);
                prop_assert!(pan.y.abs() <= max_pan(container.height, zoom, margin) + 0.01);
            }
        }
    }
}
