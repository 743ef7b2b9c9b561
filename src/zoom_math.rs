//! Zoom-to-cursor mathematics.
//!
//! All coordinates are relative to the container center. A content point `p`
//! is drawn at `p * zoom + pan`.

use crate::input::{Point, Size};

/// Pan/zoom transform of the rendered slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub zoom: f32,
    pub pan_x: f32,
    pub pan_y: f32,
}

impl Transform {
    pub fn new(zoom: f32, pan_x: f32, pan_y: f32) -> Self {
        Self { zoom, pan_x, pan_y }
    }

    /// Identity transform (zoom=1, no pan).
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }

    /// Change zoom while keeping the content point under `cursor` fixed.
    ///
    /// With `scale = new_zoom / zoom`, the new pan is
    /// `cursor - (cursor - pan) * scale`.
    pub fn zoom_at(&self, new_zoom: f32, cursor: Point) -> Transform {
        let scale = new_zoom / self.zoom;
        Transform {
            zoom: new_zoom,
            pan_x: cursor.x - (cursor.x - self.pan_x) * scale,
            pan_y: cursor.y - (cursor.y - self.pan_y) * scale,
        }
    }

    /// Apply a pan delta to the transform.
    pub fn pan_by(&self, dx: f32, dy: f32) -> Transform {
        Transform {
            zoom: self.zoom,
            pan_x: self.pan_x + dx,
            pan_y: self.pan_y + dy,
        }
    }

    /// Screen position of a content point.
    pub fn project(&self, content: Point) -> Point {
        Point::new(
            content.x * self.zoom + self.pan_x,
            content.y * self.zoom + self.pan_y,
        )
    }

    /// Content point drawn at a screen position.
    pub fn unproject(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.pan_x) / self.zoom,
            (screen.y - self.pan_y) / self.zoom,
        )
    }

    /// Limit pan so that at least `margin` of the scaled content stays in view.
    pub fn clamp_pan(&self, container: Size, margin: f32) -> Transform {
        let max_x = max_pan(container.width, self.zoom, margin);
        let max_y = max_pan(container.height, self.zoom, margin);
        Transform {
            zoom: self.zoom,
            pan_x: self.pan_x.clamp(-max_x, max_x),
            pan_y: self.pan_y.clamp(-max_y, max_y),
        }
    }
}

/// Largest pan offset along one axis of length `axis`.
pub fn max_pan(axis: f32, zoom: f32, margin: f32) -> f32 {
    (axis * (zoom - 1.0) / 2.0).max(0.0) + margin
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.0001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_identity_transform() {
        let t = Transform::identity();
        assert_eq!(t.zoom, 1.0);
        assert_eq!(t.pan_x, 0.0);
        assert_eq!(t.pan_y, 0.0);
    }

    #[test]
    fn test_zoom_at_center_keeps_pan() {
        let t = Transform::identity();
        let new_t = t.zoom_at(2.0, Point::ORIGIN);

        assert_eq!(new_t.zoom, 2.0);
        assert!(approx_eq(new_t.pan_x, 0.0));
        assert!(approx_eq(new_t.pan_y, 0.0));
    }

    #[test]
    fn test_zoom_at_preserves_cursor_point() {
        let t = Transform::new(1.5, 50.0, 30.0);
        let cursor = Point::new(50.0, -20.0);

        let before = t.unproject(cursor);
        let new_t = t.zoom_at(3.25, cursor);
        let after = new_t.unproject(cursor);

        assert!(approx_eq(before.x, after.x));
        assert!(approx_eq(before.y, after.y));
    }

    #[test]
    fn test_project_unproject_inverse() {
        let t = Transform::new(2.0, 10.0, -5.0);
        let p = Point::new(3.0, 4.0);
        let screen = t.project(p);
        assert_eq!(screen, Point::new(16.0, 3.0));
        assert_eq!(t.unproject(screen), p);
    }

    #[test]
    fn test_pan_by() {
        let t = Transform::new(1.0, 10.0, 20.0);
        let new_t = t.pan_by(5.0, -10.0);

        assert_eq!(new_t.zoom, 1.0);
        assert_eq!(new_t.pan_x, 15.0);
        assert_eq!(new_t.pan_y, 10.0);
    }

    #[test]
    fn test_max_pan() {
        // 800px axis at zoom 2: half the overflow (400) plus margin.
        assert!(approx_eq(max_pan(800.0, 2.0, 60.0), 460.0));
        // Below zoom 1 only the margin remains.
        assert!(approx_eq(max_pan(800.0, 0.5, 60.0), 60.0));
    }

    #[test]
    fn test_clamp_pan() {
        let container = Size::new(800.0, 600.0);
        let t = Transform::new(2.0, 1000.0, -1000.0).clamp_pan(container, 60.0);
        assert!(approx_eq(t.pan_x, 460.0));
        assert!(approx_eq(t.pan_y, -360.0));
    }
}
