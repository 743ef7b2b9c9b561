//! Slice navigation state: active plane, per-plane slice index, window/level.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_WINDOW_CENTER, DEFAULT_WINDOW_WIDTH, WINDOW_CENTER_RANGE, WINDOW_WIDTH_RANGE,
};

/// Anatomical viewing plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plane {
    #[default]
    Axial,
    Coronal,
    Sagittal,
}

impl Plane {
    pub const ALL: [Plane; 3] = [Plane::Axial, Plane::Coronal, Plane::Sagittal];

    /// Index into the volume shape.
    pub fn axis(&self) -> usize {
        match self {
            Plane::Axial => 0,
            Plane::Coronal => 1,
            Plane::Sagittal => 2,
        }
    }

    /// Name used in request URLs.
    pub fn name(&self) -> &'static str {
        match self {
            Plane::Axial => "axial",
            Plane::Coronal => "coronal",
            Plane::Sagittal => "sagittal",
        }
    }

    /// Display name.
    pub fn label(&self) -> &'static str {
        match self {
            Plane::Axial => "Axial",
            Plane::Coronal => "Coronal",
            Plane::Sagittal => "Sagittal",
        }
    }
}

impl fmt::Display for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown plane: {0:?} (expected axial, coronal or sagittal)")]
pub struct UnknownPlane(pub String);

impl FromStr for Plane {
    type Err = UnknownPlane;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Plane::ALL
            .into_iter()
            .find(|plane| plane.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownPlane(s.to_string()))
    }
}

/// Window/level used to map intensities to grey values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowSettings {
    pub center: f64,
    pub width: f64,
}

impl WindowSettings {
    pub fn new(center: f64, width: f64) -> Self {
        Self { center, width }
    }

    /// Clamp to the ranges offered by the window/level controls.
    pub fn clamped(&self) -> Self {
        Self {
            center: self.center.clamp(WINDOW_CENTER_RANGE.0, WINDOW_CENTER_RANGE.1),
            width: self.width.clamp(WINDOW_WIDTH_RANGE.0, WINDOW_WIDTH_RANGE.1),
        }
    }
}

impl Default for WindowSettings {
    /// Soft-tissue preset.
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CENTER, DEFAULT_WINDOW_WIDTH)
    }
}

/// Number of slices along each plane's axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeShape(pub [usize; 3]);

impl VolumeShape {
    pub fn new(axial: usize, coronal: usize, sagittal: usize) -> Self {
        Self([axial, coronal, sagittal])
    }

    pub fn count(&self, plane: Plane) -> usize {
        self.0[plane.axis()]
    }

    /// Highest valid slice index for a plane (0 for an empty axis).
    pub fn max_index(&self, plane: Plane) -> usize {
        self.count(plane).saturating_sub(1)
    }
}

/// Errors raised while reading a volume descriptor.
#[derive(Debug, thiserror::Error)]
pub enum VolumeInfoError {
    #[error("Failed to parse volume descriptor: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Volume descriptor received once per loaded volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeInfo {
    pub shape: VolumeShape,
    /// Window/level suggested by the volume metadata
    pub window: Option<WindowSettings>,
}

#[derive(Deserialize)]
struct RawVolumeInfo {
    dicom_shape: [usize; 3],
    #[serde(default)]
    dicom_metadata: Option<RawMetadata>,
}

#[derive(Deserialize)]
struct RawMetadata {
    #[serde(rename = "WindowCenter", default)]
    window_center: Option<MetaValue>,
    #[serde(rename = "WindowWidth", default)]
    window_width: Option<MetaValue>,
}

/// DICOM values arrive as numbers, numeric strings or multi-valued lists.
#[derive(Deserialize)]
#[serde(untagged)]
enum MetaValue {
    Number(f64),
    Text(String),
    Many(Vec<MetaValue>),
}

impl MetaValue {
    fn as_f64(&self) -> Option<f64> {
        match self {
            MetaValue::Number(n) => Some(*n),
            MetaValue::Text(s) => s.trim().parse().ok(),
            MetaValue::Many(values) => values.first().and_then(MetaValue::as_f64),
        }
    }
}

impl VolumeInfo {
    pub fn new(shape: VolumeShape) -> Self {
        Self {
            shape,
            window: None,
        }
    }

    /// Parse `{"dicom_shape": [a, c, s], "dicom_metadata": {...}}`.
    ///
    /// The window override is only taken when both `WindowCenter` and
    /// `WindowWidth` are present and numeric.
    pub fn from_json(json: &str) -> Result<Self, VolumeInfoError> {
        let raw: RawVolumeInfo = serde_json::from_str(json)?;
        let window = raw.dicom_metadata.and_then(|meta| {
            let center = meta.window_center?.as_f64()?;
            let width = meta.window_width?.as_f64()?;
            Some(WindowSettings::new(center, width))
        });
        Ok(Self {
            shape: VolumeShape(raw.dicom_shape),
            window,
        })
    }
}

/// Navigation state machine.
///
/// Every plane's slice index stays within `[0, max_slice_index(plane)]`,
/// including right after a shape change. Planes that were never visited have
/// no stored index and resolve to the middle slice.
#[derive(Debug, Clone, Default)]
pub struct Navigator {
    active: Plane,
    indices: [Option<usize>; 3],
    shape: Option<VolumeShape>,
    window: WindowSettings,
    /// Bumped on every state change
    revision: u64,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_plane(&self) -> Plane {
        self.active
    }

    pub fn shape(&self) -> Option<VolumeShape> {
        self.shape
    }

    pub fn has_volume(&self) -> bool {
        self.shape.is_some()
    }

    pub fn window(&self) -> WindowSettings {
        self.window
    }

    /// Counter that changes whenever the displayed slice might change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn max_slice_index(&self, plane: Plane) -> usize {
        self.shape.map_or(0, |shape| shape.max_index(plane))
    }

    /// Current slice index of `plane`.
    pub fn slice_index(&self, plane: Plane) -> usize {
        let max = self.max_slice_index(plane);
        self.indices[plane.axis()].unwrap_or(max / 2).min(max)
    }

    pub fn current_slice(&self) -> usize {
        self.slice_index(self.active)
    }

    /// Whether `plane` has an explicitly stored index.
    pub fn is_index_set(&self, plane: Plane) -> bool {
        self.indices[plane.axis()].is_some()
    }

    pub fn set_active_plane(&mut self, plane: Plane) {
        if self.has_volume() && self.indices[plane.axis()].is_none() {
            self.indices[plane.axis()] = Some(self.max_slice_index(plane) / 2);
        }
        if plane != self.active {
            log::debug!("Active plane: {} -> {}", self.active, plane);
            self.active = plane;
        }
        self.bump();
    }

    /// Set a slice index, clamped to the plane's range. Returns the stored index.
    pub fn set_slice_index(&mut self, plane: Plane, index: i64) -> usize {
        let max = self.max_slice_index(plane);
        let clamped = index.clamp(0, max as i64) as usize;
        self.indices[plane.axis()] = Some(clamped);
        self.bump();
        clamped
    }

    /// Move the active plane's index by `delta` slices.
    pub fn step_slice(&mut self, delta: i64) -> usize {
        let current = self.current_slice() as i64;
        self.set_slice_index(self.active, current.saturating_add(delta))
    }

    pub fn first_slice(&mut self) -> usize {
        self.set_slice_index(self.active, 0)
    }

    pub fn last_slice(&mut self) -> usize {
        let max = self.max_slice_index(self.active);
        self.set_slice_index(self.active, max as i64)
    }

    /// Stored as given; range limits belong to the input controls.
    pub fn set_window_settings(&mut self, window: WindowSettings) {
        self.window = window;
        self.bump();
    }

    pub fn reset_window_settings(&mut self) {
        self.set_window_settings(WindowSettings::default());
    }

    /// Recompute maxima for a new volume shape.
    ///
    /// Indices above their new maximum are re-centered. The active plane of a
    /// volume without a stored index starts at the middle slice.
    pub fn on_volume_shape_changed(&mut self, shape: VolumeShape) {
        self.shape = Some(shape);

        for plane in Plane::ALL {
            let max = shape.max_index(plane);
            match self.indices[plane.axis()] {
                Some(index) if index > max => {
                    log::debug!(
                        "{} index {} out of range after shape change, re-centering to {}",
                        plane,
                        index,
                        max / 2
                    );
                    self.indices[plane.axis()] = Some(max / 2);
                }
                _ => {}
            }
        }

        let active = self.active.axis();
        if self.indices[active].is_none() {
            let max = shape.max_index(self.active);
            self.indices[active] = Some((shape.count(self.active) / 2).min(max));
        }

        log::info!(
            "Volume shape {:?}, {} slice {}",
            shape.0,
            self.active,
            self.current_slice()
        );
        self.bump();
    }

    /// Apply a freshly loaded volume descriptor.
    pub fn load_volume(&mut self, info: VolumeInfo) {
        self.on_volume_shape_changed(info.shape);
        if let Some(window) = info.window {
            self.set_window_settings(window);
        }
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn loaded(shape: [usize; 3]) -> Navigator {
        let mut nav = Navigator::new();
        nav.on_volume_shape_changed(VolumeShape(shape));
        nav
    }

    #[test]
    fn test_initial_state() {
        let nav = Navigator::new();
        assert_eq!(nav.active_plane(), Plane::Axial);
        assert_eq!(nav.window(), WindowSettings::new(40.0, 400.0));
        assert!(!nav.has_volume());
        for plane in Plane::ALL {
            assert!(!nav.is_index_set(plane));
            assert_eq!(nav.slice_index(plane), 0);
        }
    }

    #[test]
    fn test_shape_centers_planes() {
        let nav = loaded([100, 50, 80]);
        assert_eq!(nav.max_slice_index(Plane::Axial), 99);
        assert_eq!(nav.slice_index(Plane::Axial), 50);
        assert_eq!(nav.max_slice_index(Plane::Coronal), 49);
        assert_eq!(nav.slice_index(Plane::Coronal), 24);
        assert_eq!(nav.max_slice_index(Plane::Sagittal), 79);
        assert_eq!(nav.slice_index(Plane::Sagittal), 39);
    }

    #[test]
    fn test_activating_unset_plane_materializes_middle() {
        let mut nav = loaded([100, 50, 80]);
        assert!(!nav.is_index_set(Plane::Coronal));
        nav.set_active_plane(Plane::Coronal);
        assert!(nav.is_index_set(Plane::Coronal));
        assert_eq!(nav.current_slice(), 24);

        // Switching back keeps the other plane's position.
        nav.set_slice_index(Plane::Coronal, 3);
        nav.set_active_plane(Plane::Axial);
        nav.set_active_plane(Plane::Coronal);
        assert_eq!(nav.current_slice(), 3);
    }

    #[test]
    fn test_set_slice_index_clamps() {
        let mut nav = loaded([10, 10, 10]);
        assert_eq!(nav.set_slice_index(Plane::Axial, 42), 9);
        assert_eq!(nav.set_slice_index(Plane::Axial, -5), 0);
        assert_eq!(nav.set_slice_index(Plane::Axial, 4), 4);
    }

    #[test]
    fn test_step_first_last() {
        let mut nav = loaded([30, 10, 10]);
        assert_eq!(nav.current_slice(), 15);
        assert_eq!(nav.step_slice(1), 16);
        assert_eq!(nav.step_slice(-10), 6);
        assert_eq!(nav.step_slice(-10), 0);
        assert_eq!(nav.last_slice(), 29);
        assert_eq!(nav.step_slice(10), 29);
        assert_eq!(nav.first_slice(), 0);
    }

    #[test]
    fn test_shape_shrink_recenters() {
        let mut nav = loaded([100, 50, 80]);
        nav.set_slice_index(Plane::Axial, 90);
        nav.set_slice_index(Plane::Sagittal, 10);

        nav.on_volume_shape_changed(VolumeShape::new(20, 50, 80));
        assert_eq!(nav.slice_index(Plane::Axial), 9);
        // In range, so untouched.
        assert_eq!(nav.slice_index(Plane::Sagittal), 10);
    }

    #[test]
    fn test_empty_axis() {
        let mut nav = loaded([0, 1, 5]);
        assert_eq!(nav.max_slice_index(Plane::Axial), 0);
        assert_eq!(nav.current_slice(), 0);
        assert_eq!(nav.step_slice(5), 0);
    }

    #[test]
    fn test_window_settings() {
        let mut nav = Navigator::new();
        nav.set_window_settings(WindowSettings::new(-2000.0, 9000.0));
        // Stored verbatim.
        assert_eq!(nav.window(), WindowSettings::new(-2000.0, 9000.0));
        nav.reset_window_settings();
        assert_eq!(nav.window(), WindowSettings::default());
    }

    #[test]
    fn test_window_clamped_to_control_ranges() {
        let window = WindowSettings::new(-2000.0, 0.0).clamped();
        assert_eq!(window, WindowSettings::new(-1000.0, 1.0));
    }

    #[test]
    fn test_revision_changes() {
        let mut nav = loaded([10, 10, 10]);
        let before = nav.revision();
        nav.step_slice(1);
        assert_ne!(nav.revision(), before);
    }

    #[test]
    fn test_volume_info_from_json() {
        let info = VolumeInfo::from_json(
            r#"{"dicom_shape": [100, 50, 80], "dicom_metadata": {"WindowCenter": 50, "WindowWidth": "350"}}"#,
        )
        .unwrap();
        assert_eq!(info.shape, VolumeShape::new(100, 50, 80));
        assert_eq!(info.window, Some(WindowSettings::new(50.0, 350.0)));

        let info = VolumeInfo::from_json(
            r#"{"dicom_shape": [1, 2, 3], "dicom_metadata": {"WindowCenter": [30, 40]}}"#,
        )
        .unwrap();
        assert_eq!(info.window, None);

        let info =
            VolumeInfo::from_json(r#"{"dicom_shape": [4, 4, 4], "dicom_metadata": {"WindowCenter": [30, 40], "WindowWidth": [300, 400]}}"#)
                .unwrap();
        assert_eq!(info.window, Some(WindowSettings::new(30.0, 300.0)));

        assert!(VolumeInfo::from_json(r#"{"dicom_shape": [1, 2]}"#).is_err());
    }

    #[test]
    fn test_load_volume_applies_window() {
        let mut nav = Navigator::new();
        nav.load_volume(VolumeInfo {
            shape: VolumeShape::new(10, 10, 10),
            window: Some(WindowSettings::new(300.0, 1500.0)),
        });
        assert_eq!(nav.window(), WindowSettings::new(300.0, 1500.0));
        assert_eq!(nav.current_slice(), 5);
    }

    #[test]
    fn test_plane_parse() {
        assert_eq!("Coronal".parse::<Plane>().unwrap(), Plane::Coronal);
        assert!("oblique".parse::<Plane>().is_err());
        assert_eq!(Plane::Sagittal.label(), "Sagittal");
        assert_eq!(Plane::Sagittal.to_string(), "sagittal");
    }

    #[derive(Debug, Clone)]
    enum Op {
        Set(usize, i64),
        Step(i64),
        Activate(usize),
        Shape(usize, usize, usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..3, -500i64..500).prop_map(|(p, i)| Op::Set(p, i)),
            (-50i64..50).prop_map(Op::Step),
            (0usize..3).prop_map(Op::Activate),
            (0usize..300, 0usize..300, 0usize..300).prop_map(|(a, c, s)| Op::Shape(a, c, s)),
        ]
    }

    proptest! {
        #[test]
        fn prop_slice_index_in_bounds(ops in prop::collection::vec(op(), 0..80)) {
            let mut nav = Navigator::new();
            for op in ops {
                match op {
                    Op::Set(p, i) => { nav.set_slice_index(Plane::ALL[p], i); }
                    Op::Step(d) => { nav.step_slice(d); }
                    Op::Activate(p) => nav.set_active_plane(Plane::ALL[p]),
                    Op::Shape(a, c, s) => nav.on_volume_shape_changed(VolumeShape::new(a, c, s)),
                }
                for plane in Plane::ALL {
                    prop_assert!(nav.slice_index(plane) <= nav.max_slice_index(plane));
                    if let Some(stored) = nav.indices[plane.axis()] {
                        prop_assert!(stored <= nav.max_slice_index(plane));
                    }
                }
            }
        }
    }
}
