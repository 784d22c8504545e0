//! Device attitude → render rotation.
//!
//! The only orientation-dependent logic in the viewer: a fixed table mapping
//! sensor axes onto render axes for each screen orientation.

use glam::{Mat3, Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ScreenOrientation {
    #[default]
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
}

/// One reading of the motion sensor.
///
/// `rotation.col(j)[i]` is sensor element `m(i+1)(j+1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSample {
    pub rotation: Mat3,
    pub available: bool,
    pub active: bool,
}

impl MotionSample {
    /// Builds a sample from a row-major rotation (`rows[i][j]` = `m(i+1)(j+1)`).
    pub fn from_rows(rows: [[f32; 3]; 3]) -> Self {
        Self {
            rotation: Mat3::from_cols_array_2d(&rows).transpose(),
            available: true,
            active: true,
        }
    }
}

/// Source of device-motion snapshots. Implementations own the sensor
/// lifecycle; the viewer only switches updates on and off and reads the most
/// recent sample once per frame.
pub trait MotionSource {
    fn is_available(&self) -> bool;
    fn set_updates_enabled(&mut self, enabled: bool);
    fn latest(&self) -> Option<MotionSample>;
}

/// Motion source for hosts without a sensor.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMotion;

impl MotionSource for NoMotion {
    fn is_available(&self) -> bool {
        false
    }

    fn set_updates_enabled(&mut self, _enabled: bool) {}

    fn latest(&self) -> Option<MotionSample> {
        None
    }
}

// Output row r takes sensor row map[r].0 with sign map[r].1.
type RowMap = [(usize, f32); 3];

// Output column c takes sensor column COLUMNS[c].0 with sign COLUMNS[c].1.
const COLUMNS: [(usize, f32); 3] = [(0, 1.0), (2, 1.0), (1, -1.0)];

const fn row_map(orientation: ScreenOrientation) -> RowMap {
    match orientation {
        ScreenOrientation::Portrait => [(0, 1.0), (1, 1.0), (2, 1.0)],
        ScreenOrientation::PortraitUpsideDown => [(0, -1.0), (1, -1.0), (2, 1.0)],
        ScreenOrientation::LandscapeLeft => [(1, -1.0), (0, 1.0), (2, 1.0)],
        ScreenOrientation::LandscapeRight => [(1, 1.0), (0, -1.0), (2, 1.0)],
    }
}

/// Remaps a sensor rotation into the render frame for `orientation`.
pub fn orientation_matrix(sensor: Mat3, orientation: ScreenOrientation) -> Mat4 {
    let rows = row_map(orientation);
    let column = |c: usize| {
        let (src_col, col_sign) = COLUMNS[c];
        let src = sensor.col(src_col);
        Vec4::new(
            col_sign * rows[0].1 * src[rows[0].0],
            col_sign * rows[1].1 * src[rows[1].0],
            col_sign * rows[2].1 * src[rows[2].0],
            0.0,
        )
    };
    Mat4::from_cols(column(0), column(1), column(2), Vec4::W)
}

/// Attitude matrix for this frame; identity unless device orientation is
/// enabled and the sensor is delivering data.
pub fn resolve(sample: Option<MotionSample>, orientation: ScreenOrientation, enabled: bool) -> Mat4 {
    match sample {
        Some(s) if enabled && s.available && s.active => orientation_matrix(s.rotation, orientation),
        _ => Mat4::IDENTITY,
    }
}

/// Stateful wrapper holding the current screen orientation and the last
/// resolved attitude.
#[derive(Debug, Clone, Copy)]
pub struct AttitudeResolver {
    pub orientation: ScreenOrientation,
    pub enabled: bool,
    attitude: Mat4,
}

impl Default for AttitudeResolver {
    fn default() -> Self {
        Self {
            orientation: ScreenOrientation::Portrait,
            enabled: false,
            attitude: Mat4::IDENTITY,
        }
    }
}

impl AttitudeResolver {
    /// Portrait resolver with an identity attitude until the first update.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    pub fn update(&mut self, sample: Option<MotionSample>) -> Mat4 {
        self.attitude = resolve(sample, self.orientation, self.enabled);
        self.attitude
    }

    pub fn attitude(&self) -> Mat4 {
        self.attitude
    }

    /// Forward axis of the current attitude.
    pub fn forward(&self) -> Vec3 {
        -self.attitude.row(2).truncate()
    }
}
