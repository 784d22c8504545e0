//! Touch feedback rings: a latitude ring and a half great circle through the
//! touched direction.

use std::f32::consts::PI;

use glam::{Mat3, Mat4, Vec3};
use once_cell::sync::Lazy;

use crate::draw::{DrawCommand, DrawState, Geometry, RenderBackend};

pub const CIRCLE_POINTS: usize = 64;

// pole to pole through the touch meridian
const MERIDIAN_POINTS: usize = CIRCLE_POINTS / 2 + 1;

static UNIT_CIRCLE: Lazy<[Vec3; CIRCLE_POINTS]> = Lazy::new(|| {
    std::array::from_fn(|i| {
        let a = 2.0 * PI / CIRCLE_POINTS as f32 * i as f32;
        Vec3::new(-a.sin(), 0.0, a.cos())
    })
});

/// The shared 64-point unit circle in the XZ plane.
pub fn unit_circle() -> &'static [Vec3; CIRCLE_POINTS] {
    &UNIT_CIRCLE
}

#[derive(Debug, Clone, PartialEq)]
pub struct HotspotLines {
    /// Closed loop (first point repeated at the end).
    pub latitude: Vec<Vec3>,
    pub meridian: Vec<Vec3>,
}

#[derive(Debug, Clone, Copy)]
pub struct HotspotLineBuilder {
    pub line_width: f32,
}

impl Default for HotspotLineBuilder {
    fn default() -> Self {
        Self { line_width: 2.0 }
    }
}

impl HotspotLineBuilder {
    pub fn new(line_width: f32) -> Self {
        Self { line_width }
    }

    pub fn build(&self, direction: Vec3) -> HotspotLines {
        HotspotLines {
            latitude: latitude_ring(direction),
            meridian: meridian_arc(direction),
        }
    }

    /// Submits both rings for `direction` with the hotspot draw state.
    pub fn draw(&self, backend: &mut dyn RenderBackend, direction: Vec3, projection: Mat4, model_view: Mat4) {
        let lines = self.build(direction);
        for points in [&lines.latitude, &lines.meridian] {
            backend.submit(DrawCommand {
                state: DrawState::hotspot(self.line_width),
                projection,
                model_view,
                geometry: Geometry::Lines(points),
            });
        }
    }
}

/// Horizontal ring at the height of `direction`.
pub fn latitude_ring(direction: Vec3) -> Vec<Vec3> {
    let scale = (1.0 - direction.y * direction.y).max(0.0).sqrt();
    let mut ring: Vec<Vec3> = unit_circle()
        .iter()
        .map(|p| Vec3::new(p.x * scale, direction.y, p.z * scale))
        .collect();
    ring.push(ring[0]);
    ring
}

/// Half great circle from the south to the north pole passing through
/// `direction`.
pub fn meridian_arc(direction: Vec3) -> Vec<Vec3> {
    let heading = -(-direction.z).atan2(-direction.x);
    let rotation = Mat3::from_rotation_y(heading) * Mat3::from_rotation_x(PI / 2.0);
    unit_circle()[..MERIDIAN_POINTS]
        .iter()
        .map(|p| rotation * *p)
        .collect()
}
