//! Pinch-to-zoom and drag-to-pan.
//!
//! Zoom and pan are independent `Idle → Active → Idle` machines. Pan keeps the
//! sphere point grabbed at `Began` under the finger by composing shortest-arc
//! rotations into the offset matrix, independently of device attitude.

use std::f32::consts::PI;

use glam::{Mat4, Quat, Vec2, Vec3};

use crate::view::ViewTransform;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Began,
    Changed,
    Ended,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinchEvent {
    /// Scale relative to the finger distance at `Began`.
    pub scale: f32,
    pub phase: GesturePhase,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanEvent {
    /// Touch location in view pixels.
    pub location: Vec2,
    pub phase: GesturePhase,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoomState {
    Idle,
    Active { base_fov: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanState {
    Idle,
    Active { start: Vec3 },
}

/// Shortest-arc rotation taking `u` onto `v`.
///
/// Adding the quaternion's length to `w` halves the angle without any trig,
/// which stays stable until the vectors are exactly opposite; that case picks
/// an arbitrary perpendicular axis.
pub fn quaternion_from_two_vectors(u: Vec3, v: Vec3) -> Quat {
    let axis = u.cross(v);
    let q = Quat::from_xyzw(axis.x, axis.y, axis.z, u.dot(v));
    let q = Quat::from_xyzw(q.x, q.y, q.z, q.w + q.length());
    if q.length() < 1e-6 {
        let perpendicular = u.try_normalize().unwrap_or(Vec3::X).any_orthonormal_vector();
        return Quat::from_axis_angle(perpendicular, PI);
    }
    q.normalize()
}

#[derive(Debug, Clone)]
pub struct GestureController {
    field_of_view: f32,
    fov_min: f32,
    fov_max: f32,
    offset: Mat4,
    zoom: ZoomState,
    pan: PanState,
}

impl GestureController {
    /// A non-finite `field_of_view` starts at the middle of the range.
    pub fn new(field_of_view: f32, fov_min: f32, fov_max: f32) -> Self {
        let field_of_view = if field_of_view.is_finite() {
            field_of_view
        } else {
            (fov_min + fov_max) * 0.5
        };
        Self {
            field_of_view: field_of_view.clamp(fov_min, fov_max),
            fov_min,
            fov_max,
            offset: Mat4::IDENTITY,
            zoom: ZoomState::Idle,
            pan: PanState::Idle,
        }
    }

    pub fn field_of_view(&self) -> f32 {
        self.field_of_view
    }

    pub fn fov_range(&self) -> (f32, f32) {
        (self.fov_min, self.fov_max)
    }

    pub fn offset(&self) -> Mat4 {
        self.offset
    }

    pub fn zoom_state(&self) -> ZoomState {
        self.zoom
    }

    pub fn pan_state(&self) -> PanState {
        self.pan
    }

    /// Sets the field of view, clamped to the configured range, and returns
    /// the value applied. NaN and infinities are ignored.
    pub fn set_field_of_view(&mut self, field_of_view: f32) -> f32 {
        if field_of_view.is_finite() {
            self.field_of_view = field_of_view.clamp(self.fov_min, self.fov_max);
        } else {
            log::debug!("ignoring non-finite field of view {}", field_of_view);
        }
        self.field_of_view
    }

    pub fn set_offset(&mut self, offset: Mat4) {
        self.offset = offset;
    }

    pub fn reset_offset(&mut self) {
        self.offset = Mat4::IDENTITY;
        self.pan = PanState::Idle;
    }

    /// Returns the new field of view when the pinch changed it.
    pub fn handle_pinch(&mut self, event: PinchEvent) -> Option<f32> {
        match event.phase {
            GesturePhase::Began => {
                self.zoom = ZoomState::Active {
                    base_fov: self.field_of_view,
                };
                None
            }
            GesturePhase::Changed => {
                if !(event.scale > 0.0) || !event.scale.is_finite() {
                    return None;
                }
                let base_fov = match self.zoom {
                    ZoomState::Active { base_fov } => base_fov,
                    ZoomState::Idle => {
                        self.zoom = ZoomState::Active {
                            base_fov: self.field_of_view,
                        };
                        self.field_of_view
                    }
                };
                Some(self.set_field_of_view(base_fov / event.scale))
            }
            GesturePhase::Ended | GesturePhase::Cancelled => {
                self.zoom = ZoomState::Idle;
                None
            }
        }
    }

    /// Returns true when the offset rotation changed.
    pub fn handle_pan(&mut self, event: PanEvent, view: &ViewTransform) -> bool {
        match event.phase {
            GesturePhase::Began => {
                self.begin_pan(event.location, view);
                false
            }
            GesturePhase::Changed => {
                let PanState::Active { start } = self.pan else {
                    self.begin_pan(event.location, view);
                    return false;
                };
                let current = match view.unproject(event.location, self.offset) {
                    Ok(d) => d,
                    Err(e) => {
                        log::warn!("pan update ignored: {}", e);
                        return false;
                    }
                };
                let q = quaternion_from_two_vectors(start, current);
                self.offset *= Mat4::from_quat(q);
                // the grabbed point now sits under the finger again
                let start = view.unproject(event.location, self.offset).unwrap_or(start);
                self.pan = PanState::Active { start };
                true
            }
            GesturePhase::Ended | GesturePhase::Cancelled => {
                self.pan = PanState::Idle;
                false
            }
        }
    }

    fn begin_pan(&mut self, location: Vec2, view: &ViewTransform) {
        self.pan = match view.unproject(location, self.offset) {
            Ok(start) => PanState::Active { start },
            Err(e) => {
                log::warn!("pan start ignored: {}", e);
                PanState::Idle
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::Viewport;

    fn view() -> ViewTransform {
        ViewTransform::new(80.0, Viewport::new(640.0, 480.0), 0.1, 100.0)
    }

    fn pan(x: f32, y: f32, phase: GesturePhase) -> PanEvent {
        PanEvent {
            location: Vec2::new(x, y),
            phase,
        }
    }

    #[test]
    fn test_fov_clamping() {
        let mut g = GestureController::new(60.0, 1.0, 155.0);
        assert_eq!(g.set_field_of_view(0.5), 1.0);
        assert_eq!(g.set_field_of_view(200.0), 155.0);
        assert_eq!(g.set_field_of_view(70.0), 70.0);
        assert_eq!(g.field_of_view(), 70.0);
    }

    #[test]
    fn test_non_finite_fov_keeps_current() {
        let mut g = GestureController::new(60.0, 1.0, 155.0);
        assert_eq!(g.set_field_of_view(f32::NAN), 60.0);
        assert_eq!(g.set_field_of_view(f32::INFINITY), 60.0);
        assert_eq!(g.set_field_of_view(f32::NEG_INFINITY), 60.0);
        assert_eq!(g.field_of_view(), 60.0);

        let fresh = GestureController::new(f32::NAN, 1.0, 155.0);
        assert_eq!(fresh.field_of_view(), 78.0);
    }

    #[test]
    fn test_pinch_scales_from_base() {
        let mut g = GestureController::new(60.0, 1.0, 155.0);
        assert_eq!(g.handle_pinch(PinchEvent { scale: 1.0, phase: GesturePhase::Began }), None);
        assert_eq!(g.zoom_state(), ZoomState::Active { base_fov: 60.0 });

        assert_eq!(g.handle_pinch(PinchEvent { scale: 2.0, phase: GesturePhase::Changed }), Some(30.0));
        // relative to the base, not to the previous update
        assert_eq!(g.handle_pinch(PinchEvent { scale: 1.5, phase: GesturePhase::Changed }), Some(40.0));
        assert_eq!(g.handle_pinch(PinchEvent { scale: 0.1, phase: GesturePhase::Changed }), Some(155.0));
        assert_eq!(g.handle_pinch(PinchEvent { scale: 1000.0, phase: GesturePhase::Changed }), Some(1.0));

        g.handle_pinch(PinchEvent { scale: 1000.0, phase: GesturePhase::Ended });
        assert_eq!(g.zoom_state(), ZoomState::Idle);
        // no snap-back
        assert_eq!(g.field_of_view(), 1.0);
    }

    #[test]
    fn test_pinch_ignores_bad_scale() {
        let mut g = GestureController::new(60.0, 1.0, 155.0);
        g.handle_pinch(PinchEvent { scale: 1.0, phase: GesturePhase::Began });
        assert_eq!(g.handle_pinch(PinchEvent { scale: 0.0, phase: GesturePhase::Changed }), None);
        assert_eq!(g.handle_pinch(PinchEvent { scale: f32::NAN, phase: GesturePhase::Changed }), None);
        assert_eq!(g.field_of_view(), 60.0);
    }

    #[test]
    fn test_quaternion_identity_for_same_direction() {
        let d = Vec3::new(0.2, -0.4, 0.9).normalize();
        let q = quaternion_from_two_vectors(d, d);
        assert!(q.abs_diff_eq(Quat::IDENTITY, 1e-6));
    }

    #[test]
    fn test_quaternion_maps_u_onto_v() {
        let pairs = [
            (Vec3::X, Vec3::Y),
            (Vec3::new(0.3, 0.4, -0.5).normalize(), Vec3::new(-0.9, 0.1, 0.2).normalize()),
            (Vec3::Z, Vec3::new(0.0, 0.001, -1.0).normalize()),
            (Vec3::X, Vec3::NEG_X),
        ];
        for (u, v) in pairs {
            let q = quaternion_from_two_vectors(u, v);
            assert!((q.length() - 1.0).abs() < 1e-5);
            assert!((q * u - v).length() < 1e-3, "{:?} -> {:?}", u, v);
        }
    }

    #[test]
    fn test_pan_in_place_keeps_offset() {
        let view = view();
        let mut g = GestureController::new(60.0, 1.0, 155.0);
        g.handle_pan(pan(100.0, 200.0, GesturePhase::Began), &view);
        assert!(matches!(g.pan_state(), PanState::Active { .. }));
        g.handle_pan(pan(100.0, 200.0, GesturePhase::Changed), &view);
        assert!(g.offset().abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn test_pan_keeps_grabbed_point_under_finger() {
        let view = view();
        let mut g = GestureController::new(60.0, 1.0, 155.0);
        let grabbed = view.unproject(Vec2::new(320.0, 240.0), Mat4::IDENTITY).unwrap();

        g.handle_pan(pan(320.0, 240.0, GesturePhase::Began), &view);
        assert!(g.handle_pan(pan(380.0, 250.0, GesturePhase::Changed), &view));
        assert!(g.handle_pan(pan(450.0, 300.0, GesturePhase::Changed), &view));

        let under_finger = view.unproject(Vec2::new(450.0, 300.0), g.offset()).unwrap();
        assert!((under_finger - grabbed).length() < 1e-4);

        g.handle_pan(pan(450.0, 300.0, GesturePhase::Ended), &view);
        assert_eq!(g.pan_state(), PanState::Idle);
        assert!(!g.offset().abs_diff_eq(Mat4::IDENTITY, 1e-3));
    }

    #[test]
    fn test_pan_with_singular_view_is_ignored() {
        let degenerate = ViewTransform::new(0.0, Viewport::new(640.0, 480.0), 0.1, 100.0);
        let mut g = GestureController::new(60.0, 1.0, 155.0);
        g.handle_pan(pan(10.0, 10.0, GesturePhase::Began), &degenerate);
        assert_eq!(g.pan_state(), PanState::Idle);
        assert!(!g.handle_pan(pan(20.0, 20.0, GesturePhase::Changed), &degenerate));
        assert_eq!(g.offset(), Mat4::IDENTITY);
    }
}
