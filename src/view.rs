//! Projection, attitude and offset matrices, and the mappings between screen
//! points, directions on the sphere and texture pixels.

use std::f32::consts::PI;

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::error::SingularMatrixError;

/// Degrees to radians, halved: `fov * DEG_TO_HALF_RAD` is the half-angle.
pub const DEG_TO_HALF_RAD: f32 = 0.00872664625997;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewParameters {
    /// Horizontal field of view in degrees.
    pub field_of_view: f32,
    pub aspect_ratio: f32,
    pub z_near: f32,
    pub z_far: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width / self.height
    }
}

/// Projected direction; `in_front` is false for directions behind the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub position: Vec2,
    pub in_front: bool,
}

/// Where the camera looks, derived from the composed attitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookDirection {
    pub vector: Vec3,
    pub azimuth: f32,
    pub altitude: f32,
}

impl LookDirection {
    pub fn from_attitude(attitude: Mat4) -> Self {
        let vector = -attitude.row(2).truncate();
        Self {
            vector,
            azimuth: vector.x.atan2(-vector.z),
            altitude: vector.y.clamp(-1.0, 1.0).asin(),
        }
    }
}

impl Default for LookDirection {
    fn default() -> Self {
        Self::from_attitude(Mat4::IDENTITY)
    }
}

/// OpenGL-style frustum (clip z in [-1, 1]).
pub fn frustum(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let rl = right - left;
    let tb = top - bottom;
    let fn_ = far - near;
    Mat4::from_cols(
        Vec4::new(2.0 * near / rl, 0.0, 0.0, 0.0),
        Vec4::new(0.0, 2.0 * near / tb, 0.0, 0.0),
        Vec4::new((right + left) / rl, (top + bottom) / tb, -(far + near) / fn_, -1.0),
        Vec4::new(0.0, 0.0, -2.0 * far * near / fn_, 0.0),
    )
}

pub fn projection_matrix(params: &ViewParameters) -> Mat4 {
    let half_width = params.z_near * (params.field_of_view * DEG_TO_HALF_RAD).tan();
    let half_height = half_width / params.aspect_ratio;
    frustum(
        -half_width,
        half_width,
        -half_height,
        half_height,
        params.z_near,
        params.z_far,
    )
}

/// Device attitude followed by the user's offset rotation.
pub fn compose_view(device_attitude: Mat4, offset: Mat4) -> Mat4 {
    device_attitude * offset
}

/// Equirectangular pixel for a unit direction. With a zero `texture_size`
/// the result stays in `[0, 1]`.
pub fn pixel_for_direction(direction: Vec3, texture_size: Vec2) -> Vec2 {
    let mut pixel = Vec2::new(
        (PI - (-direction.z).atan2(-direction.x)) / (2.0 * PI),
        direction.y.clamp(-1.0, 1.0).acos() / PI,
    );
    if !(texture_size.x == 0.0 && texture_size.y == 0.0) {
        pixel *= texture_size;
    }
    pixel
}

/// Right-handed look-at from the origin towards `target`, +Y up. `None` when
/// `target` is zero or vertical.
pub fn look_at_direction(target: Vec3) -> Option<Mat4> {
    let dir = target.try_normalize()?;
    if dir.cross(Vec3::Y).length_squared() < 1e-12 {
        return None;
    }
    Some(Mat4::look_at_rh(Vec3::ZERO, dir, Vec3::Y))
}

#[derive(Debug, Clone)]
pub struct ViewTransform {
    params: ViewParameters,
    viewport: Viewport,
    projection: Mat4,
    attitude: Mat4,
    offset: Mat4,
}

impl ViewTransform {
    pub fn new(field_of_view: f32, viewport: Viewport, z_near: f32, z_far: f32) -> Self {
        let params = ViewParameters {
            field_of_view,
            aspect_ratio: viewport.aspect_ratio(),
            z_near,
            z_far,
        };
        Self {
            params,
            viewport,
            projection: projection_matrix(&params),
            attitude: Mat4::IDENTITY,
            offset: Mat4::IDENTITY,
        }
    }

    pub fn params(&self) -> ViewParameters {
        self.params
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// Composed attitude (device × offset) of the last frame.
    pub fn attitude(&self) -> Mat4 {
        self.attitude
    }

    pub fn offset(&self) -> Mat4 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: Mat4) {
        self.offset = offset;
    }

    pub fn set_attitude(&mut self, attitude: Mat4) {
        self.attitude = attitude;
    }

    /// Composes this frame's attitude from the device rotation and the offset.
    pub fn update_attitude(&mut self, device_attitude: Mat4) -> Mat4 {
        self.attitude = compose_view(device_attitude, self.offset);
        self.attitude
    }

    pub fn set_field_of_view(&mut self, field_of_view: f32) {
        self.params.field_of_view = field_of_view;
        self.rebuild_projection();
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.params.aspect_ratio = viewport.aspect_ratio();
        self.rebuild_projection();
    }

    pub fn rebuild_projection(&mut self) -> Mat4 {
        self.projection = projection_matrix(&self.params);
        log::debug!(
            "projection rebuilt: fov {:.2}, aspect {:.3}",
            self.params.field_of_view,
            self.params.aspect_ratio
        );
        self.projection
    }

    /// Direction on the unit sphere under `point` (pixels, origin top-left)
    /// when the scene is viewed through `view`.
    pub fn unproject(&self, point: Vec2, view: Mat4) -> Result<Vec3, SingularMatrixError> {
        let combined = self.projection * view;
        let det = combined.determinant();
        if !det.is_finite() || det.abs() < 1e-12 {
            return Err(SingularMatrixError);
        }
        let inverse = combined.inverse();
        let screen = Vec4::new(
            2.0 * (point.x / self.viewport.width - 0.5),
            2.0 * (0.5 - point.y / self.viewport.height),
            1.0,
            1.0,
        );
        (inverse * screen).truncate().try_normalize().ok_or(SingularMatrixError)
    }

    /// Screen pixel for `direction` through `view`. Directions behind the
    /// camera project too; use [`Self::project_with_depth`] to tell them apart.
    pub fn project(&self, direction: Vec3, view: Mat4) -> Result<Vec2, SingularMatrixError> {
        self.project_with_depth(direction, view).map(|p| p.position)
    }

    pub fn project_with_depth(&self, direction: Vec3, view: Mat4) -> Result<ScreenPoint, SingularMatrixError> {
        let clip = self.projection * view * direction.extend(0.0);
        if !clip.is_finite() || clip.w.abs() < 1e-9 {
            return Err(SingularMatrixError);
        }
        let ndc = Vec2::new(clip.x / clip.w, clip.y / clip.w);
        let position = Vec2::new(
            (ndc.x / 2.0 + 0.5) * self.viewport.width,
            (0.5 - ndc.y / 2.0) * self.viewport.height,
        );
        if !position.is_finite() {
            return Err(SingularMatrixError);
        }
        Ok(ScreenPoint {
            position,
            in_front: clip.w > 0.0,
        })
    }

    pub fn look(&self) -> LookDirection {
        LookDirection::from_attitude(self.attitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    fn transform() -> ViewTransform {
        ViewTransform::new(90.0, Viewport::new(800.0, 400.0), 0.1, 100.0)
    }

    #[test]
    fn test_projection_half_extents() {
        let t = transform();
        let p = t.projection();
        // half width = near, half height = near / 2
        assert!((p.x_axis.x - 1.0).abs() < 1e-5);
        assert!((p.y_axis.y - 2.0).abs() < 1e-5);
        assert_eq!(p.z_axis.w, -1.0);
        assert!((p.z_axis.z + 100.1 / 99.9).abs() < 1e-5);
    }

    #[test]
    fn test_fov_and_resize_rebuild() {
        let mut t = transform();
        let before = t.projection();
        t.set_field_of_view(60.0);
        assert!(t.projection().x_axis.x > before.x_axis.x);
        t.resize(Viewport::new(400.0, 400.0));
        assert!((t.params().aspect_ratio - 1.0).abs() < 1e-6);
        assert!((t.projection().x_axis.x - t.projection().y_axis.y).abs() < 1e-5);
    }

    #[test]
    fn test_compose_order() {
        let a = Mat4::from_rotation_y(0.4);
        let b = Mat4::from_rotation_x(-0.9);
        assert_eq!(compose_view(a, b), a * b);
        let mut t = transform();
        t.set_offset(b);
        assert_eq!(t.update_attitude(a), a * b);
    }

    #[test]
    fn test_unproject_center_looks_forward() {
        let t = transform();
        let d = t.unproject(Vec2::new(400.0, 200.0), Mat4::IDENTITY).unwrap();
        assert!((d - Vec3::NEG_Z).length() < 1e-5);

        let right = t.unproject(Vec2::new(800.0, 200.0), Mat4::IDENTITY).unwrap();
        // 90 degree horizontal fov: the right edge is 45 degrees off axis
        assert!((right - Vec3::new(1.0, 0.0, -1.0).normalize()).length() < 1e-4);

        let top = t.unproject(Vec2::new(400.0, 0.0), Mat4::IDENTITY).unwrap();
        assert!(top.y > 0.0);
    }

    #[test]
    fn test_project_unproject_round_trip() {
        let t = transform();
        let view = Mat4::from_quat(Quat::from_euler(glam::EulerRot::YXZ, 1.2, -0.4, 0.3));
        let size = Vec2::new(800.0, 400.0);
        for p in [
            Vec2::new(400.0, 200.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(799.0, 399.0),
            Vec2::new(123.4, 321.0),
            Vec2::new(650.0, 20.0),
        ] {
            let d = t.unproject(p, view).unwrap();
            let q = t.project(d, view).unwrap();
            let err = (q - p) / size;
            assert!(err.abs().max_element() < 1e-4, "{:?} -> {:?}", p, q);
        }
    }

    #[test]
    fn test_degenerate_fov_is_singular() {
        let t = ViewTransform::new(0.0, Viewport::new(800.0, 400.0), 0.1, 100.0);
        assert_eq!(
            t.unproject(Vec2::new(10.0, 10.0), Mat4::IDENTITY),
            Err(SingularMatrixError)
        );
        let flat = ViewTransform::new(90.0, Viewport::new(800.0, 400.0), 0.1, 100.0);
        assert_eq!(flat.unproject(Vec2::ZERO, Mat4::ZERO), Err(SingularMatrixError));
    }

    #[test]
    fn test_project_front_and_back() {
        let t = transform();
        let front = t.project_with_depth(Vec3::NEG_Z, Mat4::IDENTITY).unwrap();
        assert!(front.in_front);
        assert!((front.position - Vec2::new(400.0, 200.0)).length() < 1e-3);

        let back = t.project_with_depth(Vec3::Z, Mat4::IDENTITY).unwrap();
        assert!(!back.in_front);

        // perpendicular to the view axis: lands on the camera plane
        assert!(t.project(Vec3::X, Mat4::IDENTITY).is_err());
    }

    #[test]
    fn test_pixel_for_direction() {
        let size = Vec2::new(4096.0, 2048.0);
        let p = pixel_for_direction(Vec3::NEG_X, size);
        assert!((p - Vec2::new(2048.0, 1024.0)).length() < 1e-2);

        let up = pixel_for_direction(Vec3::Y, Vec2::ZERO);
        assert!(up.y.abs() < 1e-6);
        let down = pixel_for_direction(Vec3::NEG_Y, Vec2::ZERO);
        assert!((down.y - 1.0).abs() < 1e-6);

        let forward = pixel_for_direction(Vec3::NEG_Z, Vec2::ZERO);
        assert!((forward.x - 0.25).abs() < 1e-6);
        assert!((forward.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_look_direction() {
        let look = LookDirection::from_attitude(Mat4::IDENTITY);
        assert_eq!(look.vector, Vec3::NEG_Z);
        assert!(look.azimuth.abs() < 1e-6);
        assert!(look.altitude.abs() < 1e-6);

        let target = Vec3::new(0.3, 0.5, -0.8);
        let m = look_at_direction(target).unwrap();
        let look = LookDirection::from_attitude(m);
        assert!((look.vector - target.normalize()).length() < 1e-5);
        assert!((look.altitude - target.normalize().y.asin()).abs() < 1e-5);

        assert!(look_at_direction(Vec3::ZERO).is_none());
        assert!(look_at_direction(Vec3::Y).is_none());
    }
}
