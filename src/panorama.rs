//! The panorama view: a textured sphere seen from its centre.
//!
//! `PanoramaView` ties the sphere mesh, the projection, device attitude and
//! the pan/pinch gestures together, and answers screen/texture queries.

use std::path::Path;

use glam::{Mat4, Vec2, Vec3};
use image::RgbaImage;

use crate::attitude::{AttitudeResolver, MotionSample, MotionSource, ScreenOrientation};
use crate::config::ViewerConfig;
use crate::draw::RenderBackend;
use crate::error::{PanoramaError, TextureLoadError};
use crate::gesture::{GestureController, PanEvent, PinchEvent};
use crate::hotspot::HotspotLineBuilder;
use crate::mesh::SphereMesh;
use crate::texture::{TextureInfo, TextureLoader};
use crate::view::{look_at_direction, pixel_for_direction, LookDirection, ViewTransform, Viewport};

/// Touches active this frame, in view pixels. Built by the host from its
/// input events and handed to [`PanoramaView::draw`] and hit-tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewInputState {
    pub touches: Vec<Vec2>,
}

/// Half-open pixel rectangle on the panorama texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub min: Vec2,
    pub max: Vec2,
}

impl PixelRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            min: Vec2::new(x, y),
            max: Vec2::new(x + width, y + height),
        }
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x < self.max.x && p.y >= self.min.y && p.y < self.max.y
    }
}

pub struct PanoramaView {
    config: ViewerConfig,
    sphere: SphereMesh,
    transform: ViewTransform,
    gestures: GestureController,
    attitude: AttitudeResolver,
    hotspots: HotspotLineBuilder,
    touch_to_pan: bool,
    pinch_to_zoom: bool,
    show_touches: bool,
    look: LookDirection,
}

impl PanoramaView {
    pub fn new(config: ViewerConfig, viewport: Viewport) -> Result<Self, PanoramaError> {
        config.validate()?;
        let sphere = SphereMesh::build(config.sphere)?;
        let fov = config.initial_field_of_view(viewport.aspect_ratio());
        let transform = ViewTransform::new(fov, viewport, config.z_near, config.z_far);
        let gestures = GestureController::new(fov, config.fov_min, config.fov_max);

        Ok(Self {
            sphere,
            transform,
            gestures,
            attitude: AttitudeResolver::new(config.orient_to_device),
            hotspots: HotspotLineBuilder::new(config.hotspot_line_width),
            touch_to_pan: config.touch_to_pan,
            pinch_to_zoom: config.pinch_to_zoom,
            show_touches: config.show_touches,
            look: LookDirection::default(),
            config,
        })
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn sphere(&self) -> &SphereMesh {
        &self.sphere
    }

    pub fn transform(&self) -> &ViewTransform {
        &self.transform
    }

    pub fn projection(&self) -> Mat4 {
        self.transform.projection()
    }

    /// Device attitude × offset of the last update.
    pub fn attitude(&self) -> Mat4 {
        self.transform.attitude()
    }

    pub fn offset(&self) -> Mat4 {
        self.gestures.offset()
    }

    pub fn look(&self) -> LookDirection {
        self.look
    }

    pub fn field_of_view(&self) -> f32 {
        self.gestures.field_of_view()
    }

    pub fn resize(&mut self, viewport: Viewport) {
        if viewport.width > 0.0 && viewport.height > 0.0 {
            self.transform.resize(viewport);
        }
    }

    /// Clamps to the configured range and rebuilds the projection. Returns
    /// the value applied.
    pub fn set_field_of_view(&mut self, field_of_view: f32) -> f32 {
        let fov = self.gestures.set_field_of_view(field_of_view);
        self.transform.set_field_of_view(fov);
        fov
    }

    pub fn set_image_path(
        &mut self,
        path: &Path,
        loader: &mut dyn TextureLoader,
    ) -> Result<TextureInfo, TextureLoadError> {
        self.sphere.set_texture_from_path(path, loader)
    }

    pub fn set_image(
        &mut self,
        image: RgbaImage,
        loader: &mut dyn TextureLoader,
    ) -> Result<TextureInfo, TextureLoadError> {
        self.sphere.set_texture_from_image(image, loader)
    }

    pub fn texture_size(&self) -> Vec2 {
        self.sphere.texture_size()
    }

    pub fn orientation(&self) -> ScreenOrientation {
        self.attitude.orientation
    }

    pub fn set_orientation(&mut self, orientation: ScreenOrientation) {
        self.attitude.orientation = orientation;
    }

    pub fn orient_to_device(&self) -> bool {
        self.attitude.enabled
    }

    pub fn set_orient_to_device(&mut self, enabled: bool, motion: &mut dyn MotionSource) {
        self.attitude.enabled = enabled;
        if motion.is_available() {
            motion.set_updates_enabled(enabled);
        }
    }

    pub fn touch_to_pan(&self) -> bool {
        self.touch_to_pan
    }

    pub fn set_touch_to_pan(&mut self, enabled: bool) {
        self.touch_to_pan = enabled;
    }

    pub fn pinch_to_zoom(&self) -> bool {
        self.pinch_to_zoom
    }

    pub fn set_pinch_to_zoom(&mut self, enabled: bool) {
        self.pinch_to_zoom = enabled;
    }

    pub fn show_touches(&self) -> bool {
        self.show_touches
    }

    pub fn set_show_touches(&mut self, enabled: bool) {
        self.show_touches = enabled;
    }

    /// Per-frame update from the latest motion snapshot.
    pub fn update(&mut self, sample: Option<MotionSample>) -> Mat4 {
        let device = self.attitude.update(sample);
        let attitude = self.transform.update_attitude(device);
        self.look = self.transform.look();
        attitude
    }

    pub fn draw(&self, input: &ViewInputState, backend: &mut dyn RenderBackend) {
        let projection = self.transform.projection();
        let model_view = self.transform.attitude();
        self.sphere.execute(backend, projection, model_view);

        if self.show_touches {
            for touch in &input.touches {
                if let Some(direction) = self.screen_to_direction(*touch) {
                    self.hotspots.draw(backend, direction, projection, model_view);
                }
            }
        }
    }

    pub fn screen_to_direction(&self, point: Vec2) -> Option<Vec3> {
        match self.transform.unproject(point, self.transform.attitude()) {
            Ok(d) => Some(d),
            Err(e) => {
                log::warn!("no direction under {:?}: {}", point, e);
                None
            }
        }
    }

    pub fn direction_to_screen(&self, direction: Vec3) -> Option<Vec2> {
        match self.transform.project(direction, self.transform.attitude()) {
            Ok(p) => Some(p),
            Err(e) => {
                log::warn!("cannot project {:?}: {}", direction, e);
                None
            }
        }
    }

    /// Texture pixel under `point`; in `[0, 1]` while untextured.
    pub fn screen_to_texture_pixel(&self, point: Vec2) -> Option<Vec2> {
        self.screen_to_direction(point)
            .map(|d| pixel_for_direction(d, self.sphere.texture_size()))
    }

    /// Whether any active touch lands inside `rect` on the texture.
    pub fn is_point_in_region(&self, rect: PixelRect, input: &ViewInputState) -> bool {
        input
            .touches
            .iter()
            .filter_map(|t| self.screen_to_texture_pixel(*t))
            .any(|p| rect.contains(p))
    }

    /// Points the offset at `target`. Returns false for a zero or vertical
    /// target, leaving the view unchanged.
    pub fn orient_to_vector(&mut self, target: Vec3) -> bool {
        let Some(offset) = look_at_direction(target) else {
            log::warn!("cannot orient towards {:?}", target);
            return false;
        };
        self.apply_offset(offset);
        true
    }

    pub fn set_offset_from_azimuth_altitude(&mut self, azimuth: f32, altitude: f32) -> bool {
        self.orient_to_vector(Vec3::new(-azimuth.cos(), altitude.sin(), azimuth.sin()))
    }

    pub fn handle_pinch(&mut self, event: PinchEvent) -> bool {
        if !self.pinch_to_zoom {
            return false;
        }
        match self.gestures.handle_pinch(event) {
            Some(fov) => {
                self.transform.set_field_of_view(fov);
                true
            }
            None => false,
        }
    }

    pub fn handle_pan(&mut self, event: PanEvent) -> bool {
        if !self.touch_to_pan {
            return false;
        }
        let changed = self.gestures.handle_pan(event, &self.transform);
        if changed {
            let offset = self.gestures.offset();
            self.apply_offset(offset);
        }
        changed
    }

    /// Identity offset and the initial field of view.
    pub fn reset_view(&mut self) {
        self.gestures.reset_offset();
        self.apply_offset(Mat4::IDENTITY);
        let fov = self
            .config
            .initial_field_of_view(self.transform.viewport().aspect_ratio());
        self.set_field_of_view(fov);
    }

    fn apply_offset(&mut self, offset: Mat4) {
        self.gestures.set_offset(offset);
        self.transform.set_offset(offset);
        self.transform.update_attitude(self.attitude.attitude());
        self.look = self.transform.look();
    }
}
