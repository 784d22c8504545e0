use std::path::PathBuf;

use glam::{Mat3, Vec2, Vec3};
use image::{Rgba, RgbaImage};
use panorama_vr::{
    DrawRecorder, GesturePhase, ImageTextureLoader, MotionSample, MotionSource, PanEvent,
    PanoramaView, PinchEvent, PixelRect, Primitive, ScreenOrientation, TextureLoadError,
    ViewInputState, ViewerConfig, Viewport,
};

const CONFIG: &str = r#"{
    "sphere": { "stacks": 16, "slices": 16 },
    "field_of_view": 60.0,
    "show_touches": true
}"#;

fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("panorama_vr_{}_{}", tag, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn viewer() -> PanoramaView {
    let config = ViewerConfig::from_json_str(CONFIG).unwrap();
    PanoramaView::new(config, Viewport::new(1024.0, 768.0)).unwrap()
}

struct FlatDevice {
    updates: bool,
}

impl MotionSource for FlatDevice {
    fn is_available(&self) -> bool {
        true
    }

    fn set_updates_enabled(&mut self, enabled: bool) {
        self.updates = enabled;
    }

    fn latest(&self) -> Option<MotionSample> {
        self.updates.then(|| MotionSample {
            rotation: Mat3::IDENTITY,
            available: true,
            active: true,
        })
    }
}

#[test]
fn load_draw_and_swap_textures() {
    let dir = temp_dir("swap");
    let file = dir.join("first.png");
    RgbaImage::from_pixel(64, 32, Rgba([10, 20, 30, 255]))
        .save(&file)
        .unwrap();

    let mut view = viewer();
    assert_eq!(view.field_of_view(), 60.0);

    let mut loader = ImageTextureLoader::new(Some(dir.clone()));
    let first = view
        .set_image_path(&PathBuf::from("first.png"), &mut loader)
        .unwrap();
    assert_eq!((first.width, first.height), (64, 32));
    assert_eq!(view.texture_size(), Vec2::new(64.0, 32.0));

    view.update(None);
    let input = ViewInputState {
        touches: vec![Vec2::new(512.0, 384.0)],
    };
    let mut recorder = DrawRecorder::default();
    view.draw(&input, &mut recorder);

    assert_eq!(recorder.draws.len(), 3);
    let sphere = &recorder.draws[0];
    assert_eq!(sphere.state.primitive, Primitive::TriangleStrip);
    assert!(sphere.state.textured);
    assert_eq!(sphere.texture, Some(first));
    assert_eq!(sphere.vertex_count, (16 * 2 + 2) * 16 - 2);

    // the touch sits at the view centre, on the horizon
    let ring = &recorder.draws[1];
    assert_eq!(ring.points.len(), 65);
    assert!(ring.points.iter().all(|p| p.y.abs() < 1e-5));

    let second = view
        .set_image(RgbaImage::new(128, 64), &mut loader)
        .unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(loader.len(), 1);
    assert_eq!(view.texture_size(), Vec2::new(128.0, 64.0));

    let missing = view.set_image_path(&PathBuf::from("missing.png"), &mut loader);
    assert!(matches!(missing, Err(TextureLoadError::NotFound(_))));
    assert!(loader.is_empty());
    assert_eq!(view.texture_size(), Vec2::ZERO);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn hit_test_follows_the_view() {
    let mut view = viewer();
    let mut loader = ImageTextureLoader::new(None);
    view.set_image(RgbaImage::new(128, 64), &mut loader).unwrap();
    view.update(None);

    let centre = ViewInputState {
        touches: vec![Vec2::new(512.0, 384.0)],
    };
    let target = PixelRect::new(30.0, 30.0, 4.0, 4.0);
    assert!(view.is_point_in_region(target, &centre));

    // turn to face +X; the old target leaves the centre
    assert!(view.orient_to_vector(Vec3::X));
    assert!(!view.is_point_in_region(target, &centre));
    let look = view.look();
    assert!((look.vector - Vec3::X).length() < 1e-5);
    assert!((look.altitude).abs() < 1e-5);
}

#[test]
fn drag_keeps_the_grabbed_point_under_the_finger() {
    let mut view = viewer();
    view.update(None);

    let start = Vec2::new(512.0, 384.0);
    let grabbed = view.screen_to_direction(start).unwrap();

    view.handle_pan(PanEvent {
        location: start,
        phase: GesturePhase::Began,
    });
    let mut location = start;
    for _ in 0..5 {
        location += Vec2::new(30.0, -12.0);
        assert!(view.handle_pan(PanEvent {
            location,
            phase: GesturePhase::Changed,
        }));
    }
    view.handle_pan(PanEvent {
        location,
        phase: GesturePhase::Ended,
    });

    let under_finger = view.screen_to_direction(location).unwrap();
    assert!((under_finger - grabbed).length() < 1e-3);
}

#[test]
fn pinch_zoom_respects_limits() {
    let mut view = viewer();
    view.handle_pinch(PinchEvent {
        scale: 1.0,
        phase: GesturePhase::Began,
    });
    view.handle_pinch(PinchEvent {
        scale: 2.0,
        phase: GesturePhase::Changed,
    });
    assert!((view.field_of_view() - 30.0).abs() < 1e-4);

    view.handle_pinch(PinchEvent {
        scale: 0.1,
        phase: GesturePhase::Changed,
    });
    assert_eq!(view.field_of_view(), 155.0);
    view.handle_pinch(PinchEvent {
        scale: 1.0,
        phase: GesturePhase::Ended,
    });

    view.reset_view();
    assert_eq!(view.field_of_view(), 60.0);
}

#[test]
fn device_lying_flat_looks_down() {
    let mut view = viewer();
    let mut device = FlatDevice { updates: false };
    view.set_orientation(ScreenOrientation::Portrait);
    view.set_orient_to_device(true, &mut device);
    assert!(device.updates);

    view.update(device.latest());
    let look = view.look();
    assert!((look.vector - Vec3::NEG_Y).length() < 1e-5);
    assert!((look.altitude + std::f32::consts::FRAC_PI_2).abs() < 1e-3);

    view.set_orient_to_device(false, &mut device);
    view.update(device.latest());
    assert!((view.look().vector - Vec3::NEG_Z).length() < 1e-6);
}
