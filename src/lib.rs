//! Immersive viewer for equirectangular panoramas.
//!
//! The image is mapped onto the inside of a sphere built as a single triangle
//! strip; device attitude and touch gestures turn the camera. Rendering,
//! windowing, image decoding and the motion sensor sit behind the
//! [`RenderBackend`], [`TextureLoader`] and [`MotionSource`] seams.

pub mod attitude;
pub mod config;
pub mod draw;
pub mod error;
pub mod gesture;
pub mod hotspot;
pub mod mesh;
pub mod panorama;
pub mod texture;
pub mod view;

pub use attitude::{AttitudeResolver, MotionSample, MotionSource, NoMotion, ScreenOrientation};
pub use config::ViewerConfig;
pub use draw::{DrawCommand, DrawRecorder, DrawState, Geometry, Primitive, RenderBackend};
pub use error::{ConfigError, InvalidMeshParameters, PanoramaError, SingularMatrixError, TextureLoadError};
pub use gesture::{GestureController, GesturePhase, PanEvent, PinchEvent};
pub use hotspot::{HotspotLineBuilder, HotspotLines};
pub use mesh::{SphereMesh, SphereParams, SphereVertex};
pub use panorama::{PanoramaView, PixelRect, ViewInputState};
pub use texture::{ImageTextureLoader, TextureId, TextureInfo, TextureLoader};
pub use view::{LookDirection, ScreenPoint, ViewTransform, Viewport};
