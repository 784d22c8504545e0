//! Viewer configuration.
//!
//! Loaded from JSON; every field is optional and falls back to the values
//! below. Search order for [`ViewerConfig::discover`]:
//! 1) `$PANORAMA_CONFIG`
//! 2) `<exe_dir>/assets/viewer.json`
//! 3) `./assets/viewer.json`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::mesh::SphereParams;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Target refresh rate of the host loop.
    pub fps: u32,
    /// Narrowest field of view reachable by pinching, in degrees.
    pub fov_min: f32,
    /// Widest field of view reachable by pinching, in degrees.
    pub fov_max: f32,
    pub z_near: f32,
    pub z_far: f32,
    /// Initial field of view. `None` derives it from the aspect ratio.
    pub field_of_view: Option<f32>,
    pub sphere: SphereParams,
    pub orient_to_device: bool,
    pub touch_to_pan: bool,
    pub pinch_to_zoom: bool,
    pub show_touches: bool,
    pub hotspot_line_width: f32,
    /// Directory searched when a texture name is not an existing file.
    pub asset_dir: Option<PathBuf>,
    /// Panorama opened at start-up.
    pub image: Option<PathBuf>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            fps: 60,
            fov_min: 1.0,
            fov_max: 155.0,
            z_near: 0.1,
            z_far: 100.0,
            field_of_view: None,
            sphere: SphereParams::default(),
            orient_to_device: true,
            touch_to_pan: true,
            pinch_to_zoom: true,
            show_touches: false,
            hotspot_line_width: 2.0,
            asset_dir: None,
            image: None,
        }
    }
}

impl ViewerConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: ViewerConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        log::info!("loaded viewer config from {}", path.display());
        Ok(config)
    }

    /// Loads the first config file found, or the defaults when there is none.
    pub fn discover() -> Result<Self, ConfigError> {
        match find_config_file() {
            Some(path) => Self::load(&path),
            None => {
                log::debug!("no viewer config found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fov_min > 0.0) {
            return Err(ConfigError::Invalid(format!("fov_min must be > 0, got {}", self.fov_min)));
        }
        if self.fov_min > self.fov_max {
            return Err(ConfigError::Invalid(format!(
                "fov_min ({}) > fov_max ({})",
                self.fov_min, self.fov_max
            )));
        }
        if !(self.fov_max < 180.0) {
            return Err(ConfigError::Invalid(format!("fov_max must be < 180, got {}", self.fov_max)));
        }
        if !(self.z_near > 0.0) || !(self.z_far > self.z_near) {
            return Err(ConfigError::Invalid(format!(
                "clip planes must satisfy 0 < z_near < z_far, got {} / {}",
                self.z_near, self.z_far
            )));
        }
        if self.fps == 0 {
            return Err(ConfigError::Invalid("fps must be > 0".to_string()));
        }
        if let Some(fov) = self.field_of_view.filter(|f| !f.is_finite()) {
            return Err(ConfigError::Invalid(format!("field_of_view must be finite, got {}", fov)));
        }
        self.sphere
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }

    /// Initial field of view for a viewport of the given aspect ratio. A
    /// non-finite configured value falls back to the derived one.
    pub fn initial_field_of_view(&self, aspect_ratio: f32) -> f32 {
        let derived = || {
            let fov = 45.0 + 45.0 * aspect_ratio.atan();
            if fov.is_finite() {
                fov
            } else {
                45.0 + 45.0 * std::f32::consts::FRAC_PI_4
            }
        };
        let fov = self
            .field_of_view
            .filter(|f| f.is_finite())
            .unwrap_or_else(derived);
        fov.clamp(self.fov_min, self.fov_max)
    }
}

fn find_config_file() -> Option<PathBuf> {
    if let Ok(v) = std::env::var("PANORAMA_CONFIG") {
        if !v.trim().is_empty() {
            return Some(PathBuf::from(v));
        }
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let p = dir.join("assets").join("viewer.json");
            if p.exists() {
                return Some(p);
            }
        }
    }

    let p = PathBuf::from("assets").join("viewer.json");
    if p.exists() {
        return Some(p);
    }

    None
}
