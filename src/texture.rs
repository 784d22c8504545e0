//! Panorama texture loading.
//!
//! The sphere only keeps an opaque [`TextureInfo`]; decoding and pixel
//! storage belong to a [`TextureLoader`].

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use image::io::Reader as ImageReader;
use image::{DynamicImage, RgbaImage};

use crate::error::TextureLoadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u64);

/// Opaque handle to a decoded texture plus its dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    pub id: TextureId,
    pub width: u32,
    pub height: u32,
}

pub trait TextureLoader {
    fn load_path(&mut self, path: &Path) -> Result<TextureInfo, TextureLoadError>;
    fn load_image(&mut self, image: RgbaImage) -> Result<TextureInfo, TextureLoadError>;
    /// Frees everything held for `texture`. Unknown handles are ignored.
    fn release(&mut self, texture: TextureInfo);
}

/// Decodes an image file, guessing the format from its content.
pub fn decode_image_file(path: &Path) -> Result<DynamicImage, TextureLoadError> {
    let file = File::open(path)?;
    let mut reader = ImageReader::new(BufReader::new(file)).with_guessed_format()?;
    // panoramas routinely exceed the default decoder allocation limit
    reader.no_limits();
    Ok(reader.decode()?)
}

/// CPU-side loader: keeps decoded RGBA pixels, bottom row first, so that
/// `v = 0` on the sphere samples the bottom of the panorama.
#[derive(Debug, Default)]
pub struct ImageTextureLoader {
    asset_dir: Option<PathBuf>,
    next_id: u64,
    images: HashMap<TextureId, RgbaImage>,
}

impl ImageTextureLoader {
    pub fn new(asset_dir: Option<PathBuf>) -> Self {
        Self {
            asset_dir,
            ..Default::default()
        }
    }

    pub fn image(&self, id: TextureId) -> Option<&RgbaImage> {
        self.images.get(&id)
    }

    /// Moves the pixels out once they live elsewhere (e.g. on the GPU). The
    /// handle stays valid for `release`.
    pub fn take_image(&mut self, id: TextureId) -> Option<RgbaImage> {
        self.images.remove(&id)
    }

    /// Number of textures whose pixels are currently held.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// The path itself when it names a file, else the same name under the
    /// asset directory.
    pub fn resolve(&self, path: &Path) -> Result<PathBuf, TextureLoadError> {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        if let Some(dir) = &self.asset_dir {
            let p = dir.join(path);
            if p.is_file() {
                return Ok(p);
            }
        }
        Err(TextureLoadError::NotFound(path.to_path_buf()))
    }
}

impl TextureLoader for ImageTextureLoader {
    fn load_path(&mut self, path: &Path) -> Result<TextureInfo, TextureLoadError> {
        let resolved = self.resolve(path)?;
        let img = decode_image_file(&resolved)?;
        log::debug!("decoded {} ({}x{})", resolved.display(), img.width(), img.height());
        self.load_image(img.to_rgba8())
    }

    fn load_image(&mut self, mut image: RgbaImage) -> Result<TextureInfo, TextureLoadError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(TextureLoadError::EmptyImage(width, height));
        }
        image::imageops::flip_vertical_in_place(&mut image);

        let id = TextureId(self.next_id);
        self.next_id += 1;
        self.images.insert(id, image);
        Ok(TextureInfo { id, width, height })
    }

    fn release(&mut self, texture: TextureInfo) {
        self.images.remove(&texture.id);
    }
}
