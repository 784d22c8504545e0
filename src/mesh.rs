//! UV sphere laid out as one continuous triangle strip.
//!
//! Each stack emits a (lower, upper) vertex pair per slice followed by two
//! degenerate copies of its last vertex, which bridge to the next stack
//! without a strip restart.

use std::path::Path;

use glam::{Mat4, Vec2, Vec3};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::draw::{DrawCommand, DrawState, Geometry, RenderBackend};
use crate::error::{InvalidMeshParameters, TextureLoadError};
use crate::texture::{TextureInfo, TextureLoader};

// pi at the 6-digit precision every intermediate is rounded to
const PI6: f64 = 3.141593;

fn round6(x: f64) -> f64 {
    (x * 1e6).round() / 1e6
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SphereParams {
    pub stacks: u32,
    pub slices: u32,
    pub radius: f32,
}

impl Default for SphereParams {
    fn default() -> Self {
        Self {
            stacks: 48,
            slices: 48,
            radius: 10.0,
        }
    }
}

impl SphereParams {
    pub fn validate(&self) -> Result<(), InvalidMeshParameters> {
        if self.stacks < 1 || self.slices < 2 || !(self.radius > 0.0) || !self.radius.is_finite() {
            return Err(InvalidMeshParameters {
                stacks: self.stacks,
                slices: self.slices,
                radius: self.radius,
            });
        }
        Ok(())
    }

    /// Vertices in the buffer: `(slices * 2 + 2) * stacks`.
    pub fn vertex_count(&self) -> usize {
        (self.slices as usize * 2 + 2) * self.stacks as usize
    }
}

/// Interleaved vertex as uploaded to the GPU.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SphereVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coord: [f32; 2],
}

#[derive(Debug, Clone)]
pub struct SphereMesh {
    params: SphereParams,
    vertices: Vec<Vec3>,
    normals: Vec<Vec3>,
    tex_coords: Vec<Vec2>,
    texture: Option<TextureInfo>,
}

impl SphereMesh {
    pub fn new(stacks: u32, slices: u32, radius: f32) -> Result<Self, InvalidMeshParameters> {
        Self::build(SphereParams {
            stacks,
            slices,
            radius,
        })
    }

    pub fn build(params: SphereParams) -> Result<Self, InvalidMeshParameters> {
        params.validate()?;

        let count = params.vertex_count();
        let mut vertices = Vec::with_capacity(count);
        let mut normals = Vec::with_capacity(count);
        let mut tex_coords = Vec::with_capacity(count);

        let stacks = params.stacks as f64;
        let slices = params.slices as f64;
        let radius = params.radius as f64;

        let point = |cos_phi: f64, sin_phi: f64, cos_theta: f64, sin_theta: f64, scale: f64| {
            Vec3::new(
                round6(scale * cos_phi * cos_theta) as f32,
                round6(scale * sin_phi) as f32,
                round6(scale * cos_phi * sin_theta) as f32,
            )
        };

        for stack in 0..params.stacks {
            // latitude runs from -pi/2 to pi/2
            let phi0 = round6(PI6 * (stack as f64 / stacks - 0.5));
            let phi1 = round6(PI6 * ((stack + 1) as f64 / stacks - 0.5));
            let (sin_phi0, cos_phi0) = (round6(phi0.sin()), round6(phi0.cos()));
            let (sin_phi1, cos_phi1) = (round6(phi1.sin()), round6(phi1.cos()));

            let v0 = round6(stack as f64 / stacks) as f32;
            let v1 = round6((stack + 1) as f64 / stacks) as f32;

            for slice in 0..params.slices {
                let theta = round6(-2.0 * PI6 * (slice as f64 * (1.0 / (slices - 1.0))));
                let cos_theta = round6((theta + PI6 * 0.5).cos());
                let sin_theta = round6((theta + PI6 * 0.5).sin());

                vertices.push(point(cos_phi0, sin_phi0, cos_theta, sin_theta, radius));
                vertices.push(point(cos_phi1, sin_phi1, cos_theta, sin_theta, radius));
                normals.push(point(cos_phi0, sin_phi0, cos_theta, sin_theta, 1.0));
                normals.push(point(cos_phi1, sin_phi1, cos_theta, sin_theta, 1.0));

                // mirrored so the image reads correctly from inside
                let u = 1.0 - round6(slice as f64 / (slices - 1.0)) as f32;
                tex_coords.push(Vec2::new(u, v0));
                tex_coords.push(Vec2::new(u, v1));
            }

            // degenerate pair
            let (v, n, t) = (vertices[vertices.len() - 1], normals[normals.len() - 1], tex_coords[tex_coords.len() - 1]);
            vertices.extend([v, v]);
            normals.extend([n, n]);
            tex_coords.extend([t, t]);
        }

        log::debug!(
            "built sphere mesh: {} stacks, {} slices, radius {}, {} vertices",
            params.stacks,
            params.slices,
            params.radius,
            vertices.len()
        );

        Ok(Self {
            params,
            vertices,
            normals,
            tex_coords,
            texture: None,
        })
    }

    pub fn params(&self) -> SphereParams {
        self.params
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn tex_coords(&self) -> &[Vec2] {
        &self.tex_coords
    }

    /// Number of strip vertices submitted per draw: every stack, minus the
    /// trailing degenerate pair that has no stack after it.
    pub fn strip_vertex_count(&self) -> u32 {
        (self.params.slices * 2 + 2) * self.params.stacks - 2
    }

    pub fn interleaved(&self) -> Vec<SphereVertex> {
        self.vertices
            .iter()
            .zip(&self.normals)
            .zip(&self.tex_coords)
            .map(|((p, n), t)| SphereVertex {
                position: p.to_array(),
                normal: n.to_array(),
                tex_coord: t.to_array(),
            })
            .collect()
    }

    pub fn texture(&self) -> Option<TextureInfo> {
        self.texture
    }

    /// Texture dimensions in pixels, `(0, 0)` when untextured.
    pub fn texture_size(&self) -> Vec2 {
        match self.texture {
            Some(t) => Vec2::new(t.width as f32, t.height as f32),
            None => Vec2::ZERO,
        }
    }

    /// Swaps the texture for one loaded from `path`. The previous texture is
    /// released first; on failure the mesh is left untextured.
    pub fn set_texture_from_path(
        &mut self,
        path: &Path,
        loader: &mut dyn TextureLoader,
    ) -> Result<TextureInfo, TextureLoadError> {
        self.release_texture(loader);
        let result = loader.load_path(path);
        self.finish_swap(result)
    }

    pub fn set_texture_from_image(
        &mut self,
        image: RgbaImage,
        loader: &mut dyn TextureLoader,
    ) -> Result<TextureInfo, TextureLoadError> {
        self.release_texture(loader);
        let result = loader.load_image(image);
        self.finish_swap(result)
    }

    pub fn release_texture(&mut self, loader: &mut dyn TextureLoader) {
        if let Some(texture) = self.texture.take() {
            loader.release(texture);
        }
    }

    fn finish_swap(
        &mut self,
        result: Result<TextureInfo, TextureLoadError>,
    ) -> Result<TextureInfo, TextureLoadError> {
        match result {
            Ok(info) => {
                log::info!("sphere texture set ({}x{})", info.width, info.height);
                self.texture = Some(info);
                Ok(info)
            }
            Err(e) => {
                log::warn!("texture load failed, sphere left untextured: {}", e);
                Err(e)
            }
        }
    }

    /// Submits the strip with the panorama draw state.
    pub fn execute(&self, backend: &mut dyn RenderBackend, projection: Mat4, model_view: Mat4) {
        backend.submit(DrawCommand {
            state: DrawState::panorama(self.texture.is_some()),
            projection,
            model_view,
            geometry: Geometry::Strip {
                vertices: &self.vertices,
                normals: &self.normals,
                tex_coords: &self.tex_coords,
                count: self.strip_vertex_count(),
                texture: self.texture,
            },
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::{DrawRecorder, Primitive};
    use crate::texture::ImageTextureLoader;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    #[test]
    fn test_vertex_counts() {
        for (stacks, slices) in [(1, 2), (2, 3), (5, 7), (48, 48)] {
            let mesh = SphereMesh::new(stacks, slices, 1.0).unwrap();
            let expected = ((slices * 2 + 2) * stacks) as usize;
            assert_eq!(mesh.vertices().len(), expected);
            assert_eq!(mesh.normals().len(), expected);
            assert_eq!(mesh.tex_coords().len(), expected);
            assert_eq!(mesh.interleaved().len(), expected);
        }
    }

    #[test]
    fn test_strip_vertex_count() {
        let mesh = SphereMesh::new(48, 48, 10.0).unwrap();
        assert_eq!(mesh.strip_vertex_count(), 98 * 48 - 2);
        assert_eq!(mesh.strip_vertex_count() as usize, mesh.vertices().len() - 2);
        // a single stack still draws all of its pairs
        let single = SphereMesh::new(1, 2, 1.0).unwrap();
        assert_eq!(single.strip_vertex_count(), 4);
    }

    #[test]
    fn test_every_stack_is_drawn() {
        for (stacks, slices) in [(2, 3), (5, 7), (48, 48)] {
            let mesh = SphereMesh::new(stacks, slices, 10.0).unwrap();
            let count = mesh.strip_vertex_count() as usize;
            let v = mesh.vertices();
            let stride = (slices * 2 + 2) as usize;
            for stack in 0..stacks as usize {
                let start = stack * stride;
                let end = start + (slices * 2) as usize;
                let drawn = (start..end - 2).filter(|&i| i + 2 < count).any(|i| {
                    (v[i + 1] - v[i]).cross(v[i + 2] - v[i]).length() > 1e-6
                });
                assert!(drawn, "stack {} of {}x{} not drawn", stack, stacks, slices);
            }
        }
    }

    #[test]
    fn test_normals_are_unit() {
        let mesh = SphereMesh::new(12, 17, 3.5).unwrap();
        for n in mesh.normals() {
            assert!((n.length() - 1.0).abs() < 1e-5, "normal {:?}", n);
        }
        for (v, n) in mesh.vertices().iter().zip(mesh.normals()) {
            assert!((*v - *n * 3.5).length() < 1e-4);
        }
    }

    #[test]
    fn test_tex_coords_range() {
        let slices = 9;
        let mesh = SphereMesh::new(4, slices, 1.0).unwrap();
        for t in mesh.tex_coords() {
            assert!((0.0..=1.0).contains(&t.x));
            assert!((0.0..=1.0).contains(&t.y));
        }
        let row = mesh.tex_coords();
        assert_eq!(row[0].x, 1.0);
        assert_eq!(row[((slices - 1) * 2) as usize].x, 0.0);
        assert_eq!(row[0].y, 0.0);
        assert_eq!(row[1].y, 0.25);
    }

    #[test]
    fn test_first_vertex_is_south_pole() {
        let mesh = SphereMesh::new(2, 3, 1.0).unwrap();
        let phi = -FRAC_PI_2;
        let expected = Vec3::new(
            phi.cos() * FRAC_PI_2.cos(),
            phi.sin(),
            phi.cos() * FRAC_PI_2.sin(),
        );
        assert!((mesh.vertices()[0] - expected).length() < 1e-5);
        // the upper vertex of the first pair sits on the equator
        let upper = mesh.vertices()[1];
        assert!(upper.y.abs() < 1e-5);
        assert!((upper.z - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_mid_latitude_ring() {
        // with 4 stacks the second stack starts at -pi/4
        let mesh = SphereMesh::new(4, 3, 1.0).unwrap();
        let first_of_stack = (3 * 2 + 2) as usize;
        let v = mesh.vertices()[first_of_stack];
        let phi = -FRAC_PI_4;
        assert!((v.y - phi.sin()).abs() < 1e-5);
        assert!((v.z - phi.cos()).abs() < 1e-5);
        assert!(v.x.abs() < 1e-5);
    }

    #[test]
    fn test_components_rounded_to_six_digits() {
        let mesh = SphereMesh::new(7, 11, 1.0).unwrap();
        for v in mesh.vertices() {
            for c in v.to_array() {
                let scaled = c as f64 * 1e6;
                assert!((scaled - scaled.round()).abs() < 0.1, "{} not rounded", c);
            }
        }
    }

    #[test]
    fn test_degenerate_vertices_repeat_last() {
        let slices = 5;
        let mesh = SphereMesh::new(3, slices, 2.0).unwrap();
        let stride = (slices * 2 + 2) as usize;
        for stack in 0..3 {
            let last = stack * stride + (slices * 2) as usize - 1;
            assert_eq!(mesh.vertices()[last + 1], mesh.vertices()[last]);
            assert_eq!(mesh.vertices()[last + 2], mesh.vertices()[last]);
            assert_eq!(mesh.tex_coords()[last + 2], mesh.tex_coords()[last]);
        }
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(SphereMesh::new(0, 4, 1.0).is_err());
        assert!(SphereMesh::new(4, 1, 1.0).is_err());
        assert!(SphereMesh::new(4, 4, 0.0).is_err());
        assert!(SphereMesh::new(4, 4, f32::NAN).is_err());
        let err = SphereMesh::new(0, 1, 1.0).unwrap_err();
        assert_eq!(err.stacks, 0);
        assert_eq!(err.slices, 1);
    }

    #[test]
    fn test_untextured_size_and_failed_swap() {
        let mut mesh = SphereMesh::new(2, 3, 1.0).unwrap();
        let mut loader = ImageTextureLoader::new(None);
        assert_eq!(mesh.texture_size(), Vec2::ZERO);

        let result = mesh.set_texture_from_path(Path::new("/nonexistent/pano.jpg"), &mut loader);
        assert!(matches!(result, Err(TextureLoadError::NotFound(_))));
        assert!(mesh.texture().is_none());
        assert_eq!(mesh.texture_size(), Vec2::ZERO);
    }

    #[test]
    fn test_swap_releases_previous_texture() {
        let mut mesh = SphereMesh::new(2, 3, 1.0).unwrap();
        let mut loader = ImageTextureLoader::new(None);

        mesh.set_texture_from_image(RgbaImage::new(64, 32), &mut loader).unwrap();
        assert_eq!(mesh.texture_size(), Vec2::new(64.0, 32.0));
        mesh.set_texture_from_image(RgbaImage::new(128, 64), &mut loader).unwrap();
        assert_eq!(mesh.texture_size(), Vec2::new(128.0, 64.0));
        assert_eq!(loader.len(), 1);

        // a failed swap still drops the old texture
        assert!(mesh.set_texture_from_image(RgbaImage::new(0, 0), &mut loader).is_err());
        assert!(mesh.texture().is_none());
        assert!(loader.is_empty());
    }

    #[test]
    fn test_execute_submits_strip() {
        let mesh = SphereMesh::new(4, 6, 10.0).unwrap();
        let mut recorder = DrawRecorder::default();
        mesh.execute(&mut recorder, Mat4::IDENTITY, Mat4::IDENTITY);

        assert_eq!(recorder.draws.len(), 1);
        let draw = &recorder.draws[0];
        assert_eq!(draw.state.primitive, Primitive::TriangleStrip);
        assert!(!draw.state.textured);
        assert_eq!(draw.vertex_count, mesh.strip_vertex_count());
    }
}
