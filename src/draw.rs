//! Seam between the core and whatever rasterizes it.
//!
//! Every [`DrawCommand`] carries its complete [`DrawState`]; a backend applies
//! it for that command only, so nothing leaks from one draw into the next.

use glam::{Mat4, Vec2, Vec3};

use crate::texture::TextureInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    TriangleStrip,
    LineStrip,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawState {
    pub primitive: Primitive,
    pub textured: bool,
    pub normals: bool,
    pub blend: bool,
    /// Material emission; the panorama is drawn at full colour.
    pub emission: [f32; 4],
    pub color: [f32; 4],
    pub line_width: f32,
}

impl DrawState {
    pub const fn panorama(textured: bool) -> Self {
        Self {
            primitive: Primitive::TriangleStrip,
            textured,
            normals: true,
            blend: true,
            emission: [1.0, 1.0, 1.0, 1.0],
            color: [1.0, 1.0, 1.0, 1.0],
            line_width: 1.0,
        }
    }

    pub const fn hotspot(line_width: f32) -> Self {
        Self {
            primitive: Primitive::LineStrip,
            textured: false,
            normals: false,
            blend: true,
            emission: [0.0, 0.0, 0.0, 0.0],
            color: [1.0, 1.0, 1.0, 0.5],
            line_width,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Geometry<'a> {
    /// Sphere strip; only the first `count` vertices are drawn.
    Strip {
        vertices: &'a [Vec3],
        normals: &'a [Vec3],
        tex_coords: &'a [Vec2],
        count: u32,
        texture: Option<TextureInfo>,
    },
    Lines(&'a [Vec3]),
}

impl Geometry<'_> {
    pub fn vertex_count(&self) -> u32 {
        match self {
            Geometry::Strip { count, .. } => *count,
            Geometry::Lines(points) => points.len() as u32,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DrawCommand<'a> {
    pub state: DrawState,
    pub projection: Mat4,
    pub model_view: Mat4,
    pub geometry: Geometry<'a>,
}

pub trait RenderBackend {
    fn submit(&mut self, command: DrawCommand<'_>);
}

/// Owned summary of one submitted command.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub state: DrawState,
    pub projection: Mat4,
    pub model_view: Mat4,
    pub vertex_count: u32,
    pub texture: Option<TextureInfo>,
    /// Line points; empty for strips.
    pub points: Vec<Vec3>,
}

/// Backend that only remembers what it was asked to draw.
#[derive(Debug, Default)]
pub struct DrawRecorder {
    pub draws: Vec<RecordedDraw>,
}

impl RenderBackend for DrawRecorder {
    fn submit(&mut self, command: DrawCommand<'_>) {
        let (texture, points) = match command.geometry {
            Geometry::Strip { texture, .. } => (texture, Vec::new()),
            Geometry::Lines(points) => (None, points.to_vec()),
        };
        self.draws.push(RecordedDraw {
            state: command.state,
            projection: command.projection,
            model_view: command.model_view,
            vertex_count: command.geometry.vertex_count(),
            texture,
            points,
        });
    }
}
