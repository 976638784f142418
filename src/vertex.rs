use bytemuck::{Pod, Zeroable};
use wgpu::{BufferAddress, VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode};

/// Shader location of [`Vertex::position`]
pub const POSITION_LOCATION: u32 = 0;
/// Shader location of [`Vertex::tex_coords`]
pub const TEX_COORDS_LOCATION: u32 = 1;

/// A single vertex of a sprite quad
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
}

impl Vertex {
    pub const SIZE: BufferAddress = size_of::<Self>() as BufferAddress;
    /// Byte offset of `tex_coords` inside a vertex
    pub const TEX_COORDS_OFFSET: BufferAddress = size_of::<[f32; 2]>() as BufferAddress;

    /// - `position`: `[x, y]` in world space
    /// - `tex_coords`: `[u, v]` in normalized (0–1) texture space
    pub fn new(position: [f32; 2], tex_coords: [f32; 2]) -> Self {
        Self {
            position,
            tex_coords,
        }
    }

    /// Returns the vertex buffer layout
    ///
    /// This must match the vertex shader input layout:
    /// - location 0: `vec2<f32>` (position)
    /// - location 1: `vec2<f32>` (texture coordinates)
    pub fn desc() -> VertexBufferLayout<'static> {
        VertexBufferLayout {
            array_stride: Self::SIZE,
            step_mode: VertexStepMode::Vertex,
            attributes: &[
                VertexAttribute {
                    offset: 0,
                    shader_location: POSITION_LOCATION,
                    format: VertexFormat::Float32x2,
                },
                VertexAttribute {
                    offset: Self::TEX_COORDS_OFFSET,
                    shader_location: TEX_COORDS_LOCATION,
                    format: VertexFormat::Float32x2,
                },
            ],
        }
    }
}
