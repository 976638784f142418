use std::rc::Rc;

use glam::Mat4;
use wgpu::{
    Buffer, BufferAddress, BufferUsages, Device, IndexFormat, Queue, RenderPass,
    util::{BufferInitDescriptor, DeviceExt},
};

use crate::{
    atlas::SpriteAtlas,
    error::{Error, Result},
    program::SpriteProgram,
    texture::Texture,
    vertex::{POSITION_LOCATION, TEX_COORDS_LOCATION, Vertex},
};

const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

/// Where a sprite's inputs live in its program
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpriteBindings {
    pub position: u32,
    pub tex_coords: u32,
    pub view_proj: u32,
    pub texture: u32,
}

impl SpriteBindings {
    /// Looks up the sprite shader's attribute & uniform names in `program`
    pub fn resolve(program: &SpriteProgram) -> Result<Self> {
        Ok(Self {
            position: program.attribute_location("a_position")?,
            tex_coords: program.attribute_location("a_tex_coord")?,
            view_proj: program.uniform_location("u_view_proj")?,
            texture: program.uniform_location("u_texture")?,
        })
    }
}

/// CPU-side geometry of a sprite: a quad centered on the origin plus its current frame
///
/// Positions are fixed when the quad is built, from the pixel size of the first frame.
/// Frames of a different size are scaled into that footprint. Only texture coordinates
/// change afterwards
#[derive(Clone, Debug)]
pub struct SpriteQuad {
    vertices: [Vertex; 4],
    frame: String,
    atlas: Rc<SpriteAtlas>,
    uvs_dirty: bool,
}

impl SpriteQuad {
    pub fn new<S: AsRef<str>>(frame_names: &[S], atlas: Rc<SpriteAtlas>) -> Result<Self> {
        let first = frame_names.first().ok_or(Error::EmptySequence)?.as_ref();
        if let Some(missing) = frame_names
            .iter()
            .map(AsRef::as_ref)
            .find(|name| !atlas.contains(name))
        {
            return Err(Error::UnknownFrame(missing.to_string()));
        }
        let frame = atlas
            .get(first)
            .ok_or_else(|| Error::UnknownFrame(first.to_string()))?;

        let (hw, hh) = (frame.rect.width as f32 / 2.0, frame.rect.height as f32 / 2.0);
        // world space is Y-up: the top edge samples v0
        let positions = [[-hw, hh], [hw, hh], [hw, -hh], [-hw, -hh]];
        let uvs = frame.uv.corners();
        let vertices = std::array::from_fn(|i| Vertex::new(positions[i], uvs[i]));

        Ok(Self {
            vertices,
            frame: first.to_string(),
            atlas,
            uvs_dirty: false,
        })
    }

    /// Points the quad at another atlas frame, rewriting only texture coordinates
    ///
    /// On error nothing changes
    pub fn set_texture_rect(&mut self, name: &str) -> Result<()> {
        if name == self.frame {
            return Ok(());
        }
        let uv = self
            .atlas
            .uv(name)
            .ok_or_else(|| Error::UnknownFrame(name.to_string()))?;

        for (vertex, tex_coords) in self.vertices.iter_mut().zip(uv.corners()) {
            vertex.tex_coords = tex_coords;
        }
        self.frame.clear();
        self.frame.push_str(name);
        self.uvs_dirty = true;
        Ok(())
    }

    pub fn current_frame(&self) -> &str {
        &self.frame
    }

    /// Vertices in order top-left, top-right, bottom-right, bottom-left
    pub fn vertices(&self) -> &[Vertex; 4] {
        &self.vertices
    }

    /// On-screen size in world units
    pub fn size(&self) -> [f32; 2] {
        let [tr, bl] = [self.vertices[1].position, self.vertices[3].position];
        [tr[0] - bl[0], tr[1] - bl[1]]
    }

    /// Byte offset & value of each vertex's texture coordinates within the vertex buffer
    pub fn uv_spans(&self) -> impl Iterator<Item = (BufferAddress, [f32; 2])> + '_ {
        self.vertices.iter().enumerate().map(|(i, v)| {
            (
                i as BufferAddress * Vertex::SIZE + Vertex::TEX_COORDS_OFFSET,
                v.tex_coords,
            )
        })
    }

    pub fn uvs_dirty(&self) -> bool {
        self.uvs_dirty
    }
}

/// An animated sprite drawn from a texture atlas
///
/// Owns its vertex & index buffers; shares the program, texture & atlas
pub struct Sprite {
    quad: SpriteQuad,
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    program: Rc<SpriteProgram>,
    texture: Rc<Texture>,
    bindings: SpriteBindings,
}

impl Sprite {
    pub fn new<S: AsRef<str>>(
        device: &Device,
        program: Rc<SpriteProgram>,
        frame_names: &[S],
        atlas: Rc<SpriteAtlas>,
        bindings: SpriteBindings,
        texture: Rc<Texture>,
    ) -> Result<Self> {
        if (bindings.position, bindings.tex_coords) != (POSITION_LOCATION, TEX_COORDS_LOCATION) {
            return Err(Error::init(
                "sprite",
                format!(
                    "program expects position @{} & tex coords @{}, vertex layout provides @{} & @{}",
                    bindings.position, bindings.tex_coords, POSITION_LOCATION, TEX_COORDS_LOCATION
                ),
            ));
        }

        let quad = SpriteQuad::new(frame_names, atlas)?;

        let vertex_buffer = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("Sprite Vertex Buffer"),
            contents: bytemuck::cast_slice(quad.vertices()),
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
        });
        let index_buffer = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("Sprite Index Buffer"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: BufferUsages::INDEX,
        });

        let [w, h] = quad.size();
        log::debug!("sprite `{}` is {w}x{h}", quad.current_frame());

        Ok(Self {
            quad,
            vertex_buffer,
            index_buffer,
            program,
            texture,
            bindings,
        })
    }

    /// See [`SpriteQuad::set_texture_rect`]; the GPU copy is refreshed on the next draw
    pub fn set_texture_rect(&mut self, name: &str) -> Result<()> {
        self.quad.set_texture_rect(name)
    }

    pub fn current_frame(&self) -> &str {
        self.quad.current_frame()
    }

    pub fn quad(&self) -> &SpriteQuad {
        &self.quad
    }

    // Writes only the tex_coords span of each vertex; positions are never re-uploaded
    fn upload(&mut self, queue: &Queue) {
        if !self.quad.uvs_dirty {
            return;
        }
        for (offset, tex_coords) in self.quad.uv_spans() {
            queue.write_buffer(
                &self.vertex_buffer,
                offset,
                bytemuck::cast_slice(&tex_coords),
            );
        }
        self.quad.uvs_dirty = false;
    }

    /// Records one quad into `pass` using `view_proj` as the camera transform
    ///
    /// Every binding the draw needs is set here; nothing is assumed from earlier draws.
    /// Uniform & UV writes go through `queue`, so they land before the pass is submitted
    pub fn draw(&mut self, pass: &mut RenderPass<'_>, queue: &Queue, view_proj: Mat4) {
        self.upload(queue);
        self.program.upload_view_proj(queue, view_proj);

        self.program.bind(pass, self.bindings.view_proj);
        self.texture.bind(pass, self.bindings.texture);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), IndexFormat::Uint16);
        pass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::{AtlasMetadata, AtlasSize, FrameRect, parse_atlas};

    fn rect(name: &str, x: u32, y: u32, width: u32, height: u32) -> FrameRect {
        FrameRect {
            name: name.to_string(),
            x,
            y,
            width,
            height,
        }
    }

    fn atlas() -> Rc<SpriteAtlas> {
        let meta = AtlasMetadata::from_frames(
            [
                rect("A", 0, 0, 10, 10),
                rect("B", 10, 0, 10, 10),
                rect("tall", 20, 0, 10, 20),
            ],
            None,
        );
        Rc::new(parse_atlas(&meta, &["A", "B", "tall"], AtlasSize::new(40, 20)).unwrap())
    }

    fn position_bits(quad: &SpriteQuad) -> Vec<u32> {
        quad.vertices()
            .iter()
            .flat_map(|v| v.position)
            .map(f32::to_bits)
            .collect()
    }

    #[test]
    fn quad_is_sized_by_first_frame() {
        let quad = SpriteQuad::new(&["A", "B"], atlas()).unwrap();
        assert_eq!(quad.size(), [10.0, 10.0]);
        assert_eq!(quad.current_frame(), "A");
        assert_eq!(quad.vertices()[0].position, [-5.0, 5.0]);
        assert_eq!(quad.vertices()[2].position, [5.0, -5.0]);
    }

    #[test]
    fn top_vertices_sample_top_of_frame() {
        let quad = SpriteQuad::new(&["B"], atlas()).unwrap();
        let [tl, tr, br, bl] = quad.vertices().map(|v| v.tex_coords);
        assert_eq!(tl, [0.25, 0.0]);
        assert_eq!(tr, [0.5, 0.0]);
        assert_eq!(br, [0.5, 0.5]);
        assert_eq!(bl, [0.25, 0.5]);
    }

    #[test]
    fn set_texture_rect_only_touches_uvs() {
        let mut quad = SpriteQuad::new(&["A", "B", "tall"], atlas()).unwrap();
        let before = position_bits(&quad);

        quad.set_texture_rect("B").unwrap();
        assert_eq!(quad.vertices()[0].tex_coords, [0.25, 0.0]);
        quad.set_texture_rect("tall").unwrap();
        assert_eq!(quad.vertices()[2].tex_coords, [0.75, 1.0]);

        // a differently sized frame keeps the first frame's footprint
        assert_eq!(position_bits(&quad), before);
        assert_eq!(quad.current_frame(), "tall");
    }

    #[test]
    fn unknown_frame_leaves_quad_untouched() {
        let mut quad = SpriteQuad::new(&["A", "B"], atlas()).unwrap();
        quad.set_texture_rect("B").unwrap();
        let before = *quad.vertices();

        let err = quad.set_texture_rect("does-not-exist").unwrap_err();
        assert!(matches!(err, Error::UnknownFrame(ref name) if name == "does-not-exist"));
        assert_eq!(*quad.vertices(), before);
        assert_eq!(quad.current_frame(), "B");
    }

    #[test]
    fn uv_spans_skip_positions() {
        let quad = SpriteQuad::new(&["A"], atlas()).unwrap();
        let offsets: Vec<_> = quad.uv_spans().map(|(offset, _)| offset).collect();
        assert_eq!(offsets, [8, 24, 40, 56]);

        for offset in offsets {
            let slot = offset % Vertex::SIZE;
            assert_eq!(slot, Vertex::TEX_COORDS_OFFSET);
            assert_eq!(offset % wgpu::COPY_BUFFER_ALIGNMENT, 0);
        }
    }

    #[test]
    fn only_real_changes_mark_uvs_dirty() {
        let mut quad = SpriteQuad::new(&["A", "B"], atlas()).unwrap();
        assert!(!quad.uvs_dirty());
        quad.set_texture_rect("A").unwrap();
        assert!(!quad.uvs_dirty());
        quad.set_texture_rect("B").unwrap();
        assert!(quad.uvs_dirty());
    }

    #[test]
    fn construction_validates_frames() {
        assert!(matches!(
            SpriteQuad::new::<&str>(&[], atlas()),
            Err(Error::EmptySequence)
        ));
        assert!(matches!(
            SpriteQuad::new(&["A", "C"], atlas()),
            Err(Error::UnknownFrame(ref name)) if name == "C"
        ));
    }
}
