use std::{borrow::Cow, path::Path};

use glam::Mat4;
use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BindingType, BlendState, Buffer, BufferBindingType, BufferUsages,
    ColorTargetState, ColorWrites, Device, ErrorFilter, FragmentState, PipelineLayoutDescriptor,
    Queue, RenderPass, RenderPipeline, RenderPipelineDescriptor, SamplerBindingType,
    ShaderModuleDescriptor, ShaderSource, ShaderStages, TextureFormat, TextureSampleType,
    TextureViewDimension, VertexState,
    util::{BufferInitDescriptor, DeviceExt},
};

use crate::{
    error::{Error, Result},
    vertex::{POSITION_LOCATION, TEX_COORDS_LOCATION, Vertex},
};

/// Bind group index of the sprite texture & sampler
pub const TEXTURE_GROUP: u32 = 0;
/// Bind group index of the view-projection uniform
pub const CAMERA_GROUP: u32 = 1;

const DEFAULT_SHADER: &str = include_str!("../shader.wgsl");

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

/// WGSL source plus the entry points to link as vertex & fragment stages
#[derive(Clone, Debug)]
pub struct ProgramSource {
    pub label: String,
    pub wgsl: Cow<'static, str>,
    pub vertex_entry: String,
    pub fragment_entry: String,
}

impl Default for ProgramSource {
    fn default() -> Self {
        Self {
            label: "sprite.wgsl".to_string(),
            wgsl: Cow::Borrowed(DEFAULT_SHADER),
            vertex_entry: "vs_main".to_string(),
            fragment_entry: "fs_main".to_string(),
        }
    }
}

impl ProgramSource {
    /// Reads WGSL from disk, keeping the default entry point names
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let label = path.display().to_string();
        let wgsl = std::fs::read_to_string(path)
            .map_err(|e| Error::init(format!("shader `{label}`"), e))?;

        Ok(Self {
            label,
            wgsl: Cow::Owned(wgsl),
            ..Default::default()
        })
    }
}

/// Names the shader interface exposes, mapped to their wgpu locations
///
/// Attributes resolve to vertex shader locations, uniforms to bind group indices
#[derive(Clone, Copy, Debug)]
pub struct ProgramInterface {
    attributes: &'static [(&'static str, u32)],
    uniforms: &'static [(&'static str, u32)],
}

pub const SPRITE_INTERFACE: ProgramInterface = ProgramInterface {
    attributes: &[
        ("a_position", POSITION_LOCATION),
        ("a_tex_coord", TEX_COORDS_LOCATION),
    ],
    uniforms: &[("u_texture", TEXTURE_GROUP), ("u_view_proj", CAMERA_GROUP)],
};

impl ProgramInterface {
    pub fn attribute_location(&self, name: &str) -> Result<u32> {
        lookup(self.attributes, name, "attribute")
    }

    pub fn uniform_location(&self, name: &str) -> Result<u32> {
        lookup(self.uniforms, name, "uniform")
    }
}

fn lookup(table: &[(&str, u32)], name: &str, kind: &str) -> Result<u32> {
    table
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, loc)| *loc)
        .ok_or_else(|| Error::init("shader program", format!("no {kind} named `{name}`")))
}

/// A compiled & linked sprite shader program
///
/// Owns the render pipeline, its bind group layouts & the camera uniform buffer.
/// Shared read-only by every sprite drawn with it
pub struct SpriteProgram {
    pipeline: RenderPipeline,
    texture_layout: BindGroupLayout,
    camera_buffer: Buffer,
    camera_bind_group: BindGroup,
    interface: ProgramInterface,
}

impl SpriteProgram {
    /// Compiles `source` & builds an alpha-blended pipeline targeting `surface_format`
    ///
    /// Shader validation errors are caught with an error scope & returned instead of
    /// reaching the device's uncaptured error handler
    pub async fn new(
        device: &Device,
        surface_format: TextureFormat,
        source: &ProgramSource,
    ) -> Result<Self> {
        device.push_error_scope(ErrorFilter::Validation);

        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some(source.label.as_str()),
            source: ShaderSource::Wgsl(source.wgsl.clone()),
        });

        let texture_layout = create_texture_bind_group_layout(device);
        let camera_layout = create_camera_bind_group_layout(device);

        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Sprite Pipeline Layout"),
            // order must follow TEXTURE_GROUP & CAMERA_GROUP
            bind_group_layouts: &[&texture_layout, &camera_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Sprite Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some(source.vertex_entry.as_str()),
                buffers: &[Vertex::desc()],
                compilation_options: Default::default(),
            },
            primitive: Default::default(),
            depth_stencil: None,
            multisample: Default::default(),
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some(source.fragment_entry.as_str()),
                targets: &[Some(ColorTargetState {
                    format: surface_format,
                    blend: Some(BlendState::ALPHA_BLENDING),
                    write_mask: ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            multiview: None,
            cache: None,
        });

        if let Some(err) = device.pop_error_scope().await {
            return Err(Error::init(
                format!("shader program `{}`", source.label),
                err,
            ));
        }

        let camera_buffer = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("Camera Uniform"),
            contents: bytemuck::bytes_of(&CameraUniform {
                view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            }),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });
        let camera_bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &camera_layout,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        log::debug!("linked shader program `{}`", source.label);

        Ok(Self {
            pipeline,
            texture_layout,
            camera_buffer,
            camera_bind_group,
            interface: SPRITE_INTERFACE,
        })
    }

    pub fn attribute_location(&self, name: &str) -> Result<u32> {
        self.interface.attribute_location(name)
    }

    pub fn uniform_location(&self, name: &str) -> Result<u32> {
        self.interface.uniform_location(name)
    }

    /// Layout textures must be created with to be sampled by this program
    pub fn texture_layout(&self) -> &BindGroupLayout {
        &self.texture_layout
    }

    /// Writes the view-projection matrix into the camera uniform
    pub fn upload_view_proj(&self, queue: &Queue, view_proj: Mat4) {
        let uniform = CameraUniform {
            view_proj: view_proj.to_cols_array_2d(),
        };
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    /// Sets the pipeline & binds the camera uniform at `camera_group`
    pub(crate) fn bind(&self, pass: &mut RenderPass<'_>, camera_group: u32) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(camera_group, &self.camera_bind_group, &[]);
    }
}

/// Creates the bind group layout for texture sampling
///
/// Defines two bindings:
/// - Binding 0: 2D texture (fragment shader)
/// - Binding 1: Sampler (fragment shader)
fn create_texture_bind_group_layout(device: &Device) -> BindGroupLayout {
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("Texture Bind Group Layout"),
        entries: &[
            BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Texture {
                    sample_type: TextureSampleType::Float { filterable: true },
                    view_dimension: TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            BindGroupLayoutEntry {
                binding: 1,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Sampler(SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

fn create_camera_bind_group_layout(device: &Device) -> BindGroupLayout {
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("Camera Bind Group Layout"),
        entries: &[BindGroupLayoutEntry {
            binding: 0,
            visibility: ShaderStages::VERTEX,
            ty: BindingType::Buffer {
                ty: BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}
