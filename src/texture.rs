use std::path::Path;

use wgpu::{
    AddressMode, BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout,
    BindingResource, Device, Extent3d, FilterMode, Origin3d, Queue, RenderPass,
    SamplerDescriptor, TexelCopyBufferLayout, TexelCopyTextureInfo, TextureAspect,
    TextureDescriptor, TextureDimension, TextureFormat, TextureUsages,
};

use crate::{
    atlas::AtlasSize,
    error::{Error, Result},
};

/// A GPU texture that can be bound in shaders for rendering
///
/// Wraps a `wgpu::Texture`, its view, sampler & bind group. Sampling is nearest-neighbour
/// with clamp-to-edge addressing so atlas frames never bleed into their neighbours
pub struct Texture {
    bind_group: BindGroup,
    size: AtlasSize,
}

impl Texture {
    /// Creates a new texture from raw RGBA image data,
    /// uploads the data, & builds the bind group using the layout
    ///
    /// - `data`: Must be in tightly packed 8-bit RGBA format
    /// - `width`, `height`: Dimensions of the image in pixels
    pub fn from_rgba(
        device: &Device,
        queue: &Queue,
        layout: &BindGroupLayout,
        data: &[u8],
        width: u32,
        height: u32,
    ) -> Self {
        let extent = Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&TextureDescriptor {
            label: Some("Sprite Atlas"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TextureFormat::Rgba8UnormSrgb,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::All,
            },
            data,
            TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            extent,
        );

        let view = texture.create_view(&Default::default());
        let sampler = device.create_sampler(&SamplerDescriptor {
            label: Some("Sprite Atlas Sampler"),
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            address_mode_w: AddressMode::ClampToEdge,
            mag_filter: FilterMode::Nearest,
            min_filter: FilterMode::Nearest,
            mipmap_filter: FilterMode::Nearest,
            ..Default::default()
        });
        let bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: None,
            layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: BindingResource::TextureView(&view),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: BindingResource::Sampler(&sampler),
                },
            ],
        });

        Self {
            bind_group,
            size: AtlasSize::new(width, height),
        }
    }

    /// Decodes encoded image bytes (PNG) & uploads them
    pub fn from_image_bytes(
        device: &Device,
        queue: &Queue,
        layout: &BindGroupLayout,
        bytes: &[u8],
        label: &str,
    ) -> Result<Self> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| Error::init(label, e))?
            .to_rgba8();
        let (w, h) = img.dimensions();
        Ok(Self::from_rgba(device, queue, layout, &img, w, h))
    }

    /// Reads an image file from disk & uploads it
    pub fn load(
        device: &Device,
        queue: &Queue,
        layout: &BindGroupLayout,
        path: impl AsRef<Path>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let label = format!("texture `{}`", path.display());
        let bytes = std::fs::read(path).map_err(|e| Error::init(&label, e))?;
        let texture = Self::from_image_bytes(device, queue, layout, &bytes, &label)?;
        log::info!(
            "loaded {label} ({}x{})",
            texture.size.width,
            texture.size.height
        );
        Ok(texture)
    }

    /// Pixel dimensions of the uploaded image
    pub fn size(&self) -> AtlasSize {
        self.size
    }

    /// Binds this texture at the given group index in the render pass
    ///
    /// - `index` must match the bind group index used in the pipeline layout
    pub fn bind(&self, pass: &mut RenderPass<'_>, index: u32) {
        pass.set_bind_group(index, &self.bind_group, &[]);
    }
}
