//! GPU textures and texture creation utilities.
//!
//! [`Texture`] wraps a wgpu texture together with its default view and an
//! optional sampler. Besides image textures this module creates the main
//! depth-stencil buffer, shadow maps (2D and cube) and skybox cubemaps.

use anyhow::{Context as _, Result, bail};
use image::{GenericImageView, ImageFormat, load_from_memory_with_format};

/// What a material texture is used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TextureKind {
    Diffuse,
    Specular,
}

impl TextureKind {
    pub const ALL: [TextureKind; 2] = [TextureKind::Diffuse, TextureKind::Specular];

    /// Colour used when a mesh has no texture of this kind: diffuse keeps the
    /// lighting unchanged, specular turns highlights off.
    pub fn fallback_rgba(&self) -> [u8; 4] {
        match self {
            Self::Diffuse => [255, 255, 255, 255],
            Self::Specular => [0, 0, 0, 255],
        }
    }

    /// Colour data is authored in sRGB, specular intensities are linear.
    pub fn is_srgb(&self) -> bool {
        matches!(self, Self::Diffuse)
    }
}

/// A GPU texture with a view and optional sampler.
#[derive(Clone, Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
}

impl Texture {
    /// Depth buffer of the main pass. The stencil part is used for outlines.
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;
    /// Shadow maps are sampled, so they need a plain float depth format.
    pub const SHADOW_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            sampler: None,
        }
    }

    /// Depth target for a directional light. Sampled with a comparison
    /// sampler; texels outside the map are clamped to the edge.
    pub fn create_shadow_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::SHADOW_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            sampler: Some(create_shadow_sampler(device)),
        }
    }

    /// Six-layer depth texture viewed as a cube, for omni-directional shadows.
    /// Render into single faces through [`Texture::layer_view`].
    pub fn create_cube_depth_texture(device: &wgpu::Device, size: u32, label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size.max(1),
            height: size.max(1),
            depth_or_array_layers: 6,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::SHADOW_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            array_layer_count: Some(6),
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler: Some(create_shadow_sampler(device)),
        }
    }

    pub fn layer_view(&self, layer: u32) -> wgpu::TextureView {
        self.texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("texture layer view"),
            dimension: Some(wgpu::TextureViewDimension::D2),
            base_array_layer: layer,
            array_layer_count: Some(1),
            ..Default::default()
        })
    }

    /// 1x1 texture of a single colour.
    pub fn solid(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: [u8; 4],
        srgb: bool,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: colour_format(srgb),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Texture {
            texture,
            view,
            sampler: Some(create_default_sampler(device)),
        }
    }

    /// Load a texture from the contents of an image file.
    ///
    /// `format` is a file extension hint ("png", "jpg"); without it the format
    /// is guessed from the data.
    pub fn from_bytes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bytes: &[u8],
        label: &str,
        format: Option<&str>,
        srgb: bool,
    ) -> Result<Self> {
        let img = match format.and_then(ImageFormat::from_extension) {
            None => image::load_from_memory(bytes),
            Some(fmt) => load_from_memory_with_format(bytes, fmt),
        }
        .with_context(|| format!("Could not decode image {label}"))?;
        Self::from_image(device, queue, &img, Some(label), srgb)
    }

    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::DynamicImage,
        label: Option<&str>,
        srgb: bool,
    ) -> Result<Self> {
        let dimensions = img.dimensions();
        if dimensions.0 == 0 || dimensions.1 == 0 {
            bail!("Image {} is empty", label.unwrap_or("<unnamed>"));
        }
        let rgba = img.to_rgba8();

        let size = wgpu::Extent3d {
            width: dimensions.0,
            height: dimensions.1,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: colour_format(srgb),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * dimensions.0),
                rows_per_image: Some(dimensions.1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(Self {
            texture,
            view,
            sampler: Some(create_default_sampler(device)),
        })
    }

    /// Builds a cubemap from six faces in the order right, left, top,
    /// bottom, front, back (+X, -X, +Y, -Y, +Z, -Z).
    pub fn cubemap_from_images(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        faces: &[image::DynamicImage],
        label: &str,
    ) -> Result<Self> {
        let dims: Vec<(u32, u32)> = faces.iter().map(|f| f.dimensions()).collect();
        let side = cube_face_size(&dims).with_context(|| format!("Invalid cubemap {label}"))?;

        let size = wgpu::Extent3d {
            width: side,
            height: side,
            depth_or_array_layers: 6,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (layer, face) in faces.iter().enumerate() {
            let rgba = face.to_rgba8();
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: layer as u32,
                    },
                },
                &rgba,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * side),
                    rows_per_image: Some(side),
                },
                wgpu::Extent3d {
                    width: side,
                    height: side,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            array_layer_count: Some(6),
            ..Default::default()
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("cubemap sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Ok(Self {
            texture,
            view,
            sampler: Some(sampler),
        })
    }
}

fn colour_format(srgb: bool) -> wgpu::TextureFormat {
    if srgb {
        wgpu::TextureFormat::Rgba8UnormSrgb
    } else {
        wgpu::TextureFormat::Rgba8Unorm
    }
}

/// Side length shared by six square cube faces.
pub fn cube_face_size(dims: &[(u32, u32)]) -> Result<u32> {
    if dims.len() != 6 {
        bail!("a cubemap needs 6 faces, got {}", dims.len());
    }
    let (w, h) = dims[0];
    if w == 0 || w != h {
        bail!("cubemap faces must be square, first face is {w}x{h}");
    }
    if let Some((i, d)) = dims.iter().enumerate().find(|(_, d)| **d != (w, h)) {
        bail!("cubemap face {i} is {}x{}, expected {w}x{h}", d.0, d.1);
    }
    Ok(w)
}

pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::MipmapFilterMode::Linear,
        ..Default::default()
    })
}

pub fn create_shadow_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("shadow sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        compare: Some(wgpu::CompareFunction::LessEqual),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallbacks_keep_lighting_neutral() {
        assert_eq!(TextureKind::Diffuse.fallback_rgba(), [255; 4]);
        assert_eq!(TextureKind::Specular.fallback_rgba(), [0, 0, 0, 255]);
    }

    #[test]
    fn cube_faces_must_be_six_equal_squares() {
        assert_eq!(cube_face_size(&[(512, 512); 6]).unwrap(), 512);
        assert!(cube_face_size(&[(512, 512); 5]).is_err());
        assert!(cube_face_size(&[(512, 256); 6]).is_err());

        let mut dims = [(64, 64); 6];
        dims[4] = (32, 32);
        let err = cube_face_size(&dims).unwrap_err();
        assert!(err.to_string().contains("face 4"));
    }
}
