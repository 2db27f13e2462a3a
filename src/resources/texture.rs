use anyhow::{Context as _, Result};

use crate::{data_structures::texture::Texture, resources::Assets};

/// Skybox face files in cubemap layer order.
pub const SKYBOX_FACES: [&str; 6] = [
    "right.jpg",
    "left.jpg",
    "top.jpg",
    "bottom.jpg",
    "front.jpg",
    "back.jpg",
];

/// Material layout: diffuse texture and sampler at 0 and 1, specular at 2
/// and 3.
pub fn diffuse_specular_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("Material bind group layout"),
    })
}

/// Layout for a single filterable texture of `dimension` with its sampler,
/// used by the skybox and the depth-map debug view.
pub fn single_texture_layout(
    device: &wgpu::Device,
    dimension: wgpu::TextureViewDimension,
    sample_type: wgpu::TextureSampleType,
) -> wgpu::BindGroupLayout {
    let sampler = match sample_type {
        wgpu::TextureSampleType::Float { filterable: true } => wgpu::SamplerBindingType::Filtering,
        _ => wgpu::SamplerBindingType::NonFiltering,
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: dimension,
                    sample_type,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(sampler),
                count: None,
            },
        ],
        label: Some("Single texture bind group layout"),
    })
}

pub fn single_texture_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
    label: &str,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
        label: Some(label),
    })
}

impl Assets {
    pub async fn load_texture(
        &self,
        file_name: &str,
        srgb: bool,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<Texture> {
        let data = self.load_binary(file_name).await?;
        let format = std::path::Path::new(file_name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
        Texture::from_bytes(device, queue, &data, file_name, format.as_deref(), srgb)
    }

    /// Loads the six [`SKYBOX_FACES`] from `directory`.
    pub async fn load_cubemap(
        &self,
        directory: &str,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<Texture> {
        let faces = futures::future::try_join_all(SKYBOX_FACES.iter().map(|face| async move {
            let file_name = format!("{directory}/{face}");
            let data = self.load_binary(&file_name).await?;
            image::load_from_memory(&data)
                .with_context(|| format!("Could not decode cubemap face {file_name}"))
        }))
        .await?;
        log::info!("Loaded cubemap {directory}");
        Texture::cubemap_from_images(device, queue, &faces, directory)
    }
}
