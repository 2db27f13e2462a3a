//! Render targets.
//!
//! Lessons draw into a [`RenderTarget`]: a colour view plus the matching
//! depth-stencil view. In a window the colour view comes from the surface;
//! off-screen it belongs to an [`OffscreenTarget`] whose contents can be read
//! back into an image.

use std::time::Duration;

use anyhow::{Context as _, Result, anyhow};

use crate::data_structures::texture::Texture;

/// Where the main pass of a frame goes.
pub struct RenderTarget<'a> {
    pub colour: &'a wgpu::TextureView,
    pub depth: &'a wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    pub width: u32,
    pub height: u32,
}

impl RenderTarget<'_> {
    /// Starts the main pass: colour cleared to `clear`, depth to 1 and
    /// stencil to 0.
    pub fn begin_main_pass<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        clear: wgpu::Color,
    ) -> wgpu::RenderPass<'e> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Main Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: self.colour,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: self.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(0),
                    store: wgpu::StoreOp::Store,
                }),
            }),
            ..Default::default()
        })
    }
}

/// Rows of a texture copy must start at multiples of 256 bytes.
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Drops the row padding of a texture copy and puts the channels in RGBA
/// order.
pub fn unpad_rows(
    data: &[u8],
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
) -> Result<image::RgbaImage> {
    let padded = padded_bytes_per_row(width) as usize;
    let row = width as usize * 4;
    if data.len() < padded * height as usize {
        return Err(anyhow!(
            "Read back {} bytes, {width}x{height} needs {}",
            data.len(),
            padded * height as usize
        ));
    }
    let bgra = matches!(
        format,
        wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb
    );
    let mut pixels = Vec::with_capacity(row * height as usize);
    for chunk in data.chunks(padded).take(height as usize) {
        pixels.extend_from_slice(&chunk[..row]);
    }
    if bgra {
        pixels.chunks_exact_mut(4).for_each(|px| px.swap(0, 2));
    }
    image::RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| anyhow!("Pixel buffer does not match {width}x{height}"))
}

/// Colour and depth textures for rendering without a window.
#[derive(Debug)]
pub struct OffscreenTarget {
    pub colour: wgpu::Texture,
    pub colour_view: wgpu::TextureView,
    pub depth: Texture,
    pub format: wgpu::TextureFormat,
    pub width: u32,
    pub height: u32,
}

impl OffscreenTarget {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, width: u32, height: u32) -> Self {
        let colour = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen colour"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let colour_view = colour.create_view(&wgpu::TextureViewDescriptor::default());
        let depth = Texture::create_depth_texture(device, [width, height], "Offscreen depth");
        Self {
            colour,
            colour_view,
            depth,
            format,
            width,
            height,
        }
    }

    pub fn target(&self) -> RenderTarget<'_> {
        RenderTarget {
            colour: &self.colour_view,
            depth: &self.depth.view,
            format: self.format,
            width: self.width,
            height: self.height,
        }
    }

    /// Copies the colour texture into a mappable buffer and waits for it.
    pub async fn read_image(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<image::RgbaImage> {
        let bytes_per_row = padded_bytes_per_row(self.width);
        let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Offscreen readback"),
            size: (bytes_per_row * self.height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &self.colour,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        queue.submit(std::iter::once(encoder.finish()));

        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        let buffer_slice = output_buffer.slice(..);
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            if tx.send(result).is_err() {
                log::warn!("Readback finished after the receiver was dropped");
            }
        });
        device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: Some(Duration::from_secs(3)),
            })
            .context("Waiting for the readback failed")?;
        rx.receive()
            .await
            .ok_or_else(|| anyhow!("Readback channel closed"))?
            .context("Could not map the readback buffer")?;

        let image = {
            let data = buffer_slice.get_mapped_range();
            unpad_rows(&data, self.width, self.height, self.format)?
        };
        output_buffer.unmap();
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_the_copy_alignment() {
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
        assert_eq!(padded_bytes_per_row(800), 3328);
    }

    #[test]
    fn unpadding_keeps_only_visible_pixels() {
        let (width, height) = (2, 2);
        let padded = padded_bytes_per_row(width) as usize;
        let mut data = vec![0u8; padded * height as usize];
        data[..8].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        data[padded..padded + 8].copy_from_slice(&[9, 10, 11, 12, 13, 14, 15, 16]);
        let img = unpad_rows(&data, width, height, wgpu::TextureFormat::Rgba8UnormSrgb).unwrap();
        assert_eq!(img.get_pixel(1, 0).0, [5, 6, 7, 8]);
        assert_eq!(img.get_pixel(0, 1).0, [9, 10, 11, 12]);
    }

    #[test]
    fn bgra_is_swizzled() {
        let padded = padded_bytes_per_row(1) as usize;
        let mut data = vec![0u8; padded];
        data[..4].copy_from_slice(&[10, 20, 30, 255]);
        let img = unpad_rows(&data, 1, 1, wgpu::TextureFormat::Bgra8UnormSrgb).unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [30, 20, 10, 255]);
    }

    #[test]
    fn short_buffers_are_rejected() {
        assert!(unpad_rows(&[0; 16], 4, 4, wgpu::TextureFormat::Rgba8Unorm).is_err());
    }
}
