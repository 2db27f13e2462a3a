use anyhow::Result;
use instant::Duration;
use wgpu::util::DeviceExt;

use crate::{
    context::{Context, InitContext},
    data_structures::model::Material,
    flow::Lesson,
    geometry::{QUAD_INDICES, TEXTURED_QUAD},
    lessons::common::{mix_uniform, texture_pair},
    pipelines::{ShaderKind, build_pipeline},
    render::RenderTarget,
    resources::texture::diffuse_specular_layout,
    shader::Uniform,
};

pub const CONTAINER: &str = "container.jpg";
pub const FACE: &str = "awesomeface.png";
/// How much of the face shows through the container.
pub const FACE_WEIGHT: f32 = 0.2;

/// A quad mixing two textures, tinted by its vertex colours.
pub struct Textures {
    pipeline: wgpu::RenderPipeline,
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    textures: Material,
    mix: Uniform<[f32; 4]>,
}

impl Textures {
    pub async fn new(init: InitContext) -> Result<Self> {
        let layout = diffuse_specular_layout(&init.device);
        let textures = texture_pair(&init, &layout, CONTAINER, FACE).await?;
        let mix = mix_uniform(&init.device, FACE_WEIGHT);
        let pipeline = build_pipeline(
            &init.device,
            ShaderKind::Textured,
            init.format,
            &[&layout, &mix.layout],
            |options| options,
        )?;
        let vertices = init
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Textured Quad Vertex Buffer"),
                contents: bytemuck::cast_slice(&TEXTURED_QUAD),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let indices = init
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Textured Quad Index Buffer"),
                contents: bytemuck::cast_slice(&QUAD_INDICES),
                usage: wgpu::BufferUsages::INDEX,
            });
        Ok(Self {
            pipeline,
            vertices,
            indices,
            textures,
            mix,
        })
    }
}

impl Lesson for Textures {
    fn on_init(&mut self, ctx: &mut Context) {
        ctx.camera.controller.set_enabled(false);
    }

    fn on_update(&mut self, _ctx: &Context, _dt: Duration, _elapsed: Duration) {}

    fn on_render(&self, ctx: &Context, encoder: &mut wgpu::CommandEncoder, target: &RenderTarget) {
        let mut pass = target.begin_main_pass(encoder, ctx.clear_colour);
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.textures.bind_group, &[]);
        pass.set_bind_group(1, &self.mix.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertices.slice(..));
        pass.set_index_buffer(self.indices.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..1);
    }
}
