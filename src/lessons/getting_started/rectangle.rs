use anyhow::Result;
use instant::Duration;
use wgpu::util::DeviceExt;

use crate::{
    context::{Context, InitContext},
    flow::Lesson,
    geometry::{QUAD_INDICES, RECTANGLE},
    lessons::common::tint_uniform,
    pipelines::{ShaderKind, build_pipeline},
    render::RenderTarget,
    shader::Uniform,
};

/// An orange rectangle drawn from four vertices and six indices.
pub struct Rectangle {
    pipeline: wgpu::RenderPipeline,
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    tint: Uniform<[f32; 4]>,
}

impl Rectangle {
    pub async fn new(init: InitContext) -> Result<Self> {
        let tint = tint_uniform(&init.device, "rectangle tint", [0.0; 3]);
        let pipeline = build_pipeline(
            &init.device,
            ShaderKind::Colour,
            init.format,
            &[&tint.layout],
            |options| options,
        )?;
        let vertices = init
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Rectangle Vertex Buffer"),
                contents: bytemuck::cast_slice(&RECTANGLE),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let indices = init
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Rectangle Index Buffer"),
                contents: bytemuck::cast_slice(&QUAD_INDICES),
                usage: wgpu::BufferUsages::INDEX,
            });
        Ok(Self {
            pipeline,
            vertices,
            indices,
            tint,
        })
    }
}

impl Lesson for Rectangle {
    fn on_init(&mut self, ctx: &mut Context) {
        ctx.camera.controller.set_enabled(false);
    }

    fn on_update(&mut self, _ctx: &Context, _dt: Duration, _elapsed: Duration) {}

    fn on_render(&self, ctx: &Context, encoder: &mut wgpu::CommandEncoder, target: &RenderTarget) {
        let mut pass = target.begin_main_pass(encoder, ctx.clear_colour);
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.tint.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertices.slice(..));
        pass.set_index_buffer(self.indices.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..1);
    }
}
