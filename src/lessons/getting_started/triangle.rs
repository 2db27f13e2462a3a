use anyhow::Result;
use instant::Duration;
use wgpu::util::DeviceExt;

use crate::{
    context::{Context, InitContext},
    flow::Lesson,
    geometry::TRIANGLES,
    lessons::common::tint_uniform,
    pipelines::{ShaderKind, build_pipeline},
    render::RenderTarget,
    shader::Uniform,
};

/// Two triangles next to each other, one orange and one yellow.
pub struct Triangle {
    pipeline: wgpu::RenderPipeline,
    vertices: wgpu::Buffer,
    tint: Uniform<[f32; 4]>,
}

impl Triangle {
    pub async fn new(init: InitContext) -> Result<Self> {
        let tint = tint_uniform(&init.device, "triangle tint", [0.0; 3]);
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
                label: Some("Triangle Vertex Buffer"),
                contents: bytemuck::cast_slice(&TRIANGLES),
                usage: wgpu::BufferUsages::VERTEX,
            });
        Ok(Self {
            pipeline,
            vertices,
            tint,
        })
    }
}

impl Lesson for Triangle {
    fn on_init(&mut self, ctx: &mut Context) {
        ctx.camera.controller.set_enabled(false);
    }

    fn on_update(&mut self, _ctx: &Context, _dt: Duration, _elapsed: Duration) {}

    fn on_render(&self, ctx: &Context, encoder: &mut wgpu::CommandEncoder, target: &RenderTarget) {
        let mut pass = target.begin_main_pass(encoder, ctx.clear_colour);
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.tint.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertices.slice(..));
        pass.draw(0..TRIANGLES.len() as u32, 0..1);
    }
}
