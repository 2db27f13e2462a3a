use anyhow::Result;
use instant::Duration;
use wgpu::util::DeviceExt;

use crate::{
    context::{Context, InitContext},
    data_structures::{
        instance::{Instance, InstanceBuffer},
        model::{DrawModel, Model},
    },
    flow::Lesson,
    geometry::skybox_vertices,
    lessons::common::{Sky, colour, load_backpack},
    pipelines::{ShaderKind, build_pipeline},
    render::RenderTarget,
};

/// A skybox around a mirror-like model that reflects it.
pub struct Cubemaps {
    sky: Sky,
    sky_pipeline: wgpu::RenderPipeline,
    sky_vertices: wgpu::Buffer,
    sky_vertex_count: u32,
    reflect_pipeline: wgpu::RenderPipeline,
    backpack: Model,
    instance: InstanceBuffer,
}

impl Cubemaps {
    pub async fn new(init: InitContext) -> Result<Self> {
        let sky = Sky::load(&init).await?;
        let backpack = load_backpack(&init).await?;

        let layouts = [&init.camera_layout, &sky.layout];
        let sky_pipeline = build_pipeline(
            &init.device,
            ShaderKind::Skybox,
            init.format,
            &layouts,
            |options| options,
        )?;
        let reflect_pipeline = build_pipeline(
            &init.device,
            ShaderKind::Reflect,
            init.format,
            &layouts,
            |options| options,
        )?;

        let vertices = skybox_vertices();
        let sky_vertices = init
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Skybox Vertex Buffer"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let instance = InstanceBuffer::new(&init.device, "backpack", &[Instance::new()]);
        Ok(Self {
            sky,
            sky_pipeline,
            sky_vertices,
            sky_vertex_count: vertices.len() as u32,
            reflect_pipeline,
            backpack,
            instance,
        })
    }
}

impl Lesson for Cubemaps {
    fn on_init(&mut self, ctx: &mut Context) {
        ctx.clear_colour = colour(0.2, 0.2, 0.2);
    }

    fn on_update(&mut self, _ctx: &Context, _dt: Duration, _elapsed: Duration) {}

    fn on_render(&self, ctx: &Context, encoder: &mut wgpu::CommandEncoder, target: &RenderTarget) {
        let mut pass = target.begin_main_pass(encoder, ctx.clear_colour);
        pass.set_bind_group(0, &ctx.camera.bind_group, &[]);
        pass.set_bind_group(1, &self.sky.bind_group, &[]);

        pass.set_pipeline(&self.reflect_pipeline);
        pass.set_vertex_buffer(1, self.instance.buffer.slice(..));
        pass.draw_model_geometry(&self.backpack, self.instance.range());

        // Last, so only pixels the model left empty run the sky shader.
        pass.set_pipeline(&self.sky_pipeline);
        pass.set_vertex_buffer(0, self.sky_vertices.slice(..));
        pass.draw(0..self.sky_vertex_count, 0..1);
    }
}
