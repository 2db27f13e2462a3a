use anyhow::Result;
use instant::Duration;

use crate::{
    context::{Context, InitContext},
    data_structures::{
        instance::InstanceBuffer,
        model::{DrawModel, Model},
    },
    flow::Lesson,
    geometry::cube_mesh,
    lessons::{
        common::{container_instances, mix_uniform, texture_pair},
        getting_started::textures::{CONTAINER, FACE, FACE_WEIGHT},
    },
    pipelines::{ShaderKind, build_pipeline},
    render::RenderTarget,
    resources::texture::diffuse_specular_layout,
    shader::Uniform,
};

/// The ten textured containers in perspective. Used by this lesson with a
/// fixed view and by the camera lesson with the fly camera.
pub struct Containers {
    pipeline: wgpu::RenderPipeline,
    cube: Model,
    mix: Uniform<[f32; 4]>,
    instances: InstanceBuffer,
    spinning: fn(usize) -> bool,
}

impl Containers {
    pub async fn new(init: &InitContext, spinning: fn(usize) -> bool) -> Result<Self> {
        let layout = diffuse_specular_layout(&init.device);
        let textures = texture_pair(init, &layout, CONTAINER, FACE).await?;
        let cube = Model::from_mesh(&init.device, &cube_mesh("container", vec![]), textures)?;
        let mix = mix_uniform(&init.device, FACE_WEIGHT);
        let pipeline = build_pipeline(
            &init.device,
            ShaderKind::Mixed,
            init.format,
            &[&init.camera_layout, &mix.layout, &layout],
            |options| options,
        )?;
        let instances =
            InstanceBuffer::new(&init.device, "containers", &container_instances(0.0, spinning));
        Ok(Self {
            pipeline,
            cube,
            mix,
            instances,
            spinning,
        })
    }

    pub fn update(&mut self, ctx: &Context, elapsed: Duration) {
        let instances = container_instances(elapsed.as_secs_f32(), self.spinning);
        self.instances.update(&ctx.device, &ctx.queue, &instances);
    }

    pub fn render(&self, ctx: &Context, encoder: &mut wgpu::CommandEncoder, target: &RenderTarget) {
        let mut pass = target.begin_main_pass(encoder, ctx.clear_colour);
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &ctx.camera.bind_group, &[]);
        pass.set_bind_group(1, &self.mix.bind_group, &[]);
        pass.set_vertex_buffer(1, self.instances.buffer.slice(..));
        pass.draw_model(&self.cube, self.instances.range());
    }
}

/// All containers spin in front of a fixed camera.
pub struct Coordinates {
    containers: Containers,
}

impl Coordinates {
    pub async fn new(init: InitContext) -> Result<Self> {
        Ok(Self {
            containers: Containers::new(&init, |_| true).await?,
        })
    }
}

impl Lesson for Coordinates {
    fn on_init(&mut self, ctx: &mut Context) {
        ctx.camera.controller.set_enabled(false);
    }

    fn on_update(&mut self, ctx: &Context, _dt: Duration, elapsed: Duration) {
        self.containers.update(ctx, elapsed);
    }

    fn on_render(&self, ctx: &Context, encoder: &mut wgpu::CommandEncoder, target: &RenderTarget) {
        self.containers.render(ctx, encoder, target);
    }
}
