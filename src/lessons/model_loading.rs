//! Loading a textured model from disk.

use anyhow::Result;
use instant::Duration;

use crate::{
    context::{Context, InitContext},
    data_structures::{
        instance::{Instance, InstanceBuffer},
        model::{DrawModel, Model},
    },
    flow::Lesson,
    lessons::{
        common::{Lamps, colour, load_backpack, phong_pipeline},
        lighting::multiple_lights::point_lights,
    },
    light::{LightingUniform, lighting_uniform},
    render::RenderTarget,
    shader::Uniform,
};

/// The backpack lit by the four point lights of the lighting chapter.
pub struct ModelViewer {
    pipeline: wgpu::RenderPipeline,
    backpack: Model,
    instance: InstanceBuffer,
    lighting: Uniform<LightingUniform>,
    lamps: Lamps,
}

impl ModelViewer {
    pub async fn new(init: InitContext) -> Result<Self> {
        let backpack = load_backpack(&init).await?;
        log::info!(
            "{} meshes share {} textures",
            backpack.meshes.len(),
            backpack.texture_count()
        );

        let points = point_lights();
        let mut value = LightingUniform::new(32.0);
        value.set_points(&points)?;
        let lighting = lighting_uniform(&init.device, value);
        let pipeline = phong_pipeline(&init, &lighting.layout, |options| options)?;

        let positions: Vec<_> = points.iter().map(|light| light.position).collect();
        let lamps = Lamps::new(&init, [1.0; 3], 0.1, &positions)?;
        let instance = InstanceBuffer::new(&init.device, "backpack", &[Instance::new()]);
        Ok(Self {
            pipeline,
            backpack,
            instance,
            lighting,
            lamps,
        })
    }
}

impl Lesson for ModelViewer {
    fn on_init(&mut self, ctx: &mut Context) {
        ctx.clear_colour = colour(0.0, 0.0, 0.0);
    }

    fn on_update(&mut self, _ctx: &Context, _dt: Duration, _elapsed: Duration) {}

    fn on_render(&self, ctx: &Context, encoder: &mut wgpu::CommandEncoder, target: &RenderTarget) {
        let mut pass = target.begin_main_pass(encoder, ctx.clear_colour);
        self.lamps.draw(&mut pass, &ctx.camera.bind_group);

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &ctx.camera.bind_group, &[]);
        pass.set_bind_group(1, &self.lighting.bind_group, &[]);
        pass.set_vertex_buffer(1, self.instance.buffer.slice(..));
        pass.draw_model(&self.backpack, self.instance.range());
    }
}
