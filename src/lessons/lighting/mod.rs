//! Phong lighting on the containers: a single light, material maps,
//! attenuation and several light casters at once.

pub mod basic_lighting;
pub mod light_casters;
pub mod lighting_maps;
pub mod multiple_lights;

pub use basic_lighting::BasicLighting;
pub use light_casters::LightCasters;
pub use lighting_maps::LightingMaps;
pub use multiple_lights::MultipleLights;

use anyhow::Result;
use instant::Duration;

use crate::{
    context::{Context, InitContext},
    data_structures::{
        instance::InstanceBuffer,
        model::{DrawModel, Model},
    },
    lessons::common::{Lamps, container_instances, phong_pipeline},
    light::{LightingUniform, lighting_uniform},
    render::RenderTarget,
    shader::Uniform,
};

/// Every third container spins.
pub fn spins(i: usize) -> bool {
    i % 3 == 0
}

/// The ten containers lit by the lights in `lighting`, plus lamps showing
/// where the lights are.
pub struct LitContainers {
    pipeline: wgpu::RenderPipeline,
    cube: Model,
    instances: InstanceBuffer,
    pub lighting: Uniform<LightingUniform>,
    pub lamps: Lamps,
}

impl LitContainers {
    pub fn new(init: &InitContext, cube: Model, lighting: LightingUniform, lamps: Lamps) -> Result<Self> {
        let lighting = lighting_uniform(&init.device, lighting);
        let pipeline = phong_pipeline(init, &lighting.layout, |options| options)?;
        let instances = InstanceBuffer::new(&init.device, "containers", &container_instances(0.0, spins));
        Ok(Self {
            pipeline,
            cube,
            instances,
            lighting,
            lamps,
        })
    }

    pub fn update(&mut self, ctx: &Context, elapsed: Duration) {
        let instances = container_instances(elapsed.as_secs_f32(), spins);
        self.instances.update(&ctx.device, &ctx.queue, &instances);
    }

    pub fn render(&self, ctx: &Context, encoder: &mut wgpu::CommandEncoder, target: &RenderTarget) {
        let mut pass = target.begin_main_pass(encoder, ctx.clear_colour);
        self.lamps.draw(&mut pass, &ctx.camera.bind_group);

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &ctx.camera.bind_group, &[]);
        pass.set_bind_group(1, &self.lighting.bind_group, &[]);
        pass.set_vertex_buffer(1, self.instances.buffer.slice(..));
        pass.draw_model(&self.cube, self.instances.range());
    }
}
