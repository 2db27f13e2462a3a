use anyhow::Result;
use cgmath::Vector3;
use instant::Duration;
use winit::{event::WindowEvent, keyboard::KeyCode};

use crate::{
    context::{Context, InitContext},
    data_structures::{
        instance::{Instance, InstanceBuffer},
        model::{DrawModel, Model},
    },
    flow::Lesson,
    lessons::{
        advanced_lighting::orbiting_light,
        common::{Lamps, colour, key_pressed, load_backpack, phong_pipeline},
    },
    light::{Light, LightingUniform, lighting_uniform},
    render::RenderTarget,
    shader::Uniform,
};

pub const LIGHT_START: Vector3<f32> = Vector3::new(4.0, 0.0, 0.0);
/// Low enough that the Phong highlight visibly breaks off at grazing angles.
pub const SHININESS: f32 = 2.0;

fn light(elapsed: Duration) -> Light {
    orbiting_light(LIGHT_START, elapsed, 1.0, 3.0, 1.0)
}

/// Compares the Phong and Blinn-Phong specular terms; B switches between
/// them.
pub struct BlinnPhong {
    pipeline: wgpu::RenderPipeline,
    backpack: Model,
    instance: InstanceBuffer,
    lighting: Uniform<LightingUniform>,
    lamp: Lamps,
}

impl BlinnPhong {
    pub async fn new(init: InitContext) -> Result<Self> {
        let backpack = load_backpack(&init).await?;
        let light = light(Duration::ZERO);
        let mut value = LightingUniform::new(SHININESS);
        value.set_points(std::slice::from_ref(&light))?;
        value.set_blinn(true);
        let lighting = lighting_uniform(&init.device, value);
        let pipeline = phong_pipeline(&init, &lighting.layout, |options| options)?;
        let instance = InstanceBuffer::new(&init.device, "backpack", &[Instance::new()]);
        let lamp = Lamps::new(&init, [1.0; 3], 0.2, &[light.position])?;
        Ok(Self {
            pipeline,
            backpack,
            instance,
            lighting,
            lamp,
        })
    }

    pub fn blinn(&self) -> bool {
        self.lighting.get().blinn()
    }
}

impl Lesson for BlinnPhong {
    fn on_init(&mut self, ctx: &mut Context) {
        ctx.clear_colour = colour(0.5, 0.5, 0.5);
    }

    fn on_window_events(&mut self, ctx: &Context, event: &WindowEvent) {
        if key_pressed(event, KeyCode::KeyB) {
            let blinn = !self.blinn();
            self.lighting
                .update(&ctx.queue, |lighting| lighting.set_blinn(blinn));
            log::info!("Specular model: {}", if blinn { "Blinn-Phong" } else { "Phong" });
        }
    }

    fn on_update(&mut self, ctx: &Context, _dt: Duration, elapsed: Duration) {
        let light = light(elapsed);
        self.lighting
            .update(&ctx.queue, |lighting| lighting.points[0] = light.to_uniform());
        self.lamp.move_to(&ctx.device, &ctx.queue, &[light.position]);
    }

    fn on_render(&self, ctx: &Context, encoder: &mut wgpu::CommandEncoder, target: &RenderTarget) {
        let mut pass = target.begin_main_pass(encoder, ctx.clear_colour);
        self.lamp.draw(&mut pass, &ctx.camera.bind_group);

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &ctx.camera.bind_group, &[]);
        pass.set_bind_group(1, &self.lighting.bind_group, &[]);
        pass.set_vertex_buffer(1, self.instance.buffer.slice(..));
        pass.draw_model(&self.backpack, self.instance.range());
    }
}
