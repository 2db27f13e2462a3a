use anyhow::Result;
use cgmath::{Array, Vector3};
use instant::Duration;

use crate::{
    context::{Context, InitContext},
    data_structures::{
        instance::{Instance, InstanceBuffer},
        model::{DrawModel, Model},
    },
    flow::Lesson,
    lessons::common::{Lamps, colour, load_backpack, orbit, phong_pipeline, tint_uniform},
    light::{Light, LightingUniform, lighting_uniform},
    pipelines::{ShaderKind, basic::stencil_state, build_pipeline},
    render::RenderTarget,
    shader::Uniform,
};

pub const LIGHT_START: Vector3<f32> = Vector3::new(4.0, 0.0, 0.0);
pub const OUTLINE_COLOUR: [f32; 3] = [0.04, 0.28, 0.26];
pub const OUTLINE_SCALE: f32 = 1.05;
/// Written where the model covers the screen.
const STENCIL_REF: u32 = 1;

pub fn orbiting_light(elapsed: Duration) -> Light {
    Light::point("light", orbit(LIGHT_START, elapsed)).with_colours(
        Vector3::from_value(0.4),
        Vector3::from_value(2.0),
        Vector3::from_value(5.0),
    )
}

/// The model marks its pixels in the stencil buffer; a slightly larger copy
/// in a flat colour is then drawn only outside them, leaving an outline.
pub struct StencilTesting {
    model_pipeline: wgpu::RenderPipeline,
    outline_pipeline: wgpu::RenderPipeline,
    backpack: Model,
    instance: InstanceBuffer,
    outline_instance: InstanceBuffer,
    outline_tint: Uniform<[f32; 4]>,
    lighting: Uniform<LightingUniform>,
    lamp: Lamps,
}

impl StencilTesting {
    pub async fn new(init: InitContext) -> Result<Self> {
        let backpack = load_backpack(&init).await?;

        let light = orbiting_light(Duration::ZERO);
        let mut value = LightingUniform::new(32.0);
        value.set_points(std::slice::from_ref(&light))?;
        let lighting = lighting_uniform(&init.device, value);

        let model_pipeline = phong_pipeline(&init, &lighting.layout, |options| {
            options.stencil(stencil_state(
                wgpu::CompareFunction::Always,
                wgpu::StencilOperation::Replace,
                0xff,
            ))
        })?;
        let outline_tint = tint_uniform(&init.device, "outline", OUTLINE_COLOUR);
        let outline_pipeline = build_pipeline(
            &init.device,
            ShaderKind::Flat,
            init.format,
            &[&init.camera_layout, &outline_tint.layout],
            |options| {
                options
                    .depth(wgpu::CompareFunction::Always, false)
                    .stencil(stencil_state(
                        wgpu::CompareFunction::NotEqual,
                        wgpu::StencilOperation::Keep,
                        0x00,
                    ))
            },
        )?;

        let instance = InstanceBuffer::new(&init.device, "backpack", &[Instance::new()]);
        let outline_instance = InstanceBuffer::new(
            &init.device,
            "backpack outline",
            &[Instance::new().scaled(OUTLINE_SCALE)],
        );
        let lamp = Lamps::new(&init, [1.0; 3], 0.2, &[light.position])?;
        Ok(Self {
            model_pipeline,
            outline_pipeline,
            backpack,
            instance,
            outline_instance,
            outline_tint,
            lighting,
            lamp,
        })
    }
}

impl Lesson for StencilTesting {
    fn on_init(&mut self, ctx: &mut Context) {
        ctx.clear_colour = colour(0.0, 0.0, 0.0);
    }

    fn on_update(&mut self, ctx: &Context, _dt: Duration, elapsed: Duration) {
        let light = orbiting_light(elapsed);
        self.lighting
            .update(&ctx.queue, |lighting| lighting.points[0] = light.to_uniform());
        self.lamp.move_to(&ctx.device, &ctx.queue, &[light.position]);
    }

    fn on_render(&self, ctx: &Context, encoder: &mut wgpu::CommandEncoder, target: &RenderTarget) {
        let mut pass = target.begin_main_pass(encoder, ctx.clear_colour);
        self.lamp.draw(&mut pass, &ctx.camera.bind_group);

        pass.set_stencil_reference(STENCIL_REF);
        pass.set_pipeline(&self.model_pipeline);
        pass.set_bind_group(0, &ctx.camera.bind_group, &[]);
        pass.set_bind_group(1, &self.lighting.bind_group, &[]);
        pass.set_vertex_buffer(1, self.instance.buffer.slice(..));
        pass.draw_model(&self.backpack, self.instance.range());

        pass.set_pipeline(&self.outline_pipeline);
        pass.set_bind_group(0, &ctx.camera.bind_group, &[]);
        pass.set_bind_group(1, &self.outline_tint.bind_group, &[]);
        pass.set_vertex_buffer(1, self.outline_instance.buffer.slice(..));
        pass.draw_model_geometry(&self.backpack, self.outline_instance.range());
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use cgmath::InnerSpace;

    use super::*;

    #[test]
    fn light_circles_the_model() {
        for secs in [0.0, 1.3, 4.0, 7.2] {
            let light = orbiting_light(Duration::from_secs_f32(secs));
            assert_relative_eq!(light.position.magnitude(), 4.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn outline_encloses_the_model() {
        let outline = Instance::new().scaled(OUTLINE_SCALE);
        assert!(outline.scale.x > 1.0);
        assert_eq!(outline.position, Instance::new().position);
    }
}
