use anyhow::Result;
use instant::Duration;
use wgpu::util::DeviceExt;

use crate::{
    context::{Context, InitContext},
    flow::Lesson,
    geometry::SHADER_TRIANGLE,
    lessons::common::tint_uniform,
    pipelines::{ShaderKind, build_pipeline},
    render::RenderTarget,
    shader::Uniform,
};

/// Green added on top of the vertex colour, oscillating between 0 and 1.
pub fn pulse(elapsed: Duration) -> f32 {
    elapsed.as_secs_f32().sin() / 2.0 + 0.5
}

/// A dark red triangle whose uniform colour changes over time.
pub struct Shaders {
    pipeline: wgpu::RenderPipeline,
    vertices: wgpu::Buffer,
    tint: Uniform<[f32; 4]>,
}

impl Shaders {
    pub async fn new(init: InitContext) -> Result<Self> {
        let tint = tint_uniform(&init.device, "pulse", [0.0, pulse(Duration::ZERO), 0.0]);
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
                label: Some("Shader Triangle Vertex Buffer"),
                contents: bytemuck::cast_slice(&SHADER_TRIANGLE),
                usage: wgpu::BufferUsages::VERTEX,
            });
        Ok(Self {
            pipeline,
            vertices,
            tint,
        })
    }
}

impl Lesson for Shaders {
    fn on_init(&mut self, ctx: &mut Context) {
        ctx.camera.controller.set_enabled(false);
    }

    fn on_update(&mut self, ctx: &Context, _dt: Duration, elapsed: Duration) {
        let green = pulse(elapsed);
        self.tint.update(&ctx.queue, |tint| tint[1] = green);
    }

    fn on_render(&self, ctx: &Context, encoder: &mut wgpu::CommandEncoder, target: &RenderTarget) {
        let mut pass = target.begin_main_pass(encoder, ctx.clear_colour);
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.tint.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertices.slice(..));
        pass.draw(0..SHADER_TRIANGLE.len() as u32, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn pulse_stays_in_unit_range() {
        assert_relative_eq!(pulse(Duration::ZERO), 0.5);
        let peak = Duration::from_secs_f32(std::f32::consts::FRAC_PI_2);
        assert_relative_eq!(pulse(peak), 1.0, epsilon = 1e-6);
        for ms in (0..10_000).step_by(37) {
            let value = pulse(Duration::from_millis(ms));
            assert!((0.0..=1.0).contains(&value));
        }
    }
}
