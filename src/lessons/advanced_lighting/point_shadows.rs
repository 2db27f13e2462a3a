use anyhow::Result;
use cgmath::Vector3;
use instant::Duration;

use crate::{
    context::{Context, InitContext},
    flow::Lesson,
    lessons::{
        advanced_lighting::{ShadowScene, orbiting_light},
        common::{Lamps, colour},
    },
    light::{CUBE_FACES, CubeShadowMap, Light, LightingUniform, lighting_uniform},
    pipelines::{ShaderKind, build_pipeline},
    render::RenderTarget,
    resources::texture::diffuse_specular_layout,
    shader::Uniform,
};

pub const LIGHT_START: Vector3<f32> = Vector3::new(4.0, 0.0, 0.0);
pub const SHADOW_NEAR: f32 = 1.0;
pub const SHADOW_FAR: f32 = 10.0;

/// The orbiting light with a square cube face of `resolution` texels.
pub fn cube_light(elapsed: Duration, resolution: u32) -> Light {
    orbiting_light(LIGHT_START, elapsed, 0.4, 1.0, 3.0).with_shadow_size(resolution, resolution)
}

/// Omni-directional shadows: the scene is rendered into the six faces of a
/// depth cube around the light every frame.
pub struct PointShadows {
    scene: ShadowScene,
    depth_pipeline: wgpu::RenderPipeline,
    lit_pipeline: wgpu::RenderPipeline,
    shadow_map: CubeShadowMap,
    lighting: Uniform<LightingUniform>,
    lamp: Lamps,
    resolution: u32,
}

impl PointShadows {
    pub async fn new(init: InitContext) -> Result<Self> {
        let scene = ShadowScene::load(&init).await?;
        let resolution = init.config.shadow_resolution;
        let light = cube_light(Duration::ZERO, resolution);
        let shadow_map = CubeShadowMap::new(&init.device, &light, SHADOW_NEAR, SHADOW_FAR)?;

        let mut value = LightingUniform::new(4.0);
        value.set_points(std::slice::from_ref(&light))?;
        let lighting = lighting_uniform(&init.device, value);

        let depth_pipeline = build_pipeline(
            &init.device,
            ShaderKind::PointDepth,
            init.format,
            &[&shadow_map.faces[0].layout],
            |options| options,
        )?;
        let lit_pipeline = build_pipeline(
            &init.device,
            ShaderKind::PointShadowed,
            init.format,
            &[
                &init.camera_layout,
                &lighting.layout,
                &diffuse_specular_layout(&init.device),
                &shadow_map.sampling_layout,
            ],
            |options| options,
        )?;
        let lamp = Lamps::new(&init, [1.0; 3], 0.2, &[light.position])?;
        Ok(Self {
            scene,
            depth_pipeline,
            lit_pipeline,
            shadow_map,
            lighting,
            lamp,
            resolution,
        })
    }

    /// Edge length of each cube face.
    pub fn shadow_size(&self) -> u32 {
        self.shadow_map.texture.texture.width()
    }
}

impl Lesson for PointShadows {
    fn on_init(&mut self, ctx: &mut Context) {
        ctx.clear_colour = colour(0.2, 0.2, 0.2);
    }

    fn on_update(&mut self, ctx: &Context, _dt: Duration, elapsed: Duration) {
        let light = cube_light(elapsed, self.resolution);
        self.shadow_map.update(&ctx.queue, &light);
        self.lighting
            .update(&ctx.queue, |lighting| lighting.points[0] = light.to_uniform());
        self.lamp.move_to(&ctx.device, &ctx.queue, &[light.position]);
    }

    fn on_render(&self, ctx: &Context, encoder: &mut wgpu::CommandEncoder, target: &RenderTarget) {
        for face in 0..CUBE_FACES.len() {
            let mut pass = self.shadow_map.begin_face_pass(encoder, face);
            pass.set_pipeline(&self.depth_pipeline);
            pass.set_bind_group(0, &self.shadow_map.faces[face].bind_group, &[]);
            self.scene.draw_geometry(&mut pass);
        }

        let mut pass = target.begin_main_pass(encoder, ctx.clear_colour);
        self.lamp.draw(&mut pass, &ctx.camera.bind_group);

        pass.set_pipeline(&self.lit_pipeline);
        pass.set_bind_group(0, &ctx.camera.bind_group, &[]);
        pass.set_bind_group(1, &self.lighting.bind_group, &[]);
        pass.set_bind_group(3, &self.shadow_map.sampling, &[]);
        self.scene.draw(&mut pass);
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Vector4;

    use super::*;

    #[test]
    fn every_face_sees_its_own_direction() {
        let light = cube_light(Duration::from_secs(1), 1024);
        let matrices = light.point_shadow_matrices(SHADOW_NEAR, SHADOW_FAR);
        for (matrix, (direction, _)) in matrices.iter().zip(CUBE_FACES) {
            let target = light.position + direction * 5.0;
            let clip = matrix * Vector4::new(target.x, target.y, target.z, 1.0);
            let ndc = clip.truncate() / clip.w;
            assert!(ndc.x.abs() < 1e-3 && ndc.y.abs() < 1e-3, "{ndc:?}");
            assert!((0.0..1.0).contains(&ndc.z));
        }
    }

    #[test]
    fn cube_faces_follow_the_configured_resolution() {
        let light = cube_light(Duration::ZERO, 512);
        assert_eq!((light.shadow_width, light.shadow_height), (512, 512));
    }
}
