use anyhow::Result;
use cgmath::Vector3;
use instant::Duration;
use wgpu::util::DeviceExt;
use winit::{event::WindowEvent, keyboard::KeyCode};

use crate::{
    context::{Context, InitContext},
    flow::Lesson,
    geometry::SCREEN_QUAD,
    lessons::{
        advanced_lighting::{ShadowScene, orbiting_light},
        common::{Lamps, colour, key_pressed, place_camera},
    },
    light::{Light, LightingUniform, ShadowMap, lighting_uniform},
    pipelines::{ShaderKind, build_pipeline},
    render::RenderTarget,
    resources::texture::{diffuse_specular_layout, single_texture_bind_group, single_texture_layout},
    shader::Uniform,
};

/// Above the model so the floor catches its shadow.
pub const LIGHT_START: Vector3<f32> = Vector3::new(4.0, 3.0, 0.0);
pub const SHADOW_NEAR: f32 = 1.0;
pub const SHADOW_FAR: f32 = 7.5;
/// Left, right, bottom and top of the light's orthographic box.
pub const SHADOW_BOX: [f32; 4] = [-10.0, 10.0, -10.0, 10.0];

/// The orbiting light with its light-space matrix aimed at `target`.
pub fn shadow_light(elapsed: Duration, resolution: u32, target: Vector3<f32>) -> Light {
    let mut light = orbiting_light(LIGHT_START, elapsed, 0.4, 1.0, 3.0)
        .with_shadow_size(resolution, resolution);
    light.shadow_matrix_directional(
        target,
        Vector3::unit_y(),
        SHADOW_NEAR,
        SHADOW_FAR,
        SHADOW_BOX,
    );
    light
}

/// Shadows from a light treated as directional for the depth pass, with
/// 3x3 PCF when sampling. M overlays the raw depth map.
pub struct ShadowMapping {
    scene: ShadowScene,
    depth_pipeline: wgpu::RenderPipeline,
    lit_pipeline: wgpu::RenderPipeline,
    quad_pipeline: wgpu::RenderPipeline,
    quad_vertices: wgpu::Buffer,
    quad_bind_group: wgpu::BindGroup,
    shadow_map: ShadowMap,
    lighting: Uniform<LightingUniform>,
    lamp: Lamps,
    resolution: u32,
    target: Vector3<f32>,
    show_depth_map: bool,
}

impl ShadowMapping {
    pub async fn new(init: InitContext) -> Result<Self> {
        let scene = ShadowScene::load(&init).await?;
        let resolution = init.config.shadow_resolution;
        let target = scene.backpack.centre;
        log::debug!("Aiming the shadow map at {target:?}");
        let light = shadow_light(Duration::ZERO, resolution, target);
        let shadow_map = ShadowMap::new(&init.device, &light)?;

        let mut value = LightingUniform::new(4.0);
        value.set_points(std::slice::from_ref(&light))?;
        let lighting = lighting_uniform(&init.device, value);

        let depth_pipeline = build_pipeline(
            &init.device,
            ShaderKind::Depth,
            init.format,
            &[&shadow_map.pass.layout],
            |options| options,
        )?;
        let lit_pipeline = build_pipeline(
            &init.device,
            ShaderKind::Shadowed,
            init.format,
            &[
                &init.camera_layout,
                &lighting.layout,
                &diffuse_specular_layout(&init.device),
                &shadow_map.sampling_layout,
            ],
            |options| options,
        )?;

        let quad_layout = single_texture_layout(
            &init.device,
            wgpu::TextureViewDimension::D2,
            wgpu::TextureSampleType::Depth,
        );
        let quad_sampler = init.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("depth map view sampler"),
            ..Default::default()
        });
        let quad_bind_group = single_texture_bind_group(
            &init.device,
            &quad_layout,
            &shadow_map.texture.view,
            &quad_sampler,
            "depth map view",
        );
        let quad_pipeline = build_pipeline(
            &init.device,
            ShaderKind::DepthQuad,
            init.format,
            &[&quad_layout],
            |options| options,
        )?;
        let quad_vertices = init
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Depth Quad Vertex Buffer"),
                contents: bytemuck::cast_slice(&SCREEN_QUAD),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let lamp = Lamps::new(&init, [1.0; 3], 0.2, &[light.position])?;
        Ok(Self {
            scene,
            depth_pipeline,
            lit_pipeline,
            quad_pipeline,
            quad_vertices,
            quad_bind_group,
            shadow_map,
            lighting,
            lamp,
            resolution,
            target,
            show_depth_map: false,
        })
    }
}

impl Lesson for ShadowMapping {
    fn on_init(&mut self, ctx: &mut Context) {
        ctx.clear_colour = colour(0.0, 0.0, 0.0);
        place_camera(ctx, [0.0, 0.0, 3.0], 5.0);
    }

    fn on_window_events(&mut self, _ctx: &Context, event: &WindowEvent) {
        if key_pressed(event, KeyCode::KeyM) {
            self.show_depth_map = !self.show_depth_map;
        }
    }

    fn on_update(&mut self, ctx: &Context, _dt: Duration, elapsed: Duration) {
        let light = shadow_light(elapsed, self.resolution, self.target);
        self.shadow_map.update(&ctx.queue, &light);
        self.lighting
            .update(&ctx.queue, |lighting| lighting.points[0] = light.to_uniform());
        self.lamp.move_to(&ctx.device, &ctx.queue, &[light.position]);
    }

    fn on_render(&self, ctx: &Context, encoder: &mut wgpu::CommandEncoder, target: &RenderTarget) {
        {
            let mut pass = self.shadow_map.begin_pass(encoder);
            pass.set_pipeline(&self.depth_pipeline);
            pass.set_bind_group(0, &self.shadow_map.pass.bind_group, &[]);
            self.scene.draw_geometry(&mut pass);
        }

        let mut pass = target.begin_main_pass(encoder, ctx.clear_colour);
        self.lamp.draw(&mut pass, &ctx.camera.bind_group);

        pass.set_pipeline(&self.lit_pipeline);
        pass.set_bind_group(0, &ctx.camera.bind_group, &[]);
        pass.set_bind_group(1, &self.lighting.bind_group, &[]);
        pass.set_bind_group(3, &self.shadow_map.sampling, &[]);
        self.scene.draw(&mut pass);

        if self.show_depth_map {
            pass.set_pipeline(&self.quad_pipeline);
            pass.set_bind_group(0, &self.quad_bind_group, &[]);
            pass.set_vertex_buffer(0, self.quad_vertices.slice(..));
            pass.draw(0..SCREEN_QUAD.len() as u32, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Vector4, Zero};

    use crate::lessons::advanced_lighting::FLOOR_Y;

    use super::*;

    fn to_ndc(light: &Light, point: Vector3<f32>) -> Vector3<f32> {
        let clip = light.shadow_matrix * Vector4::new(point.x, point.y, point.z, 1.0);
        clip.truncate() / clip.w
    }

    #[test]
    fn origin_is_in_the_middle_of_the_shadow_map() {
        let light = shadow_light(Duration::from_secs(2), 1024, Vector3::zero());
        let ndc = to_ndc(&light, Vector3::zero());
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn floor_below_the_model_is_inside_the_depth_range() {
        let light = shadow_light(Duration::ZERO, 1024, Vector3::zero());
        let ndc = to_ndc(&light, Vector3::new(0.0, FLOOR_Y, 0.0));
        assert!((0.0..=1.0).contains(&ndc.z), "{ndc:?}");
        assert!(ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0);
    }

    #[test]
    fn shadow_map_centres_on_the_model() {
        let centre = Vector3::new(0.0, 1.0, 0.5);
        let light = shadow_light(Duration::from_secs(1), 1024, centre);
        let ndc = to_ndc(&light, centre);
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4, "{ndc:?}");
    }

    #[test]
    fn shadow_size_follows_the_configured_resolution() {
        let light = shadow_light(Duration::ZERO, 2048, Vector3::zero());
        assert_eq!((light.shadow_width, light.shadow_height), (2048, 2048));
    }
}
