use anyhow::Result;
use cgmath::{Array, Vector3};
use instant::Duration;

use crate::{
    camera::Camera,
    context::{Context, InitContext},
    data_structures::model::TextureCache,
    flow::Lesson,
    geometry::POINT_LIGHT_POSITIONS,
    lessons::{
        common::{Lamps, textured_cube},
        lighting::{
            LitContainers,
            light_casters::point_light,
            lighting_maps::{DIFFUSE_MAP, SPECULAR_MAP},
        },
    },
    light::{Light, LightingUniform},
    render::RenderTarget,
};

pub fn point_lights() -> Vec<Light> {
    POINT_LIGHT_POSITIONS
        .iter()
        .enumerate()
        .map(|(i, position)| {
            point_light(&format!("point light {i}"), Vector3::from(*position))
                .with_colours(
                    Vector3::from_value(0.4),
                    Vector3::from_value(1.0),
                    Vector3::from_value(3.0),
                )
        })
        .collect()
}

pub fn sun() -> Light {
    Light::directional("sun", Vector3::new(-0.2, -1.0, -0.3)).with_colours(
        Vector3::new(0.2, 0.2, 0.1),
        Vector3::new(0.3, 0.3, 0.2),
        Vector3::new(0.5, 0.5, 0.3),
    )
}

/// Flashlight held by the camera.
pub fn flashlight(camera: &Camera) -> Light {
    Light::spot("flashlight", camera.position, camera.front)
        .with_colours(
            Vector3::from_value(0.4),
            Vector3::from_value(3.0),
            Vector3::from_value(10.0),
        )
        .with_attenuation(1.0, 0.35, 0.44)
        .with_cone(0.8, 0.9)
}

/// A weak directional light, four point lights and a flashlight that
/// follows the camera.
pub struct MultipleLights {
    scene: LitContainers,
}

impl MultipleLights {
    pub async fn new(init: InitContext) -> Result<Self> {
        let mut cache = TextureCache::new();
        let cube = textured_cube(&init, "container2", DIFFUSE_MAP, Some(SPECULAR_MAP), &mut cache)?;

        let points = point_lights();
        let mut lighting = LightingUniform::new(32.0);
        lighting.set_directional(Some(&sun()));
        lighting.set_points(&points)?;

        let positions: Vec<_> = points.iter().map(|light| light.position).collect();
        let lamps = Lamps::new(&init, [1.0; 3], 0.1, &positions)?;
        Ok(Self {
            scene: LitContainers::new(&init, cube, lighting, lamps)?,
        })
    }
}

impl Lesson for MultipleLights {
    fn on_update(&mut self, ctx: &Context, _dt: Duration, elapsed: Duration) {
        let spot = flashlight(&ctx.camera.camera);
        self.scene
            .lighting
            .update(&ctx.queue, |lighting| lighting.set_spot(Some(&spot)));
        self.scene.update(ctx, elapsed);
    }

    fn on_render(&self, ctx: &Context, encoder: &mut wgpu::CommandEncoder, target: &RenderTarget) {
        self.scene.render(ctx, encoder, target);
    }
}

#[cfg(test)]
mod tests {
    use crate::{config::CameraConfig, light::MAX_POINT_LIGHTS};

    use super::*;

    #[test]
    fn point_lights_fit_the_shader() {
        let points = point_lights();
        assert_eq!(points.len(), MAX_POINT_LIGHTS);
        let mut lighting = LightingUniform::new(32.0);
        lighting.set_points(&points).unwrap();
        assert_eq!(lighting.point_count(), 4);
    }

    #[test]
    fn flashlight_points_where_the_camera_looks() {
        let camera = Camera::new(800, 600, &CameraConfig::default());
        let spot = flashlight(&camera);
        assert_eq!(spot.position, camera.position);
        assert_eq!(spot.direction, camera.front);
        assert_eq!(spot.spot_intensity(1.0), 1.0);
        assert_eq!(spot.spot_intensity(0.7), 0.0);
    }
}
