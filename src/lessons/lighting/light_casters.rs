use anyhow::Result;
use cgmath::{Array, Vector3};
use instant::Duration;

use crate::{
    context::{Context, InitContext},
    data_structures::model::TextureCache,
    flow::Lesson,
    lessons::{
        common::{Lamps, textured_cube},
        lighting::{
            LitContainers,
            lighting_maps::{DIFFUSE_MAP, SPECULAR_MAP},
        },
    },
    light::{Light, LightingUniform},
    render::RenderTarget,
};

pub const LIGHT_POSITION: Vector3<f32> = Vector3::new(5.0, 5.0, 0.0);

/// A strong point light whose intensity falls off with distance, so the far
/// containers stay dark.
pub fn point_light(name: &str, position: Vector3<f32>) -> Light {
    Light::point(name, position)
        .with_colours(
            Vector3::from_value(0.4),
            Vector3::from_value(3.0),
            Vector3::from_value(10.0),
        )
        .with_attenuation(1.0, 0.35, 0.44)
}

pub struct LightCasters {
    scene: LitContainers,
}

impl LightCasters {
    pub async fn new(init: InitContext) -> Result<Self> {
        let mut cache = TextureCache::new();
        let cube = textured_cube(&init, "container2", DIFFUSE_MAP, Some(SPECULAR_MAP), &mut cache)?;

        let mut lighting = LightingUniform::new(32.0);
        lighting.set_points(&[point_light("light", LIGHT_POSITION)])?;

        let lamps = Lamps::new(&init, [1.0; 3], 1.0, &[LIGHT_POSITION])?;
        Ok(Self {
            scene: LitContainers::new(&init, cube, lighting, lamps)?,
        })
    }
}

impl Lesson for LightCasters {
    fn on_update(&mut self, ctx: &Context, _dt: Duration, elapsed: Duration) {
        self.scene.update(ctx, elapsed);
    }

    fn on_render(&self, ctx: &Context, encoder: &mut wgpu::CommandEncoder, target: &RenderTarget) {
        self.scene.render(ctx, encoder, target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_fades_with_distance() {
        let light = point_light("light", LIGHT_POSITION);
        assert_eq!(light.attenuation(0.0), 1.0);
        assert!(light.attenuation(1.0) > light.attenuation(7.0));
        assert!(light.attenuation(20.0) < 0.01);
    }
}
