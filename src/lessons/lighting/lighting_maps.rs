use anyhow::Result;
use cgmath::{Array, Vector3};
use instant::Duration;

use crate::{
    context::{Context, InitContext},
    data_structures::model::TextureCache,
    flow::Lesson,
    lessons::{
        common::{Lamps, textured_cube},
        lighting::LitContainers,
    },
    light::{Light, LightingUniform},
    render::RenderTarget,
};

pub const DIFFUSE_MAP: &str = "container2.png";
pub const SPECULAR_MAP: &str = "container2_specular.png";
pub const LIGHT_POSITION: Vector3<f32> = Vector3::new(5.0, 5.0, 0.0);

/// Light colour cycling at `rate` times the base frequencies (2, 0.7, 1.3).
/// Negative half-waves are cut to black.
pub fn cycling_colour(elapsed: Duration, rate: f32) -> Vector3<f32> {
    let t = elapsed.as_secs_f32() * rate;
    Vector3::new(
        (2.0 * t).sin().max(0.0),
        (0.7 * t).sin().max(0.0),
        (1.3 * t).sin().max(0.0),
    )
}

/// The steel-rimmed container: a diffuse map plus a specular map that only
/// lets the rim shine. The light slowly changes colour.
pub struct LightingMaps {
    scene: LitContainers,
    light: Light,
}

impl LightingMaps {
    pub async fn new(init: InitContext) -> Result<Self> {
        let mut cache = TextureCache::new();
        let cube = textured_cube(&init, "container2", DIFFUSE_MAP, Some(SPECULAR_MAP), &mut cache)?;

        let light = Light::point("light", LIGHT_POSITION)
            .with_colours(
                Vector3::from_value(0.2),
                Vector3::from_value(0.5),
                Vector3::from_value(1.0),
            )
            .with_attenuation(1.0, 0.0, 0.0);
        let mut lighting = LightingUniform::new(32.0);
        lighting.set_points(std::slice::from_ref(&light))?;

        let lamps = Lamps::new(&init, [1.0; 3], 1.0, &[LIGHT_POSITION])?;
        Ok(Self {
            scene: LitContainers::new(&init, cube, lighting, lamps)?,
            light,
        })
    }
}

impl Lesson for LightingMaps {
    fn on_update(&mut self, ctx: &Context, _dt: Duration, elapsed: Duration) {
        self.light.diffuse = cycling_colour(elapsed, 0.5);
        self.light.ambient = cycling_colour(elapsed, 0.2);
        let light = self.light.to_uniform();
        self.scene
            .lighting
            .update(&ctx.queue, |lighting| lighting.points[0] = light);
        self.scene
            .lamps
            .set_colour(&ctx.queue, cycling_colour(elapsed, 1.0).into());
        self.scene.update(ctx, elapsed);
    }

    fn on_render(&self, ctx: &Context, encoder: &mut wgpu::CommandEncoder, target: &RenderTarget) {
        self.scene.render(ctx, encoder, target);
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn colour_starts_dark() {
        assert_eq!(cycling_colour(Duration::ZERO, 1.0), Vector3::from_value(0.0));
    }

    #[test]
    fn colour_is_never_negative() {
        for ms in (0..20_000).step_by(53) {
            let colour = cycling_colour(Duration::from_millis(ms), 1.0);
            assert!(colour.x >= 0.0 && colour.y >= 0.0 && colour.z >= 0.0);
            assert!(colour.x <= 1.0 && colour.y <= 1.0 && colour.z <= 1.0);
        }
    }

    #[test]
    fn rate_slows_the_cycle() {
        let t = Duration::from_secs_f32(0.5);
        assert_relative_eq!(cycling_colour(t, 0.5).x, (0.5f32).sin(), epsilon = 1e-6);
    }
}
