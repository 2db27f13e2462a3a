use anyhow::Result;
use cgmath::Vector3;
use instant::Duration;

use crate::{
    context::{Context, InitContext},
    data_structures::model::TextureCache,
    flow::Lesson,
    lessons::{
        common::{Lamps, textured_cube},
        getting_started::textures::CONTAINER,
        lighting::LitContainers,
    },
    light::{Light, LightingUniform},
    render::RenderTarget,
};

pub const LIGHT_POSITION: Vector3<f32> = Vector3::new(5.0, 5.0, 0.0);
pub const LIGHT_COLOUR: [f32; 3] = [0.0, 1.0, 1.0];

/// Ambient, diffuse and specular terms of a cyan light on the containers.
pub struct BasicLighting {
    scene: LitContainers,
}

impl BasicLighting {
    pub async fn new(init: InitContext) -> Result<Self> {
        let mut cache = TextureCache::new();
        // One image serves as both maps, the cache uploads it once.
        let cube = textured_cube(&init, "container", CONTAINER, Some(CONTAINER), &mut cache)?;

        let colour = Vector3::from(LIGHT_COLOUR);
        let light = Light::point("light", LIGHT_POSITION)
            .with_colours(colour * 0.1, colour, colour * 0.5)
            .with_attenuation(1.0, 0.0, 0.0);
        let mut lighting = LightingUniform::new(32.0);
        lighting.set_points(std::slice::from_ref(&light))?;

        let lamps = Lamps::new(&init, LIGHT_COLOUR, 1.0, &[LIGHT_POSITION])?;
        Ok(Self {
            scene: LitContainers::new(&init, cube, lighting, lamps)?,
        })
    }
}

impl Lesson for BasicLighting {
    fn on_update(&mut self, ctx: &Context, _dt: Duration, elapsed: Duration) {
        self.scene.update(ctx, elapsed);
    }

    fn on_render(&self, ctx: &Context, encoder: &mut wgpu::CommandEncoder, target: &RenderTarget) {
        self.scene.render(ctx, encoder, target);
    }
}
