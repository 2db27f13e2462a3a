//! Blinn-Phong highlights and shadows from directional and point lights.

pub mod blinn_phong;
pub mod point_shadows;
pub mod shadow_mapping;

pub use blinn_phong::BlinnPhong;
pub use point_shadows::PointShadows;
pub use shadow_mapping::ShadowMapping;

use anyhow::Result;
use cgmath::{Array, Vector3};
use instant::Duration;

use crate::{
    context::InitContext,
    data_structures::{
        instance::{Instance, InstanceBuffer},
        model::{DrawModel, Model, TextureCache},
    },
    geometry::floor_mesh,
    lessons::common::{load_backpack, orbit},
    light::Light,
};

pub const FLOOR_Y: f32 = -2.0;
pub const FLOOR_HALF_EXTENT: f32 = 10.0;

/// A point light circling the model at `start`'s radius and height.
pub fn orbiting_light(
    start: Vector3<f32>,
    elapsed: Duration,
    ambient: f32,
    diffuse: f32,
    specular: f32,
) -> Light {
    Light::point("light", orbit(start, elapsed)).with_colours(
        Vector3::from_value(ambient),
        Vector3::from_value(diffuse),
        Vector3::from_value(specular),
    )
}

/// The backpack standing above an untextured floor. The floor gets the
/// white diffuse fallback and no highlights.
pub struct ShadowScene {
    pub backpack: Model,
    pub floor: Model,
    instance: InstanceBuffer,
}

impl ShadowScene {
    pub async fn load(init: &InitContext) -> Result<Self> {
        let backpack = load_backpack(init).await?;
        let mut cache = TextureCache::new();
        let floor = Model::upload(
            &init.device,
            &init.queue,
            "floor",
            &[floor_mesh("floor", FLOOR_HALF_EXTENT, FLOOR_Y, 1.0, vec![])],
            &mut cache,
            |path| init.assets.read(path),
        )?;
        let instance = InstanceBuffer::new(&init.device, "shadow scene", &[Instance::new()]);
        Ok(Self {
            backpack,
            floor,
            instance,
        })
    }

    /// Draws with materials into a pass whose pipeline has them in group 2.
    pub fn draw<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>) {
        pass.set_vertex_buffer(1, self.instance.buffer.slice(..));
        pass.draw_model(&self.backpack, self.instance.range());
        pass.draw_model(&self.floor, self.instance.range());
    }

    /// Geometry only, for the shadow passes.
    pub fn draw_geometry<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>) {
        pass.set_vertex_buffer(1, self.instance.buffer.slice(..));
        pass.draw_model_geometry(&self.backpack, self.instance.range());
        pass.draw_model_geometry(&self.floor, self.instance.range());
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn orbiting_light_keeps_its_height() {
        let start = Vector3::new(4.0, 3.0, 0.0);
        let light = orbiting_light(start, Duration::from_secs(3), 0.4, 1.0, 3.0);
        assert_relative_eq!(light.position.y, 3.0, epsilon = 1e-5);
        assert_eq!(light.diffuse, Vector3::from_value(1.0));
    }
}
