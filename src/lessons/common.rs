//! Pieces several lessons share: the spinning containers, orbiting lights,
//! lamp cubes and texture pairs.

use std::sync::Arc;

use anyhow::{Context as _, Result, bail};
use cgmath::{Deg, InnerSpace, Quaternion, Rotation3, Vector3};
use instant::Duration;
use winit::{
    event::{KeyEvent, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::{
    context::{Context, InitContext},
    data_structures::{
        instance::{Instance, InstanceBuffer},
        model::{Material, Mesh, Model, TextureCache, TextureRef},
        texture::{Texture, TextureKind},
    },
    geometry::{self, CUBE_POSITIONS},
    pipelines::{PipelineOptions, ShaderKind, build_pipeline},
    resources::texture::{diffuse_specular_layout, single_texture_bind_group, single_texture_layout},
    shader::Uniform,
};

pub const BACKPACK: &str = "backpack/backpack.obj";
pub const SKYBOX: &str = "skybox";

/// Containers spin at this rate around [`spin_axis`].
pub const DEGREES_PER_SECOND: f32 = 50.0;

pub fn spin_axis() -> Vector3<f32> {
    Vector3::new(0.5, 1.0, 0.0).normalize()
}

pub fn colour(r: f64, g: f64, b: f64) -> wgpu::Color {
    wgpu::Color { r, g, b, a: 1.0 }
}

/// The ten containers. Each one is turned by 20 degrees times its index;
/// those for which `spinning` holds also rotate with time.
pub fn container_instances<F>(seconds: f32, spinning: F) -> Vec<Instance>
where
    F: Fn(usize) -> bool,
{
    CUBE_POSITIONS
        .iter()
        .enumerate()
        .map(|(i, position)| {
            let offset = 20.0 * i as f32;
            let angle = if spinning(i) {
                DEGREES_PER_SECOND * seconds + offset
            } else {
                offset
            };
            Instance::at((*position).into()).rotated(spin_axis(), Deg(angle))
        })
        .collect()
}

/// `start` turned around the y axis at [`DEGREES_PER_SECOND`].
pub fn orbit(start: Vector3<f32>, elapsed: Duration) -> Vector3<f32> {
    let angle = Deg(DEGREES_PER_SECOND * elapsed.as_secs_f32());
    Quaternion::from_axis_angle(Vector3::unit_y(), angle) * start
}

/// Whether `event` is a fresh press of `key`.
pub fn key_pressed(event: &WindowEvent, key: KeyCode) -> bool {
    matches!(
        event,
        WindowEvent::KeyboardInput {
            event: KeyEvent {
                physical_key: PhysicalKey::Code(code),
                state,
                repeat: false,
                ..
            },
            ..
        } if *code == key && state.is_pressed()
    )
}

pub fn place_camera(ctx: &mut Context, position: [f32; 3], speed: f32) {
    let [x, y, z] = position;
    ctx.camera.camera.set_position(x, y, z);
    ctx.camera.camera.movement_speed = speed;
    ctx.camera.write(&ctx.queue);
}

/// Blend weight between two textures, read from `x`.
pub fn mix_uniform(device: &wgpu::Device, weight: f32) -> Uniform<[f32; 4]> {
    Uniform::new(device, "mix", [weight, 0.0, 0.0, 0.0], wgpu::ShaderStages::FRAGMENT)
}

pub fn tint_uniform(device: &wgpu::Device, label: &str, rgb: [f32; 3]) -> Uniform<[f32; 4]> {
    let [r, g, b] = rgb;
    Uniform::new(device, label, [r, g, b, 1.0], wgpu::ShaderStages::FRAGMENT)
}

/// Two textures bound together in a diffuse/specular `layout`.
pub async fn texture_pair(
    init: &InitContext,
    layout: &wgpu::BindGroupLayout,
    first: &str,
    second: &str,
) -> Result<Material> {
    let (first_texture, second_texture) = futures::try_join!(
        init.assets
            .load_texture(first, true, &init.device, &init.queue),
        init.assets
            .load_texture(second, true, &init.device, &init.queue),
    )?;
    Material::new(
        &init.device,
        &format!("{first} + {second}"),
        Arc::new(first_texture),
        Arc::new(second_texture),
        layout,
    )
}

/// A unit cube with the given maps. Textures already in `cache` are reused.
pub fn textured_cube(
    init: &InitContext,
    name: &str,
    diffuse: &str,
    specular: Option<&str>,
    cache: &mut TextureCache<Arc<Texture>>,
) -> Result<Model> {
    let mut textures = vec![TextureRef::path(TextureKind::Diffuse, diffuse)];
    if let Some(specular) = specular {
        textures.push(TextureRef::path(TextureKind::Specular, specular));
    }
    let mesh = geometry::cube_mesh(name, textures);
    Model::upload(&init.device, &init.queue, name, &[mesh], cache, |path| {
        init.assets.read(path)
    })
    .with_context(|| format!("Could not build the {name} cube"))
}

/// The backpack model with its own texture cache.
pub async fn load_backpack(init: &InitContext) -> Result<Model> {
    let mut cache = TextureCache::new();
    init.assets
        .load_model(BACKPACK, &init.device, &init.queue, &mut cache)
        .await
}

/// Phong pipeline with the camera, `lighting_layout` and material groups.
pub fn phong_pipeline<F>(
    init: &InitContext,
    lighting_layout: &wgpu::BindGroupLayout,
    customise: F,
) -> Result<wgpu::RenderPipeline>
where
    F: for<'a> FnOnce(PipelineOptions<'a>) -> PipelineOptions<'a>,
{
    let material_layout = diffuse_specular_layout(&init.device);
    Ok(build_pipeline(
        &init.device,
        ShaderKind::Phong,
        init.format,
        &[&init.camera_layout, lighting_layout, &material_layout],
        customise,
    )?)
}

/// The six skybox faces as a cube texture plus its bind group.
pub struct Sky {
    pub texture: Texture,
    pub layout: wgpu::BindGroupLayout,
    pub bind_group: wgpu::BindGroup,
}

impl Sky {
    pub async fn load(init: &InitContext) -> Result<Self> {
        let texture = init
            .assets
            .load_cubemap(SKYBOX, &init.device, &init.queue)
            .await?;
        let Some(sampler) = texture.sampler.as_ref() else {
            bail!("Cubemap {SKYBOX} has no sampler");
        };
        let layout = single_texture_layout(
            &init.device,
            wgpu::TextureViewDimension::Cube,
            wgpu::TextureSampleType::Float { filterable: true },
        );
        let bind_group =
            single_texture_bind_group(&init.device, &layout, &texture.view, sampler, "skybox");
        Ok(Self {
            texture,
            layout,
            bind_group,
        })
    }
}

/// Small unlit cubes marking light positions.
pub struct Lamps {
    pipeline: wgpu::RenderPipeline,
    cube: Mesh,
    tint: Uniform<[f32; 4]>,
    instances: InstanceBuffer,
    scale: f32,
}

impl Lamps {
    pub fn new(init: &InitContext, rgb: [f32; 3], scale: f32, positions: &[Vector3<f32>]) -> Result<Self> {
        let tint = tint_uniform(&init.device, "lamp tint", rgb);
        let pipeline = build_pipeline(
            &init.device,
            ShaderKind::Flat,
            init.format,
            &[&init.camera_layout, &tint.layout],
            |options| options,
        )?;
        let cube = Mesh::new(&init.device, &geometry::cube_mesh("lamp", vec![]), 0);
        let instances = InstanceBuffer::new(&init.device, "lamps", &lamp_instances(positions, scale));
        Ok(Self {
            pipeline,
            cube,
            tint,
            instances,
            scale,
        })
    }

    pub fn move_to(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, positions: &[Vector3<f32>]) {
        self.instances
            .update(device, queue, &lamp_instances(positions, self.scale));
    }

    pub fn set_colour(&mut self, queue: &wgpu::Queue, rgb: [f32; 3]) {
        self.tint.update(queue, |tint| tint[..3].copy_from_slice(&rgb));
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, camera: &wgpu::BindGroup) {
        if self.instances.is_empty() {
            return;
        }
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, camera, &[]);
        pass.set_bind_group(1, &self.tint.bind_group, &[]);
        pass.set_vertex_buffer(0, self.cube.vertex_buffer.slice(..));
        pass.set_vertex_buffer(1, self.instances.buffer.slice(..));
        pass.set_index_buffer(self.cube.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.cube.num_elements, 0, self.instances.range());
    }
}

fn lamp_instances(positions: &[Vector3<f32>], scale: f32) -> Vec<Instance> {
    positions
        .iter()
        .map(|position| Instance::at(*position).scaled(scale))
        .collect()
}
