//! Lights, their shader-side representation and shadow maps.
//!
//! A [`Light`] carries every parameter of the three classic light types;
//! which of them a shader reads decides whether it acts as a directional,
//! point or spot light. Shadow casting lights additionally own a depth
//! target: [`ShadowMap`] for directional lights and [`CubeShadowMap`] for
//! omni-directional point lights.

use anyhow::{Result, bail};
use cgmath::{Matrix4, SquareMatrix, Vector3, Zero};

use crate::{
    data_structures::texture::Texture,
    math,
    shader::{Uniform, uniform_layout_entry},
};

pub const MAX_POINT_LIGHTS: usize = 4;

/// Cube faces in layer order: +X, -X, +Y, -Y, +Z, -Z.
pub const CUBE_FACES: [(Vector3<f32>, Vector3<f32>); 6] = [
    (Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, -1.0, 0.0)),
    (Vector3::new(-1.0, 0.0, 0.0), Vector3::new(0.0, -1.0, 0.0)),
    (Vector3::new(0.0, 1.0, 0.0), Vector3::new(0.0, 0.0, 1.0)),
    (Vector3::new(0.0, -1.0, 0.0), Vector3::new(0.0, 0.0, -1.0)),
    (Vector3::new(0.0, 0.0, 1.0), Vector3::new(0.0, -1.0, 0.0)),
    (Vector3::new(0.0, 0.0, -1.0), Vector3::new(0.0, -1.0, 0.0)),
];

// Framebuffer rows run top-down while cube-map t coordinates follow the GL
// face layout, so face projections render upside down.
#[rustfmt::skip]
const FLIP_Y: Matrix4<f32> = Matrix4::new(
    1.0,  0.0, 0.0, 0.0,
    0.0, -1.0, 0.0, 0.0,
    0.0,  0.0, 1.0, 0.0,
    0.0,  0.0, 0.0, 1.0,
);

#[derive(Clone, Debug, PartialEq)]
pub struct Light {
    pub name: String,
    /// Unused by directional lights.
    pub position: Vector3<f32>,
    /// Unused by point lights.
    pub direction: Vector3<f32>,
    pub ambient: Vector3<f32>,
    pub diffuse: Vector3<f32>,
    pub specular: Vector3<f32>,
    /// Cosine of the outer spot cone edge, where the light reaches zero.
    pub theta_min: f32,
    /// Cosine of the angle where the spot light starts to fade.
    pub theta_taper_start: f32,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
    pub shadow_width: u32,
    pub shadow_height: u32,
    /// Last matrix built by [`Light::shadow_matrix_directional`].
    pub shadow_matrix: Matrix4<f32>,
}

impl Light {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: Vector3::zero(),
            direction: Vector3::zero(),
            ambient: Vector3::zero(),
            diffuse: Vector3::zero(),
            specular: Vector3::zero(),
            theta_min: 0.5,
            theta_taper_start: 0.6,
            constant: 1.0,
            linear: 0.07,
            quadratic: 0.017,
            shadow_width: 1024,
            shadow_height: 1024,
            shadow_matrix: Matrix4::identity(),
        }
    }

    pub fn directional(name: impl Into<String>, direction: Vector3<f32>) -> Self {
        Self::new(name).with_direction(direction)
    }

    pub fn point(name: impl Into<String>, position: Vector3<f32>) -> Self {
        Self::new(name).with_position(position)
    }

    pub fn spot(name: impl Into<String>, position: Vector3<f32>, direction: Vector3<f32>) -> Self {
        Self::new(name)
            .with_position(position)
            .with_direction(direction)
    }

    pub fn with_position(mut self, position: Vector3<f32>) -> Self {
        self.position = position;
        self
    }

    pub fn with_direction(mut self, direction: Vector3<f32>) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_colours(
        mut self,
        ambient: Vector3<f32>,
        diffuse: Vector3<f32>,
        specular: Vector3<f32>,
    ) -> Self {
        self.ambient = ambient;
        self.diffuse = diffuse;
        self.specular = specular;
        self
    }

    pub fn with_attenuation(mut self, constant: f32, linear: f32, quadratic: f32) -> Self {
        self.constant = constant;
        self.linear = linear;
        self.quadratic = quadratic;
        self
    }

    pub fn with_cone(mut self, theta_min: f32, theta_taper_start: f32) -> Self {
        self.theta_min = theta_min;
        self.theta_taper_start = theta_taper_start;
        self
    }

    pub fn with_shadow_size(mut self, width: u32, height: u32) -> Self {
        self.shadow_width = width;
        self.shadow_height = height;
        self
    }

    pub fn to_uniform(&self) -> LightUniform {
        LightUniform {
            position: self.position.into(),
            constant: self.constant,
            direction: self.direction.into(),
            linear: self.linear,
            ambient: self.ambient.into(),
            quadratic: self.quadratic,
            diffuse: self.diffuse.into(),
            theta_min: self.theta_min,
            specular: self.specular.into(),
            theta_taper_start: self.theta_taper_start,
        }
    }

    /// Fraction of the light left after `distance` units.
    pub fn attenuation(&self, distance: f32) -> f32 {
        1.0 / (self.constant + self.linear * distance + self.quadratic * distance * distance)
    }

    /// Spot cone falloff for the cosine between the spot direction and the
    /// direction towards the lit fragment.
    pub fn spot_intensity(&self, cos_theta: f32) -> f32 {
        let epsilon = self.theta_taper_start - self.theta_min;
        if epsilon.abs() <= f32::EPSILON {
            return if cos_theta >= self.theta_min { 1.0 } else { 0.0 };
        }
        ((cos_theta - self.theta_min) / epsilon).clamp(0.0, 1.0)
    }

    /// Light-space matrix of a directional light that sits at `position`
    /// and looks at `center`. `ortho` is `[left, right, bottom, top]`.
    pub fn shadow_matrix_directional(
        &mut self,
        center: Vector3<f32>,
        up: Vector3<f32>,
        near: f32,
        far: f32,
        ortho: [f32; 4],
    ) -> Matrix4<f32> {
        let view = math::look_at(self.position, center, up);
        let [left, right, bottom, top] = ortho;
        let projection = math::orthographic(left, right, bottom, top, near, far);
        self.shadow_matrix = projection * view;
        self.shadow_matrix
    }

    /// One view-projection per cube face, in [`CUBE_FACES`] order.
    pub fn point_shadow_matrices(&self, near: f32, far: f32) -> [Matrix4<f32>; 6] {
        let projection = FLIP_Y * math::perspective(90.0, 1.0, near, far);
        CUBE_FACES.map(|(dir, up)| projection * math::look_at(self.position, self.position + dir, up))
    }
}

/// Shader layout of a [`Light`]: every vec3 shares its 16 bytes with one
/// scalar.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub position: [f32; 3],
    pub constant: f32,
    pub direction: [f32; 3],
    pub linear: f32,
    pub ambient: [f32; 3],
    pub quadratic: f32,
    pub diffuse: [f32; 3],
    pub theta_min: f32,
    pub specular: [f32; 3],
    pub theta_taper_start: f32,
}

/// Every light of a lesson plus the material shininess, uploaded as one
/// block.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightingUniform {
    pub directional: LightUniform,
    pub points: [LightUniform; MAX_POINT_LIGHTS],
    pub spot: LightUniform,
    /// Point light count, directional on, spot on, Blinn-Phong on.
    pub flags: [u32; 4],
    /// Shininess followed by padding.
    pub material: [f32; 4],
}

impl LightingUniform {
    pub fn new(shininess: f32) -> Self {
        let mut uniform: Self = bytemuck::Zeroable::zeroed();
        uniform.material[0] = shininess;
        uniform
    }

    pub fn set_directional(&mut self, light: Option<&Light>) {
        match light {
            Some(light) => {
                self.directional = light.to_uniform();
                self.flags[1] = 1;
            }
            None => self.flags[1] = 0,
        }
    }

    pub fn set_points(&mut self, lights: &[Light]) -> Result<()> {
        if lights.len() > MAX_POINT_LIGHTS {
            bail!(
                "{} point lights given, shaders support at most {MAX_POINT_LIGHTS}",
                lights.len()
            );
        }
        for (slot, light) in self.points.iter_mut().zip(lights) {
            *slot = light.to_uniform();
        }
        self.flags[0] = lights.len() as u32;
        Ok(())
    }

    pub fn set_spot(&mut self, light: Option<&Light>) {
        match light {
            Some(light) => {
                self.spot = light.to_uniform();
                self.flags[2] = 1;
            }
            None => self.flags[2] = 0,
        }
    }

    pub fn set_blinn(&mut self, blinn: bool) {
        self.flags[3] = blinn as u32;
    }

    pub fn blinn(&self) -> bool {
        self.flags[3] != 0
    }

    pub fn point_count(&self) -> usize {
        self.flags[0] as usize
    }
}

pub fn lighting_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("lighting layout"),
        entries: &[uniform_layout_entry(
            0,
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        )],
    })
}

pub fn lighting_uniform(device: &wgpu::Device, value: LightingUniform) -> Uniform<LightingUniform> {
    Uniform::with_layout(device, "lighting", value, lighting_bind_group_layout(device))
}

/// Data of one shadow pass: the light-space matrix plus the light position
/// with the far plane in `w` (only used by cube shadows).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShadowUniform {
    pub light_space: [[f32; 4]; 4],
    pub light_position: [f32; 4],
}

impl ShadowUniform {
    pub fn new(light_space: Matrix4<f32>, position: Vector3<f32>, far: f32) -> Self {
        Self {
            light_space: light_space.into(),
            light_position: position.extend(far).into(),
        }
    }
}

pub fn shadow_pass_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("shadow pass layout"),
        entries: &[uniform_layout_entry(
            0,
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        )],
    })
}

/// Layout used by lit passes to sample a shadow map: depth texture,
/// comparison sampler and the [`ShadowUniform`] it was rendered with.
pub fn shadow_sampling_layout(
    device: &wgpu::Device,
    view_dimension: wgpu::TextureViewDimension,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("shadow sampling layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension,
                    sample_type: wgpu::TextureSampleType::Depth,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                count: None,
            },
            uniform_layout_entry(2, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT),
        ],
    })
}

fn sampling_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    texture: &Texture,
    sampler: &wgpu::Sampler,
    uniform: &wgpu::Buffer,
    label: &str,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: uniform.as_entire_binding(),
            },
        ],
    })
}

fn begin_depth_pass<'a>(
    encoder: &'a mut wgpu::CommandEncoder,
    view: &'a wgpu::TextureView,
    label: &str,
) -> wgpu::RenderPass<'a> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        ..Default::default()
    })
}

/// Depth target of a directional light.
#[derive(Debug)]
pub struct ShadowMap {
    pub texture: Texture,
    pub pass: Uniform<ShadowUniform>,
    pub sampling_layout: wgpu::BindGroupLayout,
    pub sampling: wgpu::BindGroup,
}

impl ShadowMap {
    pub fn new(device: &wgpu::Device, light: &Light) -> Result<Self> {
        let texture = Texture::create_shadow_texture(
            device,
            [light.shadow_width, light.shadow_height],
            &format!("{} shadow map", light.name),
        );
        let Some(sampler) = texture.sampler.as_ref() else {
            bail!("Shadow texture of {} has no sampler", light.name);
        };
        let pass = Uniform::with_layout(
            device,
            &format!("{} shadow", light.name),
            ShadowUniform::new(light.shadow_matrix, light.position, 0.0),
            shadow_pass_layout(device),
        );
        let sampling_layout = shadow_sampling_layout(device, wgpu::TextureViewDimension::D2);
        let sampling = sampling_bind_group(
            device,
            &sampling_layout,
            &texture,
            sampler,
            &pass.buffer,
            &format!("{} shadow sampling", light.name),
        );
        log::debug!(
            "Created {}x{} shadow map for {}",
            light.shadow_width,
            light.shadow_height,
            light.name
        );
        Ok(Self {
            texture,
            pass,
            sampling_layout,
            sampling,
        })
    }

    /// Uploads the light's current shadow matrix.
    pub fn update(&mut self, queue: &wgpu::Queue, light: &Light) {
        self.pass
            .set(queue, ShadowUniform::new(light.shadow_matrix, light.position, 0.0));
    }

    pub fn begin_pass<'a>(&'a self, encoder: &'a mut wgpu::CommandEncoder) -> wgpu::RenderPass<'a> {
        begin_depth_pass(encoder, &self.texture.view, "shadow pass")
    }
}

/// Six-face depth cube of an omni-directional light. Stores the distance to
/// the light divided by the far plane.
#[derive(Debug)]
pub struct CubeShadowMap {
    pub texture: Texture,
    pub face_views: [wgpu::TextureView; 6],
    pub faces: [Uniform<ShadowUniform>; 6],
    pub sampling_layout: wgpu::BindGroupLayout,
    pub sampling: wgpu::BindGroup,
    pub near: f32,
    pub far: f32,
}

impl CubeShadowMap {
    pub fn new(device: &wgpu::Device, light: &Light, near: f32, far: f32) -> Result<Self> {
        if light.shadow_width != light.shadow_height {
            bail!(
                "Cube shadow of {} must be square, got {}x{}",
                light.name,
                light.shadow_width,
                light.shadow_height
            );
        }
        let texture = Texture::create_cube_depth_texture(
            device,
            light.shadow_width,
            &format!("{} cube shadow", light.name),
        );
        let Some(sampler) = texture.sampler.as_ref() else {
            bail!("Cube shadow texture of {} has no sampler", light.name);
        };
        let face_views = std::array::from_fn(|face| texture.layer_view(face as u32));
        let layout = shadow_pass_layout(device);
        let matrices = light.point_shadow_matrices(near, far);
        let faces = std::array::from_fn(|face| {
            Uniform::with_layout(
                device,
                &format!("{} shadow face {face}", light.name),
                ShadowUniform::new(matrices[face], light.position, far),
                layout.clone(),
            )
        });
        let sampling_layout = shadow_sampling_layout(device, wgpu::TextureViewDimension::Cube);
        // Lit passes only need position and far plane, which every face shares.
        let sampling = sampling_bind_group(
            device,
            &sampling_layout,
            &texture,
            sampler,
            &faces[0].buffer,
            &format!("{} cube shadow sampling", light.name),
        );
        Ok(Self {
            texture,
            face_views,
            faces,
            sampling_layout,
            sampling,
            near,
            far,
        })
    }

    /// Rebuilds the face matrices around the light's current position.
    pub fn update(&mut self, queue: &wgpu::Queue, light: &Light) {
        let matrices = light.point_shadow_matrices(self.near, self.far);
        for (face, matrix) in self.faces.iter_mut().zip(matrices) {
            face.set(queue, ShadowUniform::new(matrix, light.position, self.far));
        }
    }

    pub fn begin_face_pass<'a>(
        &'a self,
        encoder: &'a mut wgpu::CommandEncoder,
        face: usize,
    ) -> wgpu::RenderPass<'a> {
        begin_depth_pass(encoder, &self.face_views[face], "cube shadow pass")
    }
}
