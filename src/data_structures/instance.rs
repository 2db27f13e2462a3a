//! Per-instance transformation data for GPU rendering.
//!
//! Every lesson draws its objects instanced, even when there is only one:
//! the model matrix and the matching normal matrix travel in a per-instance
//! vertex buffer (shader locations 5 to 11) instead of a uniform.

use cgmath::{Deg, Matrix4, One, Quaternion, Rotation3, Vector3};
use wgpu::util::DeviceExt;

use crate::{data_structures::model, math};

/// Position, rotation and scale of one drawn copy of a model.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub position: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Instance {
    pub fn new() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::one(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn at(position: Vector3<f32>) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// `axis` does not need to be normalized.
    pub fn rotated(mut self, axis: Vector3<f32>, angle: Deg<f32>) -> Self {
        use cgmath::InnerSpace;
        if axis.magnitude2() > 0.0 {
            self.rotation = Quaternion::from_axis_angle(axis.normalize(), angle);
        }
        self
    }

    pub fn scaled(mut self, scale: f32) -> Self {
        self.scale = Vector3::new(scale, scale, scale);
        self
    }

    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from(self.rotation)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn to_raw(&self) -> InstanceRaw {
        let model = self.to_matrix();
        InstanceRaw {
            model: model.into(),
            normal: math::normal_matrix(&model).into(),
        }
    }
}

impl From<Vector3<f32>> for Instance {
    fn from(position: Vector3<f32>) -> Self {
        Self::at(position)
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

/// The instance as stored on the GPU.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 3]; 3],
}

impl model::Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            // Advance once per instance rather than per vertex
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                // A mat4 takes four vec4 slots
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
                // Normal matrix as three vec3 columns
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 16]>() as wgpu::BufferAddress,
                    shader_location: 9,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 19]>() as wgpu::BufferAddress,
                    shader_location: 10,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 22]>() as wgpu::BufferAddress,
                    shader_location: 11,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Vertex buffer holding the raw form of a list of instances.
#[derive(Debug)]
pub struct InstanceBuffer {
    pub buffer: wgpu::Buffer,
    len: u32,
    capacity: usize,
    label: String,
}

impl InstanceBuffer {
    pub fn new(device: &wgpu::Device, label: &str, instances: &[Instance]) -> Self {
        let raw: Vec<InstanceRaw> = instances.iter().map(Instance::to_raw).collect();
        let buffer = Self::create(device, label, &raw);
        Self {
            buffer,
            len: raw.len() as u32,
            capacity: raw.len(),
            label: label.to_string(),
        }
    }

    fn create(device: &wgpu::Device, label: &str, raw: &[InstanceRaw]) -> wgpu::Buffer {
        // Zero-sized buffers can't be bound, keep room for one instance.
        let contents: &[InstanceRaw] = if raw.is_empty() {
            &[InstanceRaw {
                model: [[0.0; 4]; 4],
                normal: [[0.0; 3]; 3],
            }]
        } else {
            raw
        };
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(contents),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        })
    }

    /// Rewrites the buffer, growing it when there are more instances than
    /// before.
    pub fn update(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, instances: &[Instance]) {
        let raw: Vec<InstanceRaw> = instances.iter().map(Instance::to_raw).collect();
        if raw.len() > self.capacity {
            self.buffer = Self::create(device, &self.label, &raw);
            self.capacity = raw.len();
        } else if !raw.is_empty() {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&raw));
        }
        self.len = raw.len() as u32;
    }

    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn range(&self) -> std::ops::Range<u32> {
        0..self.len
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use cgmath::{Matrix3, SquareMatrix, Vector4};

    use super::*;
    use crate::data_structures::model::Vertex;

    #[test]
    fn identity_instance_is_identity() {
        let raw = Instance::new().to_raw();
        assert_eq!(raw.model, Into::<[[f32; 4]; 4]>::into(Matrix4::<f32>::identity()));
        assert_eq!(raw.normal, Into::<[[f32; 3]; 3]>::into(Matrix3::<f32>::identity()));
    }

    #[test]
    fn matrix_scales_then_rotates_then_translates() {
        let instance = Instance::at(Vector3::new(0.0, 0.0, -5.0))
            .rotated(Vector3::new(0.0, 2.0, 0.0), Deg(90.0))
            .scaled(2.0);
        let p = instance.to_matrix() * Vector4::new(1.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(p, Vector4::new(0.0, 0.0, -7.0, 1.0), epsilon = 1e-5);
    }

    #[test]
    fn zero_axis_keeps_the_rotation() {
        let instance = Instance::new().rotated(Vector3::new(0.0, 0.0, 0.0), Deg(45.0));
        assert_eq!(instance.rotation, Quaternion::one());
    }

    #[test]
    fn normal_matrix_undoes_uniform_scale() {
        let raw = Instance::new().scaled(4.0).to_raw();
        assert_relative_eq!(raw.normal[0][0], 0.25, epsilon = 1e-6);
        assert_relative_eq!(raw.model[0][0], 4.0, epsilon = 1e-6);
    }

    #[test]
    fn layout_covers_both_matrices() {
        let layout = InstanceRaw::desc();
        assert_eq!(layout.array_stride, (16 + 9) * 4);
        assert_eq!(layout.attributes.len(), 7);
        assert_eq!(layout.attributes[6].shader_location, 11);
    }
}
