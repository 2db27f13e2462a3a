//! Built-in vertex data shared by the lessons.
//!
//! The getting-started data is given directly in normalized device
//! coordinates. The cube and the floor are generated with counter-clockwise
//! faces seen from outside, so back-face culling works on them, and with
//! texture coordinates whose `v` grows downwards like image rows.

use cgmath::Vector3;

use crate::data_structures::model::{MeshData, ModelVertex, TextureRef, Vertex};

/// Position and flat colour, used by the first lessons.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ColourVertex {
    pub position: [f32; 3],
    pub colour: [f32; 3],
}

impl Vertex for ColourVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ColourVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TexturedVertex {
    pub position: [f32; 3],
    pub colour: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex for TexturedVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
            wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<TexturedVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Position only, for the skybox.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PositionVertex {
    pub position: [f32; 3],
}

impl Vertex for PositionVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PositionVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Screen-space position and texture coordinates for full-screen passes.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ScreenVertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
}

impl Vertex for ScreenVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ScreenVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

pub const ORANGE: [f32; 3] = [1.0, 0.5, 0.2];
pub const YELLOW: [f32; 3] = [1.0, 1.0, 0.0];
pub const DARK_RED: [f32; 3] = [0.5, 0.0, 0.0];

/// Two small triangles side by side, each with its own colour.
pub const TRIANGLES: [ColourVertex; 6] = [
    ColourVertex { position: [-0.1, -0.1, 0.0], colour: ORANGE },
    ColourVertex { position: [0.1, -0.1, 0.0], colour: ORANGE },
    ColourVertex { position: [0.0, 0.1, 0.0], colour: ORANGE },
    ColourVertex { position: [0.1, -0.1, 0.0], colour: YELLOW },
    ColourVertex { position: [0.3, -0.1, 0.0], colour: YELLOW },
    ColourVertex { position: [0.2, 0.1, 0.0], colour: YELLOW },
];

pub const RECTANGLE: [ColourVertex; 4] = [
    ColourVertex { position: [0.5, 0.5, 0.0], colour: ORANGE },
    ColourVertex { position: [0.5, -0.5, 0.0], colour: ORANGE },
    ColourVertex { position: [-0.5, -0.5, 0.0], colour: ORANGE },
    ColourVertex { position: [-0.5, 0.5, 0.0], colour: ORANGE },
];

/// Shared by the rectangle and the textured quad.
pub const QUAD_INDICES: [u16; 6] = [0, 1, 3, 1, 2, 3];

pub const SHADER_TRIANGLE: [ColourVertex; 3] = [
    ColourVertex { position: [-0.5, -0.5, 0.0], colour: DARK_RED },
    ColourVertex { position: [0.5, -0.5, 0.0], colour: DARK_RED },
    ColourVertex { position: [0.0, 0.5, 0.0], colour: DARK_RED },
];

pub const TEXTURED_QUAD: [TexturedVertex; 4] = [
    TexturedVertex { position: [0.5, 0.5, 0.0], colour: [1.0, 0.0, 0.0], tex_coords: [1.0, 0.0] },
    TexturedVertex { position: [0.5, -0.5, 0.0], colour: [0.0, 1.0, 0.0], tex_coords: [1.0, 1.0] },
    TexturedVertex { position: [-0.5, -0.5, 0.0], colour: [0.0, 0.0, 1.0], tex_coords: [0.0, 1.0] },
    TexturedVertex { position: [-0.5, 0.5, 0.0], colour: [1.0, 1.0, 0.0], tex_coords: [0.0, 0.0] },
];

/// Two triangles covering the whole viewport.
pub const SCREEN_QUAD: [ScreenVertex; 6] = [
    ScreenVertex { position: [1.0, 1.0], tex_coords: [1.0, 0.0] },
    ScreenVertex { position: [1.0, -1.0], tex_coords: [1.0, 1.0] },
    ScreenVertex { position: [-1.0, -1.0], tex_coords: [0.0, 1.0] },
    ScreenVertex { position: [-1.0, -1.0], tex_coords: [0.0, 1.0] },
    ScreenVertex { position: [-1.0, 1.0], tex_coords: [0.0, 0.0] },
    ScreenVertex { position: [1.0, 1.0], tex_coords: [1.0, 0.0] },
];

/// Where the ten containers of the coordinate and lighting lessons sit.
pub const CUBE_POSITIONS: [[f32; 3]; 10] = [
    [0.0, 0.0, 0.0],
    [2.0, 5.0, -15.0],
    [-1.5, -2.2, -2.5],
    [-3.8, -2.0, -12.3],
    [2.4, -0.4, -3.5],
    [-1.7, 3.0, -7.5],
    [1.3, -2.0, -2.5],
    [1.5, 2.0, -2.5],
    [1.5, 0.2, -1.5],
    [-1.3, 1.0, -1.5],
];

pub const POINT_LIGHT_POSITIONS: [[f32; 3]; 4] = [
    [0.7, 0.2, 2.0],
    [2.3, -3.3, -4.0],
    [-4.0, 2.0, -12.0],
    [0.0, 0.0, -3.0],
];

/// Outward normal plus two in-plane axes with `u x v == normal`.
const CUBE_FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
    ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
    ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
    ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
    ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
];

/// Corner signs of a face, two counter-clockwise triangles.
const FACE_CORNERS: [(f32, f32); 6] = [
    (-1.0, -1.0),
    (1.0, -1.0),
    (1.0, 1.0),
    (1.0, 1.0),
    (-1.0, 1.0),
    (-1.0, -1.0),
];

fn face(
    center: Vector3<f32>,
    normal: Vector3<f32>,
    u: Vector3<f32>,
    v: Vector3<f32>,
    uv_scale: f32,
) -> impl Iterator<Item = ModelVertex> {
    FACE_CORNERS.into_iter().map(move |(a, b)| ModelVertex {
        position: (center + u * a + v * b).into(),
        normal: normal.into(),
        tex_coords: [(a + 1.0) * 0.5 * uv_scale, (1.0 - b) * 0.5 * uv_scale],
    })
}

/// Unit cube centred on the origin: 36 vertices, six per face.
pub fn cube_vertices() -> Vec<ModelVertex> {
    CUBE_FACES
        .iter()
        .flat_map(|(n, u, v)| {
            let normal = Vector3::from(*n);
            face(
                normal * 0.5,
                normal,
                Vector3::from(*u) * 0.5,
                Vector3::from(*v) * 0.5,
                1.0,
            )
        })
        .collect()
}

/// The cube as a mesh using the given diffuse and specular maps.
pub fn cube_mesh(name: &str, textures: Vec<TextureRef>) -> MeshData {
    let vertices = cube_vertices();
    MeshData {
        name: name.to_string(),
        indices: (0..vertices.len() as u32).collect(),
        vertices,
        textures,
    }
}

/// Cube corners for the skybox, which is seen from inside.
pub fn skybox_vertices() -> Vec<PositionVertex> {
    cube_vertices()
        .into_iter()
        .map(|v| PositionVertex {
            position: v.position.map(|c| c * 2.0),
        })
        .collect()
}

/// Square facing up at height `y`. Texture coordinates repeat `uv_repeat`
/// times across it.
pub fn floor_mesh(
    name: &str,
    half_extent: f32,
    y: f32,
    uv_repeat: f32,
    textures: Vec<TextureRef>,
) -> MeshData {
    let vertices: Vec<ModelVertex> = face(
        Vector3::new(0.0, y, 0.0),
        Vector3::unit_y(),
        Vector3::unit_x() * half_extent,
        -Vector3::unit_z() * half_extent,
        uv_repeat,
    )
    .collect();
    MeshData {
        name: name.to_string(),
        indices: (0..vertices.len() as u32).collect(),
        vertices,
        textures,
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use cgmath::InnerSpace;

    use super::*;

    fn triangle_normal(tri: &[ModelVertex]) -> Vector3<f32> {
        let a = Vector3::from(tri[0].position);
        let b = Vector3::from(tri[1].position);
        let c = Vector3::from(tri[2].position);
        (b - a).cross(c - a).normalize()
    }

    #[test]
    fn cube_has_36_outward_ccw_vertices() {
        let cube = cube_vertices();
        assert_eq!(cube.len(), 36);
        for tri in cube.chunks(3) {
            let normal = Vector3::from(tri[0].normal);
            assert_relative_eq!(triangle_normal(tri), normal, epsilon = 1e-6);
            let centre = tri
                .iter()
                .fold(Vector3::new(0.0, 0.0, 0.0), |acc, v| acc + Vector3::from(v.position))
                / 3.0;
            assert!(centre.dot(normal) > 0.0);
        }
    }

    #[test]
    fn cube_fits_unit_box_and_uvs_stay_in_range() {
        for v in cube_vertices() {
            assert!(v.position.iter().all(|c| c.abs() <= 0.5 + 1e-6));
            assert!(v.tex_coords.iter().all(|c| (0.0..=1.0).contains(c)));
        }
    }

    #[test]
    fn cube_mesh_is_a_valid_triangle_list() {
        let mesh = cube_mesh("cube", Vec::new());
        assert!(mesh.check().is_ok());
        assert_eq!(mesh.indices.len(), 36);
    }

    #[test]
    fn floor_faces_up_and_repeats_texture() {
        let floor = floor_mesh("floor", 25.0, -0.5, 25.0, Vec::new());
        assert_eq!(floor.vertices.len(), 6);
        for tri in floor.vertices.chunks(3) {
            assert_relative_eq!(triangle_normal(tri), Vector3::unit_y(), epsilon = 1e-6);
        }
        assert!(floor.vertices.iter().all(|v| v.position[1] == -0.5));
        let max_u = floor
            .vertices
            .iter()
            .map(|v| v.tex_coords[0])
            .fold(f32::MIN, f32::max);
        assert_relative_eq!(max_u, 25.0);
    }

    #[test]
    fn skybox_encloses_the_camera() {
        let sky = skybox_vertices();
        assert_eq!(sky.len(), 36);
        assert!(
            sky.iter()
                .all(|v| v.position.iter().any(|c| (c.abs() - 1.0).abs() < 1e-6))
        );
    }

    #[test]
    fn quad_indices_stay_in_bounds() {
        assert!(QUAD_INDICES.iter().all(|i| (*i as usize) < RECTANGLE.len()));
        assert!(QUAD_INDICES.iter().all(|i| (*i as usize) < TEXTURED_QUAD.len()));
    }

    #[test]
    fn vertex_strides_match_structs() {
        assert_eq!(ColourVertex::desc().array_stride, 24);
        assert_eq!(TexturedVertex::desc().array_stride, 32);
        assert_eq!(PositionVertex::desc().array_stride, 12);
        assert_eq!(ScreenVertex::desc().array_stride, 16);
    }
}
