//! Small linear-algebra helpers shared by the camera, lights and instances.
//!
//! cgmath builds OpenGL-style projections (clip depth in -1..1); wgpu expects
//! 0..1, so every projection built here is pre-multiplied with
//! [`OPENGL_TO_WGPU_MATRIX`].

use cgmath::{EuclideanSpace, Matrix, Matrix3, Matrix4, Point3, SquareMatrix, Vector3};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Below this the upper 3x3 is treated as singular.
const SINGULAR_EPSILON: f32 = 1e-5;

pub fn to_radians(degrees: f32) -> f32 {
    degrees * std::f32::consts::PI / 180.0
}

/// Column-major flattening, the layout uniform buffers expect.
pub fn flatten(m: &Matrix4<f32>) -> [f32; 16] {
    let cols: [[f32; 4]; 4] = (*m).into();
    let mut out = [0.0; 16];
    for (i, col) in cols.iter().enumerate() {
        out[i * 4..i * 4 + 4].copy_from_slice(col);
    }
    out
}

pub fn upper_left(m: &Matrix4<f32>) -> Matrix3<f32> {
    Matrix3::from_cols(m.x.truncate(), m.y.truncate(), m.z.truncate())
}

/// Determinant of the upper-left 3x3 block.
pub fn sub_determinant(m: &Matrix4<f32>) -> f32 {
    upper_left(m).determinant()
}

/// Inverse-transpose of the upper-left 3x3, which keeps normals perpendicular
/// to surfaces under non-uniform scaling. A singular block is returned as is.
pub fn normal_matrix(m: &Matrix4<f32>) -> Matrix3<f32> {
    let block = upper_left(m);
    if block.determinant().abs() < SINGULAR_EPSILON {
        return block;
    }
    match block.invert() {
        Some(inverse) => inverse.transpose(),
        None => block,
    }
}

pub fn look_at(eye: Vector3<f32>, target: Vector3<f32>, up: Vector3<f32>) -> Matrix4<f32> {
    Matrix4::look_at_rh(Point3::from_vec(eye), Point3::from_vec(target), up)
}

/// Perspective projection in wgpu clip space. `fovy` is in degrees.
pub fn perspective(fovy: f32, aspect: f32, near: f32, far: f32) -> Matrix4<f32> {
    OPENGL_TO_WGPU_MATRIX * cgmath::perspective(cgmath::Deg(fovy), aspect, near, far)
}

/// Orthographic projection in wgpu clip space.
pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Matrix4<f32> {
    OPENGL_TO_WGPU_MATRIX * cgmath::ortho(left, right, bottom, top, near, far)
}
