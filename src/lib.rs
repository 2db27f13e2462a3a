//! lesson-ngin
//!
//! A collection of small real-time rendering lessons on wgpu, from a single
//! coloured triangle through textures, a fly camera, Phong lighting and
//! model loading up to cubemaps and shadow mapping. Every lesson implements
//! [`flow::Lesson`] and is started with [`flow::run`]; [`lessons::LessonKind`]
//! names them all.
//!
//! High-level modules
//! - `config`: window, asset and camera settings with environment overrides
//! - `context`: GPU device, surface and camera shared by the running lesson
//! - `camera`: fly camera, its keyboard/mouse controller and uniform
//! - `shader`: WGSL validation and the generic uniform wrapper
//! - `pipelines`: the shader catalogue and pipeline builder
//! - `data_structures`: meshes, materials, instances and textures
//! - `resources`: loading models, textures and cubemaps from the assets
//! - `geometry`: hard-coded triangle, quad, cube and floor meshes
//! - `light`: light sources, the lighting uniform and shadow maps
//! - `render`: render targets and frame readback
//! - `flow`: the per-lesson run loop
//! - `lessons`: the lessons themselves

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod geometry;
pub mod lessons;
pub mod light;
pub mod math;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod shader;

pub use cgmath;
pub use wgpu;
pub use winit;
