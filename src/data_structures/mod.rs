//! Lesson data structures: models, textures, scene graphs and instances.
//!
//! - `model` contains mesh and material definitions and their GPU resources
//! - `texture` wraps GPU textures, depth targets and cubemaps
//! - `instance` holds per-instance transforms
//! - `scene_graph` flattens glTF node hierarchies into meshes

pub mod instance;
pub mod model;
pub mod scene_graph;
pub mod texture;
