//! Render pipeline construction.
//!
//! - `basic` holds the generic pipeline builder and its options
//! - `shaders` lists every WGSL program of the lessons and its default state

pub mod basic;
pub mod shaders;

pub use basic::{PipelineOptions, mk_pipeline_layout, mk_render_pipeline};
pub use shaders::{ShaderKind, build_pipeline};
