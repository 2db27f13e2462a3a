//! Stencil outlines and cubemaps.

pub mod cubemaps;
pub mod stencil_testing;

pub use cubemaps::Cubemaps;
pub use stencil_testing::StencilTesting;
