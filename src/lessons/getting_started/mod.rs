//! Flat 2D drawing, textures, transformations and the fly camera.

pub mod camera;
pub mod coordinates;
pub mod rectangle;
pub mod shaders;
pub mod textures;
pub mod triangle;

pub use camera::FlyCamera;
pub use coordinates::Coordinates;
pub use rectangle::Rectangle;
pub use shaders::Shaders;
pub use textures::Textures;
pub use triangle::Triangle;
