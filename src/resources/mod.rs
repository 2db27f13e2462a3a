use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context as _, Result};

use crate::data_structures::{
    model::{Model, TextureCache},
    texture::Texture,
};

/**
 * This module contains all logic for loading meshes, textures and cubemaps
 * from the assets directory.
 */
pub mod mesh;
pub mod texture;

/// File access relative to the configured assets directory.
#[derive(Clone, Debug)]
pub struct Assets {
    root: PathBuf,
}

impl Assets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `file_name` resolved against the assets directory.
    pub fn path(&self, file_name: impl AsRef<Path>) -> PathBuf {
        self.root.join(file_name)
    }

    pub async fn load_string(&self, file_name: &str) -> Result<String> {
        let path = self.path(file_name);
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Could not read {}", path.display()))
    }

    pub async fn load_binary(&self, file_name: &str) -> Result<Vec<u8>> {
        let path = self.path(file_name);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("Could not read {}", path.display()))
    }

    /// Blocking read, used while textures are uploaded.
    pub fn read(&self, file_name: &Path) -> Result<Vec<u8>> {
        let path = self.path(file_name);
        std::fs::read(&path).with_context(|| format!("Could not read {}", path.display()))
    }

    /// Loads an `.obj`, `.gltf` or `.glb` model and uploads it. Textures
    /// already in `cache` are reused.
    pub async fn load_model(
        &self,
        file_name: &str,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        cache: &mut TextureCache<Arc<Texture>>,
    ) -> Result<Model> {
        let meshes = self
            .load_meshes(file_name)
            .await
            .with_context(|| format!("Failed to load model {file_name}"))?;
        Model::upload(device, queue, file_name, &meshes, cache, |path| self.read(path))
            .with_context(|| format!("Failed to upload model {file_name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lesson-ngin-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn strings_are_read_relative_to_the_root() {
        let dir = scratch_dir("strings");
        std::fs::write(dir.join("hello.txt"), "hello").unwrap();
        let assets = Assets::new(&dir);
        assert_eq!(assets.load_string("hello.txt").await.unwrap(), "hello");
        assert_eq!(assets.read(Path::new("hello.txt")).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn missing_files_name_the_path() {
        let assets = Assets::new("/definitely/not/here");
        let err = assets.load_binary("container.jpg").await.unwrap_err();
        assert!(format!("{err:#}").contains("container.jpg"));
    }

    #[tokio::test]
    async fn obj_meshes_pick_up_their_materials() {
        let dir = scratch_dir("obj");
        std::fs::create_dir_all(dir.join("crate")).unwrap();
        std::fs::write(
            dir.join("crate/crate.obj"),
            "mtllib crate.mtl\no box\nv 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\n\
             vn 0 0 1\nusemtl wood\nf 1/1/1 2/2/1 3/3/1\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("crate/crate.mtl"),
            "newmtl wood\nmap_Kd container2.png\nmap_Ks container2_specular.png\n",
        )
        .unwrap();

        let meshes = Assets::new(&dir).load_meshes("crate/crate.obj").await.unwrap();
        assert_eq!(meshes.len(), 1);
        let keys: Vec<String> = meshes[0].textures.iter().map(|t| t.key()).collect();
        assert_eq!(
            keys,
            ["crate/container2.png", "crate/container2_specular.png"]
        );
    }

    #[tokio::test]
    async fn unknown_model_formats_are_rejected() {
        let err = Assets::new(".").load_meshes("model.fbx").await.unwrap_err();
        assert!(err.to_string().contains("Unsupported model format"));
    }
}
