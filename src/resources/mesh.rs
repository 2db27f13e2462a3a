use std::{
    io::{BufReader, Cursor},
    path::{Path, PathBuf},
};

use anyhow::{Context as _, Result, bail};

use crate::{
    data_structures::{
        model::{self, MeshData},
        scene_graph,
    },
    resources::Assets,
};

/// Model file formats understood by [`Assets::load_meshes`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelFormat {
    Obj,
    Gltf,
    Glb,
}

impl ModelFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
        match ext.as_str() {
            "obj" => Some(Self::Obj),
            "gltf" => Some(Self::Gltf),
            "glb" => Some(Self::Glb),
            _ => None,
        }
    }
}

/// Directory of `file_name` inside the assets folder; texture and material
/// paths inside model files are relative to it.
pub fn model_directory(file_name: &str) -> PathBuf {
    Path::new(file_name)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

impl Assets {
    /// Reads a model file into CPU meshes, dispatching on its extension.
    pub async fn load_meshes(&self, file_name: &str) -> Result<Vec<MeshData>> {
        let meshes = match ModelFormat::from_path(Path::new(file_name)) {
            Some(ModelFormat::Obj) => self.load_obj(file_name).await?,
            Some(ModelFormat::Gltf) | Some(ModelFormat::Glb) => self.load_gltf(file_name).await?,
            None => bail!("Unsupported model format: {file_name}"),
        };
        if meshes.is_empty() {
            bail!("Model {file_name} contains no meshes");
        }
        log::info!("Read {} meshes from {file_name}", meshes.len());
        Ok(meshes)
    }

    async fn load_obj(&self, file_name: &str) -> Result<Vec<MeshData>> {
        let obj_text = self.load_string(file_name).await?;
        let mut obj_reader = BufReader::new(Cursor::new(obj_text));
        let directory = model_directory(file_name);
        let mtl_root = self.path(&directory);

        let (models, obj_materials) = tobj::load_obj_buf_async(
            &mut obj_reader,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
            |p| {
                let path = mtl_root.join(p);
                async move {
                    match tokio::fs::read_to_string(&path).await {
                        Ok(mat_text) => tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(mat_text))),
                        Err(e) => {
                            log::warn!("Material file {} not readable: {e}", path.display());
                            Err(tobj::LoadError::OpenFileFailed)
                        }
                    }
                }
            },
        )
        .await
        .with_context(|| format!("Could not parse {file_name}"))?;

        let materials = obj_materials.unwrap_or_else(|e| {
            log::warn!("{file_name} has no usable materials ({e}), using fallback textures");
            Vec::new()
        });
        Ok(model::scene_from_obj(&models, &materials, &directory))
    }

    async fn load_gltf(&self, file_name: &str) -> Result<Vec<MeshData>> {
        let gltf_bytes = self.load_binary(file_name).await?;
        let gltf = gltf::Gltf::from_slice(&gltf_bytes)
            .with_context(|| format!("Could not parse {file_name}"))?;
        let directory = model_directory(file_name);

        let mut buffer_data = Vec::new();
        for buffer in gltf.buffers() {
            match buffer.source() {
                gltf::buffer::Source::Bin => {
                    let Some(blob) = gltf.blob.as_deref() else {
                        bail!("{file_name} references a binary chunk it does not have");
                    };
                    buffer_data.push(blob.to_vec());
                }
                gltf::buffer::Source::Uri(uri) => {
                    if uri.starts_with("data:") {
                        bail!("{file_name}: data URI buffers are not supported");
                    }
                    let path = directory.join(uri);
                    buffer_data.push(self.load_binary(&path.to_string_lossy()).await?);
                }
            }
        }

        scene_graph::scene_from_gltf(&gltf.document, &buffer_data, Path::new(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_the_extension() {
        assert_eq!(ModelFormat::from_path(Path::new("backpack/backpack.obj")), Some(ModelFormat::Obj));
        assert_eq!(ModelFormat::from_path(Path::new("Box.GLTF")), Some(ModelFormat::Gltf));
        assert_eq!(ModelFormat::from_path(Path::new("box.glb")), Some(ModelFormat::Glb));
        assert_eq!(ModelFormat::from_path(Path::new("box.fbx")), None);
        assert_eq!(ModelFormat::from_path(Path::new("box")), None);
    }

    #[test]
    fn model_directory_is_relative_to_assets() {
        assert_eq!(model_directory("backpack/backpack.obj"), PathBuf::from("backpack"));
        assert_eq!(model_directory("cube.obj"), PathBuf::from(""));
    }
}
