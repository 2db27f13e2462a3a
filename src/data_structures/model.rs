//! Meshes, materials and models.
//!
//! Loading happens in two steps. Importers ([`scene_from_obj`] and
//! [`super::scene_graph::scene_from_gltf`]) turn files into CPU-side
//! [`MeshData`]; [`Model::upload`] then creates the GPU buffers and one
//! material per mesh, decoding each distinct texture only once through a
//! [`TextureCache`].

use std::{
    collections::{BTreeSet, HashMap, hash_map::Entry},
    ops::Range,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context as _, Result, bail};
use cgmath::Vector3;
use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        scene_graph::centroid,
        texture::{Texture, TextureKind},
    },
    resources::texture::diffuse_specular_layout,
};

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Where a texture's bytes come from.
#[derive(Clone, Debug, PartialEq)]
pub enum TextureSource {
    /// Relative to the assets directory.
    Path(PathBuf),
    /// Image data stored inside the model file.
    Embedded {
        key: String,
        bytes: Arc<Vec<u8>>,
        mime_type: Option<String>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextureRef {
    pub kind: TextureKind,
    pub source: TextureSource,
}

impl TextureRef {
    pub fn path(kind: TextureKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            source: TextureSource::Path(path.into()),
        }
    }

    /// Cache key; equal keys are assumed to hold the same image.
    pub fn key(&self) -> String {
        match &self.source {
            TextureSource::Path(path) => path.to_string_lossy().replace('\\', "/"),
            TextureSource::Embedded { key, .. } => key.clone(),
        }
    }

    /// Extension hint for the image decoder.
    pub fn format_hint(&self) -> Option<String> {
        match &self.source {
            TextureSource::Path(path) => path
                .extension()
                .map(|ext| ext.to_string_lossy().to_ascii_lowercase()),
            TextureSource::Embedded { mime_type, .. } => mime_type
                .as_deref()
                .and_then(|mime| mime.rsplit('/').next())
                .map(str::to_string),
        }
    }
}

/// A mesh before it is uploaded to the GPU.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    pub textures: Vec<TextureRef>,
}

impl MeshData {
    pub fn check(&self) -> Result<()> {
        if self.indices.len() % 3 != 0 {
            bail!(
                "mesh {} has {} indices, not a triangle list",
                self.name,
                self.indices.len()
            );
        }
        if let Some(index) = self
            .indices
            .iter()
            .find(|i| **i as usize >= self.vertices.len())
        {
            bail!(
                "mesh {} references vertex {index} but has {} vertices",
                self.name,
                self.vertices.len()
            );
        }
        Ok(())
    }

    pub fn first_texture(&self, kind: TextureKind) -> Option<&TextureRef> {
        self.textures.iter().find(|t| t.kind == kind)
    }
}

/// Distinct textures the meshes actually bind, one diffuse and one specular
/// map at most per mesh.
pub fn distinct_texture_count(meshes: &[MeshData]) -> usize {
    meshes
        .iter()
        .flat_map(|mesh| TextureKind::ALL.into_iter().filter_map(|kind| mesh.first_texture(kind)))
        .map(TextureRef::key)
        .collect::<BTreeSet<_>>()
        .len()
}

/// Converts OBJ meshes into [`MeshData`]. Texture file names from the
/// materials are resolved against `directory`.
///
/// Expects meshes loaded with `single_index` and `triangulate`. Missing
/// normals or texture coordinates become zero; V is flipped because image
/// rows start at the top.
pub fn scene_from_obj(
    models: &[tobj::Model],
    materials: &[tobj::Material],
    directory: &Path,
) -> Vec<MeshData> {
    models
        .iter()
        .enumerate()
        .filter_map(|(idx, m)| {
            let mesh = &m.mesh;
            let vertices = (0..mesh.positions.len() / 3)
                .map(|i| ModelVertex {
                    position: [
                        mesh.positions[i * 3],
                        mesh.positions[i * 3 + 1],
                        mesh.positions[i * 3 + 2],
                    ],
                    normal: [
                        mesh.normals.get(i * 3).map_or(0.0, |f| *f),
                        mesh.normals.get(i * 3 + 1).map_or(0.0, |f| *f),
                        mesh.normals.get(i * 3 + 2).map_or(0.0, |f| *f),
                    ],
                    tex_coords: [
                        mesh.texcoords.get(i * 2).map_or(0.0, |f| *f),
                        1.0 - mesh.texcoords.get(i * 2 + 1).map_or(0.0, |f| *f),
                    ],
                })
                .collect();

            let mut textures = Vec::new();
            if let Some(material) = mesh.material_id.and_then(|id| materials.get(id)) {
                if let Some(diffuse) = &material.diffuse_texture {
                    textures.push(TextureRef::path(TextureKind::Diffuse, directory.join(diffuse)));
                }
                if let Some(specular) = &material.specular_texture {
                    textures.push(TextureRef::path(
                        TextureKind::Specular,
                        directory.join(specular),
                    ));
                }
            }

            let data = MeshData {
                name: if m.name.is_empty() {
                    format!("mesh{idx}")
                } else {
                    m.name.clone()
                },
                vertices,
                indices: mesh.indices.clone(),
                textures,
            };
            match data.check() {
                Ok(()) => Some(data),
                Err(e) => {
                    log::warn!("Skipping mesh at index {idx}: {e}");
                    None
                }
            }
        })
        .collect()
}

/// Keeps one loaded value per key. The number of entries is the number of
/// distinct textures a model needed.
#[derive(Debug)]
pub struct TextureCache<T> {
    entries: HashMap<String, T>,
    hits: usize,
}

impl<T> Default for TextureCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            hits: 0,
        }
    }
}

impl<T> TextureCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value for `key`, running `load` only on a miss. A
    /// failed load leaves the cache unchanged.
    pub fn get_or_try_insert_with<F>(&mut self, key: &str, load: F) -> Result<&T>
    where
        F: FnOnce() -> Result<T>,
    {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(entry) => {
                self.hits += 1;
                log::debug!("Texture cache hit for {key}");
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => {
                log::debug!("Texture cache miss for {key}");
                Ok(entry.insert(load()?))
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }
}

#[derive(Debug)]
pub struct Material {
    pub name: String,
    pub diffuse_texture: Arc<Texture>,
    pub specular_texture: Arc<Texture>,
    pub bind_group: wgpu::BindGroup,
}

impl Material {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        diffuse_texture: Arc<Texture>,
        specular_texture: Arc<Texture>,
        layout: &wgpu::BindGroupLayout,
    ) -> Result<Self> {
        let (Some(diffuse_sampler), Some(specular_sampler)) = (
            diffuse_texture.sampler.as_ref(),
            specular_texture.sampler.as_ref(),
        ) else {
            bail!("Material {name} needs textures with samplers");
        };
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&diffuse_texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(diffuse_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&specular_texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(specular_sampler),
                },
            ],
            label: Some(name),
        });

        Ok(Self {
            name: name.to_string(),
            diffuse_texture,
            specular_texture,
            bind_group,
        })
    }
}

#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
    pub material: usize,
}

impl Mesh {
    pub fn new(device: &wgpu::Device, data: &MeshData, material: usize) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", data.name)),
            contents: bytemuck::cast_slice(&data.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", data.name)),
            contents: bytemuck::cast_slice(&data.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            name: data.name.clone(),
            vertex_buffer,
            index_buffer,
            num_elements: data.indices.len() as u32,
            material,
        }
    }
}

#[derive(Debug)]
pub struct Model {
    pub name: String,
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
    /// Average vertex position in model space.
    pub centre: Vector3<f32>,
    texture_count: usize,
}

impl Model {
    /// Uploads meshes and builds their materials. Textures are looked up in
    /// `cache` first; path textures are read through `read`. A mesh without
    /// a diffuse map renders white, one without a specular map gets no
    /// highlights.
    pub fn upload<R>(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        name: &str,
        meshes: &[MeshData],
        cache: &mut TextureCache<Arc<Texture>>,
        read: R,
    ) -> Result<Self>
    where
        R: Fn(&Path) -> Result<Vec<u8>>,
    {
        let layout = diffuse_specular_layout(device);
        let mut fallbacks: HashMap<TextureKind, Arc<Texture>> = HashMap::new();
        let mut gpu_meshes = Vec::with_capacity(meshes.len());
        let mut materials = Vec::with_capacity(meshes.len());

        for data in meshes {
            data.check()?;
            let mut textures = Vec::with_capacity(2);
            for kind in TextureKind::ALL {
                if data.textures.iter().filter(|t| t.kind == kind).count() > 1 {
                    log::warn!(
                        "Mesh {} has several {kind:?} textures, only the first is used",
                        data.name
                    );
                }
                let texture = match data.first_texture(kind) {
                    Some(texture_ref) => cache
                        .get_or_try_insert_with(&texture_ref.key(), || {
                            load_texture_ref(device, queue, texture_ref, &read).map(Arc::new)
                        })
                        .with_context(|| format!("Could not load textures of mesh {}", data.name))?
                        .clone(),
                    None => fallbacks
                        .entry(kind)
                        .or_insert_with(|| {
                            Arc::new(Texture::solid(
                                device,
                                queue,
                                kind.fallback_rgba(),
                                kind.is_srgb(),
                                &format!("{kind:?} fallback"),
                            ))
                        })
                        .clone(),
                };
                textures.push(texture);
            }
            let specular = textures.pop();
            let diffuse = textures.pop();
            let (Some(diffuse), Some(specular)) = (diffuse, specular) else {
                bail!("Mesh {} is missing material textures", data.name);
            };
            materials.push(Material::new(device, &data.name, diffuse, specular, &layout)?);
            gpu_meshes.push(Mesh::new(device, data, materials.len() - 1));
        }

        let texture_count = distinct_texture_count(meshes);
        log::info!(
            "Uploaded model {name}: {} meshes, {texture_count} textures ({} cache hits so far)",
            gpu_meshes.len(),
            cache.hits()
        );
        Ok(Self {
            name: name.to_string(),
            meshes: gpu_meshes,
            materials,
            centre: centroid(meshes),
            texture_count,
        })
    }

    /// A single mesh with a ready material, used for the lessons' built-in
    /// geometry.
    pub fn from_mesh(device: &wgpu::Device, data: &MeshData, material: Material) -> Result<Self> {
        data.check()?;
        Ok(Self {
            name: data.name.clone(),
            meshes: vec![Mesh::new(device, data, 0)],
            materials: vec![material],
            centre: centroid(std::slice::from_ref(data)),
            texture_count: distinct_texture_count(std::slice::from_ref(data)),
        })
    }

    /// Distinct texture files and embedded images referenced by this
    /// model's meshes. Entries other models left in a shared cache are not
    /// counted.
    pub fn texture_count(&self) -> usize {
        self.texture_count
    }
}

fn load_texture_ref<R>(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture_ref: &TextureRef,
    read: &R,
) -> Result<Texture>
where
    R: Fn(&Path) -> Result<Vec<u8>>,
{
    let key = texture_ref.key();
    let format = texture_ref.format_hint();
    let srgb = texture_ref.kind.is_srgb();
    match &texture_ref.source {
        TextureSource::Path(path) => {
            let bytes = read(path).with_context(|| format!("Could not read texture {key}"))?;
            Texture::from_bytes(device, queue, &bytes, &key, format.as_deref(), srgb)
        }
        TextureSource::Embedded { bytes, .. } => {
            Texture::from_bytes(device, queue, bytes, &key, format.as_deref(), srgb)
        }
    }
}

/// Material bind group index used by lit pipelines.
pub const MATERIAL_GROUP: u32 = 2;

pub trait DrawModel<'a> {
    fn draw_mesh(&mut self, mesh: &'a Mesh, material: &'a Material, instances: Range<u32>);
    fn draw_model(&mut self, model: &'a Model, instances: Range<u32>);
    /// Draws without binding materials, for depth-only passes.
    fn draw_model_geometry(&mut self, model: &'a Model, instances: Range<u32>);
}

impl<'a, 'b> DrawModel<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_mesh(&mut self, mesh: &'b Mesh, material: &'b Material, instances: Range<u32>) {
        self.set_bind_group(MATERIAL_GROUP, &material.bind_group, &[]);
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }

    fn draw_model(&mut self, model: &'b Model, instances: Range<u32>) {
        for mesh in &model.meshes {
            match model.materials.get(mesh.material) {
                Some(material) => self.draw_mesh(mesh, material, instances.clone()),
                None => log::warn!("Mesh {} has no material, skipping", mesh.name),
            }
        }
    }

    fn draw_model_geometry(&mut self, model: &'b Model, instances: Range<u32>) {
        for mesh in &model.meshes {
            self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            self.draw_indexed(0..mesh.num_elements, 0, instances.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufReader, Cursor};

    use super::*;

    const QUAD_OBJ: &str = "\
o quad
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 1.0 1.0 0.0
v 0.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
vn 0.0 0.0 1.0
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    fn load(obj: &str) -> Vec<tobj::Model> {
        let mut reader = BufReader::new(Cursor::new(obj));
        let (models, _materials) = tobj::load_obj_buf(
            &mut reader,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
            |_| Err(tobj::LoadError::OpenFileFailed),
        )
        .unwrap();
        models
    }

    #[test]
    fn obj_quad_becomes_two_triangles_with_flipped_v() {
        let meshes = scene_from_obj(&load(QUAD_OBJ), &[], Path::new("models"));
        assert_eq!(meshes.len(), 1);
        let quad = &meshes[0];
        assert_eq!(quad.name, "quad");
        assert_eq!(quad.vertices.len(), 4);
        assert_eq!(quad.indices.len(), 6);
        assert!(quad.textures.is_empty());

        let origin = quad
            .vertices
            .iter()
            .find(|v| v.position == [0.0, 0.0, 0.0])
            .unwrap();
        assert_eq!(origin.tex_coords, [0.0, 1.0]);
        assert_eq!(origin.normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn missing_normals_and_uvs_are_zeroed() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let meshes = scene_from_obj(&load(obj), &[], Path::new(""));
        assert_eq!(meshes[0].vertices.len(), 3);
        for v in &meshes[0].vertices {
            assert_eq!(v.normal, [0.0; 3]);
            assert_eq!(v.tex_coords, [0.0, 1.0]);
        }
    }

    #[test]
    fn materials_become_texture_refs_in_the_model_directory() {
        let model = tobj::Model {
            mesh: tobj::Mesh {
                positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
                indices: vec![0, 1, 2],
                material_id: Some(0),
                ..Default::default()
            },
            name: "crate".to_string(),
        };
        let material = tobj::Material {
            name: "wood".to_string(),
            diffuse_texture: Some("container2.png".to_string()),
            specular_texture: Some("container2_specular.png".to_string()),
            ..Default::default()
        };
        let meshes = scene_from_obj(&[model], &[material], Path::new("models/crate"));
        let textures = &meshes[0].textures;
        assert_eq!(textures.len(), 2);
        assert_eq!(
            textures[0],
            TextureRef::path(TextureKind::Diffuse, "models/crate/container2.png")
        );
        assert_eq!(textures[1].kind, TextureKind::Specular);
        assert_eq!(textures[1].key(), "models/crate/container2_specular.png");
        assert_eq!(textures[1].format_hint().as_deref(), Some("png"));
    }

    #[test]
    fn meshes_with_out_of_range_indices_are_skipped() {
        let model = tobj::Model {
            mesh: tobj::Mesh {
                positions: vec![0.0; 9],
                indices: vec![0, 1, 7],
                ..Default::default()
            },
            name: "broken".to_string(),
        };
        assert!(scene_from_obj(&[model], &[], Path::new("")).is_empty());
    }

    #[test]
    fn cache_loads_each_key_once() {
        let mut cache: TextureCache<u32> = TextureCache::new();
        let mut loads = 0;
        for key in ["a.png", "b.png", "a.png", "a.png"] {
            cache
                .get_or_try_insert_with(key, || {
                    loads += 1;
                    Ok(loads)
                })
                .unwrap();
        }
        assert_eq!(loads, 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.hits(), 2);
        assert_eq!(cache.get("a.png"), Some(&1));
        assert_eq!(cache.get("b.png"), Some(&2));
    }

    #[test]
    fn failed_loads_are_not_cached() {
        let mut cache: TextureCache<u32> = TextureCache::new();
        assert!(
            cache
                .get_or_try_insert_with("missing.png", || Err(anyhow::anyhow!("no such file")))
                .is_err()
        );
        assert!(cache.is_empty());
        assert!(!cache.contains("missing.png"));
        let value = cache.get_or_try_insert_with("missing.png", || Ok(7)).unwrap();
        assert_eq!(*value, 7);
    }

    #[test]
    fn embedded_textures_use_their_key_and_mime_type() {
        let texture = TextureRef {
            kind: TextureKind::Diffuse,
            source: TextureSource::Embedded {
                key: "backpack.glb#image0".to_string(),
                bytes: Arc::new(vec![1, 2, 3]),
                mime_type: Some("image/jpeg".to_string()),
            },
        };
        assert_eq!(texture.key(), "backpack.glb#image0");
        assert_eq!(texture.format_hint().as_deref(), Some("jpeg"));
    }

    #[test]
    fn model_vertex_layout_matches_struct() {
        let layout = ModelVertex::desc();
        assert_eq!(layout.array_stride, 32);
        assert_eq!(layout.attributes.len(), 3);
        assert_eq!(layout.attributes[2].offset, 24);
    }

    fn mesh(name: &str, textures: Vec<TextureRef>) -> MeshData {
        MeshData {
            name: name.to_string(),
            textures,
            ..Default::default()
        }
    }

    #[test]
    fn texture_count_only_covers_the_models_own_maps() {
        let meshes = [
            mesh(
                "body",
                vec![
                    TextureRef::path(TextureKind::Diffuse, "diffuse.jpg"),
                    TextureRef::path(TextureKind::Specular, "specular.jpg"),
                ],
            ),
            mesh("strap", vec![TextureRef::path(TextureKind::Diffuse, "diffuse.jpg")]),
            // Second diffuse map is never bound.
            mesh(
                "buckle",
                vec![
                    TextureRef::path(TextureKind::Diffuse, "metal.jpg"),
                    TextureRef::path(TextureKind::Diffuse, "unused.jpg"),
                ],
            ),
            mesh("floor", vec![]),
        ];
        assert_eq!(distinct_texture_count(&meshes), 3);

        let mut shared: TextureCache<u32> = TextureCache::new();
        for key in ["other-model.png", "diffuse.jpg"] {
            shared.get_or_try_insert_with(key, || Ok(0)).unwrap();
        }
        assert_eq!(shared.len(), 2);
        assert_eq!(distinct_texture_count(&meshes[1..2]), 1);
    }
}
