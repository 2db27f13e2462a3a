//! Scene graph built from glTF documents.
//!
//! glTF stores meshes in a node hierarchy where every node carries a local
//! transform. [`SceneNode`] mirrors that hierarchy; [`SceneNode::flatten`]
//! walks it depth first, multiplying the transforms on the way down and
//! baking the accumulated matrix into each mesh's positions and normals so
//! that the result can be drawn with a single model matrix.

use std::{path::Path, sync::Arc};

use anyhow::{Context as _, Result, bail};
use cgmath::{InnerSpace, Matrix4, SquareMatrix, Vector3, Zero};

use crate::{
    data_structures::{
        model::{MeshData, ModelVertex, TextureRef, TextureSource},
        texture::TextureKind,
    },
    math,
};

#[derive(Clone, Debug)]
pub struct SceneNode {
    pub name: String,
    pub local: Matrix4<f32>,
    /// Meshes in the node's own coordinate system.
    pub meshes: Vec<MeshData>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, local: Matrix4<f32>) -> Self {
        Self {
            name: name.into(),
            local,
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Appends this node's meshes and those of all descendants, transformed
    /// into the parent's space.
    pub fn flatten(&self, parent: &Matrix4<f32>, out: &mut Vec<MeshData>) {
        let world = parent * self.local;
        out.extend(self.meshes.iter().map(|mesh| bake(mesh, &world)));
        for child in &self.children {
            child.flatten(&world, out);
        }
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len() + self.children.iter().map(|c| c.mesh_count()).sum::<usize>()
    }
}

/// Applies `transform` to positions and normals. Mirroring transforms flip
/// the triangle winding back.
pub fn bake(mesh: &MeshData, transform: &Matrix4<f32>) -> MeshData {
    let normal_matrix = math::normal_matrix(transform);
    let vertices = mesh
        .vertices
        .iter()
        .map(|v| {
            let position = transform * Vector3::from(v.position).extend(1.0);
            let mut normal = normal_matrix * Vector3::from(v.normal);
            if normal.magnitude2() > 0.0 {
                normal = normal.normalize();
            }
            ModelVertex {
                position: position.truncate().into(),
                normal: normal.into(),
                tex_coords: v.tex_coords,
            }
        })
        .collect();

    let mut indices = mesh.indices.clone();
    if math::sub_determinant(transform) < 0.0 {
        for triangle in indices.chunks_exact_mut(3) {
            triangle.swap(1, 2);
        }
    }

    MeshData {
        name: mesh.name.clone(),
        vertices,
        indices,
        textures: mesh.textures.clone(),
    }
}

/// Builds the node tree of the document's default scene (or of every scene
/// when there is no default). `source` is the model path relative to the
/// assets directory; image URIs resolve against its directory.
pub fn build_scene(
    document: &gltf::Document,
    buffers: &[Vec<u8>],
    source: &Path,
) -> Result<SceneNode> {
    let mut root = SceneNode::new(source.to_string_lossy(), Matrix4::identity());
    let scenes: Vec<gltf::Scene> = match document.default_scene() {
        Some(scene) => vec![scene],
        None => document.scenes().collect(),
    };
    for scene in scenes {
        for node in scene.nodes() {
            root.children.push(visit(&node, buffers, source)?);
        }
    }
    Ok(root)
}

fn visit(node: &gltf::Node, buffers: &[Vec<u8>], source: &Path) -> Result<SceneNode> {
    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node{}", node.index()));
    let mut scene_node = SceneNode::new(name, Matrix4::from(node.transform().matrix()));

    if let Some(mesh) = node.mesh() {
        let mesh_name = mesh
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("mesh{}", mesh.index()));
        for primitive in mesh.primitives() {
            let name = format!("{mesh_name}.{}", primitive.index());
            if let Some(data) = read_primitive(&name, &primitive, buffers, source)? {
                scene_node.meshes.push(data);
            }
        }
    }
    for child in node.children() {
        scene_node.children.push(visit(&child, buffers, source)?);
    }
    Ok(scene_node)
}

fn read_primitive(
    name: &str,
    primitive: &gltf::Primitive,
    buffers: &[Vec<u8>],
    source: &Path,
) -> Result<Option<MeshData>> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        log::warn!("Skipping {name}: {:?} primitives are not supported", primitive.mode());
        return Ok(None);
    }
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|b| b.as_slice()));

    let Some(positions) = reader.read_positions() else {
        log::warn!("Skipping {name}: no positions");
        return Ok(None);
    };
    let mut vertices: Vec<ModelVertex> = positions
        .map(|position| ModelVertex {
            position,
            ..Default::default()
        })
        .collect();
    if let Some(normals) = reader.read_normals() {
        for (vertex, normal) in vertices.iter_mut().zip(normals) {
            vertex.normal = normal;
        }
    }
    // glTF texture coordinates already start at the top row.
    if let Some(tex_coords) = reader.read_tex_coords(0) {
        for (vertex, uv) in vertices.iter_mut().zip(tex_coords.into_f32()) {
            vertex.tex_coords = uv;
        }
    }
    let indices = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertices.len() as u32).collect(),
    };

    let mut textures = Vec::new();
    if let Some(info) = primitive
        .material()
        .pbr_metallic_roughness()
        .base_color_texture()
    {
        if let Some(texture) = image_ref(&info.texture().source(), buffers, source)? {
            textures.push(texture);
        }
    }

    let data = MeshData {
        name: name.to_string(),
        vertices,
        indices,
        textures,
    };
    data.check()?;
    Ok(Some(data))
}

fn image_ref(
    image: &gltf::Image,
    buffers: &[Vec<u8>],
    source: &Path,
) -> Result<Option<TextureRef>> {
    let texture_source = match image.source() {
        gltf::image::Source::Uri { uri, .. } => {
            if uri.starts_with("data:") {
                log::warn!("Ignoring data URI image {} of {}", image.index(), source.display());
                return Ok(None);
            }
            let directory = source.parent().unwrap_or_else(|| Path::new(""));
            TextureSource::Path(directory.join(uri))
        }
        gltf::image::Source::View { view, mime_type } => {
            let buffer = buffers
                .get(view.buffer().index())
                .with_context(|| format!("Missing buffer {}", view.buffer().index()))?;
            let start = view.offset();
            let end = start + view.length();
            if end > buffer.len() {
                bail!(
                    "Image {} of {} reaches past its buffer",
                    image.index(),
                    source.display()
                );
            }
            TextureSource::Embedded {
                key: format!("{}#image{}", source.display(), image.index()),
                bytes: Arc::new(buffer[start..end].to_vec()),
                mime_type: Some(mime_type.to_string()),
            }
        }
    };
    Ok(Some(TextureRef {
        kind: TextureKind::Diffuse,
        source: texture_source,
    }))
}

/// All meshes of a glTF document with node transforms baked in.
pub fn scene_from_gltf(
    document: &gltf::Document,
    buffers: &[Vec<u8>],
    source: &Path,
) -> Result<Vec<MeshData>> {
    let root = build_scene(document, buffers, source)?;
    let mut meshes = Vec::with_capacity(root.mesh_count());
    root.flatten(&Matrix4::identity(), &mut meshes);
    if meshes.is_empty() {
        log::warn!("{} contains no drawable meshes", source.display());
    }
    Ok(meshes)
}

/// Average of all vertex positions, handy for pointing lights at a model.
pub fn centroid(meshes: &[MeshData]) -> Vector3<f32> {
    let (sum, count) = meshes
        .iter()
        .flat_map(|m| m.vertices.iter())
        .fold((Vector3::zero(), 0usize), |(sum, n), v| {
            (sum + Vector3::from(v.position), n + 1)
        });
    if count == 0 {
        Vector3::zero()
    } else {
        sum / count as f32
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use cgmath::Deg;

    use super::*;

    const SCENE: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [ { "nodes": [0] } ],
        "nodes": [
            { "name": "parent", "translation": [1.0, 0.0, 0.0], "children": [1] },
            { "name": "child", "mesh": 0, "scale": [2.0, 2.0, 2.0] }
        ],
        "meshes": [ {
            "name": "tri",
            "primitives": [ {
                "attributes": { "POSITION": 0, "NORMAL": 1, "TEXCOORD_0": 2 },
                "indices": 3,
                "material": 0
            } ]
        } ],
        "materials": [ { "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } } } ],
        "textures": [ { "source": 0 } ],
        "images": [ { "uri": "diffuse.png" } ],
        "buffers": [ { "uri": "scene.bin", "byteLength": 104 } ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 72, "byteLength": 24 },
            { "buffer": 0, "byteOffset": 96, "byteLength": 6 }
        ],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
              "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
            { "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC3" },
            { "bufferView": 2, "componentType": 5126, "count": 3, "type": "VEC2" },
            { "bufferView": 3, "componentType": 5123, "count": 3, "type": "SCALAR" }
        ]
    }"#;

    fn scene_buffer() -> Vec<u8> {
        let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let normals: [f32; 9] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
        let uvs: [f32; 6] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
        let indices: [u16; 4] = [0, 1, 2, 0];
        let mut bytes = Vec::new();
        bytes.extend_from_slice(bytemuck::cast_slice(&positions));
        bytes.extend_from_slice(bytemuck::cast_slice(&normals));
        bytes.extend_from_slice(bytemuck::cast_slice(&uvs));
        bytes.extend_from_slice(bytemuck::cast_slice(&indices));
        bytes
    }

    fn load() -> Vec<MeshData> {
        let gltf = gltf::Gltf::from_slice(SCENE.as_bytes()).unwrap();
        scene_from_gltf(&gltf.document, &[scene_buffer()], Path::new("models/tri/tri.gltf"))
            .unwrap()
    }

    #[test]
    fn node_transforms_are_accumulated() {
        let meshes = load();
        assert_eq!(meshes.len(), 1);
        let tri = &meshes[0];
        assert_eq!(tri.name, "tri.0");
        assert_eq!(tri.indices, vec![0, 1, 2]);
        let positions: Vec<[f32; 3]> = tri.vertices.iter().map(|v| v.position).collect();
        assert_eq!(
            positions,
            vec![[1.0, 0.0, 0.0], [3.0, 0.0, 0.0], [1.0, 2.0, 0.0]]
        );
        for v in &tri.vertices {
            assert_relative_eq!(v.normal[2], 1.0, epsilon = 1e-6);
        }
        assert_eq!(tri.vertices[2].tex_coords, [0.0, 1.0]);
    }

    #[test]
    fn base_colour_becomes_a_diffuse_texture_next_to_the_model() {
        let meshes = load();
        assert_eq!(
            meshes[0].textures,
            vec![TextureRef::path(TextureKind::Diffuse, "models/tri/diffuse.png")]
        );
    }

    #[test]
    fn scene_tree_keeps_the_hierarchy() {
        let gltf = gltf::Gltf::from_slice(SCENE.as_bytes()).unwrap();
        let root = build_scene(&gltf.document, &[scene_buffer()], Path::new("tri.gltf")).unwrap();
        assert_eq!(root.children.len(), 1);
        let parent = &root.children[0];
        assert_eq!(parent.name, "parent");
        assert!(parent.meshes.is_empty());
        assert_eq!(parent.children[0].name, "child");
        assert_eq!(root.mesh_count(), 1);
    }

    #[test]
    fn bake_rotates_normals_and_flips_mirrored_winding() {
        let mesh = MeshData {
            name: "m".to_string(),
            vertices: vec![
                ModelVertex {
                    position: [1.0, 0.0, 0.0],
                    normal: [1.0, 0.0, 0.0],
                    tex_coords: [0.0, 0.0],
                };
                3
            ],
            indices: vec![0, 1, 2],
            textures: Vec::new(),
        };
        let rotated = bake(&mesh, &Matrix4::from_angle_z(Deg(90.0)));
        assert_relative_eq!(rotated.vertices[0].position[1], 1.0, epsilon = 1e-6);
        assert_relative_eq!(rotated.vertices[0].normal[1], 1.0, epsilon = 1e-6);
        assert_eq!(rotated.indices, vec![0, 1, 2]);

        let mirrored = bake(&mesh, &Matrix4::from_nonuniform_scale(-1.0, 1.0, 1.0));
        assert_eq!(mirrored.indices, vec![0, 2, 1]);
        assert_relative_eq!(mirrored.vertices[0].normal[0], -1.0, epsilon = 1e-6);

        let stretched = bake(&mesh, &Matrix4::from_nonuniform_scale(4.0, 1.0, 1.0));
        assert_relative_eq!(stretched.vertices[0].normal[0], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn centroid_averages_positions() {
        let c = centroid(&load());
        assert_relative_eq!(c.x, 5.0 / 3.0, epsilon = 1e-6);
        assert_relative_eq!(c.y, 2.0 / 3.0, epsilon = 1e-6);
        assert_eq!(centroid(&[]), Vector3::zero());
    }
}
