//! The lessons' WGSL programs and how each one is turned into a pipeline.
//!
//! 3D shaders are assembled from shared pieces: `instance.wgsl` (vertex and
//! instance inputs), `camera.wgsl` (group 0) and `lighting.wgsl` (lights in
//! group 1, material in group 2 and the lit vertex stage).

use crate::{
    data_structures::{
        instance::InstanceRaw,
        model::{ModelVertex, Vertex},
    },
    geometry::{ColourVertex, PositionVertex, ScreenVertex, TexturedVertex},
    pipelines::basic::{PipelineOptions, mk_pipeline_layout, mk_render_pipeline},
    shader::{Shader, ShaderError},
};

pub const COLOUR: &str = include_str!("colour.wgsl");
pub const TEXTURED: &str = include_str!("textured.wgsl");
pub const MIXED: &str = concat!(
    include_str!("instance.wgsl"),
    include_str!("camera.wgsl"),
    include_str!("mixed.wgsl")
);
pub const PHONG: &str = concat!(
    include_str!("instance.wgsl"),
    include_str!("camera.wgsl"),
    include_str!("lighting.wgsl"),
    include_str!("phong.wgsl")
);
pub const FLAT: &str = concat!(
    include_str!("instance.wgsl"),
    include_str!("camera.wgsl"),
    include_str!("flat.wgsl")
);
pub const SKYBOX: &str = concat!(include_str!("camera.wgsl"), include_str!("skybox.wgsl"));
pub const REFLECT: &str = concat!(
    include_str!("instance.wgsl"),
    include_str!("camera.wgsl"),
    include_str!("reflect.wgsl")
);
pub const DEPTH: &str = concat!(include_str!("instance.wgsl"), include_str!("depth.wgsl"));
pub const SHADOWED: &str = concat!(
    include_str!("instance.wgsl"),
    include_str!("camera.wgsl"),
    include_str!("lighting.wgsl"),
    include_str!("shadow.wgsl")
);
pub const POINT_DEPTH: &str = concat!(
    include_str!("instance.wgsl"),
    include_str!("point_depth.wgsl")
);
pub const POINT_SHADOWED: &str = concat!(
    include_str!("instance.wgsl"),
    include_str!("camera.wgsl"),
    include_str!("lighting.wgsl"),
    include_str!("point_shadow.wgsl")
);
pub const DEPTH_QUAD: &str = include_str!("quad.wgsl");

/// One entry per shader program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    /// Flat vertex colours plus a uniform tint. Group 0: tint.
    Colour,
    /// Two textures mixed on a screen-space quad. Group 0: textures, 1: mix.
    Textured,
    /// Two textures mixed on instanced models. Groups: camera, mix, textures.
    Mixed,
    /// Groups: camera, lighting, material.
    Phong,
    /// Single colour, for lamps and outlines. Groups: camera, tint.
    Flat,
    /// Groups: camera, cubemap.
    Skybox,
    /// Mirror reflection of the skybox. Groups: camera, cubemap.
    Reflect,
    /// Directional shadow pass. Group 0: shadow uniform.
    Depth,
    /// Phong with a directional shadow map in group 3.
    Shadowed,
    /// Cube shadow pass writing distance over far. Group 0: face uniform.
    PointDepth,
    /// Phong with a cube shadow map in group 3.
    PointShadowed,
    /// Debug view of a depth texture. Group 0: depth texture and sampler.
    DepthQuad,
}

impl ShaderKind {
    pub const ALL: [ShaderKind; 12] = [
        ShaderKind::Colour,
        ShaderKind::Textured,
        ShaderKind::Mixed,
        ShaderKind::Phong,
        ShaderKind::Flat,
        ShaderKind::Skybox,
        ShaderKind::Reflect,
        ShaderKind::Depth,
        ShaderKind::Shadowed,
        ShaderKind::PointDepth,
        ShaderKind::PointShadowed,
        ShaderKind::DepthQuad,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Colour => "colour",
            Self::Textured => "textured",
            Self::Mixed => "mixed",
            Self::Phong => "phong",
            Self::Flat => "flat",
            Self::Skybox => "skybox",
            Self::Reflect => "reflect",
            Self::Depth => "depth",
            Self::Shadowed => "shadowed",
            Self::PointDepth => "point depth",
            Self::PointShadowed => "point shadowed",
            Self::DepthQuad => "depth quad",
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            Self::Colour => COLOUR,
            Self::Textured => TEXTURED,
            Self::Mixed => MIXED,
            Self::Phong => PHONG,
            Self::Flat => FLAT,
            Self::Skybox => SKYBOX,
            Self::Reflect => REFLECT,
            Self::Depth => DEPTH,
            Self::Shadowed => SHADOWED,
            Self::PointDepth => POINT_DEPTH,
            Self::PointShadowed => POINT_SHADOWED,
            Self::DepthQuad => DEPTH_QUAD,
        }
    }

    pub fn vertex_layouts(&self) -> Vec<wgpu::VertexBufferLayout<'static>> {
        match self {
            Self::Colour => vec![ColourVertex::desc()],
            Self::Textured => vec![TexturedVertex::desc()],
            Self::Skybox => vec![PositionVertex::desc()],
            Self::DepthQuad => vec![ScreenVertex::desc()],
            _ => vec![ModelVertex::desc(), InstanceRaw::desc()],
        }
    }

    /// Default pipeline state for this shader drawing into `format`.
    pub fn options<'a>(
        &self,
        format: wgpu::TextureFormat,
        vertex_layouts: &'a [wgpu::VertexBufferLayout<'a>],
    ) -> PipelineOptions<'a> {
        let label = self.label();
        match self {
            Self::Colour | Self::Textured | Self::DepthQuad => {
                PipelineOptions::new(label, format, vertex_layouts).overlay()
            }
            Self::Skybox => PipelineOptions::new(label, format, vertex_layouts)
                .depth(wgpu::CompareFunction::LessEqual, false)
                .cull(None),
            Self::Depth => PipelineOptions::depth_only(label, vertex_layouts),
            // Face projections mirror y, which flips the winding.
            Self::PointDepth => PipelineOptions::depth_only(label, vertex_layouts)
                .with_fragment(true)
                .cull(None),
            Self::Mixed
            | Self::Phong
            | Self::Flat
            | Self::Reflect
            | Self::Shadowed
            | Self::PointShadowed => PipelineOptions::new(label, format, vertex_layouts),
        }
    }
}

/// Validates the shader of `kind` and builds its pipeline. `customise` may
/// adjust the default [`ShaderKind::options`], e.g. to add stencil state.
pub fn build_pipeline<F>(
    device: &wgpu::Device,
    kind: ShaderKind,
    format: wgpu::TextureFormat,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
    customise: F,
) -> Result<wgpu::RenderPipeline, ShaderError>
where
    F: for<'a> FnOnce(PipelineOptions<'a>) -> PipelineOptions<'a>,
{
    let shader = Shader::from_wgsl(device, kind.label(), kind.source())?;
    let layout = mk_pipeline_layout(
        device,
        &format!("{} pipeline layout", kind.label()),
        bind_group_layouts,
    );
    let vertex_layouts = kind.vertex_layouts();
    let options = customise(kind.options(format, &vertex_layouts));
    log::debug!("Building {} pipeline", kind.label());
    Ok(mk_render_pipeline(device, &layout, &shader.module, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::{BindingKind, introspect, validate_wgsl};

    #[test]
    fn every_shader_validates() {
        for kind in ShaderKind::ALL {
            if let Err(e) = validate_wgsl(kind.label(), kind.source()) {
                panic!("{e}");
            }
        }
    }

    #[test]
    fn entry_points_match_the_pipeline_options() {
        let format = wgpu::TextureFormat::Bgra8UnormSrgb;
        for kind in ShaderKind::ALL {
            let info = introspect(kind.source()).unwrap();
            let layouts = kind.vertex_layouts();
            let options = kind.options(format, &layouts);
            assert!(info.has_entry_point("vs_main"), "{kind:?}");
            assert_eq!(info.has_entry_point("fs_main"), options.fragment, "{kind:?}");
        }
    }

    #[test]
    fn lit_shaders_share_the_group_layout() {
        for kind in [ShaderKind::Phong, ShaderKind::Shadowed, ShaderKind::PointShadowed] {
            let info = introspect(kind.source()).unwrap();
            assert_eq!(info.binding(0, 0).unwrap().kind, BindingKind::Uniform);
            assert_eq!(info.binding(1, 0).unwrap().kind, BindingKind::Uniform);
            assert_eq!(info.binding(2, 0).unwrap().kind, BindingKind::Texture);
            assert_eq!(info.binding(2, 3).unwrap().kind, BindingKind::Sampler);
        }
        for kind in [ShaderKind::Shadowed, ShaderKind::PointShadowed] {
            let info = introspect(kind.source()).unwrap();
            assert_eq!(info.binding(3, 1).unwrap().kind, BindingKind::ComparisonSampler);
            assert_eq!(info.binding(3, 2).unwrap().kind, BindingKind::Uniform);
        }
    }

    #[test]
    fn shadow_passes_use_group_zero_for_the_light() {
        for kind in [ShaderKind::Depth, ShaderKind::PointDepth] {
            let info = introspect(kind.source()).unwrap();
            assert_eq!(info.binding(0, 0).unwrap().name, "shadow_light");
        }
    }

    #[test]
    fn only_model_shaders_take_instances() {
        assert_eq!(ShaderKind::Phong.vertex_layouts().len(), 2);
        assert_eq!(ShaderKind::Skybox.vertex_layouts().len(), 1);
        assert_eq!(ShaderKind::Colour.vertex_layouts().len(), 1);
    }
}
