use crate::data_structures::texture::Texture;

/// Everything that differs between the lessons' render pipelines.
///
/// The defaults describe an opaque pipeline drawing into the main pass:
/// back-face culling, depth test `Less` with depth writes and no stencil.
#[derive(Clone, Debug)]
pub struct PipelineOptions<'a> {
    pub label: &'a str,
    /// `None` for depth-only passes.
    pub colour_format: Option<wgpu::TextureFormat>,
    pub blend: Option<wgpu::BlendState>,
    pub depth_stencil: Option<wgpu::DepthStencilState>,
    pub cull_mode: Option<wgpu::Face>,
    /// Whether the shader has an `fs_main` entry point.
    pub fragment: bool,
    pub vertex_layouts: &'a [wgpu::VertexBufferLayout<'a>],
}

impl<'a> PipelineOptions<'a> {
    pub fn new(
        label: &'a str,
        colour_format: wgpu::TextureFormat,
        vertex_layouts: &'a [wgpu::VertexBufferLayout<'a>],
    ) -> Self {
        Self {
            label,
            colour_format: Some(colour_format),
            blend: Some(wgpu::BlendState::REPLACE),
            depth_stencil: Some(depth_state(
                Texture::DEPTH_FORMAT,
                wgpu::CompareFunction::Less,
                true,
            )),
            cull_mode: Some(wgpu::Face::Back),
            fragment: true,
            vertex_layouts,
        }
    }

    /// A pipeline that only writes depth into a shadow map. Front faces are
    /// culled to keep lit surfaces from shadowing themselves.
    pub fn depth_only(label: &'a str, vertex_layouts: &'a [wgpu::VertexBufferLayout<'a>]) -> Self {
        Self {
            label,
            colour_format: None,
            blend: None,
            depth_stencil: Some(wgpu::DepthStencilState {
                bias: wgpu::DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                },
                ..depth_state(Texture::SHADOW_FORMAT, wgpu::CompareFunction::LessEqual, true)
            }),
            cull_mode: Some(wgpu::Face::Front),
            fragment: false,
            vertex_layouts,
        }
    }

    pub fn cull(mut self, cull_mode: Option<wgpu::Face>) -> Self {
        self.cull_mode = cull_mode;
        self
    }

    pub fn blend(mut self, blend: Option<wgpu::BlendState>) -> Self {
        self.blend = blend;
        self
    }

    pub fn with_fragment(mut self, fragment: bool) -> Self {
        self.fragment = fragment;
        self
    }

    /// Changes the depth test of the main pass, keeping its format.
    pub fn depth(mut self, compare: wgpu::CompareFunction, write: bool) -> Self {
        let format = self
            .depth_stencil
            .as_ref()
            .map_or(Texture::DEPTH_FORMAT, |state| state.format);
        let stencil = self
            .depth_stencil
            .take()
            .map(|state| state.stencil)
            .unwrap_or_default();
        self.depth_stencil = Some(wgpu::DepthStencilState {
            stencil,
            ..depth_state(format, compare, write)
        });
        self
    }

    /// Screen-space drawing into the main pass: no depth test, no culling.
    pub fn overlay(self) -> Self {
        self.depth(wgpu::CompareFunction::Always, false).cull(None)
    }

    pub fn stencil(mut self, stencil: wgpu::StencilState) -> Self {
        if let Some(state) = self.depth_stencil.as_mut() {
            state.stencil = stencil;
        }
        self
    }
}

pub fn depth_state(
    format: wgpu::TextureFormat,
    compare: wgpu::CompareFunction,
    write: bool,
) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format,
        depth_write_enabled: write,
        depth_compare: compare,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

/// Stencil state applied to front and back faces alike.
pub fn stencil_state(
    compare: wgpu::CompareFunction,
    pass_op: wgpu::StencilOperation,
    write_mask: u32,
) -> wgpu::StencilState {
    let face = wgpu::StencilFaceState {
        compare,
        fail_op: wgpu::StencilOperation::Keep,
        depth_fail_op: wgpu::StencilOperation::Keep,
        pass_op,
    };
    wgpu::StencilState {
        front: face,
        back: face,
        read_mask: 0xff,
        write_mask,
    }
}

pub fn mk_pipeline_layout(
    device: &wgpu::Device,
    label: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
) -> wgpu::PipelineLayout {
    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts,
        immediate_size: 0,
    })
}

pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    options: PipelineOptions,
) -> wgpu::RenderPipeline {
    let targets = [options.colour_format.map(|format| wgpu::ColorTargetState {
        format,
        blend: options.blend,
        write_mask: wgpu::ColorWrites::ALL,
    })];
    let targets: &[Option<wgpu::ColorTargetState>] = if options.colour_format.is_some() {
        &targets
    } else {
        &[]
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(options.label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: options.vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: options.fragment.then(|| wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets,
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: options.cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: options.depth_stencil,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview_mask: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_LAYOUTS: &[wgpu::VertexBufferLayout<'static>] = &[];

    #[test]
    fn defaults_draw_opaque_into_the_main_pass() {
        let options = PipelineOptions::new("test", wgpu::TextureFormat::Bgra8UnormSrgb, NO_LAYOUTS);
        let depth = options.depth_stencil.unwrap();
        assert_eq!(depth.format, Texture::DEPTH_FORMAT);
        assert_eq!(depth.depth_compare, wgpu::CompareFunction::Less);
        assert!(depth.depth_write_enabled);
        assert_eq!(options.cull_mode, Some(wgpu::Face::Back));
        assert!(options.fragment);
    }

    #[test]
    fn depth_only_writes_the_shadow_format() {
        let options = PipelineOptions::depth_only("shadow", NO_LAYOUTS);
        assert_eq!(options.colour_format, None);
        assert!(!options.fragment);
        let depth = options.depth_stencil.unwrap();
        assert_eq!(depth.format, Texture::SHADOW_FORMAT);
        assert_eq!(depth.bias.constant, 2);
    }

    #[test]
    fn changing_the_depth_test_keeps_stencil() {
        let stencil = stencil_state(
            wgpu::CompareFunction::NotEqual,
            wgpu::StencilOperation::Keep,
            0x00,
        );
        let options = PipelineOptions::new("outline", wgpu::TextureFormat::Rgba8Unorm, NO_LAYOUTS)
            .stencil(stencil.clone())
            .depth(wgpu::CompareFunction::Always, false);
        let depth = options.depth_stencil.unwrap();
        assert_eq!(depth.stencil, stencil);
        assert_eq!(depth.depth_compare, wgpu::CompareFunction::Always);
        assert!(!depth.depth_write_enabled);
        assert_eq!(depth.format, Texture::DEPTH_FORMAT);
    }

    #[test]
    fn stencil_state_covers_both_faces() {
        let stencil = stencil_state(
            wgpu::CompareFunction::Always,
            wgpu::StencilOperation::Replace,
            0xff,
        );
        assert_eq!(stencil.front, stencil.back);
        assert_eq!(stencil.front.pass_op, wgpu::StencilOperation::Replace);
        assert_eq!(stencil.write_mask, 0xff);
    }
}
