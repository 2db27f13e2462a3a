//! WGSL shader loading with up-front validation.
//!
//! Sources are parsed and validated with naga before wgpu sees them so that a
//! broken shader fails with a readable compiler log instead of a device
//! error later on. [`Uniform`] is the typed replacement for setting
//! individual uniforms by name.

use std::{fmt, path::Path};

use naga::valid::{Capabilities, ValidationFlags, Validator};
use wgpu::util::DeviceExt;

#[derive(Debug)]
pub enum ShaderError {
    Read {
        path: String,
        source: std::io::Error,
    },
    Parse {
        label: String,
        log: String,
    },
    Validate {
        label: String,
        log: String,
    },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, source } => write!(f, "could not read shader {path}: {source}"),
            Self::Parse { label, log } => write!(f, "shader {label} failed to parse:\n{log}"),
            Self::Validate { label, log } => {
                write!(f, "shader {label} failed validation:\n{log}")
            }
        }
    }
}

impl std::error::Error for ShaderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub fn read_file(path: impl AsRef<Path>) -> Result<String, ShaderError> {
    let path = path.as_ref();
    std::fs::read_to_string(path).map_err(|source| ShaderError::Read {
        path: path.display().to_string(),
        source,
    })
}

/// Parses and validates a WGSL source, returning the naga module.
pub fn validate_wgsl(label: &str, source: &str) -> Result<naga::Module, ShaderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderError::Parse {
        label: label.to_string(),
        log: e.emit_to_string(source),
    })?;
    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|e| ShaderError::Validate {
            label: label.to_string(),
            log: e.emit_to_string(source),
        })?;
    Ok(module)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingKind {
    Uniform,
    Storage,
    Texture,
    Sampler,
    ComparisonSampler,
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindingInfo {
    pub name: String,
    pub group: u32,
    pub binding: u32,
    pub kind: BindingKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryPointInfo {
    pub name: String,
    pub stage: naga::ShaderStage,
}

/// What a shader expects from the pipeline that runs it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShaderInfo {
    pub entry_points: Vec<EntryPointInfo>,
    pub bindings: Vec<BindingInfo>,
}

impl ShaderInfo {
    pub fn from_module(module: &naga::Module) -> Self {
        let entry_points = module
            .entry_points
            .iter()
            .map(|ep| EntryPointInfo {
                name: ep.name.clone(),
                stage: ep.stage,
            })
            .collect();

        let mut bindings: Vec<BindingInfo> = module
            .global_variables
            .iter()
            .filter_map(|(_, var)| {
                let binding = var.binding.as_ref()?;
                let kind = match var.space {
                    naga::AddressSpace::Uniform => BindingKind::Uniform,
                    naga::AddressSpace::Storage { .. } => BindingKind::Storage,
                    naga::AddressSpace::Handle => match module.types[var.ty].inner {
                        naga::TypeInner::Image { .. } => BindingKind::Texture,
                        naga::TypeInner::Sampler { comparison: true } => {
                            BindingKind::ComparisonSampler
                        }
                        naga::TypeInner::Sampler { comparison: false } => BindingKind::Sampler,
                        _ => BindingKind::Other,
                    },
                    _ => BindingKind::Other,
                };
                Some(BindingInfo {
                    name: var.name.clone().unwrap_or_default(),
                    group: binding.group,
                    binding: binding.binding,
                    kind,
                })
            })
            .collect();
        bindings.sort_by_key(|b| (b.group, b.binding));

        Self {
            entry_points,
            bindings,
        }
    }

    pub fn has_entry_point(&self, name: &str) -> bool {
        self.entry_points.iter().any(|ep| ep.name == name)
    }

    pub fn binding(&self, group: u32, binding: u32) -> Option<&BindingInfo> {
        self.bindings
            .iter()
            .find(|b| b.group == group && b.binding == binding)
    }
}

impl fmt::Display for ShaderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ep in &self.entry_points {
            writeln!(f, "entry {:?} {}", ep.stage, ep.name)?;
        }
        for b in &self.bindings {
            writeln!(f, "@group({}) @binding({}) {} ({:?})", b.group, b.binding, b.name, b.kind)?;
        }
        Ok(())
    }
}

/// Entry points and resource bindings of a WGSL source.
pub fn introspect(source: &str) -> Result<ShaderInfo, ShaderError> {
    let module = validate_wgsl("introspection", source)?;
    Ok(ShaderInfo::from_module(&module))
}

#[derive(Debug)]
pub struct Shader {
    pub label: String,
    pub module: wgpu::ShaderModule,
    pub info: ShaderInfo,
}

impl Shader {
    pub fn from_wgsl(device: &wgpu::Device, label: &str, source: &str) -> Result<Self, ShaderError> {
        let naga_module = match validate_wgsl(label, source) {
            Ok(module) => module,
            Err(e) => {
                log::error!("{e}");
                return Err(e);
            }
        };
        let info = ShaderInfo::from_module(&naga_module);
        log::debug!("Shader {label}:\n{info}");
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        Ok(Self {
            label: label.to_string(),
            module,
            info,
        })
    }

    pub fn load(device: &wgpu::Device, path: impl AsRef<Path>) -> Result<Self, ShaderError> {
        let path = path.as_ref();
        let source = read_file(path)?;
        Self::from_wgsl(device, &path.display().to_string(), &source)
    }
}

pub fn uniform_layout_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// A single uniform block with its own bind group (binding 0).
#[derive(Debug)]
pub struct Uniform<T: bytemuck::Pod> {
    value: T,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub layout: wgpu::BindGroupLayout,
}

impl<T: bytemuck::Pod> Uniform<T> {
    pub fn new(device: &wgpu::Device, label: &str, value: T, visibility: wgpu::ShaderStages) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{label} layout")),
            entries: &[uniform_layout_entry(0, visibility)],
        });
        Self::with_layout(device, label, value, layout)
    }

    pub fn with_layout(
        device: &wgpu::Device,
        label: &str,
        value: T,
        layout: wgpu::BindGroupLayout,
    ) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&[value]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label} bind group")),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self {
            value,
            buffer,
            bind_group,
            layout,
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn set(&mut self, queue: &wgpu::Queue, value: T) {
        self.value = value;
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.value]));
    }

    pub fn update<F: FnOnce(&mut T)>(&mut self, queue: &wgpu::Queue, f: F) {
        let mut value = self.value;
        f(&mut value);
        self.set(queue, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
struct Globals {
    tint: vec4<f32>,
}
@group(0) @binding(0) var<uniform> globals: Globals;
@group(1) @binding(0) var t_diffuse: texture_2d<f32>;
@group(1) @binding(1) var s_diffuse: sampler;
@group(2) @binding(1) var s_shadow: sampler_comparison;

@vertex
fn vs_main(@builtin(vertex_index) i: u32) -> @builtin(position) vec4<f32> {
    let x = f32(i) - 1.0;
    return vec4<f32>(x, 0.0, 0.0, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return globals.tint * textureSample(t_diffuse, s_diffuse, vec2<f32>(0.5, 0.5));
}
"#;

    #[test]
    fn introspection_lists_entry_points_and_bindings() {
        let info = introspect(SOURCE).unwrap();
        assert!(info.has_entry_point("vs_main"));
        assert!(info.has_entry_point("fs_main"));
        assert_eq!(info.entry_points[0].stage, naga::ShaderStage::Vertex);

        assert_eq!(info.bindings.len(), 4);
        assert_eq!(info.binding(0, 0).unwrap().kind, BindingKind::Uniform);
        assert_eq!(info.binding(0, 0).unwrap().name, "globals");
        assert_eq!(info.binding(1, 0).unwrap().kind, BindingKind::Texture);
        assert_eq!(info.binding(1, 1).unwrap().kind, BindingKind::Sampler);
        assert_eq!(
            info.binding(2, 1).unwrap().kind,
            BindingKind::ComparisonSampler
        );
        assert!(info.binding(3, 0).is_none());
    }

    #[test]
    fn parse_errors_carry_the_compiler_log() {
        let err = validate_wgsl("broken", "fn main( {").unwrap_err();
        match &err {
            ShaderError::Parse { label, log } => {
                assert_eq!(label, "broken");
                assert!(!log.is_empty());
            }
            other => panic!("expected a parse error, got {other:?}"),
        }
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn type_errors_fail_validation_or_parsing() {
        let source = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    let x: f32 = vec3<f32>(1.0);
    return vec4<f32>(x);
}
"#;
        assert!(validate_wgsl("mismatch", source).is_err());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = read_file("definitely/not/here.wgsl").unwrap_err();
        assert!(matches!(err, ShaderError::Read { .. }));
        assert!(std::error::Error::source(&err).is_some());
    }
}
