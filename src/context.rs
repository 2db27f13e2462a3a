use std::{fmt, sync::Arc};

use winit::window::Window;

use crate::{
    camera::CameraResources, config::LessonConfig, data_structures::texture::Texture,
    resources::Assets,
};

/// Format used when there is no surface to ask.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

#[derive(Debug)]
pub enum ContextError {
    Surface(wgpu::CreateSurfaceError),
    Adapter(wgpu::RequestAdapterError),
    Device(wgpu::RequestDeviceError),
    /// The surface reports no usable texture format.
    UnsupportedSurface,
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Surface(e) => write!(f, "Could not create a surface for the window: {e}"),
            Self::Adapter(e) => write!(f, "No compatible GPU adapter found: {e}"),
            Self::Device(e) => write!(f, "Device request failed: {e}"),
            Self::UnsupportedSurface => f.write_str("The surface supports no texture format"),
        }
    }
}

impl std::error::Error for ContextError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Surface(e) => Some(e),
            Self::Adapter(e) => Some(e),
            Self::Device(e) => Some(e),
            Self::UnsupportedSurface => None,
        }
    }
}

/// GPU state shared by every lesson: device, queue, the surface (if any) and
/// the main depth buffer and camera.
#[derive(Debug)]
pub struct Context {
    pub window: Option<Arc<Window>>,
    pub surface: Option<wgpu::Surface<'static>>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface_config: wgpu::SurfaceConfiguration,
    pub depth_texture: Texture,
    pub camera: CameraResources,
    pub clear_colour: wgpu::Color,
    pub config: LessonConfig,
    pub assets: Assets,
}

impl Context {
    pub async fn new(window: Arc<Window>, config: LessonConfig) -> Result<Self, ContextError> {
        let size = window.inner_size();
        let (width, height) = (size.width.max(1), size.height.max(1));

        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .map_err(ContextError::Surface)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(ContextError::Adapter)?;
        log::info!("Using adapter {}", adapter.get_info().name);
        let (device, queue) = request_device(&adapter).await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // Lesson colours are authored in sRGB, a linear surface would darken them.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(ContextError::UnsupportedSurface)?;
        let present_mode = if config.vsync {
            wgpu::PresentMode::Fifo
        } else {
            surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo)
        };
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);
        log::info!("Surface configured: {surface_format:?} {width}x{height}");

        Ok(Self::assemble(
            Some(window),
            Some(surface),
            device,
            queue,
            surface_config,
            config,
        ))
    }

    /// A context without window or surface that renders into textures.
    pub async fn headless(width: u32, height: u32, config: LessonConfig) -> Result<Self, ContextError> {
        let (width, height) = (width.max(1), height.max(1));
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(ContextError::Adapter)?;
        log::info!("Using adapter {} without surface", adapter.get_info().name);
        let (device, queue) = request_device(&adapter).await?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            format: OFFSCREEN_FORMAT,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        Ok(Self::assemble(None, None, device, queue, surface_config, config))
    }

    fn assemble(
        window: Option<Arc<Window>>,
        surface: Option<wgpu::Surface<'static>>,
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface_config: wgpu::SurfaceConfiguration,
        config: LessonConfig,
    ) -> Self {
        let (width, height) = (surface_config.width, surface_config.height);
        let camera = CameraResources::new(&device, width, height, &config.camera);
        let depth_texture = Texture::create_depth_texture(&device, [width, height], "depth_texture");
        let assets = Assets::new(&config.assets_dir);
        Self {
            window,
            surface,
            device,
            queue,
            surface_config,
            depth_texture,
            camera,
            clear_colour: config.clear_colour,
            config,
            assets,
        }
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.surface_config.format
    }

    pub fn size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    /// Reconfigures the surface and rebuilds the depth buffer. Zero sizes
    /// (minimised windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        if let Some(surface) = &self.surface {
            surface.configure(&self.device, &self.surface_config);
        }
        self.depth_texture =
            Texture::create_depth_texture(&self.device, [width, height], "depth_texture");
        self.camera.camera.resize(width, height);
        self.camera.write(&self.queue);
        log::debug!("Resized to {width}x{height}");
    }

    pub fn request_redraw(&self) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    pub fn init_context(&self) -> InitContext {
        self.into()
    }
}

async fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue), ContextError> {
    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("lesson device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
            trace: wgpu::Trace::Off,
            ..Default::default()
        })
        .await
        .map_err(ContextError::Device)
}

/// What a lesson constructor gets to build its GPU resources with. Device
/// and queue are reference counted, so cloning them is cheap.
#[derive(Clone, Debug)]
pub struct InitContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub format: wgpu::TextureFormat,
    pub width: u32,
    pub height: u32,
    pub camera_layout: wgpu::BindGroupLayout,
    pub config: LessonConfig,
    pub assets: Assets,
}

impl From<&Context> for InitContext {
    fn from(ctx: &Context) -> Self {
        let (width, height) = ctx.size();
        Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            format: ctx.format(),
            width,
            height,
            camera_layout: ctx.camera.bind_group_layout.clone(),
            config: ctx.config.clone(),
            assets: ctx.assets.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_describe_the_failing_stage() {
        let err = ContextError::UnsupportedSurface;
        assert!(err.to_string().contains("surface"));
        assert!(std::error::Error::source(&err).is_none());
    }
}
