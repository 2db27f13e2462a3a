//! The per-lesson run loop.
//!
//! A lesson is built asynchronously from an [`InitContext`], then driven by
//! winit: window events are handed to the camera controller and the lesson,
//! every redraw updates the camera, calls [`Lesson::on_update`] and renders
//! the frame with [`Lesson::on_render`].

use std::{fmt, pin::Pin, sync::Arc};

use anyhow::{Context as _, Result, anyhow};
use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{CursorGrabMode, Fullscreen, Window, WindowId},
};

use crate::{
    config::LessonConfig,
    context::{Context, InitContext},
    render::{OffscreenTarget, RenderTarget},
};

/// One lesson of the collection.
///
/// # Lifecycle
///
/// 1. `on_init()` is called once after construction; configure the context
///    here (camera start position, clear colour, disabling the controller).
/// 2. `on_window_events()` is called for each winit window event.
/// 3. `on_update()` is called every frame before rendering.
/// 4. `on_render()` records the frame's passes into `encoder`.
pub trait Lesson {
    fn on_init(&mut self, _ctx: &mut Context) {}

    fn on_window_events(&mut self, _ctx: &Context, _event: &WindowEvent) {}

    /// `dt` is the time since the last frame, `elapsed` the time since the
    /// lesson started.
    fn on_update(&mut self, ctx: &Context, dt: Duration, elapsed: Duration);

    fn on_render(&self, ctx: &Context, encoder: &mut wgpu::CommandEncoder, target: &RenderTarget);
}

impl fmt::Debug for dyn Lesson + 'static {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Lesson")
    }
}

/// Builds a lesson from an [`InitContext`]. Loading assets may fail, which
/// ends the program.
pub type LessonConstructor =
    Box<dyn FnOnce(InitContext) -> Pin<Box<dyn Future<Output = Result<Box<dyn Lesson>>>>>>;

/// Frame counter for the statistics printed when a lesson ends.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameStats {
    frames: u64,
    elapsed: Duration,
}

impl FrameStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, dt: Duration) {
        self.frames += 1;
        self.elapsed += dt;
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn fps(&self) -> f64 {
        let seconds = self.elapsed.as_secs_f64();
        if seconds <= 0.0 {
            0.0
        } else {
            self.frames as f64 / seconds
        }
    }
}

impl fmt::Display for FrameStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rendered {} frames in {:.2} seconds amounting to {:.1} FPS",
            self.frames,
            self.elapsed.as_secs_f64(),
            self.fps()
        )
    }
}

struct AppState {
    ctx: Context,
    lesson: Box<dyn Lesson>,
    is_surface_configured: bool,
}

impl AppState {
    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.ctx.resize(width, height);
            self.is_surface_configured = true;
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        // keeps the loop going
        self.ctx.request_redraw();

        if !self.is_surface_configured {
            return Ok(());
        }
        let Some(surface) = &self.ctx.surface else {
            return Ok(());
        };

        let output = surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let (width, height) = self.ctx.size();
        let target = RenderTarget {
            colour: &view,
            depth: &self.ctx.depth_texture.view,
            format: self.ctx.format(),
            width,
            height,
        };

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        self.lesson.on_render(&self.ctx, &mut encoder, &target);
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

struct App {
    async_runtime: tokio::runtime::Runtime,
    config: LessonConfig,
    state: Option<AppState>,
    // Taken once the window exists.
    constructor: Option<LessonConstructor>,
    started: Instant,
    last_time: Instant,
    stats: FrameStats,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(constructor: LessonConstructor, config: LessonConfig) -> Result<Self> {
        let async_runtime =
            tokio::runtime::Runtime::new().context("Could not start the async runtime")?;
        Ok(Self {
            async_runtime,
            config,
            state: None,
            constructor: Some(constructor),
            started: Instant::now(),
            last_time: Instant::now(),
            stats: FrameStats::new(),
            error: None,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{error:#}");
        self.error = Some(error);
        event_loop.exit();
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<AppState> {
        let mut window_attributes = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.width,
                self.config.height,
            ));
        if self.config.fullscreen {
            window_attributes = window_attributes.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }
        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("Failed to create the window")?,
        );
        let constructor = self
            .constructor
            .take()
            .ok_or_else(|| anyhow!("The lesson was already constructed"))?;

        let config = self.config.clone();
        let init_future = async move {
            let ctx = Context::new(window, config)
                .await
                .context("Cannot create the main context")?;
            let lesson = constructor((&ctx).into()).await?;
            Ok::<_, anyhow::Error>((ctx, lesson))
        };
        let (mut ctx, mut lesson) = self.async_runtime.block_on(init_future)?;
        lesson.on_init(&mut ctx);
        if ctx.camera.controller.is_enabled() {
            let captured = capture_cursor(ctx.window.as_deref());
            ctx.camera.controller.set_captured(captured);
        }
        let (width, height) = ctx.size();
        Ok(AppState {
            ctx,
            lesson,
            is_surface_configured: width > 0 && height > 0,
        })
    }
}

/// Hides and grabs the cursor. Returns whether look input should come from
/// raw device motion.
fn capture_cursor(window: Option<&Window>) -> bool {
    let Some(window) = window else {
        return false;
    };
    let grabbed = window
        .set_cursor_grab(CursorGrabMode::Locked)
        .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
    match grabbed {
        Ok(()) => {
            window.set_cursor_visible(false);
            true
        }
        Err(e) => {
            log::warn!("Could not capture the cursor: {e}");
            false
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        match self.init(event_loop) {
            Ok(state) => {
                self.started = Instant::now();
                self.last_time = self.started;
                state.ctx.request_redraw();
                self.state = Some(state);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        state.ctx.camera.controller.handle_window_events(&event);
        state.lesson.on_window_events(&state.ctx, &event);
        if state.ctx.camera.controller.exit_requested() {
            event_loop.exit();
            return;
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();
                let elapsed = self.started.elapsed();

                let ctx = &mut state.ctx;
                ctx.camera.update(&ctx.queue, dt);
                state.lesson.on_update(&state.ctx, dt, elapsed);

                match state.render() {
                    Ok(()) => self.stats.record(dt),
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let (width, height) = state.ctx.size();
                        state.resize(width, height);
                    }
                    Err(e) => log::error!("Unable to render {e}"),
                }
            }
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if let Some(state) = &mut self.state {
            state.ctx.camera.controller.handle_device_events(&event);
        }
    }
}

/// Opens a window and runs one lesson until it is closed or Escape is
/// pressed.
pub fn run(constructor: LessonConstructor, config: LessonConfig) -> Result<()> {
    if let Err(e) = env_logger::try_init() {
        eprintln!("Warning: Could not initialize logger: {e}");
    }

    let event_loop = EventLoop::new().context("Failed to create an event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);
    let mut app = App::new(constructor, config)?;
    event_loop.run_app(&mut app)?;

    log::info!("{}", app.stats);
    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Renders `frames` frames of `lesson` without a window, 1/60 s apart, and
/// reads the last one back.
pub async fn render_offscreen(
    ctx: &mut Context,
    lesson: &mut dyn Lesson,
    frames: u32,
) -> Result<image::RgbaImage> {
    let (width, height) = ctx.size();
    let offscreen = OffscreenTarget::new(&ctx.device, ctx.format(), width, height);
    let dt = Duration::from_secs_f64(1.0 / 60.0);
    let mut elapsed = Duration::ZERO;

    for _ in 0..frames.max(1) {
        elapsed += dt;
        ctx.camera.update(&ctx.queue, dt);
        lesson.on_update(ctx, dt, elapsed);
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Offscreen Encoder"),
            });
        lesson.on_render(ctx, &mut encoder, &offscreen.target());
        ctx.queue.submit(std::iter::once(encoder.finish()));
    }
    offscreen.read_image(&ctx.device, &ctx.queue).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_is_frames_over_seconds() {
        let mut stats = FrameStats::new();
        for _ in 0..120 {
            stats.record(Duration::from_millis(25));
        }
        assert_eq!(stats.frames(), 120);
        assert_eq!(stats.elapsed(), Duration::from_secs(3));
        assert!((stats.fps() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn no_time_means_no_fps() {
        assert_eq!(FrameStats::new().fps(), 0.0);
    }

    #[test]
    fn summary_names_frames_time_and_rate() {
        let mut stats = FrameStats::new();
        stats.record(Duration::from_millis(500));
        stats.record(Duration::from_millis(500));
        assert_eq!(
            stats.to_string(),
            "Rendered 2 frames in 1.00 seconds amounting to 2.0 FPS"
        );
    }
}
