//! Euler-angle fly camera, its input controller and GPU uniform.
//!
//! The camera keeps a position plus an orthonormal front/right basis derived
//! from yaw and pitch. The controller turns winit events into camera
//! operations and applies them once per frame.

use cgmath::{InnerSpace, Matrix4, Vector3, Zero};
use wgpu::util::DeviceExt;
use winit::{
    event::{DeviceEvent, ElementState, KeyEvent, MouseScrollDelta, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::{config::CameraConfig, math};

pub const MAX_PITCH: f32 = 89.0;
pub const MIN_ZOOM: f32 = 1.0;
pub const MAX_ZOOM: f32 = 60.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
}

#[derive(Clone, Debug)]
pub struct Camera {
    pub position: Vector3<f32>,
    pub front: Vector3<f32>,
    pub up: Vector3<f32>,
    pub right: Vector3<f32>,
    pub world_up: Vector3<f32>,
    /// Degrees.
    pub yaw: f32,
    /// Degrees, kept within [-89, 89].
    pub pitch: f32,
    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
    /// Vertical field of view in degrees, kept within [1, 60].
    pub zoom: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32, config: &CameraConfig) -> Self {
        let mut camera = Self {
            position: Vector3::zero(),
            front: Vector3::new(0.0, 0.0, -1.0),
            up: Vector3::unit_y(),
            right: Vector3::unit_x(),
            world_up: Vector3::unit_y(),
            yaw: config.yaw,
            pitch: config.pitch.clamp(-MAX_PITCH, MAX_PITCH),
            movement_speed: config.speed,
            mouse_sensitivity: config.sensitivity,
            zoom: config.zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            aspect: 1.0,
            near: config.near,
            far: config.far,
        };
        camera.resize(width, height);
        let [x, y, z] = config.position;
        camera.set_position(x, y, z);
        camera.update_vectors();
        camera
    }

    pub fn set_position(&mut self, x: f32, y: f32, z: f32) {
        self.position = Vector3::new(x, y, z);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = if height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        };
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        math::look_at(self.position, self.position + self.front, self.up)
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        math::perspective(self.zoom, self.aspect, self.near, self.far)
    }

    pub fn process_keyboard(&mut self, direction: CameraMovement, dt: f32) {
        let velocity = self.movement_speed * dt;
        match direction {
            CameraMovement::Forward => self.position += self.front * velocity,
            CameraMovement::Backward => self.position -= self.front * velocity,
            CameraMovement::Left => self.position -= self.right * velocity,
            CameraMovement::Right => self.position += self.right * velocity,
        }
    }

    /// Offsets are raw cursor deltas; positive y looks up.
    pub fn process_mouse_movement(&mut self, x_offset: f32, y_offset: f32) {
        self.yaw += x_offset * self.mouse_sensitivity;
        self.pitch += y_offset * self.mouse_sensitivity;
        // Past +-90 degrees the view would flip over.
        self.pitch = self.pitch.clamp(-MAX_PITCH, MAX_PITCH);
        self.update_vectors();
    }

    pub fn process_mouse_scroll(&mut self, y_offset: f32) {
        self.zoom = (self.zoom - y_offset).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn update_vectors(&mut self) {
        let (yaw, pitch) = (math::to_radians(self.yaw), math::to_radians(self.pitch));
        self.front = Vector3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos())
            .normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.world_up;
    }
}

/// Collects window input between frames and applies it to a [`Camera`].
#[derive(Debug)]
pub struct CameraController {
    enabled: bool,
    /// The window holds the cursor; look direction comes from raw motion.
    captured: bool,
    forward: bool,
    backward: bool,
    left: bool,
    right: bool,
    first_mouse: bool,
    last_mouse: (f64, f64),
    mouse_offset: (f32, f32),
    scroll: f32,
    exit_requested: bool,
}

impl CameraController {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            enabled: true,
            captured: false,
            forward: false,
            backward: false,
            left: false,
            right: false,
            first_mouse: true,
            last_mouse: (width as f64 / 2.0, height as f64 / 2.0),
            mouse_offset: (0.0, 0.0),
            scroll: 0.0,
            exit_requested: false,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.forward = false;
            self.backward = false;
            self.left = false;
            self.right = false;
            self.mouse_offset = (0.0, 0.0);
            self.scroll = 0.0;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_captured(&mut self, captured: bool) {
        self.captured = captured;
    }

    pub fn is_captured(&self) -> bool {
        self.captured
    }

    /// Escape was pressed.
    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    pub fn process_key(&mut self, key: KeyCode, state: ElementState) -> bool {
        let pressed = state.is_pressed();
        match key {
            KeyCode::Escape => {
                if pressed {
                    self.exit_requested = true;
                }
                true
            }
            _ if !self.enabled => false,
            KeyCode::KeyW | KeyCode::ArrowUp => {
                self.forward = pressed;
                true
            }
            KeyCode::KeyS | KeyCode::ArrowDown => {
                self.backward = pressed;
                true
            }
            KeyCode::KeyA | KeyCode::ArrowLeft => {
                self.left = pressed;
                true
            }
            KeyCode::KeyD | KeyCode::ArrowRight => {
                self.right = pressed;
                true
            }
            _ => false,
        }
    }

    /// Absolute cursor position. The first event only seeds the last
    /// position so the camera doesn't jump when the cursor enters the window.
    /// Ignored for look while the cursor is captured: a locked cursor never
    /// moves.
    pub fn process_cursor(&mut self, x: f64, y: f64) {
        if self.first_mouse {
            self.last_mouse = (x, y);
            self.first_mouse = false;
        }
        let x_offset = (x - self.last_mouse.0) as f32;
        // Window y grows downwards, pitch grows upwards.
        let y_offset = (self.last_mouse.1 - y) as f32;
        self.last_mouse = (x, y);
        if self.enabled && !self.captured {
            self.mouse_offset.0 += x_offset;
            self.mouse_offset.1 += y_offset;
        }
    }

    /// Relative mouse motion, unbounded by the window edges. Only used while
    /// the cursor is captured.
    pub fn process_motion(&mut self, dx: f64, dy: f64) {
        if !self.enabled || !self.captured {
            return;
        }
        self.mouse_offset.0 += dx as f32;
        self.mouse_offset.1 -= dy as f32;
    }

    pub fn process_scroll(&mut self, delta: &MouseScrollDelta) {
        if !self.enabled {
            return;
        }
        self.scroll += match delta {
            MouseScrollDelta::LineDelta(_, y) => *y,
            // A pixel delta of ~100 corresponds to one wheel notch
            MouseScrollDelta::PixelDelta(pos) => (pos.y / 100.0) as f32,
        };
    }

    pub fn handle_window_events(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state,
                        ..
                    },
                ..
            } => self.process_key(*key, *state),
            WindowEvent::CursorMoved { position, .. } => {
                self.process_cursor(position.x, position.y);
                self.enabled
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.process_scroll(delta);
                self.enabled
            }
            _ => false,
        }
    }

    pub fn handle_device_events(&mut self, event: &DeviceEvent) -> bool {
        match event {
            DeviceEvent::MouseMotion { delta: (dx, dy) } => {
                self.process_motion(*dx, *dy);
                self.enabled && self.captured
            }
            _ => false,
        }
    }

    pub fn update(&mut self, camera: &mut Camera, dt: instant::Duration) {
        if !self.enabled {
            return;
        }
        let dt = dt.as_secs_f32();
        let held = [
            (self.forward, CameraMovement::Forward),
            (self.backward, CameraMovement::Backward),
            (self.left, CameraMovement::Left),
            (self.right, CameraMovement::Right),
        ];
        for (pressed, direction) in held {
            if pressed {
                camera.process_keyboard(direction, dt);
            }
        }
        let (x_offset, y_offset) = std::mem::take(&mut self.mouse_offset);
        if x_offset != 0.0 || y_offset != 0.0 {
            camera.process_mouse_movement(x_offset, y_offset);
        }
        let scroll = std::mem::take(&mut self.scroll);
        if scroll != 0.0 {
            camera.process_mouse_scroll(scroll);
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    // w is unused, a vec3 would need padding anyway
    pub position: [f32; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view: Matrix4::identity().into(),
            proj: Matrix4::identity().into(),
            position: [0.0, 0.0, 0.0, 1.0],
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera) {
        self.view = camera.view_matrix().into();
        self.proj = camera.projection_matrix().into();
        self.position = camera.position.extend(1.0).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("camera_bind_group_layout"),
    })
}

/// The camera together with everything needed to feed it to shaders.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controller: CameraController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device, width: u32, height: u32, config: &CameraConfig) -> Self {
        let camera = Camera::new(width, height, config);
        let controller = CameraController::new(width, height);
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            camera,
            controller,
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    /// Applies queued input and uploads the new matrices.
    pub fn update(&mut self, queue: &wgpu::Queue, dt: instant::Duration) {
        self.controller.update(&mut self.camera, dt);
        self.write(queue);
    }

    pub fn write(&mut self, queue: &wgpu::Queue) {
        self.uniform.update_view_proj(&self.camera);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use cgmath::Vector4;
    use instant::Duration;

    use super::*;

    fn camera() -> Camera {
        Camera::new(800, 600, &CameraConfig::default())
    }

    #[test]
    fn starts_looking_down_negative_z() {
        let camera = camera();
        assert_relative_eq!(camera.front.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(camera.front.z, -1.0, epsilon = 1e-6);
        assert_relative_eq!(camera.right.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(camera.aspect, 800.0 / 600.0, epsilon = 1e-6);
        assert_eq!(camera.position, Vector3::new(0.0, 0.0, 3.0));
    }

    #[test]
    fn keyboard_moves_by_speed_times_dt() {
        let mut camera = camera();
        camera.set_position(0.0, 0.0, 0.0);
        camera.process_keyboard(CameraMovement::Forward, 2.0);
        assert_relative_eq!(camera.position.z, -5.0, epsilon = 1e-5);
        camera.process_keyboard(CameraMovement::Right, 1.0);
        assert_relative_eq!(camera.position.x, 2.5, epsilon = 1e-5);
        camera.process_keyboard(CameraMovement::Backward, 2.0);
        camera.process_keyboard(CameraMovement::Left, 1.0);
        assert_relative_eq!(camera.position.magnitude(), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut camera = camera();
        camera.process_mouse_movement(0.0, 10_000.0);
        assert_eq!(camera.pitch, MAX_PITCH);
        camera.process_mouse_movement(0.0, -100_000.0);
        assert_eq!(camera.pitch, -MAX_PITCH);
        assert_relative_eq!(camera.front.magnitude(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn yaw_turns_the_front_vector() {
        let mut camera = camera();
        // 900 * 0.1 = 90 degrees to the right: from -z to +x
        camera.process_mouse_movement(900.0, 0.0);
        assert_relative_eq!(camera.yaw, 0.0, epsilon = 1e-4);
        assert_relative_eq!(camera.front.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(camera.right.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn zoom_is_clamped_to_range() {
        let mut camera = camera();
        camera.process_mouse_scroll(100.0);
        assert_eq!(camera.zoom, MIN_ZOOM);
        camera.process_mouse_scroll(-100.0);
        assert_eq!(camera.zoom, MAX_ZOOM);
    }

    #[test]
    fn view_matrix_moves_the_eye_to_origin() {
        let camera = camera();
        let eye = camera.view_matrix() * camera.position.extend(1.0);
        assert_relative_eq!(eye, Vector4::new(0.0, 0.0, 0.0, 1.0), epsilon = 1e-5);
        let ahead = camera.view_matrix() * (camera.position + camera.front).extend(1.0);
        assert_relative_eq!(ahead.z, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn zero_height_gives_unit_aspect() {
        let camera = Camera::new(800, 0, &CameraConfig::default());
        assert_eq!(camera.aspect, 1.0);
    }

    #[test]
    fn first_cursor_event_does_not_rotate() {
        let mut camera = camera();
        let mut controller = CameraController::new(800, 600);
        controller.process_cursor(10.0, 500.0);
        controller.update(&mut camera, Duration::from_millis(16));
        assert_relative_eq!(camera.yaw, -90.0, epsilon = 1e-6);

        controller.process_cursor(20.0, 490.0);
        controller.update(&mut camera, Duration::from_millis(16));
        assert_relative_eq!(camera.yaw, -89.0, epsilon = 1e-5);
        assert_relative_eq!(camera.pitch, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn held_keys_move_every_update() {
        let mut camera = camera();
        let mut controller = CameraController::new(800, 600);
        assert!(controller.process_key(KeyCode::KeyW, ElementState::Pressed));
        controller.update(&mut camera, Duration::from_secs(1));
        controller.update(&mut camera, Duration::from_secs(1));
        assert_relative_eq!(camera.position.z, 3.0 - 5.0, epsilon = 1e-5);
        controller.process_key(KeyCode::KeyW, ElementState::Released);
        controller.update(&mut camera, Duration::from_secs(1));
        assert_relative_eq!(camera.position.z, -2.0, epsilon = 1e-5);
    }

    #[test]
    fn disabled_controller_ignores_input_but_not_escape() {
        let mut camera = camera();
        let mut controller = CameraController::new(800, 600);
        controller.set_enabled(false);
        assert!(!controller.process_key(KeyCode::KeyW, ElementState::Pressed));
        controller.process_scroll(&MouseScrollDelta::LineDelta(0.0, 5.0));
        controller.update(&mut camera, Duration::from_secs(1));
        assert_eq!(camera.position, Vector3::new(0.0, 0.0, 3.0));
        assert_eq!(camera.zoom, 45.0);

        controller.process_key(KeyCode::Escape, ElementState::Pressed);
        assert!(controller.exit_requested());
    }

    #[test]
    fn captured_cursor_turns_with_raw_motion() {
        let mut camera = camera();
        let mut controller = CameraController::new(800, 600);
        controller.set_captured(true);
        // A locked cursor keeps reporting the same position.
        controller.process_cursor(400.0, 300.0);
        controller.process_cursor(400.0, 300.0);
        controller.update(&mut camera, Duration::from_millis(16));
        assert_relative_eq!(camera.yaw, -90.0, epsilon = 1e-6);

        // Far more motion than fits between the window edges.
        for _ in 0..30 {
            assert!(controller.handle_device_events(&DeviceEvent::MouseMotion {
                delta: (100.0, -10.0)
            }));
        }
        controller.update(&mut camera, Duration::from_millis(16));
        assert_relative_eq!(camera.yaw, -90.0 + 300.0, epsilon = 1e-3);
        assert_relative_eq!(camera.pitch, 30.0, epsilon = 1e-4);
    }

    #[test]
    fn raw_motion_is_ignored_without_capture() {
        let mut camera = camera();
        let mut controller = CameraController::new(800, 600);
        assert!(!controller.handle_device_events(&DeviceEvent::MouseMotion {
            delta: (50.0, 0.0)
        }));
        controller.update(&mut camera, Duration::from_millis(16));
        assert_relative_eq!(camera.yaw, -90.0, epsilon = 1e-6);
    }

    #[test]
    fn scroll_is_applied_on_update() {
        let mut camera = camera();
        let mut controller = CameraController::new(800, 600);
        controller.process_scroll(&MouseScrollDelta::LineDelta(0.0, 5.0));
        controller.update(&mut camera, Duration::from_millis(16));
        assert_eq!(camera.zoom, 40.0);
    }
}
