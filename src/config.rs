//! Runtime configuration for a lesson window.
//!
//! The defaults reproduce the constants the lessons were written against
//! (1920x1080 window, 1024x1024 shadow maps, the classic fly-camera tuning).
//! `LessonConfig::from_env` lets a shell override the most common knobs
//! without recompiling.

use std::path::PathBuf;

/// Camera tuning shared by every lesson that uses the fly camera.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraConfig {
    pub position: [f32; 3],
    /// Degrees. -90 looks down the negative z axis.
    pub yaw: f32,
    /// Degrees.
    pub pitch: f32,
    pub speed: f32,
    pub sensitivity: f32,
    /// Vertical field of view in degrees.
    pub zoom: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 3.0],
            yaw: -90.0,
            pitch: 0.0,
            speed: 2.5,
            sensitivity: 0.1,
            zoom: 45.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LessonConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
    pub vsync: bool,
    /// Root directory for textures, models and skyboxes.
    pub assets_dir: PathBuf,
    pub clear_colour: wgpu::Color,
    /// Resolution of directional and omni-directional shadow maps.
    pub shadow_resolution: u32,
    pub camera: CameraConfig,
}

impl Default for LessonConfig {
    fn default() -> Self {
        Self {
            title: "lesson-ngin".to_string(),
            width: 1920,
            height: 1080,
            fullscreen: false,
            vsync: true,
            assets_dir: PathBuf::from("./assets"),
            clear_colour: wgpu::Color {
                r: 0.2,
                g: 0.3,
                b: 0.3,
                a: 1.0,
            },
            shadow_resolution: 1024,
            camera: CameraConfig::default(),
        }
    }
}

impl LessonConfig {
    pub const ENV_ASSETS: &'static str = "LESSON_ASSETS";
    pub const ENV_WIDTH: &'static str = "LESSON_WIDTH";
    pub const ENV_HEIGHT: &'static str = "LESSON_HEIGHT";
    pub const ENV_FULLSCREEN: &'static str = "LESSON_FULLSCREEN";

    /// Default configuration with overrides read from the process environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Applies overrides from an arbitrary key lookup. Values that don't parse
    /// are logged and skipped.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(Self::ENV_ASSETS) {
            self.assets_dir = PathBuf::from(dir);
        }
        if let Some(width) = lookup(Self::ENV_WIDTH) {
            match parse_dimension(&width) {
                Some(width) => self.width = width,
                None => log::warn!("Ignoring {}={width}: not a positive size", Self::ENV_WIDTH),
            }
        }
        if let Some(height) = lookup(Self::ENV_HEIGHT) {
            match parse_dimension(&height) {
                Some(height) => self.height = height,
                None => log::warn!("Ignoring {}={height}: not a positive size", Self::ENV_HEIGHT),
            }
        }
        if let Some(fullscreen) = lookup(Self::ENV_FULLSCREEN) {
            match parse_flag(&fullscreen) {
                Some(flag) => self.fullscreen = flag,
                None => log::warn!(
                    "Ignoring {}={fullscreen}: expected true/false/1/0",
                    Self::ENV_FULLSCREEN
                ),
            }
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

fn parse_dimension(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok().filter(|v| *v > 0)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_lesson_constants() {
        let config = LessonConfig::default();
        assert_eq!((config.width, config.height), (1920, 1080));
        assert_eq!(config.shadow_resolution, 1024);
        assert_eq!(config.camera.yaw, -90.0);
        assert_eq!(config.camera.zoom, 45.0);
        assert_eq!(config.camera.speed, 2.5);
    }

    #[test]
    fn overrides_replace_valid_values() {
        let mut config = LessonConfig::default();
        config.apply_overrides(lookup(&[
            ("LESSON_ASSETS", "/tmp/lesson-assets"),
            ("LESSON_WIDTH", "800"),
            ("LESSON_HEIGHT", " 600 "),
            ("LESSON_FULLSCREEN", "yes"),
        ]));
        assert_eq!(config.assets_dir, PathBuf::from("/tmp/lesson-assets"));
        assert_eq!((config.width, config.height), (800, 600));
        assert!(config.fullscreen);
    }

    #[test]
    fn invalid_overrides_are_ignored() {
        let mut config = LessonConfig::default();
        config.apply_overrides(lookup(&[
            ("LESSON_WIDTH", "-3"),
            ("LESSON_HEIGHT", "0"),
            ("LESSON_FULLSCREEN", "maybe"),
        ]));
        assert_eq!((config.width, config.height), (1920, 1080));
        assert!(!config.fullscreen);
    }

    #[test]
    fn aspect_uses_float_division() {
        let mut config = LessonConfig::default();
        config.width = 800;
        config.height = 600;
        assert!((config.aspect() - 4.0 / 3.0).abs() < f32::EPSILON);
        config.height = 0;
        assert_eq!(config.aspect(), 1.0);
    }
}
