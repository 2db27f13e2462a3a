#![allow(dead_code)]

use std::path::PathBuf;

use lesson_ngin::{
    config::LessonConfig,
    context::Context,
    flow::{self, Lesson},
    lessons::LessonKind,
};

pub const WIDTH: u32 = 64;
pub const HEIGHT: u32 = 48;

pub fn config() -> LessonConfig {
    let _ = env_logger::builder().is_test(true).try_init();
    LessonConfig::default()
}

/// Assets directory that does not exist.
pub fn missing_assets() -> PathBuf {
    std::env::temp_dir().join("lesson-ngin-no-assets-here")
}

pub async fn headless(config: LessonConfig) -> Context {
    Context::headless(WIDTH, HEIGHT, config)
        .await
        .expect("integration tests need a GPU adapter")
}

/// Builds `kind` the way the run loop does, including `on_init`.
pub async fn start(ctx: &mut Context, kind: LessonKind) -> anyhow::Result<Box<dyn Lesson>> {
    let mut lesson = (kind.constructor())(ctx.init_context()).await?;
    lesson.on_init(ctx);
    Ok(lesson)
}

pub async fn render(ctx: &mut Context, lesson: &mut dyn Lesson, frames: u32) -> image::RgbaImage {
    flow::render_offscreen(ctx, lesson, frames)
        .await
        .expect("offscreen rendering failed")
}

pub fn centre(image: &image::RgbaImage) -> image::Rgba<u8> {
    *image.get_pixel(image.width() / 2, image.height() / 2)
}

pub fn corner(image: &image::RgbaImage) -> image::Rgba<u8> {
    *image.get_pixel(0, 0)
}
