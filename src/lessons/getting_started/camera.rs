use anyhow::Result;
use instant::Duration;

use crate::{
    context::{Context, InitContext},
    flow::Lesson,
    lessons::getting_started::coordinates::Containers,
    render::RenderTarget,
};

/// Every third container spins, the rest stand still. WASD and the mouse
/// move the camera, the wheel zooms.
pub struct FlyCamera {
    containers: Containers,
}

impl FlyCamera {
    pub async fn new(init: InitContext) -> Result<Self> {
        Ok(Self {
            containers: Containers::new(&init, |i| i % 3 == 0).await?,
        })
    }
}

impl Lesson for FlyCamera {
    fn on_init(&mut self, ctx: &mut Context) {
        ctx.camera.controller.set_enabled(true);
    }

    fn on_update(&mut self, ctx: &Context, _dt: Duration, elapsed: Duration) {
        self.containers.update(ctx, elapsed);
    }

    fn on_render(&self, ctx: &Context, encoder: &mut wgpu::CommandEncoder, target: &RenderTarget) {
        self.containers.render(ctx, encoder, target);
    }
}
