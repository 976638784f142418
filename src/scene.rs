use glam::vec2;

use crate::{
    camera::Camera, context::Graphics, error::Result, render_loop::FrameRenderer, sprite::Sprite,
};

/// One sprite on a cleared surface, seen through a camera
pub struct SpriteScene {
    gfx: Graphics,
    sprite: Sprite,
    camera: Camera,
}

impl SpriteScene {
    pub fn new(gfx: Graphics, sprite: Sprite, camera: Camera) -> Self {
        Self {
            gfx,
            sprite,
            camera,
        }
    }

    /// Reconfigures the surface; the camera picks up the new aspect on the next frame
    pub fn resize(&mut self, w: u32, h: u32) {
        self.gfx.resize(w, h);
    }
}

impl FrameRenderer for SpriteScene {
    fn render_frame(&mut self, frame_name: &str) -> Result<()> {
        self.gfx.check_health()?;
        self.sprite.set_texture_rect(frame_name)?;

        let Some(mut frame) = self.gfx.begin_frame()? else {
            return Ok(());
        };
        let (w, h) = self.gfx.surface_size();
        let view_proj = self.camera.view_proj(vec2(w as f32, h as f32));
        {
            let mut pass = self.gfx.begin_render_pass(&mut frame.encoder, &frame.view);
            self.sprite.draw(&mut pass, self.gfx.queue(), view_proj);
        }
        self.gfx.end_frame(frame);

        // validation errors & device loss are reported asynchronously
        self.gfx.check_health()
    }
}
