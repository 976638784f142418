use std::{rc::Rc, sync::Arc};

use glam::Vec2;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::{
    animation::AnimationClock,
    atlas::{AtlasMetadata, AtlasSize, parse_atlas},
    camera::Camera,
    config::AppConfig,
    context::Graphics,
    error::{Error, Result},
    program::{ProgramSource, SpriteProgram},
    render_loop::{RenderLoop, Tick},
    scene::SpriteScene,
    sprite::{Sprite, SpriteBindings},
    texture::Texture,
    time::FrameTimer,
};

/// Loads every asset & GPU resource the scene needs
///
/// Nothing is drawn until this has finished; any failure aborts startup
pub async fn load_scene(
    config: &AppConfig,
    window: Arc<Window>,
) -> Result<(SpriteScene, AnimationClock)> {
    let gfx = Graphics::new(window, config.clear_color).await?;

    let source = match &config.shader_path {
        Some(path) => ProgramSource::from_path(path)?,
        None => ProgramSource::default(),
    };
    let program = SpriteProgram::new(gfx.device(), gfx.surface_format(), &source).await?;
    let program = Rc::new(program);

    let texture = Rc::new(Texture::load(
        gfx.device(),
        gfx.queue(),
        program.texture_layout(),
        &config.texture_path,
    )?);

    let metadata = AtlasMetadata::load(&config.atlas_path)?;
    let size = atlas_size(metadata.size(), texture.size());
    let atlas = Rc::new(parse_atlas(&metadata, config.frames.as_slice(), size)?);

    let bindings = SpriteBindings::resolve(&program)?;
    let sprite = Sprite::new(
        gfx.device(),
        program,
        config.frames.as_slice(),
        atlas,
        bindings,
        texture,
    )?;

    let clock = AnimationClock::new(config.frames.iter().cloned(), config.interval)?
        .with_policy(config.step_policy);
    let mut camera = Camera::new(Vec2::from(config.view_half_extent));
    camera.target(Vec2::from(config.view_center));
    camera.set_zoom(config.zoom);

    let (w, h) = gfx.surface_size();
    log::info!(
        "scene ready: {} frames every {}s on a {w}x{h} surface",
        config.frames.len(),
        config.interval
    );
    Ok((SpriteScene::new(gfx, sprite, camera), clock))
}

// The uploaded image is the ground truth for normalization
fn atlas_size(declared: Option<AtlasSize>, actual: AtlasSize) -> AtlasSize {
    if let Some(declared) = declared {
        if declared != actual {
            log::warn!(
                "atlas declares {}x{} but the texture is {}x{}; using the texture size",
                declared.width,
                declared.height,
                actual.width,
                actual.height
            );
        }
    }
    actual
}

struct Running {
    scene: SpriteScene,
    render_loop: RenderLoop,
}

/// winit host for the render loop
///
/// Creates the window on `resumed`, blocks on [`load_scene`], then redraws once per
/// refresh for as long as the loop keeps returning [`Tick::Continue`]
pub struct App {
    config: AppConfig,
    window: Option<Arc<Window>>,
    running: Option<Running>,
    error: Option<Error>,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            window: None,
            running: None,
            error: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let mut attrs = Window::default_attributes()
            .with_title(&self.config.title)
            .with_resizable(self.config.resizable);
        if let (Some(width), Some(height)) = (self.config.width, self.config.height) {
            attrs = attrs.with_inner_size(PhysicalSize::new(width, height));
        }

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .map_err(|e| Error::init("window", e))?,
        );
        self.window = Some(window.clone());

        let (scene, clock) = pollster::block_on(load_scene(&self.config, window.clone()))?;
        // timing starts now so loading time isn't counted as the first frame's delta
        self.running = Some(Running {
            scene,
            render_loop: RenderLoop::new(clock, FrameTimer::default()),
        });
        window.request_redraw();
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(running) = self.running.as_mut() else {
            return;
        };

        match running.render_loop.tick(&mut running.scene) {
            Ok(Tick::Continue) => {
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            Ok(Tick::Stopped) => event_loop.exit(),
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: Error) {
        log::error!("{err}");
        self.error.get_or_insert(err);
        self.running = None;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.start(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                if let Some(running) = &self.running {
                    running.render_loop.stop_handle().stop();
                }
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            WindowEvent::Resized(size) => {
                if let Some(running) = self.running.as_mut() {
                    running.scene.resize(size.width, size.height);
                }
            }
            _ => {}
        }
    }
}

/// Opens the window & runs the animation until it is closed or a fatal error occurs
pub fn run(config: AppConfig) -> Result<()> {
    config.validate()?;

    let event_loop = EventLoop::new().map_err(|e| Error::init("event loop", e))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop
        .run_app(&mut app)
        .map_err(|e| Error::RenderState(format!("event loop: {e}")))?;

    match app.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
