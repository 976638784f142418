use std::sync::{Arc, Mutex};

use wgpu::{
    Color, CommandEncoder, Device, DeviceDescriptor, DeviceLostReason, Instance, LoadOp,
    Operations, PresentMode, Queue, RenderPass, RenderPassColorAttachment, RenderPassDescriptor,
    RequestAdapterOptions, StoreOp, Surface, SurfaceConfiguration, SurfaceError, SurfaceTexture,
    TextureFormat, TextureView,
};
use winit::window::Window;

use crate::error::{Error, Result};

struct RenderTarget {
    surface: Surface<'static>,
    config: SurfaceConfiguration,
}

struct Gpu {
    device: Device,
    queue: Queue,
}

pub struct Frame {
    pub view: TextureView,
    pub encoder: CommandEncoder,
    surface_texture: SurfaceTexture,
}

/// First fatal GPU problem reported asynchronously by wgpu
///
/// Filled from the device-lost callback & the uncaptured error handler, both of which
/// may fire on another thread
#[derive(Clone, Default)]
struct GpuHealth(Arc<Mutex<Option<String>>>);

impl GpuHealth {
    fn report(&self, problem: String) {
        if let Ok(mut slot) = self.0.lock() {
            log::error!("{problem}");
            slot.get_or_insert(problem);
        }
    }

    fn check(&self) -> Result<()> {
        match self.0.lock() {
            Ok(slot) => match slot.as_ref() {
                Some(problem) => Err(Error::RenderState(problem.clone())),
                None => Ok(()),
            },
            Err(_) => Err(Error::RenderState("GPU health state poisoned".into())),
        }
    }
}

/// Window-backed drawing surface plus the wgpu device & queue
///
/// Handles surface configuration, clearing & presenting
pub struct Graphics {
    gpu: Gpu,
    target: RenderTarget,
    clear_color: Color,
    health: GpuHealth,
}

impl Graphics {
    /// Creates the wgpu instance, surface, adapter & device for `window`
    ///
    /// Every failure here is fatal for startup & comes back as [`Error::ResourceInit`]
    pub async fn new(window: Arc<Window>, clear_color: [f64; 4]) -> Result<Self> {
        let size = window.inner_size();
        let instance = Instance::default();
        let surface = instance
            .create_surface(window)
            .map_err(|e| Error::init("surface", e))?;
        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                // Force find adapter that can present to this surface
                compatible_surface: Some(&surface),
                ..Default::default()
            })
            .await
            .map_err(|e| Error::init("GPU adapter", e))?;
        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some("flipbook"),
                ..Default::default()
            })
            .await
            .map_err(|e| Error::init("GPU device", e))?;

        let info = adapter.get_info();
        log::info!("using {} ({:?})", info.name, info.backend);

        let health = GpuHealth::default();
        let lost = health.clone();
        device.set_device_lost_callback(move |reason, message| {
            // dropping the device at shutdown also ends up here
            if matches!(reason, DeviceLostReason::Destroyed) {
                return;
            }
            lost.report(format!("GPU device lost ({reason:?}): {message}"));
        });
        let uncaptured = health.clone();
        device.on_uncaptured_error(Box::new(move |err| {
            uncaptured.report(format!("GPU error: {err}"));
        }));

        // WebGPU throws error 'size is zero' if not set
        let (w, h) = (size.width.max(1), size.height.max(1));
        let mut surface_cfg = surface
            .get_default_config(&adapter, w, h)
            .ok_or_else(|| Error::init("surface", "adapter cannot present to this window"))?;
        surface_cfg.present_mode = PresentMode::AutoVsync;
        surface.configure(&device, &surface_cfg);

        let [r, g, b, a] = clear_color;
        Ok(Self {
            gpu: Gpu { device, queue },
            target: RenderTarget {
                surface,
                config: surface_cfg,
            },
            clear_color: Color { r, g, b, a },
            health,
        })
    }

    pub fn device(&self) -> &Device {
        &self.gpu.device
    }

    pub fn queue(&self) -> &Queue {
        &self.gpu.queue
    }

    pub fn surface_format(&self) -> TextureFormat {
        self.target.config.format
    }

    /// Returns the current surface dimensions (in pixels)
    pub fn surface_size(&self) -> (u32, u32) {
        (self.target.config.width, self.target.config.height)
    }

    /// Fails if the device was lost or wgpu reported an uncaptured error
    pub fn check_health(&self) -> Result<()> {
        self.health.check()
    }

    /// Acquires the next surface texture & a command encoder
    ///
    /// Returns `Ok(None)` when this refresh should be skipped (timeout, or a surface that was
    /// outdated & has just been reconfigured). A lost surface or exhausted memory is fatal
    pub fn begin_frame(&mut self) -> Result<Option<Frame>> {
        let surface_texture = match self.target.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(SurfaceError::Timeout) => {
                log::warn!("surface timed out; skipping frame");
                return Ok(None);
            }
            Err(SurfaceError::Outdated) => {
                self.reconfigure();
                return Ok(None);
            }
            Err(e) => return Err(Error::RenderState(format!("surface: {e}"))),
        };

        let view = surface_texture.texture.create_view(&Default::default());
        let encoder = self.gpu.device.create_command_encoder(&Default::default());

        Ok(Some(Frame {
            view,
            encoder,
            surface_texture,
        }))
    }

    /// Starts a pass that clears the frame to the clear color
    pub fn begin_render_pass<'a>(
        &self,
        encoder: &'a mut CommandEncoder,
        view: &'a TextureView,
    ) -> RenderPass<'a> {
        encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("Sprite Pass"),
            color_attachments: &[Some(RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: Operations {
                    load: LoadOp::Clear(self.clear_color),
                    store: StoreOp::Store,
                },
            })],
            ..Default::default()
        })
    }

    /// Ends the frame by submitting commands and presenting
    pub fn end_frame(&mut self, frame: Frame) {
        self.gpu.queue.submit(Some(frame.encoder.finish()));
        frame.surface_texture.present();
    }

    /// Resizes the surface
    pub fn resize(&mut self, w: u32, h: u32) {
        if w == 0 || h == 0 {
            return;
        }
        (self.target.config.width, self.target.config.height) = (w, h);
        self.reconfigure();
    }

    fn reconfigure(&self) {
        self.target
            .surface
            .configure(&self.gpu.device, &self.target.config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_keeps_first_problem() {
        let health = GpuHealth::default();
        assert!(health.check().is_ok());

        health.report("device lost".into());
        health.report("validation error".into());
        match health.check() {
            Err(Error::RenderState(msg)) => assert_eq!(msg, "device lost"),
            other => panic!("expected RenderState, got {other:?}"),
        }
    }

    #[test]
    fn health_is_shared_between_clones() {
        let health = GpuHealth::default();
        let reporter = health.clone();
        reporter.report("gone".into());
        assert!(health.check().is_err());
    }
}
