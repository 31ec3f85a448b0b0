//! Platform layer: window & event loop driving the surface renderer.
//!
//! - Redraws continuously; every frame re-uploads the mesh.
//! - Resize/scale changes reconfigure the swapchain.
//! - `Esc` closes, `F` toggles wireframe/filled.

use std::sync::Arc;

use anyhow::{Context, Result};
use asset::SurfaceMesh;
use renderer::{GpuState, RendererConfig};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

/// Window options.
#[derive(Clone, Debug)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Surfview".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Open a window and render `mesh` until it is closed.
pub fn run_viewer(window: WindowConfig, renderer: RendererConfig, mesh: SurfaceMesh) -> Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ViewerApp::new(window, renderer, mesh);
    event_loop
        .run_app(&mut app)
        .context("Event loop terminated with error")?;

    match app.fatal.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct ViewerApp {
    window_config: WindowConfig,
    renderer_config: RendererConfig,
    // Handed to the GPU state on first resume.
    mesh: Option<SurfaceMesh>,
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    fatal: Option<anyhow::Error>,
}

impl ViewerApp {
    fn new(window_config: WindowConfig, renderer_config: RendererConfig, mesh: SurfaceMesh) -> Self {
        Self {
            window_config,
            renderer_config,
            mesh: Some(mesh),
            window: None,
            gpu: None,
            fatal: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.window_config.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.window_config.width,
                self.window_config.height,
            ));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("Failed to create window")?,
        );
        log::info!(
            "Window created: {}x{}",
            window.inner_size().width,
            window.inner_size().height
        );

        let mesh = self.mesh.take().context("Mesh already handed to the renderer")?;
        let gpu = pollster::block_on(GpuState::new(window.clone(), mesh, &self.renderer_config))
            .context("GPU initialization failed")?;

        window.request_redraw();
        self.window = Some(window);
        self.gpu = Some(gpu);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.fatal = Some(err);
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        match gpu.render() {
            Ok(()) => {}
            Err(e) if GpuState::is_surface_lost(&e) => {
                log::warn!("Surface lost/outdated, reconfiguring");
                gpu.recreate_surface();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                self.fail(event_loop, anyhow::anyhow!("GPU out of memory"));
            }
            Err(e) => log::warn!("Frame skipped: {e}"),
        }
    }

    fn on_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        match event.physical_key {
            PhysicalKey::Code(KeyCode::Escape) => {
                log::info!("Escape pressed. Exiting event loop.");
                event_loop.exit();
            }
            PhysicalKey::Code(KeyCode::KeyF) => {
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.toggle_mode();
                }
            }
            _ => {}
        }
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                log::info!("Resized: {}x{}", new_size.width, new_size.height);
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(new_size.width, new_size.height);
                }
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                log::info!("Scale factor changed: {:.3}", scale_factor);
                if let (Some(window), Some(gpu)) = (self.window.as_ref(), self.gpu.as_mut()) {
                    let size = window.inner_size();
                    gpu.resize(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => self.on_key(event_loop, &event),
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_is_720p() {
        let cfg = WindowConfig::default();
        assert_eq!((cfg.width, cfg.height), (1280, 720));
        assert_eq!(cfg.title, "Surfview");
    }
}
