use std::sync::Arc;

use winit::{
    dpi::LogicalSize,
    event::WindowEvent,
    event_loop::EventLoop,
    window::WindowAttributes,
};

use crate::{gpu::GpuLifeRenderer, sim::GridConfig};

pub mod gpu;
pub mod rendering;
pub mod sim;
pub mod util;

struct Application {
    config: GridConfig,
    renderer: Option<GpuLifeRenderer>,
}

impl Application {
    fn new(config: GridConfig) -> Self {
        Self {
            config,
            renderer: None,
        }
    }
}

impl winit::application::ApplicationHandler for Application {
    fn resumed(&mut self, event_loop: &winit::event_loop::ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }

        let attrs = WindowAttributes::default()
            .with_title("lifegrid")
            .with_inner_size(LogicalSize::new(640.0, 640.0));
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        match pollster::block_on(GpuLifeRenderer::new(window, self.config)) {
            Ok(renderer) => {
                log::info!("GPU renderer initialized");
                renderer.request_redraw();
                self.renderer = Some(renderer);
            }
            Err(e) => {
                log::error!("failed to initialize GPU renderer: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(ref mut renderer) = self.renderer {
                    renderer.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                let Some(ref mut renderer) = self.renderer else {
                    return;
                };
                match renderer.redraw() {
                    Ok(()) => renderer.request_redraw(),
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        renderer.reconfigure_surface();
                        renderer.request_redraw();
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("out of GPU memory, exiting");
                        event_loop.exit();
                    }
                    Err(e) => {
                        log::warn!("surface error: {e:?}");
                        renderer.request_redraw();
                    }
                }
            }
            _ => (),
        }
    }
}

/// Create the event loop and run the simulation until the window closes.
pub fn run(config: GridConfig) -> Result<(), anyhow::Error> {
    let event_loop = EventLoop::new()?;
    let mut app = Application::new(config);
    event_loop.run_app(&mut app)?;
    Ok(())
}
