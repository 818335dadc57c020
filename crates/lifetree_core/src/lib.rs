use lifetree_render::GraphicsContext;
use std::sync::Arc;
use std::time::Instant;
use winit::{
    dpi::PhysicalSize,
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::WindowBuilder,
};

pub mod error;
pub mod input;
pub mod render_loop;
pub mod scene;

pub use error::AppError;
pub use input::{scroll_delta, PointerTracker, ViewInput};
pub use render_loop::{apply_wind, RenderLoop};
pub use scene::SceneContext;

// Re-export winit key codes for host keyboard handling
pub use winit::keyboard::KeyCode;

/// What the window drives each frame
pub trait ViewHandler {
    fn on_input(&mut self, input: ViewInput);

    /// Called once per redraw with seconds since the previous one
    fn on_frame(&mut self, dt: f32) -> Result<(), AppError>;

    fn on_resize(&mut self, width: u32, height: u32);

    fn on_exit(&mut self) {}
}

/// Window and event loop hosting one visualization
pub struct App {
    title: String,
    width: u32,
    height: u32,
}

impl App {
    /// Create a new App with the specified title and dimensions
    pub fn new(title: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            title: title.into(),
            width,
            height,
        }
    }

    /// `RUST_LOG` controls verbosity, `info` otherwise. Later calls are no-ops.
    pub fn init_logging() {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
    }

    /// Open the window, build the handler from its graphics context and run
    /// until the window closes or a frame fails.
    pub fn run<H, F>(self, setup: F) -> Result<(), AppError>
    where
        H: ViewHandler,
        F: FnOnce(GraphicsContext) -> Result<H, AppError>,
    {
        Self::init_logging();

        let event_loop = EventLoop::new()?;

        let window = Arc::new(
            WindowBuilder::new()
                .with_title(&self.title)
                .with_inner_size(PhysicalSize::new(self.width, self.height))
                .build(&event_loop)?,
        );

        log::info!("Window created: {} ({}x{})", self.title, self.width, self.height);

        let context = GraphicsContext::new(window.clone())?;
        let mut handler = setup(context)?;

        let mut pointer = PointerTracker::default();
        let mut last_frame = Instant::now();
        let mut failure: Option<AppError> = None;

        event_loop.run(|event, elwt| {
            elwt.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent { event, .. } => match event {
                    WindowEvent::CloseRequested => {
                        log::info!("Close requested, exiting...");
                        elwt.exit();
                    }
                    WindowEvent::Resized(size) => {
                        handler.on_resize(size.width, size.height);
                        log::debug!("Window resized to: {:?}", size);
                    }
                    WindowEvent::RedrawRequested => {
                        let now = Instant::now();
                        let dt = now.duration_since(last_frame).as_secs_f32();
                        last_frame = now;

                        if let Err(err) = handler.on_frame(dt) {
                            log::error!("Frame failed: {}", err);
                            failure = Some(err);
                            elwt.exit();
                        }
                    }
                    other => {
                        if let Some(input) = pointer.translate(&other) {
                            handler.on_input(input);
                        }
                    }
                },
                Event::AboutToWait => {
                    window.request_redraw();
                }
                Event::LoopExiting => {
                    handler.on_exit();
                }
                _ => {}
            }
        })?;

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
