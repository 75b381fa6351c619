//! Flow control and application event loop.
//!
//! A "flow" is the scene code: it loads models, places and animates their
//! instances and draws them. The event loop owns the window, the surface and
//! the [`SceneContext`], and hands that context to the flow explicitly on every
//! call instead of keeping scene state in globals.
//!
//! # Lifecycle Flow
//!
//! 1. `on_init` once the window and GPU context exist
//! 2. `on_window_events` for every winit window event
//! 3. `on_update` every frame and `on_tick` every configured tick
//! 4. `on_render` inside the frame's render pass, after the shader program is bound
//! 5. Present frame

use std::{iter, sync::Arc};

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{Key, NamedKey},
    window::Window,
};

use crate::{
    camera::Camera,
    config::Config,
    context::{self, Context},
    data_structures::texture::Texture,
    pipelines::basic::ShaderProgram,
};

/// Everything scene code needs to load, update and draw models.
pub struct SceneContext {
    pub ctx: Context,
    pub program: ShaderProgram,
    pub camera: Camera,
    pub config: Config,
    /// Time since the event loop started.
    pub elapsed: Duration,
}

/// Trait for implementing a renderable scene.
///
/// Only `on_init`, `on_update` and `on_render` are required; input handling
/// and fixed-interval ticks are optional.
pub trait GraphicsFlow {
    /// Load models and textures and place the first instances.
    ///
    /// An error here ends the event loop and is returned from [`run`].
    fn on_init(&mut self, scene: &mut SceneContext) -> anyhow::Result<()>;

    /// Update state every frame, `dt` being the time since the previous frame.
    fn on_update(&mut self, scene: &mut SceneContext, dt: Duration);

    /// Called every [`Config::tick`].
    fn on_tick(&mut self, _scene: &mut SceneContext) {}

    /// Handle window events (keyboard, mouse, window resizing, etc.).
    fn on_window_events(&mut self, _scene: &mut SceneContext, _event: &WindowEvent) {}

    /// Draw the flow's models. The instanced pipeline and its scene uniforms are already bound.
    ///
    /// To draw a batch with other uniforms, assign them on `scene.program` and
    /// call [`ShaderProgram::use_program`] again before drawing it.
    fn on_render(&mut self, scene: &mut SceneContext, render_pass: &mut wgpu::RenderPass<'_>);
}

/// Window, surface and scene bundle that exists once the app has been resumed.
struct AppState {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    depth_texture: Texture,
    scene: SceneContext,
    is_surface_configured: bool,
}

impl AppState {
    async fn new(window: Arc<Window>, config: Config) -> anyhow::Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        let (device, queue) = context::request_device(&adapter).await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shader writes linear colours and relies on an sRGB surface to encode them.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("the surface supports no texture formats"))?;
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let ctx = Context::new(device, queue);
        let program = ShaderProgram::new(&ctx, surface_format, &config);
        let camera = Camera::new(
            (0.0, 6.0, 14.0).into(),
            (0.0, 0.0, 0.0).into(),
            size.width.max(1) as f32 / size.height.max(1) as f32,
        );
        let depth_texture =
            Texture::create_depth_texture(&ctx.device, [size.width, size.height], "depth_texture");
        log::info!(
            "Surface ready: {:?} {}x{}",
            surface_format,
            size.width,
            size.height
        );

        Ok(Self {
            window,
            surface,
            surface_config,
            depth_texture,
            scene: SceneContext {
                ctx,
                program,
                camera,
                config,
                elapsed: Duration::ZERO,
            },
            is_surface_configured: false,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.surface_config.width = width;
            self.surface_config.height = height;
            self.is_surface_configured = true;
            self.scene.camera.resize(width, height);
            self.surface
                .configure(&self.scene.ctx.device, &self.surface_config);
            self.depth_texture =
                Texture::create_depth_texture(&self.scene.ctx.device, [width, height], "depth_texture");
        }
    }

    fn push_camera(&mut self) {
        let scene = &mut self.scene;
        let view = scene.camera.view();
        let projection = scene.camera.projection();
        let position = scene.camera.position;
        let elapsed = scene.elapsed.as_secs_f32();
        scene.program.set_mat4("view", view);
        scene.program.set_mat4("projection", projection);
        scene
            .program
            .set_vec3("viewPos", [position.x, position.y, position.z]);
        scene.program.set_float("time", elapsed);
    }

    fn render<F: GraphicsFlow>(&mut self, flow: &mut F) -> Result<(), wgpu::SurfaceError> {
        // invoke main render loop
        self.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.scene
                .ctx
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Render Encoder"),
                });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.scene.config.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            let scene = &mut self.scene;
            scene.program.begin_frame();
            scene.program.use_program(&scene.ctx, &mut render_pass);
            flow.on_render(scene, &mut render_pass);
        }

        self.scene.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

struct App<F: GraphicsFlow> {
    async_runtime: tokio::runtime::Runtime,
    flow: F,
    config: Config,
    state: Option<AppState>,
    started: Instant,
    last_time: Instant,
    time_since_tick: Duration,
    failure: Option<anyhow::Error>,
}

impl<F: GraphicsFlow> App<F> {
    fn new(flow: F, config: Config) -> anyhow::Result<Self> {
        Ok(Self {
            async_runtime: tokio::runtime::Runtime::new()?,
            flow,
            config,
            state: None,
            started: Instant::now(),
            last_time: Instant::now(),
            time_since_tick: Duration::ZERO,
            failure: None,
        })
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<AppState> {
        let window_attributes = Window::default_attributes().with_title(self.config.window_title.clone());
        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let mut state = self
            .async_runtime
            .block_on(AppState::new(window, self.config.clone()))?;
        let size = state.window.inner_size();
        state.resize(size.width, size.height);
        self.flow.on_init(&mut state.scene)?;
        Ok(state)
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{:#}", err);
        self.failure = Some(err);
        event_loop.exit();
    }
}

impl<F: GraphicsFlow> ApplicationHandler for App<F> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        match self.init(event_loop) {
            Ok(state) => {
                self.last_time = Instant::now();
                self.state = Some(state);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        self.flow.on_window_events(&mut state.scene, &event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput { event: key, .. }
                if key.state.is_pressed() && key.logical_key == Key::Named(NamedKey::Escape) =>
            {
                event_loop.exit()
            }
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();
                self.time_since_tick += dt;
                state.scene.elapsed = self.started.elapsed();

                self.flow.on_update(&mut state.scene, dt);
                if self.time_since_tick >= state.scene.config.tick {
                    self.flow.on_tick(&mut state.scene);
                    self.time_since_tick = Duration::ZERO;
                }
                state.push_camera();

                match state.render(&mut self.flow) {
                    Ok(()) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(e) => {
                        log::error!("Unable to render {}", e);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Open a window and drive `flow` until the window is closed.
///
/// Initialises `env_logger` unless a logger is already installed and reads
/// [`Config::from_env`].
pub fn run<F: GraphicsFlow + 'static>(flow: F) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let config = Config::from_env();
    let event_loop = EventLoop::new()?;
    let mut app = App::new(flow, config)?;
    event_loop.run_app(&mut app)?;

    match app.failure.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
