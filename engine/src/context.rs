use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::input::InputState;
use crate::render::graphics::{create_graphics, Graphics, GraphicsEvent, Rc};
use crate::render::Frame;
use crate::scene::Scene;
use crate::time::FrameClock;

/// Per-frame game logic, run before the scene steps physics and draws.
pub trait Game {
    fn update(&mut self, scene: &mut Scene, input: &InputState, dt: f32);
}

enum State {
    Ready(Graphics),
    Init(Option<EventLoopProxy<GraphicsEvent>>),
}

pub struct EngineContext {
    event_loop: Option<EventLoop<GraphicsEvent>>,
    app: App,
}

pub struct App {
    state: State,
    config: EngineConfig,
    scene: Scene,
    game: Box<dyn Game>,
    input: InputState,
    clock: FrameClock,
    frame: Frame,
    error: Option<EngineError>,
}

impl App {
    pub fn new(
        event_loop: &EventLoop<GraphicsEvent>,
        config: EngineConfig,
        scene: Scene,
        game: Box<dyn Game>,
    ) -> Self {
        let frame = Frame::new(config.window.width, config.window.height);
        Self {
            state: State::Init(Some(event_loop.create_proxy())),
            config,
            scene,
            game,
            input: InputState::default(),
            clock: FrameClock::new(),
            frame,
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: EngineError) {
        log::error!("{err}");
        self.error = Some(err);
        event_loop.exit();
    }

    fn draw(&mut self, event_loop: &ActiveEventLoop) {
        let State::Ready(gfx) = &mut self.state else {
            return;
        };

        let dt = self.clock.tick();
        let (width, height) = gfx.size();
        self.scene.set_viewport(width, height);
        self.game.update(&mut self.scene, &self.input, dt);
        self.scene.update(&self.input, dt);
        self.input.end_frame();

        self.frame.resize(width, height);
        self.scene.draw(&mut self.frame, self.clock.fps());

        if let Err(err) = gfx.present(self.frame.as_image()) {
            self.fail(event_loop, err);
        }
    }

    fn resized(&mut self, size: PhysicalSize<u32>) {
        if let State::Ready(gfx) = &mut self.state {
            gfx.resize(size);
        }
    }
}

impl ApplicationHandler<GraphicsEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let State::Init(proxy) = &mut self.state {
            if let Some(proxy) = proxy.take() {
                let win_attr = Window::default_attributes()
                    .with_title(self.config.window.title.clone())
                    .with_inner_size(LogicalSize::new(
                        self.config.window.width,
                        self.config.window.height,
                    ));

                let window = match event_loop.create_window(win_attr) {
                    Ok(window) => Rc::new(window),
                    Err(err) => return self.fail(event_loop, err.into()),
                };

                pollster::block_on(create_graphics(window, proxy));
            }
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, graphics: GraphicsEvent) {
        match graphics {
            Ok(graphics) => {
                // Request a redraw now that graphics are ready
                graphics.request_redraw();
                self.clock = FrameClock::new();
                self.state = State::Ready(graphics);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::Resized(size) => self.resized(size),
            WindowEvent::RedrawRequested => self.draw(event_loop),
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput { event, .. } => {
                if event.physical_key == PhysicalKey::Code(KeyCode::Escape)
                    && event.state == ElementState::Pressed
                {
                    event_loop.exit();
                }
                self.input.handle_event(&event);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let State::Ready(gfx) = &self.state {
            gfx.request_redraw();
        }
    }
}

fn run_app(event_loop: EventLoop<GraphicsEvent>, mut app: App) -> Result<()> {
    event_loop.run_app(&mut app)?;
    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Installs the logger. `RUST_LOG` wins over `default_filter`; calling this
/// twice is harmless.
pub fn init_logging(default_filter: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .try_init();
}

impl EngineContext {
    pub fn new(config: EngineConfig, scene: Scene, game: impl Game + 'static) -> Result<Arc<Self>> {
        init_logging(&config.log.filter);
        let event_loop = EventLoop::<GraphicsEvent>::with_user_event().build()?;
        event_loop.set_control_flow(ControlFlow::Poll);
        let app = App::new(&event_loop, config, scene, Box::new(game));
        Ok(Arc::new(Self {
            event_loop: Some(event_loop),
            app,
        }))
    }

    pub fn run(self: Arc<Self>) -> Result<()> {
        // Require unique Arc so we can take ownership of the inner EngineContext
        let mut ctx = Arc::try_unwrap(self).unwrap_or_else(|_| {
            panic!("EngineContext must have no other Arc references when calling run")
        });
        match ctx.event_loop.take() {
            Some(event_loop) => run_app(event_loop, ctx.app),
            None => Ok(()),
        }
    }
}
