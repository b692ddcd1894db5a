//! The playground: wires the engine, the scene and a demo together and runs
//! the window event loop.
//!
//! Per frame the [`Playground`] finishes any asset loads that are ready,
//! advances its [`FrameClock`], fans the logical time out to the scene,
//! feeds the time into the plane's parameter slots and asks the engine to
//! render. Pointer and resize events are written into the plane's parameter
//! slots through its `update_props` hook. A control surface drives the two
//! entry points [`Playground::update_camera_axis`] and
//! [`Playground::rebuild_scene`]; the window's keyboard stands in for it.

use std::{cell::RefCell, rc::Rc, sync::Arc};

use anyhow::Result;
use futures::{FutureExt, future::LocalBoxFuture};
use instant::{Duration, Instant};
use rand::{Rng, SeedableRng, rngs::StdRng};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{Key, NamedKey},
    window::Window,
};

use crate::{
    animation::Tween,
    camera::{CameraAxis, CameraKind},
    data_structures::{texture::Texture, transform::Transform},
    engine::{Engine, EngineConfig},
    objects::{
        cube::{Cube, CubeProps},
        model::{ModelInstance, ModelProps},
        pixel_grid::{PixelGrid, PixelGridLayout, PixelGridProps, cell_states_from_image},
        plane::{Plane, PlaneProps},
    },
    pipelines,
    resources::{self, texture::load_texture},
    scene::Scene,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// One pixel grid of the grid demo, optionally painted from an image.
#[derive(Clone, Debug, PartialEq)]
pub struct GridDemo {
    pub props: PixelGridProps,
    pub image: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Demo {
    /// Randomly placed cubes tweening back and forth.
    Cubes { count: usize },
    /// A textured plane fed with time, pointer and viewport size.
    Planes { image: String },
    PixelGrids { layouts: Vec<GridDemo> },
    Model { url: String },
}

impl Demo {
    /// Two grids side by side, the left one painted from an image.
    pub fn default_grids() -> Self {
        Demo::PixelGrids {
            layouts: vec![
                GridDemo {
                    props: PixelGridProps {
                        position: [-1.2, 0.0, 0.0],
                        grid_size: 32,
                        active_color: [0.9, 0.3, 0.4, 1.0],
                        ..Default::default()
                    },
                    image: Some("images/marlene.png".into()),
                },
                GridDemo {
                    props: PixelGridProps {
                        position: [1.2, 0.0, 0.0],
                        grid_size: 16,
                        grid_space: 0.3,
                        active_color: [0.3, 0.7, 1.0, 1.0],
                        ..Default::default()
                    },
                    image: None,
                },
            ],
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlaygroundConfig {
    pub camera_position: [f32; 3],
    pub demo: Demo,
    pub engine: EngineConfig,
    /// Delay before the logical clock starts.
    pub warmup: Duration,
    /// Logical time added per frame once the clock runs.
    pub time_step: f32,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            camera_position: [0.0, 0.0, 7.0],
            demo: Demo::Planes {
                image: "images/marlene.png".into(),
            },
            engine: EngineConfig::default(),
            warmup: Duration::from_millis(300),
            time_step: 0.05,
        }
    }
}

/// Logical time that starts after a warm-up delay and then advances by a
/// fixed step on every tick, independent of the real frame time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameClock {
    warmup: Duration,
    step: f32,
    time: f32,
}

impl FrameClock {
    pub fn new(warmup: Duration, step: f32) -> Self {
        Self {
            warmup,
            step,
            time: 0.0,
        }
    }

    /// Advance given the real time since start. `None` while warming up.
    pub fn tick(&mut self, since_start: Duration) -> Option<f32> {
        if since_start < self.warmup {
            return None;
        }
        self.time += self.step;
        Some(self.time)
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn reset(&mut self) {
        self.time = 0.0;
    }
}

/// A snapshot of the playground's state for debugging.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostics {
    pub camera_position: [f32; 3],
    pub camera_kind: CameraKind,
    pub objects: usize,
    pub pending_assets: usize,
    pub frames_submitted: u64,
    pub time: f32,
}

/// Assets a demo waits for before it can finish building.
enum PendingAsset {
    PlaneTexture(LocalBoxFuture<'static, Result<Texture>>),
    GridCells {
        grid: Rc<RefCell<PixelGrid>>,
        image: LocalBoxFuture<'static, Result<image::DynamicImage>>,
    },
}

/// Seed for the cube demo so every rebuild places the cubes the same way.
const CUBE_SEED: u64 = 42;

fn random_vec3(rng: &mut impl Rng, scale: f32, offset: [f32; 3]) -> [f32; 3] {
    [
        rng.gen_range(0.0..scale) + offset[0],
        rng.gen_range(0.0..scale) + offset[1],
        rng.gen_range(0.0..scale) + offset[2],
    ]
}

fn random_transform(rng: &mut impl Rng) -> Transform {
    Transform {
        position: random_vec3(rng, 10.0, [-3.0, -3.0, 0.0]),
        rotation: random_vec3(rng, 10.0, [0.0; 3]),
        scale: random_vec3(rng, 1.0, [0.0; 3]),
    }
}

pub struct Playground {
    engine: Engine,
    demo: Demo,
    clock: FrameClock,
    started: Instant,
    plane: Option<Rc<RefCell<Plane>>>,
    grids: Option<PixelGridLayout>,
    tweens: Vec<(Tween, Rc<RefCell<Cube>>)>,
    pending: Vec<PendingAsset>,
}

impl std::fmt::Debug for Playground {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Playground")
            .field("demo", &self.demo)
            .field("diagnostics", &self.diagnostics())
            .finish()
    }
}

impl Playground {
    /// Attach a fresh scene to `engine` and build `demo` into it.
    pub fn new(mut engine: Engine, demo: Demo, warmup: Duration, time_step: f32) -> Self {
        let size = engine.size();
        engine
            .camera()
            .borrow_mut()
            .set_aspect(size[0] as f32 / size[1] as f32);
        let scene = Scene::new(engine.camera());
        engine.set_scene(scene);
        let mut playground = Self {
            engine,
            demo,
            clock: FrameClock::new(warmup, time_step),
            started: Instant::now(),
            plane: None,
            grids: None,
            tweens: Vec::new(),
            pending: Vec::new(),
        };
        playground.build_demo();
        playground
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn plane(&self) -> Option<&Rc<RefCell<Plane>>> {
        self.plane.as_ref()
    }

    pub fn grids(&self) -> Option<&PixelGridLayout> {
        self.grids.as_ref()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let camera = self.engine.camera().borrow();
        Diagnostics {
            camera_position: camera.position().into(),
            camera_kind: camera.kind(),
            objects: self.engine.scene().map_or(0, Scene::len),
            pending_assets: self.pending.len(),
            frames_submitted: self.engine.frames_submitted(),
            time: self.clock.time(),
        }
    }

    /// Replace one component of the camera position and refresh every transform.
    pub fn update_camera_axis(&mut self, axis: CameraAxis, value: f32) {
        self.engine.camera().borrow_mut().set_axis(axis, value);
        if let Some(scene) = self.engine.scene() {
            scene.update_camera_transform();
        }
    }

    /// Move the camera by `delta` along one axis.
    pub fn nudge_camera(&mut self, axis: CameraAxis, delta: f32) {
        let position = self.engine.camera().borrow().position();
        let current = match axis {
            CameraAxis::X => position.x,
            CameraAxis::Y => position.y,
            CameraAxis::Z => position.z,
        };
        self.update_camera_axis(axis, current + delta);
    }

    /// Destroy everything in the scene and build the demo again.
    pub fn rebuild_scene(&mut self) {
        for (tween, _) in self.tweens.drain(..) {
            tween.handle().kill();
        }
        self.pending.clear();
        if let Some(grids) = self.grids.take() {
            grids.destroy();
        }
        self.plane = None;
        if let Some(scene) = self.engine.scene_mut() {
            scene.clear();
        }
        self.clock.reset();
        self.started = Instant::now();
        self.build_demo();
        log::info!("scene rebuilt");
    }

    pub fn set_demo(&mut self, demo: Demo) {
        self.demo = demo;
        self.rebuild_scene();
    }

    /// Pointer position in logical pixels, written to `params[0].xy` of the plane.
    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        if let Some(plane) = &self.plane {
            plane.borrow_mut().update_props(|p| p.params[0] = [x, y, 0.0, 0.0]);
        }
    }

    pub fn resized(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.engine.resize(width, height);
        self.engine
            .camera()
            .borrow_mut()
            .set_aspect(width as f32 / height as f32);
        if let Some(scene) = self.engine.scene() {
            scene.update_camera_transform();
        }
        self.update_resolution();
    }

    fn update_resolution(&mut self) {
        let [w, h] = self.engine.size();
        if let Some(plane) = &self.plane {
            plane
                .borrow_mut()
                .update_props(|p| p.params[1] = [w as f32, h as f32, 0.0, 0.0]);
        }
    }

    /// One frame: finish loads, advance the clock and tweens, then render.
    pub fn frame(&mut self, dt: Duration) -> Result<(), wgpu::SurfaceError> {
        if let Some(scene) = self.engine.scene() {
            scene.poll_pending();
        }
        self.poll_assets();

        let dt = dt.as_secs_f32();
        self.tweens.retain(|(_, cube)| !cube.borrow().base().is_destroyed());
        for (tween, cube) in &mut self.tweens {
            if let Some(transform) = tween.advance(dt) {
                cube.borrow_mut().update_props(|p| p.transform = transform);
            }
        }

        if let Some(time) = self.clock.tick(self.started.elapsed()) {
            if let Some(scene) = self.engine.scene() {
                scene.run(time);
            }
            if let Some(plane) = &self.plane {
                plane
                    .borrow_mut()
                    .update_props(|p| p.params[0] = [time, 0.0, 0.0, 1.0]);
            }
        }

        self.engine.render()
    }

    fn build_demo(&mut self) {
        let result = match self.demo.clone() {
            Demo::Cubes { count } => self.build_cubes(count),
            Demo::Planes { image } => {
                self.build_plane(&image);
                Ok(())
            }
            Demo::PixelGrids { layouts } => self.build_grids(&layouts),
            Demo::Model { url } => self.build_model(&url),
        };
        if let Err(e) = result {
            log::error!("could not build demo: {e:#}");
        }
    }

    fn build_cubes(&mut self, count: usize) -> Result<()> {
        let ctx = self.engine.ctx().clone();
        let shader = pipelines::cube::shader(&ctx.device);
        let mut rng = StdRng::seed_from_u64(CUBE_SEED);
        let Some(scene) = self.engine.scene_mut() else {
            return Ok(());
        };
        for _ in 0..count {
            let from = random_transform(&mut rng);
            let to = random_transform(&mut rng);
            let color = [rng.r#gen(), rng.r#gen(), rng.r#gen(), 1.0];
            let cube = Rc::new(RefCell::new(Cube::new(
                &ctx,
                shader.clone(),
                CubeProps {
                    transform: from,
                    color,
                },
            )));
            scene.add(cube.clone())?;

            let tween = Tween::yoyo(from, to, 4.0);
            cube.borrow_mut().add_animation(tween.handle());
            self.tweens.push((tween, cube));
        }
        Ok(())
    }

    fn build_plane(&mut self, image: &str) {
        let ctx = self.engine.ctx().clone();
        let image = image.to_string();
        let texture = async move { load_texture(&image, &ctx.device, &ctx.queue).await };
        self.pending
            .push(PendingAsset::PlaneTexture(texture.boxed_local()));
        self.poll_assets();
    }

    fn add_plane(&mut self, texture: Option<Texture>) {
        let ctx = self.engine.ctx().clone();
        let shader = pipelines::plane::shader(&ctx.device);
        let props = PlaneProps {
            transform: Transform {
                scale: [2.0, 2.0, 1.0],
                ..Default::default()
            },
            use_texture: texture.is_some(),
            ..Default::default()
        };
        let plane = Rc::new(RefCell::new(Plane::new(&ctx, shader, texture, props)));
        let Some(scene) = self.engine.scene_mut() else {
            return;
        };
        if let Err(e) = scene.add(plane.clone()) {
            log::error!("could not add the plane: {e:#}");
            return;
        }
        self.plane = Some(plane);
        self.update_resolution();
    }

    fn build_grids(&mut self, layouts: &[GridDemo]) -> Result<()> {
        let ctx = self.engine.ctx().clone();
        let shader = pipelines::pixel_grid::shader(&ctx.device);
        let props: Vec<_> = layouts.iter().map(|l| l.props.clone()).collect();
        let layout = PixelGridLayout::new(&ctx, &shader, &props);
        if let Some(scene) = self.engine.scene_mut() {
            layout.add_to(scene)?;
        }
        for (grid, demo) in layout.grids().iter().zip(layouts) {
            if let Some(path) = &demo.image {
                let path = path.clone();
                let image = async move {
                    let bytes = resources::load_binary(&path).await?;
                    let hint = std::path::Path::new(&path)
                        .extension()
                        .and_then(|e| e.to_str());
                    crate::data_structures::texture::decode_image(&bytes, hint)
                };
                self.pending.push(PendingAsset::GridCells {
                    grid: grid.clone(),
                    image: image.boxed_local(),
                });
            }
        }
        self.grids = Some(layout);
        self.poll_assets();
        Ok(())
    }

    fn build_model(&mut self, url: &str) -> Result<()> {
        let ctx = self.engine.ctx().clone();
        let shader = pipelines::model::shader(&ctx.device);
        let model = Rc::new(RefCell::new(ModelInstance::new(
            &ctx,
            shader,
            url,
            ModelProps::default(),
        )));
        match self.engine.scene_mut() {
            Some(scene) => scene.add(model),
            None => Ok(()),
        }
    }

    /// Finish whatever asset loads are ready. Failed image loads leave the
    /// plane on its white texture and the grid fully lit.
    fn poll_assets(&mut self) {
        let mut cx = std::task::Context::from_waker(futures::task::noop_waker_ref());
        let mut still_pending = Vec::new();
        let mut plane_texture = None;
        for asset in std::mem::take(&mut self.pending) {
            match asset {
                PendingAsset::PlaneTexture(mut future) => match future.poll_unpin(&mut cx) {
                    std::task::Poll::Pending => still_pending.push(PendingAsset::PlaneTexture(future)),
                    std::task::Poll::Ready(result) => plane_texture = Some(result),
                },
                PendingAsset::GridCells { grid, mut image } => match image.poll_unpin(&mut cx) {
                    std::task::Poll::Pending => {
                        still_pending.push(PendingAsset::GridCells { grid, image });
                    }
                    std::task::Poll::Ready(Ok(image)) => {
                        let mut grid = grid.borrow_mut();
                        let cells = cell_states_from_image(&image, grid.props().grid_size);
                        if let Err(e) = grid.set_cell_states(&cells) {
                            log::warn!("could not paint the grid: {e:#}");
                        }
                    }
                    std::task::Poll::Ready(Err(e)) => {
                        log::warn!("grid image could not be loaded, keeping all cells lit: {e:#}");
                    }
                },
            }
        }
        self.pending = still_pending;

        match plane_texture {
            Some(Ok(texture)) => self.add_plane(Some(texture)),
            Some(Err(e)) => {
                log::warn!("plane image could not be loaded, using a white texture: {e:#}");
                self.add_plane(None);
            }
            None => {}
        }
    }
}

pub(crate) enum PlaygroundEvent {
    Initialized(Box<Engine>),
}

struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: winit::event_loop::EventLoopProxy<PlaygroundEvent>,
    config: PlaygroundConfig,
    started: bool,
    playground: Option<Playground>,
    last_time: Instant,
}

impl App {
    fn new(event_loop: &EventLoop<PlaygroundEvent>, config: PlaygroundConfig) -> Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            config,
            started: false,
            playground: None,
            last_time: Instant::now(),
        })
    }

    fn start(&mut self, engine: Engine) {
        let config = &self.config;
        let playground = Playground::new(engine, config.demo.clone(), config.warmup, config.time_step);
        if let Some(window) = playground.engine().window() {
            window.request_redraw();
        }
        self.last_time = Instant::now();
        self.playground = Some(playground);
    }
}

/// Acquiring a GPU is the one failure the playground cannot recover from.
async fn init_engine(window: Arc<Window>, camera_position: [f32; 3], config: EngineConfig) -> Engine {
    match Engine::new(window, camera_position, config).await {
        Ok(engine) => engine,
        Err(e) => panic!("Playground initialization failed. Cannot acquire the GPU: {e}"),
    }
}

impl ApplicationHandler<PlaygroundEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.started {
            return;
        }
        self.started = true;

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("gpulab");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("cannot create a window: {e}");
                event_loop.exit();
                return;
            }
        };
        let init_future = init_engine(window, self.config.camera_position, self.config.engine);

        #[cfg(not(target_arch = "wasm32"))]
        {
            let engine = self.async_runtime.block_on(init_future);
            if self
                .proxy
                .send_event(PlaygroundEvent::Initialized(Box::new(engine)))
                .is_err()
            {
                log::error!("event loop closed before the engine was ready");
                event_loop.exit();
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let engine = init_future.await;
                assert!(
                    proxy
                        .send_event(PlaygroundEvent::Initialized(Box::new(engine)))
                        .is_ok()
                );
            });
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: PlaygroundEvent) {
        match event {
            PlaygroundEvent::Initialized(engine) => {
                // The canvas may have been resized while the GPU was requested.
                let size = engine.window().map(|w| w.inner_size());
                self.start(*engine);
                if let (Some(size), Some(playground)) = (size, self.playground.as_mut()) {
                    playground.resized(size.width, size.height);
                }
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let playground = match &mut self.playground {
            Some(playground) => playground,
            None => return,
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => playground.resized(size.width, size.height),
            WindowEvent::CursorMoved { position, .. } => {
                let scale = playground
                    .engine()
                    .window()
                    .map_or(1.0, |w| w.scale_factor());
                let logical = position.to_logical::<f32>(scale);
                playground.pointer_moved(logical.x, logical.y);
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() => {
                match event.logical_key.as_ref() {
                    Key::Named(NamedKey::ArrowLeft) => playground.nudge_camera(CameraAxis::X, -0.5),
                    Key::Named(NamedKey::ArrowRight) => playground.nudge_camera(CameraAxis::X, 0.5),
                    Key::Named(NamedKey::ArrowUp) => playground.nudge_camera(CameraAxis::Y, 0.5),
                    Key::Named(NamedKey::ArrowDown) => playground.nudge_camera(CameraAxis::Y, -0.5),
                    Key::Named(NamedKey::PageUp) => playground.nudge_camera(CameraAxis::Z, -0.5),
                    Key::Named(NamedKey::PageDown) => playground.nudge_camera(CameraAxis::Z, 0.5),
                    Key::Character(c) if c.eq_ignore_ascii_case("r") => playground.rebuild_scene(),
                    Key::Character(c) if c.eq_ignore_ascii_case("d") => {
                        log::info!("{:?}", playground.diagnostics());
                    }
                    _ => {}
                }
            }
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();

                match playground.frame(dt) {
                    Ok(()) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        if let Some(size) = playground.engine().window().map(|w| w.inner_size()) {
                            playground.resized(size.width, size.height);
                        }
                    }
                    Err(e) => log::error!("Unable to render {e}"),
                }
                if let Some(window) = playground.engine().window() {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

/// Open a window and run the playground until it is closed.
pub fn run(config: PlaygroundConfig) -> Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {e}");
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    let event_loop: EventLoop<PlaygroundEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config)?;
    event_loop.run_app(&mut app)?;

    Ok(())
}
