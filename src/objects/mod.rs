//! Renderables and the contract they share.
//!
//! Every renderable goes through the same lifecycle:
//!
//! ```text
//! Uninitialized --init--> (Loading -->) Ready --destroy--> Destroyed
//!                              \--> Failed
//! ```
//!
//! While `Ready`, camera-transform refreshes, time updates and draws may be
//! issued in any order and at any frequency. In every other state they are
//! no-ops, which makes it safe for a [`Scene`](crate::scene::Scene) to fan
//! out to objects whose initialization is still in flight. `destroy` can be
//! called in any state, any number of times.
//!
//! - `cube` is a coloured, lit cube
//! - `plane` is a textured quad with free-form shader parameters
//! - `pixel_grid` draws a square grid of cells from a state buffer
//! - `model` places a glTF model, loaded asynchronously

use std::{
    cell::RefCell,
    future::poll_fn,
    rc::Rc,
    task::{Context, Poll},
};

use crate::{
    animation::{AnimationHandle, Animations},
    camera::SharedCamera,
    context::InitContext,
    matrix::{self, Mat4},
    render::PassEncoder,
};

pub mod cube;
pub mod model;
pub mod pixel_grid;
pub mod plane;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Loading,
    Ready,
    Failed,
    Destroyed,
}

/// A renderable shared between a scene and whoever created it.
pub type ObjectHandle = Rc<RefCell<dyn Object3D>>;

pub trait Object3D {
    /// Allocate GPU resources and build the pipeline. Renderables that load
    /// external data start the load here and finish it in [`poll_init`](Self::poll_init).
    fn init(&mut self) -> anyhow::Result<()>;

    /// Drive an in-flight initialization. Synchronous renderables are always done.
    fn poll_init(&mut self, _cx: &mut Context<'_>) -> Poll<anyhow::Result<()>> {
        Poll::Ready(Ok(()))
    }

    /// Recompute matrices from the current properties and camera and write them to the GPU.
    fn update_camera_transform(&mut self);

    /// Per-frame time hook. Most renderables ignore it.
    fn run(&mut self, _time: f32) {}

    fn render(&self, pass: &mut dyn PassEncoder);

    /// Release every owned GPU resource, detach the camera and kill attached
    /// animations. Idempotent.
    fn destroy(&mut self);

    fn lifecycle(&self) -> Lifecycle;

    /// The camera-binding capability, for renderables that read the camera.
    fn camera_user(&mut self) -> Option<&mut dyn UsesCamera> {
        None
    }
}

pub trait UsesCamera {
    fn set_camera(&mut self, camera: SharedCamera);
}

/// Wait until `object` has finished initializing.
pub async fn ready<T: Object3D + ?Sized>(object: &RefCell<T>) -> anyhow::Result<()> {
    poll_fn(|cx| object.borrow_mut().poll_init(cx)).await
}

/// Wrap a renderable into a handle a scene can hold.
pub fn handle<T: Object3D + 'static>(object: T) -> Rc<RefCell<T>> {
    Rc::new(RefCell::new(object))
}

/// State every renderable carries: its GPU context, the bound camera, where it
/// is in its lifecycle and the animations that target it.
#[derive(Debug)]
pub struct ObjectBase {
    ctx: InitContext,
    camera: Option<SharedCamera>,
    lifecycle: Lifecycle,
    animations: Animations,
}

impl ObjectBase {
    pub fn new(ctx: &InitContext) -> Self {
        Self {
            ctx: ctx.clone(),
            camera: None,
            lifecycle: Lifecycle::Uninitialized,
            animations: Animations::default(),
        }
    }

    pub fn ctx(&self) -> &InitContext {
        &self.ctx
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.ctx.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.ctx.queue
    }

    pub fn write_buffer(&self, buffer: &wgpu::Buffer, offset: wgpu::BufferAddress, data: &[u8]) {
        self.ctx.writer.write_buffer(buffer, offset, data);
    }

    pub fn set_camera(&mut self, camera: SharedCamera) {
        self.camera = Some(camera);
    }

    pub fn camera(&self) -> Option<&SharedCamera> {
        self.camera.as_ref()
    }

    /// View and projection of the bound camera, identity without one.
    pub fn view_proj(&self) -> (Mat4, Mat4) {
        match &self.camera {
            Some(camera) => {
                let camera = camera.borrow();
                (camera.view_matrix(), camera.projection_matrix())
            }
            None => (matrix::identity(), matrix::identity()),
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.lifecycle = lifecycle;
    }

    pub fn is_ready(&self) -> bool {
        self.lifecycle == Lifecycle::Ready
    }

    pub fn is_destroyed(&self) -> bool {
        self.lifecycle == Lifecycle::Destroyed
    }

    /// Attach an animation. Animations attached after destruction are killed at once.
    pub fn add_animation(&mut self, handle: AnimationHandle) {
        if self.is_destroyed() {
            handle.kill();
            return;
        }
        self.animations.add(handle);
    }

    pub fn animations(&self) -> &Animations {
        &self.animations
    }

    /// Enter the terminal state: kill animations and drop the camera.
    /// Returns `false` when already destroyed, so resources are released once.
    pub fn begin_destroy(&mut self) -> bool {
        if self.is_destroyed() {
            return false;
        }
        self.lifecycle = Lifecycle::Destroyed;
        self.animations.kill_all();
        self.camera = None;
        true
    }

    /// Guard for `init`: `Ok(false)` when there is nothing left to do.
    pub(crate) fn begin_init(&self, what: &str) -> anyhow::Result<bool> {
        match self.lifecycle {
            Lifecycle::Uninitialized => Ok(true),
            Lifecycle::Destroyed => Err(anyhow::anyhow!("cannot initialize a destroyed {what}")),
            Lifecycle::Loading | Lifecycle::Ready | Lifecycle::Failed => Ok(false),
        }
    }
}
