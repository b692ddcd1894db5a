//! An ordered collection of renderables sharing one camera.
//!
//! The scene does not own the camera: it keeps a weak reference to the
//! engine's camera and binds it to every renderable that asks for one when
//! the renderable is added. Updates and draws fan out in insertion order.
//! There is no sorting, batching or culling.

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
    task::{Context, Poll},
};

use anyhow::Result;

use crate::{
    camera::{Camera, SharedCamera},
    objects::{Lifecycle, Object3D, ObjectHandle},
    render::PassEncoder,
};

#[derive(Default)]
pub struct Scene {
    objects: Vec<ObjectHandle>,
    camera: Weak<RefCell<Camera>>,
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("objects", &self.objects.len())
            .field("camera", &self.camera.upgrade().is_some())
            .finish()
    }
}

impl Scene {
    pub fn new(camera: &SharedCamera) -> Self {
        Self {
            objects: Vec::new(),
            camera: Rc::downgrade(camera),
        }
    }

    /// Bind the camera, append the renderable and start its initialization.
    ///
    /// The renderable stays in the scene even if `init` fails; it then never
    /// draws. Renderables that load asynchronously are still loading when
    /// this returns, see [`poll_pending`](Self::poll_pending).
    pub fn add(&mut self, object: ObjectHandle) -> Result<()> {
        {
            let mut obj = object.borrow_mut();
            match (obj.camera_user(), self.camera.upgrade()) {
                (Some(user), Some(camera)) => user.set_camera(camera),
                (Some(_), None) => log::warn!("the scene's camera is gone, renderable added without one"),
                (None, _) => {}
            }
        }
        self.objects.push(object.clone());
        object.borrow_mut().init()
    }

    /// Remove a renderable by identity. It is not destroyed.
    pub fn remove<T: Object3D + ?Sized>(&mut self, object: &Rc<RefCell<T>>) -> bool {
        let before = self.objects.len();
        self.objects
            .retain(|o| !std::ptr::addr_eq(Rc::as_ptr(o), Rc::as_ptr(object)));
        self.objects.len() != before
    }

    /// Destroy every renderable and empty the scene.
    pub fn clear(&mut self) {
        for object in self.objects.drain(..) {
            object.borrow_mut().destroy();
        }
        log::debug!("scene cleared");
    }

    pub fn update_camera_transform(&self) {
        for object in &self.objects {
            object.borrow_mut().update_camera_transform();
        }
    }

    pub fn run(&self, time: f32) {
        for object in &self.objects {
            object.borrow_mut().run(time);
        }
    }

    pub fn render(&self, pass: &mut dyn PassEncoder) {
        for object in &self.objects {
            object.borrow().render(pass);
        }
    }

    /// Drive renderables whose initialization is still in flight. Failures
    /// are logged and returned; the failed renderables stay in the scene and
    /// draw nothing. Renderables that just became ready get their transforms
    /// refreshed.
    pub fn poll_pending(&self) -> Vec<anyhow::Error> {
        let mut cx = Context::from_waker(futures::task::noop_waker_ref());
        let mut errors = Vec::new();
        for object in &self.objects {
            let mut obj = object.borrow_mut();
            if obj.lifecycle() != Lifecycle::Loading {
                continue;
            }
            match obj.poll_init(&mut cx) {
                Poll::Pending => {}
                Poll::Ready(Ok(())) => obj.update_camera_transform(),
                Poll::Ready(Err(e)) => {
                    log::error!("renderable failed to initialize: {e:#}");
                    errors.push(e);
                }
            }
        }
        errors
    }

    pub fn objects(&self) -> &[ObjectHandle] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
