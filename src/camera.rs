//! Camera state and view/projection matrices.
//!
//! The camera stores only its parameters. View and projection matrices are
//! derived on every call, so a mutation is visible to the next reader without
//! any explicit refresh on the camera itself. Renderables that cache matrices
//! in uniform buffers must be told to refresh via
//! [`Scene::update_camera_transform`](crate::scene::Scene::update_camera_transform).

use std::{cell::RefCell, f32::consts::FRAC_PI_4, rc::Rc};

use cgmath::{Matrix4, Point3, Rad, Vector3};

/// Maps OpenGL clip space (z in -1..1) onto wgpu clip space (z in 0..1).
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// The camera is owned by the engine and shared with every renderable that reads it.
pub type SharedCamera = Rc<RefCell<Camera>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraKind {
    Perspective,
    Orthographic,
}

/// One component of the camera position, as driven by a control surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraAxis {
    X,
    Y,
    Z,
}

#[derive(Clone, Debug)]
pub struct CameraOptions {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub kind: CameraKind,
    pub fov: Rad<f32>,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    /// Half-height of the orthographic box.
    pub ortho_size: f32,
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            position: Point3::new(5.0, 5.0, 20.0),
            target: Point3::new(0.0, 0.0, 0.0),
            up: Vector3::unit_y(),
            kind: CameraKind::Perspective,
            fov: Rad(FRAC_PI_4),
            aspect: 1.0,
            near: 0.1,
            far: 100.0,
            ortho_size: 10.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Camera {
    position: Point3<f32>,
    target: Point3<f32>,
    up: Vector3<f32>,
    kind: CameraKind,
    fov: Rad<f32>,
    aspect: f32,
    near: f32,
    far: f32,
    ortho_size: f32,
}

impl Camera {
    pub fn new(options: CameraOptions) -> Self {
        let CameraOptions {
            position,
            target,
            up,
            kind,
            fov,
            aspect,
            near,
            far,
            ortho_size,
        } = options;
        Self {
            position,
            target,
            up,
            kind,
            fov,
            aspect,
            near,
            far,
            ortho_size,
        }
    }

    pub fn shared(self) -> SharedCamera {
        Rc::new(RefCell::new(self))
    }

    pub fn set_position<P: Into<Point3<f32>>>(&mut self, position: P) {
        self.position = position.into();
    }

    pub fn set_target<P: Into<Point3<f32>>>(&mut self, target: P) {
        self.target = target.into();
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    pub fn set_ortho_size(&mut self, size: f32) {
        self.ortho_size = size;
    }

    pub fn set_kind(&mut self, kind: CameraKind) {
        self.kind = kind;
    }

    /// Replace a single component of the position, keeping the other two.
    pub fn set_axis(&mut self, axis: CameraAxis, value: f32) {
        match axis {
            CameraAxis::X => self.position.x = value,
            CameraAxis::Y => self.position.y = value,
            CameraAxis::Z => self.position.z = value,
        }
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn target(&self) -> Point3<f32> {
        self.target
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn ortho_size(&self) -> f32 {
        self.ortho_size
    }

    pub fn kind(&self) -> CameraKind {
        self.kind
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    /// Perspective from fov/aspect/near/far, or an orthographic box of
    /// `ortho_size * aspect` by `ortho_size` half-extents.
    ///
    /// Degenerate parameters (zero aspect, `near >= far`) are not rejected and
    /// simply produce a degenerate matrix.
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        let proj = match self.kind {
            CameraKind::Perspective => perspective(self.fov, self.aspect, self.near, self.far),
            CameraKind::Orthographic => {
                let half_h = self.ortho_size;
                let half_w = self.ortho_size * self.aspect;
                cgmath::ortho(-half_w, half_w, -half_h, half_h, self.near, self.far)
            }
        };
        OPENGL_TO_WGPU_MATRIX * proj
    }
}

// Same matrix as `cgmath::perspective`, which asserts on degenerate input.
fn perspective(fovy: Rad<f32>, aspect: f32, near: f32, far: f32) -> Matrix4<f32> {
    let f = 1.0 / (fovy.0 / 2.0).tan();
    let depth = near - far;
    #[rustfmt::skip]
    let m = Matrix4::new(
        f / aspect, 0.0, 0.0, 0.0,
        0.0, f, 0.0, 0.0,
        0.0, 0.0, (far + near) / depth, -1.0,
        0.0, 0.0, (2.0 * far * near) / depth, 0.0,
    );
    m
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(CameraOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use cgmath::vec4;

    use super::*;
    use crate::matrix::{assert_mat_eq, translation_matrix};

    fn camera_at(position: [f32; 3]) -> Camera {
        Camera::new(CameraOptions {
            position: position.into(),
            ..Default::default()
        })
    }

    #[test]
    fn view_looks_down_negative_z() {
        let camera = camera_at([0.0, 0.0, 5.0]);
        assert_mat_eq(&camera.view_matrix(), &translation_matrix([0.0, 0.0, -5.0]));
    }

    #[test]
    fn orthographic_box_bounds() {
        let mut camera = camera_at([0.0, 0.0, 5.0]);
        camera.set_kind(CameraKind::Orthographic);
        camera.set_ortho_size(10.0);
        camera.set_aspect(1.0);
        let proj = camera.projection_matrix();
        assert!((proj.x.x - 0.1).abs() < 1e-6);
        assert!((proj.y.y - 0.1).abs() < 1e-6);

        let corner = proj * vec4(10.0, -10.0, -1.0, 1.0);
        assert!((corner.x / corner.w - 1.0).abs() < 1e-5);
        assert!((corner.y / corner.w + 1.0).abs() < 1e-5);
    }

    #[test]
    fn orthographic_width_follows_aspect() {
        let mut camera = Camera::default();
        camera.set_kind(CameraKind::Orthographic);
        camera.set_aspect(2.0);
        let proj = camera.projection_matrix();
        assert!((proj.x.x - 1.0 / 20.0).abs() < 1e-6);
        assert!((proj.y.y - 1.0 / 10.0).abs() < 1e-6);
    }

    #[test]
    fn perspective_depth_maps_to_wgpu_range() {
        let camera = Camera::default();
        let proj = camera.projection_matrix();
        let near = proj * vec4(0.0, 0.0, -0.1, 1.0);
        let far = proj * vec4(0.0, 0.0, -100.0, 1.0);
        assert!((near.z / near.w).abs() < 1e-4);
        assert!((far.z / far.w - 1.0).abs() < 1e-4);
    }

    #[test]
    fn matrices_are_derived_on_read() {
        let mut camera = camera_at([0.0, 0.0, 5.0]);
        let before = camera.view_matrix();
        camera.set_axis(CameraAxis::Z, 9.0);
        assert_eq!(camera.position(), Point3::new(0.0, 0.0, 9.0));
        assert_ne!(before, camera.view_matrix());
    }

    #[test]
    fn perspective_matches_cgmath() {
        let expected = cgmath::perspective(Rad(0.8), 1.5, 0.1, 50.0);
        assert_mat_eq(&perspective(Rad(0.8), 1.5, 0.1, 50.0), &expected);
    }

    #[test]
    fn zero_aspect_does_not_panic() {
        let mut camera = Camera::default();
        camera.set_aspect(0.0);
        let _ = camera.projection_matrix();
    }
}
