mod common;

use common::test_utils::noop_engine;
use gpulab::{
    app::{Demo, Playground},
    camera::CameraAxis,
    objects::{Lifecycle, Object3D},
};
use instant::Duration;

fn playground(demo: Demo) -> Playground {
    Playground::new(noop_engine([400, 300]), demo, Duration::ZERO, 0.05)
}

#[test]
fn missing_plane_image_falls_back_to_white() {
    let playground = playground(Demo::Planes {
        image: "images/does-not-exist.png".into(),
    });
    let plane = playground.plane().expect("plane added after the failed load");
    assert!(!plane.borrow().props().use_texture);
    assert_eq!(plane.borrow().lifecycle(), Lifecycle::Ready);
    assert_eq!(plane.borrow().props().params[1], [400.0, 300.0, 0.0, 0.0]);
    assert_eq!(playground.diagnostics().pending_assets, 0);
}

#[test]
fn pointer_and_time_share_the_first_slot() {
    let mut playground = playground(Demo::Planes {
        image: "images/does-not-exist.png".into(),
    });
    playground.pointer_moved(10.0, 20.0);
    let params = playground.plane().unwrap().borrow().props().params[0];
    assert_eq!(params, [10.0, 20.0, 0.0, 0.0]);

    playground.frame(Duration::from_millis(16)).unwrap();
    let params = playground.plane().unwrap().borrow().props().params[0];
    assert!((params[0] - 0.05).abs() < 1e-6);
    assert_eq!(params[3], 1.0);
    assert_eq!(playground.diagnostics().frames_submitted, 1);
}

#[test]
fn resize_updates_engine_camera_and_plane() {
    let mut playground = playground(Demo::Planes {
        image: "images/does-not-exist.png".into(),
    });
    playground.resized(200, 100);
    assert_eq!(playground.engine().size(), [200, 100]);
    assert!((playground.engine().camera().borrow().aspect() - 2.0).abs() < 1e-6);
    let resolution = playground.plane().unwrap().borrow().props().params[1];
    assert_eq!(resolution, [200.0, 100.0, 0.0, 0.0]);
}

#[test]
fn cubes_demo_and_rebuild() {
    let mut playground = playground(Demo::Cubes { count: 12 });
    assert_eq!(playground.diagnostics().objects, 12);

    let first = playground.engine().scene().unwrap().objects()[0].clone();
    playground.frame(Duration::from_millis(500)).unwrap();

    playground.rebuild_scene();
    assert_eq!(playground.diagnostics().objects, 12);
    assert_eq!(first.borrow().lifecycle(), Lifecycle::Destroyed);
    assert_eq!(playground.diagnostics().time, 0.0);
}

#[test]
fn camera_axis_moves_the_camera() {
    let mut playground = playground(Demo::Cubes { count: 1 });
    playground.update_camera_axis(CameraAxis::Z, 3.0);
    playground.nudge_camera(CameraAxis::X, 0.5);
    assert_eq!(playground.diagnostics().camera_position, [0.5, 0.0, 3.0]);
}

#[test]
fn grids_without_image_stay_lit() {
    let playground = playground(Demo::default_grids());
    let grids = playground.grids().unwrap();
    assert_eq!(grids.len(), 2);
    let first = grids.grid(0).unwrap().borrow();
    assert!(first.cell_states().iter().all(|&c| c == 1));
    assert_eq!(playground.diagnostics().objects, 2);
}

#[test]
fn missing_model_is_kept_but_failed() {
    let mut playground = playground(Demo::Model {
        url: "models/missing.glb".into(),
    });
    let scene = playground.engine().scene().unwrap();
    assert_eq!(scene.len(), 1);
    assert_eq!(scene.objects()[0].borrow().lifecycle(), Lifecycle::Failed);
    playground.frame(Duration::from_millis(16)).unwrap();
}
