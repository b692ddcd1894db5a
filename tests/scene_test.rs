mod common;

use common::test_utils::{camera_at, noop_ctx, shared};
use gpulab::{
    matrix,
    objects::{
        Lifecycle, Object3D,
        cube::{Cube, CubeProps},
        pixel_grid::{PixelGrid, PixelGridProps},
        plane::{Plane, PlaneProps},
    },
    pipelines,
    render::{DrawCall, DrawRecorder},
    scene::Scene,
};

#[test]
fn draws_follow_insertion_order() {
    let ctx = noop_ctx();
    let camera = camera_at([0.0, 0.0, 7.0]);
    let mut scene = Scene::new(&camera);

    let cube = shared(Cube::new(&ctx, pipelines::cube::shader(&ctx.device), CubeProps::default()));
    let plane = shared(Plane::new(
        &ctx,
        pipelines::plane::shader(&ctx.device),
        None,
        PlaneProps::default(),
    ));
    let grid = shared(PixelGrid::new(
        &ctx,
        pipelines::pixel_grid::shader(&ctx.device),
        PixelGridProps {
            grid_size: 8,
            ..Default::default()
        },
    ));
    scene.add(cube.clone()).unwrap();
    scene.add(plane.clone()).unwrap();
    scene.add(grid.clone()).unwrap();
    assert_eq!(scene.len(), 3);

    let mut recorder = DrawRecorder::new();
    scene.render(&mut recorder);
    assert_eq!(
        recorder.calls(),
        &[
            DrawCall::DrawIndexed {
                indices: 0..36,
                instances: 0..1
            },
            DrawCall::DrawIndexed {
                indices: 0..6,
                instances: 0..1
            },
            DrawCall::Draw {
                vertices: 0..6,
                instances: 0..64
            },
        ]
    );
    assert_eq!(recorder.pipelines_set(), 3);
}

#[test]
fn added_objects_read_the_scene_camera() {
    let ctx = noop_ctx();
    let camera = camera_at([0.0, 0.0, 7.0]);
    let mut scene = Scene::new(&camera);
    let cube = shared(Cube::new(&ctx, pipelines::cube::shader(&ctx.device), CubeProps::default()));
    scene.add(cube.clone()).unwrap();

    let view = camera.borrow().view_matrix();
    assert_eq!(cube.borrow().uniform().view, matrix::to_cols(&view));

    camera.borrow_mut().set_position([0.0, 3.0, 7.0]);
    scene.update_camera_transform();
    let view = camera.borrow().view_matrix();
    assert_eq!(cube.borrow().uniform().view, matrix::to_cols(&view));
}

#[test]
fn remove_by_identity_keeps_the_object_alive() {
    let ctx = noop_ctx();
    let camera = camera_at([0.0, 0.0, 7.0]);
    let mut scene = Scene::new(&camera);
    let shader = pipelines::cube::shader(&ctx.device);
    let first = shared(Cube::new(&ctx, shader.clone(), CubeProps::default()));
    let second = shared(Cube::new(&ctx, shader, CubeProps::default()));
    scene.add(first.clone()).unwrap();
    scene.add(second.clone()).unwrap();

    assert!(scene.remove(&first));
    assert!(!scene.remove(&first));
    assert_eq!(scene.len(), 1);
    assert_eq!(first.borrow().lifecycle(), Lifecycle::Ready);

    let mut recorder = DrawRecorder::new();
    scene.render(&mut recorder);
    assert_eq!(recorder.calls().len(), 1);
}

#[test]
fn clear_destroys_everything() {
    let ctx = noop_ctx();
    let camera = camera_at([0.0, 0.0, 7.0]);
    let mut scene = Scene::new(&camera);
    let cube = shared(Cube::new(&ctx, pipelines::cube::shader(&ctx.device), CubeProps::default()));
    let plane = shared(Plane::new(
        &ctx,
        pipelines::plane::shader(&ctx.device),
        None,
        PlaneProps::default(),
    ));
    scene.add(cube.clone()).unwrap();
    scene.add(plane.clone()).unwrap();

    scene.clear();
    assert!(scene.is_empty());
    assert_eq!(cube.borrow().lifecycle(), Lifecycle::Destroyed);
    assert_eq!(plane.borrow().lifecycle(), Lifecycle::Destroyed);

    let mut recorder = DrawRecorder::new();
    cube.borrow().render(&mut recorder);
    assert!(recorder.calls().is_empty());
}

#[test]
fn time_reaches_every_grid() {
    let ctx = noop_ctx();
    let camera = camera_at([0.0, 0.0, 7.0]);
    let mut scene = Scene::new(&camera);
    let shader = pipelines::pixel_grid::shader(&ctx.device);
    let grids: Vec<_> = (0..2)
        .map(|_| shared(PixelGrid::new(&ctx, shader.clone(), PixelGridProps::default())))
        .collect();
    for grid in &grids {
        scene.add(grid.clone()).unwrap();
    }

    scene.run(1.5);
    for grid in &grids {
        assert_eq!(grid.borrow().time(), 1.5);
    }
}

#[test]
fn nothing_is_pending_for_synchronous_objects() {
    let ctx = noop_ctx();
    let camera = camera_at([0.0, 0.0, 7.0]);
    let mut scene = Scene::new(&camera);
    scene
        .add(shared(Cube::new(&ctx, pipelines::cube::shader(&ctx.device), CubeProps::default())))
        .unwrap();
    assert!(scene.poll_pending().is_empty());
}
