mod common;

use common::test_utils::{camera_at, noop_ctx, png, shared, triangle_glb};
use gpulab::{
    data_structures::transform::Transform,
    matrix,
    objects::{
        self, Lifecycle, Object3D,
        model::{ModelInstance, ModelProps},
    },
    pipelines,
    render::{DrawCall, DrawRecorder},
    resources::AssetError,
    scene::Scene,
};

fn model_from(bytes: Vec<u8>) -> ModelInstance {
    let ctx = noop_ctx();
    ModelInstance::from_bytes(&ctx, pipelines::model::shader(&ctx.device), bytes, ModelProps::default())
}

#[test]
fn embedded_model_is_ready_after_init() {
    let mut model = model_from(triangle_glb(true, None));
    model.init().unwrap();
    assert_eq!(model.lifecycle(), Lifecycle::Ready);
    assert_eq!(model.mesh_names(), vec!["tri#0"]);
    futures::executor::block_on(objects::ready(&std::cell::RefCell::new(model))).unwrap();
}

#[test]
fn sub_meshes_carry_their_node_transform() {
    let camera = camera_at([0.0, 0.0, 7.0]);
    let mut scene = Scene::new(&camera);
    let model = shared(model_from(triangle_glb(true, None)));
    scene.add(model.clone()).unwrap();

    let uniforms = model.borrow().mesh_uniforms();
    assert_eq!(uniforms.len(), 1);
    assert_eq!(uniforms[0].model[3], [1.0, 2.0, 3.0, 1.0]);
    assert_eq!(uniforms[0].view, matrix::to_cols(&camera.borrow().view_matrix()));

    model
        .borrow_mut()
        .update_props(|p| p.transform = Transform::at([10.0, 0.0, 0.0]));
    let uniforms = model.borrow().mesh_uniforms();
    assert_eq!(uniforms[0].model[3], [11.0, 2.0, 3.0, 1.0]);

    let mut recorder = DrawRecorder::new();
    scene.render(&mut recorder);
    assert_eq!(
        recorder.calls(),
        &[DrawCall::DrawIndexed {
            indices: 0..3,
            instances: 0..1
        }]
    );
}

#[test]
fn primitive_without_indices_is_skipped() {
    let mut model = model_from(triangle_glb(false, None));
    model.init().unwrap();
    assert_eq!(model.lifecycle(), Lifecycle::Ready);
    assert_eq!(model.mesh_count(), 0);

    let mut recorder = DrawRecorder::new();
    model.render(&mut recorder);
    assert!(recorder.calls().is_empty());
    assert_eq!(recorder.pipelines_set(), 0);
}

#[test]
fn undecodable_texture_falls_back_to_white() {
    let mut model = model_from(triangle_glb(true, Some(b"definitely not a png")));
    model.init().unwrap();
    assert_eq!(model.mesh_count(), 1);
    assert_eq!(model.meshes_with_default_texture(), 1);
    assert_eq!(model.cached_textures(), 0);
}

#[test]
fn embedded_texture_is_cached() {
    let image = png([255, 0, 0, 255]);
    let mut model = model_from(triangle_glb(true, Some(&image)));
    model.init().unwrap();
    assert_eq!(model.meshes_with_default_texture(), 0);
    assert_eq!(model.cached_textures(), 1);
}

#[test]
fn document_without_scene_fails() {
    let mut model = model_from(br#"{ "asset": { "version": "2.0" } }"#.to_vec());
    let err = model.init().unwrap_err();
    assert!(matches!(err.downcast_ref::<AssetError>(), Some(AssetError::NoScene)));
    assert_eq!(model.lifecycle(), Lifecycle::Failed);

    let mut recorder = DrawRecorder::new();
    model.render(&mut recorder);
    assert!(recorder.calls().is_empty());
}

#[test]
fn document_without_meshes_fails() {
    let json = br#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "name": "empty" }]
    }"#;
    let mut model = model_from(json.to_vec());
    let err = model.init().unwrap_err();
    assert!(matches!(err.downcast_ref::<AssetError>(), Some(AssetError::NoMeshes)));
}

#[test]
fn failed_models_stay_in_the_scene() {
    let camera = camera_at([0.0, 0.0, 7.0]);
    let mut scene = Scene::new(&camera);
    let model = shared(model_from(b"garbage".to_vec()));
    assert!(scene.add(model.clone()).is_err());
    assert_eq!(scene.len(), 1);
    assert_eq!(model.borrow().lifecycle(), Lifecycle::Failed);
    assert!(scene.poll_pending().is_empty());
}

#[test]
fn unsupported_extension_is_rejected() {
    let ctx = noop_ctx();
    let mut model = ModelInstance::new(
        &ctx,
        pipelines::model::shader(&ctx.device),
        "rock.obj",
        ModelProps::default(),
    );
    let err = model.init().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AssetError>(),
        Some(AssetError::UnsupportedFormat(_))
    ));
}

#[test]
fn destroying_a_model_twice_is_harmless() {
    let mut model = model_from(triangle_glb(true, None));
    model.init().unwrap();
    model.destroy();
    model.destroy();
    assert_eq!(model.lifecycle(), Lifecycle::Destroyed);
    assert_eq!(model.mesh_count(), 0);
}

#[test]
fn destroying_a_loading_model_drops_the_load() {
    let ctx = noop_ctx();
    let camera = camera_at([0.0, 0.0, 7.0]);
    let mut scene = Scene::new(&camera);
    let (tx, rx) = futures::channel::oneshot::channel::<Vec<u8>>();
    let fetch = async move { rx.await.map_err(|e| AssetError::Fetch(e.to_string())) };
    let model = shared(ModelInstance::from_future(
        &ctx,
        pipelines::model::shader(&ctx.device),
        "streamed.glb",
        fetch,
        ModelProps::default(),
    ));
    scene.add(model.clone()).unwrap();
    assert_eq!(model.borrow().lifecycle(), Lifecycle::Loading);
    assert!(scene.poll_pending().is_empty());
    assert_eq!(model.borrow().lifecycle(), Lifecycle::Loading);

    model.borrow_mut().destroy();
    assert_eq!(model.borrow().lifecycle(), Lifecycle::Destroyed);
    // the receiving end went away with the load
    assert!(tx.send(triangle_glb(true, None)).is_err());

    assert!(scene.poll_pending().is_empty());
    assert_eq!(model.borrow().lifecycle(), Lifecycle::Destroyed);
    assert_eq!(model.borrow().mesh_count(), 0);
    assert!(model.borrow_mut().init().is_err());

    let mut recorder = DrawRecorder::new();
    scene.render(&mut recorder);
    assert!(recorder.calls().is_empty());
    assert_eq!(recorder.pipelines_set(), 0);
}

#[test]
fn streamed_model_finishes_on_a_later_poll() {
    let ctx = noop_ctx();
    let camera = camera_at([0.0, 0.0, 7.0]);
    let mut scene = Scene::new(&camera);
    let (tx, rx) = futures::channel::oneshot::channel::<Vec<u8>>();
    let fetch = async move { rx.await.map_err(|e| AssetError::Fetch(e.to_string())) };
    let model = shared(ModelInstance::from_future(
        &ctx,
        pipelines::model::shader(&ctx.device),
        "streamed.glb",
        fetch,
        ModelProps::default(),
    ));
    scene.add(model.clone()).unwrap();
    assert_eq!(model.borrow().lifecycle(), Lifecycle::Loading);

    tx.send(triangle_glb(true, None)).unwrap();
    assert!(scene.poll_pending().is_empty());
    assert_eq!(model.borrow().lifecycle(), Lifecycle::Ready);
    assert_eq!(model.borrow().mesh_names(), vec!["tri#0"]);
}
