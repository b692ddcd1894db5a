//! A glTF model placed in the scene.
//!
//! Loading is asynchronous: [`Object3D::init`] starts the load and
//! [`Object3D::poll_init`] finishes it, so the model can sit in a scene while
//! its document is still being fetched. Each primitive of the document becomes
//! one sub-mesh with its own uniform buffer, because sub-meshes differ in
//! local transform and base colour.

use std::task::{Context, Poll};

use anyhow::{Result, anyhow};
use futures::{FutureExt, future::LocalBoxFuture};
use wgpu::util::DeviceExt;

use crate::{
    animation::AnimationHandle,
    camera::SharedCamera,
    context::InitContext,
    data_structures::{
        geometry::Geometry,
        texture::{Texture, create_default_sampler},
        transform::Transform,
        uniforms::ObjectUniform,
    },
    matrix::Mat4,
    objects::{Lifecycle, Object3D, ObjectBase, UsesCamera},
    pipelines,
    render::PassEncoder,
    resources::{
        self, AssetError, SceneDocument, format_hint,
        mesh::{PrimitiveData, TextureSource, extract_primitives},
        sibling_path,
        texture::{TextureCache, TextureKey},
    },
};

/// Where the glTF document comes from.
pub enum ModelSource {
    /// A `.glb` or `.gltf` path below the assets root.
    Url(String),
    /// A self-contained document already in memory.
    Bytes(Vec<u8>),
    /// A self-contained document the caller fetches itself.
    Fetch(LocalBoxFuture<'static, Result<Vec<u8>, AssetError>>),
}

impl std::fmt::Debug for ModelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelSource::Url(url) => f.debug_tuple("Url").field(url).finish(),
            ModelSource::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            ModelSource::Fetch(_) => f.write_str("Fetch"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelProps {
    pub transform: Transform,
}

#[derive(Debug)]
struct GpuMesh {
    name: String,
    geometry: Geometry,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    local: Mat4,
    base_color: [f32; 4],
    default_texture: bool,
    uniform: ObjectUniform,
}

#[derive(Debug)]
struct LoadedModel {
    pipeline: wgpu::RenderPipeline,
    meshes: Vec<GpuMesh>,
    cache: TextureCache,
    default_texture: Texture,
}

impl LoadedModel {
    fn release(mut self) {
        for mesh in &self.meshes {
            mesh.geometry.destroy();
            mesh.uniform_buffer.destroy();
        }
        self.cache.release_all();
        self.default_texture.destroy();
    }
}

pub struct ModelInstance {
    base: ObjectBase,
    shader: wgpu::ShaderModule,
    label: String,
    source: Option<ModelSource>,
    props: ModelProps,
    pending: Option<LocalBoxFuture<'static, Result<LoadedModel>>>,
    loaded: Option<LoadedModel>,
    failure: Option<String>,
}

impl std::fmt::Debug for ModelInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelInstance")
            .field("label", &self.label)
            .field("lifecycle", &self.base.lifecycle())
            .field("props", &self.props)
            .field("meshes", &self.mesh_count())
            .finish()
    }
}

impl ModelInstance {
    pub fn new(ctx: &InitContext, shader: wgpu::ShaderModule, url: &str, props: ModelProps) -> Self {
        Self::with_source(ctx, shader, url, ModelSource::Url(url.to_string()), props)
    }

    pub fn from_bytes(
        ctx: &InitContext,
        shader: wgpu::ShaderModule,
        bytes: Vec<u8>,
        props: ModelProps,
    ) -> Self {
        Self::with_source(ctx, shader, "<memory>", ModelSource::Bytes(bytes), props)
    }

    /// The document arrives through `fetch`, which may stay pending across
    /// frames; [`crate::scene::Scene::poll_pending`] finishes the load.
    pub fn from_future<F>(
        ctx: &InitContext,
        shader: wgpu::ShaderModule,
        label: &str,
        fetch: F,
        props: ModelProps,
    ) -> Self
    where
        F: Future<Output = Result<Vec<u8>, AssetError>> + 'static,
    {
        Self::with_source(ctx, shader, label, ModelSource::Fetch(fetch.boxed_local()), props)
    }

    fn with_source(
        ctx: &InitContext,
        shader: wgpu::ShaderModule,
        label: &str,
        source: ModelSource,
        props: ModelProps,
    ) -> Self {
        Self {
            base: ObjectBase::new(ctx),
            shader,
            label: label.to_string(),
            source: Some(source),
            props,
            pending: None,
            loaded: None,
            failure: None,
        }
    }

    pub fn props(&self) -> &ModelProps {
        &self.props
    }

    pub fn update_props<F: FnOnce(&mut ModelProps)>(&mut self, mutate: F) {
        if self.base.is_destroyed() {
            return;
        }
        mutate(&mut self.props);
        self.update_camera_transform();
    }

    pub fn mesh_count(&self) -> usize {
        self.loaded.as_ref().map_or(0, |m| m.meshes.len())
    }

    pub fn mesh_names(&self) -> Vec<&str> {
        self.loaded
            .as_ref()
            .map(|m| m.meshes.iter().map(|mesh| mesh.name.as_str()).collect())
            .unwrap_or_default()
    }

    /// The uniform last written for each sub-mesh.
    pub fn mesh_uniforms(&self) -> Vec<ObjectUniform> {
        self.loaded
            .as_ref()
            .map(|m| m.meshes.iter().map(|mesh| mesh.uniform).collect())
            .unwrap_or_default()
    }

    /// How many sub-meshes sample the white default texture.
    pub fn meshes_with_default_texture(&self) -> usize {
        self.loaded
            .as_ref()
            .map_or(0, |m| m.meshes.iter().filter(|mesh| mesh.default_texture).count())
    }

    pub fn cached_textures(&self) -> usize {
        self.loaded.as_ref().map_or(0, |m| m.cache.len())
    }

    pub fn add_animation(&mut self, handle: AnimationHandle) {
        self.base.add_animation(handle);
    }

    pub fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn install(&mut self, mut loaded: LoadedModel) {
        let global = self.props.transform.to_matrix();
        let (view, proj) = self.base.view_proj();
        for mesh in &mut loaded.meshes {
            mesh.uniform = ObjectUniform::new(&(global * mesh.local), &view, &proj, mesh.base_color);
            self.base
                .write_buffer(&mesh.uniform_buffer, 0, bytemuck::cast_slice(&[mesh.uniform]));
        }
        log::debug!("model {} ready with {} mesh(es)", self.label, loaded.meshes.len());
        self.loaded = Some(loaded);
        self.base.set_lifecycle(Lifecycle::Ready);
    }
}

impl UsesCamera for ModelInstance {
    fn set_camera(&mut self, camera: SharedCamera) {
        self.base.set_camera(camera);
    }
}

impl Object3D for ModelInstance {
    fn init(&mut self) -> Result<()> {
        if !self.base.begin_init("model")? {
            return Ok(());
        }
        let source = self
            .source
            .take()
            .ok_or_else(|| anyhow!("model {} has no source", self.label))?;
        self.pending = Some(load(self.base.ctx().clone(), source, self.shader.clone()).boxed_local());
        self.base.set_lifecycle(Lifecycle::Loading);

        // Loads from memory or the local file system finish on the first poll.
        let mut cx = Context::from_waker(futures::task::noop_waker_ref());
        match self.poll_init(&mut cx) {
            Poll::Ready(Err(e)) => Err(e),
            _ => Ok(()),
        }
    }

    fn poll_init(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        match self.base.lifecycle() {
            Lifecycle::Loading => {}
            Lifecycle::Ready => return Poll::Ready(Ok(())),
            Lifecycle::Uninitialized => {
                return Poll::Ready(Err(anyhow!("model {} was never initialized", self.label)));
            }
            Lifecycle::Failed => {
                let reason = self.failure.as_deref().unwrap_or("unknown error");
                return Poll::Ready(Err(anyhow!("model {} failed to load: {reason}", self.label)));
            }
            Lifecycle::Destroyed => {
                return Poll::Ready(Err(anyhow!("model {} was destroyed", self.label)));
            }
        }
        let Some(pending) = self.pending.as_mut() else {
            return Poll::Ready(Err(anyhow!("model {} has no load in flight", self.label)));
        };
        let result = match pending.poll_unpin(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(result) => result,
        };
        self.pending = None;
        match result {
            Ok(loaded) => {
                self.install(loaded);
                Poll::Ready(Ok(()))
            }
            Err(e) => {
                log::error!("failed to load model {}: {e:#}", self.label);
                self.failure = Some(format!("{e:#}"));
                self.base.set_lifecycle(Lifecycle::Failed);
                Poll::Ready(Err(e))
            }
        }
    }

    fn update_camera_transform(&mut self) {
        if !self.base.is_ready() {
            return;
        }
        let Some(loaded) = self.loaded.as_mut() else {
            return;
        };
        let global = self.props.transform.to_matrix();
        let (view, proj) = self.base.view_proj();
        for mesh in &mut loaded.meshes {
            mesh.uniform = ObjectUniform::new(&(global * mesh.local), &view, &proj, mesh.base_color);
            self.base
                .write_buffer(&mesh.uniform_buffer, 0, bytemuck::cast_slice(&[mesh.uniform]));
        }
    }

    fn render(&self, pass: &mut dyn PassEncoder) {
        if !self.base.is_ready() {
            return;
        }
        let Some(loaded) = &self.loaded else {
            log::error!("model {} is ready but has no GPU resources, skipping draw", self.label);
            return;
        };
        if loaded.meshes.is_empty() {
            return;
        }
        pass.set_pipeline(&loaded.pipeline);
        for mesh in &loaded.meshes {
            pass.set_bind_group(0, &mesh.bind_group);
            mesh.geometry.draw(pass, 0..1);
        }
    }

    fn destroy(&mut self) {
        if !self.base.begin_destroy() {
            return;
        }
        // an unfinished load is dropped before it can bind anything
        self.pending = None;
        if let Some(loaded) = self.loaded.take() {
            loaded.release();
        }
        log::debug!("model {} destroyed", self.label);
    }

    fn lifecycle(&self) -> Lifecycle {
        self.base.lifecycle()
    }

    fn camera_user(&mut self) -> Option<&mut dyn UsesCamera> {
        Some(self)
    }
}

async fn load(ctx: InitContext, source: ModelSource, shader: wgpu::ShaderModule) -> Result<LoadedModel> {
    let (doc, base_url) = match source {
        ModelSource::Url(url) => (resources::load_model(&url).await?, url),
        ModelSource::Bytes(bytes) => (SceneDocument::from_slice(&bytes)?, String::new()),
        ModelSource::Fetch(fetch) => (SceneDocument::from_slice(&fetch.await?)?, String::new()),
    };
    let primitives = extract_primitives(&doc)?;

    let device = &ctx.device;
    let layout = pipelines::model::bind_group_layout(device);
    let pipeline = pipelines::model::mk_model_pipeline(device, &ctx.target, &shader, &layout);
    let default_texture = Texture::solid_colour(device, &ctx.queue, [255; 4], 1, "Model Default Texture");
    let sampler = create_default_sampler(device);

    let mut cache = TextureCache::new();
    let mut meshes = Vec::with_capacity(primitives.len());
    for primitive in primitives {
        let key = resolve_texture(&ctx, &mut cache, &primitive, &base_url).await;
        let cached = key.as_ref().and_then(|key| cache.get(key));
        let texture = cached.unwrap_or(&default_texture);
        meshes.push(upload_mesh(&ctx, &layout, &sampler, texture, cached.is_none(), primitive));
    }

    Ok(LoadedModel {
        pipeline,
        meshes,
        cache,
        default_texture,
    })
}

/// Decode the primitive's base colour texture through the cache. Any failure
/// leaves the primitive on the default texture.
async fn resolve_texture(
    ctx: &InitContext,
    cache: &mut TextureCache,
    primitive: &PrimitiveData,
    base_url: &str,
) -> Option<TextureKey> {
    let fetched;
    let (bytes, mime_type) = match primitive.texture.as_ref()? {
        TextureSource::Embedded { bytes, mime_type } => (bytes.as_slice(), Some(mime_type.as_str())),
        TextureSource::Uri { uri, mime_type } => {
            match resources::load_binary(&sibling_path(base_url, uri)).await {
                Ok(bytes) => fetched = bytes,
                Err(e) => {
                    log::warn!("texture {uri} of {} could not be loaded, using default: {e}", primitive.name);
                    return None;
                }
            }
            (fetched.as_slice(), mime_type.as_deref())
        }
    };
    let hint = mime_type.and_then(format_hint);
    match cache.get_or_insert(&ctx.device, &ctx.queue, bytes, hint, &primitive.name) {
        Ok(key) => Some(key),
        Err(e) => {
            log::warn!("texture of {} could not be decoded, using default: {e:#}", primitive.name);
            None
        }
    }
}

fn upload_mesh(
    ctx: &InitContext,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    texture: &Texture,
    default_texture: bool,
    primitive: PrimitiveData,
) -> GpuMesh {
    let device = &ctx.device;
    let geometry = Geometry::indexed_u32(device, &primitive.name, &primitive.vertices, &primitive.indices);
    // written with the real matrices once the model is installed
    let uniform: ObjectUniform = bytemuck::Zeroable::zeroed();
    let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{} Uniform Buffer", primitive.name)),
        contents: bytemuck::cast_slice(&[uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    let sampler = texture.sampler.as_ref().unwrap_or(sampler);
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            },
        ],
        label: Some(&format!("{} Bind Group", primitive.name)),
    });

    GpuMesh {
        name: primitive.name,
        geometry,
        uniform_buffer,
        bind_group,
        local: primitive.transform,
        base_color: primitive.base_color,
        default_texture,
        uniform,
    }
}
