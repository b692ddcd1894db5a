use wgpu::util::DeviceExt;

use crate::{
    animation::AnimationHandle,
    camera::SharedCamera,
    context::InitContext,
    data_structures::{
        geometry::{Geometry, PLANE_INDICES, PLANE_VERTICES},
        texture::Texture,
        transform::Transform,
        uniforms::PlaneUniform,
    },
    matrix,
    objects::{Lifecycle, Object3D, ObjectBase, UsesCamera},
    pipelines,
    render::PassEncoder,
};

#[derive(Clone, Debug, PartialEq)]
pub struct PlaneProps {
    pub transform: Transform,
    pub color: [f32; 4],
    pub use_texture: bool,
    /// Free-form slots read by the plane shader. The default shader takes
    /// time and pointer position from `params[0]` and the viewport size from `params[1]`.
    pub params: [[f32; 4]; 2],
}

impl Default for PlaneProps {
    fn default() -> Self {
        Self {
            transform: Transform::default(),
            color: [1.0; 4],
            use_texture: true,
            params: [[0.0; 4]; 2],
        }
    }
}

#[derive(Debug)]
struct PlaneGpu {
    geometry: Geometry,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    pipeline: wgpu::RenderPipeline,
}

/// A unit quad in the XY plane, optionally textured.
#[derive(Debug)]
pub struct Plane {
    base: ObjectBase,
    shader: wgpu::ShaderModule,
    props: PlaneProps,
    texture: Option<Texture>,
    gpu: Option<PlaneGpu>,
    uniform: PlaneUniform,
}

impl Plane {
    /// A plane without a texture samples a white texture of its own, so
    /// `use_texture` has no visible effect on it. The plane takes ownership of
    /// `texture` and releases it when destroyed.
    pub fn new(
        ctx: &InitContext,
        shader: wgpu::ShaderModule,
        texture: Option<Texture>,
        props: PlaneProps,
    ) -> Self {
        let base = ObjectBase::new(ctx);
        let uniform = Self::compute_uniform(&base, &props);
        Self {
            base,
            shader,
            props,
            texture,
            gpu: None,
            uniform,
        }
    }

    pub fn props(&self) -> &PlaneProps {
        &self.props
    }

    pub fn update_props<F: FnOnce(&mut PlaneProps)>(&mut self, mutate: F) {
        if self.base.is_destroyed() {
            return;
        }
        mutate(&mut self.props);
        self.write_uniform();
    }

    pub fn uniform(&self) -> &PlaneUniform {
        &self.uniform
    }

    /// The texture the plane samples, `None` once destroyed.
    pub fn texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }

    pub fn add_animation(&mut self, handle: AnimationHandle) {
        self.base.add_animation(handle);
    }

    pub fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn compute_uniform(base: &ObjectBase, props: &PlaneProps) -> PlaneUniform {
        let (view, proj) = base.view_proj();
        PlaneUniform {
            model: matrix::to_cols(&props.transform.to_matrix()),
            view: matrix::to_cols(&view),
            proj: matrix::to_cols(&proj),
            color: props.color,
            flags: [if props.use_texture { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0],
            params: props.params,
        }
    }

    fn write_uniform(&mut self) {
        let Some(gpu) = &self.gpu else {
            return;
        };
        self.uniform = Self::compute_uniform(&self.base, &self.props);
        self.base
            .write_buffer(&gpu.uniform_buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

impl UsesCamera for Plane {
    fn set_camera(&mut self, camera: SharedCamera) {
        self.base.set_camera(camera);
    }
}

impl Object3D for Plane {
    fn init(&mut self) -> anyhow::Result<()> {
        if !self.base.begin_init("plane")? {
            return Ok(());
        }
        let device = self.base.device();
        let texture = match self.texture.take() {
            Some(texture) => texture,
            None => Texture::solid_colour(device, self.base.queue(), [255; 4], 1, "Plane White Texture"),
        };
        let sampler = match &texture.sampler {
            Some(sampler) => sampler.clone(),
            None => crate::data_structures::texture::create_default_sampler(device),
        };

        let geometry = Geometry::indexed(device, "Plane", &PLANE_VERTICES, &PLANE_INDICES);
        let layout = pipelines::plane::bind_group_layout(device);
        let pipeline =
            pipelines::plane::mk_plane_pipeline(device, &self.base.ctx().target, &self.shader, &layout);

        let uniform = Self::compute_uniform(&self.base, &self.props);
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Plane Uniform Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
            ],
            label: Some("plane_bind_group"),
        });

        self.texture = Some(texture);
        self.gpu = Some(PlaneGpu {
            geometry,
            uniform_buffer,
            bind_group,
            pipeline,
        });
        self.uniform = uniform;
        self.base.set_lifecycle(Lifecycle::Ready);
        log::debug!("plane initialized");
        Ok(())
    }

    fn update_camera_transform(&mut self) {
        if !self.base.is_ready() {
            return;
        }
        self.write_uniform();
    }

    fn render(&self, pass: &mut dyn PassEncoder) {
        if !self.base.is_ready() {
            return;
        }
        let Some(gpu) = &self.gpu else {
            log::error!("plane is ready but has no GPU resources, skipping draw");
            return;
        };
        pass.set_pipeline(&gpu.pipeline);
        pass.set_bind_group(0, &gpu.bind_group);
        gpu.geometry.draw(pass, 0..1);
    }

    fn destroy(&mut self) {
        if !self.base.begin_destroy() {
            return;
        }
        if let Some(gpu) = self.gpu.take() {
            gpu.geometry.destroy();
            gpu.uniform_buffer.destroy();
        }
        if let Some(texture) = self.texture.take() {
            texture.destroy();
        }
        log::debug!("plane destroyed");
    }

    fn lifecycle(&self) -> Lifecycle {
        self.base.lifecycle()
    }

    fn camera_user(&mut self) -> Option<&mut dyn UsesCamera> {
        Some(self)
    }
}
