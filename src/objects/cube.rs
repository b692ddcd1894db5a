use wgpu::util::DeviceExt;

use crate::{
    animation::AnimationHandle,
    camera::SharedCamera,
    context::InitContext,
    data_structures::{
        geometry::{CUBE_INDICES, CUBE_VERTICES, Geometry},
        transform::Transform,
        uniforms::ObjectUniform,
    },
    objects::{Lifecycle, Object3D, ObjectBase, UsesCamera},
    pipelines,
    render::PassEncoder,
};

#[derive(Clone, Debug, PartialEq)]
pub struct CubeProps {
    pub transform: Transform,
    pub color: [f32; 4],
}

impl Default for CubeProps {
    fn default() -> Self {
        Self {
            transform: Transform::default(),
            color: [1.0; 4],
        }
    }
}

#[derive(Debug)]
struct CubeGpu {
    geometry: Geometry,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    pipeline: wgpu::RenderPipeline,
}

/// A lit cube spanning -1..1 on every axis before scaling.
#[derive(Debug)]
pub struct Cube {
    base: ObjectBase,
    shader: wgpu::ShaderModule,
    props: CubeProps,
    gpu: Option<CubeGpu>,
    uniform: ObjectUniform,
}

impl Cube {
    pub fn new(ctx: &InitContext, shader: wgpu::ShaderModule, props: CubeProps) -> Self {
        let base = ObjectBase::new(ctx);
        let uniform = Self::compute_uniform(&base, &props);
        Self {
            base,
            shader,
            props,
            gpu: None,
            uniform,
        }
    }

    pub fn props(&self) -> &CubeProps {
        &self.props
    }

    /// Mutate the properties and rewrite the whole uniform buffer right after.
    pub fn update_props<F: FnOnce(&mut CubeProps)>(&mut self, mutate: F) {
        if self.base.is_destroyed() {
            return;
        }
        mutate(&mut self.props);
        self.write_uniform();
    }

    /// The uniform as last written to the GPU.
    pub fn uniform(&self) -> &ObjectUniform {
        &self.uniform
    }

    pub fn add_animation(&mut self, handle: AnimationHandle) {
        self.base.add_animation(handle);
    }

    pub fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn compute_uniform(base: &ObjectBase, props: &CubeProps) -> ObjectUniform {
        let (view, proj) = base.view_proj();
        ObjectUniform::new(&props.transform.to_matrix(), &view, &proj, props.color)
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

impl UsesCamera for Cube {
    fn set_camera(&mut self, camera: SharedCamera) {
        self.base.set_camera(camera);
    }
}

impl Object3D for Cube {
    fn init(&mut self) -> anyhow::Result<()> {
        if !self.base.begin_init("cube")? {
            return Ok(());
        }
        let device = self.base.device();
        let geometry = Geometry::indexed(device, "Cube", &CUBE_VERTICES, &CUBE_INDICES);
        let layout = pipelines::cube::bind_group_layout(device);
        let pipeline =
            pipelines::cube::mk_cube_pipeline(device, &self.base.ctx().target, &self.shader, &layout);

        let uniform = Self::compute_uniform(&self.base, &self.props);
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Cube Uniform Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("cube_bind_group"),
        });

        self.gpu = Some(CubeGpu {
            geometry,
            uniform_buffer,
            bind_group,
            pipeline,
        });
        self.uniform = uniform;
        self.base.set_lifecycle(Lifecycle::Ready);
        log::debug!("cube initialized");
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
            log::error!("cube is ready but has no GPU resources, skipping draw");
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
        log::debug!("cube destroyed");
    }

    fn lifecycle(&self) -> Lifecycle {
        self.base.lifecycle()
    }

    fn camera_user(&mut self) -> Option<&mut dyn UsesCamera> {
        Some(self)
    }
}
