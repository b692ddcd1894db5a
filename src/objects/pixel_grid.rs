//! A square grid of cells drawn with one instanced draw call.
//!
//! Each instance is one cell. Whether a cell lights up is read from a storage
//! buffer of `grid_size²` states, so changing the picture never changes the
//! draw call.

use std::{cell::RefCell, rc::Rc};

use anyhow::{Result, bail};
use image::{DynamicImage, imageops::FilterType};
use wgpu::util::DeviceExt;

use crate::{
    animation::AnimationHandle,
    camera::SharedCamera,
    context::InitContext,
    data_structures::{
        geometry::{GRID_VERTICES, Geometry},
        uniforms::GridTransformUniform,
    },
    matrix::{self, Mat4},
    objects::{Lifecycle, Object3D, ObjectBase, UsesCamera},
    pipelines,
    render::PassEncoder,
    scene::Scene,
};

#[derive(Clone, Debug, PartialEq)]
pub struct PixelGridProps {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    /// Cells per side. Fixed once the grid is initialized.
    pub grid_size: u32,
    /// Gap between cells as a fraction of the cell size.
    pub grid_space: f32,
    pub active_color: [f32; 4],
}

impl Default for PixelGridProps {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0; 3],
            grid_size: 32,
            grid_space: 0.1,
            active_color: [1.0; 4],
        }
    }
}

impl PixelGridProps {
    /// `T * R`. Grids are always two units wide and are not scaled.
    pub fn model_matrix(&self) -> Mat4 {
        matrix::translation_matrix(self.position) * matrix::rotation_matrix(self.rotation)
    }

    /// `grid_size²`, or `None` when that does not fit in a `u32`.
    pub fn cell_count(&self) -> Option<u32> {
        self.grid_size.checked_mul(self.grid_size)
    }
}

#[derive(Debug)]
struct PixelGridGpu {
    geometry: Geometry,
    grid_buffer: wgpu::Buffer,
    cell_buffer: wgpu::Buffer,
    transform_buffer: wgpu::Buffer,
    time_buffer: wgpu::Buffer,
    space_buffer: wgpu::Buffer,
    color_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    pipeline: wgpu::RenderPipeline,
}

impl PixelGridGpu {
    fn destroy(&self) {
        self.geometry.destroy();
        for buffer in [
            &self.grid_buffer,
            &self.cell_buffer,
            &self.transform_buffer,
            &self.time_buffer,
            &self.space_buffer,
            &self.color_buffer,
        ] {
            buffer.destroy();
        }
    }
}

#[derive(Debug)]
pub struct PixelGrid {
    base: ObjectBase,
    shader: wgpu::ShaderModule,
    props: PixelGridProps,
    cells: Vec<u32>,
    time: f32,
    transform: GridTransformUniform,
    gpu: Option<PixelGridGpu>,
}

impl PixelGrid {
    /// Every cell starts active.
    pub fn new(ctx: &InitContext, shader: wgpu::ShaderModule, props: PixelGridProps) -> Self {
        let base = ObjectBase::new(ctx);
        let transform = Self::compute_transform(&base, &props);
        Self {
            base,
            shader,
            cells: vec![1; props.cell_count().unwrap_or(0) as usize],
            props,
            time: 0.0,
            transform,
            gpu: None,
        }
    }

    pub fn props(&self) -> &PixelGridProps {
        &self.props
    }

    /// Mutate the properties and refresh the transform, spacing and colour
    /// buffers. The grid size cannot change after construction; such a change
    /// is reverted with a warning.
    pub fn update_props<F: FnOnce(&mut PixelGridProps)>(&mut self, mutate: F) {
        if self.base.is_destroyed() {
            return;
        }
        let grid_size = self.props.grid_size;
        mutate(&mut self.props);
        if self.props.grid_size != grid_size {
            log::warn!(
                "pixel grid size is fixed at {grid_size}, ignoring change to {}",
                self.props.grid_size
            );
            self.props.grid_size = grid_size;
        }
        self.update_camera_transform();
        self.update_grid_space();
        self.update_grid_color();
    }

    pub fn transform_uniform(&self) -> &GridTransformUniform {
        &self.transform
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn cell_states(&self) -> &[u32] {
        &self.cells
    }

    /// Replace every cell state. `states` must hold exactly `grid_size²` entries.
    pub fn set_cell_states(&mut self, states: &[u32]) -> Result<()> {
        if self.base.is_destroyed() {
            bail!("cannot set cell states on a destroyed pixel grid");
        }
        let Some(expected) = self.props.cell_count() else {
            bail!("a {0}x{0} grid has too many cells", self.props.grid_size);
        };
        let expected = expected as usize;
        if states.len() != expected {
            bail!(
                "a {0}x{0} grid needs {expected} cell states, got {1}",
                self.props.grid_size,
                states.len()
            );
        }
        self.cells.copy_from_slice(states);
        if let Some(gpu) = &self.gpu {
            self.base
                .write_buffer(&gpu.cell_buffer, 0, bytemuck::cast_slice(&self.cells));
        }
        Ok(())
    }

    pub fn update_grid_space(&mut self) {
        let Some(gpu) = self.ready_gpu() else {
            return;
        };
        self.base.write_buffer(
            &gpu.space_buffer,
            0,
            bytemuck::cast_slice(&[self.props.grid_space, 0.0, 0.0, 0.0]),
        );
    }

    pub fn update_grid_color(&mut self) {
        let Some(gpu) = self.ready_gpu() else {
            return;
        };
        self.base
            .write_buffer(&gpu.color_buffer, 0, bytemuck::cast_slice(&self.props.active_color));
    }

    pub fn add_animation(&mut self, handle: AnimationHandle) {
        self.base.add_animation(handle);
    }

    pub fn base(&self) -> &ObjectBase {
        &self.base
    }

    fn ready_gpu(&self) -> Option<&PixelGridGpu> {
        if !self.base.is_ready() {
            return None;
        }
        self.gpu.as_ref()
    }

    fn compute_transform(base: &ObjectBase, props: &PixelGridProps) -> GridTransformUniform {
        let (view, proj) = base.view_proj();
        GridTransformUniform::new(&props.model_matrix(), &view, &proj)
    }
}

/// Small uniforms are padded to 16 bytes.
fn padded_uniform(device: &wgpu::Device, label: &str, values: [f32; 4]) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(&values),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

impl UsesCamera for PixelGrid {
    fn set_camera(&mut self, camera: SharedCamera) {
        self.base.set_camera(camera);
    }
}

impl Object3D for PixelGrid {
    fn init(&mut self) -> Result<()> {
        if !self.base.begin_init("pixel grid")? {
            return Ok(());
        }
        if self.props.grid_size == 0 {
            bail!("a pixel grid needs at least one cell per side");
        }
        if self.props.cell_count().is_none() {
            bail!("a {0}x{0} pixel grid has too many cells", self.props.grid_size);
        }
        let device = self.base.device();
        let size = self.props.grid_size as f32;

        let geometry = Geometry::non_indexed(device, "Pixel Grid", &GRID_VERTICES);
        let layout = pipelines::pixel_grid::bind_group_layout(device);
        let pipeline = pipelines::pixel_grid::mk_pixel_grid_pipeline(
            device,
            &self.base.ctx().target,
            &self.shader,
            &layout,
        );

        let grid_buffer = padded_uniform(device, "Grid Size Buffer", [size, size, 0.0, 0.0]);
        let cell_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Cell State Buffer"),
            contents: bytemuck::cast_slice(&self.cells),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        });
        let transform = Self::compute_transform(&self.base, &self.props);
        let transform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Grid Transform Buffer"),
            contents: bytemuck::cast_slice(&[transform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let time_buffer = padded_uniform(device, "Grid Time Buffer", [self.time, 0.0, 0.0, 0.0]);
        let space_buffer = padded_uniform(
            device,
            "Grid Space Buffer",
            [self.props.grid_space, 0.0, 0.0, 0.0],
        );
        let color_buffer = padded_uniform(device, "Grid Color Buffer", self.props.active_color);

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: grid_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: cell_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: transform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: time_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: space_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: color_buffer.as_entire_binding(),
                },
            ],
            label: Some("pixel_grid_bind_group"),
        });

        self.gpu = Some(PixelGridGpu {
            geometry,
            grid_buffer,
            cell_buffer,
            transform_buffer,
            time_buffer,
            space_buffer,
            color_buffer,
            bind_group,
            pipeline,
        });
        self.transform = transform;
        self.base.set_lifecycle(Lifecycle::Ready);
        log::debug!("pixel grid {0}x{0} initialized", self.props.grid_size);
        Ok(())
    }

    fn update_camera_transform(&mut self) {
        if !self.base.is_ready() {
            return;
        }
        let transform = Self::compute_transform(&self.base, &self.props);
        if let Some(gpu) = &self.gpu {
            self.base
                .write_buffer(&gpu.transform_buffer, 0, bytemuck::cast_slice(&[transform]));
        }
        self.transform = transform;
    }

    fn run(&mut self, time: f32) {
        let Some(gpu) = self.ready_gpu() else {
            return;
        };
        self.base
            .write_buffer(&gpu.time_buffer, 0, bytemuck::cast_slice(&[time, 0.0, 0.0, 0.0]));
        self.time = time;
    }

    fn render(&self, pass: &mut dyn PassEncoder) {
        if !self.base.is_ready() {
            return;
        }
        let Some(gpu) = &self.gpu else {
            log::error!("pixel grid is ready but has no GPU resources, skipping draw");
            return;
        };
        pass.set_pipeline(&gpu.pipeline);
        pass.set_bind_group(0, &gpu.bind_group);
        gpu.geometry.draw(pass, 0..self.cells.len() as u32);
    }

    fn destroy(&mut self) {
        if !self.base.begin_destroy() {
            return;
        }
        if let Some(gpu) = self.gpu.take() {
            gpu.destroy();
        }
        log::debug!("pixel grid destroyed");
    }

    fn lifecycle(&self) -> Lifecycle {
        self.base.lifecycle()
    }

    fn camera_user(&mut self) -> Option<&mut dyn UsesCamera> {
        Some(self)
    }
}

/// Threshold an image into `grid_size²` cell states: a cell is active when
/// the mean of its red, green and blue channels is above 128. The image is
/// resampled to `grid_size` pixels per side first, top row first.
pub fn cell_states_from_image(image: &DynamicImage, grid_size: u32) -> Vec<u32> {
    if grid_size == 0 {
        return Vec::new();
    }
    let resized = image
        .resize_exact(grid_size, grid_size, FilterType::Triangle)
        .to_rgb8();
    resized
        .pixels()
        .map(|p| {
            let brightness = (p[0] as f32 + p[1] as f32 + p[2] as f32) / 3.0;
            u32::from(brightness > 128.0)
        })
        .collect()
}

/// Several pixel grids sharing a shader, placed and animated together.
#[derive(Debug, Default)]
pub struct PixelGridLayout {
    grids: Vec<Rc<RefCell<PixelGrid>>>,
}

impl PixelGridLayout {
    pub fn new(ctx: &InitContext, shader: &wgpu::ShaderModule, layouts: &[PixelGridProps]) -> Self {
        let grids = layouts
            .iter()
            .map(|props| {
                Rc::new(RefCell::new(PixelGrid::new(
                    ctx,
                    shader.clone(),
                    props.clone(),
                )))
            })
            .collect();
        Self { grids }
    }

    pub fn grids(&self) -> &[Rc<RefCell<PixelGrid>>] {
        &self.grids
    }

    pub fn grid(&self, index: usize) -> Option<&Rc<RefCell<PixelGrid>>> {
        self.grids.get(index)
    }

    pub fn len(&self) -> usize {
        self.grids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }

    pub fn set_camera(&self, camera: &SharedCamera) {
        for grid in &self.grids {
            grid.borrow_mut().set_camera(camera.clone());
        }
    }

    /// Add every grid to `scene` in layout order. The scene binds its camera
    /// and initializes them.
    pub fn add_to(&self, scene: &mut Scene) -> Result<()> {
        for grid in &self.grids {
            scene.add(grid.clone())?;
        }
        Ok(())
    }

    pub fn update_camera_transform(&self) {
        for grid in &self.grids {
            grid.borrow_mut().update_camera_transform();
        }
    }

    pub fn run(&self, time: f32) {
        for grid in &self.grids {
            grid.borrow_mut().run(time);
        }
    }

    pub fn render(&self, pass: &mut dyn PassEncoder) {
        for grid in &self.grids {
            grid.borrow().render(pass);
        }
    }

    pub fn destroy(&self) {
        for grid in &self.grids {
            grid.borrow_mut().destroy();
        }
    }
}
