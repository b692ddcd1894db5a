use crate::{
    context::TargetConfig,
    data_structures::vertex::{GridVertex, Vertex},
    pipelines::basic::{PipelineOptions, mk_pipeline_layout, mk_render_pipeline, mk_shader, uniform_entry},
};

/// The default pixel grid shader.
pub fn shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    mk_shader(device, "Pixel Grid Shader", include_str!("pixel_grid_shader.wgsl"))
}

/// Bindings:
/// 0. grid dimensions
/// 1. cell states (read-only storage)
/// 2. model/view/proj
/// 3. time
/// 4. grid spacing
/// 5. active colour (fragment only)
pub fn bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            uniform_entry(0, wgpu::ShaderStages::VERTEX),
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            uniform_entry(2, wgpu::ShaderStages::VERTEX),
            uniform_entry(3, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT),
            uniform_entry(4, wgpu::ShaderStages::VERTEX),
            uniform_entry(5, wgpu::ShaderStages::FRAGMENT),
        ],
        label: Some("pixel_grid_bind_group_layout"),
    })
}

/// Cells are drawn in instance order on top of each other: depth is written
/// but the test always passes.
pub fn mk_pixel_grid_pipeline(
    device: &wgpu::Device,
    target: &TargetConfig,
    shader: &wgpu::ShaderModule,
    layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let pipeline_layout = mk_pipeline_layout(device, "Pixel Grid Pipeline Layout", &[layout]);
    mk_render_pipeline(
        device,
        &pipeline_layout,
        target,
        shader,
        &[GridVertex::desc()],
        PipelineOptions {
            label: "Pixel Grid Pipeline",
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            cull_mode: Some(wgpu::Face::Back),
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Always,
        },
    )
}
