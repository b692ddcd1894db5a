use crate::{
    context::TargetConfig,
    data_structures::vertex::{CubeVertex, Vertex},
    pipelines::basic::{PipelineOptions, mk_pipeline_layout, mk_render_pipeline, mk_shader, uniform_entry},
};

/// The default cube shader.
pub fn shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    mk_shader(device, "Cube Shader", include_str!("cube_shader.wgsl"))
}

pub fn bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[uniform_entry(
            0,
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        )],
        label: Some("cube_bind_group_layout"),
    })
}

/// Opaque, back-face culled, depth tested and written.
pub fn mk_cube_pipeline(
    device: &wgpu::Device,
    target: &TargetConfig,
    shader: &wgpu::ShaderModule,
    layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let pipeline_layout = mk_pipeline_layout(device, "Cube Pipeline Layout", &[layout]);
    mk_render_pipeline(
        device,
        &pipeline_layout,
        target,
        shader,
        &[CubeVertex::desc()],
        PipelineOptions {
            label: "Cube Pipeline",
            ..Default::default()
        },
    )
}
