use crate::{
    context::TargetConfig,
    data_structures::vertex::{PlaneVertex, Vertex},
    pipelines::basic::{PipelineOptions, mk_pipeline_layout, mk_render_pipeline, mk_shader, textured_layout},
};

/// The default plane shader.
pub fn shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    mk_shader(device, "Plane Shader", include_str!("plane_shader.wgsl"))
}

pub fn bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    textured_layout(device, "plane_bind_group_layout")
}

/// Planes can be seen from both sides and are blended over whatever is
/// behind them, so they test depth but never write it.
pub fn mk_plane_pipeline(
    device: &wgpu::Device,
    target: &TargetConfig,
    shader: &wgpu::ShaderModule,
    layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let pipeline_layout = mk_pipeline_layout(device, "Plane Pipeline Layout", &[layout]);
    mk_render_pipeline(
        device,
        &pipeline_layout,
        target,
        shader,
        &[PlaneVertex::desc()],
        PipelineOptions {
            label: "Plane Pipeline",
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            cull_mode: None,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::Less,
        },
    )
}
