use crate::{
    context::TargetConfig,
    data_structures::vertex::{MeshVertex, Vertex},
    pipelines::basic::{PipelineOptions, mk_pipeline_layout, mk_render_pipeline, mk_shader, textured_layout},
};

/// The default model shader.
pub fn shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    mk_shader(device, "Model Shader", include_str!("model_shader.wgsl"))
}

/// One bind group per sub-mesh: its uniform, the sampler and its base colour texture.
pub fn bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    textured_layout(device, "model_bind_group_layout")
}

pub fn mk_model_pipeline(
    device: &wgpu::Device,
    target: &TargetConfig,
    shader: &wgpu::ShaderModule,
    layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let pipeline_layout = mk_pipeline_layout(device, "Model Pipeline Layout", &[layout]);
    mk_render_pipeline(
        device,
        &pipeline_layout,
        target,
        shader,
        &[MeshVertex::desc()],
        PipelineOptions {
            label: "Model Pipeline",
            ..Default::default()
        },
    )
}
