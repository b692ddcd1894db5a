//! GPU acquisition and the context handed to renderables.
//!
//! [`InitContext`] is the cheap, clonable slice of the engine every renderable
//! needs while it creates buffers and pipelines: the device, the queue and the
//! shape of the render targets it will be drawn into. wgpu handles are
//! reference counted internally, so cloning only clones the references.

use std::rc::Rc;

use crate::{data_structures::texture::Texture, render::BufferWriter};

/// Multisample count of the engine's color and depth targets.
pub const SAMPLE_COUNT: u32 = 4;

/// Describes the attachments of the engine's render pass, so that pipelines
/// built by renderables are compatible with it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetConfig {
    pub format: wgpu::TextureFormat,
    pub sample_count: u32,
    pub depth_format: wgpu::TextureFormat,
}

impl TargetConfig {
    pub fn new(format: wgpu::TextureFormat, sample_count: u32) -> Self {
        Self {
            format,
            sample_count,
            depth_format: Texture::DEPTH_FORMAT,
        }
    }

    pub fn multisample(&self) -> wgpu::MultisampleState {
        wgpu::MultisampleState {
            count: self.sample_count,
            mask: !0,
            alpha_to_coverage_enabled: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct InitContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub target: TargetConfig,
    /// Where renderables upload buffer contents. The queue itself by default.
    pub writer: Rc<dyn BufferWriter>,
}

impl InitContext {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, target: TargetConfig) -> Self {
        let writer = Rc::new(queue.clone());
        Self {
            device,
            queue,
            target,
            writer,
        }
    }

    pub fn with_writer(mut self, writer: Rc<dyn BufferWriter>) -> Self {
        self.writer = writer;
        self
    }
}

/// The platform cannot provide what the engine needs. There is no recovery
/// from any of these.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("cannot create a surface for the window: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("GPU device request failed: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("the surface supports no format the adapter can render to")]
    IncompatibleSurface,
}

pub(crate) fn create_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        #[cfg(not(target_arch = "wasm32"))]
        backends: wgpu::Backends::PRIMARY,
        // Cell state lives in a storage buffer, which WebGL cannot provide.
        #[cfg(target_arch = "wasm32")]
        backends: wgpu::Backends::BROWSER_WEBGPU,
        ..Default::default()
    })
}

/// Request an adapter (compatible with `surface` if one is given) and a device from it.
pub(crate) async fn request_device(
    instance: &wgpu::Instance,
    surface: Option<&wgpu::Surface<'static>>,
) -> Result<(wgpu::Adapter, wgpu::Device, wgpu::Queue), EngineError> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: surface,
            force_fallback_adapter: false,
        })
        .await?;
    log::info!("using adapter {:?}", adapter.get_info().name);

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("gpulab device"),
            required_features: wgpu::Features::empty(),
            required_limits: if cfg!(target_arch = "wasm32") {
                wgpu::Limits::downlevel_defaults()
            } else {
                wgpu::Limits::default()
            },
            memory_hints: Default::default(),
            trace: wgpu::Trace::Off,
        })
        .await?;
    log::info!("device and queue ready");

    Ok((adapter, device, queue))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_config_uses_engine_depth_format() {
        let target = TargetConfig::new(wgpu::TextureFormat::Bgra8UnormSrgb, SAMPLE_COUNT);
        assert_eq!(target.depth_format, Texture::DEPTH_FORMAT);
        assert_eq!(target.multisample().count, 4);
    }
}
