//! GPU ownership and frame submission.
//!
//! The [`Engine`] owns the device and queue, the output the frames go to (a
//! window surface, or an offscreen texture when headless), the multisampled
//! color and depth targets and the camera. Each call to [`Engine::render`]
//! records exactly one render pass over the attached [`Scene`] and submits
//! exactly one command buffer.

use std::{f32::consts::FRAC_PI_3, iter, sync::Arc};

use cgmath::{Point3, Rad};
use winit::window::Window;

use crate::{
    camera::{Camera, CameraOptions, SharedCamera},
    context::{self, EngineError, InitContext, SAMPLE_COUNT, TargetConfig},
    data_structures::texture::Texture,
    scene::Scene,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineConfig {
    pub clear_colour: wgpu::Color,
    /// Samples per pixel of the color and depth targets. 1 disables multisampling.
    pub sample_count: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            clear_colour: wgpu::Color::TRANSPARENT,
            sample_count: SAMPLE_COUNT,
        }
    }
}

/// The multisampled color target and the depth target, sized to the output.
#[derive(Debug)]
pub struct RenderTargets {
    multisampled: Option<Texture>,
    depth: Texture,
    size: [u32; 2],
    released: usize,
}

impl RenderTargets {
    fn new(device: &wgpu::Device, size: [u32; 2], target: &TargetConfig) -> Self {
        let multisampled = (target.sample_count > 1).then(|| {
            Texture::create_multisampled(
                device,
                size,
                target.format,
                target.sample_count,
                "multisampled_frame",
            )
        });
        let depth = Texture::create_depth_texture(device, size, target.sample_count, "depth_texture");
        Self {
            multisampled,
            depth,
            size,
            released: 0,
        }
    }

    /// Release the current targets, then create new ones of `size`.
    fn replace(&mut self, device: &wgpu::Device, size: [u32; 2], target: &TargetConfig) {
        let released = self.released + 1;
        self.destroy();
        *self = Self::new(device, size, target);
        self.released = released;
    }

    fn destroy(&self) {
        if let Some(texture) = &self.multisampled {
            texture.destroy();
        }
        self.depth.destroy();
    }

    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    /// How many sets of targets have been released by resizing.
    pub fn released(&self) -> usize {
        self.released
    }

    pub fn is_multisampled(&self) -> bool {
        self.multisampled.is_some()
    }
}

#[derive(Debug)]
enum Output {
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
        window: Arc<Window>,
    },
    Offscreen {
        texture: Texture,
    },
}

#[derive(Debug)]
pub struct Engine {
    ctx: InitContext,
    output: Output,
    targets: RenderTargets,
    camera: SharedCamera,
    scene: Option<Scene>,
    config: EngineConfig,
    frames_submitted: u64,
}

impl Engine {
    /// Acquire a GPU for `window` and configure its surface. Failing here
    /// means the platform cannot run the engine at all.
    pub async fn new(
        window: Arc<Window>,
        camera_position: [f32; 3],
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        let instance = context::create_instance();
        let surface = instance.create_surface(window.clone())?;
        let (adapter, device, queue) = context::request_device(&instance, Some(&surface)).await?;

        let caps = surface.get_capabilities(&adapter);
        // Colours are authored in sRGB; prefer a surface that converts on write.
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or(EngineError::IncompatibleSurface)?;

        let mut config = config;
        if config.sample_count > 1
            && !adapter
                .get_texture_format_features(format)
                .flags
                .sample_count_supported(config.sample_count)
        {
            log::warn!(
                "{format:?} does not support {}x multisampling, rendering without it",
                config.sample_count
            );
            config.sample_count = 1;
        }

        let size = window.inner_size();
        let size = [size.width.max(1), size.height.max(1)];
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size[0],
            height: size[1],
            present_mode: caps.present_modes.first().copied().unwrap_or_default(),
            alpha_mode: caps.alpha_modes.first().copied().unwrap_or_default(),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);
        log::info!("surface configured as {format:?} {}x{}", size[0], size[1]);

        let target = TargetConfig::new(format, config.sample_count);
        let ctx = InitContext::new(device, queue, target);
        let output = Output::Surface {
            surface,
            config: surface_config,
            window,
        };
        Ok(Self::assemble(ctx, output, size, camera_position, config))
    }

    /// An engine that renders into an offscreen texture of `format`.
    pub fn headless(
        device: wgpu::Device,
        queue: wgpu::Queue,
        format: wgpu::TextureFormat,
        size: [u32; 2],
        config: EngineConfig,
    ) -> Self {
        let size = [size[0].max(1), size[1].max(1)];
        let texture = Texture::create_render_target(&device, size, format, "offscreen_frame");
        let ctx = InitContext::new(device, queue, TargetConfig::new(format, config.sample_count));
        Self::assemble(ctx, Output::Offscreen { texture }, size, [0.0, 0.0, 7.0], config)
    }

    /// Acquire any GPU and render offscreen into an `Rgba8UnormSrgb` frame.
    pub async fn request_headless(size: [u32; 2], config: EngineConfig) -> Result<Self, EngineError> {
        let instance = context::create_instance();
        let (_, device, queue) = context::request_device(&instance, None).await?;
        Ok(Self::headless(
            device,
            queue,
            wgpu::TextureFormat::Rgba8UnormSrgb,
            size,
            config,
        ))
    }

    fn assemble(
        ctx: InitContext,
        output: Output,
        size: [u32; 2],
        camera_position: [f32; 3],
        config: EngineConfig,
    ) -> Self {
        let targets = RenderTargets::new(&ctx.device, size, &ctx.target);
        let camera = Camera::new(CameraOptions {
            position: Point3::from(camera_position),
            fov: Rad(FRAC_PI_3),
            aspect: size[0] as f32 / size[1] as f32,
            ..Default::default()
        })
        .shared();
        Self {
            ctx,
            output,
            targets,
            camera,
            scene: None,
            config,
            frames_submitted: 0,
        }
    }

    pub fn ctx(&self) -> &InitContext {
        &self.ctx
    }

    pub fn camera(&self) -> &SharedCamera {
        &self.camera
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn targets(&self) -> &RenderTargets {
        &self.targets
    }

    pub fn size(&self) -> [u32; 2] {
        self.targets.size()
    }

    pub fn window(&self) -> Option<&Arc<Window>> {
        match &self.output {
            Output::Surface { window, .. } => Some(window),
            Output::Offscreen { .. } => None,
        }
    }

    /// The offscreen frame of a headless engine.
    pub fn frame_texture(&self) -> Option<&Texture> {
        match &self.output {
            Output::Surface { .. } => None,
            Output::Offscreen { texture } => Some(texture),
        }
    }

    pub fn frames_submitted(&self) -> u64 {
        self.frames_submitted
    }

    /// Attach `scene`, replacing the current one, and refresh its transforms.
    /// The replaced scene is returned untouched.
    pub fn set_scene(&mut self, scene: Scene) -> Option<Scene> {
        scene.update_camera_transform();
        self.scene.replace(scene)
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn scene_mut(&mut self) -> Option<&mut Scene> {
        self.scene.as_mut()
    }

    pub fn take_scene(&mut self) -> Option<Scene> {
        self.scene.take()
    }

    /// Resize the output and recreate the color and depth targets. The old
    /// targets are released before the new ones are created. A zero-sized
    /// output (e.g. a minimized window) is ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let size = [width, height];
        let device = &self.ctx.device;
        match &mut self.output {
            Output::Surface {
                surface, config, ..
            } => {
                config.width = width;
                config.height = height;
                surface.configure(device, config);
            }
            Output::Offscreen { texture } => {
                texture.destroy();
                *texture = Texture::create_render_target(device, size, self.ctx.target.format, "offscreen_frame");
            }
        }
        self.targets.replace(device, size, &self.ctx.target);
        log::debug!("resized to {width}x{height}");
    }

    /// Draw the attached scene into the output. Without a scene nothing is
    /// recorded or submitted.
    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let Some(scene) = &self.scene else {
            return Ok(());
        };

        let (frame, frame_view) = match &self.output {
            Output::Surface { surface, .. } => {
                let frame = surface.get_current_texture()?;
                let view = frame
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                (Some(frame), view)
            }
            Output::Offscreen { texture } => (None, texture.view.clone()),
        };
        let (view, resolve_target) = match &self.targets.multisampled {
            Some(msaa) => (&msaa.view, Some(&frame_view)),
            None => (&frame_view, None),
        };

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.config.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            scene.render(&mut render_pass);
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        self.frames_submitted += 1;

        if let Some(frame) = frame {
            frame.present();
        }
        Ok(())
    }
}
