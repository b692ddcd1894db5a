#![allow(dead_code)]

use std::{cell::RefCell, rc::Rc};

use gpulab::{
    camera::{Camera, CameraOptions, SharedCamera},
    context::{InitContext, TargetConfig},
    engine::{Engine, EngineConfig},
    render::WriteRecorder,
};

pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// A device that validates every call but never touches a GPU.
pub fn noop_device() -> (wgpu::Device, wgpu::Queue) {
    wgpu::Device::noop(&wgpu::DeviceDescriptor::default())
}

pub fn noop_ctx() -> InitContext {
    let (device, queue) = noop_device();
    InitContext::new(device, queue, TargetConfig::new(FORMAT, 1))
}

/// A noop context whose buffer uploads are recorded.
pub fn recording_ctx() -> (InitContext, Rc<WriteRecorder>) {
    let (device, queue) = noop_device();
    let recorder = Rc::new(WriteRecorder::new(queue.clone()));
    let ctx = InitContext::new(device, queue, TargetConfig::new(FORMAT, 1)).with_writer(recorder.clone());
    (ctx, recorder)
}

pub fn noop_engine(size: [u32; 2]) -> Engine {
    let (device, queue) = noop_device();
    Engine::headless(
        device,
        queue,
        FORMAT,
        size,
        EngineConfig {
            sample_count: 1,
            ..Default::default()
        },
    )
}

pub fn camera_at(position: [f32; 3]) -> SharedCamera {
    Camera::new(CameraOptions {
        position: position.into(),
        ..Default::default()
    })
    .shared()
}

pub fn shared<T>(value: T) -> Rc<RefCell<T>> {
    Rc::new(RefCell::new(value))
}

fn pad(bytes: &mut Vec<u8>, with: u8) {
    while bytes.len() % 4 != 0 {
        bytes.push(with);
    }
}

/// Pack a JSON document and a binary chunk into a `.glb` blob.
pub fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
    let mut json = json.as_bytes().to_vec();
    pad(&mut json, b' ');
    let mut bin = bin.to_vec();
    pad(&mut bin, 0);

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(b"JSON");
    out.extend_from_slice(&json);
    out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    out.extend_from_slice(b"BIN\0");
    out.extend_from_slice(&bin);
    out
}

/// A single-triangle model under a node translated by `[1, 2, 3]`.
/// Without `indexed` the primitive has no index buffer. With `image` the
/// material samples those bytes as an embedded PNG.
pub fn triangle_glb(indexed: bool, image: Option<&[u8]>) -> Vec<u8> {
    let mut bin = Vec::new();
    for position in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
        bin.extend_from_slice(bytemuck::cast_slice(&position));
    }
    let mut views = vec![r#"{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }"#.to_string()];
    let mut accessors = vec![
        r#"{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0, 0, 0], "max": [1, 1, 0] }"#
            .to_string(),
    ];
    let mut primitive = r#""attributes": { "POSITION": 0 }"#.to_string();

    if indexed {
        let offset = bin.len();
        bin.extend_from_slice(bytemuck::cast_slice(&[0u16, 1, 2]));
        pad(&mut bin, 0);
        views.push(format!(
            r#"{{ "buffer": 0, "byteOffset": {offset}, "byteLength": 6 }}"#
        ));
        accessors.push(format!(
            r#"{{ "bufferView": {}, "componentType": 5123, "count": 3, "type": "SCALAR" }}"#,
            views.len() - 1
        ));
        primitive.push_str(&format!(r#", "indices": {}"#, accessors.len() - 1));
    }

    let mut material = String::new();
    if let Some(image) = image {
        let offset = bin.len();
        bin.extend_from_slice(image);
        pad(&mut bin, 0);
        views.push(format!(
            r#"{{ "buffer": 0, "byteOffset": {offset}, "byteLength": {} }}"#,
            image.len()
        ));
        material = format!(
            r#", "materials": [{{ "pbrMetallicRoughness": {{ "baseColorTexture": {{ "index": 0 }} }} }}],
                "textures": [{{ "source": 0 }}],
                "images": [{{ "bufferView": {}, "mimeType": "image/png" }}]"#,
            views.len() - 1
        );
        primitive.push_str(r#", "material": 0"#);
    }

    let json = format!(
        r#"{{
            "asset": {{ "version": "2.0" }},
            "scene": 0,
            "scenes": [{{ "nodes": [0] }}],
            "nodes": [{{ "mesh": 0, "translation": [1, 2, 3] }}],
            "meshes": [{{ "name": "tri", "primitives": [{{ {primitive} }}] }}],
            "buffers": [{{ "byteLength": {} }}],
            "bufferViews": [{}],
            "accessors": [{}]{material}
        }}"#,
        bin.len(),
        views.join(", "),
        accessors.join(", "),
    );
    glb(&json, &bin)
}

/// A 2x2 PNG of one colour.
pub fn png(colour: [u8; 4]) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(2, 2, image::Rgba(colour));
    let mut bytes = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, image::ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}

/// Copy the offscreen frame of a headless engine back to the CPU.
#[cfg(feature = "integration-tests")]
pub fn read_frame(engine: &Engine) -> image::RgbaImage {
    use std::time::Duration;

    let ctx = engine.ctx();
    let frame = engine.frame_texture().expect("headless engine");
    let [width, height] = engine.size();
    let u32_size = std::mem::size_of::<u32>() as u32;
    assert_eq!(
        (u32_size * width) % wgpu::COPY_BYTES_PER_ROW_ALIGNMENT,
        0,
        "pick a width whose rows need no padding"
    );

    let output_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        size: (u32_size * width * height) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        label: Some("Readback Buffer"),
        mapped_at_creation: false,
    });
    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture: &frame.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &output_buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(u32_size * width),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    ctx.queue.submit(std::iter::once(encoder.finish()));

    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
    let buffer_slice = output_buffer.slice(..);
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        tx.send(result).unwrap();
    });
    ctx.device
        .poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: Some(Duration::from_secs(3)),
        })
        .unwrap();
    futures::executor::block_on(rx.receive()).unwrap().unwrap();
    let data = buffer_slice.get_mapped_range().to_vec();
    image::RgbaImage::from_raw(width, height, data).unwrap()
}
