//! Draw submission seam.
//!
//! Renderables never talk to [`wgpu::RenderPass`] directly. They issue their
//! commands through [`PassEncoder`], which the engine implements for the real
//! render pass and which [`DrawRecorder`] implements to capture the draw stream
//! without a GPU (used to check ordering and instancing). Buffer uploads go
//! through [`BufferWriter`] the same way, with [`WriteRecorder`] keeping a
//! copy of every upload.

use std::{cell::RefCell, ops::Range};

/// The subset of render pass commands renderables use. Whole buffers are
/// always bound.
pub trait PassEncoder {
    fn set_pipeline(&mut self, pipeline: &wgpu::RenderPipeline);
    fn set_bind_group(&mut self, index: u32, bind_group: &wgpu::BindGroup);
    fn set_vertex_buffer(&mut self, slot: u32, buffer: &wgpu::Buffer);
    fn set_index_buffer(&mut self, buffer: &wgpu::Buffer, format: wgpu::IndexFormat);
    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>);
    fn draw_indexed(&mut self, indices: Range<u32>, instances: Range<u32>);
}

impl PassEncoder for wgpu::RenderPass<'_> {
    fn set_pipeline(&mut self, pipeline: &wgpu::RenderPipeline) {
        wgpu::RenderPass::set_pipeline(self, pipeline);
    }

    fn set_bind_group(&mut self, index: u32, bind_group: &wgpu::BindGroup) {
        wgpu::RenderPass::set_bind_group(self, index, bind_group, &[]);
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: &wgpu::Buffer) {
        wgpu::RenderPass::set_vertex_buffer(self, slot, buffer.slice(..));
    }

    fn set_index_buffer(&mut self, buffer: &wgpu::Buffer, format: wgpu::IndexFormat) {
        wgpu::RenderPass::set_index_buffer(self, buffer.slice(..), format);
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        wgpu::RenderPass::draw(self, vertices, instances);
    }

    fn draw_indexed(&mut self, indices: Range<u32>, instances: Range<u32>) {
        wgpu::RenderPass::draw_indexed(self, indices, 0, instances);
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DrawCall {
    Draw {
        vertices: Range<u32>,
        instances: Range<u32>,
    },
    DrawIndexed {
        indices: Range<u32>,
        instances: Range<u32>,
    },
}

impl DrawCall {
    pub fn instance_count(&self) -> u32 {
        match self {
            DrawCall::Draw { instances, .. } | DrawCall::DrawIndexed { instances, .. } => {
                instances.end - instances.start
            }
        }
    }

    pub fn element_count(&self) -> u32 {
        match self {
            DrawCall::Draw { vertices: r, .. } | DrawCall::DrawIndexed { indices: r, .. } => {
                r.end - r.start
            }
        }
    }
}

/// Records draw calls instead of encoding them.
#[derive(Debug, Default)]
pub struct DrawRecorder {
    calls: Vec<DrawCall>,
    pipelines_set: usize,
    bind_groups_set: usize,
}

impl DrawRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    pub fn pipelines_set(&self) -> usize {
        self.pipelines_set
    }

    pub fn bind_groups_set(&self) -> usize {
        self.bind_groups_set
    }

    pub fn clear(&mut self) {
        self.calls.clear();
        self.pipelines_set = 0;
        self.bind_groups_set = 0;
    }
}

impl PassEncoder for DrawRecorder {
    fn set_pipeline(&mut self, _: &wgpu::RenderPipeline) {
        self.pipelines_set += 1;
    }

    fn set_bind_group(&mut self, _: u32, _: &wgpu::BindGroup) {
        self.bind_groups_set += 1;
    }

    fn set_vertex_buffer(&mut self, _: u32, _: &wgpu::Buffer) {}

    fn set_index_buffer(&mut self, _: &wgpu::Buffer, _: wgpu::IndexFormat) {}

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.calls.push(DrawCall::Draw {
            vertices,
            instances,
        });
    }

    fn draw_indexed(&mut self, indices: Range<u32>, instances: Range<u32>) {
        self.calls.push(DrawCall::DrawIndexed { indices, instances });
    }
}

/// Destination of buffer uploads.
pub trait BufferWriter: std::fmt::Debug {
    fn write_buffer(&self, buffer: &wgpu::Buffer, offset: wgpu::BufferAddress, data: &[u8]);
}

impl BufferWriter for wgpu::Queue {
    fn write_buffer(&self, buffer: &wgpu::Buffer, offset: wgpu::BufferAddress, data: &[u8]) {
        wgpu::Queue::write_buffer(self, buffer, offset, data);
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferWrite {
    pub buffer: wgpu::Buffer,
    pub offset: wgpu::BufferAddress,
    pub data: Vec<u8>,
}

/// Forwards uploads to a queue and records them.
#[derive(Debug)]
pub struct WriteRecorder {
    queue: wgpu::Queue,
    writes: RefCell<Vec<BufferWrite>>,
}

impl WriteRecorder {
    pub fn new(queue: wgpu::Queue) -> Self {
        Self {
            queue,
            writes: RefCell::new(Vec::new()),
        }
    }

    pub fn writes(&self) -> Vec<BufferWrite> {
        self.writes.borrow().clone()
    }

    pub fn writes_to(&self, buffer: &wgpu::Buffer) -> Vec<BufferWrite> {
        self.writes
            .borrow()
            .iter()
            .filter(|w| &w.buffer == buffer)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.writes.borrow_mut().clear();
    }
}

impl BufferWriter for WriteRecorder {
    fn write_buffer(&self, buffer: &wgpu::Buffer, offset: wgpu::BufferAddress, data: &[u8]) {
        self.queue.write_buffer(buffer, offset, data);
        self.writes.borrow_mut().push(BufferWrite {
            buffer: buffer.clone(),
            offset,
            data: data.to_vec(),
        });
    }
}
