//! Growable GPU buffer for the packed per-node instance stream.

use log::debug;

/// Smallest allocation, 256 instances of 16 bytes.
pub const MIN_INSTANCE_BUFFER_SIZE: u64 = 4096;

/// Capacity to allocate for `required` bytes when `current` is too small.
/// Doubles from the current size so that a camera sweeping over the terrain
/// does not reallocate every frame.
pub fn grown_capacity(current: u64, required: u64) -> u64 {
    if required <= current {
        return current;
    }
    let mut capacity = current.max(MIN_INSTANCE_BUFFER_SIZE);
    while capacity < required {
        capacity = capacity.saturating_mul(2);
    }
    capacity
}

/// Vertex buffer rewritten each frame with [`terra_cdlod::NodeInstance`] data.
pub struct InstanceBuffer {
    buffer: wgpu::Buffer,
    capacity: u64,
    len: u64,
}

impl InstanceBuffer {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            buffer: Self::allocate(device, MIN_INSTANCE_BUFFER_SIZE),
            capacity: MIN_INSTANCE_BUFFER_SIZE,
            len: 0,
        }
    }

    fn allocate(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("terrain-instances"),
            size,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Replace the contents with `bytes`, growing the buffer first if needed.
    /// The write lands before the next queue submission.
    pub fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, bytes: &[u8]) {
        let required = bytes.len() as u64;
        if required > self.capacity {
            let capacity = grown_capacity(self.capacity, required);
            debug!(
                "Growing terrain instance buffer from {} to {} bytes",
                self.capacity, capacity
            );
            self.buffer = Self::allocate(device, capacity);
            self.capacity = capacity;
        }
        if !bytes.is_empty() {
            queue.write_buffer(&self.buffer, 0, bytes);
        }
        self.len = required;
    }

    /// Slice starting at a batch's byte offset up to the written length.
    pub fn slice_from(&self, byte_offset: u64) -> wgpu::BufferSlice<'_> {
        self.buffer.slice(byte_offset.min(self.len)..self.len)
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Bytes written by the last [`InstanceBuffer::write`].
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
