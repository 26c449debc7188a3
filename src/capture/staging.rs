use ash::vk;

use crate::{BufferBarrier, DeviceFns, ImageBarrier, SubmitBatch};

// Buffer range copied into the staging buffer
#[derive(Clone, Copy, Debug)]
pub struct ExternalBufferStaging {
    pub buffer: vk::Buffer,
    pub barrier: BufferBarrier,

    // Source offset in the buffer, destination offset in the staging buffer
    pub copy: vk::BufferCopy,
}

// Image subresource range copied into the staging buffer
#[derive(Clone, Debug)]
pub struct ExternalImageStaging {
    pub image: vk::Image,
    pub barrier: ImageBarrier,
    pub copies: Vec<vk::BufferImageCopy>,
}

// Staging work for a single command buffer of a submit
#[derive(Clone, Debug)]
pub struct ExternalMemoryCommandBuffer {
    // The application command buffer that carries the external barriers
    pub command_buffer: vk::CommandBuffer,
    pub buffers: Vec<ExternalBufferStaging>,
    pub images: Vec<ExternalImageStaging>,

    // Relay command buffer that runs right before the application one
    // Only allocated when there is something to copy
    pub staging_command_buffer: vk::CommandBuffer,
}

impl ExternalMemoryCommandBuffer {
    pub fn new(command_buffer: vk::CommandBuffer) -> Self {
        Self {
            command_buffer,
            buffers: Vec::new(),
            images: Vec::new(),
            staging_command_buffer: vk::CommandBuffer::null(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty() && self.images.is_empty()
    }
}

// Staging work for one batch of the original submission
#[derive(Clone, Debug)]
pub struct ExternalMemorySubmit {
    pub batch: SubmitBatch,

    // One entry per command buffer of the batch, in the same order
    pub command_buffers: Vec<ExternalMemoryCommandBuffer>,
}

// Vulkan objects created for a single capture
// Null handles mean the object was never created or was already destroyed
#[derive(Debug, Default)]
pub struct StagingResources {
    pub command_pool: vk::CommandPool,

    // Trailing command buffer that makes the staging writes visible to the host
    pub command_buffer: vk::CommandBuffer,

    // Only set when the capture had to create its own fence
    pub fence: vk::Fence,
    pub buffer: vk::Buffer,
    pub memory: vk::DeviceMemory,
}

impl StagingResources {
    // Destroy whatever was created, can be called any number of times
    pub unsafe fn release<D: DeviceFns + ?Sized>(&mut self, fns: &D) {
        // Destroying the pool frees every command buffer allocated from it
        if self.command_pool != vk::CommandPool::null() {
            fns.destroy_command_pool(self.command_pool);
            self.command_pool = vk::CommandPool::null();
        }
        self.command_buffer = vk::CommandBuffer::null();

        if self.buffer != vk::Buffer::null() {
            fns.destroy_buffer(self.buffer);
            self.buffer = vk::Buffer::null();
        }

        if self.memory != vk::DeviceMemory::null() {
            fns.free_memory(self.memory);
            self.memory = vk::DeviceMemory::null();
        }

        if self.fence != vk::Fence::null() {
            fns.destroy_fence(self.fence);
            self.fence = vk::Fence::null();
        }
    }
}
