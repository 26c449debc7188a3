use std::ffi::c_void;

use ash::prelude::VkResult;
use ash::vk::{self, Handle};

use crate::SubmitBatch;

// Device level entry points used while capturing external memory
// Every call mirrors the Vulkan command of the same name
pub trait DeviceFns {
    fn handle(&self) -> vk::Device;

    unsafe fn create_command_pool(&self, info: &vk::CommandPoolCreateInfo<'_>) -> VkResult<vk::CommandPool>;
    unsafe fn destroy_command_pool(&self, pool: vk::CommandPool);
    unsafe fn allocate_command_buffers(
        &self,
        info: &vk::CommandBufferAllocateInfo<'_>,
    ) -> VkResult<Vec<vk::CommandBuffer>>;

    // Command buffers allocated below the loader must share the loader dispatch table of their device
    unsafe fn set_dispatch_from_parent(&self, _command_buffer: vk::CommandBuffer) {}

    unsafe fn create_fence(&self, info: &vk::FenceCreateInfo<'_>) -> VkResult<vk::Fence>;
    unsafe fn destroy_fence(&self, fence: vk::Fence);
    unsafe fn wait_for_fences(&self, fences: &[vk::Fence], wait_all: bool, timeout: u64) -> VkResult<()>;

    unsafe fn create_buffer(&self, info: &vk::BufferCreateInfo<'_>) -> VkResult<vk::Buffer>;
    unsafe fn destroy_buffer(&self, buffer: vk::Buffer);
    unsafe fn get_buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements;

    unsafe fn allocate_memory(&self, info: &vk::MemoryAllocateInfo<'_>) -> VkResult<vk::DeviceMemory>;
    unsafe fn free_memory(&self, memory: vk::DeviceMemory);
    unsafe fn bind_buffer_memory(
        &self,
        buffer: vk::Buffer,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
    ) -> VkResult<()>;
    unsafe fn map_memory(
        &self,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
        size: vk::DeviceSize,
    ) -> VkResult<*mut c_void>;
    unsafe fn invalidate_mapped_memory_ranges(&self, ranges: &[vk::MappedMemoryRange<'_>]) -> VkResult<()>;
    unsafe fn unmap_memory(&self, memory: vk::DeviceMemory);

    unsafe fn begin_command_buffer(
        &self,
        command_buffer: vk::CommandBuffer,
        info: &vk::CommandBufferBeginInfo<'_>,
    ) -> VkResult<()>;
    unsafe fn end_command_buffer(&self, command_buffer: vk::CommandBuffer) -> VkResult<()>;
    unsafe fn cmd_pipeline_barrier(
        &self,
        command_buffer: vk::CommandBuffer,
        src_stage_mask: vk::PipelineStageFlags,
        dst_stage_mask: vk::PipelineStageFlags,
        buffer_memory_barriers: &[vk::BufferMemoryBarrier<'_>],
        image_memory_barriers: &[vk::ImageMemoryBarrier<'_>],
    );
    unsafe fn cmd_copy_buffer(
        &self,
        command_buffer: vk::CommandBuffer,
        src: vk::Buffer,
        dst: vk::Buffer,
        regions: &[vk::BufferCopy],
    );
    unsafe fn cmd_copy_image_to_buffer(
        &self,
        command_buffer: vk::CommandBuffer,
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Buffer,
        regions: &[vk::BufferImageCopy],
    );

    unsafe fn queue_submit(&self, queue: vk::Queue, batches: &[SubmitBatch], fence: vk::Fence) -> VkResult<()>;
}

impl DeviceFns for ash::Device {
    fn handle(&self) -> vk::Device {
        ash::Device::handle(self)
    }

    unsafe fn create_command_pool(&self, info: &vk::CommandPoolCreateInfo<'_>) -> VkResult<vk::CommandPool> {
        ash::Device::create_command_pool(self, info, None)
    }

    unsafe fn destroy_command_pool(&self, pool: vk::CommandPool) {
        ash::Device::destroy_command_pool(self, pool, None)
    }

    unsafe fn allocate_command_buffers(
        &self,
        info: &vk::CommandBufferAllocateInfo<'_>,
    ) -> VkResult<Vec<vk::CommandBuffer>> {
        ash::Device::allocate_command_buffers(self, info)
    }

    unsafe fn set_dispatch_from_parent(&self, command_buffer: vk::CommandBuffer) {
        // The first pointer of every dispatchable object is its loader dispatch table
        let child = command_buffer.as_raw() as *mut *const c_void;
        let parent = ash::Device::handle(self).as_raw() as *const *const c_void;
        *child = *parent;
    }

    unsafe fn create_fence(&self, info: &vk::FenceCreateInfo<'_>) -> VkResult<vk::Fence> {
        ash::Device::create_fence(self, info, None)
    }

    unsafe fn destroy_fence(&self, fence: vk::Fence) {
        ash::Device::destroy_fence(self, fence, None)
    }

    unsafe fn wait_for_fences(&self, fences: &[vk::Fence], wait_all: bool, timeout: u64) -> VkResult<()> {
        ash::Device::wait_for_fences(self, fences, wait_all, timeout)
    }

    unsafe fn create_buffer(&self, info: &vk::BufferCreateInfo<'_>) -> VkResult<vk::Buffer> {
        ash::Device::create_buffer(self, info, None)
    }

    unsafe fn destroy_buffer(&self, buffer: vk::Buffer) {
        ash::Device::destroy_buffer(self, buffer, None)
    }

    unsafe fn get_buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements {
        ash::Device::get_buffer_memory_requirements(self, buffer)
    }

    unsafe fn allocate_memory(&self, info: &vk::MemoryAllocateInfo<'_>) -> VkResult<vk::DeviceMemory> {
        ash::Device::allocate_memory(self, info, None)
    }

    unsafe fn free_memory(&self, memory: vk::DeviceMemory) {
        ash::Device::free_memory(self, memory, None)
    }

    unsafe fn bind_buffer_memory(
        &self,
        buffer: vk::Buffer,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
    ) -> VkResult<()> {
        ash::Device::bind_buffer_memory(self, buffer, memory, offset)
    }

    unsafe fn map_memory(
        &self,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
        size: vk::DeviceSize,
    ) -> VkResult<*mut c_void> {
        ash::Device::map_memory(self, memory, offset, size, vk::MemoryMapFlags::empty())
    }

    unsafe fn invalidate_mapped_memory_ranges(&self, ranges: &[vk::MappedMemoryRange<'_>]) -> VkResult<()> {
        ash::Device::invalidate_mapped_memory_ranges(self, ranges)
    }

    unsafe fn unmap_memory(&self, memory: vk::DeviceMemory) {
        ash::Device::unmap_memory(self, memory)
    }

    unsafe fn begin_command_buffer(
        &self,
        command_buffer: vk::CommandBuffer,
        info: &vk::CommandBufferBeginInfo<'_>,
    ) -> VkResult<()> {
        ash::Device::begin_command_buffer(self, command_buffer, info)
    }

    unsafe fn end_command_buffer(&self, command_buffer: vk::CommandBuffer) -> VkResult<()> {
        ash::Device::end_command_buffer(self, command_buffer)
    }

    unsafe fn cmd_pipeline_barrier(
        &self,
        command_buffer: vk::CommandBuffer,
        src_stage_mask: vk::PipelineStageFlags,
        dst_stage_mask: vk::PipelineStageFlags,
        buffer_memory_barriers: &[vk::BufferMemoryBarrier<'_>],
        image_memory_barriers: &[vk::ImageMemoryBarrier<'_>],
    ) {
        ash::Device::cmd_pipeline_barrier(
            self,
            command_buffer,
            src_stage_mask,
            dst_stage_mask,
            vk::DependencyFlags::empty(),
            &[],
            buffer_memory_barriers,
            image_memory_barriers,
        )
    }

    unsafe fn cmd_copy_buffer(
        &self,
        command_buffer: vk::CommandBuffer,
        src: vk::Buffer,
        dst: vk::Buffer,
        regions: &[vk::BufferCopy],
    ) {
        ash::Device::cmd_copy_buffer(self, command_buffer, src, dst, regions)
    }

    unsafe fn cmd_copy_image_to_buffer(
        &self,
        command_buffer: vk::CommandBuffer,
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Buffer,
        regions: &[vk::BufferImageCopy],
    ) {
        ash::Device::cmd_copy_image_to_buffer(self, command_buffer, src, src_layout, dst, regions)
    }

    unsafe fn queue_submit(&self, queue: vk::Queue, batches: &[SubmitBatch], fence: vk::Fence) -> VkResult<()> {
        let infos = batches
            .iter()
            .map(|batch| {
                vk::SubmitInfo::default()
                    .wait_semaphores(&batch.wait_semaphores)
                    .wait_dst_stage_mask(&batch.wait_dst_stage_masks)
                    .command_buffers(&batch.command_buffers)
                    .signal_semaphores(&batch.signal_semaphores)
            })
            .collect::<Vec<_>>();
        ash::Device::queue_submit(self, queue, &infos, fence)
    }
}
