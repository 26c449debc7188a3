#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::ffi::c_void;

use ash::prelude::VkResult;
use ash::vk::{self, Handle};
use external_capture::*;
use parking_lot::Mutex;

pub const DEVICE: u64 = 0xD0;
pub const PHYSICAL_DEVICE: u64 = 0xE0;
pub const QUEUE: u64 = 0xF0;
pub const QUEUE_FAMILY: u32 = 2;

// Every device call the capture made, in order
#[derive(Clone, Debug)]
pub enum Call {
    CreateCommandPool(vk::CommandPoolCreateFlags, u32),
    DestroyCommandPool(vk::CommandPool),
    AllocateCommandBuffers(u32),
    SetDispatch(vk::CommandBuffer),
    CreateFence,
    DestroyFence(vk::Fence),
    WaitForFences(Vec<vk::Fence>, u64),
    CreateBuffer(vk::DeviceSize, vk::BufferUsageFlags, vk::SharingMode),
    DestroyBuffer(vk::Buffer),
    AllocateMemory(vk::DeviceSize, u32),
    FreeMemory(vk::DeviceMemory),
    BindBufferMemory(vk::Buffer, vk::DeviceMemory, vk::DeviceSize),
    MapMemory(vk::DeviceMemory),
    Invalidate(vk::DeviceMemory),
    UnmapMemory(vk::DeviceMemory),
    Begin(vk::CommandBuffer),
    End(vk::CommandBuffer),
    PipelineBarrier {
        command_buffer: vk::CommandBuffer,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
        buffers: Vec<BufferBarrier>,
        images: Vec<ImageBarrier>,
    },
    CopyBuffer(vk::CommandBuffer, vk::Buffer, vk::Buffer, Vec<vk::BufferCopy>),
    CopyImageToBuffer(vk::CommandBuffer, vk::Image, vk::ImageLayout, vk::Buffer, Vec<vk::BufferImageCopy>),
    Submit(vk::Queue, Vec<SubmitBatch>, vk::Fence),
}

#[derive(Default)]
struct Inner {
    next_handle: u64,
    calls: Vec<Call>,
    live: HashSet<u64>,
    buffer_sizes: HashMap<u64, vk::DeviceSize>,
    memory: HashMap<u64, Box<[u8]>>,
    failures: HashMap<&'static str, vk::Result>,
}

impl Inner {
    fn create(&mut self) -> u64 {
        self.next_handle += 1;
        let raw = 0x1000 + self.next_handle;
        self.live.insert(raw);
        raw
    }

    fn destroy(&mut self, raw: u64) {
        assert!(self.live.remove(&raw), "destroyed {raw:#x} twice or never created it");
    }

    fn check(&self, name: &'static str) -> VkResult<()> {
        match self.failures.get(name) {
            Some(result) => Err(*result),
            None => Ok(()),
        }
    }
}

// Device that records every call and backs memory with host allocations
pub struct FakeDevice {
    inner: Mutex<Inner>,
    memory_type_bits: u32,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self::with_memory_type_bits(u32::MAX)
    }

    pub fn with_memory_type_bits(memory_type_bits: u32) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            memory_type_bits,
        }
    }

    // Make the named entry point fail with the given result
    pub fn fail(&self, name: &'static str, result: vk::Result) {
        self.inner.lock().failures.insert(name, result);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().calls.clone()
    }

    // Number of objects created and not destroyed yet
    pub fn live_objects(&self) -> usize {
        self.inner.lock().live.len()
    }

    pub fn submits(&self) -> Vec<(vk::Queue, Vec<SubmitBatch>, vk::Fence)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Submit(queue, batches, fence) => Some((queue, batches, fence)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.inner.lock().calls.iter().filter(|call| matches(call)).count()
    }

    fn log(&self, call: Call) {
        self.inner.lock().calls.push(call);
    }
}

impl DeviceFns for FakeDevice {
    fn handle(&self) -> vk::Device {
        vk::Device::from_raw(DEVICE)
    }

    unsafe fn create_command_pool(&self, info: &vk::CommandPoolCreateInfo<'_>) -> VkResult<vk::CommandPool> {
        self.log(Call::CreateCommandPool(info.flags, info.queue_family_index));
        let mut inner = self.inner.lock();
        inner.check("create_command_pool")?;
        Ok(vk::CommandPool::from_raw(inner.create()))
    }

    unsafe fn destroy_command_pool(&self, pool: vk::CommandPool) {
        self.log(Call::DestroyCommandPool(pool));
        self.inner.lock().destroy(pool.as_raw());
    }

    unsafe fn allocate_command_buffers(
        &self,
        info: &vk::CommandBufferAllocateInfo<'_>,
    ) -> VkResult<Vec<vk::CommandBuffer>> {
        self.log(Call::AllocateCommandBuffers(info.command_buffer_count));
        let mut inner = self.inner.lock();
        inner.check("allocate_command_buffers")?;

        // Command buffers die with their pool, so they are not tracked as live objects
        Ok((0..info.command_buffer_count)
            .map(|_| {
                inner.next_handle += 1;
                vk::CommandBuffer::from_raw(0x8000 + inner.next_handle)
            })
            .collect())
    }

    unsafe fn set_dispatch_from_parent(&self, command_buffer: vk::CommandBuffer) {
        self.log(Call::SetDispatch(command_buffer));
    }

    unsafe fn create_fence(&self, _info: &vk::FenceCreateInfo<'_>) -> VkResult<vk::Fence> {
        self.log(Call::CreateFence);
        let mut inner = self.inner.lock();
        inner.check("create_fence")?;
        Ok(vk::Fence::from_raw(inner.create()))
    }

    unsafe fn destroy_fence(&self, fence: vk::Fence) {
        self.log(Call::DestroyFence(fence));
        self.inner.lock().destroy(fence.as_raw());
    }

    unsafe fn wait_for_fences(&self, fences: &[vk::Fence], _wait_all: bool, timeout: u64) -> VkResult<()> {
        self.log(Call::WaitForFences(fences.to_vec(), timeout));
        let inner = self.inner.lock();
        if timeout != u64::MAX {
            if let Some(result) = inner.failures.get("wait_for_fences_timeout") {
                return Err(*result);
            }
        }
        inner.check("wait_for_fences")
    }

    unsafe fn create_buffer(&self, info: &vk::BufferCreateInfo<'_>) -> VkResult<vk::Buffer> {
        self.log(Call::CreateBuffer(info.size, info.usage, info.sharing_mode));
        let mut inner = self.inner.lock();
        inner.check("create_buffer")?;
        let raw = inner.create();
        inner.buffer_sizes.insert(raw, info.size);
        Ok(vk::Buffer::from_raw(raw))
    }

    unsafe fn destroy_buffer(&self, buffer: vk::Buffer) {
        self.log(Call::DestroyBuffer(buffer));
        self.inner.lock().destroy(buffer.as_raw());
    }

    unsafe fn get_buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements {
        let size = self.inner.lock().buffer_sizes.get(&buffer.as_raw()).copied().unwrap_or(0);
        vk::MemoryRequirements {
            size: size.next_multiple_of(256),
            alignment: 256,
            memory_type_bits: self.memory_type_bits,
        }
    }

    unsafe fn allocate_memory(&self, info: &vk::MemoryAllocateInfo<'_>) -> VkResult<vk::DeviceMemory> {
        self.log(Call::AllocateMemory(info.allocation_size, info.memory_type_index));
        let mut inner = self.inner.lock();
        inner.check("allocate_memory")?;
        let raw = inner.create();

        // Recognizable contents, byte i holds i mod 251
        let contents = (0..info.allocation_size).map(|i| (i % 251) as u8).collect();
        inner.memory.insert(raw, contents);
        Ok(vk::DeviceMemory::from_raw(raw))
    }

    unsafe fn free_memory(&self, memory: vk::DeviceMemory) {
        self.log(Call::FreeMemory(memory));
        let mut inner = self.inner.lock();
        inner.destroy(memory.as_raw());
        inner.memory.remove(&memory.as_raw());
    }

    unsafe fn bind_buffer_memory(
        &self,
        buffer: vk::Buffer,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
    ) -> VkResult<()> {
        self.log(Call::BindBufferMemory(buffer, memory, offset));
        self.inner.lock().check("bind_buffer_memory")
    }

    unsafe fn map_memory(
        &self,
        memory: vk::DeviceMemory,
        _offset: vk::DeviceSize,
        _size: vk::DeviceSize,
    ) -> VkResult<*mut c_void> {
        self.log(Call::MapMemory(memory));
        let mut inner = self.inner.lock();
        inner.check("map_memory")?;
        let contents = inner
            .memory
            .get_mut(&memory.as_raw())
            .ok_or(vk::Result::ERROR_MEMORY_MAP_FAILED)?;
        Ok(contents.as_mut_ptr() as *mut c_void)
    }

    unsafe fn invalidate_mapped_memory_ranges(&self, ranges: &[vk::MappedMemoryRange<'_>]) -> VkResult<()> {
        for range in ranges {
            self.log(Call::Invalidate(range.memory));
        }
        self.inner.lock().check("invalidate_mapped_memory_ranges")
    }

    unsafe fn unmap_memory(&self, memory: vk::DeviceMemory) {
        self.log(Call::UnmapMemory(memory));
    }

    unsafe fn begin_command_buffer(
        &self,
        command_buffer: vk::CommandBuffer,
        _info: &vk::CommandBufferBeginInfo<'_>,
    ) -> VkResult<()> {
        self.log(Call::Begin(command_buffer));
        self.inner.lock().check("begin_command_buffer")
    }

    unsafe fn end_command_buffer(&self, command_buffer: vk::CommandBuffer) -> VkResult<()> {
        self.log(Call::End(command_buffer));
        self.inner.lock().check("end_command_buffer")
    }

    unsafe fn cmd_pipeline_barrier(
        &self,
        command_buffer: vk::CommandBuffer,
        src_stage_mask: vk::PipelineStageFlags,
        dst_stage_mask: vk::PipelineStageFlags,
        buffer_memory_barriers: &[vk::BufferMemoryBarrier<'_>],
        image_memory_barriers: &[vk::ImageMemoryBarrier<'_>],
    ) {
        self.log(Call::PipelineBarrier {
            command_buffer,
            src_stage: src_stage_mask,
            dst_stage: dst_stage_mask,
            buffers: buffer_memory_barriers.iter().map(BufferBarrier::from).collect(),
            images: image_memory_barriers.iter().map(ImageBarrier::from).collect(),
        });
    }

    unsafe fn cmd_copy_buffer(
        &self,
        command_buffer: vk::CommandBuffer,
        src: vk::Buffer,
        dst: vk::Buffer,
        regions: &[vk::BufferCopy],
    ) {
        self.log(Call::CopyBuffer(command_buffer, src, dst, regions.to_vec()));
    }

    unsafe fn cmd_copy_image_to_buffer(
        &self,
        command_buffer: vk::CommandBuffer,
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Buffer,
        regions: &[vk::BufferImageCopy],
    ) {
        self.log(Call::CopyImageToBuffer(command_buffer, src, src_layout, dst, regions.to_vec()));
    }

    unsafe fn queue_submit(&self, queue: vk::Queue, batches: &[SubmitBatch], fence: vk::Fence) -> VkResult<()> {
        self.log(Call::Submit(queue, batches.to_vec(), fence));
        self.inner.lock().check("queue_submit")
    }
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn queue() -> vk::Queue {
    vk::Queue::from_raw(QUEUE)
}

// Tracked state with one queue whose physical device has the given memory types
pub fn state(memory_types: &[vk::MemoryPropertyFlags]) -> State {
    let mut memory_properties = vk::PhysicalDeviceMemoryProperties::default();
    memory_properties.memory_type_count = memory_types.len() as u32;
    for (i, flags) in memory_types.iter().enumerate() {
        memory_properties.memory_types[i].property_flags = *flags;
    }

    let mut state = State::default();
    state.queues.insert(
        queue(),
        QueueObject {
            family: QUEUE_FAMILY,
            device: vk::Device::from_raw(DEVICE),
        },
    );
    state.devices.insert(
        vk::Device::from_raw(DEVICE),
        DeviceObject {
            physical_device: vk::PhysicalDevice::from_raw(PHYSICAL_DEVICE),
        },
    );
    state.physical_devices.insert(
        vk::PhysicalDevice::from_raw(PHYSICAL_DEVICE),
        PhysicalDeviceObject { memory_properties },
    );
    state
}

pub fn host_state() -> State {
    state(&[
        vk::MemoryPropertyFlags::DEVICE_LOCAL,
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
    ])
}

// Dense color image bound to memory, every subresource in the given layout
pub fn color_image(width: u32, height: u32, mip_levels: u32, layout: vk::ImageLayout) -> ImageObject {
    let info = ImageInfo {
        format: vk::Format::R8G8B8A8_UNORM,
        extent: vk::Extent3D {
            width,
            height,
            depth: 1,
        },
        mip_levels,
        array_layers: 1,
        ..Default::default()
    };

    let mut image = ImageObject::new(info, vk::ImageAspectFlags::COLOR, layout);
    image.plane_memory = Some(PlaneMemoryInfo {
        bound_memory: Some(vk::DeviceMemory::from_raw(0x77)),
        memory_requirements: vk::MemoryRequirements::default(),
    });
    image
}

// Barrier that takes the image from the external queue family into ours
pub fn acquire_image(image: vk::Image, level_count: u32) -> ExternalBarrier {
    ExternalBarrier::Image(ImageBarrier {
        transfer: OwnershipTransfer {
            src_access_mask: vk::AccessFlags::empty(),
            dst_access_mask: vk::AccessFlags::SHADER_READ,
            src_queue_family_index: vk::QUEUE_FAMILY_EXTERNAL,
            dst_queue_family_index: QUEUE_FAMILY,
        },
        image,
        old_layout: vk::ImageLayout::GENERAL,
        new_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        subresource_range: vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count,
            base_array_layer: 0,
            layer_count: 1,
        },
    })
}

pub fn acquire_buffer(buffer: vk::Buffer, offset: vk::DeviceSize, size: vk::DeviceSize) -> ExternalBarrier {
    ExternalBarrier::Buffer(BufferBarrier {
        transfer: OwnershipTransfer {
            src_access_mask: vk::AccessFlags::empty(),
            dst_access_mask: vk::AccessFlags::VERTEX_ATTRIBUTE_READ,
            src_queue_family_index: vk::QUEUE_FAMILY_EXTERNAL,
            dst_queue_family_index: QUEUE_FAMILY,
        },
        buffer,
        offset,
        size,
    })
}
