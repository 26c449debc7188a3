use std::collections::HashMap;

use ash::vk;

use crate::{ExternalBarrier, ImageObject};

#[derive(Clone, Copy, Debug)]
pub struct QueueObject {
    pub family: u32,
    pub device: vk::Device,
}

#[derive(Clone, Copy, Debug)]
pub struct DeviceObject {
    pub physical_device: vk::PhysicalDevice,
}

#[derive(Clone, Copy, Debug)]
pub struct PhysicalDeviceObject {
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
}

#[derive(Clone, Copy, Debug)]
pub struct BufferObject {
    pub size: vk::DeviceSize,
}

// Read-only view of the tracked Vulkan state that the capture consumes
// Filled in by the interception layer, never modified while capturing
#[derive(Default)]
pub struct State {
    pub queues: HashMap<vk::Queue, QueueObject>,
    pub devices: HashMap<vk::Device, DeviceObject>,
    pub physical_devices: HashMap<vk::PhysicalDevice, PhysicalDeviceObject>,
    pub images: HashMap<vk::Image, ImageObject>,
    pub buffers: HashMap<vk::Buffer, BufferObject>,

    // External ownership barriers recorded in each command buffer, in recording order
    pub external_barriers: HashMap<vk::CommandBuffer, Vec<ExternalBarrier>>,
}

impl State {
    pub fn queue(&self, queue: vk::Queue) -> Option<&QueueObject> {
        self.queues.get(&queue)
    }

    pub fn device(&self, device: vk::Device) -> Option<&DeviceObject> {
        self.devices.get(&device)
    }

    pub fn physical_device(&self, physical_device: vk::PhysicalDevice) -> Option<&PhysicalDeviceObject> {
        self.physical_devices.get(&physical_device)
    }

    pub fn image(&self, image: vk::Image) -> Option<&ImageObject> {
        self.images.get(&image)
    }

    pub fn buffer(&self, buffer: vk::Buffer) -> Option<&BufferObject> {
        self.buffers.get(&buffer)
    }

    pub fn external_barriers(&self, command_buffer: vk::CommandBuffer) -> &[ExternalBarrier] {
        self.external_barriers
            .get(&command_buffer)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
