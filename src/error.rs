use ash::vk;
use thiserror::Error;

use crate::CapturePhase;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Queue {0:?} is not tracked")]
    UnknownQueue(vk::Queue),

    #[error("Device {0:?} is not tracked")]
    UnknownDevice(vk::Device),

    #[error("Physical device {0:?} is not tracked")]
    UnknownPhysicalDevice(vk::PhysicalDevice),

    #[error("Could not create the staging command pool")]
    CreateCommandPool(#[source] vk::Result),

    #[error("Could not create the staging fence")]
    CreateFence(#[source] vk::Result),

    #[error("Could not allocate the staging command buffers")]
    AllocateCommandBuffers(#[source] vk::Result),

    #[error("Could not create the staging buffer")]
    CreateBuffer(#[source] vk::Result),

    #[error("No host visible memory type fits the staging buffer")]
    NoStagingMemoryType,

    #[error("Could not allocate the staging memory")]
    AllocateMemory(#[source] vk::Result),

    #[error("Could not bind the staging memory")]
    BindBufferMemory(#[source] vk::Result),

    #[error("Could not begin a staging command buffer")]
    BeginCommandBuffer(#[source] vk::Result),

    #[error("Could not end a staging command buffer")]
    EndCommandBuffer(#[source] vk::Result),

    #[error("Could not submit the staged batches")]
    QueueSubmit(#[source] vk::Result),

    #[error("Could not wait for the staging fence")]
    WaitForFence(#[source] vk::Result),

    #[error("Could not map the staging memory")]
    MapMemory(#[source] vk::Result),

    #[error("Could not invalidate the staging memory")]
    InvalidateMemory(#[source] vk::Result),
}

impl CaptureError {
    // Status code handed back to the application when the capture gives up
    pub fn result(&self) -> vk::Result {
        match self {
            CaptureError::UnknownQueue(_)
            | CaptureError::UnknownDevice(_)
            | CaptureError::UnknownPhysicalDevice(_) => vk::Result::ERROR_INITIALIZATION_FAILED,
            CaptureError::NoStagingMemoryType => vk::Result::ERROR_OUT_OF_DEVICE_MEMORY,
            CaptureError::CreateCommandPool(result)
            | CaptureError::CreateFence(result)
            | CaptureError::AllocateCommandBuffers(result)
            | CaptureError::CreateBuffer(result)
            | CaptureError::AllocateMemory(result)
            | CaptureError::BindBufferMemory(result)
            | CaptureError::BeginCommandBuffer(result)
            | CaptureError::EndCommandBuffer(result)
            | CaptureError::QueueSubmit(result)
            | CaptureError::WaitForFence(result)
            | CaptureError::MapMemory(result)
            | CaptureError::InvalidateMemory(result) => *result,
        }
    }

    pub fn phase(&self) -> CapturePhase {
        match self {
            CaptureError::UnknownQueue(_)
            | CaptureError::UnknownDevice(_)
            | CaptureError::UnknownPhysicalDevice(_) => CapturePhase::Planning,
            CaptureError::CreateCommandPool(_)
            | CaptureError::CreateFence(_)
            | CaptureError::AllocateCommandBuffers(_)
            | CaptureError::CreateBuffer(_)
            | CaptureError::NoStagingMemoryType
            | CaptureError::AllocateMemory(_)
            | CaptureError::BindBufferMemory(_) => CapturePhase::ResourceCreation,
            CaptureError::BeginCommandBuffer(_) | CaptureError::EndCommandBuffer(_) => CapturePhase::Recording,
            CaptureError::QueueSubmit(_) => CapturePhase::Submission,
            CaptureError::WaitForFence(_) | CaptureError::MapMemory(_) | CaptureError::InvalidateMemory(_) => {
                CapturePhase::Readback
            }
        }
    }

    // Failures after the batches reached the queue only lose the capture
    pub fn is_readback(&self) -> bool {
        self.phase() == CapturePhase::Readback
    }
}
