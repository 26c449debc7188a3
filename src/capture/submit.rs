use std::slice;

use ash::vk;

use crate::ExternalMemorySubmit;

// Owned copy of a single vkQueueSubmit batch
// The capture rebuilds the batch list, so it keeps its own handles instead of raw pointers
#[derive(Clone, Debug, Default)]
pub struct SubmitBatch {
    pub wait_semaphores: Vec<vk::Semaphore>,
    pub wait_dst_stage_masks: Vec<vk::PipelineStageFlags>,
    pub command_buffers: Vec<vk::CommandBuffer>,
    pub signal_semaphores: Vec<vk::Semaphore>,
}

impl SubmitBatch {
    pub fn with_command_buffers(command_buffers: Vec<vk::CommandBuffer>) -> Self {
        Self {
            command_buffers,
            ..Default::default()
        }
    }

    // Copy the arrays of an intercepted submit info
    // The pointers of the info must be valid for their counts, null pointers read as empty
    pub unsafe fn from_raw(info: &vk::SubmitInfo<'_>) -> Self {
        Self {
            wait_semaphores: raw_slice(info.p_wait_semaphores, info.wait_semaphore_count).to_vec(),
            wait_dst_stage_masks: raw_slice(info.p_wait_dst_stage_mask, info.wait_semaphore_count).to_vec(),
            command_buffers: raw_slice(info.p_command_buffers, info.command_buffer_count).to_vec(),
            signal_semaphores: raw_slice(info.p_signal_semaphores, info.signal_semaphore_count).to_vec(),
        }
    }
}

unsafe fn raw_slice<'a, T>(ptr: *const T, count: u32) -> &'a [T] {
    if ptr.is_null() || count == 0 {
        &[]
    } else {
        slice::from_raw_parts(ptr, count as usize)
    }
}

// Build the batches that actually get handed to the driver
// Every original command buffer with staging work is preceded by its relay command buffer
// The trailing batch only holds the command buffer that makes the staging buffer host visible
pub fn rebuild_submits(submits: &[ExternalMemorySubmit], trailing: vk::CommandBuffer) -> Vec<SubmitBatch> {
    let mut batches = submits
        .iter()
        .map(|submit| {
            let mut command_buffers = Vec::with_capacity(submit.batch.command_buffers.len() * 2);
            for (original, staged) in submit.batch.command_buffers.iter().zip(&submit.command_buffers) {
                if !staged.is_empty() {
                    command_buffers.push(staged.staging_command_buffer);
                }
                command_buffers.push(*original);
            }

            SubmitBatch {
                command_buffers,
                ..submit.batch.clone()
            }
        })
        .collect::<Vec<_>>();

    batches.push(SubmitBatch::with_command_buffers(vec![trailing]));
    batches
}
