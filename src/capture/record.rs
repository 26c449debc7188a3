use std::sync::mpsc::Sender;

use ash::vk;
use bytemuck::{Pod, Zeroable};
use parking_lot::Mutex;

// Buffer range read back from the staging buffer
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ExternalBufferRecord {
    // Position of the command buffer that carries the barrier in the original submission
    pub submit_index: u32,
    pub command_buffer_index: u32,

    pub buffer: u64,
    pub buffer_offset: u64,

    // Offset of the bytes within the captured blob
    pub data_offset: u64,
    pub size: u64,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ExternalImageRecord {
    pub image: u64,
    pub submit_index: u32,
    pub command_buffer_index: u32,
    pub aspect_mask: u32,
    pub base_mip_level: u32,
    pub level_count: u32,
    pub base_array_layer: u32,
    pub layer_count: u32,
    pub old_layout: i32,
    pub new_layout: i32,
    pub range_count: u32,
}

// One copied piece of an image, at most one aspect and one mip level
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ExternalImageRange {
    pub data_offset: u64,
    pub aspect_mask: u32,
    pub mip_level: u32,
    pub base_array_layer: u32,
    pub layer_count: u32,
    pub image_offset: [i32; 3],
    pub image_extent: [u32; 3],
}

impl From<&vk::BufferImageCopy> for ExternalImageRange {
    fn from(copy: &vk::BufferImageCopy) -> Self {
        let subresource = copy.image_subresource;
        Self {
            data_offset: copy.buffer_offset,
            aspect_mask: subresource.aspect_mask.as_raw(),
            mip_level: subresource.mip_level,
            base_array_layer: subresource.base_array_layer,
            layer_count: subresource.layer_count,
            image_offset: [copy.image_offset.x, copy.image_offset.y, copy.image_offset.z],
            image_extent: [copy.image_extent.width, copy.image_extent.height, copy.image_extent.depth],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternalImageData {
    pub record: ExternalImageRecord,
    pub ranges: Vec<ExternalImageRange>,
}

// Everything a single capture hands to the trace writer
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExternalMemoryData {
    // Size of the staging buffer, equal to the length of the blob
    pub res_size: u64,
    pub data: Vec<u8>,
    pub buffers: Vec<ExternalBufferRecord>,
    pub images: Vec<ExternalImageData>,
}

impl ExternalMemoryData {
    // Flatten the region list for the extra data of the submit command
    // Header of res_size, buffer count and image count, then the buffer records,
    // then every image record followed by its ranges, all in native byte order
    pub fn encode_extras(&self) -> Vec<u8> {
        let ranges = self.images.iter().map(|image| image.ranges.len()).sum::<usize>();
        let mut out = Vec::with_capacity(
            16 + self.buffers.len() * std::mem::size_of::<ExternalBufferRecord>()
                + self.images.len() * std::mem::size_of::<ExternalImageRecord>()
                + ranges * std::mem::size_of::<ExternalImageRange>(),
        );

        out.extend_from_slice(bytemuck::bytes_of(&self.res_size));
        out.extend_from_slice(bytemuck::bytes_of(&(self.buffers.len() as u32)));
        out.extend_from_slice(bytemuck::bytes_of(&(self.images.len() as u32)));
        out.extend_from_slice(bytemuck::cast_slice(&self.buffers));
        for image in &self.images {
            out.extend_from_slice(bytemuck::bytes_of(&image.record));
            out.extend_from_slice(bytemuck::cast_slice(&image.ranges));
        }
        out
    }
}

// Receiver of finished captures
pub trait CaptureSink {
    fn send(&self, data: ExternalMemoryData);
}

// Collects captures from every queue that shares the sink
impl CaptureSink for Mutex<Vec<ExternalMemoryData>> {
    fn send(&self, data: ExternalMemoryData) {
        self.lock().push(data);
    }
}

// Forwards captures to a writer thread
impl CaptureSink for Sender<ExternalMemoryData> {
    fn send(&self, data: ExternalMemoryData) {
        if Sender::send(self, data).is_err() {
            log::warn!("[external memory] Capture receiver is gone, dropping the capture");
        }
    }
}
