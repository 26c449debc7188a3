use std::slice;

use ash::vk::{self, Handle};

use crate::{
    buffer_image_copies, rebuild_submits, staging_memory_type_index, CaptureError, CaptureSettings, CaptureSink,
    DeviceFns, ExternalBarrier, ExternalBufferRecord, ExternalBufferStaging, ExternalImageData, ExternalImageRange,
    ExternalImageRecord, ExternalImageStaging, ExternalMemoryCommandBuffer, ExternalMemoryData, ExternalMemorySubmit,
    StagingResources, State, SubmitBatch,
};

// Where a capture currently is, cleanup can follow any of them
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapturePhase {
    Planning,
    ResourceCreation,
    Recording,
    Submission,
    Readback,
    Cleanup,
}

// Copies every external memory range that a submission acquires into a host visible staging buffer
// One instance drives the capture of a single vkQueueSubmit, the staging objects die with it
pub struct ExternalMemory<'a, D: DeviceFns + ?Sized> {
    fns: &'a D,
    settings: CaptureSettings,
    queue: vk::Queue,
    queue_family: u32,
    memory_properties: vk::PhysicalDeviceMemoryProperties,

    // Fence signalled by the trailing batch, either the caller's or staging.fence
    fence: vk::Fence,
    phase: CapturePhase,

    pub(crate) submits: Vec<ExternalMemorySubmit>,
    staging_size: vk::DeviceSize,
    staging: StagingResources,
}

impl<'a, D: DeviceFns + ?Sized> ExternalMemory<'a, D> {
    // Plan the staging copies of every batch, nothing is created on the device yet
    pub fn new(
        state: &State,
        fns: &'a D,
        settings: CaptureSettings,
        queue: vk::Queue,
        batches: &[SubmitBatch],
        fence: vk::Fence,
    ) -> Result<Self, CaptureError> {
        let queue_object = state.queue(queue).ok_or(CaptureError::UnknownQueue(queue))?;
        let device = state
            .device(queue_object.device)
            .ok_or(CaptureError::UnknownDevice(queue_object.device))?;
        let physical_device = state
            .physical_device(device.physical_device)
            .ok_or(CaptureError::UnknownPhysicalDevice(device.physical_device))?;

        let mut staging_size = 0;
        let mut submits = Vec::with_capacity(batches.len());
        for batch in batches {
            let mut command_buffers = Vec::with_capacity(batch.command_buffers.len());
            for &command_buffer in &batch.command_buffers {
                let (staged, end) = plan_command_buffer(state, command_buffer, staging_size);
                staging_size = end;
                command_buffers.push(staged);
            }

            submits.push(ExternalMemorySubmit {
                batch: batch.clone(),
                command_buffers,
            });
        }

        Ok(Self {
            fns,
            settings,
            queue,
            queue_family: queue_object.family,
            memory_properties: physical_device.memory_properties,
            fence,
            phase: CapturePhase::Planning,
            submits,
            staging_size,
            staging: StagingResources::default(),
        })
    }

    pub fn phase(&self) -> CapturePhase {
        self.phase
    }

    pub fn staging_size(&self) -> vk::DeviceSize {
        self.staging_size
    }

    pub fn submits(&self) -> &[ExternalMemorySubmit] {
        &self.submits
    }

    pub fn staging(&self) -> &StagingResources {
        &self.staging
    }

    pub fn fence(&self) -> vk::Fence {
        self.fence
    }

    // True when no command buffer of the submission needs any staging
    pub fn is_empty(&self) -> bool {
        staged_command_buffers(&self.submits).next().is_none()
    }

    // Create, record and submit in one go
    pub unsafe fn stage(&mut self) -> Result<(), CaptureError> {
        self.create_resources()?;
        self.record_command_buffers()?;
        self.submit()
    }

    // Create the pool, fence, command buffers and the staging buffer
    // Whatever got created before a failure is left for cleanup
    pub unsafe fn create_resources(&mut self) -> Result<(), CaptureError> {
        self.phase = CapturePhase::ResourceCreation;

        let pool_info = vk::CommandPoolCreateInfo::default()
            .flags(vk::CommandPoolCreateFlags::TRANSIENT)
            .queue_family_index(self.queue_family);
        self.staging.command_pool = self
            .fns
            .create_command_pool(&pool_info)
            .map_err(CaptureError::CreateCommandPool)?;

        if self.fence == vk::Fence::null() {
            self.staging.fence = self
                .fns
                .create_fence(&vk::FenceCreateInfo::default())
                .map_err(CaptureError::CreateFence)?;
            self.fence = self.staging.fence;
        }

        // One relay per command buffer with staging work, plus the trailing one
        let relays = staged_command_buffers(&self.submits).count();
        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.staging.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(relays as u32 + 1);
        let command_buffers = self
            .fns
            .allocate_command_buffers(&allocate_info)
            .map_err(CaptureError::AllocateCommandBuffers)?;
        for &command_buffer in &command_buffers {
            self.fns.set_dispatch_from_parent(command_buffer);
        }

        let mut allocated = command_buffers.into_iter();
        for staged in self
            .submits
            .iter_mut()
            .flat_map(|submit| &mut submit.command_buffers)
            .filter(|command_buffer| !command_buffer.is_empty())
        {
            staged.staging_command_buffer = allocated.next().unwrap_or_default();
        }
        self.staging.command_buffer = allocated.next().unwrap_or_default();

        let buffer_info = vk::BufferCreateInfo::default()
            .size(self.staging_size)
            .usage(vk::BufferUsageFlags::TRANSFER_DST)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        self.staging.buffer = self.fns.create_buffer(&buffer_info).map_err(CaptureError::CreateBuffer)?;

        let requirements = self.fns.get_buffer_memory_requirements(self.staging.buffer);
        let memory_type_index = staging_memory_type_index(&self.memory_properties, requirements.memory_type_bits)
            .ok_or(CaptureError::NoStagingMemoryType)?;
        let memory_info = vk::MemoryAllocateInfo::default()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);
        self.staging.memory = self
            .fns
            .allocate_memory(&memory_info)
            .map_err(CaptureError::AllocateMemory)?;
        self.fns
            .bind_buffer_memory(self.staging.buffer, self.staging.memory, 0)
            .map_err(CaptureError::BindBufferMemory)?;

        log::debug!(
            "[external memory] Created staging buffer of {} bytes with {} relay command buffers",
            self.staging_size,
            relays
        );
        Ok(())
    }

    // Record every relay command buffer, then the trailing visibility barrier
    pub unsafe fn record_command_buffers(&mut self) -> Result<(), CaptureError> {
        self.phase = CapturePhase::Recording;

        for staged in staged_command_buffers(&self.submits) {
            self.record_staging_command_buffer(staged)?;
        }

        let command_buffer = self.staging.command_buffer;
        let begin_info = vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        self.fns
            .begin_command_buffer(command_buffer, &begin_info)
            .map_err(CaptureError::BeginCommandBuffer)?;

        let barrier = vk::BufferMemoryBarrier::default()
            .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
            .dst_access_mask(vk::AccessFlags::HOST_READ)
            .src_queue_family_index(self.queue_family)
            .dst_queue_family_index(self.queue_family)
            .buffer(self.staging.buffer)
            .offset(0)
            .size(self.staging_size);
        self.fns.cmd_pipeline_barrier(
            command_buffer,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::HOST,
            &[barrier],
            &[],
        );

        self.fns
            .end_command_buffer(command_buffer)
            .map_err(CaptureError::EndCommandBuffer)
    }

    // Acquire, copy into the staging buffer, then release back to what the application barrier expects
    unsafe fn record_staging_command_buffer(&self, staged: &ExternalMemoryCommandBuffer) -> Result<(), CaptureError> {
        let command_buffer = staged.staging_command_buffer;
        let begin_info = vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        self.fns
            .begin_command_buffer(command_buffer, &begin_info)
            .map_err(CaptureError::BeginCommandBuffer)?;

        let acquire_buffers = staged
            .buffers
            .iter()
            .map(|buffer| buffer.barrier.acquire().to_vk())
            .collect::<Vec<_>>();
        let acquire_images = staged
            .images
            .iter()
            .map(|image| image.barrier.acquire().to_vk())
            .collect::<Vec<_>>();
        self.fns.cmd_pipeline_barrier(
            command_buffer,
            vk::PipelineStageFlags::ALL_COMMANDS,
            vk::PipelineStageFlags::TRANSFER,
            &acquire_buffers,
            &acquire_images,
        );

        for buffer in &staged.buffers {
            self.fns
                .cmd_copy_buffer(command_buffer, buffer.buffer, self.staging.buffer, slice::from_ref(&buffer.copy));
        }

        for image in &staged.images {
            self.fns.cmd_copy_image_to_buffer(
                command_buffer,
                image.image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                self.staging.buffer,
                &image.copies,
            );
        }

        let release_buffers = staged
            .buffers
            .iter()
            .map(|buffer| buffer.barrier.release().to_vk())
            .collect::<Vec<_>>();
        let release_images = staged
            .images
            .iter()
            .map(|image| image.barrier.release().to_vk())
            .collect::<Vec<_>>();
        self.fns.cmd_pipeline_barrier(
            command_buffer,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::ALL_COMMANDS,
            &release_buffers,
            &release_images,
        );

        self.fns
            .end_command_buffer(command_buffer)
            .map_err(CaptureError::EndCommandBuffer)
    }

    // Hand the rebuilt batch list to the queue, the trailing batch signals the fence
    pub unsafe fn submit(&mut self) -> Result<(), CaptureError> {
        self.phase = CapturePhase::Submission;
        let batches = rebuild_submits(&self.submits, self.staging.command_buffer);
        self.fns
            .queue_submit(self.queue, &batches, self.fence)
            .map_err(CaptureError::QueueSubmit)
    }

    // Wait for the staging copies and copy the staging buffer out
    pub unsafe fn read_back(&mut self) -> Result<ExternalMemoryData, CaptureError> {
        self.phase = CapturePhase::Readback;

        let fences = [self.fence];
        let mut waited = self.fns.wait_for_fences(&fences, true, self.settings.fence_warn_timeout);
        if waited == Err(vk::Result::TIMEOUT) {
            log::warn!(
                "[external memory] Staging fence still pending after {} ns, waiting until it signals",
                self.settings.fence_warn_timeout
            );
            waited = self.fns.wait_for_fences(&fences, true, u64::MAX);
        }
        waited.map_err(CaptureError::WaitForFence)?;

        let memory = self.staging.memory;
        let ptr = self
            .fns
            .map_memory(memory, 0, vk::WHOLE_SIZE)
            .map_err(CaptureError::MapMemory)?;

        let range = vk::MappedMemoryRange::default()
            .memory(memory)
            .offset(0)
            .size(vk::WHOLE_SIZE);
        if let Err(err) = self.fns.invalidate_mapped_memory_ranges(&[range]) {
            self.fns.unmap_memory(memory);
            return Err(CaptureError::InvalidateMemory(err));
        }

        let data = slice::from_raw_parts(ptr as *const u8, self.staging_size as usize).to_vec();
        self.fns.unmap_memory(memory);
        Ok(self.capture_record(data))
    }

    // Region list of the blob, indices point into the original submission
    fn capture_record(&self, data: Vec<u8>) -> ExternalMemoryData {
        let mut record = ExternalMemoryData {
            res_size: self.staging_size,
            data,
            buffers: Vec::new(),
            images: Vec::new(),
        };

        for (submit_index, submit) in self.submits.iter().enumerate() {
            for (command_buffer_index, staged) in submit.command_buffers.iter().enumerate() {
                for buffer in &staged.buffers {
                    record.buffers.push(ExternalBufferRecord {
                        submit_index: submit_index as u32,
                        command_buffer_index: command_buffer_index as u32,
                        buffer: buffer.buffer.as_raw(),
                        buffer_offset: buffer.copy.src_offset,
                        data_offset: buffer.copy.dst_offset,
                        size: buffer.copy.size,
                    });
                }

                for image in &staged.images {
                    let range = image.barrier.subresource_range;
                    record.images.push(ExternalImageData {
                        record: ExternalImageRecord {
                            image: image.image.as_raw(),
                            submit_index: submit_index as u32,
                            command_buffer_index: command_buffer_index as u32,
                            aspect_mask: range.aspect_mask.as_raw(),
                            base_mip_level: range.base_mip_level,
                            level_count: range.level_count,
                            base_array_layer: range.base_array_layer,
                            layer_count: range.layer_count,
                            old_layout: image.barrier.old_layout.as_raw(),
                            new_layout: image.barrier.new_layout.as_raw(),
                            range_count: image.copies.len() as u32,
                        },
                        ranges: image.copies.iter().map(ExternalImageRange::from).collect(),
                    });
                }
            }
        }

        record
    }

    // Destroy the staging objects, safe to call again
    pub unsafe fn cleanup(&mut self) {
        self.phase = CapturePhase::Cleanup;
        self.staging.release(self.fns);
    }
}

impl<D: DeviceFns + ?Sized> Drop for ExternalMemory<'_, D> {
    fn drop(&mut self) {
        unsafe { self.cleanup() }
    }
}

fn staged_command_buffers(submits: &[ExternalMemorySubmit]) -> impl Iterator<Item = &ExternalMemoryCommandBuffer> {
    submits
        .iter()
        .flat_map(|submit| &submit.command_buffers)
        .filter(|command_buffer| !command_buffer.is_empty())
}

// Staging work of a single command buffer, returns it with the end of its staging range
fn plan_command_buffer(
    state: &State,
    command_buffer: vk::CommandBuffer,
    mut offset: vk::DeviceSize,
) -> (ExternalMemoryCommandBuffer, vk::DeviceSize) {
    let mut staged = ExternalMemoryCommandBuffer::new(command_buffer);

    for barrier in state.external_barriers(command_buffer) {
        match barrier {
            ExternalBarrier::Buffer(barrier) => {
                let size = if barrier.size == vk::WHOLE_SIZE {
                    match state.buffer(barrier.buffer) {
                        Some(buffer) => buffer.size.saturating_sub(barrier.offset),
                        None => {
                            log::warn!(
                                "[external memory] Buffer {:?} is not tracked, skipping whole size barrier",
                                barrier.buffer
                            );
                            continue;
                        }
                    }
                } else {
                    barrier.size
                };

                if size == 0 {
                    continue;
                }

                staged.buffers.push(ExternalBufferStaging {
                    buffer: barrier.buffer,
                    barrier: *barrier,
                    copy: vk::BufferCopy {
                        src_offset: barrier.offset,
                        dst_offset: offset,
                        size,
                    },
                });
                offset += size;
            }

            ExternalBarrier::Image(barrier) => {
                let Some(image) = state.image(barrier.image) else {
                    log::warn!("[external memory] Image {:?} is not tracked, skipping", barrier.image);
                    continue;
                };

                let layout = buffer_image_copies(image, &barrier.subresource_range, offset);
                if layout.is_empty() {
                    continue;
                }

                offset = layout.offset;
                staged.images.push(ExternalImageStaging {
                    image: barrier.image,
                    barrier: *barrier,
                    copies: layout.copies,
                });
            }
        }
    }

    (staged, offset)
}

// Capture the external memory acquired by a submission and submit it
// Setup failures are returned before anything reaches the queue, the caller then submits the originals itself
// Readback failures only drop the capture
pub unsafe fn capture_external_memory<D: DeviceFns + ?Sized>(
    state: &State,
    fns: &D,
    settings: &CaptureSettings,
    queue: vk::Queue,
    batches: &[SubmitBatch],
    fence: vk::Fence,
    sink: &dyn CaptureSink,
) -> Result<(), CaptureError> {
    let mut external = match ExternalMemory::new(state, fns, settings.clone(), queue, batches, fence) {
        Ok(external) => external,
        Err(err) => {
            log::error!("[external memory] {err}");
            return Err(err);
        }
    };

    if external.is_empty() {
        log::debug!("[external memory] No external memory to capture, submitting batches as they are");
        return fns.queue_submit(queue, batches, fence).map_err(|err| {
            let err = CaptureError::QueueSubmit(err);
            log::error!("[external memory] {err}: {:?}", err.result());
            err
        });
    }

    if let Err(err) = external.stage() {
        log::error!("[external memory] {err}: {:?} ({:?})", err.result(), err.phase());
        return Err(err);
    }

    match external.read_back() {
        Ok(data) => {
            if settings.log_regions {
                log_regions(&data);
            }
            sink.send(data);
        }
        Err(err) => log::error!("[external memory] {err}: {:?}, dropping the capture", err.result()),
    }

    Ok(())
}

fn log_regions(data: &ExternalMemoryData) {
    log::debug!(
        "[external memory] Captured {} bytes, {} buffer ranges, {} images",
        data.res_size,
        data.buffers.len(),
        data.images.len()
    );

    for buffer in &data.buffers {
        log::debug!(
            "[external memory] Buffer {:#x} [{}, +{}) at {} (submit {}, command buffer {})",
            buffer.buffer,
            buffer.buffer_offset,
            buffer.size,
            buffer.data_offset,
            buffer.submit_index,
            buffer.command_buffer_index
        );
    }

    for image in &data.images {
        for range in &image.ranges {
            log::debug!(
                "[external memory] Image {:#x} aspect {:#x} level {} layers [{}, +{}) at {}",
                image.record.image,
                range.aspect_mask,
                range.mip_level,
                range.base_array_layer,
                range.layer_count,
                range.data_offset
            );
        }
    }
}
