use ash::vk;

// Access and queue family fields shared by buffer and image ownership transfers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OwnershipTransfer {
    pub src_access_mask: vk::AccessFlags,
    pub dst_access_mask: vk::AccessFlags,
    pub src_queue_family_index: u32,
    pub dst_queue_family_index: u32,
}

impl OwnershipTransfer {
    // Same queue family pair, but only waiting for the transfer reads of the staging copy
    pub fn acquire(&self) -> Self {
        Self {
            src_access_mask: vk::AccessFlags::NONE,
            dst_access_mask: vk::AccessFlags::TRANSFER_READ,
            ..*self
        }
    }

    // Mirror of this transfer, swaps the access masks and the queue families
    pub fn reversed(&self) -> Self {
        Self {
            src_access_mask: self.dst_access_mask,
            dst_access_mask: self.src_access_mask,
            src_queue_family_index: self.dst_queue_family_index,
            dst_queue_family_index: self.src_queue_family_index,
        }
    }
}

// Buffer range that is being handed to or taken from an external queue family
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferBarrier {
    pub transfer: OwnershipTransfer,
    pub buffer: vk::Buffer,
    pub offset: vk::DeviceSize,
    pub size: vk::DeviceSize,
}

impl BufferBarrier {
    pub fn to_vk(&self) -> vk::BufferMemoryBarrier<'static> {
        vk::BufferMemoryBarrier::default()
            .src_access_mask(self.transfer.src_access_mask)
            .dst_access_mask(self.transfer.dst_access_mask)
            .src_queue_family_index(self.transfer.src_queue_family_index)
            .dst_queue_family_index(self.transfer.dst_queue_family_index)
            .buffer(self.buffer)
            .offset(self.offset)
            .size(self.size)
    }

    // Barrier recorded before the staging copy
    pub fn acquire(&self) -> Self {
        Self {
            transfer: self.transfer.acquire(),
            ..*self
        }
    }

    // Barrier recorded after the staging copy, hands the range back
    pub fn release(&self) -> Self {
        let acquire = self.acquire();
        Self {
            transfer: acquire.transfer.reversed(),
            ..acquire
        }
    }
}

impl From<&vk::BufferMemoryBarrier<'_>> for BufferBarrier {
    fn from(barrier: &vk::BufferMemoryBarrier<'_>) -> Self {
        Self {
            transfer: OwnershipTransfer {
                src_access_mask: barrier.src_access_mask,
                dst_access_mask: barrier.dst_access_mask,
                src_queue_family_index: barrier.src_queue_family_index,
                dst_queue_family_index: barrier.dst_queue_family_index,
            },
            buffer: barrier.buffer,
            offset: barrier.offset,
            size: barrier.size,
        }
    }
}

// Image subresource range that is being handed to or taken from an external queue family
#[derive(Clone, Copy, Debug)]
pub struct ImageBarrier {
    pub transfer: OwnershipTransfer,
    pub image: vk::Image,
    pub old_layout: vk::ImageLayout,
    pub new_layout: vk::ImageLayout,
    pub subresource_range: vk::ImageSubresourceRange,
}

impl ImageBarrier {
    pub fn to_vk(&self) -> vk::ImageMemoryBarrier<'static> {
        vk::ImageMemoryBarrier::default()
            .src_access_mask(self.transfer.src_access_mask)
            .dst_access_mask(self.transfer.dst_access_mask)
            .src_queue_family_index(self.transfer.src_queue_family_index)
            .dst_queue_family_index(self.transfer.dst_queue_family_index)
            .old_layout(self.old_layout)
            .new_layout(self.new_layout)
            .image(self.image)
            .subresource_range(self.subresource_range)
    }

    // Barrier recorded before the staging copy, moves the image to TRANSFER_SRC_OPTIMAL
    pub fn acquire(&self) -> Self {
        Self {
            transfer: self.transfer.acquire(),
            new_layout: vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            ..*self
        }
    }

    // Barrier recorded after the staging copy, restores the layout the original barrier expects
    pub fn release(&self) -> Self {
        let acquire = self.acquire();
        Self {
            transfer: acquire.transfer.reversed(),
            old_layout: acquire.new_layout,
            new_layout: acquire.old_layout,
            ..acquire
        }
    }
}

impl From<&vk::ImageMemoryBarrier<'_>> for ImageBarrier {
    fn from(barrier: &vk::ImageMemoryBarrier<'_>) -> Self {
        Self {
            transfer: OwnershipTransfer {
                src_access_mask: barrier.src_access_mask,
                dst_access_mask: barrier.dst_access_mask,
                src_queue_family_index: barrier.src_queue_family_index,
                dst_queue_family_index: barrier.dst_queue_family_index,
            },
            image: barrier.image,
            old_layout: barrier.old_layout,
            new_layout: barrier.new_layout,
            subresource_range: barrier.subresource_range,
        }
    }
}

// Pre-classified external ownership barrier recorded in an application command buffer
#[derive(Clone, Copy, Debug)]
pub enum ExternalBarrier {
    Buffer(BufferBarrier),
    Image(ImageBarrier),
}

impl ExternalBarrier {
    pub fn transfer(&self) -> &OwnershipTransfer {
        match self {
            ExternalBarrier::Buffer(barrier) => &barrier.transfer,
            ExternalBarrier::Image(barrier) => &barrier.transfer,
        }
    }
}
