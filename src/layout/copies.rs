use ash::vk;

use crate::{
    aspect_size_divisor, bound_regions, element_and_texel_block_size, element_size_for_aspect, mip_size,
    next_multiple_of_8, round_up_to, ImageObject, Subresource,
};

// Ordered copies of an image into a linear staging buffer and the offset right after them
#[derive(Clone, Debug)]
pub struct CopyLayout {
    pub copies: Vec<vk::BufferImageCopy>,
    pub offset: vk::DeviceSize,
}

impl CopyLayout {
    fn unchanged(offset: vk::DeviceSize) -> Self {
        Self {
            copies: Vec::new(),
            offset,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.copies.is_empty()
    }
}

// Byte size and extent of one aspect of one mip level
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelSize {
    pub size: vk::DeviceSize,
    pub aligned_size: vk::DeviceSize,
    pub size_in_buffer: vk::DeviceSize,
    pub aligned_size_in_buffer: vk::DeviceSize,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

// Compute the size of a mip level of the given extent
// Planar formats divide the extent of the chroma planes unless account_for_plane is false
pub fn level_size(
    extent: vk::Extent3D,
    format: vk::Format,
    mip_level: u32,
    aspect: vk::ImageAspectFlags,
    account_for_plane: bool,
) -> LevelSize {
    let (texel_width, texel_height) = element_and_texel_block_size(format)
        .map(|size| (size.texel_block_width, size.texel_block_height))
        .unwrap_or((1, 1));
    let divisor = if account_for_plane {
        aspect_size_divisor(format, aspect)
    } else {
        crate::AspectSizeDivisor::ONE
    };

    let width = mip_size(extent.width, mip_level) / divisor.width;
    let height = mip_size(extent.height, mip_level) / divisor.height;
    let depth = mip_size(extent.depth, mip_level);
    let width_in_blocks = round_up_to(width, texel_width) as u64;
    let height_in_blocks = round_up_to(height, texel_height) as u64;
    let texels = width_in_blocks * height_in_blocks * depth as u64;

    let size = texels * element_size_for_aspect(format, aspect, false) as u64;
    let size_in_buffer = texels * element_size_for_aspect(format, aspect, true) as u64;

    LevelSize {
        size,
        aligned_size: next_multiple_of_8(size),
        size_in_buffer,
        aligned_size_in_buffer: next_multiple_of_8(size_in_buffer),
        width,
        height,
        depth,
    }
}

fn subresource_layers(subresource: Subresource) -> vk::ImageSubresourceLayers {
    vk::ImageSubresourceLayers {
        aspect_mask: subresource.aspect,
        mip_level: subresource.level,
        base_array_layer: subresource.layer,
        layer_count: 1,
    }
}

// Compute the copies needed to linearize the bound and defined parts of an image range into
// a staging buffer, starting at the given offset
// Images that cannot be captured return no copies and leave the offset untouched
pub fn buffer_image_copies(
    image: &ImageObject,
    range: &vk::ImageSubresourceRange,
    offset: vk::DeviceSize,
) -> CopyLayout {
    let info = &image.info;

    // Presentation engine owned memory is never captured here
    if image.is_swapchain_image {
        log::debug!("Skipping swapchain image");
        return CopyLayout::unchanged(offset);
    }

    // TODO: Handle multisampled images
    if info.samples != vk::SampleCountFlags::TYPE_1 {
        log::warn!("Multisampled images are not captured ({:?})", info.samples);
        return CopyLayout::unchanged(offset);
    }

    if info.format == vk::Format::UNDEFINED {
        log::warn!("Images with an external format are not captured");
        return CopyLayout::unchanged(offset);
    }

    if element_and_texel_block_size(info.format).is_none() {
        log::warn!("Unknown image format {:?}, not captured", info.format);
        return CopyLayout::unchanged(offset);
    }

    let regions = bound_regions(image, range);
    if regions.is_empty() {
        return CopyLayout::unchanged(offset);
    }

    let mut offset = next_multiple_of_8(offset);
    let mut copies = Vec::with_capacity(regions.opaque.len() + regions.blocks.len());

    // Whole subresources first
    for subresource in regions.opaque {
        let size = level_size(info.extent, info.format, subresource.level, subresource.aspect, true);
        copies.push(vk::BufferImageCopy {
            buffer_offset: offset,
            buffer_row_length: 0,
            buffer_image_height: 0,
            image_subresource: subresource_layers(subresource),
            image_offset: vk::Offset3D::default(),
            image_extent: vk::Extent3D {
                width: size.width,
                height: size.height,
                depth: size.depth,
            },
        });
        offset += size.aligned_size_in_buffer;
    }

    // Then every explicitly bound sparse block, sized by its own extent
    for block in regions.blocks {
        let size = level_size(block.extent, info.format, 0, block.subresource.aspect, false);
        copies.push(vk::BufferImageCopy {
            buffer_offset: offset,
            buffer_row_length: 0,
            buffer_image_height: 0,
            image_subresource: subresource_layers(block.subresource),
            image_offset: block.offset,
            image_extent: block.extent,
        });
        offset += size.aligned_size_in_buffer;
    }

    CopyLayout { copies, offset }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ImageInfo, PlaneMemoryInfo, SparseBoundBlock, SparseBoundLayers};
    use ash::vk::Handle;

    fn dense(format: vk::Format, aspect: vk::ImageAspectFlags, extent: (u32, u32, u32), levels: u32) -> ImageObject {
        let info = ImageInfo {
            format,
            extent: vk::Extent3D {
                width: extent.0,
                height: extent.1,
                depth: extent.2,
            },
            mip_levels: levels,
            ..Default::default()
        };
        let mut image = ImageObject::new(info, aspect, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
        image.plane_memory = Some(PlaneMemoryInfo {
            bound_memory: Some(vk::DeviceMemory::from_raw(3)),
            memory_requirements: vk::MemoryRequirements::default(),
        });
        image
    }

    fn whole(aspect: vk::ImageAspectFlags, levels: u32) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask: aspect,
            base_mip_level: 0,
            level_count: levels,
            base_array_layer: 0,
            layer_count: 1,
        }
    }

    #[test]
    fn single_level_2d_image() {
        let image = dense(vk::Format::R8G8B8A8_UNORM, vk::ImageAspectFlags::COLOR, (16, 8, 1), 1);
        let layout = buffer_image_copies(&image, &whole(vk::ImageAspectFlags::COLOR, 1), 0);
        assert_eq!(layout.copies.len(), 1);

        let copy = layout.copies[0];
        assert_eq!(copy.buffer_offset, 0);
        assert_eq!(
            (copy.image_extent.width, copy.image_extent.height, copy.image_extent.depth),
            (16, 8, 1)
        );
        assert_eq!(copy.image_subresource.aspect_mask, vk::ImageAspectFlags::COLOR);
        assert_eq!(copy.image_subresource.layer_count, 1);
        assert_eq!(layout.offset, 16 * 8 * 4);
    }

    #[test]
    fn mip_chain_offsets_use_rounded_sizes() {
        let image = dense(vk::Format::R8_UNORM, vk::ImageAspectFlags::COLOR, (10, 10, 1), 3);
        let layout = buffer_image_copies(&image, &whole(vk::ImageAspectFlags::COLOR, 3), 0);
        let levels = layout
            .copies
            .iter()
            .map(|c| (c.image_subresource.mip_level, c.buffer_offset))
            .collect::<Vec<_>>();

        // 100, 25 and 4 bytes, each rounded up to 8
        assert_eq!(levels, vec![(0, 0), (1, 104), (2, 136)]);
        assert_eq!(layout.offset, 144);
        assert_eq!(layout.copies[1].image_extent.width, 5);
    }

    #[test]
    fn starts_on_an_eight_byte_boundary() {
        let image = dense(vk::Format::R8G8B8A8_UNORM, vk::ImageAspectFlags::COLOR, (4, 4, 1), 1);
        let layout = buffer_image_copies(&image, &whole(vk::ImageAspectFlags::COLOR, 1), 13);
        assert_eq!(layout.copies[0].buffer_offset, 16);
        assert_eq!(layout.offset, 16 + 64);
    }

    #[test]
    fn unsupported_images_leave_the_offset_alone() {
        let mut multisampled = dense(vk::Format::R8G8B8A8_UNORM, vk::ImageAspectFlags::COLOR, (4, 4, 1), 1);
        multisampled.info.samples = vk::SampleCountFlags::TYPE_4;
        let layout = buffer_image_copies(&multisampled, &whole(vk::ImageAspectFlags::COLOR, 1), 24);
        assert!(layout.is_empty());
        assert_eq!(layout.offset, 24);

        let external = dense(vk::Format::UNDEFINED, vk::ImageAspectFlags::COLOR, (4, 4, 1), 1);
        let layout = buffer_image_copies(&external, &whole(vk::ImageAspectFlags::COLOR, 1), 24);
        assert!(layout.is_empty());
        assert_eq!(layout.offset, 24);

        let mut swapchain = dense(vk::Format::B8G8R8A8_SRGB, vk::ImageAspectFlags::COLOR, (4, 4, 1), 1);
        swapchain.is_swapchain_image = true;
        assert!(buffer_image_copies(&swapchain, &whole(vk::ImageAspectFlags::COLOR, 1), 0).is_empty());
    }

    #[test]
    fn undefined_sibling_is_skipped() {
        let mut image = dense(vk::Format::R8G8B8A8_UNORM, vk::ImageAspectFlags::COLOR, (8, 8, 1), 2);
        image.level_mut(vk::ImageAspectFlags::COLOR, 0, 0).unwrap().layout = vk::ImageLayout::UNDEFINED;
        let layout = buffer_image_copies(&image, &whole(vk::ImageAspectFlags::COLOR, 2), 0);
        assert_eq!(layout.copies.len(), 1);
        assert_eq!(layout.copies[0].image_subresource.mip_level, 1);
        assert_eq!(layout.copies[0].buffer_offset, 0);
    }

    #[test]
    fn depth_stencil_uses_buffer_element_sizes() {
        let aspects = vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL;
        let image = dense(vk::Format::D24_UNORM_S8_UINT, aspects, (4, 3, 1), 1);
        let layout = buffer_image_copies(&image, &whole(aspects, 1), 0);
        assert_eq!(layout.copies.len(), 2);
        assert_eq!(layout.copies[0].image_subresource.aspect_mask, vk::ImageAspectFlags::DEPTH);
        assert_eq!(layout.copies[1].image_subresource.aspect_mask, vk::ImageAspectFlags::STENCIL);

        // 12 depth texels padded to 4 bytes in the buffer, then 12 stencil bytes
        assert_eq!(layout.copies[1].buffer_offset, 48);
        assert_eq!(layout.offset, 48 + 16);
    }

    #[test]
    fn planar_chroma_is_subsampled() {
        let aspects = vk::ImageAspectFlags::PLANE_0 | vk::ImageAspectFlags::PLANE_1;
        let image = dense(vk::Format::G8_B8R8_2PLANE_420_UNORM, aspects, (8, 4, 1), 1);
        let layout = buffer_image_copies(&image, &whole(aspects, 1), 0);
        assert_eq!(layout.copies.len(), 2);

        let chroma = layout.copies[1];
        assert_eq!(chroma.buffer_offset, 32);
        assert_eq!((chroma.image_extent.width, chroma.image_extent.height), (4, 2));
        assert_eq!(layout.offset, 32 + 16);
    }

    #[test]
    fn compressed_levels_round_up_to_blocks() {
        let image = dense(vk::Format::BC1_RGBA_UNORM_BLOCK, vk::ImageAspectFlags::COLOR, (10, 10, 1), 2);
        let layout = buffer_image_copies(&image, &whole(vk::ImageAspectFlags::COLOR, 2), 0);

        // 3x3 blocks then 2x2 blocks of 8 bytes
        assert_eq!(layout.copies[1].buffer_offset, 72);
        assert_eq!(layout.offset, 72 + 32);
    }

    #[test]
    fn volume_levels_halve_depth() {
        let level = level_size(
            vk::Extent3D {
                width: 8,
                height: 8,
                depth: 8,
            },
            vk::Format::R32_SFLOAT,
            1,
            vk::ImageAspectFlags::COLOR,
            true,
        );
        assert_eq!((level.width, level.height, level.depth), (4, 4, 4));
        assert_eq!(level.size, 4 * 4 * 4 * 4);
    }

    #[test]
    fn sparse_blocks_follow_the_opaque_levels() {
        let info = ImageInfo {
            flags: vk::ImageCreateFlags::SPARSE_BINDING | vk::ImageCreateFlags::SPARSE_RESIDENCY,
            format: vk::Format::R8G8B8A8_UNORM,
            extent: vk::Extent3D {
                width: 64,
                height: 64,
                depth: 1,
            },
            mip_levels: 3,
            ..Default::default()
        };
        let mut image = ImageObject::new(info, vk::ImageAspectFlags::COLOR, vk::ImageLayout::GENERAL);
        image.sparse_memory_requirements = vec![vk::SparseImageMemoryRequirements {
            format_properties: vk::SparseImageFormatProperties {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                image_granularity: vk::Extent3D {
                    width: 32,
                    height: 32,
                    depth: 1,
                },
                flags: vk::SparseImageFormatFlags::SINGLE_MIPTAIL,
            },
            image_mip_tail_first_lod: 1,
            image_mip_tail_size: 65536,
            image_mip_tail_offset: 0,
            image_mip_tail_stride: 0,
        }];
        image.opaque_sparse_bindings = vec![vk::SparseMemoryBind {
            resource_offset: 0,
            size: 65536,
            memory: vk::DeviceMemory::from_raw(5),
            memory_offset: 0,
            flags: vk::SparseMemoryBindFlags::empty(),
        }];
        let mut layers = SparseBoundLayers::new();
        layers.entry(0).or_default().insert(
            0,
            vec![SparseBoundBlock {
                offset: vk::Offset3D { x: 32, y: 32, z: 0 },
                extent: vk::Extent3D {
                    width: 32,
                    height: 32,
                    depth: 1,
                },
            }],
        );
        image.sparse_image_bindings.insert(vk::ImageAspectFlags::COLOR, layers);

        let layout = buffer_image_copies(&image, &whole(vk::ImageAspectFlags::COLOR, 3), 0);
        let pieces = layout
            .copies
            .iter()
            .map(|c| (c.image_subresource.mip_level, c.buffer_offset, c.image_offset.x))
            .collect::<Vec<_>>();

        // Tail levels 1 (32x32) and 2 (16x16), then the bound block of level 0
        assert_eq!(pieces, vec![(1, 0, 0), (2, 4096, 0), (0, 4096 + 1024, 32)]);
        assert_eq!(layout.offset, 4096 + 1024 + 4096);
    }
}
