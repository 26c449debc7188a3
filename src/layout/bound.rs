use ash::vk;

use crate::{aspect_bits, is_fully_bound, ImageObject};

// Single subresource of an image
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Subresource {
    pub aspect: vk::ImageAspectFlags,
    pub layer: u32,
    pub level: u32,
}

// Explicitly bound block of a sparsely resident subresource
#[derive(Clone, Copy, Debug)]
pub struct SparseBlockPiece {
    pub subresource: Subresource,
    pub offset: vk::Offset3D,
    pub extent: vk::Extent3D,
}

// Parts of an image that are in a defined layout and backed by memory
#[derive(Clone, Debug, Default)]
pub struct BoundRegions {
    // Whole subresources, ordered by aspect, then layer, then level
    pub opaque: Vec<Subresource>,

    // Individually bound blocks of sparsely resident levels
    pub blocks: Vec<SparseBlockPiece>,
}

impl BoundRegions {
    pub fn is_empty(&self) -> bool {
        self.opaque.is_empty() && self.blocks.is_empty()
    }

    // Only subresources with meaningful contents are captured
    fn push_opaque(&mut self, image: &ImageObject, subresource: Subresource) {
        if is_defined(image, subresource) {
            self.opaque.push(subresource);
        }
    }
}

fn is_defined(image: &ImageObject, subresource: Subresource) -> bool {
    image
        .layout(subresource.aspect, subresource.layer, subresource.level)
        .is_some_and(|layout| layout != vk::ImageLayout::UNDEFINED)
}

// Call the closure for every subresource of an already resolved range
fn walk_range(range: &vk::ImageSubresourceRange, mut f: impl FnMut(Subresource)) {
    for aspect in aspect_bits(range.aspect_mask) {
        for layer in range.base_array_layer..range.base_array_layer + range.layer_count {
            for level in range.base_mip_level..range.base_mip_level + range.level_count {
                f(Subresource { aspect, layer, level });
            }
        }
    }
}

// Overlap of two resolved subresource ranges
fn intersect(a: &vk::ImageSubresourceRange, b: &vk::ImageSubresourceRange) -> vk::ImageSubresourceRange {
    let base_mip_level = a.base_mip_level.max(b.base_mip_level);
    let mip_end = (a.base_mip_level + a.level_count).min(b.base_mip_level + b.level_count);
    let base_array_layer = a.base_array_layer.max(b.base_array_layer);
    let layer_end = (a.base_array_layer + a.layer_count).min(b.base_array_layer + b.layer_count);
    vk::ImageSubresourceRange {
        aspect_mask: a.aspect_mask & b.aspect_mask,
        base_mip_level,
        level_count: mip_end.saturating_sub(base_mip_level),
        base_array_layer,
        layer_count: layer_end.saturating_sub(base_array_layer),
    }
}

// A sparsely resident image is only usable if all of its metadata is bound
fn is_metadata_bound(image: &ImageObject) -> bool {
    image
        .sparse_memory_requirements
        .iter()
        .filter(|req| {
            req.format_properties
                .aspect_mask
                .contains(vk::ImageAspectFlags::METADATA)
        })
        .all(|req| {
            is_fully_bound(
                req.image_mip_tail_offset,
                req.image_mip_tail_size,
                &image.opaque_sparse_bindings,
            )
        })
}

// Collect the mip tail levels of a sparsely resident image whose tail memory is fully bound
fn push_mip_tails(image: &ImageObject, range: &vk::ImageSubresourceRange, regions: &mut BoundRegions) {
    let info = &image.info;
    for req in &image.sparse_memory_requirements {
        let properties = &req.format_properties;
        if properties.aspect_mask.contains(vk::ImageAspectFlags::METADATA) {
            continue;
        }

        let first_lod = req.image_mip_tail_first_lod;
        if first_lod >= info.mip_levels {
            continue;
        }

        let tail = vk::ImageSubresourceRange {
            aspect_mask: properties.aspect_mask,
            base_mip_level: first_lod,
            level_count: info.mip_levels - first_lod,
            base_array_layer: 0,
            layer_count: info.array_layers,
        };

        // One tail shared by every layer, or one tail per layer spaced by the stride
        if properties.flags.contains(vk::SparseImageFormatFlags::SINGLE_MIPTAIL) {
            if !is_fully_bound(
                req.image_mip_tail_offset,
                req.image_mip_tail_size,
                &image.opaque_sparse_bindings,
            ) {
                continue;
            }

            walk_range(&intersect(&tail, range), |s| regions.push_opaque(image, s));
        } else {
            for layer in 0..info.array_layers {
                let offset = req.image_mip_tail_offset + layer as u64 * req.image_mip_tail_stride;
                if !is_fully_bound(offset, req.image_mip_tail_size, &image.opaque_sparse_bindings) {
                    continue;
                }

                let layer_tail = vk::ImageSubresourceRange {
                    base_array_layer: layer,
                    layer_count: 1,
                    ..tail
                };
                walk_range(&intersect(&layer_tail, range), |s| regions.push_opaque(image, s));
            }
        }
    }
}

// Collect the explicitly bound blocks of the non tail levels
fn push_sparse_blocks(image: &ImageObject, range: &vk::ImageSubresourceRange, regions: &mut BoundRegions) {
    let layers = range.base_array_layer..range.base_array_layer + range.layer_count;
    let levels = range.base_mip_level..range.base_mip_level + range.level_count;

    for aspect in aspect_bits(range.aspect_mask) {
        let Some(bound_layers) = image.sparse_image_bindings.get(&aspect) else {
            continue;
        };

        for (&layer, bound_levels) in bound_layers.range(layers.clone()) {
            for (&level, blocks) in bound_levels.range(levels.clone()) {
                let subresource = Subresource { aspect, layer, level };
                if !is_defined(image, subresource) {
                    continue;
                }

                regions.blocks.extend(blocks.iter().map(|block| SparseBlockPiece {
                    subresource,
                    offset: block.offset,
                    extent: block.extent,
                }));
            }
        }
    }
}

// Find the subresources of the range that are in a defined layout and fully backed by memory
// Unsupported binding states return an empty set instead of failing
pub fn bound_regions(image: &ImageObject, range: &vk::ImageSubresourceRange) -> BoundRegions {
    let range = image.resolve_range(range);
    let mut regions = BoundRegions::default();

    let dense_bound = image
        .plane_memory
        .is_some_and(|memory| memory.bound_memory.is_some());
    let sparse_bound =
        !image.opaque_sparse_bindings.is_empty() || !image.sparse_image_bindings.is_empty();
    let sparse_residency = image.is_sparse_residency();

    if !dense_bound && !sparse_bound {
        log::debug!("Image is not bound to any memory, skipping");
        return regions;
    }

    // Check for validity before going any further
    if sparse_bound {
        if sparse_residency {
            if !is_metadata_bound(image) {
                log::debug!("Sparse image metadata is not fully bound, skipping");
                return regions;
            }
        } else {
            // Without residency all of the memory must be bound before use
            let Some(memory) = image.plane_memory else {
                return regions;
            };

            if !is_fully_bound(0, memory.memory_requirements.size, &image.opaque_sparse_bindings) {
                log::debug!("Sparse image memory is not fully bound, skipping");
                return regions;
            }
        }
    }

    if dense_bound || !sparse_residency {
        walk_range(&range, |s| regions.push_opaque(image, s));
    } else {
        push_mip_tails(image, &range, &mut regions);
    }

    if sparse_residency {
        push_sparse_blocks(image, &range, &mut regions);
    }

    // Offsets get assigned in this order
    regions
        .opaque
        .sort_by_key(|s| (s.aspect.as_raw(), s.layer, s.level));
    regions.opaque.dedup();
    regions
}
