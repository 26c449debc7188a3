use std::collections::{BTreeMap, HashMap};

use ash::vk;

// Creation parameters of a tracked image
#[derive(Clone, Copy, Debug)]
pub struct ImageInfo {
    pub flags: vk::ImageCreateFlags,
    pub format: vk::Format,
    pub extent: vk::Extent3D,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub samples: vk::SampleCountFlags,
}

impl Default for ImageInfo {
    fn default() -> Self {
        Self {
            flags: vk::ImageCreateFlags::empty(),
            format: vk::Format::UNDEFINED,
            extent: vk::Extent3D {
                width: 1,
                height: 1,
                depth: 1,
            },
            mip_levels: 1,
            array_layers: 1,
            samples: vk::SampleCountFlags::TYPE_1,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ImageLevel {
    pub layout: vk::ImageLayout,
}

#[derive(Clone, Debug, Default)]
pub struct ImageLayer {
    pub levels: Vec<ImageLevel>,
}

#[derive(Clone, Debug, Default)]
pub struct ImageAspect {
    pub layers: Vec<ImageLayer>,
}

// Memory bound to the first plane of an image
#[derive(Clone, Copy, Debug)]
pub struct PlaneMemoryInfo {
    pub bound_memory: Option<vk::DeviceMemory>,
    pub memory_requirements: vk::MemoryRequirements,
}

// Single block bound through vkQueueBindSparse with an image memory bind
#[derive(Clone, Copy, Debug)]
pub struct SparseBoundBlock {
    pub offset: vk::Offset3D,
    pub extent: vk::Extent3D,
}

// Explicit per-block bindings of one aspect, keyed by layer then level
pub type SparseBoundLayers = BTreeMap<u32, BTreeMap<u32, Vec<SparseBoundBlock>>>;

// Tracked state of an image, as recorded by the state tracker
#[derive(Clone, Debug)]
pub struct ImageObject {
    pub info: ImageInfo,
    pub image_aspect: vk::ImageAspectFlags,
    pub is_swapchain_image: bool,
    pub aspects: HashMap<vk::ImageAspectFlags, ImageAspect>,
    pub plane_memory: Option<PlaneMemoryInfo>,
    pub opaque_sparse_bindings: Vec<vk::SparseMemoryBind>,
    pub sparse_memory_requirements: Vec<vk::SparseImageMemoryRequirements>,
    pub sparse_image_bindings: HashMap<vk::ImageAspectFlags, SparseBoundLayers>,
}

impl ImageObject {
    // Create the tracked image with every subresource of every aspect in the same layout
    pub fn new(info: ImageInfo, image_aspect: vk::ImageAspectFlags, layout: vk::ImageLayout) -> Self {
        let aspects = crate::aspect_bits(image_aspect)
            .map(|aspect| {
                let layers = (0..info.array_layers)
                    .map(|_| ImageLayer {
                        levels: vec![ImageLevel { layout }; info.mip_levels as usize],
                    })
                    .collect();
                (aspect, ImageAspect { layers })
            })
            .collect();

        Self {
            info,
            image_aspect,
            is_swapchain_image: false,
            aspects,
            plane_memory: None,
            opaque_sparse_bindings: Vec::new(),
            sparse_memory_requirements: Vec::new(),
            sparse_image_bindings: HashMap::new(),
        }
    }

    pub fn level(&self, aspect: vk::ImageAspectFlags, layer: u32, level: u32) -> Option<&ImageLevel> {
        self.aspects
            .get(&aspect)?
            .layers
            .get(layer as usize)?
            .levels
            .get(level as usize)
    }

    pub fn level_mut(&mut self, aspect: vk::ImageAspectFlags, layer: u32, level: u32) -> Option<&mut ImageLevel> {
        self.aspects
            .get_mut(&aspect)?
            .layers
            .get_mut(layer as usize)?
            .levels
            .get_mut(level as usize)
    }

    // Layout of a single subresource, None if the subresource is not tracked
    pub fn layout(&self, aspect: vk::ImageAspectFlags, layer: u32, level: u32) -> Option<vk::ImageLayout> {
        self.level(aspect, layer, level).map(|level| level.layout)
    }

    pub fn is_sparse_binding(&self) -> bool {
        self.info.flags.contains(vk::ImageCreateFlags::SPARSE_BINDING)
    }

    pub fn is_sparse_residency(&self) -> bool {
        self.is_sparse_binding() && self.info.flags.contains(vk::ImageCreateFlags::SPARSE_RESIDENCY)
    }

    // Clamp a subresource range to this image, resolving the REMAINING_* values
    pub fn resolve_range(&self, range: &vk::ImageSubresourceRange) -> vk::ImageSubresourceRange {
        let levels = self.info.mip_levels.saturating_sub(range.base_mip_level);
        let layers = self.info.array_layers.saturating_sub(range.base_array_layer);
        vk::ImageSubresourceRange {
            aspect_mask: range.aspect_mask & self.image_aspect,
            base_mip_level: range.base_mip_level,
            level_count: range.level_count.min(levels),
            base_array_layer: range.base_array_layer,
            layer_count: range.layer_count.min(layers),
        }
    }
}
