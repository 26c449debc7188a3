use ash::vk;

// Byte size of one texel block and how many texels it spans
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ElementAndTexelBlockSize {
    pub element_size: u32,
    pub texel_block_width: u32,
    pub texel_block_height: u32,
}

impl ElementAndTexelBlockSize {
    const fn texel(element_size: u32) -> Self {
        Self {
            element_size,
            texel_block_width: 1,
            texel_block_height: 1,
        }
    }

    const fn block(element_size: u32, width: u32, height: u32) -> Self {
        Self {
            element_size,
            texel_block_width: width,
            texel_block_height: height,
        }
    }
}

// Fetch the element size and texel block footprint of a format
// Returns None for formats we do not know how to linearize
pub fn element_and_texel_block_size(format: vk::Format) -> Option<ElementAndTexelBlockSize> {
    use vk::Format as F;
    type S = ElementAndTexelBlockSize;

    // Multi-planar formats are addressed per plane, the whole format is a single texel
    if let Some(planar) = super::planar_layout(format) {
        let total = (0..planar.planes as u32)
            .map(|plane| planar.plane_element_size(plane))
            .sum();
        return Some(S::texel(total));
    }

    let size = match format {
        F::R4G4_UNORM_PACK8
        | F::R8_UNORM
        | F::R8_SNORM
        | F::R8_USCALED
        | F::R8_SSCALED
        | F::R8_UINT
        | F::R8_SINT
        | F::R8_SRGB
        | F::S8_UINT => S::texel(1),

        F::R4G4B4A4_UNORM_PACK16
        | F::B4G4R4A4_UNORM_PACK16
        | F::R5G6B5_UNORM_PACK16
        | F::B5G6R5_UNORM_PACK16
        | F::R5G5B5A1_UNORM_PACK16
        | F::B5G5R5A1_UNORM_PACK16
        | F::A1R5G5B5_UNORM_PACK16
        | F::R8G8_UNORM
        | F::R8G8_SNORM
        | F::R8G8_USCALED
        | F::R8G8_SSCALED
        | F::R8G8_UINT
        | F::R8G8_SINT
        | F::R8G8_SRGB
        | F::R16_UNORM
        | F::R16_SNORM
        | F::R16_USCALED
        | F::R16_SSCALED
        | F::R16_UINT
        | F::R16_SINT
        | F::R16_SFLOAT
        | F::D16_UNORM => S::texel(2),

        F::R8G8B8_UNORM
        | F::R8G8B8_SNORM
        | F::R8G8B8_USCALED
        | F::R8G8B8_SSCALED
        | F::R8G8B8_UINT
        | F::R8G8B8_SINT
        | F::R8G8B8_SRGB
        | F::B8G8R8_UNORM
        | F::B8G8R8_SNORM
        | F::B8G8R8_USCALED
        | F::B8G8R8_SSCALED
        | F::B8G8R8_UINT
        | F::B8G8R8_SINT
        | F::B8G8R8_SRGB
        | F::D16_UNORM_S8_UINT => S::texel(3),

        F::R8G8B8A8_UNORM
        | F::R8G8B8A8_SNORM
        | F::R8G8B8A8_USCALED
        | F::R8G8B8A8_SSCALED
        | F::R8G8B8A8_UINT
        | F::R8G8B8A8_SINT
        | F::R8G8B8A8_SRGB
        | F::B8G8R8A8_UNORM
        | F::B8G8R8A8_SNORM
        | F::B8G8R8A8_USCALED
        | F::B8G8R8A8_SSCALED
        | F::B8G8R8A8_UINT
        | F::B8G8R8A8_SINT
        | F::B8G8R8A8_SRGB
        | F::A8B8G8R8_UNORM_PACK32
        | F::A8B8G8R8_SNORM_PACK32
        | F::A8B8G8R8_USCALED_PACK32
        | F::A8B8G8R8_SSCALED_PACK32
        | F::A8B8G8R8_UINT_PACK32
        | F::A8B8G8R8_SINT_PACK32
        | F::A8B8G8R8_SRGB_PACK32
        | F::A2R10G10B10_UNORM_PACK32
        | F::A2R10G10B10_SNORM_PACK32
        | F::A2R10G10B10_USCALED_PACK32
        | F::A2R10G10B10_SSCALED_PACK32
        | F::A2R10G10B10_UINT_PACK32
        | F::A2R10G10B10_SINT_PACK32
        | F::A2B10G10R10_UNORM_PACK32
        | F::A2B10G10R10_SNORM_PACK32
        | F::A2B10G10R10_USCALED_PACK32
        | F::A2B10G10R10_SSCALED_PACK32
        | F::A2B10G10R10_UINT_PACK32
        | F::A2B10G10R10_SINT_PACK32
        | F::R16G16_UNORM
        | F::R16G16_SNORM
        | F::R16G16_USCALED
        | F::R16G16_SSCALED
        | F::R16G16_UINT
        | F::R16G16_SINT
        | F::R16G16_SFLOAT
        | F::R32_UINT
        | F::R32_SINT
        | F::R32_SFLOAT
        | F::B10G11R11_UFLOAT_PACK32
        | F::E5B9G9R9_UFLOAT_PACK32
        | F::X8_D24_UNORM_PACK32
        | F::D32_SFLOAT
        | F::D24_UNORM_S8_UINT => S::texel(4),

        F::D32_SFLOAT_S8_UINT => S::texel(5),

        F::R16G16B16_UNORM
        | F::R16G16B16_SNORM
        | F::R16G16B16_USCALED
        | F::R16G16B16_SSCALED
        | F::R16G16B16_UINT
        | F::R16G16B16_SINT
        | F::R16G16B16_SFLOAT => S::texel(6),

        F::R16G16B16A16_UNORM
        | F::R16G16B16A16_SNORM
        | F::R16G16B16A16_USCALED
        | F::R16G16B16A16_SSCALED
        | F::R16G16B16A16_UINT
        | F::R16G16B16A16_SINT
        | F::R16G16B16A16_SFLOAT
        | F::R32G32_UINT
        | F::R32G32_SINT
        | F::R32G32_SFLOAT
        | F::R64_UINT
        | F::R64_SINT
        | F::R64_SFLOAT => S::texel(8),

        F::R32G32B32_UINT | F::R32G32B32_SINT | F::R32G32B32_SFLOAT => S::texel(12),

        F::R32G32B32A32_UINT
        | F::R32G32B32A32_SINT
        | F::R32G32B32A32_SFLOAT
        | F::R64G64_UINT
        | F::R64G64_SINT
        | F::R64G64_SFLOAT => S::texel(16),

        F::R64G64B64_UINT | F::R64G64B64_SINT | F::R64G64B64_SFLOAT => S::texel(24),

        F::R64G64B64A64_UINT | F::R64G64B64A64_SINT | F::R64G64B64A64_SFLOAT => S::texel(32),

        // Packed 4:2:2, two texels share one block
        F::G8B8G8R8_422_UNORM | F::B8G8R8G8_422_UNORM => S::block(4, 2, 1),
        F::G16B16G16R16_422_UNORM
        | F::B16G16R16G16_422_UNORM
        | F::G10X6B10X6G10X6R10X6_422_UNORM_4PACK16
        | F::B10X6G10X6R10X6G10X6_422_UNORM_4PACK16
        | F::G12X4B12X4G12X4R12X4_422_UNORM_4PACK16
        | F::B12X4G12X4R12X4G12X4_422_UNORM_4PACK16 => S::block(8, 2, 1),

        // Block compressed
        F::BC1_RGB_UNORM_BLOCK
        | F::BC1_RGB_SRGB_BLOCK
        | F::BC1_RGBA_UNORM_BLOCK
        | F::BC1_RGBA_SRGB_BLOCK
        | F::BC4_UNORM_BLOCK
        | F::BC4_SNORM_BLOCK
        | F::ETC2_R8G8B8_UNORM_BLOCK
        | F::ETC2_R8G8B8_SRGB_BLOCK
        | F::ETC2_R8G8B8A1_UNORM_BLOCK
        | F::ETC2_R8G8B8A1_SRGB_BLOCK
        | F::EAC_R11_UNORM_BLOCK
        | F::EAC_R11_SNORM_BLOCK => S::block(8, 4, 4),

        F::BC2_UNORM_BLOCK
        | F::BC2_SRGB_BLOCK
        | F::BC3_UNORM_BLOCK
        | F::BC3_SRGB_BLOCK
        | F::BC5_UNORM_BLOCK
        | F::BC5_SNORM_BLOCK
        | F::BC6H_UFLOAT_BLOCK
        | F::BC6H_SFLOAT_BLOCK
        | F::BC7_UNORM_BLOCK
        | F::BC7_SRGB_BLOCK
        | F::ETC2_R8G8B8A8_UNORM_BLOCK
        | F::ETC2_R8G8B8A8_SRGB_BLOCK
        | F::EAC_R11G11_UNORM_BLOCK
        | F::EAC_R11G11_SNORM_BLOCK => S::block(16, 4, 4),

        F::ASTC_4X4_UNORM_BLOCK | F::ASTC_4X4_SRGB_BLOCK => S::block(16, 4, 4),
        F::ASTC_5X4_UNORM_BLOCK | F::ASTC_5X4_SRGB_BLOCK => S::block(16, 5, 4),
        F::ASTC_5X5_UNORM_BLOCK | F::ASTC_5X5_SRGB_BLOCK => S::block(16, 5, 5),
        F::ASTC_6X5_UNORM_BLOCK | F::ASTC_6X5_SRGB_BLOCK => S::block(16, 6, 5),
        F::ASTC_6X6_UNORM_BLOCK | F::ASTC_6X6_SRGB_BLOCK => S::block(16, 6, 6),
        F::ASTC_8X5_UNORM_BLOCK | F::ASTC_8X5_SRGB_BLOCK => S::block(16, 8, 5),
        F::ASTC_8X6_UNORM_BLOCK | F::ASTC_8X6_SRGB_BLOCK => S::block(16, 8, 6),
        F::ASTC_8X8_UNORM_BLOCK | F::ASTC_8X8_SRGB_BLOCK => S::block(16, 8, 8),
        F::ASTC_10X5_UNORM_BLOCK | F::ASTC_10X5_SRGB_BLOCK => S::block(16, 10, 5),
        F::ASTC_10X6_UNORM_BLOCK | F::ASTC_10X6_SRGB_BLOCK => S::block(16, 10, 6),
        F::ASTC_10X8_UNORM_BLOCK | F::ASTC_10X8_SRGB_BLOCK => S::block(16, 10, 8),
        F::ASTC_10X10_UNORM_BLOCK | F::ASTC_10X10_SRGB_BLOCK => S::block(16, 10, 10),
        F::ASTC_12X10_UNORM_BLOCK | F::ASTC_12X10_SRGB_BLOCK => S::block(16, 12, 10),
        F::ASTC_12X12_UNORM_BLOCK | F::ASTC_12X12_SRGB_BLOCK => S::block(16, 12, 12),

        _ => return None,
    };

    Some(size)
}

// Size of a single depth element, either as stored in the image or as laid out
// in a buffer by a depth aspect copy (24 bit depth gets padded to 32 bits)
pub fn depth_element_size(format: vk::Format, in_buffer: bool) -> u32 {
    match format {
        vk::Format::D16_UNORM | vk::Format::D16_UNORM_S8_UINT => 2,
        vk::Format::X8_D24_UNORM_PACK32 | vk::Format::D24_UNORM_S8_UINT => {
            if in_buffer {
                4
            } else {
                3
            }
        }
        vk::Format::D32_SFLOAT | vk::Format::D32_SFLOAT_S8_UINT => 4,
        _ => 0,
    }
}

// Element size of a single aspect of the format
// Depth and stencil have their own rules, planes use the per plane element size
pub fn element_size_for_aspect(
    format: vk::Format,
    aspect: vk::ImageAspectFlags,
    in_buffer: bool,
) -> u32 {
    if aspect == vk::ImageAspectFlags::DEPTH {
        return depth_element_size(format, in_buffer);
    }

    if aspect == vk::ImageAspectFlags::STENCIL {
        return 1;
    }

    if let Some(plane) = plane_index(aspect) {
        if let Some(planar) = super::planar_layout(format) {
            return planar.plane_element_size(plane);
        }
    }

    element_and_texel_block_size(format)
        .map(|size| size.element_size)
        .unwrap_or(0)
}

// Convert a plane aspect bit to its plane index
pub fn plane_index(aspect: vk::ImageAspectFlags) -> Option<u32> {
    match aspect {
        vk::ImageAspectFlags::PLANE_0 => Some(0),
        vk::ImageAspectFlags::PLANE_1 => Some(1),
        vk::ImageAspectFlags::PLANE_2 => Some(2),
        _ => None,
    }
}

// Iterate over the single bits of an aspect mask, lowest bit first
pub fn aspect_bits(mask: vk::ImageAspectFlags) -> impl Iterator<Item = vk::ImageAspectFlags> {
    let raw = mask.as_raw();
    (0..u32::BITS)
        .map(|i| 1u32 << i)
        .filter(move |bit| raw & bit != 0)
        .map(vk::ImageAspectFlags::from_raw)
}

// Size of a dimension at the given mip level
pub fn mip_size(dimension: u32, level: u32) -> u32 {
    dimension.checked_shr(level).unwrap_or(0).max(1)
}

// Number of blocks of the given size needed to cover a dimension
pub fn round_up_to(value: u32, divisor: u32) -> u32 {
    if divisor == 0 {
        return value;
    }
    (value + divisor - 1) / divisor
}

// Staging regions are placed on 8 byte boundaries
pub fn next_multiple_of_8(value: vk::DeviceSize) -> vk::DeviceSize {
    (value + 7) & !7
}
