use ash::vk;

// Chroma subsampling of the non luma planes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Subsampling {
    S420,
    S422,
    S444,
}

// Memory layout of a multi-planar YCbCr format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlanarLayout {
    pub planes: u8,
    pub subsampling: Subsampling,
    pub bytes_per_component: u32,
}

impl PlanarLayout {
    // Element size of a single plane
    // Two plane formats interleave both chroma components in the second plane
    pub fn plane_element_size(&self, plane: u32) -> u32 {
        match (self.planes, plane) {
            (2, 1) => self.bytes_per_component * 2,
            (_, p) if p < self.planes as u32 => self.bytes_per_component,
            _ => 0,
        }
    }

    // Dimension divisor of a single plane, the luma plane is never subsampled
    pub fn plane_divisor(&self, plane: u32) -> AspectSizeDivisor {
        if plane == 0 {
            return AspectSizeDivisor::ONE;
        }

        match self.subsampling {
            Subsampling::S420 => AspectSizeDivisor { width: 2, height: 2 },
            Subsampling::S422 => AspectSizeDivisor { width: 2, height: 1 },
            Subsampling::S444 => AspectSizeDivisor::ONE,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AspectSizeDivisor {
    pub width: u32,
    pub height: u32,
}

impl AspectSizeDivisor {
    pub const ONE: Self = Self { width: 1, height: 1 };
}

// Fetch the plane layout of a multi-planar format
pub fn planar_layout(format: vk::Format) -> Option<PlanarLayout> {
    use vk::Format as F;
    let (planes, subsampling, bytes_per_component) = match format {
        F::G8_B8_R8_3PLANE_420_UNORM => (3, Subsampling::S420, 1),
        F::G8_B8_R8_3PLANE_422_UNORM => (3, Subsampling::S422, 1),
        F::G8_B8_R8_3PLANE_444_UNORM => (3, Subsampling::S444, 1),
        F::G8_B8R8_2PLANE_420_UNORM => (2, Subsampling::S420, 1),
        F::G8_B8R8_2PLANE_422_UNORM => (2, Subsampling::S422, 1),
        F::G8_B8R8_2PLANE_444_UNORM => (2, Subsampling::S444, 1),

        F::G10X6_B10X6_R10X6_3PLANE_420_UNORM_3PACK16
        | F::G12X4_B12X4_R12X4_3PLANE_420_UNORM_3PACK16
        | F::G16_B16_R16_3PLANE_420_UNORM => (3, Subsampling::S420, 2),
        F::G10X6_B10X6_R10X6_3PLANE_422_UNORM_3PACK16
        | F::G12X4_B12X4_R12X4_3PLANE_422_UNORM_3PACK16
        | F::G16_B16_R16_3PLANE_422_UNORM => (3, Subsampling::S422, 2),
        F::G10X6_B10X6_R10X6_3PLANE_444_UNORM_3PACK16
        | F::G12X4_B12X4_R12X4_3PLANE_444_UNORM_3PACK16
        | F::G16_B16_R16_3PLANE_444_UNORM => (3, Subsampling::S444, 2),
        F::G10X6_B10X6R10X6_2PLANE_420_UNORM_3PACK16
        | F::G12X4_B12X4R12X4_2PLANE_420_UNORM_3PACK16
        | F::G16_B16R16_2PLANE_420_UNORM => (2, Subsampling::S420, 2),
        F::G10X6_B10X6R10X6_2PLANE_422_UNORM_3PACK16
        | F::G12X4_B12X4R12X4_2PLANE_422_UNORM_3PACK16
        | F::G16_B16R16_2PLANE_422_UNORM => (2, Subsampling::S422, 2),
        F::G10X6_B10X6R10X6_2PLANE_444_UNORM_3PACK16
        | F::G12X4_B12X4R12X4_2PLANE_444_UNORM_3PACK16
        | F::G16_B16R16_2PLANE_444_UNORM => (2, Subsampling::S444, 2),
        _ => return None,
    };

    Some(PlanarLayout {
        planes,
        subsampling,
        bytes_per_component,
    })
}

// Divisor applied to the image extent for a single aspect of the format
pub fn aspect_size_divisor(format: vk::Format, aspect: vk::ImageAspectFlags) -> AspectSizeDivisor {
    match (planar_layout(format), super::plane_index(aspect)) {
        (Some(planar), Some(plane)) => planar.plane_divisor(plane),
        _ => AspectSizeDivisor::ONE,
    }
}
