use ash::vk::{self, Handle};

// Pick a host visible memory type for a staging allocation
// Prefers host coherent memory, falls back to plain host visible memory
pub fn staging_memory_type_index(
    properties: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
) -> Option<u32> {
    let count = (properties.memory_type_count as usize).min(properties.memory_types.len());
    let allowed = |index: &usize| type_bits & (1u32 << *index) != 0;
    let find = |flags: vk::MemoryPropertyFlags| {
        (0..count)
            .filter(allowed)
            .find(|&index| properties.memory_types[index].property_flags.contains(flags))
            .map(|index| index as u32)
    };

    find(vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT)
        .or_else(|| find(vk::MemoryPropertyFlags::HOST_VISIBLE))
}

// Check if the range [offset, offset + size) is covered by the given sparse bindings without gaps
// Bindings may overlap and come in any order, binds without memory do not count
pub fn is_fully_bound(
    offset: vk::DeviceSize,
    size: vk::DeviceSize,
    bindings: &[vk::SparseMemoryBind],
) -> bool {
    let end = offset.saturating_add(size);
    let mut intervals = bindings
        .iter()
        .filter(|bind| bind.memory != vk::DeviceMemory::null() && bind.size > 0)
        .map(|bind| (bind.resource_offset, bind.resource_offset.saturating_add(bind.size)))
        .filter(|&(start, stop)| stop > offset && start < end)
        .collect::<Vec<_>>();
    intervals.sort_unstable();

    // Sweep the sorted intervals, any interval starting past the cursor leaves a hole
    let mut covered = offset;
    for (start, stop) in intervals {
        if covered >= end {
            break;
        }
        if start > covered {
            return false;
        }
        covered = covered.max(stop);
    }

    covered >= end
}
