// SPDX-License-Identifier: CEPL-1.0
use crate::formats::has_stencil;
use anyhow::{anyhow, Context, Result};
use ash::vk;

pub(crate) fn find_memory_type(
    props: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    req: vk::MemoryPropertyFlags,
) -> Option<u32> {
    (0..props.memory_type_count).find(|&i| {
        (type_bits & (1 << i)) != 0 && props.memory_types[i as usize].property_flags.contains(req)
    })
}

unsafe fn allocate(
    device: &ash::Device,
    props: &vk::PhysicalDeviceMemoryProperties,
    req: vk::MemoryRequirements,
    flags: vk::MemoryPropertyFlags,
) -> Result<vk::DeviceMemory> {
    let memory_type_index = find_memory_type(props, req.memory_type_bits, flags)
        .ok_or_else(|| anyhow!("no memory type with {flags:?}"))?;
    let mai = vk::MemoryAllocateInfo {
        s_type: vk::StructureType::MEMORY_ALLOCATE_INFO,
        allocation_size: req.size,
        memory_type_index,
        ..Default::default()
    };
    Ok(device.allocate_memory(&mai, None)?)
}

pub(crate) unsafe fn create_buffer_and_memory(
    device: &ash::Device,
    props: &vk::PhysicalDeviceMemoryProperties,
    size: vk::DeviceSize,
    usage: vk::BufferUsageFlags,
    flags: vk::MemoryPropertyFlags,
) -> Result<(vk::Buffer, vk::DeviceMemory)> {
    let bci = vk::BufferCreateInfo {
        s_type: vk::StructureType::BUFFER_CREATE_INFO,
        size,
        usage,
        sharing_mode: vk::SharingMode::EXCLUSIVE,
        ..Default::default()
    };
    let buf = device.create_buffer(&bci, None)?;
    let req = device.get_buffer_memory_requirements(buf);
    let mem = match allocate(device, props, req, flags) {
        Ok(m) => m,
        Err(e) => {
            device.destroy_buffer(buf, None);
            return Err(e);
        }
    };
    if let Err(e) = device.bind_buffer_memory(buf, mem, 0) {
        device.destroy_buffer(buf, None);
        device.free_memory(mem, None);
        return Err(e.into());
    }
    Ok((buf, mem))
}

pub(crate) unsafe fn create_host_visible_ubo(
    device: &ash::Device,
    props: &vk::PhysicalDeviceMemoryProperties,
    size: vk::DeviceSize,
) -> Result<(vk::Buffer, vk::DeviceMemory)> {
    create_buffer_and_memory(
        device,
        props,
        size,
        vk::BufferUsageFlags::UNIFORM_BUFFER,
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
    )
}

/// Copies `bytes` into host-coherent `mem` at offset 0.
pub(crate) unsafe fn write_mapped(
    device: &ash::Device,
    mem: vk::DeviceMemory,
    bytes: &[u8],
) -> Result<()> {
    let ptr = device
        .map_memory(mem, 0, bytes.len() as vk::DeviceSize, vk::MemoryMapFlags::empty())
        .context("map_memory")?;
    std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr as *mut u8, bytes.len());
    device.unmap_memory(mem);
    Ok(())
}

/// One-shot staging upload: host -> staging -> `dst` (device-local).
/// Blocks on the queue until the copy is done.
pub(crate) unsafe fn upload_via_staging(
    device: &ash::Device,
    props: &vk::PhysicalDeviceMemoryProperties,
    queue: vk::Queue,
    cmd_pool: vk::CommandPool,
    dst: vk::Buffer,
    src_data: &[u8],
) -> Result<()> {
    let size = src_data.len() as vk::DeviceSize;
    let (staging, staging_mem) = create_buffer_and_memory(
        device,
        props,
        size,
        vk::BufferUsageFlags::TRANSFER_SRC,
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
    )?;

    let result = copy_through(device, queue, cmd_pool, staging, staging_mem, dst, src_data);

    device.destroy_buffer(staging, None);
    device.free_memory(staging_mem, None);
    result
}

unsafe fn copy_through(
    device: &ash::Device,
    queue: vk::Queue,
    cmd_pool: vk::CommandPool,
    staging: vk::Buffer,
    staging_mem: vk::DeviceMemory,
    dst: vk::Buffer,
    src_data: &[u8],
) -> Result<()> {
    write_mapped(device, staging_mem, src_data)?;

    let ai = vk::CommandBufferAllocateInfo {
        s_type: vk::StructureType::COMMAND_BUFFER_ALLOCATE_INFO,
        command_pool: cmd_pool,
        level: vk::CommandBufferLevel::PRIMARY,
        command_buffer_count: 1,
        ..Default::default()
    };
    let cmd = device
        .allocate_command_buffers(&ai)?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("driver returned no command buffer"))?;

    let result = (|| -> Result<()> {
        let bi = vk::CommandBufferBeginInfo {
            s_type: vk::StructureType::COMMAND_BUFFER_BEGIN_INFO,
            flags: vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT,
            ..Default::default()
        };
        device.begin_command_buffer(cmd, &bi)?;
        let region = vk::BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size: src_data.len() as vk::DeviceSize,
        };
        device.cmd_copy_buffer(cmd, staging, dst, std::slice::from_ref(&region));
        device.end_command_buffer(cmd)?;

        let si = vk::SubmitInfo {
            s_type: vk::StructureType::SUBMIT_INFO,
            command_buffer_count: 1,
            p_command_buffers: &cmd,
            ..Default::default()
        };
        device.queue_submit(queue, std::slice::from_ref(&si), vk::Fence::null())?;
        device.queue_wait_idle(queue)?;
        Ok(())
    })();

    device.free_command_buffers(cmd_pool, std::slice::from_ref(&cmd));
    result
}

pub(crate) struct DepthTarget {
    pub image: vk::Image,
    pub memory: vk::DeviceMemory,
    pub view: vk::ImageView,
}

pub(crate) unsafe fn create_depth_resources(
    device: &ash::Device,
    props: &vk::PhysicalDeviceMemoryProperties,
    extent: vk::Extent2D,
    depth_format: vk::Format,
) -> Result<DepthTarget> {
    let img_ci = vk::ImageCreateInfo {
        s_type: vk::StructureType::IMAGE_CREATE_INFO,
        image_type: vk::ImageType::TYPE_2D,
        format: depth_format,
        extent: vk::Extent3D {
            width: extent.width,
            height: extent.height,
            depth: 1,
        },
        mip_levels: 1,
        array_layers: 1,
        samples: vk::SampleCountFlags::TYPE_1,
        tiling: vk::ImageTiling::OPTIMAL,
        usage: vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
        sharing_mode: vk::SharingMode::EXCLUSIVE,
        initial_layout: vk::ImageLayout::UNDEFINED,
        ..Default::default()
    };
    let image = device.create_image(&img_ci, None).context("create depth image")?;

    let req = device.get_image_memory_requirements(image);
    let memory = match allocate(device, props, req, vk::MemoryPropertyFlags::DEVICE_LOCAL) {
        Ok(m) => m,
        Err(e) => {
            device.destroy_image(image, None);
            return Err(e.context("depth memory"));
        }
    };
    let mut target = DepthTarget {
        image,
        memory,
        view: vk::ImageView::null(),
    };
    if let Err(e) = device.bind_image_memory(image, memory, 0) {
        target.destroy(device);
        return Err(anyhow!("bind depth memory: {e:?}"));
    }

    let mut aspect_mask = vk::ImageAspectFlags::DEPTH;
    if has_stencil(depth_format) {
        aspect_mask |= vk::ImageAspectFlags::STENCIL;
    }
    let view_ci = vk::ImageViewCreateInfo {
        s_type: vk::StructureType::IMAGE_VIEW_CREATE_INFO,
        image,
        view_type: vk::ImageViewType::TYPE_2D,
        format: depth_format,
        subresource_range: vk::ImageSubresourceRange {
            aspect_mask,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        },
        ..Default::default()
    };
    match device.create_image_view(&view_ci, None) {
        Ok(view) => target.view = view,
        Err(e) => {
            target.destroy(device);
            return Err(anyhow!("create depth view: {e:?}"));
        }
    }
    Ok(target)
}

impl DepthTarget {
    pub(crate) unsafe fn destroy(&self, device: &ash::Device) {
        device.destroy_image_view(self.view, None);
        device.destroy_image(self.image, None);
        device.free_memory(self.memory, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(flags: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut p = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: flags.len() as u32,
            ..Default::default()
        };
        for (i, &f) in flags.iter().enumerate() {
            p.memory_types[i].property_flags = f;
        }
        p
    }

    #[test]
    fn memory_type_respects_type_bits_and_flags() {
        use vk::MemoryPropertyFlags as M;
        let p = props(&[
            M::DEVICE_LOCAL,
            M::HOST_VISIBLE,
            M::HOST_VISIBLE | M::HOST_COHERENT,
            M::DEVICE_LOCAL | M::HOST_VISIBLE | M::HOST_COHERENT,
        ]);

        let host = M::HOST_VISIBLE | M::HOST_COHERENT;
        assert_eq!(find_memory_type(&p, 0b1111, host), Some(2));
        assert_eq!(find_memory_type(&p, 0b1000, host), Some(3));
        assert_eq!(find_memory_type(&p, 0b1111, M::DEVICE_LOCAL), Some(0));
        assert_eq!(find_memory_type(&p, 0b0011, host), None);
        assert_eq!(find_memory_type(&p, 0, M::empty()), None);
    }
}
