// SPDX-License-Identifier: CEPL-1.0
use crate::memory::{create_depth_resources, create_host_visible_ubo, write_mapped, DepthTarget};
use anyhow::{Context, Result};
use ash::vk;
use bytemuck::{Pod, Zeroable};
use oculi_render::EyeMatrices;

/// Uniform block at set 0, binding 0. Matches `Camera` in the vertex shader.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub(crate) struct CameraUbo {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
}

impl From<EyeMatrices> for CameraUbo {
    fn from(m: EyeMatrices) -> Self {
        CameraUbo {
            projection: m.projection.to_cols_array_2d(),
            view: m.view.to_cols_array_2d(),
        }
    }
}

/// The handles shared by every frame resource of both eyes.
pub(crate) struct FrameDeps<'a> {
    pub device: &'a ash::Device,
    pub memory: &'a vk::PhysicalDeviceMemoryProperties,
    pub render_pass: vk::RenderPass,
    pub set_layout: vk::DescriptorSetLayout,
    pub cmd_pool: vk::CommandPool,
    pub desc_pool: vk::DescriptorPool,
    pub color_format: vk::Format,
    pub depth_format: vk::Format,
}

/// Everything needed to render into one swapchain image.
pub(crate) struct FrameResource {
    pub color_view: vk::ImageView,
    pub depth: DepthTarget,
    pub framebuffer: vk::Framebuffer,
    pub ubo: vk::Buffer,
    pub ubo_mem: vk::DeviceMemory,
    pub cmd: vk::CommandBuffer,
    pub desc_set: vk::DescriptorSet,
    /// Signalled while the slot is free for re-recording.
    pub fence: vk::Fence,
}

impl FrameResource {
    fn empty() -> Self {
        FrameResource {
            color_view: vk::ImageView::null(),
            depth: DepthTarget {
                image: vk::Image::null(),
                memory: vk::DeviceMemory::null(),
                view: vk::ImageView::null(),
            },
            framebuffer: vk::Framebuffer::null(),
            ubo: vk::Buffer::null(),
            ubo_mem: vk::DeviceMemory::null(),
            cmd: vk::CommandBuffer::null(),
            desc_set: vk::DescriptorSet::null(),
            fence: vk::Fence::null(),
        }
    }

    /// Builds in place so a failure part-way still leaves every created handle in `slot`
    /// for [`FrameResource::destroy`].
    unsafe fn build(
        slot: &mut FrameResource,
        deps: &FrameDeps<'_>,
        image: vk::Image,
        extent: vk::Extent2D,
    ) -> Result<()> {
        let d = deps.device;

        let iv_info = vk::ImageViewCreateInfo {
            s_type: vk::StructureType::IMAGE_VIEW_CREATE_INFO,
            image,
            view_type: vk::ImageViewType::TYPE_2D,
            format: deps.color_format,
            subresource_range: vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            },
            ..Default::default()
        };
        slot.color_view = d.create_image_view(&iv_info, None).context("colour view")?;

        slot.depth = create_depth_resources(d, deps.memory, extent, deps.depth_format)?;

        let views = [slot.color_view, slot.depth.view];
        let fb_info = vk::FramebufferCreateInfo {
            s_type: vk::StructureType::FRAMEBUFFER_CREATE_INFO,
            render_pass: deps.render_pass,
            attachment_count: views.len() as u32,
            p_attachments: views.as_ptr(),
            width: extent.width,
            height: extent.height,
            layers: 1,
            ..Default::default()
        };
        slot.framebuffer = d.create_framebuffer(&fb_info, None).context("framebuffer")?;

        let ubo_size = std::mem::size_of::<CameraUbo>() as vk::DeviceSize;
        (slot.ubo, slot.ubo_mem) =
            create_host_visible_ubo(d, deps.memory, ubo_size).context("camera ubo")?;

        let alloc = vk::CommandBufferAllocateInfo {
            s_type: vk::StructureType::COMMAND_BUFFER_ALLOCATE_INFO,
            command_pool: deps.cmd_pool,
            level: vk::CommandBufferLevel::PRIMARY,
            command_buffer_count: 1,
            ..Default::default()
        };
        slot.cmd = d
            .allocate_command_buffers(&alloc)
            .context("command buffer")?
            .into_iter()
            .next()
            .unwrap_or_default();

        let set_alloc = vk::DescriptorSetAllocateInfo {
            s_type: vk::StructureType::DESCRIPTOR_SET_ALLOCATE_INFO,
            descriptor_pool: deps.desc_pool,
            descriptor_set_count: 1,
            p_set_layouts: &deps.set_layout,
            ..Default::default()
        };
        slot.desc_set = d
            .allocate_descriptor_sets(&set_alloc)
            .context("descriptor set")?
            .into_iter()
            .next()
            .unwrap_or_default();

        let info = vk::DescriptorBufferInfo {
            buffer: slot.ubo,
            offset: 0,
            range: ubo_size,
        };
        let write = vk::WriteDescriptorSet {
            s_type: vk::StructureType::WRITE_DESCRIPTOR_SET,
            dst_set: slot.desc_set,
            dst_binding: 0,
            descriptor_count: 1,
            descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
            p_buffer_info: &info,
            ..Default::default()
        };
        d.update_descriptor_sets(std::slice::from_ref(&write), &[]);

        let fence_ci = vk::FenceCreateInfo {
            s_type: vk::StructureType::FENCE_CREATE_INFO,
            flags: vk::FenceCreateFlags::SIGNALED,
            ..Default::default()
        };
        slot.fence = d.create_fence(&fence_ci, None).context("frame fence")?;
        Ok(())
    }

    pub(crate) unsafe fn write_camera(&self, device: &ash::Device, camera: &CameraUbo) -> Result<()> {
        write_mapped(device, self.ubo_mem, bytemuck::bytes_of(camera))
    }

    /// Null handles are skipped by the driver, so this is safe on a part-built slot.
    unsafe fn destroy(
        &self,
        device: &ash::Device,
        cmd_pool: vk::CommandPool,
        desc_pool: vk::DescriptorPool,
    ) {
        device.destroy_fence(self.fence, None);
        if self.desc_set != vk::DescriptorSet::null() {
            logged(
                "freeing descriptor set",
                device.free_descriptor_sets(desc_pool, std::slice::from_ref(&self.desc_set)),
            );
        }
        if self.cmd != vk::CommandBuffer::null() {
            device.free_command_buffers(cmd_pool, std::slice::from_ref(&self.cmd));
        }
        device.destroy_buffer(self.ubo, None);
        device.free_memory(self.ubo_mem, None);
        device.destroy_framebuffer(self.framebuffer, None);
        self.depth.destroy(device);
        device.destroy_image_view(self.color_view, None);
    }
}

/// Teardown keeps going past a failed free; the failure is only reported.
fn logged(what: &str, result: ash::prelude::VkResult<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("{what} failed: {e:?}");
            false
        }
    }
}

/// The frame resources backing one eye's swapchain, indexed by swapchain image index.
#[derive(Default)]
pub(crate) struct SwapchainPool {
    pub extent: vk::Extent2D,
    pub frames: Vec<FrameResource>,
}

impl SwapchainPool {
    pub(crate) unsafe fn new(
        deps: &FrameDeps<'_>,
        images: &[vk::Image],
        extent: vk::Extent2D,
    ) -> Result<Self> {
        let mut pool = SwapchainPool {
            extent,
            frames: Vec::with_capacity(images.len()),
        };
        for (i, &image) in images.iter().enumerate() {
            let mut slot = FrameResource::empty();
            if let Err(e) = FrameResource::build(&mut slot, deps, image, extent) {
                slot.destroy(deps.device, deps.cmd_pool, deps.desc_pool);
                pool.destroy(deps.device, deps.cmd_pool, deps.desc_pool);
                return Err(e.context(format!("frame resource {i}")));
            }
            pool.frames.push(slot);
        }
        Ok(pool)
    }

    pub(crate) unsafe fn destroy(
        &mut self,
        device: &ash::Device,
        cmd_pool: vk::CommandPool,
        desc_pool: vk::DescriptorPool,
    ) {
        for frame in self.frames.drain(..) {
            frame.destroy(device, cmd_pool, desc_pool);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oculi_math::{Fov, Mat4, Pose, Vec3, FAR_CLIP, NEAR_CLIP};
    use oculi_render::EyeView;

    #[test]
    fn failed_free_is_reported_not_dropped() {
        assert!(logged("freeing descriptor set", Ok(())));
        assert!(!logged(
            "freeing descriptor set",
            Err(vk::Result::ERROR_OUT_OF_HOST_MEMORY)
        ));
    }

    #[test]
    fn camera_block_is_two_mat4() {
        assert_eq!(std::mem::size_of::<CameraUbo>(), 128);
    }

    #[test]
    fn camera_block_keeps_column_major_order() {
        let view = EyeView {
            pose: Pose::at(Vec3::new(0.0, 1.5, 0.0)),
            fov: Fov::symmetric(0.6, 0.6),
        };
        let m = EyeMatrices::for_view(&view, NEAR_CLIP, FAR_CLIP);
        let ubo = CameraUbo::from(m);
        assert_eq!(Mat4::from_cols_array_2d(&ubo.projection), m.projection);
        assert_eq!(Mat4::from_cols_array_2d(&ubo.view), m.view);
        // Translation lives in the fourth column.
        assert_eq!(ubo.view[3][1], m.view.w_axis.y);

        let bytes = bytemuck::bytes_of(&ubo);
        assert_eq!(&bytes[..64], bytemuck::cast_slice::<f32, u8>(&m.projection.to_cols_array()));
    }
}
