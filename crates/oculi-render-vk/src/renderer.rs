// SPDX-License-Identifier: CEPL-1.0
use crate::formats::format_name;
use crate::frame::{CameraUbo, FrameDeps, FrameResource, SwapchainPool};
use crate::mesh::{cube, Mesh};
use crate::pipeline::{
    create_camera_desc_set_layout, create_command_pool, create_descriptor_pool, create_pipeline,
    create_pipeline_layout, create_render_pass, MAX_FRAME_SETS,
};
use crate::GpuContext;
use anyhow::{anyhow, Context, Result};
use ash::vk;
use oculi_core::SetupError;
use oculi_math::{FAR_CLIP, NEAR_CLIP};
use oculi_render::{Eye, EyeMatrices, EyeRenderer, EyeView, SceneState};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Half edge length of the cube drawn for the object and the hand cue, in metres.
const CUBE_HALF_EXTENT: f32 = 0.05;

/// One eye's swapchain as the XR runtime created it.
#[derive(Clone, Debug)]
pub struct SwapchainTarget {
    pub format: vk::Format,
    pub extent: vk::Extent2D,
    pub images: Vec<vk::Image>,
}

/// Records and submits each eye's scene into runtime-owned swapchain images.
pub struct VkEyeRenderer {
    device: ash::Device,
    queue: vk::Queue,

    render_pass: vk::RenderPass,
    desc_set_layout: vk::DescriptorSetLayout,
    pipeline_layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
    cmd_pool: vk::CommandPool,
    desc_pool: vk::DescriptorPool,
    mesh: Mesh,

    pools: [SwapchainPool; 2],
    clear: [f32; 4],
    fence_timeout: Duration,
    idle: IdleTracker,
}

/// Whether the queue may still be executing work this renderer submitted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct IdleTracker {
    quiesced: bool,
}

impl IdleTracker {
    pub fn submitted(&mut self) {
        self.quiesced = false;
    }

    pub fn waited(&mut self) {
        self.quiesced = true;
    }

    pub fn needs_wait(&self) -> bool {
        !self.quiesced
    }
}

pub(crate) fn timeout_ns(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX)
}

/// A fence still unsignalled after `timeout` means the GPU is hung or lost; report it
/// instead of blocking the frame loop forever.
pub(crate) fn fence_wait_outcome(
    waited: std::result::Result<(), vk::Result>,
    timeout: Duration,
) -> Result<()> {
    match waited {
        Ok(()) => Ok(()),
        Err(vk::Result::TIMEOUT) => Err(anyhow!(
            "frame fence still unsignalled after {timeout:?}"
        )),
        Err(e) => Err(e).context("wait for frame fence"),
    }
}

fn setup(what: &'static str) -> impl FnOnce(anyhow::Error) -> SetupError {
    move |e| SetupError::create(what, format_args!("{e:#}"))
}

impl VkEyeRenderer {
    pub fn new(
        gpu: &GpuContext,
        targets: [SwapchainTarget; 2],
        clear: [f32; 4],
        fence_timeout: Duration,
    ) -> Result<Self, SetupError> {
        let color_format = targets[0].format;
        if targets[1].format != color_format {
            return Err(SetupError::create(
                "render pass",
                format_args!(
                    "eye swapchains differ in format ({} vs {})",
                    format_name(color_format),
                    format_name(targets[1].format)
                ),
            ));
        }
        let image_total: usize = targets.iter().map(|t| t.images.len()).sum();
        if image_total > MAX_FRAME_SETS as usize {
            return Err(SetupError::create(
                "descriptor pool",
                format_args!("{image_total} swapchain images exceed {MAX_FRAME_SETS} sets"),
            ));
        }
        let depth_format = gpu.depth_format()?;

        // Every handle starts null; Drop releases whatever was created if a step fails.
        let mut r = VkEyeRenderer {
            device: gpu.device().clone(),
            queue: gpu.queue(),
            render_pass: vk::RenderPass::null(),
            desc_set_layout: vk::DescriptorSetLayout::null(),
            pipeline_layout: vk::PipelineLayout::null(),
            pipeline: vk::Pipeline::null(),
            cmd_pool: vk::CommandPool::null(),
            desc_pool: vk::DescriptorPool::null(),
            mesh: Mesh::default(),
            pools: Default::default(),
            clear,
            fence_timeout,
            idle: IdleTracker::default(),
        };

        unsafe {
            let d = &r.device;
            r.render_pass =
                create_render_pass(d, color_format, depth_format).map_err(setup("render pass"))?;
            r.desc_set_layout =
                create_camera_desc_set_layout(d).map_err(setup("descriptor set layout"))?;
            r.pipeline_layout = create_pipeline_layout(d, r.desc_set_layout)
                .map_err(setup("pipeline layout"))?;
            r.pipeline =
                create_pipeline(d, r.render_pass, r.pipeline_layout).map_err(setup("pipeline"))?;
            r.cmd_pool =
                create_command_pool(d, gpu.queue_family()).map_err(setup("command pool"))?;
            r.desc_pool = create_descriptor_pool(d).map_err(setup("descriptor pool"))?;

            let (vertices, indices) = cube(CUBE_HALF_EXTENT);
            let mut mesh = Mesh::default();
            let uploaded = mesh.upload(
                d,
                gpu.memory_properties(),
                r.queue,
                r.cmd_pool,
                &vertices,
                &indices,
            );
            r.mesh = mesh;
            uploaded.map_err(setup("mesh"))?;

            let deps = FrameDeps {
                device: &r.device,
                memory: gpu.memory_properties(),
                render_pass: r.render_pass,
                set_layout: r.desc_set_layout,
                cmd_pool: r.cmd_pool,
                desc_pool: r.desc_pool,
                color_format,
                depth_format,
            };
            let mut pools: [SwapchainPool; 2] = Default::default();
            for eye in Eye::BOTH {
                let target = &targets[eye.index()];
                match SwapchainPool::new(&deps, &target.images, target.extent) {
                    Ok(pool) => pools[eye.index()] = pool,
                    Err(e) => {
                        for built in &mut pools {
                            built.destroy(deps.device, deps.cmd_pool, deps.desc_pool);
                        }
                        return Err(setup("frame resources")(e.context(format!("{eye} eye"))));
                    }
                }
            }
            r.pools = pools;
        }

        for eye in Eye::BOTH {
            let t = &targets[eye.index()];
            info!(
                "{eye} eye: {} frame resources, {}x{} {}",
                t.images.len(),
                t.extent.width,
                t.extent.height,
                format_name(t.format)
            );
        }
        debug!("depth format {}", format_name(depth_format));
        // The mesh upload drained the queue.
        r.idle.waited();
        Ok(r)
    }

    unsafe fn record(
        &self,
        frame: &FrameResource,
        extent: vk::Extent2D,
        scene: &SceneState,
    ) -> Result<()> {
        let d = &self.device;
        let cmd = frame.cmd;

        d.reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())?;
        let begin = vk::CommandBufferBeginInfo {
            s_type: vk::StructureType::COMMAND_BUFFER_BEGIN_INFO,
            flags: vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT,
            ..Default::default()
        };
        d.begin_command_buffer(cmd, &begin)?;

        let clears = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: self.clear,
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            },
        ];
        let area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        let rp_begin = vk::RenderPassBeginInfo {
            s_type: vk::StructureType::RENDER_PASS_BEGIN_INFO,
            render_pass: self.render_pass,
            framebuffer: frame.framebuffer,
            render_area: area,
            clear_value_count: clears.len() as u32,
            p_clear_values: clears.as_ptr(),
            ..Default::default()
        };
        d.cmd_begin_render_pass(cmd, &rp_begin, vk::SubpassContents::INLINE);

        let vp = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        d.cmd_set_viewport(cmd, 0, std::slice::from_ref(&vp));
        d.cmd_set_scissor(cmd, 0, std::slice::from_ref(&area));

        d.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, self.pipeline);
        d.cmd_bind_descriptor_sets(
            cmd,
            vk::PipelineBindPoint::GRAPHICS,
            self.pipeline_layout,
            0,
            std::slice::from_ref(&frame.desc_set),
            &[],
        );
        d.cmd_bind_vertex_buffers(cmd, 0, std::slice::from_ref(&self.mesh.vbuf), &[0]);
        d.cmd_bind_index_buffer(cmd, self.mesh.ibuf, 0, vk::IndexType::UINT32);

        for model in scene.draws() {
            let cols = model.to_cols_array();
            d.cmd_push_constants(
                cmd,
                self.pipeline_layout,
                vk::ShaderStageFlags::VERTEX,
                0,
                bytemuck::cast_slice(&cols[..]),
            );
            d.cmd_draw_indexed(cmd, self.mesh.index_count, 1, 0, 0, 0);
        }

        d.cmd_end_render_pass(cmd);
        d.end_command_buffer(cmd)?;
        Ok(())
    }
}

impl EyeRenderer for VkEyeRenderer {
    fn image_count(&self, eye: Eye) -> usize {
        self.pools[eye.index()].frames.len()
    }

    fn render_eye(
        &mut self,
        eye: Eye,
        image_index: u32,
        view: &EyeView,
        scene: &SceneState,
    ) -> Result<()> {
        let pool = &self.pools[eye.index()];
        let frame = pool
            .frames
            .get(image_index as usize)
            .ok_or_else(|| anyhow!("no frame resource for image {image_index}"))?;
        let camera = CameraUbo::from(EyeMatrices::for_view(view, NEAR_CLIP, FAR_CLIP));

        unsafe {
            let d = &self.device;
            let waited = d.wait_for_fences(
                std::slice::from_ref(&frame.fence),
                true,
                timeout_ns(self.fence_timeout),
            );
            fence_wait_outcome(waited, self.fence_timeout)?;
            frame.write_camera(d, &camera).context("camera ubo")?;
            self.record(frame, pool.extent, scene).context("record")?;

            d.reset_fences(std::slice::from_ref(&frame.fence))
                .context("reset frame fence")?;
            let submit = vk::SubmitInfo {
                s_type: vk::StructureType::SUBMIT_INFO,
                command_buffer_count: 1,
                p_command_buffers: &frame.cmd,
                ..Default::default()
            };
            self.idle.submitted();
            d.queue_submit(self.queue, std::slice::from_ref(&submit), frame.fence)
                .context("queue_submit")?;
        }
        trace!("{eye} eye image {image_index} submitted");
        Ok(())
    }

    fn wait_idle(&mut self) -> Result<()> {
        unsafe { self.device.device_wait_idle() }.context("device_wait_idle")?;
        self.idle.waited();
        Ok(())
    }

    fn release_frames(&mut self) {
        let released: usize = self.pools.iter().map(|p| p.frames.len()).sum();
        for pool in self.pools.iter_mut() {
            unsafe { pool.destroy(&self.device, self.cmd_pool, self.desc_pool) };
        }
        if released > 0 {
            debug!("released {released} frame resources");
        }
    }
}

// Teardown order: quiesce the GPU unless wait_idle already did, then frame resources (they hold command buffers and
// descriptor sets from the pools), then pipeline objects, mesh, pools, render pass.
// The device itself belongs to GpuContext.
impl Drop for VkEyeRenderer {
    fn drop(&mut self) {
        if self.idle.needs_wait() {
            if let Err(e) = unsafe { self.device.device_wait_idle() } {
                warn!("device_wait_idle before teardown failed: {e:?}");
            }
        }
        self.release_frames();
        unsafe {
            let d = &self.device;
            d.destroy_pipeline(self.pipeline, None);
            d.destroy_pipeline_layout(self.pipeline_layout, None);
            self.mesh.destroy(d);
            d.destroy_descriptor_pool(self.desc_pool, None);
            d.destroy_descriptor_set_layout(self.desc_set_layout, None);
            d.destroy_command_pool(self.cmd_pool, None);
            d.destroy_render_pass(self.render_pass, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_tracker_waits_before_teardown() {
        assert!(IdleTracker::default().needs_wait());
    }

    #[test]
    fn wait_idle_covers_teardown_until_the_next_submit() {
        let mut idle = IdleTracker::default();
        idle.waited();
        assert!(!idle.needs_wait());
        idle.submitted();
        assert!(idle.needs_wait());
        idle.waited();
        assert!(!idle.needs_wait());
    }

    #[test]
    fn fence_timeout_is_reported_as_an_error() {
        let err = fence_wait_outcome(Err(vk::Result::TIMEOUT), Duration::from_millis(250))
            .unwrap_err();
        assert!(err.to_string().contains("250ms"), "{err}");
    }

    #[test]
    fn device_loss_keeps_its_cause() {
        let err = fence_wait_outcome(
            Err(vk::Result::ERROR_DEVICE_LOST),
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "wait for frame fence");
        assert_eq!(
            err.downcast_ref::<vk::Result>(),
            Some(&vk::Result::ERROR_DEVICE_LOST)
        );
        assert!(fence_wait_outcome(Ok(()), Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn oversized_timeouts_saturate() {
        assert_eq!(timeout_ns(Duration::from_millis(3)), 3_000_000);
        assert_eq!(timeout_ns(Duration::MAX), u64::MAX);
    }
}
