// SPDX-License-Identifier: CEPL-1.0
use crate::actions::HandActions;
use crate::convert::{
    choose_swapchain_format, fov_from_xr, fov_to_xr, location_flags, pose_from_xr, pose_to_xr,
    session_state,
};
use crate::{XrSettings, XrSystem};
use ash::vk::{self, Handle};
use oculi_core::SetupError;
use oculi_engine::{
    DisplayTime, FrameError, FrameTiming, Hand, ImageWait, RuntimeEvent, SyncOutcome, XrRuntime,
};
use oculi_math::{LocationFlags, Pose};
use oculi_render::{Eye, EyeView, RenderSize};
use oculi_render_vk::{format_name, GpuContext, SwapchainTarget};
use openxr as xr;
use std::ptr;
use std::time::Duration;
use tracing::{debug, info, trace};

const VIEW_CONFIG: xr::ViewConfigurationType = xr::ViewConfigurationType::PRIMARY_STEREO;

struct EyeSwapchain {
    handle: xr::Swapchain<xr::Vulkan>,
    size: RenderSize,
}

/// A Vulkan-backed OpenXR session: stage space, hand actions and one swapchain per eye.
///
/// Fields drop top to bottom, so every child handle goes before the session and the
/// session before the instance.
pub struct OpenXrRuntime {
    swapchains: Option<[EyeSwapchain; 2]>,
    actions: HandActions,
    stage: xr::Space,
    frame_stream: xr::FrameStream<xr::Vulkan>,
    frame_waiter: xr::FrameWaiter,
    session: xr::Session<xr::Vulkan>,
    events: xr::EventDataBuffer,
    system: XrSystem,
}

fn runtime_err(call: &'static str) -> impl FnOnce(xr::sys::Result) -> FrameError {
    move |e| FrameError::runtime(call, e)
}

fn xr_time(time: DisplayTime) -> xr::Time {
    xr::Time::from_nanos(time.0)
}

impl OpenXrRuntime {
    /// Binds a session to `gpu`'s device and queue and creates everything a frame needs.
    ///
    /// Returns the runtime together with the swapchain images the renderer draws into.
    pub fn new(
        system: XrSystem,
        gpu: &GpuContext,
        settings: &XrSettings,
        preferred_format: vk::Format,
    ) -> Result<(Self, [SwapchainTarget; 2]), SetupError> {
        let create_info = xr::vulkan::SessionCreateInfo {
            instance: gpu.instance().handle().handle().as_raw() as *const _,
            physical_device: gpu.physical_device().as_raw() as *const _,
            device: gpu.device().handle().as_raw() as *const _,
            queue_family_index: gpu.queue_family(),
            queue_index: 0,
        };
        let (session, frame_waiter, frame_stream) = unsafe {
            system
                .instance
                .create_session::<xr::Vulkan>(system.system, &create_info)
        }
        .map_err(|e| SetupError::create("OpenXR session", e))?;

        let stage = session
            .create_reference_space(settings.reference_space.to_xr(), xr::Posef::IDENTITY)
            .map_err(|e| SetupError::create("reference space", e))?;

        let actions =
            HandActions::new(&system.instance, &session, &settings.interaction_profile)?;

        let (swapchains, targets) = create_swapchains(&system, &session, preferred_format)?;

        let runtime = OpenXrRuntime {
            swapchains: Some(swapchains),
            actions,
            stage,
            frame_stream,
            frame_waiter,
            session,
            events: xr::EventDataBuffer::new(),
            system,
        };
        Ok((runtime, targets))
    }

    fn swapchain(&mut self, eye: Eye) -> Result<&mut EyeSwapchain, FrameError> {
        self.swapchains
            .as_mut()
            .map(|s| &mut s[eye.index()])
            .ok_or_else(|| FrameError::runtime("swapchain", "already destroyed"))
    }
}

fn create_swapchains(
    system: &XrSystem,
    session: &xr::Session<xr::Vulkan>,
    preferred: vk::Format,
) -> Result<([EyeSwapchain; 2], [SwapchainTarget; 2]), SetupError> {
    let views = system
        .instance
        .enumerate_view_configuration_views(system.system, VIEW_CONFIG)
        .map_err(|e| SetupError::create("view configuration", e))?;
    if views.len() < 2 {
        return Err(SetupError::create(
            "view configuration",
            format_args!("stereo configuration reports {} views", views.len()),
        ));
    }

    let formats = session
        .enumerate_swapchain_formats()
        .map_err(|e| SetupError::create("swapchain format query", e))?;
    let format = choose_swapchain_format(&formats, preferred)
        .ok_or(SetupError::NotFound("swapchain format"))?;
    info!(format = format_name(format), "swapchain format");

    let make = |view: &xr::ViewConfigurationView| -> Result<_, SetupError> {
        let size = RenderSize {
            width: view.recommended_image_rect_width,
            height: view.recommended_image_rect_height,
        };
        let handle = session
            .create_swapchain(&xr::SwapchainCreateInfo {
                create_flags: xr::SwapchainCreateFlags::EMPTY,
                usage_flags: xr::SwapchainUsageFlags::COLOR_ATTACHMENT,
                format: format.as_raw() as u32,
                sample_count: 1,
                width: size.width,
                height: size.height,
                face_count: 1,
                array_size: 1,
                mip_count: 1,
            })
            .map_err(|e| SetupError::create("swapchain", e))?;
        let images = handle
            .enumerate_images()
            .map_err(|e| SetupError::create("swapchain images", e))?
            .into_iter()
            .map(vk::Image::from_raw)
            .collect::<Vec<_>>();
        debug!(
            width = size.width,
            height = size.height,
            images = images.len(),
            "eye swapchain"
        );
        let target = SwapchainTarget {
            format,
            extent: vk::Extent2D {
                width: size.width,
                height: size.height,
            },
            images,
        };
        Ok((EyeSwapchain { handle, size }, target))
    };

    let (left, left_target) = make(&views[0])?;
    let (right, right_target) = make(&views[1])?;
    Ok(([left, right], [left_target, right_target]))
}

fn image_rect(size: RenderSize) -> xr::Rect2Di {
    xr::Rect2Di {
        offset: xr::Offset2Di { x: 0, y: 0 },
        extent: xr::Extent2Di {
            width: size.width as i32,
            height: size.height as i32,
        },
    }
}

impl XrRuntime for OpenXrRuntime {
    fn poll_event(&mut self) -> Result<Option<RuntimeEvent>, FrameError> {
        let event = self
            .system
            .instance
            .poll_event(&mut self.events)
            .map_err(runtime_err("xrPollEvent"))?;
        Ok(event.map(|event| match event {
            xr::Event::SessionStateChanged(e) => {
                RuntimeEvent::SessionStateChanged(session_state(e.state()))
            }
            xr::Event::EventsLost(e) => RuntimeEvent::EventsLost(e.lost_event_count()),
            xr::Event::InstanceLossPending(_) => RuntimeEvent::InstanceLossPending,
            xr::Event::InteractionProfileChanged(_) => RuntimeEvent::InteractionProfileChanged,
            xr::Event::ReferenceSpaceChangePending(_) => RuntimeEvent::ReferenceSpaceChangePending,
            _ => RuntimeEvent::Other,
        }))
    }

    fn begin_session(&mut self) -> Result<(), FrameError> {
        self.session
            .begin(VIEW_CONFIG)
            .map_err(runtime_err("xrBeginSession"))?;
        Ok(())
    }

    fn end_session(&mut self) -> Result<(), FrameError> {
        self.session.end().map_err(runtime_err("xrEndSession"))?;
        Ok(())
    }

    fn wait_frame(&mut self) -> Result<FrameTiming, FrameError> {
        let state = self.frame_waiter.wait().map_err(runtime_err("xrWaitFrame"))?;
        Ok(FrameTiming {
            should_render: state.should_render,
            predicted_display_time: DisplayTime(state.predicted_display_time.as_nanos()),
        })
    }

    fn begin_frame(&mut self) -> Result<(), FrameError> {
        self.frame_stream
            .begin()
            .map_err(runtime_err("xrBeginFrame"))?;
        Ok(())
    }

    fn locate_views(&mut self, time: DisplayTime) -> Result<[EyeView; 2], FrameError> {
        let (_, views) = self
            .session
            .locate_views(VIEW_CONFIG, xr_time(time), &self.stage)
            .map_err(runtime_err("xrLocateViews"))?;
        match views.as_slice() {
            [left, right, ..] => Ok([left, right].map(|v| EyeView {
                pose: pose_from_xr(v.pose),
                fov: fov_from_xr(v.fov),
            })),
            _ => Err(FrameError::runtime(
                "xrLocateViews",
                format_args!("{} views located", views.len()),
            )),
        }
    }

    fn end_frame(
        &mut self,
        time: DisplayTime,
        views: Option<&[EyeView; 2]>,
    ) -> Result<(), FrameError> {
        let time = xr_time(time);
        let blend = xr::EnvironmentBlendMode::OPAQUE;
        let Some(views) = views else {
            self.frame_stream
                .end(time, blend, &[])
                .map_err(runtime_err("xrEndFrame"))?;
            return Ok(());
        };

        let swapchains = self
            .swapchains
            .as_ref()
            .ok_or_else(|| FrameError::runtime("xrEndFrame", "swapchains already destroyed"))?;
        let layer_view = move |eye: Eye| {
            let sc = &swapchains[eye.index()];
            let view = &views[eye.index()];
            xr::CompositionLayerProjectionView::new()
                .pose(pose_to_xr(&view.pose))
                .fov(fov_to_xr(&view.fov))
                .sub_image(
                    xr::SwapchainSubImage::new()
                        .swapchain(&sc.handle)
                        .image_array_index(0)
                        .image_rect(image_rect(sc.size)),
                )
        };
        let layer_views = [layer_view(Eye::Left), layer_view(Eye::Right)];
        let layer = xr::CompositionLayerProjection::new()
            .space(&self.stage)
            .views(&layer_views);
        let layers: [&xr::CompositionLayerBase<xr::Vulkan>; 1] = [&layer];

        self.frame_stream
            .end(time, blend, &layers)
            .map_err(runtime_err("xrEndFrame"))?;
        Ok(())
    }

    /// Calls `xrSyncActions` directly: the wrapper folds `XR_SESSION_NOT_FOCUSED` into
    /// success, and that outcome decides whether input is read this frame.
    fn sync_actions(&mut self) -> Result<SyncOutcome, FrameError> {
        let active = xr::sys::ActiveActionSet {
            action_set: self.actions.set().as_raw(),
            subaction_path: xr::Path::NULL,
        };
        let info = xr::sys::ActionsSyncInfo {
            ty: xr::sys::ActionsSyncInfo::TYPE,
            next: ptr::null(),
            count_active_action_sets: 1,
            active_action_sets: &active,
        };
        let result =
            unsafe { (self.system.instance.fp().sync_actions)(self.session.as_raw(), &info) };
        match result {
            xr::sys::Result::SESSION_NOT_FOCUSED => Ok(SyncOutcome::NotFocused),
            r if r.into_raw() >= 0 => Ok(SyncOutcome::Synced),
            e => Err(FrameError::runtime("xrSyncActions", e)),
        }
    }

    fn locate_hand(
        &mut self,
        hand: Hand,
        time: DisplayTime,
    ) -> Result<(Pose, LocationFlags), FrameError> {
        let location = self
            .actions
            .space(hand)
            .locate(&self.stage, xr_time(time))
            .map_err(runtime_err("xrLocateSpace"))?;
        Ok((
            pose_from_xr(location.pose),
            location_flags(location.location_flags),
        ))
    }

    fn grab_state(&mut self, hand: Hand) -> Result<bool, FrameError> {
        let state = self
            .actions
            .grab(hand)
            .state(&self.session, xr::Path::NULL)
            .map_err(runtime_err("xrGetActionStateBoolean"))?;
        Ok(state.current_state)
    }

    fn acquire_image(&mut self, eye: Eye) -> Result<u32, FrameError> {
        let index = self
            .swapchain(eye)?
            .handle
            .acquire_image()
            .map_err(runtime_err("xrAcquireSwapchainImage"))?;
        trace!(%eye, index, "acquired");
        Ok(index)
    }

    /// Calls `xrWaitSwapchainImage` directly so `XR_TIMEOUT_EXPIRED`, a success code,
    /// stays distinguishable from a ready image.
    fn wait_image(&mut self, eye: Eye, timeout: Duration) -> Result<ImageWait, FrameError> {
        let info = xr::sys::SwapchainImageWaitInfo {
            ty: xr::sys::SwapchainImageWaitInfo::TYPE,
            next: ptr::null(),
            timeout: xr::Duration::from_nanos(
                i64::try_from(timeout.as_nanos()).unwrap_or(i64::MAX),
            ),
        };
        let wait = self.system.instance.fp().wait_swapchain_image;
        let raw = self.swapchain(eye)?.handle.as_raw();
        let result = unsafe { wait(raw, &info) };
        match result {
            xr::sys::Result::TIMEOUT_EXPIRED => Ok(ImageWait::TimedOut),
            r if r.into_raw() >= 0 => Ok(ImageWait::Ready),
            e => Err(FrameError::runtime("xrWaitSwapchainImage", e)),
        }
    }

    fn release_image(&mut self, eye: Eye) -> Result<(), FrameError> {
        self.swapchain(eye)?
            .handle
            .release_image()
            .map_err(runtime_err("xrReleaseSwapchainImage"))?;
        Ok(())
    }

    fn destroy_swapchains(&mut self) {
        if self.swapchains.take().is_some() {
            debug!("eye swapchains destroyed");
        }
    }
}
