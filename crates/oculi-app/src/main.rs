// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use oculi_core::{init_tracing_with, QuitFlag};
use oculi_engine::{EngineSettings, RunContext};
use oculi_math::Vec3;
use oculi_render_vk::{GpuContext, VkEyeRenderer, VulkanInstance};
use oculi_xr::{pack_version, OpenXrRuntime, XrSystem};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML config file; a missing or malformed file means defaults
    #[arg(long, default_value = "oculi.toml")]
    config: PathBuf,
    /// Log filter in RUST_LOG syntax, takes precedence over the environment
    #[arg(long)]
    log: Option<String>,
    /// Bound on each swapchain image wait, in milliseconds
    #[arg(long)]
    image_wait_ms: Option<u64>,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_tracing_with(args.log.as_deref());
    let cfg = config::load_cfg(&args.config);

    let quit = QuitFlag::new();
    let on_signal = quit.clone();
    ctrlc::set_handler(move || on_signal.request()).context("installing SIGINT handler")?;

    let xr_settings = cfg.xr.settings();
    let system = XrSystem::new(&xr_settings)?;
    let reqs = system.vulkan_requirements()?;
    let vulkan = VulkanInstance::new(
        &xr_settings.application_name,
        pack_version(xr_settings.application_version),
        reqs.api_version,
        &reqs.instance_extensions,
    )?;
    let phys = system.vulkan_physical_device(&vulkan)?;
    let gpu = GpuContext::new(vulkan, phys, &reqs.device_extensions)?;

    // Locals drop in reverse: renderer, then the session, then the device.
    let (mut runtime, targets) =
        OpenXrRuntime::new(system, &gpu, &xr_settings, cfg.render.color_format())?;
    // One bound covers both the runtime's image wait and the renderer's fence wait.
    let wait_ms = args.image_wait_ms.unwrap_or(cfg.render.image_wait_timeout_ms);
    let wait = Duration::from_millis(wait_ms);
    let mut renderer = VkEyeRenderer::new(&gpu, targets, cfg.render.clear_color, wait)?;

    let settings = EngineSettings {
        grab_distance: cfg.scene.grab_distance,
        image_wait_timeout: wait,
        ..EngineSettings::default()
    };
    let mut ctx = RunContext::new(quit, settings, Vec3::from_array(cfg.scene.object_position));

    let summary = oculi_engine::run(&mut runtime, &mut renderer, &mut ctx);
    info!(
        reason = %summary.reason,
        ticks = summary.ticks,
        rendered = summary.frames_rendered,
        skipped = summary.frames_skipped,
        "frame loop finished"
    );

    if summary.reason.is_failure() {
        error!("exiting after a fatal frame error");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
