// SPDX-License-Identifier: CEPL-1.0
use oculi_render_vk::{color_format_by_name, vk};
use oculi_xr::{ReferenceSpace, XrSettings, OCULUS_TOUCH_PROFILE};
use serde::Deserialize;
use std::path::Path;
use std::{fs, io};
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize, Default)]
pub struct AppCfg {
    #[serde(default)]
    pub xr: XrCfg,
    #[serde(default)]
    pub render: RenderCfg,
    #[serde(default)]
    pub scene: SceneCfg,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct XrCfg {
    pub application_name: String,
    pub application_version: [u32; 3],
    pub reference_space: ReferenceSpaceCfg,
    pub interaction_profile: String,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceSpaceCfg {
    #[default]
    Stage,
    Local,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RenderCfg {
    pub clear_color: [f32; 4],
    pub image_wait_timeout_ms: u64,
    /// Preferred swapchain format; the runtime's first choice is used if it lacks this one.
    pub color_format: String,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct SceneCfg {
    pub object_position: [f32; 3],
    pub grab_distance: f32,
}

impl Default for XrCfg {
    fn default() -> Self {
        XrCfg {
            application_name: "OpenXR Test".to_owned(),
            application_version: [0, 1, 0],
            reference_space: ReferenceSpaceCfg::Stage,
            interaction_profile: OCULUS_TOUCH_PROFILE.to_owned(),
        }
    }
}

impl Default for RenderCfg {
    fn default() -> Self {
        RenderCfg {
            clear_color: [0.0, 0.0, 0.0, 1.0],
            image_wait_timeout_ms: 1000,
            color_format: "r8g8b8a8_srgb".to_owned(),
        }
    }
}

impl Default for SceneCfg {
    fn default() -> Self {
        SceneCfg {
            object_position: [0.0; 3],
            grab_distance: oculi_engine::GRAB_DISTANCE,
        }
    }
}

impl XrCfg {
    pub fn settings(&self) -> XrSettings {
        XrSettings {
            application_name: self.application_name.clone(),
            application_version: self.application_version,
            reference_space: match self.reference_space {
                ReferenceSpaceCfg::Stage => ReferenceSpace::Stage,
                ReferenceSpaceCfg::Local => ReferenceSpace::Local,
            },
            interaction_profile: self.interaction_profile.clone(),
        }
    }
}

impl RenderCfg {
    pub fn color_format(&self) -> vk::Format {
        color_format_by_name(&self.color_format).unwrap_or_else(|| {
            warn!(name = %self.color_format, "unknown color_format, using r8g8b8a8_srgb");
            vk::Format::R8G8B8A8_SRGB
        })
    }
}

pub fn parse_cfg(text: &str) -> Result<AppCfg, toml::de::Error> {
    toml::from_str(text)
}

pub fn load_cfg(path: &Path) -> AppCfg {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file, using defaults");
            return AppCfg::default();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "config unreadable, using defaults");
            return AppCfg::default();
        }
    };
    match parse_cfg(&text) {
        Ok(cfg) => {
            info!(path = %path.display(), "config loaded");
            cfg
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "config malformed, using defaults");
            AppCfg::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = parse_cfg("").unwrap();
        assert_eq!(cfg.xr.application_name, "OpenXR Test");
        assert_eq!(cfg.xr.reference_space, ReferenceSpaceCfg::Stage);
        assert_eq!(cfg.render.image_wait_timeout_ms, 1000);
        assert_eq!(cfg.render.color_format(), vk::Format::R8G8B8A8_SRGB);
        assert_eq!(cfg.scene.grab_distance, 10.0);
        assert_eq!(cfg.scene.object_position, [0.0; 3]);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = parse_cfg(
            r#"
            [xr]
            reference_space = "local"

            [scene]
            object_position = [0.0, 1.2, -0.5]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.xr.settings().reference_space, ReferenceSpace::Local);
        assert_eq!(cfg.xr.interaction_profile, OCULUS_TOUCH_PROFILE);
        assert_eq!(cfg.scene.object_position, [0.0, 1.2, -0.5]);
        assert_eq!(cfg.scene.grab_distance, 10.0);
        assert_eq!(cfg.render.clear_color, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn clear_color_is_read_from_the_render_section() {
        let cfg = parse_cfg("[render]\nclear_color = [0.1, 0.2, 0.3, 1.0]").unwrap();
        assert_eq!(cfg.render.clear_color, [0.1, 0.2, 0.3, 1.0]);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(parse_cfg("[xr]\nreference_space = \"view\"").is_err());
        assert!(parse_cfg("[render]\nclear_color = \"black\"").is_err());
    }

    #[test]
    fn unknown_color_format_falls_back() {
        let render = RenderCfg {
            color_format: "rgb565".to_owned(),
            ..RenderCfg::default()
        };
        assert_eq!(render.color_format(), vk::Format::R8G8B8A8_SRGB);
        let render = RenderCfg {
            color_format: "B8G8R8A8_SRGB".to_owned(),
            ..RenderCfg::default()
        };
        assert_eq!(render.color_format(), vk::Format::B8G8R8A8_SRGB);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let cfg = load_cfg(Path::new("/nonexistent/oculi.toml"));
        assert_eq!(cfg.render.image_wait_timeout_ms, 1000);
    }
}
