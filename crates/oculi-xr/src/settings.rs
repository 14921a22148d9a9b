// SPDX-License-Identifier: CEPL-1.0
use openxr as xr;

pub const OCULUS_TOUCH_PROFILE: &str = "/interaction_profiles/oculus/touch_controller";

/// Space that views and hand poses are reported in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReferenceSpace {
    #[default]
    Stage,
    Local,
}

impl ReferenceSpace {
    pub(crate) fn to_xr(self) -> xr::ReferenceSpaceType {
        match self {
            ReferenceSpace::Stage => xr::ReferenceSpaceType::STAGE,
            ReferenceSpace::Local => xr::ReferenceSpaceType::LOCAL,
        }
    }
}

#[derive(Clone, Debug)]
pub struct XrSettings {
    pub application_name: String,
    pub application_version: [u32; 3],
    pub reference_space: ReferenceSpace,
    /// Interaction profile path the hand bindings are suggested for.
    pub interaction_profile: String,
}

impl Default for XrSettings {
    fn default() -> Self {
        XrSettings {
            application_name: "OpenXR Test".to_owned(),
            application_version: [0, 1, 0],
            reference_space: ReferenceSpace::Stage,
            interaction_profile: OCULUS_TOUCH_PROFILE.to_owned(),
        }
    }
}
