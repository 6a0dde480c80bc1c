//! Render passes
//!
//! The frame is composed of three passes plus the light rig that feeds
//! them:
//!
//! 1. [`ShadowPass`] renders scene depth once per light
//! 2. [`LightingPass`] renders the lit, shadowed scene (optionally MSAA)
//! 3. [`PostProcessPass`] composites the lit image onto the swapchain
//!
//! Passes communicate through images and the transition protocol in
//! [`crate::gpu::transition`]: each pass transitions its outputs to
//! `ShaderRead` when done, and the next pass declares those states as
//! its `from` values.

pub mod light_rig;
pub mod lighting_pass;
pub mod post_process_pass;
pub mod shadow_pass;

pub use light_rig::{Light, LightMatrices, LightRig, LIGHT_COUNT};
pub use lighting_pass::LightingPass;
pub use post_process_pass::{PostProcessOptions, PostProcessPass};
pub use shadow_pass::{ShadowPass, SHADOW_RESOLUTION};
