/*!
# Trilight Engine

Core crate of the Trilight renderer: a small multi-pass, shadow-mapped
real-time 3D renderer.

This crate is platform-agnostic. It defines the GPU abstraction traits
(device, texture, buffer, binding group, pipeline, command list), the
image-transition protocol that stitches passes together, and the passes
themselves:

- **LightRig**: three orbiting colored lights and their GPU uniform mirror
- **ShadowPass**: one depth map per light, exposed as a sampled array
- **LightingPass**: the shadowed, optionally multisampled scene pass
- **PostProcessPass**: full-screen composite onto the presentation image

Backend implementations (see `trilight_engine_renderer_vulkan`) provide the
concrete GPU types behind the traits. A mock device ships with the test
build so every pass can be constructed and exercised without a GPU.
*/

// Internal modules
mod engine;
mod error;
pub mod camera;
pub mod gpu;
pub mod log;
pub mod passes;
pub mod scene;
pub mod textures;

// Main trilight namespace module
pub mod trilight {
    // Error types
    pub use crate::error::{Error, Result};

    // Logging front-end used by the engine_* macros
    pub use crate::engine::Engine;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};
    }

    // GPU abstraction sub-module
    pub mod gpu {
        pub use crate::gpu::*;
    }

    // Render passes
    pub mod passes {
        pub use crate::passes::*;
    }

    // Scene graph
    pub mod scene {
        pub use crate::scene::*;
    }
}

// Flat re-exports for the common types
pub use camera::{Camera, CameraMatrices};
pub use engine::Engine;
pub use error::{Error, Result};
pub use textures::TextureRegistry;
