//! Texture and image abstractions
//!
//! `GpuImage` is the minimal interface the transition protocol needs:
//! every image that can appear in a barrier (textures, swapchain images)
//! implements it. `Texture` adds the creation-time description and is
//! what binding groups sample from.

use bitflags::bitflags;
use std::any::Any;

// ===== FORMATS =====

/// Texture and vertex attribute formats
///
/// The `R32*_SFLOAT` entries double as vertex attribute formats so the
/// vertex layout description can reuse this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit RGBA, normalized, sRGB
    Rgba8Srgb,
    /// 8-bit RGBA, normalized, linear
    Rgba8Unorm,
    /// 8-bit BGRA, normalized, linear (common swapchain format)
    Bgra8Unorm,
    /// 32-bit float depth
    D32Sfloat,
    /// Single 32-bit float (vertex attribute)
    R32Sfloat,
    /// Two 32-bit floats (vertex attribute)
    R32g32Sfloat,
    /// Three 32-bit floats (vertex attribute)
    R32g32b32Sfloat,
    /// Four 32-bit floats (vertex attribute)
    R32g32b32a32Sfloat,
}

impl TextureFormat {
    /// Whether this format is a depth format
    pub fn is_depth(&self) -> bool {
        matches!(self, TextureFormat::D32Sfloat)
    }

    /// Size in bytes of one texel or vertex attribute of this format
    pub fn size_bytes(&self) -> u32 {
        match self {
            TextureFormat::Rgba8Srgb | TextureFormat::Rgba8Unorm | TextureFormat::Bgra8Unorm => 4,
            TextureFormat::D32Sfloat | TextureFormat::R32Sfloat => 4,
            TextureFormat::R32g32Sfloat => 8,
            TextureFormat::R32g32b32Sfloat => 12,
            TextureFormat::R32g32b32a32Sfloat => 16,
        }
    }
}

bitflags! {
    /// How a texture will be used
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TextureUsage: u32 {
        /// Sampled in shaders
        const SAMPLED = 1 << 0;
        /// Rendered to as a color attachment
        const COLOR_ATTACHMENT = 1 << 1;
        /// Rendered to as a depth attachment
        const DEPTH_ATTACHMENT = 1 << 2;
        /// Source of transfer operations
        const TRANSFER_SRC = 1 << 3;
        /// Destination of transfer operations (uploads)
        const TRANSFER_DST = 1 << 4;
    }
}

/// Multisample count for attachments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleCount {
    X1,
    X2,
    X4,
    X8,
}

impl SampleCount {
    /// Number of samples as an integer
    pub fn as_u32(&self) -> u32 {
        match self {
            SampleCount::X1 => 1,
            SampleCount::X2 => 2,
            SampleCount::X4 => 4,
            SampleCount::X8 => 8,
        }
    }
}

/// 2D image extent in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent2d {
    pub width: u32,
    pub height: u32,
}

impl Extent2d {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

// ===== DESCRIPTORS =====

/// Description for texture creation
#[derive(Debug, Clone)]
pub struct TextureDesc {
    /// Debug name, surfaced in backend object labels and logs
    pub name: String,

    /// Extent in pixels
    pub extent: Extent2d,

    /// Pixel format
    pub format: TextureFormat,

    /// Usage flags
    pub usage: TextureUsage,

    /// Sample count (X1 unless the texture is an MSAA attachment)
    pub sample_count: SampleCount,
}

// ===== TRAITS =====

/// Anything the transition protocol can lay out
///
/// Implemented by textures and by backend swapchain images. The
/// `image_id` is unique per image within a device and lets backends and
/// the mock track per-image layout state without downcasting.
pub trait GpuImage: Send + Sync {
    /// Device-unique identifier of the underlying image
    fn image_id(&self) -> u64;

    /// Extent in pixels
    fn extent(&self) -> Extent2d;

    /// Pixel format
    fn format(&self) -> TextureFormat;

    /// Downcast support for backends
    fn as_any(&self) -> &dyn Any;
}

/// Sampleable GPU texture
pub trait Texture: GpuImage {
    /// Creation-time description
    fn desc(&self) -> &TextureDesc;
}
