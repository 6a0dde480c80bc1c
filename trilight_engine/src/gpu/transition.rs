//! Image layout transition protocol
//!
//! Every pass declares, up front, which images it is about to write or
//! read and which access state each image is coming from. Transitions
//! are submitted in batches: one `transition_images` call becomes one
//! barrier dependency on the backend, regardless of how many images it
//! covers.
//!
//! The `from` state is part of the contract. Passing a stale `from`
//! is a synchronization bug, and the mock backend in the test build
//! detects exactly that.

use super::texture::GpuImage;

/// Access state of an image at a point in the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageAccess {
    /// Contents undefined (fresh image, or contents deliberately discarded)
    Undefined,

    /// Written as a color attachment
    ColorAttachment,

    /// Written as a depth attachment
    DepthAttachment,

    /// Sampled from shaders
    ShaderRead,

    /// Handed to the presentation engine
    Present,
}

/// One image transition within a batch
pub struct ImageTransition<'a> {
    /// Image being transitioned
    pub image: &'a dyn GpuImage,

    /// State the image is currently in
    pub from: ImageAccess,

    /// State the image must be in afterwards
    pub to: ImageAccess,
}

impl<'a> ImageTransition<'a> {
    pub fn new(image: &'a dyn GpuImage, from: ImageAccess, to: ImageAccess) -> Self {
        Self { image, from, to }
    }
}
