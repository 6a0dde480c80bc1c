//! GPU buffer abstraction

use std::any::Any;

/// How a buffer will be used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Vertex attribute data
    Vertex,
    /// Index data (u32 indices)
    Index,
    /// Uniform data, re-uploadable every frame
    Uniform,
}

/// Description for buffer creation
#[derive(Debug, Clone)]
pub struct BufferDesc {
    /// Debug name, surfaced in backend object labels and logs
    pub name: String,

    /// Size in bytes
    pub size: u64,

    /// Usage
    pub usage: BufferUsage,
}

/// GPU buffer
///
/// Buffers are host-visible in every backend this engine ships, so
/// `update` is a plain memcpy into mapped memory. Interior mutability
/// keeps the trait object shareable behind `Arc`.
pub trait Buffer: Send + Sync {
    /// Upload bytes into the buffer at the given offset
    ///
    /// # Arguments
    ///
    /// * `offset` - Byte offset into the buffer
    /// * `data` - Bytes to write
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidResource` if the write would run past the
    /// end of the buffer.
    fn update(&self, offset: u64, data: &[u8]) -> crate::error::Result<()>;

    /// Size in bytes
    fn size(&self) -> u64;

    /// Downcast support for backends
    fn as_any(&self) -> &dyn Any;
}
