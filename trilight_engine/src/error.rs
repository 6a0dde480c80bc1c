//! Error types for the Trilight engine
//!
//! This module defines the error types used throughout the engine.
//! There is no recoverable category: every variant represents a
//! programming or configuration error, and the policy everywhere is to
//! propagate the error up to the frame orchestrator, which exits
//! non-zero. A failed resource creation is never used as if it
//! succeeded.

use std::fmt;

/// Result type for Trilight engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Trilight engine errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (Vulkan, mock, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (texture, buffer, pipeline, binding group, etc.)
    InvalidResource(String),

    /// Initialization failed (device, swapchain, subsystems)
    InitializationFailed(String),

    /// A named resource was requested but never registered
    ResourceNotFound(String),

    /// The swapchain no longer matches the surface and must be recreated
    ///
    /// The only variant the frame orchestrator recovers from: it rebuilds
    /// the swapchain at the new size and retries the frame.
    SwapchainOutOfDate,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::ResourceNotFound(name) => write!(f, "Resource not found: {}", name),
            Error::SwapchainOutOfDate => write!(f, "Swapchain out of date"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
