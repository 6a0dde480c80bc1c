//! Drawable collection

use glam::Mat4;
use slotmap::SlotMap;

use crate::error::Result;
use crate::gpu::CommandList;
use crate::scene::drawable::{DrawContext, Drawable};

slotmap::new_key_type! {
    /// Stable handle to a drawable in a [`Scene`]
    pub struct DrawableKey;
}

/// Flat collection of drawables
#[derive(Default)]
pub struct Scene {
    drawables: SlotMap<DrawableKey, Box<dyn Drawable>>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a drawable, returning its handle
    pub fn add(&mut self, drawable: Box<dyn Drawable>) -> DrawableKey {
        self.drawables.insert(drawable)
    }

    /// Remove a drawable by handle
    ///
    /// Returns the drawable if the handle was still live.
    pub fn remove(&mut self, key: DrawableKey) -> Option<Box<dyn Drawable>> {
        self.drawables.remove(key)
    }

    pub fn len(&self) -> usize {
        self.drawables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty()
    }

    /// Tick every drawable
    pub fn tick_all(&mut self, delta_seconds: f32) {
        for drawable in self.drawables.values_mut() {
            drawable.tick(delta_seconds);
        }
    }

    /// Draw every drawable with an identity parent transform
    pub fn draw_all(&self, cmd: &dyn CommandList, ctx: &DrawContext) -> Result<()> {
        for drawable in self.drawables.values() {
            drawable.draw(cmd, ctx, Mat4::IDENTITY)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod scene_tests;
