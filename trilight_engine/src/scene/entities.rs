//! Animated scene entities

use glam::{Mat4, Quat, Vec3};

use crate::error::Result;
use crate::gpu::CommandList;
use crate::scene::drawable::{DrawContext, Drawable};
use crate::scene::mesh::Mesh;

/// Mesh spinning in place around the Y axis
pub struct SpinningMesh {
    mesh: Mesh,
    position: Vec3,
    angle_radians: f32,
    speed_radians: f32,
}

impl SpinningMesh {
    /// # Arguments
    ///
    /// * `speed_radians` - Angular velocity in radians per second
    pub fn new(mesh: Mesh, position: Vec3, speed_radians: f32) -> Self {
        Self {
            mesh,
            position,
            angle_radians: 0.0,
            speed_radians,
        }
    }
}

impl Drawable for SpinningMesh {
    fn tick(&mut self, delta_seconds: f32) {
        self.angle_radians += self.speed_radians * delta_seconds;
    }

    fn draw(&self, cmd: &dyn CommandList, ctx: &DrawContext, parent: Mat4) -> Result<()> {
        let local = Mat4::from_rotation_translation(
            Quat::from_rotation_y(self.angle_radians),
            self.position,
        );
        self.mesh.draw(cmd, ctx, parent * local)
    }
}

/// Mesh circling the origin at a fixed height
pub struct OrbitingSphere {
    mesh: Mesh,
    radius: f32,
    height: f32,
    angle_radians: f32,
    speed_radians: f32,
}

impl OrbitingSphere {
    pub fn new(mesh: Mesh, radius: f32, height: f32, speed_radians: f32) -> Self {
        Self {
            mesh,
            radius,
            height,
            angle_radians: 0.0,
            speed_radians,
        }
    }
}

impl Drawable for OrbitingSphere {
    fn tick(&mut self, delta_seconds: f32) {
        self.angle_radians += self.speed_radians * delta_seconds;
    }

    fn draw(&self, cmd: &dyn CommandList, ctx: &DrawContext, parent: Mat4) -> Result<()> {
        let position = Vec3::new(
            self.angle_radians.cos() * self.radius,
            self.height,
            self.angle_radians.sin() * self.radius,
        );
        self.mesh.draw(cmd, ctx, parent * Mat4::from_translation(position))
    }
}

/// Mesh bouncing on the Y axis above a base position
pub struct BouncingMesh {
    mesh: Mesh,
    base_position: Vec3,
    amplitude: f32,
    phase_radians: f32,
    speed_radians: f32,
}

impl BouncingMesh {
    /// # Arguments
    ///
    /// * `amplitude` - Peak height above `base_position`
    /// * `speed_radians` - Bounce frequency in radians per second
    pub fn new(mesh: Mesh, base_position: Vec3, amplitude: f32, speed_radians: f32) -> Self {
        Self {
            mesh,
            base_position,
            amplitude,
            phase_radians: 0.0,
            speed_radians,
        }
    }
}

impl Drawable for BouncingMesh {
    fn tick(&mut self, delta_seconds: f32) {
        self.phase_radians += self.speed_radians * delta_seconds;
    }

    fn draw(&self, cmd: &dyn CommandList, ctx: &DrawContext, parent: Mat4) -> Result<()> {
        let lift = self.phase_radians.sin().abs() * self.amplitude;
        let position = self.base_position + Vec3::new(0.0, lift, 0.0);
        self.mesh.draw(cmd, ctx, parent * Mat4::from_translation(position))
    }
}

/// Drawables composed under one shared transform
///
/// One composition level: children draw relative to the group transform,
/// groups do not nest further in practice.
pub struct Group {
    children: Vec<Box<dyn Drawable>>,
    transform: Mat4,
}

impl Group {
    pub fn new(transform: Mat4) -> Self {
        Self {
            children: Vec::new(),
            transform,
        }
    }

    pub fn add(&mut self, child: Box<dyn Drawable>) {
        self.children.push(child);
    }

    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Drawable for Group {
    fn tick(&mut self, delta_seconds: f32) {
        for child in &mut self.children {
            child.tick(delta_seconds);
        }
    }

    fn draw(&self, cmd: &dyn CommandList, ctx: &DrawContext, parent: Mat4) -> Result<()> {
        let transform = parent * self.transform;
        for child in &self.children {
            child.draw(cmd, ctx, transform)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "entities_tests.rs"]
mod entities_tests;
