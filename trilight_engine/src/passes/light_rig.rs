//! Light rig: three orbiting colored lights
//!
//! The rig keeps a CPU-side array of lights and mirrors it into one
//! uniform buffer that both the lighting shaders and the shadow pass
//! read. The lights sit on the corners of an equilateral triangle that
//! rotates around the world Y axis at a fixed height, each light aimed
//! at the origin.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};
use std::sync::Arc;

use crate::engine_debug;
use crate::error::Result;
use crate::gpu::{
    BindingGroup, BindingGroupLayout, BindingGroupLayoutDesc, BindingResource, BindingSlotDesc,
    BindingType, Buffer, BufferDesc, BufferUsage, CommandList, Device, Pipeline, ShaderStageFlags,
};

/// Number of lights in the rig
pub const LIGHT_COUNT: usize = 3;

/// Vertical field of view of each light's shadow frustum, in degrees
const LIGHT_FOV_DEGREES: f32 = 40.0;

/// Shadow frustum near/far planes
const LIGHT_NEAR: f32 = 0.1;
const LIGHT_FAR: f32 = 100.0;

/// Side length of the light triangle
const TRIANGLE_SIDE: f32 = 20.0;

/// Height of the lights above the ground plane
const LIGHT_HEIGHT: f32 = 10.0;

/// Initial rotation of the triangle, in degrees
const INITIAL_ANGLE_DEGREES: f32 = 60.0;

/// Up vector used for the light view matrices (world Y points down in
/// the engine's Vulkan-oriented convention)
const LIGHT_UP: Vec3 = Vec3::new(0.0, -1.0, 0.0);

// ===== GPU TYPES =====

/// One light, exactly as laid out in the uniform buffer (160 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Light {
    pub position: Vec3,
    pub _pad0: f32,
    pub color: Vec3,
    pub _pad1: f32,
    pub projection: Mat4,
    pub view: Mat4,
}

/// Projection + view of one light, pushed to the shadow shaders (128 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightMatrices {
    pub projection: Mat4,
    pub view: Mat4,
}

// ===== RIG =====

/// The three orbiting lights and their GPU mirror
pub struct LightRig {
    lights: [Light; LIGHT_COUNT],
    angle_degrees: f32,
    buffer: Arc<dyn Buffer>,
    layout: Arc<dyn BindingGroupLayout>,
    group: Arc<dyn BindingGroup>,
}

impl LightRig {
    /// Create the rig and upload the initial light state
    ///
    /// The lights start on the triangle corners at the initial angle,
    /// colored red, green and blue with intensity 1.5.
    pub fn new(device: &Arc<dyn Device>) -> Result<Self> {
        let projection = Mat4::perspective_rh(
            LIGHT_FOV_DEGREES.to_radians(),
            1.0,
            LIGHT_NEAR,
            LIGHT_FAR,
        );

        let colors = [
            Vec3::new(1.5, 0.0, 0.0),
            Vec3::new(0.0, 1.5, 0.0),
            Vec3::new(0.0, 0.0, 1.5),
        ];

        let mut lights = [Light::zeroed(); LIGHT_COUNT];
        for (light, color) in lights.iter_mut().zip(colors) {
            light.color = color;
            light.projection = projection;
        }

        let buffer = device.create_buffer(&BufferDesc {
            name: "light_rig_uniforms".to_string(),
            size: std::mem::size_of::<[Light; LIGHT_COUNT]>() as u64,
            usage: BufferUsage::Uniform,
        })?;

        let layout = device.create_binding_group_layout(&BindingGroupLayoutDesc {
            name: "light_rig".to_string(),
            entries: vec![BindingSlotDesc {
                binding: 0,
                binding_type: BindingType::UniformBuffer,
                count: 1,
                stage_flags: ShaderStageFlags::VERTEX_FRAGMENT,
            }],
        })?;
        let group =
            device.create_binding_group(&layout, &[BindingResource::UniformBuffer(buffer.as_ref())])?;

        let mut rig = Self {
            lights,
            angle_degrees: INITIAL_ANGLE_DEGREES,
            buffer,
            layout,
            group,
        };
        rig.place_lights()?;

        engine_debug!("trilight::LightRig", "created rig with {} lights", LIGHT_COUNT);
        Ok(rig)
    }

    /// Advance the orbit animation
    ///
    /// # Arguments
    ///
    /// * `degrees` - Rotation to add, in degrees; may be negative. The
    ///   accumulated angle is kept in `[0, 360)`.
    pub fn advance_animation(&mut self, degrees: f32) -> Result<()> {
        self.angle_degrees = (self.angle_degrees + degrees).rem_euclid(360.0);
        self.place_lights()
    }

    /// Recompute positions and view matrices, then re-upload the buffer
    fn place_lights(&mut self) -> Result<()> {
        let s = TRIANGLE_SIDE;
        let h = s * 3.0_f32.sqrt() / 2.0;
        let angle = self.angle_degrees.to_radians();
        let (sin, cos) = angle.sin_cos();

        let rotate = |p: Vec2| Vec2::new(p.x * cos - p.y * sin, p.x * sin + p.y * cos);

        let corners = [
            rotate(Vec2::new(-s / 2.0, -h / 3.0)),
            rotate(Vec2::new(s / 2.0, -h / 3.0)),
            rotate(Vec2::new(0.0, 2.0 * h / 3.0)),
        ];

        for (light, corner) in self.lights.iter_mut().zip(corners) {
            light.position = Vec3::new(corner.x, LIGHT_HEIGHT, corner.y);
            light.view = Mat4::look_at_rh(light.position, Vec3::ZERO, LIGHT_UP);
        }

        // Whole-array upload, matching how the shaders index the buffer.
        self.buffer.update(0, bytemuck::cast_slice(&self.lights))
    }

    /// Bind the light uniform set at the given set index
    pub fn bind(
        &self,
        cmd: &dyn CommandList,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
    ) -> Result<()> {
        cmd.bind_binding_group(pipeline, set_index, &self.group)
    }

    /// Matrices of one light, in the shadow push-constant layout
    pub fn matrices(&self, light_index: usize) -> LightMatrices {
        let light = &self.lights[light_index];
        LightMatrices {
            projection: light.projection,
            view: light.view,
        }
    }

    pub fn lights(&self) -> &[Light; LIGHT_COUNT] {
        &self.lights
    }

    pub fn count(&self) -> usize {
        LIGHT_COUNT
    }

    pub fn angle_degrees(&self) -> f32 {
        self.angle_degrees
    }

    /// Layout of the light uniform set, for pipeline creation
    pub fn layout(&self) -> &Arc<dyn BindingGroupLayout> {
        &self.layout
    }

    #[cfg(test)]
    pub(crate) fn buffer(&self) -> &Arc<dyn Buffer> {
        &self.buffer
    }
}

#[cfg(test)]
#[path = "light_rig_tests.rs"]
mod light_rig_tests;
