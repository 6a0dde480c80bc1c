//! Free-look camera
//!
//! Yaw/pitch camera with WASD-style movement. The view matrix uses a
//! flipped up vector (0, -1, 0) so that world +Y renders upwards under
//! Vulkan's inverted viewport convention; all projection math uses the
//! 0..1 depth range.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

const SENSITIVITY: f32 = 0.1;
const CAMERA_SPEED: f32 = 2.5 * 0.05;
const NEAR_PLANE: f32 = 0.1;
const FAR_PLANE: f32 = 100.0;

/// Camera matrices as pushed to shaders (128 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraMatrices {
    pub projection: Mat4,
    pub view: Mat4,
}

/// Free-look perspective camera
pub struct Camera {
    projection: Mat4,
    yaw: f32,
    pitch: f32,
    position: Vec3,
    front: Vec3,
    up: Vec3,
    target: Vec3,
    view: Mat4,
}

impl Camera {
    /// Create a camera for the given viewport
    ///
    /// # Arguments
    ///
    /// * `width` / `height` - Viewport size in pixels (sets the aspect ratio)
    /// * `fov_degrees` - Vertical field of view in degrees
    pub fn new(width: u32, height: u32, fov_degrees: f32) -> Self {
        let aspect_ratio = width as f32 / height as f32;
        let mut camera = Self {
            projection: Mat4::perspective_rh(
                fov_degrees.to_radians(),
                aspect_ratio,
                NEAR_PLANE,
                FAR_PLANE,
            ),
            yaw: 90.0,
            pitch: -10.0,
            position: Vec3::new(0.0, 1.0, -3.0),
            front: Vec3::new(0.0, 1.0, 1.0),
            up: Vec3::new(0.0, -1.0, 0.0),
            target: Vec3::ZERO,
            view: Mat4::IDENTITY,
        };
        camera.update();
        camera
    }

    /// Camera with the engine defaults (45 degree fov)
    pub fn with_defaults(width: u32, height: u32) -> Self {
        Self::new(width, height, 45.0)
    }

    // ===== MOVEMENT =====

    pub fn forward(&mut self) {
        self.position += CAMERA_SPEED * self.front;
        self.update();
    }

    pub fn back(&mut self) {
        self.position -= CAMERA_SPEED * self.front;
        self.update();
    }

    pub fn left(&mut self) {
        self.position -= self.front.cross(self.up).normalize() * CAMERA_SPEED;
        self.update();
    }

    pub fn right(&mut self) {
        self.position += self.front.cross(self.up).normalize() * CAMERA_SPEED;
        self.update();
    }

    pub fn rise(&mut self) {
        self.position -= CAMERA_SPEED * self.up;
        self.update();
    }

    pub fn descend(&mut self) {
        self.position += CAMERA_SPEED * self.up;
        self.update();
    }

    /// Apply a mouse movement delta to yaw and pitch
    ///
    /// Pitch is clamped to (-89, 89) degrees so the view never flips.
    pub fn process_mouse_movement(&mut self, offset_x: f32, offset_y: f32) {
        self.yaw -= offset_x * SENSITIVITY;
        self.pitch -= offset_y * SENSITIVITY;
        self.pitch = self.pitch.clamp(-89.0, 89.0);
        self.update();
    }

    // ===== MATRICES =====

    /// Recompute the front vector and view matrix from yaw/pitch
    fn update(&mut self) {
        let yaw_radians = self.yaw.to_radians();
        let pitch_radians = self.pitch.to_radians();

        self.target = self.position + self.front;

        self.front = Vec3::new(
            yaw_radians.cos() * pitch_radians.cos(),
            pitch_radians.sin(),
            yaw_radians.sin() * pitch_radians.cos(),
        )
        .normalize();

        let right = self.front.cross(self.up).normalize();
        let up = right.cross(self.front).normalize();

        self.view = Mat4::look_at_rh(self.position, self.target, up);
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    /// Matrices in the push-constant layout
    pub fn matrices(&self) -> CameraMatrices {
        CameraMatrices {
            projection: self.projection,
            view: self.view,
        }
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod camera_tests;
