//! Procedural primitive meshes
//!
//! CPU-side mesh data in the three-stream layout the passes consume:
//! positions, uvs and normals in separate streams, plus u32 indices.

use glam::{Vec2, Vec3};
use std::f32::consts::{PI, TAU};

/// CPU-side mesh data
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    fn push_vertex(&mut self, position: Vec3, uv: Vec2, normal: Vec3) {
        self.positions.push(position);
        self.uvs.push(uv);
        self.normals.push(normal);
    }
}

/// Axis-aligned cube centered on the origin
pub fn cube(size: f32) -> MeshData {
    let h = size / 2.0;
    let mut mesh = MeshData::default();

    // (normal, tangent u, tangent v) per face
    let faces = [
        (Vec3::X, Vec3::Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::Z, Vec3::NEG_X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::X, Vec3::Y),
    ];

    for (normal, u, v) in faces {
        let base = mesh.vertex_count() as u32;
        for (du, dv, uv) in [
            (-1.0, -1.0, Vec2::new(0.0, 0.0)),
            (1.0, -1.0, Vec2::new(1.0, 0.0)),
            (1.0, 1.0, Vec2::new(1.0, 1.0)),
            (-1.0, 1.0, Vec2::new(0.0, 1.0)),
        ] {
            let position = normal * h + u * (du * h) + v * (dv * h);
            mesh.push_vertex(position, uv, normal);
        }
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    mesh
}

/// Flat square plane on the XZ axes, facing +Y
pub fn plane(size: f32) -> MeshData {
    let h = size / 2.0;
    let mut mesh = MeshData::default();

    mesh.push_vertex(Vec3::new(-h, 0.0, -h), Vec2::new(0.0, 0.0), Vec3::Y);
    mesh.push_vertex(Vec3::new(h, 0.0, -h), Vec2::new(1.0, 0.0), Vec3::Y);
    mesh.push_vertex(Vec3::new(h, 0.0, h), Vec2::new(1.0, 1.0), Vec3::Y);
    mesh.push_vertex(Vec3::new(-h, 0.0, h), Vec2::new(0.0, 1.0), Vec3::Y);
    mesh.indices.extend_from_slice(&[0, 1, 2, 0, 2, 3]);

    mesh
}

/// UV sphere centered on the origin
///
/// # Arguments
///
/// * `radius` - Sphere radius
/// * `segments` - Subdivisions around the equator (minimum 3)
/// * `rings` - Subdivisions from pole to pole (minimum 2)
pub fn uv_sphere(radius: f32, segments: u32, rings: u32) -> MeshData {
    let segments = segments.max(3);
    let rings = rings.max(2);
    let mut mesh = MeshData::default();

    for ring in 0..=rings {
        let phi = PI * ring as f32 / rings as f32;
        let y = phi.cos();
        let ring_radius = phi.sin();
        for segment in 0..=segments {
            let theta = TAU * segment as f32 / segments as f32;
            let normal = Vec3::new(ring_radius * theta.cos(), y, ring_radius * theta.sin());
            let uv = Vec2::new(
                segment as f32 / segments as f32,
                ring as f32 / rings as f32,
            );
            mesh.push_vertex(normal * radius, uv, normal);
        }
    }

    let stride = segments + 1;
    for ring in 0..rings {
        for segment in 0..segments {
            let a = ring * stride + segment;
            let b = a + stride;
            mesh.indices
                .extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
        }
    }

    mesh
}

/// Closed cylinder along the Y axis, centered on the origin
pub fn cylinder(radius: f32, height: f32, segments: u32) -> MeshData {
    let segments = segments.max(3);
    let h = height / 2.0;
    let mut mesh = MeshData::default();

    // side
    for segment in 0..=segments {
        let theta = TAU * segment as f32 / segments as f32;
        let normal = Vec3::new(theta.cos(), 0.0, theta.sin());
        let u = segment as f32 / segments as f32;
        mesh.push_vertex(normal * radius + Vec3::Y * h, Vec2::new(u, 0.0), normal);
        mesh.push_vertex(normal * radius - Vec3::Y * h, Vec2::new(u, 1.0), normal);
    }
    for segment in 0..segments {
        let a = segment * 2;
        mesh.indices
            .extend_from_slice(&[a, a + 2, a + 1, a + 1, a + 2, a + 3]);
    }

    // caps
    for (y, normal) in [(h, Vec3::Y), (-h, Vec3::NEG_Y)] {
        let center = mesh.vertex_count() as u32;
        mesh.push_vertex(Vec3::new(0.0, y, 0.0), Vec2::new(0.5, 0.5), normal);
        for segment in 0..=segments {
            let theta = TAU * segment as f32 / segments as f32;
            let (sin, cos) = theta.sin_cos();
            mesh.push_vertex(
                Vec3::new(cos * radius, y, sin * radius),
                Vec2::new(cos * 0.5 + 0.5, sin * 0.5 + 0.5),
                normal,
            );
        }
        for segment in 0..segments {
            let a = center + 1 + segment;
            if normal.y > 0.0 {
                mesh.indices.extend_from_slice(&[center, a + 1, a]);
            } else {
                mesh.indices.extend_from_slice(&[center, a, a + 1]);
            }
        }
    }

    mesh
}

#[cfg(test)]
#[path = "primitives_tests.rs"]
mod primitives_tests;
