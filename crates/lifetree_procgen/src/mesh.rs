use std::f32::consts::TAU;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use noise::{NoiseFn, Perlin};

use crate::tree::TreeSkeleton;

pub const BARK_COLOR: Vec3 = Vec3::new(0.36, 0.25, 0.16);
pub const GROUND_COLOR: Vec3 = Vec3::new(0.32, 0.42, 0.20);
pub const GROUND_RADIUS: f32 = 32.0;
pub const BRANCH_RADIAL_SEGMENTS: u32 = 8;

/// Vertex layout shared by the branch and ground meshes
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

/// Indexed triangle mesh
#[derive(Debug, Clone, Default)]
pub struct SceneMesh {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl SceneMesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Tapered cylinder per branch, base radius to tip thickness
pub fn branch_mesh(skeleton: &TreeSkeleton, color: Vec3, radial_segments: u32) -> SceneMesh {
    let radial_segments = radial_segments.max(3) as usize;
    let mut vertices = Vec::with_capacity(skeleton.len() * radial_segments * 2);
    let mut indices = Vec::with_capacity(skeleton.len() * radial_segments * 6);

    for branch in skeleton.branches() {
        let direction = branch.direction();
        if direction == Vec3::ZERO {
            continue;
        }
        let base_index = vertices.len() as u32;

        // Find perpendicular vector
        let arbitrary = if direction.y.abs() > 0.9 { Vec3::X } else { Vec3::Y };
        let tangent = direction.cross(arbitrary).normalize();
        let bitangent = direction.cross(tangent).normalize();

        // Deeper branches read slightly lighter
        let shade = 1.0 + branch.level as f32 * 0.05;
        let ring_color = (color * shade).min(Vec3::ONE).to_array();

        for ring in 0..2 {
            let (center, radius) = if ring == 0 {
                (branch.start, branch.radius)
            } else {
                (branch.end, branch.thickness)
            };

            for i in 0..radial_segments {
                let angle = (i as f32 / radial_segments as f32) * TAU;
                let normal = (tangent * angle.cos() + bitangent * angle.sin()).normalize();
                vertices.push(MeshVertex {
                    position: (center + normal * radius).to_array(),
                    normal: normal.to_array(),
                    color: ring_color,
                });
            }
        }

        for i in 0..radial_segments {
            let next = (i + 1) % radial_segments;

            let i0 = base_index + i as u32;
            let i1 = base_index + next as u32;
            let i2 = base_index + (radial_segments + i) as u32;
            let i3 = base_index + (radial_segments + next) as u32;

            indices.extend_from_slice(&[i0, i2, i1, i1, i2, i3]);
        }
    }

    SceneMesh { vertices, indices }
}

/// Flat ground disk at y = 0 with a little Perlin color variation
pub fn ground_mesh(radius: f32, segments: u32, color: Vec3, seed: u32) -> SceneMesh {
    let segments = segments.max(3);
    let noise = Perlin::new(seed);
    let mut vertices = Vec::with_capacity(segments as usize + 1);
    let mut indices = Vec::with_capacity(segments as usize * 3);

    let tint = |p: Vec3| {
        let n = noise.get([p.x as f64 * 0.15, p.z as f64 * 0.15]) as f32;
        (color * (1.0 + n * 0.15)).clamp(Vec3::ZERO, Vec3::ONE).to_array()
    };

    vertices.push(MeshVertex {
        position: [0.0; 3],
        normal: Vec3::Y.to_array(),
        color: tint(Vec3::ZERO),
    });

    for i in 0..segments {
        let angle = i as f32 / segments as f32 * TAU;
        let p = Vec3::new(angle.cos() * radius, 0.0, angle.sin() * radius);
        vertices.push(MeshVertex {
            position: p.to_array(),
            normal: Vec3::Y.to_array(),
            color: tint(p),
        });
    }

    for i in 0..segments {
        let current = 1 + i;
        let next = 1 + (i + 1) % segments;
        // Counter-clockwise seen from above
        indices.extend_from_slice(&[0, next, current]);
    }

    SceneMesh { vertices, indices }
}
