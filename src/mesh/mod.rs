//! Indexed triangle meshes extracted from the octree.
//!
//! Author: Moroya Sakamoto

pub mod bvh;
pub(crate) mod tables;

pub use bvh::MeshBvh;

use glam::Vec3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Vertex with position and normal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Vertex {
    /// Position in 3D space
    pub position: Vec3,
    /// Surface normal
    pub normal: Vec3,
}

impl Vertex {
    /// Create a new vertex.
    #[inline]
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Vertex { position, normal }
    }
}

/// Shared-vertex indexed triangle mesh.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexedMesh {
    /// Mesh vertices
    pub vertices: Vec<Vertex>,
    /// Flat triangle index list, three entries per triangle
    pub indices: Vec<u32>,
}

impl IndexedMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        IndexedMesh::default()
    }

    /// Number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Whether the mesh has no triangles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Recompute vertex normals by averaging incident face normals.
    ///
    /// Face normals are left unnormalized during accumulation, which weights
    /// each face by twice its area. Degenerate triangles contribute nothing.
    pub fn recompute_normals(&mut self) {
        if self.vertices.is_empty() {
            return;
        }
        let face_normals: Vec<Vec3> = self
            .indices
            .par_chunks(3)
            .map(|tri| {
                let a = self.vertices[tri[0] as usize].position;
                let b = self.vertices[tri[1] as usize].position;
                let c = self.vertices[tri[2] as usize].position;
                (b - a).cross(c - a)
            })
            .collect();

        let mut accum = vec![Vec3::ZERO; self.vertices.len()];
        for (tri, n) in self.indices.chunks(3).zip(&face_normals) {
            accum[tri[0] as usize] += *n;
            accum[tri[1] as usize] += *n;
            accum[tri[2] as usize] += *n;
        }
        for (vertex, n) in self.vertices.iter_mut().zip(accum) {
            vertex.normal = n.normalize_or_zero();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let mesh = IndexedMesh {
            vertices: vec![
                Vertex::new(Vec3::ZERO, Vec3::Z),
                Vertex::new(Vec3::X, Vec3::Z),
                Vertex::new(Vec3::Y, Vec3::Z),
            ],
            indices: vec![0, 1, 2],
        };
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert!(!mesh.is_empty());
    }

    #[test]
    fn test_recompute_normals() {
        let mut mesh = IndexedMesh {
            vertices: vec![
                Vertex::new(Vec3::ZERO, Vec3::X),
                Vertex::new(Vec3::X, Vec3::X),
                Vertex::new(Vec3::Y, Vec3::X),
            ],
            indices: vec![0, 1, 2],
        };
        mesh.recompute_normals();
        for v in &mesh.vertices {
            assert!((v.normal - Vec3::Z).length() < 1e-6);
        }
    }
}
