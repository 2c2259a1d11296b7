//! BVH (Bounding Volume Hierarchy) over mesh triangles.
//!
//! Accelerates ray/surface intersection and box overlap queries against an
//! extracted mesh. Built by median split along the longest axis.
//!
//! Author: Moroya Sakamoto

use glam::Vec3;
use rayon::prelude::*;

use crate::geometry::{Aabb, Ray, RayHit};
use crate::mesh::Vertex;

/// Triangle with precomputed normal and bounds.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    /// First vertex
    pub v0: Vec3,
    /// Second vertex
    pub v1: Vec3,
    /// Third vertex
    pub v2: Vec3,
    /// Unit face normal
    pub normal: Vec3,
    /// Bounds of the triangle
    pub aabb: Aabb,
}

impl Triangle {
    /// Create a triangle from vertices.
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        let normal = (v1 - v0).cross(v2 - v0).normalize_or_zero();
        let mut aabb = Aabb::empty();
        aabb.expand_point(v0);
        aabb.expand_point(v1);
        aabb.expand_point(v2);
        Triangle {
            v0,
            v1,
            v2,
            normal,
            aabb,
        }
    }

    /// Möller–Trumbore ray/triangle intersection.
    ///
    /// Returns the ray parameter of the hit if it lies in `(0, t_max)`.
    #[inline]
    pub fn intersect_ray(&self, ray: &Ray, t_max: f32) -> Option<f32> {
        let e1 = self.v1 - self.v0;
        let e2 = self.v2 - self.v0;
        let p = ray.direction.cross(e2);
        let det = e1.dot(p);
        if det.abs() < 1e-12 {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = ray.origin - self.v0;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(e1);
        let v = ray.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = e2.dot(q) * inv_det;
        (t > 1e-6 && t < t_max).then_some(t)
    }
}

/// BVH node.
#[derive(Debug)]
pub enum BvhNode {
    /// Leaf node containing triangle indices
    Leaf {
        /// Bounds of the contained triangles
        aabb: Aabb,
        /// Indices into the triangle list
        triangles: Vec<usize>,
    },
    /// Internal node with two children
    Internal {
        /// Combined bounds of both children
        aabb: Aabb,
        /// Lower half along the split axis
        left: Box<BvhNode>,
        /// Upper half along the split axis
        right: Box<BvhNode>,
    },
}

impl BvhNode {
    /// Bounds of this node.
    #[inline]
    pub fn aabb(&self) -> &Aabb {
        match self {
            BvhNode::Leaf { aabb, .. } => aabb,
            BvhNode::Internal { aabb, .. } => aabb,
        }
    }
}

/// BVH over the triangles of an indexed mesh.
#[derive(Debug)]
pub struct MeshBvh {
    /// All triangles, in mesh order
    pub triangles: Vec<Triangle>,
    /// Root node, `None` for an empty mesh
    pub root: Option<BvhNode>,
}

impl MeshBvh {
    /// Build a BVH from mesh data.
    pub fn build(vertices: &[Vertex], indices: &[u32], max_triangles_per_leaf: usize) -> Self {
        let triangles: Vec<Triangle> = indices
            .chunks(3)
            .filter(|chunk| chunk.len() == 3)
            .map(|chunk| {
                Triangle::new(
                    vertices[chunk[0] as usize].position,
                    vertices[chunk[1] as usize].position,
                    vertices[chunk[2] as usize].position,
                )
            })
            .collect();

        if triangles.is_empty() {
            return MeshBvh {
                triangles,
                root: None,
            };
        }

        let order: Vec<usize> = (0..triangles.len()).collect();
        let root = Self::build_node(&triangles, order, max_triangles_per_leaf.max(1));
        MeshBvh {
            triangles,
            root: Some(root),
        }
    }

    fn build_node(triangles: &[Triangle], mut indices: Vec<usize>, max_per_leaf: usize) -> BvhNode {
        let mut aabb = Aabb::empty();
        for &idx in &indices {
            aabb.merge(&triangles[idx].aabb);
        }

        if indices.len() <= max_per_leaf {
            return BvhNode::Leaf {
                aabb,
                triangles: indices,
            };
        }

        let size = aabb.size();
        let axis = if size.x > size.y && size.x > size.z {
            0
        } else if size.y > size.z {
            1
        } else {
            2
        };
        indices.sort_by(|&a, &b| {
            let ca = triangles[a].aabb.center()[axis];
            let cb = triangles[b].aabb.center()[axis];
            ca.partial_cmp(&cb).unwrap_or(std::cmp::Ordering::Equal)
        });

        let mid = indices.len() / 2;
        let right_indices = indices.split_off(mid);
        let left = Self::build_node(triangles, indices, max_per_leaf);
        let right = Self::build_node(triangles, right_indices, max_per_leaf);
        BvhNode::Internal {
            aabb,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Closest ray intersection with parameter below `t_max`.
    pub fn intersect_ray(&self, ray: &Ray, t_max: f32) -> Option<RayHit> {
        let root = self.root.as_ref()?;
        let mut best: Option<RayHit> = None;
        self.intersect_ray_node(root, ray, t_max, &mut best);
        best
    }

    fn intersect_ray_node(&self, node: &BvhNode, ray: &Ray, t_max: f32, best: &mut Option<RayHit>) {
        let limit = best.map_or(t_max, |h| h.t);
        if !ray.intersects_aabb(node.aabb(), 0.0, limit) {
            return;
        }
        match node {
            BvhNode::Leaf { triangles, .. } => {
                for &idx in triangles {
                    let tri = &self.triangles[idx];
                    let limit = best.map_or(t_max, |h| h.t);
                    if let Some(t) = tri.intersect_ray(ray, limit) {
                        *best = Some(RayHit {
                            t,
                            position: ray.at(t),
                            normal: tri.normal,
                        });
                    }
                }
            }
            BvhNode::Internal { left, right, .. } => {
                self.intersect_ray_node(left, ray, t_max, best);
                self.intersect_ray_node(right, ray, t_max, best);
            }
        }
    }

    /// Closest intersections for a batch of rays, in parallel.
    pub fn intersect_ray_batch(&self, rays: &[Ray], t_max: f32) -> Vec<Option<RayHit>> {
        rays.par_iter()
            .map(|ray| self.intersect_ray(ray, t_max))
            .collect()
    }

    /// Does any triangle overlap `aabb`?
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        match &self.root {
            None => false,
            Some(root) => self.intersects_aabb_node(root, aabb),
        }
    }

    fn intersects_aabb_node(&self, node: &BvhNode, aabb: &Aabb) -> bool {
        if !aabb.intersects_aabb(node.aabb()) {
            return false;
        }
        match node {
            BvhNode::Leaf { triangles, .. } => triangles.iter().any(|&idx| {
                let tri = &self.triangles[idx];
                aabb.intersects_triangle(tri.v0, tri.v1, tri.v2, tri.normal)
            }),
            BvhNode::Internal { left, right, .. } => {
                self.intersects_aabb_node(left, aabb) || self.intersects_aabb_node(right, aabb)
            }
        }
    }

    /// Total triangle count.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Bounds of the whole mesh.
    pub fn bounds(&self) -> Option<Aabb> {
        self.root.as_ref().map(|r| *r.aabb())
    }
}
