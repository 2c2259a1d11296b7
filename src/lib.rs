//! # ALICE-CSG
//!
//! **A.L.I.C.E. CSG** - sparse octree signed distance fields with
//! constructive solid geometry.
//!
//! Represents a 3D solid as a sparse octree over a signed distance field and
//! edits it in place with boolean operations, against either an implicit
//! solid or another octree sampled over the same root cube. The current
//! surface comes out as a shared-vertex indexed triangle mesh through a
//! modified Marching Cubes extractor, and rays can be intersected against it.
//!
//! ## Features
//!
//! - **Sampling**: top-down adaptive construction from any [`ImplicitSolid`]
//! - **CSG**: union, intersection, subtraction, inversion; implicit or
//!   aligned-octree operands
//! - **Extraction**: watertight indexed mesh with vertices shared across
//!   leaf boundaries
//! - **Queries**: closest ray intersection, point sign, center of mass
//!
//! ## Example
//!
//! ```rust
//! use alice_csg::prelude::*;
//!
//! // Sample a sphere into an octree.
//! let mut sphere = Sphere::new(Vec3::ZERO, 1.0);
//! let bounds = Aabb::new(Vec3::splat(-1.5), Vec3::splat(1.5));
//! let mut tree = SdfOctree::sample_solid_in(&mut sphere, &bounds, 5).unwrap();
//!
//! // Carve a smaller sphere out of it.
//! let mut hole = Sphere::new(Vec3::new(0.8, 0.0, 0.0), 0.5);
//! tree.subtract(&mut hole);
//!
//! // Extract the surface and shoot a ray at it.
//! let mesh = tree.generate_mesh();
//! assert!(mesh.triangle_count() > 0);
//! let hit = tree.ray_intersect_closest(&Ray::new(Vec3::new(0.0, 0.0, 3.0), -Vec3::Z));
//! assert!(hit.is_some());
//! ```
//!
//! Author: Moroya Sakamoto

#![warn(missing_docs)]

pub mod error;
pub mod geometry;
pub mod mesh;
pub mod octree;
pub mod solid;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude - commonly used types and functions
pub mod prelude {
    pub use crate::error::CsgError;
    pub use crate::geometry::{Aabb, Ray, RayHit};
    pub use crate::mesh::{IndexedMesh, MeshBvh, Vertex};
    pub use crate::octree::{Area, SdfOctree, LEAF_EXPO};
    pub use crate::solid::{
        Box3d, ImplicitSolid, Intersection, Invert, MaterialId, Sample, Sphere, Union,
    };
    pub use glam::{IVec3, Vec3};
}

// Re-exports for convenience
pub use error::CsgError;
pub use mesh::IndexedMesh;
pub use octree::SdfOctree;
pub use solid::ImplicitSolid;
