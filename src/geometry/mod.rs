//! Geometric primitives: axis-aligned boxes and rays.
//!
//! These are pure predicates — every test returns a bool and never fails.

mod aabb;
mod ray;

pub use aabb::Aabb;
pub use ray::{Ray, RayHit};

/// Shared geometric epsilon.
///
/// Used for the SAT box dilation (avoids exact-coplanar misses) and for
/// padding a solid's AABB before sampling it into a root cube.
pub const GEOM_EPSILON: f32 = 1e-5;
