//! Analytic solids.
//!
//! Both primitives return exact surface projections in their samples, which
//! is what places surface vertices during octree construction.
//!
//! Author: Moroya Sakamoto

use glam::Vec3;

use super::{ImplicitSolid, Sample};
use crate::geometry::Aabb;

/// Sphere solid.
#[derive(Debug, Clone, Copy)]
pub struct Sphere {
    /// Center of the sphere
    pub center: Vec3,
    /// Radius
    pub radius: f32,
}

impl Sphere {
    /// Create a sphere at `center` with `radius`.
    pub fn new(center: Vec3, radius: f32) -> Self {
        Sphere { center, radius }
    }
}

impl ImplicitSolid for Sphere {
    fn sample(&self, point: Vec3) -> Sample {
        let delta = point - self.center;
        let dist = delta.length();
        let normal = if dist > 1e-12 { delta / dist } else { Vec3::X };
        Sample::new(
            self.radius - dist,
            self.center + normal * self.radius,
            normal,
        )
    }

    fn sign(&self, point: Vec3) -> bool {
        point.distance_squared(self.center) <= self.radius * self.radius
    }

    fn intersects_surface(&self, aabb: &Aabb) -> bool {
        let r_sq = self.radius * self.radius;
        aabb.squared_distance(self.center) <= r_sq && aabb.max_squared_distance(self.center) >= r_sq
    }

    fn aabb(&self) -> Aabb {
        Aabb::from_sphere(self.center, self.radius)
    }
}

/// Axis-aligned box solid.
#[derive(Debug, Clone, Copy)]
pub struct Box3d {
    /// The box extents
    pub bounds: Aabb,
}

impl Box3d {
    /// Create a box covering `bounds`.
    pub fn new(bounds: Aabb) -> Self {
        Box3d { bounds }
    }

    /// Create a box from center and half-extents.
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Box3d {
            bounds: Aabb::new(center - half_extents, center + half_extents),
        }
    }
}

impl ImplicitSolid for Box3d {
    fn sample(&self, point: Vec3) -> Sample {
        let center = self.bounds.center();
        let half = self.bounds.size() * 0.5;
        let local = point - center;
        let q = local.abs() - half;

        if q.max_element() > 0.0 {
            // Outside: project onto the box surface.
            let closest = point.clamp(self.bounds.min, self.bounds.max);
            let away = point - closest;
            let outside_dist = q.max(Vec3::ZERO).length();
            let normal = away.try_normalize().unwrap_or(Vec3::X);
            Sample::new(-outside_dist, closest, normal)
        } else {
            // Inside: push out through the nearest face.
            let face_dist = -q; // distance to each face pair
            let (axis, dist) = if face_dist.x <= face_dist.y && face_dist.x <= face_dist.z {
                (0, face_dist.x)
            } else if face_dist.y <= face_dist.z {
                (1, face_dist.y)
            } else {
                (2, face_dist.z)
            };
            let mut normal = Vec3::ZERO;
            normal[axis] = local[axis].signum();
            let mut closest = point;
            closest[axis] = center[axis] + half[axis] * local[axis].signum();
            Sample::new(dist, closest, normal)
        }
    }

    fn sign(&self, point: Vec3) -> bool {
        point.cmpge(self.bounds.min).all() && point.cmple(self.bounds.max).all()
    }

    fn intersects_surface(&self, aabb: &Aabb) -> bool {
        if !aabb.intersects_aabb(&self.bounds) {
            return false;
        }
        // A box fully inside the solid sees no surface.
        let contained = aabb.min.cmpge(self.bounds.min).all() && aabb.max.cmple(self.bounds.max).all();
        !contained
    }

    fn aabb(&self) -> Aabb {
        self.bounds
    }
}
