//! Rays and ray hits.
//!
//! Author: Moroya Sakamoto

use glam::Vec3;

use super::Aabb;

/// Ray for surface queries.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Ray origin point
    pub origin: Vec3,
    /// Ray direction (normalized)
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray; the direction is normalized.
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Ray {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Point along the ray at parameter `t`.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Slab test: does the ray meet `aabb` somewhere in `[t_min, t_max]`?
    #[inline]
    pub fn intersects_aabb(&self, aabb: &Aabb, t_min: f32, t_max: f32) -> bool {
        let inv = self.direction.recip();
        let t0 = (aabb.min - self.origin) * inv;
        let t1 = (aabb.max - self.origin) * inv;
        let near = t0.min(t1).max_element().max(t_min);
        let far = t0.max(t1).min_element().min(t_max);
        near <= far
    }
}

/// Hit record from a ray/surface query.
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    /// Distance along the ray
    pub t: f32,
    /// Hit point
    pub position: Vec3,
    /// Face normal of the hit triangle
    pub normal: Vec3,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0));
        assert!((ray.at(3.0) - Vec3::new(3.0, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_ray_aabb_hit() {
        let aabb = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let ray = Ray::new(Vec3::new(-5.0, 0.0, 0.0), Vec3::X);
        assert!(ray.intersects_aabb(&aabb, 0.0, f32::MAX));
        // Hit lies beyond the allowed range
        assert!(!ray.intersects_aabb(&aabb, 0.0, 3.0));
    }

    #[test]
    fn test_ray_aabb_miss() {
        let aabb = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let ray = Ray::new(Vec3::new(-5.0, 3.0, 0.0), Vec3::X);
        assert!(!ray.intersects_aabb(&aabb, 0.0, f32::MAX));
        // Box behind the origin
        let behind = Ray::new(Vec3::new(5.0, 0.0, 0.0), Vec3::X);
        assert!(!behind.intersects_aabb(&aabb, 0.0, f32::MAX));
    }

    #[test]
    fn test_ray_starting_inside() {
        let aabb = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert!(ray.intersects_aabb(&aabb, 0.0, f32::MAX));
    }
}
