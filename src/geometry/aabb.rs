//! Axis-aligned bounding box with the predicate set the octree needs.
//!
//! Author: Moroya Sakamoto

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::GEOM_EPSILON;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from min/max corners.
    #[inline]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Aabb { min, max }
    }

    /// Create an empty (inverted) AABB.
    #[inline]
    pub fn empty() -> Self {
        Aabb {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    /// AABB of a sphere.
    #[inline]
    pub fn from_sphere(center: Vec3, radius: f32) -> Self {
        Aabb {
            min: center - Vec3::splat(radius),
            max: center + Vec3::splat(radius),
        }
    }

    /// Center point.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Edge lengths.
    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Grow symmetrically by `epsilon` on every axis.
    #[inline]
    pub fn add_epsilon(&mut self, epsilon: f32) {
        self.min -= Vec3::splat(epsilon);
        self.max += Vec3::splat(epsilon);
    }

    /// Expand to include a point.
    #[inline]
    pub fn expand_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Expand to include another AABB.
    #[inline]
    pub fn merge(&mut self, other: &Aabb) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// The i-th corner; bit 2 selects max X, bit 1 max Y, bit 0 max Z.
    #[inline]
    pub fn corner(&self, corner: usize) -> Vec3 {
        Vec3::new(
            if corner & 4 != 0 { self.max.x } else { self.min.x },
            if corner & 2 != 0 { self.max.y } else { self.min.y },
            if corner & 1 != 0 { self.max.z } else { self.min.z },
        )
    }

    /// Interval overlap test on all three axes.
    #[inline]
    pub fn intersects_aabb(&self, other: &Aabb) -> bool {
        !(interval_does_not_overlap(self.min.x, self.max.x, other.min.x, other.max.x)
            || interval_does_not_overlap(self.min.y, self.max.y, other.min.y, other.max.y)
            || interval_does_not_overlap(self.min.z, self.max.z, other.min.z, other.max.z))
    }

    /// Point containment, half-open on the max faces.
    #[inline]
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x < self.max.x
            && point.y >= self.min.y
            && point.y < self.max.y
            && point.z >= self.min.z
            && point.z < self.max.z
    }

    /// Squared distance from `point` to the box, zero inside.
    #[inline]
    pub fn squared_distance(&self, point: Vec3) -> f32 {
        let clamped = point.clamp(self.min, self.max);
        (point - clamped).length_squared()
    }

    /// Largest squared distance from `point` to any corner.
    #[inline]
    pub fn max_squared_distance(&self, point: Vec3) -> f32 {
        let mut max_sq = 0.0f32;
        for i in 0..8 {
            max_sq = max_sq.max(self.corner(i).distance_squared(point));
        }
        max_sq
    }

    /// Does the box reach into the sphere?
    #[inline]
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.squared_distance(center) < radius * radius
    }

    /// Does the plane through `point` with `normal` cut the box?
    ///
    /// Inspects the side of the eight corners; true once both sides occur.
    pub fn intersects_plane(&self, point: Vec3, normal: Vec3) -> bool {
        let mut mask = 0u8;
        for i in 0..8 {
            let dist = (self.corner(i) - point).dot(normal);
            mask |= 1 << usize::from(dist < 0.0);
            if mask == 3 {
                return true;
            }
        }
        false
    }

    /// Box/triangle overlap via the Akenine-Möller separating axis test.
    ///
    /// Thirteen axes: the three box normals, the triangle normal and the nine
    /// cross products of triangle edges with the box axes. The box corners are
    /// dilated by [`GEOM_EPSILON`] so exactly coplanar triangles still register.
    pub fn intersects_triangle(&self, p1: Vec3, p2: Vec3, p3: Vec3, normal: Vec3) -> bool {
        // Box face normals first: cheap interval tests on the raw extents.
        let (t_min, t_max) = project_triangle_on_axis(Vec3::X, p1, p2, p3);
        if interval_does_not_overlap(self.min.x, self.max.x, t_min, t_max) {
            return false;
        }
        let (t_min, t_max) = project_triangle_on_axis(Vec3::Y, p1, p2, p3);
        if interval_does_not_overlap(self.min.y, self.max.y, t_min, t_max) {
            return false;
        }
        let (t_min, t_max) = project_triangle_on_axis(Vec3::Z, p1, p2, p3);
        if interval_does_not_overlap(self.min.z, self.max.z, t_min, t_max) {
            return false;
        }

        let mut corners = [Vec3::ZERO; 8];
        let min_eps = self.min - Vec3::splat(GEOM_EPSILON);
        let max_eps = self.max + Vec3::splat(GEOM_EPSILON);
        for (i, corner) in corners.iter_mut().enumerate() {
            *corner = Vec3::new(
                if i & 4 != 0 { max_eps.x } else { min_eps.x },
                if i & 2 != 0 { max_eps.y } else { min_eps.y },
                if i & 1 != 0 { max_eps.z } else { min_eps.z },
            );
        }

        if separated_on_axis(normal, p1, p2, p3, &corners) {
            return false;
        }

        let edges = [p2 - p1, p3 - p1, p3 - p2];
        for edge in edges {
            if separated_on_axis(edge, p1, p2, p3, &corners)
                || separated_on_axis(edge.cross(Vec3::X), p1, p2, p3, &corners)
                || separated_on_axis(edge.cross(Vec3::Y), p1, p2, p3, &corners)
                || separated_on_axis(edge.cross(Vec3::Z), p1, p2, p3, &corners)
            {
                return false;
            }
        }
        true
    }
}

#[inline]
fn interval_does_not_overlap(min1: f32, max1: f32, min2: f32, max2: f32) -> bool {
    min1 > max2 || min2 > max1
}

#[inline]
fn project_triangle_on_axis(axis: Vec3, p1: Vec3, p2: Vec3, p3: Vec3) -> (f32, f32) {
    let d1 = axis.dot(p1);
    let d2 = axis.dot(p2);
    let d3 = axis.dot(p3);
    (d1.min(d2).min(d3), d1.max(d2).max(d3))
}

#[inline]
fn project_points_on_axis(axis: Vec3, points: &[Vec3; 8]) -> (f32, f32) {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for p in points {
        let d = axis.dot(*p);
        min = min.min(d);
        max = max.max(d);
    }
    (min, max)
}

#[inline]
fn separated_on_axis(axis: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, corners: &[Vec3; 8]) -> bool {
    let (t_min, t_max) = project_triangle_on_axis(axis, p1, p2, p3);
    let (b_min, b_max) = project_points_on_axis(axis, corners);
    interval_does_not_overlap(b_min, b_max, t_min, t_max)
}
