//! Composition solids: union, intersection, inversion.
//!
//! With the inside-positive field, union is the element-wise maximum sample
//! and intersection the minimum; inversion negates distance and normal.
//!
//! Author: Moroya Sakamoto

use glam::Vec3;

use super::{ImplicitSolid, Sample};
use crate::geometry::Aabb;

/// Union of several solids.
pub struct Union {
    solids: Vec<Box<dyn ImplicitSolid>>,
    aabb: Aabb,
}

impl Union {
    /// Combine `solids` into their union.
    pub fn new(solids: Vec<Box<dyn ImplicitSolid>>) -> Self {
        let aabb = merged_aabb(&solids);
        Union { solids, aabb }
    }
}

impl ImplicitSolid for Union {
    fn sample(&self, point: Vec3) -> Sample {
        let mut best = Sample::new(f32::NEG_INFINITY, point, Vec3::X);
        for solid in &self.solids {
            let s = solid.sample(point);
            if s.signed_distance > best.signed_distance {
                best = s;
            }
        }
        best
    }

    fn sign(&self, point: Vec3) -> bool {
        self.solids.iter().any(|s| s.sign(point))
    }

    fn intersects_surface(&self, aabb: &Aabb) -> bool {
        self.solids.iter().any(|s| s.intersects_surface(aabb))
    }

    fn aabb(&self) -> Aabb {
        self.aabb
    }

    fn prepare_sampling(&mut self, aabb: &Aabb, cell_size: f32) {
        for solid in &mut self.solids {
            solid.prepare_sampling(aabb, cell_size);
        }
    }
}

/// Intersection of several solids.
pub struct Intersection {
    solids: Vec<Box<dyn ImplicitSolid>>,
    aabb: Aabb,
}

impl Intersection {
    /// Combine `solids` into their intersection.
    pub fn new(solids: Vec<Box<dyn ImplicitSolid>>) -> Self {
        // Merged bounds are conservative for an intersection.
        let aabb = merged_aabb(&solids);
        Intersection { solids, aabb }
    }
}

impl ImplicitSolid for Intersection {
    fn sample(&self, point: Vec3) -> Sample {
        let mut best = Sample::new(f32::INFINITY, point, Vec3::X);
        for solid in &self.solids {
            let s = solid.sample(point);
            if s.signed_distance < best.signed_distance {
                best = s;
            }
        }
        best
    }

    fn sign(&self, point: Vec3) -> bool {
        !self.solids.is_empty() && self.solids.iter().all(|s| s.sign(point))
    }

    fn intersects_surface(&self, aabb: &Aabb) -> bool {
        self.solids.iter().any(|s| s.intersects_surface(aabb))
    }

    fn aabb(&self) -> Aabb {
        self.aabb
    }

    fn prepare_sampling(&mut self, aabb: &Aabb, cell_size: f32) {
        for solid in &mut self.solids {
            solid.prepare_sampling(aabb, cell_size);
        }
    }
}

/// Inversion of a solid: inside becomes outside.
pub struct Invert<S>(
    /// The wrapped solid
    pub S,
);

impl<S: ImplicitSolid> ImplicitSolid for Invert<S> {
    fn sample(&self, point: Vec3) -> Sample {
        let mut s = self.0.sample(point);
        s.signed_distance = -s.signed_distance;
        s.normal = -s.normal;
        s
    }

    fn sign(&self, point: Vec3) -> bool {
        self.0.sample(point).signed_distance <= 0.0
    }

    fn intersects_surface(&self, aabb: &Aabb) -> bool {
        self.0.intersects_surface(aabb)
    }

    fn cube_needs_subdivision(&self, area: &crate::octree::Area) -> bool {
        self.0.cube_needs_subdivision(area)
    }

    fn aabb(&self) -> Aabb {
        self.0.aabb()
    }

    fn prepare_sampling(&mut self, aabb: &Aabb, cell_size: f32) {
        self.0.prepare_sampling(aabb, cell_size)
    }
}

fn merged_aabb(solids: &[Box<dyn ImplicitSolid>]) -> Aabb {
    let mut aabb = Aabb::empty();
    for solid in solids {
        aabb.merge(&solid.aabb());
    }
    aabb
}
