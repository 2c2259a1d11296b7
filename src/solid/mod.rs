//! The implicit solid input contract.
//!
//! An [`ImplicitSolid`] is anything that can be sampled as a signed distance
//! field. The field is **positive inside** the solid: `sign()` is true for
//! interior points, union takes the element-wise maximum and intersection the
//! minimum. Besides point samples, a solid answers conservative surface
//! queries so the octree builder can prune uniform regions, and gets one
//! `prepare_sampling` call before a sampling or CSG recursion starts.
//!
//! Author: Moroya Sakamoto

mod ops;
mod primitives;

pub use ops::{Intersection, Invert, Union};
pub use primitives::{Box3d, Sphere};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::geometry::Aabb;
use crate::octree::Area;

/// Material identifier carried through samples.
pub type MaterialId = u32;

/// One signed-distance sample.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Sample {
    /// Signed distance to the surface, positive inside the solid.
    pub signed_distance: f32,
    /// Closest point on the surface.
    pub closest_surface_pos: Vec3,
    /// Unit surface normal at the closest point, pointing out of the solid.
    pub normal: Vec3,
    /// Material at the closest surface point.
    pub material_id: MaterialId,
}

impl Sample {
    /// Create a sample without material information.
    #[inline]
    pub fn new(signed_distance: f32, closest_surface_pos: Vec3, normal: Vec3) -> Self {
        Sample {
            signed_distance,
            closest_surface_pos,
            normal,
            material_id: 0,
        }
    }
}

/// A solid queried by signed-distance sampling.
pub trait ImplicitSolid {
    /// Sample the field at `point`.
    fn sample(&self, point: Vec3) -> Sample;

    /// Inside test; positive signed distance counts as inside.
    fn sign(&self, point: Vec3) -> bool {
        self.sample(point).signed_distance >= 0.0
    }

    /// Does the surface (zero contour) pass through `aabb`?
    ///
    /// Conservative: `false` guarantees the box is uniformly signed.
    fn intersects_surface(&self, aabb: &Aabb) -> bool;

    /// Should the builder subdivide `area`?
    ///
    /// Defaults to the surface test on the area's box; solids may refine it.
    fn cube_needs_subdivision(&self, area: &Area) -> bool {
        self.intersects_surface(&area.to_aabb())
    }

    /// Bounds of the surface.
    fn aabb(&self) -> Aabb;

    /// Called exactly once before a sampling or CSG recursion begins.
    ///
    /// Lets the solid build an acceleration structure for the given region
    /// and resolution. The default does nothing.
    fn prepare_sampling(&mut self, _aabb: &Aabb, _cell_size: f32) {}
}

impl<T: ImplicitSolid + ?Sized> ImplicitSolid for &mut T {
    fn sample(&self, point: Vec3) -> Sample {
        (**self).sample(point)
    }

    fn sign(&self, point: Vec3) -> bool {
        (**self).sign(point)
    }

    fn intersects_surface(&self, aabb: &Aabb) -> bool {
        (**self).intersects_surface(aabb)
    }

    fn cube_needs_subdivision(&self, area: &Area) -> bool {
        (**self).cube_needs_subdivision(area)
    }

    fn aabb(&self) -> Aabb {
        (**self).aabb()
    }

    fn prepare_sampling(&mut self, aabb: &Aabb, cell_size: f32) {
        (**self).prepare_sampling(aabb, cell_size)
    }
}
