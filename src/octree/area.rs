//! Integer-indexed cubic regions of the octree lattice.
//!
//! Author: Moroya Sakamoto

use glam::{IVec3, Vec3};

use crate::geometry::Aabb;

/// A cubic sub-region of the lattice.
///
/// Identified by its integer minimum corner and a power-of-two size exponent:
/// the cube spans `2^size_expo` cells per axis. The real-world corner and
/// side length are carried along so conversions stay a single multiply-add;
/// the invariant is `real_size == cell_size * 2^size_expo`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Area {
    /// Integer minimum corner in the cell lattice
    pub min_pos: IVec3,
    /// Size exponent; the cube side is `2^size_expo` cells
    pub size_expo: u32,
    /// Real-world minimum corner
    pub min_real: Vec3,
    /// Real-world side length
    pub real_size: f32,
}

impl Area {
    /// Create an area.
    #[inline]
    pub fn new(min_pos: IVec3, size_expo: u32, min_real: Vec3, real_size: f32) -> Self {
        Area {
            min_pos,
            size_expo,
            min_real,
            real_size,
        }
    }

    /// The eight child areas with exponent `size_expo - 1`.
    ///
    /// Child `i` selects the upper half on X for bit 2, Y for bit 1, Z for
    /// bit 0, matching the node child indexing.
    pub fn sub_areas(&self) -> [Area; 8] {
        let half_size = self.real_size * 0.5;
        let half_cells = 1 << (self.size_expo - 1);
        std::array::from_fn(|i| {
            let offset = IVec3::new(
                ((i & 4) != 0) as i32,
                ((i & 2) != 0) as i32,
                (i & 1) as i32,
            );
            Area {
                min_pos: self.min_pos + offset * half_cells,
                size_expo: self.size_expo - 1,
                min_real: self.min_real + offset.as_vec3() * half_size,
                real_size: half_size,
            }
        })
    }

    /// Integer corner `i`; bit 2 selects max X, bit 1 max Y, bit 0 max Z.
    #[inline]
    pub fn corner(&self, corner: usize) -> IVec3 {
        let offset = IVec3::new(
            ((corner & 4) != 0) as i32,
            ((corner & 2) != 0) as i32,
            (corner & 1) as i32,
        );
        self.min_pos + offset * (1 << self.size_expo)
    }

    /// Integer and real position of corner `i` (0 = min, 7 = max).
    #[inline]
    pub fn corner_vecs(&self, corner: usize) -> (IVec3, Vec3) {
        let offset = IVec3::new(
            ((corner & 4) != 0) as i32,
            ((corner & 2) != 0) as i32,
            (corner & 1) as i32,
        );
        (
            self.min_pos + offset * (1 << self.size_expo),
            self.min_real + offset.as_vec3() * self.real_size,
        )
    }

    /// Real-world center.
    #[inline]
    pub fn center(&self) -> Vec3 {
        self.min_real + Vec3::splat(self.real_size * 0.5)
    }

    /// The covered box.
    #[inline]
    pub fn to_aabb(&self) -> Aabb {
        Aabb::new(self.min_real, self.min_real + Vec3::splat(self.real_size))
    }

    /// Point containment, half-open on the max faces.
    #[inline]
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.to_aabb().contains_point(point)
    }
}

/// The tree's integer cell lattice.
///
/// Real position of a cell index is `origin + index * cell_size`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Lattice {
    pub origin: Vec3,
    pub cell_size: f32,
}

impl Lattice {
    /// Real position of an integer cell index.
    #[inline]
    pub fn real_pos(&self, cell: IVec3) -> Vec3 {
        self.origin + cell.as_vec3() * self.cell_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_area() -> Area {
        Area::new(IVec3::ZERO, 4, Vec3::splat(-1.0), 2.0)
    }

    #[test]
    fn test_sub_areas() {
        let area = unit_area();
        let sub = area.sub_areas();
        assert_eq!(sub[0].min_pos, IVec3::ZERO);
        assert_eq!(sub[0].size_expo, 3);
        assert_eq!(sub[0].real_size, 1.0);
        // Child 7 is the +X+Y+Z octant
        assert_eq!(sub[7].min_pos, IVec3::splat(8));
        assert_eq!(sub[7].min_real, Vec3::ZERO);
        // Child 4 selects max X only
        assert_eq!(sub[4].min_pos, IVec3::new(8, 0, 0));
        assert_eq!(sub[4].min_real, Vec3::new(0.0, -1.0, -1.0));
    }

    #[test]
    fn test_corners() {
        let area = unit_area();
        assert_eq!(area.corner(0), IVec3::ZERO);
        assert_eq!(area.corner(7), IVec3::splat(16));
        assert_eq!(area.corner(4), IVec3::new(16, 0, 0));
        let (ipos, rpos) = area.corner_vecs(7);
        assert_eq!(ipos, IVec3::splat(16));
        assert_eq!(rpos, Vec3::splat(1.0));
    }

    #[test]
    fn test_contains_point() {
        let area = unit_area();
        assert!(area.contains_point(Vec3::ZERO));
        assert!(area.contains_point(Vec3::splat(-1.0)));
        assert!(!area.contains_point(Vec3::splat(1.0)));
    }

    #[test]
    fn test_lattice_roundtrip() {
        let area = unit_area();
        let lattice = Lattice {
            origin: area.min_real,
            cell_size: area.real_size / (1 << area.size_expo) as f32,
        };
        assert_eq!(lattice.real_pos(IVec3::ZERO), Vec3::splat(-1.0));
        assert_eq!(lattice.real_pos(IVec3::splat(16)), Vec3::splat(1.0));
        assert_eq!(lattice.real_pos(area.corner(7)), area.corner_vecs(7).1);
    }
}
