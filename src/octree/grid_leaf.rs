//! Fixed-resolution surface leaves.
//!
//! A grid leaf covers an area whose exponent equals [`LEAF_EXPO`] and stores
//! the inside/outside sign at every corner of its sub-cell lattice, plus one
//! [`SurfaceEdge`] per sub-cell edge that crosses the zero contour. The edge
//! list is what carries surface vertices; signs alone decide topology.
//!
//! Author: Moroya Sakamoto

use std::rc::Rc;

use glam::{IVec3, Vec3};

use crate::geometry::{Ray, RayHit};
use crate::mesh::bvh::MeshBvh;
use crate::mesh::tables::{DIRECTED_EDGES, TRI_TABLE};
use crate::mesh::Vertex;
use crate::octree::area::{Area, Lattice};
use crate::octree::vertex::{SharedSurfaceVertex, SurfaceEdge, VertexRegistry};
use crate::solid::ImplicitSolid;

/// Size exponent of a grid leaf; a leaf spans `2^LEAF_EXPO` cells per axis.
pub const LEAF_EXPO: u32 = 3;

/// Lattice points per axis (inclusive corners).
pub(crate) const LEAF_SIZE_1D: usize = (1 << LEAF_EXPO) + 1;
/// Sub-cells per axis.
pub(crate) const LEAF_SIZE_1D_INNER: usize = LEAF_SIZE_1D - 1;
/// Lattice points per axis plane.
pub(crate) const LEAF_SIZE_2D: usize = LEAF_SIZE_1D * LEAF_SIZE_1D;
/// Lattice points per leaf.
pub(crate) const LEAF_SIZE_3D: usize = LEAF_SIZE_2D * LEAF_SIZE_1D;

/// Linear stride of one step along an axis in the leaf lattice.
#[inline]
pub(crate) fn stride(direction: usize) -> usize {
    [LEAF_SIZE_2D, LEAF_SIZE_1D, 1][direction]
}

/// Lattice coordinates of a linear index (row-major `x·S² + y·S + z`).
#[inline]
fn from_index(index: usize) -> IVec3 {
    IVec3::new(
        (index / LEAF_SIZE_2D) as i32,
        ((index / LEAF_SIZE_1D) % LEAF_SIZE_1D) as i32,
        (index % LEAF_SIZE_1D) as i32,
    )
}

/// Per-direction flags over the leaf lattice, used as the "ignore" mask when
/// recomputing edges after a CSG rewrite.
type EdgeFlags = [[bool; LEAF_SIZE_3D]; 3];

/// A surface leaf: sign lattice plus zero-crossing edges.
#[derive(Clone, Debug)]
pub(crate) struct GridLeaf {
    signs: [bool; LEAF_SIZE_3D],
    edges: Vec<SurfaceEdge>,
}

impl GridLeaf {
    fn empty() -> Self {
        GridLeaf {
            signs: [false; LEAF_SIZE_3D],
            edges: Vec::new(),
        }
    }

    /// Build a leaf by sampling `solid` over `area`.
    pub fn from_solid(
        lattice: &Lattice,
        area: &Area,
        solid: &dyn ImplicitSolid,
        registry: &mut VertexRegistry,
    ) -> Self {
        let mut leaf = GridLeaf::empty();
        leaf.compute_signs(lattice, area, solid);
        leaf.compute_edges(lattice, area, solid, registry, None);
        leaf
    }

    /// Sample the sign at every lattice point.
    fn compute_signs(&mut self, lattice: &Lattice, area: &Area, solid: &dyn ImplicitSolid) {
        let mut index = 0;
        for x in 0..LEAF_SIZE_1D as i32 {
            for y in 0..LEAF_SIZE_1D as i32 {
                for z in 0..LEAF_SIZE_1D as i32 {
                    let pos = lattice.real_pos(area.min_pos + IVec3::new(x, y, z));
                    self.signs[index] = solid.sign(pos);
                    index += 1;
                }
            }
        }
    }

    /// Record every sub-cell edge whose endpoint signs differ.
    ///
    /// An edge whose lower endpoint lies strictly inside the leaf (off every
    /// face transverse to the edge) gets a leaf-private vertex; otherwise the
    /// registry decides vertex identity so neighbors agree. Edges flagged in
    /// `skip` were preserved across a CSG rewrite and are left alone.
    fn compute_edges(
        &mut self,
        lattice: &Lattice,
        area: &Area,
        solid: &dyn ImplicitSolid,
        registry: &mut VertexRegistry,
        skip: Option<&EdgeFlags>,
    ) {
        const INNER: usize = LEAF_SIZE_1D_INNER;
        self.edges.reserve(LEAF_SIZE_2D);
        let half_cell = lattice.cell_size * 0.5;
        let mut index = 0;
        for x in 0..LEAF_SIZE_1D {
            for y in 0..LEAF_SIZE_1D {
                for z in 0..LEAF_SIZE_1D {
                    for direction in 0..3usize {
                        if [x, y, z][direction] >= INNER {
                            continue;
                        }
                        if self.signs[index] == self.signs[index + stride(direction)] {
                            continue;
                        }
                        if let Some(skip) = skip {
                            if skip[direction][index] {
                                continue;
                            }
                        }
                        let private = match direction {
                            0 => y > 0 && y < INNER && z > 0 && z < INNER,
                            1 => x > 0 && x < INNER && z > 0 && z < INNER,
                            _ => x > 0 && x < INNER && y > 0 && y < INNER,
                        };
                        let global = area.min_pos + IVec3::new(x as i32, y as i32, z as i32);
                        let mut mid = lattice.real_pos(global);
                        mid[direction] += half_cell;
                        let make = || {
                            let s = solid.sample(mid);
                            Vertex::new(s.closest_surface_pos, s.normal)
                        };
                        let vertex = if private {
                            SharedSurfaceVertex::private(make())
                        } else {
                            registry.get_or_create(direction, global, make)
                        };
                        self.edges.push(SurfaceEdge {
                            min_index: index as u16,
                            direction: direction as u8,
                            vertex,
                        });
                    }
                    index += 1;
                }
            }
        }
    }

    /// Flip all signs; edges and their vertices stay valid.
    pub fn invert(&mut self) {
        for sign in &mut self.signs {
            *sign = !*sign;
        }
    }

    /// Union with an implicit solid over the leaf's area.
    pub fn merge_solid(
        &mut self,
        lattice: &Lattice,
        area: &Area,
        solid: &dyn ImplicitSolid,
        registry: &mut VertexRegistry,
    ) {
        self.rewrite_solid(lattice, area, solid, registry, true);
    }

    /// Intersection with an implicit solid over the leaf's area.
    pub fn intersect_solid(
        &mut self,
        lattice: &Lattice,
        area: &Area,
        solid: &dyn ImplicitSolid,
        registry: &mut VertexRegistry,
    ) {
        self.rewrite_solid(lattice, area, solid, registry, false);
    }

    fn rewrite_solid(
        &mut self,
        lattice: &Lattice,
        area: &Area,
        solid: &dyn ImplicitSolid,
        registry: &mut VertexRegistry,
        outward: bool,
    ) {
        let mut other = GridLeaf::empty();
        other.compute_signs(lattice, area, solid);
        for i in 0..LEAF_SIZE_3D {
            self.signs[i] = if outward {
                self.signs[i] || other.signs[i]
            } else {
                self.signs[i] && other.signs[i]
            };
        }

        let old_edges = std::mem::take(&mut self.edges);
        let mut kept = Box::new([[false; LEAF_SIZE_3D]; 3]);
        for edge in old_edges {
            let i1 = edge.min_index as usize;
            let i2 = i1 + stride(edge.direction as usize);
            if self.signs[i1] != self.signs[i2] {
                if other.signs[i1] != other.signs[i2] {
                    // The other surface also cuts this edge; pull the vertex
                    // toward it, per axis.
                    let s = sample_edge_midpoint(lattice, area, &edge, solid);
                    let inside_pos = other_inside_pos(lattice, area, &edge, &other);
                    refine_vertex(&edge.vertex, s.0, s.1, inside_pos, outward);
                }
                kept[edge.direction as usize][i1] = true;
                self.edges.push(edge);
            }
            // Dropped edges release their vertex with the last reference.
        }
        self.compute_edges(lattice, area, solid, registry, Some(&*kept));
    }

    /// Union with an aligned leaf covering the same area.
    pub fn merge_leaf(&mut self, lattice: &Lattice, area: &Area, other: &GridLeaf) {
        self.rewrite_leaf(lattice, area, other, true);
    }

    /// Intersection with an aligned leaf covering the same area.
    pub fn intersect_leaf(&mut self, lattice: &Lattice, area: &Area, other: &GridLeaf) {
        self.rewrite_leaf(lattice, area, other, false);
    }

    fn rewrite_leaf(&mut self, lattice: &Lattice, area: &Area, other: &GridLeaf, outward: bool) {
        for i in 0..LEAF_SIZE_3D {
            self.signs[i] = if outward {
                self.signs[i] || other.signs[i]
            } else {
                self.signs[i] && other.signs[i]
            };
        }

        let old_edges = std::mem::take(&mut self.edges);
        let mut kept_at = Box::new([[usize::MAX; LEAF_SIZE_3D]; 3]);
        for edge in old_edges {
            let i1 = edge.min_index as usize;
            let i2 = i1 + stride(edge.direction as usize);
            if self.signs[i1] != self.signs[i2] {
                kept_at[edge.direction as usize][i1] = self.edges.len();
                self.edges.push(edge);
            }
        }

        for other_edge in &other.edges {
            let i1 = other_edge.min_index as usize;
            let i2 = i1 + stride(other_edge.direction as usize);
            if self.signs[i1] == self.signs[i2] {
                continue;
            }
            let slot = kept_at[other_edge.direction as usize][i1];
            if slot == usize::MAX {
                // Only the partner carried this crossing: adopt its edge,
                // sharing the vertex so identities stay consistent.
                self.edges.push(other_edge.clone());
            } else {
                // Both leaves carry the edge: resolve per axis against the
                // partner's vertex.
                let candidate = *other_edge.vertex.vertex.borrow();
                let inside_pos = other_inside_pos(lattice, area, other_edge, other);
                refine_vertex(
                    &self.edges[slot].vertex,
                    candidate.position,
                    candidate.normal,
                    inside_pos,
                    outward,
                );
            }
        }
    }

    /// Append every not-yet-emitted vertex, stamping its buffer index.
    ///
    /// Leaves `marked` set; the caller runs a clear pass once all leaves have
    /// emitted their indices.
    pub fn generate_vertices(&self, out: &mut Vec<Vertex>) {
        for edge in &self.edges {
            let vertex = &edge.vertex;
            if !vertex.marked.get() {
                vertex.index.set(out.len() as u32);
                vertex.marked.set(true);
                out.push(*vertex.vertex.borrow());
            }
        }
    }

    /// Append triangle indices for every mixed-sign sub-cell.
    ///
    /// Requires `generate_vertices` to have stamped the vertex indices.
    pub fn generate_indices(&self, indices: &mut Vec<u32>) {
        let mut edge_map = [[usize::MAX; LEAF_SIZE_3D]; 3];
        for (i, edge) in self.edges.iter().enumerate() {
            edge_map[edge.direction as usize][edge.min_index as usize] = i;
        }

        for x in 0..LEAF_SIZE_1D_INNER {
            for y in 0..LEAF_SIZE_1D_INNER {
                for z in 0..LEAF_SIZE_1D_INNER {
                    let index = x * LEAF_SIZE_2D + y * LEAF_SIZE_1D + z;
                    let corners = self.cube_bit_mask(index);
                    if corners == 0 || corners == 255 {
                        continue;
                    }
                    let row = &TRI_TABLE[corners as usize];
                    let mut i = 0;
                    while i < row.len() && row[i] >= 0 {
                        // Reversed winding: the table faces the material.
                        for &entry in &[row[i], row[i + 2], row[i + 1]] {
                            let de = DIRECTED_EDGES[entry as usize];
                            let at = index
                                + ((de.min_corner >> 2) & 1) as usize * LEAF_SIZE_2D
                                + ((de.min_corner >> 1) & 1) as usize * LEAF_SIZE_1D
                                + (de.min_corner & 1) as usize;
                            let edge = &self.edges[edge_map[de.direction as usize][at]];
                            indices.push(edge.vertex.index.get());
                        }
                        i += 3;
                    }
                }
            }
        }
    }

    /// Reset the emission marks on every referenced vertex.
    pub fn clear_vertex_marks(&self) {
        for edge in &self.edges {
            edge.vertex.marked.set(false);
        }
    }

    /// Eight-corner inside mask of the sub-cell whose min corner is `index`.
    ///
    /// Bit order follows `CORNER_OFFSETS` in the table module.
    fn cube_bit_mask(&self, index: usize) -> u8 {
        let s = &self.signs;
        let mut mask = 0u8;
        mask |= s[index] as u8;
        mask |= (s[index + LEAF_SIZE_2D] as u8) << 1;
        mask |= (s[index + LEAF_SIZE_2D + LEAF_SIZE_1D] as u8) << 2;
        mask |= (s[index + LEAF_SIZE_1D] as u8) << 3;
        mask |= (s[index + 1] as u8) << 4;
        mask |= (s[index + LEAF_SIZE_2D + 1] as u8) << 5;
        mask |= (s[index + LEAF_SIZE_2D + LEAF_SIZE_1D + 1] as u8) << 6;
        mask |= (s[index + LEAF_SIZE_1D + 1] as u8) << 7;
        mask
    }

    /// Ray test against this leaf's surface, building its mesh on demand.
    pub fn ray_intersect_update(&self, ray: &Ray, hit: &mut Option<RayHit>) -> bool {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        self.generate_vertices(&mut vertices);
        self.generate_indices(&mut indices);
        self.clear_vertex_marks();
        if indices.is_empty() {
            return false;
        }
        let bvh = MeshBvh::build(&vertices, &indices, 8);
        let limit = hit.map_or(f32::MAX, |h| h.t);
        if let Some(leaf_hit) = bvh.intersect_ray(ray, limit) {
            *hit = Some(leaf_hit);
            true
        } else {
            false
        }
    }

    /// Occupancy-weighted volume contribution of this leaf.
    pub fn sum_mass(&self, lattice: &Lattice, area: &Area, centroid: &mut Vec3, mass: &mut f32) {
        let cell = lattice.cell_size;
        let cell_volume = cell * cell * cell;
        for x in 0..LEAF_SIZE_1D_INNER {
            for y in 0..LEAF_SIZE_1D_INNER {
                for z in 0..LEAF_SIZE_1D_INNER {
                    let index = x * LEAF_SIZE_2D + y * LEAF_SIZE_1D + z;
                    let inside = self.cube_bit_mask(index).count_ones();
                    if inside == 0 {
                        continue;
                    }
                    let fraction = inside as f32 / 8.0;
                    let center = lattice
                        .real_pos(area.min_pos + IVec3::new(x as i32, y as i32, z as i32))
                        + Vec3::splat(cell * 0.5);
                    let m = cell_volume * fraction;
                    *mass += m;
                    *centroid += center * m;
                }
            }
        }
    }

    /// Approximate heap footprint; marks vertices to count each one once.
    pub fn count_memory(&self) -> usize {
        let mut bytes = std::mem::size_of::<GridLeaf>()
            + self.edges.capacity() * std::mem::size_of::<SurfaceEdge>();
        for edge in &self.edges {
            if !edge.vertex.marked.get() {
                bytes += std::mem::size_of::<SharedSurfaceVertex>();
                edge.vertex.marked.set(true);
            }
        }
        bytes
    }

    /// Number of surface edges (test support).
    #[cfg(test)]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Sign at a local lattice point.
    pub fn sign_at_local(&self, local: IVec3) -> bool {
        let clamped = local.clamp(IVec3::ZERO, IVec3::splat(LEAF_SIZE_1D_INNER as i32));
        self.signs[clamped.x as usize * LEAF_SIZE_2D
            + clamped.y as usize * LEAF_SIZE_1D
            + clamped.z as usize]
    }

    /// Check invariant: an edge record exists exactly where endpoint signs
    /// differ (test support).
    #[cfg(test)]
    pub fn check_sign_coherence(&self) -> bool {
        let mut present = [[false; LEAF_SIZE_3D]; 3];
        for edge in &self.edges {
            present[edge.direction as usize][edge.min_index as usize] = true;
        }
        for x in 0..LEAF_SIZE_1D {
            for y in 0..LEAF_SIZE_1D {
                for z in 0..LEAF_SIZE_1D {
                    let index = x * LEAF_SIZE_2D + y * LEAF_SIZE_1D + z;
                    for direction in 0..3 {
                        if [x, y, z][direction] >= LEAF_SIZE_1D_INNER {
                            continue;
                        }
                        let crossing = self.signs[index] != self.signs[index + stride(direction)];
                        if crossing != present[direction][index] {
                            return false;
                        }
                    }
                }
            }
        }
        true
    }
}

/// Sample the solid at the midpoint of an edge; returns surface position and
/// normal.
fn sample_edge_midpoint(
    lattice: &Lattice,
    area: &Area,
    edge: &SurfaceEdge,
    solid: &dyn ImplicitSolid,
) -> (Vec3, Vec3) {
    let mut mid = lattice.real_pos(area.min_pos + from_index(edge.min_index as usize));
    mid[edge.direction as usize] += lattice.cell_size * 0.5;
    let s = solid.sample(mid);
    (s.closest_surface_pos, s.normal)
}

/// Real position of the edge endpoint that is inside per the partner's signs.
fn other_inside_pos(lattice: &Lattice, area: &Area, edge: &SurfaceEdge, other: &GridLeaf) -> Vec3 {
    let i1 = edge.min_index as usize;
    let i2 = i1 + stride(edge.direction as usize);
    let inside_index = if other.signs[i2] { i2 } else { i1 };
    lattice.real_pos(area.min_pos + from_index(inside_index))
}

/// Per-axis vertex refinement.
///
/// For each axis independently, adopt the candidate coordinate whose offset
/// from the inside endpoint is larger (union pushes outward) or smaller
/// (intersection pulls inward), then renormalize the normal.
fn refine_vertex(
    vertex: &Rc<SharedSurfaceVertex>,
    candidate_pos: Vec3,
    candidate_normal: Vec3,
    inside_pos: Vec3,
    outward: bool,
) {
    let mut v = vertex.vertex.borrow_mut();
    let new_diff = candidate_pos - inside_pos;
    let old_diff = v.position - inside_pos;
    for axis in 0..3 {
        let replace = if outward {
            new_diff[axis] * new_diff[axis] > old_diff[axis] * old_diff[axis]
        } else {
            new_diff[axis] * new_diff[axis] < old_diff[axis] * old_diff[axis]
        };
        if replace {
            v.position[axis] = candidate_pos[axis];
            v.normal[axis] = candidate_normal[axis];
        }
    }
    v.normal = v.normal.normalize_or_zero();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solid::Sphere;

    fn leaf_setup() -> (Lattice, Area) {
        // A leaf spanning [-1, 1]^3 with 8 cells per axis.
        let lattice = Lattice {
            origin: Vec3::splat(-1.0),
            cell_size: 0.25,
        };
        let area = Area::new(IVec3::ZERO, LEAF_EXPO, Vec3::splat(-1.0), 2.0);
        (lattice, area)
    }

    #[test]
    fn test_signs_match_solid() {
        let (lattice, area) = leaf_setup();
        let solid = Sphere::new(Vec3::ZERO, 0.8);
        let mut registry = VertexRegistry::new();
        let leaf = GridLeaf::from_solid(&lattice, &area, &solid, &mut registry);

        // Center lattice point (4,4,4) is the origin, inside.
        assert!(leaf.sign_at_local(IVec3::splat(4)));
        // Corner is outside.
        assert!(!leaf.sign_at_local(IVec3::ZERO));
    }

    #[test]
    fn test_sign_coherence_after_build() {
        let (lattice, area) = leaf_setup();
        let solid = Sphere::new(Vec3::ZERO, 0.8);
        let mut registry = VertexRegistry::new();
        let leaf = GridLeaf::from_solid(&lattice, &area, &solid, &mut registry);
        assert!(leaf.edge_count() > 0);
        assert!(leaf.check_sign_coherence());
    }

    #[test]
    fn test_vertices_on_surface() {
        let (lattice, area) = leaf_setup();
        let solid = Sphere::new(Vec3::ZERO, 0.8);
        let mut registry = VertexRegistry::new();
        let leaf = GridLeaf::from_solid(&lattice, &area, &solid, &mut registry);

        let mut vertices = Vec::new();
        leaf.generate_vertices(&mut vertices);
        leaf.clear_vertex_marks();
        assert!(!vertices.is_empty());
        for v in &vertices {
            assert!((v.position.length() - 0.8).abs() < 1e-4);
            assert!((v.normal.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_emission_references_stamped_vertices() {
        let (lattice, area) = leaf_setup();
        let solid = Sphere::new(Vec3::ZERO, 0.8);
        let mut registry = VertexRegistry::new();
        let leaf = GridLeaf::from_solid(&lattice, &area, &solid, &mut registry);

        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        leaf.generate_vertices(&mut vertices);
        leaf.generate_indices(&mut indices);
        leaf.clear_vertex_marks();

        assert_eq!(indices.len() % 3, 0);
        assert!(!indices.is_empty());
        for &i in &indices {
            assert!((i as usize) < vertices.len());
        }
    }

    #[test]
    fn test_merge_with_self_is_identity() {
        let (lattice, area) = leaf_setup();
        let solid = Sphere::new(Vec3::ZERO, 0.8);
        let mut registry = VertexRegistry::new();
        let mut leaf = GridLeaf::from_solid(&lattice, &area, &solid, &mut registry);
        let signs_before = leaf.signs;
        let edges_before = leaf.edge_count();

        let mut registry2 = VertexRegistry::new();
        leaf.merge_solid(&lattice, &area, &solid, &mut registry2);
        assert_eq!(leaf.signs, signs_before);
        assert_eq!(leaf.edge_count(), edges_before);
        assert!(leaf.check_sign_coherence());
    }

    #[test]
    fn test_intersect_clears_disjoint_solid() {
        let (lattice, area) = leaf_setup();
        let solid = Sphere::new(Vec3::ZERO, 0.8);
        let mut registry = VertexRegistry::new();
        let mut leaf = GridLeaf::from_solid(&lattice, &area, &solid, &mut registry);

        // Intersect with a far-away sphere: everything goes outside.
        let far = Sphere::new(Vec3::splat(50.0), 1.0);
        let mut registry2 = VertexRegistry::new();
        leaf.intersect_solid(&lattice, &area, &far, &mut registry2);
        assert_eq!(leaf.edge_count(), 0);
        assert!(!leaf.sign_at_local(IVec3::splat(4)));
        assert!(leaf.check_sign_coherence());
    }

    #[test]
    fn test_aligned_merge_idempotent() {
        let (lattice, area) = leaf_setup();
        let solid = Sphere::new(Vec3::ZERO, 0.8);
        let mut registry = VertexRegistry::new();
        let mut leaf = GridLeaf::from_solid(&lattice, &area, &solid, &mut registry);
        let copy = leaf.clone();
        let edges_before = leaf.edge_count();

        leaf.merge_leaf(&lattice, &area, &copy);
        assert_eq!(leaf.edge_count(), edges_before);
        assert!(leaf.check_sign_coherence());
    }

    #[test]
    fn test_invert_flips_signs_only() {
        let (lattice, area) = leaf_setup();
        let solid = Sphere::new(Vec3::ZERO, 0.8);
        let mut registry = VertexRegistry::new();
        let mut leaf = GridLeaf::from_solid(&lattice, &area, &solid, &mut registry);
        let edges_before = leaf.edge_count();

        leaf.invert();
        assert!(!leaf.sign_at_local(IVec3::splat(4)));
        assert_eq!(leaf.edge_count(), edges_before);
        assert!(leaf.check_sign_coherence());

        leaf.invert();
        assert!(leaf.sign_at_local(IVec3::splat(4)));
    }

    #[test]
    fn test_ray_hits_leaf_surface() {
        let (lattice, area) = leaf_setup();
        let solid = Sphere::new(Vec3::ZERO, 0.8);
        let mut registry = VertexRegistry::new();
        let leaf = GridLeaf::from_solid(&lattice, &area, &solid, &mut registry);

        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        let mut hit = None;
        assert!(leaf.ray_intersect_update(&ray, &mut hit));
        let hit = hit.unwrap();
        assert!((hit.position.z - 0.8).abs() < lattice.cell_size);
    }
}
