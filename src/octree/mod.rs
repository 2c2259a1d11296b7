//! The sparse octree signed-distance representation.
//!
//! An [`SdfOctree`] samples an implicit solid into a tree of uniformly signed
//! regions and fixed-resolution surface leaves, then supports in-place CSG
//! against further solids or against aligned octrees, indexed-mesh surface
//! extraction and ray queries. All operations are synchronous and
//! single-threaded; surface vertices are reference-counted and shared between
//! neighboring leaves.
//!
//! Author: Moroya Sakamoto

mod area;
mod grid_leaf;
mod node;
mod vertex;

pub use area::Area;
pub use grid_leaf::LEAF_EXPO;

use std::rc::Rc;

use glam::{IVec3, Vec3};
use log::debug;

use crate::error::CsgError;
use crate::geometry::{Aabb, Ray, RayHit, GEOM_EPSILON};
use crate::mesh::{IndexedMesh, MeshBvh};
use crate::solid::{ImplicitSolid, Invert};

use area::Lattice;
use node::Node;
use vertex::VertexRegistry;

/// Extracted-surface BVH backing the conservative surface test.
#[derive(Debug)]
struct TriangleCache {
    bvh: MeshBvh,
}

/// Sparse octree over a signed distance field, with CSG editing.
#[derive(Clone, Debug)]
pub struct SdfOctree {
    root: Node,
    root_area: Area,
    cell_size: f32,
    triangle_cache: Option<Rc<TriangleCache>>,
}

impl SdfOctree {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Sample `solid` into a new octree.
    ///
    /// The root cube is sized to the solid's AABB plus a small epsilon;
    /// `max_depth` is the root's size exponent, so the cell size is
    /// `longest AABB side / 2^max_depth`.
    pub fn sample_solid(
        solid: &mut dyn ImplicitSolid,
        max_depth: u32,
    ) -> Result<SdfOctree, CsgError> {
        let mut bounds = solid.aabb();
        bounds.add_epsilon(GEOM_EPSILON);
        Self::sample_solid_in(solid, &bounds, max_depth)
    }

    /// Sample `solid` into a new octree over an explicit root box.
    ///
    /// The root cube keeps `bounds.min` and takes the longest side of
    /// `bounds`; size the box generously enough to cover all future edits,
    /// since the tree never grows.
    pub fn sample_solid_in(
        solid: &mut dyn ImplicitSolid,
        bounds: &Aabb,
        max_depth: u32,
    ) -> Result<SdfOctree, CsgError> {
        if max_depth < LEAF_EXPO {
            return Err(CsgError::DepthTooShallow(max_depth));
        }
        let size = bounds.size();
        if !size.is_finite() || size.min_element() <= 0.0 {
            return Err(CsgError::DegenerateBounds);
        }

        let cube_size = size.max_element();
        let cell_size = cube_size / (1u32 << max_depth) as f32;
        solid.prepare_sampling(bounds, cell_size);

        let root_area = Area::new(IVec3::ZERO, max_depth, bounds.min, cube_size);
        let lattice = Lattice {
            origin: bounds.min,
            cell_size,
        };
        let mut registry = VertexRegistry::new();
        let root = Node::build(&lattice, &root_area, solid, &mut registry);

        let octree = SdfOctree {
            root,
            root_area,
            cell_size,
            triangle_cache: None,
        };
        debug!(
            "sampled octree: depth={} cell_size={} nodes={}",
            max_depth,
            cell_size,
            octree.node_count()
        );
        Ok(octree)
    }

    #[inline]
    fn lattice(&self) -> Lattice {
        Lattice {
            origin: self.root_area.min_real,
            cell_size: self.cell_size,
        }
    }

    fn take_root(&mut self) -> Node {
        self.triangle_cache = None;
        std::mem::replace(&mut self.root, Node::Empty { inside: false })
    }

    // ------------------------------------------------------------------
    // CSG against implicit solids
    // ------------------------------------------------------------------

    /// Union with an implicit solid, rewriting the tree in place.
    pub fn merge(&mut self, solid: &mut dyn ImplicitSolid) {
        solid.prepare_sampling(&self.root_area.to_aabb(), self.cell_size);
        let mut registry = VertexRegistry::new();
        let root = self.take_root();
        self.root = root.merge_solid(&self.lattice(), &self.root_area, solid, &mut registry);
        debug!("merge: nodes={}", self.node_count());
    }

    /// Intersection with an implicit solid, rewriting the tree in place.
    pub fn intersect(&mut self, solid: &mut dyn ImplicitSolid) {
        solid.prepare_sampling(&self.root_area.to_aabb(), self.cell_size);
        let mut registry = VertexRegistry::new();
        let root = self.take_root();
        self.root = root.intersect_solid(&self.lattice(), &self.root_area, solid, &mut registry);
        debug!("intersect: nodes={}", self.node_count());
    }

    /// Subtraction of an implicit solid: intersection with its inversion.
    pub fn subtract(&mut self, solid: &mut dyn ImplicitSolid) {
        solid.prepare_sampling(&self.root_area.to_aabb(), self.cell_size);
        let inverted = Invert(solid);
        let mut registry = VertexRegistry::new();
        let root = self.take_root();
        self.root = root.intersect_solid(&self.lattice(), &self.root_area, &inverted, &mut registry);
        debug!("subtract: nodes={}", self.node_count());
    }

    // ------------------------------------------------------------------
    // CSG against aligned octrees
    // ------------------------------------------------------------------

    fn check_aligned(&self, other: &SdfOctree) -> Result<(), CsgError> {
        if self.root_area != other.root_area || self.cell_size != other.cell_size {
            return Err(CsgError::MisalignedTrees);
        }
        Ok(())
    }

    /// Union with an octree sharing this tree's root area and cell size.
    pub fn merge_aligned(&mut self, other: &SdfOctree) -> Result<(), CsgError> {
        self.check_aligned(other)?;
        let root = self.take_root();
        self.root = root.merge_aligned(&other.root, &self.lattice(), &self.root_area);
        Ok(())
    }

    /// Intersection with an aligned octree.
    pub fn intersect_aligned(&mut self, other: &SdfOctree) -> Result<(), CsgError> {
        self.check_aligned(other)?;
        let root = self.take_root();
        self.root = root.intersect_aligned(&other.root, &self.lattice(), &self.root_area);
        Ok(())
    }

    /// Subtraction of an aligned octree.
    pub fn subtract_aligned(&mut self, other: &SdfOctree) -> Result<(), CsgError> {
        self.check_aligned(other)?;
        let root = self.take_root();
        self.root = root.subtract_aligned(&other.root, &self.lattice(), &self.root_area);
        Ok(())
    }

    /// Flip inside and outside everywhere.
    pub fn invert(&mut self) {
        self.triangle_cache = None;
        self.root.invert();
    }

    // ------------------------------------------------------------------
    // Extraction and queries
    // ------------------------------------------------------------------

    /// Extract the current surface as a shared-vertex indexed mesh.
    ///
    /// Two passes over the surface leaves — vertices first, then triangle
    /// indices — followed by a pass clearing the emission marks. Vertex
    /// normals are recomputed from incident faces, weighted by area.
    pub fn generate_mesh(&self) -> IndexedMesh {
        let mut mesh = IndexedMesh::new();
        self.root
            .for_each_surface_leaf(&self.root_area, &mut |leaf, _| {
                leaf.generate_vertices(&mut mesh.vertices)
            });
        self.root
            .for_each_surface_leaf(&self.root_area, &mut |leaf, _| {
                leaf.generate_indices(&mut mesh.indices)
            });
        self.root
            .for_each_surface_leaf(&self.root_area, &mut |leaf, _| leaf.clear_vertex_marks());
        mesh.recompute_normals();
        debug!(
            "generated mesh: {} vertices, {} triangles",
            mesh.vertex_count(),
            mesh.triangle_count()
        );
        mesh
    }

    /// Closest intersection of `ray` with the current surface.
    ///
    /// Nodes whose boxes the ray misses within `[0, t_best]` are pruned;
    /// surface leaves build their triangle BVH on demand.
    pub fn ray_intersect_closest(&self, ray: &Ray) -> Option<RayHit> {
        let mut hit = None;
        self.root
            .ray_intersect_update(&self.root_area, ray, &mut hit);
        hit
    }

    /// Inside test at a point; anywhere outside the root box is outside.
    pub fn sign_at(&self, point: Vec3) -> bool {
        if !self.root_area.contains_point(point) {
            return false;
        }
        self.root.sign_at(&self.lattice(), &self.root_area, point)
    }

    /// Build the cached surface BVH behind [`SdfOctree::intersects_surface`].
    pub fn generate_triangle_cache(&mut self) {
        let mesh = self.generate_mesh();
        let bvh = MeshBvh::build(&mesh.vertices, &mesh.indices, 8);
        debug!("triangle cache: {} triangles", bvh.triangle_count());
        self.triangle_cache = Some(Rc::new(TriangleCache { bvh }));
    }

    /// Conservative surface test against the cached extracted surface.
    ///
    /// Answers `true` until [`SdfOctree::generate_triangle_cache`] has run;
    /// CSG edits drop the cache.
    pub fn intersects_surface(&self, aabb: &Aabb) -> bool {
        match &self.triangle_cache {
            Some(cache) => cache.bvh.intersects_aabb(aabb),
            None => true,
        }
    }

    // ------------------------------------------------------------------
    // Accounting
    // ------------------------------------------------------------------

    /// Bounds of the root cube.
    pub fn aabb(&self) -> Aabb {
        self.root_area.to_aabb()
    }

    /// The root area descriptor.
    pub fn root_area(&self) -> Area {
        self.root_area
    }

    /// Edge length of one lattice cell.
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        self.root.count_nodes()
    }

    /// Number of surface leaves.
    pub fn leaf_count(&self) -> usize {
        let mut count = 0;
        self.root
            .for_each_surface_leaf(&self.root_area, &mut |_, _| count += 1);
        count
    }

    /// Approximate heap footprint in bytes.
    pub fn memory_bytes(&self) -> usize {
        let bytes = self.root.count_memory();
        self.root
            .for_each_surface_leaf(&self.root_area, &mut |leaf, _| leaf.clear_vertex_marks());
        bytes
    }

    /// Center of mass and total mass, with mass proportional to volume.
    ///
    /// Empty-inside regions contribute their full volume at their center;
    /// surface leaves contribute per sub-cell, weighted by how many of the
    /// cell's corners are inside.
    pub fn center_of_mass(&self) -> (Vec3, f32) {
        let mut centroid = Vec3::ZERO;
        let mut mass = 0.0;
        self.root
            .sum_mass(&self.lattice(), &self.root_area, &mut centroid, &mut mass);
        if mass > 0.0 {
            centroid /= mass;
        }
        (centroid, mass)
    }
}
