//! Octree nodes.
//!
//! A node is one of three disjoint variants: an inner node owning eight
//! children, a uniformly signed empty region, or a surface-carrying grid
//! leaf. Recursive operations match on the variant; CSG rewriters consume the
//! node and return its replacement, so subtree swaps are plain moves.
//!
//! Author: Moroya Sakamoto

use glam::Vec3;

use crate::geometry::{Ray, RayHit};
use crate::octree::area::{Area, Lattice};
use crate::octree::grid_leaf::{GridLeaf, LEAF_EXPO};
use crate::octree::vertex::VertexRegistry;
use crate::solid::ImplicitSolid;

/// One octree node.
#[derive(Clone, Debug)]
pub(crate) enum Node {
    /// Eight owned children, indexed by `(x_max << 2) | (y_max << 1) | z_max`.
    Inner { children: Box<[Node; 8]> },
    /// A uniformly signed region.
    Empty { inside: bool },
    /// A surface leaf.
    Grid(Box<GridLeaf>),
}

impl Node {
    /// Top-down construction from an implicit solid.
    pub fn build(
        lattice: &Lattice,
        area: &Area,
        solid: &dyn ImplicitSolid,
        registry: &mut VertexRegistry,
    ) -> Node {
        if !solid.cube_needs_subdivision(area) {
            return Node::Empty {
                inside: solid.sign(area.center()),
            };
        }
        if area.size_expo <= LEAF_EXPO {
            return Node::Grid(Box::new(GridLeaf::from_solid(lattice, area, solid, registry)));
        }
        let sub = area.sub_areas();
        let children = Box::new(std::array::from_fn(|i| {
            Node::build(lattice, &sub[i], solid, registry)
        }));
        Node::Inner { children }
    }

    /// Rewrite this subtree to the union with `solid`.
    pub fn merge_solid(
        self,
        lattice: &Lattice,
        area: &Area,
        solid: &dyn ImplicitSolid,
        registry: &mut VertexRegistry,
    ) -> Node {
        if !solid.cube_needs_subdivision(area) {
            // The solid is uniform here: inside absorbs, outside is identity.
            return if solid.sign(area.center()) {
                Node::build(lattice, area, solid, registry)
            } else {
                self
            };
        }
        match self {
            Node::Inner { mut children } => {
                let sub = area.sub_areas();
                for i in 0..8 {
                    let child = std::mem::replace(&mut children[i], Node::Empty { inside: false });
                    children[i] = child.merge_solid(lattice, &sub[i], solid, registry);
                }
                Node::Inner { children }
            }
            Node::Empty { inside: true } => Node::Empty { inside: true },
            Node::Empty { inside: false } => Node::build(lattice, area, solid, registry),
            Node::Grid(mut leaf) => {
                leaf.merge_solid(lattice, area, solid, registry);
                Node::Grid(leaf)
            }
        }
    }

    /// Rewrite this subtree to the intersection with `solid`.
    pub fn intersect_solid(
        self,
        lattice: &Lattice,
        area: &Area,
        solid: &dyn ImplicitSolid,
        registry: &mut VertexRegistry,
    ) -> Node {
        if !solid.cube_needs_subdivision(area) {
            // Uniform solid: inside is identity, outside clears the region.
            return if solid.sign(area.center()) {
                self
            } else {
                Node::Empty { inside: false }
            };
        }
        match self {
            Node::Inner { mut children } => {
                let sub = area.sub_areas();
                for i in 0..8 {
                    let child = std::mem::replace(&mut children[i], Node::Empty { inside: false });
                    children[i] = child.intersect_solid(lattice, &sub[i], solid, registry);
                }
                Node::Inner { children }
            }
            Node::Empty { inside: false } => Node::Empty { inside: false },
            Node::Empty { inside: true } => Node::build(lattice, area, solid, registry),
            Node::Grid(mut leaf) => {
                leaf.intersect_solid(lattice, area, solid, registry);
                Node::Grid(leaf)
            }
        }
    }

    /// Union with an aligned tree's node over the same area.
    pub fn merge_aligned(self, other: &Node, lattice: &Lattice, area: &Area) -> Node {
        match (self, other) {
            (Node::Inner { mut children }, Node::Inner { children: other_children }) => {
                let sub = area.sub_areas();
                for i in 0..8 {
                    let child = std::mem::replace(&mut children[i], Node::Empty { inside: false });
                    children[i] = child.merge_aligned(&other_children[i], lattice, &sub[i]);
                }
                Node::Inner { children }
            }
            (node, Node::Empty { inside }) => {
                if *inside {
                    Node::Empty { inside: true }
                } else {
                    node
                }
            }
            (Node::Empty { inside }, other) => {
                if inside {
                    Node::Empty { inside: true }
                } else {
                    other.clone()
                }
            }
            (Node::Grid(mut leaf), Node::Grid(other_leaf)) => {
                leaf.merge_leaf(lattice, area, other_leaf);
                Node::Grid(leaf)
            }
            _ => unreachable!("aligned trees are structurally congruent"),
        }
    }

    /// Intersection with an aligned tree's node over the same area.
    pub fn intersect_aligned(self, other: &Node, lattice: &Lattice, area: &Area) -> Node {
        match (self, other) {
            (Node::Inner { mut children }, Node::Inner { children: other_children }) => {
                let sub = area.sub_areas();
                for i in 0..8 {
                    let child = std::mem::replace(&mut children[i], Node::Empty { inside: false });
                    children[i] = child.intersect_aligned(&other_children[i], lattice, &sub[i]);
                }
                Node::Inner { children }
            }
            (node, Node::Empty { inside }) => {
                if *inside {
                    node
                } else {
                    Node::Empty { inside: false }
                }
            }
            (Node::Empty { inside }, other) => {
                if !inside {
                    Node::Empty { inside: false }
                } else {
                    other.clone()
                }
            }
            (Node::Grid(mut leaf), Node::Grid(other_leaf)) => {
                leaf.intersect_leaf(lattice, area, other_leaf);
                Node::Grid(leaf)
            }
            _ => unreachable!("aligned trees are structurally congruent"),
        }
    }

    /// Subtraction of an aligned tree: intersection with its inversion.
    pub fn subtract_aligned(self, other: &Node, lattice: &Lattice, area: &Area) -> Node {
        match (self, other) {
            (Node::Inner { mut children }, Node::Inner { children: other_children }) => {
                let sub = area.sub_areas();
                for i in 0..8 {
                    let child = std::mem::replace(&mut children[i], Node::Empty { inside: false });
                    children[i] = child.subtract_aligned(&other_children[i], lattice, &sub[i]);
                }
                Node::Inner { children }
            }
            (node, Node::Empty { inside }) => {
                if !*inside {
                    node
                } else {
                    Node::Empty { inside: false }
                }
            }
            (Node::Empty { inside }, other) => {
                if !inside {
                    Node::Empty { inside: false }
                } else {
                    let mut inverted = other.clone();
                    inverted.invert();
                    inverted
                }
            }
            (Node::Grid(mut leaf), Node::Grid(other_leaf)) => {
                let mut inverted = other_leaf.as_ref().clone();
                inverted.invert();
                leaf.intersect_leaf(lattice, area, &inverted);
                Node::Grid(leaf)
            }
            _ => unreachable!("aligned trees are structurally congruent"),
        }
    }

    /// Flip inside and outside for the whole subtree.
    pub fn invert(&mut self) {
        match self {
            Node::Inner { children } => {
                for child in children.iter_mut() {
                    child.invert();
                }
            }
            Node::Empty { inside } => *inside = !*inside,
            Node::Grid(leaf) => leaf.invert(),
        }
    }

    /// Visit every surface leaf with its area.
    pub fn for_each_surface_leaf<'a>(
        &'a self,
        area: &Area,
        f: &mut dyn FnMut(&'a GridLeaf, &Area),
    ) {
        match self {
            Node::Inner { children } => {
                let sub = area.sub_areas();
                for (child, child_area) in children.iter().zip(&sub) {
                    child.for_each_surface_leaf(child_area, f);
                }
            }
            Node::Empty { .. } => {}
            Node::Grid(leaf) => f(leaf, area),
        }
    }

    /// Total node count, all variants included.
    pub fn count_nodes(&self) -> usize {
        match self {
            Node::Inner { children } => 1 + children.iter().map(Node::count_nodes).sum::<usize>(),
            _ => 1,
        }
    }

    /// Approximate heap footprint of the subtree.
    ///
    /// Leaves mark their vertices; the caller must run a clear pass.
    pub fn count_memory(&self) -> usize {
        match self {
            Node::Inner { children } => {
                std::mem::size_of::<Node>()
                    + children.iter().map(Node::count_memory).sum::<usize>()
            }
            Node::Empty { .. } => std::mem::size_of::<Node>(),
            Node::Grid(leaf) => std::mem::size_of::<Node>() + leaf.count_memory(),
        }
    }

    /// Ray descent with `[0, t_best]` pruning; updates `hit` in place.
    pub fn ray_intersect_update(
        &self,
        area: &Area,
        ray: &Ray,
        hit: &mut Option<RayHit>,
    ) -> bool {
        let t_best = hit.map_or(f32::MAX, |h| h.t);
        if !ray.intersects_aabb(&area.to_aabb(), 0.0, t_best) {
            return false;
        }
        match self {
            Node::Empty { .. } => false,
            Node::Inner { children } => {
                let sub = area.sub_areas();
                let mut found = false;
                for (child, child_area) in children.iter().zip(&sub) {
                    if child.ray_intersect_update(child_area, ray, hit) {
                        found = true;
                    }
                }
                found
            }
            Node::Grid(leaf) => leaf.ray_intersect_update(ray, hit),
        }
    }

    /// Accumulate occupancy-weighted volume and centroid.
    pub fn sum_mass(&self, lattice: &Lattice, area: &Area, centroid: &mut Vec3, mass: &mut f32) {
        match self {
            Node::Inner { children } => {
                let sub = area.sub_areas();
                for (child, child_area) in children.iter().zip(&sub) {
                    child.sum_mass(lattice, child_area, centroid, mass);
                }
            }
            Node::Empty { inside: true } => {
                let volume = area.real_size * area.real_size * area.real_size;
                *mass += volume;
                *centroid += area.center() * volume;
            }
            Node::Empty { inside: false } => {}
            Node::Grid(leaf) => leaf.sum_mass(lattice, area, centroid, mass),
        }
    }

    /// Sign at a point inside this node's area.
    pub fn sign_at(&self, lattice: &Lattice, area: &Area, point: Vec3) -> bool {
        match self {
            Node::Empty { inside } => *inside,
            Node::Inner { children } => {
                let sub = area.sub_areas();
                for (child, child_area) in children.iter().zip(&sub) {
                    if child_area.contains_point(point) {
                        return child.sign_at(lattice, child_area, point);
                    }
                }
                // Points on the shared max faces land here; clamp to the last
                // octant.
                children[7].sign_at(lattice, &sub[7], point)
            }
            Node::Grid(leaf) => {
                let local = ((point - area.min_real) / lattice.cell_size + Vec3::splat(0.5))
                    .floor()
                    .as_ivec3();
                leaf.sign_at_local(local)
            }
        }
    }
}
