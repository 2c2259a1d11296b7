//! Shared surface vertices and the registry that unifies them across leaves.
//!
//! Author: Moroya Sakamoto

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use glam::IVec3;

use crate::mesh::Vertex;

/// A surface vertex placed on a zero-crossing edge.
///
/// Owned by the [`SurfaceEdge`]s that reference it; the `Rc` strong count is
/// the reference count, and the vertex is released when the last edge drops.
/// `index` and `marked` are transient scratch used during emission and memory
/// accounting; a clear pass resets `marked` afterwards.
#[derive(Debug)]
pub(crate) struct SharedSurfaceVertex {
    /// Position and normal on the surface; CSG refinement mutates it in place.
    pub vertex: RefCell<Vertex>,
    /// True iff the vertex sits on the outer face of its owning leaf, so a
    /// neighboring leaf may reference it through the registry.
    pub shared: bool,
    /// Index in the emitted vertex buffer, valid while `marked` is set.
    pub index: Cell<u32>,
    /// Emission/accounting mark.
    pub marked: Cell<bool>,
}

impl SharedSurfaceVertex {
    /// A leaf-private vertex.
    pub fn private(vertex: Vertex) -> Rc<Self> {
        Rc::new(SharedSurfaceVertex {
            vertex: RefCell::new(vertex),
            shared: false,
            index: Cell::new(0),
            marked: Cell::new(false),
        })
    }

    /// A boundary vertex that neighbors may share.
    pub fn shared(vertex: Vertex) -> Rc<Self> {
        Rc::new(SharedSurfaceVertex {
            vertex: RefCell::new(vertex),
            shared: true,
            index: Cell::new(0),
            marked: Cell::new(false),
        })
    }
}

/// One sub-cell edge crossing the zero contour.
///
/// Stores the linear index of its lower endpoint inside the leaf, the axis it
/// runs along (0 = X, 1 = Y, 2 = Z) and a strong reference to its vertex.
/// Cloning shares the vertex.
#[derive(Clone, Debug)]
pub(crate) struct SurfaceEdge {
    pub min_index: u16,
    pub direction: u8,
    pub vertex: Rc<SharedSurfaceVertex>,
}

/// Spatial hash unifying boundary vertices between neighboring leaves.
///
/// Keyed by the global integer position of the edge's lower endpoint, one map
/// per edge direction. Scoped to a single sampling or CSG operation and
/// discarded afterwards.
pub(crate) struct VertexRegistry {
    maps: [HashMap<IVec3, Rc<SharedSurfaceVertex>>; 3],
}

impl VertexRegistry {
    pub fn new() -> Self {
        VertexRegistry {
            maps: [HashMap::new(), HashMap::new(), HashMap::new()],
        }
    }

    /// Look up the vertex for a boundary edge, creating it on first sight.
    ///
    /// On a hit the existing vertex is reused, which is what makes two leaves
    /// agree on a single vertex identity along their shared face.
    pub fn get_or_create(
        &mut self,
        direction: usize,
        global_pos: IVec3,
        make: impl FnOnce() -> Vertex,
    ) -> Rc<SharedSurfaceVertex> {
        self.maps[direction]
            .entry(global_pos)
            .or_insert_with(|| SharedSurfaceVertex::shared(make()))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_registry_deduplicates() {
        let mut registry = VertexRegistry::new();
        let pos = IVec3::new(8, 3, 5);
        let a = registry.get_or_create(0, pos, || Vertex::new(Vec3::ONE, Vec3::Y));
        let b = registry.get_or_create(0, pos, || panic!("must not rebuild"));
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(Rc::strong_count(&a), 3); // registry + two handles
    }

    #[test]
    fn test_registry_split_by_direction() {
        let mut registry = VertexRegistry::new();
        let pos = IVec3::new(8, 3, 5);
        let a = registry.get_or_create(0, pos, || Vertex::new(Vec3::X, Vec3::Y));
        let b = registry.get_or_create(1, pos, || Vertex::new(Vec3::Y, Vec3::Z));
        assert!(!Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_edge_clone_shares_vertex() {
        let edge = SurfaceEdge {
            min_index: 42,
            direction: 1,
            vertex: SharedSurfaceVertex::private(Vertex::new(Vec3::ZERO, Vec3::Y)),
        };
        let copy = edge.clone();
        assert!(Rc::ptr_eq(&edge.vertex, &copy.vertex));
        assert_eq!(Rc::strong_count(&edge.vertex), 2);
        drop(copy);
        assert_eq!(Rc::strong_count(&edge.vertex), 1);
    }
}
