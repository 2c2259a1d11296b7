//! Error types for octree construction and CSG.

use thiserror::Error;

/// Errors reported at operation boundaries.
///
/// Per-node predicate routines never fail; everything that can go wrong is
/// caught when an operation starts.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsgError {
    /// Aligned CSG was invoked on trees whose root areas or cell sizes differ.
    #[error("aligned CSG requires trees with identical root areas and cell sizes")]
    MisalignedTrees,

    /// The solid handed to `sample_solid` has an empty or non-finite AABB.
    #[error("solid bounding box is empty or non-finite")]
    DegenerateBounds,

    /// The requested sampling depth cannot hold a single grid leaf.
    #[error("sampling depth {0} is below the grid leaf exponent")]
    DepthTooShallow(u32),
}
