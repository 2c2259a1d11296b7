//! Common test helpers for ALICE-CSG integration tests
//!
//! Author: Moroya Sakamoto

use std::collections::HashMap;

use alice_csg::prelude::*;

// ============================================================================
// Standard test trees
// ============================================================================

/// Unit sphere at the origin, root box [-1.1, 1.1]^3.
pub fn unit_sphere_tree(depth: u32) -> SdfOctree {
    let mut sphere = Sphere::new(Vec3::ZERO, 1.0);
    let bounds = Aabb::new(Vec3::splat(-1.1), Vec3::splat(1.1));
    SdfOctree::sample_solid_in(&mut sphere, &bounds, depth).unwrap()
}

/// Shared root box for aligned-CSG tests.
pub fn aligned_bounds() -> Aabb {
    Aabb::new(Vec3::splat(-1.05), Vec3::splat(1.05))
}

/// Box solid sampled over the shared aligned root.
pub fn aligned_box_tree(min: Vec3, max: Vec3, depth: u32) -> SdfOctree {
    let mut solid = Box3d::new(Aabb::new(min, max));
    SdfOctree::sample_solid_in(&mut solid, &aligned_bounds(), depth).unwrap()
}

// ============================================================================
// Probe grids
// ============================================================================

/// A grid of probe points in [-1, 1]^3, off any lattice plane.
pub fn probe_points(resolution: usize) -> Vec<Vec3> {
    let mut points = Vec::with_capacity(resolution * resolution * resolution);
    let step = 2.0 / resolution as f32;
    for i in 0..resolution {
        for j in 0..resolution {
            for k in 0..resolution {
                points.push(Vec3::new(
                    -1.0 + (i as f32 + 0.437) * step,
                    -1.0 + (j as f32 + 0.437) * step,
                    -1.0 + (k as f32 + 0.437) * step,
                ));
            }
        }
    }
    points
}

/// Signs of a tree over a probe grid.
pub fn probe_signs(tree: &SdfOctree, points: &[Vec3]) -> Vec<bool> {
    points.iter().map(|&p| tree.sign_at(p)).collect()
}

// ============================================================================
// Mesh checkers
// ============================================================================

/// Every edge of a closed mesh must be shared by exactly two triangles.
pub fn is_watertight(mesh: &IndexedMesh) -> bool {
    let mut edge_uses: HashMap<(u32, u32), u32> = HashMap::new();
    for tri in mesh.indices.chunks(3) {
        for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
            let key = (a.min(b), a.max(b));
            *edge_uses.entry(key).or_insert(0) += 1;
        }
    }
    !edge_uses.is_empty() && edge_uses.values().all(|&uses| uses == 2)
}

/// Number of connected components of the triangle graph.
pub fn connected_components(mesh: &IndexedMesh) -> usize {
    if mesh.vertices.is_empty() {
        return 0;
    }
    let mut parent: Vec<u32> = (0..mesh.vertices.len() as u32).collect();

    fn find(parent: &mut [u32], mut x: u32) -> u32 {
        while parent[x as usize] != x {
            parent[x as usize] = parent[parent[x as usize] as usize];
            x = parent[x as usize];
        }
        x
    }

    let mut used = vec![false; mesh.vertices.len()];
    for tri in mesh.indices.chunks(3) {
        for &i in tri {
            used[i as usize] = true;
        }
        let a = find(&mut parent, tri[0]);
        let b = find(&mut parent, tri[1]);
        parent[a as usize] = b;
        let b = find(&mut parent, tri[1]);
        let c = find(&mut parent, tri[2]);
        parent[b as usize] = c;
    }

    let mut roots = std::collections::HashSet::new();
    for i in 0..mesh.vertices.len() as u32 {
        if used[i as usize] {
            roots.insert(find(&mut parent, i));
        }
    }
    roots.len()
}
