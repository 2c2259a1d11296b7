//! Integration tests: CSG rewriting
//!
//! Algebraic laws (idempotence, complement, double inversion, De Morgan)
//! plus the union and subtraction scenarios.
//!
//! Author: Moroya Sakamoto

mod common;

use alice_csg::prelude::*;
use common::*;

// ============================================================================
// Laws against implicit solids
// ============================================================================

#[test]
fn merge_with_self_is_idempotent() {
    let reference = unit_sphere_tree(4);
    let mut tree = unit_sphere_tree(4);
    tree.merge(&mut Sphere::new(Vec3::ZERO, 1.0));

    assert_eq!(tree.node_count(), reference.node_count());
    let points = probe_points(12);
    assert_eq!(
        probe_signs(&tree, &points),
        probe_signs(&reference, &points)
    );
    assert_eq!(
        tree.generate_mesh().triangle_count(),
        reference.generate_mesh().triangle_count()
    );
}

#[test]
fn intersect_with_self_is_idempotent() {
    let reference = unit_sphere_tree(4);
    let mut tree = unit_sphere_tree(4);
    tree.intersect(&mut Sphere::new(Vec3::ZERO, 1.0));

    let points = probe_points(12);
    assert_eq!(
        probe_signs(&tree, &points),
        probe_signs(&reference, &points)
    );
}

#[test]
fn subtract_self_empties_the_tree() {
    let mut tree = unit_sphere_tree(4);
    tree.subtract(&mut Sphere::new(Vec3::ZERO, 1.0));

    for &p in &probe_points(12) {
        assert!(!tree.sign_at(p), "point {:?} survived self-subtraction", p);
    }
    assert!(tree.generate_mesh().is_empty());
}

#[test]
fn double_inversion_restores_signs() {
    let reference = unit_sphere_tree(4);
    let mut tree = unit_sphere_tree(4);
    tree.invert();
    tree.invert();

    assert_eq!(tree.node_count(), reference.node_count());
    let points = probe_points(12);
    assert_eq!(
        probe_signs(&tree, &points),
        probe_signs(&reference, &points)
    );
    assert_eq!(
        tree.generate_mesh().triangle_count(),
        reference.generate_mesh().triangle_count()
    );
}

// ============================================================================
// Union scenario: two overlapping spheres
// ============================================================================

#[test]
fn two_sphere_union_scenario() {
    let mut union = Union::new(vec![
        Box::new(Sphere::new(Vec3::new(-0.5, 0.0, 0.0), 0.7)),
        Box::new(Sphere::new(Vec3::new(0.5, 0.0, 0.0), 0.7)),
    ]);
    let tree = SdfOctree::sample_solid(&mut union, 5).unwrap();

    let mesh = tree.generate_mesh();
    assert_eq!(
        connected_components(&mesh),
        1,
        "overlapping spheres should fuse into one component"
    );

    // Ray down the Z axis through the neck: surface at z = sqrt(0.49 - 0.25)
    let ray = Ray::new(Vec3::new(0.0, 0.0, 2.0), Vec3::new(0.0, 0.0, -1.0));
    let hit = tree.ray_intersect_closest(&ray).expect("ray should hit");
    assert!(
        (hit.position.z - 0.49).abs() < 2.0 * tree.cell_size(),
        "hit at z = {}",
        hit.position.z
    );
}

#[test]
fn incremental_merge_matches_sampled_union() {
    // Sample sphere A, merge sphere B into it; signs must match the union.
    let bounds = Aabb::new(Vec3::splat(-1.3), Vec3::splat(1.3));
    let mut a = Sphere::new(Vec3::new(-0.5, 0.0, 0.0), 0.7);
    let mut tree = SdfOctree::sample_solid_in(&mut a, &bounds, 5).unwrap();
    tree.merge(&mut Sphere::new(Vec3::new(0.5, 0.0, 0.0), 0.7));

    let mut union = Union::new(vec![
        Box::new(Sphere::new(Vec3::new(-0.5, 0.0, 0.0), 0.7)),
        Box::new(Sphere::new(Vec3::new(0.5, 0.0, 0.0), 0.7)),
    ]);
    let reference = SdfOctree::sample_solid_in(&mut union, &bounds, 5).unwrap();

    let points = probe_points(12);
    assert_eq!(
        probe_signs(&tree, &points),
        probe_signs(&reference, &points)
    );
}

// ============================================================================
// Subtraction scenario: cube minus sphere
// ============================================================================

#[test]
fn cube_minus_sphere_scenario() {
    let mut cube = Box3d::from_center_half_extents(Vec3::ZERO, Vec3::ONE);
    let mut tree = SdfOctree::sample_solid(&mut cube, 5).unwrap();
    tree.subtract(&mut Sphere::new(Vec3::ZERO, 0.5));

    assert!(!tree.sign_at(Vec3::ZERO), "pocket center should be carved");
    assert!(tree.sign_at(Vec3::splat(0.9)), "corner should survive");
    assert!(tree.sign_at(Vec3::new(0.8, 0.0, 0.0)));

    let mesh = tree.generate_mesh();
    assert!(is_watertight(&mesh), "carved cube should stay watertight");
    // Outer shell plus the interior pocket
    assert_eq!(connected_components(&mesh), 2);
}

// ============================================================================
// Aligned CSG
// ============================================================================

#[test]
fn aligned_intersect_of_boxes() {
    let mut a = aligned_box_tree(Vec3::splat(-1.0), Vec3::splat(0.5), 4);
    let b = aligned_box_tree(Vec3::splat(-0.5), Vec3::splat(1.0), 4);
    a.intersect_aligned(&b).unwrap();

    // Result is the box [-0.5, 0.5]^3 within one cell (~0.13)
    assert!(a.sign_at(Vec3::ZERO));
    assert!(a.sign_at(Vec3::splat(0.3)));
    assert!(a.sign_at(Vec3::splat(-0.3)));
    assert!(!a.sign_at(Vec3::new(0.7, 0.0, 0.0)));
    assert!(!a.sign_at(Vec3::new(-0.7, 0.0, 0.0)));
    assert!(!a.sign_at(Vec3::splat(0.7)));
}

#[test]
fn aligned_merge_is_idempotent() {
    let reference = unit_sphere_tree(4);
    let mut tree = unit_sphere_tree(4);
    let copy = tree.clone();
    tree.merge_aligned(&copy).unwrap();

    let points = probe_points(12);
    assert_eq!(
        probe_signs(&tree, &points),
        probe_signs(&reference, &points)
    );
    assert_eq!(
        tree.generate_mesh().triangle_count(),
        reference.generate_mesh().triangle_count()
    );
}

#[test]
fn aligned_subtract_self_empties_the_tree() {
    let mut tree = unit_sphere_tree(4);
    let copy = tree.clone();
    tree.subtract_aligned(&copy).unwrap();

    for &p in &probe_points(12) {
        assert!(!tree.sign_at(p));
    }
    assert!(tree.generate_mesh().is_empty());
}

#[test]
fn aligned_de_morgan() {
    // invert(merge(A, B)) == intersect(invert(A), invert(B)) on signs
    let depth = 4;
    let a = aligned_box_tree(Vec3::splat(-1.0), Vec3::splat(0.4), depth);
    let b = aligned_box_tree(Vec3::new(-0.4, -0.9, -0.9), Vec3::new(0.9, 0.9, 0.9), depth);

    let mut lhs = a.clone();
    lhs.merge_aligned(&b).unwrap();
    lhs.invert();

    let mut rhs = a.clone();
    rhs.invert();
    let mut b_inv = b.clone();
    b_inv.invert();
    rhs.intersect_aligned(&b_inv).unwrap();

    let points = probe_points(12);
    assert_eq!(probe_signs(&lhs, &points), probe_signs(&rhs, &points));
}

#[test]
fn aligned_ops_reject_mismatched_roots() {
    let mut a = unit_sphere_tree(4);
    let b = unit_sphere_tree(5);
    assert_eq!(a.merge_aligned(&b).unwrap_err(), CsgError::MisalignedTrees);
    assert_eq!(
        a.intersect_aligned(&b).unwrap_err(),
        CsgError::MisalignedTrees
    );
    assert_eq!(
        a.subtract_aligned(&b).unwrap_err(),
        CsgError::MisalignedTrees
    );

    let mut c = aligned_box_tree(Vec3::splat(-0.5), Vec3::splat(0.5), 4);
    assert_eq!(c.merge_aligned(&a).unwrap_err(), CsgError::MisalignedTrees);
}

#[test]
fn aligned_merge_of_disjoint_boxes_keeps_both() {
    let mut a = aligned_box_tree(Vec3::new(-0.9, -0.3, -0.3), Vec3::new(-0.2, 0.3, 0.3), 4);
    let b = aligned_box_tree(Vec3::new(0.2, -0.3, -0.3), Vec3::new(0.9, 0.3, 0.3), 4);
    a.merge_aligned(&b).unwrap();

    assert!(a.sign_at(Vec3::new(-0.5, 0.0, 0.0)));
    assert!(a.sign_at(Vec3::new(0.5, 0.0, 0.0)));
    assert!(!a.sign_at(Vec3::ZERO));

    let mesh = a.generate_mesh();
    assert_eq!(connected_components(&mesh), 2);
    assert!(is_watertight(&mesh));
}
