//! Benchmarks for octree sampling, CSG and extraction
//!
//! Author: Moroya Sakamoto

use alice_csg::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn sphere_tree(depth: u32) -> SdfOctree {
    let mut sphere = Sphere::new(Vec3::ZERO, 1.0);
    let bounds = Aabb::new(Vec3::splat(-1.1), Vec3::splat(1.1));
    SdfOctree::sample_solid_in(&mut sphere, &bounds, depth).unwrap()
}

fn bench_sampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("sampling");
    for depth in [4u32, 5, 6] {
        group.bench_function(format!("sphere_depth_{}", depth), |b| {
            b.iter(|| black_box(sphere_tree(depth)))
        });
    }
    group.finish();
}

fn bench_csg(c: &mut Criterion) {
    let mut group = c.benchmark_group("csg");

    group.bench_function("subtract_sphere", |b| {
        let tree = sphere_tree(5);
        b.iter(|| {
            let mut edited = tree.clone();
            edited.subtract(&mut Sphere::new(Vec3::new(0.8, 0.0, 0.0), 0.5));
            black_box(edited)
        })
    });

    group.bench_function("merge_aligned", |b| {
        let tree = sphere_tree(5);
        let mut other = tree.clone();
        other.invert();
        b.iter(|| {
            let mut edited = tree.clone();
            edited.merge_aligned(black_box(&other)).unwrap();
            black_box(edited)
        })
    });

    group.finish();
}

fn bench_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("extraction");

    group.bench_function("generate_mesh_depth_5", |b| {
        let tree = sphere_tree(5);
        b.iter(|| black_box(tree.generate_mesh()))
    });

    group.bench_function("ray_intersect_closest", |b| {
        let tree = sphere_tree(5);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 2.0), Vec3::new(0.0, 0.0, -1.0));
        b.iter(|| black_box(tree.ray_intersect_closest(black_box(&ray))))
    });

    group.finish();
}

criterion_group!(benches, bench_sampling, bench_csg, bench_extraction);
criterion_main!(benches);
