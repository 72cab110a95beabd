//! Benchmarks for fundus extraction.

use criterion::{criterion_group, criterion_main, Criterion};
use fundi::algo::geodesic::{dijkstra, DijkstraOptions};
use fundi::prelude::*;
use nalgebra::Point3;

fn create_grid_mesh(n: usize) -> Mesh {
    let mut vertices = Vec::with_capacity((n + 1) * (n + 1));
    let mut faces = Vec::with_capacity(n * n * 2);

    for j in 0..=n {
        for i in 0..=n {
            vertices.push(Point3::new(i as f64, j as f64, 0.0));
        }
    }

    for j in 0..n {
        for i in 0..n {
            let v00 = j * (n + 1) + i;
            let v10 = v00 + 1;
            let v01 = v00 + (n + 1);
            let v11 = v01 + 1;

            faces.push([v00, v10, v11]);
            faces.push([v00, v11, v01]);
        }
    }

    Mesh::new(vertices, faces).unwrap()
}

/// Two parallel troughs along x, deepest on their center lines.
fn trough_fields(mesh: &Mesh, n: usize) -> (Vec<f64>, Vec<f64>) {
    let centers = [n as f64 * 0.3, n as f64 * 0.7];
    let width = n as f64 * 0.08;

    let depth: Vec<f64> = mesh
        .points()
        .iter()
        .map(|p| {
            centers
                .iter()
                .map(|&c| (-((p.y - c) / width).powi(2)).exp())
                .fold(0.0, f64::max)
                * (1.0 + 0.1 * (p.x * 0.3).sin())
        })
        .collect();
    let curvature: Vec<f64> = depth.iter().map(|d| 2.0 * d - 0.5).collect();
    (depth, curvature)
}

fn bench_neighbors(c: &mut Criterion) {
    let mesh = create_grid_mesh(100);

    c.bench_function("build_neighbors_100x100", |b| {
        b.iter(|| NeighborList::build(&mesh));
    });
}

fn bench_geodesic(c: &mut Criterion) {
    let mesh = create_grid_mesh(100);
    let neighbors = NeighborList::build(&mesh);

    c.bench_function("dijkstra_bounded_10", |b| {
        let options = DijkstraOptions::default().with_max_distance(10.0);
        b.iter(|| dijkstra(mesh.points(), &neighbors, &[5050], None, &options));
    });
}

fn bench_folds(c: &mut Criterion) {
    let n = 100;
    let mesh = create_grid_mesh(n);
    let neighbors = NeighborList::build(&mesh);
    let (depth, _) = trough_fields(&mesh, n);
    let options = FoldOptions::default().with_depth_threshold(DepthThreshold::Absolute(0.5));

    c.bench_function("extract_folds_100x100", |b| {
        b.iter(|| extract_folds(&mesh, &neighbors, &depth, &options).unwrap());
    });
}

fn bench_pipeline(c: &mut Criterion) {
    let n = 60;
    let mesh = create_grid_mesh(n);
    let neighbors = NeighborList::build(&mesh);
    let (depth, curvature) = trough_fields(&mesh, n);
    let options = FundusOptions::default()
        .with_folds(FoldOptions::default().with_depth_threshold(DepthThreshold::Absolute(0.5)));

    let mut group = c.benchmark_group("extract_fundi_60x60");
    group.sample_size(20);
    group.bench_function("parallel", |b| {
        b.iter(|| extract_fundi_with_neighbors(&mesh, &neighbors, &depth, &curvature, &options).unwrap());
    });
    let sequential = options.clone().sequential();
    group.bench_function("sequential", |b| {
        b.iter(|| {
            extract_fundi_with_neighbors(&mesh, &neighbors, &depth, &curvature, &sequential).unwrap()
        });
    });
    group.finish();
}

criterion_group!(benches, bench_neighbors, bench_geodesic, bench_folds, bench_pipeline);
criterion_main!(benches);
