//! Benchmark map preprocessing, pose refinement and hypothesis search.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::Isometry3;
use std::hint::black_box;
use sthiti::core::transform::isometry_from_pose;
use sthiti::grid::MapSurface;
use sthiti::localizer::{scan_points, NullSink, TransformBuffer};
use sthiti::matching::{HypothesisSearch, PoseSolver, ScanPoint, SearchConfig, SolverConfig};
use sthiti::sim::{LidarModel, SimRng, SimWorld};
use sthiti::{Localizer, LocalizerConfig, Pose2D};

fn room() -> SimWorld {
    let mut world = SimWorld::room(160, 0.05, 3);
    world.add_box((1.0, 5.0), (1.6, 6.0));
    world
}

fn body_points(world: &SimWorld, truth: &Pose2D, num_rays: usize) -> Vec<ScanPoint> {
    let lidar = LidarModel {
        num_rays,
        ..LidarModel::default()
    };
    let mut rng = SimRng::seeded(1);
    let scan = lidar.scan(world, truth, 0, "laser", &mut rng);
    scan_points(&scan, &nalgebra::Matrix4::identity())
}

fn bench_preprocess(c: &mut Criterion) {
    let msg = room().to_message();
    let mut group = c.benchmark_group("map_preprocess");

    for downscale in [0usize, 1, 2] {
        group.bench_with_input(
            BenchmarkId::from_parameter(downscale),
            &downscale,
            |b, &downscale| {
                b.iter(|| {
                    let surface = MapSurface::build(black_box(&msg), downscale, 5);
                    black_box(surface)
                })
            },
        );
    }

    group.finish();
}

fn bench_solver(c: &mut Criterion) {
    let world = room();
    let surface = MapSurface::build(&world.to_message(), 0, 5).unwrap();
    let truth = Pose2D::new(4.0, 4.0, 0.1);
    let points = body_points(&world, &truth, 360);
    let start = Pose2D::new(4.05, 3.96, 0.12);

    c.bench_function("solver_360pts_20_steps", |b| {
        b.iter(|| {
            let mut solver = PoseSolver::new(SolverConfig::default(), black_box(start));
            black_box(solver.solve(&surface, black_box(&points), 20))
        })
    });
}

fn bench_search(c: &mut Criterion) {
    let world = room();
    let surface = MapSurface::build(&world.to_message(), 0, 5).unwrap();
    let truth = Pose2D::new(4.0, 4.0, 0.1);
    let prior = Pose2D::new(4.05, 3.96, 0.12);
    let mut group = c.benchmark_group("search_samples");

    for sample_rate in [0usize, 10, 30] {
        let points = body_points(&world, &truth, 360);
        let config = SearchConfig {
            sample_rate,
            seed: 17,
            ..SearchConfig::default()
        };
        let mut search = HypothesisSearch::new(SolverConfig::default(), config);

        group.bench_with_input(
            BenchmarkId::from_parameter(sample_rate),
            &sample_rate,
            |b, _| {
                b.iter(|| {
                    let outcome = search.run(&surface, black_box(&points), black_box(prior), 0.5);
                    black_box(outcome)
                })
            },
        );
    }

    group.finish();
}

fn bench_scan_update(c: &mut Criterion) {
    let world = room();
    let truth = Pose2D::new(4.0, 4.0, 0.1);

    let mut config = LocalizerConfig::default();
    config.search.seed = 5;
    let buffer = std::sync::Arc::new(TransformBuffer::new(100_000, 16));
    buffer.set_static("base_link", "laser", Isometry3::identity());
    buffer.set_transform("odom", "base_link", 0, isometry_from_pose(&truth));
    let localizer =
        Localizer::new(config, buffer, std::sync::Arc::new(NullSink)).expect("valid config");
    localizer.on_map(&world.to_message()).expect("square map");

    let mut rng = SimRng::seeded(2);
    let scan = LidarModel::default().scan(&world, &truth, 0, "laser", &mut rng);

    c.bench_function("localizer_on_scan", |b| {
        b.iter(|| black_box(localizer.on_scan(black_box(&scan))))
    });
}

criterion_group!(
    benches,
    bench_preprocess,
    bench_solver,
    bench_search,
    bench_scan_update
);
criterion_main!(benches);
