// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use num_complex::Complex64;

use modal_pe::modes::{IdealWaveguide, MediumColumn, ModeSolver};
use modal_pe::sink::RowCollector;
use modal_pe::{Field2d, Mesh, ModalFieldBuilder, OrderedDelivery};

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn plane(n: usize, layers: usize) -> Field2d<f64> {
    let x = Mesh::uniform(0.0, 1000.0, n).unwrap();
    let y = Mesh::uniform(-500.0, 500.0, n).unwrap();
    let data = (0..layers)
        .map(|l| (0..n * n).map(|i| 0.4 - 0.01 * l as f64 + 1e-6 * i as f64).collect())
        .collect();
    Field2d::new([x, y], data).unwrap()
}

/// Bilinear lookups at scattered interior points.
fn bench_interpolation(c: &mut Criterion) {
    let field = plane(256, 8);
    let points: Vec<[f64; 2]> = (0..1024)
        .map(|i| {
            let t = i as f64 / 1024.0;
            [1000.0 * t, -500.0 + 1000.0 * (t * 7.0).fract()]
        })
        .collect();
    c.bench_function("field2d_value_at_1024pts_8layers", |b| {
        b.iter(|| {
            for p in &points {
                black_box(field.value_at(black_box(*p)).unwrap());
            }
        });
    });
    c.bench_function("field2d_integrate_first_axis", |b| {
        b.iter(|| black_box(field.integrate_first_axis(3, black_box(12.5), 0.0, 1000.0).unwrap()));
    });
}

/// Full modal sweep with stitching over a sloping bottom, so the mode count
/// changes along both axes.
fn bench_stitching_builder(c: &mut Criterion) {
    let guide = IdealWaveguide::new(100.0, 1500.0, 30.0).unwrap();
    let slope = |x: f64, y: f64| 40.0 + 0.05 * x + 0.02 * y.abs();
    let mut group = c.benchmark_group("modal_sweep");
    for &n in &[32usize, 64, 128] {
        let x = Mesh::uniform(0.0, 2000.0, n).unwrap();
        let y = Mesh::uniform(-1000.0, 1000.0, n).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let field = ModalFieldBuilder::<f64>::new(&guide, &slope)
                    .build_2d(&x, &y)
                    .unwrap();
                black_box(field)
            });
        });
    }
    group.finish();

    let column = MediumColumn {
        x: 0.0,
        y: 0.0,
        depth: 200.0,
    };
    c.bench_function("waveguide_solve_200m", |b| {
        b.iter(|| black_box(ModeSolver::<f64>::solve(&guide, black_box(&column)).unwrap()));
    });
}

/// Ordered delivery of 512 rows of 2048 points with varying worker counts.
fn bench_delivery_scaling(c: &mut Criterion) {
    let cpus = num_cpus();
    let compute = |i: usize| -> modal_pe::Result<Vec<Complex64>> {
        Ok((0..2048)
            .map(|l| Complex64::from_polar(1.0, 1e-3 * (i * l) as f64))
            .collect())
    };
    let mut group = c.benchmark_group("ordered_delivery_512rows");
    for &workers in &[1, 2, 4, 8] {
        if workers <= cpus {
            let delivery = OrderedDelivery::new(workers, 64).unwrap();
            group.bench_function(format!("{}workers", workers), |b| {
                b.iter(|| {
                    let mut rows = RowCollector::default();
                    delivery.run(512, compute, &mut rows).unwrap();
                    black_box(rows)
                });
            });
        }
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_interpolation,
    bench_stitching_builder,
    bench_delivery_scaling,
);
criterion_main!(benches);
