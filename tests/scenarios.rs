// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use approx::assert_relative_eq;
use num_complex::Complex64;

use modal_pe::config::JobConfig;
use modal_pe::jobs::{self, Job, RunOptions};
use modal_pe::modes::{MediumColumn, ModalPair};
use modal_pe::{Mesh, ModalFieldBuilder, ModalGeometry, Result};

fn flat(depth: f64) -> impl Fn(f64, f64) -> f64 + Sync {
    move |_, _| depth
}

/// One row of four points with mode counts 2, 3, 2, 4.
#[test]
fn ragged_row_is_back_filled_and_carried_forward() {
    let counts = [2usize, 3, 2, 4];
    let solver = |c: &MediumColumn| -> Result<Vec<ModalPair<f64>>> {
        let point = c.y as usize;
        Ok((0..counts[point])
            .map(|l| ModalPair::new(100.0 * point as f64 + l as f64, -(l as f64)))
            .collect())
    };
    let medium = flat(100.0);
    let y = Mesh::uniform(0.0, 3.0, 4).unwrap();
    let field = ModalFieldBuilder::<f64>::new(&solver, &medium)
        .build_1d(0.0, &y)
        .unwrap();

    assert_eq!(field.num_modes(), 4);
    let k = |layer: usize, point: usize| field.wavenumbers.get(layer, [point]);
    // layers every point reports keep their own values
    for point in 0..4 {
        assert_eq!(k(0, point), 100.0 * point as f64);
        assert_eq!(k(1, point), 100.0 * point as f64 + 1.0);
    }
    // point 3 grows from 2 to 4 modes: layers 2 and 3 back-filled along the row
    for point in 0..3 {
        assert_eq!(k(2, point), k(2, 3));
        assert_eq!(k(3, point), k(3, 3));
    }
    assert_eq!(k(3, 2), k(3, 1));
    // amplitudes are stitched with the same policy
    assert_eq!(field.amplitudes.get(3, [0]), -3.0);
}

#[test]
fn truncation_is_idempotent_and_bounded() {
    let solver = |_: &MediumColumn| -> Result<Vec<ModalPair<Complex64>>> {
        Ok((0..4)
            .map(|l| ModalPair::new(Complex64::new(1.0 - 0.1 * l as f64, 0.01), 1.0))
            .collect())
    };
    let medium = flat(50.0);
    let y = Mesh::uniform(-1.0, 1.0, 3).unwrap();
    let mut field = ModalFieldBuilder::<Complex64>::new(&solver, &medium)
        .build_1d(0.0, &y)
        .unwrap();
    field.truncate(10);
    assert_eq!(field.num_modes(), 4);
    field.truncate(2);
    let once = field.clone();
    field.truncate(2);
    assert_eq!(field, once);
    let real = field.wavenumbers.to_real();
    assert_eq!(real.num_layers(), 2);
    assert_relative_eq!(real.value_at([0.5]).unwrap()[1], 0.9, epsilon = 1e-12);
    assert_relative_eq!(
        field.phase_integral(0, 0.0, 0.0, 10.0).unwrap().im,
        0.1,
        epsilon = 1e-12
    );
}

fn scratch(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("modal_pe_scenario_{}", name))
}

#[test]
fn solution_from_json_config_in_binary() {
    let config_path = scratch("config.json");
    let output = scratch("solution.bin");
    std::fs::write(
        &config_path,
        r#"{
            "f": 40.0,
            "bathymetry": {"type": "values", "x": [0.0, 200.0], "y": [-50.0, 50.0],
                           "values": [[60.0, 60.0], [70.0, 70.0]]},
            "x0": 20.0, "x1": 200.0, "nx": 19,
            "y0": -50.0, "y1": 50.0, "ny": 11,
            "mnx": 4, "mny": 3,
            "max_mode": 2,
            "init": "gauss"
        }"#,
    )
    .unwrap();
    let config = JobConfig::from_file(&config_path).unwrap();
    let options = RunOptions {
        output: output.clone(),
        step: 5,
        binary: true,
        workers: 3,
        buffer_size: 2,
        ..RunOptions::default()
    };
    jobs::run(Job::Solution, &config, &options).unwrap();

    let bytes = std::fs::read(&output).unwrap();
    let u32_at = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
    let f64_at = |i: usize| {
        let mut b = [0u8; 8];
        b.copy_from_slice(&bytes[i..i + 8]);
        f64::from_le_bytes(b)
    };
    // ceil(19 / 5) = 4 rows of 11 complex values
    assert_eq!(u32_at(0), 4);
    assert_eq!(u32_at(4), 11);
    assert_eq!(bytes.len(), 8 + 8 * (4 + 11 + 4 * 2 * 11));
    assert_eq!(f64_at(8), 20.0);
    assert_eq!(f64_at(16), 70.0);
    assert_eq!(f64_at(8 + 8 * 4), -50.0);

    std::fs::remove_file(&config_path).ok();
    std::fs::remove_file(&output).ok();
}

#[test]
fn solution_from_precomputed_modes() {
    let modes_path = scratch("modes.txt");
    let output = scratch("precomputed.txt");
    let base = JobConfig {
        f: 40.0,
        const_modes: true,
        x0: 10.0,
        x1: 50.0,
        nx: 5,
        y0: -10.0,
        y1: 10.0,
        ny: 5,
        mny: Some(5),
        k0: Some(vec![0.16, 0.15]),
        phi_s: Some(vec![0.1, 0.1]),
        ..JobConfig::default()
    };
    let modes_options = RunOptions {
        output: modes_path.clone(),
        ..RunOptions::default()
    };
    jobs::run(Job::Modes, &base, &modes_options).unwrap();

    let reuse = JobConfig {
        modes: Some(modal_pe::config::ModesFile {
            path: modes_path.clone(),
            binary: false,
        }),
        ..base
    };
    let options = RunOptions {
        output: output.clone(),
        step: 1,
        ..RunOptions::default()
    };
    jobs::run(Job::Solution, &reuse, &options).unwrap();
    let text = std::fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "5 5");
    assert_eq!(lines.len(), 3 + 5);

    std::fs::remove_file(&modes_path).ok();
    std::fs::remove_file(&output).ok();
}
