// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use log::{debug, warn};
use num_complex::Complex64;

use crate::error::{ModalError, Result};
use crate::mesh::Mesh;
use crate::modes::ModalGeometry;
use crate::scheduler::OrderedDelivery;
use crate::sink::RowSink;
use crate::source::InitialWavefield;

/// Everything a stepping engine reads.
pub struct EngineInput<'a> {
    /// Marching-axis positions; row `i` belongs to `x[i]`.
    pub x: &'a Mesh,
    /// Per-mode starting profiles on the transverse mesh, at `x[0]`.
    pub initial: &'a InitialWavefield,
    /// Reference wavenumbers removed from the carrier.
    pub k0: &'a [f64],
    /// Modal wavenumber and amplitude fields.
    pub modes: &'a dyn ModalGeometry,
}

/// Tuning knobs of a stepping engine.
#[derive(Debug, Clone, PartialEq)]
pub struct StepParams {
    /// Absorbing border width in transverse points, when the engine has one.
    pub border_width: Option<usize>,
    /// History length for the border convolution, 0 for the full history.
    pub past_n: usize,
    /// Rows computed concurrently.
    pub workers: usize,
    /// Rows that may be computed ahead of the sink.
    pub buffer_size: usize,
}

impl Default for StepParams {
    fn default() -> Self {
        StepParams {
            border_width: None,
            past_n: 0,
            workers: 1,
            buffer_size: 100,
        }
    }
}

/// Marches a wavefield along the first axis and delivers one row per
/// marching position to the sink, in increasing order.
pub trait SteppingEngine {
    /// Run the march.
    fn solve(&self, input: &EngineInput<'_>, params: &StepParams, sink: &mut dyn RowSink) -> Result<()>;
}

/// Adiabatic mode sum.
///
/// Each mode keeps its transverse profile and accumulates phase along `x`:
///
/// `u(x, y) = sum_j u_j(y) exp(i (int_x0^x k_j(s, y) ds - k0_j (x - x0))) phi_j(x, y)`
///
/// Rows are independent, so they are computed in parallel and handed to the
/// sink through [`OrderedDelivery`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AdiabaticEngine;

impl AdiabaticEngine {
    fn row(input: &EngineInput<'_>, count: usize, i: usize) -> Result<Vec<Complex64>> {
        let x0 = input.x.first();
        let xi = input.x.points()[i];
        let y = input.initial.y();
        let mut row = vec![Complex64::new(0.0, 0.0); y.len()];
        for j in 0..count {
            let profile = &input.initial.modes()[j];
            let k0 = input.k0[j];
            for (l, &yl) in y.points().iter().enumerate() {
                let phase = input.modes.phase_integral(j, yl, x0, xi)? - k0 * (xi - x0);
                let amplitude = input.modes.amplitude_at(j, xi, yl)?;
                row[l] += profile[l] * (Complex64::i() * phase).exp() * amplitude;
            }
        }
        Ok(row)
    }
}

impl SteppingEngine for AdiabaticEngine {
    fn solve(&self, input: &EngineInput<'_>, params: &StepParams, sink: &mut dyn RowSink) -> Result<()> {
        if params.border_width.is_some() {
            warn!("border_width has no effect on the adiabatic engine");
        }
        if params.past_n != 0 {
            warn!("past_n has no effect on the adiabatic engine");
        }
        let count = input
            .initial
            .num_modes()
            .min(input.modes.num_modes())
            .min(input.k0.len());
        if count == 0 {
            return Err(ModalError::Configuration(
                "no modes left to march".to_string(),
            ));
        }
        debug!(
            "adiabatic march: {} rows x {} points, {} modes, {} workers",
            input.x.len(),
            input.initial.y().len(),
            count,
            params.workers
        );
        let delivery = OrderedDelivery::new(params.workers, params.buffer_size)?;
        delivery.run(input.x.len(), |i| Self::row(input, count, i), sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field1d;
    use crate::modes::ModalField;
    use crate::sink::RowCollector;
    use approx::assert_relative_eq;

    fn flat_modes(k: &[f64], phi: &[f64], y: &Mesh) -> ModalField<f64, 1> {
        let n = y.len();
        ModalField::new(
            Field1d::new([y.clone()], k.iter().map(|&v| vec![v; n]).collect()).unwrap(),
            Field1d::new([y.clone()], phi.iter().map(|&v| vec![v; n]).collect()).unwrap(),
        )
        .unwrap()
    }

    fn initial(y: &Mesh, modes: usize) -> InitialWavefield {
        let profiles = (0..modes)
            .map(|j| {
                y.points()
                    .iter()
                    .map(|&v| Complex64::new(1.0 + v, 0.5 * j as f64))
                    .collect()
            })
            .collect();
        InitialWavefield::new(y.clone(), profiles).unwrap()
    }

    fn march(input: &EngineInput<'_>, workers: usize) -> Vec<(usize, Vec<Complex64>)> {
        let params = StepParams {
            workers,
            buffer_size: 3,
            ..StepParams::default()
        };
        let mut rows = RowCollector::default();
        AdiabaticEngine.solve(input, &params, &mut rows).unwrap();
        rows.rows
    }

    #[test]
    fn matched_reference_keeps_rows_constant() {
        let y = Mesh::uniform(-1.0, 1.0, 5).unwrap();
        let x = Mesh::uniform(0.0, 100.0, 11).unwrap();
        let modes = flat_modes(&[0.4, 0.3], &[0.5, 2.0], &y);
        let init = initial(&y, 2);
        let k0 = [0.4, 0.3];
        let input = EngineInput { x: &x, initial: &init, k0: &k0, modes: &modes };
        let rows = march(&input, 1);
        assert_eq!(rows.len(), 11);
        for (_, row) in &rows {
            for (l, v) in row.iter().enumerate() {
                let expected = init.modes()[0][l] * 0.5 + init.modes()[1][l] * 2.0;
                assert_relative_eq!(v.re, expected.re, epsilon = 1e-12);
                assert_relative_eq!(v.im, expected.im, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn detuned_mode_rotates_phase() {
        let y = Mesh::uniform(0.0, 1.0, 2).unwrap();
        let x = Mesh::uniform(10.0, 20.0, 3).unwrap();
        let modes = flat_modes(&[0.5], &[1.0], &y);
        let init = initial(&y, 1);
        let k0 = [0.4];
        let input = EngineInput { x: &x, initial: &init, k0: &k0, modes: &modes };
        let rows = march(&input, 1);
        let (_, last) = &rows[2];
        let expected = init.modes()[0][1] * Complex64::from_polar(1.0, 0.1 * 10.0);
        assert_relative_eq!(last[1].re, expected.re, epsilon = 1e-12);
        assert_relative_eq!(last[1].im, expected.im, epsilon = 1e-12);
    }

    #[test]
    fn parallel_march_matches_serial() {
        let y = Mesh::uniform(-2.0, 2.0, 9).unwrap();
        let x = Mesh::uniform(0.0, 50.0, 40).unwrap();
        let modes = flat_modes(&[0.41, 0.33, 0.2], &[1.0, 0.7, 0.2], &y);
        let init = initial(&y, 3);
        let k0 = [0.4, 0.3];
        let input = EngineInput { x: &x, initial: &init, k0: &k0, modes: &modes };
        let serial = march(&input, 1);
        let parallel = march(&input, 4);
        assert_eq!(serial, parallel);
        let order: Vec<usize> = parallel.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, (0..40).collect::<Vec<_>>());
    }

    #[test]
    fn no_modes_is_an_error() {
        let y = Mesh::uniform(0.0, 1.0, 2).unwrap();
        let x = Mesh::uniform(0.0, 1.0, 2).unwrap();
        let modes = flat_modes(&[0.5], &[1.0], &y);
        let init = initial(&y, 1);
        let input = EngineInput { x: &x, initial: &init, k0: &[], modes: &modes };
        let mut rows = RowCollector::default();
        let result = AdiabaticEngine.solve(&input, &StepParams::default(), &mut rows);
        assert!(matches!(result, Err(ModalError::Configuration(_))));
    }
}
