// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::f64::consts::PI;

use log::debug;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{ModalError, Result};
use crate::field::{Field1d, InterpolatedField};
use crate::mesh::Mesh;
use crate::progress::ProgressBar;
use crate::stitch::RaggedStitcher;
use crate::value::ModalValue;

/// One trapped mode at a single grid point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModalPair<V> {
    /// Horizontal wavenumber.
    pub wavenumber: V,
    /// Mode shape evaluated at the receiver depth.
    pub amplitude: f64,
}

impl<V> ModalPair<V> {
    /// Create a pair.
    pub fn new(wavenumber: V, amplitude: f64) -> Self {
        ModalPair {
            wavenumber,
            amplitude,
        }
    }
}

/// The vertical medium description at one horizontal position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediumColumn {
    /// Marching-axis coordinate.
    pub x: f64,
    /// Transverse coordinate.
    pub y: f64,
    /// Water depth.
    pub depth: f64,
}

/// Horizontally varying environment.
pub trait Medium: Sync {
    /// The water column at `(x, y)`.
    fn column(&self, x: f64, y: f64) -> MediumColumn;
}

impl<F> Medium for F
where
    F: Fn(f64, f64) -> f64 + Sync,
{
    fn column(&self, x: f64, y: f64) -> MediumColumn {
        MediumColumn {
            x,
            y,
            depth: self(x, y),
        }
    }
}

/// Local normal-mode solver for a single water column.
///
/// Returns the trapped modes in ascending mode order. The count is decided by
/// the solver and may differ between neighbouring columns.
pub trait ModeSolver<V>: Sync {
    /// Solve the column.
    fn solve(&self, column: &MediumColumn) -> Result<Vec<ModalPair<V>>>;
}

impl<V, F> ModeSolver<V> for F
where
    F: Fn(&MediumColumn) -> Result<Vec<ModalPair<V>>> + Sync,
{
    fn solve(&self, column: &MediumColumn) -> Result<Vec<ModalPair<V>>> {
        self(column)
    }
}

/// Boundary condition at the sea floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BottomCondition {
    /// Zero normal velocity.
    #[default]
    Rigid,
    /// Zero pressure.
    PressureRelease,
}

/// Isovelocity waveguide with a pressure-release surface.
///
/// Mode `n` (from 1) has vertical wavenumber `gamma_n = (n - 1/2) pi / H` over
/// a rigid bottom or `n pi / H` over a pressure-release bottom, horizontal
/// wavenumber `sqrt(kw^2 - gamma_n^2)` while trapped, and shape
/// `sqrt(2 / H) sin(gamma_n z)`.
#[derive(Debug, Clone, PartialEq)]
pub struct IdealWaveguide {
    frequency: f64,
    sound_speed: f64,
    depth: f64,
    bottom: BottomCondition,
    mode_subset: f64,
    attenuation: f64,
}

impl IdealWaveguide {
    /// Create a waveguide evaluating mode shapes at `depth`.
    ///
    /// # Errors
    /// Returns a configuration error for a non-positive frequency or sound
    /// speed, or a negative evaluation depth.
    pub fn new(frequency: f64, sound_speed: f64, depth: f64) -> Result<Self> {
        if !frequency.is_finite() || frequency <= 0.0 {
            return Err(ModalError::Configuration(format!(
                "frequency must be positive, got {}",
                frequency
            )));
        }
        if !sound_speed.is_finite() || sound_speed <= 0.0 {
            return Err(ModalError::Configuration(format!(
                "sound speed must be positive, got {}",
                sound_speed
            )));
        }
        if !depth.is_finite() || depth < 0.0 {
            return Err(ModalError::Configuration(format!(
                "evaluation depth must be non-negative, got {}",
                depth
            )));
        }
        Ok(IdealWaveguide {
            frequency,
            sound_speed,
            depth,
            bottom: BottomCondition::Rigid,
            mode_subset: -1.0,
            attenuation: 0.0,
        })
    }

    /// Set the bottom condition (builder method).
    pub fn with_bottom(mut self, bottom: BottomCondition) -> Self {
        self.bottom = bottom;
        self
    }

    /// Keep only this fraction of the trapped modes when it lies in `(0, 1)`
    /// (builder method). Other values keep every mode.
    pub fn with_mode_subset(mut self, subset: f64) -> Self {
        self.mode_subset = subset;
        self
    }

    /// Imaginary wavenumber growth per unit of `gamma_n / kw` (builder method).
    /// Only visible through complex wavenumbers.
    pub fn with_attenuation(mut self, attenuation: f64) -> Self {
        self.attenuation = attenuation;
        self
    }

    /// Copy of this waveguide evaluating mode shapes at another depth.
    pub fn at_depth(&self, depth: f64) -> Result<Self> {
        let mut other = IdealWaveguide::new(self.frequency, self.sound_speed, depth)?;
        other.bottom = self.bottom;
        other.mode_subset = self.mode_subset;
        other.attenuation = self.attenuation;
        Ok(other)
    }

    /// Free-space wavenumber `2 pi f / c`.
    pub fn water_wavenumber(&self) -> f64 {
        2.0 * PI * self.frequency / self.sound_speed
    }

    fn vertical_wavenumber(&self, n: usize, h: f64) -> f64 {
        match self.bottom {
            BottomCondition::Rigid => (n as f64 - 0.5) * PI / h,
            BottomCondition::PressureRelease => n as f64 * PI / h,
        }
    }

    /// Trapped modes for a column of water depth `h`, as
    /// `(horizontal wavenumber, vertical wavenumber)`.
    fn trapped(&self, h: f64) -> Vec<(f64, f64)> {
        if !h.is_finite() || h <= 0.0 {
            return Vec::new();
        }
        let kw = self.water_wavenumber();
        let mut modes = Vec::new();
        let mut n = 1;
        loop {
            let gamma = self.vertical_wavenumber(n, h);
            if gamma >= kw {
                break;
            }
            modes.push(((kw * kw - gamma * gamma).sqrt(), gamma));
            n += 1;
        }
        if self.mode_subset > 0.0 && self.mode_subset < 1.0 {
            let keep = (modes.len() as f64 * self.mode_subset).ceil() as usize;
            modes.truncate(keep);
        }
        modes
    }
}

impl<V: ModalValue> ModeSolver<V> for IdealWaveguide {
    fn solve(&self, column: &MediumColumn) -> Result<Vec<ModalPair<V>>> {
        let h = column.depth;
        let kw = self.water_wavenumber();
        Ok(self
            .trapped(h)
            .into_iter()
            .map(|(k, gamma)| {
                let amplitude = if self.depth > h {
                    0.0
                } else {
                    (2.0 / h).sqrt() * (gamma * self.depth).sin()
                };
                let wavenumber = V::from_components(&[k, self.attenuation * gamma / kw]);
                ModalPair::new(wavenumber, amplitude)
            })
            .collect())
    }
}

/// Dense wavenumber and amplitude layers on a shared mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct ModalField<V, const N: usize> {
    /// Horizontal wavenumbers, one layer per mode.
    pub wavenumbers: InterpolatedField<V, N>,
    /// Mode shapes at the receiver depth, one layer per mode.
    pub amplitudes: InterpolatedField<f64, N>,
}

impl<V: ModalValue, const N: usize> ModalField<V, N> {
    /// Pair wavenumber and amplitude fields.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` when axes or layer counts differ.
    pub fn new(
        wavenumbers: InterpolatedField<V, N>,
        amplitudes: InterpolatedField<f64, N>,
    ) -> Result<Self> {
        if wavenumbers.axes() != amplitudes.axes()
            || wavenumbers.num_layers() != amplitudes.num_layers()
        {
            let mut expected = wavenumbers.shape().to_vec();
            expected.push(wavenumbers.num_layers());
            let mut got = amplitudes.shape().to_vec();
            got.push(amplitudes.num_layers());
            return Err(ModalError::ShapeMismatch { expected, got });
        }
        Ok(ModalField {
            wavenumbers,
            amplitudes,
        })
    }

    /// Number of modal layers.
    pub fn num_modes(&self) -> usize {
        self.wavenumbers.num_layers()
    }

    /// Keep the first `keep` modes in both fields.
    pub fn truncate(&mut self, keep: usize) {
        self.wavenumbers.truncate(keep);
        self.amplitudes.truncate(keep);
    }

    /// Split a stitched list of per-layer pairs into the two fields.
    fn from_layers(axes: [Mesh; N], layers: Vec<Vec<ModalPair<V>>>) -> Result<Self> {
        let mut k = Vec::with_capacity(layers.len());
        let mut phi = Vec::with_capacity(layers.len());
        for layer in layers {
            k.push(layer.iter().map(|p| p.wavenumber).collect());
            phi.push(layer.iter().map(|p| p.amplitude).collect());
        }
        ModalField::new(
            InterpolatedField::new(axes.clone(), k)?,
            InterpolatedField::new(axes, phi)?,
        )
    }
}

/// What a marching engine and the initial-condition builder need from a modal
/// field, whether it varies along the marching axis or not.
pub trait ModalGeometry: Sync {
    /// Number of modal layers.
    fn num_modes(&self) -> usize;

    /// Keep the first `keep` modes.
    fn truncate_modes(&mut self, keep: usize);

    /// The transverse mesh.
    fn transverse_axis(&self) -> &Mesh;

    /// `integral_a^b k(x, y) dx` for one layer.
    fn phase_integral(&self, layer: usize, y: f64, a: f64, b: f64) -> Result<Complex64>;

    /// Mode shape of one layer at `(x, y)`.
    fn amplitude_at(&self, layer: usize, x: f64, y: f64) -> Result<f64>;

    /// Real wavenumber layers as a function of the transverse coordinate only.
    /// For a range-dependent field this is the first row.
    fn transverse_wavenumbers(&self) -> Result<Field1d<f64>>;
}

impl<V: ModalValue> ModalGeometry for ModalField<V, 1> {
    fn num_modes(&self) -> usize {
        self.wavenumbers.num_layers()
    }

    fn truncate_modes(&mut self, keep: usize) {
        self.truncate(keep);
    }

    fn transverse_axis(&self) -> &Mesh {
        self.wavenumbers.axis(0)
    }

    fn phase_integral(&self, layer: usize, y: f64, a: f64, b: f64) -> Result<Complex64> {
        let k = self.wavenumbers.layer_value_at(layer, [y])?;
        Ok(k.to_complex() * (b - a))
    }

    fn amplitude_at(&self, layer: usize, _x: f64, y: f64) -> Result<f64> {
        self.amplitudes.layer_value_at(layer, [y])
    }

    fn transverse_wavenumbers(&self) -> Result<Field1d<f64>> {
        Ok(self.wavenumbers.to_real())
    }
}

impl<V: ModalValue> ModalGeometry for ModalField<V, 2> {
    fn num_modes(&self) -> usize {
        self.wavenumbers.num_layers()
    }

    fn truncate_modes(&mut self, keep: usize) {
        self.truncate(keep);
    }

    fn transverse_axis(&self) -> &Mesh {
        self.wavenumbers.axis(1)
    }

    fn phase_integral(&self, layer: usize, y: f64, a: f64, b: f64) -> Result<Complex64> {
        Ok(self
            .wavenumbers
            .integrate_first_axis(layer, y, a, b)?
            .to_complex())
    }

    fn amplitude_at(&self, layer: usize, x: f64, y: f64) -> Result<f64> {
        self.amplitudes.layer_value_at(layer, [x, y])
    }

    fn transverse_wavenumbers(&self) -> Result<Field1d<f64>> {
        Ok(self.wavenumbers.row(0)?.to_real())
    }
}

/// Sweeps a mesh with a mode solver and stitches the ragged results into a
/// dense [`ModalField`].
pub struct ModalFieldBuilder<'a, V> {
    solver: &'a dyn ModeSolver<V>,
    medium: &'a dyn Medium,
    show_progress: bool,
}

impl<'a, V: ModalValue> ModalFieldBuilder<'a, V> {
    /// Create a builder.
    pub fn new(solver: &'a dyn ModeSolver<V>, medium: &'a dyn Medium) -> Self {
        ModalFieldBuilder {
            solver,
            medium,
            show_progress: false,
        }
    }

    /// Draw a progress bar on stderr during the sweep (builder method).
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Sweep the transverse axis `y` at fixed marching coordinate `x`.
    pub fn build_1d(&self, x: f64, y: &Mesh) -> Result<ModalField<V, 1>> {
        let mut stitcher = RaggedStitcher::new(1, y.len());
        let mut bar = self.progress_bar("Modes", y.len());
        for &yj in y.points() {
            self.visit(&mut stitcher, x, yj)?;
            if let Some(bar) = bar.as_mut() {
                bar.advance();
            }
        }
        if let Some(bar) = bar.as_mut() {
            bar.finish();
        }
        let layers = stitcher.finish()?;
        debug!("1D modal sweep over {} points: {} layers", y.len(), layers.len());
        ModalField::from_layers([y.clone()], layers)
    }

    /// Sweep the plane, outer loop over `x` and inner loop over `y`.
    pub fn build_2d(&self, x: &Mesh, y: &Mesh) -> Result<ModalField<V, 2>> {
        let mut stitcher = RaggedStitcher::new(x.len(), y.len());
        let mut bar = self.progress_bar("Modes", x.len() * y.len());
        for &xi in x.points() {
            for &yj in y.points() {
                self.visit(&mut stitcher, xi, yj)?;
                if let Some(bar) = bar.as_mut() {
                    bar.advance();
                }
            }
        }
        if let Some(bar) = bar.as_mut() {
            bar.finish();
        }
        let layers = stitcher.finish()?;
        debug!(
            "2D modal sweep over {}x{} points: {} layers",
            x.len(),
            y.len(),
            layers.len()
        );
        ModalField::from_layers([x.clone(), y.clone()], layers)
    }

    fn visit(&self, stitcher: &mut RaggedStitcher<ModalPair<V>>, x: f64, y: f64) -> Result<()> {
        let column = self.medium.column(x, y);
        let pairs = self.solver.solve(&column)?;
        stitcher.push(&pairs)
    }

    fn progress_bar(&self, label: &str, total: usize) -> Option<ProgressBar> {
        self.show_progress.then(|| ProgressBar::new(label, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn flat(depth: f64) -> impl Fn(f64, f64) -> f64 + Sync {
        move |_, _| depth
    }

    #[test]
    fn waveguide_mode_count_follows_depth() {
        // kw = 2 pi 100 / 1500, rigid bottom cut-off: (n - 1/2) pi / H < kw
        let guide = IdealWaveguide::new(100.0, 1500.0, 10.0).unwrap();
        let kw = guide.water_wavenumber();
        for &h in &[20.0, 50.0, 100.0] {
            let column = MediumColumn { x: 0.0, y: 0.0, depth: h };
            let modes: Vec<ModalPair<f64>> = guide.solve(&column).unwrap();
            let expected = (kw * h / PI + 0.5).ceil() as usize - 1;
            assert_eq!(modes.len(), expected, "depth {}", h);
            for w in modes.windows(2) {
                assert!(w[0].wavenumber > w[1].wavenumber);
            }
        }
    }

    #[test]
    fn waveguide_shapes_and_subset() {
        let guide = IdealWaveguide::new(100.0, 1500.0, 25.0)
            .unwrap()
            .with_bottom(BottomCondition::PressureRelease);
        let column = MediumColumn { x: 0.0, y: 0.0, depth: 100.0 };
        let all: Vec<ModalPair<f64>> = guide.solve(&column).unwrap();
        assert!(!all.is_empty());
        let gamma = PI / 100.0;
        assert_relative_eq!(
            all[0].amplitude,
            (2.0f64 / 100.0).sqrt() * (gamma * 25.0).sin(),
            epsilon = 1e-12
        );

        let half: Vec<ModalPair<f64>> = guide.clone().with_mode_subset(0.5).solve(&column).unwrap();
        assert_eq!(half.len(), (all.len() as f64 * 0.5).ceil() as usize);

        let below = guide.at_depth(150.0).unwrap();
        let modes: Vec<ModalPair<f64>> = below.solve(&column).unwrap();
        assert!(modes.iter().all(|m| m.amplitude == 0.0));

        let dry = MediumColumn { x: 0.0, y: 0.0, depth: 0.0 };
        let none: Vec<ModalPair<f64>> = guide.solve(&dry).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn complex_wavenumbers_carry_attenuation() {
        let guide = IdealWaveguide::new(50.0, 1500.0, 10.0)
            .unwrap()
            .with_attenuation(1e-3);
        let column = MediumColumn { x: 0.0, y: 0.0, depth: 60.0 };
        let modes: Vec<ModalPair<Complex64>> = guide.solve(&column).unwrap();
        assert!(modes.iter().all(|m| m.wavenumber.im > 0.0));
        let real: Vec<ModalPair<f64>> = guide.solve(&column).unwrap();
        for (c, r) in modes.iter().zip(real.iter()) {
            assert_eq!(c.wavenumber.re, r.wavenumber);
        }
    }

    #[test]
    fn constant_two_mode_plane() {
        // every point reports exactly two modes: no stitching visible
        let solver = |c: &MediumColumn| -> Result<Vec<ModalPair<f64>>> {
            Ok(vec![
                ModalPair::new(1.0 + c.x + 10.0 * c.y, c.y),
                ModalPair::new(2.0 * c.x, -c.x),
            ])
        };
        let medium = flat(100.0);
        let x = Mesh::uniform(0.0, 4.0, 5).unwrap();
        let y = Mesh::uniform(0.0, 4.0, 5).unwrap();
        let field = ModalFieldBuilder::<f64>::new(&solver, &medium)
            .build_2d(&x, &y)
            .unwrap();
        assert_eq!(field.num_modes(), 2);
        assert_eq!(field.wavenumbers.shape(), [5, 5]);
        for (i, &xi) in x.points().iter().enumerate() {
            for (j, &yj) in y.points().iter().enumerate() {
                assert_eq!(field.wavenumbers.get(0, [i, j]), 1.0 + xi + 10.0 * yj);
                assert_eq!(field.wavenumbers.get(1, [i, j]), 2.0 * xi);
                assert_eq!(field.amplitudes.get(0, [i, j]), yj);
                assert_eq!(field.amplitudes.get(1, [i, j]), -xi);
            }
        }
    }

    #[test]
    fn sloping_bottom_sweep_is_dense() {
        let guide = IdealWaveguide::new(100.0, 1500.0, 5.0).unwrap();
        let slope = |x: f64, y: f64| 20.0 + 0.5 * x + 0.2 * y;
        let x = Mesh::uniform(0.0, 100.0, 6).unwrap();
        let y = Mesh::uniform(0.0, 100.0, 7).unwrap();
        let builder = ModalFieldBuilder::<f64>::new(&guide, &slope);
        let field = builder.build_2d(&x, &y).unwrap();

        let deepest = MediumColumn { x: 100.0, y: 100.0, depth: slope(100.0, 100.0) };
        let max_modes = ModeSolver::<f64>::solve(&guide, &deepest).unwrap().len();
        assert_eq!(field.num_modes(), max_modes);
        for layer in field.wavenumbers.layers() {
            assert!(layer.iter().all(|k| k.is_finite() && *k > 0.0));
        }

        let line = builder.build_1d(0.0, &y).unwrap();
        assert_eq!(line.wavenumbers.shape(), [7]);
        assert!(line.num_modes() <= max_modes);
    }

    #[test]
    fn truncate_applies_to_both_fields() {
        let guide = IdealWaveguide::new(200.0, 1500.0, 5.0).unwrap();
        let medium = flat(80.0);
        let y = Mesh::uniform(0.0, 10.0, 3).unwrap();
        let mut field = ModalFieldBuilder::<Complex64>::new(&guide, &medium)
            .build_1d(0.0, &y)
            .unwrap();
        assert!(field.num_modes() > 3);
        field.truncate(3);
        assert_eq!(field.wavenumbers.num_layers(), 3);
        assert_eq!(field.amplitudes.num_layers(), 3);
    }

    #[test]
    fn geometry_of_range_independent_field() {
        let solver = |c: &MediumColumn| -> Result<Vec<ModalPair<f64>>> {
            Ok(vec![ModalPair::new(0.5 + c.y, 2.0)])
        };
        let medium = flat(10.0);
        let y = Mesh::uniform(0.0, 1.0, 3).unwrap();
        let line = ModalFieldBuilder::<f64>::new(&solver, &medium)
            .build_1d(0.0, &y)
            .unwrap();
        let phase = line.phase_integral(0, 0.5, 2.0, 6.0).unwrap();
        assert_relative_eq!(phase.re, 4.0, epsilon = 1e-12);
        assert_eq!(line.amplitude_at(0, 1e6, 0.5).unwrap(), 2.0);
        assert_eq!(line.transverse_axis().len(), 3);

        let x = Mesh::uniform(0.0, 4.0, 3).unwrap();
        let plane = ModalFieldBuilder::<f64>::new(&solver, &medium)
            .build_2d(&x, &y)
            .unwrap();
        let phase = plane.phase_integral(0, 0.5, 1.0, 3.0).unwrap();
        assert_relative_eq!(phase.re, 2.0, epsilon = 1e-12);
        let k = plane.transverse_wavenumbers().unwrap();
        assert_eq!(k.layer(0).unwrap(), &[0.5, 1.0, 1.5]);
    }

    #[test]
    fn mismatched_pair_rejected() {
        let y = Mesh::uniform(0.0, 1.0, 2).unwrap();
        let k = Field1d::new([y.clone()], vec![vec![1.0, 1.0]]).unwrap();
        let phi = Field1d::new([y], vec![vec![1.0, 1.0], vec![0.0, 0.0]]).unwrap();
        assert!(matches!(
            ModalField::new(k, phi),
            Err(ModalError::ShapeMismatch { .. })
        ));
    }
}
