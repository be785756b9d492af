// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Horizontal rays of a single mode.
//!
//! Each mode sees the horizontal plane as a medium with refractive index
//! proportional to its wavenumber `k(x, y)`. Rays parameterized by arc
//! length `s` obey
//!
//! ```text
//! x' = cos(theta)    y' = sin(theta)
//! theta' = (cos(theta) dk/dy - sin(theta) dk/dx) / k
//! S' = k
//! ```
//!
//! where `S` is the accumulated phase.

use std::f64::consts::{FRAC_PI_4, PI};

use ndarray::Array2;
use num_complex::Complex64;
use rayon::prelude::*;

use crate::error::{ModalError, Result};
use crate::field::InterpolatedField;
use crate::mesh::Mesh;

/// Horizontal wavenumber of one mode over the plane.
pub trait RefractiveIndex: Sync {
    /// Wavenumber at `(x, y)`. Always positive.
    fn wavenumber(&self, x: f64, y: f64) -> f64;

    /// `[dk/dx, dk/dy]` at `(x, y)`.
    fn gradient(&self, x: f64, y: f64) -> [f64; 2];
}

/// Homogeneous medium.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantIndex(pub f64);

impl RefractiveIndex for ConstantIndex {
    fn wavenumber(&self, _x: f64, _y: f64) -> f64 {
        self.0
    }

    fn gradient(&self, _x: f64, _y: f64) -> [f64; 2] {
        [0.0, 0.0]
    }
}

/// One real wavenumber layer of a 1D (function of `y`) or 2D field, looked
/// up with edge clamping.
pub struct LayerIndex<'a, const N: usize> {
    field: &'a InterpolatedField<f64, N>,
    layer: usize,
    steps: [f64; N],
}

impl<'a, const N: usize> LayerIndex<'a, N> {
    /// View `layer` of `field`.
    ///
    /// # Errors
    /// Returns `LayerOutOfRange` for a missing layer and a configuration
    /// error if any sample is not a positive wavenumber.
    pub fn new(field: &'a InterpolatedField<f64, N>, layer: usize) -> Result<Self> {
        let data = field.layer(layer)?;
        if let Some(bad) = data.iter().find(|k| !(k.is_finite() && **k > 0.0)) {
            return Err(ModalError::Configuration(format!(
                "layer {} holds a non-positive wavenumber {}",
                layer, bad
            )));
        }
        let steps = std::array::from_fn(|d| {
            let axis = field.axis(d);
            if axis.len() < 2 {
                0.0
            } else {
                1e-3 * (axis.last() - axis.first()) / (axis.len() - 1) as f64
            }
        });
        Ok(LayerIndex {
            field,
            layer,
            steps,
        })
    }

    fn at(&self, coord: [f64; N]) -> f64 {
        // the layer index was checked in new()
        self.field
            .layer_value_at_clamped(self.layer, coord)
            .unwrap_or(f64::MIN_POSITIVE)
    }

    fn derivative(&self, coord: [f64; N], d: usize) -> f64 {
        let h = self.steps[d];
        if h == 0.0 {
            return 0.0;
        }
        let mut lo = coord;
        let mut hi = coord;
        lo[d] -= h;
        hi[d] += h;
        (self.at(hi) - self.at(lo)) / (2.0 * h)
    }
}

impl RefractiveIndex for LayerIndex<'_, 1> {
    fn wavenumber(&self, _x: f64, y: f64) -> f64 {
        self.at([y])
    }

    fn gradient(&self, _x: f64, y: f64) -> [f64; 2] {
        [0.0, self.derivative([y], 0)]
    }
}

impl RefractiveIndex for LayerIndex<'_, 2> {
    fn wavenumber(&self, x: f64, y: f64) -> f64 {
        self.at([x, y])
    }

    fn gradient(&self, x: f64, y: f64) -> [f64; 2] {
        [self.derivative([x, y], 0), self.derivative([x, y], 1)]
    }
}

/// Rays launched from one point at every angle of a mesh, sampled at every
/// natural-parameter value. Arrays are indexed `[angle, sample]`.
#[derive(Debug, Clone)]
pub struct RayFan {
    /// Launch angles.
    pub angles: Mesh,
    /// Natural-parameter samples.
    pub params: Mesh,
    /// Marching-axis coordinates.
    pub x: Array2<f64>,
    /// Transverse coordinates.
    pub y: Array2<f64>,
    /// Ray direction.
    pub theta: Array2<f64>,
    /// Accumulated phase.
    pub phase: Array2<f64>,
}

/// Where a ray meets a line of constant `x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    /// Transverse coordinate.
    pub y: f64,
    /// Ray direction.
    pub theta: f64,
    /// Phase accumulated up to the crossing.
    pub phase: f64,
}

impl RayFan {
    /// First crossing of ray `ray` with the line `x = x_line`, linearly
    /// interpolated between samples.
    pub fn crossing(&self, ray: usize, x_line: f64) -> Option<Crossing> {
        let xs = self.x.row(ray);
        for j in 0..xs.len().saturating_sub(1) {
            let (a, b) = (xs[j] - x_line, xs[j + 1] - x_line);
            if a == 0.0 || a * b < 0.0 || (b == 0.0 && a != 0.0) {
                let t = if a == 0.0 { 0.0 } else { a / (a - b) };
                let lerp = |m: &Array2<f64>| m[[ray, j]] + t * (m[[ray, j + 1]] - m[[ray, j]]);
                return Some(Crossing {
                    y: lerp(&self.y),
                    theta: lerp(&self.theta),
                    phase: lerp(&self.phase),
                });
            }
        }
        None
    }

    /// Crossings of every ray with `x = x_line`.
    pub fn crossings(&self, x_line: f64) -> Vec<Option<Crossing>> {
        (0..self.angles.len())
            .map(|i| self.crossing(i, x_line))
            .collect()
    }
}

/// Ray integration through a horizontal medium.
pub trait RayTracer {
    /// Launch one ray per angle from `start` and sample it at every value of
    /// `params`, the first sample being the start point.
    fn trace(
        &self,
        start: [f64; 2],
        angles: &Mesh,
        params: &Mesh,
        medium: &dyn RefractiveIndex,
    ) -> Result<RayFan>;
}

/// Classical fourth-order Runge-Kutta integration of the ray equations.
#[derive(Debug, Clone, Copy)]
pub struct HamiltonianTracer {
    substeps: usize,
}

impl Default for HamiltonianTracer {
    fn default() -> Self {
        HamiltonianTracer { substeps: 1 }
    }
}

type RayState = [f64; 4];

impl HamiltonianTracer {
    /// Create a tracer with one RK4 step per parameter interval.
    pub fn new() -> Self {
        Self::default()
    }

    /// Split every parameter interval into `substeps` RK4 steps (builder
    /// method). Zero is treated as one.
    pub fn with_substeps(mut self, substeps: usize) -> Self {
        self.substeps = substeps.max(1);
        self
    }

    fn rhs(medium: &dyn RefractiveIndex, s: &RayState) -> RayState {
        let (x, y, theta) = (s[0], s[1], s[2]);
        let k = medium.wavenumber(x, y);
        let [kx, ky] = medium.gradient(x, y);
        let (sin, cos) = theta.sin_cos();
        [cos, sin, (cos * ky - sin * kx) / k, k]
    }

    fn step(medium: &dyn RefractiveIndex, s: &RayState, h: f64) -> RayState {
        let add = |a: &RayState, b: &RayState, f: f64| -> RayState {
            std::array::from_fn(|i| a[i] + f * b[i])
        };
        let k1 = Self::rhs(medium, s);
        let k2 = Self::rhs(medium, &add(s, &k1, 0.5 * h));
        let k3 = Self::rhs(medium, &add(s, &k2, 0.5 * h));
        let k4 = Self::rhs(medium, &add(s, &k3, h));
        std::array::from_fn(|i| s[i] + h / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]))
    }

    fn trace_one(
        &self,
        start: [f64; 2],
        angle: f64,
        params: &Mesh,
        medium: &dyn RefractiveIndex,
    ) -> Vec<RayState> {
        let mut state: RayState = [start[0], start[1], angle, 0.0];
        let mut samples = Vec::with_capacity(params.len());
        samples.push(state);
        for w in params.points().windows(2) {
            let h = (w[1] - w[0]) / self.substeps as f64;
            for _ in 0..self.substeps {
                state = Self::step(medium, &state, h);
            }
            samples.push(state);
        }
        samples
    }
}

impl RayTracer for HamiltonianTracer {
    fn trace(
        &self,
        start: [f64; 2],
        angles: &Mesh,
        params: &Mesh,
        medium: &dyn RefractiveIndex,
    ) -> Result<RayFan> {
        let rays: Vec<Vec<RayState>> = angles
            .points()
            .par_iter()
            .map(|&a| self.trace_one(start, a, params, medium))
            .collect();

        let shape = (angles.len(), params.len());
        let component = |c: usize| -> Result<Array2<f64>> {
            let flat: Vec<f64> = rays.iter().flat_map(|r| r.iter().map(move |s| s[c])).collect();
            Array2::from_shape_vec(shape, flat).map_err(|e| ModalError::Other(format!("shape error: {}", e)))
        };
        Ok(RayFan {
            angles: angles.clone(),
            params: params.clone(),
            x: component(0)?,
            y: component(1)?,
            theta: component(2)?,
            phase: component(3)?,
        })
    }
}

/// Superpose a fan of rays into a field on the transverse mesh `y`.
///
/// Every pair of neighbouring rays that both reach the line covers the
/// interval between their crossings. Points in that interval receive the
/// two-dimensional point-source contribution
/// `amplitude * i/4 * sqrt(2 / (pi k_s J)) * exp(i (S - pi/4))`, with the
/// phase `S` and the spreading `J = |dy/da| cos(theta)` interpolated
/// between the two rays. Overlapping ray branches add up.
pub fn superpose(
    crossings: &[Option<Crossing>],
    angles: &Mesh,
    y: &Mesh,
    amplitude: f64,
    k_source: f64,
) -> Vec<Complex64> {
    let mut field = vec![Complex64::new(0.0, 0.0); y.len()];
    let a = angles.points();
    for i in 0..crossings.len().saturating_sub(1) {
        let (Some(c1), Some(c2)) = (crossings[i], crossings[i + 1]) else {
            continue;
        };
        let dy = c2.y - c1.y;
        if dy == 0.0 {
            continue;
        }
        let dy_da = (dy / (a[i + 1] - a[i])).abs();
        let (lo, hi) = if dy > 0.0 { (c1.y, c2.y) } else { (c2.y, c1.y) };
        let start = y.points().partition_point(|&p| p < lo);
        for (l, &yl) in y.points().iter().enumerate().skip(start) {
            if yl >= hi {
                break;
            }
            let t = (yl - c1.y) / dy;
            let phase = c1.phase + t * (c2.phase - c1.phase);
            let cos = c1.theta.cos() + t * (c2.theta.cos() - c1.theta.cos());
            let spreading = dy_da * cos.abs();
            if spreading <= 0.0 {
                continue;
            }
            let magnitude = amplitude * 0.25 * (2.0 / (PI * k_source * spreading)).sqrt();
            field[l] += Complex64::i() * magnitude * Complex64::from_polar(1.0, phase - FRAC_PI_4);
        }
    }
    field
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Field1d, Field2d};
    use approx::assert_relative_eq;

    #[test]
    fn straight_rays_in_homogeneous_medium() {
        let angles = Mesh::uniform(-0.5, 0.5, 5).unwrap();
        let params = Mesh::uniform(0.0, 100.0, 11).unwrap();
        let fan = HamiltonianTracer::new()
            .trace([0.0, 3.0], &angles, &params, &ConstantIndex(0.25))
            .unwrap();
        assert_eq!(fan.x.dim(), (5, 11));
        for (i, &a) in angles.points().iter().enumerate() {
            assert_relative_eq!(fan.x[[i, 10]], 100.0 * a.cos(), epsilon = 1e-9);
            assert_relative_eq!(fan.y[[i, 10]], 3.0 + 100.0 * a.sin(), epsilon = 1e-9);
            assert_relative_eq!(fan.theta[[i, 10]], a, epsilon = 1e-12);
            assert_relative_eq!(fan.phase[[i, 10]], 25.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn crossing_interpolates() {
        let angles = Mesh::uniform(0.0, 0.3, 2).unwrap();
        let params = Mesh::uniform(0.0, 50.0, 6).unwrap();
        let fan = HamiltonianTracer::new()
            .trace([0.0, 0.0], &angles, &params, &ConstantIndex(1.0))
            .unwrap();
        let c = fan.crossing(1, 25.0).unwrap();
        assert_relative_eq!(c.y, 25.0 * 0.3f64.tan(), epsilon = 1e-9);
        assert_relative_eq!(c.phase, 25.0 / 0.3f64.cos(), epsilon = 1e-9);
        assert!(fan.crossing(0, 60.0).is_none());
        assert_eq!(fan.crossings(25.0).len(), 2);
    }

    #[test]
    fn rays_bend_toward_higher_wavenumber() {
        // k grows with y: a ray launched along x turns toward +y
        let y = Mesh::uniform(-100.0, 100.0, 21).unwrap();
        let k: Vec<f64> = y.points().iter().map(|v| 0.2 + 1e-4 * v).collect();
        let field = Field1d::new([y], vec![k]).unwrap();
        let medium = LayerIndex::new(&field, 0).unwrap();
        let [gx, gy] = medium.gradient(0.0, 10.0);
        assert_eq!(gx, 0.0);
        assert_relative_eq!(gy, 1e-4, epsilon = 1e-9);

        let angles = Mesh::from_points(vec![0.0]).unwrap();
        let params = Mesh::uniform(0.0, 50.0, 51).unwrap();
        let fan = HamiltonianTracer::new()
            .with_substeps(2)
            .trace([0.0, 0.0], &angles, &params, &medium)
            .unwrap();
        assert!(fan.y[[0, 50]] > 0.0);
        assert!(fan.theta[[0, 50]] > 0.0);
    }

    #[test]
    fn plane_layer_gradient() {
        let x = Mesh::uniform(0.0, 10.0, 3).unwrap();
        let y = Mesh::uniform(0.0, 10.0, 3).unwrap();
        let mut k = Vec::new();
        for &xi in x.points() {
            for &yj in y.points() {
                k.push(1.0 + 0.01 * xi - 0.02 * yj);
            }
        }
        let field = Field2d::new([x, y], vec![k]).unwrap();
        let medium = LayerIndex::new(&field, 0).unwrap();
        let [gx, gy] = medium.gradient(3.0, 4.0);
        assert_relative_eq!(gx, 0.01, epsilon = 1e-9);
        assert_relative_eq!(gy, -0.02, epsilon = 1e-9);
        assert_relative_eq!(medium.wavenumber(3.0, 4.0), 0.95, epsilon = 1e-12);
        assert!(LayerIndex::new(&field, 1).is_err());
    }

    #[test]
    fn non_positive_wavenumber_rejected() {
        let y = Mesh::uniform(0.0, 1.0, 2).unwrap();
        let field = Field1d::new([y], vec![vec![0.2, 0.0]]).unwrap();
        assert!(matches!(
            LayerIndex::new(&field, 0),
            Err(ModalError::Configuration(_))
        ));
    }

    #[test]
    fn superposition_matches_cylindrical_spreading() {
        // straight rays from (0, 0) to x = r: J = r / cos(a)
        let k = 0.5;
        let r = 200.0;
        let angles = Mesh::uniform(-0.6, 0.6, 241).unwrap();
        let crossings: Vec<Option<Crossing>> = angles
            .points()
            .iter()
            .map(|&a| {
                Some(Crossing {
                    y: r * a.tan(),
                    theta: a,
                    phase: k * r / a.cos(),
                })
            })
            .collect();
        let y = Mesh::uniform(-50.0, 50.0, 11).unwrap();
        let field = superpose(&crossings, &angles, &y, 1.0, k);
        for (l, &yl) in y.points().iter().enumerate() {
            let dist = (r * r + yl * yl).sqrt();
            let expected = 0.25 * (2.0 / (PI * k * dist)).sqrt();
            assert_relative_eq!(field[l].norm(), expected, max_relative = 1e-3);
        }

        // a missing ray leaves its interval empty
        let mut gapped = crossings.clone();
        gapped[120] = None;
        let centre = Mesh::from_points(vec![0.0]).unwrap();
        let field = superpose(&gapped, &angles, &centre, 1.0, k);
        assert_eq!(field[0], Complex64::new(0.0, 0.0));
    }
}
