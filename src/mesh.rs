// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{ModalError, Result};

/// A strictly increasing sequence of sample coordinates along one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    points: Vec<f64>,
}

impl Mesh {
    /// Create a mesh from explicit coordinates.
    ///
    /// # Errors
    /// Returns an error if `points` is empty, contains a non-finite value, or
    /// is not strictly increasing.
    pub fn from_points(points: Vec<f64>) -> Result<Self> {
        if points.is_empty() {
            return Err(ModalError::InvalidMesh("mesh has no points".to_string()));
        }
        for (i, &p) in points.iter().enumerate() {
            if !p.is_finite() {
                return Err(ModalError::InvalidMesh(format!(
                    "point {} is not finite: {}",
                    i, p
                )));
            }
        }
        for i in 1..points.len() {
            if points[i] <= points[i - 1] {
                return Err(ModalError::InvalidMesh(format!(
                    "points must be strictly increasing: {} at {} follows {}",
                    points[i],
                    i,
                    points[i - 1]
                )));
            }
        }
        Ok(Mesh { points })
    }

    /// Create `n` evenly spaced points from `a` to `b` inclusive.
    ///
    /// The last point is exactly `b`. A single point mesh is `[a]`.
    pub fn uniform(a: f64, b: f64, n: usize) -> Result<Self> {
        if n == 0 {
            return Err(ModalError::InvalidMesh("mesh size must be >= 1".to_string()));
        }
        if n == 1 {
            return Mesh::from_points(vec![a]);
        }
        let d = (b - a) / (n - 1) as f64;
        let mut points: Vec<f64> = (0..n).map(|i| a + i as f64 * d).collect();
        points[n - 1] = b;
        Mesh::from_points(points)
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false: meshes hold at least one point.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The coordinates.
    pub fn points(&self) -> &[f64] {
        &self.points
    }

    /// First coordinate.
    pub fn first(&self) -> f64 {
        self.points[0]
    }

    /// Last coordinate.
    pub fn last(&self) -> f64 {
        self.points[self.points.len() - 1]
    }

    /// True when `coord` lies within `[first, last]`.
    pub fn contains(&self, coord: f64) -> bool {
        coord >= self.first() && coord <= self.last()
    }

    /// Clamp `coord` into `[first, last]`.
    pub fn clamp(&self, coord: f64) -> f64 {
        coord.max(self.first()).min(self.last())
    }

    /// Locate the interval containing `coord`.
    ///
    /// Returns `(i, t)` such that the coordinate is
    /// `points[i] + t * (points[i + 1] - points[i])` with `t` in `[0, 1]`.
    /// For a single point mesh the result is `(0, 0.0)`. `axis` is only used
    /// for error reporting.
    ///
    /// # Errors
    /// Returns `OutOfRange` if `coord` is outside `[first, last]` or NaN.
    pub fn bracket(&self, coord: f64, axis: usize) -> Result<(usize, f64)> {
        if !self.contains(coord) {
            return Err(ModalError::OutOfRange {
                axis,
                coord,
                lower: self.first(),
                upper: self.last(),
            });
        }
        let n = self.points.len();
        if n == 1 {
            return Ok((0, 0.0));
        }
        // partition_point gives the first index with points[idx] > coord
        let upper = self.points.partition_point(|&p| p <= coord);
        let i = upper.saturating_sub(1).min(n - 2);
        let span = self.points[i + 1] - self.points[i];
        let t = ((coord - self.points[i]) / span).clamp(0.0, 1.0);
        Ok((i, t))
    }

    /// Every `step`-th point starting from the first: `ceil(n / step)` points.
    pub fn decimate(&self, step: usize) -> Result<Self> {
        if step == 0 {
            return Err(ModalError::Configuration(
                "output step must be >= 1".to_string(),
            ));
        }
        Mesh::from_points(self.points.iter().step_by(step).copied().collect())
    }
}

/// Number of elements kept when taking every `step`-th of `n` elements.
pub fn decimated_len(n: usize, step: usize) -> usize {
    n.div_ceil(step)
}
