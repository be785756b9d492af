// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{ModalError, Result};
use crate::mesh::Mesh;
use crate::value::ModalValue;

/// A stack of dense layers sampled on a 1D or 2D mesh, with piecewise-linear
/// (1D) or bilinear (2D) lookup.
///
/// Layers are stored flat in row-major order: for a 2D field the second axis
/// varies fastest. The generic parameter `N` is the number of axes (1 or 2).
/// The only mutation after construction is [`truncate`](Self::truncate).
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedField<V, const N: usize> {
    axes: [Mesh; N],
    shape: [usize; N],
    strides: [usize; N],
    layers: Vec<Box<[V]>>,
}

/// Field over a single (transverse) axis.
pub type Field1d<V> = InterpolatedField<V, 1>;
/// Field over the (x, y) plane.
pub type Field2d<V> = InterpolatedField<V, 2>;

impl<V: ModalValue, const N: usize> InterpolatedField<V, N> {
    /// Create a field from its axes and row-major layers.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if any layer length differs from the product
    /// of the axis lengths.
    pub fn new(axes: [Mesh; N], layers: Vec<Vec<V>>) -> Result<Self> {
        assert!(N == 1 || N == 2, "InterpolatedField only supports N=1 or N=2");

        let shape: [usize; N] = std::array::from_fn(|d| axes[d].len());
        let mut strides = [0usize; N];
        strides[N - 1] = 1;
        for d in (0..N - 1).rev() {
            strides[d] = strides[d + 1] * shape[d + 1];
        }

        let num_points: usize = shape.iter().product();
        for layer in &layers {
            if layer.len() != num_points {
                return Err(ModalError::ShapeMismatch {
                    expected: shape.to_vec(),
                    got: vec![layer.len()],
                });
            }
        }

        Ok(InterpolatedField {
            axes,
            shape,
            strides,
            layers: layers.into_iter().map(Vec::into_boxed_slice).collect(),
        })
    }

    /// The mesh axes.
    pub fn axes(&self) -> &[Mesh; N] {
        &self.axes
    }

    /// One mesh axis.
    pub fn axis(&self, d: usize) -> &Mesh {
        &self.axes[d]
    }

    /// Number of samples along each axis.
    pub fn shape(&self) -> [usize; N] {
        self.shape
    }

    /// Number of grid points per layer.
    pub fn num_points(&self) -> usize {
        self.shape.iter().product()
    }

    /// Number of layers.
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Row-major samples of one layer.
    pub fn layer(&self, layer: usize) -> Result<&[V]> {
        self.layers
            .get(layer)
            .map(|l| &l[..])
            .ok_or(ModalError::LayerOutOfRange {
                layer,
                count: self.layers.len(),
            })
    }

    /// Iterate over the layers in order.
    pub fn layers(&self) -> impl Iterator<Item = &[V]> {
        self.layers.iter().map(|l| &l[..])
    }

    /// Stored sample of `layer` at grid index `idx`. Panics on a bad index.
    pub fn get(&self, layer: usize, idx: [usize; N]) -> V {
        self.layers[layer][self.nd_to_flat(idx)]
    }

    /// Convert an N-dimensional index to a flat index.
    pub fn nd_to_flat(&self, idx: [usize; N]) -> usize {
        idx.iter().zip(self.strides.iter()).map(|(i, s)| i * s).sum()
    }

    /// Convert a flat index to an N-dimensional index.
    pub fn flat_to_nd(&self, flat: usize) -> [usize; N] {
        let mut remainder = flat;
        std::array::from_fn(|d| {
            let i = remainder / self.strides[d];
            remainder %= self.strides[d];
            i
        })
    }

    /// Discard every layer with index `>= keep`. Keeping more layers than
    /// exist is a no-op.
    pub fn truncate(&mut self, keep: usize) {
        self.layers.truncate(keep);
    }

    /// Interpolated value of one layer at `coord`.
    ///
    /// # Errors
    /// Returns `OutOfRange` when any coordinate is outside its mesh bounds
    /// (bounds themselves are inside), `LayerOutOfRange` for a bad layer.
    pub fn layer_value_at(&self, layer: usize, coord: [f64; N]) -> Result<V> {
        let data = self.layer(layer)?;
        let brackets = self.brackets(coord)?;
        Ok(self.blend(data, &brackets))
    }

    /// Interpolated values of every layer at `coord`.
    ///
    /// # Errors
    /// Returns `OutOfRange` when any coordinate is outside its mesh bounds.
    pub fn value_at(&self, coord: [f64; N]) -> Result<Vec<V>> {
        let brackets = self.brackets(coord)?;
        Ok(self.layers.iter().map(|l| self.blend(l, &brackets)).collect())
    }

    /// Interpolated values with every coordinate clamped into its mesh
    /// bounds first, so points outside take the nearest edge value.
    pub fn value_at_clamped(&self, coord: [f64; N]) -> Vec<V> {
        let clamped: [f64; N] = std::array::from_fn(|d| self.axes[d].clamp(coord[d]));
        // clamped coordinates are always in range
        match self.brackets(clamped) {
            Ok(brackets) => self.layers.iter().map(|l| self.blend(l, &brackets)).collect(),
            Err(_) => vec![V::zero(); self.layers.len()],
        }
    }

    /// Clamped lookup of a single layer.
    pub fn layer_value_at_clamped(&self, layer: usize, coord: [f64; N]) -> Result<V> {
        let data = self.layer(layer)?;
        let clamped: [f64; N] = std::array::from_fn(|d| self.axes[d].clamp(coord[d]));
        let brackets = self.brackets(clamped)?;
        Ok(self.blend(data, &brackets))
    }

    /// Apply `f` to every sample, keeping axes and layer count.
    pub fn map<W: ModalValue>(&self, f: impl Fn(V) -> W) -> InterpolatedField<W, N> {
        InterpolatedField {
            axes: self.axes.clone(),
            shape: self.shape,
            strides: self.strides,
            layers: self
                .layers
                .iter()
                .map(|l| l.iter().map(|&v| f(v)).collect())
                .collect(),
        }
    }

    /// Real projection: a real field with identical axes and layer count.
    pub fn to_real(&self) -> InterpolatedField<f64, N> {
        self.map(|v| v.re())
    }

    fn brackets(&self, coord: [f64; N]) -> Result<[(usize, f64); N]> {
        let mut out = [(0usize, 0.0f64); N];
        for d in 0..N {
            out[d] = self.axes[d].bracket(coord[d], d)?;
        }
        Ok(out)
    }

    fn blend(&self, data: &[V], brackets: &[(usize, f64); N]) -> V {
        let mut acc = V::zero();
        for corner in 0..(1usize << N) {
            let mut weight = 1.0;
            let mut flat = 0;
            for d in 0..N {
                let (i, t) = brackets[d];
                let upper = (corner >> d) & 1 == 1;
                weight *= if upper { t } else { 1.0 - t };
                flat += (i + usize::from(upper)) * self.strides[d];
            }
            // zero-weight corners may lie past the last sample
            if weight != 0.0 {
                acc = acc + data[flat] * weight;
            }
        }
        acc
    }
}

impl<V: ModalValue> InterpolatedField<V, 2> {
    /// The 1D field along the second axis at first-axis index `i`.
    pub fn row(&self, i: usize) -> Result<Field1d<V>> {
        if i >= self.shape[0] {
            return Err(ModalError::OutOfRange {
                axis: 0,
                coord: i as f64,
                lower: 0.0,
                upper: (self.shape[0] - 1) as f64,
            });
        }
        let ny = self.shape[1];
        let layers = self
            .layers
            .iter()
            .map(|l| l[i * ny..(i + 1) * ny].to_vec())
            .collect();
        InterpolatedField::new([self.axes[1].clone()], layers)
    }

    /// Integral of one layer along the first axis from `a` to `b` at fixed
    /// second-axis coordinate `y`.
    ///
    /// The interpolant is piecewise linear in x between mesh nodes, so the
    /// trapezoid rule over `a`, the interior nodes, and `b` is exact.
    pub fn integrate_first_axis(&self, layer: usize, y: f64, a: f64, b: f64) -> Result<V> {
        if b < a {
            return Ok(self.integrate_first_axis(layer, y, b, a)? * -1.0);
        }
        let mut nodes = vec![a];
        nodes.extend(self.axes[0].points().iter().copied().filter(|&x| x > a && x < b));
        nodes.push(b);

        let mut total = V::zero();
        let mut prev = self.layer_value_at(layer, [a, y])?;
        for w in nodes.windows(2) {
            let next = self.layer_value_at(layer, [w[1], y])?;
            total = total + (prev + next) * (0.5 * (w[1] - w[0]));
            prev = next;
        }
        Ok(total)
    }
}
