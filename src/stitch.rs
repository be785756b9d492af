// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Ragged-to-dense stitching of per-point mode lists.
//!
//! The mode solver returns a different number of trapped modes at different
//! grid points, but interpolation needs every layer defined everywhere. The
//! stitcher receives the per-point lists in sweep order (row by row, position
//! by position) and fills the gaps:
//!
//! 1. values `0..n` of a point go straight into layers `0..n`;
//! 2. when `n` exceeds the previous point's count `m`, layers `m..n` of every
//!    earlier point in the row take this point's values (back-fill);
//! 3. when `n` is below the row's current width, layers `n..width` are carried
//!    forward from the preceding point;
//! 4. `m` becomes `n`, and resets to zero at the start of each row.
//!
//! Rows whose width stays below the global layer count get the missing layers
//! from the nearest preceding row that has them, or the nearest following row
//! when none precedes. This is a structural policy, not physics.

use crate::error::{ModalError, Result};

/// Arena of per-layer arrays indexed by grid position, filled by
/// [`push`](Self::push) in sweep order.
#[derive(Debug, Clone)]
pub struct RaggedStitcher<T> {
    rows: usize,
    row_len: usize,
    layers: Vec<Vec<Option<T>>>,
    row_widths: Vec<usize>,
    row: usize,
    position: usize,
    previous: usize,
}

impl<T: Copy> RaggedStitcher<T> {
    /// Create an arena for `rows` rows of `row_len` points each. A 1D sweep
    /// is a single row.
    pub fn new(rows: usize, row_len: usize) -> Self {
        RaggedStitcher {
            rows,
            row_len,
            layers: Vec::new(),
            row_widths: vec![0; rows],
            row: 0,
            position: 0,
            previous: 0,
        }
    }

    /// Number of layers allocated so far (the maximum count seen).
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Number of points pushed so far.
    pub fn pushed(&self) -> usize {
        self.row * self.row_len + self.position
    }

    /// Record the values of the next point in sweep order.
    ///
    /// # Errors
    /// Returns `StructuralInconsistency` if the arena is already full, or if a
    /// shrinking mode count would need a predecessor at row position zero.
    pub fn push(&mut self, values: &[T]) -> Result<()> {
        if self.row >= self.rows {
            return Err(ModalError::StructuralInconsistency {
                row: self.row,
                position: self.position,
                reason: format!(
                    "sweep already holds {} points",
                    self.rows * self.row_len
                ),
            });
        }

        let total = self.rows * self.row_len;
        let n = values.len();
        let base = self.row * self.row_len;
        let j = self.position;
        let idx = base + j;

        while self.layers.len() < n {
            self.layers.push(vec![None; total]);
        }

        for (k, &v) in values.iter().enumerate() {
            self.layers[k][idx] = Some(v);
        }

        let m = self.previous;
        if n > m {
            for (k, &v) in values.iter().enumerate().skip(m) {
                for cell in &mut self.layers[k][base..idx] {
                    *cell = Some(v);
                }
            }
        }

        let width = self.row_widths[self.row];
        if n < width {
            // Unreachable while `previous` resets per row: width is 0 at j == 0.
            if j == 0 {
                return Err(ModalError::StructuralInconsistency {
                    row: self.row,
                    position: j,
                    reason: format!(
                        "{} modes after a row width of {} with no preceding point",
                        n, width
                    ),
                });
            }
            for layer in &mut self.layers[n..width] {
                layer[idx] = layer[idx - 1];
            }
        }

        self.row_widths[self.row] = width.max(n);
        self.previous = n;
        self.position += 1;
        if self.position == self.row_len {
            self.position = 0;
            self.row += 1;
            self.previous = 0;
        }
        Ok(())
    }

    /// Close the sweep and return dense row-major layers.
    ///
    /// # Errors
    /// Returns `StructuralInconsistency` if fewer points were pushed than the
    /// arena holds, or if any cell is still empty after the cross-row fill.
    pub fn finish(mut self) -> Result<Vec<Vec<T>>> {
        if self.pushed() != self.rows * self.row_len {
            return Err(ModalError::StructuralInconsistency {
                row: self.row,
                position: self.position,
                reason: format!(
                    "sweep ended after {} of {} points",
                    self.pushed(),
                    self.rows * self.row_len
                ),
            });
        }

        let row_len = self.row_len;
        for (k, layer) in self.layers.iter_mut().enumerate() {
            for r in 0..self.rows {
                if self.row_widths[r] > k {
                    continue;
                }
                let donor = (0..r)
                    .rev()
                    .chain(r + 1..self.rows)
                    .find(|&d| self.row_widths[d] > k);
                if let Some(d) = donor {
                    layer.copy_within(d * row_len..(d + 1) * row_len, r * row_len);
                }
            }
        }

        let mut dense = Vec::with_capacity(self.layers.len());
        for layer in self.layers {
            let mut values = Vec::with_capacity(layer.len());
            for (flat, cell) in layer.into_iter().enumerate() {
                match cell {
                    Some(v) => values.push(v),
                    None => {
                        return Err(ModalError::StructuralInconsistency {
                            row: flat / row_len.max(1),
                            position: flat % row_len.max(1),
                            reason: "layer has no value after stitching".to_string(),
                        })
                    }
                }
            }
            dense.push(values);
        }
        Ok(dense)
    }
}
