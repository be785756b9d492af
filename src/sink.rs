// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use num_complex::Complex64;

use crate::error::{ModalError, Result};

/// Consumer of solution rows.
///
/// Rows arrive one at a time, in strictly increasing `index` order, from a
/// single thread. Implementations need not be thread-safe.
pub trait RowSink {
    /// Accept row `index` (position along the marching axis).
    fn accept(&mut self, index: usize, row: &[Complex64]) -> Result<()>;
}

impl<F> RowSink for F
where
    F: FnMut(usize, &[Complex64]) -> Result<()>,
{
    fn accept(&mut self, index: usize, row: &[Complex64]) -> Result<()> {
        self(index, row)
    }
}

/// Forwards every `step`-th row (0, step, 2·step, ...) to an inner sink and
/// rejects out-of-order delivery.
pub struct StridedSink<'a> {
    step: usize,
    expected: usize,
    inner: &'a mut dyn RowSink,
}

impl<'a> StridedSink<'a> {
    /// Wrap `inner`. `step` must be at least 1.
    pub fn new(step: usize, inner: &'a mut dyn RowSink) -> Result<Self> {
        if step == 0 {
            return Err(ModalError::Configuration(
                "output step must be >= 1".to_string(),
            ));
        }
        Ok(StridedSink {
            step,
            expected: 0,
            inner,
        })
    }

    /// Number of rows received so far.
    pub fn received(&self) -> usize {
        self.expected
    }
}

impl RowSink for StridedSink<'_> {
    fn accept(&mut self, index: usize, row: &[Complex64]) -> Result<()> {
        if index != self.expected {
            return Err(ModalError::RowOrder {
                expected: self.expected,
                got: index,
            });
        }
        self.expected += 1;
        if index % self.step == 0 {
            self.inner.accept(index, row)?;
        }
        Ok(())
    }
}

/// Keeps every row it receives in memory.
#[derive(Debug, Default, Clone)]
pub struct RowCollector {
    /// Received `(index, row)` pairs in arrival order.
    pub rows: Vec<(usize, Vec<Complex64>)>,
}

impl RowSink for RowCollector {
    fn accept(&mut self, index: usize, row: &[Complex64]) -> Result<()> {
        self.rows.push((index, row.to_vec()));
        Ok(())
    }
}
