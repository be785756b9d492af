// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt::Debug;
use std::ops::{Add, Mul, Sub};

use num_complex::Complex64;

/// Scalar kinds a modal layer can hold.
///
/// Implemented for `f64` (real wavenumbers, amplitudes, depths) and
/// `Complex64` (attenuated wavenumbers). Interpolation only needs linear
/// combinations with real weights, so the bound set stays small.
pub trait ModalValue:
    Copy
    + Send
    + Sync
    + Debug
    + PartialEq
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<f64, Output = Self>
    + 'static
{
    /// Number of `f64` components written per value (1 real, 2 complex).
    const COMPONENTS: usize;

    /// Additive identity.
    fn zero() -> Self;

    /// Build from a real number.
    fn from_real(re: f64) -> Self;

    /// Build from serialized components (`re` or `re, im`).
    fn from_components(parts: &[f64]) -> Self;

    /// Real part.
    fn re(&self) -> f64;

    /// Widen to a complex number.
    fn to_complex(&self) -> Complex64;

    /// Append the serialized components.
    fn push_components(&self, out: &mut Vec<f64>);
}

impl ModalValue for f64 {
    const COMPONENTS: usize = 1;

    fn zero() -> Self {
        0.0
    }

    fn from_real(re: f64) -> Self {
        re
    }

    fn from_components(parts: &[f64]) -> Self {
        parts[0]
    }

    fn re(&self) -> f64 {
        *self
    }

    fn to_complex(&self) -> Complex64 {
        Complex64::new(*self, 0.0)
    }

    fn push_components(&self, out: &mut Vec<f64>) {
        out.push(*self);
    }
}

impl ModalValue for Complex64 {
    const COMPONENTS: usize = 2;

    fn zero() -> Self {
        Complex64::new(0.0, 0.0)
    }

    fn from_real(re: f64) -> Self {
        Complex64::new(re, 0.0)
    }

    fn from_components(parts: &[f64]) -> Self {
        Complex64::new(parts[0], parts[1])
    }

    fn re(&self) -> f64 {
        self.re
    }

    fn to_complex(&self) -> Complex64 {
        *self
    }

    fn push_components(&self, out: &mut Vec<f64>) {
        out.push(self.re);
        out.push(self.im);
    }
}

/// Flatten a slice of values into interleaved `f64` components.
pub fn flatten<V: ModalValue>(values: &[V]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len() * V::COMPONENTS);
    for v in values {
        v.push_components(&mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complex_flatten_interleaves() {
        let values = [Complex64::new(1.0, -2.0), Complex64::new(3.5, 0.25)];
        assert_eq!(flatten(&values), vec![1.0, -2.0, 3.5, 0.25]);
    }

    #[test]
    fn real_components_roundtrip() {
        let v = <f64 as ModalValue>::from_components(&[4.25]);
        assert_eq!(v, 4.25);
        assert_eq!(flatten(&[v]), vec![4.25]);
    }

    #[test]
    fn complex_real_part() {
        let v = Complex64::new(0.7, 0.01);
        assert_eq!(ModalValue::re(&v), 0.7);
        assert_eq!(<Complex64 as ModalValue>::from_real(2.0), Complex64::new(2.0, 0.0));
    }
}
