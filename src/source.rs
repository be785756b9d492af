// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use log::debug;
use num_complex::Complex64;

use crate::error::{ModalError, Result};
use crate::field::Field1d;
use crate::mesh::Mesh;
use crate::rays::{superpose, Crossing, HamiltonianTracer, LayerIndex, RayTracer, RefractiveIndex};

/// Initial-condition model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Greene's wide-angle point-source starter.
    Green,
    /// Gaussian starter.
    Gauss,
    /// Straight-ray superposition in a homogeneous medium.
    RaySimple,
    /// Traced-ray superposition through the transverse wavenumber profile.
    Ray,
}

impl FromStr for SourceKind {
    type Err = ModalError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "green" => Ok(SourceKind::Green),
            "gauss" => Ok(SourceKind::Gauss),
            "ray_simple" => Ok(SourceKind::RaySimple),
            "ray" => Ok(SourceKind::Ray),
            other => Err(ModalError::Configuration(format!(
                "unknown initial conditions type: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Green => "green",
            SourceKind::Gauss => "gauss",
            SourceKind::RaySimple => "ray_simple",
            SourceKind::Ray => "ray",
        };
        f.write_str(name)
    }
}

/// Reference wavenumbers and mode shapes at the source depth, one entry per
/// mode.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceModes {
    k0: Vec<f64>,
    phi_s: Vec<f64>,
}

impl SourceModes {
    /// Pair the two sequences.
    ///
    /// # Errors
    /// Returns a configuration error when the lengths differ or a wavenumber
    /// is not positive.
    pub fn new(k0: Vec<f64>, phi_s: Vec<f64>) -> Result<Self> {
        if k0.len() != phi_s.len() {
            return Err(ModalError::Configuration(format!(
                "{} reference wavenumbers but {} source amplitudes",
                k0.len(),
                phi_s.len()
            )));
        }
        if let Some(k) = k0.iter().find(|k| !(k.is_finite() && **k > 0.0)) {
            return Err(ModalError::Configuration(format!(
                "reference wavenumber must be positive, got {}",
                k
            )));
        }
        Ok(SourceModes { k0, phi_s })
    }

    /// Reference wavenumbers.
    pub fn k0(&self) -> &[f64] {
        &self.k0
    }

    /// Mode shapes at the source depth.
    pub fn phi_s(&self) -> &[f64] {
        &self.phi_s
    }

    /// Number of modes.
    pub fn len(&self) -> usize {
        self.k0.len()
    }

    /// True when no mode is present.
    pub fn is_empty(&self) -> bool {
        self.k0.is_empty()
    }
}

/// Per-mode complex amplitude profiles over the transverse mesh at the start
/// of the marching axis.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialWavefield {
    y: Mesh,
    modes: Vec<Vec<Complex64>>,
}

impl InitialWavefield {
    /// Wrap profiles sampled on `y`.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if a profile length differs from the mesh.
    pub fn new(y: Mesh, modes: Vec<Vec<Complex64>>) -> Result<Self> {
        if let Some(bad) = modes.iter().find(|m| m.len() != y.len()) {
            return Err(ModalError::ShapeMismatch {
                expected: vec![y.len()],
                got: vec![bad.len()],
            });
        }
        Ok(InitialWavefield { y, modes })
    }

    /// Transverse mesh.
    pub fn y(&self) -> &Mesh {
        &self.y
    }

    /// Number of modal profiles.
    pub fn num_modes(&self) -> usize {
        self.modes.len()
    }

    /// All profiles.
    pub fn modes(&self) -> &[Vec<Complex64>] {
        &self.modes
    }

    /// Profile of mode `j`.
    pub fn mode(&self, j: usize) -> Option<&[Complex64]> {
        self.modes.get(j).map(|m| &m[..])
    }
}

/// Synthesizes an [`InitialWavefield`] for one of the [`SourceKind`]s.
///
/// The point source sits at `(0, y_s)`; the wavefield is produced on the
/// line `x = x0`.
pub struct InitialConditionBuilder<'a> {
    kind: SourceKind,
    source: &'a SourceModes,
    y: Mesh,
    y_s: f64,
    x0: f64,
    angles: Option<Mesh>,
    params: Option<Mesh>,
    tracer: HamiltonianTracer,
}

impl<'a> InitialConditionBuilder<'a> {
    /// Create a builder producing profiles on `y` for a source at `y_s`.
    pub fn new(kind: SourceKind, source: &'a SourceModes, y: Mesh, y_s: f64) -> Self {
        InitialConditionBuilder {
            kind,
            source,
            y,
            y_s,
            x0: 0.0,
            angles: None,
            params: None,
            tracer: HamiltonianTracer::new(),
        }
    }

    /// Selected kind.
    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Source modes the wavefield is built from.
    pub fn source(&self) -> &'a SourceModes {
        self.source
    }

    /// Marching-axis position of the starting line (builder method).
    pub fn with_x0(mut self, x0: f64) -> Self {
        self.x0 = x0;
        self
    }

    /// Ray launch angles (builder method).
    pub fn with_angles(mut self, angles: Mesh) -> Self {
        self.angles = Some(angles);
        self
    }

    /// Natural-parameter samples for traced rays (builder method).
    pub fn with_natural_parameters(mut self, params: Mesh) -> Self {
        self.params = Some(params);
        self
    }

    /// Ray integrator for [`SourceKind::Ray`] (builder method).
    pub fn with_tracer(mut self, tracer: HamiltonianTracer) -> Self {
        self.tracer = tracer;
        self
    }

    /// Build the wavefield.
    ///
    /// `transverse` holds real wavenumber layers as functions of `y`; only
    /// [`SourceKind::Ray`] reads it, and it limits the mode count to its
    /// layer count.
    ///
    /// # Errors
    /// Returns a configuration error when a mesh or field needed by the
    /// selected kind is missing, or when a ray kind has `x0 <= 0`.
    pub fn build(&self, transverse: Option<&Field1d<f64>>) -> Result<InitialWavefield> {
        let modes = match self.kind {
            SourceKind::Green => self.kernel(|r2, w| (1.4467 - 0.4201 * r2 / w) * (-r2 / (3.0512 * w)).exp()),
            SourceKind::Gauss => self.kernel(|r2, w| (-r2 / (2.0 * w)).exp()),
            SourceKind::RaySimple => self.simple_rays()?,
            SourceKind::Ray => {
                let field = transverse.ok_or_else(|| {
                    ModalError::Configuration(
                        "ray initial conditions need a transverse wavenumber field".to_string(),
                    )
                })?;
                self.traced_rays(field)?
            }
        };
        debug!("{} initial conditions: {} modes", self.kind, modes.len());
        InitialWavefield::new(self.y.clone(), modes)
    }

    /// Closed-form starters with amplitude `phi_s / (2 sqrt(pi))` and width
    /// `w = 1 / k0^2`; `shape` receives `(y - y_s)^2` and `w`.
    fn kernel(&self, shape: impl Fn(f64, f64) -> f64) -> Vec<Vec<Complex64>> {
        self.source
            .k0()
            .iter()
            .zip(self.source.phi_s())
            .map(|(&k0, &phi)| {
                let a = phi / (2.0 * PI.sqrt());
                let w = 1.0 / (k0 * k0);
                let scale = a * w.powf(-0.25);
                self.y
                    .points()
                    .iter()
                    .map(|&y| {
                        let r = y - self.y_s;
                        Complex64::new(scale * shape(r * r, w), 0.0)
                    })
                    .collect()
            })
            .collect()
    }

    fn ray_meshes(&self, need_params: bool) -> Result<(&Mesh, Option<&Mesh>)> {
        if !(self.x0 > 0.0) {
            return Err(ModalError::Configuration(format!(
                "ray initial conditions need x0 > 0, got {}",
                self.x0
            )));
        }
        let angles = self.angles.as_ref().ok_or_else(|| {
            ModalError::Configuration("ray initial conditions need an angle mesh".to_string())
        })?;
        if need_params && self.params.is_none() {
            return Err(ModalError::Configuration(
                "ray initial conditions need a natural parameter mesh".to_string(),
            ));
        }
        Ok((angles, self.params.as_ref()))
    }

    fn simple_rays(&self) -> Result<Vec<Vec<Complex64>>> {
        let (angles, _) = self.ray_meshes(false)?;
        let x0 = self.x0;
        Ok(self
            .source
            .k0()
            .iter()
            .zip(self.source.phi_s())
            .map(|(&k0, &phi)| {
                let crossings: Vec<Option<Crossing>> = angles
                    .points()
                    .iter()
                    .map(|&a| {
                        (a.cos() > 0.0).then(|| Crossing {
                            y: self.y_s + x0 * a.tan(),
                            theta: a,
                            phase: k0 * x0 / a.cos(),
                        })
                    })
                    .collect();
                self.with_carrier(superpose(&crossings, angles, &self.y, phi, k0), k0)
            })
            .collect())
    }

    fn traced_rays(&self, field: &Field1d<f64>) -> Result<Vec<Vec<Complex64>>> {
        let (angles, params) = self.ray_meshes(true)?;
        let params = params.ok_or_else(|| {
            ModalError::Configuration("ray initial conditions need a natural parameter mesh".to_string())
        })?;
        let count = self.source.len().min(field.num_layers());
        let mut modes = Vec::with_capacity(count);
        for j in 0..count {
            let medium = LayerIndex::new(field, j)?;
            let fan = self.tracer.trace([0.0, self.y_s], angles, params, &medium)?;
            let crossings = fan.crossings(self.x0);
            let reached = crossings.iter().filter(|c| c.is_some()).count();
            if reached < crossings.len() {
                debug!(
                    "mode {}: {} of {} rays reach x = {}",
                    j,
                    reached,
                    crossings.len(),
                    self.x0
                );
            }
            let k_s = medium.wavenumber(0.0, self.y_s);
            let values = superpose(&crossings, angles, &self.y, self.source.phi_s()[j], k_s);
            modes.push(self.with_carrier(values, self.source.k0()[j]));
        }
        Ok(modes)
    }

    /// Remove the reference carrier `exp(i k0 x0)`.
    fn with_carrier(&self, mut values: Vec<Complex64>, k0: f64) -> Vec<Complex64> {
        let carrier = Complex64::from_polar(1.0, -k0 * self.x0);
        for v in &mut values {
            *v *= carrier;
        }
        values
    }
}
