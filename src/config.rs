// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! JSON job description.
//!
//! Keys are flat, one per parameter. Every key has a default so a minimal
//! file only needs to name what differs from it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ModalError, Result};
use crate::mesh::Mesh;
use crate::modes::BottomCondition;
use crate::source::SourceKind;

/// Where a two-axis table comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TableSource {
    /// Inline values: `values[i][j]` belongs to `(x[i], y[j])`.
    Values {
        /// First-axis coordinates.
        x: Vec<f64>,
        /// Second-axis coordinates.
        y: Vec<f64>,
        /// Values, one inner vector per `x`.
        values: Vec<Vec<f64>>,
    },
    /// Text table file.
    TextFile {
        /// Path to the file.
        path: PathBuf,
    },
    /// Binary table file.
    BinaryFile {
        /// Path to the file.
        path: PathBuf,
    },
}

impl TableSource {
    /// A single-point table, which clamped lookups turn into a constant.
    pub fn constant(value: f64) -> Self {
        TableSource::Values {
            x: vec![0.0],
            y: vec![0.0],
            values: vec![vec![value]],
        }
    }
}

/// A modal field previously written by the `modes` job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModesFile {
    /// Path to the file.
    pub path: PathBuf,
    /// Binary encoding.
    #[serde(default)]
    pub binary: bool,
}

/// Parameter groups printed by [`JobConfig::summary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamGroup {
    /// Mode solver and modal mesh.
    Modes,
    /// Marching mesh and engine.
    Solver,
    /// Initial conditions.
    Initial,
    /// Ray tracing meshes.
    Rays,
}

/// Complete job description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Fraction of trapped modes to keep, when in `(0, 1)`.
    #[serde(default = "default_mode_subset")]
    pub mode_subset: f64,
    /// Points per meter for the vertical discretization of the mode solver.
    #[serde(default = "default_ppm")]
    pub ppm: u32,
    /// Richardson extrapolation order of the mode solver.
    #[serde(default = "default_ord_rich", alias = "ordRich")]
    pub ord_rich: u32,
    /// Source frequency (Hz).
    #[serde(default = "default_frequency")]
    pub f: f64,
    /// Water sound speed (m/s).
    #[serde(default = "default_sound_speed")]
    pub sound_speed: f64,
    /// Bottom boundary condition.
    #[serde(default)]
    pub bottom: BottomCondition,
    /// Imaginary wavenumber scale for complex modes.
    #[serde(default)]
    pub attenuation: f64,
    /// Source depth (m).
    #[serde(default = "default_depth")]
    pub z_s: f64,
    /// Receiver depth (m).
    #[serde(default = "default_depth")]
    pub z_r: f64,
    /// Use complex wavenumbers.
    #[serde(default)]
    pub complex_modes: bool,
    /// Treat the medium as range independent (1D modal field).
    #[serde(default)]
    pub const_modes: bool,
    /// Upper bound on the number of modes carried into the solution.
    #[serde(default)]
    pub max_mode: Option<usize>,
    /// Modal mesh size along x.
    #[serde(default)]
    pub mnx: Option<usize>,
    /// Modal mesh size along y.
    #[serde(default)]
    pub mny: Option<usize>,
    /// Water depth table.
    #[serde(default = "default_bathymetry")]
    pub bathymetry: TableSource,
    /// Precomputed modal field, used instead of the mode solver.
    #[serde(default)]
    pub modes: Option<ModesFile>,
    /// Reference wavenumbers; solved at the source when absent.
    #[serde(default)]
    pub k0: Option<Vec<f64>>,
    /// Mode shapes at the source depth; solved at the source when absent.
    #[serde(default)]
    pub phi_s: Option<Vec<f64>>,
    /// Start of the marching axis.
    #[serde(default = "default_x0")]
    pub x0: f64,
    /// End of the marching axis.
    #[serde(default = "default_x1")]
    pub x1: f64,
    /// Number of marching steps.
    #[serde(default = "default_nx")]
    pub nx: usize,
    /// Lower transverse bound.
    #[serde(default = "default_y0")]
    pub y0: f64,
    /// Upper transverse bound.
    #[serde(default = "default_y1")]
    pub y1: f64,
    /// Number of transverse points.
    #[serde(default = "default_ny")]
    pub ny: usize,
    /// Transverse source position.
    #[serde(default)]
    pub y_s: f64,
    /// Absorbing border width in points.
    #[serde(default)]
    pub border_width: Option<usize>,
    /// History length for the border convolution, 0 meaning all of it.
    #[serde(default)]
    pub past_n: usize,
    /// Initial-condition kind.
    #[serde(default = "default_init")]
    pub init: String,
    /// First ray angle (rad).
    #[serde(default = "default_a0")]
    pub a0: f64,
    /// Last ray angle (rad).
    #[serde(default = "default_a1")]
    pub a1: f64,
    /// Number of rays.
    #[serde(default = "default_na")]
    pub na: usize,
    /// Start of the natural parameter.
    #[serde(default)]
    pub l0: f64,
    /// End of the natural parameter.
    #[serde(default = "default_l1")]
    pub l1: f64,
    /// Number of natural-parameter samples.
    #[serde(default = "default_nl")]
    pub nl: usize,
}

fn default_mode_subset() -> f64 {
    -1.0
}

fn default_ppm() -> u32 {
    2
}

fn default_ord_rich() -> u32 {
    3
}

fn default_frequency() -> f64 {
    100.0
}

fn default_sound_speed() -> f64 {
    1500.0
}

fn default_depth() -> f64 {
    30.0
}

fn default_bathymetry() -> TableSource {
    TableSource::constant(100.0)
}

fn default_x0() -> f64 {
    10.0
}

fn default_x1() -> f64 {
    5000.0
}

fn default_nx() -> usize {
    5000
}

fn default_y0() -> f64 {
    -2000.0
}

fn default_y1() -> f64 {
    2000.0
}

fn default_ny() -> usize {
    2001
}

fn default_init() -> String {
    "green".to_string()
}

fn default_a0() -> f64 {
    -std::f64::consts::FRAC_PI_4
}

fn default_a1() -> f64 {
    std::f64::consts::FRAC_PI_4
}

fn default_na() -> usize {
    201
}

fn default_l1() -> f64 {
    6000.0
}

fn default_nl() -> usize {
    6001
}

impl Default for JobConfig {
    fn default() -> Self {
        JobConfig {
            mode_subset: default_mode_subset(),
            ppm: default_ppm(),
            ord_rich: default_ord_rich(),
            f: default_frequency(),
            sound_speed: default_sound_speed(),
            bottom: BottomCondition::default(),
            attenuation: 0.0,
            z_s: default_depth(),
            z_r: default_depth(),
            complex_modes: false,
            const_modes: false,
            max_mode: None,
            mnx: None,
            mny: None,
            bathymetry: default_bathymetry(),
            modes: None,
            k0: None,
            phi_s: None,
            x0: default_x0(),
            x1: default_x1(),
            nx: default_nx(),
            y0: default_y0(),
            y1: default_y1(),
            ny: default_ny(),
            y_s: 0.0,
            border_width: None,
            past_n: 0,
            init: default_init(),
            a0: default_a0(),
            a1: default_a1(),
            na: default_na(),
            l0: 0.0,
            l1: default_l1(),
            nl: default_nl(),
        }
    }
}

impl JobConfig {
    /// Parse and validate a JSON job description.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: JobConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON job description.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check every parameter group.
    ///
    /// # Errors
    /// Returns a configuration error naming the first offending parameter.
    pub fn validate(&self) -> Result<()> {
        self.validate_modes()?;
        self.validate_solver()?;
        self.validate_source()?;
        self.validate_rays()
    }

    fn validate_modes(&self) -> Result<()> {
        if !self.f.is_finite() || self.f <= 0.0 {
            return Err(config_error(format!("f must be positive, got {}", self.f)));
        }
        if !self.sound_speed.is_finite() || self.sound_speed <= 0.0 {
            return Err(config_error(format!(
                "sound_speed must be positive, got {}",
                self.sound_speed
            )));
        }
        if !self.mode_subset.is_finite() {
            return Err(config_error("mode_subset must be finite".to_string()));
        }
        if self.z_s < 0.0 || self.z_r < 0.0 {
            return Err(config_error(format!(
                "depths must be non-negative (z_s={}, z_r={})",
                self.z_s, self.z_r
            )));
        }
        if self.mnx == Some(0) || self.mny == Some(0) {
            return Err(config_error("modal mesh sizes must be >= 1".to_string()));
        }
        if self.max_mode == Some(0) {
            return Err(config_error("max_mode must be >= 1".to_string()));
        }
        Ok(())
    }

    fn validate_solver(&self) -> Result<()> {
        check_axis("x", self.x0, self.x1, self.nx)?;
        check_axis("y", self.y0, self.y1, self.ny)
    }

    fn validate_source(&self) -> Result<()> {
        self.init.parse::<SourceKind>()?;
        match (&self.k0, &self.phi_s) {
            (Some(k0), Some(phi_s)) => {
                if k0.is_empty() || k0.len() != phi_s.len() {
                    return Err(config_error(format!(
                        "k0 and phi_s must be non-empty and equally long ({} vs {})",
                        k0.len(),
                        phi_s.len()
                    )));
                }
                if k0.iter().any(|&k| !k.is_finite() || k <= 0.0) {
                    return Err(config_error("k0 values must be positive".to_string()));
                }
                Ok(())
            }
            (None, None) => Ok(()),
            _ => Err(config_error(
                "k0 and phi_s must be given together".to_string(),
            )),
        }
    }

    fn validate_rays(&self) -> Result<()> {
        if self.na < 2 || !(self.a1 > self.a0) {
            return Err(config_error(format!(
                "angle mesh needs na >= 2 and a1 > a0 (a0={}, a1={}, na={})",
                self.a0, self.a1, self.na
            )));
        }
        if self.nl < 2 || !(self.l1 > self.l0) {
            return Err(config_error(format!(
                "natural parameter mesh needs nl >= 2 and l1 > l0 (l0={}, l1={}, nl={})",
                self.l0, self.l1, self.nl
            )));
        }
        Ok(())
    }

    /// The initial-condition kind.
    pub fn source_kind(&self) -> Result<SourceKind> {
        self.init.parse()
    }

    /// Marching-axis mesh.
    pub fn x_mesh(&self) -> Result<Mesh> {
        Mesh::uniform(self.x0, self.x1, self.nx)
    }

    /// Transverse mesh.
    pub fn y_mesh(&self) -> Result<Mesh> {
        Mesh::uniform(self.y0, self.y1, self.ny)
    }

    /// Ray launch angles.
    pub fn angle_mesh(&self) -> Result<Mesh> {
        Mesh::uniform(self.a0, self.a1, self.na)
    }

    /// Natural parameter (arc length) samples along each ray.
    pub fn parameter_mesh(&self) -> Result<Mesh> {
        Mesh::uniform(self.l0, self.l1, self.nl)
    }

    /// Human-readable parameter listing for the selected groups.
    pub fn summary(&self, groups: &[ParamGroup]) -> Vec<String> {
        let mut lines = Vec::new();
        for group in groups {
            match group {
                ParamGroup::Modes => {
                    lines.push("Modes parameters:".to_string());
                    match &self.modes {
                        Some(file) => lines.push(format!(
                            "    loaded from {} ({})",
                            file.path.display(),
                            if file.binary { "binary" } else { "text" }
                        )),
                        None => {
                            lines.push(format!("    bathymetry: {}", describe_table(&self.bathymetry)));
                            lines.push(format!(
                                "    frequency: {} Hz, sound speed: {} m/s, bottom: {:?}",
                                self.f, self.sound_speed, self.bottom
                            ));
                            lines.push(format!(
                                "    mode subset: {}, ppm: {}, Richardson order: {}",
                                self.mode_subset, self.ppm, self.ord_rich
                            ));
                            lines.push(format!("    receiver depth: {}", self.z_r));
                        }
                    }
                    lines.push(format!(
                        "    complex modes: {}, range independent: {}",
                        self.complex_modes, self.const_modes
                    ));
                    match self.max_mode {
                        Some(m) => lines.push(format!("    max mode: {}", m)),
                        None => lines.push("    max mode: all".to_string()),
                    }
                    if let (Some(mnx), Some(mny)) = (self.mnx, self.mny) {
                        lines.push(format!("    modal mesh: {} x {}", mnx, mny));
                    }
                }
                ParamGroup::Solver => {
                    lines.push("Solver parameters:".to_string());
                    lines.push(describe_mesh("x mesh", self.x0, self.x1, self.nx));
                    lines.push(describe_mesh("y mesh", self.y0, self.y1, self.ny));
                    match self.border_width {
                        Some(w) => lines.push(format!("    border width: {}", w)),
                        None => lines.push("    border width: none".to_string()),
                    }
                    if self.past_n == 0 {
                        lines.push("    past history: all".to_string());
                    } else {
                        lines.push(format!("    past history: {}", self.past_n));
                    }
                }
                ParamGroup::Initial => {
                    lines.push("Initial conditions parameters:".to_string());
                    lines.push(format!("    type: {}", self.init));
                    lines.push(format!("    source: y = {}, depth = {}", self.y_s, self.z_s));
                    if let (Some(k0), Some(phi_s)) = (&self.k0, &self.phi_s) {
                        lines.push(format!("    reference wave numbers: {:?}", k0));
                        lines.push(format!("    source modal functions: {:?}", phi_s));
                    }
                    if self.init.starts_with("ray") {
                        lines.push(describe_mesh("angle mesh", self.a0, self.a1, self.na));
                    }
                    if self.init == "ray" {
                        lines.push(describe_mesh("natural parameter mesh", self.l0, self.l1, self.nl));
                    }
                }
                ParamGroup::Rays => {
                    lines.push("Rays parameters:".to_string());
                    lines.push(format!("    start: ({}, {})", self.x0, self.y_s));
                    lines.push(describe_mesh("angle mesh", self.a0, self.a1, self.na));
                    lines.push(describe_mesh("natural parameter mesh", self.l0, self.l1, self.nl));
                }
            }
        }
        lines
    }
}

fn config_error(msg: String) -> ModalError {
    ModalError::Configuration(msg)
}

fn check_axis(name: &str, a: f64, b: f64, n: usize) -> Result<()> {
    if n == 0 {
        return Err(config_error(format!("n{} must be >= 1", name)));
    }
    if !a.is_finite() || !b.is_finite() {
        return Err(config_error(format!("{} bounds must be finite", name)));
    }
    if n > 1 && !(b > a) {
        return Err(config_error(format!(
            "{name}1 must exceed {name}0 ({name}0={}, {name}1={})",
            a, b
        )));
    }
    Ok(())
}

fn describe_mesh(title: &str, a: f64, b: f64, n: usize) -> String {
    format!("    {}: [{}, {}] with {} points", title, a, b, n)
}

fn describe_table(source: &TableSource) -> String {
    match source {
        TableSource::Values { x, y, .. } => format!("inline {} x {} table", x.len(), y.len()),
        TableSource::TextFile { path } => format!("text file {}", path.display()),
        TableSource::BinaryFile { path } => format!("binary file {}", path.display()),
    }
}
