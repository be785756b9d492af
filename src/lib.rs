// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Modal parabolic-equation solver for shallow-water acoustics.
//!
//! A mode solver is swept over a 1D or 2D mesh and its variable-length
//! results are stitched into dense, interpolable wavenumber and amplitude
//! fields. A one-shot pipeline then builds the initial wavefield, runs a
//! stepping engine that may compute rows in parallel, and streams the rows to
//! disk in order. Rays can be traced through the same fields.

#![warn(missing_docs)]

/// JSON job description.
pub mod config;
/// Stepping engines.
pub mod engine;
/// Error types for the library.
pub mod error;
/// Interpolated multi-layer fields on 1D and 2D meshes.
pub mod field;
/// Output writers and table and modal field readers.
pub mod io;
/// The command-line jobs.
pub mod jobs;
/// Water depth tables.
pub mod medium;
/// Coordinate meshes.
pub mod mesh;
/// Mode solvers and modal fields.
pub mod modes;
/// One-shot pipeline stages.
pub mod pipeline;
/// Progress bars.
pub mod progress;
/// Horizontal ray tracing.
pub mod rays;
/// Ordered, bounded delivery of rows computed in parallel.
pub mod scheduler;
/// Row consumers.
pub mod sink;
/// Initial wavefields.
pub mod source;
/// Ragged-to-dense stitching.
pub mod stitch;
/// Real and complex modal values.
pub mod value;

pub use crate::config::JobConfig;
pub use crate::engine::{AdiabaticEngine, EngineInput, StepParams, SteppingEngine};
pub use crate::error::{ModalError, Result};
pub use crate::field::{Field1d, Field2d, InterpolatedField};
pub use crate::mesh::Mesh;
pub use crate::modes::{IdealWaveguide, ModalField, ModalFieldBuilder, ModalGeometry, ModeSolver};
pub use crate::pipeline::Pipeline;
pub use crate::scheduler::OrderedDelivery;
pub use crate::sink::RowSink;
pub use crate::source::{InitialConditionBuilder, InitialWavefield, SourceKind, SourceModes};
pub use crate::stitch::RaggedStitcher;
pub use crate::value::ModalValue;
