// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! One-shot stages around a stepping engine.
//!
//! Every stage consumes itself together with the continuation that runs the
//! stages inside it, so each stage runs exactly once. Outermost to innermost:
//! output, timing, modes, initial conditions, engine. [`Pipeline::run`]
//! composes them on the calling thread.

use std::io::Write;
use std::time::{Duration, Instant};

use log::{debug, info};
use num_complex::Complex64;

use crate::engine::{EngineInput, StepParams, SteppingEngine};
use crate::error::{ModalError, Result};
use crate::io::OutputWriter;
use crate::mesh::Mesh;
use crate::modes::ModalGeometry;
use crate::progress::ProgressSink;
use crate::sink::{RowSink, StridedSink};
use crate::source::{InitialConditionBuilder, InitialWavefield, SourceKind};

/// Writes the solution file: header `nx_out ny`, the decimated marching axis,
/// the transverse axis, then every `step`-th row.
pub struct OutputStage<W: Write> {
    writer: OutputWriter<W>,
    step: usize,
    x: Mesh,
    y: Mesh,
}

impl<W: Write> OutputStage<W> {
    /// Create the stage over the full marching mesh `x`.
    pub fn new(writer: OutputWriter<W>, step: usize, x: Mesh, y: Mesh) -> Self {
        OutputStage { writer, step, x, y }
    }

    /// Write the header, run `next` with the full mesh and a strided sink,
    /// then flush.
    ///
    /// # Errors
    /// Returns `EngineStopped` if `next` returns before every row was
    /// delivered.
    pub fn run<F>(self, next: F) -> Result<W>
    where
        F: FnOnce(&Mesh, &mut dyn RowSink) -> Result<()>,
    {
        let OutputStage {
            mut writer,
            step,
            x,
            y,
        } = self;
        let xs = x.decimate(step)?;
        writer.write_header(&[xs.len(), y.len()])?;
        writer.write_values(xs.points())?;
        writer.write_values(y.points())?;

        let mut write_row = |_: usize, row: &[Complex64]| writer.write_complex(row);
        let received = {
            let mut strided = StridedSink::new(step, &mut write_row)?;
            next(&x, &mut strided)?;
            strided.received()
        };
        if received != x.len() {
            return Err(ModalError::EngineStopped {
                delivered: received,
                expected: x.len(),
            });
        }
        debug!("wrote {} of {} rows", xs.len(), x.len());
        writer.finish()
    }
}

/// Log target of the end-of-run timing reports. The binary enables it at
/// `Info` whatever the verbosity.
pub const TIMING_TARGET: &str = "modal_pe::timing";

/// Wall clock around the inner stages, with an optional progress bar.
pub struct TimingStage {
    label: String,
    total: usize,
    show_progress: bool,
}

impl TimingStage {
    /// Time a run delivering `total` rows.
    pub fn new(label: &str, total: usize, show_progress: bool) -> Self {
        TimingStage {
            label: label.to_string(),
            total,
            show_progress,
        }
    }

    /// Run `next`, then report and return the elapsed time.
    pub fn run<F>(self, sink: &mut dyn RowSink, next: F) -> Result<Duration>
    where
        F: FnOnce(&mut dyn RowSink) -> Result<()>,
    {
        let start = Instant::now();
        if self.show_progress {
            let mut progress = ProgressSink::new(&self.label, self.total, sink);
            next(&mut progress)?;
            progress.finish();
        } else {
            next(sink)?;
        }
        let elapsed = start.elapsed();
        info!(target: TIMING_TARGET, "{} took {} ms", self.label, elapsed.as_millis());
        Ok(elapsed)
    }
}

/// Deferred modal field construction.
pub type ModesBuild<'a> = Box<dyn FnOnce() -> Result<Box<dyn ModalGeometry>> + 'a>;

/// Builds the modal field, timed on its own, and truncates it.
pub struct ModesStage<'a> {
    build: ModesBuild<'a>,
    max_modes: usize,
}

impl<'a> ModesStage<'a> {
    /// Keep at most `max_modes` modes of whatever `build` returns.
    pub fn new(build: ModesBuild<'a>, max_modes: usize) -> Self {
        ModesStage { build, max_modes }
    }

    /// Build, truncate, and hand the field to `next`.
    pub fn run<F>(self, next: F) -> Result<()>
    where
        F: FnOnce(&dyn ModalGeometry) -> Result<()>,
    {
        let start = Instant::now();
        let mut field = (self.build)()?;
        info!(
            "modes computed in {} ms ({} layers)",
            start.elapsed().as_millis(),
            field.num_modes()
        );
        if field.num_modes() > self.max_modes {
            debug!("keeping {} of {} modes", self.max_modes, field.num_modes());
        }
        field.truncate_modes(self.max_modes);
        next(field.as_ref())
    }
}

/// Builds the initial wavefield from the truncated modal field.
pub struct InitialStage<'a> {
    builder: InitialConditionBuilder<'a>,
}

impl<'a> InitialStage<'a> {
    /// Wrap a configured builder.
    pub fn new(builder: InitialConditionBuilder<'a>) -> Self {
        InitialStage { builder }
    }

    /// Build the wavefield and hand it to `next`.
    pub fn run<F>(self, modes: &dyn ModalGeometry, next: F) -> Result<()>
    where
        F: FnOnce(&InitialWavefield) -> Result<()>,
    {
        let transverse = match self.builder.kind() {
            SourceKind::Ray => Some(modes.transverse_wavenumbers()?),
            _ => None,
        };
        let initial = self.builder.build(transverse.as_ref())?;
        next(&initial)
    }
}

/// A composed solution run.
pub struct Pipeline<'a, W: Write> {
    output: OutputStage<W>,
    timing: TimingStage,
    modes: ModesStage<'a>,
    initial: InitialStage<'a>,
    params: StepParams,
}

impl<'a, W: Write> Pipeline<'a, W> {
    /// Start an empty builder.
    pub fn builder() -> PipelineBuilder<'a, W> {
        PipelineBuilder {
            output: None,
            timing: None,
            modes: None,
            initial: None,
            params: StepParams::default(),
        }
    }

    /// Run every stage once around `engine` and return the flushed writer.
    pub fn run(self, engine: &dyn SteppingEngine) -> Result<W> {
        let Pipeline {
            output,
            timing,
            modes,
            initial,
            params,
        } = self;
        let source = initial.builder.source();
        output.run(|x, sink| {
            timing.run(sink, |sink| {
                modes.run(|field| {
                    initial.run(field, |init| {
                        let input = EngineInput {
                            x,
                            initial: init,
                            k0: source.k0(),
                            modes: field,
                        };
                        engine.solve(&input, &params, sink)
                    })
                })
            })?;
            Ok(())
        })
    }
}

/// Collects the stages of a [`Pipeline`].
pub struct PipelineBuilder<'a, W: Write> {
    output: Option<OutputStage<W>>,
    timing: Option<TimingStage>,
    modes: Option<ModesStage<'a>>,
    initial: Option<InitialStage<'a>>,
    params: StepParams,
}

impl<'a, W: Write> PipelineBuilder<'a, W> {
    /// Set the output stage.
    pub fn output(mut self, stage: OutputStage<W>) -> Self {
        self.output = Some(stage);
        self
    }

    /// Set the timing stage.
    pub fn timing(mut self, stage: TimingStage) -> Self {
        self.timing = Some(stage);
        self
    }

    /// Set the modes stage.
    pub fn modes(mut self, stage: ModesStage<'a>) -> Self {
        self.modes = Some(stage);
        self
    }

    /// Set the initial-condition stage.
    pub fn initial(mut self, stage: InitialStage<'a>) -> Self {
        self.initial = Some(stage);
        self
    }

    /// Set the engine parameters.
    pub fn params(mut self, params: StepParams) -> Self {
        self.params = params;
        self
    }

    /// Finish the builder.
    ///
    /// # Errors
    /// Returns a configuration error naming the first missing stage.
    pub fn build(self) -> Result<Pipeline<'a, W>> {
        let missing = |name: &str| ModalError::Configuration(format!("pipeline has no {} stage", name));
        Ok(Pipeline {
            output: self.output.ok_or_else(|| missing("output"))?,
            timing: self.timing.ok_or_else(|| missing("timing"))?,
            modes: self.modes.ok_or_else(|| missing("modes"))?,
            initial: self.initial.ok_or_else(|| missing("initial conditions"))?,
            params: self.params,
        })
    }
}
