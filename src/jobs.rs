// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! The four jobs the command line can run.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use log::{debug, info, log_enabled, warn, Level};
use num_complex::Complex64;

use crate::config::{JobConfig, ParamGroup};
use crate::engine::{AdiabaticEngine, StepParams};
use crate::error::{ModalError, Result};
use crate::field::{Field1d, Field2d};
use crate::io::{load_modes_1d, load_modes_2d, write_modes_1d, write_modes_2d, OutputWriter};
use crate::medium::Bathymetry;
use crate::mesh::{decimated_len, Mesh};
use crate::modes::{IdealWaveguide, Medium, ModalField, ModalFieldBuilder, ModalGeometry, ModeSolver};
use crate::pipeline::{
    InitialStage, ModesBuild, ModesStage, OutputStage, Pipeline, TimingStage, TIMING_TARGET,
};
use crate::progress::ProgressBar;
use crate::rays::{HamiltonianTracer, LayerIndex, RayFan, RayTracer};
use crate::source::{InitialConditionBuilder, SourceKind, SourceModes};
use crate::value::ModalValue;

/// A runnable job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    /// March the wavefield and write the solution.
    Solution,
    /// Write the modal field.
    Modes,
    /// Trace rays through every modal layer.
    Rays,
    /// Write the initial wavefield.
    Init,
}

impl FromStr for Job {
    type Err = ModalError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "solution" => Ok(Job::Solution),
            "modes" => Ok(Job::Modes),
            "rays" => Ok(Job::Rays),
            "init" => Ok(Job::Init),
            other => Err(ModalError::Configuration(format!("unknown job: {}", other))),
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Job::Solution => "solution",
            Job::Modes => "modes",
            Job::Rays => "rays",
            Job::Init => "init",
        };
        f.write_str(name)
    }
}

impl Job {
    /// Parameter groups the job reads.
    pub fn groups(&self) -> &'static [ParamGroup] {
        match self {
            Job::Solution => &[ParamGroup::Modes, ParamGroup::Solver, ParamGroup::Initial],
            Job::Modes => &[ParamGroup::Modes],
            Job::Rays => &[ParamGroup::Modes, ParamGroup::Rays],
            Job::Init => &[ParamGroup::Modes, ParamGroup::Initial],
        }
    }
}

/// Command-line settings shared by every job.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// Output file.
    pub output: PathBuf,
    /// Output stride along the marching axis (solution) or ray parameter
    /// (rays).
    pub step: usize,
    /// Binary output.
    pub binary: bool,
    /// Engine workers.
    pub workers: usize,
    /// Rows the engine may compute ahead of the writer.
    pub buffer_size: usize,
    /// Verbosity; 2 and above draws progress bars.
    pub verbosity: u8,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            output: PathBuf::from("output.txt"),
            step: 100,
            binary: false,
            workers: 1,
            buffer_size: 100,
            verbosity: 0,
        }
    }
}

impl RunOptions {
    fn show_progress(&self) -> bool {
        self.verbosity >= 2
    }
}

/// Run `job` with `config`.
pub fn run(job: Job, config: &JobConfig, options: &RunOptions) -> Result<()> {
    if options.step == 0 {
        return Err(ModalError::Configuration("step must be >= 1".to_string()));
    }
    if log_enabled!(Level::Debug) {
        for line in config.summary(job.groups()) {
            debug!("{}", line);
        }
    }
    for name in ignored_solver_settings(config) {
        warn!("{} has no effect on the ideal waveguide solver", name);
    }
    let start = Instant::now();
    match job {
        Job::Solution => run_solution(config, options)?,
        Job::Modes => run_modes(config, options)?,
        Job::Rays => run_rays(config, options)?,
        Job::Init => run_init(config, options)?,
    }
    info!(
        "{} job written to {} in {} ms",
        job,
        options.output.display(),
        start.elapsed().as_millis()
    );
    Ok(())
}

fn run_solution(config: &JobConfig, options: &RunOptions) -> Result<()> {
    let bathymetry = Bathymetry::load(&config.bathymetry)?;
    let source = source_modes(config, &bathymetry)?;
    let x = config.x_mesh()?;
    let y = config.y_mesh()?;
    let show = options.show_progress();

    let build: ModesBuild<'_> = Box::new(|| geometry(config, &bathymetry, show));

    let pipeline = Pipeline::builder()
        .output(OutputStage::new(
            OutputWriter::create(&options.output, options.binary)?,
            options.step,
            x.clone(),
            y.clone(),
        ))
        .timing(TimingStage::new("Solution", x.len(), show))
        .modes(ModesStage::new(build, max_modes(config, &source)))
        .initial(InitialStage::new(initial_builder(config, &source, y)?))
        .params(step_params(config, options))
        .build()?;
    pipeline.run(&AdiabaticEngine)?;
    Ok(())
}

fn step_params(config: &JobConfig, options: &RunOptions) -> StepParams {
    StepParams {
        border_width: config.border_width,
        past_n: config.past_n,
        workers: options.workers,
        buffer_size: options.buffer_size,
    }
}

fn run_modes(config: &JobConfig, options: &RunOptions) -> Result<()> {
    let bathymetry = Bathymetry::load(&config.bathymetry)?;
    let show = options.show_progress();
    let mut out = OutputWriter::create(&options.output, options.binary)?;
    if config.complex_modes {
        modal_data::<Complex64>(config, &bathymetry, show)?.write(&mut out)?;
    } else {
        modal_data::<f64>(config, &bathymetry, show)?.write(&mut out)?;
    }
    out.finish()?;
    Ok(())
}

fn run_rays(config: &JobConfig, options: &RunOptions) -> Result<()> {
    let bathymetry = Bathymetry::load(&config.bathymetry)?;
    let show = options.show_progress();
    let layers = if config.complex_modes {
        modal_data::<Complex64>(config, &bathymetry, show)?.real_wavenumbers()
    } else {
        modal_data::<f64>(config, &bathymetry, show)?.real_wavenumbers()
    };
    let count = layers
        .num_layers()
        .min(config.max_mode.unwrap_or(usize::MAX));
    let angles = config.angle_mesh()?;
    let params = config.parameter_mesh()?;
    let step = options.step;
    let start = [config.x0, config.y_s];
    let tracer = HamiltonianTracer::new();

    let mut out = OutputWriter::create(&options.output, options.binary)?;
    out.write_header(&[angles.len(), decimated_len(params.len(), step), count])?;
    out.write_values(angles.points())?;
    out.write_values(params.decimate(step)?.points())?;

    let timer = Instant::now();
    let mut bar = show.then(|| ProgressBar::new("Rays", count));
    for j in 0..count {
        let fan = layers.trace(&tracer, j, start, &angles, &params)?;
        for a in 0..angles.len() {
            let xs: Vec<f64> = fan.x.row(a).iter().step_by(step).copied().collect();
            let ys: Vec<f64> = fan.y.row(a).iter().step_by(step).copied().collect();
            out.write_values(&xs)?;
            out.write_values(&ys)?;
        }
        if let Some(bar) = bar.as_mut() {
            bar.advance();
        }
    }
    if let Some(bar) = bar.as_mut() {
        bar.finish();
    }
    info!(
        target: TIMING_TARGET,
        "traced {} layers in {} ms",
        count,
        timer.elapsed().as_millis()
    );
    out.finish()?;
    Ok(())
}

fn run_init(config: &JobConfig, options: &RunOptions) -> Result<()> {
    let bathymetry = Bathymetry::load(&config.bathymetry)?;
    let source = source_modes(config, &bathymetry)?;
    let y = config.y_mesh()?;
    let builder = initial_builder(config, &source, y.clone())?;
    let initial = match builder.kind() {
        SourceKind::Ray => {
            let mut field = geometry(config, &bathymetry, options.show_progress())?;
            field.truncate_modes(max_modes(config, &source));
            builder.build(Some(&field.transverse_wavenumbers()?))?
        }
        _ => builder.build(None)?,
    };

    let mut out = OutputWriter::create(&options.output, options.binary)?;
    out.write_header(&[initial.num_modes(), y.len()])?;
    out.write_values(y.points())?;
    for profile in initial.modes() {
        out.write_complex(profile)?;
    }
    out.finish()?;
    Ok(())
}

/// Mode solver described by the configuration, evaluating shapes at the
/// receiver depth.
pub fn waveguide(config: &JobConfig) -> Result<IdealWaveguide> {
    Ok(IdealWaveguide::new(config.f, config.sound_speed, config.z_r)?
        .with_bottom(config.bottom)
        .with_mode_subset(config.mode_subset)
        .with_attenuation(config.attenuation))
}

/// Mode-solver settings that differ from their defaults but that
/// [`IdealWaveguide`] does not use.
pub fn ignored_solver_settings(config: &JobConfig) -> Vec<&'static str> {
    let defaults = JobConfig::default();
    let mut names = Vec::new();
    if config.ppm != defaults.ppm {
        names.push("ppm");
    }
    if config.ord_rich != defaults.ord_rich {
        names.push("ord_rich");
    }
    names
}

/// Modal mesh: the solver bounds sampled `mnx` x `mny` times, or as densely
/// as the bathymetry table (at least two points) when unset. Equal bounds
/// give a single point.
pub fn modal_meshes(config: &JobConfig, bathymetry: &Bathymetry) -> Result<(Mesh, Mesh)> {
    let [bx, by] = bathymetry.axes();
    let count = |requested: Option<usize>, table: &Mesh, a: f64, b: f64| {
        if a == b {
            1
        } else {
            requested.unwrap_or_else(|| table.len().max(2))
        }
    };
    let nx = count(config.mnx, bx, config.x0, config.x1);
    let ny = count(config.mny, by, config.y0, config.y1);
    Ok((
        Mesh::uniform(config.x0, config.x1, nx)?,
        Mesh::uniform(config.y0, config.y1, ny)?,
    ))
}

/// Reference wavenumbers and source-depth shapes: from the configuration
/// when given, otherwise solved at `(x0, y_s)`.
pub fn source_modes(config: &JobConfig, medium: &dyn Medium) -> Result<SourceModes> {
    if let (Some(k0), Some(phi_s)) = (&config.k0, &config.phi_s) {
        return SourceModes::new(k0.clone(), phi_s.clone());
    }
    let solver = waveguide(config)?.at_depth(config.z_s)?;
    let column = medium.column(config.x0, config.y_s);
    let pairs = ModeSolver::<f64>::solve(&solver, &column)?;
    if pairs.is_empty() {
        return Err(ModalError::Configuration(format!(
            "no trapped modes at the source (depth {})",
            column.depth
        )));
    }
    debug!("{} modes at the source", pairs.len());
    SourceModes::new(
        pairs.iter().map(|p| p.wavenumber).collect(),
        pairs.iter().map(|p| p.amplitude).collect(),
    )
}

/// Modes carried into the solution: `max_mode` bounded by the number of
/// reference wavenumbers.
pub fn max_modes(config: &JobConfig, source: &SourceModes) -> usize {
    config.max_mode.unwrap_or(usize::MAX).min(source.len())
}

fn initial_builder<'a>(
    config: &JobConfig,
    source: &'a SourceModes,
    y: Mesh,
) -> Result<InitialConditionBuilder<'a>> {
    Ok(InitialConditionBuilder::new(config.source_kind()?, source, y, config.y_s)
        .with_x0(config.x0)
        .with_angles(config.angle_mesh()?)
        .with_natural_parameters(config.parameter_mesh()?))
}

/// Modal field of the configured value kind, behind the engine's view of it.
fn geometry(
    config: &JobConfig,
    bathymetry: &Bathymetry,
    show_progress: bool,
) -> Result<Box<dyn ModalGeometry>> {
    Ok(if config.complex_modes {
        modal_data::<Complex64>(config, bathymetry, show_progress)?.into_geometry()
    } else {
        modal_data::<f64>(config, bathymetry, show_progress)?.into_geometry()
    })
}

/// A modal field of either dimension.
enum ModalData<V> {
    Flat(ModalField<V, 1>),
    Plane(ModalField<V, 2>),
}

fn modal_data<V: ModalValue>(
    config: &JobConfig,
    bathymetry: &Bathymetry,
    show_progress: bool,
) -> Result<ModalData<V>> {
    if let Some(file) = &config.modes {
        debug!("loading modes from {}", file.path.display());
        return Ok(if config.const_modes {
            ModalData::Flat(load_modes_1d(&file.path, file.binary)?)
        } else {
            ModalData::Plane(load_modes_2d(&file.path, file.binary)?)
        });
    }
    let solver = waveguide(config)?;
    let builder = ModalFieldBuilder::<V>::new(&solver, bathymetry).with_progress(show_progress);
    let (x, y) = modal_meshes(config, bathymetry)?;
    Ok(if config.const_modes {
        ModalData::Flat(builder.build_1d(config.x0, &y)?)
    } else {
        ModalData::Plane(builder.build_2d(&x, &y)?)
    })
}

impl<V: ModalValue> ModalData<V> {
    fn into_geometry(self) -> Box<dyn ModalGeometry> {
        match self {
            ModalData::Flat(field) => Box::new(field),
            ModalData::Plane(field) => Box::new(field),
        }
    }

    fn write<W: std::io::Write>(&self, out: &mut OutputWriter<W>) -> Result<()> {
        match self {
            ModalData::Flat(field) => write_modes_1d(out, field),
            ModalData::Plane(field) => write_modes_2d(out, field),
        }
    }

    fn real_wavenumbers(&self) -> RealLayers {
        match self {
            ModalData::Flat(field) => RealLayers::Flat(field.wavenumbers.to_real()),
            ModalData::Plane(field) => RealLayers::Plane(field.wavenumbers.to_real()),
        }
    }
}

/// Real wavenumber layers a ray can be traced through.
enum RealLayers {
    Flat(Field1d<f64>),
    Plane(Field2d<f64>),
}

impl RealLayers {
    fn num_layers(&self) -> usize {
        match self {
            RealLayers::Flat(field) => field.num_layers(),
            RealLayers::Plane(field) => field.num_layers(),
        }
    }

    fn trace(
        &self,
        tracer: &HamiltonianTracer,
        layer: usize,
        start: [f64; 2],
        angles: &Mesh,
        params: &Mesh,
    ) -> Result<RayFan> {
        match self {
            RealLayers::Flat(field) => {
                tracer.trace(start, angles, params, &LayerIndex::new(field, layer)?)
            }
            RealLayers::Plane(field) => {
                tracer.trace(start, angles, params, &LayerIndex::new(field, layer)?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModesFile, TableSource};

    fn small_config() -> JobConfig {
        JobConfig {
            x0: 10.0,
            x1: 110.0,
            nx: 11,
            y0: -20.0,
            y1: 20.0,
            ny: 9,
            mnx: Some(3),
            mny: Some(5),
            f: 50.0,
            bathymetry: TableSource::constant(60.0),
            ..JobConfig::default()
        }
    }

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("modal_pe_jobs_{}", name))
    }

    #[test]
    fn parse_jobs() {
        for name in ["solution", "modes", "rays", "init"] {
            assert_eq!(name.parse::<Job>().unwrap().to_string(), name);
        }
        assert!(matches!("march".parse::<Job>(), Err(ModalError::Configuration(_))));
    }

    #[test]
    fn modal_mesh_defaults() {
        let config = JobConfig {
            mnx: None,
            mny: Some(4),
            ..small_config()
        };
        let bathymetry = Bathymetry::flat(50.0).unwrap();
        let (x, y) = modal_meshes(&config, &bathymetry).unwrap();
        assert_eq!(x.len(), 2);
        assert_eq!(x.first(), 10.0);
        assert_eq!(x.last(), 110.0);
        assert_eq!(y.len(), 4);
    }

    #[test]
    fn source_modes_from_config_or_solver() {
        let bathymetry = Bathymetry::flat(60.0).unwrap();
        let given = JobConfig {
            k0: Some(vec![0.2]),
            phi_s: Some(vec![0.1]),
            ..small_config()
        };
        assert_eq!(source_modes(&given, &bathymetry).unwrap().k0(), &[0.2]);

        let solved = source_modes(&small_config(), &bathymetry).unwrap();
        let expected: Vec<crate::modes::ModalPair<f64>> = waveguide(&small_config())
            .unwrap()
            .solve(&bathymetry.column(10.0, 0.0))
            .unwrap();
        assert_eq!(solved.len(), expected.len());
        assert_eq!(max_modes(&JobConfig { max_mode: Some(2), ..small_config() }, &solved), 2);
    }

    #[test]
    fn unused_solver_settings_are_flagged() {
        assert!(ignored_solver_settings(&small_config()).is_empty());
        let config = JobConfig {
            ppm: 8,
            ord_rich: 5,
            ..small_config()
        };
        assert_eq!(ignored_solver_settings(&config), vec!["ppm", "ord_rich"]);
        assert_eq!(
            ignored_solver_settings(&JobConfig { ord_rich: 1, ..small_config() }),
            vec!["ord_rich"]
        );
    }

    #[test]
    fn solution_job_accepts_border_settings() {
        let config = JobConfig {
            border_width: Some(3),
            past_n: 5,
            ..small_config()
        };
        let options = RunOptions {
            output: scratch("border.txt"),
            step: 5,
            ..RunOptions::default()
        };
        let params = step_params(&config, &options);
        assert_eq!(params.border_width, Some(3));
        assert_eq!(params.past_n, 5);

        run(Job::Solution, &config, &options).unwrap();
        let text = std::fs::read_to_string(&options.output).unwrap();
        assert_eq!(text.lines().next(), Some("3 9"));
        std::fs::remove_file(&options.output).ok();
    }

    #[test]
    fn solution_job_writes_strided_rows() {
        let path = scratch("solution.txt");
        let options = RunOptions {
            output: path.clone(),
            step: 3,
            workers: 2,
            buffer_size: 4,
            ..RunOptions::default()
        };
        run(Job::Solution, &small_config(), &options).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "4 9");
        assert_eq!(lines.len(), 3 + 4);
        for line in &lines[3..] {
            assert_eq!(line.split_whitespace().count(), 18);
        }
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn modes_job_round_trips_through_config() {
        let path = scratch("modes.bin");
        let options = RunOptions {
            output: path.clone(),
            binary: true,
            ..RunOptions::default()
        };
        let config = JobConfig {
            complex_modes: true,
            attenuation: 1e-3,
            ..small_config()
        };
        run(Job::Modes, &config, &options).unwrap();
        let written: ModalField<Complex64, 2> = load_modes_2d(&path, true).unwrap();
        assert_eq!(written.wavenumbers.shape(), [3, 5]);

        let reloaded = JobConfig {
            modes: Some(ModesFile {
                path: path.clone(),
                binary: true,
            }),
            ..config.clone()
        };
        match modal_data::<Complex64>(&reloaded, &Bathymetry::flat(1.0).unwrap(), false).unwrap() {
            ModalData::Plane(field) => assert_eq!(field, written),
            ModalData::Flat(_) => panic!("expected a 2D field"),
        }
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn rays_job_header() {
        let path = scratch("rays.txt");
        let config = JobConfig {
            const_modes: true,
            max_mode: Some(2),
            na: 5,
            a0: -0.2,
            a1: 0.2,
            nl: 21,
            l0: 0.0,
            l1: 100.0,
            ..small_config()
        };
        let options = RunOptions {
            output: path.clone(),
            step: 4,
            ..RunOptions::default()
        };
        run(Job::Rays, &config, &options).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        // ceil(21 / 4) = 6 samples per ray
        assert_eq!(lines[0], "5 6 2");
        assert_eq!(lines[2].split_whitespace().count(), 6);
        assert_eq!(lines.len(), 3 + 2 * 5 * 2);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn init_job_layout() {
        let path = scratch("init.txt");
        let config = JobConfig {
            k0: Some(vec![0.2, 0.18, 0.15]),
            phi_s: Some(vec![0.1, 0.05, 0.02]),
            init: "gauss".to_string(),
            ..small_config()
        };
        let options = RunOptions {
            output: path.clone(),
            ..RunOptions::default()
        };
        run(Job::Init, &config, &options).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "3 9");
        assert_eq!(lines.len(), 2 + 3);
        assert_eq!(lines[2].split_whitespace().count(), 18);
        std::fs::remove_file(&path).ok();
    }
}
