// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::LevelFilter;

use modal_pe::config::JobConfig;
use modal_pe::jobs::{self, Job, RunOptions};
use modal_pe::pipeline::TIMING_TARGET;

#[derive(Parser)]
#[command(
    name = "modal-pe",
    about = "Modal parabolic-equation and ray solver for shallow-water acoustics"
)]
struct Cli {
    /// Job to run: solution, modes, rays or init
    #[arg(default_value = "solution")]
    job: String,

    /// Verbosity (-v info, -vv debug with progress bars)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// JSON job description
    #[arg(short = 'c', long, default_value = "config.json")]
    config: PathBuf,

    /// Output file path
    #[arg(short = 'o', long, default_value = "output.txt")]
    output: PathBuf,

    /// Output stride along the marching axis (or the ray parameter)
    #[arg(short = 's', long, default_value = "100")]
    step: usize,

    /// Write binary output instead of text
    #[arg(long)]
    binary: bool,

    /// Number of engine worker threads
    #[arg(short = 'w', long, default_value = "1")]
    workers: usize,

    /// Rows the engine may compute ahead of the writer
    #[arg(short = 'b', long = "buff", default_value = "100")]
    buff: usize,
}

fn logger(verbose: u8) -> env_logger::Builder {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level)
        .filter_module(TIMING_TARGET, LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_millis();
    builder
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger(cli.verbose).init();

    if cli.step == 0 {
        bail!("--step must be at least 1");
    }
    if cli.workers == 0 {
        bail!("--workers must be at least 1");
    }
    if cli.buff == 0 {
        bail!("--buff must be at least 1");
    }

    let job: Job = cli.job.parse()?;
    let config = JobConfig::from_file(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    let options = RunOptions {
        output: cli.output.clone(),
        step: cli.step,
        binary: cli.binary,
        workers: cli.workers,
        buffer_size: cli.buff,
        verbosity: cli.verbose,
    };

    jobs::run(job, &config, &options).with_context(|| format!("{} job failed", job))?;
    Ok(())
}
