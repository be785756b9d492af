// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::io::Write;
use std::time::{Duration, Instant};

use num_complex::Complex64;

use crate::error::Result;
use crate::sink::RowSink;

const BAR_WIDTH: usize = 40;

/// Snapshot handed to a progress callback.
#[derive(Debug, Clone, Copy)]
pub struct ProgressInfo {
    /// Units completed so far.
    pub done: usize,
    /// Units expected in total.
    pub total: usize,
    /// Elapsed time since the indicator was created.
    pub elapsed: Duration,
}

impl ProgressInfo {
    /// Completed fraction in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            (self.done as f64 / self.total as f64).min(1.0)
        }
    }
}

/// Text progress bar on stderr, redrawn whenever the whole percentage changes.
pub struct ProgressBar {
    label: String,
    total: usize,
    done: usize,
    last_percent: Option<usize>,
    start: Instant,
}

impl ProgressBar {
    /// Create a bar for `total` units.
    pub fn new(label: &str, total: usize) -> Self {
        ProgressBar {
            label: label.to_string(),
            total,
            done: 0,
            last_percent: None,
            start: Instant::now(),
        }
    }

    /// Current state.
    pub fn info(&self) -> ProgressInfo {
        ProgressInfo {
            done: self.done,
            total: self.total,
            elapsed: self.start.elapsed(),
        }
    }

    /// Advance by one unit.
    pub fn advance(&mut self) {
        self.done += 1;
        let info = self.info();
        let percent = (info.fraction() * 100.0) as usize;
        if self.last_percent != Some(percent) {
            self.last_percent = Some(percent);
            self.draw(&info, percent);
        }
    }

    /// Terminate the bar line.
    pub fn finish(&mut self) {
        let mut stderr = std::io::stderr();
        let _ = writeln!(stderr);
    }

    fn draw(&self, info: &ProgressInfo, percent: usize) {
        let filled = (info.fraction() * BAR_WIDTH as f64) as usize;
        let mut stderr = std::io::stderr();
        let _ = write!(
            stderr,
            "\r{}: [{}{}] {:3}% ({}/{}) {:.1}s",
            self.label,
            "#".repeat(filled),
            ".".repeat(BAR_WIDTH - filled),
            percent,
            info.done,
            info.total,
            info.elapsed.as_secs_f64()
        );
        let _ = stderr.flush();
    }
}

/// Row sink that advances a progress bar once per row before forwarding it.
pub struct ProgressSink<'a> {
    bar: ProgressBar,
    inner: &'a mut dyn RowSink,
}

impl<'a> ProgressSink<'a> {
    /// Wrap `inner` with a bar expecting `total` rows.
    pub fn new(label: &str, total: usize, inner: &'a mut dyn RowSink) -> Self {
        ProgressSink {
            bar: ProgressBar::new(label, total),
            inner,
        }
    }

    /// Rows seen so far.
    pub fn done(&self) -> usize {
        self.bar.done
    }

    /// Close the bar line.
    pub fn finish(mut self) {
        self.bar.finish();
    }
}

impl RowSink for ProgressSink<'_> {
    fn accept(&mut self, index: usize, row: &[Complex64]) -> Result<()> {
        self.inner.accept(index, row)?;
        self.bar.advance();
        Ok(())
    }
}
