// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::TableSource;
use crate::error::{ModalError, Result};
use crate::field::Field2d;
use crate::io::{load_table, Table};
use crate::mesh::Mesh;
use crate::modes::{Medium, MediumColumn};

/// Water depth over the horizontal plane.
///
/// Depth between table nodes is bilinear. Outside the table the nearest edge
/// value is used: the table describes the environment, it does not bound the
/// computation.
#[derive(Debug, Clone, PartialEq)]
pub struct Bathymetry {
    depth: Field2d<f64>,
}

impl Bathymetry {
    /// Build from a table of depths, `table.data[i][j]` at
    /// `(table.rows[i], table.cols[j])`.
    pub fn from_table(table: Table) -> Result<Self> {
        let x = Mesh::from_points(table.rows)?;
        let y = Mesh::from_points(table.cols)?;
        if table.data.len() != x.len() || table.data.iter().any(|r| r.len() != y.len()) {
            return Err(ModalError::ShapeMismatch {
                expected: vec![x.len(), y.len()],
                got: vec![
                    table.data.len(),
                    table.data.first().map_or(0, |r| r.len()),
                ],
            });
        }
        let flat: Vec<f64> = table.data.into_iter().flatten().collect();
        Ok(Bathymetry {
            depth: Field2d::new([x, y], vec![flat])?,
        })
    }

    /// Uniform depth everywhere.
    pub fn flat(depth: f64) -> Result<Self> {
        Bathymetry::from_table(Table {
            rows: vec![0.0],
            cols: vec![0.0],
            data: vec![vec![depth]],
        })
    }

    /// Build from a configured source.
    pub fn load(source: &TableSource) -> Result<Self> {
        match source {
            TableSource::Values { x, y, values } => Bathymetry::from_table(Table {
                rows: x.clone(),
                cols: y.clone(),
                data: values.clone(),
            }),
            TableSource::TextFile { path } => Bathymetry::from_table(load_table(path, false)?),
            TableSource::BinaryFile { path } => Bathymetry::from_table(load_table(path, true)?),
        }
    }

    /// Table axes.
    pub fn axes(&self) -> &[Mesh; 2] {
        self.depth.axes()
    }

    /// Depth at `(x, y)`.
    pub fn depth_at(&self, x: f64, y: f64) -> f64 {
        self.depth
            .layer_value_at_clamped(0, [x, y])
            .unwrap_or(0.0)
    }
}

impl Medium for Bathymetry {
    fn column(&self, x: f64, y: f64) -> MediumColumn {
        MediumColumn {
            x,
            y,
            depth: self.depth_at(x, y),
        }
    }
}
