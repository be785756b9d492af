// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use num_complex::Complex64;

use crate::error::{ModalError, Result};
use crate::field::InterpolatedField;
use crate::mesh::Mesh;
use crate::modes::ModalField;
use crate::value::{flatten, ModalValue};

/// Append-only writer for job output.
///
/// Text output puts the header on one line and every record on its own line
/// as whitespace-separated numbers. Binary output writes header fields as
/// little-endian `u32` and payloads as little-endian `f64`.
pub struct OutputWriter<W: Write> {
    inner: W,
    binary: bool,
}

impl OutputWriter<BufWriter<File>> {
    /// Create (truncate) `path` for writing.
    pub fn create(path: &Path, binary: bool) -> Result<Self> {
        let file = File::create(path)?;
        Ok(OutputWriter::new(BufWriter::new(file), binary))
    }
}

impl<W: Write> OutputWriter<W> {
    /// Wrap an existing writer.
    pub fn new(inner: W, binary: bool) -> Self {
        OutputWriter { inner, binary }
    }

    /// True for the binary encoding.
    pub fn is_binary(&self) -> bool {
        self.binary
    }

    /// Write the dimension header.
    pub fn write_header(&mut self, dims: &[usize]) -> Result<()> {
        if self.binary {
            for &d in dims {
                let d = u32::try_from(d).map_err(|_| {
                    ModalError::Other(format!("dimension {} does not fit in a u32 header", d))
                })?;
                self.inner.write_all(&d.to_le_bytes())?;
            }
            return Ok(());
        }
        let line: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
        writeln!(self.inner, "{}", line.join(" "))?;
        Ok(())
    }

    /// Write one record of real values.
    pub fn write_values(&mut self, values: &[f64]) -> Result<()> {
        if self.binary {
            for v in values {
                self.inner.write_all(&v.to_le_bytes())?;
            }
            return Ok(());
        }
        let mut first = true;
        for v in values {
            if !first {
                self.inner.write_all(b" ")?;
            }
            write!(self.inner, "{}", v)?;
            first = false;
        }
        self.inner.write_all(b"\n")?;
        Ok(())
    }

    /// Write one record of complex values, real and imaginary parts
    /// interleaved.
    pub fn write_complex(&mut self, values: &[Complex64]) -> Result<()> {
        self.write_layer(values)
    }

    /// Write one record of modal values in their component encoding.
    pub fn write_layer<V: ModalValue>(&mut self, values: &[V]) -> Result<()> {
        self.write_values(&flatten(values))
    }

    /// Flush and return the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// A two-axis table: `data[i][j]` is the value at `(rows[i], cols[j])`.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// First-axis coordinates.
    pub rows: Vec<f64>,
    /// Second-axis coordinates.
    pub cols: Vec<f64>,
    /// Values, one inner vector per row.
    pub data: Vec<Vec<f64>>,
}

/// Read a text table.
///
/// The first line holds a placeholder followed by the column coordinates.
/// Each following non-empty line holds a row coordinate followed by one
/// value per column.
pub fn read_text_table<R: BufRead>(reader: R) -> Result<Table> {
    let mut lines = reader.lines();
    let header = loop {
        match lines.next() {
            Some(line) => {
                let line = line?;
                if !line.trim().is_empty() {
                    break line;
                }
            }
            None => return Err(ModalError::Parse("table is empty".to_string())),
        }
    };
    let cols = parse_line(&header)?.into_iter().skip(1).collect::<Vec<_>>();

    let mut rows = Vec::new();
    let mut data = Vec::new();
    for line in lines {
        let line = line?;
        let values = parse_line(&line)?;
        if values.len() < 2 {
            continue;
        }
        if values.len() - 1 != cols.len() {
            return Err(ModalError::ShapeMismatch {
                expected: vec![cols.len()],
                got: vec![values.len() - 1],
            });
        }
        rows.push(values[0]);
        data.push(values[1..].to_vec());
    }
    Ok(Table { rows, cols, data })
}

fn parse_line(line: &str) -> Result<Vec<f64>> {
    line.split_whitespace()
        .map(|t| {
            t.parse::<f64>()
                .map_err(|e| ModalError::Parse(format!("invalid number '{}': {}", t, e)))
        })
        .collect()
}

// Header counts are untrusted; reservations never exceed this many elements.
const RESERVE_LIMIT: usize = 1 << 16;

fn reserve<T>(n: usize) -> Vec<T> {
    Vec::with_capacity(n.min(RESERVE_LIMIT))
}

/// Read a binary table: `u32` row and column counts, row coordinates, column
/// coordinates, then the values row by row.
pub fn read_binary_table<R: Read>(reader: R) -> Result<Table> {
    let mut input = BinaryNumbers::new(reader);
    let n = input.next_count()?;
    let m = input.next_count()?;
    let rows = input.next_values(n)?;
    let cols = input.next_values(m)?;
    let mut data = reserve(n);
    for _ in 0..n {
        data.push(input.next_values(m)?);
    }
    Ok(Table { rows, cols, data })
}

/// Read a table from a file in either encoding.
pub fn load_table(path: &Path, binary: bool) -> Result<Table> {
    let file = File::open(path)?;
    if binary {
        read_binary_table(BufReader::new(file))
    } else {
        read_text_table(BufReader::new(file))
    }
}

/// Sequential source of header counts and floating-point payload values.
trait NumberStream {
    fn next_count(&mut self) -> Result<usize>;
    fn next_value(&mut self) -> Result<f64>;

    fn next_values(&mut self, n: usize) -> Result<Vec<f64>> {
        (0..n).map(|_| self.next_value()).collect()
    }

    fn next_layer<V: ModalValue>(&mut self, n: usize) -> Result<Vec<V>>
    where
        Self: Sized,
    {
        let mut parts = [0.0; 2];
        let mut out = reserve(n);
        for _ in 0..n {
            for p in parts.iter_mut().take(V::COMPONENTS) {
                *p = self.next_value()?;
            }
            out.push(V::from_components(&parts[..V::COMPONENTS]));
        }
        Ok(out)
    }
}

struct TextNumbers {
    tokens: std::vec::IntoIter<String>,
}

impl TextNumbers {
    fn new<R: Read>(mut reader: R) -> Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        let tokens: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        Ok(TextNumbers {
            tokens: tokens.into_iter(),
        })
    }

    fn next_token(&mut self) -> Result<String> {
        self.tokens
            .next()
            .ok_or_else(|| ModalError::Parse("unexpected end of input".to_string()))
    }
}

impl NumberStream for TextNumbers {
    fn next_count(&mut self) -> Result<usize> {
        let t = self.next_token()?;
        t.parse::<usize>()
            .map_err(|e| ModalError::Parse(format!("invalid count '{}': {}", t, e)))
    }

    fn next_value(&mut self) -> Result<f64> {
        let t = self.next_token()?;
        t.parse::<f64>()
            .map_err(|e| ModalError::Parse(format!("invalid number '{}': {}", t, e)))
    }
}

struct BinaryNumbers<R: Read> {
    reader: R,
}

impl<R: Read> BinaryNumbers<R> {
    fn new(reader: R) -> Self {
        BinaryNumbers { reader }
    }
}

impl<R: Read> NumberStream for BinaryNumbers<R> {
    fn next_count(&mut self) -> Result<usize> {
        let mut buf = [0u8; 4];
        self.reader.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf) as usize)
    }

    fn next_value(&mut self) -> Result<f64> {
        let mut buf = [0u8; 8];
        self.reader.read_exact(&mut buf)?;
        Ok(f64::from_le_bytes(buf))
    }
}

/// Write a range-independent modal field: header `ny nm`, the transverse
/// axis, every wavenumber layer, then every amplitude layer.
pub fn write_modes_1d<V: ModalValue, W: Write>(
    out: &mut OutputWriter<W>,
    field: &ModalField<V, 1>,
) -> Result<()> {
    let y = field.wavenumbers.axis(0);
    out.write_header(&[y.len(), field.num_modes()])?;
    out.write_values(y.points())?;
    write_layers(out, field)
}

/// Write a range-dependent modal field: header `nx ny nm`, both axes, every
/// wavenumber layer, then every amplitude layer. Layers are written one
/// x-row per record.
pub fn write_modes_2d<V: ModalValue, W: Write>(
    out: &mut OutputWriter<W>,
    field: &ModalField<V, 2>,
) -> Result<()> {
    let x = field.wavenumbers.axis(0);
    let y = field.wavenumbers.axis(1);
    out.write_header(&[x.len(), y.len(), field.num_modes()])?;
    out.write_values(x.points())?;
    out.write_values(y.points())?;
    write_layers(out, field)
}

fn write_layers<V: ModalValue, W: Write, const N: usize>(
    out: &mut OutputWriter<W>,
    field: &ModalField<V, N>,
) -> Result<()> {
    // one record per innermost row
    let row = field.wavenumbers.shape()[N - 1];
    for layer in field.wavenumbers.layers() {
        for chunk in layer.chunks(row) {
            out.write_layer(chunk)?;
        }
    }
    for layer in field.amplitudes.layers() {
        for chunk in layer.chunks(row) {
            out.write_values(chunk)?;
        }
    }
    Ok(())
}

/// Read a field written by [`write_modes_1d`].
pub fn read_modes_1d<V: ModalValue, R: Read>(reader: R, binary: bool) -> Result<ModalField<V, 1>> {
    if binary {
        parse_modes_1d(&mut BinaryNumbers::new(reader))
    } else {
        parse_modes_1d(&mut TextNumbers::new(reader)?)
    }
}

/// Read a field written by [`write_modes_2d`].
pub fn read_modes_2d<V: ModalValue, R: Read>(reader: R, binary: bool) -> Result<ModalField<V, 2>> {
    if binary {
        parse_modes_2d(&mut BinaryNumbers::new(reader))
    } else {
        parse_modes_2d(&mut TextNumbers::new(reader)?)
    }
}

fn parse_modes_1d<V: ModalValue, S: NumberStream>(input: &mut S) -> Result<ModalField<V, 1>> {
    let ny = input.next_count()?;
    let nm = input.next_count()?;
    let y = Mesh::from_points(input.next_values(ny)?)?;
    let (k, phi) = parse_layers(input, nm, ny)?;
    ModalField::new(
        InterpolatedField::new([y.clone()], k)?,
        InterpolatedField::new([y], phi)?,
    )
}

fn parse_modes_2d<V: ModalValue, S: NumberStream>(input: &mut S) -> Result<ModalField<V, 2>> {
    let nx = input.next_count()?;
    let ny = input.next_count()?;
    let nm = input.next_count()?;
    let x = Mesh::from_points(input.next_values(nx)?)?;
    let y = Mesh::from_points(input.next_values(ny)?)?;
    let points = nx
        .checked_mul(ny)
        .ok_or_else(|| ModalError::Parse(format!("grid {} x {} is too large", nx, ny)))?;
    let (k, phi) = parse_layers(input, nm, points)?;
    ModalField::new(
        InterpolatedField::new([x.clone(), y.clone()], k)?,
        InterpolatedField::new([x, y], phi)?,
    )
}

type Layers<V> = (Vec<Vec<V>>, Vec<Vec<f64>>);

fn parse_layers<V: ModalValue, S: NumberStream>(
    input: &mut S,
    nm: usize,
    points: usize,
) -> Result<Layers<V>> {
    let mut k = reserve(nm);
    for _ in 0..nm {
        k.push(input.next_layer::<V>(points)?);
    }
    let mut phi = reserve(nm);
    for _ in 0..nm {
        phi.push(input.next_values(points)?);
    }
    Ok((k, phi))
}

/// Load a range-independent modal field from a file.
pub fn load_modes_1d<V: ModalValue>(path: &Path, binary: bool) -> Result<ModalField<V, 1>> {
    read_modes_1d(BufReader::new(File::open(path)?), binary)
}

/// Load a range-dependent modal field from a file.
pub fn load_modes_2d<V: ModalValue>(path: &Path, binary: bool) -> Result<ModalField<V, 2>> {
    read_modes_2d(BufReader::new(File::open(path)?), binary)
}
