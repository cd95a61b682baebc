/*!
ESRI ASCII grid rasters.

All spatial input and output of the model goes through this one plain-text
format: six header lines giving the grid dimensions, the lower left corner,
the cell size and the no-data value, followed by the cell values in
row-major order, northernmost row first.

```text
ncols         3
nrows         2
xllcorner     0
yllcorner     0
cellsize      25000
NODATA_value  -9999
1 2 -9999
3 4 5
```
 */

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde_derive::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The no-data value written for cells that carry no information, most
/// importantly cells that were never reached in the arrival-time output.
pub const NO_DATA: f64 = -9999.;

/// The fixed geometry of a regular grid in projected coordinates (metres).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub ncols: usize,
    pub nrows: usize,
    pub xllcorner: f64,
    pub yllcorner: f64,
    pub cellsize: f64,
}

impl Geometry {
    pub fn cells(&self) -> usize {
        self.ncols * self.nrows
    }

    /// Area of one cell in km².
    pub fn cell_area(&self) -> f64 {
        (self.cellsize / 1000.).powi(2)
    }

    pub fn offset(&self, column: usize, row: usize) -> usize {
        row * self.ncols + column
    }

    pub fn column_row(&self, offset: usize) -> (usize, usize) {
        (offset % self.ncols, offset / self.ncols)
    }

    /// The cell reached from `offset` by moving `dc` columns and `dr` rows,
    /// if that cell still lies on the grid. Grids do not wrap.
    pub fn shifted(&self, offset: usize, (dc, dr): (isize, isize)) -> Option<usize> {
        let (column, row) = self.column_row(offset);
        let column = column as isize + dc;
        let row = row as isize + dr;
        if column < 0 || row < 0 || column >= self.ncols as isize || row >= self.nrows as isize {
            None
        } else {
            Some(self.offset(column as usize, row as usize))
        }
    }

    /// Resolve a projected coordinate to the cell containing it.
    ///
    /// ```rust
    /// # use model::raster::Geometry;
    /// let g = Geometry { ncols: 4, nrows: 3, xllcorner: 0., yllcorner: 0., cellsize: 10. };
    /// assert_eq!(g.cell_of(15., 25.).unwrap(), g.offset(1, 0));
    /// assert_eq!(g.cell_of(39.9, 0.1).unwrap(), g.offset(3, 2));
    /// assert!(g.cell_of(40., 5.).is_err());
    /// ```
    pub fn cell_of(&self, x: f64, y: f64) -> Result<usize> {
        let top = self.yllcorner + self.nrows as f64 * self.cellsize;
        let column = ((x - self.xllcorner) / self.cellsize).floor();
        let row = ((top - y) / self.cellsize).floor();
        if !(column >= 0. && row >= 0.)
            || column >= self.ncols as f64
            || row >= self.nrows as f64
        {
            return Err(Error::OutOfBounds { x, y });
        }
        Ok(self.offset(column as usize, row as usize))
    }

    /// Projected coordinates of the centre of a cell.
    pub fn centre(&self, offset: usize) -> (f64, f64) {
        let (column, row) = self.column_row(offset);
        let top = self.yllcorner + self.nrows as f64 * self.cellsize;
        (
            self.xllcorner + (column as f64 + 0.5) * self.cellsize,
            top - (row as f64 + 0.5) * self.cellsize,
        )
    }

    pub fn matches(&self, other: &Geometry) -> bool {
        let tolerance = 1e-6 * self.cellsize.abs();
        self.ncols == other.ncols
            && self.nrows == other.nrows
            && (self.xllcorner - other.xllcorner).abs() <= tolerance
            && (self.yllcorner - other.yllcorner).abs() <= tolerance
            && (self.cellsize - other.cellsize).abs() <= tolerance
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} cells of {} m at ({}, {})",
            self.ncols, self.nrows, self.cellsize, self.xllcorner, self.yllcorner
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AsciiGrid {
    pub geometry: Geometry,
    pub nodata_value: f64,
    /// Row-major cell values, northernmost row first.
    pub values: Vec<f64>,
}

fn raster_error(line: usize, message: impl Into<String>) -> Error {
    Error::Raster {
        line,
        message: message.into(),
    }
}

impl AsciiGrid {
    pub fn filled(geometry: Geometry, value: f64) -> Self {
        AsciiGrid {
            geometry,
            nodata_value: NO_DATA,
            values: vec![value; geometry.cells()],
        }
    }

    pub fn is_nodata(&self, offset: usize) -> bool {
        let v = self.values[offset];
        v.is_nan() || v == self.nodata_value
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = reader.lines().enumerate();

        let mut ncols = None;
        let mut nrows = None;
        let mut x = None;
        let mut y = None;
        let mut centred = false;
        let mut cellsize = None;
        let mut nodata_value = NO_DATA;
        for _ in 0..6 {
            let (i, line) = match lines.next() {
                Some((i, line)) => (i + 1, line?),
                None => return Err(raster_error(0, "truncated header")),
            };
            let mut fields = line.split_whitespace();
            let (key, value) = match (fields.next(), fields.next()) {
                (Some(k), Some(v)) => (k.to_ascii_lowercase(), v),
                _ => return Err(raster_error(i, "expected `key value`")),
            };
            let number: f64 = value
                .parse()
                .map_err(|_| raster_error(i, format!("bad value {} for {}", value, key)))?;
            match key.as_str() {
                "ncols" => ncols = Some(number as usize),
                "nrows" => nrows = Some(number as usize),
                "xllcorner" => x = Some(number),
                "yllcorner" => y = Some(number),
                "xllcenter" => {
                    x = Some(number);
                    centred = true
                }
                "yllcenter" => {
                    y = Some(number);
                    centred = true
                }
                "cellsize" => cellsize = Some(number),
                "nodata_value" => nodata_value = number,
                _ => return Err(raster_error(i, format!("unknown header key {}", key))),
            }
        }
        let (ncols, nrows, mut xllcorner, mut yllcorner, cellsize) =
            match (ncols, nrows, x, y, cellsize) {
                (Some(c), Some(r), Some(x), Some(y), Some(s)) => (c, r, x, y, s),
                _ => return Err(raster_error(6, "incomplete header")),
            };
        if centred {
            xllcorner -= cellsize / 2.;
            yllcorner -= cellsize / 2.;
        }
        let geometry = Geometry {
            ncols,
            nrows,
            xllcorner,
            yllcorner,
            cellsize,
        };

        let mut values = Vec::with_capacity(geometry.cells());
        let mut last_line = 6;
        for (i, line) in lines {
            let line = line?;
            last_line = i + 1;
            for token in line.split_whitespace() {
                let v: f64 = token
                    .parse()
                    .map_err(|_| raster_error(i + 1, format!("bad cell value {}", token)))?;
                values.push(v);
            }
        }
        if values.len() != geometry.cells() {
            return Err(raster_error(
                last_line,
                format!("expected {} cell values, found {}", geometry.cells(), values.len()),
            ));
        }
        Ok(AsciiGrid {
            geometry,
            nodata_value,
            values,
        })
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.to_writer(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn to_writer<W: Write>(&self, mut writer: W) -> Result<()> {
        let g = &self.geometry;
        writeln!(writer, "ncols         {}", g.ncols)?;
        writeln!(writer, "nrows         {}", g.nrows)?;
        writeln!(writer, "xllcorner     {}", g.xllcorner)?;
        writeln!(writer, "yllcorner     {}", g.yllcorner)?;
        writeln!(writer, "cellsize      {}", g.cellsize)?;
        writeln!(writer, "NODATA_value  {}", self.nodata_value)?;
        for row in self.values.chunks(g.ncols.max(1)) {
            let mut first = true;
            for v in row {
                if !first {
                    write!(writer, " ")?;
                }
                write!(writer, "{}", v)?;
                first = false;
            }
            writeln!(writer)?;
        }
        Ok(())
    }
}
