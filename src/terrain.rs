/*!
The terrain store and the providers it draws its layers from.

Terrain consists of two kinds of layers. The static layer says which cells
are land that humans can live on at all, and never changes. The vegetation
layer is a reconstruction of the paleovegetation for a time slice: it stays
constant over the slice and is swapped out as a whole when the simulated date
crosses into the next slice. There is no interpolation between slices.
 */

use std::path::PathBuf;
use std::sync::Arc;

use bitvec::prelude::*;
use rustc_hash::FxHashMap;
use serde_derive::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::raster::{AsciiGrid, Geometry};

/**
Vegetation classes, as coded in the paleovegetation rasters:

 - 0 (or no data): unsuitable for settlement
 - 1: tropical moist forest, the core habitat
 - 2: cells at the border of the forest with other biomes
 - 3 and anything else: other biomes

Leapfrogging happens only between border cells, allowing a jump over
non-forested environments along the forest margin.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vegetation {
    Unsuitable,
    Interior,
    Edge,
    Other,
}

impl Vegetation {
    pub fn from_code(code: f64) -> Vegetation {
        if code.is_nan() {
            return Vegetation::Unsuitable;
        }
        match code.round() as i64 {
            0 => Vegetation::Unsuitable,
            1 => Vegetation::Interior,
            2 => Vegetation::Edge,
            _ => Vegetation::Other,
        }
    }

    pub fn code(self) -> f64 {
        match self {
            Vegetation::Unsuitable => 0.,
            Vegetation::Interior => 1.,
            Vegetation::Edge => 2.,
            Vegetation::Other => 3.,
        }
    }
}

pub type VegetationLayer = Arc<Vec<Vegetation>>;

/// Convert a raster of vegetation codes, treating no-data as unsuitable.
pub fn vegetation_from_raster(raster: &AsciiGrid) -> Vec<Vegetation> {
    (0..raster.values.len())
        .map(|i| {
            if raster.is_nodata(i) {
                Vegetation::Unsuitable
            } else {
                Vegetation::from_code(raster.values[i])
            }
        })
        .collect()
}

/// The label under which the vegetation of a time slice is stored, i.e. the
/// upper bound of the slice in years BP.
pub fn slice_label(slice: u32, slice_length: u32) -> u32 {
    slice * slice_length
}

/// The time slice a date falls into, `ceil(date / slice_length)`.
///
/// ```rust
/// # use model::terrain::time_slice;
/// assert_eq!(time_slice(5000, 1000), 5);
/// assert_eq!(time_slice(4999, 1000), 5);
/// assert_eq!(time_slice(4000, 1000), 4);
/// ```
pub fn time_slice(date: u32, slice_length: u32) -> u32 {
    (date + slice_length - 1) / slice_length
}

/// Source of terrain data. The engine only ever talks to terrain through
/// this trait, so the data may come from files or from memory.
pub trait TerrainProvider {
    fn geometry(&self) -> Geometry;
    /// One bit per cell, set where the cell is habitable land.
    fn habitable(&self) -> Result<BitVec>;
    fn vegetation(&mut self, label: u32) -> Result<VegetationLayer>;
}

/// Reads layers from a directory of `veg_<label>.asc` files, one file per
/// time slice, as they are needed.
pub struct DirectoryTerrain {
    geometry: Geometry,
    habitable: BitVec,
    directory: PathBuf,
}

impl DirectoryTerrain {
    /**
    Open a directory of vegetation layers. The geometry is taken from the
    static raster if there is one, otherwise from the layer for
    `first_label`. Cells with no data in the static raster are not habitable.
    Without a static raster, cells that are unsuitable (code 0 or no data)
    in the first layer are not habitable.
     */
    pub fn open(
        static_raster: Option<PathBuf>,
        directory: impl Into<PathBuf>,
        first_label: u32,
    ) -> Result<Self> {
        let directory = directory.into();
        let (geometry, habitable) = match static_raster {
            Some(path) => {
                let raster = AsciiGrid::read(path)?;
                let habitable = (0..raster.values.len())
                    .map(|i| !raster.is_nodata(i))
                    .collect();
                (raster.geometry, habitable)
            }
            None => {
                let raster = AsciiGrid::read(directory.join(layer_file_name(first_label)))?;
                let habitable = vegetation_from_raster(&raster)
                    .into_iter()
                    .map(|v| v != Vegetation::Unsuitable)
                    .collect();
                (raster.geometry, habitable)
            }
        };
        Ok(DirectoryTerrain {
            geometry,
            habitable,
            directory,
        })
    }
}

pub fn layer_file_name(label: u32) -> String {
    format!("veg_{}.asc", label)
}

fn check_geometry(expected: &Geometry, found: &Geometry) -> Result<()> {
    if expected.matches(found) {
        Ok(())
    } else {
        Err(Error::GeometryMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        })
    }
}

impl TerrainProvider for DirectoryTerrain {
    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn habitable(&self) -> Result<BitVec> {
        Ok(self.habitable.clone())
    }

    fn vegetation(&mut self, label: u32) -> Result<VegetationLayer> {
        let path = self.directory.join(layer_file_name(label));
        if !path.exists() {
            return Err(Error::MissingLayer { label });
        }
        let raster = AsciiGrid::read(path)?;
        check_geometry(&self.geometry, &raster.geometry)?;
        Ok(Arc::new(vegetation_from_raster(&raster)))
    }
}

/// All layers held in memory. Cloning is cheap, the layers are shared, which
/// is what a parameter sweep wants: load once, run many.
#[derive(Clone)]
pub struct InMemoryTerrain {
    pub geometry: Geometry,
    pub habitable: BitVec,
    pub layers: FxHashMap<u32, VegetationLayer>,
}

impl InMemoryTerrain {
    pub fn new(geometry: Geometry) -> Self {
        InMemoryTerrain {
            geometry,
            habitable: BitVec::repeat(true, geometry.cells()),
            layers: FxHashMap::default(),
        }
    }

    pub fn with_layer(mut self, label: u32, layer: Vec<Vegetation>) -> Self {
        self.layers.insert(label, Arc::new(layer));
        self
    }

    /// Read every layer of a directory provider whose label lies in
    /// `labels` into memory.
    pub fn load<I>(mut source: DirectoryTerrain, labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = u32>,
    {
        let mut layers = FxHashMap::default();
        for label in labels {
            match source.vegetation(label) {
                Ok(layer) => {
                    layers.insert(label, layer);
                }
                Err(Error::MissingLayer { .. }) => {
                    log::debug!("No vegetation layer for {}, skipping", label);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(InMemoryTerrain {
            geometry: source.geometry,
            habitable: source.habitable,
            layers,
        })
    }
}

impl TerrainProvider for InMemoryTerrain {
    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn habitable(&self) -> Result<BitVec> {
        Ok(self.habitable.clone())
    }

    fn vegetation(&mut self, label: u32) -> Result<VegetationLayer> {
        match self.layers.get(&label) {
            Some(layer) if layer.len() == self.geometry.cells() => Ok(Arc::clone(layer)),
            Some(layer) => Err(Error::GeometryMismatch {
                expected: self.geometry.to_string(),
                found: format!("{} cells", layer.len()),
            }),
            None => Err(Error::MissingLayer { label }),
        }
    }
}

/**
The terrain store proper: immutable geometry and habitability, plus the
vegetation of the current time slice, which is replaced only on slice
boundary crossings.
 */
pub struct Terrain {
    pub geometry: Geometry,
    habitable: BitVec,
    vegetation: VegetationLayer,
    time_slice: u32,
    slice_length: u32,
    provider: Box<dyn TerrainProvider + Send>,
}

impl Terrain {
    pub fn new(
        mut provider: Box<dyn TerrainProvider + Send>,
        date: u32,
        slice_length: u32,
    ) -> Result<Self> {
        let geometry = provider.geometry();
        let habitable = provider.habitable()?;
        if habitable.len() != geometry.cells() {
            return Err(Error::GeometryMismatch {
                expected: geometry.to_string(),
                found: format!("{} habitability entries", habitable.len()),
            });
        }
        let slice = time_slice(date, slice_length);
        let vegetation = provider.vegetation(slice_label(slice, slice_length))?;
        Ok(Terrain {
            geometry,
            habitable,
            vegetation,
            time_slice: slice,
            slice_length,
            provider,
        })
    }

    pub fn time_slice(&self) -> u32 {
        self.time_slice
    }

    pub fn vegetation(&self, cell: usize) -> Vegetation {
        self.vegetation[cell]
    }

    pub fn is_habitable_land(&self, cell: usize) -> bool {
        self.habitable[cell]
    }

    /// Swap in the vegetation of the slice `date` falls into, if that is not
    /// the current slice. Returns whether a reload happened.
    pub fn update(&mut self, date: u32) -> Result<bool> {
        let slice = time_slice(date, self.slice_length);
        if slice == self.time_slice {
            return Ok(false);
        }
        let label = slice_label(slice, self.slice_length);
        self.vegetation = self.provider.vegetation(label)?;
        self.time_slice = slice;
        log::info!("Loaded vegetation for {} BP", label);
        Ok(true)
    }
}
