use std::fmt;
use std::str::FromStr;

use serde_derive::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::projection::Projection;
use crate::Date;

/// Which cells count as settleable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForcingMode {
    /// Every habitable land cell can be settled, and the vegetation is never
    /// reloaded.
    Unrestricted,
    /// Only vegetated cells can be settled, vegetation follows the
    /// paleoclimate time slices and populations are evicted from cells that
    /// become unsuitable.
    Vegetation,
}

impl FromStr for ForcingMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "null" | "none" | "unrestricted" => Ok(ForcingMode::Unrestricted),
            "forest" | "moist" | "vegetation" => Ok(ForcingMode::Vegetation),
            other => Err(format!("unknown forcing mode {}", other)),
        }
    }
}

impl fmt::Display for ForcingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForcingMode::Unrestricted => write!(f, "unrestricted"),
            ForcingMode::Vegetation => write!(f, "vegetation"),
        }
    }
}

/// How migrants are shared out between the destinations found for them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Redistribution {
    /// Split evenly across all eligible destinations.
    EvenSplit,
    /// Earlier variant of the model: all migrants go to one destination,
    /// drawn at random.
    RandomSingle { seed: u64 },
}

impl FromStr for Redistribution {
    type Err = String;

    /// `even`, `random` or `random:<seed>`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut parts = s.splitn(2, ':');
        match (parts.next(), parts.next()) {
            (Some("even"), None) => Ok(Redistribution::EvenSplit),
            (Some("random"), None) => Ok(Redistribution::RandomSingle { seed: 0 }),
            (Some("random"), Some(seed)) => seed
                .parse()
                .map(|seed| Redistribution::RandomSingle { seed })
                .map_err(|_| format!("bad seed {}", seed)),
            _ => Err(format!("unknown redistribution policy {}", s)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Parameters {
    /// Date the simulation starts at, in years BP.
    pub start_date: Date,
    /// Longitude and latitude of the centre of origin of the expansion.
    pub origin: (f64, f64),
    /// Annual growth rate of the population.
    pub growth_rate: f64,
    /// Maximum emigration rate, reached when a cell is at carrying capacity.
    pub emigration_rate: f64,
    /// Exponent γ of the crowding term (N/K)^γ in the number of migrants.
    pub crowding_exponent: f64,
    pub forcing: ForcingMode,
    /// Years per time step; one generation.
    pub step_length: Date,
    /// Carrying capacity in persons per km².
    pub carrying_capacity: f64,
    /// Radius, in cells, of the neighbourhood searched for local
    /// destinations. 1 gives the 8 immediate neighbours.
    pub neighbourhood_radius: usize,
    /// Maximum distance of leapfrogging, in km.
    pub leap_distance: f64,
    /// Years over which one vegetation layer stays valid.
    pub slice_length: Date,
    pub redistribution: Redistribution,
    pub projection: Projection,
}

impl Default for Parameters {
    fn default() -> Parameters {
        Parameters {
            start_date: 5000,
            // Upper Madeira
            origin: (-61.96, -10.96),
            growth_rate: 0.025,
            emigration_rate: 0.3,
            crowding_exponent: 1.,
            forcing: ForcingMode::Unrestricted,
            step_length: 30,
            carrying_capacity: 1.,
            neighbourhood_radius: 1,
            leap_distance: 150.,
            slice_length: 1000,
            redistribution: Redistribution::EvenSplit,
            projection: Projection::default(),
        }
    }
}

impl Parameters {
    pub fn validate(&self) -> Result<()> {
        let fail = |message: &str| -> Result<()> { Err(Error::Config(message.to_string())) };
        if !(self.emigration_rate >= 0. && self.emigration_rate < 1.) {
            return fail("emigration rate must lie in [0, 1)");
        }
        if !(self.growth_rate > 0. && self.growth_rate.is_finite()) {
            return fail("growth rate must be positive");
        }
        if !(self.crowding_exponent >= 0. && self.crowding_exponent.is_finite()) {
            return fail("crowding exponent must be non-negative");
        }
        if !(self.carrying_capacity > 0. && self.carrying_capacity.is_finite()) {
            return fail("carrying capacity must be positive");
        }
        if !(self.leap_distance >= 0.) {
            return fail("leap distance must be non-negative");
        }
        if self.step_length == 0 {
            return fail("step length must be positive");
        }
        if self.slice_length == 0 {
            return fail("slice length must be positive");
        }
        if self.start_date == 0 {
            return fail("start date must be positive");
        }
        if self.neighbourhood_radius == 0 {
            return fail("neighbourhood radius must be at least one cell");
        }
        Ok(())
    }

    /// Enough steps to get from the start date down to 500 BP.
    pub fn default_iterations(&self) -> u32 {
        self.start_date.saturating_sub(500) / self.step_length.max(1)
    }
}
