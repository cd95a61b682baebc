/*!
Model Description
=================

This model description follows the ODD (Overview, Design concept, Details)
protocol (Grimm et al., 2006; Grimm et al., 2010). As in the hunter-gatherer
dispersal model this code grew out of, the description and the code live in
the same file: the sections below document the model, and the items following
each section implement it.

# 1. Purpose

The model simulates the spread of a population of farmers across a gridded
landscape, to test hypotheses about prehistoric dispersals against the dates
of archaeological findspots. Each run produces, for every cell of the
landscape, the simulated date at which the population first arrived there.
Comparing those dates with radiocarbon dates of sites attributed to the
dispersing culture gives a fit score, which can be used to rank different
parameterizations and, in particular, to compare an expansion unconstrained by
environment with one restricted to a particular vegetation type.

The model is deliberately simple: logistic growth in each cell,
density-dependent emigration to neighbouring cells, long-distance leaps along
the margins of the preferred biome, and eviction from cells whose environment
becomes unsuitable as the paleovegetation changes.

 */

use std::fs::File;
use std::path::Path;

use bitvec::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_derive::{Deserialize, Serialize};

pub mod argparse;
pub mod error;
pub mod minimal_logger;
pub mod parameters;
pub mod projection;
pub mod raster;
pub mod scoring;
pub mod terrain;
mod debug;
#[cfg(test)]
mod tests;

pub use error::{Error, Result};
pub use parameters::{ForcingMode, Parameters, Redistribution};
use terrain::{Terrain, TerrainProvider};

/**

# 2. Entities, state variables, and scales

The model consists of cells on a regular grid in an equal-area projection, in
discrete time. One time step corresponds to one human generation, 30 years by
default. Time is measured as a date in years before present (BP), so it counts
*down* as the simulation advances.

 */
pub type Date = u32;

/// Population counts are whole persons.
pub type Population = u32;

/**
## 2.1 Grid and cells

The landscape is a fixed, dense, row-major grid. Each cell has a fixed area
given by the cell size of the input rasters, a static habitability (whether it
is land at all), and a vegetation class that changes with the time slices of
the paleovegetation reconstruction (see the `terrain` module). The carrying
capacity K of a cell is proportional to its area.

Each cell also carries the two state variables of the population: the number
of people living there, and the date people first arrived there. The arrival
date is 0 for cells never reached. Once set, an arrival date never changes
again, even if the cell is later abandoned.

## 2.2 Active cells

Cells with people living in them are *active*. Only active cells grow,
disperse, and can be evicted, so the active set is what the step loop iterates
over. It is kept as a bit per cell for membership tests, plus the cells in the
order they were settled, which fixes the order in which they are processed.

 */
#[derive(Clone)]
pub struct ActiveSet {
    members: BitVec,
    order: Vec<usize>,
}

impl ActiveSet {
    pub fn new(cells: usize) -> Self {
        ActiveSet {
            members: BitVec::repeat(false, cells),
            order: Vec::new(),
        }
    }

    pub fn contains(&self, cell: usize) -> bool {
        self.members[cell]
    }

    pub fn insert(&mut self, cell: usize) {
        if !self.members[cell] {
            self.members.set(cell, true);
            self.order.push(cell);
        }
    }

    /// Removal only clears the membership bit; the order is cleaned up
    /// lazily by `retain`.
    pub fn remove(&mut self, cell: usize) {
        self.members.set(cell, false);
    }

    pub fn len(&self) -> usize {
        self.members.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.members.not_any()
    }

    /// Drop all members for which `keep` is false, then bring the settlement
    /// order up to date. A cell that was removed and settled again counts
    /// from its latest settlement.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(usize) -> bool,
    {
        for &cell in &self.order {
            if self.members[cell] && !keep(cell) {
                self.members.set(cell, false);
            }
        }
        let mut seen = BitVec::<usize, Lsb0>::repeat(false, self.members.len());
        let mut kept = Vec::with_capacity(self.order.len());
        for &cell in self.order.iter().rev() {
            if self.members[cell] && !seen[cell] {
                seen.set(cell, true);
                kept.push(cell);
            }
        }
        kept.reverse();
        self.order = kept;
    }

    /// Members in settlement order. Only exact after `retain`.
    pub fn cells(&self) -> &[usize] {
        &self.order
    }
}

/**
## 2.3 State

The state of a run: terrain, the per-cell population and arrival dates, the
active cells, and the current date. The state also stores a copy of the model
parameters and the constants derived from them and the terrain once at
initialization, so that several runs over different terrains can coexist.

 */
pub struct State {
    pub terrain: Terrain,
    population: Vec<Population>,
    arrival_time: Vec<Date>,
    active: ActiveSet,
    /// The current date, in years BP.
    pub date: Date,
    p: Parameters,
    /// Carrying capacity K of a cell, in persons.
    capacity: f64,
    neighbourhood: Vec<(isize, isize)>,
    leap_mask: Vec<(isize, isize)>,
    /// Only drawn from under `Redistribution::RandomSingle`.
    rng: StdRng,
    slices: Vec<observation::TimeSlice>,
    /// Date at the end of the step that left no cell settled.
    extinct_at: Option<Date>,
}

impl State {
    pub fn parameters(&self) -> &Parameters {
        &self.p
    }

    pub fn carrying_capacity(&self) -> f64 {
        self.capacity
    }

    pub fn population(&self, cell: usize) -> Population {
        self.population[cell]
    }

    pub fn total_population(&self) -> u64 {
        self.population.iter().map(|&n| n as u64).sum()
    }

    pub fn arrival_time(&self, cell: usize) -> Date {
        self.arrival_time[cell]
    }

    /// Arrival dates of all cells, row-major, 0 where never reached.
    pub fn arrival_times(&self) -> &[Date] {
        &self.arrival_time
    }

    pub fn is_active(&self, cell: usize) -> bool {
        self.active.contains(cell)
    }

    pub fn active_cells(&self) -> usize {
        self.active.len()
    }

    pub fn slices(&self) -> &[observation::TimeSlice] {
        &self.slices
    }

    pub fn extinct_at(&self) -> Option<Date> {
        self.extinct_at
    }

    /// Put `population` people into a cell, marking it settled at the
    /// current date if nobody arrived there before.
    pub fn settle(&mut self, cell: usize, population: Population) {
        self.population[cell] = population;
        if population > 0 {
            self.active.insert(cell);
            if self.arrival_time[cell] == 0 {
                self.arrival_time[cell] = self.date;
            }
        }
    }
}

/**
# 3. Process overview and scheduling

The model progresses in discrete time steps of one generation each. A step
first checks whether the date has moved into a new time slice of the
paleovegetation and, if the run is restricted by vegetation, reloads the
vegetation layer. Then, for each cell that was active at the start of the
step, in the order the cells were settled:

 1. the population grows (Submodel 7.1),
 2. part of it emigrates (Submodel 7.2),
 3. it is evicted if the environment has become unsuitable (Submodel 7.3).

Cells settled during a step are only processed from the next step on, so a
population can spread at most one neighbourhood (or one leap) per generation.
Finally, the date advances by one generation.

 */
fn step(s: &mut State) -> Result<()> {
    if s.p.forcing == ForcingMode::Vegetation {
        s.terrain.update(s.date)?;
    }

    let population = &s.population;
    s.active.retain(|cell| population[cell] > 0);
    let snapshot = s.active.cells().to_vec();

    for cell in snapshot {
        if s.population[cell] > 0 {
            submodels::growth::grow(s, cell);
            submodels::dispersal::disperse(s, cell);
        }
        submodels::forcing::check_env(s, cell);
    }

    s.date -= s.p.step_length;
    Ok(())
}

/**
# 4. Design concepts

## 4.1 Basic principles

The model is a cellular demic diffusion model in the tradition of
wave-of-advance models of farming dispersals: the expansion front is not
imposed, but emerges from local growth and density-driven emigration. The
main hypothesis it is built to test is whether an expansion tied to a
particular biome reproduces the archaeological dates better than one that can
settle any land, so the environmental restriction is a switch
(`ForcingMode`), not a gradient.

## 4.2 Emergence

The speed and shape of the expansion front, and thus the arrival dates, are
emergent. The rate of spread follows from growth rate, emigration rate and the
neighbourhood size; leaps along the forest margin make it faster and patchier.

## 4.3 Sensing

A crowded cell only knows about the cells in its immediate neighbourhood, a
square of `neighbourhood_radius` cells around it. If none of them can take
migrants and the cell lies on the margin of the forest, its population also
knows about margin cells further away, up to the maximum leap distance.

 */
pub mod sensing {
    use itertools::iproduct;

    /// Offsets, as (columns, rows), of the cells in a square neighbourhood.
    ///
    /// ```rust
    /// let n = model::sensing::neighbourhood(1);
    /// assert_eq!(n.len(), 8);
    /// assert_eq!(n[0], (-1, -1));
    /// assert!(!n.contains(&(0, 0)));
    /// ```
    pub fn neighbourhood(radius: usize) -> Vec<(isize, isize)> {
        let r = radius as isize;
        iproduct!(-r..=r, -r..=r)
            .map(|(dr, dc)| (dc, dr))
            .filter(|&offset| offset != (0, 0))
            .collect()
    }

    /**
    Offsets of the cells within leap distance, excluding the immediate
    neighbours. Distances are measured between cell centres in whole cells,
    rounded to the nearest integer.

    ```rust
    // 150 km in cells of 25 km are 6 cells
    let mask = model::sensing::leap_mask(150., 25_000.);
    assert!(mask.contains(&(6, 0)));
    assert!(mask.contains(&(2, 0)));
    assert!(!mask.contains(&(7, 0)));
    assert!(!mask.contains(&(1, 1)));
    ```
     */
    pub fn leap_mask(leap_distance_km: f64, cellsize_m: f64) -> Vec<(isize, isize)> {
        let dist = (leap_distance_km / (cellsize_m / 1000.)) as isize;
        iproduct!(-dist..=dist, -dist..=dist)
            .map(|(dr, dc)| (dc, dr))
            .filter(|&(i, j)| {
                let d = (i as f64).hypot(j as f64).round() as isize;
                (i, j) != (0, 0) && 1 < d && d <= dist
            })
            .collect()
    }
}

/**
## 4.4 Interaction

Cells interact only through migrants. A destination takes migrants only while
it is below a soft ceiling of K·(1 − emigration rate), not K itself: a cell
filled up to K would immediately start to send a large share of its people
back, which makes neighbouring cells oscillate.

## 4.5 Stochasticity

None. Migrants are split evenly between all destinations, so a run is fully
determined by its parameters and data. An earlier variant of the model sent
all migrants to one destination drawn at random; it is still available as
`Redistribution::RandomSingle`, with a fixed seed.

## 4.6 Observation

The main output is the grid of arrival dates. Comparing it to site dates is
the job of the `scoring` module. For visualizing the course of the expansion,
the run also records a small number of snapshots of which cells are occupied,
evenly spaced over the run.

 */
pub mod observation {
    use std::path::{Path, PathBuf};

    use bitvec::prelude::*;

    use crate::raster::{AsciiGrid, Geometry, NO_DATA};
    use crate::{Date, Result, State};

    pub struct Settings {
        /// Number of occupancy snapshots to take during a run.
        pub time_slices: usize,
        /// Period of progress logging, in steps. 0 turns it off.
        pub log_every: u32,
    }

    impl Default for Settings {
        fn default() -> Self {
            Settings {
                time_slices: 5,
                log_every: 0,
            }
        }
    }

    /// Which cells were occupied at a date. Taken during a run, never changed
    /// afterwards.
    #[derive(Clone)]
    pub struct TimeSlice {
        occupied: BitVec,
        date: Date,
    }

    impl TimeSlice {
        pub fn capture(s: &State) -> Self {
            TimeSlice {
                occupied: s.population.iter().map(|&n| n > 0).collect(),
                date: s.date,
            }
        }

        pub fn date(&self) -> Date {
            self.date
        }

        pub fn occupied(&self) -> &BitSlice {
            &self.occupied
        }

        pub fn to_raster(&self, geometry: Geometry) -> AsciiGrid {
            AsciiGrid {
                geometry,
                nodata_value: NO_DATA,
                values: self
                    .occupied
                    .iter()
                    .map(|o| if *o { 1. } else { 0. })
                    .collect(),
            }
        }
    }

    /// The number of steps between two snapshots.
    pub fn sampling_interval(iterations: u32, samples: usize) -> Option<u32> {
        if samples == 0 {
            None
        } else {
            Some(std::cmp::max(iterations / samples as u32, 1))
        }
    }

    pub fn log_progress(s: &State, iteration: u32) {
        log::info!(
            "t: {} ({} BP), {} cells settled, population {}",
            iteration,
            s.date,
            s.active_cells(),
            s.total_population()
        );
    }

    /// The arrival dates as a raster, with never-reached cells as no data.
    pub fn arrival_raster(s: &State) -> AsciiGrid {
        AsciiGrid {
            geometry: s.terrain.geometry,
            nodata_value: NO_DATA,
            values: s
                .arrival_time
                .iter()
                .map(|&d| if d == 0 { NO_DATA } else { d as f64 })
                .collect(),
        }
    }

    /// Inverse of `arrival_raster`.
    pub fn arrival_times_from_raster(raster: &AsciiGrid) -> Vec<Date> {
        (0..raster.values.len())
            .map(|i| {
                if raster.is_nodata(i) {
                    0
                } else {
                    raster.values[i].round() as Date
                }
            })
            .collect()
    }

    fn with_suffix(stem: &Path, suffix: &str) -> PathBuf {
        let mut name = stem.as_os_str().to_os_string();
        name.push(suffix);
        PathBuf::from(name)
    }

    /// Write `<stem>.asc` with the arrival dates and one `<stem>_<date>.asc`
    /// per time slice.
    pub fn write_outputs(s: &State, stem: &Path) -> Result<()> {
        arrival_raster(s).write(with_suffix(stem, ".asc"))?;
        for slice in s.slices() {
            slice
                .to_raster(s.terrain.geometry)
                .write(with_suffix(stem, &format!("_{}.asc", slice.date())))?;
        }
        Ok(())
    }

    pub fn summary_path(stem: &Path) -> PathBuf {
        with_suffix(stem, ".json")
    }

    pub fn sites_path(stem: &Path) -> PathBuf {
        with_suffix(stem, "_sites.csv")
    }
}

/**
# 5. Initialization

The landscape and the vegetation of the time slice containing the start date
are loaded once. The whole population starts in the single cell containing the
centre of origin, at full carrying capacity, which is settled at the start
date.

 */
pub fn initialization(p: Parameters, provider: Box<dyn TerrainProvider + Send>) -> Result<State> {
    p.validate()?;
    let terrain = Terrain::new(provider, p.start_date, p.slice_length)?;
    let geometry = terrain.geometry;

    let capacity = p.carrying_capacity * geometry.cell_area();
    if capacity.round() < 1. {
        return Err(Error::Config(format!(
            "a carrying capacity of {} persons per cell cannot hold anyone",
            capacity
        )));
    }

    let (x, y) = p.projection.forward(p.origin.0, p.origin.1);
    let origin = geometry.cell_of(x, y)?;

    let cells = geometry.cells();
    let seed = match p.redistribution {
        Redistribution::RandomSingle { seed } => seed,
        Redistribution::EvenSplit => 0,
    };
    let mut s = State {
        population: vec![0; cells],
        arrival_time: vec![0; cells],
        active: ActiveSet::new(cells),
        date: p.start_date,
        capacity,
        neighbourhood: sensing::neighbourhood(p.neighbourhood_radius),
        leap_mask: sensing::leap_mask(p.leap_distance, geometry.cellsize),
        rng: StdRng::seed_from_u64(seed),
        slices: vec![],
        extinct_at: None,
        terrain,
        p,
    };

    if !submodels::dispersal::settleable(&s, origin) {
        log::warn!("The origin {:?} is not settleable", geometry.column_row(origin));
    }
    s.settle(origin, capacity.round() as Population);
    log::info!(
        "Starting at {:?} with {} people in {} BP",
        geometry.column_row(origin),
        s.population[origin],
        s.date
    );
    Ok(s)
}

/**
# 6. Input data

The model reads a static raster of habitable land and one raster of
paleovegetation classes per time slice of 1000 years, all on the same grid.
Reading them is the job of the `raster` and `terrain` modules. Site dates for
scoring are read by the `scoring` module.

# 7. Submodels

 */
pub mod submodels {
    /**
    ## 7.1 Growth

    Population grows logistically with an annual rate r towards the carrying
    capacity K. Instead of iterating the discrete logistic map year by year,
    the step applies the exact solution of the continuous logistic equation
    over one generation, rounded to whole persons.
     */
    pub mod growth {
        use crate::{Date, Population, State};

        /**
        N' = K·N / ((K − N)·exp(−r·t) + N)

        ```rust
        # use model::submodels::growth::logistic;
        assert_eq!(logistic(625, 625., 0.025, 30), 625);
        assert_eq!(logistic(1, 625., 0.025, 30), 2);
        assert_eq!(logistic(0, 625., 0.025, 30), 0);
        ```
         */
        pub fn logistic(n: Population, k: f64, r: f64, years: Date) -> Population {
            let n = n as f64;
            (k * n / ((k - n) * (-r * years as f64).exp() + n)).round() as Population
        }

        pub fn grow(s: &mut State, cell: usize) {
            s.population[cell] = logistic(
                s.population[cell],
                s.capacity,
                s.p.growth_rate,
                s.p.step_length,
            );
        }
    }

    /**
    ## 7.2 Dispersal

    Part of a cell's population emigrates every generation, more the more
    crowded the cell is: migrants = round(N · e · (N/K)^γ), where e is the
    emigration rate and γ = 1 by default. The migrants are redistributed to
    all eligible cells in the neighbourhood. Only if there are none, and the
    cell lies on the margin of the forest, they leapfrog to margin cells
    within leap distance instead.
     */
    pub mod dispersal {
        use rand::Rng;

        use crate::terrain::Vegetation;
        use crate::{ForcingMode, Population, Redistribution, State};

        pub fn migrants(n: Population, k: f64, emigration_rate: f64, gamma: f64) -> Population {
            let n = n as f64;
            (n * emigration_rate * (n / k).powf(gamma)).round() as Population
        }

        /// Destinations take migrants only below this many people.
        pub fn soft_ceiling(s: &State) -> f64 {
            s.capacity * (1. - s.p.emigration_rate)
        }

        /// Whether people can live in a cell under the run's forcing mode.
        pub fn settleable(s: &State, cell: usize) -> bool {
            s.terrain.is_habitable_land(cell)
                && match s.p.forcing {
                    ForcingMode::Unrestricted => true,
                    ForcingMode::Vegetation => {
                        s.terrain.vegetation(cell) != Vegetation::Unsuitable
                    }
                }
        }

        fn has_room(s: &State, cell: usize) -> bool {
            (s.population[cell] as f64) < soft_ceiling(s)
        }

        pub fn local_destinations(s: &State, cell: usize) -> Vec<usize> {
            s.neighbourhood
                .iter()
                .filter_map(|&offset| s.terrain.geometry.shifted(cell, offset))
                .filter(|&c| settleable(s, c) && has_room(s, c))
                .collect()
        }

        pub fn leap_destinations(s: &State, cell: usize) -> Vec<usize> {
            s.leap_mask
                .iter()
                .filter_map(|&offset| s.terrain.geometry.shifted(cell, offset))
                .filter(|&c| {
                    s.terrain.vegetation(c) == Vegetation::Edge
                        && settleable(s, c)
                        && has_room(s, c)
                })
                .collect()
        }

        pub fn disperse(s: &mut State, cell: usize) {
            let n = migrants(
                s.population[cell],
                s.capacity,
                s.p.emigration_rate,
                s.p.crowding_exponent,
            );
            if n == 0 {
                return;
            }
            let local = local_destinations(s, cell);
            if !local.is_empty() {
                move_population(s, cell, &local, n);
            } else if s.terrain.vegetation(cell) == Vegetation::Edge {
                let leap = leap_destinations(s, cell);
                if !leap.is_empty() {
                    move_population(s, cell, &leap, n);
                }
            }
        }

        /**
        Move `migrants` people from one cell to the destinations, in equal
        shares. If a share would be less than one person, nobody moves. The
        remainder of the integer division is lost. Newly settled destinations
        become active and are stamped with the current date, unless they were
        reached before. Returns whether anybody moved.
         */
        pub fn move_population(
            s: &mut State,
            from: usize,
            destinations: &[usize],
            migrants: Population,
        ) -> bool {
            if destinations.is_empty() {
                return false;
            }
            let chosen = match s.p.redistribution {
                Redistribution::EvenSplit => destinations,
                Redistribution::RandomSingle { .. } => {
                    let i = s.rng.gen_range(0..destinations.len());
                    &destinations[i..=i]
                }
            };
            let share = migrants / chosen.len() as Population;
            if share == 0 {
                return false;
            }

            s.population[from] = match s.population[from].checked_sub(migrants) {
                Some(rest) => rest,
                None => {
                    log::warn!(
                        "Moving {} people out of a cell with {} at {} BP, clamping to 0",
                        migrants,
                        s.population[from],
                        s.date
                    );
                    0
                }
            };
            for &destination in chosen {
                if s.population[destination] == 0 {
                    s.active.insert(destination);
                }
                s.population[destination] = s.population[destination].saturating_add(share);
                if s.arrival_time[destination] == 0 {
                    s.arrival_time[destination] = s.date;
                }
            }
            true
        }
    }

    /**
    ## 7.3 Environmental forcing

    When the vegetation of a settled cell becomes unsuitable, its whole
    population has to leave. They go to neighbouring cells if they can,
    otherwise they try to leap; if there is no refuge either way, they are
    lost. The cell is abandoned in any case. Its arrival date stays.
     */
    pub mod forcing {
        use super::dispersal::{leap_destinations, local_destinations, move_population, settleable};
        use crate::State;

        pub fn check_env(s: &mut State, cell: usize) {
            if settleable(s, cell) {
                return;
            }
            let migrants = s.population[cell];
            if migrants > 0 {
                let local = local_destinations(s, cell);
                let moved = if !local.is_empty() {
                    move_population(s, cell, &local, migrants)
                } else {
                    let leap = leap_destinations(s, cell);
                    move_population(s, cell, &leap, migrants)
                };
                if !moved {
                    log::debug!(
                        "{} people found no refuge from {:?} at {} BP",
                        migrants,
                        s.terrain.geometry.column_row(cell),
                        s.date
                    );
                }
            }
            s.population[cell] = 0;
            s.active.remove(cell);
        }
    }
}

/// What gets stored next to the rasters after a run.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub parameters: Parameters,
    pub iterations: u32,
    pub final_date: Date,
    pub cells_reached: usize,
    pub score: Option<scoring::Score>,
}

pub fn store_summary(summary: &RunSummary, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, summary)?;
    Ok(())
}

/// Run the simulation for a number of steps, recording time slices on the
/// way, and return the arrival dates of all cells.
pub fn run(s: &mut State, iterations: u32, o: &observation::Settings) -> Result<Vec<Date>> {
    if iterations as u64 * s.p.step_length as u64 > s.date as u64 {
        return Err(Error::Config(format!(
            "{} steps of {} years from {} BP would run past the present",
            iterations, s.p.step_length, s.date
        )));
    }
    let interval = observation::sampling_interval(iterations, o.time_slices);
    let mut recorded = 0;

    for i in 0..iterations {
        step(s)?;

        if let Some(interval) = interval {
            if i % interval == 0 && recorded < o.time_slices {
                let slice = observation::TimeSlice::capture(s);
                s.slices.push(slice);
                recorded += 1;
            }
        }
        if o.log_every > 0 && i % o.log_every == 0 {
            observation::log_progress(s, i);
        }
        if s.extinct_at.is_none() && s.active.is_empty() {
            s.extinct_at = Some(s.date);
            log::debug!("No settled cells left at {} BP", s.date);
        }
    }
    log::info!(
        "Ended at {} BP with {} cells reached",
        s.date,
        s.arrival_time.iter().filter(|&&d| d > 0).count()
    );
    Ok(s.arrival_time.clone())
}
