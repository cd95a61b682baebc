/*!
Comparison of simulated arrival dates with dated archaeological sites.

The fit of a run is the root mean square error between the radiocarbon dates
of the sites and the simulated arrival dates of the cells they lie in, over
all sites the simulated expansion reached. A run that misses too many of the
sites altogether is not given a number at all: it is `Score::Unusable`, and
ranks below every run that has a finite score.
 */

use std::cmp::Ordering;
use std::io::{Read, Write};
use std::path::Path;

use serde_derive::{Deserialize, Serialize};

use crate::error::Result;
use crate::projection::distance;
use crate::{Date, State};

/// The largest fraction of sites the expansion may fail to reach while
/// still getting a score.
pub const UNREACHED_TOLERANCE: f64 = 0.25;

/// A dated site, in geographic coordinates.
#[derive(Clone, Debug, Deserialize)]
pub struct Site {
    pub x: f64,
    pub y: f64,
    /// Observed date, in years BP.
    pub bp: f64,
    /// Distance from the centre of origin, in km.
    #[serde(default)]
    pub dist: Option<f64>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ScoreRecord {
    pub x: f64,
    pub y: f64,
    pub dist: f64,
    pub bp: f64,
    /// 0 if the site's cell was never reached.
    pub sim_date: Date,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub enum Score {
    Finite(f64),
    Unusable,
}

impl Score {
    pub fn value(&self) -> Option<f64> {
        match self {
            Score::Finite(v) => Some(*v),
            Score::Unusable => None,
        }
    }
}

/**
Lower is better, and unusable is worse than anything finite.

```rust
# use model::scoring::Score;
assert!(Score::Finite(100.) < Score::Finite(250.));
assert!(Score::Finite(1e9) < Score::Unusable);
```
 */
impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Score::Finite(a), Score::Finite(b)) => a.total_cmp(b),
            (Score::Finite(_), Score::Unusable) => Ordering::Less,
            (Score::Unusable, Score::Finite(_)) => Ordering::Greater,
            (Score::Unusable, Score::Unusable) => Ordering::Equal,
        }
    }
}
impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Score {}

pub fn read_sites(path: impl AsRef<Path>) -> Result<Vec<Site>> {
    let reader = csv::Reader::from_path(path)?;
    collect_sites(reader)
}

pub fn sites_from_reader<R: Read>(reader: R) -> Result<Vec<Site>> {
    collect_sites(csv::Reader::from_reader(reader))
}

fn collect_sites<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<Site>> {
    let mut sites = vec![];
    for site in reader.deserialize() {
        sites.push(site?);
    }
    Ok(sites)
}

pub fn write_records(path: impl AsRef<Path>, records: &[ScoreRecord]) -> Result<()> {
    records_to_writer(std::fs::File::create(path)?, records)
}

pub fn records_to_writer<W: Write>(writer: W, records: &[ScoreRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/**
RMSE between observed and simulated dates over the reached sites, or
`Unusable` if more than a quarter of the sites were not reached.

```rust
# use model::scoring::{rmse, Score};
assert_eq!(rmse(&[(4300., 4200), (3900., 3800)]), Score::Finite(100.));
assert_eq!(rmse(&[(4300., 4200), (3900., 3800), (3500., 0)]), Score::Unusable);
```
 */
pub fn rmse(observed_and_simulated: &[(f64, Date)]) -> Score {
    let total = observed_and_simulated.len();
    let reached: Vec<_> = observed_and_simulated
        .iter()
        .filter(|(_, sim)| *sim > 0)
        .collect();
    if total == 0 || (total - reached.len()) as f64 / total as f64 > UNREACHED_TOLERANCE {
        return Score::Unusable;
    }
    let sum: f64 = reached
        .iter()
        .map(|(bp, sim)| (bp - *sim as f64).powi(2))
        .sum();
    Score::Finite((sum / reached.len() as f64).sqrt())
}

/// Look up the simulated arrival date for every site and score the run.
pub fn score(s: &State, sites: &[Site]) -> Result<(Vec<ScoreRecord>, Score)> {
    let p = s.parameters();
    let geometry = s.terrain.geometry;
    let origin = p.projection.forward(p.origin.0, p.origin.1);

    let mut records = Vec::with_capacity(sites.len());
    for site in sites {
        let projected = p.projection.forward(site.x, site.y);
        let cell = geometry.cell_of(projected.0, projected.1)?;
        records.push(ScoreRecord {
            x: site.x,
            y: site.y,
            dist: site
                .dist
                .unwrap_or_else(|| distance(origin, projected) / 1000.),
            bp: site.bp,
            sim_date: s.arrival_time(cell),
        });
    }

    let pairs: Vec<(f64, Date)> = records.iter().map(|r| (r.bp, r.sim_date)).collect();
    let result = rmse(&pairs);
    if result == Score::Unusable {
        log::warn!(
            "{} of {} sites not reached, the run is unusable",
            pairs.iter().filter(|(_, sim)| *sim == 0).count(),
            pairs.len()
        );
    }
    Ok((records, result))
}
