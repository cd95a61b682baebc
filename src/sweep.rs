use std::fs::File;
use std::path::PathBuf;

use dashmap::DashMap;
use itertools::iproduct;
use rayon::prelude::*;
use serde_derive::Serialize;

use model::observation::Settings;
use model::projection::Projection;
use model::scoring::{self, Score, Site};
use model::terrain::{slice_label, time_slice, DirectoryTerrain, InMemoryTerrain};
use model::{initialization, minimal_logger, run, ForcingMode, Parameters};

#[derive(Serialize)]
struct Ranked {
    parameters: Parameters,
    score: Score,
}

fn simulate(p: Parameters, terrain: InMemoryTerrain, sites: &[Site]) -> Result<Score, String> {
    let iterations = p.default_iterations();
    let mut s = initialization(p, Box::new(terrain)).map_err(|e| e.to_string())?;
    let o = Settings {
        time_slices: 0,
        log_every: 0,
    };
    run(&mut s, iterations, &o).map_err(|e| e.to_string())?;
    let (_, score) = scoring::score(&s, sites).map_err(|e| e.to_string())?;
    Ok(score)
}

fn main() -> Result<(), String> {
    let mut base = Parameters::default();
    let mut start_dates: Vec<u32> = vec![];
    let mut growth_rates: Vec<f64> = vec![];
    let mut emigration_rates: Vec<f64> = vec![];
    let mut forcings: Vec<ForcingMode> = vec![];
    let mut terrain: Option<String> = None;
    let mut vegetation = "layers/veg".to_string();
    let mut sites_file = "sites/sites.csv".to_string();
    let mut output = "ranking.json".to_string();
    let mut projected = false;
    let mut log_level = log::LevelFilter::Warn;
    {
        let mut parser = argparse::ArgumentParser::new();
        parser.set_description("Run a parameter sweep of dispersal simulations and rank them");
        parser.refer(&mut start_dates).add_option(
            &["--start-dates"],
            argparse::List,
            "start dates to try, in years BP",
        );
        parser.refer(&mut growth_rates).add_option(
            &["--growth-rates"],
            argparse::List,
            "annual growth rates to try",
        );
        parser.refer(&mut emigration_rates).add_option(
            &["--emigration-rates"],
            argparse::List,
            "emigration rates to try",
        );
        parser.refer(&mut forcings).add_option(
            &["--forcing"],
            argparse::List,
            "forcing modes to try",
        );
        parser.refer(&mut base.origin.0).add_option(
            &["--longitude"],
            argparse::Store,
            "longitude of the centre of origin",
        );
        parser.refer(&mut base.origin.1).add_option(
            &["--latitude"],
            argparse::Store,
            "latitude of the centre of origin",
        );
        parser.refer(&mut terrain).add_option(
            &["--terrain"],
            argparse::StoreOption,
            "static raster of habitable land",
        );
        parser.refer(&mut vegetation).add_option(
            &["--vegetation"],
            argparse::Store,
            "directory with vegetation layers veg_<date>.asc",
        );
        parser.refer(&mut sites_file).add_option(
            &["--sites"],
            argparse::Store,
            "CSV of dated sites (x, y, bp[, dist])",
        );
        parser.refer(&mut output).add_option(
            &["--output"],
            argparse::Store,
            "file to write the ranking to",
        );
        parser.refer(&mut projected).add_option(
            &["--projected"],
            argparse::StoreTrue,
            "coordinates are given in the grid's projection",
        );
        parser.refer(&mut log_level).add_option(
            &["--log-level"],
            argparse::Store,
            "error, warn, info, debug or trace",
        );
        parser.parse_args_or_exit();
    }
    minimal_logger::init(log_level)?;

    if projected {
        base.projection = Projection::Identity;
    }
    if start_dates.is_empty() {
        start_dates.push(base.start_date);
    }
    if growth_rates.is_empty() {
        growth_rates.push(base.growth_rate);
    }
    if emigration_rates.is_empty() {
        emigration_rates.push(base.emigration_rate);
    }
    if forcings.is_empty() {
        forcings = vec![ForcingMode::Unrestricted, ForcingMode::Vegetation];
    }

    let newest = start_dates.iter().copied().max().unwrap_or(base.start_date);
    let first_slice = time_slice(newest, base.slice_length);
    let provider = DirectoryTerrain::open(
        terrain.map(PathBuf::from),
        &vegetation,
        slice_label(first_slice, base.slice_length),
    )
    .map_err(|e| e.to_string())?;
    let layers = InMemoryTerrain::load(
        provider,
        (1..=first_slice).map(|slice| slice_label(slice, base.slice_length)),
    )
    .map_err(|e| e.to_string())?;
    let sites = scoring::read_sites(&sites_file).map_err(|e| e.to_string())?;

    let combinations: Vec<Parameters> =
        iproduct!(&start_dates, &growth_rates, &emigration_rates, &forcings)
            .map(|(&start_date, &growth_rate, &emigration_rate, &forcing)| Parameters {
                start_date,
                growth_rate,
                emigration_rate,
                forcing,
                ..base.clone()
            })
            .collect();
    eprintln!("Running {} parameter combinations…", combinations.len());

    let results: DashMap<usize, Ranked> = DashMap::new();
    combinations.into_par_iter().enumerate().for_each(|(i, p)| {
        match simulate(p.clone(), layers.clone(), &sites) {
            Ok(score) => {
                log::info!("{:?}: {:?}", p, score);
                results.insert(i, Ranked { parameters: p, score });
            }
            Err(e) => log::error!("{:?} failed: {}", p, e),
        }
    });

    let mut ranking: Vec<Ranked> = results.into_iter().map(|(_, r)| r).collect();
    ranking.sort_by(|a, b| a.score.cmp(&b.score));
    for r in ranking.iter().take(10) {
        println!(
            "{:?}\t{}\t{}\t{}\t{}",
            r.score,
            r.parameters.start_date,
            r.parameters.growth_rate,
            r.parameters.emigration_rate,
            r.parameters.forcing
        );
    }

    let file = File::create(&output).map_err(|e| e.to_string())?;
    serde_json::to_writer_pretty(file, &ranking).map_err(|e| e.to_string())
}
