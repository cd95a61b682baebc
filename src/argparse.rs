use crate::observation::Settings;
use crate::Parameters;

/// Where the data comes from and where results go.
pub struct Files {
    /// Static raster; cells with no data there are never habitable.
    pub terrain: Option<String>,
    /// Directory with one `veg_<label>.asc` per time slice.
    pub vegetation: String,
    pub sites: Option<String>,
    /// Output file stem.
    pub output: String,
    /// Coordinates are already projected to the grid's system.
    pub projected: bool,
    pub log_level: log::LevelFilter,
}

impl Default for Files {
    fn default() -> Self {
        Files {
            terrain: None,
            vegetation: "layers/veg".to_string(),
            sites: None,
            output: "output/arrival_times".to_string(),
            projected: false,
            log_level: log::LevelFilter::Info,
        }
    }
}

pub fn parse_args<'a>(
    p: &'a mut Parameters,
    iterations: &'a mut u32,
    observation: &'a mut Settings,
    files: &'a mut Files,
) -> argparse::ArgumentParser<'a> {
    let mut parser = argparse::ArgumentParser::new();
    parser.set_description("Run a dispersal simulation");
    parser.refer(&mut p.start_date).add_option(
        &["--start-date"],
        argparse::Store,
        "date the expansion starts, in years BP",
    );
    parser.refer(&mut p.origin.0).add_option(
        &["--longitude"],
        argparse::Store,
        "longitude of the centre of origin",
    );
    parser.refer(&mut p.origin.1).add_option(
        &["--latitude"],
        argparse::Store,
        "latitude of the centre of origin",
    );
    parser.refer(&mut p.growth_rate).add_option(
        &["--growth-rate"],
        argparse::Store,
        "annual population growth rate",
    );
    parser.refer(&mut p.emigration_rate).add_option(
        &["--emigration-rate"],
        argparse::Store,
        "emigration rate of a cell at carrying capacity, in [0, 1)",
    );
    parser.refer(&mut p.crowding_exponent).add_option(
        &["--crowding-exponent"],
        argparse::Store,
        "exponent of the crowding term (N/K)^γ in emigration",
    );
    parser.refer(&mut p.forcing).add_option(
        &["--forcing"],
        argparse::Store,
        "unrestricted (any land) or vegetation (forest only, with eviction)",
    );
    parser.refer(&mut p.step_length).add_option(
        &["--step-length"],
        argparse::Store,
        "years per time step (one generation)",
    );
    parser.refer(&mut p.carrying_capacity).add_option(
        &["--carrying-capacity"],
        argparse::Store,
        "carrying capacity, in persons per km²",
    );
    parser.refer(&mut p.neighbourhood_radius).add_option(
        &["--neighbourhood"],
        argparse::Store,
        "radius, in cells, of the neighbourhood migrants can move to",
    );
    parser.refer(&mut p.leap_distance).add_option(
        &["--leap-distance"],
        argparse::Store,
        "maximum leapfrogging distance, in km",
    );
    parser.refer(&mut p.slice_length).add_option(
        &["--slice-length"],
        argparse::Store,
        "years per vegetation time slice",
    );
    parser.refer(&mut p.redistribution).add_option(
        &["--redistribution"],
        argparse::Store,
        "even, or random[:SEED] for the earlier single random destination",
    );
    parser.refer(iterations).add_option(
        &["--steps"],
        argparse::Store,
        "number of time steps to simulate (default: until 500 BP)",
    );
    parser.refer(&mut observation.time_slices).add_option(
        &["--time-slices"],
        argparse::Store,
        "number of occupancy snapshots to write",
    );
    parser.refer(&mut observation.log_every).add_option(
        &["--log-every"],
        argparse::Store,
        "period of progress logging, in steps",
    );
    parser.refer(&mut files.terrain).add_option(
        &["--terrain"],
        argparse::StoreOption,
        "static raster of habitable land",
    );
    parser.refer(&mut files.vegetation).add_option(
        &["--vegetation"],
        argparse::Store,
        "directory with vegetation layers veg_<date>.asc",
    );
    parser.refer(&mut files.sites).add_option(
        &["--sites"],
        argparse::StoreOption,
        "CSV of dated sites (x, y, bp[, dist]) to score against",
    );
    parser.refer(&mut files.output).add_option(
        &["--output"],
        argparse::Store,
        "stem of the output files",
    );
    parser.refer(&mut files.projected).add_option(
        &["--projected"],
        argparse::StoreTrue,
        "coordinates are given in the grid's projection, not as longitude/latitude",
    );
    parser.refer(&mut files.log_level).add_option(
        &["--log-level"],
        argparse::Store,
        "error, warn, info, debug or trace",
    );
    parser
}
