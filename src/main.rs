use std::path::{Path, PathBuf};

use model::argparse::{parse_args, Files};
use model::observation::{self, Settings};
use model::projection::Projection;
use model::terrain::{slice_label, time_slice, DirectoryTerrain};
use model::{initialization, minimal_logger, run, scoring, store_summary, Parameters, RunSummary};

fn main() -> Result<(), String> {
    let mut p = Parameters::default();
    let mut iterations = 0;
    let mut o = Settings::default();
    let mut files = Files::default();

    {
        let parser = parse_args(&mut p, &mut iterations, &mut o, &mut files);
        parser.parse_args_or_exit();
    }
    minimal_logger::init(files.log_level)?;

    if files.projected {
        p.projection = Projection::Identity;
    }
    if iterations == 0 {
        iterations = p.default_iterations();
    }

    let first_label = slice_label(time_slice(p.start_date, p.slice_length), p.slice_length);
    let provider = DirectoryTerrain::open(
        files.terrain.as_ref().map(PathBuf::from),
        &files.vegetation,
        first_label,
    )
    .map_err(|e| e.to_string())?;

    log::info!("Initialization …");
    let mut s = initialization(p, Box::new(provider)).map_err(|e| e.to_string())?;
    log::info!("Running {} steps from {} BP", iterations, s.date);
    run(&mut s, iterations, &o).map_err(|e| e.to_string())?;

    let stem = Path::new(&files.output);
    if let Some(dir) = stem.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir).map_err(|e| e.to_string())?;
        }
    }
    observation::write_outputs(&s, stem).map_err(|e| e.to_string())?;

    let score = match &files.sites {
        None => None,
        Some(path) => {
            let sites = scoring::read_sites(path).map_err(|e| e.to_string())?;
            let (records, score) = scoring::score(&s, &sites).map_err(|e| e.to_string())?;
            scoring::write_records(observation::sites_path(stem), &records)
                .map_err(|e| e.to_string())?;
            Some(score)
        }
    };

    let summary = RunSummary {
        parameters: s.parameters().clone(),
        iterations,
        final_date: s.date,
        cells_reached: s.arrival_times().iter().filter(|&&d| d > 0).count(),
        score,
    };
    store_summary(&summary, &observation::summary_path(stem)).map_err(|e| e.to_string())?;

    match score.and_then(|score| score.value()) {
        Some(value) => println!("{}", value),
        None if score.is_some() => println!("inf"),
        None => {}
    }
    Ok(())
}
