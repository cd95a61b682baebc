use crate::*;

use approx::assert_abs_diff_eq;

use crate::observation::Settings;
use crate::projection::{Albers, Projection};
use crate::raster::{AsciiGrid, Geometry, NO_DATA};
use crate::scoring::{Score, Site};
use crate::submodels::{dispersal, growth};
use crate::terrain::{DirectoryTerrain, InMemoryTerrain, Terrain, TerrainProvider, Vegetation};

/// Cells of 25 km, so K = 625 persons at 1 person/km².
fn grid(ncols: usize, nrows: usize) -> Geometry {
    Geometry {
        ncols,
        nrows,
        xllcorner: 0.,
        yllcorner: 0.,
        cellsize: 25_000.,
    }
}

fn uniform(geometry: Geometry, label: u32, vegetation: Vegetation) -> InMemoryTerrain {
    InMemoryTerrain::new(geometry).with_layer(label, vec![vegetation; geometry.cells()])
}

fn parameters_at(geometry: &Geometry, cell: usize) -> Parameters {
    Parameters {
        origin: geometry.centre(cell),
        projection: Projection::Identity,
        ..Parameters::default()
    }
}

fn quiet() -> Settings {
    Settings {
        time_slices: 0,
        log_every: 0,
    }
}

#[test]
fn growth_stays_between_population_and_capacity() {
    for n in 1..=625 {
        let grown = growth::logistic(n, 625., 0.025, 30);
        assert!(grown >= n, "{} shrank to {}", n, grown);
        assert!(grown <= 625, "{} overshot to {}", n, grown);
    }
    assert_eq!(growth::logistic(625, 625., 0.025, 30), 625);
}

#[test]
fn migrants_at_capacity() {
    assert_eq!(dispersal::migrants(625, 625., 0.3, 1.), 188);
    assert_eq!(dispersal::migrants(0, 625., 0.3, 1.), 0);
    // γ = 0 makes emigration independent of crowding
    assert_eq!(dispersal::migrants(100, 625., 0.3, 0.), 30);
}

#[test]
fn even_split_to_all_neighbours() {
    let g = grid(5, 5);
    let centre = g.offset(2, 2);
    let mut s = initialization(
        parameters_at(&g, centre),
        Box::new(uniform(g, 5000, Vegetation::Interior)),
    )
    .unwrap();
    assert_eq!(s.population(centre), 625);
    assert_eq!(s.arrival_time(centre), 5000);

    step(&mut s).unwrap();

    assert_eq!(s.population(centre), 437);
    for offset in sensing::neighbourhood(1) {
        let neighbour = g.shifted(centre, offset).unwrap();
        assert_eq!(s.population(neighbour), 23);
        assert_eq!(s.arrival_time(neighbour), 5000);
        assert!(s.is_active(neighbour));
    }
    assert_eq!(s.arrival_time(g.offset(0, 0)), 0);
    assert!(s.total_population() <= 625);
    assert_eq!(s.date, 4970);
}

#[test]
fn nobody_moves_if_a_share_is_below_one_person() {
    let g = grid(5, 5);
    let centre = g.offset(2, 2);
    let mut s = initialization(
        parameters_at(&g, centre),
        Box::new(uniform(g, 5000, Vegetation::Interior)),
    )
    .unwrap();
    s.settle(centre, 40);

    // 1 migrant for 8 destinations
    assert_eq!(dispersal::migrants(40, 625., 0.3, 1.), 1);
    dispersal::disperse(&mut s, centre);

    assert_eq!(s.population(centre), 40);
    assert_eq!(s.total_population(), 40);
    assert_eq!(s.active_cells(), 1);
}

#[test]
fn overdrawn_sources_are_clamped_to_zero() {
    let g = grid(3, 1);
    let mut s = initialization(
        parameters_at(&g, 0),
        Box::new(uniform(g, 5000, Vegetation::Interior)),
    )
    .unwrap();
    // crowded far beyond K, more would leave than there are
    assert_eq!(dispersal::migrants(2000, 625., 0.9, 1.), 5760);
    s.settle(0, 10);

    assert!(dispersal::move_population(&mut s, 0, &[1, 2], 30));

    assert_eq!(s.population(0), 0);
    assert_eq!(s.population(1), 15);
    assert_eq!(s.population(2), 15);
    assert_eq!(s.arrival_time(1), 5000);
    assert!(s.is_active(2));
}

#[test]
fn eviction_without_refuge_empties_the_grid() {
    let g = grid(3, 3);
    let centre = g.offset(1, 1);
    let terrain = uniform(g, 5000, Vegetation::Interior)
        .with_layer(4000, vec![Vegetation::Unsuitable; g.cells()]);
    let mut p = parameters_at(&g, centre);
    p.start_date = 4030;
    p.forcing = ForcingMode::Vegetation;
    let mut s = initialization(p, Box::new(terrain)).unwrap();

    run(&mut s, 2, &quiet()).unwrap();

    assert_eq!(s.terrain.time_slice(), 4);
    assert_eq!(s.total_population(), 0);
    assert_eq!(s.active_cells(), 0);
    assert!(s.arrival_times().iter().all(|&d| d == 4030));
    assert_eq!(s.date, 3970);
    assert_eq!(s.extinct_at(), Some(3970));

    run(&mut s, 1, &quiet()).unwrap();
    assert_eq!(s.date, 3940);
    assert_eq!(s.extinct_at(), Some(3970));
}

#[test]
fn eviction_to_a_refuge() {
    let g = grid(3, 3);
    let centre = g.offset(1, 1);
    let mut later = vec![Vegetation::Interior; g.cells()];
    later[centre] = Vegetation::Unsuitable;
    let terrain = uniform(g, 5000, Vegetation::Interior).with_layer(4000, later);
    let mut p = parameters_at(&g, centre);
    p.start_date = 4030;
    p.forcing = ForcingMode::Vegetation;
    let mut s = initialization(p, Box::new(terrain)).unwrap();

    run(&mut s, 2, &quiet()).unwrap();

    assert_eq!(s.population(centre), 0);
    assert!(!s.is_active(centre));
    assert_eq!(s.arrival_time(centre), 4030);
    for offset in sensing::neighbourhood(1) {
        let neighbour = g.shifted(centre, offset).unwrap();
        assert!(s.population(neighbour) > 0);
        assert!(s.is_active(neighbour));
    }
}

#[test]
fn cells_settled_in_a_step_wait_for_the_next() {
    let g = grid(5, 1);
    let mut s = initialization(
        parameters_at(&g, 0),
        Box::new(uniform(g, 5000, Vegetation::Interior)),
    )
    .unwrap();

    step(&mut s).unwrap();
    assert_eq!(s.population(0), 437);
    assert_eq!(s.population(1), 188);
    assert_eq!(s.population(2), 0);
    assert_eq!(s.arrival_time(1), 5000);

    step(&mut s).unwrap();
    assert!(s.population(2) > 0);
    assert_eq!(s.arrival_time(2), 4970);
    assert_eq!(s.population(3), 0);
}

fn forest_margin(source: Vegetation) -> InMemoryTerrain {
    use Vegetation::*;
    let g = grid(9, 1);
    InMemoryTerrain::new(g).with_layer(
        5000,
        vec![
            source, Interior, Unsuitable, Unsuitable, Edge, Unsuitable, Unsuitable, Unsuitable,
            Unsuitable,
        ],
    )
}

fn margin_parameters() -> Parameters {
    let mut p = parameters_at(&grid(9, 1), 0);
    p.forcing = ForcingMode::Vegetation;
    p
}

#[test]
fn crowded_margin_cells_leap() {
    let mut s = initialization(margin_parameters(), Box::new(forest_margin(Vegetation::Edge)))
        .unwrap();
    // the only neighbour is full
    s.settle(1, 625);

    step(&mut s).unwrap();

    assert_eq!(s.population(4), 188);
    assert_eq!(s.arrival_time(4), 5000);
    assert_eq!(s.population(2), 0);
    assert_eq!(s.population(3), 0);
}

#[test]
fn only_margin_cells_leap() {
    let mut s = initialization(
        margin_parameters(),
        Box::new(forest_margin(Vegetation::Interior)),
    )
    .unwrap();
    s.settle(1, 625);

    step(&mut s).unwrap();

    assert_eq!(s.population(4), 0);
    assert_eq!(s.arrival_time(4), 0);
}

#[test]
fn local_moves_come_before_leaps() {
    let mut s = initialization(margin_parameters(), Box::new(forest_margin(Vegetation::Edge)))
        .unwrap();

    step(&mut s).unwrap();

    assert_eq!(s.population(1), 188);
    assert_eq!(s.population(4), 0);
}

#[test]
fn leaps_never_land_off_the_land() {
    let mut terrain = forest_margin(Vegetation::Edge);
    terrain.habitable.set(4, false);
    let mut s = initialization(margin_parameters(), Box::new(terrain)).unwrap();
    s.settle(1, 625);

    step(&mut s).unwrap();

    assert_eq!(s.population(4), 0);
    assert_eq!(s.arrival_time(4), 0);
    assert!(!s.is_active(4));
}

#[test]
fn leaps_reach_as_far_as_the_leap_distance() {
    let mask = sensing::leap_mask(150., 25_000.);
    assert!(mask.iter().all(|&(i, j)| {
        let d = (i as f64).hypot(j as f64).round();
        d > 1. && d <= 6.
    }));
    assert!(mask.contains(&(-6, 0)));
    assert!(mask.contains(&(4, 4)));
    assert!(!mask.contains(&(5, 5)));
}

fn reached_two_cells() -> State {
    let g = grid(4, 1);
    let mut s = initialization(
        parameters_at(&g, 0),
        Box::new(uniform(g, 5000, Vegetation::Interior)),
    )
    .unwrap();
    s.date = 4200;
    s.settle(1, 10);
    s
}

fn site_in(g: &Geometry, cell: usize, bp: f64) -> Site {
    let (x, y) = g.centre(cell);
    Site {
        x,
        y,
        bp,
        dist: None,
    }
}

#[test]
fn too_many_unreached_sites_are_unusable() {
    let s = reached_two_cells();
    let g = s.terrain.geometry;
    let sites = vec![site_in(&g, 0, 5100.), site_in(&g, 1, 4300.), site_in(&g, 3, 3000.)];

    let (records, score) = scoring::score(&s, &sites).unwrap();

    assert_eq!(score, Score::Unusable);
    assert_eq!(score.value(), None);
    assert_eq!(records[2].sim_date, 0);
}

#[test]
fn a_quarter_unreached_still_scores() {
    let s = reached_two_cells();
    let g = s.terrain.geometry;
    let sites = vec![
        site_in(&g, 0, 5100.),
        site_in(&g, 1, 4300.),
        site_in(&g, 1, 4100.),
        site_in(&g, 3, 3000.),
    ];

    let (records, score) = scoring::score(&s, &sites).unwrap();

    assert_eq!(score, Score::Finite(100.));
    assert_eq!(records[0].sim_date, 5000);
    assert_eq!(records[1].sim_date, 4200);
    assert_abs_diff_eq!(records[0].dist, 0., epsilon = 1e-9);
    assert_abs_diff_eq!(records[1].dist, 25., epsilon = 1e-9);
}

#[test]
fn sites_outside_the_grid_are_an_error() {
    let s = reached_two_cells();
    let sites = vec![Site {
        x: -1.,
        y: -1.,
        bp: 4000.,
        dist: None,
    }];
    assert!(matches!(
        scoring::score(&s, &sites),
        Err(Error::OutOfBounds { .. })
    ));
}

#[test]
fn no_sites_no_score() {
    assert_eq!(scoring::rmse(&[]), Score::Unusable);
}

#[test]
fn site_table_round_trip() {
    let sites = scoring::sites_from_reader("x,y,bp\n12500,12500,5100\n37500,12500,4300\n".as_bytes())
        .unwrap();
    assert_eq!(sites.len(), 2);
    assert_eq!(sites[1].bp, 4300.);
    assert!(sites[0].dist.is_none());

    let with_distance =
        scoring::sites_from_reader("x,y,bp,dist\n12500,12500,5100,42\n".as_bytes()).unwrap();
    assert_eq!(with_distance[0].dist, Some(42.));

    let s = reached_two_cells();
    let (records, _) = scoring::score(&s, &sites).unwrap();
    let mut out = vec![];
    scoring::records_to_writer(&mut out, &records).unwrap();
    let text = String::from_utf8(out).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("x,y,dist,bp,sim_date"));
    assert_eq!(lines.next(), Some("12500.0,12500.0,0.0,5100.0,5000"));
}

#[test]
fn five_evenly_spaced_time_slices() {
    let g = grid(5, 5);
    let mut s = initialization(
        parameters_at(&g, g.offset(2, 2)),
        Box::new(uniform(g, 5000, Vegetation::Interior)),
    )
    .unwrap();

    run(&mut s, 100, &Settings::default()).unwrap();

    let dates: Vec<Date> = s.slices().iter().map(|slice| slice.date()).collect();
    assert_eq!(dates, vec![4970, 4370, 3770, 3170, 2570]);
    assert_eq!(s.slices()[0].occupied().count_ones(), 9);
    assert_eq!(s.date, 2000);
}

#[test]
fn short_runs_sample_every_step() {
    assert_eq!(observation::sampling_interval(3, 5), Some(1));
    assert_eq!(observation::sampling_interval(100, 0), None);
}

#[test]
fn arrival_raster_round_trip() {
    let g = grid(5, 5);
    let mut s = initialization(
        parameters_at(&g, g.offset(2, 2)),
        Box::new(uniform(g, 5000, Vegetation::Interior)),
    )
    .unwrap();
    let arrivals = run(&mut s, 1, &quiet()).unwrap();

    let raster = observation::arrival_raster(&s);
    assert_eq!(raster.values[g.offset(0, 0)], NO_DATA);
    assert_eq!(raster.values[g.offset(2, 2)], 5000.);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("arrival.asc");
    raster.write(&path).unwrap();
    let back = AsciiGrid::read(&path).unwrap();
    assert!(back.geometry.matches(&g));
    assert_eq!(observation::arrival_times_from_raster(&back), arrivals);
}

#[test]
fn outputs_are_named_after_the_stem() {
    let g = grid(3, 3);
    let mut s = initialization(
        parameters_at(&g, g.offset(1, 1)),
        Box::new(uniform(g, 5000, Vegetation::Interior)),
    )
    .unwrap();
    run(&mut s, 2, &Settings::default()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let stem = dir.path().join("run");
    observation::write_outputs(&s, &stem).unwrap();
    assert!(dir.path().join("run.asc").exists());
    assert!(dir.path().join("run_4970.asc").exists());
    assert!(dir.path().join("run_4940.asc").exists());

    let summary = RunSummary {
        parameters: s.parameters().clone(),
        iterations: 2,
        final_date: s.date,
        cells_reached: s.arrival_times().iter().filter(|&&d| d > 0).count(),
        score: Some(Score::Finite(12.5)),
    };
    let path = observation::summary_path(&stem);
    store_summary(&summary, &path).unwrap();
    let back: RunSummary =
        serde_json::from_reader(std::fs::File::open(&path).unwrap()).unwrap();
    assert_eq!(back.final_date, 4940);
    assert_eq!(back.cells_reached, 9);
    assert_eq!(back.score, Some(Score::Finite(12.5)));
}

#[test]
fn invalid_parameters_are_rejected() {
    let g = grid(3, 3);
    let mut p = parameters_at(&g, 4);
    p.emigration_rate = 1.;
    assert!(matches!(p.validate(), Err(Error::Config(_))));
    assert!(matches!(
        initialization(p, Box::new(uniform(g, 5000, Vegetation::Interior))),
        Err(Error::Config(_))
    ));

    let mut p = parameters_at(&g, 4);
    p.growth_rate = 0.;
    assert!(p.validate().is_err());

    let mut p = parameters_at(&g, 4);
    p.neighbourhood_radius = 0;
    assert!(p.validate().is_err());

    assert!(Parameters::default().validate().is_ok());
}

#[test]
fn tiny_cells_hold_nobody() {
    let g = Geometry {
        cellsize: 100.,
        ..grid(3, 3)
    };
    let p = parameters_at(&g, 4);
    assert!(matches!(
        initialization(p, Box::new(uniform(g, 5000, Vegetation::Interior))),
        Err(Error::Config(_))
    ));
}

#[test]
fn runs_stop_before_the_present() {
    let g = grid(3, 3);
    let mut p = parameters_at(&g, 4);
    p.start_date = 100;
    let mut s = initialization(p, Box::new(uniform(g, 1000, Vegetation::Interior))).unwrap();
    assert!(matches!(run(&mut s, 10, &quiet()), Err(Error::Config(_))));
    assert!(run(&mut s, 3, &quiet()).is_ok());
    assert_eq!(s.date, 10);
}

#[test]
fn default_iterations_end_at_500_bp() {
    let p = Parameters::default();
    assert_eq!(p.default_iterations(), 150);
}

#[test]
fn origin_outside_the_grid() {
    let g = grid(3, 3);
    let mut p = parameters_at(&g, 4);
    p.origin = (-1., -1.);
    assert!(matches!(
        initialization(p, Box::new(uniform(g, 5000, Vegetation::Interior))),
        Err(Error::OutOfBounds { .. })
    ));
}

#[test]
fn albers_origin_and_symmetry() {
    let albers = Albers::south_america();
    let (x, y) = albers.forward(-60., -32.);
    assert_abs_diff_eq!(x, 0., epsilon = 1e-6);
    assert_abs_diff_eq!(y, 0., epsilon = 1e-6);

    let east = albers.forward(-50., -10.);
    let west = albers.forward(-70., -10.);
    assert_abs_diff_eq!(east.0, -west.0, epsilon = 1e-6);
    assert_abs_diff_eq!(east.1, west.1, epsilon = 1e-6);
    assert!(east.0 > 0.);
    // further north is up
    assert!(albers.forward(-60., -10.).1 > 0.);
}

#[test]
fn random_single_destination() {
    let g = grid(5, 5);
    let centre = g.offset(2, 2);
    let mut p = parameters_at(&g, centre);
    p.redistribution = Redistribution::RandomSingle { seed: 7 };
    let mut s = initialization(p, Box::new(uniform(g, 5000, Vegetation::Interior))).unwrap();

    step(&mut s).unwrap();

    assert_eq!(s.population(centre), 437);
    let settled: Vec<usize> = (0..g.cells())
        .filter(|&c| c != centre && s.population(c) > 0)
        .collect();
    assert_eq!(settled.len(), 1);
    assert_eq!(s.population(settled[0]), 188);
}

#[test]
fn policies_and_modes_parse() {
    assert_eq!("even".parse(), Ok(Redistribution::EvenSplit));
    assert_eq!(
        "random:3".parse(),
        Ok(Redistribution::RandomSingle { seed: 3 })
    );
    assert!("random:x".parse::<Redistribution>().is_err());
    assert_eq!("forest".parse(), Ok(ForcingMode::Vegetation));
    assert_eq!("null".parse(), Ok(ForcingMode::Unrestricted));
    assert!("desert".parse::<ForcingMode>().is_err());
}

#[test]
fn vegetation_reloads_on_slice_boundaries() {
    let g = grid(2, 2);
    let terrain = uniform(g, 5000, Vegetation::Interior)
        .with_layer(4000, vec![Vegetation::Edge; g.cells()]);
    let mut t = Terrain::new(Box::new(terrain), 5000, 1000).unwrap();
    assert_eq!(t.time_slice(), 5);
    assert!(!t.update(4990).unwrap());
    assert!(!t.update(4001).unwrap());
    assert_eq!(t.vegetation(0), Vegetation::Interior);
    assert!(t.update(4000).unwrap());
    assert_eq!(t.time_slice(), 4);
    assert_eq!(t.vegetation(0), Vegetation::Edge);
    assert!(!t.update(3999).unwrap());
    assert!(matches!(
        t.update(3000),
        Err(Error::MissingLayer { label: 3000 })
    ));
}

#[test]
fn unrestricted_runs_ignore_vegetation_changes() {
    let g = grid(3, 3);
    let terrain = uniform(g, 5000, Vegetation::Interior);
    let mut p = parameters_at(&g, 4);
    p.start_date = 4030;
    let mut s = initialization(p, Box::new(terrain)).unwrap();
    // there is no layer for 4000, but it is never asked for
    run(&mut s, 3, &quiet()).unwrap();
    assert_eq!(s.terrain.time_slice(), 5);
    assert!(s.total_population() > 0);
}

#[test]
fn malformed_rasters_name_the_line() {
    let text = "ncols 2\nnrows x\nxllcorner 0\nyllcorner 0\ncellsize 1\nNODATA_value -9999\n1 2\n3 4\n";
    assert!(matches!(
        AsciiGrid::from_reader(text.as_bytes()),
        Err(Error::Raster { line: 2, .. })
    ));

    let short = "ncols 2\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 1\nNODATA_value -9999\n1 2\n3\n";
    assert!(matches!(
        AsciiGrid::from_reader(short.as_bytes()),
        Err(Error::Raster { .. })
    ));

    let good = "NCOLS 2\nNROWS 1\nXLLCENTER 0.5\nYLLCENTER 0.5\nCELLSIZE 1\nNODATA_VALUE -1\n7 -1\n";
    let raster = AsciiGrid::from_reader(good.as_bytes()).unwrap();
    assert_eq!(raster.geometry.xllcorner, 0.);
    assert!(!raster.is_nodata(0));
    assert!(raster.is_nodata(1));
}

#[test]
fn vegetation_layers_from_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    let g = grid(2, 2);
    let mut layer = AsciiGrid::filled(g, 1.);
    layer.values[1] = 2.;
    layer.values[2] = NO_DATA;
    layer.write(dir.path().join("veg_5000.asc")).unwrap();
    AsciiGrid::filled(grid(3, 3), 1.)
        .write(dir.path().join("veg_4000.asc"))
        .unwrap();

    let mut provider = DirectoryTerrain::open(None, dir.path(), 5000).unwrap();
    assert!(provider.geometry().matches(&g));
    let vegetation = provider.vegetation(5000).unwrap();
    assert_eq!(
        *vegetation,
        vec![
            Vegetation::Interior,
            Vegetation::Edge,
            Vegetation::Unsuitable,
            Vegetation::Interior
        ]
    );
    for v in vegetation.iter() {
        assert_eq!(Vegetation::from_code(v.code()), *v);
    }
    assert_eq!(Vegetation::from_code(7.), Vegetation::Other);
    assert!(matches!(
        provider.vegetation(4000),
        Err(Error::GeometryMismatch { .. })
    ));
    assert!(matches!(
        provider.vegetation(3000),
        Err(Error::MissingLayer { label: 3000 })
    ));
}

#[test]
fn without_a_static_raster_the_first_layer_decides_what_is_land() {
    let dir = tempfile::tempdir().unwrap();
    let g = grid(3, 1);
    let mut layer = AsciiGrid::filled(g, 1.);
    layer.values[1] = NO_DATA;
    layer.values[2] = 0.;
    layer.write(dir.path().join("veg_5000.asc")).unwrap();

    let provider = DirectoryTerrain::open(None, dir.path(), 5000).unwrap();
    let habitable = provider.habitable().unwrap();
    assert!(habitable[0]);
    assert!(!habitable[1]);
    assert!(!habitable[2]);

    let mut s = initialization(parameters_at(&g, 0), Box::new(provider)).unwrap();
    assert_eq!(s.parameters().forcing, ForcingMode::Unrestricted);
    run(&mut s, 3, &quiet()).unwrap();

    assert_eq!(s.population(0), 625);
    assert_eq!(s.population(1), 0);
    assert_eq!(s.arrival_time(1), 0);
    assert_eq!(s.population(2), 0);
    assert_eq!(s.arrival_time(2), 0);
}

#[test]
fn nodata_in_the_static_raster_is_not_land() {
    let dir = tempfile::tempdir().unwrap();
    let g = grid(3, 1);
    let mut land = AsciiGrid::filled(g, 1.);
    land.values[2] = NO_DATA;
    let land_path = dir.path().join("land.asc");
    land.write(&land_path).unwrap();
    AsciiGrid::filled(g, 1.)
        .write(dir.path().join("veg_5000.asc"))
        .unwrap();

    let provider = DirectoryTerrain::open(Some(land_path), dir.path(), 5000).unwrap();
    let terrain = InMemoryTerrain::load(provider, vec![5000, 4000]).unwrap();
    assert_eq!(terrain.layers.len(), 1);

    let mut s = initialization(parameters_at(&g, 0), Box::new(terrain)).unwrap();
    s.settle(1, 625);
    step(&mut s).unwrap();
    assert_eq!(s.population(2), 0);
    assert_eq!(s.arrival_time(2), 0);
}

#[test]
fn active_cells_keep_settlement_order() {
    let mut active = ActiveSet::new(4);
    active.insert(2);
    active.insert(0);
    active.insert(1);
    active.insert(0);
    assert_eq!(active.cells(), &[2, 0, 1]);
    active.remove(2);
    active.insert(2);
    active.retain(|_| true);
    assert_eq!(active.cells(), &[0, 1, 2]);
    active.retain(|c| c != 1);
    assert_eq!(active.cells(), &[0, 2]);
    assert_eq!(active.len(), 2);
    assert!(!active.contains(1));
}

#[test]
fn expansion_spreads_outward() {
    let g = grid(15, 15);
    let centre = g.offset(7, 7);
    let mut s = initialization(
        parameters_at(&g, centre),
        Box::new(uniform(g, 5000, Vegetation::Interior)),
    )
    .unwrap();
    let iterations = s.parameters().default_iterations();
    run(&mut s, iterations, &quiet()).unwrap();

    assert!(s.arrival_times().iter().all(|&d| d > 0 && d <= 5000));
    assert_eq!(s.arrival_time(centre), 5000);
    for (c, &d) in s.arrival_times().iter().enumerate() {
        let (column, row) = g.column_row(c);
        let ring = (column as isize - 7).abs().max((row as isize - 7).abs()) as u32;
        assert!(d <= 5000 - 30 * ring.saturating_sub(1));
    }
}
