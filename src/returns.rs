use log::{debug, info, warn};

use county_tally::geography::topology_id_for_key;
use county_tally::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::returns::config_reader::*;

pub mod config_reader;
pub mod io_common;
pub mod io_csv;
pub mod io_topojson;
pub mod io_xlsx;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ReturnsError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Worksheet {name} not found in {path}"))]
    MissingWorksheet { name: String, path: String },
    #[snafu(display("Provider not implemented {provider:?}"))]
    UnknownProvider { provider: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningCsv { source: csv::Error, path: String },
    #[snafu(display("Error reading line {lineno} of {path}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("No header row in {path}"))]
    EmptyInput { path: String },
    #[snafu(display("Column {column} not found in the header of {path}"))]
    MissingColumn { column: String, path: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Object {name} not found in topology {path}"))]
    MissingTopologyObject { name: String, path: String },
    #[snafu(display("Error writing the summary to {path}"))]
    WritingSummary {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error loading the geography tables"))]
    Tally { source: TallyErrors },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type ReturnsResult<T> = Result<T, ReturnsError>;
pub type BReturnsResult<T> = Result<T, Box<ReturnsError>>;

/// Which years and states end up in the summary.
#[derive(Eq, PartialEq, Debug, Clone)]
struct SummaryScope {
    years: Vec<u32>,
    /// States to drill into. `None` means every state of the year.
    county_states: Option<Vec<String>>,
    include_counties: bool,
}

impl SummaryScope {
    fn new(settings: &OutputSettings, store: &ResultStore) -> SummaryScope {
        let years = match &settings.years {
            Some(ys) if !ys.is_empty() => ys.clone(),
            _ => store.years(),
        };
        let county_states = settings
            .states
            .clone()
            .filter(|s| !s.is_empty())
            .map(|s| s.iter().map(|n| n.trim().to_uppercase()).collect());
        let include_counties = settings
            .include_counties
            .unwrap_or(county_states.is_some());
        SummaryScope {
            years,
            county_states,
            include_counties,
        }
    }
}

fn state_features_to_json(
    store: &mut ResultStore,
    year: u32,
    features: &[BoundaryFeature],
) -> Vec<JSValue> {
    let mut l: Vec<JSValue> = Vec::new();
    for f in features.iter() {
        let fips = f.state_fips();
        let state_name = store.tables().state_name(&fips).map(|s| s.to_string());
        let winner = state_name
            .as_ref()
            .and_then(|n| store.state_result(year, n))
            .map(|r| r.winner)
            .unwrap_or(Winner::Unknown);
        l.push(json!({
            "topologyId": fips,
            "name": f.name,
            "state": state_name,
            "winner": winner,
        }));
    }
    l
}

fn counties_to_json(
    store: &mut ResultStore,
    year: u32,
    state: &str,
    county_features: &[BoundaryFeature],
) -> ReturnsResult<Vec<JSValue>> {
    if !county_features.is_empty() {
        let views = store.county_overview(year, state, county_features);
        let mut l: Vec<JSValue> = Vec::new();
        for v in views.iter() {
            l.push(serde_json::to_value(v).context(ParsingJsonSnafu {})?);
        }
        return Ok(l);
    }

    // Without boundaries, list what the election data has.
    store.ensure_state_processed(year, state);
    let mut l: Vec<JSValue> = Vec::new();
    if let Some(r) = store.query(year) {
        for (key, c) in r.counties.iter().filter(|(_, c)| c.state == state) {
            l.push(json!({
                "topologyId": topology_id_for_key(key),
                "name": c.name,
                "storageKey": key,
                "winner": c.winner,
                "votes": c.votes,
            }));
        }
    }
    Ok(l)
}

fn build_summary_js(
    store: &mut ResultStore,
    scope: &SummaryScope,
    state_features: &[BoundaryFeature],
    county_features: &[BoundaryFeature],
) -> ReturnsResult<JSValue> {
    let mut years: JSMap<String, JSValue> = JSMap::new();
    for &year in scope.years.iter() {
        store.ensure_year_processed(year);
        let national = store.national_result(year);

        let mut states: JSMap<String, JSValue> = JSMap::new();
        if let Some(r) = store.query(year) {
            for (name, state_res) in r.states.iter() {
                states.insert(
                    name.clone(),
                    serde_json::to_value(state_res).context(ParsingJsonSnafu {})?,
                );
            }
        }

        let mut year_js = json!({
            "national": national,
            "states": states,
        });

        if !state_features.is_empty() {
            year_js["stateFeatures"] =
                JSValue::Array(state_features_to_json(store, year, state_features));
        }

        if scope.include_counties {
            let drilled: Vec<String> = match &scope.county_states {
                Some(s) => s.clone(),
                None => store.states(year),
            };
            let mut counties: JSMap<String, JSValue> = JSMap::new();
            for state in drilled.iter() {
                let l = counties_to_json(store, year, state, county_features)?;
                counties.insert(state.clone(), JSValue::Array(l));
            }
            year_js["counties"] = JSValue::Object(counties);
        }

        years.insert(year.to_string(), year_js);
    }
    let stats = store.stats();
    info!(
        "build_summary_js: {} aggregation runs, {} rows accepted, {} rows dropped",
        stats.runs, stats.rows_accepted, stats.rows_dropped
    );
    Ok(json!({ "years": years }))
}

fn resolve_path(root: &Path, file_path: &str) -> String {
    let p: PathBuf = [root, Path::new(file_path)].iter().collect();
    p.as_path().display().to_string()
}

fn read_election_rows(root: &Path, source: &ElectionSource) -> BReturnsResult<Vec<RawRow>> {
    let p = resolve_path(root, &source.file_path);
    info!("Attempting to read election file {:?}", p);
    let rows = match source.provider.as_str() {
        "csv" => io_csv::read_csv_rows(&p, source)?,
        "xlsx" | "excel" => io_xlsx::read_xlsx_rows(&p, source)?,
        x => {
            return Err(Box::new(ReturnsError::UnknownProvider {
                provider: x.to_string(),
            }))
        }
    };
    info!("Read {} rows from {:?}", rows.len(), p);
    Ok(rows)
}

fn read_tables(root: &Path, tables_path: &Option<String>) -> BReturnsResult<GeographyTables> {
    match tables_path {
        Some(tp) => {
            let p = resolve_path(root, tp);
            info!("Attempting to read geography tables {:?}", p);
            let contents = fs::read_to_string(&p).context(OpeningJsonSnafu { path: p })?;
            Ok(GeographyTables::from_json(&contents).context(TallySnafu {})?)
        }
        None => Ok(GeographyTables::embedded().context(TallySnafu {})?),
    }
}

fn read_boundaries(
    root: &Path,
    sources: &Option<BoundarySources>,
) -> BReturnsResult<(Vec<BoundaryFeature>, Vec<BoundaryFeature>)> {
    let sources = match sources {
        Some(s) => s,
        None => return Ok((vec![], vec![])),
    };
    let states = match &sources.states_path {
        Some(sp) => io_topojson::read_boundary_features(
            &resolve_path(root, sp),
            Some(sources.states_object()),
        )?,
        None => vec![],
    };
    let counties = match &sources.counties_path {
        Some(cp) => io_topojson::read_boundary_features(
            &resolve_path(root, cp),
            Some(sources.counties_object()),
        )?,
        None => vec![],
    };
    info!(
        "Read {} state features and {} county features",
        states.len(),
        counties.len()
    );
    Ok((states, counties))
}

fn write_summary(pretty_js: &str, out: &Option<String>) -> BReturnsResult<()> {
    match out.as_deref() {
        None | Some("stdout") | Some("") => {
            println!("{}", pretty_js);
        }
        Some(path) => {
            info!("Writing summary to {:?}", path);
            fs::write(path, pretty_js).context(WritingSummarySnafu { path })?;
        }
    }
    Ok(())
}

fn compare_with_reference(pretty_js_stats: &str, reference_path: &str) -> ReturnsResult<()> {
    let summary_ref = read_summary(reference_path)?;
    debug!("summary: {:?}", summary_ref);
    let pretty_js_summary_ref =
        serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
    if pretty_js_summary_ref != pretty_js_stats {
        warn!("Found differences with the reference string");
        print_diff(pretty_js_summary_ref.as_str(), pretty_js_stats, "\n");
        whatever!("Difference detected between calculated summary and reference summary")
    }
    info!("Summary matches reference {:?}", reference_path);
    Ok(())
}

pub fn run_returns(args: &Args) -> BReturnsResult<()> {
    let (config, root): (ReturnsConfig, PathBuf) = match &args.config {
        Some(config_path) => {
            let config = read_config(config_path)?;
            let root = Path::new(config_path)
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_default();
            (config, root)
        }
        None => (ReturnsConfig::default(), PathBuf::new()),
    };
    let config = apply_args(config, args);
    info!("config: {:?}", config);

    // Validate the rules:
    let rules = validate_rules(&config.rules)?;
    check_sources(&config)?;

    let tables = read_tables(&root, &config.geography_tables_path)?;

    let mut rows: Vec<RawRow> = Vec::new();
    for source in config.election_sources.iter() {
        let mut source_rows = read_election_rows(&root, source)?;
        rows.append(&mut source_rows);
    }
    let (state_features, county_features) = read_boundaries(&root, &config.boundary_sources)?;

    let mut store = ResultStore::new(rows, tables, rules);
    let scope = SummaryScope::new(&config.output_settings, &store);
    let result_js = build_summary_js(&mut store, &scope, &state_features, &county_features)?;

    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;
    write_summary(&pretty_js_stats, &config.output_settings.output_path)?;

    // The reference summary, if provided for comparison
    if let Some(reference_path) = &args.reference {
        compare_with_reference(&pretty_js_stats, reference_path)?;
    }
    Ok(())
}
