use crate::args::Args;
use crate::returns::*;

use county_tally::modes::normalize_mode;
use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    /// File path, `stdout` or missing.
    #[serde(rename = "outputPath")]
    pub output_path: Option<String>,
    pub years: Option<Vec<u32>>,
    pub states: Option<Vec<String>>,
    #[serde(rename = "includeCounties")]
    pub include_counties: Option<bool>,
}

/// The header names of the election export.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnNames {
    year: Option<String>,
    state: Option<String>,
    #[serde(rename = "countyFips")]
    county_fips: Option<String>,
    #[serde(rename = "countyName")]
    county_name: Option<String>,
    candidate: Option<String>,
    party: Option<String>,
    votes: Option<String>,
    mode: Option<String>,
}

impl ColumnNames {
    pub fn year(&self) -> &str {
        self.year.as_deref().unwrap_or("year")
    }
    pub fn state(&self) -> &str {
        self.state.as_deref().unwrap_or("state")
    }
    pub fn county_fips(&self) -> &str {
        self.county_fips.as_deref().unwrap_or("county_fips")
    }
    pub fn county_name(&self) -> &str {
        self.county_name.as_deref().unwrap_or("county_name")
    }
    pub fn candidate(&self) -> &str {
        self.candidate.as_deref().unwrap_or("candidate")
    }
    pub fn party(&self) -> &str {
        self.party.as_deref().unwrap_or("party")
    }
    pub fn votes(&self) -> &str {
        self.votes.as_deref().unwrap_or("candidatevotes")
    }
    pub fn mode(&self) -> &str {
        self.mode.as_deref().unwrap_or("mode")
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ElectionSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    #[serde(default)]
    pub columns: ColumnNames,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoundarySources {
    #[serde(rename = "statesPath")]
    pub states_path: Option<String>,
    #[serde(rename = "countiesPath")]
    pub counties_path: Option<String>,
    #[serde(rename = "statesObject")]
    states_object: Option<String>,
    #[serde(rename = "countiesObject")]
    counties_object: Option<String>,
}

impl BoundarySources {
    /// The name of the state layer in a TopoJSON topology.
    pub fn states_object(&self) -> &str {
        self.states_object.as_deref().unwrap_or("states")
    }

    pub fn counties_object(&self) -> &str {
        self.counties_object.as_deref().unwrap_or("counties")
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ReturnsRules {
    #[serde(rename = "aggregateModes")]
    pub aggregate_modes: Option<Vec<String>>,
    #[serde(rename = "componentModes")]
    pub component_modes: Option<Vec<String>>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReturnsConfig {
    #[serde(rename = "outputSettings", default)]
    pub output_settings: OutputSettings,
    #[serde(rename = "electionSources", default)]
    pub election_sources: Vec<ElectionSource>,
    #[serde(rename = "boundarySources")]
    pub boundary_sources: Option<BoundarySources>,
    #[serde(rename = "geographyTablesPath")]
    pub geography_tables_path: Option<String>,
    pub rules: Option<ReturnsRules>,
}

pub fn parse_config(contents: &str) -> ReturnsResult<ReturnsConfig> {
    serde_json::from_str(contents).context(ParsingJsonSnafu {})
}

pub fn read_config(path: &str) -> BReturnsResult<ReturnsConfig> {
    info!("Opening config file {:?}", path);
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    Ok(parse_config(&contents)?)
}

// Paths given on the command line are relative to the working directory,
// not to the configuration file.
fn from_cwd(path: &str) -> String {
    let p = Path::new(path);
    if p.is_absolute() {
        return path.to_string();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(p).display().to_string(),
        Err(_) => path.to_string(),
    }
}

/// Overrides the configuration with the command line arguments.
pub fn apply_args(config: ReturnsConfig, args: &Args) -> ReturnsConfig {
    let mut config = config;
    if let Some(out) = &args.out {
        config.output_settings.output_path = Some(out.clone());
    }
    if !args.year.is_empty() {
        config.output_settings.years = Some(args.year.clone());
    }
    if !args.state.is_empty() {
        config.output_settings.states = Some(args.state.clone());
    }
    if let Some(input) = &args.input {
        let provider = args
            .input_type
            .clone()
            .unwrap_or_else(|| "csv".to_string());
        config.election_sources = vec![ElectionSource {
            provider,
            file_path: from_cwd(input),
            excel_worksheet_name: args.excel_worksheet_name.clone(),
            columns: ColumnNames::default(),
        }];
    } else if let Some(name) = &args.excel_worksheet_name {
        for source in config.election_sources.iter_mut() {
            source.excel_worksheet_name = Some(name.clone());
        }
    }
    if args.states_topology.is_some() || args.counties_topology.is_some() {
        let mut sources = config.boundary_sources.unwrap_or_default();
        if let Some(p) = &args.states_topology {
            sources.states_path = Some(from_cwd(p));
        }
        if let Some(p) = &args.counties_topology {
            sources.counties_path = Some(from_cwd(p));
        }
        config.boundary_sources = Some(sources);
    }
    if let Some(p) = &args.geography_tables {
        config.geography_tables_path = Some(from_cwd(p));
    }
    config
}

fn normalized(modes: &[String]) -> Vec<String> {
    let mut res: Vec<String> = Vec::new();
    for m in modes.iter().map(|m| normalize_mode(m)) {
        if !res.contains(&m) {
            res.push(m);
        }
    }
    res
}

pub fn validate_rules(rules: &Option<ReturnsRules>) -> ReturnsResult<TallyRules> {
    let default_rules = TallyRules::default();
    let rules = match rules {
        Some(r) => r,
        None => return Ok(default_rules),
    };
    let aggregate_modes = match &rules.aggregate_modes {
        Some(ms) => normalized(ms),
        None => default_rules.aggregate_modes.clone(),
    };
    if aggregate_modes.is_empty() {
        whatever!("aggregateModes must name at least one mode");
    }
    let component_modes = match &rules.component_modes {
        Some(ms) => normalized(ms),
        None => default_rules.component_modes.clone(),
    };
    if let Some(m) = component_modes
        .iter()
        .find(|m| aggregate_modes.contains(m))
    {
        whatever!("Mode {:?} cannot be both an aggregate and a component", m);
    }
    Ok(TallyRules {
        aggregate_modes,
        component_modes,
    })
}

pub fn check_sources(config: &ReturnsConfig) -> ReturnsResult<()> {
    if config.election_sources.is_empty() {
        whatever!("No election sources: pass --input or list electionSources in the configuration");
    }
    for source in config.election_sources.iter() {
        if source.file_path.trim().is_empty() {
            whatever!("Empty filePath for a {} source", source.provider);
        }
    }
    Ok(())
}

/// Reads a summary previously written by this program.
pub fn read_summary(path: &str) -> ReturnsResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let js = r#"{
            "outputSettings": {"outputPath": "summary.json", "years": [2020], "states": ["Georgia"]},
            "electionSources": [
                {"provider": "csv", "filePath": "countypres.csv", "columns": {"votes": "votes"}},
                {"provider": "xlsx", "filePath": "ak.xlsx", "excelWorksheetName": "Sheet2"}
            ],
            "boundarySources": {"countiesPath": "counties-10m.json"},
            "rules": {"aggregateModes": ["total"]}
        }"#;
        let config = parse_config(js).unwrap();
        assert_eq!(config.output_settings.years, Some(vec![2020]));
        assert_eq!(config.election_sources.len(), 2);
        assert_eq!(config.election_sources[0].columns.votes(), "votes");
        assert_eq!(config.election_sources[1].columns.votes(), "candidatevotes");
        assert_eq!(
            config.election_sources[1].excel_worksheet_name.as_deref(),
            Some("Sheet2")
        );
        let boundaries = config.boundary_sources.unwrap();
        assert_eq!(boundaries.states_path, None);
        assert_eq!(boundaries.counties_object(), "counties");
        assert_eq!(config.geography_tables_path, None);
    }

    #[test]
    fn empty_config_is_valid_json() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config, ReturnsConfig::default());
        assert!(check_sources(&config).is_err());
    }

    #[test]
    fn rules_default_and_normalize() {
        assert_eq!(validate_rules(&None).unwrap(), TallyRules::default());

        let rules = validate_rules(&Some(ReturnsRules {
            aggregate_modes: Some(vec![" total ".to_string(), "TOTAL".to_string()]),
            component_modes: Some(vec!["absentee".to_string()]),
        }))
        .unwrap();
        assert_eq!(rules.aggregate_modes, vec!["TOTAL".to_string()]);
        assert_eq!(rules.component_modes, vec!["ABSENTEE".to_string()]);
    }

    #[test]
    fn rules_rejected() {
        let empty = validate_rules(&Some(ReturnsRules {
            aggregate_modes: Some(vec![]),
            component_modes: None,
        }));
        assert!(empty.is_err());

        let overlap = validate_rules(&Some(ReturnsRules {
            aggregate_modes: Some(vec!["TOTAL".to_string()]),
            component_modes: Some(vec!["total".to_string()]),
        }));
        assert!(overlap.is_err());
    }
}
