use clap::Parser;

/// Reconciles county-level election returns into county, state and national results.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON configuration listing the election sources, the boundary files
    /// and the output settings. Relative paths in this file are resolved against its directory.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) A reference summary in JSON format. If provided, countyreturns will
    /// check that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary will be written in JSON format to the given
    /// location. Setting this option overrides the path that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) The county-level election export to read. Setting this option replaces the
    /// election sources of the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default csv) The type of the input: csv or xlsx.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (default: first worksheet) When using an Excel file, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (file path) A TopoJSON or GeoJSON file with the state boundaries.
    #[clap(long, value_parser)]
    pub states_topology: Option<String>,

    /// (file path) A TopoJSON or GeoJSON file with the county boundaries.
    #[clap(long, value_parser)]
    pub counties_topology: Option<String>,

    /// (file path) Replaces the embedded geography tables (Alaska districts, identifier corrections).
    #[clap(long, value_parser)]
    pub geography_tables: Option<String>,

    /// (repeatable) The election years to summarize. All the years of the input by default.
    #[clap(long, value_parser)]
    pub year: Vec<u32>,

    /// (repeatable) The states to list county results for, e.g. --state georgia.
    #[clap(long, value_parser)]
    pub state: Vec<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
