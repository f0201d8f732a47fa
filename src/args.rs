use clap::Parser;

use crate::pipeline::{
    DEFAULT_DISTRICTS_SHP, DEFAULT_OUT_SVG, DEFAULT_PROVINCES_SHP, DEFAULT_RESULTS,
};

/// Renders a margin-of-victory choropleth of the Toronto federal ridings.
///
/// With no arguments the program looks for the fixed input files in the
/// current directory and writes the map next to them.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The Elections Canada event-results export (tab-separated text).
    /// Available from https://enr.elections.ca/DownloadResults.aspx
    #[clap(long, value_parser, default_value = DEFAULT_RESULTS)]
    pub results: String,

    /// (file path) The federal electoral district boundary shapefile (.shp with
    /// its .dbf side file; the FED_NUM attribute identifies the riding).
    #[clap(long, value_parser, default_value = DEFAULT_DISTRICTS_SHP)]
    pub districts: String,

    /// (file path) The province boundary shapefile (.shp with its .dbf side
    /// file; the PRUID attribute identifies the province).
    #[clap(long, value_parser, default_value = DEFAULT_PROVINCES_SHP)]
    pub provinces: String,

    /// (file path) Where to write the SVG map. An existing file is overwritten.
    #[clap(short, long, value_parser, default_value = DEFAULT_OUT_SVG)]
    pub out: String,

    /// (file path or empty) If specified, the vote totals and the per-riding MOV
    /// values will also be written in JSON format to the given location.
    #[clap(long, value_parser)]
    pub summary: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
