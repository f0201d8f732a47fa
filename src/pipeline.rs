//! The whole run, from the results export to the SVG map.
//!
//! The stages are strictly sequential: load, filter and tally, join to
//! geometry, render. Any error aborts the run before the next stage starts,
//! so the map is only written when every tally succeeded.

use log::{debug, info};

use riding_results::{
    aggregate_totals, compute_mov, filter_rows, AggregateTotals, Party, RidingMov, TallyError,
};
use snafu::{prelude::*, Snafu};

use serde_json::json;
use serde_json::Value as JSValue;
use std::fs;

use crate::args::Args;

pub mod geometry;
pub mod loader;
pub mod render;

pub const DEFAULT_RESULTS: &str = "EventResults.txt";
pub const DEFAULT_DISTRICTS_SHP: &str = "FED_CA_2023_EN.shp";
pub const DEFAULT_PROVINCES_SHP: &str = "lpr_000b21a_e.shp";
pub const DEFAULT_OUT_SVG: &str = "toronto_mov.svg";

/// The 24 federal electoral districts that make up the city of Toronto.
pub const TORONTO_RIDINGS: [&str; 24] = [
    "35007", "35022", "35023", "35024", //
    "35026", "35029", "35030", "35031", //
    "35041", "35092", "35093", "35094", //
    "35095", "35096", "35097", "35100", //
    "35105", "35109", "35110", "35111", //
    "35112", "35117", "35120", "35122",
];

/// Statistics Canada province code for Ontario, as found in the PRUID
/// attribute of the boundary file.
pub const ONTARIO_PRUID: &str = "35";

/// View crop, (west, south, east, north) in WGS84 degrees. The map is cut to
/// this box regardless of the extent of the joined geometry.
pub const TORONTO_BBOX: (f64, f64, f64, f64) = (-79.6392832, 43.5796082, -79.1132193, 43.8554425);

/// EPSG:3347, the Statistics Canada Lambert projection both boundary files
/// ship in.
pub const STATCAN_LAMBERT: &str = "+proj=lcc +lat_0=63.390675 +lon_0=-91.866667 +lat_1=49 \
     +lat_2=77 +x_0=6200000 +y_0=3000000 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs";

/// EPSG:4326.
pub const WGS84_LONGLAT: &str = "+proj=longlat +datum=WGS84 +no_defs";

#[derive(Debug, Snafu)]
pub enum PipelineError {
    #[snafu(display("Error opening results file {path}"))]
    OpeningResults { source: csv::Error, path: String },
    #[snafu(display("Error reading results line"))]
    ResultsLine { source: csv::Error },
    #[snafu(display("Line {lineno}: expected {expected} tab-separated fields, found {found}"))]
    SchemaMismatch {
        lineno: usize,
        expected: usize,
        found: usize,
    },
    #[snafu(display("Line {lineno}: invalid vote count {value:?}"))]
    InvalidVotes {
        source: std::num::ParseIntError,
        lineno: usize,
        value: String,
    },
    #[snafu(display("Line {lineno}: invalid vote percentage {value:?}"))]
    InvalidPercentage {
        source: std::num::ParseFloatError,
        lineno: usize,
        value: String,
    },
    #[snafu(display("Tabulation failed: {source}"))]
    Tally { source: TallyError },
    #[snafu(display("Error opening shapefile {path}"))]
    OpeningShapefile {
        source: shapefile::Error,
        path: String,
    },
    #[snafu(display("Error reading shapefile record"))]
    ShapefileRecord { source: shapefile::Error },
    #[snafu(display("Bad projection definition {definition:?}"))]
    ProjDefinition {
        source: proj4rs::errors::Error,
        definition: String,
    },
    #[snafu(display("Reprojection failed"))]
    Reprojection { source: proj4rs::errors::Error },
    #[snafu(display("No province boundary with PRUID {pruid}"))]
    MissingProvince { pruid: String },
    #[snafu(display("Error rendering map to {path}: {message}"))]
    Rendering { path: String, message: String },
    #[snafu(display("Error serializing the summary"))]
    SerializingSummary { source: serde_json::Error },
    #[snafu(display("Error writing summary file {path}"))]
    WritingSummary {
        source: std::io::Error,
        path: String,
    },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Runs the four stages end to end.
pub fn run_pipeline(args: &Args) -> PipelineResult<()> {
    let rows = loader::load_results(&args.results)?;
    let included = filter_rows(&rows, &TORONTO_RIDINGS);
    for row in included.iter().take(10) {
        debug!("run_pipeline: sample row: {:?}", row);
    }

    let totals = aggregate_totals(&included);
    let movs = compute_mov(&included, &TORONTO_RIDINGS).context(TallySnafu {})?;
    print_summary(&totals, &movs);

    if let Some(summary_path) = &args.summary {
        let js = build_summary_js(&totals, &movs);
        let pretty = serde_json::to_string_pretty(&js).context(SerializingSummarySnafu {})?;
        fs::write(summary_path, pretty).context(WritingSummarySnafu {
            path: summary_path.as_str(),
        })?;
        info!("run_pipeline: wrote summary to {}", summary_path);
    }

    let shapes = geometry::join_geometry(&args.districts, &args.provinces, &movs)?;
    render::render_map(&shapes, &args.out)?;
    info!("run_pipeline: wrote map to {}", args.out);
    Ok(())
}

fn print_summary(totals: &AggregateTotals, movs: &[RidingMov]) {
    println!("MOV for each Toronto riding:");
    for m in movs {
        println!("{} {}: {:.2}%", m.district_num, m.name, m.mov);
    }

    println!("\nToronto federal election results:");
    println!(
        "Liberal: {} ({:.2}%)",
        totals.liberal,
        totals.share(Party::Liberal)
    );
    println!(
        "Conservative: {} ({:.2}%)",
        totals.conservative,
        totals.share(Party::Conservative)
    );
    println!("NDP: {} ({:.2}%)", totals.ndp, totals.share(Party::Ndp));
    println!("Other: {} ({:.2}%)", totals.other, totals.share(Party::Other));
}

fn build_summary_js(totals: &AggregateTotals, movs: &[RidingMov]) -> JSValue {
    json!({
        "totals": {
            "votes": totals,
            "total": totals.total(),
            "shares": {
                "liberal": totals.share(Party::Liberal),
                "conservative": totals.share(Party::Conservative),
                "ndp": totals.share(Party::Ndp),
                "other": totals.share(Party::Other),
            },
        },
        "ridings": movs,
    })
}
