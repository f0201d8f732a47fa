// Ingestion of the Elections Canada event-results export.
//
// The export is tab-separated text with a bilingual header and occasional
// free-text lines. A line is a result record exactly when it starts with an
// ASCII digit (the electoral district number); everything else is skipped.

use log::{debug, info};

use csv::ReaderBuilder;
use riding_results::ResultRow;
use snafu::prelude::*;

use crate::pipeline::*;

/// The fixed column count of the export, in file order: district number,
/// district name (EN/FR), result type (EN/FR), surname, middle name(s),
/// given name, affiliation (EN/FR), votes, % votes, rejected ballots,
/// total ballots cast.
pub const RESULT_FIELD_COUNT: usize = 14;

/// Reads the export at `path` into memory.
///
/// Skipped lines are not an error; a digit-leading line with the wrong field
/// count or an unparseable numeric field is.
pub fn load_results(path: &str) -> PipelineResult<Vec<ResultRow>> {
    info!("load_results: reading {}", path);
    // The export does not quote fields, so quote handling is disabled to
    // keep apostrophes and quotes in candidate names intact.
    let rdr = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_path(path)
        .context(OpeningResultsSnafu { path })?;

    let mut rows: Vec<ResultRow> = Vec::new();
    for record_r in rdr.into_records() {
        let record = record_r.context(ResultsLineSnafu {})?;
        // The reader skips blank separator lines, so the line number comes
        // from its own position tracking, not from a record count.
        let lineno = record.position().map_or(0, |p| p.line() as usize);
        let leading = record.get(0).and_then(|field| field.chars().next());
        if !matches!(leading, Some(c) if c.is_ascii_digit()) {
            debug!("load_results: skipping non-record line {}", lineno);
            continue;
        }
        ensure!(
            record.len() == RESULT_FIELD_COUNT,
            SchemaMismatchSnafu {
                lineno,
                expected: RESULT_FIELD_COUNT,
                found: record.len(),
            }
        );
        rows.push(parse_row(&record, lineno)?);
    }
    info!("load_results: {} result rows", rows.len());
    Ok(rows)
}

fn parse_row(record: &csv::StringRecord, lineno: usize) -> PipelineResult<ResultRow> {
    // The field count was checked by the caller.
    let field = |i: usize| record.get(i).unwrap_or("").to_string();

    let votes_raw = field(10);
    let votes = votes_raw.parse::<u64>().context(InvalidVotesSnafu {
        lineno,
        value: votes_raw.as_str(),
    })?;
    let pct_raw = field(11);
    let votes_pct = pct_raw.parse::<f64>().context(InvalidPercentageSnafu {
        lineno,
        value: pct_raw.as_str(),
    })?;

    Ok(ResultRow {
        district_num: field(0),
        district_name_en: field(1),
        district_name_fr: field(2),
        result_type: field(3),
        result_type_fr: field(4),
        surname: field(5),
        middle_name: field(6),
        given_name: field(7),
        affiliation: field(8),
        affiliation_fr: field(9),
        votes,
        votes_pct,
        rejected_ballots: field(12),
        total_ballots: field(13),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "Electoral district number - Numéro de la circonscription\tElectoral district name\tNom de la circonscription\tType of results\tType de résultats\tSurname - Nom de famille\tMiddle name(s) - Autre(s) prénom(s)\tGiven name - Prénom\tPolitical affiliation\tAppartenance politique\tVotes obtained - Votes obtenus\t% Votes obtained - Votes obtenus %\tRejected ballots - Bulletins rejetés\tTotal number of ballots cast - Nombre total de votes déposés";

    fn record_line(district: &str, affiliation: &str, votes: &str, pct: &str) -> String {
        format!(
            "{}\tBeaches--East York\tBeaches--East York\tpreliminary results\trésultats préliminaires\tDoe\t\tJay\t{}\t{}\t{}\t{}\t120\t45000",
            district, affiliation, affiliation, votes, pct
        )
    }

    fn write_export(lines: &[String]) -> tempfile::TempPath {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(f, "{}", line).unwrap();
        }
        f.into_temp_path()
    }

    #[test]
    fn header_and_free_text_lines_are_skipped() {
        let path = write_export(&[
            HEADER.to_string(),
            "Note: totals are preliminary.".to_string(),
            "".to_string(),
            record_line("35007", "Liberal", "9000", "45.0"),
        ]);
        let rows = load_results(path.to_str().unwrap()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].district_num, "35007");
        assert_eq!(rows[0].affiliation, "Liberal");
        assert_eq!(rows[0].votes, 9000);
        assert!((rows[0].votes_pct - 45.0).abs() < 1e-9);
        assert_eq!(rows[0].rejected_ballots, "120");
        assert_eq!(rows[0].total_ballots, "45000");
    }

    #[test]
    fn wrong_field_count_is_fatal() {
        let path = write_export(&["35007\tBeaches--East York\tpreliminary results".to_string()]);
        let err = load_results(path.to_str().unwrap()).unwrap_err();
        match err {
            PipelineError::SchemaMismatch {
                lineno,
                expected,
                found,
            } => {
                assert_eq!(lineno, 1);
                assert_eq!(expected, RESULT_FIELD_COUNT);
                assert_eq!(found, 3);
            }
            e => panic!("unexpected error {:?}", e),
        }
    }

    #[test]
    fn line_numbers_count_blank_lines_too() {
        let path = write_export(&[
            HEADER.to_string(),
            "".to_string(),
            "35007\tBeaches--East York\tpreliminary results".to_string(),
        ]);
        let err = load_results(path.to_str().unwrap()).unwrap_err();
        match err {
            PipelineError::SchemaMismatch { lineno, .. } => assert_eq!(lineno, 3),
            e => panic!("unexpected error {:?}", e),
        }
    }

    #[test]
    fn malformed_votes_are_fatal() {
        let path = write_export(&[record_line("35007", "Liberal", "n/a", "45.0")]);
        let err = load_results(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidVotes { lineno: 1, .. }));
    }

    #[test]
    fn malformed_percentage_is_fatal() {
        let path = write_export(&[record_line("35007", "Liberal", "9000", "45,0")]);
        let err = load_results(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidPercentage { lineno: 1, .. }
        ));
    }

    #[test]
    fn missing_file_is_fatal() {
        let err = load_results("does-not-exist.txt").unwrap_err();
        assert!(matches!(err, PipelineError::OpeningResults { .. }));
    }

    #[test]
    fn all_result_types_are_loaded() {
        // The loader does not filter by result type; that is the tally's job.
        let mut validated = record_line("35007", "Liberal", "9100", "45.5");
        validated = validated.replace("preliminary results", "validated results");
        let path = write_export(&[
            record_line("35007", "Liberal", "9000", "45.0"),
            validated,
        ]);
        let rows = load_results(path.to_str().unwrap()).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].is_preliminary());
        assert!(!rows[1].is_preliminary());
    }
}
