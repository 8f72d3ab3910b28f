//! Cost-report ingestion — CSV directory loading and column harmonization.
//!
//! Reads every `*.csv` in the data directory. The fiscal year comes from the
//! filename (`fy2013`, case-insensitive); headers are harmonized by trimming
//! and replacing spaces with underscores before column lookup. Malformed
//! input is a fatal configuration error naming the file and column — there is
//! no partial-load mode.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;

use claimlens_core::domain::RawRecord;

/// Canonical column names after harmonization.
const REQUIRED_COLUMNS: [&str; 9] = [
    "DRG_Definition",
    "Provider_Id",
    "Provider_Name",
    "Provider_State",
    "Provider_Zip_Code",
    "Total_Discharges",
    "Average_Covered_Charges",
    "Average_Total_Payments",
    "Average_Medicare_Payments",
];

/// Errors from the ingestion layer. All fatal; never retried.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read data directory {dir}: {source}")]
    Io {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no *.csv input files found in {dir}")]
    NoInputFiles { dir: PathBuf },
    #[error("fiscal year not found in filename {file} (expected e.g. 'ipps_fy2013.csv')")]
    YearNotInFilename { file: PathBuf },
    #[error("{file}: missing required column {column}")]
    MissingColumn { file: PathBuf, column: &'static str },
    #[error("{file} line {line}: column {column} has unparseable value {value:?}")]
    BadValue { file: PathBuf, line: u64, column: &'static str, value: String },
    #[error("{file}: {source}")]
    Csv {
        file: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Load and harmonize every cost-report CSV under `dir`.
pub fn load_cost_reports(dir: &Path) -> Result<Vec<RawRecord>, LoadError> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|source| LoadError::Io { dir: dir.to_path_buf(), source })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")))
        .collect();
    files.sort();
    if files.is_empty() {
        return Err(LoadError::NoInputFiles { dir: dir.to_path_buf() });
    }

    let year_pattern = Regex::new(r"(?i)fy(\d{4})").expect("static fiscal-year pattern");
    let mut records = Vec::new();
    for file in &files {
        let year = detect_year(file, &year_pattern)?;
        load_file(file, year, &mut records)?;
    }
    Ok(records)
}

fn detect_year(file: &Path, pattern: &Regex) -> Result<i32, LoadError> {
    let name = file.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    pattern
        .captures(name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| LoadError::YearNotInFilename { file: file.to_path_buf() })
}

fn load_file(file: &Path, year: i32, records: &mut Vec<RawRecord>) -> Result<(), LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file)
        .map_err(|source| LoadError::Csv { file: file.to_path_buf(), source })?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|source| LoadError::Csv { file: file.to_path_buf(), source })?
        .iter()
        .map(|h| h.trim().replace(' ', "_"))
        .collect();

    let mut column_index = [0usize; REQUIRED_COLUMNS.len()];
    for (i, column) in REQUIRED_COLUMNS.iter().enumerate() {
        column_index[i] = headers
            .iter()
            .position(|h| h == column)
            .ok_or(LoadError::MissingColumn { file: file.to_path_buf(), column })?;
    }

    for result in reader.records() {
        let record = result.map_err(|source| LoadError::Csv { file: file.to_path_buf(), source })?;
        let line = record.position().map_or(0, |p| p.line());
        let field = |i: usize| record.get(column_index[i]).unwrap_or_default();

        let provider_id = parse_u64(file, line, REQUIRED_COLUMNS[1], field(1))?;
        let total_discharges = parse_f64(file, line, REQUIRED_COLUMNS[5], field(5))?;
        let avg_covered_charges = parse_f64(file, line, REQUIRED_COLUMNS[6], field(6))?;
        let avg_total_payments = parse_f64(file, line, REQUIRED_COLUMNS[7], field(7))?;
        let avg_medicare_payments = parse_f64(file, line, REQUIRED_COLUMNS[8], field(8))?;

        records.push(RawRecord::new(
            provider_id,
            field(2),
            field(3),
            field(4),
            year,
            field(0),
            total_discharges,
            avg_covered_charges,
            avg_total_payments,
            avg_medicare_payments,
        ));
    }
    Ok(())
}

fn parse_u64(file: &Path, line: u64, column: &'static str, raw: &str) -> Result<u64, LoadError> {
    raw.trim().parse().map_err(|_| LoadError::BadValue {
        file: file.to_path_buf(),
        line,
        column,
        value: raw.to_string(),
    })
}

/// Parse a numeric field, tolerating currency formatting (`$12,345.67`).
fn parse_f64(file: &Path, line: u64, column: &'static str, raw: &str) -> Result<f64, LoadError> {
    let cleaned: String =
        raw.trim().chars().filter(|c| *c != '$' && *c != ',').collect();
    let value: f64 = cleaned.parse().map_err(|_| LoadError::BadValue {
        file: file.to_path_buf(),
        line,
        column,
        value: raw.to_string(),
    })?;
    if !value.is_finite() {
        return Err(LoadError::BadValue {
            file: file.to_path_buf(),
            line,
            column,
            value: raw.to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "DRG Definition,Provider Id,Provider Name,Provider State,\
Provider Zip Code,Total Discharges,Average Covered Charges,Average Total Payments,\
Average Medicare Payments";

    fn write_csv(dir: &Path, name: &str, body: &str) {
        let mut f = fs::File::create(dir.join(name)).unwrap();
        writeln!(f, "{HEADER}").unwrap();
        write!(f, "{body}").unwrap();
    }

    #[test]
    fn loads_and_harmonizes_columns() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(
            dir.path(),
            "ipps_fy2013.csv",
            "291 - HEART FAILURE & SHOCK W MCC,10001,MERCY GENERAL,GA,30301,\
             120,\"$40,000.00\",\"$10,000.00\",\"$8,000.00\"\n",
        );
        let records = load_cost_reports(dir.path()).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.provider_id, 10001);
        assert_eq!(r.year, 2013);
        assert_eq!(r.state, "GA");
        assert_eq!(r.total_discharges, 120.0);
        assert_eq!(r.avg_covered_charges, 40_000.0);
    }

    #[test]
    fn year_comes_from_each_filename() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "ipps_fy2012.csv", "291,1,A,GA,30301,10,100,50,40\n");
        write_csv(dir.path(), "ipps_FY2013.csv", "291,1,A,GA,30301,12,100,50,40\n");
        let records = load_cost_reports(dir.path()).unwrap();
        let mut years: Vec<i32> = records.iter().map(|r| r.year).collect();
        years.sort();
        assert_eq!(years, vec![2012, 2013]);
    }

    #[test]
    fn missing_year_in_filename_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "ipps.csv", "291,1,A,GA,30301,10,100,50,40\n");
        assert!(matches!(
            load_cost_reports(dir.path()),
            Err(LoadError::YearNotInFilename { .. })
        ));
    }

    #[test]
    fn missing_column_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = fs::File::create(dir.path().join("fy2013.csv")).unwrap();
        writeln!(f, "DRG Definition,Provider Id").unwrap();
        writeln!(f, "291,1").unwrap();
        assert!(matches!(
            load_cost_reports(dir.path()),
            Err(LoadError::MissingColumn { column: "Provider_Name", .. })
        ));
    }

    #[test]
    fn unparseable_numeric_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "fy2013.csv", "291,1,A,GA,30301,ten,100,50,40\n");
        assert!(matches!(
            load_cost_reports(dir.path()),
            Err(LoadError::BadValue { column: "Total_Discharges", .. })
        ));
    }

    #[test]
    fn empty_directory_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_cost_reports(dir.path()),
            Err(LoadError::NoInputFiles { .. })
        ));
    }
}
