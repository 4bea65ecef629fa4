//! Tabular input and output: CSV and JSON reading sets.
//!
//! CSV files must carry a header row. Columns are looked up by name, so
//! extra columns are allowed and carried through to prediction output.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use csv::StringRecord;

use crate::error::{Result, SpecscopeError};
use crate::models::{Prediction, RawReading, parse_flag};

pub const TIMESTAMP: &str = "timestamp";
pub const FREQUENCY: &str = "frequency";
pub const POWER: &str = "power";
pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";
pub const INTERFERENCE: &str = "interference";
pub const CONFIDENCE: &str = "confidence";

/// Columns every replay/monitor input must have.
pub const REQUIRED_COLUMNS: [&str; 5] = [TIMESTAMP, FREQUENCY, POWER, LATITUDE, LONGITUDE];

/// Suffix appended to the input stem for batch prediction output.
pub const PREDICTIONS_SUFFIX: &str = "_with_predictions.csv";

/// One CSV data row: the untouched record plus its parsed reading.
#[derive(Debug, Clone)]
pub struct CsvRow {
    /// 1-based file line (the header is line 1).
    pub line: usize,
    pub record: StringRecord,
    pub raw: RawReading,
}

/// A loaded CSV file.
#[derive(Debug, Clone)]
pub struct CsvDataset {
    pub headers: StringRecord,
    pub rows: Vec<CsvRow>,
}

impl CsvDataset {
    pub fn raw_readings(&self) -> Vec<RawReading> {
        self.rows.iter().map(|r| r.raw.clone()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| normalize_header_name(h) == name)
    }
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a BOM.
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn ensure_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(SpecscopeError::MissingFile(path.to_path_buf()))
    }
}

/// Load a CSV file, failing if any of `required` columns is absent.
///
/// Timestamps are kept as text; the enricher decides what to do with
/// unparseable ones. A non-numeric value in a numeric column fails the load.
pub fn read_csv(path: &Path, required: &[&str]) -> Result<CsvDataset> {
    ensure_file(path)?;
    let file = File::open(path).map_err(|e| SpecscopeError::io(path, e))?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);
    let headers = reader.headers()?.clone();
    let header_map = build_header_map(&headers);

    let missing: Vec<String> = required
        .iter()
        .filter(|&&col| !header_map.contains_key(col))
        .map(|col| col.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(SpecscopeError::MissingColumns {
            missing,
            found: headers.iter().map(str::to_string).collect(),
        });
    }

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result?;
        let raw = parse_row(&record, &header_map, line)?;
        rows.push(CsvRow { line, record, raw });
    }

    tracing::debug!(path = %path.display(), rows = rows.len(), "loaded CSV");
    Ok(CsvDataset { headers, rows })
}

fn cell<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    header_map
        .get(name)
        .and_then(|&idx| record.get(idx))
        .filter(|v| !v.is_empty())
}

fn number(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
    line: usize,
) -> Result<Option<f64>> {
    cell(record, header_map, name)
        .map(|v| {
            v.parse::<f64>().map_err(|_| SpecscopeError::InvalidValue {
                row: line,
                column: name.to_string(),
                value: v.to_string(),
            })
        })
        .transpose()
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>, line: usize) -> Result<RawReading> {
    let interference = cell(record, header_map, INTERFERENCE)
        .map(|v| {
            parse_flag(v).ok_or_else(|| SpecscopeError::InvalidValue {
                row: line,
                column: INTERFERENCE.to_string(),
                value: v.to_string(),
            })
        })
        .transpose()?;

    Ok(RawReading {
        timestamp: cell(record, header_map, TIMESTAMP).map(str::to_string),
        frequency: number(record, header_map, FREQUENCY, line)?,
        power: number(record, header_map, POWER, line)?,
        latitude: number(record, header_map, LATITUDE, line)?,
        longitude: number(record, header_map, LONGITUDE, line)?,
        interference,
    })
}

/// Load a JSON array of reading objects.
pub fn read_json(path: &Path) -> Result<Vec<RawReading>> {
    ensure_file(path)?;
    let file = File::open(path).map_err(|e| SpecscopeError::io(path, e))?;
    let readings: Vec<RawReading> = serde_json::from_reader(BufReader::new(file))?;
    tracing::debug!(path = %path.display(), rows = readings.len(), "loaded JSON");
    Ok(readings)
}

/// Write a JSON array of readings (the simulator output format).
pub fn write_json(path: &Path, readings: &[RawReading]) -> Result<()> {
    let json = serde_json::to_vec_pretty(readings)?;
    std::fs::write(path, json).map_err(|e| SpecscopeError::io(path, e))
}

/// `data.csv` → `data_with_predictions.csv`, in the same directory.
pub fn predictions_output_path(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.strip_suffix(".csv").unwrap_or(&name);
    input.with_file_name(format!("{stem}{PREDICTIONS_SUFFIX}"))
}

/// Write the input rows with `interference` and `confidence` columns
/// appended (replacing any existing columns of the same name).
///
/// The file is written to a temporary sibling and renamed into place, so a
/// failure never leaves a partial output behind.
pub fn write_predictions(
    path: &Path,
    headers: &StringRecord,
    rows: &[(&StringRecord, Prediction)],
) -> Result<()> {
    let keep: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| {
            let h = normalize_header_name(h);
            h != INTERFERENCE && h != CONFIDENCE
        })
        .map(|(idx, _)| idx)
        .collect();

    let tmp = path.with_extension("csv.partial");
    let result = (|| -> Result<()> {
        let mut writer = csv::Writer::from_path(&tmp)?;
        let mut header_out: Vec<&str> = keep.iter().filter_map(|&i| headers.get(i)).collect();
        header_out.extend([INTERFERENCE, CONFIDENCE]);
        writer.write_record(&header_out)?;

        for (record, prediction) in rows {
            let mut out: Vec<String> = keep
                .iter()
                .map(|&i| record.get(i).unwrap_or_default().to_string())
                .collect();
            out.push(u8::from(prediction.interference).to_string());
            out.push(format!("{:.2}", prediction.confidence));
            writer.write_record(&out)?;
        }
        writer.flush().map_err(|e| SpecscopeError::io(&tmp, e))?;
        Ok(())
    })();

    match result {
        Ok(()) => std::fs::rename(&tmp, path).map_err(|e| SpecscopeError::io(path, e)),
        Err(e) => {
            let _ = std::fs::remove_file(&tmp);
            Err(e)
        }
    }
}
