// Source discovery, tabular decoding and the cleaning pass that turns raw
// sheet rows into the canonical record set.
use crate::error::{DashboardError, Result};
use crate::headers::{Field, HeaderMap};
use crate::types::{CellValue, CleanRecord, RawRow};
use crate::util::{excel_serial_to_datetime, is_placeholder_district, normalize_value};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::NaiveDateTime;
use csv::ReaderBuilder;
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Workbook,
    Delimited(u8),
}

impl SourceFormat {
    /// Pick a decoder from the file extension; `None` means "sniff it".
    pub fn from_path(path: &Path) -> Option<SourceFormat> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" | "txt" => Some(SourceFormat::Delimited(b',')),
            "tsv" | "tab" => Some(SourceFormat::Delimited(b'\t')),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(SourceFormat::Workbook),
            _ => None,
        }
    }
}

/// Bytes fetched from one of the candidate locations.
#[derive(Debug, Clone)]
pub struct SourceBytes {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub placeholder_location: usize,
    pub rejected_membership: usize,
}

impl LoadReport {
    pub fn dropped(&self) -> usize {
        self.total_rows - self.kept_rows
    }
}

/// The cleaned working set together with how it was produced.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub source_name: String,
    pub header_map: HeaderMap,
    pub records: Vec<CleanRecord>,
    pub report: LoadReport,
}

/// Probe each candidate in order and return the first readable one.
pub fn fetch_first_available<P: AsRef<Path>>(candidates: &[P]) -> Result<SourceBytes> {
    for candidate in candidates {
        let path = candidate.as_ref();
        match std::fs::read(path) {
            Ok(bytes) => {
                debug!("using source {}", path.display());
                return Ok(SourceBytes {
                    path: path.to_path_buf(),
                    bytes,
                });
            }
            Err(e) => {
                debug!("candidate {} not usable: {}", path.display(), e);
            }
        }
    }
    Err(DashboardError::SourceNotFound {
        tried: candidates
            .iter()
            .map(|p| p.as_ref().display().to_string())
            .collect(),
    })
}

/// Read a user-chosen file. Failures are reported as read failures rather
/// than "not found" because the user named this file explicitly.
pub fn read_local_file(path: &Path) -> Result<SourceBytes> {
    let bytes = std::fs::read(path).map_err(|source| DashboardError::ReadFailure {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(SourceBytes {
        path: path.to_path_buf(),
        bytes,
    })
}

/// Decode raw bytes into header-keyed rows.
pub fn decode_rows(source: &SourceBytes) -> Result<Vec<RawRow>> {
    let name = source.path.display().to_string();
    match SourceFormat::from_path(&source.path) {
        Some(SourceFormat::Workbook) => decode_workbook(&source.bytes, &name),
        Some(SourceFormat::Delimited(delim)) => decode_delimited(&source.bytes, delim, &name),
        None => decode_workbook(&source.bytes, &name).or_else(|e| {
            debug!("{} is not a workbook ({}), trying delimited text", name, e);
            decode_delimited(&source.bytes, b',', &name)
        }),
    }
}

pub fn decode_delimited(bytes: &[u8], delimiter: u8, source_name: &str) -> Result<Vec<RawRow>> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(bytes);
    let decode_err = |e: csv::Error| DashboardError::Decode {
        source_name: source_name.to_string(),
        message: e.to_string(),
    };
    let headers: Vec<String> = rdr
        .headers()
        .map_err(decode_err)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    let headers = unique_headers(headers);

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(decode_err)?;
        let cells: Vec<(String, CellValue)> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let v = record.get(i).unwrap_or("");
                let cell = if v.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(v.to_string())
                };
                (h.clone(), cell)
            })
            .collect();
        push_unless_blank(&mut rows, cells);
    }
    Ok(rows)
}

pub fn decode_workbook(bytes: &[u8], source_name: &str) -> Result<Vec<RawRow>> {
    let decode_err = |message: String| DashboardError::Decode {
        source_name: source_name.to_string(),
        message,
    };
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| decode_err(format!("failed to open workbook: {}", e)))?;
    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| decode_err("workbook contains no sheets".to_string()))?;
    let range = workbook
        .worksheet_range(&first)
        .map_err(|e| decode_err(format!("failed to read sheet '{}': {}", first, e)))?;

    let mut sheet_rows = range.rows();
    let Some(header_row) = sheet_rows.next() else {
        return Ok(Vec::new());
    };
    let headers = unique_headers(header_row.iter().map(|c| cell_from_data(c).to_text()).collect());

    let mut rows = Vec::new();
    for row in sheet_rows {
        let cells: Vec<(String, CellValue)> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), row.get(i).map(cell_from_data).unwrap_or(CellValue::Empty)))
            .collect();
        push_unless_blank(&mut rows, cells);
    }
    Ok(rows)
}

fn cell_from_data(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        // Assumes the 1900 date system, which is what nearly every export uses.
        Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64())
            .map(CellValue::Date)
            .unwrap_or(CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(CellValue::Date)
            .unwrap_or_else(|| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(format!("#{:?}", e)),
    }
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Blank titles become `__EMPTY`, `__EMPTY_1`, ...; repeats get `_1`, `_2`, ...
fn unique_headers(raw: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut next_suffix: HashMap<String, usize> = HashMap::new();
    raw.into_iter()
        .map(|h| {
            let base = if h.trim().is_empty() {
                "__EMPTY".to_string()
            } else {
                h
            };
            let mut name = base.clone();
            if taken.contains(&name) {
                let n = next_suffix.entry(base.clone()).or_insert(1);
                // Suffixes skip names a real header already holds.
                loop {
                    name = format!("{}_{}", base, n);
                    *n += 1;
                    if !taken.contains(&name) {
                        break;
                    }
                }
            }
            taken.insert(name.clone());
            name
        })
        .collect()
}

fn push_unless_blank(rows: &mut Vec<RawRow>, cells: Vec<(String, CellValue)>) {
    if cells.iter().any(|(_, c)| !c.is_blank()) {
        rows.push(RawRow::new(cells));
    }
}

/// The "is this a real, attributable member" predicate.
pub fn is_attributable(record: &CleanRecord) -> bool {
    admission(record).is_ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    PlaceholderLocation,
    RejectedMembership,
}

fn admission(record: &CleanRecord) -> std::result::Result<(), Rejection> {
    if is_placeholder_district(record.district()) {
        return Err(Rejection::PlaceholderLocation);
    }
    for v in [record.zone(), record.unit()] {
        let n = normalize_value(v);
        if n.is_empty() || n == "unknown" {
            return Err(Rejection::PlaceholderLocation);
        }
    }
    if normalize_value(record.get(Field::MembershipStatus)) == "rejected" {
        return Err(Rejection::RejectedMembership);
    }
    Ok(())
}

/// Resolve headers from the first row and keep only attributable rows, in order.
pub fn ingest(rows: &[RawRow], source_name: &str) -> Result<LoadedData> {
    let Some(first) = rows.first() else {
        return Err(DashboardError::EmptySheet {
            source_name: source_name.to_string(),
        });
    };
    let header_map = HeaderMap::resolve(&first.headers());
    for field in header_map.missing() {
        if field.is_extension() {
            debug!("optional column '{}' not present in {}", field, source_name);
        } else {
            warn!("no column matched '{}' in {}; it will read as empty", field, source_name);
        }
    }

    let mut report = LoadReport {
        total_rows: rows.len(),
        ..Default::default()
    };
    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let record = CleanRecord::from_raw(row, &header_map);
        match admission(&record) {
            Ok(()) => records.push(record),
            Err(Rejection::PlaceholderLocation) => report.placeholder_location += 1,
            Err(Rejection::RejectedMembership) => report.rejected_membership += 1,
        }
    }
    report.kept_rows = records.len();
    info!(
        "ingested {}: {} rows, {} kept, {} dropped",
        source_name,
        report.total_rows,
        report.kept_rows,
        report.dropped()
    );

    Ok(LoadedData {
        source_name: source_name.to_string(),
        header_map,
        records,
        report,
    })
}

/// Decode and ingest in one go.
pub fn load_source(source: &SourceBytes) -> Result<LoadedData> {
    let rows = decode_rows(source)?;
    let name = source
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.path.display().to_string());
    ingest(&rows, &name)
}

/// Discovery entry point: first available candidate, decoded and cleaned.
pub fn load_first_available<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedData> {
    let source = fetch_first_available(candidates)?;
    load_source(&source)
}

/// Local-file entry point, feeding the same pipeline.
pub fn load_local_file(path: &Path) -> Result<LoadedData> {
    let source = read_local_file(path)?;
    load_source(&source)
}
