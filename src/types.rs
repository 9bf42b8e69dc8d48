use crate::headers::{Field, HeaderMap};
use chrono::NaiveDateTime;
use serde::Serialize;
use tabled::Tabled;

/// One untyped cell as handed over by the tabular decoder.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
}

impl CellValue {
    /// Render the cell the way a sheet-to-rows export would, untrimmed.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                // Integers without decimals, like the sheet shows them.
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Date(dt) => {
                if dt.time() == chrono::NaiveTime::MIN {
                    dt.format("%Y-%m-%d").to_string()
                } else {
                    dt.format("%Y-%m-%d %H:%M:%S").to_string()
                }
            }
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

/// A decoded row: literal header -> cell, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    pub cells: Vec<(String, CellValue)>,
}

impl RawRow {
    pub fn new(cells: Vec<(String, CellValue)>) -> Self {
        RawRow { cells }
    }

    /// Convenience for text-only rows (mostly tests and CSV input).
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        RawRow {
            cells: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), CellValue::from(*v)))
                .collect(),
        }
    }

    pub fn headers(&self) -> Vec<&str> {
        self.cells.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn get(&self, header: &str) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|(k, _)| k == header)
            .map(|(_, v)| v)
    }
}

/// A row admitted into the working set, read through its semantic fields.
///
/// Text reads are trimmed and absent columns read as the empty string.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanRecord {
    text: [String; Field::COUNT],
    cells: [CellValue; Field::COUNT],
}

impl CleanRecord {
    pub fn from_raw(row: &RawRow, map: &HeaderMap) -> Self {
        let cells: [CellValue; Field::COUNT] = Field::ALL.map(|field| {
            map.header(field)
                .and_then(|h| row.get(h))
                .cloned()
                .unwrap_or(CellValue::Empty)
        });
        let text = cells.clone().map(|c| c.to_text().trim().to_string());
        CleanRecord { text, cells }
    }

    pub fn get(&self, field: Field) -> &str {
        &self.text[field.index()]
    }

    /// The untouched cell, for reads that care about the native type (dates).
    pub fn cell(&self, field: Field) -> &CellValue {
        &self.cells[field.index()]
    }

    pub fn district(&self) -> &str {
        self.get(Field::District)
    }

    pub fn zone(&self) -> &str {
        self.get(Field::Zone)
    }

    pub fn unit(&self) -> &str {
        self.get(Field::Unit)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Kpis {
    pub total: usize,
    pub paid: usize,
    pub unpaid: usize,
    pub submitted: usize,
    pub pending: usize,
    pub distinct_districts: usize,
    pub distinct_zones: usize,
    pub distinct_units: usize,
}

/// Member counters for a unit, a district+zone pair or a district.
///
/// Coarser roll-ups leave the finer keys empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Tabled)]
pub struct MemberStats {
    #[serde(rename = "Unit")]
    #[tabled(rename = "Unit")]
    pub unit: String,
    #[serde(rename = "Zone")]
    #[tabled(rename = "Zone")]
    pub zone: String,
    #[serde(rename = "District")]
    #[tabled(rename = "District")]
    pub district: String,
    #[serde(rename = "Members")]
    #[tabled(rename = "Members")]
    pub members: usize,
    #[serde(rename = "Paid")]
    #[tabled(rename = "Paid")]
    pub paid: usize,
    #[serde(rename = "Unpaid")]
    #[tabled(rename = "Unpaid")]
    pub unpaid: usize,
    #[serde(rename = "Submitted")]
    #[tabled(rename = "Submitted")]
    pub submitted: usize,
    #[serde(rename = "Pending")]
    #[tabled(rename = "Pending")]
    pub pending: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct GroupCount {
    #[serde(rename = "Label")]
    #[tabled(rename = "Label")]
    pub label: String,
    #[serde(rename = "Count")]
    #[tabled(rename = "Count")]
    pub count: usize,
}

pub const AGE_BUCKETS: [&str; 5] = ["15-22", "22-30", "30-40", "40-45", "Unknown"];

/// Fixed five-bucket age histogram, always in `AGE_BUCKETS` order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AgeGroups {
    pub counts: [usize; 5],
}

impl AgeGroups {
    pub fn get(&self, bucket: &str) -> usize {
        AGE_BUCKETS
            .iter()
            .position(|b| *b == bucket)
            .map(|i| self.counts[i])
            .unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, usize)> + '_ {
        AGE_BUCKETS.iter().copied().zip(self.counts.iter().copied())
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}
