// Filter criteria and the engine that evaluates them against the record set.
use crate::headers::Field;
use crate::types::CleanRecord;
use crate::util::{is_paid, is_submitted};
use serde::Serialize;
use std::borrow::Borrow;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentFilter {
    #[default]
    Any,
    Paid,
    Unpaid,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionFilter {
    #[default]
    Any,
    Submitted,
    Pending,
}

impl FromStr for PaymentFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "any" => Ok(PaymentFilter::Any),
            "paid" => Ok(PaymentFilter::Paid),
            "unpaid" => Ok(PaymentFilter::Unpaid),
            other => Err(format!("unknown payment filter '{}'", other)),
        }
    }
}

impl FromStr for SubmissionFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "any" => Ok(SubmissionFilter::Any),
            "submitted" => Ok(SubmissionFilter::Submitted),
            "pending" => Ok(SubmissionFilter::Pending),
            other => Err(format!("unknown submission filter '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CountOp {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "=")]
    Eq,
}

impl CountOp {
    /// Unrecognized operators map to `None`, which disables the count filter.
    pub fn parse(s: &str) -> Option<CountOp> {
        match s.trim() {
            ">" => Some(CountOp::Gt),
            "<" => Some(CountOp::Lt),
            ">=" => Some(CountOp::Ge),
            "<=" => Some(CountOp::Le),
            "=" | "==" => Some(CountOp::Eq),
            _ => None,
        }
    }

    pub fn holds(self, count: f64, target: f64) -> bool {
        match self {
            CountOp::Gt => count > target,
            CountOp::Lt => count < target,
            CountOp::Ge => count >= target,
            CountOp::Le => count <= target,
            CountOp::Eq => count == target,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CountOp::Gt => ">",
            CountOp::Lt => "<",
            CountOp::Ge => ">=",
            CountOp::Le => "<=",
            CountOp::Eq => "=",
        }
    }
}

impl fmt::Display for CountOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// The committed filter state. Empty location sets mean "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterCriteria {
    pub districts: BTreeSet<String>,
    pub zones: BTreeSet<String>,
    pub units: BTreeSet<String>,
    pub payment: PaymentFilter,
    pub submitted: SubmissionFilter,
    pub unit_count_op: Option<CountOp>,
    pub unit_count_val: Option<f64>,
}

impl FilterCriteria {
    /// Set the unit-size comparison from raw control values. A blank or
    /// non-numeric threshold leaves the comparison inactive.
    pub fn with_unit_count(mut self, op: &str, value: &str) -> Self {
        self.unit_count_op = CountOp::parse(op);
        self.unit_count_val = value.trim().parse::<f64>().ok().filter(|v| v.is_finite());
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == FilterCriteria::default()
    }

    fn unit_count(&self) -> Option<(CountOp, f64)> {
        Some((self.unit_count_op?, self.unit_count_val?))
    }

    fn admits(&self, record: &CleanRecord) -> bool {
        if !self.districts.is_empty() && !self.districts.contains(record.district()) {
            return false;
        }
        if !self.zones.is_empty() && !self.zones.contains(record.zone()) {
            return false;
        }
        if !self.units.is_empty() && !self.units.contains(record.unit()) {
            return false;
        }
        let paid = is_paid(record.get(Field::Payment));
        match self.payment {
            PaymentFilter::Paid if !paid => return false,
            PaymentFilter::Unpaid if paid => return false,
            _ => {}
        }
        let submitted = is_submitted(record.get(Field::Submitted));
        match self.submitted {
            SubmissionFilter::Submitted if !submitted => return false,
            SubmissionFilter::Pending if submitted => return false,
            _ => {}
        }
        true
    }
}

/// Evaluate `criteria` over `records`, preserving order.
///
/// The unit-size comparison runs as a second pass and counts members per
/// unit within the already-filtered subset, not the whole record set.
pub fn apply<'a, R>(records: &'a [R], criteria: &FilterCriteria) -> Vec<&'a CleanRecord>
where
    R: Borrow<CleanRecord>,
{
    let subset: Vec<&CleanRecord> = records
        .iter()
        .map(|r| Borrow::<CleanRecord>::borrow(r))
        .filter(|r| criteria.admits(r))
        .collect();

    let Some((op, target)) = criteria.unit_count() else {
        return subset;
    };

    let mut per_unit: HashMap<&str, usize> = HashMap::new();
    for r in &subset {
        *per_unit.entry(r.unit()).or_insert(0) += 1;
    }
    let result: Vec<&CleanRecord> = subset
        .iter()
        .copied()
        .filter(|r| {
            let count = per_unit.get(r.unit()).copied().unwrap_or(0);
            op.holds(count as f64, target)
        })
        .collect();
    log::debug!(
        "unit count filter {} {}: {} -> {} records",
        op,
        target,
        subset.len(),
        result.len()
    );
    result
}
