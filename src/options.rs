// Cascading choice lists for the location pickers.
use crate::types::CleanRecord;
use crate::util::is_unknown_label;
use std::borrow::Borrow;
use std::collections::{BTreeSet, HashSet};

/// Current picks in the location pickers; empty means "nothing chosen".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationSelection {
    pub districts: BTreeSet<String>,
    pub zones: BTreeSet<String>,
    pub units: BTreeSet<String>,
}

/// Valid choices for each picker plus the picks that survived.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationOptions {
    pub districts: Vec<String>,
    pub zones: Vec<String>,
    pub units: Vec<String>,
    pub selection: LocationSelection,
}

/// Distinct, non-placeholder labels sorted case-insensitively.
fn unique_sorted<'a, I>(values: I) -> Vec<String>
where
    I: Iterator<Item = &'a str>,
{
    let set: HashSet<&str> = values.filter(|v| !is_unknown_label(v)).collect();
    let mut out: Vec<String> = set.into_iter().map(str::to_string).collect();
    out.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
    out
}

/// Recompute every picker from the full record set and the current picks.
///
/// Zones are limited to the chosen districts (or all rows if none), units to
/// the chosen zones within that. Picks no longer on offer are dropped.
pub fn cascade<R: Borrow<CleanRecord>>(records: &[R], current: &LocationSelection) -> LocationOptions {
    let all: Vec<&CleanRecord> = records.iter().map(|r| Borrow::<CleanRecord>::borrow(r)).collect();
    let districts = unique_sorted(all.iter().map(|r| r.district()));
    let kept_districts: BTreeSet<String> = current
        .districts
        .iter()
        .filter(|d| districts.contains(d))
        .cloned()
        .collect();

    let after_district: Vec<&CleanRecord> = if kept_districts.is_empty() {
        all
    } else {
        all.into_iter()
            .filter(|r| kept_districts.contains(r.district()))
            .collect()
    };
    let zones = unique_sorted(after_district.iter().map(|r| r.zone()));
    let kept_zones: BTreeSet<String> = current
        .zones
        .iter()
        .filter(|z| zones.contains(z))
        .cloned()
        .collect();

    let after_zone: Vec<&CleanRecord> = if kept_zones.is_empty() {
        after_district
    } else {
        after_district
            .into_iter()
            .filter(|r| kept_zones.contains(r.zone()))
            .collect()
    };
    let units = unique_sorted(after_zone.iter().map(|r| r.unit()));
    let kept_units: BTreeSet<String> = current
        .units
        .iter()
        .filter(|u| units.contains(u))
        .cloned()
        .collect();

    LocationOptions {
        districts,
        zones,
        units,
        selection: LocationSelection {
            districts: kept_districts,
            zones: kept_zones,
            units: kept_units,
        },
    }
}
