use crate::headers::Field;
use crate::types::{AgeGroups, CleanRecord, GroupCount, Kpis, MemberStats, AGE_BUCKETS};
use crate::util::{age_bucket, age_on, is_paid, is_submitted, is_unknown_label, parse_birth_date};
use chrono::NaiveDate;
use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};

pub fn kpis<R: Borrow<CleanRecord>>(records: &[R]) -> Kpis {
    let mut out = Kpis {
        total: records.len(),
        ..Default::default()
    };
    let mut districts: HashSet<&str> = HashSet::new();
    let mut zones: HashSet<&str> = HashSet::new();
    let mut units: HashSet<&str> = HashSet::new();
    for r in records {
        let r: &CleanRecord = r.borrow();
        if is_paid(r.get(Field::Payment)) {
            out.paid += 1;
        } else {
            out.unpaid += 1;
        }
        if is_submitted(r.get(Field::Submitted)) {
            out.submitted += 1;
        } else {
            out.pending += 1;
        }
        for (set, v) in [
            (&mut districts, r.district()),
            (&mut zones, r.zone()),
            (&mut units, r.unit()),
        ] {
            if !is_unknown_label(v) {
                set.insert(v);
            }
        }
    }
    out.distinct_districts = districts.len();
    out.distinct_zones = zones.len();
    out.distinct_units = units.len();
    out
}

/// Count records per label of `field`, in first-seen order.
pub fn group_count<R: Borrow<CleanRecord>>(records: &[R], field: Field) -> Vec<GroupCount> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut out: Vec<GroupCount> = Vec::new();
    for r in records {
        let r: &CleanRecord = r.borrow();
        let label = r.get(field);
        if is_unknown_label(label) {
            continue;
        }
        match index.get(label) {
            Some(&i) => out[i].count += 1,
            None => {
                index.insert(label, out.len());
                out.push(GroupCount {
                    label: label.to_string(),
                    count: 1,
                });
            }
        }
    }
    out
}

/// Most frequent labels of `field`, ties kept in first-seen order.
pub fn top_by_field<R: Borrow<CleanRecord>>(records: &[R], field: Field, n: usize) -> Vec<GroupCount> {
    let mut counts = group_count(records, field);
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(n);
    counts
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grain {
    Unit,
    Zone,
    District,
}

fn member_stats<R: Borrow<CleanRecord>>(records: &[R], grain: Grain) -> Vec<MemberStats> {
    let mut index: HashMap<(&str, &str), usize> = HashMap::new();
    let mut out: Vec<MemberStats> = Vec::new();
    for r in records {
        let r: &CleanRecord = r.borrow();
        let key = match grain {
            Grain::Unit => (r.unit(), ""),
            Grain::Zone => (r.district(), r.zone()),
            Grain::District => (r.district(), ""),
        };
        let i = *index.entry(key).or_insert_with(|| {
            // The first record seen decides which zone/district a unit is shown under.
            out.push(match grain {
                Grain::Unit => MemberStats {
                    unit: r.unit().to_string(),
                    zone: r.zone().to_string(),
                    district: r.district().to_string(),
                    ..Default::default()
                },
                Grain::Zone => MemberStats {
                    zone: r.zone().to_string(),
                    district: r.district().to_string(),
                    ..Default::default()
                },
                Grain::District => MemberStats {
                    district: r.district().to_string(),
                    ..Default::default()
                },
            });
            out.len() - 1
        });
        let e = &mut out[i];
        e.members += 1;
        if is_paid(r.get(Field::Payment)) {
            e.paid += 1;
        } else {
            e.unpaid += 1;
        }
        if is_submitted(r.get(Field::Submitted)) {
            e.submitted += 1;
        } else {
            e.pending += 1;
        }
    }
    // Stable, so equal sizes stay in first-seen order.
    out.sort_by(|a, b| b.members.cmp(&a.members));
    out
}

/// One row per unit, largest first.
pub fn unit_stats<R: Borrow<CleanRecord>>(records: &[R]) -> Vec<MemberStats> {
    member_stats(records, Grain::Unit)
}

/// One row per district+zone pair, largest first.
pub fn zone_stats<R: Borrow<CleanRecord>>(records: &[R]) -> Vec<MemberStats> {
    member_stats(records, Grain::Zone)
}

pub fn district_stats<R: Borrow<CleanRecord>>(records: &[R]) -> Vec<MemberStats> {
    member_stats(records, Grain::District)
}

/// Bucket members by age as of `today`, reading birth dates from `field`.
pub fn age_groups<R: Borrow<CleanRecord>>(records: &[R], field: Field, today: NaiveDate) -> AgeGroups {
    let mut groups = AgeGroups::default();
    for r in records {
        let r: &CleanRecord = r.borrow();
        let age = parse_birth_date(r.cell(field)).map(|born| age_on(born, today));
        let bucket = age_bucket(age);
        if let Some(i) = AGE_BUCKETS.iter().position(|b| *b == bucket) {
            groups.counts[i] += 1;
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::HeaderMap;
    use crate::types::{CellValue, RawRow};

    fn rec(pairs: &[(&str, &str)]) -> CleanRecord {
        let raw = RawRow::from_pairs(pairs);
        CleanRecord::from_raw(&raw, &HeaderMap::resolve(&raw.headers()))
    }

    fn example() -> Vec<CleanRecord> {
        vec![
            rec(&[("district", "A"), ("zone", "Z1"), ("unit", "U1"), ("payment", "Paid")]),
            rec(&[("district", "A"), ("zone", "Z1"), ("unit", "U1"), ("payment", "No")]),
            rec(&[("district", "A"), ("zone", "Z2"), ("unit", "U2"), ("payment", "Paid")]),
        ]
    }

    #[test]
    fn kpis_for_example() {
        let k = kpis(&example());
        assert_eq!(k.total, 3);
        assert_eq!(k.paid, 2);
        assert_eq!(k.unpaid, 1);
        assert_eq!(k.submitted, 0);
        assert_eq!(k.pending, 3);
        assert_eq!((k.distinct_districts, k.distinct_zones, k.distinct_units), (1, 2, 2));
    }

    #[test]
    fn kpis_skip_blank_and_unknown_labels() {
        let data = vec![
            rec(&[("district", "A"), ("zone", "Z1"), ("unit", "U1")]),
            rec(&[("district", ""), ("zone", ""), ("unit", "")]),
            rec(&[("district", "Unknown"), ("zone", "UNKNOWN"), ("unit", "Unknown")]),
            rec(&[("district", " unknown "), ("zone", " unknown "), ("unit", " unknown ")]),
        ];
        let k = kpis(&data);
        assert_eq!(k.total, 4);
        assert_eq!(k.unpaid, 4);
        assert_eq!((k.distinct_districts, k.distinct_zones, k.distinct_units), (1, 1, 1));
    }

    #[test]
    fn unit_stats_for_example() {
        let stats = unit_stats(&example());
        assert_eq!(stats.len(), 2);
        assert_eq!((stats[0].unit.as_str(), stats[0].members, stats[0].paid, stats[0].unpaid), ("U1", 2, 1, 1));
        assert_eq!((stats[1].unit.as_str(), stats[1].members, stats[1].paid, stats[1].unpaid), ("U2", 1, 1, 0));
        assert_eq!(stats[1].zone, "Z2");
    }

    #[test]
    fn first_seen_pairing_wins() {
        let data = vec![
            rec(&[("district", "A"), ("zone", "Z1"), ("unit", "U1")]),
            rec(&[("district", "B"), ("zone", "Z9"), ("unit", "U1")]),
        ];
        let stats = unit_stats(&data);
        assert_eq!(stats.len(), 1);
        assert_eq!((stats[0].zone.as_str(), stats[0].district.as_str()), ("Z1", "A"));
        assert_eq!(stats[0].members, 2);
    }

    #[test]
    fn zone_and_district_rollups() {
        let zones = zone_stats(&example());
        assert_eq!(zones.len(), 2);
        assert_eq!((zones[0].zone.as_str(), zones[0].members), ("Z1", 2));
        assert!(zones[0].unit.is_empty());
        let districts = district_stats(&example());
        assert_eq!(districts.len(), 1);
        assert_eq!(districts[0].members, 3);
    }

    #[test]
    fn group_count_keeps_first_seen_order_and_skips_unknown() {
        let data = vec![
            rec(&[("zone", "Z2")]),
            rec(&[("zone", "Z1")]),
            rec(&[("zone", "unknown")]),
            rec(&[("zone", "Z1")]),
            rec(&[("zone", "")]),
        ];
        let counts = group_count(&data, Field::Zone);
        let flat: Vec<(&str, usize)> = counts.iter().map(|g| (g.label.as_str(), g.count)).collect();
        assert_eq!(flat, vec![("Z2", 1), ("Z1", 2)]);
    }

    #[test]
    fn top_n_breaks_ties_by_first_seen() {
        let data: Vec<CleanRecord> = ["Nurse", "Teacher", "Teacher", "Driver", "Nurse", "Clerk"]
            .iter()
            .map(|p| rec(&[("profession", p)]))
            .collect();
        let top = top_by_field(&data, Field::Profession, 3);
        let labels: Vec<&str> = top.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["Nurse", "Teacher", "Driver"]);
    }

    #[test]
    fn age_groups_with_frozen_clock() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let data = vec![
            rec(&[("dob", "2000-01-01")]),
            rec(&[("dob", "01/06/1990")]),
            rec(&[("dob", "garbage")]),
            rec(&[("dob", "2020-01-01")]),
            rec(&[("dob", "")]),
        ];
        let groups = age_groups(&data, Field::DateOfBirth, today);
        assert_eq!(groups.get("22-30"), 1);
        assert_eq!(groups.get("30-40"), 1);
        assert_eq!(groups.get("Unknown"), 3);
        assert_eq!(groups.total(), data.len());
    }

    #[test]
    fn age_groups_accept_native_and_serial_cells() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let map = HeaderMap::resolve(&["DOB"]);
        let native = RawRow::new(vec![(
            "DOB".into(),
            CellValue::Date(NaiveDate::from_ymd_opt(1982, 5, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()),
        )]);
        let serial = RawRow::new(vec![("DOB".into(), CellValue::Number(36526.0))]);
        let data = vec![CleanRecord::from_raw(&native, &map), CleanRecord::from_raw(&serial, &map)];
        let groups = age_groups(&data, Field::DateOfBirth, today);
        assert_eq!(groups.get("40-45"), 1);
        assert_eq!(groups.get("22-30"), 1);
    }
}
