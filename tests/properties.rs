use member_dashboard::filter::{apply, FilterCriteria, PaymentFilter};
use member_dashboard::headers::Field;
use member_dashboard::loader::{ingest, is_attributable};
use member_dashboard::reports::{kpis, unit_stats};
use member_dashboard::sort::{sort_stats, Direction, SortKey};
use member_dashboard::types::{MemberStats, RawRow};
use member_dashboard::util::normalize_value;
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

fn cell() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "A", "B", "C", " a ", "General", "others", "UNKNOWN", "unknown ", "", "Z1", "Z2", "U1", "U2", "U3",
    ])
}

fn status() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "Paid", "yes", "success", "Completed", "complete", "submitted", "no", "pending", "", "Rejected", "rejected ",
        "Active",
    ])
}

fn raw_rows() -> impl Strategy<Value = Vec<RawRow>> {
    prop::collection::vec((cell(), cell(), cell(), status(), status(), status()), 1..60).prop_map(|rows| {
        rows.into_iter()
            .map(|(d, z, u, p, s, m)| {
                RawRow::from_pairs(&[
                    ("District", d),
                    ("Zone", z),
                    ("Unit", u),
                    ("Payment Status", p),
                    ("Submitted", s),
                    ("Status", m),
                ])
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn ingest_never_admits_placeholders(rows in raw_rows()) {
        let loaded = ingest(&rows, "prop").unwrap();
        for r in &loaded.records {
            prop_assert!(is_attributable(r));
            let d = normalize_value(r.district());
            prop_assert!(!["", "general", "others", "unknown"].contains(&d.as_str()));
            prop_assert!(!["", "unknown"].contains(&normalize_value(r.zone()).as_str()));
            prop_assert!(!["", "unknown"].contains(&normalize_value(r.unit()).as_str()));
            prop_assert_ne!(normalize_value(r.get(Field::MembershipStatus)), "rejected");
        }
        prop_assert_eq!(loaded.report.kept_rows + loaded.report.dropped(), rows.len());
    }

    #[test]
    fn classification_is_binary_and_unit_sums_match(rows in raw_rows()) {
        let records = ingest(&rows, "prop").unwrap().records;
        let k = kpis(&records);
        prop_assert_eq!(k.paid + k.unpaid, records.len());
        prop_assert_eq!(k.submitted + k.pending, records.len());
        let stats = unit_stats(&records);
        prop_assert_eq!(stats.iter().map(|s| s.members).sum::<usize>(), records.len());
        prop_assert_eq!(stats.iter().map(|s| s.paid).sum::<usize>(), k.paid);
    }

    #[test]
    fn unit_count_filter_counts_within_subset(rows in raw_rows(), threshold in 0usize..5) {
        let records = ingest(&rows, "prop").unwrap().records;
        let base = FilterCriteria { payment: PaymentFilter::Paid, ..Default::default() };
        let subset = apply(&records, &base);
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for r in &subset {
            *counts.entry(r.unit()).or_insert(0) += 1;
        }
        let expected: Vec<&str> = subset
            .iter()
            .filter(|r| counts[r.unit()] > threshold)
            .map(|r| r.unit())
            .collect();

        let with_count = base.clone().with_unit_count(">", &threshold.to_string());
        let got: Vec<&str> = apply(&records, &with_count).iter().map(|r| r.unit()).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn descending_is_reverse_of_ascending_without_ties(sizes in prop::collection::hash_set(0usize..1000, 1..30)) {
        let rows: Vec<MemberStats> = sizes
            .iter()
            .enumerate()
            .map(|(i, m)| MemberStats { unit: format!("U{i}"), members: *m, ..Default::default() })
            .collect();
        let asc = sort_stats(&rows, SortKey::Members, Direction::Asc);
        let mut desc = sort_stats(&rows, SortKey::Members, Direction::Desc);
        desc.reverse();
        prop_assert_eq!(asc, desc);
    }

    #[test]
    fn sorting_is_stable_on_ties(members in prop::collection::vec(0usize..3, 1..30)) {
        let rows: Vec<MemberStats> = members
            .iter()
            .enumerate()
            .map(|(i, m)| MemberStats { unit: format!("U{i:02}"), members: *m, ..Default::default() })
            .collect();
        let sorted = sort_stats(&rows, SortKey::Members, Direction::Desc);
        for pair in sorted.windows(2) {
            if pair[0].members == pair[1].members {
                prop_assert!(pair[0].unit < pair[1].unit);
            }
        }
        let units: HashSet<&str> = sorted.iter().map(|s| s.unit.as_str()).collect();
        prop_assert_eq!(units.len(), rows.len());
    }
}
