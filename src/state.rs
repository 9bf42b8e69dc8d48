// Application store: the loaded record set plus the user's current view
// settings. Every query is computed on demand from these values.
use crate::error::Result;
use crate::filter::{self, FilterCriteria};
use crate::headers::{Field, HeaderMap};
use crate::loader::{LoadReport, LoadedData};
use crate::options::{self, LocationOptions, LocationSelection};
use crate::reports;
use crate::sort::{sort_stats, SortKey, SortState};
use crate::types::{AgeGroups, CleanRecord, GroupCount, Kpis, MemberStats};
use chrono::NaiveDate;
use log::{info, warn};

pub const DEFAULT_TOP_N: usize = 10;

/// Handed out when a load starts; only the newest finished ticket may commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Committed { generation: u64, records: usize },
    /// A newer load already finished; this result was discarded.
    Stale,
}

#[derive(Debug)]
pub struct Dashboard {
    data: Option<LoadedData>,
    criteria: FilterCriteria,
    sort: SortState,
    table_top_n: usize,
    ranking_top_n: usize,
    issued: u64,
    committed: u64,
}

impl Default for Dashboard {
    fn default() -> Self {
        Dashboard::new(DEFAULT_TOP_N, DEFAULT_TOP_N)
    }
}

/// Everything the presentation layer needs for one render.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub kpis: Kpis,
    pub by_district: Vec<GroupCount>,
    pub by_zone: Vec<GroupCount>,
    /// Sorted by the current sort state and cut to the table's top-N.
    pub unit_table: Vec<MemberStats>,
    pub zone_stats: Vec<MemberStats>,
    pub district_stats: Vec<MemberStats>,
    pub age_groups: Option<AgeGroups>,
    pub top_professions: Option<Vec<GroupCount>>,
    pub top_qualifications: Option<Vec<GroupCount>>,
}

impl Dashboard {
    /// Row limits for the unit table and for the ranking views, each at least 1.
    pub fn new(table_top_n: usize, ranking_top_n: usize) -> Self {
        Dashboard {
            data: None,
            criteria: FilterCriteria::default(),
            sort: SortState::default(),
            table_top_n: table_top_n.max(1),
            ranking_top_n: ranking_top_n.max(1),
            issued: 0,
            committed: 0,
        }
    }

    pub fn begin_load(&mut self) -> LoadTicket {
        self.issued += 1;
        LoadTicket {
            generation: self.issued,
        }
    }

    /// Commit a finished load. Errors leave the previous data and filters as
    /// they were; a successful commit resets the filters.
    pub fn finish_load(&mut self, ticket: LoadTicket, result: Result<LoadedData>) -> Result<LoadOutcome> {
        if ticket.generation <= self.committed {
            warn!(
                "discarding load #{}; #{} is already in place",
                ticket.generation, self.committed
            );
            return Ok(LoadOutcome::Stale);
        }
        let loaded = result?;
        let records = loaded.records.len();
        info!(
            "loaded {} records from {} (load #{})",
            records, loaded.source_name, ticket.generation
        );
        self.data = Some(loaded);
        self.committed = ticket.generation;
        self.criteria = FilterCriteria::default();
        Ok(LoadOutcome::Committed {
            generation: ticket.generation,
            records,
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.committed
    }

    pub fn records(&self) -> &[CleanRecord] {
        self.data.as_ref().map(|d| d.records.as_slice()).unwrap_or(&[])
    }

    pub fn source_name(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.source_name.as_str())
    }

    pub fn load_report(&self) -> Option<&LoadReport> {
        self.data.as_ref().map(|d| &d.report)
    }

    pub fn header_map(&self) -> Option<&HeaderMap> {
        self.data.as_ref().map(|d| &d.header_map)
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Replace the criteria wholesale, as an "apply" action does.
    pub fn apply_filters(&mut self, criteria: FilterCriteria) {
        info!("filters applied: {:?}", criteria);
        self.criteria = criteria;
    }

    pub fn reset_filters(&mut self) {
        self.criteria = FilterCriteria::default();
    }

    pub fn sort_state(&self) -> SortState {
        self.sort
    }

    pub fn select_sort(&mut self, key: SortKey) {
        self.sort.select(key);
    }

    pub fn table_top_n(&self) -> usize {
        self.table_top_n
    }

    pub fn ranking_top_n(&self) -> usize {
        self.ranking_top_n
    }

    pub fn set_table_top_n(&mut self, n: usize) {
        self.table_top_n = n.max(1);
    }

    pub fn set_ranking_top_n(&mut self, n: usize) {
        self.ranking_top_n = n.max(1);
    }

    /// Picker choices given in-progress (not yet applied) picks.
    pub fn location_options(&self, current: &LocationSelection) -> LocationOptions {
        options::cascade(self.records(), current)
    }

    pub fn filtered(&self) -> Vec<&CleanRecord> {
        filter::apply(self.records(), &self.criteria)
    }

    pub fn view(&self, today: NaiveDate) -> DashboardView {
        let rows = self.filtered();
        let has = |field: Field| self.header_map().map(|m| m.is_resolved(field)).unwrap_or(false);

        let units = reports::unit_stats(&rows);
        let mut unit_table = sort_stats(&units, self.sort.key, self.sort.direction);
        unit_table.truncate(self.table_top_n);

        DashboardView {
            kpis: reports::kpis(&rows),
            by_district: reports::group_count(&rows, Field::District),
            by_zone: reports::group_count(&rows, Field::Zone),
            unit_table,
            zone_stats: reports::zone_stats(&rows),
            district_stats: reports::district_stats(&rows),
            age_groups: has(Field::DateOfBirth)
                .then(|| reports::age_groups(&rows, Field::DateOfBirth, today)),
            top_professions: has(Field::Profession)
                .then(|| reports::top_by_field(&rows, Field::Profession, self.ranking_top_n)),
            top_qualifications: has(Field::Qualification)
                .then(|| reports::top_by_field(&rows, Field::Qualification, self.ranking_top_n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DashboardError;
    use crate::filter::PaymentFilter;
    use crate::loader::ingest;
    use crate::types::RawRow;

    fn loaded(units: &[&str]) -> LoadedData {
        let rows: Vec<RawRow> = units
            .iter()
            .map(|u| RawRow::from_pairs(&[("District", "A"), ("Zone", "Z1"), ("Unit", u), ("Payment", "paid")]))
            .collect();
        ingest(&rows, "test.csv").unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn stale_load_cannot_overwrite_newer_one() {
        let mut dash = Dashboard::default();
        let slow = dash.begin_load();
        let fast = dash.begin_load();
        let out = dash.finish_load(fast, Ok(loaded(&["U1", "U2"]))).unwrap();
        assert_eq!(out, LoadOutcome::Committed { generation: 2, records: 2 });
        let out = dash.finish_load(slow, Ok(loaded(&["U9"]))).unwrap();
        assert_eq!(out, LoadOutcome::Stale);
        assert_eq!(dash.records().len(), 2);
        assert_eq!(dash.generation(), 2);
    }

    #[test]
    fn failed_reload_keeps_previous_state() {
        let mut dash = Dashboard::default();
        let t = dash.begin_load();
        dash.finish_load(t, Ok(loaded(&["U1"]))).unwrap();
        let criteria = FilterCriteria {
            payment: PaymentFilter::Unpaid,
            ..Default::default()
        };
        dash.apply_filters(criteria.clone());

        let t = dash.begin_load();
        let err = dash.finish_load(
            t,
            Err(DashboardError::SourceNotFound { tried: vec!["x.xlsx".into()] }),
        );
        assert!(err.is_err());
        assert_eq!(dash.records().len(), 1);
        assert_eq!(dash.criteria(), &criteria);
    }

    #[test]
    fn successful_load_resets_filters() {
        let mut dash = Dashboard::default();
        dash.apply_filters(FilterCriteria {
            payment: PaymentFilter::Paid,
            ..Default::default()
        });
        let t = dash.begin_load();
        dash.finish_load(t, Ok(loaded(&["U1"]))).unwrap();
        assert!(dash.criteria().is_empty());
    }

    #[test]
    fn view_applies_top_n_and_sort() {
        let mut dash = Dashboard::new(2, DEFAULT_TOP_N);
        let t = dash.begin_load();
        dash.finish_load(t, Ok(loaded(&["U1", "U2", "U2", "U3", "U3", "U3"]))).unwrap();
        let view = dash.view(today());
        let units: Vec<&str> = view.unit_table.iter().map(|s| s.unit.as_str()).collect();
        assert_eq!(units, vec!["U3", "U2"]);
        assert_eq!(view.kpis.total, 6);
        assert!(view.age_groups.is_none());

        dash.select_sort(SortKey::Unit);
        let units: Vec<String> = dash.view(today()).unit_table.into_iter().map(|s| s.unit).collect();
        assert_eq!(units, vec!["U1", "U2"]);
    }

    #[test]
    fn view_is_idempotent() {
        let mut dash = Dashboard::default();
        let t = dash.begin_load();
        dash.finish_load(t, Ok(loaded(&["U1", "U2", "U2"]))).unwrap();
        assert_eq!(dash.view(today()), dash.view(today()));
    }

    #[test]
    fn top_n_is_at_least_one() {
        let mut dash = Dashboard::new(0, 0);
        assert_eq!((dash.table_top_n(), dash.ranking_top_n()), (1, 1));
        dash.set_table_top_n(0);
        dash.set_ranking_top_n(0);
        assert_eq!((dash.table_top_n(), dash.ranking_top_n()), (1, 1));
    }

    #[test]
    fn table_and_ranking_limits_are_independent() {
        let rows: Vec<RawRow> = ["U1", "U2", "U3"]
            .iter()
            .zip(["Nurse", "Clerk", "Driver"])
            .map(|(u, p)| RawRow::from_pairs(&[("District", "A"), ("Zone", "Z1"), ("Unit", u), ("Profession", p)]))
            .collect();
        let mut dash = Dashboard::new(3, 1);
        let t = dash.begin_load();
        dash.finish_load(t, Ok(ingest(&rows, "test.csv").unwrap())).unwrap();
        let view = dash.view(today());
        assert_eq!(view.unit_table.len(), 3);
        assert_eq!(view.top_professions.as_ref().map(Vec::len), Some(1));

        dash.set_table_top_n(1);
        dash.set_ranking_top_n(5);
        let view = dash.view(today());
        assert_eq!(view.unit_table.len(), 1);
        assert_eq!(view.top_professions.map(|t| t.len()), Some(3));
    }
}
