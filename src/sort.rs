// Column sorting for ranked aggregate tables.
use crate::types::MemberStats;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Members,
    Paid,
    Unpaid,
    Submitted,
    Pending,
    Unit,
    Zone,
    District,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn flip(self) -> Direction {
        match self {
            Direction::Asc => Direction::Desc,
            Direction::Desc => Direction::Asc,
        }
    }
}

impl SortKey {
    pub const ALL: [SortKey; 8] = [
        SortKey::Unit,
        SortKey::Zone,
        SortKey::District,
        SortKey::Members,
        SortKey::Paid,
        SortKey::Unpaid,
        SortKey::Submitted,
        SortKey::Pending,
    ];

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            SortKey::Members | SortKey::Paid | SortKey::Unpaid | SortKey::Submitted | SortKey::Pending
        )
    }

    /// Direction used the first time a column is picked.
    pub fn default_direction(self) -> Direction {
        if self.is_numeric() {
            Direction::Desc
        } else {
            Direction::Asc
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SortKey::Members => "members",
            SortKey::Paid => "paid",
            SortKey::Unpaid => "unpaid",
            SortKey::Submitted => "submitted",
            SortKey::Pending => "pending",
            SortKey::Unit => "unit",
            SortKey::Zone => "zone",
            SortKey::District => "district",
        }
    }

    fn compare(self, a: &MemberStats, b: &MemberStats) -> Ordering {
        match self {
            SortKey::Members => a.members.cmp(&b.members),
            SortKey::Paid => a.paid.cmp(&b.paid),
            SortKey::Unpaid => a.unpaid.cmp(&b.unpaid),
            SortKey::Submitted => a.submitted.cmp(&b.submitted),
            SortKey::Pending => a.pending.cmp(&b.pending),
            SortKey::Unit => a.unit.cmp(&b.unit),
            SortKey::Zone => a.zone.cmp(&b.zone),
            SortKey::District => a.district.cmp(&b.district),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        SortKey::ALL
            .into_iter()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| format!("unknown sort column '{}'", s.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortState {
    pub key: SortKey,
    pub direction: Direction,
}

impl Default for SortState {
    fn default() -> Self {
        SortState {
            key: SortKey::Members,
            direction: Direction::Desc,
        }
    }
}

impl SortState {
    /// Header click: same column flips, a new column starts at its default.
    pub fn select(&mut self, key: SortKey) {
        if self.key == key {
            self.direction = self.direction.flip();
        } else {
            self.key = key;
            self.direction = key.default_direction();
        }
    }
}

/// Sorted copy of `rows`; equal keys keep their input order.
pub fn sort_stats(rows: &[MemberStats], key: SortKey, direction: Direction) -> Vec<MemberStats> {
    let mut out = rows.to_vec();
    out.sort_by(|a, b| match direction {
        Direction::Asc => key.compare(a, b),
        Direction::Desc => key.compare(b, a),
    });
    out
}
