// Header resolution: maps free-form spreadsheet column titles onto the
// fixed set of semantic fields the dashboard understands.
use serde::Serialize;
use std::fmt;

/// A logical column, independent of what the source sheet calls it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    District,
    Zone,
    Unit,
    Payment,
    Submitted,
    MembershipStatus,
    DateOfBirth,
    Profession,
    Qualification,
}

impl Field {
    pub const COUNT: usize = 9;

    pub const ALL: [Field; Field::COUNT] = [
        Field::District,
        Field::Zone,
        Field::Unit,
        Field::Payment,
        Field::Submitted,
        Field::MembershipStatus,
        Field::DateOfBirth,
        Field::Profession,
        Field::Qualification,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Extension fields are optional; a sheet without them is still fully usable.
    pub fn is_extension(self) -> bool {
        matches!(
            self,
            Field::DateOfBirth | Field::Profession | Field::Qualification
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            Field::District => "District",
            Field::Zone => "Zone",
            Field::Unit => "Unit",
            Field::Payment => "Payment",
            Field::Submitted => "Submitted",
            Field::MembershipStatus => "Membership Status",
            Field::DateOfBirth => "Date of Birth",
            Field::Profession => "Profession",
            Field::Qualification => "Qualification",
        }
    }

    pub fn aliases(self) -> &'static [&'static str] {
        ALIASES[self.index()]
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// Ordered by preference: the first alias found among the headers wins.
static ALIASES: [&[&str]; Field::COUNT] = [
    &["district", "dist", "district name"],
    &["zone", "area", "region"],
    &["unit", "branch", "unit name"],
    &["payment status", "payment", "paid status", "fee status"],
    &["submitted status", "submission status", "submitted", "form status"],
    &["membership status", "status"],
    &["date of birth", "dob", "birth date", "birthdate", "d o b"],
    &["profession", "occupation", "job"],
    &["qualification", "educational qualification", "education"],
];

/// Lowercase, collapse every run of non-alphanumerics into one space, trim.
///
/// `"  Payment_Status (2024) "` becomes `"payment status 2024"`.
pub fn normalize_header(header: &str) -> String {
    let lowered = header.trim().to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut pending_space = false;
    for c in lowered.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else {
            pending_space = true;
        }
    }
    out
}

/// Semantic field -> literal header (or nothing), built once per load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeaderMap {
    columns: [Option<String>; Field::COUNT],
}

impl HeaderMap {
    /// Resolve every field against the headers of the first decoded row.
    pub fn resolve<S: AsRef<str>>(headers: &[S]) -> Self {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h.as_ref())).collect();
        let mut map = HeaderMap::default();
        for field in Field::ALL {
            map.columns[field.index()] = field
                .aliases()
                .iter()
                .find_map(|alias| normalized.iter().position(|h| h == alias))
                .map(|idx| headers[idx].as_ref().to_string());
        }
        map
    }

    pub fn header(&self, field: Field) -> Option<&str> {
        self.columns[field.index()].as_deref()
    }

    pub fn is_resolved(&self, field: Field) -> bool {
        self.columns[field.index()].is_some()
    }

    pub fn missing(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| !self.is_resolved(*f))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_punctuation_and_case() {
        assert_eq!(normalize_header("  Payment_Status (2024) "), "payment status 2024");
        assert_eq!(normalize_header("District--Name"), "district name");
        assert_eq!(normalize_header("***"), "");
    }

    #[test]
    fn first_alias_wins_over_header_order() {
        // "status" appears first but "membership status" is the preferred alias.
        let headers = ["Status", "Membership Status", "Dist"];
        let map = HeaderMap::resolve(&headers);
        assert_eq!(map.header(Field::MembershipStatus), Some("Membership Status"));
        assert_eq!(map.header(Field::District), Some("Dist"));
    }

    #[test]
    fn duplicate_matches_resolve_to_first_header() {
        let headers = ["Zone", "zone ", "Unit"];
        let map = HeaderMap::resolve(&headers);
        assert_eq!(map.header(Field::Zone), Some("Zone"));
    }

    #[test]
    fn unmatched_fields_stay_absent() {
        let map = HeaderMap::resolve(&["District", "Zone"]);
        assert!(!map.is_resolved(Field::Unit));
        assert!(map.missing().contains(&Field::DateOfBirth));
        assert_eq!(map.header(Field::Payment), None);
    }

    #[test]
    fn extension_fields_use_same_matching() {
        let map = HeaderMap::resolve(&["D.O.B", "Occupation", "Education"]);
        assert_eq!(map.header(Field::DateOfBirth), Some("D.O.B"));
        assert_eq!(map.header(Field::Profession), Some("Occupation"));
        assert_eq!(map.header(Field::Qualification), Some("Education"));
    }
}
